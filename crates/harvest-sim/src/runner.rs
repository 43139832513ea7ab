//! The driver loop.
//!
//! A [`Field`] is a row of plots worked by farmers and foragers. Each tick
//! every actor harvests one plot, the host applies the result, and the
//! harvester drains its deferred conversions. Harvested plots grow back at
//! the start of the next tick.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use harvest_core::catalog::YieldKind;
use harvest_core::gate::{Ability, AbilityState};
use harvest_core::memory::MemoryHost;
use harvest_core::model::{Location, NodeState, ResourceNode, Skill};
use harvest_core::ports::WorldPort;
use harvest_core::{
    Actor, ActorId, Harvester, NodeTransition, Outcome, ResolutionResult, ResourceType, TaskReport,
};

use crate::config::SimConfig;

/// Resources laid out across the field, repeating.
const PLOT_CYCLE: &[(&str, i32)] = &[
    ("wheat", 1),
    ("carrots", 1),
    ("cactus", 3),
    ("poppy", 1),
    ("melon", 1),
    ("sugar_cane", 2),
    ("dead_bush", 1),
    ("cobblestone", 1),
    ("red_mushroom", 1),
];

/// How long one Overgrowth activation lasts.
const OVERGROWTH_TICKS: u64 = 10;

/// Seeds and produce every farmer starts with.
const FARMER_STOCK: &[(&str, u32)] = &[("seeds", 256), ("carrot", 64)];

#[derive(Debug, Clone)]
struct Plot {
    location: Location,
    resource: ResourceType,
    height: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Farmer,
    Forager,
}

#[derive(Debug, Clone)]
struct Worker {
    actor: Actor,
    role: Role,
}

/// Aggregate outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimSummary {
    /// Ticks run.
    pub ticks: u64,
    /// Resolution calls made.
    pub harvests: usize,
    /// Granted results.
    pub granted: usize,
    /// Denied results by reason.
    pub denied: BTreeMap<String, usize>,
    /// Resolutions against unknown resources.
    pub no_yield: usize,
    /// Treasures found.
    pub treasures: usize,
    /// Units spawned per item.
    pub items: BTreeMap<String, u32>,
    /// Experience per actor.
    pub xp: BTreeMap<u64, u64>,
    /// Deferred conversions that landed.
    pub conversions_applied: usize,
    /// Deferred conversions that found nothing to convert.
    pub conversions_skipped: usize,
}

impl SimSummary {
    fn record(&mut self, result: &ResolutionResult) {
        self.harvests += 1;
        match result.outcome {
            Outcome::Granted => self.granted += 1,
            Outcome::Denied(reason) => *self.denied.entry(format!("{reason:?}")).or_insert(0) += 1,
            Outcome::NoYield => self.no_yield += 1,
        }
        if let Some(drop) = &result.drop {
            *self.items.entry(drop.item.to_string()).or_insert(0) += drop.total();
        }
        if let Some(treasure) = &result.treasure {
            self.treasures += 1;
            *self.items.entry(treasure.item.to_string()).or_insert(0) += treasure.amount;
        }
    }

    fn record_reports(&mut self, reports: &[TaskReport]) {
        for report in reports {
            match report {
                TaskReport::Applied { .. } => self.conversions_applied += 1,
                TaskReport::Skipped { .. } => self.conversions_skipped += 1,
            }
        }
    }
}

/// The simulated field and everyone working it.
pub struct Field {
    harvester: Harvester,
    host: MemoryHost,
    plots: Vec<Plot>,
    workers: Vec<Worker>,
    overgrowth_every: u64,
    summary: SimSummary,
}

impl Field {
    /// Lays out plots and actors as `config` describes.
    #[must_use]
    pub fn new(harvester: Harvester, config: &SimConfig) -> Self {
        let plots = (0..config.plots)
            .zip(PLOT_CYCLE.iter().cycle())
            .map(|(index, (resource, height))| Plot {
                location: Location::new(i32::try_from(index).unwrap_or(i32::MAX) * 2, 64, 0),
                resource: ResourceType::new(resource),
                height: *height,
            })
            .collect();

        let mut host = MemoryHost::permissive();
        let mut workers = Vec::new();
        let mut next_id = 1u64;

        for _ in 0..config.farmers {
            let id = ActorId::new(next_id);
            next_id += 1;
            for (item, amount) in FARMER_STOCK {
                host.inventory.give(id, *item, *amount);
            }
            workers.push(Worker {
                actor: Actor::new(id, 400).holding("seeds"),
                role: Role::Farmer,
            });
        }
        for _ in 0..config.foragers {
            let id = ActorId::new(next_id);
            next_id += 1;
            workers.push(Worker {
                actor: Actor::new(id, 800).holding("iron_sword"),
                role: Role::Forager,
            });
        }

        Self {
            harvester,
            host,
            plots,
            workers,
            overgrowth_every: config.overgrowth_every,
            summary: SimSummary::default(),
        }
    }

    /// Runs `ticks` ticks and returns the summary.
    ///
    /// # Errors
    ///
    /// Returns an error if a resolution fails on a broken descriptor.
    pub fn run(mut self, ticks: u64) -> Result<SimSummary> {
        for tick in 0..ticks {
            self.tick(tick)?;
        }
        self.summary.ticks = ticks;
        for worker in &self.workers {
            let id = worker.actor.id;
            self.summary
                .xp
                .insert(id.as_u64(), self.host.xp.total(id, Skill::Herbalism));
        }
        Ok(self.summary)
    }

    fn tick(&mut self, tick: u64) -> Result<()> {
        self.host.now = tick;
        self.host.abilities.expire(tick);
        self.regrow();

        if self.overgrowth_every > 0 && tick % self.overgrowth_every == 0 {
            for worker in self.workers.iter().filter(|w| w.role == Role::Farmer) {
                self.host.abilities.activate(
                    worker.actor.id,
                    Ability::Overgrowth,
                    AbilityState::Timed {
                        expires_at: tick + OVERGROWTH_TICKS,
                    },
                );
            }
            debug!(tick, "overgrowth activated");
        }

        if self.plots.is_empty() {
            return Ok(());
        }

        let workers = self.workers.len() as u64;
        for (slot, worker) in self.workers.iter().enumerate() {
            let index = usize::try_from((tick * workers + slot as u64) % self.plots.len() as u64)
                .unwrap_or_default();
            let plot = &self.plots[index];
            let Some(state) = self.host.world.node(plot.location).cloned() else {
                continue;
            };
            let node = ResourceNode::new(plot.location, state);

            let result = {
                let (mut gate, mut ports) = self.host.split();
                self.harvester
                    .resolve_harvest(&worker.actor, &node, &mut gate, &mut ports)
                    .with_context(|| format!("resolving {} at {}", node.state.resource, node.location))?
            };

            result.apply(&mut self.host.world, plot.location);
            if result.is_granted() && result.transition == NodeTransition::Unchanged {
                break_plot(&self.harvester, &mut self.host.world, plot);
            }
            self.summary.record(&result);
        }

        let reports = self.harvester.advance(&mut self.host.world);
        self.summary.record_reports(&reports);
        Ok(())
    }

    /// Puts natural nodes back on every empty plot.
    fn regrow(&mut self) {
        for plot in &self.plots {
            if self.host.world.node(plot.location).is_none() {
                for offset in 0..plot.height {
                    self.host
                        .world
                        .insert(plot.location.above(offset), NodeState::new(plot.resource.clone()));
                }
            }
        }
    }
}

/// Removes a harvested plot the way the host's own break handling would.
fn break_plot(harvester: &Harvester, world: &mut dyn WorldPort, plot: &Plot) {
    let bulk = harvester
        .catalog()
        .lookup(&plot.resource)
        .is_some_and(|d| d.yield_kind == YieldKind::Bulk);
    let height = if bulk { plot.height } else { 1 };
    for offset in 0..height {
        world.remove_node(plot.location.above(offset));
    }
}

/// Logs the summary at info level.
pub fn log_summary(summary: &SimSummary) {
    info!(
        ticks = summary.ticks,
        harvests = summary.harvests,
        granted = summary.granted,
        no_yield = summary.no_yield,
        treasures = summary.treasures,
        conversions_applied = summary.conversions_applied,
        conversions_skipped = summary.conversions_skipped,
        "simulation finished"
    );
    for (reason, count) in &summary.denied {
        info!(reason, count, "denied");
    }
}
