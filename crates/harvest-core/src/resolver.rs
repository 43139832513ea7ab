//! The harvest resolver.
//!
//! [`Harvester::resolve_harvest`] runs one pass of the resolution state
//! machine:
//!
//! 1. **Classify**: catalog, then external registry, then `NoYield`. The
//!    descriptor is turned into a [`Category`] once.
//! 2. **Branch** on the category (bulk, conversion, one-shot, standard).
//! 3. **Double drops** for granted results that produced a drop. Fixed and
//!    bulk drops double; ranged unit drops draw a bonus within the range.
//! 4. **Experience** through the progression port.
//!
//! # Invariants
//!
//! - A `ResolveError` is returned before anything is mutated
//! - Consumables are removed only once the conversion is certain to succeed
//! - Conversions are scheduled, never applied inside the call
//! - No double-drop roll happens unless the result is granted with a drop

use std::borrow::Cow;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::catalog::{ConversionRule, ConversionTarget, ResourceCatalog, YieldDescriptor, YieldKind};
use crate::chance::ChanceModel;
use crate::config::HarvestConfig;
use crate::error::{ConfigError, DescriptorError, ResolveError};
use crate::gate::{Ability, AbilityGate};
use crate::model::{Actor, ItemStack, NodeFlags, NodeState, ResourceNode, Skill};
use crate::outcome::{ItemDrop, MissReason, NodeTransition, ResolutionResult};
use crate::ports::{messages, Capabilities, Ports, WorldPort};
use crate::scheduler::{ConversionTask, Scheduler, TaskReport};

/// Resolution path chosen for a descriptor, carrying only what the branch needs.
#[derive(Debug)]
enum Category<'d> {
    Bulk,
    Conversion(&'d ConversionRule),
    OneShot(&'d [ItemStack]),
    Standard,
}

/// Resolves harvests against a shared catalog.
///
/// Owns the random source and the deferred-conversion queue. The host calls
/// [`resolve_harvest`](Self::resolve_harvest) for each harvest and
/// [`advance`](Self::advance) once per tick.
#[derive(Debug)]
pub struct Harvester {
    catalog: Arc<ResourceCatalog>,
    config: HarvestConfig,
    chance: ChanceModel,
    scheduler: Scheduler,
}

impl Harvester {
    /// Creates a resolver. Seeds the random source from `config.seed`, or from
    /// entropy when it is unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration does not validate.
    pub fn new(catalog: Arc<ResourceCatalog>, config: HarvestConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let chance = config
            .seed
            .map_or_else(ChanceModel::from_entropy, ChanceModel::from_seed);
        Ok(Self {
            catalog,
            config,
            chance,
            scheduler: Scheduler::new(),
        })
    }

    /// The shared catalog.
    #[must_use]
    pub fn catalog(&self) -> &ResourceCatalog {
        &self.catalog
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// The deferred-conversion queue.
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Mutable access to the queue, for cancellation on disconnect.
    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// Runs the conversions due this tick. Call once per host tick, after the
    /// tick's harvests.
    pub fn advance(&mut self, world: &mut dyn WorldPort) -> Vec<TaskReport> {
        self.scheduler.advance(world)
    }

    /// Food restoration modifier from the diet ranks.
    ///
    /// Adds one to `base_modifier` per rank threshold the actor has reached,
    /// starting at `diet.rank_base_level` and stepping by `rank_delta` up to
    /// `diet.max_level`.
    #[must_use]
    pub fn ability_activation_modifier(&self, actor: &Actor, rank_delta: u32, base_modifier: i32) -> i32 {
        if rank_delta == 0 {
            return base_modifier;
        }
        let diet = self.config.diet;
        let step = usize::try_from(rank_delta).unwrap_or(usize::MAX);
        let ranks = (diet.rank_base_level..=diet.max_level)
            .step_by(step)
            .take_while(|threshold| actor.skill_level >= *threshold)
            .count();
        base_modifier.saturating_add(i32::try_from(ranks).unwrap_or(i32::MAX))
    }

    /// Resolves one harvest of `node` by `actor`.
    ///
    /// Rule and chance misses are `Ok` results with
    /// [`Outcome::Denied`](crate::outcome::Outcome::Denied).
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Descriptor`] when the external registry supplies
    /// an unusable descriptor. Nothing is mutated in that case.
    pub fn resolve_harvest(
        &mut self,
        actor: &Actor,
        node: &ResourceNode,
        gate: &mut dyn AbilityGate,
        ports: &mut Ports<'_>,
    ) -> Result<ResolutionResult, ResolveError> {
        if self.config.skip_while_mounted && actor.mounted {
            debug!(actor = %actor.id, "harvest skipped: mounted");
            return Ok(ResolutionResult::denied(MissReason::Mounted));
        }

        let catalog = Arc::clone(&self.catalog);
        let Some(descriptor) = Self::descriptor_for(&catalog, node, ports)? else {
            debug!(resource = %node.state.resource, "no yield descriptor");
            return Ok(ResolutionResult::no_yield());
        };

        let category = Self::classify(&catalog, &descriptor, actor, gate, ports);
        debug!(
            actor = %actor.id,
            resource = %node.state.resource,
            ?category,
            "harvest classified"
        );

        let mut result = match category {
            Category::Bulk => Self::resolve_bulk(&descriptor, node, ports),
            Category::Conversion(rule) => self.resolve_conversion(&descriptor, rule, actor, node, gate, ports),
            Category::OneShot(pool) => match self.resolve_one_shot(&descriptor, pool, actor, node, ports) {
                Some(result) => result,
                None => Self::resolve_standard(&descriptor, node),
            },
            Category::Standard => Self::resolve_standard(&descriptor, node),
        };

        self.apply_double_drops(&descriptor, actor, &mut result, ports);

        if result.is_granted() && result.xp > 0 {
            ports.progression.grant_xp(actor.id, Skill::Herbalism, result.xp);
        }
        Ok(result)
    }

    // =========================================================================
    // Classify
    // =========================================================================

    fn descriptor_for<'c>(
        catalog: &'c ResourceCatalog,
        node: &ResourceNode,
        ports: &Ports<'_>,
    ) -> Result<Option<Cow<'c, YieldDescriptor>>, ResolveError> {
        if let Some(descriptor) = catalog.lookup(&node.state.resource) {
            return Ok(Some(Cow::Borrowed(descriptor)));
        }
        let Some(descriptor) = ports.registry.descriptor(&node.state.resource) else {
            return Ok(None);
        };

        let checked = descriptor.validate().and_then(|()| match &descriptor.treasure_pool {
            Some(pool) if catalog.treasure_pool(pool).is_none() => {
                Err(DescriptorError::UnknownTreasurePool {
                    resource: descriptor.resource.clone(),
                    pool: pool.clone(),
                })
            }
            _ => Ok(()),
        })
        .and_then(|()| match &descriptor.conversion {
            Some(ConversionRule {
                into: ConversionTarget::Transform { resource: target },
                ..
            }) if catalog.lookup(target).is_none() && ports.registry.descriptor(target).is_none() => {
                Err(DescriptorError::UnknownConversionTarget {
                    resource: descriptor.resource.clone(),
                    target: target.clone(),
                })
            }
            _ => Ok(()),
        });
        if let Err(err) = checked {
            warn!(resource = %node.state.resource, error = %err, "external descriptor rejected");
            return Err(err.into());
        }
        Ok(Some(Cow::Owned(descriptor)))
    }

    fn classify<'d>(
        catalog: &'d ResourceCatalog,
        descriptor: &'d YieldDescriptor,
        actor: &Actor,
        gate: &dyn AbilityGate,
        ports: &Ports<'_>,
    ) -> Category<'d> {
        if descriptor.yield_kind == YieldKind::Bulk {
            return Category::Bulk;
        }

        if let Some(rule) = &descriptor.conversion {
            if gate.has_required_tool(actor, &rule.tool)
                && ports.permissions.allowed(actor.id, Capabilities::CONVERSION)
            {
                return Category::Conversion(rule);
            }
        }

        if let Some(pool) = descriptor
            .treasure_pool
            .as_deref()
            .and_then(|name| catalog.treasure_pool(name))
        {
            if gate.has_required_tool(actor, catalog.luck_tool())
                && ports.permissions.allowed(actor.id, Capabilities::FORAGERS_LUCK)
            {
                return Category::OneShot(pool);
            }
        }

        Category::Standard
    }

    // =========================================================================
    // Branches
    // =========================================================================

    fn resolve_bulk(descriptor: &YieldDescriptor, node: &ResourceNode, ports: &Ports<'_>) -> ResolutionResult {
        let height = ports.world.stack_height_at(node.location);
        if height == 0 {
            return ResolutionResult::denied(MissReason::EmptyStack);
        }
        ResolutionResult::granted(
            Some(ItemDrop::new(descriptor.drop.clone(), height)),
            descriptor.xp.saturating_mul(height),
            NodeTransition::Unchanged,
        )
    }

    fn resolve_conversion(
        &mut self,
        descriptor: &YieldDescriptor,
        rule: &ConversionRule,
        actor: &Actor,
        node: &ResourceNode,
        gate: &mut dyn AbilityGate,
        ports: &mut Ports<'_>,
    ) -> ResolutionResult {
        if let Some(missing) = gate.first_missing(actor.id, &rule.consumables) {
            ports
                .messages
                .notify(actor.id, messages::NEED_MORE, &[missing.item.to_string()]);
            return ResolutionResult::denied(MissReason::NeedMore);
        }

        let overgrowth = gate.is_ability_active(actor.id, Ability::Overgrowth)
            && ports.permissions.allowed(actor.id, Capabilities::OVERGROWTH);

        let stage = if overgrowth {
            self.config.overgrowth_stage
        } else {
            if !ports.permissions.allowed(actor.id, Capabilities::MINOR_ABILITY) {
                return ResolutionResult::denied(MissReason::NotPermitted);
            }
            let curve = self.config.curve(rule.ability);
            if !self.chance.activation(actor.level(), curve).success {
                return ResolutionResult::denied(MissReason::ChanceMiss);
            }
            self.config.replant_stage(actor.skill_level)
        };

        if let Err(missing) = gate.consume_all(actor.id, &rule.consumables) {
            ports
                .messages
                .notify(actor.id, messages::NEED_MORE, &[missing.item.to_string()]);
            return ResolutionResult::denied(MissReason::NeedMore);
        }
        if overgrowth {
            gate.spend(actor.id, Ability::Overgrowth);
        }

        let into = match &rule.into {
            ConversionTarget::Replant => NodeState::new(node.state.resource.clone()).with_stage(stage),
            ConversionTarget::Transform { resource } => NodeState::new(resource.clone()),
        };
        let delay = self.config.conversion_delay_ticks;
        let task = self.scheduler.schedule(
            delay,
            ConversionTask {
                actor: actor.id,
                location: node.location,
                expected: node.state.resource.clone(),
                into: into.clone(),
            },
        );

        ResolutionResult::granted(
            Some(ItemDrop::new(descriptor.drop.clone(), descriptor.min_drop)),
            descriptor.xp,
            NodeTransition::ConvertDeferred { task, into, delay },
        )
    }

    /// `None` means the luck roll missed and the standard path applies.
    fn resolve_one_shot(
        &mut self,
        descriptor: &YieldDescriptor,
        pool: &[ItemStack],
        actor: &Actor,
        node: &ResourceNode,
        ports: &mut Ports<'_>,
    ) -> Option<ResolutionResult> {
        if descriptor.tracks_claims && node.state.is_placed() {
            let mut reset = node.state.clone();
            reset.flags.remove(NodeFlags::PLACED);
            ports.world.set_node_state(node.location, reset);
            return Some(ResolutionResult::denied(MissReason::AlreadyClaimed));
        }

        if !self
            .chance
            .activation(actor.level(), &self.config.foragers_luck)
            .success
        {
            return None;
        }
        let treasure = self
            .chance
            .pick(pool.len())
            .and_then(|index| pool.get(index))
            .cloned()?;

        ports
            .messages
            .notify(actor.id, messages::LUCK_FOUND, &[treasure.item.to_string()]);
        let mut result = ResolutionResult::granted(None, 0, NodeTransition::Remove);
        result.treasure = Some(treasure);
        Some(result)
    }

    fn resolve_standard(descriptor: &YieldDescriptor, node: &ResourceNode) -> ResolutionResult {
        if node.state.is_placed() {
            return ResolutionResult::denied(MissReason::PlayerPlaced);
        }
        ResolutionResult::granted(
            Some(ItemDrop::new(descriptor.drop.clone(), descriptor.min_drop)),
            descriptor.xp,
            NodeTransition::Unchanged,
        )
    }

    // =========================================================================
    // Overlay
    // =========================================================================

    fn apply_double_drops(
        &mut self,
        descriptor: &YieldDescriptor,
        actor: &Actor,
        result: &mut ResolutionResult,
        ports: &Ports<'_>,
    ) {
        if !result.is_granted() || !descriptor.double_drops {
            return;
        }
        let Some(drop) = result.drop.as_mut() else {
            return;
        };
        if !ports.permissions.allowed(actor.id, Capabilities::DOUBLE_DROPS) {
            return;
        }
        if !self
            .chance
            .activation(actor.level(), &self.config.double_drops)
            .success
        {
            return;
        }

        drop.bonus = if descriptor.yield_kind == YieldKind::Unit && descriptor.has_range() {
            self.chance
                .range_inclusive(0, descriptor.max_drop - descriptor.min_drop)
        } else {
            drop.base
        };
        debug!(actor = %actor.id, bonus = drop.bonus, "double drop");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chance::ChanceCurve;
    use crate::memory::MemoryHost;
    use crate::model::{ActorId, Location};

    fn harvester(config: HarvestConfig) -> Harvester {
        let catalog = Arc::new(ResourceCatalog::builtin().unwrap());
        Harvester::new(catalog, config).unwrap()
    }

    fn seeded() -> HarvestConfig {
        HarvestConfig {
            seed: Some(1),
            ..HarvestConfig::default()
        }
    }

    mod modifier_tests {
        use super::*;

        #[test]
        fn diet_ranks_add_one_each() {
            let harvester = harvester(seeded());
            let novice = Actor::new(ActorId::new(1), 100);
            let adept = Actor::new(ActorId::new(1), 450);
            let master = Actor::new(ActorId::new(1), 5000);

            assert_eq!(harvester.ability_activation_modifier(&novice, 200, 3), 3);
            // Thresholds 200 and 400.
            assert_eq!(harvester.ability_activation_modifier(&adept, 200, 3), 5);
            // Thresholds 200, 400, 600, 800 and 1000.
            assert_eq!(harvester.ability_activation_modifier(&master, 200, 3), 8);
        }

        #[test]
        fn zero_rank_delta_keeps_base() {
            let harvester = harvester(seeded());
            let actor = Actor::new(ActorId::new(1), 900);
            assert_eq!(harvester.ability_activation_modifier(&actor, 0, 4), 4);
        }
    }

    mod construction_tests {
        use super::*;

        #[test]
        fn invalid_config_rejected() {
            let catalog = Arc::new(ResourceCatalog::builtin().unwrap());
            let config = HarvestConfig {
                double_drops: ChanceCurve::new(0.9, 0.1, 100),
                ..HarvestConfig::default()
            };
            assert!(matches!(
                Harvester::new(catalog, config),
                Err(ConfigError::InvalidCurve { name: "double_drops" })
            ));
        }

        #[test]
        fn seed_is_kept() {
            let harvester = harvester(seeded());
            assert_eq!(harvester.config().seed, Some(1));
            assert!(harvester.scheduler().is_empty());
            assert!(!harvester.catalog().is_empty());
        }
    }

    mod mounted_tests {
        use super::*;

        #[test]
        fn mounted_actor_is_denied_before_lookup() {
            let mut harvester = harvester(seeded());
            let mut host = MemoryHost::permissive();
            let actor = Actor::new(ActorId::new(1), 100).mounted(true);
            let node = ResourceNode::new(Location::new(0, 0, 0), NodeState::new("unknown_plant"));

            let (mut gate, mut ports) = host.split();
            let result = harvester
                .resolve_harvest(&actor, &node, &mut gate, &mut ports)
                .unwrap();
            assert_eq!(result.miss_reason(), Some(MissReason::Mounted));
        }

        #[test]
        fn mounted_harvest_allowed_when_disabled() {
            let mut harvester = harvester(HarvestConfig {
                skip_while_mounted: false,
                ..seeded()
            });
            let mut host = MemoryHost::permissive();
            let actor = Actor::new(ActorId::new(1), 100).mounted(true);
            let node = ResourceNode::new(Location::new(0, 0, 0), NodeState::new("pumpkin"));

            let (mut gate, mut ports) = host.split();
            let result = harvester
                .resolve_harvest(&actor, &node, &mut gate, &mut ports)
                .unwrap();
            assert!(result.is_granted());
        }
    }
}
