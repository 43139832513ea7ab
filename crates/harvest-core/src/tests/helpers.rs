//! Test setup helpers.

use std::sync::Arc;

use crate::catalog::{ResourceCatalog, ToolRequirement};
use crate::chance::ChanceCurve;
use crate::config::HarvestConfig;
use crate::gate::{Ability, AbilityGate, ConsumeResult};
use crate::memory::MemoryHost;
use crate::model::{Actor, ActorId, ItemId, ItemStack, Location, NodeState, ResourceNode};
use crate::outcome::ResolutionResult;
use crate::resolver::Harvester;

pub const ACTOR: ActorId = ActorId::new(1);

/// A small catalog with one entry per category, independent of the builtin
/// data file.
const TEST_CATALOG: &str = r#"{
    "items": ["reed", "grain", "seeds", "hoe", "berry", "stick", "iron_sword", "emerald", "apple"],
    "luck_tool": { "any_of": ["iron_sword"] },
    "treasure_pools": {
        "shrubs": [{ "item": "emerald", "amount": 1 }, { "item": "apple", "amount": 2 }]
    },
    "resources": [
        { "resource": "reed", "drop": "reed", "xp": 5, "yield_kind": "bulk" },
        {
            "resource": "grain", "drop": "grain", "xp": 50, "double_drops": true,
            "conversion": {
                "tool": { "any_of": ["hoe"] },
                "consumables": [{ "item": "seeds", "amount": 1 }],
                "ability": "replant",
                "into": { "kind": "replant" }
            }
        },
        { "resource": "berry_bush", "drop": "berry", "xp": 10, "double_drops": true },
        { "resource": "shrub", "drop": "stick", "xp": 30, "treasure_pool": "shrubs", "tracks_claims": true },
        { "resource": "bramble", "drop": "stick", "xp": 30, "treasure_pool": "shrubs" }
    ]
}"#;

// =============================================================================
// Catalogs and Configs
// =============================================================================

/// The catalog shipped with the crate.
pub fn builtin_catalog() -> Arc<ResourceCatalog> {
    Arc::new(ResourceCatalog::builtin().unwrap())
}

/// The small per-category test catalog.
pub fn test_catalog() -> Arc<ResourceCatalog> {
    Arc::new(ResourceCatalog::from_json_str(TEST_CATALOG).unwrap())
}

/// Seeded config where every roll succeeds.
pub fn always_config(seed: u64) -> HarvestConfig {
    HarvestConfig {
        seed: Some(seed),
        double_drops: ChanceCurve::always(),
        replant: ChanceCurve::always(),
        mossify: ChanceCurve::always(),
        sporecraft: ChanceCurve::always(),
        foragers_luck: ChanceCurve::always(),
        ..HarvestConfig::default()
    }
}

/// Seeded config where every roll misses.
pub fn never_config(seed: u64) -> HarvestConfig {
    HarvestConfig {
        seed: Some(seed),
        double_drops: ChanceCurve::never(),
        replant: ChanceCurve::never(),
        mossify: ChanceCurve::never(),
        sporecraft: ChanceCurve::never(),
        foragers_luck: ChanceCurve::never(),
        ..HarvestConfig::default()
    }
}

pub fn harvester(catalog: Arc<ResourceCatalog>, config: HarvestConfig) -> Harvester {
    Harvester::new(catalog, config).unwrap()
}

// =============================================================================
// World Setup
// =============================================================================

/// Places a natural node in the host world and returns its harvest view.
pub fn place(host: &mut MemoryHost, location: Location, resource: &str) -> ResourceNode {
    let state = NodeState::new(resource);
    host.world.insert(location, state.clone());
    ResourceNode::new(location, state)
}

/// Places a node with the given state and returns its harvest view.
pub fn place_state(host: &mut MemoryHost, location: Location, state: NodeState) -> ResourceNode {
    host.world.insert(location, state.clone());
    ResourceNode::new(location, state)
}

/// Re-reads the node at `location` the way a host would before a harvest.
pub fn observe(host: &MemoryHost, location: Location) -> ResourceNode {
    let state = host.world.node(location).cloned().unwrap();
    ResourceNode::new(location, state)
}

/// Stacks `height` natural nodes of `resource` upwards from `base`.
pub fn stack(host: &mut MemoryHost, base: Location, resource: &str, height: i32) -> ResourceNode {
    for offset in 0..height {
        host.world.insert(base.above(offset), NodeState::new(resource));
    }
    ResourceNode::new(base, NodeState::new(resource))
}

// =============================================================================
// Resolution
// =============================================================================

/// Resolves through the host's own gate and ports.
pub fn resolve(
    harvester: &mut Harvester,
    host: &mut MemoryHost,
    actor: &Actor,
    node: &ResourceNode,
) -> ResolutionResult {
    let (mut gate, mut ports) = host.split();
    harvester
        .resolve_harvest(actor, node, &mut gate, &mut ports)
        .unwrap()
}

/// Resolves with a gate that fails the test if it is consulted at all.
pub fn resolve_ungated(
    harvester: &mut Harvester,
    host: &mut MemoryHost,
    actor: &Actor,
    node: &ResourceNode,
) -> ResolutionResult {
    let (_gate, mut ports) = host.split();
    harvester
        .resolve_harvest(actor, node, &mut UntouchableGate, &mut ports)
        .unwrap()
}

/// Gate that panics on use.
pub struct UntouchableGate;

impl AbilityGate for UntouchableGate {
    fn is_ability_active(&self, _actor: ActorId, _ability: Ability) -> bool {
        panic!("ability state consulted")
    }

    fn has_required_tool(&self, _actor: &Actor, _tool: &ToolRequirement) -> bool {
        panic!("tool consulted")
    }

    fn first_missing(&self, _actor: ActorId, _stacks: &[ItemStack]) -> Option<ItemStack> {
        panic!("consumables consulted")
    }

    fn consume_required_consumable(
        &mut self,
        _actor: ActorId,
        _item: &ItemId,
        _count: u32,
    ) -> ConsumeResult {
        panic!("consumable taken")
    }

    fn consume_all(&mut self, _actor: ActorId, _stacks: &[ItemStack]) -> Result<(), ItemStack> {
        panic!("consumables taken")
    }

    fn spend(&mut self, _actor: ActorId, _ability: Ability) {
        panic!("ability spent")
    }
}
