//! In-memory host.
//!
//! Plain-collection implementations of every port, used by the `harvest-sim`
//! driver and by tests. [`MemoryHost`] bundles them and hands out the gate and
//! ports for one resolution call.

use std::collections::{BTreeMap, HashMap};

use crate::catalog::YieldDescriptor;
use crate::gate::{AbilityTable, InventoryGate};
use crate::model::{ActorId, ItemId, ItemStack, Location, NodeState, ResourceType, Skill};
use crate::ports::{
    Capabilities, ExternalRegistry, InventoryPort, MessagePort, PermissionOracle, Ports,
    ProgressionPort, WorldPort,
};

/// Highest stack walked by [`MemoryWorld::stack_height_at`].
const MAX_STACK_HEIGHT: i32 = 256;

// =============================================================================
// World
// =============================================================================

/// Sparse block map plus a log of spawned items.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorld {
    nodes: BTreeMap<Location, NodeState>,
    drops: Vec<(Location, ItemStack)>,
}

impl MemoryWorld {
    /// Places `state` at `location`, replacing whatever was there.
    pub fn insert(&mut self, location: Location, state: NodeState) {
        self.nodes.insert(location, state);
    }

    /// Node at `location`.
    #[must_use]
    pub fn node(&self, location: Location) -> Option<&NodeState> {
        self.nodes.get(&location)
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the world has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every spawned stack, in spawn order.
    #[must_use]
    pub fn drops(&self) -> &[(Location, ItemStack)] {
        &self.drops
    }

    /// Total units of `item` spawned anywhere.
    #[must_use]
    pub fn dropped(&self, item: &ItemId) -> u32 {
        self.drops
            .iter()
            .filter(|(_, stack)| &stack.item == item)
            .map(|(_, stack)| stack.amount)
            .sum()
    }

    /// Forgets every spawned stack.
    pub fn clear_drops(&mut self) {
        self.drops.clear();
    }
}

impl WorldPort for MemoryWorld {
    fn node_at(&self, location: Location) -> Option<NodeState> {
        self.nodes.get(&location).cloned()
    }

    fn stack_height_at(&self, location: Location) -> u32 {
        let Some(base) = self.nodes.get(&location) else {
            return 0;
        };

        // Placed segments do not count but do not end the stack either.
        let mut height = 0;
        for offset in 0..MAX_STACK_HEIGHT {
            match self.nodes.get(&location.above(offset)) {
                Some(node) if node.resource == base.resource => {
                    if !node.is_placed() {
                        height += 1;
                    }
                }
                _ => break,
            }
        }
        height
    }

    fn set_node_state(&mut self, location: Location, state: NodeState) {
        self.nodes.insert(location, state);
    }

    fn remove_node(&mut self, location: Location) {
        self.nodes.remove(&location);
    }

    fn drop_items(&mut self, location: Location, item: &ItemId, count: u32) {
        if count > 0 {
            self.drops.push((location, ItemStack::new(item.clone(), count)));
        }
    }
}

// =============================================================================
// Inventory
// =============================================================================

/// Per-actor item counts.
#[derive(Debug, Clone, Default)]
pub struct MemoryInventory {
    items: BTreeMap<(ActorId, ItemId), u32>,
}

impl MemoryInventory {
    /// Adds `amount` units of `item` to the actor's inventory.
    pub fn give(&mut self, actor: ActorId, item: impl Into<ItemId>, amount: u32) {
        let slot = self.items.entry((actor, item.into())).or_insert(0);
        *slot = slot.saturating_add(amount);
    }
}

impl InventoryPort for MemoryInventory {
    fn count(&self, actor: ActorId, item: &ItemId) -> u32 {
        self.items.get(&(actor, item.clone())).copied().unwrap_or(0)
    }

    fn remove(&mut self, actor: ActorId, item: &ItemId, count: u32) -> bool {
        let key = (actor, item.clone());
        match self.items.get_mut(&key) {
            Some(held) if *held >= count => {
                *held -= count;
                if *held == 0 {
                    self.items.remove(&key);
                }
                true
            }
            None if count == 0 => true,
            _ => false,
        }
    }
}

// =============================================================================
// Permissions, Messages, Progression, Registry
// =============================================================================

/// Fixed capability grants with a fallback for unlisted actors.
#[derive(Debug, Clone, Default)]
pub struct StaticPermissions {
    fallback: Capabilities,
    grants: BTreeMap<ActorId, Capabilities>,
}

impl StaticPermissions {
    /// Every actor holds every capability.
    #[must_use]
    pub fn all() -> Self {
        Self {
            fallback: Capabilities::all(),
            grants: BTreeMap::new(),
        }
    }

    /// No actor holds anything unless granted.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Sets the exact capabilities of `actor`.
    pub fn grant(&mut self, actor: ActorId, capabilities: Capabilities) {
        self.grants.insert(actor, capabilities);
    }
}

impl PermissionOracle for StaticPermissions {
    fn allowed(&self, actor: ActorId, capability: Capabilities) -> bool {
        self.grants
            .get(&actor)
            .copied()
            .unwrap_or(self.fallback)
            .contains(capability)
    }
}

/// One delivered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Recipient.
    pub actor: ActorId,
    /// Message key.
    pub key: String,
    /// Format arguments.
    pub args: Vec<String>,
}

/// Records notifications instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    notifications: Vec<Notification>,
}

impl MessageLog {
    /// Everything sent so far, in order.
    #[must_use]
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Notifications with `key`.
    pub fn with_key<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Notification> + 'a {
        self.notifications.iter().filter(move |n| n.key == key)
    }
}

impl MessagePort for MessageLog {
    fn notify(&mut self, actor: ActorId, key: &str, args: &[String]) {
        self.notifications.push(Notification {
            actor,
            key: key.to_string(),
            args: args.to_vec(),
        });
    }
}

/// Experience totals per actor and skill.
#[derive(Debug, Clone, Default)]
pub struct XpLedger {
    totals: BTreeMap<(ActorId, Skill), u64>,
    grants: usize,
}

impl XpLedger {
    /// Total experience of `actor` in `skill`.
    #[must_use]
    pub fn total(&self, actor: ActorId, skill: Skill) -> u64 {
        self.totals.get(&(actor, skill)).copied().unwrap_or(0)
    }

    /// Number of `grant_xp` calls received.
    #[must_use]
    pub fn grants(&self) -> usize {
        self.grants
    }
}

impl ProgressionPort for XpLedger {
    fn grant_xp(&mut self, actor: ActorId, skill: Skill, amount: u32) {
        *self.totals.entry((actor, skill)).or_insert(0) += u64::from(amount);
        self.grants += 1;
    }
}

/// External registry backed by a map.
#[derive(Debug, Clone, Default)]
pub struct MapRegistry {
    descriptors: HashMap<ResourceType, YieldDescriptor>,
}

impl MapRegistry {
    /// Registers `descriptor` under its own resource type.
    pub fn insert(&mut self, descriptor: YieldDescriptor) {
        self.descriptors.insert(descriptor.resource.clone(), descriptor);
    }
}

impl ExternalRegistry for MapRegistry {
    fn descriptor(&self, resource: &ResourceType) -> Option<YieldDescriptor> {
        self.descriptors.get(resource).cloned()
    }
}

// =============================================================================
// Host
// =============================================================================

/// Every in-memory collaborator in one place.
#[derive(Debug, Default)]
pub struct MemoryHost {
    /// Blocks and spawned items.
    pub world: MemoryWorld,
    /// Actor inventories.
    pub inventory: MemoryInventory,
    /// Active abilities.
    pub abilities: AbilityTable,
    /// Capability grants.
    pub permissions: StaticPermissions,
    /// Delivered notifications.
    pub messages: MessageLog,
    /// Experience totals.
    pub xp: XpLedger,
    /// Externally registered descriptors.
    pub registry: MapRegistry,
    /// Host tick used to evaluate timed abilities.
    pub now: u64,
}

impl MemoryHost {
    /// A host where every actor holds every capability.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            permissions: StaticPermissions::all(),
            ..Self::default()
        }
    }

    /// Borrows the gate and ports for one resolution call.
    pub fn split(&mut self) -> (InventoryGate<'_>, Ports<'_>) {
        let Self {
            world,
            inventory,
            abilities,
            permissions,
            messages,
            xp,
            registry,
            now,
        } = self;

        let gate = InventoryGate::new(abilities, inventory, *now);
        let ports = Ports {
            permissions: &*permissions,
            world,
            messages,
            progression: xp,
            registry: &*registry,
        };
        (gate, ports)
    }
}
