//! Host collaborators consumed by the resolver.
//!
//! The resolver never reaches into global state: everything it needs from the
//! host arrives through these traits, bundled per call in [`Ports`]. Hosts
//! implement them over their real world, inventory, permission and
//! progression systems; [`memory`](crate::memory) provides in-memory versions.
//!
//! # Invariants
//!
//! - Every call happens on the host's single update thread
//! - `InventoryPort::remove` and the `WorldPort` mutators are atomic from the
//!   resolver's point of view
//! - `MessagePort::notify` never influences control flow

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::catalog::YieldDescriptor;
use crate::model::{ActorId, ItemId, Location, NodeState, ResourceType, Skill};

bitflags! {
    /// Named capabilities checked through the [`PermissionOracle`].
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Capabilities: u8 {
        /// Use the long-duration ability for conversions.
        const OVERGROWTH = 1 << 0;
        /// Receive double drops.
        const DOUBLE_DROPS = 1 << 1;
        /// Roll for treasure with a luck tool.
        const FORAGERS_LUCK = 1 << 2;
        /// Attempt tool-gated conversions.
        const CONVERSION = 1 << 3;
        /// Roll the chance-gated minor conversion abilities.
        const MINOR_ABILITY = 1 << 4;
    }
}

/// Message keys passed to [`MessagePort::notify`].
pub mod messages {
    /// The actor lacks a consumable; argument: the missing item.
    pub const NEED_MORE: &str = "herbalism.conversion.need_more";
    /// A treasure was found; argument: the treasure item.
    pub const LUCK_FOUND: &str = "herbalism.luck.found";
}

/// Permission lookup.
pub trait PermissionOracle {
    /// Whether `actor` holds every capability in `capability`.
    fn allowed(&self, actor: ActorId, capability: Capabilities) -> bool;
}

/// Actor inventories.
pub trait InventoryPort {
    /// Units of `item` the actor holds.
    fn count(&self, actor: ActorId, item: &ItemId) -> u32;

    /// Whether the actor holds at least `count` units of `item`.
    fn has(&self, actor: ActorId, item: &ItemId, count: u32) -> bool {
        self.count(actor, item) >= count
    }

    /// Removes `count` units of `item`. Returns `false` and removes nothing
    /// when fewer are held.
    fn remove(&mut self, actor: ActorId, item: &ItemId, count: u32) -> bool;
}

/// World queries and mutations.
pub trait WorldPort {
    /// Current state of the node at `location`, if one exists.
    fn node_at(&self, location: Location) -> Option<NodeState>;

    /// Height of the stack of same-type natural nodes starting at `location`.
    fn stack_height_at(&self, location: Location) -> u32;

    /// Replaces the node state at `location`.
    fn set_node_state(&mut self, location: Location, state: NodeState);

    /// Removes the node at `location`.
    fn remove_node(&mut self, location: Location);

    /// Spawns `count` units of `item` at `location`.
    fn drop_items(&mut self, location: Location, item: &ItemId, count: u32);
}

/// Localized, fire-and-forget actor notifications.
pub trait MessagePort {
    /// Sends `key` with `args` to `actor`.
    fn notify(&mut self, actor: ActorId, key: &str, args: &[String]);
}

/// Experience accounting.
pub trait ProgressionPort {
    /// Adds `amount` experience in `skill` to `actor`.
    fn grant_xp(&mut self, actor: ActorId, skill: Skill, amount: u32);
}

/// Descriptors for resource types registered outside the catalog (mods).
pub trait ExternalRegistry {
    /// Descriptor for `resource`, if the host knows one.
    fn descriptor(&self, resource: &ResourceType) -> Option<YieldDescriptor>;
}

/// Registry for hosts without externally registered resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExternalRegistry;

impl ExternalRegistry for NoExternalRegistry {
    fn descriptor(&self, _resource: &ResourceType) -> Option<YieldDescriptor> {
        None
    }
}

/// The host collaborators handed to one resolution call.
pub struct Ports<'a> {
    /// Permission lookup.
    pub permissions: &'a dyn PermissionOracle,
    /// World access.
    pub world: &'a mut dyn WorldPort,
    /// Actor notifications.
    pub messages: &'a mut dyn MessagePort,
    /// Experience accounting.
    pub progression: &'a mut dyn ProgressionPort,
    /// Fallback descriptors for unknown resource types.
    pub registry: &'a dyn ExternalRegistry,
}

impl std::fmt::Debug for Ports<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ports").finish_non_exhaustive()
    }
}
