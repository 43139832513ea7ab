//! Core value types shared by every module.
//!
//! - [`ActorId`] / [`Actor`]: who is harvesting
//! - [`ItemId`] / [`ItemStack`]: items held, consumed and dropped
//! - [`ResourceType`]: catalog key for a harvestable node
//! - [`Location`], [`NodeState`], [`ResourceNode`]: the node in the world
//!
//! # Example
//!
//! ```
//! use harvest_core::model::{Location, NodeFlags, NodeState, ResourceNode};
//!
//! let node = ResourceNode::new(
//!     Location::new(4, 64, -2),
//!     NodeState::new("poppy").with_flags(NodeFlags::PLACED),
//! );
//!
//! assert!(node.state.is_placed());
//! assert_eq!(node.state.resource.as_str(), "poppy");
//! ```

use std::fmt;

use bitflags::bitflags;
use glam::IVec3;
use serde::{Deserialize, Serialize};

// =============================================================================
// Actors
// =============================================================================

/// Unique identifier for an actor (a connected player).
///
/// Ordered by numeric value so per-actor tables iterate deterministically.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(u64);

impl ActorId {
    /// Creates a new `ActorId` from a raw `u64` value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw `u64` value of this identifier.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActorId({})", self.0)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ActorId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

/// Snapshot of an actor taken for a single resolution.
///
/// The progression system owns the real profile; the resolver only reads this
/// snapshot. Active abilities live in the [`AbilityTable`](crate::gate::AbilityTable)
/// and are queried through the [`AbilityGate`](crate::gate::AbilityGate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Actor identity.
    pub id: ActorId,
    /// Accumulated herbalism skill level.
    pub skill_level: u32,
    /// Item in the actor's main hand, if any.
    pub held_item: Option<ItemId>,
    /// Whether the actor is riding a vehicle or mount.
    pub mounted: bool,
}

impl Actor {
    /// Creates an empty-handed, unmounted actor at the given skill level.
    #[must_use]
    pub fn new(id: ActorId, skill_level: u32) -> Self {
        Self {
            id,
            skill_level,
            held_item: None,
            mounted: false,
        }
    }

    /// Returns the actor holding `item` in hand.
    #[must_use]
    pub fn holding(mut self, item: impl Into<ItemId>) -> Self {
        self.held_item = Some(item.into());
        self
    }

    /// Returns the actor with the mounted flag set.
    #[must_use]
    pub fn mounted(mut self, mounted: bool) -> Self {
        self.mounted = mounted;
        self
    }

    /// Skill level as a signed value for chance curve evaluation.
    #[must_use]
    pub fn level(&self) -> i64 {
        i64::from(self.skill_level)
    }
}

/// Skills that can receive experience from a resolution.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Skill {
    /// Gathering plants, fungi and flowers.
    Herbalism,
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Herbalism => write!(f, "herbalism"),
        }
    }
}

// =============================================================================
// Items and resources
// =============================================================================

/// Identifier of an item definition (e.g. `"seeds"`, `"iron_sword"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Creates a new `ItemId` from a string.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Returns the item ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier of a harvestable resource type (the catalog key).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceType(String);

impl ResourceType {
    /// Creates a new `ResourceType` from a string.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Returns the resource type as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ResourceType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ResourceType {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A quantity of one item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemStack {
    /// Item definition.
    pub item: ItemId,
    /// Number of units.
    pub amount: u32,
}

impl ItemStack {
    /// Creates a stack of `amount` units of `item`.
    #[must_use]
    pub fn new(item: impl Into<ItemId>, amount: u32) -> Self {
        Self {
            item: item.into(),
            amount,
        }
    }
}

impl fmt::Display for ItemStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x {}", self.amount, self.item)
    }
}

// =============================================================================
// Nodes
// =============================================================================

/// Integer block position in the world.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location(IVec3);

impl Location {
    /// Creates a location from block coordinates.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self(IVec3::new(x, y, z))
    }

    /// Returns the underlying vector.
    #[must_use]
    pub const fn as_ivec3(self) -> IVec3 {
        self.0
    }

    /// Returns the location `offset` blocks above this one.
    #[must_use]
    pub fn above(self, offset: i32) -> Self {
        Self(self.0 + IVec3::Y * offset)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.0.x, self.0.y, self.0.z)
    }
}

// Ordered by (x, y, z) so in-memory worlds iterate deterministically.
impl PartialOrd for Location {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Location {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.to_array().cmp(&other.0.to_array())
    }
}

bitflags! {
    /// State tag carried by a node.
    ///
    /// `PLACED` is set by the host for nodes that were put down by a player.
    /// The same bit doubles as the "already claimed" marker for one-shot
    /// treasure nodes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct NodeFlags: u8 {
        /// Player-placed, or already claimed for a one-shot reward.
        const PLACED = 1 << 0;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// The block state of a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeState {
    /// Resource type of the node.
    pub resource: ResourceType,
    /// Growth stage for crops; zero for everything else.
    #[serde(default)]
    pub growth_stage: u8,
    /// State tag.
    #[serde(default)]
    pub flags: NodeFlags,
}

impl NodeState {
    /// Creates a natural (unflagged) node of the given resource at stage 0.
    #[must_use]
    pub fn new(resource: impl Into<ResourceType>) -> Self {
        Self {
            resource: resource.into(),
            growth_stage: 0,
            flags: NodeFlags::empty(),
        }
    }

    /// Returns the state with the given flags.
    #[must_use]
    pub fn with_flags(mut self, flags: NodeFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Returns the state at the given growth stage.
    #[must_use]
    pub fn with_stage(mut self, stage: u8) -> Self {
        self.growth_stage = stage;
        self
    }

    /// Whether the `PLACED` tag is set.
    #[must_use]
    pub fn is_placed(&self) -> bool {
        self.flags.contains(NodeFlags::PLACED)
    }
}

/// A node being harvested: where it is and what it looked like when the
/// harvest started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceNode {
    /// Block position.
    pub location: Location,
    /// State at the time of the harvest.
    pub state: NodeState,
}

impl ResourceNode {
    /// Creates a node reference.
    #[must_use]
    pub fn new(location: Location, state: NodeState) -> Self {
        Self { location, state }
    }
}
