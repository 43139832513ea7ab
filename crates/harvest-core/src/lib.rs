//! # Harvest Core
//!
//! Outcome resolution for harvesting resource nodes in a skill-progression game.
//!
//! Given an actor's skill level, the abilities they have active, the items they
//! hold, and the node being harvested, the [`Harvester`] decides how many items
//! drop, whether a double drop fires, whether the node converts into another
//! state on a later tick, and whether a treasure is found.
//!
//! ## Architecture
//!
//! - [`chance`]: activation curves and the single shared random source
//! - [`catalog`]: resource type to yield descriptor mapping, loaded from JSON
//! - [`gate`]: ability state, tool checks and atomic consumable consumption
//! - [`resolver`]: the per-call resolution state machine
//! - [`scheduler`]: tick-delayed node conversions
//! - [`ports`]: host collaborators (world, inventory, permissions, messages, XP)
//! - [`memory`]: in-memory host used by the driver binary and tests
//!
//! The resolver never touches the host directly: it reads through [`ports`] and
//! returns a [`ResolutionResult`] that the host applies.
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//! use harvest_core::{Actor, ActorId, Harvester, HarvestConfig, ResourceCatalog};
//! use harvest_core::memory::MemoryHost;
//! use harvest_core::model::{Location, NodeState, ResourceNode};
//!
//! let catalog = Arc::new(ResourceCatalog::builtin().unwrap());
//! let config = HarvestConfig { seed: Some(42), ..HarvestConfig::default() };
//! let mut harvester = Harvester::new(catalog, config).unwrap();
//!
//! let mut host = MemoryHost::default();
//! let location = Location::new(0, 64, 0);
//! host.world.insert(location, NodeState::new("red_mushroom"));
//!
//! let actor = Actor::new(ActorId::new(1), 100);
//! let node = ResourceNode::new(location, NodeState::new("red_mushroom"));
//!
//! let (mut gate, mut ports) = host.split();
//! let result = harvester.resolve_harvest(&actor, &node, &mut gate, &mut ports).unwrap();
//! assert!(result.is_granted());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod chance;
pub mod config;
pub mod error;
pub mod gate;
pub mod memory;
pub mod model;
pub mod outcome;
pub mod ports;
pub mod resolver;
pub mod scheduler;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use catalog::{ResourceCatalog, YieldDescriptor};
pub use chance::{Activation, ChanceCurve, ChanceModel};
pub use config::HarvestConfig;
pub use error::{CatalogError, ConfigError, DescriptorError, ResolveError};
pub use gate::{Ability, AbilityGate, AbilityState, AbilityTable, InventoryGate};
pub use model::{Actor, ActorId, ItemId, ItemStack, ResourceType};
pub use outcome::{ItemDrop, MissReason, NodeTransition, Outcome, ResolutionResult};
pub use ports::{Capabilities, Ports};
pub use resolver::Harvester;
pub use scheduler::{Scheduler, TaskId, TaskReport};
