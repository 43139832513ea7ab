//! Resolution results.
//!
//! A [`ResolutionResult`] is the complete answer to one harvest: what drops,
//! how much experience was granted, and what should happen to the node. It is
//! immutable once returned; the host applies it, typically through
//! [`ResolutionResult::apply`].

use serde::{Deserialize, Serialize};

use crate::model::{ItemId, ItemStack, Location, NodeState};
use crate::ports::WorldPort;
use crate::scheduler::TaskId;

/// Why a resolution was denied. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissReason {
    /// The actor is mounted and mounted harvesting is disabled.
    Mounted,
    /// A required consumable is missing.
    NeedMore,
    /// A probabilistic roll failed.
    ChanceMiss,
    /// The actor lacks the capability for the attempted path.
    NotPermitted,
    /// A one-shot node was already claimed; its tag has been reset.
    AlreadyClaimed,
    /// The node was placed by a player.
    PlayerPlaced,
    /// A bulk node has no harvestable height.
    EmptyStack,
}

impl MissReason {
    /// Whether this miss came from a failed roll rather than an unmet rule.
    #[must_use]
    pub const fn is_chance_miss(self) -> bool {
        matches!(self, Self::ChanceMiss)
    }
}

/// Top-level result of a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// A category matched and its rules were satisfied.
    Granted,
    /// A category matched but a rule or roll denied the reward.
    Denied(MissReason),
    /// The resource is unknown to both the catalog and the external registry.
    NoYield,
}

/// Drop of the descriptor's item, split into guaranteed and bonus parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDrop {
    /// Item dropped.
    pub item: ItemId,
    /// Guaranteed amount.
    pub base: u32,
    /// Extra amount from the double-drop overlay.
    pub bonus: u32,
}

impl ItemDrop {
    /// A drop with no bonus.
    #[must_use]
    pub fn new(item: ItemId, base: u32) -> Self {
        Self {
            item,
            base,
            bonus: 0,
        }
    }

    /// Total units dropped.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.base.saturating_add(self.bonus)
    }
}

/// What the resolver asks the host to do with the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeTransition {
    /// Leave the node to the host's normal harvest handling.
    Unchanged,
    /// Remove the node now.
    Remove,
    /// Keep the node; a deferred task will convert it.
    ConvertDeferred {
        /// Scheduled task.
        task: TaskId,
        /// State the task will write.
        into: NodeState,
        /// Delay the task was scheduled with.
        delay: u64,
    },
}

/// The full answer to one harvest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResult {
    /// Granted, denied or no yield.
    pub outcome: Outcome,
    /// Descriptor item drop, if any.
    pub drop: Option<ItemDrop>,
    /// Experience granted through the progression port.
    pub xp: u32,
    /// Requested node change.
    pub transition: NodeTransition,
    /// Treasure found by the luck ability, if any.
    pub treasure: Option<ItemStack>,
}

impl ResolutionResult {
    /// A granted result.
    #[must_use]
    pub fn granted(drop: Option<ItemDrop>, xp: u32, transition: NodeTransition) -> Self {
        Self {
            outcome: Outcome::Granted,
            drop: drop.filter(|d| d.base > 0),
            xp,
            transition,
            treasure: None,
        }
    }

    /// A denied result: nothing drops, no experience, node untouched.
    #[must_use]
    pub fn denied(reason: MissReason) -> Self {
        Self {
            outcome: Outcome::Denied(reason),
            drop: None,
            xp: 0,
            transition: NodeTransition::Unchanged,
            treasure: None,
        }
    }

    /// The result for an unknown resource.
    #[must_use]
    pub fn no_yield() -> Self {
        Self {
            outcome: Outcome::NoYield,
            ..Self::denied(MissReason::ChanceMiss)
        }
    }

    /// Whether the outcome is [`Outcome::Granted`].
    #[must_use]
    pub fn is_granted(&self) -> bool {
        self.outcome == Outcome::Granted
    }

    /// The miss reason, for denied results.
    #[must_use]
    pub fn miss_reason(&self) -> Option<MissReason> {
        match self.outcome {
            Outcome::Denied(reason) => Some(reason),
            Outcome::Granted | Outcome::NoYield => None,
        }
    }

    /// Total units of the descriptor item, base plus bonus.
    #[must_use]
    pub fn total_drop(&self) -> u32 {
        self.drop.as_ref().map_or(0, ItemDrop::total)
    }

    /// The deferred conversion task, if one was scheduled.
    #[must_use]
    pub fn scheduled_task(&self) -> Option<TaskId> {
        match &self.transition {
            NodeTransition::ConvertDeferred { task, .. } => Some(*task),
            NodeTransition::Unchanged | NodeTransition::Remove => None,
        }
    }

    /// Applies drops, treasure and node removal at `location`.
    ///
    /// Deferred conversions are not applied here; the scheduler owns them.
    pub fn apply(&self, world: &mut dyn WorldPort, location: Location) {
        if let Some(drop) = &self.drop {
            let total = drop.total();
            if total > 0 {
                world.drop_items(location, &drop.item, total);
            }
        }
        if let Some(treasure) = &self.treasure {
            world.drop_items(location, &treasure.item, treasure.amount);
        }
        if self.transition == NodeTransition::Remove {
            world.remove_node(location);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryWorld;

    #[test]
    fn granted_discards_empty_drop() {
        let result = ResolutionResult::granted(
            Some(ItemDrop::new(ItemId::new("cobblestone"), 0)),
            0,
            NodeTransition::Unchanged,
        );
        assert!(result.is_granted());
        assert!(result.drop.is_none());
        assert_eq!(result.total_drop(), 0);
    }

    #[test]
    fn denied_and_no_yield_carry_nothing() {
        let denied = ResolutionResult::denied(MissReason::NeedMore);
        assert_eq!(denied.miss_reason(), Some(MissReason::NeedMore));
        assert_eq!(denied.xp, 0);

        let none = ResolutionResult::no_yield();
        assert_eq!(none.outcome, Outcome::NoYield);
        assert_eq!(none.miss_reason(), None);
        assert!(none.drop.is_none());
    }

    #[test]
    fn drop_total_includes_bonus() {
        let mut drop = ItemDrop::new(ItemId::new("wheat"), 2);
        drop.bonus = 2;
        assert_eq!(drop.total(), 4);
    }

    #[test]
    fn apply_drops_and_removes() {
        let mut world = MemoryWorld::default();
        let location = Location::new(0, 0, 0);
        world.insert(location, NodeState::new("poppy"));

        let mut result = ResolutionResult::granted(None, 0, NodeTransition::Remove);
        result.treasure = Some(ItemStack::new("emerald", 1));
        result.apply(&mut world, location);

        assert!(world.node(location).is_none());
        assert_eq!(world.dropped(&ItemId::new("emerald")), 1);
    }

    #[test]
    fn apply_leaves_unchanged_nodes() {
        let mut world = MemoryWorld::default();
        let location = Location::new(3, 1, 3);
        world.insert(location, NodeState::new("wheat"));

        let result = ResolutionResult::granted(
            Some(ItemDrop::new(ItemId::new("wheat"), 1)),
            50,
            NodeTransition::Unchanged,
        );
        result.apply(&mut world, location);

        assert!(world.node(location).is_some());
        assert_eq!(world.dropped(&ItemId::new("wheat")), 1);
    }

    #[test]
    fn chance_miss_classification() {
        assert!(MissReason::ChanceMiss.is_chance_miss());
        assert!(!MissReason::NeedMore.is_chance_miss());
    }
}
