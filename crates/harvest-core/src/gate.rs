//! Ability gating: active abilities, tool checks and consumables.
//!
//! The resolver asks an [`AbilityGate`] three things: is an ability active,
//! does the actor hold the right tool, and can a consumable be taken. The gate
//! is handed into every resolution explicitly, so tests can fix ability states
//! without touching any profile storage.
//!
//! [`InventoryGate`] is the standard implementation: ability state comes from
//! an [`AbilityTable`] owned by the host's progression system, consumables from
//! an [`InventoryPort`].
//!
//! # Atomic consumption
//!
//! [`AbilityGate::consume_required_consumable`] and [`AbilityGate::consume_all`]
//! check and remove in one call. Nothing is removed unless every unit is
//! present, and nothing is ever removed speculatively and rolled back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::catalog::ToolRequirement;
use crate::model::{Actor, ActorId, ItemId, ItemStack};
use crate::ports::InventoryPort;

/// Abilities the progression system can activate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Ability {
    /// Long-duration ability: every conversion attempt succeeds while active.
    Overgrowth,
}

/// How an active ability ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbilityState {
    /// Active until the host clock reaches `expires_at`.
    Timed {
        /// First tick at which the ability is no longer active.
        expires_at: u64,
    },
    /// Active until spent by one successful use.
    SingleUse,
}

/// Result of a consumption attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumeResult {
    /// Whether the units were removed.
    pub ok: bool,
    /// Units left after the attempt.
    pub remaining: u32,
}

/// Read ability state, check tools, take consumables.
pub trait AbilityGate {
    /// Whether `ability` is currently active for `actor`.
    fn is_ability_active(&self, actor: ActorId, ability: Ability) -> bool;

    /// Whether the actor's main hand satisfies `tool`.
    fn has_required_tool(&self, actor: &Actor, tool: &ToolRequirement) -> bool {
        tool.matches(actor.held_item.as_ref())
    }

    /// First stack in `stacks` the actor cannot cover, without removing anything.
    fn first_missing(&self, actor: ActorId, stacks: &[ItemStack]) -> Option<ItemStack>;

    /// Atomically checks for and removes `count` units of `item`.
    fn consume_required_consumable(&mut self, actor: ActorId, item: &ItemId, count: u32)
        -> ConsumeResult;

    /// Atomically removes every stack, or nothing.
    ///
    /// # Errors
    ///
    /// Returns the first stack that could not be covered; nothing is removed.
    fn consume_all(&mut self, actor: ActorId, stacks: &[ItemStack]) -> Result<(), ItemStack>;

    /// Spends one use of `ability`. Timed abilities are unaffected.
    fn spend(&mut self, actor: ActorId, ability: Ability);
}

// =============================================================================
// Ability Table
// =============================================================================

/// Per-actor ability states.
///
/// Written by the progression system (activation, expiry, disconnect); the
/// resolver only reads it and spends single uses through the gate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityTable {
    states: BTreeMap<(ActorId, Ability), AbilityState>,
}

impl AbilityTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Activates `ability` for `actor`, replacing any previous state.
    pub fn activate(&mut self, actor: ActorId, ability: Ability, state: AbilityState) {
        self.states.insert((actor, ability), state);
    }

    /// Deactivates `ability` for `actor`. Returns whether it was active.
    pub fn deactivate(&mut self, actor: ActorId, ability: Ability) -> bool {
        self.states.remove(&(actor, ability)).is_some()
    }

    /// Current state, regardless of expiry.
    #[must_use]
    pub fn state(&self, actor: ActorId, ability: Ability) -> Option<AbilityState> {
        self.states.get(&(actor, ability)).copied()
    }

    /// Whether the ability is active at tick `now`.
    #[must_use]
    pub fn is_active(&self, actor: ActorId, ability: Ability, now: u64) -> bool {
        match self.state(actor, ability) {
            Some(AbilityState::Timed { expires_at }) => now < expires_at,
            Some(AbilityState::SingleUse) => true,
            None => false,
        }
    }

    /// Removes a single-use ability. Returns whether one was spent.
    pub fn spend(&mut self, actor: ActorId, ability: Ability) -> bool {
        if self.state(actor, ability) == Some(AbilityState::SingleUse) {
            self.states.remove(&(actor, ability));
            true
        } else {
            false
        }
    }

    /// Drops every timed ability that has expired by `now`. Returns the count.
    pub fn expire(&mut self, now: u64) -> usize {
        let before = self.states.len();
        self.states.retain(|_, state| match state {
            AbilityState::Timed { expires_at } => now < *expires_at,
            AbilityState::SingleUse => true,
        });
        before - self.states.len()
    }

    /// Drops every ability of `actor` (session end).
    pub fn clear_actor(&mut self, actor: ActorId) {
        self.states.retain(|(owner, _), _| *owner != actor);
    }
}

// =============================================================================
// Inventory Gate
// =============================================================================

/// [`AbilityGate`] over an [`AbilityTable`] and an [`InventoryPort`].
pub struct InventoryGate<'a> {
    abilities: &'a mut AbilityTable,
    inventory: &'a mut dyn InventoryPort,
    now: u64,
}

impl<'a> InventoryGate<'a> {
    /// Creates a gate evaluated at host tick `now`.
    pub fn new(abilities: &'a mut AbilityTable, inventory: &'a mut dyn InventoryPort, now: u64) -> Self {
        Self {
            abilities,
            inventory,
            now,
        }
    }

    /// Sums stacks per item so repeated items are checked against their total.
    /// A total that overflows `u32` is `None` and can never be covered.
    fn totals(stacks: &[ItemStack]) -> BTreeMap<&ItemId, Option<u32>> {
        let mut totals = BTreeMap::new();
        for stack in stacks {
            let total = totals.entry(&stack.item).or_insert(Some(0u32));
            *total = total.and_then(|sum| sum.checked_add(stack.amount));
        }
        totals
    }
}

impl std::fmt::Debug for InventoryGate<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryGate")
            .field("abilities", &self.abilities)
            .field("now", &self.now)
            .finish_non_exhaustive()
    }
}

impl AbilityGate for InventoryGate<'_> {
    fn is_ability_active(&self, actor: ActorId, ability: Ability) -> bool {
        self.abilities.is_active(actor, ability, self.now)
    }

    fn first_missing(&self, actor: ActorId, stacks: &[ItemStack]) -> Option<ItemStack> {
        Self::totals(stacks)
            .into_iter()
            .find(|(item, amount)| amount.map_or(true, |amount| !self.inventory.has(actor, item, amount)))
            .map(|(item, amount)| ItemStack::new(item.clone(), amount.unwrap_or(u32::MAX)))
    }

    fn consume_required_consumable(
        &mut self,
        actor: ActorId,
        item: &ItemId,
        count: u32,
    ) -> ConsumeResult {
        let available = self.inventory.count(actor, item);
        if available < count {
            return ConsumeResult {
                ok: false,
                remaining: available,
            };
        }
        if self.inventory.remove(actor, item, count) {
            ConsumeResult {
                ok: true,
                remaining: available - count,
            }
        } else {
            ConsumeResult {
                ok: false,
                remaining: self.inventory.count(actor, item),
            }
        }
    }

    fn consume_all(&mut self, actor: ActorId, stacks: &[ItemStack]) -> Result<(), ItemStack> {
        if let Some(missing) = self.first_missing(actor, stacks) {
            return Err(missing);
        }
        for (item, amount) in Self::totals(stacks) {
            let amount = amount.unwrap_or(u32::MAX);
            if !self.inventory.remove(actor, item, amount) {
                // Presence was checked on this same thread a moment ago.
                warn!(%actor, %item, amount, "inventory refused a checked removal");
                return Err(ItemStack::new(item.clone(), amount));
            }
        }
        Ok(())
    }

    fn spend(&mut self, actor: ActorId, ability: Ability) {
        self.abilities.spend(actor, ability);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryInventory;

    const ACTOR: ActorId = ActorId::new(1);

    mod ability_table_tests {
        use super::*;

        #[test]
        fn timed_ability_expires_at_tick() {
            let mut table = AbilityTable::new();
            table.activate(ACTOR, Ability::Overgrowth, AbilityState::Timed { expires_at: 10 });
            assert!(table.is_active(ACTOR, Ability::Overgrowth, 9));
            assert!(!table.is_active(ACTOR, Ability::Overgrowth, 10));
        }

        #[test]
        fn single_use_is_spent_once() {
            let mut table = AbilityTable::new();
            table.activate(ACTOR, Ability::Overgrowth, AbilityState::SingleUse);
            assert!(table.is_active(ACTOR, Ability::Overgrowth, 0));
            assert!(table.spend(ACTOR, Ability::Overgrowth));
            assert!(!table.is_active(ACTOR, Ability::Overgrowth, 0));
            assert!(!table.spend(ACTOR, Ability::Overgrowth));
        }

        #[test]
        fn spend_ignores_timed_abilities() {
            let mut table = AbilityTable::new();
            table.activate(ACTOR, Ability::Overgrowth, AbilityState::Timed { expires_at: 50 });
            assert!(!table.spend(ACTOR, Ability::Overgrowth));
            assert!(table.is_active(ACTOR, Ability::Overgrowth, 0));
        }

        #[test]
        fn expire_removes_only_elapsed_timers() {
            let mut table = AbilityTable::new();
            let other = ActorId::new(2);
            table.activate(ACTOR, Ability::Overgrowth, AbilityState::Timed { expires_at: 5 });
            table.activate(other, Ability::Overgrowth, AbilityState::SingleUse);
            assert_eq!(table.expire(5), 1);
            assert_eq!(table.state(ACTOR, Ability::Overgrowth), None);
            assert_eq!(table.state(other, Ability::Overgrowth), Some(AbilityState::SingleUse));
        }

        #[test]
        fn clear_actor_and_deactivate() {
            let mut table = AbilityTable::new();
            table.activate(ACTOR, Ability::Overgrowth, AbilityState::SingleUse);
            assert!(table.deactivate(ACTOR, Ability::Overgrowth));
            assert!(!table.deactivate(ACTOR, Ability::Overgrowth));

            table.activate(ACTOR, Ability::Overgrowth, AbilityState::SingleUse);
            table.clear_actor(ACTOR);
            assert!(!table.is_active(ACTOR, Ability::Overgrowth, 0));
        }
    }

    mod inventory_gate_tests {
        use super::*;

        fn seeds() -> ItemId {
            ItemId::new("seeds")
        }

        #[test]
        fn consume_removes_when_present() {
            let mut abilities = AbilityTable::new();
            let mut inventory = MemoryInventory::default();
            inventory.give(ACTOR, "seeds", 3);

            let mut gate = InventoryGate::new(&mut abilities, &mut inventory, 0);
            let result = gate.consume_required_consumable(ACTOR, &seeds(), 2);
            assert_eq!(result, ConsumeResult { ok: true, remaining: 1 });
            assert_eq!(inventory.count(ACTOR, &seeds()), 1);
        }

        #[test]
        fn consume_fails_without_removing() {
            let mut abilities = AbilityTable::new();
            let mut inventory = MemoryInventory::default();
            inventory.give(ACTOR, "seeds", 1);

            let mut gate = InventoryGate::new(&mut abilities, &mut inventory, 0);
            let result = gate.consume_required_consumable(ACTOR, &seeds(), 2);
            assert_eq!(result, ConsumeResult { ok: false, remaining: 1 });
            assert_eq!(inventory.count(ACTOR, &seeds()), 1);
        }

        #[test]
        fn consume_all_is_all_or_nothing() {
            let mut abilities = AbilityTable::new();
            let mut inventory = MemoryInventory::default();
            inventory.give(ACTOR, "red_mushroom", 1);

            let stacks = [
                ItemStack::new("red_mushroom", 1),
                ItemStack::new("brown_mushroom", 1),
            ];
            let mut gate = InventoryGate::new(&mut abilities, &mut inventory, 0);
            let missing = gate.consume_all(ACTOR, &stacks).unwrap_err();
            assert_eq!(missing, ItemStack::new("brown_mushroom", 1));
            assert_eq!(inventory.count(ACTOR, &ItemId::new("red_mushroom")), 1);
        }

        #[test]
        fn repeated_items_are_summed() {
            let mut abilities = AbilityTable::new();
            let mut inventory = MemoryInventory::default();
            inventory.give(ACTOR, "seeds", 1);

            let stacks = [ItemStack::new("seeds", 1), ItemStack::new("seeds", 1)];
            let gate = InventoryGate::new(&mut abilities, &mut inventory, 0);
            assert_eq!(gate.first_missing(ACTOR, &stacks), Some(ItemStack::new("seeds", 2)));
        }

        #[test]
        fn overflowing_total_is_never_covered() {
            let mut abilities = AbilityTable::new();
            let mut inventory = MemoryInventory::default();
            inventory.give(ACTOR, "seeds", u32::MAX);

            let stacks = [ItemStack::new("seeds", u32::MAX), ItemStack::new("seeds", 1)];
            let mut gate = InventoryGate::new(&mut abilities, &mut inventory, 0);
            assert_eq!(
                gate.first_missing(ACTOR, &stacks),
                Some(ItemStack::new("seeds", u32::MAX))
            );
            assert!(gate.consume_all(ACTOR, &stacks).is_err());
            assert_eq!(inventory.count(ACTOR, &seeds()), u32::MAX);
        }

        #[test]
        fn tool_requirement_reads_main_hand() {
            let mut abilities = AbilityTable::new();
            let mut inventory = MemoryInventory::default();
            let gate = InventoryGate::new(&mut abilities, &mut inventory, 0);

            let swords = ToolRequirement::AnyOf(vec![ItemId::new("iron_sword")]);
            let armed = Actor::new(ACTOR, 10).holding("iron_sword");
            let unarmed = Actor::new(ACTOR, 10);
            assert!(gate.has_required_tool(&armed, &swords));
            assert!(!gate.has_required_tool(&unarmed, &swords));
            assert!(gate.has_required_tool(&unarmed, &ToolRequirement::Any));
        }

        #[test]
        fn gate_reads_ability_at_its_tick() {
            let mut abilities = AbilityTable::new();
            abilities.activate(ACTOR, Ability::Overgrowth, AbilityState::Timed { expires_at: 3 });
            let mut inventory = MemoryInventory::default();

            {
                let early = InventoryGate::new(&mut abilities, &mut inventory, 2);
                assert!(early.is_ability_active(ACTOR, Ability::Overgrowth));
            }

            let late = InventoryGate::new(&mut abilities, &mut inventory, 3);
            assert!(!late.is_ability_active(ACTOR, Ability::Overgrowth));
        }
    }
}
