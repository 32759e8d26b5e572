//! Roster model.
//!
//! A player's creatures live in exactly one of two places: an indexed
//! [`Slot`] (active, earns idle income) or the [`Bench`] (unbounded storage).
//! The bench keeps an explicit presentation order next to its lookup map, so
//! ordering never depends on map iteration.

use crate::creature_key::CreatureKey;
use crate::error::{ProgressError, RosterViolation};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Progress of one owned creature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreatureState {
    pub level: u32,
    pub exp: f64,
}

impl CreatureState {
    /// A freshly acquired creature: level 1, no exp.
    pub const FRESH: CreatureState = CreatureState { level: 1, exp: 0.0 };
}

impl Default for CreatureState {
    fn default() -> Self {
        Self::FRESH
    }
}

/// An active slot. Its index in the roster is its identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Slot {
    pub key: Option<CreatureKey>,
    pub level: u32,
    pub exp: f64,
}

impl Slot {
    /// An idle slot: no creature, level 1, exp 0.
    pub fn idle() -> Self {
        Self {
            key: None,
            level: 1,
            exp: 0.0,
        }
    }

    pub fn holding(key: CreatureKey, state: CreatureState) -> Self {
        Self {
            key: Some(key),
            level: state.level,
            exp: state.exp,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.key.is_none()
    }

    pub fn state(&self) -> CreatureState {
        CreatureState {
            level: self.level,
            exp: self.exp,
        }
    }
}

impl Default for Slot {
    fn default() -> Self {
        Self::idle()
    }
}

/// Where an owned creature currently lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    Slot(usize),
    Bench(CreatureKey),
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Slot(index) => write!(f, "slot {index}"),
            Location::Bench(key) => write!(f, "bench {key}"),
        }
    }
}

/// Unslotted creatures plus their display order.
///
/// # Examples
///
/// ```rust
/// use idledex::roster::{Bench, CreatureState};
/// use idledex::CreatureKey;
///
/// let mut bench = Bench::new();
/// bench.insert(CreatureKey::new("abra"), CreatureState::FRESH);
/// bench.insert(CreatureKey::new("oddish"), CreatureState::FRESH);
/// bench.insert(CreatureKey::new("abra"), CreatureState { level: 2, exp: 5.0 });
///
/// let order: Vec<&str> = bench.order().iter().map(|k| k.as_str()).collect();
/// assert_eq!(order, ["abra", "oddish"]);
/// assert_eq!(bench.get("abra").unwrap().level, 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bench {
    entries: HashMap<CreatureKey, CreatureState>,
    order: Vec<CreatureKey>,
}

impl Bench {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a bench from persisted parts, repairing the order.
    pub fn from_parts(entries: HashMap<CreatureKey, CreatureState>, order: Vec<CreatureKey>) -> Self {
        let mut bench = Self { entries, order };
        bench.reconcile_order();
        bench
    }

    /// Insert or overwrite an entry; a new key goes to the end of the order.
    pub fn insert(&mut self, key: CreatureKey, state: CreatureState) {
        if self.entries.insert(key.clone(), state).is_none() && !self.order.contains(&key) {
            self.order.push(key);
        }
    }

    /// Remove an entry and its order position.
    pub fn remove(&mut self, key: &str) -> Option<CreatureState> {
        let state = self.entries.remove(key)?;
        self.order.retain(|k| k.as_str() != key);
        Some(state)
    }

    pub fn get(&self, key: &str) -> Option<&CreatureState> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut CreatureState> {
        self.entries.get_mut(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn order(&self) -> &[CreatureKey] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in display order.
    pub fn iter(&self) -> impl Iterator<Item = (&CreatureKey, &CreatureState)> {
        self.order
            .iter()
            .filter_map(move |key| self.entries.get(key).map(|state| (key, state)))
    }

    /// Make the order exactly the entry key set.
    ///
    /// Drops stale and duplicate order entries (first occurrence wins) and
    /// appends missing keys in sorted order. Returns whether anything
    /// changed.
    pub fn reconcile_order(&mut self) -> bool {
        let before = self.order.len();
        let mut seen = HashSet::new();
        let entries = &self.entries;
        self.order
            .retain(|key| entries.contains_key(key) && seen.insert(key.clone()));
        let mut changed = self.order.len() != before;

        let mut missing: Vec<CreatureKey> = self
            .entries
            .keys()
            .filter(|key| !seen.contains(*key))
            .cloned()
            .collect();
        if !missing.is_empty() {
            missing.sort();
            self.order.extend(missing);
            changed = true;
        }
        changed
    }

    fn order_matches_entries(&self) -> bool {
        let unique: HashSet<&CreatureKey> = self.order.iter().collect();
        unique.len() == self.order.len()
            && self.order.len() == self.entries.len()
            && self.order.iter().all(|key| self.entries.contains_key(key))
    }
}

/// Active slots plus the bench.
#[derive(Debug, Clone, PartialEq)]
pub struct Roster {
    slots: Vec<Slot>,
    bench: Bench,
}

impl Default for Roster {
    fn default() -> Self {
        Self {
            slots: vec![Slot::idle()],
            bench: Bench::new(),
        }
    }
}

impl Roster {
    /// One idle slot, empty bench.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a roster from persisted parts and repair it.
    ///
    /// Slot records are authoritative: a bench entry for a slotted key is
    /// dropped, and a key found in a second slot leaves that slot idle. At
    /// least one slot always exists.
    pub fn from_parts(mut slots: Vec<Slot>, bench: Bench) -> Self {
        if slots.is_empty() {
            slots.push(Slot::idle());
        }
        let mut roster = Self { slots, bench };
        roster.reconcile();
        roster
    }

    /// Repair drift from concurrent or legacy writers. Returns the number of
    /// fixes applied.
    pub fn reconcile(&mut self) -> usize {
        let mut fixes = 0;
        let mut slotted = HashSet::new();
        for slot in &mut self.slots {
            if let Some(key) = slot.key.clone() {
                if !slotted.insert(key) {
                    *slot = Slot::idle();
                    fixes += 1;
                }
            }
        }
        for key in &slotted {
            if self.bench.remove(key.as_str()).is_some() {
                fixes += 1;
            }
        }
        if self.bench.reconcile_order() {
            fixes += 1;
        }
        fixes
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn bench(&self) -> &Bench {
        &self.bench
    }

    pub fn bench_mut(&mut self) -> &mut Bench {
        &mut self.bench
    }

    pub fn slot(&self, index: usize) -> Result<&Slot, ProgressError> {
        self.slots
            .get(index)
            .ok_or_else(|| ProgressError::NotFound(format!("slot {index}")))
    }

    pub(crate) fn slots_mut(&mut self) -> &mut [Slot] {
        &mut self.slots
    }

    fn slot_mut(&mut self, index: usize) -> Result<&mut Slot, ProgressError> {
        self.slots
            .get_mut(index)
            .ok_or_else(|| ProgressError::NotFound(format!("slot {index}")))
    }

    /// Append an idle slot. Slots are never removed.
    pub fn push_slot(&mut self) -> usize {
        self.slots.push(Slot::idle());
        self.slots.len() - 1
    }

    /// Move a benched creature into `slot_index`.
    ///
    /// A creature already in the slot goes back to the bench (keeping its
    /// order position if it still has one).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use idledex::roster::{CreatureState, Roster};
    /// use idledex::CreatureKey;
    ///
    /// let mut roster = Roster::new();
    /// roster.bench_mut().insert(CreatureKey::new("abra"), CreatureState::FRESH);
    /// roster.assign(0, "abra").unwrap();
    ///
    /// assert_eq!(roster.slots()[0].key.as_ref().unwrap().as_str(), "abra");
    /// assert!(roster.bench().is_empty());
    /// assert!(roster.assign(0, "abra").is_err()); // no longer benched
    /// ```
    pub fn assign(&mut self, slot_index: usize, key: &str) -> Result<(), ProgressError> {
        self.slot(slot_index)?;
        let state = self
            .bench
            .remove(key)
            .ok_or_else(|| ProgressError::NotFound(format!("{key} is not on the bench")))?;

        let slot = self.slot_mut(slot_index)?;
        let previous = std::mem::replace(slot, Slot::holding(CreatureKey::new(key), state));
        if let Some(old_key) = previous.key.clone() {
            self.bench.insert(old_key, previous.state());
        }
        Ok(())
    }

    /// Move the slot's creature (if any) to the bench and idle the slot.
    ///
    /// Returns the key that was benched.
    pub fn clear(&mut self, slot_index: usize) -> Result<Option<CreatureKey>, ProgressError> {
        let slot = self.slot_mut(slot_index)?;
        let previous = std::mem::replace(slot, Slot::idle());
        match previous.key.clone() {
            Some(key) => {
                self.bench.insert(key.clone(), previous.state());
                Ok(Some(key))
            }
            None => Ok(None),
        }
    }

    pub fn reconcile_bench_order(&mut self) -> bool {
        self.bench.reconcile_order()
    }

    /// Find where `key` lives.
    pub fn locate(&self, key: &str) -> Option<Location> {
        if let Some(index) = self.slot_index_of(key) {
            return Some(Location::Slot(index));
        }
        self.bench
            .get(key)
            .map(|_| Location::Bench(CreatureKey::new(key)))
    }

    pub fn slot_index_of(&self, key: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.key.as_ref().is_some_and(|k| k.as_str() == key))
    }

    /// Key and progress of the creature at `location`.
    pub fn creature(&self, location: &Location) -> Result<(CreatureKey, CreatureState), ProgressError> {
        match location {
            Location::Slot(index) => {
                let slot = self.slot(*index)?;
                let key = slot
                    .key
                    .clone()
                    .ok_or_else(|| ProgressError::NotFound(format!("slot {index} is empty")))?;
                Ok((key, slot.state()))
            }
            Location::Bench(key) => self
                .bench
                .get(key.as_str())
                .map(|state| (key.clone(), *state))
                .ok_or_else(|| ProgressError::NotFound(format!("{key} is not on the bench"))),
        }
    }

    /// Overwrite the progress of the creature at `location`.
    pub fn set_state(&mut self, location: &Location, state: CreatureState) -> Result<(), ProgressError> {
        match location {
            Location::Slot(index) => {
                let slot = self.slot_mut(*index)?;
                if slot.is_idle() {
                    return Err(ProgressError::NotFound(format!("slot {index} is empty")));
                }
                slot.level = state.level;
                slot.exp = state.exp;
                Ok(())
            }
            Location::Bench(key) => {
                let entry = self
                    .bench
                    .get_mut(key.as_str())
                    .ok_or_else(|| ProgressError::NotFound(format!("{key} is not on the bench")))?;
                *entry = state;
                Ok(())
            }
        }
    }

    /// Replace the species at `location`, keeping level and exp.
    ///
    /// A slot is rewritten in place; a bench entry is removed and re-added
    /// under the new key. Returns the new location.
    pub fn replace_species(&mut self, location: &Location, new_key: CreatureKey) -> Result<Location, ProgressError> {
        match location {
            Location::Slot(index) => {
                let slot = self.slot_mut(*index)?;
                if slot.is_idle() {
                    return Err(ProgressError::NotFound(format!("slot {index} is empty")));
                }
                slot.key = Some(new_key);
                Ok(Location::Slot(*index))
            }
            Location::Bench(key) => {
                let state = self
                    .bench
                    .remove(key.as_str())
                    .ok_or_else(|| ProgressError::NotFound(format!("{key} is not on the bench")))?;
                self.bench.insert(new_key.clone(), state);
                Ok(Location::Bench(new_key))
            }
        }
    }

    /// Whether `key` is slotted or benched.
    pub fn owns(&self, key: &str) -> bool {
        self.slot_index_of(key).is_some() || self.bench.contains(key)
    }

    /// Every owned creature: slots first (by index), then the bench in order.
    pub fn creatures(&self) -> impl Iterator<Item = (&CreatureKey, CreatureState)> {
        let slotted = self
            .slots
            .iter()
            .filter_map(|slot| slot.key.as_ref().map(|key| (key, slot.state())));
        let benched = self.bench.iter().map(|(key, state)| (key, *state));
        slotted.chain(benched)
    }

    pub fn owned_keys(&self) -> Vec<CreatureKey> {
        self.creatures().map(|(key, _)| key.clone()).collect()
    }

    pub fn owned_count(&self) -> usize {
        self.creatures().count()
    }

    /// Trainer exp: the live sum of exp over every owned creature.
    ///
    /// Non-finite or negative exp is corrupt data; it is left out of the sum
    /// and logged.
    pub fn total_exp(&self) -> f64 {
        let mut total = 0.0;
        for (key, state) in self.creatures() {
            if state.exp.is_finite() && state.exp >= 0.0 {
                total += state.exp;
            } else {
                warn!(creature = %key, exp = state.exp, "Ignoring corrupt exp value");
            }
        }
        total
    }

    /// Check exclusivity and bench-order invariants.
    pub fn check_invariants(&self) -> Result<(), RosterViolation> {
        let mut slotted = HashSet::new();
        for key in self.slots.iter().filter_map(|slot| slot.key.as_ref()) {
            if !slotted.insert(key) {
                return Err(RosterViolation::DuplicateSlotKey(key.clone()));
            }
            if self.bench.contains(key.as_str()) {
                return Err(RosterViolation::SlottedAndBenched(key.clone()));
            }
        }
        if !self.bench.order_matches_entries() {
            return Err(RosterViolation::BenchOrderMismatch);
        }
        Ok(())
    }
}
