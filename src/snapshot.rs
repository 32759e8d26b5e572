//! Player snapshot.
//!
//! The whole mutable state of one account: username, roster and ledger.
//! Snapshots are plain values; the orchestrator consumes one and produces
//! the next.
//!
//! The JSON wire form keeps the legacy field names (`ownedPokemons`,
//! `benchOrder`, ...). Decoding tolerates missing fields and drifted data,
//! and always hands back a reconciled roster.

use crate::creature_key::CreatureKey;
use crate::error::RosterViolation;
use crate::ledger::{Candies, Ledger, Shards};
use crate::progression::ProgressionCurve;
use crate::roster::{Bench, CreatureState, Roster, Slot};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One account's state.
///
/// # Examples
///
/// ```rust
/// use idledex::PlayerSnapshot;
///
/// let snapshot = PlayerSnapshot::new("ash");
/// assert_eq!(snapshot.roster.slots().len(), 1);
/// assert!(snapshot.roster.slots()[0].is_idle());
/// assert_eq!(snapshot.ledger.last_chest_tier, 1);
///
/// let json = snapshot.to_json().unwrap();
/// assert!(json.contains("\"ownedPokemons\""));
/// assert_eq!(PlayerSnapshot::from_json(&json).unwrap(), snapshot);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SnapshotWire", into = "SnapshotWire")]
pub struct PlayerSnapshot {
    pub username: String,
    pub roster: Roster,
    pub ledger: Ledger,
}

impl PlayerSnapshot {
    /// A freshly registered account: one idle slot, empty bench, zero economy.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            roster: Roster::new(),
            ledger: Ledger::default(),
        }
    }

    /// The same account restored to registration defaults.
    pub fn reset(&self) -> Self {
        Self::new(self.username.clone())
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn check_invariants(&self) -> Result<(), RosterViolation> {
        self.roster.check_invariants()
    }

    /// Trainer tier and progress, derived live from owned creatures.
    pub fn trainer_stats(&self, curve: &ProgressionCurve) -> TrainerStats {
        let total_exp = self.roster.total_exp();
        let progress = curve.derive_tier(total_exp);
        TrainerStats {
            tier: progress.tier,
            total_exp,
            exp_into_tier: progress.remainder,
            exp_for_next_tier: progress.requirement,
            cumulative_for_next: curve.cumulative_requirement(progress.tier),
        }
    }
}

/// Trainer progress for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainerStats {
    pub tier: u32,
    pub total_exp: f64,
    /// Exp banked toward the next tier.
    pub exp_into_tier: f64,
    /// Size of the current tier's requirement.
    pub exp_for_next_tier: f64,
    /// Total exp at which the next tier is reached.
    pub cumulative_for_next: f64,
}

/// Persisted shape of a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SnapshotWire {
    username: String,
    money: f64,
    shards: Shards,
    /// Bench entries plus mirrors of slotted creatures.
    owned_pokemons: BTreeMap<CreatureKey, CreatureState>,
    slots: Vec<Slot>,
    bench_order: Vec<CreatureKey>,
    chest_keys: u32,
    last_chest_tier: u32,
    chest_awarded: bool,
    candies: Candies,
    candies_bought: Candies,
}

impl Default for SnapshotWire {
    fn default() -> Self {
        PlayerSnapshot::new(String::new()).into()
    }
}

impl From<PlayerSnapshot> for SnapshotWire {
    fn from(snapshot: PlayerSnapshot) -> Self {
        let PlayerSnapshot {
            username,
            roster,
            ledger,
        } = snapshot;

        let owned_pokemons = roster
            .creatures()
            .map(|(key, state)| (key.clone(), state))
            .collect();

        Self {
            username,
            money: ledger.money,
            shards: ledger.shards,
            owned_pokemons,
            slots: roster.slots().to_vec(),
            bench_order: roster.bench().order().to_vec(),
            chest_keys: ledger.chest_keys,
            last_chest_tier: ledger.last_chest_tier,
            chest_awarded: ledger.chest_awarded,
            candies: ledger.candies,
            candies_bought: ledger.candies_bought,
        }
    }
}

impl From<SnapshotWire> for PlayerSnapshot {
    fn from(wire: SnapshotWire) -> Self {
        let slots = wire
            .slots
            .into_iter()
            .map(|mut slot| {
                slot.level = slot.level.max(1);
                if slot.key.is_none() {
                    slot = Slot::idle();
                }
                slot
            })
            .collect();

        // Slot records win over their ownedPokemons mirrors; Roster::from_parts
        // drops the mirrors from the bench.
        let entries: HashMap<CreatureKey, CreatureState> = wire
            .owned_pokemons
            .into_iter()
            .map(|(key, mut state)| {
                state.level = state.level.max(1);
                (key, state)
            })
            .collect();
        let bench = Bench::from_parts(entries, wire.bench_order);

        Self {
            username: wire.username,
            roster: Roster::from_parts(slots, bench),
            ledger: Ledger {
                money: wire.money,
                shards: wire.shards,
                candies: wire.candies,
                candies_bought: wire.candies_bought,
                chest_keys: wire.chest_keys,
                last_chest_tier: wire.last_chest_tier.max(1),
                chest_awarded: wire.chest_awarded,
            },
        }
    }
}
