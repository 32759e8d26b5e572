//! Chest opening.
//!
//! A chest costs one key. An account's first chest always pays out the
//! configured [`FirstChestBonus`]; every other chest is rolled against a
//! [`RewardTable`]. Rolls draw from a caller-supplied RNG, so a seeded
//! generator replays the same rewards.

use crate::config::{FirstChestBonus, RewardTableConfig, ShardRange};
use crate::creature_key::CreatureKey;
use crate::error::ProgressError;
use crate::ledger::{Ledger, ShardKind};
use crate::roster::{CreatureState, Roster};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::info;

/// What a single chest yields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChestRoll {
    pub common_shards: u32,
    pub rare_shards: u32,
    pub creature: Option<CreatureKey>,
}

/// Keys a roll must not grant.
pub struct RollContext<'a> {
    /// Species the account owns or has seen, including grants from earlier
    /// chests in the same opening.
    pub excluded: &'a HashSet<CreatureKey>,
}

/// Source of ordinary chest rewards.
///
/// Implementations must be deterministic for a given RNG state.
pub trait RewardTable: Send + Sync {
    fn roll(&self, rng: &mut dyn RngCore, ctx: &RollContext<'_>) -> ChestRoll;
}

/// Reward table driven by [`RewardTableConfig`] odds.
///
/// Per chest: common shards uniform in their range; rare shards with
/// `rare_shard_chance`; a creature from the pool with `creature_chance`,
/// falling back to `duplicate_rare_shards` when every pool species is
/// excluded.
#[derive(Debug, Clone, Default)]
pub struct WeightedRewardTable {
    config: RewardTableConfig,
}

impl WeightedRewardTable {
    pub fn new(config: RewardTableConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RewardTableConfig {
        &self.config
    }
}

fn sample(rng: &mut dyn RngCore, range: ShardRange) -> u32 {
    if range.min >= range.max {
        return range.min;
    }
    rng.gen_range(range.min..=range.max)
}

fn chance(rng: &mut dyn RngCore, p: f64) -> bool {
    rng.gen::<f64>() < p
}

impl RewardTable for WeightedRewardTable {
    fn roll(&self, rng: &mut dyn RngCore, ctx: &RollContext<'_>) -> ChestRoll {
        let config = &self.config;
        let mut roll = ChestRoll {
            common_shards: sample(rng, config.common_shards),
            ..ChestRoll::default()
        };

        if chance(rng, config.rare_shard_chance) {
            roll.rare_shards += sample(rng, config.rare_shards);
        }

        if chance(rng, config.creature_chance) {
            let pool: Vec<&CreatureKey> = config
                .creature_pool
                .iter()
                .filter(|key| !ctx.excluded.contains(*key))
                .collect();
            if pool.is_empty() {
                roll.rare_shards += config.duplicate_rare_shards;
            } else {
                let pick = rng.gen_range(0..pool.len());
                roll.creature = Some(pool[pick].clone());
            }
        }

        roll
    }
}

/// Outcome of opening one or more chests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChestReport {
    pub keys_spent: u32,
    pub first_chest: bool,
    pub common_shards: u32,
    pub rare_shards: u32,
    /// New bench entries, in grant order.
    pub creatures: Vec<CreatureKey>,
}

impl ChestReport {
    fn absorb(&mut self, roll: ChestRoll) -> Option<CreatureKey> {
        self.common_shards += roll.common_shards;
        self.rare_shards += roll.rare_shards;
        roll.creature
    }
}

/// Open `count` chests against `ledger` and `roster`.
///
/// Keys are checked before anything changes. Granted creatures go to the
/// bench at level 1 and are added to `excluded`; a species that is already
/// owned is never overwritten.
pub fn open_chests(
    ledger: &mut Ledger,
    roster: &mut Roster,
    count: u32,
    bonus: &FirstChestBonus,
    table: &dyn RewardTable,
    rng: &mut dyn RngCore,
    excluded: &mut HashSet<CreatureKey>,
) -> Result<ChestReport, ProgressError> {
    if count == 0 {
        return Err(ProgressError::NotEligible("must open at least one chest".into()));
    }
    ledger.spend_chest_keys(count)?;

    let mut report = ChestReport {
        keys_spent: count,
        ..ChestReport::default()
    };
    let mut rolls = count;

    if !ledger.chest_awarded {
        ledger.chest_awarded = true;
        report.first_chest = true;
        rolls -= 1;
        let guaranteed = ChestRoll {
            common_shards: bonus.common_shards,
            rare_shards: bonus.rare_shards,
            creature: Some(bonus.creature.clone()),
        };
        if let Some(key) = report.absorb(guaranteed) {
            grant(roster, &mut report, excluded, key);
        }
    }

    for _ in 0..rolls {
        let roll = table.roll(rng, &RollContext { excluded: &*excluded });
        if let Some(key) = report.absorb(roll) {
            grant(roster, &mut report, excluded, key);
        }
    }

    ledger.credit_shards(ShardKind::Common, report.common_shards);
    ledger.credit_shards(ShardKind::Rare, report.rare_shards);

    info!(
        keys = report.keys_spent,
        first = report.first_chest,
        common = report.common_shards,
        rare = report.rare_shards,
        creatures = report.creatures.len(),
        "Opened chests"
    );
    Ok(report)
}

fn grant(
    roster: &mut Roster,
    report: &mut ChestReport,
    excluded: &mut HashSet<CreatureKey>,
    key: CreatureKey,
) {
    excluded.insert(key.clone());
    if roster.owns(key.as_str()) {
        return;
    }
    roster.bench_mut().insert(key.clone(), CreatureState::FRESH);
    report.creatures.push(key);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn table(creature_chance: f64) -> WeightedRewardTable {
        WeightedRewardTable::new(RewardTableConfig {
            creature_chance,
            ..RewardTableConfig::default()
        })
    }

    #[test]
    fn test_first_chest_bonus() {
        let mut ledger = Ledger {
            chest_keys: 1,
            ..Ledger::default()
        };
        let mut roster = Roster::new();
        let mut excluded = HashSet::new();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let report = open_chests(
            &mut ledger,
            &mut roster,
            1,
            &FirstChestBonus::default(),
            &table(0.0),
            &mut rng,
            &mut excluded,
        )
        .unwrap();

        assert!(report.first_chest);
        assert_eq!(report.common_shards, 10);
        assert_eq!(report.rare_shards, 4);
        assert_eq!(report.creatures, vec![CreatureKey::new("pikachu")]);
        assert_eq!(ledger.shards.common, 10);
        assert_eq!(ledger.shards.rare, 4);
        assert_eq!(ledger.chest_keys, 0);
        assert!(ledger.chest_awarded);
        assert_eq!(roster.bench().get("pikachu"), Some(&CreatureState::FRESH));
    }

    #[test]
    fn test_rolls_stay_in_configured_ranges() {
        let table = table(0.0);
        let excluded = HashSet::new();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..500 {
            let roll = table.roll(&mut rng, &RollContext { excluded: &excluded });
            assert!((1..=5).contains(&roll.common_shards));
            assert!(roll.rare_shards <= 2);
            assert!(roll.creature.is_none());
        }
    }

    #[test]
    fn test_exhausted_pool_pays_rare_shards() {
        let table = table(1.0);
        let excluded: HashSet<_> = [CreatureKey::new("pikachu")].into_iter().collect();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let roll = table.roll(&mut rng, &RollContext { excluded: &excluded });
        assert!(roll.creature.is_none());
        assert!(roll.rare_shards >= 5);
    }

    #[test]
    fn test_creature_granted_once_per_opening() {
        let mut ledger = Ledger {
            chest_keys: 4,
            chest_awarded: true,
            ..Ledger::default()
        };
        let mut roster = Roster::new();
        let mut excluded = HashSet::new();
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        let report = open_chests(
            &mut ledger,
            &mut roster,
            4,
            &FirstChestBonus::default(),
            &table(1.0),
            &mut rng,
            &mut excluded,
        )
        .unwrap();

        assert!(!report.first_chest);
        assert_eq!(report.creatures, vec![CreatureKey::new("pikachu")]);
        // Later chests fell back to duplicate shards.
        assert!(report.rare_shards >= 15);
    }

    #[test]
    fn test_same_seed_same_rewards() {
        let open = |seed| {
            let mut ledger = Ledger {
                chest_keys: 10,
                chest_awarded: true,
                ..Ledger::default()
            };
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            open_chests(
                &mut ledger,
                &mut Roster::new(),
                10,
                &FirstChestBonus::default(),
                &table(0.01),
                &mut rng,
                &mut HashSet::new(),
            )
            .unwrap()
        };
        assert_eq!(open(99), open(99));
    }

    #[test]
    fn test_insufficient_keys_changes_nothing() {
        let mut ledger = Ledger::default();
        let mut roster = Roster::new();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let err = open_chests(
            &mut ledger,
            &mut roster,
            1,
            &FirstChestBonus::default(),
            &table(0.0),
            &mut rng,
            &mut HashSet::new(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ProgressError::InsufficientResource(crate::error::Resource::ChestKeys)
        );
        assert_eq!(ledger, Ledger::default());
        assert!(roster.bench().is_empty());
    }
}
