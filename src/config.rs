//! Economy configuration.
//!
//! Every tunable number of the engine, grouped by concern and loadable from
//! TOML. Missing sections and fields fall back to the standard economy.
//!
//! ## Example `economy.toml`
//!
//! ```toml
//! starters = ["bulbasaur", "charmander", "squirtle"]
//! tick_period_secs = 1.0
//!
//! [curve]
//! exp_base = 10.0
//! exp_growth = 1.4
//!
//! [shop]
//! creature_price = 20
//!
//! [chest.first_chest]
//! common_shards = 10
//! rare_shards = 4
//! creature = "pikachu"
//!
//! [chest.table]
//! rare_shard_chance = 0.25
//! creature_chance = 0.01
//! ```

use crate::creature_key::CreatureKey;
use crate::error::ConfigError;
use crate::progression::ProgressionCurve;
use serde::{Deserialize, Serialize};

/// Inclusive `[min, max]` shard amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardRange {
    pub min: u32,
    pub max: u32,
}

impl ShardRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, amount: u32) -> bool {
        (self.min..=self.max).contains(&amount)
    }
}

/// Shop prices that are not on a curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopConfig {
    /// Shards of the matching rarity needed to buy one creature.
    pub creature_price: u32,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self { creature_price: 20 }
    }
}

/// The one-time reward of an account's first chest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirstChestBonus {
    pub common_shards: u32,
    pub rare_shards: u32,
    pub creature: CreatureKey,
}

impl Default for FirstChestBonus {
    fn default() -> Self {
        Self {
            common_shards: 10,
            rare_shards: 4,
            creature: CreatureKey::new("pikachu"),
        }
    }
}

/// Odds and amounts of an ordinary chest roll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardTableConfig {
    /// Common shards, always granted.
    pub common_shards: ShardRange,
    /// Chance that a chest also holds rare shards.
    pub rare_shard_chance: f64,
    pub rare_shards: ShardRange,
    /// Chance that a chest holds a creature from `creature_pool`.
    pub creature_chance: f64,
    pub creature_pool: Vec<CreatureKey>,
    /// Rare shards granted instead of a creature when the pool is exhausted.
    pub duplicate_rare_shards: u32,
}

impl Default for RewardTableConfig {
    fn default() -> Self {
        Self {
            common_shards: ShardRange::new(1, 5),
            rare_shard_chance: 0.25,
            rare_shards: ShardRange::new(1, 2),
            creature_chance: 0.01,
            creature_pool: vec![CreatureKey::new("pikachu")],
            duplicate_rare_shards: 5,
        }
    }
}

/// Chest rewards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChestConfig {
    pub first_chest: FirstChestBonus,
    pub table: RewardTableConfig,
}

/// Top-level economy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    pub curve: ProgressionCurve,
    pub shop: ShopConfig,
    pub chest: ChestConfig,
    /// Species a new account may pick as its first creature.
    pub starters: Vec<CreatureKey>,
    /// Idle tick cadence. Accrual is linear, so this only sets granularity.
    pub tick_period_secs: f64,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            curve: ProgressionCurve::STANDARD,
            shop: ShopConfig::default(),
            chest: ChestConfig::default(),
            starters: ["bulbasaur", "charmander", "squirtle"]
                .into_iter()
                .map(CreatureKey::new)
                .collect(),
            tick_period_secs: 1.0,
        }
    }
}

fn ensure(condition: bool, message: &str) -> Result<(), ConfigError> {
    if condition {
        Ok(())
    } else {
        Err(ConfigError::Invalid(message.to_string()))
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn growth(value: f64) -> bool {
    value.is_finite() && value > 1.0
}

fn probability(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

impl EconomyConfig {
    /// Validates all parameters.
    ///
    /// Returns the first failure found.
    ///
    /// # Validation Rules
    /// - Curve bases and multipliers must be positive
    /// - Curve growth factors must exceed 1
    /// - Probabilities must be in `[0.0, 1.0]`
    /// - Shard ranges must not be inverted
    /// - At least one starter, and a positive tick period
    pub fn validate(&self) -> Result<(), ConfigError> {
        let curve = &self.curve;
        ensure(positive(curve.exp_base), "Exp base must be positive")?;
        ensure(growth(curve.exp_growth), "Exp growth must be greater than 1")?;
        ensure(positive(curve.tier_base), "Tier base must be positive")?;
        ensure(growth(curve.tier_growth), "Tier growth must be greater than 1")?;
        ensure(
            positive(curve.upgrade_cost_per_level),
            "Upgrade cost per level must be positive",
        )?;
        ensure(
            positive(curve.idle_money_multiplier),
            "Idle money multiplier must be positive",
        )?;
        ensure(positive(curve.rare_candy_base), "Rare candy base must be positive")?;
        ensure(
            growth(curve.rare_candy_growth),
            "Rare candy growth must be greater than 1",
        )?;
        ensure(positive(curve.epic_candy_base), "Epic candy base must be positive")?;
        ensure(
            growth(curve.epic_candy_growth),
            "Epic candy growth must be greater than 1",
        )?;

        ensure(self.shop.creature_price > 0, "Creature price must be positive")?;

        let table = &self.chest.table;
        ensure(
            table.common_shards.min <= table.common_shards.max,
            "Common shard range is inverted",
        )?;
        ensure(
            table.rare_shards.min <= table.rare_shards.max,
            "Rare shard range is inverted",
        )?;
        ensure(
            probability(table.rare_shard_chance),
            "Rare shard chance must be in [0.0, 1.0]",
        )?;
        ensure(
            probability(table.creature_chance),
            "Creature chance must be in [0.0, 1.0]",
        )?;

        ensure(!self.starters.is_empty(), "At least one starter is required")?;
        ensure(positive(self.tick_period_secs), "Tick period must be positive")?;
        Ok(())
    }

    /// Parses and validates a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config = toml::from_str::<Self>(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn is_starter(&self, key: &str) -> bool {
        self.starters.iter().any(|starter| starter.as_str() == key)
    }

    /// Ticks of `tick_period_secs` needed to cover `secs`, rounded up.
    pub fn ticks_for(&self, secs: f64) -> u64 {
        if !(secs.is_finite() && secs > 0.0) {
            return 0;
        }
        (secs / self.tick_period_secs).ceil() as u64
    }
}
