//! Economy ledger.
//!
//! Money, shards, candy and chest keys, together with the only rules that
//! may change them. Every spend is check-then-deduct: a failed spend leaves
//! the balance untouched.

use crate::error::{ProgressError, Resource};
use crate::progression::ProgressionCurve;
use serde::{Deserialize, Serialize};

/// Shard currency tiers, used to buy creatures of the matching rarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShardKind {
    Common,
    Rare,
}

impl ShardKind {
    pub fn resource(self) -> Resource {
        match self {
            ShardKind::Common => Resource::CommonShards,
            ShardKind::Rare => Resource::RareShards,
        }
    }
}

impl std::fmt::Display for ShardKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShardKind::Common => f.write_str("common"),
            ShardKind::Rare => f.write_str("rare"),
        }
    }
}

/// Candy tiers, consumed by evolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandyKind {
    Rare,
    Epic,
}

impl CandyKind {
    pub fn resource(self) -> Resource {
        match self {
            CandyKind::Rare => Resource::RareCandy,
            CandyKind::Epic => Resource::EpicCandy,
        }
    }
}

/// Shard balances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Shards {
    pub common: u32,
    pub rare: u32,
}

impl Shards {
    pub fn get(&self, kind: ShardKind) -> u32 {
        match kind {
            ShardKind::Common => self.common,
            ShardKind::Rare => self.rare,
        }
    }

    fn get_mut(&mut self, kind: ShardKind) -> &mut u32 {
        match kind {
            ShardKind::Common => &mut self.common,
            ShardKind::Rare => &mut self.rare,
        }
    }
}

/// Per-kind candy counters (held, or bought over the account's lifetime).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Candies {
    pub rare: u32,
    pub epic: u32,
}

impl Candies {
    pub fn get(&self, kind: CandyKind) -> u32 {
        match kind {
            CandyKind::Rare => self.rare,
            CandyKind::Epic => self.epic,
        }
    }

    fn get_mut(&mut self, kind: CandyKind) -> &mut u32 {
        match kind {
            CandyKind::Rare => &mut self.rare,
            CandyKind::Epic => &mut self.epic,
        }
    }
}

/// A player's balances.
///
/// `candies_bought` only ever grows; it drives the candy price curve and is
/// zeroed solely by an account reset (which replaces the whole ledger).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    pub money: f64,
    pub shards: Shards,
    pub candies: Candies,
    pub candies_bought: Candies,
    pub chest_keys: u32,
    pub last_chest_tier: u32,
    pub chest_awarded: bool,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            money: 0.0,
            shards: Shards::default(),
            candies: Candies::default(),
            candies_bought: Candies::default(),
            chest_keys: 0,
            last_chest_tier: 1,
            chest_awarded: false,
        }
    }
}

impl Ledger {
    pub fn can_afford(&self, amount: f64) -> bool {
        self.money >= amount
    }

    /// Deduct `amount` money.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use idledex::{Ledger, ProgressError};
    ///
    /// let mut ledger = Ledger { money: 30.0, ..Ledger::default() };
    /// ledger.spend_money(20.0).unwrap();
    /// assert_eq!(ledger.money, 10.0);
    /// assert!(matches!(
    ///     ledger.spend_money(20.0),
    ///     Err(ProgressError::InsufficientFunds { .. })
    /// ));
    /// assert_eq!(ledger.money, 10.0);
    /// ```
    pub fn spend_money(&mut self, amount: f64) -> Result<(), ProgressError> {
        if !self.can_afford(amount) {
            return Err(ProgressError::InsufficientFunds {
                needed: amount,
                available: self.money,
            });
        }
        self.money -= amount;
        Ok(())
    }

    /// Idle income of one creature for one second: `rate · level · 2`.
    pub fn credit_idle(&mut self, curve: &ProgressionCurve, rate: f64, level: u32) {
        self.credit_idle_over(curve, rate, level, 1.0);
    }

    /// Idle income of one creature over `elapsed_secs` seconds.
    pub fn credit_idle_over(
        &mut self,
        curve: &ProgressionCurve,
        rate: f64,
        level: u32,
        elapsed_secs: f64,
    ) -> f64 {
        let earned = curve.idle_income(rate, level) * elapsed_secs;
        self.money += earned;
        earned
    }

    /// Buy one candy of `kind` at the current curve price.
    ///
    /// Returns the price paid.
    pub fn buy_candy(
        &mut self,
        curve: &ProgressionCurve,
        kind: CandyKind,
    ) -> Result<u64, ProgressError> {
        let price = curve.candy_price(kind, self.candies_bought.get(kind));
        self.spend_money(price as f64)?;
        *self.candies.get_mut(kind) += 1;
        *self.candies_bought.get_mut(kind) += 1;
        Ok(price)
    }

    pub fn spend_shards(&mut self, kind: ShardKind, amount: u32) -> Result<(), ProgressError> {
        let balance = self.shards.get_mut(kind);
        if *balance < amount {
            return Err(ProgressError::InsufficientResource(kind.resource()));
        }
        *balance -= amount;
        Ok(())
    }

    pub fn credit_shards(&mut self, kind: ShardKind, amount: u32) {
        let balance = self.shards.get_mut(kind);
        *balance = balance.saturating_add(amount);
    }

    pub fn spend_candy(&mut self, kind: CandyKind, amount: u32) -> Result<(), ProgressError> {
        let balance = self.candies.get_mut(kind);
        if *balance < amount {
            return Err(ProgressError::InsufficientResource(kind.resource()));
        }
        *balance -= amount;
        Ok(())
    }

    /// Grant chest keys. Only tier-ups call this.
    pub fn award_chest_keys(&mut self, n: u32) {
        self.chest_keys = self.chest_keys.saturating_add(n);
    }

    pub fn spend_chest_keys(&mut self, n: u32) -> Result<(), ProgressError> {
        if self.chest_keys < n {
            return Err(ProgressError::InsufficientResource(Resource::ChestKeys));
        }
        self.chest_keys -= n;
        Ok(())
    }
}
