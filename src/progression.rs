//! Progression math.
//!
//! Pure functions for level thresholds, trainer tiers, upgrade costs and
//! candy prices. Geometric curves are evaluated as an explicit product
//! (`base * growth * growth * ...`) rather than with `powf`, so every target
//! that follows IEEE-754 produces the same bits for the same inputs. A client
//! running the same code predicts exactly what the server will accept.

use crate::ledger::CandyKind;
use serde::{Deserialize, Serialize};

/// `base * growth^steps`, evaluated by repeated multiplication.
fn geometric(base: f64, growth: f64, steps: u32) -> f64 {
    let mut value = base;
    for _ in 0..steps {
        value *= growth;
    }
    value
}

/// Tunable constants of every progression formula.
///
/// `ProgressionCurve::default()` is the standard curve:
///
/// | formula | value |
/// |---|---|
/// | `exp_to_next(level)` | `10 · 1.4^(level−1)` |
/// | `tier_requirement(tier)` | `20 · 1.2^(tier−1)` |
/// | `upgrade_cost(level)` | `20 · level` |
/// | idle money per second | `base_rate · level · 2` |
/// | rare candy price | `round(500 · 1.5^bought)` |
/// | epic candy price | `round(5000 · 1.25^bought)` |
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionCurve {
    pub exp_base: f64,
    pub exp_growth: f64,
    pub tier_base: f64,
    pub tier_growth: f64,
    pub upgrade_cost_per_level: f64,
    pub idle_money_multiplier: f64,
    pub rare_candy_base: f64,
    pub rare_candy_growth: f64,
    pub epic_candy_base: f64,
    pub epic_candy_growth: f64,
}

impl ProgressionCurve {
    /// The standard curve.
    pub const STANDARD: ProgressionCurve = ProgressionCurve {
        exp_base: 10.0,
        exp_growth: 1.4,
        tier_base: 20.0,
        tier_growth: 1.2,
        upgrade_cost_per_level: 20.0,
        idle_money_multiplier: 2.0,
        rare_candy_base: 500.0,
        rare_candy_growth: 1.5,
        epic_candy_base: 5000.0,
        epic_candy_growth: 1.25,
    };

    /// Exp a creature must bank at `level` before it can be upgraded.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use idledex::ProgressionCurve;
    ///
    /// let curve = ProgressionCurve::STANDARD;
    /// assert_eq!(curve.exp_to_next(1), 10.0);
    /// assert!((curve.exp_to_next(2) - 14.0).abs() < 1e-9);
    /// ```
    pub fn exp_to_next(&self, level: u32) -> f64 {
        geometric(self.exp_base, self.exp_growth, level.max(1) - 1)
    }

    /// Trainer exp needed to advance from `tier` to `tier + 1`.
    pub fn tier_requirement(&self, tier: u32) -> f64 {
        geometric(self.tier_base, self.tier_growth, tier.max(1) - 1)
    }

    /// Money cost of raising a creature from `level` to `level + 1`.
    pub fn upgrade_cost(&self, level: u32) -> f64 {
        self.upgrade_cost_per_level * f64::from(level)
    }

    /// Money a slotted creature earns per second.
    pub fn idle_income(&self, base_rate: f64, level: u32) -> f64 {
        base_rate * f64::from(level) * self.idle_money_multiplier
    }

    /// Price of the next candy of `kind` after `bought` earlier purchases.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use idledex::{CandyKind, ProgressionCurve};
    ///
    /// let curve = ProgressionCurve::STANDARD;
    /// assert_eq!(curve.candy_price(CandyKind::Rare, 0), 500);
    /// assert_eq!(curve.candy_price(CandyKind::Rare, 1), 750);
    /// assert_eq!(curve.candy_price(CandyKind::Epic, 1), 6250);
    /// ```
    pub fn candy_price(&self, kind: CandyKind, bought: u32) -> u64 {
        let (base, growth) = match kind {
            CandyKind::Rare => (self.rare_candy_base, self.rare_candy_growth),
            CandyKind::Epic => (self.epic_candy_base, self.epic_candy_growth),
        };
        geometric(base, growth, bought).round() as u64
    }

    /// Derive the trainer tier paid for by `total_exp`.
    ///
    /// Starting at tier 1, requirements are consumed while the remainder
    /// still covers the next one. Non-finite or negative totals count as
    /// zero exp.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use idledex::ProgressionCurve;
    ///
    /// let curve = ProgressionCurve::STANDARD;
    /// assert_eq!(curve.derive_tier(0.0).tier, 1);
    /// assert_eq!(curve.derive_tier(19.9).tier, 1);
    /// assert_eq!(curve.derive_tier(20.0).tier, 2);
    /// // 20 + 24 = 44 reaches tier 3
    /// assert_eq!(curve.derive_tier(44.0).tier, 3);
    /// ```
    pub fn derive_tier(&self, total_exp: f64) -> TierProgress {
        let total = if total_exp.is_finite() && total_exp > 0.0 {
            total_exp
        } else {
            0.0
        };

        let mut tier = 1u32;
        let mut remainder = total;
        let mut requirement = self.tier_base;
        while remainder >= requirement {
            remainder -= requirement;
            tier += 1;
            requirement *= self.tier_growth;
        }

        TierProgress {
            tier,
            remainder,
            requirement,
        }
    }

    /// Sum of `tier_requirement(1..=tier)`: the trainer exp at which
    /// `tier + 1` is reached.
    pub fn cumulative_requirement(&self, tier: u32) -> f64 {
        let mut total = 0.0;
        let mut requirement = self.tier_base;
        for _ in 0..tier {
            total += requirement;
            requirement *= self.tier_growth;
        }
        total
    }
}

impl Default for ProgressionCurve {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Result of a trainer-tier derivation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierProgress {
    /// Highest tier fully paid for.
    pub tier: u32,
    /// Exp carried into the current tier.
    pub remainder: f64,
    /// Exp needed to go from `tier` to `tier + 1`.
    pub requirement: f64,
}

/// Trainer tier at which the next slot unlocks, given `slot_count` slots.
///
/// Thresholds are triangular numbers: the second slot opens at tier 3, the
/// third at tier 6, the fourth at tier 10.
pub fn next_slot_unlock_tier(slot_count: usize) -> u64 {
    let l = slot_count as u64;
    (l + 1) * (l + 2) / 2
}

/// Whether a player at `tier` with `slot_count` slots earns a new slot.
pub fn slot_unlock_due(slot_count: usize, tier: u32) -> bool {
    u64::from(tier) >= next_slot_unlock_tier(slot_count)
}

/// `exp_to_next` on the standard curve.
pub fn exp_to_next(level: u32) -> f64 {
    ProgressionCurve::STANDARD.exp_to_next(level)
}

/// `tier_requirement` on the standard curve.
pub fn tier_exp_requirement(tier: u32) -> f64 {
    ProgressionCurve::STANDARD.tier_requirement(tier)
}

/// `upgrade_cost` on the standard curve.
pub fn upgrade_cost(level: u32) -> f64 {
    ProgressionCurve::STANDARD.upgrade_cost(level)
}

/// `candy_price` on the standard curve.
pub fn candy_price(kind: CandyKind, bought: u32) -> u64 {
    ProgressionCurve::STANDARD.candy_price(kind, bought)
}
