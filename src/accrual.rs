//! Idle accrual engine.
//!
//! One tick credits every occupied slot with money and exp for the elapsed
//! interval. Accrual is linear in time, so a late tick covering two periods
//! pays exactly what two punctual ticks would have.
//!
//! A slot whose species is missing from the catalog is a data-integrity
//! fault: it earns nothing, the fault is logged and listed in the report,
//! and every other slot accrues normally.

use crate::catalog::Catalog;
use crate::creature_key::CreatureKey;
use crate::ledger::Ledger;
use crate::progression::ProgressionCurve;
use crate::roster::Roster;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Contribution of one slot to a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotAccrual {
    pub slot: usize,
    pub key: CreatureKey,
    pub money: f64,
    pub exp: f64,
}

/// A slot that could not accrue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccrualFault {
    UnknownSpecies { slot: usize, key: CreatureKey },
}

impl std::fmt::Display for AccrualFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccrualFault::UnknownSpecies { slot, key } => {
                write!(f, "slot {slot} holds unknown species {key}")
            }
        }
    }
}

/// Breakdown of one tick.
///
/// # Examples
///
/// ```rust
/// use idledex::accrual::accrue;
/// use idledex::roster::{CreatureState, Roster};
/// use idledex::{Catalog, CreatureKey, Ledger, ProgressionCurve};
///
/// let catalog = Catalog::standard();
/// let mut roster = Roster::new();
/// roster.bench_mut().insert(CreatureKey::new("bulbasaur"), CreatureState::FRESH);
/// roster.assign(0, "bulbasaur").unwrap();
/// let mut ledger = Ledger::default();
///
/// let report = accrue(&mut roster, &mut ledger, &catalog, &ProgressionCurve::STANDARD, 10.0);
/// assert_eq!(report.money, 20.0);
/// assert_eq!(report.exp, 10.0);
/// assert_eq!(roster.slots()[0].exp, 10.0);
/// assert!(report.faults.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccrualReport {
    pub elapsed_secs: f64,
    /// Total money credited.
    pub money: f64,
    /// Total exp credited across slots.
    pub exp: f64,
    /// Per-slot breakdown, in slot order.
    pub slots: Vec<SlotAccrual>,
    pub faults: Vec<AccrualFault>,
}

impl AccrualReport {
    fn record(&mut self, entry: SlotAccrual) {
        self.money += entry.money;
        self.exp += entry.exp;
        self.slots.push(entry);
    }
}

/// Per-second totals over the active slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IncomeRates {
    pub money_per_sec: f64,
    pub exp_per_sec: f64,
}

/// Advance every occupied slot by `elapsed_secs`.
///
/// `elapsed_secs` is trusted here; the orchestrator rejects negative and
/// non-finite intervals before calling in.
pub fn accrue(
    roster: &mut Roster,
    ledger: &mut Ledger,
    catalog: &Catalog,
    curve: &ProgressionCurve,
    elapsed_secs: f64,
) -> AccrualReport {
    let mut report = AccrualReport {
        elapsed_secs,
        ..AccrualReport::default()
    };

    for (index, slot) in roster.slots_mut().iter_mut().enumerate() {
        let Some(key) = slot.key.as_ref() else {
            continue;
        };
        let Some(entry) = catalog.get(key.as_str()) else {
            warn!(slot = index, creature = %key, "Skipping accrual for unknown species");
            report.faults.push(AccrualFault::UnknownSpecies {
                slot: index,
                key: key.clone(),
            });
            continue;
        };

        let money = ledger.credit_idle_over(curve, entry.base_rate, slot.level, elapsed_secs);
        let exp = entry.exp_rate() * f64::from(slot.level) * elapsed_secs;
        slot.exp += exp;

        report.record(SlotAccrual {
            slot: index,
            key: key.clone(),
            money,
            exp,
        });
    }

    report
}

/// What the current slots earn per second.
pub fn income_rates(roster: &Roster, catalog: &Catalog, curve: &ProgressionCurve) -> IncomeRates {
    roster
        .slots()
        .iter()
        .filter_map(|slot| {
            let entry = catalog.get(slot.key.as_ref()?.as_str())?;
            Some((entry, slot.level))
        })
        .fold(IncomeRates::default(), |mut rates, (entry, level)| {
            rates.money_per_sec += curve.idle_income(entry.base_rate, level);
            rates.exp_per_sec += entry.exp_rate() * f64::from(level);
            rates
        })
}
