//! Error types.
//!
//! `ProgressError` is what the orchestrator returns when it rejects an
//! action. Every variant is recoverable and is reported with the input
//! snapshot left untouched. The remaining enums cover catalog integrity,
//! configuration and persistence faults.

use crate::creature_key::CreatureKey;
use thiserror::Error;

/// Format an evolution cycle as `a -> b -> a`.
fn format_cycle_path(path: &[CreatureKey]) -> String {
    if path.is_empty() {
        return String::from("(empty cycle)");
    }
    path.iter()
        .map(|key| key.as_str())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// A countable resource an action can run short of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    CommonShards,
    RareShards,
    RareCandy,
    EpicCandy,
    ChestKeys,
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Resource::CommonShards => "common shards",
            Resource::RareShards => "rare shards",
            Resource::RareCandy => "rare candy",
            Resource::EpicCandy => "epic candy",
            Resource::ChestKeys => "chest keys",
        };
        f.write_str(name)
    }
}

/// Rejection reasons for a player action.
///
/// # Examples
///
/// ```rust
/// use idledex::{ProgressError, Resource};
///
/// let err = ProgressError::InsufficientResource(Resource::ChestKeys);
/// assert_eq!(err.to_string(), "Not enough chest keys");
/// ```
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProgressError {
    /// Money balance is below the price of the action.
    #[error("Not enough money: need {needed}, have {available}")]
    InsufficientFunds { needed: f64, available: f64 },

    /// Shards, candy or chest keys are below what the action consumes.
    #[error("Not enough {0}")]
    InsufficientResource(Resource),

    /// The creature has not banked enough exp for its next level.
    #[error("Not ready to level up: {exp} of {required} exp")]
    NotReady { exp: f64, required: f64 },

    /// A level, catalog or account rule forbids the action.
    #[error("Not eligible: {0}")]
    NotEligible(String),

    /// The species has already been seen by this account.
    #[error("Already owned: {0}")]
    AlreadyOwned(CreatureKey),

    /// Unknown slot index, bench key or catalog key.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The reset credential was rejected.
    #[error("Unauthorized")]
    Unauthorized,
}

/// Broken roster invariants, found by [`crate::roster::Roster::check_invariants`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RosterViolation {
    /// Bench order is not exactly the bench's key set.
    #[error("Bench order out of sync with bench entries")]
    BenchOrderMismatch,

    /// The same key sits in two slots.
    #[error("{0} occupies more than one slot")]
    DuplicateSlotKey(CreatureKey),

    /// A key is both slotted and benched.
    #[error("{0} is both slotted and benched")]
    SlottedAndBenched(CreatureKey),
}

/// Integrity faults in the reference catalog.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CatalogError {
    /// An entry evolves into a key the catalog does not define.
    #[error("{from} evolves into unknown species {to}")]
    UnknownEvolutionTarget { from: CreatureKey, to: CreatureKey },

    /// Evolution links loop back on themselves.
    #[error("Evolution cycle: {}", format_cycle_path(.path))]
    Cycle { path: Vec<CreatureKey> },

    /// A chain has more than three stages.
    #[error("Evolution chain starting at {root} has {length} stages (max 3)")]
    ChainTooLong { root: CreatureKey, length: usize },

    /// Two species evolve into the same target.
    #[error("{target} is the evolution of both {first} and {second}")]
    SharedEvolutionTarget {
        target: CreatureKey,
        first: CreatureKey,
        second: CreatureKey,
    },

    /// Rarity does not step up along an evolution link.
    #[error("{from} -> {to} does not increase rarity")]
    RarityNotIncreasing { from: CreatureKey, to: CreatureKey },

    /// Entry data out of range (rates, evolution level).
    #[error("Invalid entry {0}: {1}")]
    InvalidEntry(CreatureKey, String),

    /// The catalog source could not be parsed.
    #[error("Catalog parse error: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Parse(err.to_string())
    }
}

/// Economy configuration faults.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Persistence faults raised by snapshot stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid username: {0:?}")]
    InvalidUsername(String),
}

/// Failures of a session action: a rejected transition or a persistence
/// fault.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Progress(#[from] ProgressError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProgressError::AlreadyOwned(CreatureKey::new("pikachu"));
        assert!(err.to_string().contains("pikachu"));

        let err = ProgressError::InsufficientFunds {
            needed: 20.0,
            available: 4.5,
        };
        assert_eq!(err.to_string(), "Not enough money: need 20, have 4.5");
    }

    #[test]
    fn test_cycle_error_display() {
        let a = CreatureKey::new("gloom");
        let b = CreatureKey::new("vileplume");
        let err = CatalogError::Cycle {
            path: vec![a.clone(), b.clone(), a.clone()],
        };
        let display = err.to_string();
        assert!(display.starts_with("Evolution cycle"));
        assert!(display.contains("gloom -> vileplume -> gloom"));
    }

    #[test]
    fn test_empty_cycle_display() {
        let err = CatalogError::Cycle { path: Vec::new() };
        assert!(err.to_string().contains("(empty cycle)"));
    }
}
