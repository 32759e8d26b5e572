//! # idledex - Deterministic Progression Engine for Idle Collection Games
//!
//! A progression and economy engine for idle creature-collection games:
//! - **Pure transitions**: `(snapshot, action) → Result<outcome, error>`
//! - **Deterministic** math (same input → same bits on every target)
//! - **Atomic** actions: a rejection never leaves a half-applied snapshot
//! - **Pluggable** collaborators for persistence, the seen-set and auth
//!
//! ## Core Concepts
//!
//! ### Action Pipeline
//!
//! ```text
//! [PlayerSnapshot] + [Action] → [Orchestrator] → [Outcome { snapshot, events }]
//! ```
//!
//! 1. **Snapshots** hold a player's slots, bench and balances
//! 2. **Actions** are idle ticks, upgrades, evolutions, purchases, chests
//! 3. **Events** report what happened, including the seen-set updates the
//!    session applies to its collaborators
//!
//! ### Key Features
//!
//! - **Idle Accrual**: slotted creatures earn money and exp, linear in time
//! - **Trainer Tiers**: derived live from total exp; award chest keys and
//!   unlock slots on triangular thresholds
//! - **Evolution Graph**: catalog chains are validated (no cycles, ≤ 3 stages)
//! - **Seeded Chests**: reward rolls replay exactly under a seeded RNG
//!
//! ## Example
//!
//! ```rust
//! use idledex::*;
//! use idledex::collaborators::StaticCredentials;
//! use idledex::orchestrator::{Action, ActionContext};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//! use std::collections::HashSet;
//!
//! let engine = Orchestrator::standard();
//! let seen = HashSet::new();
//! let auth = StaticCredentials::new();
//! let ctx = ActionContext { seen: &seen, auth: &auth };
//! let mut rng = ChaCha8Rng::seed_from_u64(0);
//!
//! let mut snapshot = PlayerSnapshot::new("ash");
//! snapshot.ledger.chest_keys = 1;
//!
//! let outcome = engine.apply(&snapshot, &Action::OpenChest(1), &ctx, &mut rng).unwrap();
//! assert_eq!(outcome.snapshot.ledger.shards.common, 10);
//! assert_eq!(outcome.snapshot.ledger.shards.rare, 4);
//! assert!(outcome.snapshot.roster.bench().contains("pikachu"));
//! ```
//!
//! ## Modules
//!
//! - [`creature_key`] - Species identifier type
//! - [`progression`] - Level, tier, cost and price curves
//! - [`catalog`] - Species reference data
//! - [`evolution`] - Evolution graph validation
//! - [`roster`] - Slots and bench
//! - [`ledger`] - Currency, shards, candy and chest keys
//! - [`accrual`] - Idle accrual ticks
//! - [`chest`] - Chest opening and reward tables
//! - [`snapshot`] - Player state and its wire form
//! - [`orchestrator`] - The action state machine
//! - [`collaborators`] - Seen-set, persistence and auth boundaries
//! - [`session`] - Per-account sessions and the registry
//! - [`pokedex`] - Dex listing
//! - [`config`] - Economy configuration
//! - [`error`] - Error types

pub mod accrual;
pub mod catalog;
pub mod chest;
pub mod collaborators;
pub mod config;
pub mod creature_key;
pub mod error;
pub mod evolution;
pub mod ledger;
pub mod orchestrator;
pub mod pokedex;
pub mod progression;
pub mod roster;
pub mod session;
pub mod snapshot;

// Re-export main types for convenience
pub use catalog::{Catalog, CatalogEntry, Rarity};
pub use config::EconomyConfig;
pub use creature_key::CreatureKey;
pub use error::{CatalogError, ConfigError, ProgressError, Resource, SessionError, StoreError};
pub use ledger::{CandyKind, Ledger, ShardKind};
pub use orchestrator::{Action, Event, Orchestrator, Outcome};
pub use progression::{ProgressionCurve, TierProgress};
pub use roster::{CreatureState, Location, Roster};
pub use snapshot::{PlayerSnapshot, TrainerStats};

// Re-export the standard-curve formulas
pub use progression::{candy_price, exp_to_next, tier_exp_requirement, upgrade_cost};
