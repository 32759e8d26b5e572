//! Idle session example
//!
//! This example demonstrates:
//! - Wiring the engine to in-memory collaborators
//! - Picking a starter and letting the idle loop run
//! - Upgrading, opening chests and buying with shards
//! - Ticking several accounts in parallel through the registry
//!
//! Run with `RUST_LOG=idledex=debug` to see the engine's own logging.

use idledex::collaborators::{InMemorySeenLedger, MemoryStore, SeenLedger, StaticCredentials};
use idledex::pokedex::{listing, DexStatus};
use idledex::session::{Services, SessionRegistry};
use idledex::*;
use std::error::Error;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let seen = Arc::new(InMemorySeenLedger::new());
    let services = Services {
        engine: Arc::new(Orchestrator::standard()),
        seen: seen.clone(),
        store: Arc::new(MemoryStore::new()),
        auth: Arc::new(StaticCredentials::new().with("ash", "pikachu")),
    };
    let registry = SessionRegistry::new(services);

    println!("=== New accounts ===");
    for (name, starter) in [("ash", "bulbasaur"), ("misty", "squirtle"), ("brock", "charmander")] {
        registry.apply(name, Action::SelectStarter(CreatureKey::new(starter)))?;
        println!("  {name} picked {starter}");
    }

    println!("\n=== One minute of idle time ===");
    let engine = Arc::clone(&registry.services().engine);
    let period = engine.config().tick_period_secs;
    for _ in 0..engine.config().ticks_for(60.0) {
        for (name, result) in registry.tick_all(period) {
            if let Err(err) = result {
                println!("  tick failed for {name}: {err}");
            }
        }
    }

    let ash = registry.session("ash")?;
    {
        let session = ash.lock().map_err(|_| "session lock poisoned")?;
        let snapshot = session.snapshot();
        let stats = engine.trainer_stats(snapshot);
        let rates = engine.income_rates(snapshot);
        println!("  money: {:.1}", snapshot.ledger.money);
        println!(
            "  tier {} ({:.0}/{:.0} exp into next), {} chest key(s), {} slot(s)",
            stats.tier,
            stats.exp_into_tier,
            stats.exp_for_next_tier,
            snapshot.ledger.chest_keys,
            snapshot.roster.slots().len()
        );
        println!(
            "  income: {:.1} money/s, {:.1} exp/s",
            rates.money_per_sec, rates.exp_per_sec
        );
    }

    println!("\n=== Upgrading bulbasaur ===");
    let bulbasaur = Location::Slot(0);
    loop {
        match registry.apply("ash", Action::Upgrade(bulbasaur.clone())) {
            Ok(outcome) => {
                for event in &outcome.events {
                    if let Event::Upgraded { key, level } = event {
                        println!("  {key} → level {level}");
                    }
                }
            }
            Err(err) => {
                println!("  stopped: {err}");
                break;
            }
        }
    }

    println!("\n=== Opening chests ===");
    let keys = {
        let session = ash.lock().map_err(|_| "session lock poisoned")?;
        session.snapshot().ledger.chest_keys
    };
    if keys > 0 {
        let outcome = registry.apply("ash", Action::OpenChest(keys))?;
        if let Some(report) = outcome.chest() {
            println!(
                "  {} key(s): +{} common, +{} rare shards, creatures {:?}",
                report.keys_spent,
                report.common_shards,
                report.rare_shards,
                report.creatures.iter().map(CreatureKey::as_str).collect::<Vec<_>>()
            );
        }
    } else {
        println!("  no keys yet");
    }

    println!("\n=== Shopping ===");
    let for_sale: Vec<(CreatureKey, ShardKind)> = {
        let session = ash.lock().map_err(|_| "session lock poisoned")?;
        let seen_keys = registry.services().seen.all_seen("ash");
        listing(engine.catalog(), session.snapshot(), &seen_keys)
            .into_iter()
            .filter_map(|row| match row.status {
                DexStatus::ForSale(kind) => Some((row.key, kind)),
                _ => None,
            })
            .collect()
    };
    for (key, kind) in for_sale {
        match registry.apply("ash", Action::BuyCreature { key: key.clone(), kind }) {
            Ok(_) => println!("  bought {key} with {kind} shards"),
            Err(SessionError::Progress(ProgressError::InsufficientResource(_))) => {}
            Err(err) => println!("  {key}: {err}"),
        }
    }

    let session = ash.lock().map_err(|_| "session lock poisoned")?;
    let snapshot = session.snapshot();
    println!("\n=== Final state for {} ===", snapshot.username);
    for (key, state) in snapshot.roster.creatures() {
        let location = snapshot.roster.locate(key.as_str()).map(|l| l.to_string()).unwrap_or_default();
        println!("  {location}: {key} lv {} ({:.1} exp)", state.level, state.exp);
    }
    println!("  seen: {} species", seen.all_seen("ash").len());

    Ok(())
}
