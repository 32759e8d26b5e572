//! Catalog check example
//!
//! This example demonstrates:
//! - Validating the built-in catalog and its evolution graph
//! - Printing every evolution chain with its level gates
//! - Loading an economy config from TOML (first argument, optional)
//! - Rejecting a catalog with a cyclic evolution link
//!
//! Usage: `cargo run --example catalog_check -- [economy.toml]`

use idledex::evolution::EvolutionGraph;
use idledex::pokedex::listing;
use idledex::*;
use std::collections::HashSet;
use std::error::Error;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            println!("Loading economy config from {path}");
            EconomyConfig::from_toml(&std::fs::read_to_string(&path)?)?
        }
        None => EconomyConfig::default(),
    };

    let catalog = Catalog::standard();
    let graph = EvolutionGraph::from_catalog(&catalog)?;
    println!("Catalog: {} species, valid", catalog.len());

    println!("\n=== Evolution chains ===");
    for root in graph.roots() {
        let chain: Vec<String> = graph
            .chain(&root)
            .iter()
            .map(|key| match catalog.get(key.as_str()).and_then(|entry| entry.evolution()) {
                Some((_, level)) => format!("{key} (lv {level})"),
                None => key.to_string(),
            })
            .collect();
        println!("  {}", chain.join(" → "));
    }

    println!("\n=== Curve ===");
    let curve = &config.curve;
    for level in [1, 2, 5, 10, 16, 32] {
        println!(
            "  level {level:>2}: {:>8.1} exp to next, upgrade costs {:>6.0}",
            curve.exp_to_next(level),
            curve.upgrade_cost(level)
        );
    }
    for tier in 1..=5 {
        println!(
            "  tier {tier}: needs {:.1} exp ({:.1} cumulative)",
            curve.tier_requirement(tier),
            curve.cumulative_requirement(tier)
        );
    }

    let engine = Orchestrator::new(catalog.clone(), config)?;
    println!("\nEngine accepted the config ({} starters)", engine.config().starters.len());

    println!("\n=== Dex for a new account ===");
    let snapshot = PlayerSnapshot::new("new-player");
    for row in listing(engine.catalog(), &snapshot, &HashSet::new()) {
        println!("  #{:03} {:<12} {:?} {:?}", row.dex, row.name, row.rarity, row.status);
    }

    println!("\n=== Broken catalog ===");
    let mut json: serde_json::Value = serde_json::from_str(&catalog.to_json()?)?;
    json["venusaur"]["evolvesTo"] = serde_json::json!("bulbasaur");
    json["venusaur"]["evolutionLevel"] = serde_json::json!(50);
    match Catalog::from_json(&json.to_string()) {
        Ok(_) => println!("  unexpectedly accepted"),
        Err(err) => println!("  rejected: {err}"),
    }

    Ok(())
}
