//! Reference catalog.
//!
//! Read-only species data: income rates, rarity and evolution links. The
//! catalog is validated once on construction (see [`crate::evolution`]) and
//! is never mutated afterwards.

use crate::creature_key::CreatureKey;
use crate::error::CatalogError;
use crate::evolution::EvolutionGraph;
use crate::ledger::{CandyKind, ShardKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Species rarity. Evolution chains run common → rare → epic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
}

impl Rarity {
    /// Candy consumed when a creature of this rarity evolves.
    pub fn evolution_candy(self) -> Option<CandyKind> {
        match self {
            Rarity::Common => Some(CandyKind::Rare),
            Rarity::Rare => Some(CandyKind::Epic),
            Rarity::Epic => None,
        }
    }

    /// Shards that buy a creature of this rarity.
    pub fn shard_kind(self) -> Option<ShardKind> {
        match self {
            Rarity::Common => Some(ShardKind::Common),
            Rarity::Rare => Some(ShardKind::Rare),
            Rarity::Epic => None,
        }
    }
}

/// One species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub name: String,
    /// National dex number, used to order listings.
    #[serde(default)]
    pub dex: u32,
    /// Money and exp rate per level per second.
    pub base_rate: f64,
    /// Distinct exp rate; falls back to `base_rate`.
    #[serde(default)]
    pub exp_rate: Option<f64>,
    pub rarity: Rarity,
    #[serde(default)]
    pub evolves_to: Option<CreatureKey>,
    #[serde(default)]
    pub evolution_level: Option<u32>,
    /// Whether the species can be bought with shards.
    #[serde(default)]
    pub purchasable: bool,
}

impl CatalogEntry {
    pub fn exp_rate(&self) -> f64 {
        self.exp_rate.unwrap_or(self.base_rate)
    }

    /// Evolution target and the level it unlocks at.
    pub fn evolution(&self) -> Option<(&CreatureKey, u32)> {
        match (&self.evolves_to, self.evolution_level) {
            (Some(target), Some(level)) if level > 0 => Some((target, level)),
            _ => None,
        }
    }
}

/// Catalog lookup used by the engine.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: HashMap<CreatureKey, CatalogEntry>,
}

type Row = (&'static str, &'static str, u32, f64, Rarity, Option<(&'static str, u32)>, bool);

use Rarity::{Common, Epic, Rare};

#[rustfmt::skip]
const KANTO: &[Row] = &[
    ("bulbasaur",  "Bulbasaur",   1, 1.0, Common, Some(("ivysaur", 16)),    true),
    ("ivysaur",    "Ivysaur",     2, 1.5, Rare,   Some(("venusaur", 32)),   false),
    ("venusaur",   "Venusaur",    3, 2.0, Epic,   None,                     false),
    ("charmander", "Charmander",  4, 1.0, Common, Some(("charmeleon", 16)), true),
    ("charmeleon", "Charmeleon",  5, 1.5, Rare,   Some(("charizard", 32)),  false),
    ("charizard",  "Charizard",   6, 2.0, Epic,   None,                     false),
    ("squirtle",   "Squirtle",    7, 1.0, Common, Some(("wartortle", 16)),  true),
    ("wartortle",  "Wartortle",   8, 1.5, Rare,   Some(("blastoise", 32)),  false),
    ("blastoise",  "Blastoise",   9, 2.0, Epic,   None,                     false),
    ("pidgey",     "Pidgey",     16, 1.0, Common, Some(("pidgeotto", 16)),  true),
    ("pidgeotto",  "Pidgeotto",  17, 1.5, Rare,   Some(("pidgeot", 32)),    false),
    ("pidgeot",    "Pidgeot",    18, 2.0, Epic,   None,                     false),
    ("ekans",      "Ekans",      23, 1.5, Rare,   Some(("arbok", 32)),      true),
    ("arbok",      "Arbok",      24, 2.0, Epic,   None,                     false),
    ("pikachu",    "Pikachu",    25, 1.5, Rare,   Some(("raichu", 32)),     false),
    ("raichu",     "Raichu",     26, 2.0, Epic,   None,                     false),
    ("sandshrew",  "Sandshrew",  27, 1.5, Rare,   Some(("sandslash", 32)),  true),
    ("sandslash",  "Sandslash",  28, 2.0, Epic,   None,                     false),
    ("nidoran♀",   "Nidoran♀",   29, 1.0, Common, Some(("nidorina", 16)),   true),
    ("nidorina",   "Nidorina",   30, 1.5, Rare,   Some(("nidoqueen", 32)),  false),
    ("nidoqueen",  "Nidoqueen",  31, 2.0, Epic,   None,                     false),
    ("nidoran♂",   "Nidoran♂",   32, 1.0, Common, Some(("nidorino", 16)),   true),
    ("nidorino",   "Nidorino",   33, 1.5, Rare,   Some(("nidoking", 32)),   false),
    ("nidoking",   "Nidoking",   34, 2.0, Epic,   None,                     false),
    ("vulpix",     "Vulpix",     37, 1.5, Rare,   Some(("ninetales", 32)),  true),
    ("ninetales",  "Ninetales",  38, 2.0, Epic,   None,                     false),
    ("oddish",     "Oddish",     43, 1.0, Common, Some(("gloom", 16)),      true),
    ("gloom",      "Gloom",      44, 1.5, Rare,   Some(("vileplume", 32)),  false),
    ("vileplume",  "Vileplume",  45, 2.0, Epic,   None,                     false),
    ("diglett",    "Diglett",    50, 1.5, Rare,   Some(("dugtrio", 32)),    true),
    ("dugtrio",    "Dugtrio",    51, 2.0, Epic,   None,                     false),
    ("meowth",     "Meowth",     52, 1.5, Rare,   Some(("persian", 32)),    true),
    ("persian",    "Persian",    53, 2.0, Epic,   None,                     false),
    ("psyduck",    "Psyduck",    54, 1.5, Rare,   Some(("golduck", 32)),    true),
    ("golduck",    "Golduck",    55, 2.0, Epic,   None,                     false),
    ("poliwag",    "Poliwag",    60, 1.0, Common, Some(("poliwhirl", 16)),  true),
    ("poliwhirl",  "Poliwhirl",  61, 1.5, Rare,   Some(("poliwrath", 32)),  false),
    ("poliwrath",  "Poliwrath",  62, 2.0, Epic,   None,                     false),
    ("abra",       "Abra",       63, 1.0, Common, Some(("kadabra", 16)),    true),
    ("kadabra",    "Kadabra",    64, 1.5, Rare,   Some(("alakazam", 32)),   false),
    ("alakazam",   "Alakazam",   65, 2.0, Epic,   None,                     false),
];

impl Catalog {
    /// Build a catalog, validating evolution links and entry data.
    pub fn new(entries: HashMap<CreatureKey, CatalogEntry>) -> Result<Self, CatalogError> {
        let catalog = Self { entries };
        catalog.validate()?;
        Ok(catalog)
    }

    /// The built-in Kanto table (41 species).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use idledex::{Catalog, Rarity};
    ///
    /// let catalog = Catalog::standard();
    /// let bulbasaur = catalog.get("bulbasaur").unwrap();
    /// assert_eq!(bulbasaur.rarity, Rarity::Common);
    /// assert_eq!(bulbasaur.evolution().map(|(k, l)| (k.as_str(), l)), Some(("ivysaur", 16)));
    /// ```
    pub fn standard() -> Self {
        let entries = KANTO
            .iter()
            .map(|&(key, name, dex, base_rate, rarity, evolution, purchasable)| {
                let entry = CatalogEntry {
                    name: name.to_string(),
                    dex,
                    base_rate,
                    exp_rate: None,
                    rarity,
                    evolves_to: evolution.map(|(to, _)| CreatureKey::new(to)),
                    evolution_level: evolution.map(|(_, level)| level),
                    purchasable,
                };
                (CreatureKey::new(key), entry)
            })
            .collect();
        Self { entries }
    }

    /// Parse a catalog from a JSON object keyed by creature key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use idledex::Catalog;
    ///
    /// let json = r#"{
    ///     "mew": { "name": "Mew", "baseRate": 3.0, "expRate": 1.0, "rarity": "epic" }
    /// }"#;
    /// let catalog = Catalog::from_json(json).unwrap();
    /// assert_eq!(catalog.get("mew").unwrap().exp_rate(), 1.0);
    /// ```
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let entries: HashMap<CreatureKey, CatalogEntry> = serde_json::from_str(json)?;
        Self::new(entries)
    }

    pub fn to_json(&self) -> Result<String, CatalogError> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }

    /// Check entry data and evolution structure.
    pub fn validate(&self) -> Result<(), CatalogError> {
        for (key, entry) in &self.entries {
            if !(entry.base_rate.is_finite() && entry.base_rate > 0.0) {
                return Err(CatalogError::InvalidEntry(
                    key.clone(),
                    format!("base rate must be positive, got {}", entry.base_rate),
                ));
            }
            if let Some(rate) = entry.exp_rate {
                if !(rate.is_finite() && rate >= 0.0) {
                    return Err(CatalogError::InvalidEntry(
                        key.clone(),
                        format!("exp rate must be non-negative, got {rate}"),
                    ));
                }
            }
            if entry.evolves_to.is_some() != entry.evolution().is_some() {
                return Err(CatalogError::InvalidEntry(
                    key.clone(),
                    "evolution target needs a positive evolution level".into(),
                ));
            }
            if entry.purchasable && entry.rarity.shard_kind().is_none() {
                return Err(CatalogError::InvalidEntry(
                    key.clone(),
                    "epic species cannot be purchasable".into(),
                ));
            }
        }

        let graph = EvolutionGraph::from_catalog(self)?;
        graph.validate(self)
    }

    pub fn get(&self, key: &str) -> Option<&CatalogEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CreatureKey, &CatalogEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_is_valid() {
        let catalog = Catalog::standard();
        assert_eq!(catalog.len(), 41);
        catalog.validate().unwrap();
    }

    #[test]
    fn test_candy_by_rarity() {
        assert_eq!(Rarity::Common.evolution_candy(), Some(CandyKind::Rare));
        assert_eq!(Rarity::Rare.evolution_candy(), Some(CandyKind::Epic));
        assert_eq!(Rarity::Epic.evolution_candy(), None);
    }

    #[test]
    fn test_pikachu_is_chest_only() {
        let catalog = Catalog::standard();
        let pikachu = catalog.get("pikachu").unwrap();
        assert_eq!(pikachu.rarity, Rarity::Rare);
        assert!(!pikachu.purchasable);
        assert!(catalog.get("meowth").unwrap().purchasable);
    }

    #[test]
    fn test_exp_rate_defaults_to_base_rate() {
        let catalog = Catalog::standard();
        assert_eq!(catalog.get("gloom").unwrap().exp_rate(), 1.5);
    }

    #[test]
    fn test_rejects_bad_rate() {
        let json = r#"{ "missingno": { "name": "?", "baseRate": 0.0, "rarity": "common" } }"#;
        assert!(matches!(
            Catalog::from_json(json),
            Err(CatalogError::InvalidEntry(..))
        ));
    }

    #[test]
    fn test_json_round_trip_keeps_links() {
        let catalog = Catalog::standard();
        let json = catalog.to_json().unwrap();
        let back = Catalog::from_json(&json).unwrap();
        assert_eq!(back.get("kadabra"), catalog.get("kadabra"));
    }
}
