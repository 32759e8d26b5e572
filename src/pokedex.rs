//! Master dex listing.
//!
//! Every catalog species in dex order, annotated with what it means to one
//! player: owned now, seen before, buyable, or neither.

use crate::catalog::{Catalog, Rarity};
use crate::creature_key::CreatureKey;
use crate::ledger::ShardKind;
use crate::snapshot::PlayerSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A species' standing for one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DexStatus {
    /// Currently slotted or benched.
    Owned,
    /// Held at some point, evolved away since.
    Seen,
    /// Never held and buyable with these shards.
    ForSale(ShardKind),
    NotForSale,
}

/// One row of the listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DexRow {
    pub key: CreatureKey,
    pub dex: u32,
    pub name: String,
    pub rarity: Rarity,
    pub status: DexStatus,
}

/// Build the listing for `snapshot`, sorted by dex number then key.
///
/// # Examples
///
/// ```rust
/// use idledex::pokedex::{listing, DexStatus};
/// use idledex::ledger::ShardKind;
/// use idledex::{Catalog, PlayerSnapshot};
/// use std::collections::HashSet;
///
/// let rows = listing(&Catalog::standard(), &PlayerSnapshot::new("ash"), &HashSet::new());
/// assert_eq!(rows[0].key.as_str(), "bulbasaur");
/// assert_eq!(rows[0].status, DexStatus::ForSale(ShardKind::Common));
/// assert_eq!(rows[1].status, DexStatus::NotForSale);
/// ```
pub fn listing(
    catalog: &Catalog,
    snapshot: &PlayerSnapshot,
    seen: &HashSet<CreatureKey>,
) -> Vec<DexRow> {
    let owned: HashSet<CreatureKey> = snapshot.roster.owned_keys().into_iter().collect();

    let mut rows: Vec<DexRow> = catalog
        .iter()
        .map(|(key, entry)| {
            let status = if owned.contains(key) {
                DexStatus::Owned
            } else if seen.contains(key) {
                DexStatus::Seen
            } else {
                match entry.rarity.shard_kind() {
                    Some(kind) if entry.purchasable => DexStatus::ForSale(kind),
                    _ => DexStatus::NotForSale,
                }
            };
            DexRow {
                key: key.clone(),
                dex: entry.dex,
                name: entry.name.clone(),
                rarity: entry.rarity,
                status,
            }
        })
        .collect();

    rows.sort_by(|a, b| a.dex.cmp(&b.dex).then_with(|| a.key.cmp(&b.key)));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::CreatureState;

    #[test]
    fn test_statuses() {
        let catalog = Catalog::standard();
        let mut snapshot = PlayerSnapshot::new("ash");
        snapshot
            .roster
            .bench_mut()
            .insert(CreatureKey::new("ivysaur"), CreatureState::FRESH);
        let seen: HashSet<CreatureKey> = ["bulbasaur", "ivysaur"]
            .into_iter()
            .map(CreatureKey::new)
            .collect();

        let rows = listing(&catalog, &snapshot, &seen);
        let status = |key: &str| rows.iter().find(|row| row.key.as_str() == key).map(|row| row.status);

        assert_eq!(rows.len(), catalog.len());
        assert_eq!(status("bulbasaur"), Some(DexStatus::Seen));
        assert_eq!(status("ivysaur"), Some(DexStatus::Owned));
        assert_eq!(status("meowth"), Some(DexStatus::ForSale(ShardKind::Rare)));
        assert_eq!(status("pikachu"), Some(DexStatus::NotForSale));
        assert_eq!(status("venusaur"), Some(DexStatus::NotForSale));
    }

    #[test]
    fn test_sorted_by_dex() {
        let rows = listing(&Catalog::standard(), &PlayerSnapshot::new("ash"), &HashSet::new());
        assert!(rows.windows(2).all(|pair| pair[0].dex <= pair[1].dex));
        assert_eq!(rows.last().map(|row| row.key.as_str()), Some("alakazam"));
    }
}
