//! Creature key module.
//!
//! Provides the `CreatureKey` type, the catalog identifier of a species
//! (`"bulbasaur"`, `"nidoran♀"`, ...). Keys are shared `Arc<str>` values so
//! cloning them into slots, bench entries and events stays cheap.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::sync::Arc;

/// Identifier of a creature species in the catalog.
///
/// A player owns at most one creature per key, so the key also identifies
/// an owned creature inside a roster.
///
/// # Examples
///
/// ```rust
/// use idledex::CreatureKey;
///
/// let a = CreatureKey::new("pikachu");
/// let b: CreatureKey = "pikachu".into();
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "pikachu");
/// ```
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct CreatureKey(Arc<str>);

impl Serialize for CreatureKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.as_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CreatureKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(CreatureKey::from(s))
    }
}

impl CreatureKey {
    /// Create a key from a string slice.
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    /// The raw key text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CreatureKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CreatureKey {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

// Lets `HashMap<CreatureKey, _>` be queried with a plain `&str`.
impl Borrow<str> for CreatureKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CreatureKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
