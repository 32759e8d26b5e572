//! Boundary collaborators.
//!
//! The engine never performs I/O itself. Sessions talk to these traits for
//! the seen-set, snapshot persistence and credential checks; in-memory and
//! JSON-directory implementations are provided.

use crate::creature_key::CreatureKey;
use crate::error::StoreError;
use crate::snapshot::PlayerSnapshot;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info};

/// Append-only set of species each account has ever held.
///
/// Only a full account reset clears it.
pub trait SeenLedger: Send + Sync {
    /// Idempotent set-add.
    fn mark_seen(&self, username: &str, key: &CreatureKey);
    fn is_seen(&self, username: &str, key: &str) -> bool;
    fn all_seen(&self, username: &str) -> HashSet<CreatureKey>;
    fn clear(&self, username: &str);
}

/// Seen-set held in process memory.
#[derive(Debug, Default)]
pub struct InMemorySeenLedger {
    seen: RwLock<HashMap<String, HashSet<CreatureKey>>>,
}

impl InMemorySeenLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SeenLedger for InMemorySeenLedger {
    fn mark_seen(&self, username: &str, key: &CreatureKey) {
        let mut seen = self.seen.write().unwrap_or_else(PoisonError::into_inner);
        seen.entry(username.to_string())
            .or_default()
            .insert(key.clone());
    }

    fn is_seen(&self, username: &str, key: &str) -> bool {
        let seen = self.seen.read().unwrap_or_else(PoisonError::into_inner);
        seen.get(username).is_some_and(|keys| keys.contains(key))
    }

    fn all_seen(&self, username: &str) -> HashSet<CreatureKey> {
        let seen = self.seen.read().unwrap_or_else(PoisonError::into_inner);
        seen.get(username).cloned().unwrap_or_default()
    }

    fn clear(&self, username: &str) {
        let mut seen = self.seen.write().unwrap_or_else(PoisonError::into_inner);
        seen.remove(username);
    }
}

/// Keys a snapshot contributes to its account's seen-set: every slotted
/// and benched species.
pub fn seen_contributions(snapshot: &PlayerSnapshot) -> Vec<CreatureKey> {
    snapshot.roster.owned_keys()
}

/// Mark every owned species of `snapshot` as seen.
///
/// Returns how many keys were new to the ledger.
pub fn backfill_seen(snapshot: &PlayerSnapshot, seen: &dyn SeenLedger) -> usize {
    let mut added = 0;
    for key in seen_contributions(snapshot) {
        if !seen.is_seen(&snapshot.username, key.as_str()) {
            seen.mark_seen(&snapshot.username, &key);
            added += 1;
        }
    }
    if added > 0 {
        info!(user = %snapshot.username, added, "Backfilled seen species");
    }
    added
}

/// Snapshot persistence.
///
/// Loaded snapshots are always reconciled (see [`PlayerSnapshot`]'s wire
/// decoding).
pub trait SnapshotStore: Send + Sync {
    fn load(&self, username: &str) -> Result<Option<PlayerSnapshot>, StoreError>;
    fn save(&self, snapshot: &PlayerSnapshot) -> Result<(), StoreError>;

    /// Load an account, registering it with default state if it is new.
    fn load_or_create(&self, username: &str) -> Result<PlayerSnapshot, StoreError> {
        if let Some(snapshot) = self.load(username)? {
            return Ok(snapshot);
        }
        let snapshot = PlayerSnapshot::new(username);
        self.save(&snapshot)?;
        info!(user = username, "Registered new player");
        Ok(snapshot)
    }
}

/// Usernames become file names, so keep them to a safe alphabet.
fn check_username(username: &str) -> Result<(), StoreError> {
    let valid = !username.is_empty()
        && username.len() <= 64
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidUsername(username.to_string()))
    }
}

/// Store that keeps encoded snapshots in memory.
///
/// Snapshots pass through the JSON wire form on every save and load, like
/// they would with a real backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw JSON document, bypassing encoding.
    pub fn insert_raw(&self, username: &str, json: impl Into<String>) {
        let mut documents = self.documents.write().unwrap_or_else(PoisonError::into_inner);
        documents.insert(username.to_string(), json.into());
    }

    pub fn len(&self) -> usize {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self, username: &str) -> Result<Option<PlayerSnapshot>, StoreError> {
        let documents = self.documents.read().unwrap_or_else(PoisonError::into_inner);
        match documents.get(username) {
            Some(json) => Ok(Some(PlayerSnapshot::from_json(json)?)),
            None => Ok(None),
        }
    }

    fn save(&self, snapshot: &PlayerSnapshot) -> Result<(), StoreError> {
        let json = snapshot.to_json()?;
        let mut documents = self.documents.write().unwrap_or_else(PoisonError::into_inner);
        documents.insert(snapshot.username.clone(), json);
        Ok(())
    }
}

/// Store that keeps one `<username>.json` file per account.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    /// Use `root` as the store directory, creating it if needed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, username: &str) -> Result<PathBuf, StoreError> {
        check_username(username)?;
        Ok(self.root.join(format!("{username}.json")))
    }
}

impl SnapshotStore for JsonDirStore {
    fn load(&self, username: &str) -> Result<Option<PlayerSnapshot>, StoreError> {
        let path = self.path_for(username)?;
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)?;
        debug!(user = username, path = %path.display(), "Loaded snapshot");
        Ok(Some(PlayerSnapshot::from_json(&json)?))
    }

    fn save(&self, snapshot: &PlayerSnapshot) -> Result<(), StoreError> {
        let path = self.path_for(&snapshot.username)?;
        let json = serde_json::to_string_pretty(snapshot)?;
        // Write then rename so a crash never leaves a truncated document.
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, json)?;
        fs::rename(&staging, &path)?;
        Ok(())
    }
}

/// Credential check used by account reset.
pub trait Authenticator: Send + Sync {
    fn verify(&self, user_id: &str, credential: &str) -> bool;
}

/// Fixed user → credential table.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    credentials: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, user_id: impl Into<String>, credential: impl Into<String>) -> Self {
        self.credentials.insert(user_id.into(), credential.into());
        self
    }
}

impl Authenticator for StaticCredentials {
    fn verify(&self, user_id: &str, credential: &str) -> bool {
        self.credentials
            .get(user_id)
            .is_some_and(|expected| expected == credential)
    }
}
