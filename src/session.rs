//! Per-account sessions.
//!
//! A [`PlayerSession`] owns the live snapshot of one account and is the only
//! writer of it. It loads through the store, runs actions through the
//! orchestrator, persists the result and then applies the returned events to
//! the seen-set. A [`SessionRegistry`] hands out one locked session per
//! username, so an idle tick and a player action on the same account never
//! interleave, while ticks for different accounts run in parallel.

use crate::accrual::AccrualReport;
use crate::collaborators::{backfill_seen, Authenticator, SeenLedger, SnapshotStore};
use crate::error::{SessionError, StoreError};
use crate::orchestrator::{Action, ActionContext, Event, Orchestrator, Outcome};
use crate::snapshot::PlayerSnapshot;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, warn};

/// Engine and collaborators shared by every session.
#[derive(Clone)]
pub struct Services {
    pub engine: Arc<Orchestrator>,
    pub seen: Arc<dyn SeenLedger>,
    pub store: Arc<dyn SnapshotStore>,
    pub auth: Arc<dyn Authenticator>,
}

/// The single writer of one account's snapshot.
pub struct PlayerSession {
    services: Services,
    snapshot: PlayerSnapshot,
    rng: ChaCha8Rng,
}

pub type SharedSession = Arc<Mutex<PlayerSession>>;

impl PlayerSession {
    /// Load (or register) `username` and backfill its seen-set from what it
    /// already owns.
    pub fn open(services: Services, username: &str) -> Result<Self, StoreError> {
        Self::open_seeded(services, username, rand::random())
    }

    /// Like [`PlayerSession::open`] with a fixed chest RNG seed.
    pub fn open_seeded(services: Services, username: &str, seed: u64) -> Result<Self, StoreError> {
        let snapshot = services.store.load_or_create(username)?;
        backfill_seen(&snapshot, services.seen.as_ref());
        Ok(Self {
            services,
            snapshot,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    pub fn username(&self) -> &str {
        &self.snapshot.username
    }

    pub fn snapshot(&self) -> &PlayerSnapshot {
        &self.snapshot
    }

    /// Run one action.
    ///
    /// The new snapshot is persisted before the seen-set is touched and
    /// before the session adopts it, so a failed save changes nothing.
    pub fn apply(&mut self, action: Action) -> Result<Outcome, SessionError> {
        let seen = self.services.seen.all_seen(&self.snapshot.username);
        let ctx = ActionContext {
            seen: &seen,
            auth: self.services.auth.as_ref(),
        };
        let outcome = self
            .services
            .engine
            .apply(&self.snapshot, &action, &ctx, &mut self.rng)?;

        self.services.store.save(&outcome.snapshot)?;

        let username = outcome.snapshot.username.as_str();
        for event in &outcome.events {
            match event {
                Event::Seen(key) => self.services.seen.mark_seen(username, key),
                Event::Reset => self.services.seen.clear(username),
                _ => {}
            }
        }

        self.snapshot = outcome.snapshot.clone();
        Ok(outcome)
    }

    /// Idle accrual over `elapsed_secs`.
    pub fn tick(&mut self, elapsed_secs: f64) -> Result<AccrualReport, SessionError> {
        let outcome = self.apply(Action::Tick { elapsed_secs })?;
        Ok(outcome.accrual().cloned().unwrap_or_default())
    }
}

/// Username → session map with per-account locking.
pub struct SessionRegistry {
    services: Services,
    sessions: RwLock<HashMap<String, SharedSession>>,
}

impl SessionRegistry {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// The session for `username`, opening it on first use.
    pub fn session(&self, username: &str) -> Result<SharedSession, StoreError> {
        if let Some(session) = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(username)
        {
            return Ok(Arc::clone(session));
        }

        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = sessions.get(username) {
            return Ok(Arc::clone(session));
        }
        let session = Arc::new(Mutex::new(PlayerSession::open(
            self.services.clone(),
            username,
        )?));
        sessions.insert(username.to_string(), Arc::clone(&session));
        debug!(user = username, "Opened session");
        Ok(session)
    }

    /// Run `action` for `username` under its account lock.
    pub fn apply(&self, username: &str, action: Action) -> Result<Outcome, SessionError> {
        let session = self.session(username)?;
        let mut session = session.lock().unwrap_or_else(PoisonError::into_inner);
        session.apply(action)
    }

    /// Tick every open session in parallel.
    ///
    /// Results are sorted by username.
    pub fn tick_all(&self, elapsed_secs: f64) -> Vec<(String, Result<AccrualReport, SessionError>)> {
        let sessions: Vec<(String, SharedSession)> = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, session)| (name.clone(), Arc::clone(session)))
            .collect();

        let mut results: Vec<_> = sessions
            .par_iter()
            .map(|(name, session)| {
                let mut session = session.lock().unwrap_or_else(PoisonError::into_inner);
                let result = session.tick(elapsed_secs);
                if let Err(err) = &result {
                    warn!(user = %name, error = %err, "Idle tick failed");
                }
                (name.clone(), result)
            })
            .collect();
        results.sort_by(|a, b| a.0.cmp(&b.0));
        results
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{InMemorySeenLedger, MemoryStore, StaticCredentials};
    use crate::creature_key::CreatureKey;
    use crate::error::ProgressError;
    use crate::ledger::ShardKind;

    fn services() -> (Services, Arc<InMemorySeenLedger>, Arc<MemoryStore>) {
        let seen = Arc::new(InMemorySeenLedger::new());
        let store = Arc::new(MemoryStore::new());
        let services = Services {
            engine: Arc::new(Orchestrator::standard()),
            seen: seen.clone(),
            store: store.clone(),
            auth: Arc::new(
                StaticCredentials::new()
                    .with("ash", "pw")
                    .with("misty", "mistypw"),
            ),
        };
        (services, seen, store)
    }

    #[test]
    fn test_session_persists_and_marks_seen() {
        let (services, seen, store) = services();
        let mut session = PlayerSession::open_seeded(services, "ash", 1).unwrap();

        session
            .apply(Action::SelectStarter(CreatureKey::new("charmander")))
            .unwrap();
        assert!(seen.is_seen("ash", "charmander"));

        let report = session.tick(3.0).unwrap();
        assert_eq!(report.money, 6.0);
        let stored = store.load("ash").unwrap().unwrap();
        assert_eq!(&stored, session.snapshot());
    }

    #[test]
    fn test_rejected_action_changes_nothing() {
        let (services, _seen, store) = services();
        let mut session = PlayerSession::open_seeded(services, "ash", 1).unwrap();
        let before = store.load("ash").unwrap();

        let err = session
            .apply(Action::BuyCreature {
                key: CreatureKey::new("abra"),
                kind: ShardKind::Common,
            })
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Progress(ProgressError::InsufficientResource(_))
        ));
        assert_eq!(store.load("ash").unwrap(), before);
    }

    #[test]
    fn test_reset_clears_seen_set() {
        let (services, seen, _store) = services();
        let mut session = PlayerSession::open_seeded(services, "ash", 1).unwrap();
        session
            .apply(Action::SelectStarter(CreatureKey::new("squirtle")))
            .unwrap();

        session
            .apply(Action::Reset {
                user_id: "ash".into(),
                credential: "pw".into(),
            })
            .unwrap();
        assert!(seen.all_seen("ash").is_empty());
        assert_eq!(session.snapshot(), &PlayerSnapshot::new("ash"));
    }

    #[test]
    fn test_reset_with_foreign_credential_is_refused() {
        let (services, seen, store) = services();
        let mut session = PlayerSession::open_seeded(services, "ash", 1).unwrap();
        session
            .apply(Action::SelectStarter(CreatureKey::new("bulbasaur")))
            .unwrap();
        session.tick(100.0).unwrap();
        let before = session.snapshot().clone();

        let err = session
            .apply(Action::Reset {
                user_id: "misty".into(),
                credential: "mistypw".into(),
            })
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Progress(ProgressError::Unauthorized)
        ));
        assert_eq!(session.snapshot(), &before);
        assert_eq!(store.load("ash").unwrap().as_ref(), Some(&before));
        assert!(seen.is_seen("ash", "bulbasaur"));
    }

    #[test]
    fn test_registry_ticks_all_accounts() {
        let (services, _seen, _store) = services();
        let registry = SessionRegistry::new(services);
        for (name, starter) in [("ash", "bulbasaur"), ("misty", "squirtle"), ("brock", "charmander")] {
            registry
                .apply(name, Action::SelectStarter(CreatureKey::new(starter)))
                .unwrap();
        }
        assert_eq!(registry.len(), 3);

        let results = registry.tick_all(5.0);
        let names: Vec<&str> = results.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, ["ash", "brock", "misty"]);
        for (_, result) in &results {
            assert_eq!(result.as_ref().unwrap().exp, 5.0);
        }

        let session = registry.session("misty").unwrap();
        let session = session.lock().unwrap();
        assert_eq!(session.snapshot().roster.slots()[0].exp, 5.0);
    }
}
