//! Progression orchestrator.
//!
//! Applies one [`Action`] to a [`PlayerSnapshot`] and returns the next
//! snapshot, or the reason the action was rejected. Every transition works
//! on a clone: a rejected action leaves the caller's snapshot exactly as it
//! was.
//!
//! Side effects that belong to collaborators (seen-set updates, the seen-set
//! wipe on reset) are not performed here; they are returned as [`Event`]s
//! for the session to apply.

use crate::accrual::{self, AccrualReport, IncomeRates};
use crate::catalog::Catalog;
use crate::chest::{self, ChestReport, RewardTable, WeightedRewardTable};
use crate::collaborators::Authenticator;
use crate::config::EconomyConfig;
use crate::creature_key::CreatureKey;
use crate::error::{ConfigError, ProgressError};
use crate::ledger::{CandyKind, ShardKind};
use crate::progression::slot_unlock_due;
use crate::roster::{CreatureState, Location};
use crate::snapshot::{PlayerSnapshot, TrainerStats};
use rand::RngCore;
use std::collections::HashSet;
use tracing::{debug, info};

/// A player action or an idle tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Idle accrual over `elapsed_secs`.
    Tick { elapsed_secs: f64 },
    /// Raise a creature one level.
    Upgrade(Location),
    /// Evolve a creature into its catalog successor.
    Evolve(Location),
    /// Put a benched (or differently slotted) creature into a slot.
    AssignToSlot { slot: usize, key: CreatureKey },
    /// Send a slot's creature to the bench.
    ClearSlot(usize),
    /// Spend chest keys.
    OpenChest(u32),
    /// Buy a species with shards of the given kind.
    BuyCreature { key: CreatureKey, kind: ShardKind },
    BuyCandy(CandyKind),
    /// Pick the first creature of a new account.
    SelectStarter(CreatureKey),
    /// Restore registration defaults. Needs a valid credential.
    Reset { user_id: String, credential: String },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Tick { .. } => "tick",
            Action::Upgrade(_) => "upgrade",
            Action::Evolve(_) => "evolve",
            Action::AssignToSlot { .. } => "assign",
            Action::ClearSlot(_) => "clear",
            Action::OpenChest(_) => "open_chest",
            Action::BuyCreature { .. } => "buy_creature",
            Action::BuyCandy(_) => "buy_candy",
            Action::SelectStarter(_) => "select_starter",
            Action::Reset { .. } => "reset",
        }
    }
}

/// Something a transition did.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The account now holds `key`; add it to the seen-set.
    Seen(CreatureKey),
    /// The account was restored to defaults; clear its seen-set.
    Reset,
    Accrued(AccrualReport),
    Upgraded { key: CreatureKey, level: u32 },
    Evolved {
        from: CreatureKey,
        to: CreatureKey,
        location: Location,
    },
    Assigned { slot: usize, key: CreatureKey },
    Cleared { slot: usize, key: Option<CreatureKey> },
    ChestOpened(ChestReport),
    CreatureBought { key: CreatureKey, kind: ShardKind },
    CandyBought { kind: CandyKind, price: u64 },
    StarterSelected(CreatureKey),
    TierUp { from: u32, to: u32, chest_keys: u32 },
    SlotUnlocked { index: usize },
}

/// Result of an accepted action.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub snapshot: PlayerSnapshot,
    pub events: Vec<Event>,
}

impl Outcome {
    pub fn accrual(&self) -> Option<&AccrualReport> {
        self.events.iter().find_map(|event| match event {
            Event::Accrued(report) => Some(report),
            _ => None,
        })
    }

    pub fn chest(&self) -> Option<&ChestReport> {
        self.events.iter().find_map(|event| match event {
            Event::ChestOpened(report) => Some(report),
            _ => None,
        })
    }

    /// Keys the seen-set must gain.
    pub fn seen_keys(&self) -> impl Iterator<Item = &CreatureKey> {
        self.events.iter().filter_map(|event| match event {
            Event::Seen(key) => Some(key),
            _ => None,
        })
    }
}

/// Read-only inputs a transition may consult.
pub struct ActionContext<'a> {
    /// The account's all-time seen-set.
    pub seen: &'a HashSet<CreatureKey>,
    pub auth: &'a dyn Authenticator,
}

/// What an evolution would do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvolutionPlan {
    pub from: CreatureKey,
    pub to: CreatureKey,
    pub candy: CandyKind,
}

/// The progression state machine.
///
/// # Examples
///
/// ```rust
/// use idledex::collaborators::StaticCredentials;
/// use idledex::orchestrator::{Action, ActionContext, Orchestrator};
/// use idledex::roster::Location;
/// use idledex::{CreatureKey, PlayerSnapshot};
/// use rand::SeedableRng;
/// use rand_chacha::ChaCha8Rng;
/// use std::collections::HashSet;
///
/// let engine = Orchestrator::standard();
/// let seen = HashSet::new();
/// let auth = StaticCredentials::new();
/// let ctx = ActionContext { seen: &seen, auth: &auth };
/// let mut rng = ChaCha8Rng::seed_from_u64(1);
///
/// let start = PlayerSnapshot::new("ash");
/// let pick = Action::SelectStarter(CreatureKey::new("bulbasaur"));
/// let snapshot = engine.apply(&start, &pick, &ctx, &mut rng).unwrap().snapshot;
///
/// // Ten seconds of idle time: 20 money, 10 exp.
/// let tick = Action::Tick { elapsed_secs: 10.0 };
/// let snapshot = engine.apply(&snapshot, &tick, &ctx, &mut rng).unwrap().snapshot;
///
/// let upgrade = Action::Upgrade(Location::Slot(0));
/// let snapshot = engine.apply(&snapshot, &upgrade, &ctx, &mut rng).unwrap().snapshot;
/// assert_eq!(snapshot.roster.slots()[0].level, 2);
/// assert_eq!(snapshot.roster.slots()[0].exp, 10.0);
/// assert_eq!(snapshot.ledger.money, 0.0);
/// ```
pub struct Orchestrator {
    catalog: Catalog,
    config: EconomyConfig,
    rewards: Box<dyn RewardTable>,
}

impl Orchestrator {
    /// Build an engine, checking that `config` is valid and only names
    /// species that `catalog` defines.
    pub fn new(catalog: Catalog, config: EconomyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let referenced = config
            .starters
            .iter()
            .chain(std::iter::once(&config.chest.first_chest.creature))
            .chain(config.chest.table.creature_pool.iter());
        for key in referenced {
            if !catalog.contains(key.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "{key} is not in the catalog"
                )));
            }
        }

        let rewards = Box::new(WeightedRewardTable::new(config.chest.table.clone()));
        Ok(Self {
            catalog,
            config,
            rewards,
        })
    }

    /// The built-in catalog with the default economy.
    pub fn standard() -> Self {
        Self {
            catalog: Catalog::standard(),
            config: EconomyConfig::default(),
            rewards: Box::new(WeightedRewardTable::default()),
        }
    }

    /// Replace the chest reward table.
    pub fn with_reward_table(mut self, rewards: Box<dyn RewardTable>) -> Self {
        self.rewards = rewards;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &EconomyConfig {
        &self.config
    }

    /// Apply `action` to `snapshot`.
    ///
    /// On success the returned snapshot has already been through a tier
    /// recompute (except after a reset). On failure nothing changed.
    pub fn apply(
        &self,
        snapshot: &PlayerSnapshot,
        action: &Action,
        ctx: &ActionContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<Outcome, ProgressError> {
        let mut next = snapshot.clone();
        let mut events = Vec::new();

        let result = match action {
            Action::Tick { elapsed_secs } => self.tick(&mut next, *elapsed_secs, &mut events),
            Action::Upgrade(location) => self.upgrade(&mut next, location, &mut events),
            Action::Evolve(location) => self.evolve(&mut next, location, &mut events),
            Action::AssignToSlot { slot, key } => Self::assign(&mut next, *slot, key, &mut events),
            Action::ClearSlot(slot) => Self::clear(&mut next, *slot, &mut events),
            Action::OpenChest(count) => self.open_chest(&mut next, *count, ctx, rng, &mut events),
            Action::BuyCreature { key, kind } => {
                self.buy_creature(&mut next, key, *kind, ctx, &mut events)
            }
            Action::BuyCandy(kind) => self.buy_candy(&mut next, *kind, &mut events),
            Action::SelectStarter(key) => self.select_starter(&mut next, key, &mut events),
            Action::Reset {
                user_id,
                credential,
            } => Self::reset(&mut next, user_id, credential, ctx, &mut events),
        };

        if let Err(err) = result {
            debug!(user = %snapshot.username, action = action.name(), error = %err, "Rejected action");
            return Err(err);
        }

        if !matches!(action, Action::Reset { .. }) {
            self.recompute_tier(&mut next, &mut events);
        }
        Ok(Outcome {
            snapshot: next,
            events,
        })
    }

    /// Award chest keys for new tiers and unlock at most one slot.
    pub fn recompute_tier(&self, snapshot: &mut PlayerSnapshot, events: &mut Vec<Event>) {
        let tier = self
            .config
            .curve
            .derive_tier(snapshot.roster.total_exp())
            .tier;

        let ledger = &mut snapshot.ledger;
        if tier > ledger.last_chest_tier {
            let from = ledger.last_chest_tier;
            let chest_keys = tier - from;
            ledger.award_chest_keys(chest_keys);
            ledger.last_chest_tier = tier;
            info!(user = %snapshot.username, from, to = tier, chest_keys, "Trainer tier up");
            events.push(Event::TierUp {
                from,
                to: tier,
                chest_keys,
            });
        }

        if slot_unlock_due(snapshot.roster.slots().len(), tier) {
            let index = snapshot.roster.push_slot();
            info!(user = %snapshot.username, slot = index, tier, "Unlocked slot");
            events.push(Event::SlotUnlocked { index });
        }
    }

    /// Would `Upgrade(location)` be accepted?
    pub fn can_upgrade(
        &self,
        snapshot: &PlayerSnapshot,
        location: &Location,
    ) -> Result<(), ProgressError> {
        let (_, state) = snapshot.roster.creature(location)?;
        self.check_upgrade(snapshot, state)
    }

    fn check_upgrade(
        &self,
        snapshot: &PlayerSnapshot,
        state: CreatureState,
    ) -> Result<(), ProgressError> {
        let curve = &self.config.curve;
        let cost = curve.upgrade_cost(state.level);
        if !snapshot.ledger.can_afford(cost) {
            return Err(ProgressError::InsufficientFunds {
                needed: cost,
                available: snapshot.ledger.money,
            });
        }
        let required = curve.exp_to_next(state.level);
        if state.exp < required {
            return Err(ProgressError::NotReady {
                exp: state.exp,
                required,
            });
        }
        Ok(())
    }

    /// Would `Evolve(location)` be accepted? Returns the evolution it
    /// would perform.
    pub fn can_evolve(
        &self,
        snapshot: &PlayerSnapshot,
        location: &Location,
    ) -> Result<EvolutionPlan, ProgressError> {
        let (key, state) = snapshot.roster.creature(location)?;
        let entry = self
            .catalog
            .get(key.as_str())
            .ok_or_else(|| ProgressError::NotFound(format!("unknown species {key}")))?;
        let (target, level) = entry
            .evolution()
            .ok_or_else(|| ProgressError::NotEligible(format!("{key} does not evolve")))?;
        if state.level < level {
            return Err(ProgressError::NotEligible(format!(
                "{key} evolves at level {level}, is level {}",
                state.level
            )));
        }
        let candy = entry
            .rarity
            .evolution_candy()
            .ok_or_else(|| ProgressError::NotEligible(format!("{key} is already epic")))?;
        // Only reachable from corrupted state; species keys stay unique.
        if snapshot.roster.owns(target.as_str()) {
            return Err(ProgressError::AlreadyOwned(target.clone()));
        }
        if snapshot.ledger.candies.get(candy) < 1 {
            return Err(ProgressError::InsufficientResource(candy.resource()));
        }
        Ok(EvolutionPlan {
            from: key,
            to: target.clone(),
            candy,
        })
    }

    pub fn income_rates(&self, snapshot: &PlayerSnapshot) -> IncomeRates {
        accrual::income_rates(&snapshot.roster, &self.catalog, &self.config.curve)
    }

    pub fn trainer_stats(&self, snapshot: &PlayerSnapshot) -> TrainerStats {
        snapshot.trainer_stats(&self.config.curve)
    }

    fn tick(
        &self,
        next: &mut PlayerSnapshot,
        elapsed_secs: f64,
        events: &mut Vec<Event>,
    ) -> Result<(), ProgressError> {
        if !(elapsed_secs.is_finite() && elapsed_secs >= 0.0) {
            return Err(ProgressError::NotEligible(format!(
                "invalid tick interval {elapsed_secs}"
            )));
        }
        let report = accrual::accrue(
            &mut next.roster,
            &mut next.ledger,
            &self.catalog,
            &self.config.curve,
            elapsed_secs,
        );
        events.push(Event::Accrued(report));
        Ok(())
    }

    fn upgrade(
        &self,
        next: &mut PlayerSnapshot,
        location: &Location,
        events: &mut Vec<Event>,
    ) -> Result<(), ProgressError> {
        let (key, state) = next.roster.creature(location)?;
        self.check_upgrade(next, state)?;

        next.ledger
            .spend_money(self.config.curve.upgrade_cost(state.level))?;
        let level = state.level + 1;
        next.roster.set_state(
            location,
            CreatureState {
                level,
                exp: state.exp,
            },
        )?;

        debug!(user = %next.username, creature = %key, level, "Upgraded");
        events.push(Event::Upgraded { key, level });
        Ok(())
    }

    fn evolve(
        &self,
        next: &mut PlayerSnapshot,
        location: &Location,
        events: &mut Vec<Event>,
    ) -> Result<(), ProgressError> {
        let plan = self.can_evolve(next, location)?;
        next.ledger.spend_candy(plan.candy, 1)?;
        let moved = next.roster.replace_species(location, plan.to.clone())?;

        info!(user = %next.username, from = %plan.from, to = %plan.to, "Evolved");
        events.push(Event::Evolved {
            from: plan.from,
            to: plan.to.clone(),
            location: moved,
        });
        events.push(Event::Seen(plan.to));
        Ok(())
    }

    fn assign(
        next: &mut PlayerSnapshot,
        slot: usize,
        key: &CreatureKey,
        events: &mut Vec<Event>,
    ) -> Result<(), ProgressError> {
        next.roster.slot(slot)?;
        match next.roster.slot_index_of(key.as_str()) {
            Some(current) if current == slot => return Ok(()),
            // Slot-to-slot move: bench it first, then assign.
            Some(current) => {
                next.roster.clear(current)?;
            }
            None => {}
        }
        next.roster.assign(slot, key.as_str())?;
        events.push(Event::Assigned {
            slot,
            key: key.clone(),
        });
        Ok(())
    }

    fn clear(
        next: &mut PlayerSnapshot,
        slot: usize,
        events: &mut Vec<Event>,
    ) -> Result<(), ProgressError> {
        let key = next.roster.clear(slot)?;
        events.push(Event::Cleared { slot, key });
        Ok(())
    }

    fn open_chest(
        &self,
        next: &mut PlayerSnapshot,
        count: u32,
        ctx: &ActionContext<'_>,
        rng: &mut dyn RngCore,
        events: &mut Vec<Event>,
    ) -> Result<(), ProgressError> {
        let mut excluded: HashSet<CreatureKey> = ctx.seen.clone();
        excluded.extend(next.roster.owned_keys());

        let report = chest::open_chests(
            &mut next.ledger,
            &mut next.roster,
            count,
            &self.config.chest.first_chest,
            self.rewards.as_ref(),
            rng,
            &mut excluded,
        )?;

        events.extend(report.creatures.iter().cloned().map(Event::Seen));
        events.push(Event::ChestOpened(report));
        Ok(())
    }

    fn buy_creature(
        &self,
        next: &mut PlayerSnapshot,
        key: &CreatureKey,
        kind: ShardKind,
        ctx: &ActionContext<'_>,
        events: &mut Vec<Event>,
    ) -> Result<(), ProgressError> {
        let entry = self
            .catalog
            .get(key.as_str())
            .ok_or_else(|| ProgressError::NotFound(format!("unknown species {key}")))?;
        if ctx.seen.contains(key) || next.roster.owns(key.as_str()) {
            return Err(ProgressError::AlreadyOwned(key.clone()));
        }
        if !entry.purchasable {
            return Err(ProgressError::NotEligible(format!("{key} is not for sale")));
        }
        if entry.rarity.shard_kind() != Some(kind) {
            return Err(ProgressError::NotEligible(format!(
                "{key} is not sold for {kind} shards"
            )));
        }

        next.ledger.spend_shards(kind, self.config.shop.creature_price)?;
        next.roster
            .bench_mut()
            .insert(key.clone(), CreatureState::FRESH);

        info!(user = %next.username, creature = %key, "Bought creature");
        events.push(Event::CreatureBought {
            key: key.clone(),
            kind,
        });
        events.push(Event::Seen(key.clone()));
        Ok(())
    }

    fn buy_candy(
        &self,
        next: &mut PlayerSnapshot,
        kind: CandyKind,
        events: &mut Vec<Event>,
    ) -> Result<(), ProgressError> {
        let price = next.ledger.buy_candy(&self.config.curve, kind)?;
        debug!(user = %next.username, ?kind, price, "Bought candy");
        events.push(Event::CandyBought { kind, price });
        Ok(())
    }

    fn select_starter(
        &self,
        next: &mut PlayerSnapshot,
        key: &CreatureKey,
        events: &mut Vec<Event>,
    ) -> Result<(), ProgressError> {
        if !self.catalog.contains(key.as_str()) {
            return Err(ProgressError::NotFound(format!("unknown species {key}")));
        }
        if !self.config.is_starter(key.as_str()) {
            return Err(ProgressError::NotEligible(format!("{key} is not a starter")));
        }
        if next.roster.owned_count() > 0 {
            return Err(ProgressError::NotEligible(
                "starter already chosen".to_string(),
            ));
        }

        next.roster
            .bench_mut()
            .insert(key.clone(), CreatureState::FRESH);
        next.roster.assign(0, key.as_str())?;

        info!(user = %next.username, creature = %key, "Selected starter");
        events.push(Event::StarterSelected(key.clone()));
        events.push(Event::Seen(key.clone()));
        Ok(())
    }

    fn reset(
        next: &mut PlayerSnapshot,
        user_id: &str,
        credential: &str,
        ctx: &ActionContext<'_>,
        events: &mut Vec<Event>,
    ) -> Result<(), ProgressError> {
        // A valid credential only resets its own account.
        if user_id != next.username || !ctx.auth.verify(user_id, credential) {
            return Err(ProgressError::Unauthorized);
        }
        *next = next.reset();
        info!(user = %next.username, "Reset account");
        events.push(Event::Reset);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::StaticCredentials;
    use crate::error::Resource;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct Harness {
        engine: Orchestrator,
        seen: HashSet<CreatureKey>,
        auth: StaticCredentials,
        rng: ChaCha8Rng,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                engine: Orchestrator::standard(),
                seen: HashSet::new(),
                auth: StaticCredentials::new()
                    .with("ash", "secret")
                    .with("misty", "mistypw"),
                rng: ChaCha8Rng::seed_from_u64(5),
            }
        }

        fn apply(
            &mut self,
            snapshot: &PlayerSnapshot,
            action: Action,
        ) -> Result<Outcome, ProgressError> {
            let ctx = ActionContext {
                seen: &self.seen,
                auth: &self.auth,
            };
            let outcome = self.engine.apply(snapshot, &action, &ctx, &mut self.rng)?;
            self.seen.extend(outcome.seen_keys().cloned());
            if outcome.events.contains(&Event::Reset) {
                self.seen.clear();
            }
            Ok(outcome)
        }
    }

    fn key(s: &str) -> CreatureKey {
        CreatureKey::new(s)
    }

    fn with_slotted(name: &str, state: CreatureState) -> PlayerSnapshot {
        let mut snapshot = PlayerSnapshot::new("ash");
        snapshot.roster.bench_mut().insert(key(name), state);
        snapshot.roster.assign(0, name).unwrap();
        snapshot
    }

    #[test]
    fn test_upgrade_checks_funds_before_exp() {
        let mut h = Harness::new();
        let snapshot = with_slotted("abra", CreatureState { level: 1, exp: 0.0 });

        let err = h
            .apply(&snapshot, Action::Upgrade(Location::Slot(0)))
            .unwrap_err();
        assert!(matches!(err, ProgressError::InsufficientFunds { .. }));

        let mut funded = snapshot.clone();
        funded.ledger.money = 20.0;
        let err = h
            .apply(&funded, Action::Upgrade(Location::Slot(0)))
            .unwrap_err();
        assert_eq!(
            err,
            ProgressError::NotReady {
                exp: 0.0,
                required: 10.0
            }
        );
    }

    #[test]
    fn test_upgrade_bench_creature_keeps_exp() {
        let mut h = Harness::new();
        let mut snapshot = PlayerSnapshot::new("ash");
        snapshot
            .roster
            .bench_mut()
            .insert(key("abra"), CreatureState { level: 2, exp: 15.0 });
        snapshot.ledger.money = 50.0;

        let outcome = h
            .apply(&snapshot, Action::Upgrade(Location::Bench(key("abra"))))
            .unwrap();
        let abra = outcome.snapshot.roster.bench().get("abra").unwrap();
        assert_eq!(abra.level, 3);
        assert_eq!(abra.exp, 15.0);
        assert_eq!(outcome.snapshot.ledger.money, 10.0);
    }

    #[test]
    fn test_evolve_in_slot() {
        let mut h = Harness::new();
        let mut snapshot = with_slotted("abra", CreatureState { level: 16, exp: 3.0 });
        snapshot.ledger.candies.rare = 2;

        let outcome = h.apply(&snapshot, Action::Evolve(Location::Slot(0))).unwrap();
        let slot = &outcome.snapshot.roster.slots()[0];
        assert_eq!(slot.key, Some(key("kadabra")));
        assert_eq!(slot.state(), CreatureState { level: 16, exp: 3.0 });
        assert_eq!(outcome.snapshot.ledger.candies.rare, 1);
        assert!(outcome.events.contains(&Event::Seen(key("kadabra"))));
    }

    #[test]
    fn test_evolve_rejections() {
        let mut h = Harness::new();

        let low = with_slotted("abra", CreatureState { level: 15, exp: 0.0 });
        assert!(matches!(
            h.apply(&low, Action::Evolve(Location::Slot(0))),
            Err(ProgressError::NotEligible(_))
        ));

        let ready = with_slotted("kadabra", CreatureState { level: 32, exp: 0.0 });
        assert_eq!(
            h.apply(&ready, Action::Evolve(Location::Slot(0))).unwrap_err(),
            ProgressError::InsufficientResource(Resource::EpicCandy)
        );

        let mut last = with_slotted("alakazam", CreatureState { level: 50, exp: 0.0 });
        last.ledger.candies.epic = 1;
        assert!(matches!(
            h.apply(&last, Action::Evolve(Location::Slot(0))),
            Err(ProgressError::NotEligible(_))
        ));

        let idle = PlayerSnapshot::new("ash");
        assert!(matches!(
            h.apply(&idle, Action::Evolve(Location::Slot(0))),
            Err(ProgressError::NotFound(_))
        ));
    }

    #[test]
    fn test_evolve_into_owned_species_is_rejected() {
        let mut h = Harness::new();
        let mut snapshot = with_slotted("abra", CreatureState { level: 20, exp: 0.0 });
        snapshot
            .roster
            .bench_mut()
            .insert(key("kadabra"), CreatureState::FRESH);
        snapshot.ledger.candies.rare = 1;
        assert_eq!(
            h.apply(&snapshot, Action::Evolve(Location::Slot(0))).unwrap_err(),
            ProgressError::AlreadyOwned(key("kadabra"))
        );
    }

    #[test]
    fn test_slot_to_slot_move() {
        let mut h = Harness::new();
        let mut snapshot = with_slotted("abra", CreatureState { level: 3, exp: 1.0 });
        snapshot.roster.push_slot();

        let outcome = h
            .apply(
                &snapshot,
                Action::AssignToSlot {
                    slot: 1,
                    key: key("abra"),
                },
            )
            .unwrap();
        let roster = &outcome.snapshot.roster;
        assert!(roster.slots()[0].is_idle());
        assert_eq!(roster.slots()[1].key, Some(key("abra")));
        assert_eq!(roster.slots()[1].level, 3);
        assert!(roster.bench().is_empty());

        // Same slot again is a no-op.
        let again = h
            .apply(
                &outcome.snapshot,
                Action::AssignToSlot {
                    slot: 1,
                    key: key("abra"),
                },
            )
            .unwrap();
        assert_eq!(again.snapshot, outcome.snapshot);
    }

    #[test]
    fn test_tick_rejects_bad_interval() {
        let mut h = Harness::new();
        let snapshot = with_slotted("abra", CreatureState::FRESH);
        for elapsed_secs in [-1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                h.apply(&snapshot, Action::Tick { elapsed_secs }),
                Err(ProgressError::NotEligible(_))
            ));
        }
    }

    #[test]
    fn test_tier_up_awards_keys_and_one_slot() {
        let mut h = Harness::new();
        // 100 exp reaches tier 4: 20 + 24 + 28.8 = 72.8 <= 100 < 107.36
        let snapshot = with_slotted("abra", CreatureState { level: 1, exp: 100.0 });

        let outcome = h.apply(&snapshot, Action::ClearSlot(0)).unwrap();
        let next = &outcome.snapshot;
        assert_eq!(next.ledger.last_chest_tier, 4);
        assert_eq!(next.ledger.chest_keys, 3);
        assert_eq!(next.roster.slots().len(), 2);
        assert!(outcome.events.contains(&Event::TierUp {
            from: 1,
            to: 4,
            chest_keys: 3
        }));

        // The next recompute finds nothing new: tier 6 is needed for slot 3.
        let outcome = h.apply(next, Action::ClearSlot(0)).unwrap();
        assert_eq!(outcome.snapshot.roster.slots().len(), 2);
        assert_eq!(outcome.snapshot.ledger.chest_keys, 3);
    }

    #[test]
    fn test_one_slot_per_recompute_across_thresholds() {
        let mut h = Harness::new();
        // 300 exp reaches tier 8 (258.3 <= 300 < 329.9), past both the
        // tier-3 and tier-6 unlocks.
        let snapshot = with_slotted("abra", CreatureState { level: 1, exp: 300.0 });

        let outcome = h.apply(&snapshot, Action::ClearSlot(0)).unwrap();
        assert_eq!(outcome.snapshot.ledger.last_chest_tier, 8);
        assert_eq!(outcome.snapshot.roster.slots().len(), 2);
        let unlocks = outcome
            .events
            .iter()
            .filter(|event| matches!(event, Event::SlotUnlocked { .. }))
            .count();
        assert_eq!(unlocks, 1);

        let outcome = h.apply(&outcome.snapshot, Action::ClearSlot(0)).unwrap();
        assert_eq!(outcome.snapshot.roster.slots().len(), 3);
        assert!(outcome.events.contains(&Event::SlotUnlocked { index: 2 }));
        assert_eq!(outcome.snapshot.ledger.chest_keys, 7);

        // Tier 10 is needed for a fourth slot.
        let outcome = h.apply(&outcome.snapshot, Action::ClearSlot(0)).unwrap();
        assert_eq!(outcome.snapshot.roster.slots().len(), 3);
    }

    #[test]
    fn test_buy_creature_rules() {
        let mut h = Harness::new();
        let mut snapshot = PlayerSnapshot::new("ash");
        snapshot.ledger.shards.common = 40;
        snapshot.ledger.shards.rare = 19;

        let buy = |key_name: &str, kind| Action::BuyCreature {
            key: key(key_name),
            kind,
        };

        assert!(matches!(
            h.apply(&snapshot, buy("mew", ShardKind::Common)),
            Err(ProgressError::NotFound(_))
        ));
        assert!(matches!(
            h.apply(&snapshot, buy("pikachu", ShardKind::Rare)),
            Err(ProgressError::NotEligible(_))
        ));
        assert!(matches!(
            h.apply(&snapshot, buy("abra", ShardKind::Rare)),
            Err(ProgressError::NotEligible(_))
        ));
        assert_eq!(
            h.apply(&snapshot, buy("meowth", ShardKind::Rare)).unwrap_err(),
            ProgressError::InsufficientResource(Resource::RareShards)
        );

        let outcome = h.apply(&snapshot, buy("abra", ShardKind::Common)).unwrap();
        assert_eq!(outcome.snapshot.ledger.shards.common, 20);
        assert_eq!(
            outcome.snapshot.roster.bench().get("abra"),
            Some(&CreatureState::FRESH)
        );

        // Seen now, so never again, even with shards to spare.
        assert_eq!(
            h.apply(&snapshot, buy("abra", ShardKind::Common)).unwrap_err(),
            ProgressError::AlreadyOwned(key("abra"))
        );
    }

    #[test]
    fn test_select_starter_once() {
        let mut h = Harness::new();
        let fresh = PlayerSnapshot::new("ash");

        assert!(matches!(
            h.apply(&fresh, Action::SelectStarter(key("abra"))),
            Err(ProgressError::NotEligible(_))
        ));
        let outcome = h
            .apply(&fresh, Action::SelectStarter(key("squirtle")))
            .unwrap();
        assert_eq!(outcome.snapshot.roster.slots()[0].key, Some(key("squirtle")));
        assert!(matches!(
            h.apply(&outcome.snapshot, Action::SelectStarter(key("charmander"))),
            Err(ProgressError::NotEligible(_))
        ));
    }

    #[test]
    fn test_reset_requires_credentials() {
        let mut h = Harness::new();
        let mut snapshot = with_slotted("abra", CreatureState { level: 9, exp: 500.0 });
        snapshot.ledger.money = 1e6;
        snapshot.ledger.candies_bought.rare = 4;

        let bad = Action::Reset {
            user_id: "ash".into(),
            credential: "guess".into(),
        };
        assert_eq!(h.apply(&snapshot, bad).unwrap_err(), ProgressError::Unauthorized);

        let good = Action::Reset {
            user_id: "ash".into(),
            credential: "secret".into(),
        };
        let outcome = h.apply(&snapshot, good).unwrap();
        assert_eq!(outcome.snapshot, PlayerSnapshot::new("ash"));
        assert_eq!(outcome.events, vec![Event::Reset]);
    }

    #[test]
    fn test_reset_rejects_another_accounts_credential() {
        let mut h = Harness::new();
        let mut snapshot = with_slotted("abra", CreatureState { level: 3, exp: 40.0 });
        snapshot.ledger.money = 250.0;

        let foreign = Action::Reset {
            user_id: "misty".into(),
            credential: "mistypw".into(),
        };
        assert_eq!(
            h.apply(&snapshot, foreign).unwrap_err(),
            ProgressError::Unauthorized
        );
        assert_eq!(snapshot.ledger.money, 250.0);
        assert_eq!(snapshot.roster.slots()[0].key, Some(key("abra")));
    }

    #[test]
    fn test_rejection_leaves_snapshot_untouched() {
        let mut h = Harness::new();
        let mut snapshot = with_slotted("abra", CreatureState { level: 16, exp: 0.0 });
        snapshot.roster.push_slot();
        let before = snapshot.clone();

        let _ = h.apply(&snapshot, Action::Evolve(Location::Slot(0)));
        let _ = h.apply(&snapshot, Action::OpenChest(2));
        let _ = h.apply(
            &snapshot,
            Action::AssignToSlot {
                slot: 7,
                key: key("abra"),
            },
        );
        assert_eq!(snapshot, before);
    }

    #[test]
    fn test_config_must_match_catalog() {
        let mut config = EconomyConfig::default();
        config.starters.push(key("mew"));
        assert!(matches!(
            Orchestrator::new(Catalog::standard(), config),
            Err(ConfigError::Invalid(_))
        ));
        assert!(Orchestrator::new(Catalog::standard(), EconomyConfig::default()).is_ok());
    }
}
