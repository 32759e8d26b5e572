use idledex::accrual::accrue;
use idledex::collaborators::StaticCredentials;
use idledex::orchestrator::ActionContext;
use idledex::roster::{Bench, Slot};
use idledex::*;
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;

const SPECIES: &[&str] = &["bulbasaur", "abra", "gloom", "meowth", "pikachu", "raichu"];

prop_compose! {
    fn arb_slot()(
        species in prop::option::of(0..SPECIES.len()),
        level in 1u32..60,
        exp in 0.0f64..5_000.0
    ) -> Slot {
        match species {
            Some(i) => Slot::holding(CreatureKey::new(SPECIES[i]), CreatureState { level, exp }),
            None => Slot::idle(),
        }
    }
}

prop_compose! {
    fn arb_roster()(slots in prop::collection::vec(arb_slot(), 1..5)) -> Roster {
        Roster::from_parts(slots, Bench::new())
    }
}

#[derive(Debug, Clone)]
enum Move {
    Assign(usize, usize),
    Clear(usize),
}

fn arb_move() -> impl Strategy<Value = Move> {
    prop_oneof![
        (0usize..4, 0..SPECIES.len()).prop_map(|(slot, species)| Move::Assign(slot, species)),
        (0usize..4).prop_map(Move::Clear),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn exp_curve_strictly_increasing(level in 1u32..300) {
        prop_assert!(exp_to_next(level + 1) > exp_to_next(level));
    }

    #[test]
    fn upgrade_cost_is_exactly_linear(level in 1u32..100_000) {
        prop_assert_eq!(upgrade_cost(level), 20.0 * f64::from(level));
    }

    #[test]
    fn candy_price_never_drops(bought in 0u32..40) {
        for kind in [CandyKind::Rare, CandyKind::Epic] {
            prop_assert!(candy_price(kind, bought + 1) > candy_price(kind, bought));
        }
    }

    #[test]
    fn derived_tier_brackets_total_exp(total in 0.0f64..1_000_000.0) {
        let curve = ProgressionCurve::STANDARD;
        let tier = curve.derive_tier(total).tier;
        let below = curve.cumulative_requirement(tier - 1);
        let above = curve.cumulative_requirement(tier);
        let tolerance = 1e-6 * above.max(1.0);
        prop_assert!(below <= total + tolerance, "tier {} needs {} > {}", tier, below, total);
        prop_assert!(total < above + tolerance, "tier {} ends at {} <= {}", tier, above, total);
    }

    #[test]
    fn accrual_is_linear_in_time(roster in arb_roster(), secs in 0.0f64..10_000.0) {
        let catalog = Catalog::standard();
        let curve = ProgressionCurve::STANDARD;

        let mut whole = roster.clone();
        let mut whole_ledger = Ledger::default();
        accrue(&mut whole, &mut whole_ledger, &catalog, &curve, secs);

        let mut halves = roster;
        let mut halves_ledger = Ledger::default();
        accrue(&mut halves, &mut halves_ledger, &catalog, &curve, secs / 2.0);
        accrue(&mut halves, &mut halves_ledger, &catalog, &curve, secs / 2.0);

        let close = |a: f64, b: f64| (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0);
        prop_assert!(close(whole_ledger.money, halves_ledger.money));
        for (a, b) in whole.slots().iter().zip(halves.slots()) {
            prop_assert_eq!(&a.key, &b.key);
            prop_assert_eq!(a.level, b.level);
            prop_assert!(close(a.exp, b.exp));
        }
    }

    #[test]
    fn roster_moves_preserve_owned_keys(moves in prop::collection::vec(arb_move(), 0..40)) {
        let mut roster = Roster::new();
        roster.push_slot();
        roster.push_slot();
        for name in SPECIES {
            roster.bench_mut().insert(CreatureKey::new(name), CreatureState::FRESH);
        }
        let owned = |roster: &Roster| {
            let mut keys = roster.owned_keys();
            keys.sort();
            keys
        };
        let before = owned(&roster);

        for step in moves {
            // Failures (bad slot, key not benched) are fine; they must not
            // disturb anything either.
            let _ = match step {
                Move::Assign(slot, species) => roster.assign(slot, SPECIES[species]),
                Move::Clear(slot) => roster.clear(slot).map(|_| ()),
            };
            prop_assert!(roster.check_invariants().is_ok());
            prop_assert_eq!(owned(&roster), before.clone());
        }
    }

    #[test]
    fn upgrade_accepted_iff_affordable_and_ready(
        level in 1u32..30,
        exp in 0.0f64..2_000.0,
        money in 0.0f64..1_000.0
    ) {
        let engine = Orchestrator::standard();
        let mut snapshot = PlayerSnapshot::new("prop");
        snapshot
            .roster
            .bench_mut()
            .insert(CreatureKey::new("abra"), CreatureState { level, exp });
        snapshot.ledger.money = money;

        let seen = HashSet::new();
        let auth = StaticCredentials::new();
        let ctx = ActionContext { seen: &seen, auth: &auth };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let action = Action::Upgrade(Location::Bench(CreatureKey::new("abra")));
        let result = engine.apply(&snapshot, &action, &ctx, &mut rng);

        let cost = upgrade_cost(level);
        let accept = money >= cost && exp >= exp_to_next(level);
        prop_assert_eq!(result.is_ok(), accept);
        if let Ok(outcome) = result {
            let abra = outcome.snapshot.roster.bench().get("abra").copied();
            prop_assert_eq!(abra, Some(CreatureState { level: level + 1, exp }));
            prop_assert_eq!(outcome.snapshot.ledger.money, money - cost);
        }
    }
}
