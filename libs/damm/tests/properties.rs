//! Pool and Aggregator Property Tests
//!
//! These tests validate accounting properties that must hold for any
//! sequence of pool operations and synchronizations.

use damm::{dec, Damm, DammError, Decimal, Pool};
use damm_config::defaults::solvency::MIN_HEALTH_FACTOR;
use proptest::prelude::*;

const EPS: Decimal = dec!(0.000000001);

/// Amounts between 0.01 and 10_000.00
fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

#[derive(Debug, Clone)]
enum Op {
    Join { pool: usize, amount: Decimal },
    Exit { pool: usize, percent: u32 },
    BuyX { pool: usize, amount: Decimal },
    BuyY { pool: usize, amount: Decimal },
    Sync { pool: usize },
}

fn op(pools: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..pools, amount()).prop_map(|(pool, amount)| Op::Join { pool, amount }),
        (0..pools, 1u32..60).prop_map(|(pool, percent)| Op::Exit { pool, percent }),
        (0..pools, amount()).prop_map(|(pool, amount)| Op::BuyX { pool, amount }),
        (0..pools, amount()).prop_map(|(pool, amount)| Op::BuyY { pool, amount }),
        (0..pools).prop_map(|pool| Op::Sync { pool }),
    ]
}

/// Join at the pool's current price so the ratio guard never fires
fn join_at_price(pool: &mut Pool, amount: Decimal) -> Result<Decimal, DammError> {
    if pool.has_liquidity() {
        let (vx, vy) = pool.virtual_balances();
        pool.join(amount, amount * vy / vx)
    } else {
        pool.join(amount, amount)
    }
}

fn apply(damm: &mut Damm, pools: &mut [Pool], op: &Op) {
    match op {
        Op::Join { pool, amount } => {
            let _ = join_at_price(&mut pools[*pool], *amount);
        }
        Op::Exit { pool, percent } => {
            let target = &mut pools[*pool];
            if let Ok(k) = target.kb() {
                if let Ok(root) = damm::CurveMath::sqrt(k) {
                    let burn = root * Decimal::from(*percent) / dec!(100);
                    if burn > Decimal::ZERO {
                        let _ = target.exit(burn);
                    }
                }
            }
        }
        Op::BuyX { pool, amount } => {
            let _ = pools[*pool].buy_x(*amount);
        }
        Op::BuyY { pool, amount } => {
            let _ = pools[*pool].buy_y(*amount);
        }
        Op::Sync { pool } => check_sync(damm, &mut pools[*pool]),
    }
}

/// Sync against the latest entry and check the post-conditions either way
fn check_sync(damm: &mut Damm, pool: &mut Pool) {
    let latest = damm.ledger().latest().index;
    let ledger_len = damm.ledger().len();
    let supply_before = damm.total_supply();
    let balances_before = damm.balances();
    let shadow_before = damm.lookup(pool.name()).unwrap().clone();
    let virtual_before = pool.virtual_balances();

    match damm.sync(pool, latest) {
        Ok(report) => {
            assert_eq!(damm.ledger().len(), ledger_len + 1);
            assert!(damm.total_supply() >= Decimal::ZERO);
            if let Some(hf) = report.health_factor {
                assert!(hf >= MIN_HEALTH_FACTOR, "health factor {}", hf);
                assert_eq!(damm.health_factor().unwrap(), hf);
            }

            let floor = damm.lookup(pool.name()).unwrap().next_min_sync_index;
            assert_eq!(floor, report.sync_point.index);
            let stale = damm.sync(pool, floor - 1).unwrap_err();
            assert!(matches!(stale, DammError::InvalidSyncPoint { .. }));
        }
        Err(_) => {
            assert_eq!(damm.ledger().len(), ledger_len);
            assert_eq!(damm.total_supply(), supply_before);
            assert_eq!(damm.balances(), balances_before);
            assert_eq!(damm.lookup(pool.name()).unwrap(), &shadow_before);
            assert_eq!(pool.virtual_balances(), virtual_before);
        }
    }

    let pool_supply: Decimal = damm.pools().map(|shadow| shadow.total_supply).sum();
    assert!((pool_supply - damm.total_supply()).abs() < EPS);
    assert!(damm.pools().all(|shadow| shadow.total_supply >= Decimal::ZERO));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_join_exit_round_trip(x in amount(), y in amount()) {
        let mut pool = Pool::with_defaults("AMM1");
        let minted = pool.join(x, y).unwrap();
        pool.exit(minted).unwrap();

        let (bx, by) = pool.balances();
        let (vx, vy) = pool.virtual_balances();
        for value in [bx, by, vx, vy] {
            prop_assert!(value.abs() < EPS, "residue {}", value);
        }
    }

    #[test]
    fn prop_round_trip_on_seeded_pool(seed in amount(), price_bps in 5_000u32..20_000, size in amount()) {
        let mut pool = Pool::with_defaults("AMM1");
        let seed_y = seed * Decimal::from(price_bps) / dec!(10000);
        pool.join(seed, seed_y).unwrap();
        let before = (pool.balances(), pool.virtual_balances());

        let minted = join_at_price(&mut pool, size).unwrap();
        pool.exit(minted).unwrap();

        let after = (pool.balances(), pool.virtual_balances());
        prop_assert!((after.0 .0 - before.0 .0).abs() < EPS);
        prop_assert!((after.0 .1 - before.0 .1).abs() < EPS);
        prop_assert!((after.1 .0 - before.1 .0).abs() < EPS);
        prop_assert!((after.1 .1 - before.1 .1).abs() < EPS);
    }

    #[test]
    fn prop_ratio_guard(seed_x in amount(), seed_y in amount(), a in amount(), b in amount()) {
        let mut pool = Pool::with_defaults("AMM1");
        pool.join(seed_x, seed_y).unwrap();
        let (vx, vy) = pool.virtual_balances();
        let deviation = (vx / vy - a / b).abs();

        let result = pool.join(a, b);
        if deviation >= dec!(0.01) {
            prop_assert!(
                matches!(result, Err(DammError::RatioInvalid { .. })),
                "expected rejection"
            );
        } else {
            prop_assert!(result.is_ok());
        }
    }

    #[test]
    fn prop_swaps_never_go_negative(
        seed in amount(),
        leverage in 1u32..20,
        swaps in prop::collection::vec((any::<bool>(), amount()), 1..30),
    ) {
        let mut pool = Pool::with_defaults("AMM1");
        pool.join(seed, seed).unwrap();
        // Virtual depth above actual holdings makes Bounds reachable
        let depth = seed * Decimal::from(leverage);
        pool.set_virtual_balances(depth, depth).unwrap();

        for (buy_x, amount_in) in swaps {
            let before = pool.clone();
            let result = if buy_x { pool.buy_x(amount_in) } else { pool.buy_y(amount_in) };
            match result {
                Ok(outcome) => prop_assert_eq!(outcome.amount_in, amount_in),
                Err(err) => {
                    prop_assert!(matches!(err, DammError::Bounds { .. }), "unexpected {:?}", err);
                    prop_assert_eq!(&pool, &before);
                }
            }
            let (x, y) = pool.balances();
            prop_assert!(x >= Decimal::ZERO && y >= Decimal::ZERO);
        }
    }

    #[test]
    fn prop_sync_accounting(ops in prop::collection::vec(op(3), 1..40)) {
        let mut damm = Damm::new("DAMM");
        let mut pools: Vec<Pool> = ["AMM1", "AMM2", "AMM3"]
            .iter()
            .map(|name| Pool::with_defaults(*name))
            .collect();
        for pool in &pools {
            damm.register_pool(pool).unwrap();
        }

        for op in &ops {
            apply(&mut damm, &mut pools, op);
        }
        for pool in pools.iter_mut() {
            if pool.has_liquidity() {
                check_sync(&mut damm, pool);
            }
        }
    }
}
