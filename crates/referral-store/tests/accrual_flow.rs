//! Integration tests for the concrete scenarios in spec.md §8 (S1, S4, S5,
//! S6, S7). Each test gets a fresh, migrated database via `#[sqlx::test]`.

use chrono::{TimeZone, Utc};
use referral_core::types::{IngestOutcome, Lineage, TradeEvent, UserId};
use referral_core::ReferralError;
use referral_store::{accrual, claim, earnings, graph, network};
use rust_decimal_macros::dec;
use sqlx::PgPool;

async fn seed_user(pool: &PgPool, username: &str, is_treasury: bool) -> i64 {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO users (username, is_treasury) VALUES ($1, $2) RETURNING id",
    )
    .bind(username)
    .bind(is_treasury)
    .fetch_one(pool)
    .await
    .unwrap();
    id
}

async fn link(pool: &PgPool, child: i64, parent_code: &str) {
    graph::assign_referrer(pool, UserId(child), parent_code)
        .await
        .unwrap();
}

/// S1 — full lineage: A→B→C→D, ingest a 200.000000 fee trade from D.
#[sqlx::test(migrations = "../../migrations")]
async fn s1_full_lineage_splits(pool: PgPool) {
    let treasury = seed_user(&pool, "treasury", true).await;
    let a = seed_user(&pool, "a", false).await;
    let b = seed_user(&pool, "b", false).await;
    let c = seed_user(&pool, "c", false).await;
    let d = seed_user(&pool, "d", false).await;
    let _ = treasury;

    let code_a = graph::get_or_assign_code(&pool, UserId(a)).await.unwrap();
    let code_b = graph::get_or_assign_code(&pool, UserId(b)).await.unwrap();
    let code_c = graph::get_or_assign_code(&pool, UserId(c)).await.unwrap();
    link(&pool, b, &code_a).await;
    link(&pool, c, &code_b).await;
    link(&pool, d, &code_c).await;

    let event = TradeEvent {
        trade_id: "T1".into(),
        chain: "arbitrum".into(),
        trader_id: UserId(d),
        fee_token: "USDC".into(),
        fee_amount: dec!(200.000000),
        executed_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
    };

    let outcome = accrual::ingest(&referral_store::Db::from_pool(pool.clone()), event.clone())
        .await
        .unwrap();

    let IngestOutcome::Applied { splits, lineage, .. } = outcome else {
        panic!("expected Applied");
    };
    assert_eq!(splits.cashback, dec!(20.000000));
    assert_eq!(splits.l1, dec!(60.000000));
    assert_eq!(splits.l2, dec!(6.000000));
    assert_eq!(splits.l3, dec!(4.000000));
    assert_eq!(splits.treasury, dec!(110.000000));
    assert_eq!(
        lineage,
        Lineage(vec![Some(UserId(c)), Some(UserId(b)), Some(UserId(a))])
    );
}

/// S4 — re-ingesting the same (trade_id, chain) is a no-op.
#[sqlx::test(migrations = "../../migrations")]
async fn s4_duplicate_trade_is_noop(pool: PgPool) {
    seed_user(&pool, "treasury", true).await;
    let trader = seed_user(&pool, "solo", false).await;
    let db = referral_store::Db::from_pool(pool.clone());

    let event = TradeEvent {
        trade_id: "T-dup".into(),
        chain: "arbitrum".into(),
        trader_id: UserId(trader),
        fee_token: "USDC".into(),
        fee_amount: dec!(50.000000),
        executed_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
    };

    let first = accrual::ingest(&db, event.clone()).await.unwrap();
    assert!(matches!(first, IngestOutcome::Applied { .. }));

    let second = accrual::ingest(&db, event).await.unwrap();
    assert!(matches!(second, IngestOutcome::Duplicate { .. }));

    let view = earnings::get_earnings(
        &pool,
        earnings::EarningsQuery {
            user_id: UserId(trader),
            range: None,
            breakdown_limit: None,
        },
    )
    .await
    .unwrap();
    let cashback = view
        .totals
        .iter()
        .find(|(k, _)| *k == referral_core::types::AccrualKind::Cashback)
        .unwrap()
        .1;
    assert_eq!(cashback, dec!(5.000000)); // only one ingestion's worth of cashback
}

/// S5 — linking a referrer that would close a cycle is rejected.
#[sqlx::test(migrations = "../../migrations")]
async fn s5_cycle_rejected(pool: PgPool) {
    let a = seed_user(&pool, "a", false).await;
    let b = seed_user(&pool, "b", false).await;
    let c = seed_user(&pool, "c", false).await;

    let code_a = graph::get_or_assign_code(&pool, UserId(a)).await.unwrap();
    let code_b = graph::get_or_assign_code(&pool, UserId(b)).await.unwrap();
    let code_c = graph::get_or_assign_code(&pool, UserId(c)).await.unwrap();
    link(&pool, b, &code_a).await;
    link(&pool, c, &code_b).await;

    let result = graph::assign_referrer(&pool, UserId(a), &code_c).await;
    assert!(matches!(result, Err(ReferralError::Cycle)));
}

/// S6 — claim preview, execute, then nothing left to claim.
#[sqlx::test(migrations = "../../migrations")]
async fn s6_claim_lifecycle(pool: PgPool) {
    let treasury = seed_user(&pool, "treasury", true).await;
    let a = seed_user(&pool, "a", false).await;
    let b = seed_user(&pool, "b", false).await;
    let c = seed_user(&pool, "c", false).await;
    let d = seed_user(&pool, "d", false).await;
    let _ = treasury;

    let code_a = graph::get_or_assign_code(&pool, UserId(a)).await.unwrap();
    let code_b = graph::get_or_assign_code(&pool, UserId(b)).await.unwrap();
    let code_c = graph::get_or_assign_code(&pool, UserId(c)).await.unwrap();
    link(&pool, b, &code_a).await;
    link(&pool, c, &code_b).await;
    link(&pool, d, &code_c).await;

    let db = referral_store::Db::from_pool(pool.clone());
    let event = TradeEvent {
        trade_id: "T1".into(),
        chain: "arbitrum".into(),
        trader_id: UserId(d),
        fee_token: "USDC".into(),
        fee_amount: dec!(200.000000),
        executed_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
    };
    accrual::ingest(&db, event).await.unwrap();

    let preview = claim::preview_claim(&pool, UserId(c), "USDC").await.unwrap();
    assert_eq!(preview.claimable, dec!(60.000000));

    let result = claim::execute_claim(&pool, UserId(c), "USDC").await.unwrap();
    assert_eq!(result.amount, dec!(60.000000));
    assert_eq!(result.status, "pending");

    let again = claim::preview_claim(&pool, UserId(c), "USDC").await;
    assert!(matches!(again, Err(ReferralError::NothingToClaim)));
}

/// S7 — windowed earnings never attribute claims to the window.
#[sqlx::test(migrations = "../../migrations")]
async fn s7_windowed_earnings(pool: PgPool) {
    let treasury = seed_user(&pool, "treasury", true).await;
    let a = seed_user(&pool, "a", false).await;
    let c = seed_user(&pool, "c", false).await;
    let _ = treasury;

    let code_a = graph::get_or_assign_code(&pool, UserId(a)).await.unwrap();
    link(&pool, c, &code_a).await;

    let db = referral_store::Db::from_pool(pool.clone());
    for month in [1, 2] {
        let event = TradeEvent {
            trade_id: format!("T-{month}"),
            chain: "arbitrum".into(),
            trader_id: UserId(c),
            fee_token: "USDC".into(),
            fee_amount: dec!(200.000000),
            executed_at: Utc.with_ymd_and_hms(2025, month, 1, 0, 0, 0).unwrap(),
        };
        accrual::ingest(&db, event).await.unwrap();
    }

    let view = earnings::get_earnings(
        &pool,
        earnings::EarningsQuery {
            user_id: UserId(a),
            range: Some((
                Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2025, 2, 15, 0, 0, 0).unwrap(),
            )),
            breakdown_limit: None,
        },
    )
    .await
    .unwrap();

    let l1 = view
        .totals
        .iter()
        .find(|(k, _)| *k == referral_core::types::AccrualKind::CommissionL1)
        .unwrap()
        .1;
    assert_eq!(l1, dec!(60.000000));
    assert!(view.claimed.iter().all(|(_, v)| v.is_zero()));
}

/// `network::downline` walks one level at a time, capping each level
/// independently, and pads trailing levels with empty sets once a branch
/// runs dry rather than stopping early.
#[sqlx::test(migrations = "../../migrations")]
async fn network_walker_per_level_caps(pool: PgPool) {
    let a = seed_user(&pool, "a", false).await;
    let b = seed_user(&pool, "b", false).await;
    let c = seed_user(&pool, "c", false).await;
    let d = seed_user(&pool, "d", false).await;
    let e = seed_user(&pool, "e", false).await;

    let code_a = graph::get_or_assign_code(&pool, UserId(a)).await.unwrap();
    let code_b = graph::get_or_assign_code(&pool, UserId(b)).await.unwrap();
    link(&pool, b, &code_a).await;
    link(&pool, c, &code_a).await;
    link(&pool, d, &code_b).await;
    let _ = e;

    let levels = network::downline(&pool, UserId(a), 3, 1).await.unwrap();
    assert_eq!(levels.len(), 3);

    assert_eq!(levels[0].level, 1);
    assert_eq!(levels[0].users.len(), 1); // b and c both qualify, capped at 1
    let l1_id = levels[0].users[0].user_id;
    assert!(l1_id == UserId(b) || l1_id == UserId(c));

    // level 2 only has descendants of whichever of b/c survived the cap.
    if l1_id == UserId(b) {
        assert_eq!(levels[1].users.len(), 1);
        assert_eq!(levels[1].users[0].user_id, UserId(d));
        assert!(levels[2].users.is_empty());
    } else {
        assert!(levels[1].users.is_empty());
        assert!(levels[2].users.is_empty());
    }
}
