//! Earnings Aggregator (C5) — all-time view from the ledger, windowed view
//! from the journal, with an optional recent-activity breakdown.

use chrono::{DateTime, Utc};
use referral_core::types::{AccrualKind, EarningsBreakdownEntry, EarningsView, UserId};
use referral_core::ReferralError;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::repo;

pub struct EarningsQuery {
    pub user_id: UserId,
    pub range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub breakdown_limit: Option<u32>,
}

/// Zero-fills every known kind in the canonical order, looking up a value
/// from `present` where available.
fn zero_fill(present: impl Fn(AccrualKind) -> Decimal) -> Vec<(AccrualKind, Decimal)> {
    AccrualKind::ALL.iter().map(|k| (*k, present(*k))).collect()
}

pub async fn get_earnings(pool: &PgPool, query: EarningsQuery) -> Result<EarningsView, ReferralError> {
    let mut tx = pool.begin().await?;

    let (totals, claimed, unclaimed) = match query.range {
        None => {
            let rows = repo::get_ledger_rows_for_user(&mut tx, query.user_id).await?;
            let accrued_by_kind: Vec<(AccrualKind, Decimal)> = rows
                .iter()
                .filter_map(|r| r.kind.parse::<AccrualKind>().ok().map(|k| (k, r.accrued_amount)))
                .collect();
            let claimed_by_kind: Vec<(AccrualKind, Decimal)> = rows
                .iter()
                .filter_map(|r| r.kind.parse::<AccrualKind>().ok().map(|k| (k, r.claimed_amount)))
                .collect();

            let totals = zero_fill(|k| lookup(&accrued_by_kind, k));
            let claimed = zero_fill(|k| lookup(&claimed_by_kind, k));
            let unclaimed = zero_fill(|k| lookup(&accrued_by_kind, k) - lookup(&claimed_by_kind, k));
            (totals, claimed, unclaimed)
        }
        Some((from, to)) => {
            let rows = repo::get_windowed_totals(&mut tx, query.user_id, from, to).await?;
            let totals_by_kind: Vec<(AccrualKind, Decimal)> = rows
                .iter()
                .filter_map(|r| {
                    r.kind
                        .parse::<AccrualKind>()
                        .ok()
                        .map(|k| (k, r.total.unwrap_or(Decimal::ZERO)))
                })
                .collect();
            let totals = zero_fill(|k| lookup(&totals_by_kind, k));
            // Windowed mode deliberately never attributes claims to a window.
            let claimed = zero_fill(|_| Decimal::ZERO);
            let unclaimed = totals.clone();
            (totals, claimed, unclaimed)
        }
    };

    let breakdown = match query.breakdown_limit {
        Some(limit) => {
            let rows = repo::get_recent_breakdown(&mut tx, query.user_id, limit as i64).await?;
            Some(
                rows.into_iter()
                    .filter_map(|r| {
                        r.kind.parse::<AccrualKind>().ok().map(|kind| EarningsBreakdownEntry {
                            trade_id: r.trade_id,
                            chain: r.chain,
                            kind,
                            token: r.token,
                            amount: r.amount,
                            executed_at: r.executed_at,
                        })
                    })
                    .collect(),
            )
        }
        None => None,
    };

    tx.rollback().await.ok();

    Ok(EarningsView {
        user_id: query.user_id,
        totals,
        claimed,
        unclaimed,
        range: query.range,
        breakdown,
    })
}

fn lookup(pairs: &[(AccrualKind, Decimal)], kind: AccrualKind) -> Decimal {
    pairs
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, v)| *v)
        .unwrap_or(Decimal::ZERO)
}
