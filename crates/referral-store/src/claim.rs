//! Claim Engine (C6) — locked transactional move of unclaimed balances into
//! claimed, plus creation of a payout batch.

use referral_core::types::{AccrualKind, ClaimPreview, ClaimResult, LedgerRow, UserId};
use referral_core::ReferralError;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;

use crate::repo::{self, LedgerRowRaw, Tx};

fn claimable_kind_strs() -> [&'static str; 4] {
    AccrualKind::CLAIMABLE.map(|k| k.as_str())
}

fn to_ledger_rows(raw: Vec<LedgerRowRaw>, user_id: UserId) -> Vec<LedgerRow> {
    raw.into_iter()
        .filter_map(|r| {
            r.kind.parse::<AccrualKind>().ok().map(|kind| LedgerRow {
                user_id,
                kind,
                token: r.token,
                accrued_amount: r.accrued_amount,
                claimed_amount: r.claimed_amount,
            })
        })
        .collect()
}

/// Sums the claimable (non-treasury) unclaimed amount across `rows`,
/// skipping non-positive balances, along with a per-kind breakdown.
fn summarize_claimable(rows: &[LedgerRow]) -> (Decimal, Vec<(AccrualKind, Decimal)>) {
    let mut total = Decimal::ZERO;
    let mut per_kind = Vec::new();
    for row in rows {
        if !AccrualKind::CLAIMABLE.contains(&row.kind) {
            continue;
        }
        let unclaimed = row.unclaimed();
        if unclaimed > Decimal::ZERO {
            total += unclaimed;
            per_kind.push((row.kind, unclaimed));
        }
    }
    (total, per_kind)
}

/// Mirrors the first three steps of `execute_claim` but takes no lock and
/// performs no writes.
pub async fn preview_claim(
    pool: &PgPool,
    user_id: UserId,
    token: &str,
) -> Result<ClaimPreview, ReferralError> {
    let mut tx = pool.begin().await?;
    let raw = repo::peek_ledger_rows(&mut tx, user_id, token).await?;
    tx.rollback().await.ok();

    if raw.is_empty() {
        return Err(ReferralError::NoBalance);
    }
    let rows = to_ledger_rows(raw, user_id);
    let (total, per_kind) = summarize_claimable(&rows);
    if total <= Decimal::ZERO {
        return Err(ReferralError::NothingToClaim);
    }

    Ok(ClaimPreview {
        user_id,
        token: token.to_string(),
        claimable: total,
        per_kind,
    })
}

/// Executes a claim: locks the ledger rows, moves the claimable balance into
/// `claimed_amount`, and opens a pending payout batch. One transaction.
pub async fn execute_claim(
    pool: &PgPool,
    user_id: UserId,
    token: &str,
) -> Result<ClaimResult, ReferralError> {
    let mut tx = pool.begin().await?;
    let result = execute_claim_tx(&mut tx, user_id, token).await;
    match result {
        Ok(r) => {
            tx.commit().await?;
            info!(user_id = user_id.0, token, amount = %r.amount, "claim executed");
            Ok(r)
        }
        Err(e) => {
            tx.rollback().await.ok();
            Err(e)
        }
    }
}

async fn execute_claim_tx(
    tx: &mut Tx<'_>,
    user_id: UserId,
    token: &str,
) -> Result<ClaimResult, ReferralError> {
    let raw = repo::lock_ledger_rows_for_update(tx, user_id, token).await?;
    if raw.is_empty() {
        return Err(ReferralError::NoBalance);
    }

    let rows = to_ledger_rows(raw, user_id);
    let (total, per_kind) = summarize_claimable(&rows);
    if total <= Decimal::ZERO {
        return Err(ReferralError::NothingToClaim);
    }

    repo::mark_claimable_kinds_claimed(tx, user_id, token, &claimable_kind_strs()).await?;
    let batch = repo::insert_payout_batch(tx, user_id, token, total).await?;

    Ok(ClaimResult {
        batch_id: batch.id,
        user_id,
        token: token.to_string(),
        amount: total,
        status: batch.status,
        per_kind,
        created_at: batch.created_at,
    })
}
