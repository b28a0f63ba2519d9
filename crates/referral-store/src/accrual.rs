//! Trade Accrual Engine (C4) — idempotent ingestion, orchestrating the Fee
//! Splitter (C1) and Lineage Resolver (C3), writing journal and ledger in
//! one transaction.

use referral_core::constants::DEFAULT_MAX_LEVELS;
use referral_core::types::{AccrualKind, IngestOutcome, Payout, TradeEvent, UserId};
use referral_core::{split_fee, ReferralError};
use tracing::{info, warn};

use crate::db::Db;
use crate::lineage::resolve_lineage;
use crate::repo::{self, Tx};

/// Ingests a trade event. Returns `IngestOutcome::Duplicate` if this
/// `(trade_id, chain)` pair was already applied; never mutates balances on a
/// duplicate.
pub async fn ingest(db: &Db, event: TradeEvent) -> Result<IngestOutcome, ReferralError> {
    let mut tx = db.pool.begin().await?;
    let outcome = ingest_tx(&mut tx, db, &event).await?;
    tx.commit().await?;

    match &outcome {
        IngestOutcome::Applied { trade_id, .. } => {
            info!(trade_id, "trade applied")
        }
        IngestOutcome::Duplicate { trade_id } => {
            info!(trade_id, "trade duplicate — no-op")
        }
    }
    Ok(outcome)
}

async fn ingest_tx(
    tx: &mut Tx<'_>,
    db: &Db,
    event: &TradeEvent,
) -> Result<IngestOutcome, ReferralError> {
    let (trade_row_id, created) = repo::ensure_trade_row(
        tx,
        &event.trade_id,
        &event.chain,
        event.trader_id,
        &event.fee_token,
        event.fee_amount,
        event.executed_at,
    )
    .await?;

    if !created {
        return Ok(IngestOutcome::Duplicate {
            trade_id: event.trade_id.clone(),
        });
    }

    if !repo::user_exists(tx, event.trader_id).await? {
        return Err(ReferralError::InvalidEvent(format!(
            "unknown trader {}",
            event.trader_id
        )));
    }

    let lineage = resolve_lineage(tx, event.trader_id, DEFAULT_MAX_LEVELS).await?;
    let splits = split_fee(event.fee_amount, &lineage);

    let treasury_id = UserId(db.treasury_user_id().await?);

    let mut payouts: Vec<Payout> = Vec::with_capacity(5);
    if splits.cashback > rust_decimal::Decimal::ZERO {
        payouts.push(Payout {
            beneficiary: event.trader_id,
            kind: AccrualKind::Cashback,
            amount: splits.cashback,
        });
    }
    for (index, ancestor) in lineage.iter().enumerate() {
        if let Some(ancestor_id) = ancestor {
            if let Some(kind) = AccrualKind::commission_for_level(index) {
                let amount = splits.for_kind(kind);
                if amount > rust_decimal::Decimal::ZERO {
                    payouts.push(Payout {
                        beneficiary: *ancestor_id,
                        kind,
                        amount,
                    });
                }
            }
        }
    }
    if splits.treasury > rust_decimal::Decimal::ZERO {
        payouts.push(Payout {
            beneficiary: treasury_id,
            kind: AccrualKind::Treasury,
            amount: splits.treasury,
        });
    }

    for payout in &payouts {
        repo::insert_accrual_entry(
            tx,
            trade_row_id,
            &event.chain,
            payout.beneficiary,
            payout.kind,
            &event.fee_token,
            payout.amount,
            event.executed_at,
        )
        .await?;
        repo::upsert_ledger_delta(tx, payout.beneficiary, payout.kind, &event.fee_token, payout.amount)
            .await?;
    }

    Ok(IngestOutcome::Applied {
        trade_id: event.trade_id.clone(),
        lineage,
        splits,
    })
}

/// Wraps [`ingest`] with the same retryable-conflict semantics as the graph
/// and claim paths, for callers that want belt-and-braces resilience against
/// a transient serialization failure rather than surfacing it to the client.
pub async fn ingest_with_retry(
    db: &Db,
    event: TradeEvent,
) -> Result<IngestOutcome, ReferralError> {
    match ingest(db, event.clone()).await {
        Err(ReferralError::Store(err)) if ReferralError::is_retryable(&err) => {
            warn!("retrying trade ingestion after conflict");
            ingest(db, event).await
        }
        other => other,
    }
}
