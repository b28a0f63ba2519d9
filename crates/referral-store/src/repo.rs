//! Repository Layer (C8) — thin typed accessors over the relational store.
//!
//! Every function here takes an already-open transaction; none of them
//! acquire a connection or decide transaction boundaries themselves. That is
//! the caller's job (see `accrual.rs`, `claim.rs`, `graph.rs`).

use chrono::{DateTime, Utc};
use rand::Rng;
use referral_core::constants::{
    REFERRAL_CODE_ALPHABET, REFERRAL_CODE_GEN_MAX_ATTEMPTS, REFERRAL_CODE_PREFIX,
    REFERRAL_CODE_RANDOM_LEN,
};
use referral_core::types::{AccrualKind, UserId};
use referral_core::ReferralError;
use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres, Transaction};

pub type Tx<'a> = Transaction<'a, Postgres>;

// ── Users ─────────────────────────────────────────────────────────────────────

#[derive(FromRow)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub referrer_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

pub async fn get_user_by_id(
    tx: &mut Tx<'_>,
    user_id: UserId,
) -> Result<Option<UserRow>, ReferralError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, referrer_id, created_at FROM users WHERE id = $1",
    )
    .bind(user_id.0)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row)
}

pub async fn get_user_referrer_id(
    tx: &mut Tx<'_>,
    user_id: UserId,
) -> Result<Option<i64>, ReferralError> {
    let row: Option<(Option<i64>,)> =
        sqlx::query_as("SELECT referrer_id FROM users WHERE id = $1")
            .bind(user_id.0)
            .fetch_optional(&mut **tx)
            .await?;
    Ok(row.and_then(|(r,)| r))
}

pub async fn get_user_id_by_referral_code(
    tx: &mut Tx<'_>,
    code: &str,
) -> Result<Option<i64>, ReferralError> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE referral_code = $1")
        .bind(code)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.map(|(id,)| id))
}

pub async fn user_exists(tx: &mut Tx<'_>, user_id: UserId) -> Result<bool, ReferralError> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1")
        .bind(user_id.0)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.is_some())
}

/// Sets `referrer_id` on `child`, but only if it is currently null. Returns
/// `false` (no row updated) if the child already had a referrer — the
/// no-overwrite invariant is enforced here, at the statement level, so it
/// holds even under concurrent writers racing the same child row.
pub async fn set_referrer_if_unset(
    tx: &mut Tx<'_>,
    child: UserId,
    parent: UserId,
) -> Result<bool, ReferralError> {
    let result =
        sqlx::query("UPDATE users SET referrer_id = $1 WHERE id = $2 AND referrer_id IS NULL")
            .bind(parent.0)
            .bind(child.0)
            .execute(&mut **tx)
            .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn get_or_generate_referral_code(
    tx: &mut Tx<'_>,
    user_id: UserId,
) -> Result<String, ReferralError> {
    let existing: Option<(Option<String>,)> =
        sqlx::query_as("SELECT referral_code FROM users WHERE id = $1")
            .bind(user_id.0)
            .fetch_optional(&mut **tx)
            .await?;
    let existing = existing.ok_or(ReferralError::UnknownUser(user_id.0))?;
    if let Some(code) = existing.0 {
        return Ok(code);
    }

    for _ in 0..REFERRAL_CODE_GEN_MAX_ATTEMPTS {
        let candidate = generate_candidate_code();
        let result = sqlx::query(
            "UPDATE users SET referral_code = $1 WHERE id = $2 AND referral_code IS NULL",
        )
        .bind(&candidate)
        .bind(user_id.0)
        .execute(&mut **tx)
        .await;

        match result {
            Ok(r) if r.rows_affected() == 1 => return Ok(candidate),
            Ok(_) => return Ok(candidate_already_set(tx, user_id).await?),
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23505") => {
                continue; // collision on the unique referral_code index — redraw
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(ReferralError::ConflictRetry)
}

/// Another request won the race and assigned a code between our existence
/// check and our update attempt; re-read whatever it set.
async fn candidate_already_set(tx: &mut Tx<'_>, user_id: UserId) -> Result<String, ReferralError> {
    let (code,): (Option<String>,) =
        sqlx::query_as("SELECT referral_code FROM users WHERE id = $1")
            .bind(user_id.0)
            .fetch_one(&mut **tx)
            .await?;
    code.ok_or(ReferralError::ConflictRetry)
}

fn generate_candidate_code() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..REFERRAL_CODE_RANDOM_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..REFERRAL_CODE_ALPHABET.len());
            REFERRAL_CODE_ALPHABET[idx] as char
        })
        .collect();
    format!("{REFERRAL_CODE_PREFIX}{suffix}")
}

#[derive(FromRow)]
pub struct NetworkUserRow {
    pub id: i64,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub referrer_id: Option<i64>,
}

pub async fn get_direct_referrals(
    tx: &mut Tx<'_>,
    parent_ids: &[i64],
    limit: i64,
) -> Result<Vec<NetworkUserRow>, ReferralError> {
    if parent_ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query_as::<_, NetworkUserRow>(
        r#"SELECT id, username, created_at, referrer_id
           FROM users
           WHERE referrer_id = ANY($1)
           ORDER BY created_at DESC
           LIMIT $2"#,
    )
    .bind(parent_ids)
    .bind(limit)
    .fetch_all(&mut **tx)
    .await?;
    Ok(rows)
}

// ── Trades ────────────────────────────────────────────────────────────────────

/// Inserts the trade row keyed by `(trade_id, chain)` if it doesn't already
/// exist. Returns `(row_id, true)` when this call created the row, or
/// `(row_id, false)` when a prior delivery already won the race — the sole
/// idempotency mechanism for ingestion.
pub async fn ensure_trade_row(
    tx: &mut Tx<'_>,
    trade_id: &str,
    chain: &str,
    trader_id: UserId,
    fee_token: &str,
    fee_amount: Decimal,
    executed_at: DateTime<Utc>,
) -> Result<(i64, bool), ReferralError> {
    let inserted: Option<(i64,)> = sqlx::query_as(
        r#"INSERT INTO trades (trade_id, chain, trader_id, fee_token, fee_amount, executed_at)
           VALUES ($1, $2, $3, $4, $5, $6)
           ON CONFLICT (trade_id, chain) DO NOTHING
           RETURNING id"#,
    )
    .bind(trade_id)
    .bind(chain)
    .bind(trader_id.0)
    .bind(fee_token)
    .bind(fee_amount)
    .bind(executed_at)
    .fetch_optional(&mut **tx)
    .await?;

    if let Some((id,)) = inserted {
        return Ok((id, true));
    }

    let (id,): (i64,) = sqlx::query_as("SELECT id FROM trades WHERE trade_id = $1 AND chain = $2")
        .bind(trade_id)
        .bind(chain)
        .fetch_one(&mut **tx)
        .await?;
    Ok((id, false))
}

// ── Accrual journal + ledger ──────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
pub async fn insert_accrual_entry(
    tx: &mut Tx<'_>,
    trade_row_id: i64,
    chain: &str,
    beneficiary: UserId,
    kind: AccrualKind,
    token: &str,
    amount: Decimal,
    executed_at: DateTime<Utc>,
) -> Result<(), ReferralError> {
    sqlx::query(
        r#"INSERT INTO accrual_entries
               (trade_id, chain, beneficiary_user_id, kind, token, amount, executed_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
    )
    .bind(trade_row_id)
    .bind(chain)
    .bind(beneficiary.0)
    .bind(kind.as_str())
    .bind(token)
    .bind(amount)
    .bind(executed_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn upsert_ledger_delta(
    tx: &mut Tx<'_>,
    user_id: UserId,
    kind: AccrualKind,
    token: &str,
    delta: Decimal,
) -> Result<(), ReferralError> {
    sqlx::query(
        r#"INSERT INTO accrual_ledger (user_id, kind, token, accrued_amount, claimed_amount, updated_at)
           VALUES ($1, $2, $3, $4, 0, now())
           ON CONFLICT (user_id, kind, token)
           DO UPDATE SET accrued_amount = accrual_ledger.accrued_amount + EXCLUDED.accrued_amount,
                         updated_at = now()"#,
    )
    .bind(user_id.0)
    .bind(kind.as_str())
    .bind(token)
    .bind(delta)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[derive(FromRow)]
pub struct LedgerRowRaw {
    pub kind: String,
    pub token: String,
    pub accrued_amount: Decimal,
    pub claimed_amount: Decimal,
}

/// All-time ledger rows for `user_id`, no lock taken (read-only views).
pub async fn get_ledger_rows_for_user(
    tx: &mut Tx<'_>,
    user_id: UserId,
) -> Result<Vec<LedgerRowRaw>, ReferralError> {
    let rows = sqlx::query_as::<_, LedgerRowRaw>(
        "SELECT kind, token, accrued_amount, claimed_amount FROM accrual_ledger WHERE user_id = $1",
    )
    .bind(user_id.0)
    .fetch_all(&mut **tx)
    .await?;
    Ok(rows)
}

/// Ledger rows for `(user_id, token)`, row-locked with `FOR UPDATE` — used by
/// claim execution. The lock is what serializes two concurrent claims for the
/// same user/token.
pub async fn lock_ledger_rows_for_update(
    tx: &mut Tx<'_>,
    user_id: UserId,
    token: &str,
) -> Result<Vec<LedgerRowRaw>, ReferralError> {
    let rows = sqlx::query_as::<_, LedgerRowRaw>(
        r#"SELECT kind, token, accrued_amount, claimed_amount
           FROM accrual_ledger WHERE user_id = $1 AND token = $2
           FOR UPDATE"#,
    )
    .bind(user_id.0)
    .bind(token)
    .fetch_all(&mut **tx)
    .await?;
    Ok(rows)
}

/// Same as `lock_ledger_rows_for_update` but without a lock — used by the
/// read-only claim preview.
pub async fn peek_ledger_rows(
    tx: &mut Tx<'_>,
    user_id: UserId,
    token: &str,
) -> Result<Vec<LedgerRowRaw>, ReferralError> {
    let rows = sqlx::query_as::<_, LedgerRowRaw>(
        "SELECT kind, token, accrued_amount, claimed_amount FROM accrual_ledger WHERE user_id = $1 AND token = $2",
    )
    .bind(user_id.0)
    .bind(token)
    .fetch_all(&mut **tx)
    .await?;
    Ok(rows)
}

/// Marks every claimable kind fully claimed in one statement. Idempotent with
/// respect to rows already at `claimed == accrued`.
pub async fn mark_claimable_kinds_claimed(
    tx: &mut Tx<'_>,
    user_id: UserId,
    token: &str,
    claimable_kinds: &[&str],
) -> Result<(), ReferralError> {
    sqlx::query(
        r#"UPDATE accrual_ledger
           SET claimed_amount = accrued_amount, updated_at = now()
           WHERE user_id = $1 AND token = $2 AND kind = ANY($3)"#,
    )
    .bind(user_id.0)
    .bind(token)
    .bind(claimable_kinds)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[derive(FromRow)]
pub struct PayoutBatchRow {
    pub id: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

pub async fn insert_payout_batch(
    tx: &mut Tx<'_>,
    user_id: UserId,
    token: &str,
    amount: Decimal,
) -> Result<PayoutBatchRow, ReferralError> {
    let row = sqlx::query_as::<_, PayoutBatchRow>(
        r#"INSERT INTO payout_batches (user_id, token, amount, status)
           VALUES ($1, $2, $3, 'pending')
           RETURNING id, status, created_at"#,
    )
    .bind(user_id.0)
    .bind(token)
    .bind(amount)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row)
}

// ── Earnings journal ──────────────────────────────────────────────────────────

#[derive(FromRow)]
pub struct WindowedTotalRow {
    pub kind: String,
    pub total: Option<Decimal>,
}

pub async fn get_windowed_totals(
    tx: &mut Tx<'_>,
    user_id: UserId,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<WindowedTotalRow>, ReferralError> {
    let rows = sqlx::query_as::<_, WindowedTotalRow>(
        r#"SELECT kind, SUM(amount) AS total
           FROM accrual_entries
           WHERE beneficiary_user_id = $1 AND executed_at >= $2 AND executed_at < $3
           GROUP BY kind"#,
    )
    .bind(user_id.0)
    .bind(from)
    .bind(to)
    .fetch_all(&mut **tx)
    .await?;
    Ok(rows)
}

#[derive(FromRow)]
pub struct BreakdownRow {
    pub trade_id: String,
    pub chain: String,
    pub kind: String,
    pub token: String,
    pub amount: Decimal,
    pub executed_at: DateTime<Utc>,
}

pub async fn get_recent_breakdown(
    tx: &mut Tx<'_>,
    user_id: UserId,
    limit: i64,
) -> Result<Vec<BreakdownRow>, ReferralError> {
    let rows = sqlx::query_as::<_, BreakdownRow>(
        r#"SELECT t.trade_id, e.chain, e.kind, e.token, e.amount, e.executed_at
           FROM accrual_entries e
           JOIN trades t ON t.id = e.trade_id
           WHERE e.beneficiary_user_id = $1
           ORDER BY e.executed_at DESC
           LIMIT $2"#,
    )
    .bind(user_id.0)
    .bind(limit)
    .fetch_all(&mut **tx)
    .await?;
    Ok(rows)
}
