use axum::http::StatusCode;
use thiserror::Error;

/// The single error type surfaced by every component of the referral engine.
///
/// Rule violations abort the current transaction and are 400-class (404 for
/// the one explicitly not-found case); store faults abort and are 500-class.
/// No partial writes ever escape a failed operation.
#[derive(Debug, Error)]
pub enum ReferralError {
    // ── Lookup misses ────────────────────────────────────────────────────────
    #[error("unknown user: {0}")]
    UnknownUser(i64),

    #[error("unknown referral code: {0}")]
    UnknownCode(String),

    // ── Referral graph rule violations ──────────────────────────────────────
    #[error("user {child} already has a referrer")]
    AlreadyReferred { child: i64 },

    #[error("a user cannot refer themselves")]
    SelfReferral,

    #[error("assigning this referrer would create a cycle")]
    Cycle,

    // ── Trade ingestion ──────────────────────────────────────────────────────
    #[error("invalid trade event: {0}")]
    InvalidEvent(String),

    // ── Claim preconditions ──────────────────────────────────────────────────
    #[error("no balance for this user/token")]
    NoBalance,

    #[error("nothing claimable for this user/token")]
    NothingToClaim,

    // ── Configuration ─────────────────────────────────────────────────────────
    #[error("no treasury user configured")]
    Misconfigured,

    // ── Concurrency ───────────────────────────────────────────────────────────
    #[error("transaction conflict; retry")]
    ConflictRetry,

    // ── Store ─────────────────────────────────────────────────────────────────
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl ReferralError {
    /// Maps this error to the HTTP status and `{detail}` body text used by
    /// every handler in the API layer.
    pub fn status_and_detail(&self) -> (StatusCode, String) {
        use ReferralError::*;
        match self {
            UnknownUser(_) => (StatusCode::NOT_FOUND, self.to_string()),
            UnknownCode(_) | AlreadyReferred { .. } | SelfReferral | Cycle | InvalidEvent(_)
            | NoBalance | NothingToClaim => (StatusCode::BAD_REQUEST, self.to_string()),
            Misconfigured | ConflictRetry | Store(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_string())
            }
        }
    }

    /// True if the underlying sqlx error carries one of the SQLSTATEs that
    /// make a transaction worth retrying (serialization failure or deadlock).
    pub fn is_retryable(err: &sqlx::Error) -> bool {
        match err {
            sqlx::Error::Database(db_err) => matches!(
                db_err.code().as_deref(),
                Some("40001") | Some("40P01") | Some("25001")
            ),
            _ => false,
        }
    }
}
