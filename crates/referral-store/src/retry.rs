//! Transaction retry helper for operations that must survive a serialization
//! failure or deadlock under concurrent load (`assign_referrer`, defensively
//! also ingest/claim). See the concurrency model for which SQLSTATEs count.

use futures::future::BoxFuture;
use rand::Rng;
use referral_core::ReferralError;
use sqlx::PgPool;
use std::time::Duration;

use referral_core::constants::{RETRY_BASE_DELAY_MS, RETRY_MAX_ATTEMPTS, RETRY_MAX_DELAY_MS};

/// Runs `op` inside a fresh serializable transaction, retrying with
/// exponential backoff and jitter on a retryable SQLSTATE. `op` receives the
/// open transaction and must not commit or roll it back itself — the caller
/// only ever sees success (already committed) or a final, non-retryable
/// error.
pub async fn with_serializable_tx<T, F>(pool: &PgPool, mut op: F) -> Result<T, ReferralError>
where
    F: for<'a> FnMut(&'a mut sqlx::Transaction<'_, sqlx::Postgres>) -> BoxFuture<'a, Result<T, ReferralError>>,
{
    let mut attempt: u32 = 1;
    loop {
        let mut tx = pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;

        match op(&mut tx).await {
            Ok(value) => {
                tx.commit().await?;
                return Ok(value);
            }
            Err(ReferralError::Store(err)) if ReferralError::is_retryable(&err) => {
                let _ = tx.rollback().await;
                if attempt >= RETRY_MAX_ATTEMPTS {
                    return Err(ReferralError::ConflictRetry);
                }
                let jitter = rand::thread_rng().gen_range(0..10);
                let delay = (RETRY_BASE_DELAY_MS * (1 << (attempt - 1)) + jitter)
                    .min(RETRY_MAX_DELAY_MS);
                tokio::time::sleep(Duration::from_millis(delay)).await;
                attempt += 1;
            }
            Err(other) => {
                let _ = tx.rollback().await;
                return Err(other);
            }
        }
    }
}
