//! `Db` wraps the shared Postgres pool and the process-lifetime cached facts
//! (currently just the treasury user id) that every component reads through.
//! Mirrors the role of the teacher's state-database handle: a single typed
//! entry point that every higher-level component is constructed around.

use std::sync::Arc;

use referral_core::ReferralError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::OnceCell;

#[derive(Clone)]
pub struct Db {
    pub pool: PgPool,
    treasury_user_id: Arc<OnceCell<i64>>,
}

impl Db {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, ReferralError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool,
            treasury_user_id: Arc::new(OnceCell::new()),
        })
    }

    /// Wraps an already-open pool — used by integration tests that obtain a
    /// migrated pool via `#[sqlx::test]`.
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            treasury_user_id: Arc::new(OnceCell::new()),
        }
    }

    /// Runs the embedded migrations. Applied once at startup, before the
    /// HTTP listener binds.
    pub async fn migrate(&self) -> Result<(), ReferralError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ReferralError::Store(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Liveness check for `/healthz`.
    pub async fn ping(&self) -> Result<(), ReferralError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// The designated treasury sink user id, cached for process lifetime —
    /// it is configuration-stable per the design notes.
    pub async fn treasury_user_id(&self) -> Result<i64, ReferralError> {
        if let Some(id) = self.treasury_user_id.get() {
            return Ok(*id);
        }
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM users WHERE is_treasury = TRUE LIMIT 1")
                .fetch_optional(&self.pool)
                .await?;
        let id = row.ok_or(ReferralError::Misconfigured)?.0;
        let _ = self.treasury_user_id.set(id);
        Ok(id)
    }
}
