//! referral-node — the referral accrual engine's HTTP service binary.
//!
//! Startup sequence:
//!   1. Parse configuration (CLI flags with env fallbacks)
//!   2. Connect to Postgres and run embedded migrations
//!   3. Bind and serve the HTTP API

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use referral_api::AppState;
use referral_core::Config;
use referral_store::Db;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&config.log_filter)
                .unwrap_or_else(|_| "info,referral=debug".parse().unwrap()),
        )
        .init();

    info!("referral-node starting");

    let db = Db::connect(&config.database_url, config.max_db_connections)
        .await
        .context("connecting to Postgres")?;
    db.migrate().await.context("running migrations")?;
    info!("database ready");

    let addr = config.bind_addr;
    let state = Arc::new(AppState { db, config });

    referral_api::serve(state, addr)
        .await
        .context("serving HTTP API")?;

    Ok(())
}
