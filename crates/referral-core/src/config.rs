//! Typed startup configuration (C10). Parsed once in `main`; no hot-reload.

use std::net::SocketAddr;

use clap::Parser;

use crate::constants::{
    BREAKDOWN_LIMIT_DEFAULT, NETWORK_LIMIT_PER_LEVEL_CEILING, NETWORK_LIMIT_PER_LEVEL_DEFAULT,
    NETWORK_MAX_LEVELS_CEILING, NETWORK_MAX_LEVELS_DEFAULT,
};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "referral-node",
    version,
    about = "Multi-level referral accrual engine — HTTP service"
)]
pub struct Config {
    /// Postgres connection string.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// HTTP listen address.
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:8080")]
    pub bind_addr: SocketAddr,

    /// Maximum number of pooled Postgres connections.
    #[arg(long, env = "MAX_DB_CONNECTIONS", default_value_t = 10)]
    pub max_db_connections: u32,

    /// Default lineage/network depth when a request omits `max_levels`.
    #[arg(long, default_value_t = NETWORK_MAX_LEVELS_DEFAULT)]
    pub max_levels_default: u32,

    /// Operator-configured ceiling a request's `max_levels` is clamped to.
    #[arg(long, default_value_t = NETWORK_MAX_LEVELS_CEILING)]
    pub max_levels_max: u32,

    /// Default per-level cap for the network walker.
    #[arg(long, default_value_t = NETWORK_LIMIT_PER_LEVEL_DEFAULT)]
    pub limit_per_level_default: u32,

    /// Operator-configured ceiling a request's `limit_per_level` is clamped to.
    #[arg(long, default_value_t = NETWORK_LIMIT_PER_LEVEL_CEILING)]
    pub limit_per_level_max: u32,

    /// Default breakdown row cap for the earnings view.
    #[arg(long, default_value_t = BREAKDOWN_LIMIT_DEFAULT)]
    pub breakdown_limit_default: u32,

    /// Default claim token when a request omits it.
    #[arg(long, default_value = "USDC")]
    pub claim_token_default: String,

    /// `tracing-subscriber` env-filter directive.
    #[arg(long, env = "LOG_FILTER", default_value = "info,referral=debug")]
    pub log_filter: String,
}
