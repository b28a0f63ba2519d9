//! HTTP API Layer (C9) — axum router + handlers over the referral-store
//! components. Middleware is composed with `tower::ServiceBuilder` over a
//! permissive CORS layer and request tracing, plain REST rather than RPC
//! framing.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use referral_core::config::Config;
use referral_core::types::{TradeEvent, UserId};
use referral_core::ReferralError;
use referral_store::{accrual, claim, earnings, graph, network, Db};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::dto::{
    ClaimExecuteResponse, ClaimPreviewResponse, ClaimRequest, EarningsQueryParams,
    EarningsResponse, ErrorBody, GenerateRequest, GenerateResponse, NetworkLevelDto,
    NetworkQuery, NetworkResponse, RegisterRequest, RegisterResponse, TradeWebhookRequest,
    TradeWebhookResponse,
};
use referral_store::earnings::EarningsQuery;

/// Shared application state handed to every handler.
pub struct AppState {
    pub db: Db,
    pub config: Config,
}

/// API-facing wrapper so `ReferralError` can implement `IntoResponse` without
/// an orphan-rule violation across crates.
pub struct ApiError(pub ReferralError);

impl From<ReferralError> for ApiError {
    fn from(e: ReferralError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = self.0.status_and_detail();
        (status, Json(ErrorBody { detail })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/referral/register", post(register))
        .route("/api/referral/generate", post(generate))
        .route("/api/webhook/trade", post(webhook_trade))
        .route("/api/referral/network", get(get_network))
        .route("/api/referral/earnings", get(get_earnings))
        .route("/api/referral/claim", post(preview_claim))
        .route("/api/referral/claim/execute", post(execute_claim))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "referral API listening");
    axum::serve(listener, router).await?;
    Ok(())
}

async fn healthz(State(state): State<Arc<AppState>>) -> Response {
    match state.db.ping().await {
        Ok(()) => (axum::http::StatusCode::OK, "ok").into_response(),
        Err(_) => (axum::http::StatusCode::SERVICE_UNAVAILABLE, "unavailable").into_response(),
    }
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<RegisterResponse> {
    let result = graph::assign_referrer(
        &state.db.pool,
        UserId(req.child_user_id),
        &req.referral_code,
    )
    .await?;
    Ok(Json(result.into()))
}

async fn generate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> ApiResult<GenerateResponse> {
    let code = graph::get_or_assign_code(&state.db.pool, UserId(req.user_id)).await?;
    Ok(Json(GenerateResponse {
        user_id: req.user_id,
        referral_code: code,
    }))
}

async fn webhook_trade(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TradeWebhookRequest>,
) -> ApiResult<TradeWebhookResponse> {
    let event = TradeEvent {
        trade_id: req.trade_id,
        chain: req.chain,
        trader_id: UserId(req.trader_id),
        fee_token: req.fee_token,
        fee_amount: req.fee_amount,
        executed_at: req.executed_at,
    };
    let outcome = accrual::ingest_with_retry(&state.db, event).await?;
    Ok(Json(outcome.into()))
}

async fn get_network(
    State(state): State<Arc<AppState>>,
    Query(q): Query<NetworkQuery>,
) -> ApiResult<NetworkResponse> {
    let max_levels = q
        .max_levels
        .unwrap_or(state.config.max_levels_default)
        .min(state.config.max_levels_max);
    let limit_per_level = q
        .limit_per_level
        .unwrap_or(state.config.limit_per_level_default)
        .min(state.config.limit_per_level_max);

    let levels = network::downline(&state.db.pool, UserId(q.user_id), max_levels, limit_per_level)
        .await?;

    Ok(Json(NetworkResponse {
        user_id: q.user_id,
        max_levels,
        limit_per_level,
        levels: levels.into_iter().map(NetworkLevelDto::from).collect(),
    }))
}

async fn get_earnings(
    State(state): State<Arc<AppState>>,
    Query(q): Query<EarningsQueryParams>,
) -> ApiResult<EarningsResponse> {
    let range = match (q.from, q.to) {
        (Some(from), Some(to)) => Some((from, to)),
        _ => None,
    };
    let breakdown_limit = if q.include_breakdown {
        Some(
            q.breakdown_limit
                .unwrap_or(state.config.breakdown_limit_default)
                .min(referral_core::constants::BREAKDOWN_LIMIT_CEILING),
        )
    } else {
        None
    };

    let view = earnings::get_earnings(
        &state.db.pool,
        EarningsQuery {
            user_id: UserId(q.user_id),
            range,
            breakdown_limit,
        },
    )
    .await?;

    Ok(Json(view.into()))
}

async fn preview_claim(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ClaimRequest>,
) -> ApiResult<ClaimPreviewResponse> {
    let token = req.token.unwrap_or_else(|| state.config.claim_token_default.clone());
    let preview = claim::preview_claim(&state.db.pool, UserId(req.user_id), &token).await?;
    Ok(Json(preview.into()))
}

async fn execute_claim(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ClaimRequest>,
) -> ApiResult<ClaimExecuteResponse> {
    let token = req.token.unwrap_or_else(|| state.config.claim_token_default.clone());
    let result = claim::execute_claim(&state.db.pool, UserId(req.user_id), &token).await?;
    Ok(Json(result.into()))
}
