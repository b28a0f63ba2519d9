//! Request/response DTOs for the HTTP surface. Every monetary value crosses
//! the wire as a string with exactly 6 fractional digits — never a bare
//! JSON number, to avoid silent precision loss in clients.

use chrono::{DateTime, Utc};
use referral_core::constants::DECIMAL_PLACES;
use referral_core::types::{
    AccrualKind, ClaimPreview, ClaimResult, EarningsView, IngestOutcome, NetworkLevel, Splits,
};
use referral_store::graph::LinkResult;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub fn fmt_amount(d: Decimal) -> String {
    format!("{:.*}", DECIMAL_PLACES as usize, d)
}

// ── POST /api/referral/register ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub child_user_id: i64,
    pub referral_code: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub status: &'static str,
    pub child_id: i64,
    pub parent_id: i64,
}

impl From<LinkResult> for RegisterResponse {
    fn from(r: LinkResult) -> Self {
        RegisterResponse {
            status: "linked",
            child_id: r.child_id.0,
            parent_id: r.parent_id.0,
        }
    }
}

// ── POST /api/referral/generate ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub user_id: i64,
    pub referral_code: String,
}

// ── POST /api/webhook/trade ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TradeWebhookRequest {
    pub trade_id: String,
    pub trader_id: i64,
    pub chain: String,
    pub fee_token: String,
    pub fee_amount: Decimal,
    pub executed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SplitsDto {
    pub cashback: String,
    pub l1: String,
    pub l2: String,
    pub l3: String,
    pub treasury: String,
}

impl From<&Splits> for SplitsDto {
    fn from(s: &Splits) -> Self {
        SplitsDto {
            cashback: fmt_amount(s.cashback),
            l1: fmt_amount(s.l1),
            l2: fmt_amount(s.l2),
            l3: fmt_amount(s.l3),
            treasury: fmt_amount(s.treasury),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TradeWebhookResponse {
    pub status: &'static str,
    pub trade_id: String,
    pub lineage: Vec<Option<i64>>,
    pub splits: Option<SplitsDto>,
}

impl From<IngestOutcome> for TradeWebhookResponse {
    fn from(outcome: IngestOutcome) -> Self {
        match outcome {
            IngestOutcome::Applied {
                trade_id,
                lineage,
                splits,
            } => TradeWebhookResponse {
                status: "applied",
                trade_id,
                lineage: lineage.0.into_iter().map(|u| u.map(|id| id.0)).collect(),
                splits: Some((&splits).into()),
            },
            IngestOutcome::Duplicate { trade_id } => TradeWebhookResponse {
                status: "duplicate",
                trade_id,
                lineage: Vec::new(),
                splits: None,
            },
        }
    }
}

// ── GET /api/referral/network ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NetworkQuery {
    pub user_id: i64,
    pub max_levels: Option<u32>,
    pub limit_per_level: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct NetworkUserDto {
    pub user_id: i64,
    pub username: String,
    pub joined_at: DateTime<Utc>,
    pub referrer_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct NetworkLevelDto {
    pub level: u32,
    pub users: Vec<NetworkUserDto>,
}

impl From<NetworkLevel> for NetworkLevelDto {
    fn from(l: NetworkLevel) -> Self {
        NetworkLevelDto {
            level: l.level,
            users: l
                .users
                .into_iter()
                .map(|u| NetworkUserDto {
                    user_id: u.user_id.0,
                    username: u.username,
                    joined_at: u.joined_at,
                    referrer_id: u.referrer_id.map(|id| id.0),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NetworkResponse {
    pub user_id: i64,
    pub max_levels: u32,
    pub limit_per_level: u32,
    pub levels: Vec<NetworkLevelDto>,
}

// ── GET /api/referral/earnings ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EarningsQueryParams {
    pub user_id: i64,
    #[serde(default)]
    pub include_breakdown: bool,
    pub breakdown_limit: Option<u32>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct RangeDto {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct BreakdownEntryDto {
    pub trade_id: String,
    pub chain: String,
    pub kind: String,
    pub token: String,
    pub amount: String,
    pub executed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct EarningsResponse {
    pub user_id: i64,
    pub totals: std::collections::BTreeMap<String, String>,
    pub claimed: std::collections::BTreeMap<String, String>,
    pub unclaimed: std::collections::BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<RangeDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<Vec<BreakdownEntryDto>>,
}

impl From<EarningsView> for EarningsResponse {
    fn from(v: EarningsView) -> Self {
        let to_map = |pairs: Vec<(AccrualKind, Decimal)>| {
            pairs
                .into_iter()
                .map(|(k, amount)| (k.as_str().to_string(), fmt_amount(amount)))
                .collect()
        };
        EarningsResponse {
            user_id: v.user_id.0,
            totals: to_map(v.totals),
            claimed: to_map(v.claimed),
            unclaimed: to_map(v.unclaimed),
            range: v.range.map(|(from, to)| RangeDto {
                from: Some(from),
                to: Some(to),
            }),
            breakdown: v.breakdown.map(|rows| {
                rows.into_iter()
                    .map(|e| BreakdownEntryDto {
                        trade_id: e.trade_id,
                        chain: e.chain,
                        kind: e.kind.as_str().to_string(),
                        token: e.token,
                        amount: fmt_amount(e.amount),
                        executed_at: e.executed_at,
                    })
                    .collect()
            }),
        }
    }
}

// ── POST /api/referral/claim, /api/referral/claim/execute ────────────────────

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub user_id: i64,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClaimPreviewResponse {
    pub user_id: i64,
    pub token: String,
    pub claimable: String,
    pub kinds: std::collections::BTreeMap<String, String>,
}

impl From<ClaimPreview> for ClaimPreviewResponse {
    fn from(p: ClaimPreview) -> Self {
        ClaimPreviewResponse {
            user_id: p.user_id.0,
            token: p.token,
            claimable: fmt_amount(p.claimable),
            kinds: p
                .per_kind
                .into_iter()
                .map(|(k, v)| (k.as_str().to_string(), fmt_amount(v)))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClaimExecuteResponse {
    pub batch_id: i64,
    pub user_id: i64,
    pub token: String,
    pub amount: String,
    pub status: String,
    pub per_kind: std::collections::BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl From<ClaimResult> for ClaimExecuteResponse {
    fn from(r: ClaimResult) -> Self {
        ClaimExecuteResponse {
            batch_id: r.batch_id,
            user_id: r.user_id.0,
            token: r.token,
            amount: fmt_amount(r.amount),
            status: r.status,
            per_kind: r
                .per_kind
                .into_iter()
                .map(|(k, v)| (k.as_str().to_string(), fmt_amount(v)))
                .collect(),
            created_at: r.created_at,
        }
    }
}

// ── Shared error body ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}
