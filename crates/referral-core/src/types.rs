//! Core domain types shared across the referral engine.
//!
//! Identities are plain integer primary keys (this is a relational system,
//! not a content-addressed one), but we still wrap them in newtypes so that
//! a `UserId` can never be confused with a `TradeId` or a raw `i64` offset.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Surrogate primary key for a user row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(v: i64) -> Self {
        UserId(v)
    }
}

/// Surrogate primary key for a trade row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradeRowId(pub i64);

/// Kind of an accrual — the five buckets a fee payment is split into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccrualKind {
    Cashback,
    CommissionL1,
    CommissionL2,
    CommissionL3,
    Treasury,
}

impl AccrualKind {
    /// All five kinds in the canonical, zero-fill order.
    pub const ALL: [AccrualKind; 5] = [
        AccrualKind::Cashback,
        AccrualKind::CommissionL1,
        AccrualKind::CommissionL2,
        AccrualKind::CommissionL3,
        AccrualKind::Treasury,
    ];

    /// The four kinds a beneficiary may claim. Treasury is excluded.
    pub const CLAIMABLE: [AccrualKind; 4] = [
        AccrualKind::Cashback,
        AccrualKind::CommissionL1,
        AccrualKind::CommissionL2,
        AccrualKind::CommissionL3,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccrualKind::Cashback => "cashback",
            AccrualKind::CommissionL1 => "commission_l1",
            AccrualKind::CommissionL2 => "commission_l2",
            AccrualKind::CommissionL3 => "commission_l3",
            AccrualKind::Treasury => "treasury",
        }
    }

    /// The commission kind paid to lineage position `index` (0 = nearest ancestor).
    pub fn commission_for_level(index: usize) -> Option<AccrualKind> {
        match index {
            0 => Some(AccrualKind::CommissionL1),
            1 => Some(AccrualKind::CommissionL2),
            2 => Some(AccrualKind::CommissionL3),
            _ => None,
        }
    }
}

impl fmt::Display for AccrualKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccrualKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cashback" => Ok(AccrualKind::Cashback),
            "commission_l1" => Ok(AccrualKind::CommissionL1),
            "commission_l2" => Ok(AccrualKind::CommissionL2),
            "commission_l3" => Ok(AccrualKind::CommissionL3),
            "treasury" => Ok(AccrualKind::Treasury),
            _ => Err(()),
        }
    }
}

/// Fixed-length lineage: position `i` is the ancestor `i+1` levels up, or
/// `None` once the walk has reached the root. Length is always `N` — this is
/// part of the contract, not an implementation detail.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Lineage(pub Vec<Option<UserId>>);

impl Lineage {
    pub fn get(&self, index: usize) -> Option<UserId> {
        self.0.get(index).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Option<UserId>> {
        self.0.iter()
    }
}

/// The five-way split of a fee, as computed by the Fee Splitter (C1).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Splits {
    pub cashback: Decimal,
    pub l1: Decimal,
    pub l2: Decimal,
    pub l3: Decimal,
    pub treasury: Decimal,
}

impl Splits {
    /// The split amount for a given kind.
    pub fn for_kind(&self, kind: AccrualKind) -> Decimal {
        match kind {
            AccrualKind::Cashback => self.cashback,
            AccrualKind::CommissionL1 => self.l1,
            AccrualKind::CommissionL2 => self.l2,
            AccrualKind::CommissionL3 => self.l3,
            AccrualKind::Treasury => self.treasury,
        }
    }
}

/// A single beneficiary credit staged by the Trade Accrual Engine before the
/// journal/ledger writes. Only strictly-positive amounts ever become one of
/// these — zero splits are dropped by the caller.
#[derive(Clone, Debug)]
pub struct Payout {
    pub beneficiary: UserId,
    pub kind: AccrualKind,
    pub amount: Decimal,
}

/// Inbound trade event, as delivered by the upstream trade-source webhook.
#[derive(Clone, Debug)]
pub struct TradeEvent {
    pub trade_id: String,
    pub chain: String,
    pub trader_id: UserId,
    pub fee_token: String,
    pub fee_amount: Decimal,
    pub executed_at: DateTime<Utc>,
}

/// Result of ingesting a trade event (C4).
#[derive(Clone, Debug)]
pub enum IngestOutcome {
    Applied {
        trade_id: String,
        lineage: Lineage,
        splits: Splits,
    },
    Duplicate {
        trade_id: String,
    },
}

/// Per-(user, kind, token) aggregate row read during claim/earnings.
#[derive(Clone, Debug)]
pub struct LedgerRow {
    pub user_id: UserId,
    pub kind: AccrualKind,
    pub token: String,
    pub accrued_amount: Decimal,
    pub claimed_amount: Decimal,
}

impl LedgerRow {
    pub fn unclaimed(&self) -> Decimal {
        self.accrued_amount - self.claimed_amount
    }
}

/// Result of a claim preview (no writes) or a successful claim execution.
#[derive(Clone, Debug)]
pub struct ClaimPreview {
    pub user_id: UserId,
    pub token: String,
    pub claimable: Decimal,
    pub per_kind: Vec<(AccrualKind, Decimal)>,
}

#[derive(Clone, Debug)]
pub struct ClaimResult {
    pub batch_id: i64,
    pub user_id: UserId,
    pub token: String,
    pub amount: Decimal,
    pub status: String,
    pub per_kind: Vec<(AccrualKind, Decimal)>,
    pub created_at: DateTime<Utc>,
}

/// One row of the downline network walk (C7).
#[derive(Clone, Debug)]
pub struct NetworkUser {
    pub user_id: UserId,
    pub username: String,
    pub joined_at: DateTime<Utc>,
    pub referrer_id: Option<UserId>,
}

#[derive(Clone, Debug)]
pub struct NetworkLevel {
    pub level: u32,
    pub users: Vec<NetworkUser>,
}

/// One row of the optional earnings breakdown (C5).
#[derive(Clone, Debug)]
pub struct EarningsBreakdownEntry {
    pub trade_id: String,
    pub chain: String,
    pub kind: AccrualKind,
    pub token: String,
    pub amount: Decimal,
    pub executed_at: DateTime<Utc>,
}

/// All-time or windowed earnings totals, zero-filled for every known kind.
#[derive(Clone, Debug)]
pub struct EarningsView {
    pub user_id: UserId,
    pub totals: Vec<(AccrualKind, Decimal)>,
    pub claimed: Vec<(AccrualKind, Decimal)>,
    pub unclaimed: Vec<(AccrualKind, Decimal)>,
    pub range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub breakdown: Option<Vec<EarningsBreakdownEntry>>,
}
