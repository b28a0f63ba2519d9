//! ─── Referral engine constants ──────────────────────────────────────────────

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ── Precision ─────────────────────────────────────────────────────────────────

/// Every monetary value on the accrual path is quantized to this many
/// fractional digits, truncated (never rounded to nearest).
pub const DECIMAL_PLACES: u32 = 6;

// ── Split ratios ──────────────────────────────────────────────────────────────

pub const CASHBACK_RATE: Decimal = dec!(0.10);
pub const L1_RATE: Decimal = dec!(0.30);
pub const L2_RATE: Decimal = dec!(0.03);
pub const L3_RATE: Decimal = dec!(0.02);

// ── Lineage ───────────────────────────────────────────────────────────────────

/// Default and maximum number of ancestor levels resolved/walked.
pub const DEFAULT_MAX_LEVELS: u32 = 3;

/// Hard cap on the `assign_referrer` ancestor walk, independent of tree depth.
/// Belt-and-braces against a corrupted (cyclic) graph.
pub const CYCLE_WALK_DEPTH_CAP: u32 = 64;

// ── Network walker (C7) ───────────────────────────────────────────────────────

pub const NETWORK_MAX_LEVELS_DEFAULT: u32 = 3;
pub const NETWORK_MAX_LEVELS_CEILING: u32 = 5;
pub const NETWORK_LIMIT_PER_LEVEL_DEFAULT: u32 = 50;
pub const NETWORK_LIMIT_PER_LEVEL_CEILING: u32 = 500;

// ── Earnings (C5) ─────────────────────────────────────────────────────────────

pub const BREAKDOWN_LIMIT_DEFAULT: u32 = 50;
pub const BREAKDOWN_LIMIT_CEILING: u32 = 500;

/// Accrual kinds, in the canonical order used for zero-filled earnings views.
pub const KNOWN_KINDS: [&str; 5] = [
    "cashback",
    "commission_l1",
    "commission_l2",
    "commission_l3",
    "treasury",
];

/// Kinds a beneficiary may claim. Treasury rows are never claimable.
pub const CLAIMABLE_KINDS: [&str; 4] = [
    "cashback",
    "commission_l1",
    "commission_l2",
    "commission_l3",
];

// ── Referral codes ────────────────────────────────────────────────────────────

pub const REFERRAL_CODE_PREFIX: &str = "REF_";
pub const REFERRAL_CODE_RANDOM_LEN: usize = 8;
pub const REFERRAL_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const REFERRAL_CODE_GEN_MAX_ATTEMPTS: u32 = 10;

// ── Retry policy ──────────────────────────────────────────────────────────────

pub const RETRY_MAX_ATTEMPTS: u32 = 5;
pub const RETRY_BASE_DELAY_MS: u64 = 20;
pub const RETRY_MAX_DELAY_MS: u64 = 500;
