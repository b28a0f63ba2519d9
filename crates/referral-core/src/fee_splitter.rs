//! The Fee Splitter (C1) — a pure function from a fee amount and a lineage
//! to the five-way split. No I/O, no database handle; fully unit-testable.

use rust_decimal::Decimal;

use crate::constants::{CASHBACK_RATE, DECIMAL_PLACES, L1_RATE, L2_RATE, L3_RATE};
use crate::types::{Lineage, Splits};

/// Truncate `d` to `DECIMAL_PLACES` fractional digits, rounding toward zero.
/// This is truncation, not nearest-rounding: `quantize` with `ToZero` strategy
/// is deliberate, since any rounding error must always land in treasury's
/// favor, never the beneficiary's.
fn truncate6(d: Decimal) -> Decimal {
    d.trunc_with_scale(DECIMAL_PLACES)
}

/// Compute the five-way split of `fee_amount` given the trader's `lineage`.
///
/// `lineage.get(0)` is the nearest ancestor (eligible for `commission_l1`),
/// `lineage.get(1)` for `commission_l2`, `lineage.get(2)` for `commission_l3`.
/// Only presence of an ancestor matters here — the caller resolves the actual
/// ids separately when building the payout list.
///
/// Conservation holds by construction: `treasury` is the residual after
/// truncating every other term, so the five outputs always sum exactly to
/// `fee_amount` at 6 decimal places.
pub fn split_fee(fee_amount: Decimal, lineage: &Lineage) -> Splits {
    let cashback = truncate6(fee_amount * CASHBACK_RATE);

    let l1 = if lineage.get(0).is_some() {
        truncate6(fee_amount * L1_RATE)
    } else {
        Decimal::ZERO
    };
    let l2 = if lineage.get(1).is_some() {
        truncate6(fee_amount * L2_RATE)
    } else {
        Decimal::ZERO
    };
    let l3 = if lineage.get(2).is_some() {
        truncate6(fee_amount * L3_RATE)
    } else {
        Decimal::ZERO
    };

    let treasury = truncate6(fee_amount - (cashback + l1 + l2 + l3));

    Splits {
        cashback,
        l1,
        l2,
        l3,
        treasury,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn lineage(present: [bool; 3]) -> Lineage {
        Lineage(
            present
                .into_iter()
                .map(|p| p.then_some(crate::types::UserId(1)))
                .collect(),
        )
    }

    #[test]
    fn full_lineage_splits_as_s1() {
        let splits = split_fee(dec!(200.000000), &lineage([true, true, true]));
        assert_eq!(splits.cashback, dec!(20.000000));
        assert_eq!(splits.l1, dec!(60.000000));
        assert_eq!(splits.l2, dec!(6.000000));
        assert_eq!(splits.l3, dec!(4.000000));
        assert_eq!(splits.treasury, dec!(110.000000));
        assert_eq!(
            splits.cashback + splits.l1 + splits.l2 + splits.l3 + splits.treasury,
            dec!(200.000000)
        );
    }

    #[test]
    fn partial_lineage_zeroes_missing_levels() {
        let splits = split_fee(dec!(200.000000), &lineage([true, false, false]));
        assert_eq!(splits.cashback, dec!(20.000000));
        assert_eq!(splits.l1, dec!(60.000000));
        assert_eq!(splits.l2, Decimal::ZERO);
        assert_eq!(splits.l3, Decimal::ZERO);
        assert_eq!(splits.treasury, dec!(120.000000));
        assert_eq!(
            splits.cashback + splits.l1 + splits.l2 + splits.l3 + splits.treasury,
            dec!(200.000000)
        );
    }

    #[test]
    fn no_lineage_sends_everything_but_cashback_to_treasury() {
        let splits = split_fee(dec!(200.000000), &lineage([false, false, false]));
        assert_eq!(splits.cashback, dec!(20.000000));
        assert_eq!(splits.l1, Decimal::ZERO);
        assert_eq!(splits.l2, Decimal::ZERO);
        assert_eq!(splits.l3, Decimal::ZERO);
        assert_eq!(splits.treasury, dec!(180.000000));
    }

    #[test]
    fn tiny_fee_rounds_down_as_s3() {
        let splits = split_fee(dec!(0.010000), &lineage([true, true, true]));
        assert_eq!(splits.cashback, dec!(0.001000));
        assert_eq!(splits.l1, dec!(0.003000));
        assert_eq!(splits.l2, dec!(0.000300));
        assert_eq!(splits.l3, dec!(0.000200));
        assert_eq!(splits.treasury, dec!(0.005500));
        assert_eq!(
            splits.cashback + splits.l1 + splits.l2 + splits.l3 + splits.treasury,
            dec!(0.010000)
        );
    }

    #[test]
    fn conservation_holds_across_many_amounts() {
        for raw in [1u64, 7, 13, 99, 1001, 123_456, 999_999] {
            let fee = Decimal::new(raw as i64, 3);
            for mask in 0u8..8 {
                let present = [mask & 1 != 0, mask & 2 != 0, mask & 4 != 0];
                let splits = split_fee(fee, &lineage(present));
                let sum = splits.cashback + splits.l1 + splits.l2 + splits.l3 + splits.treasury;
                assert_eq!(sum, fee.trunc_with_scale(DECIMAL_PLACES));
            }
        }
    }

    #[test]
    fn beneficiary_splits_never_negative() {
        let splits = split_fee(dec!(0.000001), &lineage([true, true, true]));
        assert!(splits.cashback >= Decimal::ZERO);
        assert!(splits.l1 >= Decimal::ZERO);
        assert!(splits.l2 >= Decimal::ZERO);
        assert!(splits.l3 >= Decimal::ZERO);
        assert!(splits.treasury >= Decimal::ZERO);
    }
}
