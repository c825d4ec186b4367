//! Coupon records and the pure discount evaluator.

use crate::types::Money;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// How a coupon discounts the subtotal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DiscountKind {
    /// Percentage of the subtotal, in basis points (1000 = 10%)
    Percentage {
        /// Basis points
        basis_points: u32,
    },
    /// Fixed amount off
    Flat(Money),
}

/// Coupon as stored under `coupons/{CODE}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CouponRecord {
    /// Upper-case code
    pub code: String,
    /// Discount rule
    pub discount: DiscountKind,
    /// Smallest subtotal the coupon applies to
    pub min_subtotal: Option<Money>,
    /// Coupon stops applying after this instant
    pub expires_at: Option<DateTime<Utc>>,
}

/// Why a coupon does not apply
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Serialize)]
pub enum CouponRejection {
    /// No coupon with that code
    #[error("Invalid coupon code")]
    NotFound,
    /// Past `expires_at`
    #[error("Coupon has expired")]
    Expired,
    /// Subtotal below `min_subtotal`
    #[error("Coupon not applicable")]
    BelowMinimum,
}

impl CouponRejection {
    /// Metric label
    #[must_use]
    pub const fn as_label(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Expired => "expired",
            Self::BelowMinimum => "below_minimum",
        }
    }
}

/// Result of evaluating a coupon against a subtotal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CouponEvaluation {
    /// Whether the coupon applies
    pub valid: bool,
    /// Set when `valid` is false
    pub reason: Option<CouponRejection>,
    /// Zero when invalid; never more than the subtotal
    pub discount: Money,
}

impl CouponEvaluation {
    const fn accepted(discount: Money) -> Self {
        Self {
            valid: true,
            reason: None,
            discount,
        }
    }

    const fn rejected(reason: CouponRejection) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
            discount: Money::ZERO,
        }
    }
}

/// Canonical form of a typed code: trimmed and upper-case
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Whether a normalized code can be used as a single `coupons/{CODE}` key
///
/// Empty codes and codes containing `/ . # $ [ ]` are not.
#[must_use]
pub fn is_valid_code(code: &str) -> bool {
    !code.is_empty() && !code.contains(['/', '.', '#', '$', '[', ']'])
}

/// Evaluate `coupon` against `subtotal` at `now`.
///
/// Expiry is checked before the minimum subtotal. A coupon expiring exactly
/// at `now` still applies.
#[must_use]
pub fn evaluate(
    subtotal: Money,
    coupon: Option<&CouponRecord>,
    now: DateTime<Utc>,
) -> CouponEvaluation {
    let Some(coupon) = coupon else {
        return CouponEvaluation::rejected(CouponRejection::NotFound);
    };

    if coupon.expires_at.is_some_and(|expires_at| expires_at < now) {
        return CouponEvaluation::rejected(CouponRejection::Expired);
    }

    if coupon.min_subtotal.is_some_and(|min| subtotal < min) {
        return CouponEvaluation::rejected(CouponRejection::BelowMinimum);
    }

    let discount = match coupon.discount {
        DiscountKind::Percentage { basis_points } => {
            let raw = u128::from(subtotal.minor()) * u128::from(basis_points) / 10_000;
            Money::from_minor(u64::try_from(raw).unwrap_or(u64::MAX))
        },
        DiscountKind::Flat(amount) => amount,
    };

    CouponEvaluation::accepted(discount.min(subtotal))
}

/// Coupon applied to a cart, with the discount computed at the last subtotal change
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppliedCoupon {
    coupon: Arc<CouponRecord>,
    discount: Money,
}

impl AppliedCoupon {
    /// Pair a coupon with its current discount
    #[must_use]
    pub const fn new(coupon: Arc<CouponRecord>, discount: Money) -> Self {
        Self { coupon, discount }
    }

    /// The coupon record
    #[must_use]
    pub fn coupon(&self) -> &CouponRecord {
        &self.coupon
    }

    /// Shared handle to the coupon record
    #[must_use]
    pub fn shared(&self) -> Arc<CouponRecord> {
        Arc::clone(&self.coupon)
    }

    /// Coupon code
    #[must_use]
    pub fn code(&self) -> &str {
        &self.coupon.code
    }

    /// Last computed discount
    #[must_use]
    pub const fn discount(&self) -> Money {
        self.discount
    }

    /// Re-evaluate at a new subtotal; `Err` means the coupon must be dropped
    ///
    /// # Errors
    ///
    /// Returns the rejection when the coupon no longer applies.
    pub fn reprice(&mut self, subtotal: Money, now: DateTime<Utc>) -> Result<Money, CouponRejection> {
        let evaluation = evaluate(subtotal, Some(&self.coupon), now);
        match evaluation.reason {
            Some(reason) => Err(reason),
            None => {
                self.discount = evaluation.discount;
                Ok(self.discount)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single().unwrap_or_default()
    }

    fn ten_percent_min_500() -> CouponRecord {
        CouponRecord {
            code: "SAVE10".into(),
            discount: DiscountKind::Percentage { basis_points: 1_000 },
            min_subtotal: Some(Money::from_minor(50_000)),
            expires_at: None,
        }
    }

    #[test]
    fn codes_are_trimmed_and_upper_cased() {
        assert_eq!(normalize_code("  save10 "), "SAVE10");
        assert_eq!(normalize_code("   "), "");
    }

    #[test]
    fn codes_must_be_plain_keys() {
        assert!(is_valid_code("SAVE10"));
        assert!(is_valid_code("FLAT-200_X"));
        for code in ["", "A/B", "A.B", "A#", "$A", "A[0]", "A]"] {
            assert!(!is_valid_code(code), "{code} should be rejected");
        }
    }

    #[test]
    fn percentage_coupon_above_minimum() {
        let evaluation = evaluate(Money::from_minor(100_000), Some(&ten_percent_min_500()), now());
        assert_eq!(evaluation, CouponEvaluation::accepted(Money::from_minor(10_000)));
    }

    #[test]
    fn percentage_coupon_below_minimum() {
        let evaluation = evaluate(Money::from_minor(40_000), Some(&ten_percent_min_500()), now());
        assert!(!evaluation.valid);
        assert_eq!(evaluation.discount, Money::ZERO);
        assert_eq!(
            evaluation.reason.map(|r| r.to_string()).as_deref(),
            Some("Coupon not applicable")
        );
    }

    #[test]
    fn flat_discount_capped_at_subtotal() {
        let coupon = CouponRecord {
            code: "FLAT1000".into(),
            discount: DiscountKind::Flat(Money::from_minor(100_000)),
            min_subtotal: None,
            expires_at: None,
        };
        let evaluation = evaluate(Money::from_minor(30_000), Some(&coupon), now());
        assert!(evaluation.valid);
        assert_eq!(evaluation.discount, Money::from_minor(30_000));
    }

    #[test]
    fn missing_and_expired_coupons() {
        assert_eq!(
            evaluate(Money::from_minor(100), None, now()).reason,
            Some(CouponRejection::NotFound)
        );

        let expired = CouponRecord {
            expires_at: Some(now() - chrono::Duration::seconds(1)),
            ..ten_percent_min_500()
        };
        assert_eq!(
            evaluate(Money::from_minor(100_000), Some(&expired), now()).reason,
            Some(CouponRejection::Expired)
        );

        let expiring_now = CouponRecord {
            expires_at: Some(now()),
            ..ten_percent_min_500()
        };
        assert!(evaluate(Money::from_minor(100_000), Some(&expiring_now), now()).valid);
    }

    #[test]
    fn reprice_drops_coupon_below_minimum() {
        let mut applied = AppliedCoupon::new(Arc::new(ten_percent_min_500()), Money::from_minor(10_000));

        assert_eq!(applied.reprice(Money::from_minor(60_000), now()), Ok(Money::from_minor(6_000)));
        assert_eq!(applied.discount(), Money::from_minor(6_000));
        assert_eq!(
            applied.reprice(Money::from_minor(10_000), now()),
            Err(CouponRejection::BelowMinimum)
        );
    }
}
