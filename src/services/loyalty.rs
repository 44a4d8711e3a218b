//! Loyalty program arithmetic
//!
//! Pure functions shared by the storage layer and the API: accrual from an
//! order subtotal, point-to-currency conversion, and the tier function.
//! Keeping these free of I/O makes the ledger invariants directly testable.

use crate::types::LoyaltyTier;

/// Lifetime points needed to reach each tier, in ascending order
pub const TIER_THRESHOLDS: [(LoyaltyTier, i64); 4] = [
    (LoyaltyTier::Bronze, 0),
    (LoyaltyTier::Silver, 1_000),
    (LoyaltyTier::Gold, 5_000),
    (LoyaltyTier::Platinum, 20_000),
];

/// Tier as a pure function of lifetime accrued points. Monotonic: more
/// lifetime points never yields a lower tier, and spending points (which
/// leaves lifetime untouched) never demotes.
pub fn tier_for_lifetime(lifetime_points: i64) -> LoyaltyTier {
    let mut tier = LoyaltyTier::Bronze;
    for (candidate, threshold) in TIER_THRESHOLDS {
        if lifetime_points >= threshold {
            tier = candidate;
        }
    }
    tier
}

/// Points needed to reach the next tier, None at the top
pub fn points_to_next_tier(lifetime_points: i64) -> Option<i64> {
    TIER_THRESHOLDS
        .iter()
        .find(|(_, threshold)| lifetime_points < *threshold)
        .map(|(_, threshold)| threshold - lifetime_points)
}

/// Accrual for a completed order: floor of the subtotal in whole currency
/// units (1 point per dollar)
pub fn accrual_for_subtotal(subtotal_cents: i64) -> i64 {
    if subtotal_cents <= 0 {
        return 0;
    }
    subtotal_cents / 100
}

/// Convert redeemed points to a discount in cents at the configured rate
/// (e.g. 100 points per currency unit -> 1 point = 1 cent)
pub fn points_to_cents(points: i64, points_per_currency_unit: i64) -> i64 {
    if points <= 0 || points_per_currency_unit <= 0 {
        return 0;
    }
    points * 100 / points_per_currency_unit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_thresholds() {
        assert_eq!(tier_for_lifetime(0), LoyaltyTier::Bronze);
        assert_eq!(tier_for_lifetime(999), LoyaltyTier::Bronze);
        assert_eq!(tier_for_lifetime(1_000), LoyaltyTier::Silver);
        assert_eq!(tier_for_lifetime(4_999), LoyaltyTier::Silver);
        assert_eq!(tier_for_lifetime(5_000), LoyaltyTier::Gold);
        assert_eq!(tier_for_lifetime(19_999), LoyaltyTier::Gold);
        assert_eq!(tier_for_lifetime(20_000), LoyaltyTier::Platinum);
        assert_eq!(tier_for_lifetime(1_000_000), LoyaltyTier::Platinum);
    }

    #[test]
    fn test_tier_monotonic() {
        let mut last = LoyaltyTier::Bronze;
        for points in (0..30_000).step_by(37) {
            let tier = tier_for_lifetime(points);
            assert!(tier >= last, "tier regressed at {} points", points);
            last = tier;
        }
    }

    #[test]
    fn test_points_to_next_tier() {
        assert_eq!(points_to_next_tier(0), Some(1_000));
        assert_eq!(points_to_next_tier(4_200), Some(800));
        assert_eq!(points_to_next_tier(20_000), None);
    }

    #[test]
    fn test_accrual_floors_subtotal() {
        assert_eq!(accrual_for_subtotal(0), 0);
        assert_eq!(accrual_for_subtotal(99), 0);
        assert_eq!(accrual_for_subtotal(100), 1);
        assert_eq!(accrual_for_subtotal(10_099), 100);
        assert_eq!(accrual_for_subtotal(-500), 0);
    }

    #[test]
    fn test_points_conversion() {
        // 100 points per currency unit: 1 point = 1 cent
        assert_eq!(points_to_cents(500, 100), 500);
        // 200 points per unit: 1 point = 0.5 cents, floored
        assert_eq!(points_to_cents(500, 200), 250);
        assert_eq!(points_to_cents(1, 200), 0);
        assert_eq!(points_to_cents(-10, 100), 0);
    }
}
