//! Cost calculator module for computing usage costs
//!
//! Costs are rounded to four decimal places every time usage is added, not
//! once over a final total. Summing rounded increments differs from rounding
//! the sum, and reports must reproduce the former.
//!
//! Rounding works on the exact decimal expansion of the `f64` product and
//! sends exact ties to the even digit. `0.00035` is stored just below the tie
//! and rounds down; `0.03125` is an exact tie and rounds to `0.0312`.
//!
//! # Examples
//!
//! ```
//! use billstat_pricing::CostCalculator;
//!
//! let increment = CostCalculator::calculate(1.0, 0.12345);
//! assert_eq!(increment, 0.1235);
//!
//! let mut total = 0.0;
//! for _ in 0..3 {
//!     total += CostCalculator::calculate(1.0, 0.12345);
//! }
//! assert!((total - 0.3705).abs() < 1e-9);
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::trace;

/// Number of decimal places costs are rounded to
pub const COST_DECIMAL_PLACES: u32 = 4;

/// Calculates rounded cost increments
pub struct CostCalculator;

impl CostCalculator {
    /// Cost of `quantity` units at `rate`, rounded to four decimal places
    pub fn calculate(quantity: f64, rate: f64) -> f64 {
        let cost = Self::round(quantity * rate);
        trace!("Calculated cost {} for {} units at {}", cost, quantity, rate);
        cost
    }

    /// Round to four decimal places, ties to even
    ///
    /// Values a `Decimal` cannot hold are returned unchanged: non-finite
    /// values, and values too large to carry a fractional part.
    pub fn round(value: f64) -> f64 {
        Decimal::from_f64_retain(value)
            .map(|exact| {
                exact.round_dp_with_strategy(
                    COST_DECIMAL_PLACES,
                    RoundingStrategy::MidpointNearestEven,
                )
            })
            // Parsing the decimal text yields the nearest f64
            .and_then(|rounded| rounded.to_string().parse::<f64>().ok())
            .unwrap_or(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounding() {
        assert_eq!(CostCalculator::round(0.12345), 0.1235);
        assert_eq!(CostCalculator::round(0.12344), 0.1234);
        assert_eq!(CostCalculator::round(0.1), 0.1);
        assert_eq!(CostCalculator::round(0.0), 0.0);
    }

    #[test]
    fn test_values_stored_below_the_tie_round_down() {
        // 0.00035 is 0.000349999999999999996... in binary
        assert_eq!(CostCalculator::calculate(1.0, 0.00035), 0.0003);
        assert_eq!(CostCalculator::calculate(1.0, 0.00045), 0.0004);
        assert_eq!(CostCalculator::calculate(5.0, 0.00007), 0.0003);
        assert_eq!(CostCalculator::calculate(7.0, 0.00015), 0.001);
    }

    #[test]
    fn test_exact_ties_round_to_even() {
        assert_eq!(CostCalculator::calculate(1.0, 0.03125), 0.0312);
        assert_eq!(CostCalculator::calculate(1.0, 0.09375), 0.0938);
        assert_eq!(CostCalculator::calculate(1.0, 0.5), 0.5);
    }

    #[test]
    fn test_values_stored_above_the_tie_round_up() {
        assert_eq!(CostCalculator::calculate(1.0, 0.12345), 0.1235);
        assert_eq!(CostCalculator::calculate(1.0, 0.00005), 0.0001);
        assert_eq!(CostCalculator::calculate(2.0, 0.00625), 0.0125);
    }

    #[test]
    fn test_incremental_rounding_differs_from_rounding_once() {
        let incremental: f64 = (0..3).map(|_| CostCalculator::calculate(1.0, 0.12345)).sum();
        let once = CostCalculator::round(3.0 * 0.12345);

        assert!((incremental - 0.3705).abs() < 1e-9);
        assert!((once - 0.3704).abs() < 1e-9);
    }

    #[test]
    fn test_image_cost() {
        let cost = CostCalculator::calculate(5.0, 0.02);
        assert!((cost - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_rounded_costs_are_the_nearest_f64() {
        assert_eq!(CostCalculator::round(12.34561), 12.3456);
        assert_eq!(CostCalculator::round(1234.56789), 1234.5679);
    }

    #[test]
    fn test_zero_quantity() {
        assert_eq!(CostCalculator::calculate(0.0, 0.5), 0.0);
    }

    #[test]
    fn test_large_quantities() {
        // 10,000 core hours at 0.03 = 300
        let cost = CostCalculator::calculate(10_000.0, 0.03);
        assert!((cost - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_precision_edge_cases() {
        // Tiny amounts round away entirely
        assert_eq!(CostCalculator::calculate(1.0, 0.00004), 0.0);
        assert!(CostCalculator::round(f64::NAN).is_nan());
        assert_eq!(CostCalculator::round(1e30), 1e30);
    }
}
