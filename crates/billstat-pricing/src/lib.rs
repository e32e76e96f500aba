//! Pricing periods and cost calculation for billstat
//!
//! This crate loads the pricing-period table (embedded default or a JSON
//! file), walks it with a forward-only cursor, and rounds per-increment costs.

pub mod cost_calculator;
pub mod pricing_table;
pub mod resolver;

pub use cost_calculator::CostCalculator;
pub use pricing_table::{PricingLoader, PricingPeriod, PricingSource, PricingTable};
pub use resolver::PricingCursor;
