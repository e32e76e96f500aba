//! Forward-only cursor over pricing periods
//!
//! A cursor belongs to exactly one report. It only ever moves forward, so
//! instants must be presented in non-decreasing order.

use crate::pricing_table::PricingPeriod;
use chrono::NaiveDateTime;
use tracing::debug;

/// Cursor returning the pricing period active at an instant
///
/// Once the last period has ended its rates keep applying to every later
/// instant; instants before the first period use the first period.
#[derive(Debug)]
pub struct PricingCursor<'a> {
    periods: &'a [PricingPeriod],
    index: usize,
}

impl<'a> PricingCursor<'a> {
    /// Create a cursor at the first period
    ///
    /// `periods` must be non-empty and sorted; [`PricingTable`](crate::PricingTable)
    /// guarantees both.
    pub(crate) fn new(periods: &'a [PricingPeriod]) -> Self {
        Self { periods, index: 0 }
    }

    /// Advance past every period ending at or before `instant` and return the
    /// period under the cursor
    pub fn active_period(&mut self, instant: NaiveDateTime) -> &'a PricingPeriod {
        while self.index + 1 < self.periods.len() && self.periods[self.index].end <= instant {
            self.index += 1;
            debug!(
                "Pricing cursor advanced to period starting {}",
                self.periods[self.index].start
            );
        }
        &self.periods[self.index]
    }
}
