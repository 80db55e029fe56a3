//! Derived business metrics. Never mutated directly.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Months of runway, or no burn at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Runway {
    /// Months until cash runs out at the current burn rate.
    Months(Decimal),
    /// The business is not burning cash.
    Infinite,
}

impl Runway {
    /// Month count, if finite.
    pub fn months(&self) -> Option<Decimal> {
        match self {
            Runway::Months(m) => Some(*m),
            Runway::Infinite => None,
        }
    }

    /// True when finite and below `months`.
    pub fn is_shorter_than(&self, months: Decimal) -> bool {
        self.months().is_some_and(|m| m < months)
    }
}

/// Aggregate metrics recomputed after every mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessMetrics {
    /// Cash on hand.
    pub cash: Decimal,
    /// Monthly recurring revenue.
    pub revenue: Decimal,
    /// Latest valuation.
    pub valuation: Decimal,
    /// Net monthly cash outflow, >= 0.
    pub burn_rate: Decimal,
    /// Runway at the current burn.
    pub runway: Runway,
    /// Revenue growth over the trailing window, in percent.
    pub mrr_growth: Decimal,
    /// Paying customers.
    pub customers: u64,
    /// Valuation over annual run-rate revenue.
    pub revenue_multiple: Decimal,
    /// Share of the addressable market in [0, 1].
    pub market_share: Decimal,
}
