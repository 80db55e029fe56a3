//! Invariant checks run before a new state is published.

use crate::business::Business;
use crate::state::{Competitor, GameState};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use thiserror::Error;

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Business name must not be blank.
    #[error("business name must not be empty")]
    EmptyName,
    /// Monetary counter must be non-negative.
    #[error("negative monetary value in {0}")]
    NegativeMoney(&'static str),
    /// Market share must be within [0, 1].
    #[error("market share out of range for {0}")]
    ShareOutOfRange(String),
    /// Product progress must be within [0, 100].
    #[error("product progress {0} exceeds 100")]
    ProgressOutOfRange(u8),
    /// Customers may not exceed the addressable market.
    #[error("customers {customers} exceed addressable market {market}")]
    CustomersExceedMarket {
        /// Customers on record.
        customers: u64,
        /// Addressable market.
        market: u64,
    },
    /// Ledger entries must be in non-decreasing tick order.
    #[error("financial record at tick {0} is out of order")]
    LedgerOutOfOrder(u64),
    /// Ledger tick is ahead of the clock.
    #[error("financial record at tick {record} is ahead of clock tick {clock}")]
    LedgerAheadOfClock {
        /// Tick of the offending record.
        record: u64,
        /// Current clock tick.
        clock: u64,
    },
    /// Decision ids must be unique across pending and resolved.
    #[error("duplicate decision id {0}")]
    DuplicateDecision(u64),
    /// Competitor shares plus the player's share exceed the whole market.
    #[error("combined market share exceeds 1")]
    MarketOverCommitted,
    /// Unrecognized enum identifier.
    #[error("unknown variant: {0}")]
    UnknownVariant(String),
    /// A money counter would exceed the representable range.
    #[error("{0} would overflow")]
    Overflow(&'static str),
}

/// Validate the raw counters of a business.
pub fn validate_business(b: &Business) -> Result<(), ValidationError> {
    if b.name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    for (field, value) in [
        ("cash", b.cash),
        ("revenue", b.revenue),
        ("monthly_expenses", b.monthly_expenses),
        ("valuation", b.valuation),
    ] {
        if value < Decimal::ZERO {
            return Err(ValidationError::NegativeMoney(field));
        }
    }
    if b.product_progress > 100 {
        return Err(ValidationError::ProgressOutOfRange(b.product_progress));
    }
    let market = b.industry.addressable_market();
    if b.customers > market {
        return Err(ValidationError::CustomersExceedMarket {
            customers: b.customers,
            market,
        });
    }
    Ok(())
}

/// Validate competitor shares against the player's share.
pub fn validate_competitors(
    competitors: &[Competitor],
    player_share: Decimal,
) -> Result<(), ValidationError> {
    let mut total = player_share;
    for c in competitors {
        if c.market_share < Decimal::ZERO || c.market_share > Decimal::ONE {
            return Err(ValidationError::ShareOutOfRange(c.name.clone()));
        }
        total += c.market_share;
    }
    if total > Decimal::ONE {
        return Err(ValidationError::MarketOverCommitted);
    }
    Ok(())
}

/// Validate a whole game state, including history ordering.
pub fn validate_state(state: &GameState) -> Result<(), ValidationError> {
    let player_share = match &state.business {
        Some(b) => {
            validate_business(b)?;
            b.market_share()
        }
        None => Decimal::ZERO,
    };
    validate_competitors(&state.competitors, player_share)?;

    let clock_tick = state.clock.tick();
    let mut last = 0u64;
    for r in &state.financials {
        if r.tick < last {
            return Err(ValidationError::LedgerOutOfOrder(r.tick));
        }
        if r.tick > clock_tick {
            return Err(ValidationError::LedgerAheadOfClock {
                record: r.tick,
                clock: clock_tick,
            });
        }
        last = r.tick;
    }

    let mut ids = BTreeSet::new();
    let all = state
        .decisions
        .iter()
        .chain(state.resolved.iter().map(|r| &r.decision));
    for d in all {
        if !ids.insert(d.id) {
            return Err(ValidationError::DuplicateDecision(d.id.0));
        }
    }
    Ok(())
}
