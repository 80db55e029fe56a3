//! Derived metrics calculator.
//!
//! A pure function of the business and its ledger. "Now" is the tick of the
//! latest ledger entry, so the result never depends on anything outside the
//! two inputs.
//!
//! - burn rate: over `Operations` entries in the trailing window,
//!   `max(0, Σexpenses - Σincome) * 30 / Σdays`; without such entries,
//!   `max(0, monthly_expenses - revenue)`.
//! - runway: `cash / burn` months, [`Runway::Infinite`] when burn is zero.
//! - MRR growth: percent change from the revenue at the start of the window.
//! - revenue multiple: `valuation / max(revenue * 12, 1)` (annual run-rate).
//! - market share: `customers / addressable_market`, clamped to [0, 1].

use rust_decimal::Decimal;
use sim_core::{Business, BusinessMetrics, FinancialRecord, MetricsConfig, Runway};

const DAYS_PER_MONTH: i64 = 30;
const MONTHS_PER_YEAR: i64 = 12;

/// Recompute every metric for `business` from its ledger.
pub fn compute_metrics(
    business: &Business,
    records: &[FinancialRecord],
    cfg: &MetricsConfig,
) -> BusinessMetrics {
    let window = trailing_window(records, cfg.trailing_window_ticks);
    let burn_rate = burn_rate(business, window);
    BusinessMetrics {
        cash: business.cash,
        revenue: business.revenue,
        valuation: business.valuation,
        burn_rate,
        runway: runway(business.cash, burn_rate),
        mrr_growth: mrr_growth(business.revenue, window),
        customers: business.customers,
        revenue_multiple: revenue_multiple(business.valuation, business.revenue),
        market_share: business.market_share(),
    }
}

/// Entries whose tick falls within the last `ticks` ticks of the ledger.
pub fn trailing_window(records: &[FinancialRecord], ticks: u64) -> &[FinancialRecord] {
    let Some(last) = records.last() else {
        return records;
    };
    let start = records
        .iter()
        .position(|r| r.tick.saturating_add(ticks) > last.tick)
        .unwrap_or(records.len());
    &records[start..]
}

/// Net monthly cash outflow, never negative.
pub fn burn_rate(business: &Business, window: &[FinancialRecord]) -> Decimal {
    let mut income = Decimal::ZERO;
    let mut expenses = Decimal::ZERO;
    let mut days: u32 = 0;
    for r in window.iter().filter(|r| r.is_operating()) {
        income += r.income;
        expenses += r.expenses;
        days = days.saturating_add(r.period_days);
    }
    let monthly = if days == 0 {
        business.monthly_expenses - business.revenue
    } else {
        (expenses - income) * Decimal::from(DAYS_PER_MONTH) / Decimal::from(days)
    };
    monthly.max(Decimal::ZERO).round_dp(2)
}

/// Months of cash left at `burn_rate`.
pub fn runway(cash: Decimal, burn_rate: Decimal) -> Runway {
    if burn_rate > Decimal::ZERO {
        Runway::Months((cash / burn_rate).round_dp(1))
    } else {
        Runway::Infinite
    }
}

/// Revenue change in percent since the start of the window; 0 without a baseline.
pub fn mrr_growth(revenue: Decimal, window: &[FinancialRecord]) -> Decimal {
    let Some(first) = window.first() else {
        return Decimal::ZERO;
    };
    let baseline = first.revenue_before;
    if baseline.is_zero() {
        return Decimal::ZERO;
    }
    ((revenue - baseline) / baseline * Decimal::ONE_HUNDRED).round_dp(2)
}

/// Valuation over annual run-rate revenue, with a floor of 1 on the divisor.
pub fn revenue_multiple(valuation: Decimal, revenue: Decimal) -> Decimal {
    let arr = revenue
        .checked_mul(Decimal::from(MONTHS_PER_YEAR))
        .unwrap_or(Decimal::MAX)
        .max(Decimal::ONE);
    (valuation / arr).round_dp(2)
}
