//! Simulation configuration parameters.
//!
//! Every section defaults, so a YAML file only needs the keys it overrides.
//! Rates and fractions are plain `f64`; convert with [`fraction`] before
//! mixing them into money arithmetic.

use chrono::NaiveDate;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Top-level simulation configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Simulated days per tick at normal speed (default: 30 for monthly).
    pub tick_days: u16,
    /// Fast speed covers `tick_days * fast_multiplier` per tick.
    pub fast_multiplier: u16,
    /// Seed for deterministic RNG.
    pub rng_seed: u64,
    /// Simulated founding date.
    pub start_date: NaiveDate,
    /// Wall-clock interval between driver ticks, in milliseconds.
    pub tick_interval_ms: u64,
    /// Metric windows.
    pub metrics: MetricsConfig,
    /// Per-period operating model.
    pub operations: OperationsConfig,
    /// Decision cadence.
    pub decisions: DecisionConfig,
    /// Event probabilities and bounds.
    pub events: EventConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            tick_days: 30,
            fast_multiplier: 3,
            rng_seed: 42,
            start_date: default_start_date(),
            tick_interval_ms: 1_000,
            metrics: MetricsConfig::default(),
            operations: OperationsConfig::default(),
            decisions: DecisionConfig::default(),
            events: EventConfig::default(),
        }
    }
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Metric windows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Ticks included in burn-rate and growth windows.
    pub trailing_window_ticks: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        MetricsConfig {
            trailing_window_ticks: 3,
        }
    }
}

/// Per-period operating model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationsConfig {
    /// Monthly customer growth at 100% product progress.
    pub organic_growth_monthly: f64,
    /// Monthly share of customers lost.
    pub churn_monthly: f64,
}

impl Default for OperationsConfig {
    fn default() -> Self {
        OperationsConfig {
            organic_growth_monthly: 0.03,
            churn_monthly: 0.02,
        }
    }
}

/// Decision cadence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// A new decision is drawn every this many ticks.
    pub interval_ticks: u64,
    /// No new decision while this many are pending.
    pub max_pending: usize,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        DecisionConfig {
            interval_ticks: 2,
            max_pending: 3,
        }
    }
}

/// Event probabilities (per tick) and effect bounds (fractions of current values).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Market event probability.
    pub market_rate: f64,
    /// Internal event probability.
    pub internal_rate: f64,
    /// Competitor event base probability.
    pub competitor_base_rate: f64,
    /// Added competitor probability per unit of market-share growth.
    pub competitor_growth_weight: f64,
    /// Crisis base probability.
    pub crisis_base_rate: f64,
    /// Added crisis probability at full distress (burn far above revenue).
    pub crisis_distress_weight: f64,
    /// Upper bound for any class probability.
    pub max_probability: f64,
    /// Largest share of cash a crisis may remove.
    pub crisis_max_cash_loss: f64,
    /// Largest share of cash any other event may move.
    pub max_event_cash_fraction: f64,
    /// Largest share of revenue an event may move.
    pub max_revenue_fraction: f64,
    /// Largest share of customers an event may move.
    pub max_customer_fraction: f64,
}

impl Default for EventConfig {
    fn default() -> Self {
        EventConfig {
            market_rate: 0.15,
            internal_rate: 0.10,
            competitor_base_rate: 0.05,
            competitor_growth_weight: 5.0,
            crisis_base_rate: 0.02,
            crisis_distress_weight: 0.25,
            max_probability: 0.9,
            crisis_max_cash_loss: 0.20,
            max_event_cash_fraction: 0.10,
            max_revenue_fraction: 0.25,
            max_customer_fraction: 0.25,
        }
    }
}

/// Convert a configured fraction into a decimal clamped to [0, 1].
pub fn fraction(value: f64) -> Decimal {
    if !value.is_finite() {
        return Decimal::ZERO;
    }
    Decimal::from_f64(value.clamp(0.0, 1.0))
        .unwrap_or(Decimal::ZERO)
        .round_dp(6)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_clamps() {
        assert_eq!(fraction(0.2), Decimal::new(2, 1));
        assert_eq!(fraction(3.0), Decimal::ONE);
        assert_eq!(fraction(-1.0), Decimal::ZERO);
        assert_eq!(fraction(f64::NAN), Decimal::ZERO);
    }

    #[test]
    fn defaults_are_monthly() {
        let cfg = SimConfig::default();
        assert_eq!(cfg.tick_days, 30);
        assert_eq!(cfg.events.crisis_max_cash_loss, 0.20);
        assert_eq!(cfg.start_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }
}
