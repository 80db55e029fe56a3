//! YAML loader for [`SimConfig`].

use sim_core::SimConfig;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid YAML for [`SimConfig`].
    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
    /// A value parsed but is out of range.
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Read and validate a YAML configuration file.
pub fn load_config(path: impl AsRef<Path>) -> Result<SimConfig, ConfigError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&text)
}

/// Parse YAML text. Missing keys take their defaults; an empty document
/// yields [`SimConfig::default`].
pub fn parse_config(text: &str) -> Result<SimConfig, ConfigError> {
    if text.trim().is_empty() {
        return Ok(SimConfig::default());
    }
    let cfg: SimConfig = serde_yaml::from_str(text)?;
    check(&cfg)?;
    Ok(cfg)
}

fn check(cfg: &SimConfig) -> Result<(), ConfigError> {
    let positive = [
        ("tick_days", u64::from(cfg.tick_days)),
        ("fast_multiplier", u64::from(cfg.fast_multiplier)),
        ("tick_interval_ms", cfg.tick_interval_ms),
        ("decisions.interval_ticks", cfg.decisions.interval_ticks),
        ("metrics.trailing_window_ticks", cfg.metrics.trailing_window_ticks),
    ];
    for (name, value) in positive {
        if value == 0 {
            return Err(ConfigError::Invalid(format!("{name} must be at least 1")));
        }
    }
    let ev = &cfg.events;
    let rates = [
        ("events.market_rate", ev.market_rate),
        ("events.internal_rate", ev.internal_rate),
        ("events.competitor_base_rate", ev.competitor_base_rate),
        ("events.crisis_base_rate", ev.crisis_base_rate),
        ("events.max_probability", ev.max_probability),
        ("events.crisis_max_cash_loss", ev.crisis_max_cash_loss),
        ("events.max_event_cash_fraction", ev.max_event_cash_fraction),
        ("events.max_revenue_fraction", ev.max_revenue_fraction),
        ("events.max_customer_fraction", ev.max_customer_fraction),
        ("operations.organic_growth_monthly", cfg.operations.organic_growth_monthly),
        ("operations.churn_monthly", cfg.operations.churn_monthly),
    ];
    for (name, value) in rates {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::Invalid(format!("{name} must be within [0, 1]")));
        }
    }
    for (name, value) in [
        ("events.competitor_growth_weight", ev.competitor_growth_weight),
        ("events.crisis_distress_weight", ev.crisis_distress_weight),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigError::Invalid(format!("{name} must be non-negative")));
        }
    }
    Ok(())
}
