#![deny(warnings)]

//! Economic models for Startup Tycoon.
//!
//! This crate provides the pure, deterministic pieces of the simulation:
//! - Derived metrics (burn rate, runway, growth, revenue multiple, share)
//! - Consequence resolution for decision options
//! - The per-tick operating period (cash flow, growth and churn)

pub mod consequence;
pub mod metrics;
pub mod operations;

pub use consequence::{acquisition_factor, resolve, ResolveError};
pub use metrics::compute_metrics;
pub use operations::{operating_period, OperatingPeriod};
