#![deny(warnings)]

//! Core domain models and invariants for Startup Tycoon.
//!
//! This crate defines the serializable types shared across the simulation
//! (business, decisions, events, ledger, clock, game state) with validation
//! helpers that guarantee basic invariants.

pub mod business;
pub mod config;
pub mod decision;
pub mod effects;
pub mod event;
pub mod ledger;
pub mod metrics;
pub mod rng;
pub mod state;
pub mod time;
pub mod validate;

pub use business::{AppliedDelta, Business, BusinessId, BusinessSetup, FundingStage, Industry};
pub use config::{
    fraction, DecisionConfig, EventConfig, MetricsConfig, OperationsConfig, SimConfig,
};
pub use decision::{
    Decision, DecisionConsequence, DecisionId, DecisionKind, DecisionOption, OptionId,
    OptionImpact, ResolvedDecision, Urgency,
};
pub use effects::{EffectDelta, EffectKey, UnknownEffectKey};
pub use event::{CompetitorMove, Event, EventId, EventKind, ScheduledEvent};
pub use ledger::{FinancialRecord, RecordSource};
pub use metrics::{BusinessMetrics, Runway};
pub use rng::SimRng;
pub use state::{AdviceTopic, Competitor, GameState, MentorAdvice, UiFlags};
pub use time::{ClockError, ClockState, ClockTick, SimulationClock, Speed, TimeControls};
pub use validate::{validate_business, validate_competitors, validate_state, ValidationError};
