//! Exogenous events: market swings, competitor moves, internal news, crises.

use crate::effects::EffectDelta;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::validate::ValidationError;

/// Identifier of an occurred event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// Event class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Broad market movement.
    Market,
    /// Something inside the company.
    Internal,
    /// A competitor acted.
    Competitor,
    /// Acute threat to the business.
    Crisis,
}

impl EventKind {
    /// Every class, in evaluation order.
    pub const ALL: [EventKind; 4] = [
        EventKind::Market,
        EventKind::Internal,
        EventKind::Competitor,
        EventKind::Crisis,
    ];

    /// Lowercase identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Market => "market",
            EventKind::Internal => "internal",
            EventKind::Competitor => "competitor",
            EventKind::Crisis => "crisis",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::UnknownVariant(s.to_string()))
    }
}

/// Market-share shift for a named competitor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitorMove {
    /// Competitor name.
    pub competitor: String,
    /// Change in the competitor's share of the market.
    pub share_delta: Decimal,
}

/// An event that happened. Immutable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Identifier.
    pub id: EventId,
    /// Class.
    pub kind: EventKind,
    /// Headline.
    pub title: String,
    /// Narrative.
    pub description: String,
    /// Effect on the business.
    pub effects: EffectDelta,
    /// Effect on a competitor, if any.
    pub competitor: Option<CompetitorMove>,
    /// Tick of occurrence.
    pub tick: u64,
    /// Simulated date of occurrence.
    pub date: NaiveDate,
}

/// An event authored ahead of time that fires on a given tick.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    /// Tick on which the event fires.
    pub at_tick: u64,
    /// Class.
    pub kind: EventKind,
    /// Headline.
    pub title: String,
    /// Narrative.
    pub description: String,
    /// Effect on the business, before bounding.
    pub effects: EffectDelta,
}
