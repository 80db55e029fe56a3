//! Decisions presented to the player and their resolved consequences.

use crate::effects::EffectDelta;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a generated decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DecisionId(pub u64);

impl fmt::Display for DecisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D{}", self.0)
    }
}

/// Identifier of an option within a decision, e.g. "small-campaign".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OptionId(pub String);

impl OptionId {
    /// Convenience constructor.
    pub fn new(id: impl Into<String>) -> OptionId {
        OptionId(id.into())
    }
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Functional area a decision belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionKind {
    /// Customer acquisition.
    Marketing,
    /// Cost and process efficiency.
    Operations,
    /// Hiring and headcount.
    Hr,
    /// Product development.
    Product,
    /// Fundraising.
    Finance,
}

impl DecisionKind {
    /// Every kind.
    pub const ALL: [DecisionKind; 5] = [
        DecisionKind::Marketing,
        DecisionKind::Operations,
        DecisionKind::Hr,
        DecisionKind::Product,
        DecisionKind::Finance,
    ];
}

/// How pressing a decision is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    /// Needs attention now.
    Urgent,
    /// Default.
    Normal,
    /// Can wait.
    Low,
}

/// The mechanical lever an option pulls. Each variant maps to one explicit
/// formula in the consequence resolver.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionImpact {
    /// Spend `cost` to acquire customers at `cac` each.
    Acquisition {
        /// Customer acquisition cost.
        cac: Decimal,
    },
    /// Change headcount; negative for layoffs.
    Hiring {
        /// Employees added (or removed).
        headcount: i64,
        /// Monthly cost per employee.
        monthly_salary: Decimal,
    },
    /// Invest in the product.
    Development {
        /// Progress points gained.
        progress_points: i32,
    },
    /// Cut monthly expenses by a percentage.
    Efficiency {
        /// Percentage of current expenses removed.
        expense_cut_pct: Decimal,
    },
    /// Raise a round.
    Fundraise {
        /// Cash raised.
        amount: Decimal,
        /// Equity sold, in percent.
        dilution_pct: Decimal,
    },
    /// Do nothing.
    Hold,
}

/// One choice within a decision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionOption {
    /// Identifier unique within the decision.
    pub id: OptionId,
    /// Short label.
    pub label: String,
    /// Longer description.
    pub description: String,
    /// Up-front cash cost.
    pub cost: Decimal,
    /// Months until the payoff is expected (narrative only).
    pub timeframe_months: u32,
    /// Expected return on investment in percent (narrative only).
    pub roi_pct: Decimal,
    /// Mechanical effect.
    pub impact: OptionImpact,
}

impl DecisionOption {
    /// Customer acquisition cost, for acquisition options.
    pub fn cac(&self) -> Option<Decimal> {
        match &self.impact {
            OptionImpact::Acquisition { cac } => Some(*cac),
            _ => None,
        }
    }
}

/// A presented choice. Immutable once generated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Identifier.
    pub id: DecisionId,
    /// Functional area.
    pub kind: DecisionKind,
    /// Urgency.
    pub urgency: Urgency,
    /// Headline.
    pub title: String,
    /// Context for the player.
    pub description: String,
    /// Options in presentation order.
    pub options: Vec<DecisionOption>,
    /// Tick at which the decision was generated.
    pub created_tick: u64,
}

impl Decision {
    /// Look up an option by id.
    pub fn option(&self, id: &OptionId) -> Option<&DecisionOption> {
        self.options.iter().find(|o| &o.id == id)
    }
}

/// Result of choosing one option.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionConsequence {
    /// Decision that was resolved.
    pub decision: DecisionId,
    /// Option that was chosen.
    pub option: OptionId,
    /// Effect to apply.
    pub effects: EffectDelta,
    /// Narrative outcome.
    pub description: String,
}

/// History entry for a resolved decision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDecision {
    /// The decision as presented.
    pub decision: Decision,
    /// What came of it.
    pub consequence: DecisionConsequence,
    /// Tick at which it was resolved.
    pub resolved_tick: u64,
}
