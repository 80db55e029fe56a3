//! Effect deltas shared by decision consequences and events.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Signed change to a business, produced by a consequence or an event.
///
/// Every field is a delta; `Business::apply` clamps the result so counters
/// never go below zero.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectDelta {
    /// Change in cash on hand (USD).
    pub cash: Decimal,
    /// Change in monthly recurring revenue (USD/month).
    pub revenue: Decimal,
    /// Change in monthly operating expenses (USD/month).
    pub expenses: Decimal,
    /// Change in paying customers.
    pub customers: i64,
    /// Change in headcount.
    pub employees: i64,
    /// Change in valuation (USD).
    pub valuation: Decimal,
    /// Change in product progress, in percentage points.
    pub product_progress: i32,
    /// Move the business to its next funding stage.
    pub advance_stage: bool,
}

impl EffectDelta {
    /// True when applying the delta would leave a business untouched.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// True when the delta touches cash or revenue and therefore needs a ledger entry.
    pub fn touches_ledger(&self) -> bool {
        !self.cash.is_zero() || !self.revenue.is_zero()
    }

    /// Set a single field from an externally keyed amount.
    ///
    /// Counter fields are truncated toward zero and saturate at their bounds.
    pub fn set(&mut self, key: EffectKey, amount: Decimal) {
        match key {
            EffectKey::Cash => self.cash = amount,
            EffectKey::Revenue => self.revenue = amount,
            EffectKey::Expenses => self.expenses = amount,
            EffectKey::Valuation => self.valuation = amount,
            EffectKey::Customers => self.customers = saturating_i64(amount),
            EffectKey::Employees => self.employees = saturating_i64(amount),
            EffectKey::ProductProgress => {
                self.product_progress = saturating_i64(amount).clamp(-100, 100) as i32
            }
        }
    }

    /// Field-wise sum of two deltas.
    pub fn combine(&self, other: &EffectDelta) -> EffectDelta {
        EffectDelta {
            cash: self.cash + other.cash,
            revenue: self.revenue + other.revenue,
            expenses: self.expenses + other.expenses,
            customers: self.customers.saturating_add(other.customers),
            employees: self.employees.saturating_add(other.employees),
            valuation: self.valuation + other.valuation,
            product_progress: self.product_progress.saturating_add(other.product_progress),
            advance_stage: self.advance_stage || other.advance_stage,
        }
    }
}

fn saturating_i64(amount: Decimal) -> i64 {
    amount.trunc().to_i64().unwrap_or(if amount.is_sign_negative() {
        i64::MIN
    } else {
        i64::MAX
    })
}

/// The bounded set of keys accepted from externally authored effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EffectKey {
    /// `cash`
    Cash,
    /// `revenue`
    Revenue,
    /// `expenses`
    Expenses,
    /// `customers`
    Customers,
    /// `employees`
    Employees,
    /// `valuation`
    Valuation,
    /// `product_progress`
    ProductProgress,
}

impl EffectKey {
    /// All recognized keys.
    pub const ALL: [EffectKey; 7] = [
        EffectKey::Cash,
        EffectKey::Revenue,
        EffectKey::Expenses,
        EffectKey::Customers,
        EffectKey::Employees,
        EffectKey::Valuation,
        EffectKey::ProductProgress,
    ];

    /// Key as written in scripts and YAML.
    pub fn as_str(self) -> &'static str {
        match self {
            EffectKey::Cash => "cash",
            EffectKey::Revenue => "revenue",
            EffectKey::Expenses => "expenses",
            EffectKey::Customers => "customers",
            EffectKey::Employees => "employees",
            EffectKey::Valuation => "valuation",
            EffectKey::ProductProgress => "product_progress",
        }
    }
}

impl fmt::Display for EffectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised for effect keys outside [`EffectKey::ALL`].
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown effect key: {0}")]
pub struct UnknownEffectKey(pub String);

impl FromStr for EffectKey {
    type Err = UnknownEffectKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EffectKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownEffectKey(s.to_string()))
    }
}
