//! Append-only financial ledger.

use crate::business::Business;
use crate::decision::{DecisionId, OptionId};
use crate::event::{EventId, EventKind};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What caused a ledger entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordSource {
    /// Initial capitalization.
    Setup,
    /// A resolved decision.
    Decision {
        /// Decision id.
        decision: DecisionId,
        /// Chosen option.
        option: OptionId,
    },
    /// An applied event.
    Event {
        /// Event id.
        event: EventId,
        /// Event class.
        kind: EventKind,
    },
    /// Revenue and expenses booked for an elapsed period.
    Operations,
}

/// Point-in-time ledger entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialRecord {
    /// Tick at which the entry was booked.
    pub tick: u64,
    /// Simulated date.
    pub date: NaiveDate,
    /// Cause.
    pub source: RecordSource,
    /// Cash before the change.
    pub cash_before: Decimal,
    /// Cash after the change.
    pub cash_after: Decimal,
    /// Monthly revenue before the change.
    pub revenue_before: Decimal,
    /// Monthly revenue after the change.
    pub revenue_after: Decimal,
    /// Income booked in the period (operations only).
    pub income: Decimal,
    /// Expenses booked in the period (operations only).
    pub expenses: Decimal,
    /// Simulated days covered (operations only).
    pub period_days: u32,
}

impl FinancialRecord {
    /// Entry for a one-off change such as a decision or event.
    pub fn adjustment(
        tick: u64,
        date: NaiveDate,
        source: RecordSource,
        before: &Business,
        after: &Business,
    ) -> FinancialRecord {
        FinancialRecord {
            tick,
            date,
            source,
            cash_before: before.cash,
            cash_after: after.cash,
            revenue_before: before.revenue,
            revenue_after: after.revenue,
            income: Decimal::ZERO,
            expenses: Decimal::ZERO,
            period_days: 0,
        }
    }

    /// Entry for an operating period.
    pub fn operating(
        tick: u64,
        date: NaiveDate,
        period_days: u32,
        income: Decimal,
        expenses: Decimal,
        before: &Business,
        after: &Business,
    ) -> FinancialRecord {
        FinancialRecord {
            income,
            expenses,
            period_days,
            ..FinancialRecord::adjustment(tick, date, RecordSource::Operations, before, after)
        }
    }

    /// Entry for the initial capitalization of a new business.
    pub fn setup(date: NaiveDate, business: &Business) -> FinancialRecord {
        FinancialRecord {
            tick: 0,
            date,
            source: RecordSource::Setup,
            cash_before: Decimal::ZERO,
            cash_after: business.cash,
            revenue_before: Decimal::ZERO,
            revenue_after: business.revenue,
            income: Decimal::ZERO,
            expenses: Decimal::ZERO,
            period_days: 0,
        }
    }

    /// Cash change.
    pub fn cash_delta(&self) -> Decimal {
        self.cash_after - self.cash_before
    }

    /// Revenue change.
    pub fn revenue_delta(&self) -> Decimal {
        self.revenue_after - self.revenue_before
    }

    /// Whether this entry books an operating period.
    pub fn is_operating(&self) -> bool {
        matches!(self.source, RecordSource::Operations)
    }
}
