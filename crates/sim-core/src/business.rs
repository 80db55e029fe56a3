//! The player's business: archetype, funding stage and raw counters.

use crate::effects::EffectDelta;
use crate::validate::ValidationError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Business archetype.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Industry {
    /// Software and online services.
    Tech,
    /// Online retail.
    Ecommerce,
    /// Professional services.
    Service,
    /// Physical goods.
    Manufacturing,
}

impl Industry {
    /// Every archetype, in menu order.
    pub const ALL: [Industry; 4] = [
        Industry::Tech,
        Industry::Ecommerce,
        Industry::Service,
        Industry::Manufacturing,
    ];

    /// Total addressable market in customers.
    pub fn addressable_market(self) -> u64 {
        match self {
            Industry::Tech => 10_000,
            Industry::Ecommerce => 50_000,
            Industry::Service => 2_000,
            Industry::Manufacturing => 5_000,
        }
    }

    /// Monthly revenue per customer used before the business has customers.
    pub fn default_arpu(self) -> Decimal {
        match self {
            Industry::Tech => Decimal::new(50, 0),
            Industry::Ecommerce => Decimal::new(30, 0),
            Industry::Service => Decimal::new(200, 0),
            Industry::Manufacturing => Decimal::new(500, 0),
        }
    }

    /// Typical cost to acquire one customer.
    pub fn acquisition_cost(self) -> Decimal {
        match self {
            Industry::Tech => Decimal::new(60, 0),
            Industry::Ecommerce => Decimal::new(25, 0),
            Industry::Service => Decimal::new(400, 0),
            Industry::Manufacturing => Decimal::new(1_500, 0),
        }
    }

    /// Fully loaded monthly cost of one employee.
    pub fn monthly_salary(self) -> Decimal {
        match self {
            Industry::Tech => Decimal::new(9_000, 0),
            Industry::Ecommerce => Decimal::new(5_000, 0),
            Industry::Service => Decimal::new(6_500, 0),
            Industry::Manufacturing => Decimal::new(5_500, 0),
        }
    }

    /// Fixed monthly overhead (rent, tooling, insurance).
    pub fn monthly_overhead(self) -> Decimal {
        match self {
            Industry::Tech => Decimal::new(2_000, 0),
            Industry::Ecommerce => Decimal::new(3_500, 0),
            Industry::Service => Decimal::new(1_000, 0),
            Industry::Manufacturing => Decimal::new(8_000, 0),
        }
    }

    /// Lowercase identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Industry::Tech => "tech",
            Industry::Ecommerce => "ecommerce",
            Industry::Service => "service",
            Industry::Manufacturing => "manufacturing",
        }
    }
}

impl fmt::Display for Industry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Industry {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Industry::ALL
            .into_iter()
            .find(|i| i.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::UnknownVariant(s.to_string()))
    }
}

/// Funding stage, ordered from earliest to latest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FundingStage {
    /// Self-funded.
    Bootstrapped,
    /// Angel round closed.
    Angel,
    /// Seed round closed.
    Seed,
    /// Series A closed.
    SeriesA,
    /// Series B closed.
    SeriesB,
}

impl FundingStage {
    /// Every stage, earliest first.
    pub const ALL: [FundingStage; 5] = [
        FundingStage::Bootstrapped,
        FundingStage::Angel,
        FundingStage::Seed,
        FundingStage::SeriesA,
        FundingStage::SeriesB,
    ];

    /// Following stage; Series B is terminal.
    pub fn next(self) -> FundingStage {
        match self {
            FundingStage::Bootstrapped => FundingStage::Angel,
            FundingStage::Angel => FundingStage::Seed,
            FundingStage::Seed => FundingStage::SeriesA,
            FundingStage::SeriesA | FundingStage::SeriesB => FundingStage::SeriesB,
        }
    }

    /// Cash on hand at setup.
    pub fn starting_cash(self) -> Decimal {
        match self {
            FundingStage::Bootstrapped => Decimal::new(25_000, 0),
            FundingStage::Angel => Decimal::new(150_000, 0),
            FundingStage::Seed => Decimal::new(750_000, 0),
            FundingStage::SeriesA => Decimal::new(4_000_000, 0),
            FundingStage::SeriesB => Decimal::new(15_000_000, 0),
        }
    }

    /// Headcount at setup.
    pub fn starting_employees(self) -> u32 {
        match self {
            FundingStage::Bootstrapped => 1,
            FundingStage::Angel => 3,
            FundingStage::Seed => 8,
            FundingStage::SeriesA => 25,
            FundingStage::SeriesB => 60,
        }
    }

    /// Product progress (percent) at setup.
    pub fn starting_progress(self) -> u8 {
        match self {
            FundingStage::Bootstrapped => 10,
            FundingStage::Angel => 20,
            FundingStage::Seed => 35,
            FundingStage::SeriesA => 60,
            FundingStage::SeriesB => 80,
        }
    }

    /// Share of the addressable market already won at setup, in basis points.
    pub fn starting_share_bps(self) -> u64 {
        match self {
            FundingStage::Bootstrapped => 0,
            FundingStage::Angel => 10,
            FundingStage::Seed => 50,
            FundingStage::SeriesA => 200,
            FundingStage::SeriesB => 600,
        }
    }

    /// Post-money valuation at setup.
    pub fn starting_valuation(self) -> Decimal {
        match self {
            FundingStage::Bootstrapped => Decimal::new(100_000, 0),
            FundingStage::Angel => Decimal::new(1_000_000, 0),
            FundingStage::Seed => Decimal::new(5_000_000, 0),
            FundingStage::SeriesA => Decimal::new(25_000_000, 0),
            FundingStage::SeriesB => Decimal::new(100_000_000, 0),
        }
    }

    /// Size of the round a company at this stage would raise next.
    pub fn next_round_size(self) -> Decimal {
        match self.next() {
            FundingStage::Bootstrapped | FundingStage::Angel => Decimal::new(150_000, 0),
            FundingStage::Seed => Decimal::new(1_000_000, 0),
            FundingStage::SeriesA => Decimal::new(5_000_000, 0),
            FundingStage::SeriesB => Decimal::new(20_000_000, 0),
        }
    }

    /// camelCase identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            FundingStage::Bootstrapped => "bootstrapped",
            FundingStage::Angel => "angel",
            FundingStage::Seed => "seed",
            FundingStage::SeriesA => "seriesA",
            FundingStage::SeriesB => "seriesB",
        }
    }
}

impl fmt::Display for FundingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FundingStage {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FundingStage::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::UnknownVariant(s.to_string()))
    }
}

/// Stable business identifier, derived from the business name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BusinessId(pub String);

impl BusinessId {
    /// Lowercase, dash-separated slug of `name`.
    pub fn from_name(name: &str) -> BusinessId {
        let mut slug = String::with_capacity(name.len());
        for ch in name.trim().chars() {
            if ch.is_ascii_alphanumeric() {
                slug.push(ch.to_ascii_lowercase());
            } else if !slug.ends_with('-') && !slug.is_empty() {
                slug.push('-');
            }
        }
        while slug.ends_with('-') {
            slug.pop();
        }
        if slug.is_empty() {
            slug.push_str("business");
        }
        BusinessId(slug)
    }
}

impl fmt::Display for BusinessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inputs collected by the business-setup flow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BusinessSetup {
    /// Display name.
    pub name: String,
    /// Archetype.
    pub industry: Industry,
    /// Funding stage at founding.
    pub stage: FundingStage,
    /// Overrides the stage's default starting cash.
    pub starting_cash: Option<Decimal>,
}

/// The active business and its raw counters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Business {
    /// Identifier (slug of the name).
    pub id: BusinessId,
    /// Display name.
    pub name: String,
    /// Archetype.
    pub industry: Industry,
    /// Current funding stage.
    pub stage: FundingStage,
    /// Cash on hand (USD, >= 0).
    pub cash: Decimal,
    /// Monthly recurring revenue (USD, >= 0).
    pub revenue: Decimal,
    /// Monthly operating expenses (USD, >= 0).
    pub monthly_expenses: Decimal,
    /// Paying customers, never above the addressable market.
    pub customers: u64,
    /// Headcount.
    pub employees: u32,
    /// Product completeness in percent, 0..=100.
    pub product_progress: u8,
    /// Latest valuation (USD, >= 0).
    pub valuation: Decimal,
    /// Simulated founding date.
    pub founded: NaiveDate,
}

/// Changes that actually landed after clamping.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppliedDelta {
    /// Applied cash change.
    pub cash: Decimal,
    /// Applied revenue change.
    pub revenue: Decimal,
    /// Applied expense change.
    pub expenses: Decimal,
    /// Applied customer change.
    pub customers: i64,
    /// Applied headcount change.
    pub employees: i64,
    /// Applied valuation change.
    pub valuation: Decimal,
    /// Applied progress change.
    pub product_progress: i32,
    /// Whether the stage moved forward.
    pub stage_advanced: bool,
    /// Whether any requested amount was discarded by clamping.
    pub clamped: bool,
}

impl Business {
    /// Build a fresh business from setup inputs.
    pub fn from_setup(setup: &BusinessSetup, founded: NaiveDate) -> Result<Business, ValidationError> {
        let name = setup.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        let cash = setup
            .starting_cash
            .unwrap_or_else(|| setup.stage.starting_cash());
        if cash < Decimal::ZERO {
            return Err(ValidationError::NegativeMoney("cash"));
        }
        let industry = setup.industry;
        let stage = setup.stage;
        let employees = stage.starting_employees();
        let customers = industry.addressable_market() * stage.starting_share_bps() / 10_000;
        let revenue = industry.default_arpu() * Decimal::from(customers);
        let monthly_expenses =
            industry.monthly_salary() * Decimal::from(employees) + industry.monthly_overhead();
        Ok(Business {
            id: BusinessId::from_name(name),
            name: name.to_string(),
            industry,
            stage,
            cash,
            revenue,
            monthly_expenses,
            customers,
            employees,
            product_progress: stage.starting_progress(),
            valuation: stage.starting_valuation(),
            founded,
        })
    }

    /// Monthly revenue per customer, falling back to the industry default.
    pub fn arpu(&self) -> Decimal {
        if self.customers == 0 {
            self.industry.default_arpu()
        } else {
            self.revenue / Decimal::from(self.customers)
        }
    }

    /// Share of the addressable market in [0, 1].
    pub fn market_share(&self) -> Decimal {
        let market = Decimal::from(self.industry.addressable_market());
        (Decimal::from(self.customers) / market).clamp(Decimal::ZERO, Decimal::ONE)
    }

    /// Revenue minus expenses per month; negative while burning cash.
    pub fn net_monthly(&self) -> Decimal {
        self.revenue - self.monthly_expenses
    }

    /// Apply a delta, flooring every counter at zero.
    ///
    /// Amounts that would take a counter below zero (or customers above the
    /// addressable market) are discarded rather than carried forward.
    /// A money counter that would overflow fails the whole apply and leaves
    /// the business untouched.
    pub fn apply(&mut self, delta: &EffectDelta) -> Result<AppliedDelta, ValidationError> {
        let cash = checked_floor(self.cash, delta.cash, "cash")?;
        let revenue = checked_floor(self.revenue, delta.revenue, "revenue")?;
        let expenses = checked_floor(self.monthly_expenses, delta.expenses, "expenses")?;
        let valuation = checked_floor(self.valuation, delta.valuation, "valuation")?;
        let before = self.clone();

        self.cash = cash;
        self.revenue = revenue;
        self.monthly_expenses = expenses;
        self.valuation = valuation;
        self.customers = shift(
            self.customers,
            delta.customers,
            self.industry.addressable_market(),
        );
        self.employees = u32::try_from(shift(
            u64::from(self.employees),
            delta.employees,
            u64::from(u32::MAX),
        ))
        .unwrap_or(u32::MAX);
        let progress = i32::from(self.product_progress).saturating_add(delta.product_progress);
        self.product_progress = progress.clamp(0, 100) as u8;
        let stage_advanced = delta.advance_stage && self.stage != self.stage.next();
        if delta.advance_stage {
            self.stage = self.stage.next();
        }

        let applied = AppliedDelta {
            cash: self.cash - before.cash,
            revenue: self.revenue - before.revenue,
            expenses: self.monthly_expenses - before.monthly_expenses,
            customers: signed_diff(self.customers, before.customers),
            employees: signed_diff(u64::from(self.employees), u64::from(before.employees)),
            valuation: self.valuation - before.valuation,
            product_progress: i32::from(self.product_progress) - i32::from(before.product_progress),
            stage_advanced,
            clamped: false,
        };
        let clamped = applied.cash != delta.cash
            || applied.revenue != delta.revenue
            || applied.expenses != delta.expenses
            || applied.valuation != delta.valuation
            || applied.customers != delta.customers
            || applied.employees != delta.employees
            || applied.product_progress != delta.product_progress;
        if clamped {
            debug!(business = %self.id, ?delta, "effect clamped at counter bounds");
        }
        Ok(AppliedDelta { clamped, ..applied })
    }
}

fn checked_floor(
    current: Decimal,
    delta: Decimal,
    field: &'static str,
) -> Result<Decimal, ValidationError> {
    current
        .checked_add(delta)
        .map(|v| v.max(Decimal::ZERO))
        .ok_or(ValidationError::Overflow(field))
}

fn shift(current: u64, delta: i64, cap: u64) -> u64 {
    if delta >= 0 {
        current.saturating_add(delta.unsigned_abs()).min(cap)
    } else {
        current.saturating_sub(delta.unsigned_abs())
    }
}

fn signed_diff(after: u64, before: u64) -> i64 {
    if after >= before {
        i64::try_from(after - before).unwrap_or(i64::MAX)
    } else {
        i64::try_from(before - after).map(|d| -d).unwrap_or(i64::MIN)
    }
}
