//! Operating-period model: the cash flow and customer drift booked on each tick.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sim_core::{Business, EffectDelta, EffectKey, OperationsConfig};

/// Outcome of one operating period.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperatingPeriod {
    /// Net effect on the business.
    pub effects: EffectDelta,
    /// Revenue collected over the period.
    pub income: Decimal,
    /// Expenses paid over the period.
    pub expenses: Decimal,
    /// Simulated days covered.
    pub days: u32,
}

/// Book `days` of revenue and expenses, plus organic growth and churn.
///
/// Organic growth scales with product progress and shrinks with market
/// share; churn is a flat monthly rate. Both are pro-rated by `days / 30`.
pub fn operating_period(business: &Business, days: u32, cfg: &OperationsConfig) -> OperatingPeriod {
    let scale = Decimal::from(days) / Decimal::from(30);
    let income = pro_rate(business.revenue, scale);
    let expenses = pro_rate(business.monthly_expenses, scale);

    let customers = Decimal::from(business.customers);
    let progress = Decimal::from(business.product_progress) / Decimal::ONE_HUNDRED;
    let growth_rate =
        rate(cfg.organic_growth_monthly) * progress * (Decimal::ONE - business.market_share());
    let room = business
        .industry
        .addressable_market()
        .saturating_sub(business.customers);
    let gained = (customers * growth_rate * scale)
        .floor()
        .min(Decimal::from(room));
    let lost = (customers * rate(cfg.churn_monthly) * scale).floor();
    let net_customers = gained - lost;
    let revenue = (net_customers * business.arpu()).round_dp(2);

    let mut effects = EffectDelta {
        cash: income - expenses,
        revenue,
        ..EffectDelta::default()
    };
    effects.set(EffectKey::Customers, net_customers);
    OperatingPeriod {
        effects,
        income,
        expenses,
        days,
    }
}

fn pro_rate(monthly: Decimal, scale: Decimal) -> Decimal {
    monthly
        .checked_mul(scale)
        .unwrap_or(Decimal::MAX)
        .round_dp(2)
}

fn rate(value: f64) -> Decimal {
    if !value.is_finite() || value <= 0.0 {
        return Decimal::ZERO;
    }
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO).round_dp(6)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sim_core::{BusinessId, FundingStage, Industry};

    fn business() -> Business {
        Business {
            id: BusinessId("ops".into()),
            name: "Ops".into(),
            industry: Industry::Service,
            stage: FundingStage::Angel,
            cash: Decimal::new(50_000, 0),
            revenue: Decimal::new(20_000, 0),
            monthly_expenses: Decimal::new(26_000, 0),
            customers: 100,
            employees: 3,
            product_progress: 50,
            valuation: Decimal::new(1_000_000, 0),
            founded: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[test]
    fn books_a_month_of_cash_flow() {
        let cfg = OperationsConfig {
            organic_growth_monthly: 0.0,
            churn_monthly: 0.0,
        };
        let p = operating_period(&business(), 30, &cfg);
        assert_eq!(p.income, Decimal::new(20_000, 0));
        assert_eq!(p.expenses, Decimal::new(26_000, 0));
        assert_eq!(p.effects.cash, Decimal::new(-6_000, 0));
        assert_eq!(p.effects.customers, 0);
    }

    #[test]
    fn fast_periods_scale_linearly() {
        let cfg = OperationsConfig {
            organic_growth_monthly: 0.0,
            churn_monthly: 0.0,
        };
        let p = operating_period(&business(), 90, &cfg);
        assert_eq!(p.effects.cash, Decimal::new(-18_000, 0));
        assert_eq!(p.days, 90);
    }

    #[test]
    fn churn_removes_customers_and_revenue() {
        let cfg = OperationsConfig {
            organic_growth_monthly: 0.0,
            churn_monthly: 0.1,
        };
        let p = operating_period(&business(), 30, &cfg);
        assert_eq!(p.effects.customers, -10);
        // ARPU 200
        assert_eq!(p.effects.revenue, Decimal::new(-2_000, 0));
    }

    #[test]
    fn growth_follows_product_progress() {
        let cfg = OperationsConfig {
            organic_growth_monthly: 0.2,
            churn_monthly: 0.0,
        };
        let mut b = business();
        b.customers = 200; // 10% share
        b.revenue = Decimal::new(40_000, 0);
        let p = operating_period(&b, 30, &cfg);
        // 200 * 0.2 * 0.5 * 0.9 = 18
        assert_eq!(p.effects.customers, 18);
        b.product_progress = 0;
        assert_eq!(operating_period(&b, 30, &cfg).effects.customers, 0);
    }

    #[test]
    fn growth_stops_at_the_market_edge() {
        let cfg = OperationsConfig {
            organic_growth_monthly: 4.0,
            churn_monthly: 0.0,
        };
        let mut b = business();
        b.customers = 1_500; // 75% of a 2_000 market
        b.revenue = Decimal::new(300_000, 0);
        b.product_progress = 100;
        let p = operating_period(&b, 90, &cfg);
        assert_eq!(p.effects.customers, 500);
        assert_eq!(p.effects.revenue, Decimal::new(100_000, 0));

        b.apply(&p.effects).unwrap();
        assert_eq!(b.customers, 2_000);
        assert_eq!(b.arpu(), Decimal::new(200, 0));
    }
}
