#![deny(warnings)]

//! Mentor advice and option recommendation.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sim_core::{
    AdviceTopic, Business, BusinessMetrics, Competitor, Decision, FundingStage, MentorAdvice,
    OptionId, Urgency,
};
use tracing::debug;

/// Trivial utility: higher is better.
pub fn utility(market_share: f32, margin: f32) -> f32 {
    (market_share * 0.7) + (margin * 0.3)
}

/// Months of runway below which advice turns urgent.
const CRITICAL_RUNWAY_MONTHS: i64 = 3;
/// Months of runway below which runway is flagged at all.
const SHORT_RUNWAY_MONTHS: i64 = 6;
/// Runway the recommender tries to keep.
const SAFE_RUNWAY_MONTHS: f32 = 6.0;

/// Advice for the current state, most pressing first.
pub fn advise(
    business: &Business,
    metrics: &BusinessMetrics,
    competitors: &[Competitor],
) -> Vec<MentorAdvice> {
    let mut advice = Vec::new();

    if let Some(months) = metrics.runway.months() {
        if months < Decimal::from(SHORT_RUNWAY_MONTHS) {
            let priority = if months < Decimal::from(CRITICAL_RUNWAY_MONTHS) {
                Urgency::Urgent
            } else {
                Urgency::Normal
            };
            advice.push(MentorAdvice {
                topic: AdviceTopic::Runway,
                priority,
                message: format!(
                    "You have {} months of runway. Cut costs or raise before it hits zero.",
                    months.round_dp(1)
                ),
            });
        }
    }

    if metrics.burn_rate > business.revenue {
        advice.push(MentorAdvice {
            topic: AdviceTopic::Burn,
            priority: Urgency::Normal,
            message: format!(
                "You burn ${}/month against ${} of monthly revenue.",
                metrics.burn_rate.round_dp(0),
                business.revenue.round_dp(0)
            ),
        });
    }

    if business.product_progress < 50 {
        advice.push(MentorAdvice {
            topic: AdviceTopic::Product,
            priority: Urgency::Low,
            message: format!(
                "The product is {}% complete. Organic growth stays slow until it matures.",
                business.product_progress
            ),
        });
    }

    if business.customers == 0 {
        advice.push(MentorAdvice {
            topic: AdviceTopic::Growth,
            priority: Urgency::Normal,
            message: "No paying customers yet. Put something in front of buyers.".to_string(),
        });
    } else if metrics.mrr_growth < Decimal::ZERO {
        advice.push(MentorAdvice {
            topic: AdviceTopic::Growth,
            priority: Urgency::Normal,
            message: format!(
                "Revenue shrank {}% over the last few periods.",
                (-metrics.mrr_growth).round_dp(1)
            ),
        });
    }

    if let Some(leader) = competitors
        .iter()
        .filter(|c| c.market_share > metrics.market_share * Decimal::TWO)
        .max_by(|a, b| a.market_share.cmp(&b.market_share))
    {
        advice.push(MentorAdvice {
            topic: AdviceTopic::Competition,
            priority: Urgency::Low,
            message: format!(
                "{} holds {}% of the market. Differentiate before competing on price.",
                leader.name,
                (leader.market_share * Decimal::ONE_HUNDRED).round_dp(0)
            ),
        });
    }

    if business.stage < FundingStage::SeriesB
        && business.product_progress >= 50
        && metrics.runway.is_shorter_than(Decimal::from(9))
    {
        advice.push(MentorAdvice {
            topic: AdviceTopic::Fundraising,
            priority: Urgency::Normal,
            message: format!(
                "Your product is far enough along to pitch a {} round.",
                business.stage.next()
            ),
        });
    }

    if advice.is_empty() {
        advice.push(MentorAdvice {
            topic: AdviceTopic::Growth,
            priority: Urgency::Low,
            message: "Steady progress. Keep compounding.".to_string(),
        });
    }

    advice.sort_by_key(|a| a.priority);
    advice
}

/// Score one option by previewing its consequence. Returns `None` when the
/// option does not belong to the decision.
pub fn score_option(decision: &Decision, option: &OptionId, business: &Business) -> Option<f32> {
    let consequence = sim_econ::resolve(decision, option, business).ok()?;
    let mut projected = business.clone();
    projected.apply(&consequence.effects).ok()?;

    let share = projected.market_share().to_f32().unwrap_or(0.0);
    let net = projected.net_monthly();
    let margin = (net / projected.revenue.max(Decimal::ONE))
        .clamp(-Decimal::ONE, Decimal::ONE)
        .to_f32()
        .unwrap_or(0.0);
    let runway = if net < Decimal::ZERO {
        (projected.cash / -net).to_f32().unwrap_or(0.0)
    } else {
        f32::INFINITY
    };
    let penalty = if runway < SAFE_RUNWAY_MONTHS {
        (SAFE_RUNWAY_MONTHS - runway) / SAFE_RUNWAY_MONTHS
    } else {
        0.0
    };
    let progress = f32::from(projected.product_progress) / 1000.0;
    Some(utility(share, margin) + progress - penalty)
}

/// Best option for `decision`; ties go to the earlier option.
pub fn recommend(decision: &Decision, business: &Business) -> Option<OptionId> {
    let mut best: Option<(f32, &OptionId)> = None;
    for option in &decision.options {
        let Some(score) = score_option(decision, &option.id, business) else {
            continue;
        };
        if best.map_or(true, |(s, _)| score > s) {
            best = Some((score, &option.id));
        }
    }
    let chosen = best.map(|(_, id)| id.clone());
    debug!(decision = %decision.id, ?chosen, "recommended option");
    chosen
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use sim_core::{
        BusinessId, DecisionId, DecisionKind, DecisionOption, Industry, MetricsConfig,
        OptionImpact,
    };

    fn business() -> Business {
        Business {
            id: BusinessId("mentee".into()),
            name: "Mentee".into(),
            industry: Industry::Tech,
            stage: FundingStage::Seed,
            cash: Decimal::new(20_000, 0),
            revenue: Decimal::new(2_000, 0),
            monthly_expenses: Decimal::new(12_000, 0),
            customers: 40,
            employees: 2,
            product_progress: 60,
            valuation: Decimal::new(2_000_000, 0),
            founded: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    fn opt(id: &str, cost: i64, impact: OptionImpact) -> DecisionOption {
        DecisionOption {
            id: OptionId::new(id),
            label: id.into(),
            description: String::new(),
            cost: Decimal::new(cost, 0),
            timeframe_months: 0,
            roi_pct: Decimal::ZERO,
            impact,
        }
    }

    #[test]
    fn monotonic_increase() {
        assert!(utility(0.2, 0.1) < utility(0.3, 0.1));
        assert!(utility(0.2, 0.1) < utility(0.2, 0.2));
    }

    #[test]
    fn short_runway_is_urgent_and_first() {
        let b = business();
        let m = sim_econ::compute_metrics(&b, &[], &MetricsConfig::default());
        let advice = advise(&b, &m, &Competitor::roster(b.industry));
        assert_eq!(advice[0].topic, AdviceTopic::Runway);
        assert_eq!(advice[0].priority, Urgency::Urgent);
        assert!(advice.iter().any(|a| a.topic == AdviceTopic::Burn));
        assert!(advice.iter().any(|a| a.topic == AdviceTopic::Competition));
        assert!(advice.iter().any(|a| a.topic == AdviceTopic::Fundraising));
    }

    #[test]
    fn healthy_business_gets_encouragement() {
        let mut b = business();
        b.revenue = Decimal::new(30_000, 0);
        b.customers = 600;
        b.product_progress = 90;
        b.stage = FundingStage::SeriesB;
        let m = sim_econ::compute_metrics(&b, &[], &MetricsConfig::default());
        let advice = advise(&b, &m, &[]);
        assert_eq!(advice.len(), 1);
        assert_eq!(advice[0].topic, AdviceTopic::Growth);
    }

    #[test]
    fn recommends_raising_when_runway_is_short() {
        let d = Decision {
            id: DecisionId(7),
            kind: DecisionKind::Finance,
            urgency: Urgency::Urgent,
            title: "Investor interest".into(),
            description: String::new(),
            options: vec![
                opt("decline", 0, OptionImpact::Hold),
                opt(
                    "raise",
                    10_000,
                    OptionImpact::Fundraise {
                        amount: Decimal::new(1_000_000, 0),
                        dilution_pct: Decimal::new(20, 0),
                    },
                ),
            ],
            created_tick: 0,
        };
        assert_eq!(recommend(&d, &business()), Some(OptionId::new("raise")));
        assert_eq!(score_option(&d, &OptionId::new("missing"), &business()), None);
    }

    #[test]
    fn empty_decision_has_no_recommendation() {
        let d = Decision {
            id: DecisionId(1),
            kind: DecisionKind::Product,
            urgency: Urgency::Low,
            title: "Nothing".into(),
            description: String::new(),
            options: vec![],
            created_tick: 0,
        };
        assert_eq!(recommend(&d, &business()), None);
    }

    fn menu(cost: i64, cac: i64, points: i32) -> Decision {
        Decision {
            id: DecisionId(3),
            kind: DecisionKind::Marketing,
            urgency: Urgency::Normal,
            title: "Next quarter".into(),
            description: String::new(),
            options: vec![
                opt("ads", cost, OptionImpact::Acquisition { cac: Decimal::new(cac, 0) }),
                opt(
                    "hire",
                    cost,
                    OptionImpact::Hiring {
                        headcount: 2,
                        monthly_salary: Decimal::new(6_000, 0),
                    },
                ),
                opt("build", cost, OptionImpact::Development { progress_points: points }),
                opt(
                    "lean",
                    0,
                    OptionImpact::Efficiency {
                        expense_cut_pct: Decimal::new(15, 0),
                    },
                ),
                opt("wait", 0, OptionImpact::Hold),
            ],
            created_tick: 0,
        }
    }

    proptest! {
        #[test]
        fn recommendation_is_one_of_the_options(
            cash in 0i64..200_000,
            customers in 0u64..5_000,
            cost in 0i64..50_000,
            cac in 1i64..500,
            points in 0i32..40,
        ) {
            let mut b = business();
            b.cash = Decimal::new(cash, 0);
            b.customers = customers;
            let d = menu(cost, cac, points);
            let chosen = recommend(&d, &b);
            prop_assert!(chosen.is_some());
            let chosen = chosen.unwrap();
            prop_assert!(d.options.iter().any(|o| o.id == chosen));
            prop_assert_eq!(recommend(&d, &b), Some(chosen));
        }

        #[test]
        fn scoring_is_deterministic(
            cash in 0i64..200_000,
            cost in 0i64..50_000,
            pick in 0usize..5,
        ) {
            let mut b = business();
            b.cash = Decimal::new(cash, 0);
            let d = menu(cost, 50, 10);
            let id = d.options[pick].id.clone();
            let first = score_option(&d, &id, &b).map(f32::to_bits);
            prop_assert!(first.is_some());
            prop_assert_eq!(first, score_option(&d, &id, &b).map(f32::to_bits));
        }
    }
}
