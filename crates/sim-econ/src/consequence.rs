//! Consequence resolver: turns a chosen option into an effect delta.
//!
//! Deterministic and side-effect free. ROI and timeframe only feed the
//! narrative; every number comes from the option's cost and impact combined
//! with the current business.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sim_core::{
    Business, Decision, DecisionConsequence, DecisionId, DecisionOption, EffectDelta, OptionId,
    OptionImpact,
};
use thiserror::Error;
use tracing::debug;

/// Errors produced while resolving a decision.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The option id is not among the decision's options.
    #[error("option {option} does not exist in decision {decision}")]
    InvalidOption {
        /// Decision being resolved.
        decision: DecisionId,
        /// Requested option.
        option: OptionId,
    },
}

/// Share above which acquisition starts to saturate.
const SATURATION_KNEE: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

/// Resolve `option` of `decision` against the current business.
pub fn resolve(
    decision: &Decision,
    option: &OptionId,
    business: &Business,
) -> Result<DecisionConsequence, ResolveError> {
    let chosen = decision
        .option(option)
        .ok_or_else(|| ResolveError::InvalidOption {
            decision: decision.id,
            option: option.clone(),
        })?;
    let (effects, outcome) = option_effects(chosen, business);
    debug!(decision = %decision.id, option = %option, ?effects, "resolved decision");
    Ok(DecisionConsequence {
        decision: decision.id,
        option: option.clone(),
        effects,
        description: describe(chosen, &outcome),
    })
}

/// Acquisition multiplier: 1 up to the knee, then falling linearly to 0 at full share.
pub fn acquisition_factor(share: Decimal) -> Decimal {
    if share <= SATURATION_KNEE {
        Decimal::ONE
    } else {
        ((Decimal::ONE - share) / (Decimal::ONE - SATURATION_KNEE)).max(Decimal::ZERO)
    }
}

/// Part of `cost` the business can pay from cash, and that part as a ratio of `cost`.
fn funding(cost: Decimal, cash: Decimal) -> (Decimal, Decimal) {
    if cost <= Decimal::ZERO {
        return (Decimal::ZERO, Decimal::ONE);
    }
    let paid = cost.min(cash.max(Decimal::ZERO));
    (paid, paid / cost)
}

fn scale_count(count: i64, ratio: Decimal) -> i64 {
    (Decimal::from(count) * ratio).trunc().to_i64().unwrap_or(0)
}

fn option_effects(option: &DecisionOption, business: &Business) -> (EffectDelta, String) {
    if let OptionImpact::Fundraise { .. } | OptionImpact::Hold = option.impact {
        return impact_effects(option, business, option.cost, Decimal::ONE);
    }
    // Spend-driven options only deliver what the cash on hand pays for.
    let (paid, ratio) = funding(option.cost, business.cash);
    let (effects, outcome) = impact_effects(option, business, paid, ratio);
    if ratio < Decimal::ONE {
        let outcome = format!(
            "{} (only {} of {} could be funded)",
            outcome,
            usd(paid),
            usd(option.cost)
        );
        return (effects, outcome);
    }
    (effects, outcome)
}

fn impact_effects(
    option: &DecisionOption,
    business: &Business,
    paid: Decimal,
    ratio: Decimal,
) -> (EffectDelta, String) {
    let spend = EffectDelta {
        cash: -paid,
        ..EffectDelta::default()
    };
    match &option.impact {
        OptionImpact::Acquisition { cac } => {
            let raw = if *cac > Decimal::ZERO {
                (paid / *cac).floor()
            } else {
                Decimal::ZERO
            };
            let room = business
                .industry
                .addressable_market()
                .saturating_sub(business.customers);
            let gained = (raw * acquisition_factor(business.market_share()))
                .floor()
                .min(Decimal::from(room));
            let revenue = (gained * business.arpu()).round_dp(2);
            let mut effects = EffectDelta {
                revenue,
                ..spend
            };
            effects.set(sim_core::EffectKey::Customers, gained);
            let outcome = format!(
                "spent {} to win {} customers (+{} MRR)",
                usd(paid),
                effects.customers,
                usd(revenue)
            );
            (effects, outcome)
        }
        OptionImpact::Hiring {
            headcount,
            monthly_salary,
        } => {
            let headcount = scale_count(*headcount, ratio);
            // Layoffs cannot remove more people than are on payroll.
            let effective = if headcount < 0 {
                -(headcount.unsigned_abs().min(u64::from(business.employees)) as i64)
            } else {
                headcount
            };
            let payroll = *monthly_salary * Decimal::from(effective);
            let effects = EffectDelta {
                employees: effective,
                expenses: payroll,
                product_progress: (effective.max(0).min(50) * 2) as i32,
                ..spend
            };
            let outcome = if effective >= 0 {
                format!("added {} people (+{} monthly payroll)", effective, usd(payroll))
            } else {
                format!(
                    "let {} people go ({} monthly payroll)",
                    -effective,
                    usd(payroll)
                )
            };
            (effects, outcome)
        }
        OptionImpact::Development { progress_points } => {
            let room = 100 - i32::from(business.product_progress);
            let funded = scale_count(i64::from(*progress_points), ratio);
            let points = (funded.clamp(0, i64::from(room.max(0)))) as i32;
            let valuation =
                (business.valuation * Decimal::from(points) / Decimal::from(200)).round_dp(0);
            let effects = EffectDelta {
                product_progress: points,
                valuation,
                ..spend
            };
            let outcome = format!(
                "product progress +{} points, valuation +{}",
                points,
                usd(valuation)
            );
            (effects, outcome)
        }
        OptionImpact::Efficiency { expense_cut_pct } => {
            let pct = (*expense_cut_pct).clamp(Decimal::ZERO, Decimal::ONE_HUNDRED) * ratio;
            let cut = (business.monthly_expenses * pct / Decimal::ONE_HUNDRED).round_dp(2);
            let effects = EffectDelta {
                expenses: -cut,
                ..spend
            };
            let outcome = format!("monthly expenses down {}", usd(cut));
            (effects, outcome)
        }
        OptionImpact::Fundraise {
            amount,
            dilution_pct,
        } => {
            let valuation = if *dilution_pct > Decimal::ZERO {
                let post_money = (*amount * Decimal::ONE_HUNDRED / *dilution_pct).round_dp(0);
                post_money - business.valuation
            } else {
                Decimal::ZERO
            };
            let effects = EffectDelta {
                cash: *amount - paid,
                valuation,
                advance_stage: true,
                ..EffectDelta::default()
            };
            let outcome = format!(
                "raised {} for {}% of the company",
                usd(*amount),
                dilution_pct.round_dp(1)
            );
            (effects, outcome)
        }
        OptionImpact::Hold => (EffectDelta::default(), "kept the course".to_string()),
    }
}

fn describe(option: &DecisionOption, outcome: &str) -> String {
    if option.timeframe_months == 0 {
        format!("{}: {}.", option.label, outcome)
    } else {
        format!(
            "{}: {}. Expected ROI {}% over {} months.",
            option.label,
            outcome,
            option.roi_pct.round_dp(0),
            option.timeframe_months
        )
    }
}

fn usd(amount: Decimal) -> String {
    let rounded = amount.round_dp(0);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-${}", rounded.abs())
    } else {
        format!("${}", rounded.abs())
    }
}
