//! Decision deck: draws pending decisions from built-in templates.

use rust_decimal::Decimal;
use sim_core::{
    Business, Decision, DecisionConfig, DecisionId, DecisionKind, DecisionOption, FundingStage,
    OptionId, OptionImpact, Runway, SimRng, Urgency,
};

/// Runway, in months, under which finance decisions turn urgent.
const FINANCE_URGENT_RUNWAY: i64 = 6;
/// Runway, in months, under which operations decisions turn urgent.
const OPERATIONS_URGENT_RUNWAY: i64 = 3;

const PROMPTS: &[(DecisionKind, &str, &str)] = &[
    (
        DecisionKind::Marketing,
        "Growth push",
        "Your board wants faster customer growth.",
    ),
    (
        DecisionKind::Marketing,
        "Launch season",
        "A seasonal buying window is opening.",
    ),
    (
        DecisionKind::Operations,
        "Costs under review",
        "Operating costs keep creeping up.",
    ),
    (
        DecisionKind::Operations,
        "Process bottleneck",
        "Manual work is slowing the team down.",
    ),
    (DecisionKind::Hr, "Team capacity", "The team is stretched thin."),
    (
        DecisionKind::Hr,
        "Hiring plan",
        "Candidates are waiting for an answer.",
    ),
    (
        DecisionKind::Product,
        "Roadmap planning",
        "Next quarter's roadmap needs a direction.",
    ),
    (
        DecisionKind::Product,
        "Customer feedback",
        "Customers are asking for improvements.",
    ),
    (
        DecisionKind::Finance,
        "Investor interest",
        "An investor wants to talk about your next round.",
    ),
    (
        DecisionKind::Finance,
        "Cash planning",
        "Your runway needs attention.",
    ),
];

/// Draws decisions on a fixed cadence.
#[derive(Clone, Debug)]
pub struct DecisionDeck {
    config: DecisionConfig,
}

impl DecisionDeck {
    /// Deck with the given cadence.
    pub fn new(config: DecisionConfig) -> Self {
        DecisionDeck { config }
    }

    /// Whether a decision should be drawn on `tick` with `pending` open.
    pub fn is_due(&self, tick: u64, pending: usize) -> bool {
        self.config.interval_ticks > 0
            && tick % self.config.interval_ticks == 0
            && pending < self.config.max_pending
    }

    /// Draw one decision. Kinds already pending are skipped when possible;
    /// a short runway forces a finance decision.
    pub fn draw(
        &self,
        business: &Business,
        runway: Runway,
        pending: &[Decision],
        id: DecisionId,
        tick: u64,
        rng: &mut SimRng,
    ) -> Decision {
        let open = |k: DecisionKind| pending.iter().all(|d| d.kind != k);
        let short = runway.is_shorter_than(Decimal::from(FINANCE_URGENT_RUNWAY));
        let kind = if short && open(DecisionKind::Finance) {
            DecisionKind::Finance
        } else {
            let free: Vec<DecisionKind> =
                DecisionKind::ALL.into_iter().filter(|k| open(*k)).collect();
            let pool = if free.is_empty() {
                DecisionKind::ALL.to_vec()
            } else {
                free
            };
            pool[rng.index(pool.len())]
        };

        let prompts: Vec<_> = PROMPTS.iter().filter(|(k, _, _)| *k == kind).collect();
        let (_, title, description) = prompts[rng.index(prompts.len())];

        Decision {
            id,
            kind,
            urgency: urgency(kind, business, runway),
            title: (*title).to_string(),
            description: (*description).to_string(),
            options: options(kind, business),
            created_tick: tick,
        }
    }
}

fn urgency(kind: DecisionKind, business: &Business, runway: Runway) -> Urgency {
    match kind {
        DecisionKind::Finance if runway.is_shorter_than(Decimal::from(FINANCE_URGENT_RUNWAY)) => {
            Urgency::Urgent
        }
        DecisionKind::Operations
            if runway.is_shorter_than(Decimal::from(OPERATIONS_URGENT_RUNWAY)) =>
        {
            Urgency::Urgent
        }
        DecisionKind::Product if business.product_progress >= 80 => Urgency::Low,
        _ => Urgency::Normal,
    }
}

/// Options for a decision of `kind`, priced against the business.
pub fn options(kind: DecisionKind, business: &Business) -> Vec<DecisionOption> {
    let salary = business.industry.monthly_salary();
    let cac = business.industry.acquisition_cost();
    match kind {
        DecisionKind::Marketing => vec![
            option(
                "campaign",
                "Run a paid campaign",
                "Buy ads across the channels your customers use.",
                scaled(business, 5, 500),
                3,
                150,
                OptionImpact::Acquisition { cac },
            ),
            option(
                "referral",
                "Launch a referral program",
                "Reward existing customers for bringing in new ones.",
                scaled(business, 2, 200),
                6,
                220,
                OptionImpact::Acquisition {
                    cac: (cac * Decimal::new(6, 1)).round_dp(2),
                },
            ),
            hold("skip", "Hold off", "Keep the marketing budget in the bank."),
        ],
        DecisionKind::Operations => vec![
            option(
                "vendors",
                "Renegotiate vendor contracts",
                "Push suppliers for better terms.",
                scaled(business, 1, 100),
                1,
                300,
                OptionImpact::Efficiency {
                    expense_cut_pct: Decimal::new(8, 0),
                },
            ),
            option(
                "automate",
                "Automate back-office work",
                "Invest in tooling that replaces manual processes.",
                scaled(business, 6, 1_000),
                6,
                180,
                OptionImpact::Efficiency {
                    expense_cut_pct: Decimal::new(20, 0),
                },
            ),
            hold("status_quo", "Keep the current setup", "Change nothing for now."),
        ],
        DecisionKind::Hr => vec![
            option(
                "hire_team",
                "Hire two people",
                "Bring on two full-time hires.",
                salary,
                6,
                120,
                OptionImpact::Hiring {
                    headcount: 2,
                    monthly_salary: salary,
                },
            ),
            option(
                "hire_one",
                "Hire one person",
                "Fill the most urgent role.",
                (salary / Decimal::TWO).round_dp(0),
                4,
                110,
                OptionImpact::Hiring {
                    headcount: 1,
                    monthly_salary: salary,
                },
            ),
            option(
                "downsize",
                "Reduce headcount",
                "Let one person go and pay a month of severance.",
                salary,
                1,
                0,
                OptionImpact::Hiring {
                    headcount: -1,
                    monthly_salary: salary,
                },
            ),
        ],
        DecisionKind::Product => vec![
            option(
                "major_release",
                "Ship a major feature",
                "Commit the team to a large release.",
                scaled(business, 8, 2_000),
                6,
                200,
                OptionImpact::Development {
                    progress_points: 15,
                },
            ),
            option(
                "polish",
                "Polish the core experience",
                "Fix rough edges customers complain about.",
                scaled(business, 3, 500),
                2,
                140,
                OptionImpact::Development { progress_points: 6 },
            ),
            hold("freeze", "Freeze the roadmap", "Ship nothing new this cycle."),
        ],
        DecisionKind::Finance => {
            let round = business.stage.next_round_size();
            let small = (round / Decimal::TWO).round_dp(0);
            let label = if business.stage == FundingStage::SeriesB {
                "Raise growth capital".to_string()
            } else {
                format!("Raise a {} round", business.stage.next())
            };
            vec![
                option(
                    "raise",
                    &label,
                    "Sell a fifth of the company for a full round.",
                    (round * Decimal::new(2, 2)).round_dp(0),
                    3,
                    0,
                    OptionImpact::Fundraise {
                        amount: round,
                        dilution_pct: Decimal::new(20, 0),
                    },
                ),
                option(
                    "small_raise",
                    "Raise a smaller round",
                    "Take less money and give up less equity.",
                    (small * Decimal::new(2, 2)).round_dp(0),
                    3,
                    0,
                    OptionImpact::Fundraise {
                        amount: small,
                        dilution_pct: Decimal::new(12, 0),
                    },
                ),
                hold("decline", "Decline investors", "Keep full ownership for now."),
            ]
        }
    }
}

/// `pct` percent of current cash, never below `floor`.
fn scaled(business: &Business, pct: i64, floor: i64) -> Decimal {
    (business.cash * Decimal::new(pct, 2))
        .round_dp(0)
        .max(Decimal::new(floor, 0))
}

fn option(
    id: &str,
    label: &str,
    description: &str,
    cost: Decimal,
    timeframe_months: u32,
    roi_pct: i64,
    impact: OptionImpact,
) -> DecisionOption {
    DecisionOption {
        id: OptionId::new(id),
        label: label.to_string(),
        description: description.to_string(),
        cost,
        timeframe_months,
        roi_pct: Decimal::new(roi_pct, 0),
        impact,
    }
}

fn hold(id: &str, label: &str, description: &str) -> DecisionOption {
    option(id, label, description, Decimal::ZERO, 0, 0, OptionImpact::Hold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sim_core::{BusinessId, Industry};

    fn business(cash: i64) -> Business {
        Business {
            id: BusinessId("deck".into()),
            name: "Deck".into(),
            industry: Industry::Tech,
            stage: FundingStage::Angel,
            cash: Decimal::new(cash, 0),
            revenue: Decimal::new(1_000, 0),
            monthly_expenses: Decimal::new(10_000, 0),
            customers: 20,
            employees: 3,
            product_progress: 20,
            valuation: Decimal::new(1_000_000, 0),
            founded: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    fn deck() -> DecisionDeck {
        DecisionDeck::new(DecisionConfig::default())
    }

    #[test]
    fn due_on_interval_while_room_remains() {
        let d = deck();
        assert!(d.is_due(2, 0));
        assert!(!d.is_due(3, 0));
        assert!(!d.is_due(4, 3));
    }

    #[test]
    fn short_runway_forces_urgent_finance() {
        let mut rng = SimRng::new(1);
        let runway = Runway::Months(Decimal::new(2, 0));
        let d = deck().draw(&business(20_000), runway, &[], DecisionId(1), 0, &mut rng);
        assert_eq!(d.kind, DecisionKind::Finance);
        assert_eq!(d.urgency, Urgency::Urgent);
        assert_eq!(d.options[0].label, "Raise a seed round");
        assert_eq!(d.options.len(), 3);
    }

    #[test]
    fn pending_kinds_are_not_repeated() {
        let mut rng = SimRng::new(7);
        let b = business(500_000);
        let mut pending = Vec::new();
        for n in 0..DecisionKind::ALL.len() {
            let d = deck().draw(&b, Runway::Infinite, &pending, DecisionId(n as u64), 0, &mut rng);
            assert!(pending.iter().all(|p: &Decision| p.kind != d.kind));
            pending.push(d);
        }
    }

    #[test]
    fn costs_scale_with_cash() {
        let small = options(DecisionKind::Marketing, &business(20_000));
        let large = options(DecisionKind::Marketing, &business(2_000_000));
        assert_eq!(small[0].cost, Decimal::new(1_000, 0));
        assert_eq!(large[0].cost, Decimal::new(100_000, 0));
        // floor
        let broke = options(DecisionKind::Marketing, &business(0));
        assert_eq!(broke[0].cost, Decimal::new(500, 0));
        assert_eq!(broke[2].impact, OptionImpact::Hold);
    }

    #[test]
    fn same_seed_same_draws() {
        let b = business(80_000);
        let mut a = SimRng::new(11);
        let mut c = SimRng::new(11);
        let first = deck().draw(&b, Runway::Infinite, &[], DecisionId(1), 4, &mut a);
        let second = deck().draw(&b, Runway::Infinite, &[], DecisionId(1), 4, &mut c);
        assert_eq!(first, second);
        assert_eq!(first.created_tick, 4);
    }
}
