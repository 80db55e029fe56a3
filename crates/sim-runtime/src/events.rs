//! Event generator.
//!
//! Each tick every event class is rolled once, independently, so at most one
//! event per class fires. A scheduled event for the tick takes the class's
//! slot. Every generated effect is bounded against the current business
//! before it leaves the generator.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use sim_core::{
    fraction, Business, Competitor, CompetitorMove, EffectDelta, EffectKey, Event, EventConfig,
    EventId, EventKind, ScheduledEvent, SimRng,
};
use tracing::debug;

/// Largest product-progress swing a single event may cause, in points.
const MAX_PROGRESS_SWING: i32 = 10;

/// Inputs for one generator tick.
#[derive(Clone, Copy, Debug)]
pub struct EventContext<'a> {
    /// Business after this tick's operating period.
    pub business: &'a Business,
    /// Competitors in the market.
    pub competitors: &'a [Competitor],
    /// Current burn rate.
    pub burn_rate: Decimal,
    /// Player share at the end of the previous tick.
    pub previous_share: Decimal,
    /// Tick being generated.
    pub tick: u64,
    /// Simulated date of the tick.
    pub date: NaiveDate,
    /// Id for the first generated event.
    pub next_id: u64,
}

#[derive(Clone, Copy, Debug)]
enum Swing {
    /// Fraction of the current value, drawn from the range.
    Relative(EffectKey, f64, f64),
    /// Absolute amount, drawn from the inclusive range.
    Points(EffectKey, i64, i64),
}

struct Template {
    kind: EventKind,
    title: &'static str,
    description: &'static str,
    swings: &'static [Swing],
    rival_share: Option<(f64, f64)>,
}

const TEMPLATES: &[Template] = &[
    Template {
        kind: EventKind::Market,
        title: "Sector tailwind",
        description: "Buyers in your market are spending more.",
        swings: &[Swing::Relative(EffectKey::Customers, 0.02, 0.08)],
        rival_share: None,
    },
    Template {
        kind: EventKind::Market,
        title: "Market slowdown",
        description: "Budgets tighten across the sector and some customers leave.",
        swings: &[Swing::Relative(EffectKey::Customers, -0.08, -0.02)],
        rival_share: None,
    },
    Template {
        kind: EventKind::Market,
        title: "Investor enthusiasm",
        description: "Comparable companies raised at higher multiples.",
        swings: &[Swing::Relative(EffectKey::Valuation, 0.05, 0.20)],
        rival_share: None,
    },
    Template {
        kind: EventKind::Market,
        title: "Supplier price hike",
        description: "Input costs rise across the industry.",
        swings: &[Swing::Relative(EffectKey::Expenses, 0.03, 0.10)],
        rival_share: None,
    },
    Template {
        kind: EventKind::Internal,
        title: "Engineering breakthrough",
        description: "The team solved a problem that had blocked the roadmap.",
        swings: &[Swing::Points(EffectKey::ProductProgress, 3, 8)],
        rival_share: None,
    },
    Template {
        kind: EventKind::Internal,
        title: "Key employee resigns",
        description: "A senior team member left for another startup.",
        swings: &[
            Swing::Points(EffectKey::Employees, -1, -1),
            Swing::Points(EffectKey::ProductProgress, -4, -1),
        ],
        rival_share: None,
    },
    Template {
        kind: EventKind::Internal,
        title: "Referral wave",
        description: "Happy customers brought their friends.",
        swings: &[Swing::Relative(EffectKey::Customers, 0.03, 0.10)],
        rival_share: None,
    },
    Template {
        kind: EventKind::Internal,
        title: "Innovation grant",
        description: "A public innovation fund awarded you a grant.",
        swings: &[Swing::Relative(EffectKey::Cash, 0.02, 0.10)],
        rival_share: None,
    },
    Template {
        kind: EventKind::Competitor,
        title: "{rival} launches a rival product",
        description: "{rival} shipped a product aimed squarely at your customers.",
        swings: &[Swing::Relative(EffectKey::Customers, -0.10, -0.02)],
        rival_share: Some((0.005, 0.03)),
    },
    Template {
        kind: EventKind::Competitor,
        title: "{rival} cuts prices",
        description: "{rival} undercut the market and you matched part of the discount.",
        swings: &[Swing::Relative(EffectKey::Revenue, -0.10, -0.03)],
        rival_share: Some((0.0, 0.02)),
    },
    Template {
        kind: EventKind::Competitor,
        title: "{rival} stumbles",
        description: "An outage at {rival} sent some of their customers your way.",
        swings: &[Swing::Relative(EffectKey::Customers, 0.02, 0.06)],
        rival_share: Some((-0.03, -0.005)),
    },
    Template {
        kind: EventKind::Crisis,
        title: "Security breach",
        description: "Attackers accessed customer data. Remediation is expensive.",
        swings: &[
            Swing::Relative(EffectKey::Cash, -0.30, -0.05),
            Swing::Relative(EffectKey::Customers, -0.10, -0.02),
        ],
        rival_share: None,
    },
    Template {
        kind: EventKind::Crisis,
        title: "Lawsuit filed",
        description: "A former partner sued. Legal fees come due immediately.",
        swings: &[Swing::Relative(EffectKey::Cash, -0.40, -0.10)],
        rival_share: None,
    },
    Template {
        kind: EventKind::Crisis,
        title: "Largest customer churns",
        description: "Your biggest account did not renew.",
        swings: &[
            Swing::Relative(EffectKey::Revenue, -0.30, -0.10),
            Swing::Points(EffectKey::Customers, -1, -1),
        ],
        rival_share: None,
    },
    Template {
        kind: EventKind::Crisis,
        title: "Payment processor outage",
        description: "Payments failed for days and refunds piled up.",
        swings: &[
            Swing::Relative(EffectKey::Cash, -0.15, -0.05),
            Swing::Relative(EffectKey::Revenue, -0.10, -0.03),
        ],
        rival_share: None,
    },
];

/// Produces market, internal, competitor and crisis events.
#[derive(Clone, Debug)]
pub struct EventGenerator {
    config: EventConfig,
    scheduled: Vec<ScheduledEvent>,
}

impl EventGenerator {
    /// Generator with no scheduled events.
    pub fn new(config: EventConfig) -> Self {
        EventGenerator {
            config,
            scheduled: Vec::new(),
        }
    }

    /// Add scheduled events, kept in tick order.
    pub fn with_scheduled(mut self, events: impl IntoIterator<Item = ScheduledEvent>) -> Self {
        for ev in events {
            self.schedule(ev);
        }
        self
    }

    /// Schedule one event.
    pub fn schedule(&mut self, event: ScheduledEvent) {
        let at = self.scheduled.partition_point(|s| s.at_tick <= event.at_tick);
        self.scheduled.insert(at, event);
    }

    /// Scheduled events, in tick order.
    pub fn scheduled(&self) -> &[ScheduledEvent] {
        &self.scheduled
    }

    /// Bounds and probabilities.
    pub fn config(&self) -> &EventConfig {
        &self.config
    }

    /// Per-tick probability for `kind`, capped at `max_probability`.
    pub fn probability(&self, kind: EventKind, ctx: &EventContext<'_>) -> f64 {
        let cfg = &self.config;
        let raw = match kind {
            EventKind::Market => cfg.market_rate,
            EventKind::Internal => cfg.internal_rate,
            EventKind::Competitor => {
                let growth = (ctx.business.market_share() - ctx.previous_share)
                    .max(Decimal::ZERO)
                    .to_f64()
                    .unwrap_or(0.0);
                cfg.competitor_base_rate + cfg.competitor_growth_weight * growth
            }
            EventKind::Crisis => {
                cfg.crisis_base_rate
                    + cfg.crisis_distress_weight * distress(ctx.burn_rate, ctx.business.revenue)
            }
        };
        unit_clamp(raw).min(unit_clamp(cfg.max_probability))
    }

    /// Roll every class once for this tick.
    pub fn tick(&self, ctx: &EventContext<'_>, rng: &mut SimRng) -> Vec<Event> {
        let mut events = Vec::new();
        let mut next_id = ctx.next_id;
        for kind in EventKind::ALL {
            // One draw per class per tick keeps the stream aligned.
            let fires = rng.chance(self.probability(kind, ctx));
            let event = match self.scheduled_for(ctx.tick, kind) {
                Some(s) => Some(self.from_scheduled(s, ctx, EventId(next_id))),
                None if fires => Some(self.roll(kind, ctx, rng, EventId(next_id))),
                None => None,
            };
            if let Some(event) = event {
                debug!(tick = ctx.tick, event = %event.id, kind = %kind, title = %event.title, "event generated");
                events.push(event);
                next_id += 1;
            }
        }
        events
    }

    /// Clamp an effect to the configured fractions of the business's current values.
    ///
    /// Crises may remove up to `crisis_max_cash_loss` of cash; every other
    /// cash swing is limited to `max_event_cash_fraction`. Revenue, expenses
    /// and valuation share `max_revenue_fraction`. Events never advance the
    /// funding stage.
    pub fn bound(&self, kind: EventKind, effects: &EffectDelta, business: &Business) -> EffectDelta {
        let cfg = &self.config;
        let cash_gain = fraction(cfg.max_event_cash_fraction) * business.cash;
        let cash_loss = if kind == EventKind::Crisis {
            fraction(cfg.crisis_max_cash_loss) * business.cash
        } else {
            cash_gain
        };
        let flow = fraction(cfg.max_revenue_fraction);
        let crowd = fraction(cfg.max_customer_fraction);
        let customer_cap = (crowd * Decimal::from(business.customers)).floor();
        let staff_cap = (crowd * Decimal::from(business.employees))
            .floor()
            .max(Decimal::ONE);
        EffectDelta {
            cash: effects.cash.clamp(-cash_loss, cash_gain),
            revenue: symmetric(effects.revenue, flow * business.revenue),
            expenses: symmetric(effects.expenses, flow * business.monthly_expenses),
            customers: clamp_count(effects.customers, customer_cap),
            employees: clamp_count(effects.employees, staff_cap),
            valuation: symmetric(effects.valuation, flow * business.valuation),
            product_progress: effects
                .product_progress
                .clamp(-MAX_PROGRESS_SWING, MAX_PROGRESS_SWING),
            advance_stage: false,
        }
    }

    fn scheduled_for(&self, tick: u64, kind: EventKind) -> Option<&ScheduledEvent> {
        let mut due = self
            .scheduled
            .iter()
            .filter(|s| s.at_tick == tick && s.kind == kind);
        let first = due.next();
        let skipped = due.count();
        if skipped > 0 {
            debug!(tick, kind = %kind, skipped, "extra scheduled events dropped");
        }
        first
    }

    fn from_scheduled(&self, s: &ScheduledEvent, ctx: &EventContext<'_>, id: EventId) -> Event {
        Event {
            id,
            kind: s.kind,
            title: s.title.clone(),
            description: s.description.clone(),
            effects: self.bound(s.kind, &s.effects, ctx.business),
            competitor: None,
            tick: ctx.tick,
            date: ctx.date,
        }
    }

    fn roll(&self, kind: EventKind, ctx: &EventContext<'_>, rng: &mut SimRng, id: EventId) -> Event {
        let candidates: Vec<&Template> = TEMPLATES.iter().filter(|t| t.kind == kind).collect();
        let template = candidates[rng.index(candidates.len())];
        let business = ctx.business;

        let mut effects = EffectDelta::default();
        for swing in template.swings {
            match *swing {
                Swing::Relative(key, lo, hi) => {
                    let amount = (current(business, key) * rng.fraction_between(lo, hi)).round_dp(2);
                    effects.set(key, amount);
                }
                Swing::Points(key, lo, hi) => {
                    let span = usize::try_from(hi - lo + 1).unwrap_or(1);
                    let amount = lo + rng.index(span) as i64;
                    effects.set(key, Decimal::from(amount));
                }
            }
        }
        let sets_revenue = template
            .swings
            .iter()
            .any(|s| matches!(s, Swing::Relative(EffectKey::Revenue, ..) | Swing::Points(EffectKey::Revenue, ..)));
        if !sets_revenue && effects.customers != 0 {
            effects.revenue = (Decimal::from(effects.customers) * business.arpu()).round_dp(2);
        }

        let mut rival = "A rival".to_string();
        let mut competitor = None;
        if let Some((lo, hi)) = template.rival_share {
            if !ctx.competitors.is_empty() {
                let target = &ctx.competitors[rng.index(ctx.competitors.len())];
                rival = target.name.clone();
                let requested = rng.fraction_between(lo, hi);
                let mut roster = ctx.competitors.to_vec();
                let mv = CompetitorMove {
                    competitor: target.name.clone(),
                    share_delta: requested,
                };
                competitor = apply_competitor_move(&mut roster, &mv, business.market_share());
            }
        }

        Event {
            id,
            kind,
            title: template.title.replace("{rival}", &rival),
            description: template.description.replace("{rival}", &rival),
            effects: self.bound(kind, &effects, business),
            competitor,
            tick: ctx.tick,
            date: ctx.date,
        }
    }
}

/// Move one competitor's share, keeping it in [0, 1] and the market total at
/// most 1. Returns the move as applied, or `None` for an unknown competitor.
pub fn apply_competitor_move(
    competitors: &mut [Competitor],
    mv: &CompetitorMove,
    player_share: Decimal,
) -> Option<CompetitorMove> {
    let others: Decimal = competitors
        .iter()
        .filter(|c| c.name != mv.competitor)
        .map(|c| c.market_share)
        .sum();
    let target = competitors.iter_mut().find(|c| c.name == mv.competitor)?;
    let room = (Decimal::ONE - player_share - others).clamp(Decimal::ZERO, Decimal::ONE);
    let before = target.market_share;
    target.market_share = (before + mv.share_delta).clamp(Decimal::ZERO, room);
    Some(CompetitorMove {
        competitor: mv.competitor.clone(),
        share_delta: target.market_share - before,
    })
}

/// Scale competitor shares down so that together with `player_share` they
/// sum to at most 1.
pub fn fit_competitors(competitors: &mut [Competitor], player_share: Decimal) {
    for c in competitors.iter_mut() {
        c.market_share = c.market_share.clamp(Decimal::ZERO, Decimal::ONE);
    }
    let room = (Decimal::ONE - player_share).max(Decimal::ZERO);
    let total: Decimal = competitors.iter().map(|c| c.market_share).sum();
    if total <= room || total.is_zero() {
        return;
    }
    for c in competitors.iter_mut() {
        c.market_share =
            (c.market_share * room / total).round_dp_with_strategy(6, RoundingStrategy::ToZero);
    }
}

fn current(business: &Business, key: EffectKey) -> Decimal {
    match key {
        EffectKey::Cash => business.cash,
        EffectKey::Revenue => business.revenue,
        EffectKey::Expenses => business.monthly_expenses,
        EffectKey::Customers => Decimal::from(business.customers),
        EffectKey::Employees => Decimal::from(business.employees),
        EffectKey::Valuation => business.valuation,
        EffectKey::ProductProgress => Decimal::from(business.product_progress),
    }
}

/// 0 when the business covers its burn, rising to 1 as revenue vanishes.
fn distress(burn_rate: Decimal, revenue: Decimal) -> f64 {
    if burn_rate <= revenue || burn_rate <= Decimal::ZERO {
        return 0.0;
    }
    ((burn_rate - revenue) / burn_rate).to_f64().unwrap_or(0.0)
}

fn unit_clamp(p: f64) -> f64 {
    if p.is_finite() {
        p.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn symmetric(value: Decimal, cap: Decimal) -> Decimal {
    let cap = cap.abs();
    value.clamp(-cap, cap)
}

fn clamp_count(value: i64, cap: Decimal) -> i64 {
    let cap = cap.to_i64().unwrap_or(i64::MAX).max(0);
    value.clamp(-cap, cap)
}
