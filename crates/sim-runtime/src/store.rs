//! The authoritative game-state store.
//!
//! Every command is applied to a private draft of the current state. The
//! draft is refreshed (metrics, advice, competitor shares), validated, and
//! only then swapped in as the new published snapshot. A failing command
//! leaves the published state untouched.

use crate::decisions::DecisionDeck;
use crate::events::{apply_competitor_move, fit_competitors, EventContext, EventGenerator};
use sim_core::{
    validate_business, validate_competitors, validate_state, Business, BusinessSetup, ClockError,
    ClockTick, Competitor, DecisionId, Event, EventId, FinancialRecord, GameState, OptionId,
    RecordSource, ResolvedDecision, ScheduledEvent, SimConfig, Speed, TimeControls,
    ValidationError,
};
use sim_econ::ResolveError;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Commands accepted by [`GameStateStore::dispatch`].
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Replace the active business with a new one.
    CreateBusiness(BusinessSetup),
    /// Show the business-setup dialog.
    OpenBusinessSetup,
    /// Hide the business-setup dialog.
    CloseBusinessSetup,
    /// Select a pending decision and open the modal.
    SelectDecision(DecisionId),
    /// Re-open the modal for the selected decision.
    OpenDecisionModal,
    /// Close the modal and clear the selection.
    CloseDecisionModal,
    /// Choose an option of a pending decision.
    ResolveDecision {
        /// Pending decision.
        decision_id: DecisionId,
        /// Chosen option.
        option_id: OptionId,
    },
    /// Apply an externally produced event now.
    ApplyEvent(Event),
    /// Advance the clock by one tick (no-op while paused).
    Tick,
    /// Pause the clock.
    Pause,
    /// Resume the clock.
    Resume,
    /// Change playback speed.
    SetSpeed(Speed),
    /// Replace pause and speed at once.
    SetTimeControls(TimeControls),
    /// Toggle the loading flag.
    SetLoading(bool),
    /// Replace the whole state with a saved one.
    LoadState(Box<GameState>),
}

impl Command {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateBusiness(_) => "create_business",
            Command::OpenBusinessSetup => "open_business_setup",
            Command::CloseBusinessSetup => "close_business_setup",
            Command::SelectDecision(_) => "select_decision",
            Command::OpenDecisionModal => "open_decision_modal",
            Command::CloseDecisionModal => "close_decision_modal",
            Command::ResolveDecision { .. } => "resolve_decision",
            Command::ApplyEvent(_) => "apply_event",
            Command::Tick => "tick",
            Command::Pause => "pause",
            Command::Resume => "resume",
            Command::SetSpeed(_) => "set_speed",
            Command::SetTimeControls(_) => "set_time_controls",
            Command::SetLoading(_) => "set_loading",
            Command::LoadState(_) => "load_state",
        }
    }
}

/// Typed failures of [`GameStateStore::dispatch`].
#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    /// The option is not part of the decision.
    #[error("option {option} does not exist in decision {decision}")]
    InvalidOption {
        /// Decision being resolved.
        decision: DecisionId,
        /// Requested option.
        option: OptionId,
    },
    /// Unknown or already-resolved decision.
    #[error("decision {0} is not pending")]
    InvalidDecision(DecisionId),
    /// Command not allowed in the current state.
    #[error("invalid state transition: {0}")]
    InvalidStateTransition(&'static str),
    /// The resulting state would break an invariant.
    #[error("invariant violation: {0}")]
    InvariantViolation(#[from] ValidationError),
    /// Clock could not advance.
    #[error(transparent)]
    Clock(#[from] ClockError),
}

impl From<ResolveError> for StoreError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::InvalidOption { decision, option } => {
                StoreError::InvalidOption { decision, option }
            }
        }
    }
}

const NO_BUSINESS: &str = "no active business";

/// Callback invoked with every published snapshot.
pub type Subscriber = Box<dyn FnMut(&Arc<GameState>) + Send>;

/// Handle returned by [`GameStateStore::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Sole writer of the game state.
pub struct GameStateStore {
    config: SimConfig,
    state: Arc<GameState>,
    events: EventGenerator,
    deck: DecisionDeck,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl GameStateStore {
    /// Store with an empty session.
    pub fn new(config: SimConfig) -> Result<Self, StoreError> {
        let state = GameState::new(&config)?;
        Ok(GameStateStore {
            events: EventGenerator::new(config.events.clone()),
            deck: DecisionDeck::new(config.decisions.clone()),
            state: Arc::new(state),
            config,
            subscribers: Vec::new(),
            next_subscription: 0,
        })
    }

    /// Add scheduled events to the generator.
    pub fn with_scheduled(mut self, events: impl IntoIterator<Item = ScheduledEvent>) -> Self {
        self.events = self.events.with_scheduled(events);
        self
    }

    /// Schedule one more event.
    pub fn schedule(&mut self, event: ScheduledEvent) {
        self.events.schedule(event);
    }

    /// Current published snapshot.
    pub fn state(&self) -> Arc<GameState> {
        Arc::clone(&self.state)
    }

    /// Configuration the store runs with.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Register a callback for every published snapshot.
    pub fn subscribe(&mut self, f: impl FnMut(&Arc<GameState>) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(f)));
        id
    }

    /// Remove a callback. Returns false when it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    /// Apply one command and publish the resulting snapshot.
    ///
    /// Commands that change nothing return the current snapshot without
    /// notifying subscribers.
    pub fn dispatch(&mut self, command: Command) -> Result<Arc<GameState>, StoreError> {
        let name = command.name();
        let mut draft = GameState::clone(&self.state);
        if let Err(e) = self.apply(&mut draft, command) {
            warn!(command = name, error = %e, "command rejected");
            return Err(e);
        }
        self.refresh(&mut draft);
        if draft == *self.state {
            return Ok(self.state());
        }
        if let Err(e) = validate_state(&draft) {
            warn!(command = name, error = %e, "invariant violation, mutation rejected");
            return Err(e.into());
        }

        let snapshot = Arc::new(draft);
        self.state = Arc::clone(&snapshot);
        for (_, notify) in self.subscribers.iter_mut() {
            notify(&snapshot);
        }
        debug!(command = name, tick = snapshot.tick(), "state published");
        Ok(snapshot)
    }

    fn apply(&self, draft: &mut GameState, command: Command) -> Result<(), StoreError> {
        match command {
            Command::CreateBusiness(setup) => self.create_business(draft, &setup)?,
            Command::OpenBusinessSetup => draft.ui.show_business_setup = true,
            Command::CloseBusinessSetup => draft.ui.show_business_setup = false,
            Command::SelectDecision(id) => {
                if draft.pending(id).is_none() {
                    return Err(StoreError::InvalidDecision(id));
                }
                draft.selected_decision = Some(id);
                draft.ui.show_decision_modal = true;
            }
            Command::OpenDecisionModal => {
                if draft.selected_decision.is_none() {
                    return Err(StoreError::InvalidStateTransition("no decision selected"));
                }
                draft.ui.show_decision_modal = true;
            }
            Command::CloseDecisionModal => {
                draft.ui.show_decision_modal = false;
                draft.selected_decision = None;
            }
            Command::ResolveDecision {
                decision_id,
                option_id,
            } => self.resolve_decision(draft, decision_id, option_id)?,
            Command::ApplyEvent(mut event) => {
                event.id = EventId(draft.next_event_id);
                event.tick = draft.clock.tick();
                event.date = draft.clock.date();
                self.apply_event(draft, event)?;
                draft.next_event_id += 1;
            }
            Command::Tick => {
                if draft.business.is_none() {
                    return Err(StoreError::InvalidStateTransition(NO_BUSINESS));
                }
                if let Some(step) = draft.clock.advance()? {
                    self.run_tick(draft, step)?;
                }
            }
            Command::Pause => {
                if !draft.clock.pause() {
                    debug!("already paused");
                }
            }
            Command::Resume => {
                if !draft.clock.resume() {
                    debug!("already running");
                }
            }
            Command::SetSpeed(speed) => {
                draft.clock.set_speed(speed);
            }
            Command::SetTimeControls(controls) => {
                draft.clock.set_controls(controls);
            }
            Command::SetLoading(loading) => draft.ui.is_loading = loading,
            Command::LoadState(state) => {
                validate_state(&state)?;
                *draft = *state;
                draft.ui.is_loading = false;
                info!(business = ?draft.business_id(), tick = draft.tick(), "state loaded");
            }
        }
        Ok(())
    }

    fn create_business(&self, draft: &mut GameState, setup: &BusinessSetup) -> Result<(), StoreError> {
        let business = Business::from_setup(setup, self.config.start_date)?;
        draft.clock.restart(self.config.start_date);
        draft.competitors = Competitor::roster(business.industry);
        draft.previous_share = business.market_share();
        draft.financials = vec![FinancialRecord::setup(draft.clock.date(), &business)];
        draft.decisions.clear();
        draft.resolved.clear();
        draft.events.clear();
        draft.mentor_advice.clear();
        draft.metrics = None;
        draft.selected_decision = None;
        draft.ui.show_business_setup = false;
        draft.ui.show_decision_modal = false;
        info!(
            business = %business.id,
            industry = %business.industry,
            stage = %business.stage,
            cash = %business.cash,
            "business created"
        );
        draft.business = Some(business);
        self.draw_decision(draft);
        Ok(())
    }

    fn resolve_decision(
        &self,
        draft: &mut GameState,
        decision_id: DecisionId,
        option_id: OptionId,
    ) -> Result<(), StoreError> {
        let tick = draft.clock.tick();
        let date = draft.clock.date();
        let business = draft
            .business
            .as_mut()
            .ok_or(StoreError::InvalidStateTransition(NO_BUSINESS))?;
        let pos = draft
            .decisions
            .iter()
            .position(|d| d.id == decision_id)
            .ok_or(StoreError::InvalidDecision(decision_id))?;
        let consequence = sim_econ::resolve(&draft.decisions[pos], &option_id, business)?;

        let before = business.clone();
        business.apply(&consequence.effects)?;
        if consequence.effects.touches_ledger() {
            let source = RecordSource::Decision {
                decision: decision_id,
                option: option_id.clone(),
            };
            draft
                .financials
                .push(FinancialRecord::adjustment(tick, date, source, &before, business));
        }

        let decision = draft.decisions.remove(pos);
        info!(decision = %decision_id, option = %option_id, outcome = %consequence.description, "decision resolved");
        draft.resolved.push(ResolvedDecision {
            decision,
            consequence,
            resolved_tick: tick,
        });
        if draft.selected_decision == Some(decision_id) {
            draft.selected_decision = None;
            draft.ui.show_decision_modal = false;
        }
        Ok(())
    }

    /// Bound, apply and record one event. Nothing in `draft` changes on error.
    fn apply_event(&self, draft: &mut GameState, mut event: Event) -> Result<(), StoreError> {
        let current = draft
            .business
            .as_ref()
            .ok_or(StoreError::InvalidStateTransition(NO_BUSINESS))?;
        event.effects = self.events.bound(event.kind, &event.effects, current);
        let mut after = current.clone();
        after.apply(&event.effects)?;
        validate_business(&after)?;

        let share = after.market_share();
        let mut competitors = draft.competitors.clone();
        if let Some(mv) = event.competitor.take() {
            event.competitor = apply_competitor_move(&mut competitors, &mv, share);
        }
        fit_competitors(&mut competitors, share);
        validate_competitors(&competitors, share)?;

        if event.effects.touches_ledger() {
            let source = RecordSource::Event {
                event: event.id,
                kind: event.kind,
            };
            draft.financials.push(FinancialRecord::adjustment(
                event.tick, event.date, source, current, &after,
            ));
        }
        draft.business = Some(after);
        draft.competitors = competitors;
        info!(event = %event.id, kind = %event.kind, title = %event.title, "event applied");
        draft.events.push(event);
        Ok(())
    }

    /// Operating period, then events, then the decision draw.
    fn run_tick(&self, draft: &mut GameState, step: ClockTick) -> Result<(), StoreError> {
        if let Some(business) = draft.business.as_mut() {
            let before = business.clone();
            let period =
                sim_econ::operating_period(business, step.elapsed_days, &self.config.operations);
            business.apply(&period.effects)?;
            draft.financials.push(FinancialRecord::operating(
                step.tick,
                step.date,
                period.days,
                period.income,
                period.expenses,
                &before,
                business,
            ));
        }

        let generated = match draft.business.as_ref() {
            Some(business) => {
                let burn_rate =
                    sim_econ::compute_metrics(business, &draft.financials, &self.config.metrics)
                        .burn_rate;
                let ctx = EventContext {
                    business,
                    competitors: &draft.competitors,
                    burn_rate,
                    previous_share: draft.previous_share,
                    tick: step.tick,
                    date: step.date,
                    next_id: draft.next_event_id,
                };
                self.events.tick(&ctx, &mut draft.rng)
            }
            None => Vec::new(),
        };
        draft.next_event_id += generated.len() as u64;
        let count = generated.len();
        for event in generated {
            let id = event.id;
            if let Err(e) = self.apply_event(draft, event) {
                warn!(tick = step.tick, event = %id, error = %e, "event dropped");
            }
        }

        if self.deck.is_due(step.tick, draft.decisions.len()) {
            self.draw_decision(draft);
        }
        if let Some(business) = draft.business.as_ref() {
            draft.previous_share = business.market_share();
        }
        info!(tick = step.tick, date = %step.date, days = step.elapsed_days, events = count, "tick");
        Ok(())
    }

    fn draw_decision(&self, draft: &mut GameState) {
        let tick = draft.clock.tick();
        let Some(business) = draft.business.as_ref() else {
            return;
        };
        let runway =
            sim_econ::compute_metrics(business, &draft.financials, &self.config.metrics).runway;
        let id = DecisionId(draft.next_decision_id);
        let decision = self
            .deck
            .draw(business, runway, &draft.decisions, id, tick, &mut draft.rng);
        debug!(decision = %decision.id, kind = ?decision.kind, urgency = ?decision.urgency, "decision drawn");
        draft.next_decision_id += 1;
        draft.decisions.push(decision);
    }

    /// Recompute everything derived from the business and its ledger.
    fn refresh(&self, draft: &mut GameState) {
        match draft.business.as_ref() {
            Some(business) => {
                fit_competitors(&mut draft.competitors, business.market_share());
                let metrics =
                    sim_econ::compute_metrics(business, &draft.financials, &self.config.metrics);
                draft.mentor_advice = sim_ai::advise(business, &metrics, &draft.competitors);
                draft.metrics = Some(metrics);
            }
            None => {
                draft.metrics = None;
                draft.mentor_advice.clear();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use sim_core::{
        Decision, DecisionKind, DecisionOption, EffectDelta, EventConfig, EventKind, FundingStage,
        Industry, OperationsConfig, OptionImpact, Urgency,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn quiet_config() -> SimConfig {
        SimConfig {
            operations: OperationsConfig {
                organic_growth_monthly: 0.0,
                churn_monthly: 0.0,
            },
            events: EventConfig {
                market_rate: 0.0,
                internal_rate: 0.0,
                competitor_base_rate: 0.0,
                competitor_growth_weight: 0.0,
                crisis_base_rate: 0.0,
                crisis_distress_weight: 0.0,
                ..EventConfig::default()
            },
            ..SimConfig::default()
        }
    }

    fn setup(name: &str) -> BusinessSetup {
        BusinessSetup {
            name: name.into(),
            industry: Industry::Tech,
            stage: FundingStage::Angel,
            starting_cash: None,
        }
    }

    fn marketing_decision(id: u64) -> Decision {
        Decision {
            id: DecisionId(id),
            kind: DecisionKind::Marketing,
            urgency: Urgency::Normal,
            title: "Campaign".into(),
            description: "Spend on ads.".into(),
            options: vec![
                DecisionOption {
                    id: OptionId::new("ads"),
                    label: "Run ads".into(),
                    description: String::new(),
                    cost: Decimal::new(500, 0),
                    timeframe_months: 3,
                    roi_pct: Decimal::new(150, 0),
                    impact: OptionImpact::Acquisition {
                        cac: Decimal::new(50, 0),
                    },
                },
                DecisionOption {
                    id: OptionId::new("skip"),
                    label: "Skip".into(),
                    description: String::new(),
                    cost: Decimal::ZERO,
                    timeframe_months: 0,
                    roi_pct: Decimal::ZERO,
                    impact: OptionImpact::Hold,
                },
            ],
            created_tick: 0,
        }
    }

    /// Store holding a small tech business with one pending marketing decision.
    fn seeded_store(cash: i64) -> GameStateStore {
        let cfg = quiet_config();
        let mut store = GameStateStore::new(cfg.clone()).unwrap();
        let mut state = GameState::new(&cfg).unwrap();
        let business = Business {
            id: sim_core::BusinessId("acme".into()),
            name: "Acme".into(),
            industry: Industry::Tech,
            stage: FundingStage::Seed,
            cash: Decimal::new(cash, 0),
            revenue: Decimal::new(2_000, 0),
            monthly_expenses: Decimal::new(6_000, 0),
            customers: 50,
            employees: 2,
            product_progress: 40,
            valuation: Decimal::new(400_000, 0),
            founded: cfg.start_date,
        };
        state.financials.push(FinancialRecord::setup(cfg.start_date, &business));
        state.competitors = Competitor::roster(business.industry);
        state.business = Some(business);
        state.decisions.push(marketing_decision(1));
        state.next_decision_id = 2;
        state.ui.show_business_setup = false;
        store.dispatch(Command::LoadState(Box::new(state))).unwrap();
        store
    }

    fn business_bytes(state: &GameState) -> Vec<u8> {
        serde_json::to_vec(&state.business).unwrap()
    }

    #[test]
    fn create_business_starts_a_session() {
        let mut store = GameStateStore::new(SimConfig::default()).unwrap();
        let s = store.dispatch(Command::CreateBusiness(setup("Rocket Labs"))).unwrap();
        let b = s.business.as_ref().unwrap();
        assert_eq!(b.id.0, "rocket-labs");
        assert!(!s.ui.show_business_setup);
        assert_eq!(s.financials.len(), 1);
        assert_eq!(s.financials[0].source, RecordSource::Setup);
        assert_eq!(s.competitors.len(), 3);
        assert_eq!(s.decisions.len(), 1);
        assert!(s.metrics.is_some());
        assert!(!s.mentor_advice.is_empty());
        assert!(s.time_controls().is_paused);
    }

    #[test]
    fn new_business_replaces_the_old_one() {
        let mut store = GameStateStore::new(quiet_config()).unwrap();
        store.dispatch(Command::CreateBusiness(setup("First"))).unwrap();
        store.dispatch(Command::Resume).unwrap();
        store.dispatch(Command::Tick).unwrap();
        let s = store.dispatch(Command::CreateBusiness(setup("Second"))).unwrap();
        assert_eq!(s.business.as_ref().unwrap().name, "Second");
        assert_eq!(s.tick(), 0);
        assert_eq!(s.financials.len(), 1);
        assert_eq!(s.decisions.len(), 1);
        assert!(s.decisions[0].id.0 > 1);
    }

    #[test]
    fn invalid_setup_is_rejected() {
        let mut store = GameStateStore::new(SimConfig::default()).unwrap();
        let before = store.state();
        let err = store.dispatch(Command::CreateBusiness(setup("   "))).unwrap_err();
        assert_eq!(err, StoreError::InvariantViolation(ValidationError::EmptyName));
        assert!(Arc::ptr_eq(&before, &store.state()));
    }

    #[test]
    fn marketing_decision_scenario() {
        let mut store = seeded_store(10_000);
        let records = store.state().financials.len();
        let s = store
            .dispatch(Command::ResolveDecision {
                decision_id: DecisionId(1),
                option_id: OptionId::new("ads"),
            })
            .unwrap();
        let b = s.business.as_ref().unwrap();
        assert_eq!(b.cash, Decimal::new(9_500, 0));
        assert_eq!(b.customers, 60);
        assert_eq!(s.financials.len(), records + 1);
        let last = s.financials.last().unwrap();
        assert_eq!(last.cash_delta(), Decimal::new(-500, 0));
        assert!(s.decisions.is_empty());
        assert_eq!(s.resolved.len(), 1);
        assert_eq!(s.resolved[0].consequence.option, OptionId::new("ads"));
    }

    #[test]
    fn unknown_option_leaves_business_untouched() {
        let mut store = seeded_store(10_000);
        let before = store.state();
        let err = store
            .dispatch(Command::ResolveDecision {
                decision_id: DecisionId(1),
                option_id: OptionId::new("nope"),
            })
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::InvalidOption {
                decision: DecisionId(1),
                option: OptionId::new("nope"),
            }
        );
        let after = store.state();
        assert_eq!(business_bytes(&before), business_bytes(&after));
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn unknown_or_resolved_decision_is_rejected() {
        let mut store = seeded_store(10_000);
        let resolve = Command::ResolveDecision {
            decision_id: DecisionId(1),
            option_id: OptionId::new("skip"),
        };
        store.dispatch(resolve.clone()).unwrap();
        assert_eq!(
            store.dispatch(resolve).unwrap_err(),
            StoreError::InvalidDecision(DecisionId(1))
        );
        assert_eq!(
            store.dispatch(Command::SelectDecision(DecisionId(42))).unwrap_err(),
            StoreError::InvalidDecision(DecisionId(42))
        );
    }

    #[test]
    fn resolving_without_business_is_an_invalid_transition() {
        let cfg = quiet_config();
        let mut store = GameStateStore::new(cfg.clone()).unwrap();
        let mut state = GameState::new(&cfg).unwrap();
        state.decisions.push(marketing_decision(1));
        store.dispatch(Command::LoadState(Box::new(state))).unwrap();
        let err = store
            .dispatch(Command::ResolveDecision {
                decision_id: DecisionId(1),
                option_id: OptionId::new("ads"),
            })
            .unwrap_err();
        assert_eq!(err, StoreError::InvalidStateTransition(NO_BUSINESS));
    }

    #[test]
    fn crisis_cannot_take_more_than_a_fifth_of_cash() {
        let mut store = seeded_store(1_000);
        let crisis = Event {
            id: EventId(0),
            kind: EventKind::Crisis,
            title: "Fraud".into(),
            description: "Funds were stolen.".into(),
            effects: EffectDelta {
                cash: Decimal::new(-5_000, 0),
                ..EffectDelta::default()
            },
            competitor: None,
            tick: 0,
            date: store.config().start_date,
        };
        let s = store.dispatch(Command::ApplyEvent(crisis)).unwrap();
        assert_eq!(s.business.as_ref().unwrap().cash, Decimal::new(800, 0));
        assert_eq!(s.events.len(), 1);
        assert_eq!(s.events[0].effects.cash, Decimal::new(-200, 0));
        assert_eq!(s.financials.last().unwrap().cash_delta(), Decimal::new(-200, 0));
    }

    #[test]
    fn speed_changes_without_ticks_produce_no_events() {
        let mut store = seeded_store(10_000);
        store.dispatch(Command::SetSpeed(Speed::Fast)).unwrap();
        let s = store.dispatch(Command::SetSpeed(Speed::Normal)).unwrap();
        assert_eq!(s.time_controls().speed, Speed::Normal);
        assert!(s.events.is_empty());
        assert_eq!(s.tick(), 0);
    }

    #[test]
    fn pause_twice_is_a_no_op() {
        let mut store = seeded_store(10_000);
        store.dispatch(Command::Resume).unwrap();
        let first = store.dispatch(Command::Pause).unwrap();
        let second = store.dispatch(Command::Pause).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn pause_resume_without_ticks_changes_only_controls() {
        let mut store = seeded_store(10_000);
        let before = store.state();
        store.dispatch(Command::Resume).unwrap();
        let after = store.dispatch(Command::Pause).unwrap();
        assert_eq!(*before, *after);
    }

    #[test]
    fn ticks_are_ignored_while_paused() {
        let mut store = seeded_store(10_000);
        let before = store.state();
        let after = store.dispatch(Command::Tick).unwrap();
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn tick_books_an_operating_period() {
        let mut store = seeded_store(10_000);
        store.dispatch(Command::Resume).unwrap();
        let s = store.dispatch(Command::Tick).unwrap();
        assert_eq!(s.tick(), 1);
        assert_eq!(s.operating_records().count(), 1);
        let b = s.business.as_ref().unwrap();
        // 2_000 revenue - 6_000 expenses
        assert_eq!(b.cash, Decimal::new(6_000, 0));
        let m = s.metrics.as_ref().unwrap();
        assert_eq!(m.burn_rate, Decimal::new(4_000, 0));
        assert_eq!(m.cash, b.cash);

        store.dispatch(Command::SetSpeed(Speed::Fast)).unwrap();
        let fast = store.dispatch(Command::Tick).unwrap();
        assert_eq!((fast.date() - s.date()).num_days(), 90);
        // 90 days at -4_000 per month
        assert_eq!(fast.business.as_ref().unwrap().cash, Decimal::ZERO);
    }

    #[test]
    fn tick_without_business_is_rejected() {
        let mut store = GameStateStore::new(SimConfig::default()).unwrap();
        let before = store.dispatch(Command::Resume).unwrap();
        assert_eq!(
            store.dispatch(Command::Tick).unwrap_err(),
            StoreError::InvalidStateTransition(NO_BUSINESS)
        );
        let after = store.state();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.tick(), 0);
    }

    #[test]
    fn failing_event_is_dropped_and_the_tick_goes_on() {
        let mut store = seeded_store(10_000).with_scheduled([
            ScheduledEvent {
                at_tick: 1,
                kind: EventKind::Market,
                title: "Investor frenzy".into(),
                description: "Valuations go through the roof.".into(),
                effects: EffectDelta {
                    valuation: Decimal::new(1_000_000, 0),
                    ..EffectDelta::default()
                },
            },
            ScheduledEvent {
                at_tick: 1,
                kind: EventKind::Internal,
                title: "Hackathon".into(),
                description: "The team shipped a prototype.".into(),
                effects: EffectDelta {
                    product_progress: 5,
                    ..EffectDelta::default()
                },
            },
        ]);
        let mut state = GameState::clone(&store.state());
        state.business.as_mut().unwrap().valuation = Decimal::MAX;
        store.dispatch(Command::LoadState(Box::new(state))).unwrap();
        store.dispatch(Command::Resume).unwrap();

        let s = store.dispatch(Command::Tick).unwrap();
        assert_eq!(s.tick(), 1);
        assert_eq!(s.operating_records().count(), 1);
        let titles: Vec<&str> = s.events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Hackathon"]);
        let b = s.business.as_ref().unwrap();
        assert_eq!(b.product_progress, 45);
        assert_eq!(b.valuation, Decimal::MAX);
    }

    #[test]
    fn overflowing_decision_is_rejected_without_change() {
        let mut store = seeded_store(10_000);
        let mut state = GameState::clone(&store.state());
        state.business.as_mut().unwrap().cash = Decimal::MAX;
        state.decisions[0].options[0].impact = OptionImpact::Fundraise {
            amount: Decimal::new(1_000_000, 0),
            dilution_pct: Decimal::new(20, 0),
        };
        let before = store.dispatch(Command::LoadState(Box::new(state))).unwrap();
        let err = store
            .dispatch(Command::ResolveDecision {
                decision_id: DecisionId(1),
                option_id: OptionId::new("ads"),
            })
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::InvariantViolation(ValidationError::Overflow("cash"))
        );
        assert!(Arc::ptr_eq(&before, &store.state()));
    }

    #[test]
    fn scheduled_events_fire_on_their_tick() {
        let mut store = seeded_store(10_000).with_scheduled([ScheduledEvent {
            at_tick: 2,
            kind: EventKind::Internal,
            title: "Hackathon".into(),
            description: "The team shipped a prototype.".into(),
            effects: EffectDelta {
                product_progress: 5,
                ..EffectDelta::default()
            },
        }]);
        store.dispatch(Command::Resume).unwrap();
        assert!(store.dispatch(Command::Tick).unwrap().events.is_empty());
        let s = store.dispatch(Command::Tick).unwrap();
        assert_eq!(s.events.len(), 1);
        assert_eq!(s.events[0].title, "Hackathon");
        assert_eq!(s.events[0].tick, 2);
        assert_eq!(s.business.as_ref().unwrap().product_progress, 45);
    }

    #[test]
    fn modal_follows_selection() {
        let mut store = seeded_store(10_000);
        assert_eq!(
            store.dispatch(Command::OpenDecisionModal).unwrap_err(),
            StoreError::InvalidStateTransition("no decision selected")
        );
        let s = store.dispatch(Command::SelectDecision(DecisionId(1))).unwrap();
        assert!(s.ui.show_decision_modal);
        assert_eq!(s.selected_decision, Some(DecisionId(1)));
        let s = store
            .dispatch(Command::ResolveDecision {
                decision_id: DecisionId(1),
                option_id: OptionId::new("skip"),
            })
            .unwrap();
        assert!(!s.ui.show_decision_modal);
        assert_eq!(s.selected_decision, None);
    }

    #[test]
    fn load_recomputes_metrics() {
        let cfg = quiet_config();
        let mut store = GameStateStore::new(cfg.clone()).unwrap();
        let mut state = GameState::new(&cfg).unwrap();
        let b = Business::from_setup(&setup("Saved"), cfg.start_date).unwrap();
        state.financials.push(FinancialRecord::setup(cfg.start_date, &b));
        state.business = Some(b);
        state.ui.is_loading = true;
        assert!(state.metrics.is_none());
        let s = store.dispatch(Command::LoadState(Box::new(state))).unwrap();
        assert!(s.metrics.is_some());
        assert!(!s.ui.is_loading);
    }

    #[test]
    fn subscribers_see_every_publish() {
        let mut store = seeded_store(10_000);
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let id = store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        store.dispatch(Command::Resume).unwrap();
        store.dispatch(Command::Resume).unwrap();
        store.dispatch(Command::Tick).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.dispatch(Command::Tick).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn same_seed_same_history() {
        let run = || {
            let mut store = GameStateStore::new(SimConfig::default()).unwrap();
            store.dispatch(Command::CreateBusiness(setup("Twin"))).unwrap();
            store.dispatch(Command::Resume).unwrap();
            for _ in 0..24 {
                store.dispatch(Command::Tick).unwrap();
            }
            store.state()
        };
        assert_eq!(*run(), *run());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]
        #[test]
        fn autopilot_runs_keep_invariants(seed in any::<u64>(), stage in 0usize..5) {
            let cfg = SimConfig { rng_seed: seed, ..SimConfig::default() };
            let mut store = GameStateStore::new(cfg).unwrap();
            store.dispatch(Command::CreateBusiness(BusinessSetup {
                name: "Prop".into(),
                industry: Industry::Ecommerce,
                stage: FundingStage::ALL[stage],
                starting_cash: None,
            })).unwrap();
            store.dispatch(Command::Resume).unwrap();
            for _ in 0..36 {
                let s = store.dispatch(Command::Tick).unwrap();
                let pending = s.decisions.first().cloned();
                if let (Some(d), Some(b)) = (pending, s.business.as_ref()) {
                    if let Some(option_id) = sim_ai::recommend(&d, b) {
                        store.dispatch(Command::ResolveDecision { decision_id: d.id, option_id }).unwrap();
                    }
                }
                let s = store.state();
                prop_assert!(validate_state(&s).is_ok());
                let m = s.metrics.as_ref().unwrap();
                prop_assert!(m.market_share >= Decimal::ZERO && m.market_share <= Decimal::ONE);
                prop_assert!(s.business.as_ref().unwrap().cash >= Decimal::ZERO);
            }
        }
    }
}
