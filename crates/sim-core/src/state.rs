//! The immutable game-state snapshot published to subscribers.

use crate::business::{Business, BusinessId, FundingStage, Industry};
use crate::config::SimConfig;
use crate::decision::{Decision, DecisionId, ResolvedDecision, Urgency};
use crate::event::Event;
use crate::ledger::FinancialRecord;
use crate::metrics::BusinessMetrics;
use crate::rng::SimRng;
use crate::time::{ClockError, SimulationClock, TimeControls};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A rival company in the same market.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competitor {
    /// Name.
    pub name: String,
    /// Share of the addressable market in [0, 1].
    pub market_share: Decimal,
    /// Funding stage.
    pub stage: FundingStage,
}

impl Competitor {
    /// Starting competitors for an industry.
    pub fn roster(industry: Industry) -> Vec<Competitor> {
        let entries: [(&str, i64, FundingStage); 3] = match industry {
            Industry::Tech => [
                ("Byteforge", 18, FundingStage::SeriesB),
                ("Nimbus Labs", 12, FundingStage::SeriesA),
                ("Quanta", 6, FundingStage::Seed),
            ],
            Industry::Ecommerce => [
                ("Cartwheel", 22, FundingStage::SeriesB),
                ("ShopSprout", 10, FundingStage::SeriesA),
                ("Parcelly", 5, FundingStage::Seed),
            ],
            Industry::Service => [
                ("Northbridge Partners", 15, FundingStage::Bootstrapped),
                ("Clearpath Advisory", 9, FundingStage::Angel),
                ("Helm & Co", 4, FundingStage::Bootstrapped),
            ],
            Industry::Manufacturing => [
                ("Ironclad Works", 25, FundingStage::SeriesB),
                ("Forgeline", 11, FundingStage::SeriesA),
                ("Tinker Fabrication", 3, FundingStage::Angel),
            ],
        };
        entries
            .into_iter()
            .map(|(name, pct, stage)| Competitor {
                name: name.to_string(),
                market_share: Decimal::new(pct, 2),
                stage,
            })
            .collect()
    }
}

/// What a mentor comments on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdviceTopic {
    /// Cash runway.
    Runway,
    /// Spending vs revenue.
    Burn,
    /// Product maturity.
    Product,
    /// Customer and revenue growth.
    Growth,
    /// Competitive pressure.
    Competition,
    /// Raising money.
    Fundraising,
}

/// One piece of mentor advice.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentorAdvice {
    /// Topic.
    pub topic: AdviceTopic,
    /// How pressing it is.
    pub priority: Urgency,
    /// Text shown to the player.
    pub message: String,
}

/// Modal and loading flags for the UI.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiFlags {
    /// Business-setup dialog is open.
    pub show_business_setup: bool,
    /// Decision modal is open.
    pub show_decision_modal: bool,
    /// A long-running collaborator call is in flight.
    pub is_loading: bool,
}

/// Complete session state. Published as an immutable snapshot after every
/// successful command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Active business; `None` until setup completes.
    pub business: Option<Business>,
    /// Pending decisions, in presentation order.
    pub decisions: Vec<Decision>,
    /// Resolved decisions, oldest first.
    pub resolved: Vec<ResolvedDecision>,
    /// Applied events, oldest first.
    pub events: Vec<Event>,
    /// Competitors in the business's market.
    pub competitors: Vec<Competitor>,
    /// Current mentor advice.
    pub mentor_advice: Vec<MentorAdvice>,
    /// Financial ledger, oldest first.
    pub financials: Vec<FinancialRecord>,
    /// Metrics for the active business.
    pub metrics: Option<BusinessMetrics>,
    /// Decision shown in the modal.
    pub selected_decision: Option<DecisionId>,
    /// Tick clock and time controls.
    pub clock: SimulationClock,
    /// UI flags.
    pub ui: UiFlags,
    /// Random stream for events and decisions.
    pub rng: SimRng,
    /// Next decision id to assign.
    pub next_decision_id: u64,
    /// Next event id to assign.
    pub next_event_id: u64,
    /// Player market share at the end of the previous tick.
    pub previous_share: Decimal,
}

impl GameState {
    /// Empty session with the setup dialog open.
    pub fn new(config: &SimConfig) -> Result<GameState, ClockError> {
        Ok(GameState {
            business: None,
            decisions: Vec::new(),
            resolved: Vec::new(),
            events: Vec::new(),
            competitors: Vec::new(),
            mentor_advice: Vec::new(),
            financials: Vec::new(),
            metrics: None,
            selected_decision: None,
            clock: SimulationClock::new(config.start_date, config.tick_days, config.fast_multiplier)?,
            ui: UiFlags {
                show_business_setup: true,
                ..UiFlags::default()
            },
            rng: SimRng::new(config.rng_seed),
            next_decision_id: 1,
            next_event_id: 1,
            previous_share: Decimal::ZERO,
        })
    }

    /// Current time controls.
    pub fn time_controls(&self) -> TimeControls {
        self.clock.controls()
    }

    /// Current tick.
    pub fn tick(&self) -> u64 {
        self.clock.tick()
    }

    /// Current simulated date.
    pub fn date(&self) -> NaiveDate {
        self.clock.date()
    }

    /// Id of the active business.
    pub fn business_id(&self) -> Option<&BusinessId> {
        self.business.as_ref().map(|b| &b.id)
    }

    /// Pending decision by id.
    pub fn pending(&self, id: DecisionId) -> Option<&Decision> {
        self.decisions.iter().find(|d| d.id == id)
    }

    /// Financial records booked for operating periods.
    pub fn operating_records(&self) -> impl Iterator<Item = &FinancialRecord> {
        self.financials.iter().filter(|r| r.is_operating())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rosters_leave_room_for_the_player() {
        for industry in Industry::ALL {
            let total: Decimal = Competitor::roster(industry)
                .iter()
                .map(|c| c.market_share)
                .sum();
            assert!(total < Decimal::new(5, 1));
        }
    }

    #[test]
    fn new_state_is_empty_and_paused() {
        let s = GameState::new(&SimConfig::default()).unwrap();
        assert!(s.business.is_none());
        assert!(s.time_controls().is_paused);
        assert!(s.ui.show_business_setup);
        assert_eq!(s.tick(), 0);
        assert_eq!(s.operating_records().count(), 0);
    }
}
