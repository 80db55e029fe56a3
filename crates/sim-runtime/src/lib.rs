#![deny(warnings)]

//! Runtime for Startup Tycoon.
//!
//! Owns the moving parts around the pure models: the event generator, the
//! decision deck, the authoritative [`GameStateStore`] and the async queue
//! and clock driver that feed it.

pub mod config;
pub mod decisions;
pub mod events;
pub mod handle;
pub mod store;

pub use config::{load_config, parse_config, ConfigError};
pub use decisions::DecisionDeck;
pub use events::{EventContext, EventGenerator};
pub use handle::{ClockDriver, CommandSender, HandleError, StoreHandle};
pub use store::{Command, GameStateStore, StoreError, Subscriber, SubscriptionId};

use sim_core::GameState;
use std::sync::Arc;

/// Resume the clock and run `ticks` ticks in place, returning the final snapshot.
pub fn run_ticks(store: &mut GameStateStore, ticks: u64) -> Result<Arc<GameState>, StoreError> {
    let mut state = store.dispatch(Command::Resume)?;
    for _ in 0..ticks {
        state = store.dispatch(Command::Tick)?;
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::{BusinessSetup, FundingStage, Industry, SimConfig};

    #[test]
    fn run_ticks_advances_a_year() {
        let mut store = GameStateStore::new(SimConfig::default()).unwrap();
        store
            .dispatch(Command::CreateBusiness(BusinessSetup {
                name: "Yearly".into(),
                industry: Industry::Manufacturing,
                stage: FundingStage::SeriesA,
                starting_cash: None,
            }))
            .unwrap();
        let s = run_ticks(&mut store, 12).unwrap();
        assert_eq!(s.tick(), 12);
        assert_eq!(s.operating_records().count(), 12);
        assert!(!s.time_controls().is_paused);
    }
}
