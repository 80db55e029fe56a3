//! Simulated time: pause/speed controls and the tick clock.
//!
//! Speed scales the simulated days covered by one tick; the wall-clock tick
//! interval is the same at every speed. That keeps a run fully determined by
//! its command sequence.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Playback speed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speed {
    /// One tick covers `tick_days`.
    #[default]
    Normal,
    /// One tick covers `tick_days * fast_multiplier`.
    Fast,
}

/// User-facing time controls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeControls {
    /// Whether ticks are currently ignored.
    pub is_paused: bool,
    /// Playback speed.
    pub speed: Speed,
}

impl Default for TimeControls {
    fn default() -> Self {
        TimeControls {
            is_paused: true,
            speed: Speed::Normal,
        }
    }
}

/// Clock state derived from the controls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockState {
    /// Ticks are no-ops.
    Paused,
    /// Running at normal speed.
    RunningNormal,
    /// Running at fast speed.
    RunningFast,
}

/// Errors that can occur during clock operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow")]
    TickOverflow,
    /// Simulated date would leave the supported calendar range.
    #[error("simulated date overflow")]
    DateOverflow,
    /// Invalid time configuration.
    #[error("invalid clock configuration: {reason}")]
    InvalidConfig {
        /// What is wrong.
        reason: String,
    },
}

/// A completed clock advance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockTick {
    /// New tick number.
    pub tick: u64,
    /// New simulated date.
    pub date: NaiveDate,
    /// Simulated days covered by this tick.
    pub elapsed_days: u32,
}

/// Tick counter and simulated calendar under pause/speed controls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationClock {
    tick: u64,
    date: NaiveDate,
    controls: TimeControls,
    tick_days: u16,
    fast_multiplier: u16,
}

impl SimulationClock {
    /// Create a paused clock at tick 0.
    pub fn new(start: NaiveDate, tick_days: u16, fast_multiplier: u16) -> Result<Self, ClockError> {
        if tick_days == 0 {
            return Err(ClockError::InvalidConfig {
                reason: "tick_days must be at least 1".to_string(),
            });
        }
        if fast_multiplier == 0 {
            return Err(ClockError::InvalidConfig {
                reason: "fast_multiplier must be at least 1".to_string(),
            });
        }
        Ok(SimulationClock {
            tick: 0,
            date: start,
            controls: TimeControls::default(),
            tick_days,
            fast_multiplier,
        })
    }

    /// Current tick.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Current simulated date.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Current controls.
    pub fn controls(&self) -> TimeControls {
        self.controls
    }

    /// State derived from the controls.
    pub fn state(&self) -> ClockState {
        match (self.controls.is_paused, self.controls.speed) {
            (true, _) => ClockState::Paused,
            (false, Speed::Normal) => ClockState::RunningNormal,
            (false, Speed::Fast) => ClockState::RunningFast,
        }
    }

    /// Pause. Returns false when already paused.
    pub fn pause(&mut self) -> bool {
        let changed = !self.controls.is_paused;
        self.controls.is_paused = true;
        changed
    }

    /// Resume. Returns false when already running.
    pub fn resume(&mut self) -> bool {
        let changed = self.controls.is_paused;
        self.controls.is_paused = false;
        changed
    }

    /// Change speed. Returns false when unchanged.
    pub fn set_speed(&mut self, speed: Speed) -> bool {
        let changed = self.controls.speed != speed;
        self.controls.speed = speed;
        changed
    }

    /// Replace both controls at once. Returns false when unchanged.
    pub fn set_controls(&mut self, controls: TimeControls) -> bool {
        let changed = self.controls != controls;
        self.controls = controls;
        changed
    }

    /// Simulated days covered by one tick at the current speed.
    pub fn days_per_tick(&self) -> u32 {
        let base = u32::from(self.tick_days);
        match self.controls.speed {
            Speed::Normal => base,
            Speed::Fast => base.saturating_mul(u32::from(self.fast_multiplier)),
        }
    }

    /// Advance one tick. Returns `None` while paused.
    ///
    /// Tick and date move together or not at all.
    pub fn advance(&mut self) -> Result<Option<ClockTick>, ClockError> {
        if self.controls.is_paused {
            return Ok(None);
        }
        let elapsed_days = self.days_per_tick();
        let tick = self.tick.checked_add(1).ok_or(ClockError::TickOverflow)?;
        let date = self
            .date
            .checked_add_days(Days::new(u64::from(elapsed_days)))
            .ok_or(ClockError::DateOverflow)?;
        self.tick = tick;
        self.date = date;
        Ok(Some(ClockTick {
            tick,
            date,
            elapsed_days,
        }))
    }

    /// Rewind to tick 0 at `start`, keeping the controls.
    pub fn restart(&mut self, start: NaiveDate) {
        self.tick = 0;
        self.date = start;
    }
}
