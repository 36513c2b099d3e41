//! Frame scheduler.
//!
//! The host calls [`crate::FlockWorld::frame`] once per display refresh. The
//! scheduler decides whether a simulation tick runs (only while running) and
//! advances two wall-clock timers that fire regardless of pause state: the
//! leader signal broadcast and the plot refresh.

use crate::config::SimConfig;
use serde::{Deserialize, Serialize};

/// Whether frames run simulation ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    #[default]
    Running,
    Paused,
}

/// Repeating timer driven by frame deltas.
///
/// Accumulates in `f64` so long runs at small deltas do not drift.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodicTimer {
    interval: f64,
    elapsed: f64,
}

impl PeriodicTimer {
    pub fn from_millis(ms: u64) -> Self {
        Self {
            interval: ms.max(1) as f64 / 1000.0,
            elapsed: 0.0,
        }
    }

    /// Advance by `dt` seconds and return how many times the timer fired.
    ///
    /// Negative or non-finite deltas are ignored.
    pub fn advance(&mut self, dt: f32) -> u32 {
        if !dt.is_finite() || dt <= 0.0 {
            return 0;
        }
        self.elapsed += dt as f64;
        let mut fired = 0;
        while self.elapsed >= self.interval {
            self.elapsed -= self.interval;
            fired += 1;
        }
        fired
    }
}

/// What a single frame did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameReport {
    /// Tick counter after the frame.
    pub tick: u64,
    /// Whether a simulation tick ran.
    pub ran: bool,
    /// Prey removed during the tick.
    pub eaten: usize,
    /// Leader signal broadcasts performed this frame.
    pub signal_broadcasts: u32,
    /// The plot should be redrawn.
    pub plot_due: bool,
}

/// Run state plus the two periodic timers.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    state: RunState,
    signal_timer: PeriodicTimer,
    plot_timer: PeriodicTimer,
}

impl FrameScheduler {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            state: RunState::Running,
            signal_timer: PeriodicTimer::from_millis(config.signal_interval_ms),
            plot_timer: PeriodicTimer::from_millis(config.plot_interval_ms),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    pub fn pause(&mut self) {
        self.state = RunState::Paused;
    }

    pub fn resume(&mut self) {
        self.state = RunState::Running;
    }

    /// Flip between running and paused, returning the new state.
    pub fn toggle(&mut self) -> RunState {
        self.state = match self.state {
            RunState::Running => RunState::Paused,
            RunState::Paused => RunState::Running,
        };
        self.state
    }

    /// Advance both timers. Returns `(signal broadcasts due, plot due)`.
    pub fn advance_timers(&mut self, dt: f32) -> (u32, bool) {
        let signals = self.signal_timer.advance(dt);
        let plot = self.plot_timer.advance(dt) > 0;
        (signals, plot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_fires_on_interval() {
        let mut timer = PeriodicTimer::from_millis(500);
        let fired: u32 = (0..64).map(|_| timer.advance(1.0 / 32.0)).sum();
        assert_eq!(fired, 4);
    }

    #[test]
    fn test_timer_catches_up_after_long_frame() {
        let mut timer = PeriodicTimer::from_millis(500);
        assert_eq!(timer.advance(1.25), 2);
        assert_eq!(timer.advance(0.25), 1);
        assert_eq!(timer.advance(-1.0), 0);
        assert_eq!(timer.advance(f32::NAN), 0);
    }

    #[test]
    fn test_toggle_pause() {
        let mut scheduler = FrameScheduler::new(&SimConfig::default());
        assert!(scheduler.is_running());
        assert_eq!(scheduler.toggle(), RunState::Paused);
        assert_eq!(scheduler.toggle(), RunState::Running);
        scheduler.pause();
        assert_eq!(scheduler.state(), RunState::Paused);
        scheduler.resume();
        assert!(scheduler.is_running());
    }

    #[test]
    fn test_timers_independent() {
        let mut scheduler = FrameScheduler::new(&SimConfig::default());
        assert_eq!(scheduler.advance_timers(0.5), (1, false));
        assert_eq!(scheduler.advance_timers(0.5), (1, true));
    }
}
