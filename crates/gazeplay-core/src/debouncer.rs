//! Hysteresis Debouncer
//!
//! Two-state machine (Looking/Away) with asymmetric dwell requirements.
//! `Idle` is a one-shot startup sentinel: it is left on the first commit and
//! never re-entered.
//!
//! Dwell is a sliding requirement. An observation that agrees with the
//! committed value slides the clock forward; a disagreeing observation only
//! commits once `now - last_flip` reaches the dwell for its direction, and
//! otherwise leaves the clock untouched.

use serde::{Deserialize, Serialize};

use crate::domain::dt_us;

/// Attention state owned by the debouncer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttentionState {
    /// Before the first commit
    #[default]
    Idle,
    Looking,
    Away,
}

impl AttentionState {
    pub fn is_looking(&self) -> bool {
        matches!(self, Self::Looking)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DebounceClock {
    /// Set by the first event the engine sees.
    pub last_flip_us: Option<i64>,
    pub committed: bool,
}

/// A committed state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Commit {
    pub previous: AttentionState,
    pub new: AttentionState,
    /// Committed raw value: `true` for Looking.
    pub attending: bool,
}

#[derive(Debug, Clone)]
pub struct HysteresisDebouncer {
    state: AttentionState,
    clock: DebounceClock,
    /// Last raw value seen while still `Idle`.
    idle_last_raw: Option<bool>,
    on_delay_us: u64,
    off_delay_us: u64,
}

impl HysteresisDebouncer {
    pub fn new(on_delay_us: u64, off_delay_us: u64) -> Self {
        Self {
            state: AttentionState::Idle,
            clock: DebounceClock::default(),
            idle_last_raw: None,
            on_delay_us,
            off_delay_us,
        }
    }

    /// Start the dwell clock if it is not running yet.
    pub fn anchor(&mut self, now_us: i64) {
        self.clock.last_flip_us.get_or_insert(now_us);
    }

    /// Feed one raw observation. Returns the commit, if any.
    pub fn observe(&mut self, attending: bool, now_us: i64) -> Option<Commit> {
        self.anchor(now_us);

        if self.state == AttentionState::Idle {
            // Nothing is committed yet, so every observation is pending.
            // A reversal restarts the dwell for the new direction.
            if self.idle_last_raw == Some(!attending) {
                self.clock.last_flip_us = Some(now_us);
            }
            self.idle_last_raw = Some(attending);
        } else if attending == self.clock.committed {
            self.clock.last_flip_us = Some(now_us);
            return None;
        }

        let required = if attending {
            self.on_delay_us
        } else {
            self.off_delay_us
        };
        let last = self.clock.last_flip_us.unwrap_or(now_us);
        if dt_us(now_us, last) < required {
            return None;
        }

        Some(self.commit(attending, now_us))
    }

    /// Commit `Away` immediately, bypassing dwell. `None` if already Away.
    pub fn force_away(&mut self, now_us: i64) -> Option<Commit> {
        if self.state == AttentionState::Away {
            return None;
        }
        Some(self.commit(false, now_us))
    }

    /// Restart the dwell clock so the next transition needs a full dwell.
    pub fn rearm(&mut self, now_us: i64) {
        self.clock.last_flip_us = Some(now_us);
    }

    fn commit(&mut self, attending: bool, now_us: i64) -> Commit {
        let previous = self.state;
        self.state = if attending {
            AttentionState::Looking
        } else {
            AttentionState::Away
        };
        self.clock.committed = attending;
        self.clock.last_flip_us = Some(now_us);
        self.idle_last_raw = None;
        Commit {
            previous,
            new: self.state,
            attending,
        }
    }

    pub fn state(&self) -> AttentionState {
        self.state
    }

    pub fn clock(&self) -> DebounceClock {
        self.clock
    }
}
