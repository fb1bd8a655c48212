//! Playback Dispatcher
//!
//! Turns committed transitions into Play/Pause commands against whatever
//! [`PlaybackSink`] configuration selected. A single throttle window is
//! shared by both command kinds so a flapping-but-committing signal cannot
//! produce a rapid Play-then-Pause double toggle.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::dt_us;
use crate::sinks::PlaybackSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackCommand {
    Play,
    Pause,
}

impl PlaybackCommand {
    pub fn for_attending(attending: bool) -> Self {
        if attending {
            Self::Play
        } else {
            Self::Pause
        }
    }
}

impl fmt::Display for PlaybackCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Play => f.write_str("play"),
            Self::Pause => f.write_str("pause"),
        }
    }
}

/// What the dispatcher did with a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchDecision {
    /// Handed to the sink
    Sent,
    /// Inside the shared throttle window; the sink was not invoked
    Throttled,
    /// Dispatch is halted (engine disabled)
    Halted,
}

pub struct PlaybackDispatcher {
    sink: Arc<dyn PlaybackSink>,
    min_interval_us: u64,
    last_dispatched_us: Option<i64>,
    halted: bool,
    sent: u64,
    suppressed: u64,
}

impl fmt::Debug for PlaybackDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackDispatcher")
            .field("sink", &self.sink.name())
            .field("min_interval_us", &self.min_interval_us)
            .field("last_dispatched_us", &self.last_dispatched_us)
            .field("halted", &self.halted)
            .finish()
    }
}

impl PlaybackDispatcher {
    pub fn new(sink: Arc<dyn PlaybackSink>, min_interval_us: u64) -> Self {
        Self {
            sink,
            min_interval_us,
            last_dispatched_us: None,
            halted: false,
            sent: 0,
            suppressed: 0,
        }
    }

    pub fn dispatch(&mut self, command: PlaybackCommand, now_us: i64) -> DispatchDecision {
        if self.halted {
            self.suppressed += 1;
            return DispatchDecision::Halted;
        }
        if let Some(last) = self.last_dispatched_us {
            if dt_us(now_us, last) < self.min_interval_us {
                self.suppressed += 1;
                info!(%command, since_last_us = dt_us(now_us, last), "command throttled");
                return DispatchDecision::Throttled;
            }
        }

        // Bookkeeping happens before delivery: a failing sink must not
        // reopen the throttle window.
        self.last_dispatched_us = Some(now_us);
        self.sent += 1;
        info!(%command, sink = self.sink.name(), "dispatching");
        if let Err(e) = self.sink.deliver(command) {
            warn!(%command, sink = self.sink.name(), error = %e, "playback dispatch failed");
        }
        DispatchDecision::Sent
    }

    pub fn halt(&mut self) {
        self.halted = true;
    }

    pub fn resume(&mut self) {
        self.halted = false;
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }
}
