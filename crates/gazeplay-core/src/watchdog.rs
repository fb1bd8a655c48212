//! Face-loss watchdog.
//!
//! Runs on its own fixed period. When no usable face has been seen for
//! longer than the timeout the engine injects a "not attending"
//! observation and drops the estimator's fast-path confidence.

use crate::domain::dt_us;

#[derive(Debug, Clone)]
pub struct Watchdog {
    period_us: u64,
    face_loss_timeout_us: u64,
    last_face_seen_us: Option<i64>,
}

impl Watchdog {
    pub fn new(period_us: u64, face_loss_timeout_us: u64) -> Self {
        Self {
            period_us,
            face_loss_timeout_us,
            last_face_seen_us: None,
        }
    }

    /// Start the face-loss timer if nothing has been seen yet.
    pub fn anchor(&mut self, now_us: i64) {
        self.last_face_seen_us.get_or_insert(now_us);
    }

    pub fn face_seen(&mut self, now_us: i64) {
        self.last_face_seen_us = Some(now_us);
    }

    /// Strictly longer than the timeout since the last usable face.
    pub fn face_lost(&self, now_us: i64) -> bool {
        match self.last_face_seen_us {
            Some(last) => dt_us(now_us, last) > self.face_loss_timeout_us,
            None => false,
        }
    }

    pub fn period_us(&self) -> u64 {
        self.period_us
    }

    pub fn last_face_seen_us(&self) -> Option<i64> {
        self.last_face_seen_us
    }
}
