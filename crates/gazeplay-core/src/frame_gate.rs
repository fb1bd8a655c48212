//! Frame Gate
//!
//! Rate-limits frame notifications arriving at camera rate. Dropping is
//! silent and never blocks the producer.

use crate::domain::dt_us;

#[derive(Debug, Clone)]
pub struct FrameGate {
    min_interval_us: u64,
    last_processed_us: Option<i64>,
    admitted: u64,
    dropped: u64,
}

impl FrameGate {
    pub fn new(min_interval_us: u64) -> Self {
        Self {
            min_interval_us,
            last_processed_us: None,
            admitted: 0,
            dropped: 0,
        }
    }

    /// Returns `true` if the frame at `now_us` should be processed.
    pub fn admit(&mut self, now_us: i64) -> bool {
        if let Some(last) = self.last_processed_us {
            if dt_us(now_us, last) < self.min_interval_us {
                self.dropped += 1;
                return false;
            }
        }
        self.last_processed_us = Some(now_us);
        self.admitted += 1;
        true
    }

    pub fn admitted(&self) -> u64 {
        self.admitted
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
