//! Timing contract for authentication attempts

use std::time::Duration;

/// Intervals governing one attempt and the sequential driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowTiming {
    /// How often the surface is checked for closure
    pub poll_interval: Duration,
    /// Pause between detecting closure and querying the backend
    pub settle_delay: Duration,
    /// Absolute deadline measured from the moment the surface is requested
    pub timeout: Duration,
    /// Gap the sequential driver leaves after each attempt
    pub inter_attempt_delay: Duration,
}

impl Default for FlowTiming {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            settle_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(300),
            inter_attempt_delay: Duration::from_secs(2),
        }
    }
}

/// Longest interval accepted for any timing value (one day)
pub const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

impl FlowTiming {
    /// Clamp values into a usable range.
    ///
    /// Zero intervals would spin the poll loop, so they become one
    /// millisecond. Anything above [`MAX_INTERVAL`] is capped so deadlines
    /// stay representable as an `Instant`.
    pub fn normalized(mut self) -> Self {
        let floor = Duration::from_millis(1);
        self.poll_interval = self.poll_interval.clamp(floor, MAX_INTERVAL);
        self.timeout = self.timeout.clamp(floor, MAX_INTERVAL);
        self.settle_delay = self.settle_delay.min(MAX_INTERVAL);
        self.inter_attempt_delay = self.inter_attempt_delay.min(MAX_INTERVAL);
        self
    }
}
