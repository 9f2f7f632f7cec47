//! Navigator timing.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing for optimistic navigation and hover prefetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorConfig {
    /// Longest a click waits for data before navigating anyway.
    pub deadline_ms: u64,
    /// Hover time before a prefetch starts.
    pub prefetch_delay_ms: u64,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            deadline_ms: 1000,
            prefetch_delay_ms: 200,
        }
    }
}

impl NavigatorConfig {
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline_ms = deadline.as_millis() as u64;
        self
    }

    pub fn with_prefetch_delay(mut self, delay: Duration) -> Self {
        self.prefetch_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    pub fn prefetch_delay(&self) -> Duration {
        Duration::from_millis(self.prefetch_delay_ms)
    }
}
