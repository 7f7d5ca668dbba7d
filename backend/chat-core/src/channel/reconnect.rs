use crate::config::ReconnectPolicy;

use std::time::Duration;

/// Backoff counters carried by the manager between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectState {
    pub attempt: u32,
    pub next_delay: Duration,
}

impl ReconnectState {
    /// `(0, base_delay)`: the state after every successful open.
    pub fn initial(policy: &ReconnectPolicy) -> Self {
        Self {
            attempt: 0,
            next_delay: policy.base_delay(),
        }
    }

    /// Record one more failure.
    ///
    /// Returns `None` once `max_attempts` retries have already been spent.
    /// Otherwise `attempt` grows by one and the delay becomes
    /// `base_delay * 2^attempt`.
    pub fn advance(self, policy: &ReconnectPolicy) -> Option<Self> {
        if self.attempt >= policy.max_attempts {
            return None;
        }

        let attempt = self.attempt + 1;
        Some(Self {
            attempt,
            next_delay: backoff_delay(policy.base_delay(), attempt),
        })
    }

    pub fn is_initial(&self) -> bool {
        self.attempt == 0
    }
}

fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    base.saturating_mul(factor)
}
