//! ---
//! ml_section: "03-session-management"
//! ml_subsection: "module"
//! ml_type: "source"
//! ml_scope: "code"
//! ml_description: "Device session lifecycle, reconnection and dispatch."
//! ml_version: "v0.1.0"
//! ml_owner: "tbd"
//! ---
use std::time::Duration;

use motionlink_common::ReconnectConfig;

/// Bounded, fixed-delay reconnection after an unexpected closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Retries allowed before giving up until a manual reconnect.
    pub max_attempts: u32,
    /// Wait between a closure and the next attempt.
    pub delay: Duration,
}

impl ReconnectPolicy {
    /// Build a policy.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Never retry automatically.
    pub fn disabled() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Whether another retry may be scheduled after `attempts` retries.
    pub fn allows(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

impl From<&ReconnectConfig> for ReconnectPolicy {
    fn from(config: &ReconnectConfig) -> Self {
        Self::new(config.max_attempts, config.delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_budget_is_three_retries_two_seconds_apart() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay, Duration::from_secs(2));
        assert!(policy.allows(0));
        assert!(policy.allows(2));
        assert!(!policy.allows(3));
        assert!(!ReconnectPolicy::disabled().allows(0));
    }

    #[test]
    fn built_from_client_config() {
        let config = ReconnectConfig {
            max_attempts: 5,
            delay: Duration::from_millis(250),
            ..Default::default()
        };
        assert_eq!(
            ReconnectPolicy::from(&config),
            ReconnectPolicy::new(5, Duration::from_millis(250))
        );
    }
}
