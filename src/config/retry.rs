use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Exponential backoff parameters for retried coordinator operations.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct BackoffPolicy {
    /// Attempt limit; 0 means retry until the session itself gives out
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// First delay, milliseconds; doubles on every retry
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Delay ceiling, milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Retry strategy configurations per operation family.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct RetryPolicies {
    /// Retry policy for raw coordinator operations. Transient transport
    /// failures are retried forever by default (10 ms base, 1 s cap); the
    /// session timeout is the effective bound.
    #[serde(default)]
    pub coordinator: BackoffPolicy,
}

impl Default for RetryPolicies {
    fn default() -> Self {
        RetryPolicies {
            coordinator: BackoffPolicy::default(),
        }
    }
}

impl BackoffPolicy {
    pub fn validate(
        &self,
        policy_name: &str,
    ) -> Result<()> {
        if self.base_delay_ms == 0 {
            return Err(Error::Config(ConfigError::Message(format!(
                "{policy_name}: base_delay_ms cannot be 0"
            ))));
        }

        if self.base_delay_ms >= self.max_delay_ms {
            return Err(Error::Config(ConfigError::Message(format!(
                "{policy_name}: base_delay_ms({}) must be less than max_delay_ms({})",
                self.base_delay_ms, self.max_delay_ms
            ))));
        }

        // two minutes between attempts already exceeds any session timeout
        if self.max_delay_ms > 120_000 {
            return Err(Error::Config(ConfigError::Message(format!(
                "{policy_name}: max_delay_ms({}) exceeds 2min limit",
                self.max_delay_ms
            ))));
        }

        Ok(())
    }
}

impl RetryPolicies {
    pub fn validate(&self) -> Result<()> {
        self.coordinator.validate("coordinator")?;

        Ok(())
    }
}

fn default_max_retries() -> usize {
    0
}
fn default_base_delay_ms() -> u64 {
    10
}
fn default_max_delay_ms() -> u64 {
    1000
}
