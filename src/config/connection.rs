use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Coordinator session and component timing parameters.
///
/// Defaults reproduce the reference client's behavior: a one-minute session,
/// fifteen one-second attempts to reclaim a live-instance node, a ten-second
/// duplicate-message horizon swept every five seconds, and a ten-second
/// liveness probe on watched current-state nodes.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct ConnectionConfig {
    /// Coordinator session timeout (unit: milliseconds)
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,

    /// Attempts to create the live-instance ephemeral while the previous
    /// session's node is still being reaped (0 means a single attempt)
    #[serde(default = "default_live_instance_create_retries")]
    pub live_instance_create_retries: usize,

    /// Delay between live-instance create attempts (unit: milliseconds)
    #[serde(default = "default_live_instance_retry_delay_ms")]
    pub live_instance_retry_delay_ms: u64,

    /// How long a processed message id stays in the dedupe cache
    /// (unit: milliseconds)
    #[serde(default = "default_message_seen_ttl_ms")]
    pub message_seen_ttl_ms: u64,

    /// Tick of the dedupe-cache sweep (unit: milliseconds)
    #[serde(default = "default_message_gc_interval_ms")]
    pub message_gc_interval_ms: u64,

    /// Tick of the spectator's current-state watch liveness probe
    /// (unit: milliseconds)
    #[serde(default = "default_current_state_probe_interval_ms")]
    pub current_state_probe_interval_ms: u64,

    /// Capacity of the spectator's change-notification channel
    #[serde(default = "default_notification_queue_size")]
    pub notification_queue_size: usize,

    /// Capacity of the participant's message-snapshot channel
    #[serde(default = "default_snapshot_queue_size")]
    pub snapshot_queue_size: usize,

    /// Capacity of the spectator's recently-observed message-id cache
    #[serde(default = "default_received_message_cache_size")]
    pub received_message_cache_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            session_timeout_ms: default_session_timeout_ms(),
            live_instance_create_retries: default_live_instance_create_retries(),
            live_instance_retry_delay_ms: default_live_instance_retry_delay_ms(),
            message_seen_ttl_ms: default_message_seen_ttl_ms(),
            message_gc_interval_ms: default_message_gc_interval_ms(),
            current_state_probe_interval_ms: default_current_state_probe_interval_ms(),
            notification_queue_size: default_notification_queue_size(),
            snapshot_queue_size: default_snapshot_queue_size(),
            received_message_cache_size: default_received_message_cache_size(),
        }
    }
}

impl ConnectionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.session_timeout_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "connection: session_timeout_ms cannot be 0".to_string(),
            )));
        }

        if self.live_instance_retry_delay_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "connection: live_instance_retry_delay_ms cannot be 0".to_string(),
            )));
        }

        // The sweep must run at least once inside the dedupe horizon or
        // duplicate suppression degrades to the snapshot cadence.
        if self.message_gc_interval_ms > self.message_seen_ttl_ms {
            return Err(Error::Config(ConfigError::Message(format!(
                "connection: message_gc_interval_ms({}) must not exceed message_seen_ttl_ms({})",
                self.message_gc_interval_ms, self.message_seen_ttl_ms
            ))));
        }

        if self.notification_queue_size == 0 || self.snapshot_queue_size == 0 {
            return Err(Error::Config(ConfigError::Message(
                "connection: channel capacities cannot be 0".to_string(),
            )));
        }

        if self.received_message_cache_size == 0 {
            return Err(Error::Config(ConfigError::Message(
                "connection: received_message_cache_size cannot be 0".to_string(),
            )));
        }

        Ok(())
    }
}

fn default_session_timeout_ms() -> u64 {
    60_000
}
fn default_live_instance_create_retries() -> usize {
    15
}
fn default_live_instance_retry_delay_ms() -> u64 {
    1000
}
fn default_message_seen_ttl_ms() -> u64 {
    10_000
}
fn default_message_gc_interval_ms() -> u64 {
    5000
}
fn default_current_state_probe_interval_ms() -> u64 {
    10_000
}
fn default_notification_queue_size() -> usize {
    100
}
fn default_snapshot_queue_size() -> usize {
    100
}
fn default_received_message_cache_size() -> usize {
    1024
}
