use super::*;

#[test]
fn test_defaults_match_protocol_constants() {
    let config = ClientConfig::default();

    assert_eq!(config.connection.session_timeout_ms, 60_000);
    assert_eq!(config.connection.live_instance_create_retries, 15);
    assert_eq!(config.connection.live_instance_retry_delay_ms, 1000);
    assert_eq!(config.connection.message_seen_ttl_ms, 10_000);
    assert_eq!(config.connection.message_gc_interval_ms, 5000);
    assert_eq!(config.connection.current_state_probe_interval_ms, 10_000);

    assert_eq!(config.retry.coordinator.max_retries, 0);
    assert_eq!(config.retry.coordinator.base_delay_ms, 10);
    assert_eq!(config.retry.coordinator.max_delay_ms, 1000);
}

#[test]
fn test_default_config_validates() {
    assert!(ClientConfig::default().validate().is_ok());
}

#[test]
fn test_gc_interval_must_fit_inside_ttl() {
    let mut config = ClientConfig::default();
    config.connection.message_gc_interval_ms = 20_000;
    config.connection.message_seen_ttl_ms = 10_000;

    assert!(config.validate().is_err());
}

#[test]
fn test_backoff_delay_progression_validated() {
    let mut config = ClientConfig::default();
    config.retry.coordinator.base_delay_ms = 1000;
    config.retry.coordinator.max_delay_ms = 100;

    assert!(config.validate().is_err());
}

#[test]
fn test_zero_session_timeout_rejected() {
    let mut config = ClientConfig::default();
    config.connection.session_timeout_ms = 0;

    assert!(config.validate().is_err());
}
