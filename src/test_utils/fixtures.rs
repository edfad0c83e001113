//! Cluster fixtures and polling helpers for the scenario tests.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use tokio::time::sleep;

use super::MemoryEnsemble;
use crate::admin::Admin;
use crate::config::ClientConfig;
use crate::coordinator::Connection;
use crate::coordinator::Connector;
use crate::manager::Manager;

pub const TEST_ENDPOINT: &str = "memory:2181";

/// Default configuration with timings shrunk to test scale.
pub fn test_config() -> ClientConfig {
    let mut config = ClientConfig::default();
    config.connection.live_instance_retry_delay_ms = 20;
    config.connection.message_gc_interval_ms = 50;
    config.connection.message_seen_ttl_ms = 100;
    config.connection.current_state_probe_interval_ms = 50;
    config.retry.coordinator.base_delay_ms = 1;
    config.retry.coordinator.max_delay_ms = 10;
    config
}

pub fn test_manager(ensemble: &MemoryEnsemble) -> Manager {
    Manager::with_config(TEST_ENDPOINT, ensemble.connector(), test_config())
}

/// Creates the cluster layout and enables participant auto-join.
pub async fn setup_cluster(
    ensemble: &MemoryEnsemble,
    cluster: &str,
) -> Admin {
    let admin = test_manager(ensemble).admin();
    assert!(admin.add_cluster(cluster).await.expect("add cluster"));

    let mut properties = HashMap::new();
    properties.insert("allowParticipantAutoJoin".to_string(), "true".to_string());
    admin
        .set_config(cluster, "CLUSTER", &properties)
        .await
        .expect("enable auto join");

    admin
}

/// A standalone connection for test-side reads and writes.
pub async fn open_connection(ensemble: &MemoryEnsemble) -> Connection {
    let connector = ensemble.connector();
    Connection::open(
        connector.as_ref() as &dyn Connector,
        TEST_ENDPOINT,
        &test_config(),
    )
    .await
    .expect("open connection")
}

/// Polls `condition` every 10 ms until it holds or `deadline` passes.
pub async fn wait_until<F, Fut>(
    deadline: Duration,
    mut condition: F,
) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let started = Instant::now();
    loop {
        if condition().await {
            return true;
        }
        if started.elapsed() > deadline {
            return false;
        }
        sleep(Duration::from_millis(10)).await;
    }
}

/// Convenience for asserting on spawned-listener side effects.
pub fn shared_vec<T>() -> Arc<parking_lot::Mutex<Vec<T>>> {
    Arc::new(parking_lot::Mutex::new(Vec::new()))
}
