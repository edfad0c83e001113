//! Session wrapper over the raw [`Coordinator`] client.
//!
//! Adds the behavior every role needs: retry-with-backoff on transient
//! transport failures, versioned read-modify-write for record updates,
//! recursive deletes, ancestor creation, and record-level helpers.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::broadcast;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::debug;

use super::api::Connector;
use super::api::Coordinator;
use super::api::CreateMode;
use super::api::SessionEvent;
use super::api::Stat;
use super::api::WatchReceiver;
use crate::config::BackoffPolicy;
use crate::config::ClientConfig;
use crate::constants::COORDINATOR_ROOT;
use crate::keys::KeyBuilder;
use crate::record::Record;
use crate::utils::backoff::retry_transient;
use crate::CoordinatorError;
use crate::Result;

pub struct Connection {
    client: Arc<dyn Coordinator>,
    retry: BackoffPolicy,
    /// Serializes get-then-set record updates within this process; cross
    /// process races are handled by the version check itself.
    write_lock: Mutex<()>,
}

impl Connection {
    /// Opens a fresh coordinator session and verifies readiness with an
    /// existence probe on the coordinator's own root.
    pub async fn open(
        connector: &dyn Connector,
        endpoint: &str,
        config: &ClientConfig,
    ) -> Result<Self> {
        let client = connector
            .connect(
                endpoint,
                Duration::from_millis(config.connection.session_timeout_ms),
            )
            .await?;

        let conn = Connection::new(client, config.retry.coordinator);
        conn.stat(COORDINATOR_ROOT).await?;
        Ok(conn)
    }

    /// Wraps an already-established session.
    pub fn new(
        client: Arc<dyn Coordinator>,
        retry: BackoffPolicy,
    ) -> Self {
        Connection {
            client,
            retry,
            write_lock: Mutex::new(()),
        }
    }

    pub fn session_id(&self) -> String {
        self.client.session_id()
    }

    pub fn session_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.client.session_events()
    }

    pub async fn close(&self) -> Result<()> {
        self.client.close().await?;
        Ok(())
    }

    // ==================== Raw node operations ====================

    pub async fn exists(
        &self,
        path: &str,
    ) -> Result<bool> {
        Ok(self.stat(path).await?.is_some())
    }

    pub async fn stat(
        &self,
        path: &str,
    ) -> Result<Option<Stat>> {
        Ok(retry_transient(self.retry, || self.client.exists(path)).await?)
    }

    pub async fn exists_all(
        &self,
        paths: &[String],
    ) -> Result<bool> {
        for path in paths {
            if !self.exists(path).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub async fn get(
        &self,
        path: &str,
    ) -> Result<Bytes> {
        Ok(self.get_with_stat(path).await?.0)
    }

    pub(crate) async fn get_with_stat(
        &self,
        path: &str,
    ) -> Result<(Bytes, Stat)> {
        Ok(retry_transient(self.retry, || self.client.get(path)).await?)
    }

    /// Read with a one-shot data watch.
    pub async fn get_watch(
        &self,
        path: &str,
    ) -> Result<(Bytes, WatchReceiver)> {
        let (data, _stat, events) =
            retry_transient(self.retry, || self.client.get_watch(path)).await?;
        Ok((data, events))
    }

    pub async fn children(
        &self,
        path: &str,
    ) -> Result<Vec<String>> {
        Ok(retry_transient(self.retry, || self.client.children(path)).await?)
    }

    /// Child listing with a one-shot child watch.
    pub async fn children_watch(
        &self,
        path: &str,
    ) -> Result<(Vec<String>, WatchReceiver)> {
        Ok(retry_transient(self.retry, || self.client.children_watch(path)).await?)
    }

    /// Create a node; `NodeExists` surfaces as a distinct error.
    pub async fn create(
        &self,
        path: &str,
        data: Bytes,
        mode: CreateMode,
    ) -> Result<()> {
        self.client.create(path, data, mode).await?;
        Ok(())
    }

    pub async fn create_empty(
        &self,
        path: &str,
    ) -> Result<()> {
        self.create(path, Bytes::new(), CreateMode::Persistent).await
    }

    pub async fn create_ephemeral(
        &self,
        path: &str,
        data: Bytes,
    ) -> Result<()> {
        self.create(path, data, CreateMode::Ephemeral).await
    }

    /// Versioned write gated on the currently observed stat; a version
    /// conflict triggers re-read and retry.
    pub async fn set_data(
        &self,
        path: &str,
        data: Bytes,
    ) -> Result<()> {
        loop {
            let _guard = self.write_lock.lock().await;
            let (_, stat) = self.get_with_stat(path).await?;
            match self.client.set(path, data.clone(), stat.version).await {
                Ok(_) => return Ok(()),
                Err(CoordinatorError::BadVersion { .. }) => {
                    debug!(%path, "version conflict on set, retrying");
                }
                Err(CoordinatorError::Transient(reason)) => {
                    debug!(%path, %reason, "transient failure on set, retrying");
                    drop(_guard);
                    sleep(Duration::from_millis(self.retry.base_delay_ms)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub async fn delete(
        &self,
        path: &str,
    ) -> Result<()> {
        self.client.delete(path, -1).await?;
        Ok(())
    }

    /// Best-effort recursive post-order delete. A path that is already gone
    /// is not an error.
    pub async fn delete_tree(
        &self,
        path: &str,
    ) -> Result<()> {
        if !self.exists(path).await? {
            return Ok(());
        }

        let mut stack = vec![path.to_string()];
        let mut order = Vec::new();
        while let Some(current) = stack.pop() {
            for child in self.children(&current).await.unwrap_or_default() {
                stack.push(format!("{current}/{child}"));
            }
            order.push(current);
        }

        for node in order.iter().rev() {
            match self.client.delete(node, -1).await {
                Ok(()) | Err(CoordinatorError::NoNode(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Creates all missing ancestors as empty nodes; idempotent.
    pub async fn ensure_path(
        &self,
        path: &str,
    ) -> Result<()> {
        if path.trim_start_matches('/').is_empty() {
            return Ok(());
        }

        let mut prefix = String::with_capacity(path.len());
        for segment in path.trim_start_matches('/').split('/') {
            prefix.push('/');
            prefix.push_str(segment);

            if self.exists(&prefix).await? {
                continue;
            }
            match self
                .client
                .create(&prefix, Bytes::new(), CreateMode::Persistent)
                .await
            {
                Ok(_) => {}
                // lost a creation race; the node exists, which is all we want
                Err(CoordinatorError::NodeExists(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    // ==================== Record-level helpers ====================

    pub async fn get_record(
        &self,
        path: &str,
    ) -> Result<Record> {
        let data = self.get(path).await?;
        Ok(Record::from_bytes(&data)?)
    }

    /// Creates the record node, creating missing ancestors first.
    pub async fn create_record(
        &self,
        path: &str,
        record: &Record,
    ) -> Result<()> {
        if let Some(parent) = parent_path(path) {
            self.ensure_path(&parent).await?;
        }
        self.create(path, record.to_bytes()?, CreateMode::Persistent).await
    }

    /// Writes the record, creating the node (and ancestors) when absent.
    pub async fn set_record(
        &self,
        path: &str,
        record: &Record,
    ) -> Result<()> {
        self.ensure_path(path).await?;
        self.set_data(path, record.to_bytes()?).await
    }

    /// Versioned read-modify-write of the record at `path`.
    pub async fn update_record<F>(
        &self,
        path: &str,
        mutate: F,
    ) -> Result<()>
    where
        F: Fn(&mut Record),
    {
        loop {
            let _guard = self.write_lock.lock().await;
            let (data, stat) = self.get_with_stat(path).await?;
            let mut record = Record::from_bytes(&data)?;
            mutate(&mut record);
            let bytes = record.to_bytes()?;

            match self.client.set(path, bytes, stat.version).await {
                Ok(_) => return Ok(()),
                Err(CoordinatorError::BadVersion { .. }) => {
                    debug!(%path, "version conflict on record update, retrying");
                }
                Err(CoordinatorError::Transient(reason)) => {
                    debug!(%path, %reason, "transient failure on record update, retrying");
                    drop(_guard);
                    sleep(Duration::from_millis(self.retry.base_delay_ms)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Upserts `map_fields[key][property] = value` on the record at `path`.
    pub async fn update_map_field(
        &self,
        path: &str,
        key: &str,
        property: &str,
        value: &str,
    ) -> Result<()> {
        self.update_record(path, |record| {
            record.set_map_field(key, property, value);
        })
        .await
    }

    pub async fn update_simple_field(
        &self,
        path: &str,
        key: &str,
        value: &str,
    ) -> Result<()> {
        self.update_record(path, |record| {
            record.set_simple_field(key, value);
        })
        .await
    }

    pub async fn remove_map_field_key(
        &self,
        path: &str,
        key: &str,
    ) -> Result<()> {
        self.update_record(path, |record| {
            record.remove_map_field(key);
        })
        .await
    }

    pub async fn get_simple_field(
        &self,
        path: &str,
        key: &str,
    ) -> Result<Option<String>> {
        let record = self.get_record(path).await?;
        Ok(record.get_simple_field(key).map(str::to_string))
    }

    pub async fn get_simple_field_bool(
        &self,
        path: &str,
        key: &str,
    ) -> Result<bool> {
        Ok(self
            .get_simple_field(path, key)
            .await?
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false))
    }

    // ==================== Cluster layout ====================

    /// True iff every well-known path of the cluster layout exists.
    pub async fn is_cluster_setup(
        &self,
        cluster_id: &str,
    ) -> Result<bool> {
        let keys = KeyBuilder::new(cluster_id);
        self.exists_all(&[
            keys.cluster(),
            keys.cluster_config(),
            keys.ideal_states(),
            keys.participant_configs(),
            keys.property_store(),
            keys.live_instances(),
            keys.instances(),
            keys.external_view(),
            keys.state_model_defs(),
            keys.controller(),
            keys.controller_errors(),
            keys.controller_history(),
            keys.controller_messages(),
            keys.controller_status_updates(),
        ])
        .await
    }
}

/// Parent of an absolute coordinator path, `None` at the root.
pub(crate) fn parent_path(path: &str) -> Option<String> {
    let (parent, _) = path.rsplit_once('/')?;
    if parent.is_empty() {
        None
    } else {
        Some(parent.to_string())
    }
}
