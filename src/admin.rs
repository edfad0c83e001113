//! Administrative surface: cluster bootstrap, node and resource management,
//! cluster-scoped configuration, and read-only listings.
//!
//! Every operation opens its own short-lived coordinator session, mirroring
//! how the reference admin tool behaves; the session is closed whether the
//! operation succeeds or fails.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tracing::info;

use crate::config::ClientConfig;
use crate::constants::BUILTIN_STATE_MODEL_DEFS;
use crate::coordinator::Connection;
use crate::coordinator::Connector;
use crate::coordinator::CreateMode;
use crate::keys::KeyBuilder;
use crate::model::IdealState;
use crate::record::Record;
use crate::ClusterError;
use crate::Result;

/// Resources and instances of one cluster, as returned by
/// [`Admin::list_cluster_info`].
#[derive(Debug, Clone, Default)]
pub struct ClusterInfo {
    pub resources: Vec<String>,
    pub instances: Vec<String>,
}

pub struct Admin {
    endpoint: String,
    connector: Arc<dyn Connector>,
    config: ClientConfig,
}

impl Admin {
    pub(crate) fn new(
        endpoint: String,
        connector: Arc<dyn Connector>,
        config: ClientConfig,
    ) -> Self {
        Admin {
            endpoint,
            connector,
            config,
        }
    }

    async fn open(&self) -> Result<Connection> {
        Connection::open(self.connector.as_ref(), &self.endpoint, &self.config).await
    }

    async fn require_cluster(
        conn: &Connection,
        cluster: &str,
    ) -> Result<()> {
        if conn.is_cluster_setup(cluster).await? {
            Ok(())
        } else {
            Err(ClusterError::NotSetup(cluster.to_string()).into())
        }
    }

    /// Creates the full cluster layout under `/<cluster>`, including the
    /// built-in state model definitions. Returns `false` when the cluster
    /// already exists.
    pub async fn add_cluster(
        &self,
        cluster: &str,
    ) -> Result<bool> {
        let conn = self.open().await?;
        let result = Self::add_cluster_inner(&conn, cluster).await;
        let _ = conn.close().await;
        result
    }

    async fn add_cluster_inner(
        conn: &Connection,
        cluster: &str,
    ) -> Result<bool> {
        let keys = KeyBuilder::new(cluster);

        if conn.exists(&keys.cluster()).await? {
            return Ok(false);
        }

        conn.create_empty(&keys.cluster()).await?;
        conn.create_empty(&keys.property_store()).await?;

        conn.create_empty(&keys.state_model_defs()).await?;
        for (name, definition) in BUILTIN_STATE_MODEL_DEFS {
            conn.create(
                &keys.state_model_def(name),
                Bytes::from_static(definition.as_bytes()),
                CreateMode::Persistent,
            )
            .await?;
        }

        conn.create_empty(&keys.instances()).await?;

        conn.create_empty(&format!("/{cluster}/CONFIGS")).await?;
        conn.create_empty(&keys.participant_configs()).await?;
        conn.create_empty(&format!("/{cluster}/CONFIGS/RESOURCE")).await?;
        conn.create_empty(&format!("/{cluster}/CONFIGS/CLUSTER")).await?;
        conn.create_record(&keys.cluster_config(), &Record::new(cluster)).await?;

        conn.create_empty(&keys.ideal_states()).await?;
        conn.create_empty(&keys.external_view()).await?;
        conn.create_empty(&keys.live_instances()).await?;

        conn.create_empty(&keys.controller()).await?;
        conn.create_empty(&keys.controller_errors()).await?;
        conn.create_empty(&keys.controller_history()).await?;
        conn.create_empty(&keys.controller_messages()).await?;
        conn.create_empty(&keys.controller_status_updates()).await?;

        info!(%cluster, "cluster created");
        Ok(true)
    }

    /// Removes the cluster's entire subtree.
    pub async fn drop_cluster(
        &self,
        cluster: &str,
    ) -> Result<()> {
        let conn = self.open().await?;
        let keys = KeyBuilder::new(cluster);
        let result = conn.delete_tree(&keys.cluster()).await;
        let _ = conn.close().await;

        if result.is_ok() {
            info!(%cluster, "cluster dropped");
        }
        result
    }

    /// Registers a node (`host_port`) with the cluster: config record plus
    /// the per-instance subtrees.
    pub async fn add_node(
        &self,
        cluster: &str,
        node: &str,
    ) -> Result<()> {
        let conn = self.open().await?;
        let result = Self::add_node_inner(&conn, cluster, node).await;
        let _ = conn.close().await;
        result
    }

    async fn add_node_inner(
        conn: &Connection,
        cluster: &str,
        node: &str,
    ) -> Result<()> {
        Self::require_cluster(conn, cluster).await?;

        let keys = KeyBuilder::new(cluster);
        let config_path = keys.participant_config(node);
        if conn.exists(&config_path).await? {
            return Err(ClusterError::NodeAlreadyExists(node.to_string()).into());
        }

        let (host, port) = node.split_once('_').unwrap_or((node, ""));
        let mut record = Record::new(node);
        record.set_simple_field("HELIX_HOST", host);
        record.set_simple_field("HELIX_PORT", port);
        record.set_simple_field("HELIX_ENABLED", "true");

        conn.create_record(&config_path, &record).await?;
        conn.create_empty(&keys.instance(node)).await?;
        conn.create_empty(&keys.messages(node)).await?;
        conn.create_empty(&keys.current_states(node)).await?;
        conn.create_empty(&keys.errors(node)).await?;
        conn.create_empty(&keys.health_report(node)).await?;
        conn.create_empty(&keys.status_updates(node)).await?;

        info!(%cluster, %node, "node added");
        Ok(())
    }

    /// Unregisters a node: config record and instance subtree both go.
    pub async fn drop_node(
        &self,
        cluster: &str,
        node: &str,
    ) -> Result<()> {
        let conn = self.open().await?;
        let result = Self::drop_node_inner(&conn, cluster, node).await;
        let _ = conn.close().await;
        result
    }

    async fn drop_node_inner(
        conn: &Connection,
        cluster: &str,
        node: &str,
    ) -> Result<()> {
        let keys = KeyBuilder::new(cluster);

        if !conn.exists(&keys.participant_config(node)).await? {
            return Err(ClusterError::NodeNotExist(node.to_string()).into());
        }
        if !conn.exists(&keys.instance(node)).await? {
            return Err(ClusterError::InstanceNotExist(node.to_string()).into());
        }

        conn.delete_tree(&keys.participant_config(node)).await?;
        conn.delete_tree(&keys.instance(node)).await?;

        info!(%cluster, %node, "node dropped");
        Ok(())
    }

    /// Removes a participating instance's subtree only.
    pub async fn drop_instance(
        &self,
        cluster: &str,
        instance: &str,
    ) -> Result<()> {
        let conn = self.open().await?;
        let keys = KeyBuilder::new(cluster);
        let result = conn.delete_tree(&keys.instance(instance)).await;
        let _ = conn.close().await;

        if result.is_ok() {
            info!(%cluster, %instance, "instance dropped");
        }
        result
    }

    /// Authors the ideal state for a new resource. The referenced state
    /// model must be installed; the resource must not exist yet.
    pub async fn add_resource(
        &self,
        cluster: &str,
        resource: &str,
        partitions: usize,
        state_model: &str,
    ) -> Result<()> {
        let conn = self.open().await?;
        let result =
            Self::add_resource_inner(&conn, cluster, resource, partitions, state_model).await;
        let _ = conn.close().await;
        result
    }

    async fn add_resource_inner(
        conn: &Connection,
        cluster: &str,
        resource: &str,
        partitions: usize,
        state_model: &str,
    ) -> Result<()> {
        Self::require_cluster(conn, cluster).await?;

        let keys = KeyBuilder::new(cluster);
        if !conn.exists(&keys.state_model_def(state_model)).await? {
            return Err(ClusterError::StateModelDefNotExist(state_model.to_string()).into());
        }
        if conn.exists(&keys.ideal_state_for_resource(resource)).await? {
            return Err(ClusterError::ResourceExists(resource.to_string()).into());
        }

        let mut ideal_state = IdealState::new(resource);
        ideal_state.set_num_partitions(partitions);
        ideal_state.set_replicas(0);
        ideal_state.set_rebalance_mode("SEMI_AUTO");
        ideal_state.set_state_model_def_ref(state_model);
        ideal_state.save(conn, cluster).await?;

        info!(%cluster, %resource, partitions, %state_model, "resource added");
        Ok(())
    }

    /// Removes a resource's ideal state and config.
    pub async fn drop_resource(
        &self,
        cluster: &str,
        resource: &str,
    ) -> Result<()> {
        let conn = self.open().await?;
        let result = Self::drop_resource_inner(&conn, cluster, resource).await;
        let _ = conn.close().await;
        result
    }

    async fn drop_resource_inner(
        conn: &Connection,
        cluster: &str,
        resource: &str,
    ) -> Result<()> {
        Self::require_cluster(conn, cluster).await?;

        let keys = KeyBuilder::new(cluster);
        conn.delete_tree(&keys.ideal_state_for_resource(resource)).await?;
        conn.delete_tree(&keys.resource_config(resource)).await?;

        info!(%cluster, %resource, "resource dropped");
        Ok(())
    }

    pub async fn enable_resource(
        &self,
        cluster: &str,
        resource: &str,
    ) -> Result<()> {
        self.set_resource_enabled(cluster, resource, true).await
    }

    pub async fn disable_resource(
        &self,
        cluster: &str,
        resource: &str,
    ) -> Result<()> {
        self.set_resource_enabled(cluster, resource, false).await
    }

    async fn set_resource_enabled(
        &self,
        cluster: &str,
        resource: &str,
        enabled: bool,
    ) -> Result<()> {
        let conn = self.open().await?;
        let result = Self::set_resource_enabled_inner(&conn, cluster, resource, enabled).await;
        let _ = conn.close().await;
        result
    }

    async fn set_resource_enabled_inner(
        conn: &Connection,
        cluster: &str,
        resource: &str,
        enabled: bool,
    ) -> Result<()> {
        Self::require_cluster(conn, cluster).await?;

        let keys = KeyBuilder::new(cluster);
        let path = keys.ideal_state_for_resource(resource);
        if !conn.exists(&path).await? {
            return Err(ClusterError::ResourceNotExists(resource.to_string()).into());
        }

        conn.update_simple_field(&path, "HELIX_ENABLED", if enabled { "true" } else { "false" })
            .await?;

        info!(%cluster, %resource, enabled, "resource toggled");
        Ok(())
    }

    /// Sets configuration values for a scope. Only the `CLUSTER` scope is
    /// supported; values land as simple fields on the cluster config record.
    pub async fn set_config(
        &self,
        cluster: &str,
        scope: &str,
        properties: &HashMap<String, String>,
    ) -> Result<()> {
        if !scope.eq_ignore_ascii_case("CLUSTER") {
            return Ok(());
        }

        let conn = self.open().await?;
        let keys = KeyBuilder::new(cluster);
        let path = keys.cluster_config();

        let mut result = Ok(());
        for (key, value) in properties {
            result = conn.update_simple_field(&path, key, value).await;
            if result.is_err() {
                break;
            }
        }

        let _ = conn.close().await;
        result
    }

    /// Reads configuration values for a scope; missing keys are omitted.
    pub async fn get_config(
        &self,
        cluster: &str,
        scope: &str,
        config_keys: &[String],
    ) -> Result<HashMap<String, String>> {
        let mut values = HashMap::new();
        if !scope.eq_ignore_ascii_case("CLUSTER") {
            return Ok(values);
        }

        let conn = self.open().await?;
        let keys = KeyBuilder::new(cluster);
        let path = keys.cluster_config();

        let mut result = Ok(());
        for key in config_keys {
            match conn.get_simple_field(&path, key).await {
                Ok(Some(value)) => {
                    values.insert(key.clone(), value);
                }
                Ok(None) => {}
                Err(error) => {
                    result = Err(error);
                    break;
                }
            }
        }

        let _ = conn.close().await;
        result.map(|_| values)
    }

    /// Every top-level child that carries a complete cluster layout.
    pub async fn list_clusters(&self) -> Result<Vec<String>> {
        let conn = self.open().await?;

        let result = async {
            let mut clusters = Vec::new();
            for child in conn.children("/").await? {
                if conn.is_cluster_setup(&child).await.unwrap_or(false) {
                    clusters.push(child);
                }
            }
            Ok(clusters)
        }
        .await;

        let _ = conn.close().await;
        result
    }

    pub async fn list_resources(
        &self,
        cluster: &str,
    ) -> Result<Vec<String>> {
        let conn = self.open().await?;

        let result = async {
            Self::require_cluster(&conn, cluster).await?;
            let keys = KeyBuilder::new(cluster);
            conn.children(&keys.ideal_states()).await
        }
        .await;

        let _ = conn.close().await;
        result
    }

    pub async fn list_instances(
        &self,
        cluster: &str,
    ) -> Result<Vec<String>> {
        let conn = self.open().await?;

        let result = async {
            Self::require_cluster(&conn, cluster).await?;
            let keys = KeyBuilder::new(cluster);
            conn.children(&keys.instances()).await
        }
        .await;

        let _ = conn.close().await;
        result
    }

    pub async fn list_cluster_info(
        &self,
        cluster: &str,
    ) -> Result<ClusterInfo> {
        let conn = self.open().await?;

        let result = async {
            Self::require_cluster(&conn, cluster).await?;
            let keys = KeyBuilder::new(cluster);
            Ok(ClusterInfo {
                resources: conn.children(&keys.ideal_states()).await?,
                instances: conn.children(&keys.instances()).await?,
            })
        }
        .await;

        let _ = conn.close().await;
        result
    }

    /// The config record of one instance.
    pub async fn list_instance_info(
        &self,
        cluster: &str,
        instance: &str,
    ) -> Result<Record> {
        let conn = self.open().await?;

        let result = async {
            Self::require_cluster(&conn, cluster).await?;
            let keys = KeyBuilder::new(cluster);
            let path = keys.participant_config(instance);
            if !conn.exists(&path).await? {
                return Err(ClusterError::NodeNotExist(instance.to_string()).into());
            }
            conn.get_record(&path).await
        }
        .await;

        let _ = conn.close().await;
        result
    }
}
