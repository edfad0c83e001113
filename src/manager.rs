//! Entry point binding a coordinator endpoint to the client roles.

use std::sync::Arc;

use crate::admin::Admin;
use crate::config::ClientConfig;
use crate::coordinator::Connector;
use crate::participant::Participant;
use crate::spectator::Spectator;
use crate::Result;

/// Factory for [`Participant`], [`Spectator`] and [`Admin`] instances bound
/// to one coordinator endpoint.
///
/// The [`Connector`] is the seam where a concrete coordinator client (a
/// ZooKeeper-compatible implementation) plugs in; each role opens its own
/// session through it.
pub struct Manager {
    endpoint: String,
    connector: Arc<dyn Connector>,
    config: ClientConfig,
}

impl Manager {
    /// Builds a manager with configuration loaded from defaults,
    /// `CONFIG_PATH` and `TROUPE__` environment overrides.
    pub fn new(
        endpoint: impl Into<String>,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        Ok(Manager {
            endpoint: endpoint.into(),
            connector,
            config: ClientConfig::new()?.validate()?,
        })
    }

    /// Builds a manager with an explicit, already-validated configuration.
    pub fn with_config(
        endpoint: impl Into<String>,
        connector: Arc<dyn Connector>,
        config: ClientConfig,
    ) -> Self {
        Manager {
            endpoint: endpoint.into(),
            connector,
            config,
        }
    }

    /// A participant identified as `<host>_<port>` within the cluster.
    pub fn new_participant(
        &self,
        cluster_id: impl Into<String>,
        host: impl Into<String>,
        port: impl Into<String>,
    ) -> Participant {
        Participant::new(
            self.endpoint.clone(),
            self.connector.clone(),
            self.config.clone(),
            cluster_id.into(),
            host.into(),
            port.into(),
        )
    }

    pub fn new_spectator(
        &self,
        cluster_id: impl Into<String>,
    ) -> Spectator {
        Spectator::new(
            self.endpoint.clone(),
            self.connector.clone(),
            self.config.clone(),
            cluster_id.into(),
        )
    }

    pub fn admin(&self) -> Admin {
        Admin::new(
            self.endpoint.clone(),
            self.connector.clone(),
            self.config.clone(),
        )
    }
}
