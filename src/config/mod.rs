//! Configuration for the cluster-management client.
//!
//! Layered loading: code defaults, then an optional `CONFIG_PATH` file,
//! then `TROUPE__`-prefixed environment variables. Validation runs as a
//! separate step so overrides can be applied first.
mod connection;
mod retry;

pub use connection::*;
pub use retry::*;

#[cfg(test)]
mod config_test;

use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Configuration shared by every client role (participant, spectator,
/// admin). Later sources win: defaults, then the `CONFIG_PATH` file, then
/// `TROUPE__` environment variables.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ClientConfig {
    /// Coordinator session and component timing parameters
    pub connection: ConnectionConfig,

    /// Retry policies for coordinator operations
    pub retry: RetryPolicies,
}

impl ClientConfig {
    /// Loads the merged configuration without validating it. Callers must
    /// run [`validate`](Self::validate) after any
    /// [`with_override_config`](Self::with_override_config) calls.
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("TROUPE")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional overrides from a file, keeping environment
    /// variables as the highest-priority source.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("TROUPE")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates all subsystems and returns the validated instance.
    pub fn validate(self) -> Result<Self> {
        self.connection.validate()?;
        self.retry.validate()?;
        Ok(self)
    }
}
