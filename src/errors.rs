//! Cluster-Management Client Error Hierarchy
//!
//! Defines error types for the participant and spectator roles, categorized
//! by protocol layer and operational concerns.

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Coordinator transport and znode-level failures
    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),

    /// Record wire-format failures
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Cluster layout and entity failures
    #[error(transparent)]
    Cluster(#[from] ClusterError),

    /// Participant lifecycle and message-pipeline failures
    #[error(transparent)]
    Participant(#[from] ParticipantError),

    /// Client configuration validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Unrecoverable failures requiring component shutdown
    #[error("Fatal error: {0}")]
    Fatal(String),
}

/// Errors surfaced by the underlying coordinator client.
///
/// `Transient` is the only retryable kind; everything else reflects a
/// definite answer from the coordinator and is surfaced immediately.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// The addressed znode does not exist
    #[error("node does not exist: {0}")]
    NoNode(String),

    /// Creation target already exists
    #[error("node already exists: {0}")]
    NodeExists(String),

    /// Delete target still has children
    #[error("node has children: {0}")]
    NotEmpty(String),

    /// Versioned write lost the race against a concurrent writer
    #[error("version conflict at {path} (expected version {expected})")]
    BadVersion { path: String, expected: i32 },

    /// The coordinator session is gone; ephemeral state is invalid
    #[error("coordinator session expired")]
    SessionExpired,

    /// Operation attempted on a closed or never-opened session
    #[error("not connected to coordinator")]
    NotConnected,

    /// Recoverable transport failure (connection loss, timeout)
    #[error("transient coordinator failure: {0}")]
    Transient(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Record (de)serialization failures
    #[error("record serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// A record is missing a field the protocol requires
    #[error("record {id} is missing required field {field}")]
    MissingField { id: String, field: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    /// The cluster layout under /<cluster> is absent or incomplete
    #[error("cluster {0} is not set up")]
    NotSetup(String),

    /// Node already present under CONFIGS/PARTICIPANT
    #[error("node {0} already exists in cluster")]
    NodeAlreadyExists(String),

    /// Node missing from CONFIGS/PARTICIPANT
    #[error("node {0} does not exist in cluster config")]
    NodeNotExist(String),

    /// Instance subtree missing under INSTANCES
    #[error("instance {0} does not exist in cluster")]
    InstanceNotExist(String),

    /// Referenced state model definition is not installed
    #[error("state model {0} does not exist in cluster")]
    StateModelDefNotExist(String),

    /// Resource ideal state already present
    #[error("resource {0} already exists in cluster")]
    ResourceExists(String),

    /// Resource ideal state absent
    #[error("resource {0} does not exist in cluster")]
    ResourceNotExists(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ParticipantError {
    #[error("register at least one state model before connecting")]
    NoStateModel,

    /// State models and pre-connect callbacks are frozen once connected
    #[error("participant is already connected; registry is frozen")]
    RegistryFrozen,

    /// Auto-join is disabled and no participant config exists
    #[error("participant configuration could not be added for {0}")]
    ConfigRejected(String),

    /// No handler registered for the requested transition
    #[error("no handler registered for {model}: {from} -> {to}")]
    ModelUnregistered {
        model: String,
        from: String,
        to: String,
    },

    /// A user transition handler returned an error
    #[error("transition handler failed for partition {partition}: {reason}")]
    TransitionFailed { partition: String, reason: String },

    /// The previous session's ephemeral outlived every create retry
    #[error("live instance for {0} still held by a previous session")]
    LiveInstanceExists(String),
}
