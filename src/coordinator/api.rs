//! Raw coordinator client contract.
//!
//! Watches are one-shot: a watch registered by [`Coordinator::get_watch`] or
//! [`Coordinator::children_watch`] fires at most once and must be re-armed by
//! issuing a fresh read. Session liveness is reported out-of-band through
//! [`Coordinator::session_events`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
#[cfg(test)]
use mockall::automock;
use tokio::sync::broadcast;
use tokio::sync::oneshot;

use crate::CoordinatorError;

pub type CoordResult<T> = std::result::Result<T, CoordinatorError>;

/// Subset of znode metadata the protocol relies on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stat {
    /// Data version, incremented on every successful set
    pub version: i32,
    /// True when the node is tied to a session's lifetime
    pub ephemeral: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateMode {
    Persistent,
    /// Deleted by the coordinator when the creating session ends
    Ephemeral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchKind {
    /// Data changed at the watched path
    Data,
    /// Child set changed under the watched path
    Children,
    /// The watched node was deleted
    Deleted,
}

/// Fired at most once per registered watch.
#[derive(Debug, Clone)]
pub struct WatchEvent {
    pub path: String,
    pub kind: WatchKind,
}

/// One-shot receiver for a registered watch. Dropping it abandons the watch.
pub type WatchReceiver = oneshot::Receiver<WatchEvent>;

/// Session lifecycle notifications from the underlying client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Connected,
    /// Transport lost; the session may still be recovered
    Disconnected,
    /// The session is gone for good: ephemerals are reaped and the session
    /// id will never be seen again
    Expired,
}

/// Raw operations of the coordination service, one session per instance.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Coordinator: Send + Sync {
    /// Opaque id, stable for the lifetime of this session.
    fn session_id(&self) -> String;

    /// Subscribe to session lifecycle events.
    fn session_events(&self) -> broadcast::Receiver<SessionEvent>;

    async fn exists(
        &self,
        path: &str,
    ) -> CoordResult<Option<Stat>>;

    async fn get(
        &self,
        path: &str,
    ) -> CoordResult<(Bytes, Stat)>;

    async fn get_watch(
        &self,
        path: &str,
    ) -> CoordResult<(Bytes, Stat, WatchReceiver)>;

    async fn children(
        &self,
        path: &str,
    ) -> CoordResult<Vec<String>>;

    async fn children_watch(
        &self,
        path: &str,
    ) -> CoordResult<(Vec<String>, WatchReceiver)>;

    async fn create(
        &self,
        path: &str,
        data: Bytes,
        mode: CreateMode,
    ) -> CoordResult<String>;

    /// Versioned write; `version == -1` bypasses the version check.
    async fn set(
        &self,
        path: &str,
        data: Bytes,
        version: i32,
    ) -> CoordResult<Stat>;

    /// Versioned delete; `version == -1` bypasses the version check.
    async fn delete(
        &self,
        path: &str,
        version: i32,
    ) -> CoordResult<()>;

    /// Ends the session; the coordinator reaps its ephemerals.
    async fn close(&self) -> CoordResult<()>;
}

/// Factory for coordinator sessions. Each call opens a fresh session against
/// the given endpoint(s); the participant leans on this to rejoin after
/// session expiry.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        endpoint: &str,
        session_timeout: Duration,
    ) -> CoordResult<Arc<dyn Coordinator>>;
}
