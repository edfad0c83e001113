//! In-memory coordinator double.
//!
//! Implements the [`Coordinator`] contract faithfully enough for the client
//! state machines: hierarchical nodes with versions, one-shot data and
//! child watches fired on mutation, ephemeral ownership, and session expiry
//! that reaps ephemerals and emits a session event.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::sync::oneshot;

use crate::coordinator::CoordResult;
use crate::coordinator::Connector;
use crate::coordinator::Coordinator;
use crate::coordinator::CreateMode;
use crate::coordinator::SessionEvent;
use crate::coordinator::Stat;
use crate::coordinator::WatchEvent;
use crate::coordinator::WatchKind;
use crate::coordinator::WatchReceiver;
use crate::CoordinatorError;

struct NodeEntry {
    data: Bytes,
    version: i32,
    ephemeral_owner: Option<u64>,
}

struct SessionEntry {
    alive: bool,
    events: broadcast::Sender<SessionEvent>,
}

#[derive(Default)]
struct EnsembleState {
    nodes: BTreeMap<String, NodeEntry>,
    data_watches: HashMap<String, Vec<oneshot::Sender<WatchEvent>>>,
    child_watches: HashMap<String, Vec<oneshot::Sender<WatchEvent>>>,
    sessions: HashMap<u64, SessionEntry>,
    next_session_id: u64,
}

impl EnsembleState {
    fn fire_data_watches(
        &mut self,
        path: &str,
        kind: WatchKind,
    ) {
        for sender in self.data_watches.remove(path).unwrap_or_default() {
            let _ = sender.send(WatchEvent {
                path: path.to_string(),
                kind,
            });
        }
    }

    fn fire_child_watches(
        &mut self,
        parent: &str,
    ) {
        for sender in self.child_watches.remove(parent).unwrap_or_default() {
            let _ = sender.send(WatchEvent {
                path: parent.to_string(),
                kind: WatchKind::Children,
            });
        }
    }

    fn child_names(
        &self,
        path: &str,
    ) -> Vec<String> {
        let prefix = if path == "/" {
            "/".to_string()
        } else {
            format!("{path}/")
        };

        self.nodes
            .keys()
            .filter_map(|node| {
                let rest = node.strip_prefix(&prefix)?;
                if rest.is_empty() || rest.contains('/') {
                    None
                } else {
                    Some(rest.to_string())
                }
            })
            .collect()
    }

    /// Deletes a node unconditionally, firing its watches.
    fn reap_node(
        &mut self,
        path: &str,
    ) {
        if self.nodes.remove(path).is_none() {
            return;
        }
        self.fire_data_watches(path, WatchKind::Deleted);
        if let Some(parent) = parent_of(path) {
            self.fire_child_watches(&parent);
        }
    }

    /// Kills a session: ephemerals reaped, event delivered to subscribers.
    fn end_session(
        &mut self,
        session_id: u64,
        event: Option<SessionEvent>,
    ) {
        let Some(session) = self.sessions.get_mut(&session_id) else {
            return;
        };
        if !session.alive {
            return;
        }
        session.alive = false;
        let events = session.events.clone();

        let ephemerals: Vec<String> = self
            .nodes
            .iter()
            .filter(|(_, entry)| entry.ephemeral_owner == Some(session_id))
            .map(|(path, _)| path.clone())
            .collect();
        for path in ephemerals {
            self.reap_node(&path);
        }

        if let Some(event) = event {
            let _ = events.send(event);
        }
    }
}

/// A shared in-memory coordinator "ensemble". Every session created through
/// [`MemoryEnsemble::connector`] sees the same tree.
#[derive(Clone, Default)]
pub struct MemoryEnsemble {
    state: Arc<Mutex<EnsembleState>>,
}

impl MemoryEnsemble {
    pub fn new() -> Self {
        let ensemble = MemoryEnsemble::default();
        ensemble.state.lock().nodes.insert(
            "/zookeeper".to_string(),
            NodeEntry {
                data: Bytes::new(),
                version: 0,
                ephemeral_owner: None,
            },
        );
        ensemble
    }

    pub fn connector(&self) -> Arc<MemoryConnector> {
        Arc::new(MemoryConnector {
            ensemble: self.clone(),
        })
    }

    fn new_session(&self) -> MemoryCoordinator {
        let mut state = self.state.lock();
        state.next_session_id += 1;
        let session_id = state.next_session_id;
        let (events, _) = broadcast::channel(16);
        state.sessions.insert(
            session_id,
            SessionEntry {
                alive: true,
                events: events.clone(),
            },
        );

        MemoryCoordinator {
            state: self.state.clone(),
            session_id,
            events,
        }
    }

    /// Force-expires a session by id: ephemerals vanish (firing watches) and
    /// subscribers observe [`SessionEvent::Expired`].
    pub fn expire_session(
        &self,
        session_id: &str,
    ) {
        let Ok(session_id) = session_id.parse::<u64>() else {
            return;
        };
        self.state
            .lock()
            .end_session(session_id, Some(SessionEvent::Expired));
    }

    /// Direct tree inspection for assertions.
    pub fn node_exists(
        &self,
        path: &str,
    ) -> bool {
        self.state.lock().nodes.contains_key(path)
    }

    pub fn node_data(
        &self,
        path: &str,
    ) -> Option<Bytes> {
        self.state.lock().nodes.get(path).map(|entry| entry.data.clone())
    }

    pub fn node_is_ephemeral(
        &self,
        path: &str,
    ) -> bool {
        self.state
            .lock()
            .nodes
            .get(path)
            .map(|entry| entry.ephemeral_owner.is_some())
            .unwrap_or(false)
    }
}

pub struct MemoryConnector {
    ensemble: MemoryEnsemble,
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(
        &self,
        _endpoint: &str,
        _session_timeout: Duration,
    ) -> CoordResult<Arc<dyn Coordinator>> {
        Ok(Arc::new(self.ensemble.new_session()))
    }
}

pub struct MemoryCoordinator {
    state: Arc<Mutex<EnsembleState>>,
    session_id: u64,
    events: broadcast::Sender<SessionEvent>,
}

impl MemoryCoordinator {
    fn ensure_alive(
        &self,
        state: &EnsembleState,
    ) -> CoordResult<()> {
        let alive = state
            .sessions
            .get(&self.session_id)
            .map(|session| session.alive)
            .unwrap_or(false);
        if alive {
            Ok(())
        } else {
            Err(CoordinatorError::SessionExpired)
        }
    }
}

#[async_trait]
impl Coordinator for MemoryCoordinator {
    fn session_id(&self) -> String {
        self.session_id.to_string()
    }

    fn session_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    async fn exists(
        &self,
        path: &str,
    ) -> CoordResult<Option<Stat>> {
        let state = self.state.lock();
        self.ensure_alive(&state)?;
        Ok(state.nodes.get(path).map(|entry| Stat {
            version: entry.version,
            ephemeral: entry.ephemeral_owner.is_some(),
        }))
    }

    async fn get(
        &self,
        path: &str,
    ) -> CoordResult<(Bytes, Stat)> {
        let state = self.state.lock();
        self.ensure_alive(&state)?;
        let entry = state
            .nodes
            .get(path)
            .ok_or_else(|| CoordinatorError::NoNode(path.to_string()))?;
        Ok((
            entry.data.clone(),
            Stat {
                version: entry.version,
                ephemeral: entry.ephemeral_owner.is_some(),
            },
        ))
    }

    async fn get_watch(
        &self,
        path: &str,
    ) -> CoordResult<(Bytes, Stat, WatchReceiver)> {
        let mut state = self.state.lock();
        self.ensure_alive(&state)?;
        let entry = state
            .nodes
            .get(path)
            .ok_or_else(|| CoordinatorError::NoNode(path.to_string()))?;
        let data = entry.data.clone();
        let stat = Stat {
            version: entry.version,
            ephemeral: entry.ephemeral_owner.is_some(),
        };

        let (sender, receiver) = oneshot::channel();
        state.data_watches.entry(path.to_string()).or_default().push(sender);
        Ok((data, stat, receiver))
    }

    async fn children(
        &self,
        path: &str,
    ) -> CoordResult<Vec<String>> {
        let state = self.state.lock();
        self.ensure_alive(&state)?;
        if path != "/" && !state.nodes.contains_key(path) {
            return Err(CoordinatorError::NoNode(path.to_string()));
        }
        Ok(state.child_names(path))
    }

    async fn children_watch(
        &self,
        path: &str,
    ) -> CoordResult<(Vec<String>, WatchReceiver)> {
        let mut state = self.state.lock();
        self.ensure_alive(&state)?;
        if path != "/" && !state.nodes.contains_key(path) {
            return Err(CoordinatorError::NoNode(path.to_string()));
        }
        let children = state.child_names(path);

        let (sender, receiver) = oneshot::channel();
        state.child_watches.entry(path.to_string()).or_default().push(sender);
        Ok((children, receiver))
    }

    async fn create(
        &self,
        path: &str,
        data: Bytes,
        mode: CreateMode,
    ) -> CoordResult<String> {
        let mut state = self.state.lock();
        self.ensure_alive(&state)?;

        if state.nodes.contains_key(path) {
            return Err(CoordinatorError::NodeExists(path.to_string()));
        }
        if let Some(parent) = parent_of(path) {
            if !state.nodes.contains_key(&parent) {
                return Err(CoordinatorError::NoNode(parent));
            }
        }

        state.nodes.insert(
            path.to_string(),
            NodeEntry {
                data,
                version: 0,
                ephemeral_owner: match mode {
                    CreateMode::Ephemeral => Some(self.session_id),
                    CreateMode::Persistent => None,
                },
            },
        );

        if let Some(parent) = parent_of(path) {
            state.fire_child_watches(&parent);
        }
        Ok(path.to_string())
    }

    async fn set(
        &self,
        path: &str,
        data: Bytes,
        version: i32,
    ) -> CoordResult<Stat> {
        let mut state = self.state.lock();
        self.ensure_alive(&state)?;

        let entry = state
            .nodes
            .get_mut(path)
            .ok_or_else(|| CoordinatorError::NoNode(path.to_string()))?;
        if version != -1 && version != entry.version {
            return Err(CoordinatorError::BadVersion {
                path: path.to_string(),
                expected: version,
            });
        }

        entry.data = data;
        entry.version += 1;
        let stat = Stat {
            version: entry.version,
            ephemeral: entry.ephemeral_owner.is_some(),
        };

        state.fire_data_watches(path, WatchKind::Data);
        Ok(stat)
    }

    async fn delete(
        &self,
        path: &str,
        version: i32,
    ) -> CoordResult<()> {
        let mut state = self.state.lock();
        self.ensure_alive(&state)?;

        let entry = state
            .nodes
            .get(path)
            .ok_or_else(|| CoordinatorError::NoNode(path.to_string()))?;
        if version != -1 && version != entry.version {
            return Err(CoordinatorError::BadVersion {
                path: path.to_string(),
                expected: version,
            });
        }
        if !state.child_names(path).is_empty() {
            return Err(CoordinatorError::NotEmpty(path.to_string()));
        }

        state.reap_node(path);
        Ok(())
    }

    async fn close(&self) -> CoordResult<()> {
        self.state.lock().end_session(self.session_id, None);
        Ok(())
    }
}

fn parent_of(path: &str) -> Option<String> {
    let (parent, _) = path.rsplit_once('/')?;
    if parent.is_empty() {
        None
    } else {
        Some(parent.to_string())
    }
}
