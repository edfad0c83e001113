//! The spectator role: a read-only observer that tracks coordinator
//! subtrees and delivers type-tagged change notifications to registered
//! listeners.
//!
//! Listeners are invoked on fresh tasks, so a slow listener never stalls
//! dispatch; they run concurrently with each other and with subsequent
//! notifications and must tolerate reordering. Any locking a listener needs
//! is the listener's own responsibility.

mod watchers;

#[cfg(test)]
mod spectator_test;

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use dashmap::DashMap;
use lru::LruCache;
use parking_lot::Mutex;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::ClientConfig;
use crate::context::Context;
use crate::coordinator::Connection;
use crate::coordinator::Connector;
use crate::keys::KeyBuilder;
use crate::record::Record;
use crate::ClusterError;
use crate::CoordinatorError;
use crate::Error;
use crate::Result;

pub type ExternalViewChangeListener = Arc<dyn Fn(Vec<Record>, Arc<Context>) + Send + Sync>;
pub type LiveInstanceChangeListener = Arc<dyn Fn(Vec<Record>, Arc<Context>) + Send + Sync>;
pub type IdealStateChangeListener = Arc<dyn Fn(Vec<Record>, Arc<Context>) + Send + Sync>;
pub type InstanceConfigChangeListener = Arc<dyn Fn(Vec<Record>, Arc<Context>) + Send + Sync>;
pub type ControllerMessageListener = Arc<dyn Fn(Vec<Record>, Arc<Context>) + Send + Sync>;
pub type CurrentStateChangeListener = Arc<dyn Fn(String, Vec<Record>, Arc<Context>) + Send + Sync>;
pub type MessageListener = Arc<dyn Fn(String, Vec<Record>, Arc<Context>) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectatorState {
    Connected,
    Disconnected,
}

/// What changed, as seen by a watcher task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChangeKind {
    ExternalView,
    IdealState,
    InstanceConfig,
    LiveInstances,
    CurrentState,
    ControllerMessages,
    InstanceMessages,
}

/// Pushed on the shared notification channel whenever any watch fires.
/// `scope` carries the resource or instance the change belongs to, when the
/// watcher knows it.
#[derive(Debug, Clone)]
pub(crate) struct ChangeNotification {
    pub(crate) kind: ChangeKind,
    pub(crate) scope: Option<String>,
}

#[derive(Default)]
pub(crate) struct Listeners {
    pub(crate) external_view: Vec<ExternalViewChangeListener>,
    pub(crate) live_instance: Vec<LiveInstanceChangeListener>,
    pub(crate) ideal_state: Vec<IdealStateChangeListener>,
    pub(crate) instance_config: Vec<InstanceConfigChangeListener>,
    pub(crate) controller_message: Vec<ControllerMessageListener>,
    pub(crate) current_state: HashMap<String, Vec<CurrentStateChangeListener>>,
    pub(crate) message: HashMap<String, Vec<MessageListener>>,
}

/// A read-only cluster observer.
pub struct Spectator {
    inner: Arc<SpectatorInner>,
}

pub(crate) struct SpectatorInner {
    pub(crate) endpoint: String,
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) config: ClientConfig,
    pub(crate) cluster_id: String,
    pub(crate) keys: KeyBuilder,

    pub(crate) conn: RwLock<Option<Arc<Connection>>>,
    pub(crate) listeners: RwLock<Listeners>,
    pub(crate) context: RwLock<Arc<Context>>,

    /// Resource -> active flag for the three set-of-resources categories.
    /// Inactive entries are resources that disappeared from the root
    /// snapshot; their member watchers die on their own.
    pub(crate) external_view_tracked: DashMap<String, bool>,
    pub(crate) ideal_state_tracked: DashMap<String, bool>,
    pub(crate) instance_config_tracked: DashMap<String, bool>,

    /// Current-state paths with an active member watcher.
    pub(crate) current_state_watches: DashMap<String, ()>,

    /// Recently observed message ids, bounded.
    pub(crate) received_messages: Mutex<LruCache<String, ()>>,

    notification_tx: RwLock<Option<mpsc::Sender<ChangeNotification>>>,
    pub(crate) state_tx: watch::Sender<SpectatorState>,
    stop_tx: Mutex<Option<watch::Sender<bool>>>,
    dispatch_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Spectator {
    pub(crate) fn new(
        endpoint: String,
        connector: Arc<dyn Connector>,
        config: ClientConfig,
        cluster_id: String,
    ) -> Self {
        let (state_tx, _) = watch::channel(SpectatorState::Disconnected);
        let cache_size = NonZeroUsize::new(config.connection.received_message_cache_size)
            .unwrap_or(NonZeroUsize::new(1024).expect("non-zero"));

        Spectator {
            inner: Arc::new(SpectatorInner {
                endpoint,
                connector,
                keys: KeyBuilder::new(&cluster_id),
                cluster_id,
                conn: RwLock::new(None),
                listeners: RwLock::new(Listeners::default()),
                context: RwLock::new(Arc::new(Context::new())),
                external_view_tracked: DashMap::new(),
                ideal_state_tracked: DashMap::new(),
                instance_config_tracked: DashMap::new(),
                current_state_watches: DashMap::new(),
                received_messages: Mutex::new(LruCache::new(cache_size)),
                notification_tx: RwLock::new(None),
                state_tx,
                stop_tx: Mutex::new(None),
                dispatch_handle: Mutex::new(None),
                config,
            }),
        }
    }

    pub fn cluster_id(&self) -> &str {
        &self.inner.cluster_id
    }

    pub fn is_connected(&self) -> bool {
        *self.inner.state_tx.borrow() == SpectatorState::Connected
    }

    /// Context handed to every listener invocation.
    pub fn set_context(
        &self,
        context: Arc<Context>,
    ) {
        *self.inner.context.write() = context;
    }

    pub fn add_external_view_change_listener(
        &self,
        listener: impl Fn(Vec<Record>, Arc<Context>) + Send + Sync + 'static,
    ) {
        self.inner.listeners.write().external_view.push(Arc::new(listener));
    }

    pub fn add_live_instance_change_listener(
        &self,
        listener: impl Fn(Vec<Record>, Arc<Context>) + Send + Sync + 'static,
    ) {
        self.inner.listeners.write().live_instance.push(Arc::new(listener));
    }

    pub fn add_ideal_state_change_listener(
        &self,
        listener: impl Fn(Vec<Record>, Arc<Context>) + Send + Sync + 'static,
    ) {
        self.inner.listeners.write().ideal_state.push(Arc::new(listener));
    }

    pub fn add_instance_config_change_listener(
        &self,
        listener: impl Fn(Vec<Record>, Arc<Context>) + Send + Sync + 'static,
    ) {
        self.inner.listeners.write().instance_config.push(Arc::new(listener));
    }

    pub fn add_controller_message_listener(
        &self,
        listener: impl Fn(Vec<Record>, Arc<Context>) + Send + Sync + 'static,
    ) {
        self.inner.listeners.write().controller_message.push(Arc::new(listener));
    }

    /// Listens to current-state changes of one instance. When the spectator
    /// is already connected and this is the instance's first listener, its
    /// watchers start immediately.
    pub async fn add_current_state_change_listener(
        &self,
        instance: impl Into<String>,
        listener: impl Fn(String, Vec<Record>, Arc<Context>) + Send + Sync + 'static,
    ) {
        let instance = instance.into();
        let first = {
            let mut listeners = self.inner.listeners.write();
            let entry = listeners.current_state.entry(instance.clone()).or_default();
            entry.push(Arc::new(listener));
            entry.len() == 1
        };

        if first && self.is_connected() {
            if let Some((conn, stop_rx)) = self.inner.watch_prerequisites() {
                if let Err(error) = watchers::watch_current_state_for_instance(
                    self.inner.clone(),
                    conn,
                    instance.clone(),
                    stop_rx,
                )
                .await
                {
                    warn!(%instance, %error, "failed to start current state watcher");
                }
            }
        }
    }

    /// Listens to messages of one instance. Same dynamic-start behavior as
    /// [`add_current_state_change_listener`](Self::add_current_state_change_listener).
    pub async fn add_message_listener(
        &self,
        instance: impl Into<String>,
        listener: impl Fn(String, Vec<Record>, Arc<Context>) + Send + Sync + 'static,
    ) {
        let instance = instance.into();
        let first = {
            let mut listeners = self.inner.listeners.write();
            let entry = listeners.message.entry(instance.clone()).or_default();
            entry.push(Arc::new(listener));
            entry.len() == 1
        };

        if first && self.is_connected() {
            if let Some((conn, stop_rx)) = self.inner.watch_prerequisites() {
                tokio::spawn(watchers::watch_instance_messages(
                    self.inner.clone(),
                    conn,
                    instance,
                    stop_rx,
                ));
            }
        }
    }

    /// Connects to the cluster and starts a watcher for every listener
    /// category that is non-empty, plus the dispatch loop.
    pub async fn connect(&self) -> Result<()> {
        let inner = &self.inner;

        if self.is_connected() {
            return Ok(());
        }

        let conn = Arc::new(
            Connection::open(inner.connector.as_ref(), &inner.endpoint, &inner.config).await?,
        );

        if !conn.is_cluster_setup(&inner.cluster_id).await? {
            let _ = conn.close().await;
            return Err(ClusterError::NotSetup(inner.cluster_id.clone()).into());
        }

        *inner.conn.write() = Some(conn.clone());

        let (stop_tx, stop_rx) = watch::channel(false);
        *inner.stop_tx.lock() = Some(stop_tx);

        let (notification_tx, notification_rx) =
            mpsc::channel(inner.config.connection.notification_queue_size);
        *inner.notification_tx.write() = Some(notification_tx);

        let (externals, lives, ideals, configs, controller, cs_instances, msg_instances) = {
            let listeners = inner.listeners.read();
            (
                !listeners.external_view.is_empty(),
                !listeners.live_instance.is_empty(),
                !listeners.ideal_state.is_empty(),
                !listeners.instance_config.is_empty(),
                !listeners.controller_message.is_empty(),
                listeners.current_state.keys().cloned().collect::<Vec<_>>(),
                listeners.message.keys().cloned().collect::<Vec<_>>(),
            )
        };

        if externals {
            tokio::spawn(watchers::watch_resource_group(
                inner.clone(),
                conn.clone(),
                ChangeKind::ExternalView,
                stop_rx.clone(),
            ));
        }
        if ideals {
            tokio::spawn(watchers::watch_resource_group(
                inner.clone(),
                conn.clone(),
                ChangeKind::IdealState,
                stop_rx.clone(),
            ));
        }
        if configs {
            tokio::spawn(watchers::watch_resource_group(
                inner.clone(),
                conn.clone(),
                ChangeKind::InstanceConfig,
                stop_rx.clone(),
            ));
        }
        if lives {
            tokio::spawn(watchers::watch_live_instances(
                inner.clone(),
                conn.clone(),
                stop_rx.clone(),
            ));
        }
        if controller {
            tokio::spawn(watchers::watch_controller_messages(
                inner.clone(),
                conn.clone(),
                stop_rx.clone(),
            ));
        }
        for instance in cs_instances {
            if let Err(error) = watchers::watch_current_state_for_instance(
                inner.clone(),
                conn.clone(),
                instance.clone(),
                stop_rx.clone(),
            )
            .await
            {
                warn!(%instance, %error, "failed to start current state watcher");
            }
        }
        for instance in msg_instances {
            tokio::spawn(watchers::watch_instance_messages(
                inner.clone(),
                conn.clone(),
                instance,
                stop_rx.clone(),
            ));
        }

        let handle = tokio::spawn(dispatch_loop(inner.clone(), notification_rx, stop_rx));
        *inner.dispatch_handle.lock() = Some(handle);

        inner.state_tx.send_replace(SpectatorState::Connected);
        info!(cluster = %inner.cluster_id, session = %conn.session_id(), "spectator connected");
        Ok(())
    }

    /// Idempotent. Signals every task and returns once the dispatch loop
    /// has acknowledged the stop.
    pub async fn disconnect(&self) {
        let inner = &self.inner;

        if !self.is_connected() {
            return;
        }

        if let Some(stop_tx) = inner.stop_tx.lock().take() {
            let _ = stop_tx.send(true);
        }

        let mut state_rx = inner.state_tx.subscribe();
        let _ = state_rx
            .wait_for(|s| *s == SpectatorState::Disconnected)
            .await;

        let handle = inner.dispatch_handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }

        *inner.notification_tx.write() = None;

        let conn = inner.conn.write().take();
        if let Some(conn) = conn {
            let _ = conn.close().await;
        }

        inner.external_view_tracked.clear();
        inner.ideal_state_tracked.clear();
        inner.instance_config_tracked.clear();
        inner.current_state_watches.clear();

        info!(cluster = %inner.cluster_id, "spectator disconnected");
    }

    // ==================== Snapshot accessors ====================

    pub async fn get_external_view(&self) -> Result<Vec<Record>> {
        let conn = self.inner.connection()?;
        Ok(self.inner.external_view_snapshot(&conn).await)
    }

    pub async fn get_ideal_state(&self) -> Result<Vec<Record>> {
        let conn = self.inner.connection()?;
        Ok(self.inner.ideal_state_snapshot(&conn).await)
    }

    pub async fn get_live_instances(&self) -> Result<Vec<Record>> {
        let conn = self.inner.connection()?;
        Ok(self.inner.live_instances_snapshot(&conn).await)
    }

    pub async fn get_instance_configs(&self) -> Result<Vec<Record>> {
        let conn = self.inner.connection()?;
        Ok(self.inner.instance_configs_snapshot(&conn).await)
    }

    pub async fn get_controller_messages(&self) -> Result<Vec<Record>> {
        let conn = self.inner.connection()?;
        Ok(self.inner.controller_messages_snapshot(&conn).await)
    }

    pub async fn get_instance_messages(
        &self,
        instance: &str,
    ) -> Result<Vec<Record>> {
        let conn = self.inner.connection()?;
        Ok(self.inner.instance_messages_snapshot(&conn, instance).await)
    }

    pub async fn get_current_state(
        &self,
        instance: &str,
    ) -> Result<Vec<Record>> {
        let conn = self.inner.connection()?;
        Ok(self.inner.current_state_snapshot(&conn, instance).await)
    }
}

impl SpectatorInner {
    pub(crate) fn connection(&self) -> Result<Arc<Connection>> {
        self.conn
            .read()
            .clone()
            .ok_or_else(|| Error::Coordinator(CoordinatorError::NotConnected))
    }

    /// Connection plus a stop receiver, for watchers started after connect.
    pub(crate) fn watch_prerequisites(&self) -> Option<(Arc<Connection>, watch::Receiver<bool>)> {
        let conn = self.conn.read().clone()?;
        let stop_rx = self.stop_tx.lock().as_ref().map(|tx| tx.subscribe())?;
        Some((conn, stop_rx))
    }

    pub(crate) fn group_root(
        &self,
        kind: ChangeKind,
    ) -> String {
        match kind {
            ChangeKind::ExternalView => self.keys.external_view(),
            ChangeKind::IdealState => self.keys.ideal_states(),
            ChangeKind::InstanceConfig => self.keys.participant_configs(),
            _ => unreachable!("not a resource-group kind"),
        }
    }

    pub(crate) fn group_member_path(
        &self,
        kind: ChangeKind,
        member: &str,
    ) -> String {
        match kind {
            ChangeKind::ExternalView => self.keys.external_view_for_resource(member),
            ChangeKind::IdealState => self.keys.ideal_state_for_resource(member),
            ChangeKind::InstanceConfig => self.keys.participant_config(member),
            _ => unreachable!("not a resource-group kind"),
        }
    }

    pub(crate) fn group_tracked(
        &self,
        kind: ChangeKind,
    ) -> &DashMap<String, bool> {
        match kind {
            ChangeKind::ExternalView => &self.external_view_tracked,
            ChangeKind::IdealState => &self.ideal_state_tracked,
            ChangeKind::InstanceConfig => &self.instance_config_tracked,
            _ => unreachable!("not a resource-group kind"),
        }
    }

    /// Pushes a notification; an error means the spectator is shutting
    /// down and the calling watcher should exit.
    pub(crate) async fn notify(
        &self,
        kind: ChangeKind,
        scope: Option<String>,
    ) -> std::result::Result<(), ()> {
        let tx = self.notification_tx.read().clone();
        match tx {
            Some(tx) => tx
                .send(ChangeNotification { kind, scope })
                .await
                .map_err(|_| ()),
            None => Err(()),
        }
    }

    pub(crate) async fn external_view_snapshot(
        &self,
        conn: &Connection,
    ) -> Vec<Record> {
        self.group_snapshot(conn, ChangeKind::ExternalView).await
    }

    pub(crate) async fn ideal_state_snapshot(
        &self,
        conn: &Connection,
    ) -> Vec<Record> {
        self.group_snapshot(conn, ChangeKind::IdealState).await
    }

    async fn group_snapshot(
        &self,
        conn: &Connection,
        kind: ChangeKind,
    ) -> Vec<Record> {
        let members: Vec<String> = self
            .group_tracked(kind)
            .iter()
            .filter(|entry| *entry.value())
            .map(|entry| entry.key().clone())
            .collect();

        let mut result = Vec::with_capacity(members.len());
        for member in members {
            match conn.get_record(&self.group_member_path(kind, &member)).await {
                Ok(record) => result.push(record),
                // deleted between snapshot and read; the sweep will catch up
                Err(error) => debug!(%member, %error, "skipping unreadable member record"),
            }
        }
        result
    }

    pub(crate) async fn live_instances_snapshot(
        &self,
        conn: &Connection,
    ) -> Vec<Record> {
        let mut result = Vec::new();
        let instances = match conn.children(&self.keys.live_instances()).await {
            Ok(instances) => instances,
            Err(error) => {
                warn!(%error, "failed to list live instances");
                return result;
            }
        };

        for instance in instances {
            match conn.get_record(&self.keys.live_instance(&instance)).await {
                Ok(record) => result.push(record),
                Err(error) => debug!(%instance, %error, "skipping unreadable live instance"),
            }
        }
        result
    }

    pub(crate) async fn instance_configs_snapshot(
        &self,
        conn: &Connection,
    ) -> Vec<Record> {
        let mut result = Vec::new();
        let configs = match conn.children(&self.keys.participant_configs()).await {
            Ok(configs) => configs,
            Err(error) => {
                warn!(%error, "failed to list instance configs");
                return result;
            }
        };

        for instance in configs {
            match conn.get_record(&self.keys.participant_config(&instance)).await {
                Ok(record) => result.push(record),
                Err(error) => debug!(%instance, %error, "skipping unreadable instance config"),
            }
        }
        result
    }

    pub(crate) async fn controller_messages_snapshot(
        &self,
        conn: &Connection,
    ) -> Vec<Record> {
        let mut result = Vec::new();
        let messages = match conn.children(&self.keys.controller_messages()).await {
            Ok(messages) => messages,
            Err(error) => {
                warn!(%error, "failed to list controller messages");
                return result;
            }
        };

        for message in messages {
            match conn.get_record(&self.keys.controller_message(&message)).await {
                Ok(record) => result.push(record),
                Err(error) => debug!(%message, %error, "skipping unreadable controller message"),
            }
        }
        result
    }

    pub(crate) async fn instance_messages_snapshot(
        &self,
        conn: &Connection,
        instance: &str,
    ) -> Vec<Record> {
        let mut result = Vec::new();
        let messages = match conn.children(&self.keys.messages(instance)).await {
            Ok(messages) => messages,
            Err(error) => {
                warn!(%instance, %error, "failed to list instance messages");
                return result;
            }
        };

        for message in messages {
            match conn.get_record(&self.keys.message(instance, &message)).await {
                Ok(record) => result.push(record),
                Err(error) => debug!(%message, %error, "skipping unreadable message"),
            }
        }
        result
    }

    /// Current state of the instance's (typically unique) active session.
    pub(crate) async fn current_state_snapshot(
        &self,
        conn: &Connection,
        instance: &str,
    ) -> Vec<Record> {
        let mut result = Vec::new();
        let sessions = match conn.children(&self.keys.current_states(instance)).await {
            Ok(sessions) => sessions,
            Err(error) => {
                warn!(%instance, %error, "failed to list current state sessions");
                return result;
            }
        };

        let Some(session) = sessions.first() else {
            return result;
        };

        let resources = match conn
            .children(&self.keys.current_states_for_session(instance, session))
            .await
        {
            Ok(resources) => resources,
            Err(error) => {
                warn!(%instance, %error, "failed to list current state resources");
                return result;
            }
        };

        for resource in resources {
            match conn
                .get_record(&self.keys.current_state_for_resource(instance, session, &resource))
                .await
            {
                Ok(record) => result.push(record),
                Err(error) => debug!(%resource, %error, "skipping unreadable current state"),
            }
        }
        result
    }
}

/// The spectator's single dispatch task: pulls change notifications, takes a
/// fresh snapshot for the category, and fans out to listeners on spawned
/// tasks.
async fn dispatch_loop(
    inner: Arc<SpectatorInner>,
    mut notification_rx: mpsc::Receiver<ChangeNotification>,
    mut stop_rx: watch::Receiver<bool>,
) {
    debug!(cluster = %inner.cluster_id, "spectator dispatch loop started");

    loop {
        tokio::select! {
            _ = stop_rx.changed() => break,

            notification = notification_rx.recv() => {
                match notification {
                    Some(change) => handle_change(&inner, change).await,
                    None => break,
                }
            }
        }
    }

    inner.state_tx.send_replace(SpectatorState::Disconnected);
    debug!(cluster = %inner.cluster_id, "spectator dispatch loop stopped");
}

async fn handle_change(
    inner: &Arc<SpectatorInner>,
    change: ChangeNotification,
) {
    let Ok(conn) = inner.connection() else {
        return;
    };
    let context = inner.context.read().clone();

    match change.kind {
        ChangeKind::ExternalView => {
            let snapshot = inner.external_view_snapshot(&conn).await;
            if let Some(resource) = &change.scope {
                context.set("trigger", resource.clone());
            }
            let listeners = inner.listeners.read().external_view.clone();
            for listener in listeners {
                let snapshot = snapshot.clone();
                let context = context.clone();
                tokio::spawn(async move { listener(snapshot, context) });
            }
        }

        ChangeKind::IdealState => {
            let snapshot = inner.ideal_state_snapshot(&conn).await;
            let listeners = inner.listeners.read().ideal_state.clone();
            for listener in listeners {
                let snapshot = snapshot.clone();
                let context = context.clone();
                tokio::spawn(async move { listener(snapshot, context) });
            }
        }

        ChangeKind::InstanceConfig => {
            let snapshot = inner.instance_configs_snapshot(&conn).await;
            let listeners = inner.listeners.read().instance_config.clone();
            for listener in listeners {
                let snapshot = snapshot.clone();
                let context = context.clone();
                tokio::spawn(async move { listener(snapshot, context) });
            }
        }

        ChangeKind::LiveInstances => {
            let snapshot = inner.live_instances_snapshot(&conn).await;
            let listeners = inner.listeners.read().live_instance.clone();
            for listener in listeners {
                let snapshot = snapshot.clone();
                let context = context.clone();
                tokio::spawn(async move { listener(snapshot, context) });
            }
        }

        ChangeKind::ControllerMessages => {
            let snapshot = inner.controller_messages_snapshot(&conn).await;
            let listeners = inner.listeners.read().controller_message.clone();
            for listener in listeners {
                let snapshot = snapshot.clone();
                let context = context.clone();
                tokio::spawn(async move { listener(snapshot, context) });
            }
        }

        ChangeKind::CurrentState => {
            let Some(instance) = change.scope else {
                return;
            };
            let snapshot = inner.current_state_snapshot(&conn, &instance).await;
            let listeners = inner
                .listeners
                .read()
                .current_state
                .get(&instance)
                .cloned()
                .unwrap_or_default();
            for listener in listeners {
                let instance = instance.clone();
                let snapshot = snapshot.clone();
                let context = context.clone();
                tokio::spawn(async move { listener(instance, snapshot, context) });
            }
        }

        ChangeKind::InstanceMessages => {
            let Some(instance) = change.scope else {
                return;
            };
            let snapshot = inner.instance_messages_snapshot(&conn, &instance).await;
            let listeners = inner
                .listeners
                .read()
                .message
                .get(&instance)
                .cloned()
                .unwrap_or_default();
            for listener in listeners {
                let instance = instance.clone();
                let snapshot = snapshot.clone();
                let context = context.clone();
                tokio::spawn(async move { listener(instance, snapshot, context) });
            }
        }
    }
}
