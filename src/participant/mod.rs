//! The participant role: registers with a cluster, keeps a live-instance
//! ephemeral alive, consumes controller messages and drives local state
//! models.

mod process;


use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use parking_lot::Mutex;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio::time::MissedTickBehavior;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::config::ClientConfig;
use crate::coordinator::Connection;
use crate::coordinator::Connector;
use crate::coordinator::SessionEvent;
use crate::keys::KeyBuilder;
use crate::model::live_instance_record;
use crate::model::Message;
use crate::model::StateModel;
use crate::model::StateModelRegistry;
use crate::record::Record;
use crate::utils::time::now_millis;
use crate::ClusterError;
use crate::CoordinatorError;
use crate::Error;
use crate::ParticipantError;
use crate::Result;

/// Invoked in registration order right before the coordinator session is
/// opened.
pub type PreConnectCallback = Box<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantState {
    /// Session open, cluster verified, event loop not yet running
    Connected,
    /// Event loop running and consuming messages
    Started,
    /// Event loop exited after a stop signal
    Stopped,
    /// No coordinator session (also the implicit pre-connect state)
    Disconnected,
}

/// A cluster participant. Cheap to clone handles are not provided; the
/// instance is shared internally between the caller and its background
/// tasks.
pub struct Participant {
    inner: Arc<ParticipantInner>,
}

pub(crate) struct ParticipantInner {
    pub(crate) endpoint: String,
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) config: ClientConfig,
    pub(crate) cluster_id: String,
    pub(crate) host: String,
    pub(crate) port: String,
    pub(crate) participant_id: String,
    pub(crate) keys: KeyBuilder,

    pub(crate) state_models: RwLock<StateModelRegistry>,
    pre_connect_callbacks: Mutex<Vec<PreConnectCallback>>,

    pub(crate) conn: RwLock<Option<Arc<Connection>>>,
    pub(crate) state_tx: watch::Sender<ParticipantState>,
    stop_tx: Mutex<Option<watch::Sender<bool>>>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Participant {
    pub(crate) fn new(
        endpoint: String,
        connector: Arc<dyn Connector>,
        config: ClientConfig,
        cluster_id: String,
        host: String,
        port: String,
    ) -> Self {
        let participant_id = format!("{host}_{port}");
        let (state_tx, _) = watch::channel(ParticipantState::Disconnected);

        Participant {
            inner: Arc::new(ParticipantInner {
                endpoint,
                connector,
                config,
                keys: KeyBuilder::new(&cluster_id),
                cluster_id,
                host,
                port,
                participant_id,
                state_models: RwLock::new(StateModelRegistry::default()),
                pre_connect_callbacks: Mutex::new(Vec::new()),
                conn: RwLock::new(None),
                state_tx,
                stop_tx: Mutex::new(None),
                loop_handle: Mutex::new(None),
            }),
        }
    }

    pub fn participant_id(&self) -> &str {
        &self.inner.participant_id
    }

    pub fn cluster_id(&self) -> &str {
        &self.inner.cluster_id
    }

    pub fn state(&self) -> ParticipantState {
        *self.inner.state_tx.borrow()
    }

    pub fn is_connected(&self) -> bool {
        matches!(
            self.state(),
            ParticipantState::Connected | ParticipantState::Started
        )
    }

    /// Associates transition handlers with a state model name. The registry
    /// is frozen once [`connect`](Self::connect) has been called.
    pub fn register_state_model(
        &self,
        name: impl Into<String>,
        model: StateModel,
    ) -> Result<()> {
        if self.state() != ParticipantState::Disconnected {
            return Err(ParticipantError::RegistryFrozen.into());
        }
        self.inner.state_models.write().register(name, model);
        Ok(())
    }

    pub fn add_pre_connect_callback(
        &self,
        callback: impl Fn() + Send + Sync + 'static,
    ) {
        self.inner.pre_connect_callbacks.lock().push(Box::new(callback));
    }

    /// Joins the cluster: validates registered models, runs pre-connect
    /// callbacks, opens the coordinator session, verifies the cluster
    /// layout, ensures the participant config (auto-join), purges current
    /// state left behind by prior sessions, starts the event loop and
    /// finally creates the live-instance ephemeral.
    pub async fn connect(&self) -> Result<()> {
        let inner = &self.inner;

        if self.is_connected() {
            return Ok(());
        }

        if inner.state_models.read().is_empty() {
            return Err(ParticipantError::NoStateModel.into());
        }

        {
            let callbacks = inner.pre_connect_callbacks.lock();
            for callback in callbacks.iter() {
                callback();
            }
        }

        let conn = Arc::new(
            Connection::open(inner.connector.as_ref(), &inner.endpoint, &inner.config).await?,
        );

        if !conn.is_cluster_setup(&inner.cluster_id).await? {
            let _ = conn.close().await;
            return Err(ClusterError::NotSetup(inner.cluster_id.clone()).into());
        }

        if let Err(error) = inner.ensure_participant_config(&conn).await {
            let _ = conn.close().await;
            inner.state_tx.send_replace(ParticipantState::Disconnected);
            return Err(error);
        }

        if let Err(error) = inner.purge_stale_sessions(&conn).await {
            let _ = conn.close().await;
            return Err(error);
        }

        *inner.conn.write() = Some(conn.clone());
        inner.state_tx.send_replace(ParticipantState::Connected);

        let (stop_tx, stop_rx) = watch::channel(false);
        *inner.stop_tx.lock() = Some(stop_tx);
        let handle = tokio::spawn(run_event_loop(inner.clone(), conn.clone(), stop_rx));
        *inner.loop_handle.lock() = Some(handle);

        // the live instance must not appear before the message pump is
        // consuming; the controller starts sending as soon as it sees us
        let mut state_rx = inner.state_tx.subscribe();
        let _ = state_rx.wait_for(|s| *s == ParticipantState::Started).await;

        inner.create_live_instance(&conn).await?;

        info!(
            participant = %inner.participant_id,
            cluster = %inner.cluster_id,
            session = %conn.session_id(),
            "participant connected"
        );
        Ok(())
    }

    /// Idempotent. Returns only after the event loop has exited; the
    /// coordinator then reaps the live-instance ephemeral with the session.
    pub async fn disconnect(&self) {
        let inner = &self.inner;

        if self.state() == ParticipantState::Disconnected {
            return;
        }

        if self.state() == ParticipantState::Started {
            if let Some(stop_tx) = inner.stop_tx.lock().take() {
                let _ = stop_tx.send(true);
            }
            let mut state_rx = inner.state_tx.subscribe();
            let _ = state_rx.wait_for(|s| *s == ParticipantState::Stopped).await;
        }

        let handle = inner.loop_handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }

        let conn = inner.conn.write().take();
        if let Some(conn) = conn {
            let _ = conn.close().await;
        }

        inner.state_tx.send_replace(ParticipantState::Disconnected);
        info!(participant = %inner.participant_id, "participant disconnected");
    }
}

impl ParticipantInner {
    /// Registers this participant with the cluster. When auto-join is
    /// allowed and no config exists yet, creates the config record and the
    /// per-instance subtrees; when auto-join is disabled and the config is
    /// absent, the join is rejected.
    pub(crate) async fn ensure_participant_config(
        &self,
        conn: &Connection,
    ) -> Result<()> {
        let config_path = self.keys.participant_config(&self.participant_id);
        let exists = conn.exists(&config_path).await?;
        let allow_join = self.auto_join_allowed(conn).await?;

        if !exists && allow_join {
            info!(participant = %self.participant_id, "auto-joining cluster");

            let mut record = Record::new(&self.participant_id);
            record.set_simple_field("HELIX_HOST", &self.host);
            record.set_simple_field("HELIX_PORT", &self.port);
            record.set_simple_field("HELIX_ENABLED", "true");
            conn.create_record(&config_path, &record).await?;

            for path in [
                self.keys.instance(&self.participant_id),
                self.keys.current_states(&self.participant_id),
                self.keys.errors(&self.participant_id),
                self.keys.health_report(&self.participant_id),
                self.keys.messages(&self.participant_id),
                self.keys.status_updates(&self.participant_id),
            ] {
                conn.ensure_path(&path).await?;
            }
        } else if !exists {
            return Err(ParticipantError::ConfigRejected(self.participant_id.clone()).into());
        }

        Ok(())
    }

    async fn auto_join_allowed(
        &self,
        conn: &Connection,
    ) -> Result<bool> {
        conn.get_simple_field_bool(&self.keys.cluster_config(), "allowParticipantAutoJoin")
            .await
    }

    /// Deletes every current-state subtree belonging to a session other
    /// than the live one.
    pub(crate) async fn purge_stale_sessions(
        &self,
        conn: &Connection,
    ) -> Result<()> {
        let current_states = self.keys.current_states(&self.participant_id);
        let session_id = conn.session_id();

        for session in conn.children(&current_states).await? {
            if session != session_id {
                info!(participant = %self.participant_id, stale = %session, "purging stale session state");
                conn.delete_tree(&format!("{current_states}/{session}")).await?;
            }
        }
        Ok(())
    }

    /// Creates the live-instance ephemeral. The previous session's node may
    /// not be reaped yet, so creation is retried on `NodeExists`.
    pub(crate) async fn create_live_instance(
        &self,
        conn: &Connection,
    ) -> Result<()> {
        let path = self.keys.live_instance(&self.participant_id);
        let record = live_instance_record(&self.participant_id, &conn.session_id());
        let data = record.to_bytes()?;

        let mut retries_left = self.config.connection.live_instance_create_retries;
        loop {
            match conn.create_ephemeral(&path, data.clone()).await {
                Ok(()) => return Ok(()),
                Err(Error::Coordinator(CoordinatorError::NodeExists(_))) if retries_left > 0 => {
                    retries_left -= 1;
                    debug!(
                        %path,
                        retries_left,
                        "live instance from previous session still present"
                    );
                    sleep(Duration::from_millis(
                        self.config.connection.live_instance_retry_delay_ms,
                    ))
                    .await;
                }
                Err(Error::Coordinator(CoordinatorError::NodeExists(_))) => {
                    return Err(
                        ParticipantError::LiveInstanceExists(self.participant_id.clone()).into(),
                    );
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Re-establishes everything tied to a coordinator session after
    /// expiry: fresh session, layout check, config ensure, stale state
    /// purge, live instance. Pre-connect callbacks are not re-invoked.
    pub(crate) async fn rejoin(&self) -> Result<Arc<Connection>> {
        let conn = Arc::new(
            Connection::open(self.connector.as_ref(), &self.endpoint, &self.config).await?,
        );

        if !conn.is_cluster_setup(&self.cluster_id).await? {
            return Err(ClusterError::NotSetup(self.cluster_id.clone()).into());
        }

        self.ensure_participant_config(&conn).await?;
        self.purge_stale_sessions(&conn).await?;
        self.create_live_instance(&conn).await?;

        *self.conn.write() = Some(conn.clone());
        info!(
            participant = %self.participant_id,
            session = %conn.session_id(),
            "rejoined cluster with new session"
        );
        Ok(conn)
    }

    /// Best-effort report under STATUSUPDATES; the message itself stays in
    /// place as the primary diagnostic.
    pub(crate) async fn report_transition_failure(
        &self,
        conn: &Connection,
        message: &Message,
        error: &Error,
    ) {
        let path = self.keys.status_update(&self.participant_id, message.id());

        let mut record = Record::new(message.id());
        record.set_simple_field("MESSAGE_ID", message.id());
        record.set_simple_field("ERROR", error.to_string());
        if let Ok(partition) = message.partition_name() {
            record.set_simple_field("PARTITION_NAME", partition);
        }
        record.set_int_field("TIMESTAMP", now_millis() as i64);

        if let Err(write_error) = conn.set_record(&path, &record).await {
            warn!(%path, %write_error, "failed to write transition failure status update");
        }
    }
}

/// Spawns the task that keeps a child watch armed on the participant's
/// MESSAGES path and forwards each snapshot to the dispatch loop.
fn start_message_watcher(
    inner: &Arc<ParticipantInner>,
    conn: &Arc<Connection>,
    stop_rx: &watch::Receiver<bool>,
) -> (mpsc::Receiver<Vec<String>>, JoinHandle<()>) {
    let (snapshot_tx, snapshot_rx) =
        mpsc::channel(inner.config.connection.snapshot_queue_size);
    let path = inner.keys.messages(&inner.participant_id);
    let conn = conn.clone();
    let mut stop_rx = stop_rx.clone();

    let handle = tokio::spawn(async move {
        loop {
            let (snapshot, event) = match conn.children_watch(&path).await {
                Ok(v) => v,
                Err(error) => {
                    warn!(%path, %error, "message watch failed");
                    break;
                }
            };

            if snapshot_tx.send(snapshot).await.is_err() {
                break;
            }

            tokio::select! {
                _ = stop_rx.changed() => break,
                // one-shot watch fired; loop to re-arm immediately
                _ = event => {}
            }
        }
    });

    (snapshot_rx, handle)
}

/// The participant's single dispatch task. Serializes all message
/// processing, owns the duplicate-suppression cache, and supervises session
/// expiry.
async fn run_event_loop(
    inner: Arc<ParticipantInner>,
    mut conn: Arc<Connection>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut session_rx = conn.session_events();
    let (mut snapshot_rx, mut watcher) = start_message_watcher(&inner, &conn, &stop_rx);
    let mut session_alive = true;
    let mut pump_alive = true;

    // processed message ids and when; entries older than the ttl are swept
    // so the map stays bounded
    let mut seen: HashMap<String, Instant> = HashMap::new();
    let seen_ttl = Duration::from_millis(inner.config.connection.message_seen_ttl_ms);
    let mut gc = tokio::time::interval(Duration::from_millis(
        inner.config.connection.message_gc_interval_ms,
    ));
    gc.set_missed_tick_behavior(MissedTickBehavior::Skip);

    inner.state_tx.send_replace(ParticipantState::Started);
    debug!(participant = %inner.participant_id, "participant event loop started");

    loop {
        tokio::select! {
            _ = stop_rx.changed() => break,

            snapshot = snapshot_rx.recv(), if pump_alive => {
                let Some(snapshot) = snapshot else {
                    pump_alive = false;
                    continue;
                };
                // each snapshot lists all unprocessed messages, so ids show
                // up repeatedly until deleted; the seen cache keeps
                // processing at-most-once inside its horizon
                for message_id in snapshot {
                    if seen.contains_key(&message_id) {
                        continue;
                    }
                    if let Err(error) = process::process_message(&inner, &conn, &message_id).await {
                        warn!(%message_id, %error, "message processing failed");
                    }
                    seen.insert(message_id, Instant::now());
                }
            }

            _ = gc.tick() => {
                seen.retain(|_, processed_at| processed_at.elapsed() < seen_ttl);
            }

            event = session_rx.recv(), if session_alive => {
                match event {
                    Ok(SessionEvent::Expired) => {
                        warn!(participant = %inner.participant_id, "coordinator session expired, rejoining");
                        watcher.abort();
                        match inner.rejoin().await {
                            Ok(new_conn) => {
                                conn = new_conn;
                                session_rx = conn.session_events();
                                let (rx, handle) = start_message_watcher(&inner, &conn, &stop_rx);
                                snapshot_rx = rx;
                                watcher = handle;
                                pump_alive = true;
                                seen.clear();
                            }
                            Err(error) => {
                                error!(%error, "failed to rejoin after session expiry");
                                break;
                            }
                        }
                    }
                    Ok(event) => debug!(?event, "session event"),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "session event stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => session_alive = false,
                }
            }
        }
    }

    watcher.abort();
    inner.state_tx.send_replace(ParticipantState::Stopped);
    debug!(participant = %inner.participant_id, "participant event loop stopped");
}
