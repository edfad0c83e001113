//! Watcher tasks feeding the spectator's notification channel.
//!
//! Every coordinator watch is one-shot, so each task is a loop of
//! read-with-watch, push notification, await the fire, re-arm. Tasks exit
//! when the stop channel closes, when the notification channel is gone, or
//! when the watched node disappears.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::interval;
use tokio::time::MissedTickBehavior;
use tracing::debug;
use tracing::warn;

use super::ChangeKind;
use super::SpectatorInner;
use crate::coordinator::Connection;
use crate::CoordinatorError;
use crate::Error;
use crate::Result;

/// Root watcher for the set-of-resources categories (external view, ideal
/// state, instance config). Maintains the tracking map with a GC-safe
/// sweep: newly appeared members get a data watcher, all tracked entries
/// are marked inactive, then everything present in the snapshot is marked
/// active again.
pub(super) async fn watch_resource_group(
    inner: Arc<SpectatorInner>,
    conn: Arc<Connection>,
    kind: ChangeKind,
    mut stop_rx: watch::Receiver<bool>,
) {
    let root = inner.group_root(kind);

    loop {
        let (members, event) = match conn.children_watch(&root).await {
            Ok(v) => v,
            Err(error) => {
                warn!(%root, %error, "resource group watch failed");
                break;
            }
        };

        for member in &members {
            let tracked = inner.group_tracked(kind);
            if !tracked.contains_key(member) {
                tracked.insert(member.clone(), true);
                tokio::spawn(watch_group_member(
                    inner.clone(),
                    conn.clone(),
                    kind,
                    member.clone(),
                    stop_rx.clone(),
                ));
            }
        }

        {
            let tracked = inner.group_tracked(kind);
            for mut entry in tracked.iter_mut() {
                *entry.value_mut() = false;
            }
            for member in &members {
                if let Some(mut entry) = tracked.get_mut(member) {
                    *entry = true;
                }
            }
        }

        if inner.notify(kind, None).await.is_err() {
            break;
        }

        tokio::select! {
            _ = stop_rx.changed() => break,
            _ = event => {}
        }
    }

    debug!(%root, "resource group watcher exiting");
}

/// Data watcher for one member of a resource group.
async fn watch_group_member(
    inner: Arc<SpectatorInner>,
    conn: Arc<Connection>,
    kind: ChangeKind,
    member: String,
    mut stop_rx: watch::Receiver<bool>,
) {
    let path = inner.group_member_path(kind, &member);

    loop {
        let event = match conn.get_watch(&path).await {
            Ok((_, event)) => event,
            Err(Error::Coordinator(CoordinatorError::NoNode(_))) => {
                debug!(%path, "watched member gone, watcher exiting");
                break;
            }
            Err(error) => {
                warn!(%path, %error, "member watch failed");
                break;
            }
        };

        tokio::select! {
            _ = stop_rx.changed() => break,
            _ = event => {}
        }

        if inner.notify(kind, Some(member.clone())).await.is_err() {
            break;
        }
    }
}

pub(super) async fn watch_live_instances(
    inner: Arc<SpectatorInner>,
    conn: Arc<Connection>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let path = inner.keys.live_instances();

    loop {
        let (_, event) = match conn.children_watch(&path).await {
            Ok(v) => v,
            Err(error) => {
                warn!(%path, %error, "live instance watch failed");
                break;
            }
        };

        if inner.notify(ChangeKind::LiveInstances, None).await.is_err() {
            break;
        }

        tokio::select! {
            _ = stop_rx.changed() => break,
            _ = event => {}
        }
    }
}

pub(super) async fn watch_controller_messages(
    inner: Arc<SpectatorInner>,
    conn: Arc<Connection>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let path = inner.keys.controller_messages();

    loop {
        let (_, event) = match conn.children_watch(&path).await {
            Ok(v) => v,
            Err(error) => {
                warn!(%path, %error, "controller message watch failed");
                break;
            }
        };

        if inner
            .notify(ChangeKind::ControllerMessages, None)
            .await
            .is_err()
        {
            break;
        }

        tokio::select! {
            _ = stop_rx.changed() => break,
            _ = event => {}
        }
    }
}

/// Child watcher on one instance's MESSAGES path. New ids are recorded in
/// the bounded dedupe cache; each snapshot produces one notification
/// carrying the instance id.
pub(super) async fn watch_instance_messages(
    inner: Arc<SpectatorInner>,
    conn: Arc<Connection>,
    instance: String,
    mut stop_rx: watch::Receiver<bool>,
) {
    let path = inner.keys.messages(&instance);

    loop {
        let (messages, event) = match conn.children_watch(&path).await {
            Ok(v) => v,
            Err(error) => {
                warn!(%path, %error, "instance message watch failed");
                break;
            }
        };

        {
            let mut cache = inner.received_messages.lock();
            for message_id in &messages {
                if !cache.contains(message_id) {
                    cache.put(message_id.clone(), ());
                }
            }
        }

        if inner
            .notify(ChangeKind::InstanceMessages, Some(instance.clone()))
            .await
            .is_err()
        {
            break;
        }

        tokio::select! {
            _ = stop_rx.changed() => break,
            _ = event => {}
        }
    }
}

/// Locates the instance's active session and starts a data watcher for each
/// of its current-state resources.
pub(super) async fn watch_current_state_for_instance(
    inner: Arc<SpectatorInner>,
    conn: Arc<Connection>,
    instance: String,
    stop_rx: watch::Receiver<bool>,
) -> Result<()> {
    let sessions = conn.children(&inner.keys.current_states(&instance)).await?;

    let Some(session) = sessions.first() else {
        debug!(%instance, "no active session, no current state to watch");
        return Ok(());
    };

    let resources = conn
        .children(&inner.keys.current_states_for_session(&instance, session))
        .await?;

    for resource in resources {
        tokio::spawn(watch_current_state_resource(
            inner.clone(),
            conn.clone(),
            instance.clone(),
            session.clone(),
            resource,
            stop_rx.clone(),
        ));
    }
    Ok(())
}

/// Data watcher on one (instance, session, resource) current-state record.
/// A liveness probe deletes the watch once the path disappears (the session
/// expired or the resource was dropped).
async fn watch_current_state_resource(
    inner: Arc<SpectatorInner>,
    conn: Arc<Connection>,
    instance: String,
    session: String,
    resource: String,
    mut stop_rx: watch::Receiver<bool>,
) {
    let path = inner
        .keys
        .current_state_for_resource(&instance, &session, &resource);
    inner.current_state_watches.insert(path.clone(), ());

    let mut probe = interval(Duration::from_millis(
        inner.config.connection.current_state_probe_interval_ms,
    ));
    probe.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // the first tick completes immediately; skip it so the probe really is
    // periodic
    probe.tick().await;

    loop {
        let event = match conn.get_watch(&path).await {
            Ok((_, event)) => event,
            Err(_) => break,
        };

        tokio::select! {
            _ = stop_rx.changed() => break,

            _ = event => {
                if inner
                    .notify(ChangeKind::CurrentState, Some(instance.clone()))
                    .await
                    .is_err()
                {
                    break;
                }
            }

            _ = probe.tick() => {
                match conn.exists(&path).await {
                    Ok(true) => {}
                    // session gone or resource dropped
                    _ => break,
                }
            }
        }
    }

    inner.current_state_watches.remove(&path);
    debug!(%path, "current state watcher exiting");
}
