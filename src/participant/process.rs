//! The per-message dispatch pipeline.
//!
//! Runs on the participant's dispatch task only; per-partition ordering
//! follows from that serialization.

use std::sync::Arc;

use tracing::debug;
use tracing::info;
use tracing::warn;

use super::ParticipantInner;
use crate::constants::CONTROLLER_TARGET;
use crate::constants::DROPPED_STATE;
use crate::constants::TARGET_SESSION_WILDCARD;
use crate::coordinator::Connection;
use crate::model::Message;
use crate::model::MessageState;
use crate::model::MessageType;
use crate::record::Record;
use crate::CoordinatorError;
use crate::Error;
use crate::ParticipantError;
use crate::Result;

/// Processes a single message by id.
///
/// The contract, in order: read the record; drop NO_OPs; drop messages
/// addressed to a dead session; skip anything not in NEW state; claim the
/// message (READ); scaffold the current-state record for state transitions;
/// run the handler; publish the resulting state; delete the message. A
/// failing handler leaves the message behind marked UNPROCESSABLE and the
/// current state untouched.
pub(crate) async fn process_message(
    inner: &Arc<ParticipantInner>,
    conn: &Arc<Connection>,
    message_id: &str,
) -> Result<()> {
    let path = inner.keys.message(&inner.participant_id, message_id);

    let record = match conn.get_record(&path).await {
        Ok(record) => record,
        Err(Error::Coordinator(CoordinatorError::NoNode(_))) => {
            debug!(%message_id, "message already gone");
            return Ok(());
        }
        Err(error) => return Err(error),
    };
    let mut message = Message::from_record(record);

    if message.message_type() == MessageType::NoOp {
        info!(
            %message_id,
            source = message.source_name().unwrap_or(""),
            "dropping NO_OP message"
        );
        conn.delete_tree(&path).await?;
        return Ok(());
    }

    // a session mismatch normally means the message was addressed to an
    // expired session; remove it without running anything
    let session_id = conn.session_id();
    let target_session = message.target_session_id().unwrap_or("").to_string();
    if target_session != session_id && target_session != TARGET_SESSION_WILDCARD {
        info!(
            %message_id,
            expected = %session_id,
            target = %target_session,
            "deleting message addressed to expired session"
        );
        conn.delete_tree(&path).await?;
        return Ok(());
    }

    // READ messages stay until their state changes; UNPROCESSABLE ones are
    // an operator's problem
    if message.message_state() != MessageState::New {
        debug!(%message_id, state = ?message.message_state(), "skipping message not in NEW state");
        return Ok(());
    }

    message.mark_read(&session_id);
    conn.set_record(&path, message.record()).await?;

    let target_name = message.target_name().unwrap_or("").to_string();
    if !target_name.eq_ignore_ascii_case(CONTROLLER_TARGET)
        && message.message_type() == MessageType::StateTransition
    {
        ensure_current_state_record(inner, conn, &message, &session_id).await?;
    }

    match handle_state_transition(inner, conn, &path, &mut message).await {
        Ok(()) => {
            conn.delete_tree(&path).await?;
            Ok(())
        }
        Err(error) => {
            warn!(%message_id, %error, "state transition failed, leaving message for diagnosis");
            message.mark_unprocessable();
            if let Err(write_error) = conn.set_record(&path, message.record()).await {
                warn!(%message_id, %write_error, "failed to mark message unprocessable");
            }
            inner.report_transition_failure(conn, &message, &error).await;
            Err(error)
        }
    }
}

/// Creates the per-(session, resource) current-state record if absent,
/// seeded from the message's metadata.
async fn ensure_current_state_record(
    inner: &Arc<ParticipantInner>,
    conn: &Arc<Connection>,
    message: &Message,
    session_id: &str,
) -> Result<()> {
    let resource = message.resource_name()?.to_string();
    let path =
        inner
            .keys
            .current_state_for_resource(&inner.participant_id, session_id, &resource);

    if conn.exists(&path).await? {
        return Ok(());
    }

    let mut record = Record::new(&resource);
    record.set_int_field("BUCKET_SIZE", message.bucket_size());
    record.set_simple_field("STATE_MODEL_DEF", message.state_model_def()?);
    record.set_simple_field("SESSION_ID", session_id);
    record.set_bool_field("BATCH_MESSAGE_MODE", message.batch_message_mode());
    record.set_simple_field("STATE_MODEL_FACTORY_NAME", message.state_model_factory_name());

    debug!(%path, "creating current state record");
    conn.set_record(&path, &record).await
}

async fn handle_state_transition(
    inner: &Arc<ParticipantInner>,
    conn: &Arc<Connection>,
    path: &str,
    message: &mut Message,
) -> Result<()> {
    let from = message.from_state()?.to_string();
    let to = message.to_state()?.to_string();
    let model = message.state_model_def()?.to_string();
    let partition = message.partition_name()?.to_string();

    // missing model or edge is fatal for this message
    let handler = inner.state_models.read().handler(&model, &from, &to)?;

    message.set_execute_start();
    conn.set_record(path, message.record()).await?;

    pre_handle(message);

    debug!(%partition, %from, %to, %model, "invoking transition handler");
    handler(&partition).map_err(|error| ParticipantError::TransitionFailed {
        partition: partition.clone(),
        reason: error.to_string(),
    })?;

    post_handle(inner, conn, message).await
}

fn pre_handle(message: &Message) {
    debug!(message_id = %message.id(), "transition starting");
}

/// Publishes the transition outcome to the current-state record, unless the
/// session changed while the handler ran.
async fn post_handle(
    inner: &Arc<ParticipantInner>,
    conn: &Arc<Connection>,
    message: &Message,
) -> Result<()> {
    let session_id = conn.session_id();
    if let Some(target) = message.target_session_id() {
        if target != session_id && target != TARGET_SESSION_WILDCARD {
            info!(
                message_id = %message.id(),
                "session changed while handling transition, skipping current state write"
            );
            return Ok(());
        }
    }

    let to = message.to_state()?;
    let partition = message.partition_name()?;
    let resource = message.resource_name()?;
    let path =
        inner
            .keys
            .current_state_for_resource(&inner.participant_id, &session_id, resource);

    if to.eq_ignore_ascii_case(DROPPED_STATE) {
        // the partition is gone from this instance; its key goes with it
        conn.remove_map_field_key(&path, partition).await
    } else {
        conn.update_map_field(&path, partition, "CURRENT_STATE", to).await
    }
}
