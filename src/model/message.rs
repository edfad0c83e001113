//! Typed view over the message records a controller writes under
//! `INSTANCES/<participant>/MESSAGES`.

use crate::constants::DEFAULT_STATE_MODEL_FACTORY;
use crate::record::Record;
use crate::utils::time::now_millis;
use crate::utils::time::now_secs;
use crate::CodecError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageType {
    StateTransition,
    NoOp,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageState {
    New,
    Read,
    Unprocessable,
    Other(String),
}

/// A message record in flight. Owned by the handler currently processing it;
/// mutations happen on this copy and are written back explicitly.
#[derive(Debug, Clone)]
pub struct Message {
    record: Record,
}

impl Message {
    pub fn from_record(record: Record) -> Self {
        Message { record }
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn into_record(self) -> Record {
        self.record
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn message_type(&self) -> MessageType {
        match self
            .record
            .get_simple_field("MSG_TYPE")
            .unwrap_or_default()
            .to_ascii_uppercase()
            .as_str()
        {
            "STATE_TRANSITION" => MessageType::StateTransition,
            "NO_OP" => MessageType::NoOp,
            other => MessageType::Other(other.to_string()),
        }
    }

    /// Case-insensitive: the reference controller writes both `new` and
    /// `NEW`.
    pub fn message_state(&self) -> MessageState {
        match self
            .record
            .get_simple_field("MSG_STATE")
            .unwrap_or_default()
            .to_ascii_uppercase()
            .as_str()
        {
            "NEW" => MessageState::New,
            "READ" => MessageState::Read,
            "UNPROCESSABLE" => MessageState::Unprocessable,
            other => MessageState::Other(other.to_string()),
        }
    }

    pub fn target_session_id(&self) -> Option<&str> {
        self.record.get_simple_field("TGT_SESSION_ID")
    }

    pub fn target_name(&self) -> Option<&str> {
        self.record.get_simple_field("TGT_NAME")
    }

    pub fn source_name(&self) -> Option<&str> {
        self.record.get_simple_field("SRC_NAME")
    }

    pub fn from_state(&self) -> std::result::Result<&str, CodecError> {
        self.record.require_simple_field("FROM_STATE")
    }

    pub fn to_state(&self) -> std::result::Result<&str, CodecError> {
        self.record.require_simple_field("TO_STATE")
    }

    pub fn partition_name(&self) -> std::result::Result<&str, CodecError> {
        self.record.require_simple_field("PARTITION_NAME")
    }

    pub fn resource_name(&self) -> std::result::Result<&str, CodecError> {
        self.record.require_simple_field("RESOURCE_NAME")
    }

    pub fn state_model_def(&self) -> std::result::Result<&str, CodecError> {
        self.record.require_simple_field("STATE_MODEL_DEF")
    }

    pub fn state_model_factory_name(&self) -> &str {
        self.record
            .get_simple_field("STATE_MODEL_FACTORY_NAME")
            .unwrap_or(DEFAULT_STATE_MODEL_FACTORY)
    }

    pub fn bucket_size(&self) -> i64 {
        self.record.get_int_field("BUCKET_SIZE", 0)
    }

    pub fn batch_message_mode(&self) -> bool {
        self.record.get_bool_field("BATCH_MESSAGE_MODE", false)
    }

    /// Claims the message for this session: `READ` state, read timestamp,
    /// executing session id.
    pub fn mark_read(
        &mut self,
        session_id: &str,
    ) {
        self.record.set_simple_field("MSG_STATE", "READ");
        self.record.set_int_field("READ_TIMESTAMP", now_secs() as i64);
        self.record.set_simple_field("EXE_SESSION_ID", session_id);
    }

    /// Left behind for operator diagnosis when a handler fails.
    pub fn mark_unprocessable(&mut self) {
        self.record.set_simple_field("MSG_STATE", "UNPROCESSABLE");
    }

    pub fn set_execute_start(&mut self) {
        self.record
            .set_int_field("EXECUTE_START_TIMESTAMP", now_millis() as i64);
    }
}
