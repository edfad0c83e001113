//! Read-only view over the state-model definition records installed under
//! `STATEMODELDEFS`.
//!
//! The definition format: `simpleFields.INITIAL_STATE`;
//! `listFields.STATE_PRIORITY_LIST` and `STATE_TRANSITION_PRIORITYLIST`;
//! per-state `mapFields` entries `<STATE>.meta` (with a `count` of `"1"`,
//! `"-1"`, `"R"` or `"N"`) and `<STATE>.next` (next-hop table keyed by
//! destination state).

use crate::record::Record;
use crate::CodecError;

pub struct StateModelDef {
    record: Record,
}

impl StateModelDef {
    pub fn from_record(record: Record) -> Self {
        StateModelDef { record }
    }

    pub fn name(&self) -> &str {
        &self.record.id
    }

    pub fn initial_state(&self) -> std::result::Result<&str, CodecError> {
        self.record.require_simple_field("INITIAL_STATE")
    }

    pub fn state_priority_list(&self) -> &[String] {
        self.record.get_list_field("STATE_PRIORITY_LIST").unwrap_or_default()
    }

    pub fn transition_priority_list(&self) -> &[String] {
        self.record
            .get_list_field("STATE_TRANSITION_PRIORITYLIST")
            .unwrap_or_default()
    }

    /// Replica count constraint for a state: a number, `R` (replica count)
    /// or `N` (all nodes).
    pub fn count(
        &self,
        state: &str,
    ) -> Option<&str> {
        self.record.get_map_field(&format!("{state}.meta"), "count")
    }

    /// Next hop from `state` towards `destination`, per the definition's
    /// routing table.
    pub fn next(
        &self,
        state: &str,
        destination: &str,
    ) -> Option<&str> {
        self.record.get_map_field(&format!("{state}.next"), destination)
    }
}
