//! The ephemeral presence marker a participant holds while its session is
//! alive.

use crate::record::Record;

/// Builds the record stored at `LIVEINSTANCES/<participant>`. Deletion is
/// implicit on session loss.
pub fn live_instance_record(
    participant_id: &str,
    session_id: &str,
) -> Record {
    let mut record = Record::new(participant_id);
    record.set_simple_field("LIVE_INSTANCE", participant_id);
    record.set_simple_field("SESSION_ID", session_id);
    record
}
