//! Ideal-state authoring, used by the administrative surface when a resource
//! is added. Participants and spectators treat ideal states as read-only.

use crate::coordinator::Connection;
use crate::keys::KeyBuilder;
use crate::record::Record;
use crate::Result;

pub struct IdealState {
    record: Record,
}

impl IdealState {
    pub fn new(resource: impl Into<String>) -> Self {
        IdealState {
            record: Record::new(resource),
        }
    }

    pub fn resource(&self) -> &str {
        &self.record.id
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn set_num_partitions(
        &mut self,
        num_partitions: usize,
    ) {
        self.record.set_int_field("NUM_PARTITIONS", num_partitions as i64);
    }

    pub fn set_replicas(
        &mut self,
        replicas: usize,
    ) {
        self.record.set_int_field("REPLICAS", replicas as i64);
    }

    pub fn set_rebalance_mode(
        &mut self,
        mode: &str,
    ) {
        self.record.set_simple_field("REBALANCE_MODE", mode.to_ascii_uppercase());
    }

    pub fn set_state_model_def_ref(
        &mut self,
        state_model: &str,
    ) {
        self.record.set_simple_field("STATE_MODEL_DEF_REF", state_model);
    }

    pub async fn save(
        &self,
        conn: &Connection,
        cluster_id: &str,
    ) -> Result<()> {
        let keys = KeyBuilder::new(cluster_id);
        let path = keys.ideal_state_for_resource(&self.record.id);
        conn.create_record(&path, &self.record).await
    }
}
