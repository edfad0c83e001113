//! Coordinator path layout for a cluster.
//!
//! Pure string formatting; every entity the protocol touches lives at a
//! well-known path under `/<cluster>`.

/// Builds coordinator paths for one cluster.
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    cluster_id: String,
}

impl KeyBuilder {
    pub fn new(cluster_id: impl Into<String>) -> Self {
        KeyBuilder {
            cluster_id: cluster_id.into(),
        }
    }

    pub fn cluster(&self) -> String {
        format!("/{}", self.cluster_id)
    }

    pub fn cluster_config(&self) -> String {
        format!("/{}/CONFIGS/CLUSTER/{}", self.cluster_id, self.cluster_id)
    }

    pub fn external_view(&self) -> String {
        format!("/{}/EXTERNALVIEW", self.cluster_id)
    }

    pub fn external_view_for_resource(
        &self,
        resource: &str,
    ) -> String {
        format!("/{}/EXTERNALVIEW/{}", self.cluster_id, resource)
    }

    pub fn property_store(&self) -> String {
        format!("/{}/PROPERTYSTORE", self.cluster_id)
    }

    pub fn controller(&self) -> String {
        format!("/{}/CONTROLLER", self.cluster_id)
    }

    pub fn controller_errors(&self) -> String {
        format!("/{}/CONTROLLER/ERRORS", self.cluster_id)
    }

    pub fn controller_history(&self) -> String {
        format!("/{}/CONTROLLER/HISTORY", self.cluster_id)
    }

    pub fn controller_messages(&self) -> String {
        format!("/{}/CONTROLLER/MESSAGES", self.cluster_id)
    }

    pub fn controller_message(
        &self,
        message_id: &str,
    ) -> String {
        format!("/{}/CONTROLLER/MESSAGES/{}", self.cluster_id, message_id)
    }

    pub fn controller_status_updates(&self) -> String {
        format!("/{}/CONTROLLER/STATUSUPDATES", self.cluster_id)
    }

    pub fn ideal_states(&self) -> String {
        format!("/{}/IDEALSTATES", self.cluster_id)
    }

    pub fn ideal_state_for_resource(
        &self,
        resource: &str,
    ) -> String {
        format!("/{}/IDEALSTATES/{}", self.cluster_id, resource)
    }

    pub fn resource_config(
        &self,
        resource: &str,
    ) -> String {
        format!("/{}/CONFIGS/RESOURCE/{}", self.cluster_id, resource)
    }

    pub fn participant_configs(&self) -> String {
        format!("/{}/CONFIGS/PARTICIPANT", self.cluster_id)
    }

    pub fn participant_config(
        &self,
        participant_id: &str,
    ) -> String {
        format!("/{}/CONFIGS/PARTICIPANT/{}", self.cluster_id, participant_id)
    }

    pub fn live_instances(&self) -> String {
        format!("/{}/LIVEINSTANCES", self.cluster_id)
    }

    pub fn live_instance(
        &self,
        participant_id: &str,
    ) -> String {
        format!("/{}/LIVEINSTANCES/{}", self.cluster_id, participant_id)
    }

    pub fn instances(&self) -> String {
        format!("/{}/INSTANCES", self.cluster_id)
    }

    pub fn instance(
        &self,
        participant_id: &str,
    ) -> String {
        format!("/{}/INSTANCES/{}", self.cluster_id, participant_id)
    }

    pub fn current_states(
        &self,
        participant_id: &str,
    ) -> String {
        format!("/{}/INSTANCES/{}/CURRENTSTATES", self.cluster_id, participant_id)
    }

    pub fn current_states_for_session(
        &self,
        participant_id: &str,
        session_id: &str,
    ) -> String {
        format!(
            "/{}/INSTANCES/{}/CURRENTSTATES/{}",
            self.cluster_id, participant_id, session_id
        )
    }

    pub fn current_state_for_resource(
        &self,
        participant_id: &str,
        session_id: &str,
        resource: &str,
    ) -> String {
        format!(
            "/{}/INSTANCES/{}/CURRENTSTATES/{}/{}",
            self.cluster_id, participant_id, session_id, resource
        )
    }

    /// The canonical per-participant errors subtree.
    pub fn errors(
        &self,
        participant_id: &str,
    ) -> String {
        format!("/{}/INSTANCES/{}/ERRORS", self.cluster_id, participant_id)
    }

    pub fn health_report(
        &self,
        participant_id: &str,
    ) -> String {
        format!("/{}/INSTANCES/{}/HEALTHREPORT", self.cluster_id, participant_id)
    }

    pub fn status_updates(
        &self,
        participant_id: &str,
    ) -> String {
        format!("/{}/INSTANCES/{}/STATUSUPDATES", self.cluster_id, participant_id)
    }

    pub fn status_update(
        &self,
        participant_id: &str,
        update_id: &str,
    ) -> String {
        format!(
            "/{}/INSTANCES/{}/STATUSUPDATES/{}",
            self.cluster_id, participant_id, update_id
        )
    }

    pub fn state_model_defs(&self) -> String {
        format!("/{}/STATEMODELDEFS", self.cluster_id)
    }

    pub fn state_model_def(
        &self,
        model: &str,
    ) -> String {
        format!("/{}/STATEMODELDEFS/{}", self.cluster_id, model)
    }

    pub fn messages(
        &self,
        participant_id: &str,
    ) -> String {
        format!("/{}/INSTANCES/{}/MESSAGES", self.cluster_id, participant_id)
    }

    pub fn message(
        &self,
        participant_id: &str,
        message_id: &str,
    ) -> String {
        format!(
            "/{}/INSTANCES/{}/MESSAGES/{}",
            self.cluster_id, participant_id, message_id
        )
    }
}
