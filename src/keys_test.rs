#[cfg(test)]
mod tests {
    use crate::keys::KeyBuilder;

    #[test]
    fn test_cluster_level_paths() {
        let keys = KeyBuilder::new("MYCLUSTER");

        assert_eq!(keys.cluster(), "/MYCLUSTER");
        assert_eq!(keys.cluster_config(), "/MYCLUSTER/CONFIGS/CLUSTER/MYCLUSTER");
        assert_eq!(keys.external_view(), "/MYCLUSTER/EXTERNALVIEW");
        assert_eq!(keys.ideal_states(), "/MYCLUSTER/IDEALSTATES");
        assert_eq!(keys.property_store(), "/MYCLUSTER/PROPERTYSTORE");
        assert_eq!(keys.live_instances(), "/MYCLUSTER/LIVEINSTANCES");
        assert_eq!(keys.instances(), "/MYCLUSTER/INSTANCES");
        assert_eq!(keys.state_model_defs(), "/MYCLUSTER/STATEMODELDEFS");
        assert_eq!(keys.controller(), "/MYCLUSTER/CONTROLLER");
        assert_eq!(keys.controller_errors(), "/MYCLUSTER/CONTROLLER/ERRORS");
        assert_eq!(keys.controller_history(), "/MYCLUSTER/CONTROLLER/HISTORY");
        assert_eq!(keys.controller_messages(), "/MYCLUSTER/CONTROLLER/MESSAGES");
        assert_eq!(
            keys.controller_status_updates(),
            "/MYCLUSTER/CONTROLLER/STATUSUPDATES"
        );
    }

    #[test]
    fn test_participant_paths() {
        let keys = KeyBuilder::new("C");

        assert_eq!(keys.participant_configs(), "/C/CONFIGS/PARTICIPANT");
        assert_eq!(keys.participant_config("h_1000"), "/C/CONFIGS/PARTICIPANT/h_1000");
        assert_eq!(keys.instance("h_1000"), "/C/INSTANCES/h_1000");
        assert_eq!(keys.live_instance("h_1000"), "/C/LIVEINSTANCES/h_1000");
        assert_eq!(keys.messages("h_1000"), "/C/INSTANCES/h_1000/MESSAGES");
        assert_eq!(keys.message("h_1000", "m1"), "/C/INSTANCES/h_1000/MESSAGES/m1");
        assert_eq!(keys.errors("h_1000"), "/C/INSTANCES/h_1000/ERRORS");
        assert_eq!(keys.health_report("h_1000"), "/C/INSTANCES/h_1000/HEALTHREPORT");
        assert_eq!(keys.status_updates("h_1000"), "/C/INSTANCES/h_1000/STATUSUPDATES");
    }

    #[test]
    fn test_current_state_paths() {
        let keys = KeyBuilder::new("C");

        assert_eq!(keys.current_states("h_1000"), "/C/INSTANCES/h_1000/CURRENTSTATES");
        assert_eq!(
            keys.current_states_for_session("h_1000", "s1"),
            "/C/INSTANCES/h_1000/CURRENTSTATES/s1"
        );
        assert_eq!(
            keys.current_state_for_resource("h_1000", "s1", "myDB"),
            "/C/INSTANCES/h_1000/CURRENTSTATES/s1/myDB"
        );
    }

    #[test]
    fn test_resource_paths() {
        let keys = KeyBuilder::new("C");

        assert_eq!(keys.ideal_state_for_resource("myDB"), "/C/IDEALSTATES/myDB");
        assert_eq!(keys.external_view_for_resource("myDB"), "/C/EXTERNALVIEW/myDB");
        assert_eq!(keys.resource_config("myDB"), "/C/CONFIGS/RESOURCE/myDB");
        assert_eq!(keys.state_model_def("MasterSlave"), "/C/STATEMODELDEFS/MasterSlave");
    }
}
