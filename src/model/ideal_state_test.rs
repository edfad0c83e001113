use super::ideal_state::IdealState;

#[test]
fn test_ideal_state_fields() {
    let mut is = IdealState::new("myDB");

    is.set_num_partitions(32);
    assert_eq!(is.record().get_simple_field("NUM_PARTITIONS"), Some("32"));

    is.set_state_model_def_ref("MasterSlave");
    assert_eq!(is.record().get_simple_field("STATE_MODEL_DEF_REF"), Some("MasterSlave"));

    is.set_rebalance_mode("semi_auto");
    assert_eq!(is.record().get_simple_field("REBALANCE_MODE"), Some("SEMI_AUTO"));

    is.set_replicas(3);
    assert_eq!(is.record().get_simple_field("REPLICAS"), Some("3"));

    assert_eq!(is.resource(), "myDB");
}
