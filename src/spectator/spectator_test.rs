use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use crate::context::Context;
use crate::record::Record;
use crate::test_utils::open_connection;
use crate::test_utils::setup_cluster;
use crate::test_utils::shared_vec;
use crate::test_utils::test_manager;
use crate::test_utils::wait_until;
use crate::test_utils::MemoryEnsemble;

const DEADLINE: Duration = Duration::from_secs(5);

fn ids(records: &[Record]) -> HashSet<String> {
    records.iter().map(|r| r.id.clone()).collect()
}

async fn write_external_view(
    ensemble: &MemoryEnsemble,
    cluster: &str,
    resource: &str,
) {
    let conn = open_connection(ensemble).await;
    let mut record = Record::new(resource);
    record.set_map_field(format!("{resource}_0"), "h_1000", "MASTER");
    conn.create_record(&format!("/{cluster}/EXTERNALVIEW/{resource}"), &record)
        .await
        .expect("write external view");
}

// Scenario: an external-view listener sees the initial resource set, and
// again when a resource is added.
#[tokio::test]
async fn test_external_view_listener_sees_resources() {
    let ensemble = MemoryEnsemble::new();
    setup_cluster(&ensemble, "C").await;
    write_external_view(&ensemble, "C", "R1").await;
    write_external_view(&ensemble, "C", "R2").await;

    let snapshots = shared_vec();
    let spectator = test_manager(&ensemble).new_spectator("C");
    {
        let snapshots = snapshots.clone();
        spectator.add_external_view_change_listener(move |records, _context| {
            snapshots.lock().push(records);
        });
    }

    spectator.connect().await.expect("connect");

    assert!(
        wait_until(DEADLINE, || async {
            snapshots
                .lock()
                .iter()
                .any(|s| ids(s) == HashSet::from(["R1".to_string(), "R2".to_string()]))
        })
        .await,
        "initial snapshot should include R1 and R2"
    );

    write_external_view(&ensemble, "C", "R3").await;

    assert!(
        wait_until(DEADLINE, || async {
            snapshots.lock().iter().any(|s| {
                ids(s)
                    == HashSet::from(["R1".to_string(), "R2".to_string(), "R3".to_string()])
            })
        })
        .await,
        "listener should observe the new resource"
    );

    spectator.disconnect().await;
}

// A data change on a tracked resource sets the "trigger" context key.
#[tokio::test]
async fn test_external_view_member_change_sets_trigger() {
    let ensemble = MemoryEnsemble::new();
    setup_cluster(&ensemble, "C").await;
    write_external_view(&ensemble, "C", "R1").await;

    let triggers = shared_vec();
    let spectator = test_manager(&ensemble).new_spectator("C");
    let context = Arc::new(Context::new());
    spectator.set_context(context.clone());
    {
        let triggers = triggers.clone();
        spectator.add_external_view_change_listener(move |_records, context| {
            if let Some(trigger) = context.get::<String>("trigger") {
                triggers.lock().push(trigger);
            }
        });
    }

    spectator.connect().await.expect("connect");

    // keep mutating until the member watcher (armed asynchronously after
    // connect) observes a change
    let conn = open_connection(&ensemble).await;
    assert!(
        wait_until(DEADLINE, || async {
            conn.update_map_field("/C/EXTERNALVIEW/R1", "R1_0", "h_1000", "SLAVE")
                .await
                .expect("mutate external view");
            triggers.lock().iter().any(|t| t == "R1")
        })
        .await,
        "trigger context key should carry the changed resource"
    );

    spectator.disconnect().await;
}

#[tokio::test]
async fn test_ideal_state_listener_fires_on_resource_add() {
    let ensemble = MemoryEnsemble::new();
    let admin = setup_cluster(&ensemble, "C").await;

    let snapshots = shared_vec();
    let spectator = test_manager(&ensemble).new_spectator("C");
    {
        let snapshots = snapshots.clone();
        spectator.add_ideal_state_change_listener(move |records, _context| {
            snapshots.lock().push(records);
        });
    }
    spectator.connect().await.expect("connect");

    // initial notification, possibly empty
    assert!(wait_until(DEADLINE, || async { !snapshots.lock().is_empty() }).await);

    admin
        .add_resource("C", "myDB", 8, "MasterSlave")
        .await
        .expect("add resource");

    assert!(
        wait_until(DEADLINE, || async {
            snapshots
                .lock()
                .iter()
                .any(|s| ids(s).contains("myDB"))
        })
        .await,
        "ideal state snapshot should include the new resource"
    );

    spectator.disconnect().await;
}

#[tokio::test]
async fn test_live_instance_listener_fires() {
    let ensemble = MemoryEnsemble::new();
    setup_cluster(&ensemble, "C").await;

    let snapshots = shared_vec();
    let spectator = test_manager(&ensemble).new_spectator("C");
    {
        let snapshots = snapshots.clone();
        spectator.add_live_instance_change_listener(move |records, _context| {
            snapshots.lock().push(records);
        });
    }
    spectator.connect().await.expect("connect");

    // every listener registered before connect fires at least once
    assert!(wait_until(DEADLINE, || async { !snapshots.lock().is_empty() }).await);

    let conn = open_connection(&ensemble).await;
    let mut record = Record::new("h_2000");
    record.set_simple_field("SESSION_ID", "s-test");
    conn.create_record("/C/LIVEINSTANCES/h_2000", &record)
        .await
        .expect("announce instance");

    assert!(
        wait_until(DEADLINE, || async {
            snapshots.lock().iter().any(|s| ids(s).contains("h_2000"))
        })
        .await,
        "listener should observe the new live instance"
    );

    spectator.disconnect().await;
}

#[tokio::test]
async fn test_instance_config_listener_fires_on_add_node() {
    let ensemble = MemoryEnsemble::new();
    let admin = setup_cluster(&ensemble, "C").await;

    let snapshots = shared_vec();
    let spectator = test_manager(&ensemble).new_spectator("C");
    {
        let snapshots = snapshots.clone();
        spectator.add_instance_config_change_listener(move |records, _context| {
            snapshots.lock().push(records);
        });
    }
    spectator.connect().await.expect("connect");

    admin.add_node("C", "h_3000").await.expect("add node");

    assert!(
        wait_until(DEADLINE, || async {
            snapshots.lock().iter().any(|s| ids(s).contains("h_3000"))
        })
        .await,
        "instance config snapshot should include the new node"
    );

    spectator.disconnect().await;
}

#[tokio::test]
async fn test_controller_message_listener_fires() {
    let ensemble = MemoryEnsemble::new();
    setup_cluster(&ensemble, "C").await;

    let snapshots = shared_vec();
    let spectator = test_manager(&ensemble).new_spectator("C");
    {
        let snapshots = snapshots.clone();
        spectator.add_controller_message_listener(move |records, _context| {
            snapshots.lock().push(records);
        });
    }
    spectator.connect().await.expect("connect");

    let conn = open_connection(&ensemble).await;
    let mut record = Record::new("cm1");
    record.set_simple_field("MSG_TYPE", "NO_OP");
    conn.create_record("/C/CONTROLLER/MESSAGES/cm1", &record)
        .await
        .expect("write controller message");

    assert!(
        wait_until(DEADLINE, || async {
            snapshots.lock().iter().any(|s| ids(s).contains("cm1"))
        })
        .await,
        "controller message should reach the listener"
    );

    spectator.disconnect().await;
}

// Message listeners added after connect start their watcher immediately.
#[tokio::test]
async fn test_dynamic_message_listener() {
    let ensemble = MemoryEnsemble::new();
    let admin = setup_cluster(&ensemble, "C").await;
    admin.add_node("C", "h_1000").await.expect("add node");

    let spectator = test_manager(&ensemble).new_spectator("C");
    spectator.connect().await.expect("connect");

    let seen = shared_vec();
    {
        let seen = seen.clone();
        spectator
            .add_message_listener("h_1000", move |instance, records, _context| {
                seen.lock().push((instance, ids(&records)));
            })
            .await;
    }

    let conn = open_connection(&ensemble).await;
    let mut record = Record::new("im1");
    record.set_simple_field("MSG_TYPE", "STATE_TRANSITION");
    record.set_simple_field("MSG_STATE", "NEW");
    conn.create_record("/C/INSTANCES/h_1000/MESSAGES/im1", &record)
        .await
        .expect("write instance message");

    assert!(
        wait_until(DEADLINE, || async {
            seen.lock()
                .iter()
                .any(|(instance, message_ids)| instance == "h_1000" && message_ids.contains("im1"))
        })
        .await,
        "instance message should reach the dynamically added listener"
    );

    spectator.disconnect().await;
}

// Current-state listeners watch the instance's active session resources.
#[tokio::test]
async fn test_current_state_listener_observes_updates() {
    let ensemble = MemoryEnsemble::new();
    setup_cluster(&ensemble, "C").await;

    let conn = open_connection(&ensemble).await;
    let mut record = Record::new("myDB");
    record.set_simple_field("SESSION_ID", "s1");
    record.set_map_field("myDB_0", "CURRENT_STATE", "OFFLINE");
    conn.create_record("/C/INSTANCES/h_1000/CURRENTSTATES/s1/myDB", &record)
        .await
        .expect("seed current state");

    let snapshots = shared_vec();
    let spectator = test_manager(&ensemble).new_spectator("C");
    {
        let snapshots = snapshots.clone();
        spectator
            .add_current_state_change_listener("h_1000", move |instance, records, _context| {
                snapshots.lock().push((instance, records));
            })
            .await;
    }
    spectator.connect().await.expect("connect");

    // the watcher arms asynchronously after connect; keep mutating until it
    // observes a change
    assert!(
        wait_until(DEADLINE, || async {
            conn.update_map_field(
                "/C/INSTANCES/h_1000/CURRENTSTATES/s1/myDB",
                "myDB_0",
                "CURRENT_STATE",
                "SLAVE",
            )
            .await
            .expect("mutate current state");

            snapshots.lock().iter().any(|(instance, records)| {
                instance == "h_1000"
                    && records
                        .iter()
                        .any(|r| r.get_map_field("myDB_0", "CURRENT_STATE") == Some("SLAVE"))
            })
        })
        .await,
        "current state change should reach the listener"
    );

    spectator.disconnect().await;
}

#[tokio::test]
async fn test_snapshot_accessors() {
    let ensemble = MemoryEnsemble::new();
    let admin = setup_cluster(&ensemble, "C").await;
    admin.add_node("C", "h_1000").await.expect("add node");
    admin
        .add_resource("C", "myDB", 4, "MasterSlave")
        .await
        .expect("add resource");
    write_external_view(&ensemble, "C", "myDB").await;

    let spectator = test_manager(&ensemble).new_spectator("C");
    // a listener so the external-view tracking map is populated
    spectator.add_external_view_change_listener(|_records, _context| {});
    spectator.connect().await.expect("connect");

    assert!(
        wait_until(DEADLINE, || async {
            spectator
                .get_external_view()
                .await
                .map(|view| ids(&view).contains("myDB"))
                .unwrap_or(false)
        })
        .await
    );

    let configs = spectator.get_instance_configs().await.expect("configs");
    assert!(ids(&configs).contains("h_1000"));

    let live = spectator.get_live_instances().await.expect("live");
    assert!(live.is_empty());

    let messages = spectator.get_instance_messages("h_1000").await.expect("messages");
    assert!(messages.is_empty());

    spectator.disconnect().await;
}

#[tokio::test]
async fn test_disconnect_idempotent_and_acknowledged() {
    let ensemble = MemoryEnsemble::new();
    setup_cluster(&ensemble, "C").await;

    let spectator = test_manager(&ensemble).new_spectator("C");
    spectator.add_external_view_change_listener(|_records, _context| {});
    spectator.connect().await.expect("connect");
    assert!(spectator.is_connected());

    timeout(DEADLINE, spectator.disconnect())
        .await
        .expect("disconnect resolves");
    assert!(!spectator.is_connected());

    timeout(DEADLINE, spectator.disconnect())
        .await
        .expect("second disconnect resolves");
    assert!(!spectator.is_connected());
}
