use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use super::state_model::StateModel;
use super::state_model::StateModelRegistry;
use super::state_model::Transition;
use crate::Error;
use crate::ParticipantError;

#[test]
fn test_handler_lookup_and_invocation() {
    let invoked = Arc::new(AtomicUsize::new(0));
    let counter = invoked.clone();

    let model = StateModel::with_transitions(vec![
        Transition::new("OFFLINE", "SLAVE", move |_partition| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }),
        Transition::new("SLAVE", "MASTER", |_partition| Ok(())),
    ]);

    let handler = model.handler("OFFLINE", "SLAVE").expect("edge exists");
    handler("myDB_0").expect("handler runs");
    assert_eq!(invoked.load(Ordering::SeqCst), 1);

    assert!(model.handler("MASTER", "SLAVE").is_none());
}

#[test]
fn test_add_transition_overwrites_edge() {
    let mut model = StateModel::new();
    model.add_transition("OFFLINE", "ONLINE", |_| Err(Error::Fatal("old".into())));
    model.add_transition("OFFLINE", "ONLINE", |_| Ok(()));

    let handler = model.handler("OFFLINE", "ONLINE").expect("edge exists");
    assert!(handler("p_0").is_ok());
}

#[test]
fn test_registry_resolves_by_model_name() {
    let mut registry = StateModelRegistry::default();
    assert!(registry.is_empty());

    registry.register(
        "OnlineOffline",
        StateModel::with_transitions(vec![Transition::new("OFFLINE", "ONLINE", |_| Ok(()))]),
    );
    assert!(!registry.is_empty());

    assert!(registry.handler("OnlineOffline", "OFFLINE", "ONLINE").is_ok());

    let err = registry.handler("MasterSlave", "OFFLINE", "SLAVE").err().unwrap();
    assert!(matches!(
        err,
        Error::Participant(ParticipantError::ModelUnregistered { .. })
    ));

    let err = registry.handler("OnlineOffline", "ONLINE", "OFFLINE").err().unwrap();
    assert!(matches!(
        err,
        Error::Participant(ParticipantError::ModelUnregistered { .. })
    ));
}
