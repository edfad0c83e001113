//! In-memory state models: per-transition handlers keyed by
//! `(from, to)`, registered under a model name before the participant
//! connects.

use std::collections::HashMap;
use std::sync::Arc;

use crate::ParticipantError;
use crate::Result;

/// Invoked on the participant's dispatch task with the partition name.
/// Returning an error marks the message `UNPROCESSABLE` and leaves current
/// state untouched.
pub type TransitionHandler = Arc<dyn Fn(&str) -> Result<()> + Send + Sync>;

/// One directed edge of a state model.
#[derive(Clone)]
pub struct Transition {
    pub from: String,
    pub to: String,
    pub handler: TransitionHandler,
}

impl Transition {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        handler: impl Fn(&str) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        Transition {
            from: from.into(),
            to: to.into(),
            handler: Arc::new(handler),
        }
    }
}

/// A set of directed transitions bound to user handlers. Persists for the
/// lifetime of the participant that registered it.
#[derive(Clone, Default)]
pub struct StateModel {
    transitions: HashMap<(String, String), TransitionHandler>,
}

impl StateModel {
    pub fn new() -> Self {
        StateModel::default()
    }

    pub fn with_transitions(transitions: Vec<Transition>) -> Self {
        let mut model = StateModel::new();
        for t in transitions {
            model.transitions.insert((t.from, t.to), t.handler);
        }
        model
    }

    pub fn add_transition(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        handler: impl Fn(&str) -> Result<()> + Send + Sync + 'static,
    ) {
        self.transitions
            .insert((from.into(), to.into()), Arc::new(handler));
    }

    pub fn handler(
        &self,
        from: &str,
        to: &str,
    ) -> Option<TransitionHandler> {
        self.transitions
            .get(&(from.to_string(), to.to_string()))
            .cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

impl std::fmt::Debug for StateModel {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("StateModel")
            .field("transitions", &self.transitions.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Model name -> state model. Frozen once the participant connects.
#[derive(Clone, Default)]
pub(crate) struct StateModelRegistry {
    models: HashMap<String, StateModel>,
}

impl StateModelRegistry {
    pub(crate) fn register(
        &mut self,
        name: impl Into<String>,
        model: StateModel,
    ) {
        self.models.insert(name.into(), model);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Resolves the handler for a transition; a missing model or edge is a
    /// fatal per-message error.
    pub(crate) fn handler(
        &self,
        model: &str,
        from: &str,
        to: &str,
    ) -> Result<TransitionHandler> {
        self.models
            .get(model)
            .and_then(|m| m.handler(from, to))
            .ok_or_else(|| {
                ParticipantError::ModelUnregistered {
                    model: model.to_string(),
                    from: from.to_string(),
                    to: to.to_string(),
                }
                .into()
            })
    }
}
