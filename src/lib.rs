//! # troupe
//!
//! A client library for a coordinator-backed cluster-management protocol:
//! machine *participants* join a named *cluster*, execute controller-issued
//! state transitions over partitioned *resources*, and report current state
//! back through the coordination service; *spectators* observe the cluster
//! and react to changes.
//!
//! ## Features
//! - **Participant role**: session lifecycle, auto-join, live-instance
//!   presence, at-most-once message dispatch, state-model execution
//! - **Spectator role**: watch fan-in over the cluster subtrees with
//!   type-tagged listener notifications
//! - **Administrative surface**: cluster/node/resource management
//! - **Pluggable coordinator**: any ZooKeeper-compatible client behind the
//!   [`Coordinator`] trait
//! - **Runtime**: built for `tokio`
//!
//! ## Quick Start
//! ```no_run
//! use std::sync::Arc;
//! use troupe::{Manager, StateModel, Transition};
//! # use troupe::Connector;
//! # async fn example(connector: Arc<dyn Connector>) -> troupe::Result<()> {
//! let manager = Manager::new("localhost:2181", connector)?;
//! let participant = manager.new_participant("MYCLUSTER", "localhost", "12913");
//!
//! participant.register_state_model(
//!     "OnlineOffline",
//!     StateModel::with_transitions(vec![
//!         Transition::new("OFFLINE", "ONLINE", |partition| {
//!             println!("bringing {partition} online");
//!             Ok(())
//!         }),
//!         Transition::new("ONLINE", "OFFLINE", |partition| {
//!             println!("taking {partition} offline");
//!             Ok(())
//!         }),
//!     ]),
//! )?;
//!
//! participant.connect().await?;
//! # Ok(())
//! # }
//! ```

pub mod admin;
pub mod config;
pub mod coordinator;
pub mod model;
pub mod participant;
pub mod spectator;

mod constants;
mod context;
mod errors;
mod keys;
mod manager;
mod record;
mod utils;

pub use admin::Admin;
pub use admin::ClusterInfo;
pub use constants::BUILTIN_STATE_MODEL_DEFS;
pub use context::Context;
pub use coordinator::Connection;
pub use coordinator::Connector;
pub use coordinator::CoordResult;
pub use coordinator::Coordinator;
pub use coordinator::CreateMode;
pub use coordinator::SessionEvent;
pub use coordinator::Stat;
pub use coordinator::WatchEvent;
pub use coordinator::WatchKind;
pub use coordinator::WatchReceiver;
pub use errors::*;
pub use keys::KeyBuilder;
pub use manager::Manager;
pub use model::IdealState;
pub use model::Message;
pub use model::MessageState;
pub use model::MessageType;
pub use model::StateModel;
pub use model::StateModelDef;
pub use model::Transition;
pub use model::TransitionHandler;
pub use participant::Participant;
pub use participant::ParticipantState;
pub use participant::PreConnectCallback;
pub use record::Record;
pub use spectator::ControllerMessageListener;
pub use spectator::CurrentStateChangeListener;
pub use spectator::ExternalViewChangeListener;
pub use spectator::IdealStateChangeListener;
pub use spectator::InstanceConfigChangeListener;
pub use spectator::LiveInstanceChangeListener;
pub use spectator::MessageListener;
pub use spectator::Spectator;
pub use spectator::SpectatorState;

//-----------------------------------------------------------
// Test utils
#[cfg(test)]
#[doc(hidden)]
pub mod test_utils;

#[cfg(test)]
mod keys_test;
#[cfg(test)]
mod record_test;
