//! The seam between this library and the coordination service.
//!
//! [`Coordinator`] is the raw client contract (a ZooKeeper-compatible
//! implementation is supplied by the embedding application); [`Connection`]
//! is the session wrapper the participant, spectator and admin surfaces are
//! built on.

mod api;
mod connection;

pub use api::*;
pub use connection::*;
