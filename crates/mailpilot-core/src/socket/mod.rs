//! Probed socket data model.

mod model;

pub use model::{ProbeResult, SocketProtocol, SocketRecord};
