//! Fixtures shared by the crate's unit tests.

use mailpilot_core::{ProbeResult, SocketRecord};

/// A probe result with the given outcome and defaults everywhere else.
pub fn probe(hostname: &str, port: u16, transport: &str, success: bool) -> ProbeResult {
    ProbeResult {
        hostname: hostname.to_string(),
        port,
        transport: transport.to_string(),
        success,
        ..Default::default()
    }
}

/// A validated socket record built from a probe result.
#[allow(clippy::unwrap_used)]
pub fn socket_from(probe: ProbeResult) -> SocketRecord {
    SocketRecord::from_probe(probe).unwrap()
}
