//! Transport capability providers.
//!
//! A transport is one way of delivering mail (direct SMTP, a provider API).
//! During setup, each transport bids on the sockets that were probed for it;
//! the engine in [`crate::engine`] picks the winner.

mod model;
mod registry;

pub use model::{AuthType, ConfigMap, OverrideMenuEntry, Recommendation, Security, config_key};
pub use registry::TransportRegistry;

use crate::socket::SocketRecord;

/// A pluggable mail transport that can bid on probed sockets.
///
/// Implementations must be deterministic: the same socket and overrides
/// always produce the same bid. Bidding has no side effects beyond logging.
pub trait Transport: Send + Sync {
    /// Stable identifier used for registry lookup and probe routing.
    fn slug(&self) -> &'static str;

    /// Human-readable transport name.
    fn name(&self) -> &'static str;

    /// Bids a priority and label for a successfully probed socket.
    ///
    /// Returns `None` to decline the socket (protocol mismatch, required
    /// capability absent). Declining is a normal per-socket outcome, not an
    /// error.
    fn bid(
        &self,
        socket: &SocketRecord,
        user_auth_override: Option<AuthType>,
        original_smtp_server: Option<&str>,
    ) -> Option<Recommendation>;

    /// Default configuration fields for this transport, independent of any
    /// specific probe result.
    fn populate_configuration(&self, hostname: &str) -> ConfigMap;

    /// Socket-specific overrides (port, security, auth type) to merge atop
    /// the base configuration.
    fn populate_configuration_from_recommendation(
        &self,
        recommendation: &Recommendation,
    ) -> ConfigMap;

    /// Builds a user-facing description of this socket as an alternative
    /// choice, or `None` if the socket cannot be offered.
    fn create_override_menu_entry(
        &self,
        socket: &SocketRecord,
        winner: Option<&Recommendation>,
        user_socket_override: Option<&str>,
        user_auth_override: Option<AuthType>,
    ) -> Option<OverrideMenuEntry>;

    /// Whether the given authentication type requires an OAuth flow.
    ///
    /// Affects which configuration fields the caller must display.
    fn is_oauth_used(&self, auth_type: AuthType) -> bool;
}
