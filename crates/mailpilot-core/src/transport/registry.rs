//! Transport registry.

use tracing::debug;

use super::model::{AuthType, Recommendation};
use super::Transport;
use crate::error::{Error, Result};
use crate::socket::SocketRecord;

/// Holds the set of available transports.
///
/// Populated once during startup and read-only afterwards; the engine takes
/// it by reference. Registration is idempotent per slug: registering a slug
/// again replaces the earlier transport in place, so iteration order stays
/// registration order.
#[derive(Default)]
pub struct TransportRegistry {
    transports: Vec<Box<dyn Transport>>,
}

impl TransportRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transport, replacing any earlier one with the same slug.
    pub fn register(&mut self, transport: Box<dyn Transport>) {
        let slug = transport.slug();
        debug!(slug, name = transport.name(), "registering transport");
        if let Some(existing) = self.transports.iter_mut().find(|t| t.slug() == slug) {
            *existing = transport;
        } else {
            self.transports.push(transport);
        }
    }

    /// Look up a transport by slug.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransportNotFound`] for an unregistered slug.
    pub fn get(&self, slug: &str) -> Result<&dyn Transport> {
        self.transports
            .iter()
            .map(AsRef::as_ref)
            .find(|t| t.slug() == slug)
            .ok_or_else(|| Error::TransportNotFound(slug.to_string()))
    }

    /// All registered transports, in registration order.
    pub fn transports(&self) -> impl Iterator<Item = &dyn Transport> {
        self.transports.iter().map(AsRef::as_ref)
    }

    /// Number of registered transports.
    #[must_use]
    pub fn len(&self) -> usize {
        self.transports.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transports.is_empty()
    }

    /// Solicit a bid for a socket from its originating transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransportNotFound`] if the socket references an
    /// unregistered transport.
    pub fn recommendation(
        &self,
        socket: &SocketRecord,
        user_auth_override: Option<AuthType>,
        original_smtp_server: Option<&str>,
    ) -> Result<Option<Recommendation>> {
        let transport = self.get(&socket.transport)?;
        Ok(transport.bid(socket, user_auth_override, original_smtp_server))
    }
}

impl std::fmt::Debug for TransportRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportRegistry")
            .field(
                "transports",
                &self.transports.iter().map(|t| t.slug()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use crate::testutil::StubTransport;

    #[test]
    fn get_unknown_slug_fails() {
        let registry = TransportRegistry::new();
        let err = registry.get("smtp").err().unwrap();
        assert_eq!(err, Error::TransportNotFound("smtp".to_string()));
    }

    #[test]
    fn get_finds_registered_transport() {
        let mut registry = TransportRegistry::new();
        registry.register(Box::new(StubTransport::new("smtp", 10)));
        assert_eq!(registry.get("smtp").unwrap().slug(), "smtp");
    }

    #[test]
    fn iteration_follows_registration_order() {
        let mut registry = TransportRegistry::new();
        registry.register(Box::new(StubTransport::new("smtp", 10)));
        registry.register(Box::new(StubTransport::new("gmail_api", 20)));
        registry.register(Box::new(StubTransport::new("sendgrid", 30)));
        let slugs: Vec<_> = registry.transports().map(Transport::slug).collect();
        assert_eq!(slugs, vec!["smtp", "gmail_api", "sendgrid"]);
    }

    #[test]
    fn reregistration_replaces_in_place() {
        let mut registry = TransportRegistry::new();
        registry.register(Box::new(StubTransport::new("smtp", 10)));
        registry.register(Box::new(StubTransport::new("gmail_api", 20)));
        registry.register(Box::new(StubTransport::new("smtp", 99)));
        assert_eq!(registry.len(), 2);
        let slugs: Vec<_> = registry.transports().map(Transport::slug).collect();
        assert_eq!(slugs, vec!["smtp", "gmail_api"]);

        let socket = crate::testutil::socket("smtp.example.com", 587, "smtp", true);
        let bid = registry.recommendation(&socket, None, None).unwrap().unwrap();
        assert_eq!(bid.priority, 99);
    }

    #[test]
    fn recommendation_delegates_to_owning_transport() {
        let mut registry = TransportRegistry::new();
        registry.register(Box::new(StubTransport::new("smtp", 10)));
        let socket = crate::testutil::socket("smtp.example.com", 587, "smtp", true);
        let bid = registry.recommendation(&socket, None, None).unwrap().unwrap();
        assert_eq!(bid.transport, "smtp");
        assert_eq!(bid.priority, 10);
    }

    #[test]
    fn recommendation_for_unknown_transport_fails() {
        let registry = TransportRegistry::new();
        let socket = crate::testutil::socket("smtp.example.com", 587, "smtp", true);
        assert!(registry.recommendation(&socket, None, None).is_err());
    }
}
