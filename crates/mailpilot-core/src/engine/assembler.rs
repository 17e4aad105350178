//! Configuration assembler.

use tracing::debug;

use crate::error::Result;
use crate::transport::{ConfigMap, Recommendation, TransportRegistry, config_key};

/// Merge the winning transport's base configuration with the fields derived
/// from the winning socket.
///
/// The recommendation-specific mapping takes precedence on key collisions.
/// When the caller supplied a socket or auth override, the result carries
/// `user_override = true` so override-aware UI can be rendered.
///
/// # Errors
///
/// Fails when the recommendation references an unregistered transport.
pub fn assemble_configuration(
    registry: &TransportRegistry,
    winner: &Recommendation,
    user_override: bool,
) -> Result<ConfigMap> {
    let transport = registry.get(&winner.transport)?;
    debug!(hostname = %winner.hostname, slug = transport.slug(), "assembling configuration");

    let mut configuration = ConfigMap::new();
    if user_override {
        configuration.insert(config_key::USER_OVERRIDE.to_string(), true.into());
    }
    configuration.extend(transport.populate_configuration(&winner.hostname));
    configuration.extend(transport.populate_configuration_from_recommendation(winner));
    Ok(configuration)
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
    use crate::testutil::{StubTransport, socket};
    use crate::transport::AuthType;

    fn winning_bid() -> Recommendation {
        let stub = StubTransport::new("smtp", 10);
        let probed = socket("smtp.a.com", 465, "smtp", true);
        let mut bid = crate::transport::Transport::bid(&stub, &probed, None, None).unwrap();
        bid.id.clone_from(&probed.id);
        bid
    }

    #[test]
    fn base_keys_survive_the_merge() {
        let mut registry = TransportRegistry::new();
        registry.register(Box::new(StubTransport::new("smtp", 10)));
        let winner = winning_bid();
        let configuration = assemble_configuration(&registry, &winner, false).unwrap();

        let base = registry
            .get("smtp")
            .unwrap()
            .populate_configuration(&winner.hostname);
        for key in base.keys() {
            assert!(configuration.contains_key(key), "missing base key {key}");
        }
    }

    #[test]
    fn recommendation_fields_take_precedence() {
        let mut registry = TransportRegistry::new();
        registry.register(Box::new(StubTransport::new("smtp", 10)));
        let configuration = assemble_configuration(&registry, &winning_bid(), false).unwrap();
        // The stub's base configuration claims port 25; the probed socket
        // was 465 and must win.
        assert_eq!(configuration["port"], serde_json::json!(465));
    }

    #[test]
    fn user_override_flag() {
        let mut registry = TransportRegistry::new();
        registry.register(Box::new(StubTransport::new("smtp", 10)));
        let with_flag = assemble_configuration(&registry, &winning_bid(), true).unwrap();
        assert_eq!(with_flag["user_override"], serde_json::json!(true));

        let without = assemble_configuration(&registry, &winning_bid(), false).unwrap();
        assert!(!without.contains_key("user_override"));
    }

    #[test]
    fn unknown_transport_fails() {
        let registry = TransportRegistry::new();
        let err = assemble_configuration(&registry, &winning_bid(), false).unwrap_err();
        assert_eq!(err, crate::Error::TransportNotFound("smtp".to_string()));
    }

    #[test]
    fn oauth_recommendation_keeps_auth_type() {
        let mut registry = TransportRegistry::new();
        registry.register(Box::new(StubTransport::new("smtp", 10)));
        let stub = StubTransport::new("smtp", 10);
        let probed = socket("smtp.a.com", 465, "smtp", true);
        let bid = crate::transport::Transport::bid(&stub, &probed, Some(AuthType::OAuth2), None)
            .unwrap();
        let configuration = assemble_configuration(&registry, &bid, true).unwrap();
        assert_eq!(configuration["auth_type"], serde_json::json!("oauth2"));
    }
}
