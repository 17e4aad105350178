//! Gmail API transport.

use mailpilot_core::{
    AuthType, ConfigMap, OverrideMenuEntry, Recommendation, Security, SocketRecord, Transport,
    config_key,
};
use tracing::debug;

use crate::shared;

const PRIORITY_GMAIL_API: i32 = 9000;
// The user was already pointed at Google before this setup run.
const EXISTING_PROVIDER_BONUS: i32 = 100;

/// Sends mail through the Gmail HTTPS API instead of SMTP.
///
/// Only meaningful when the probed socket is Google's SMTP service and
/// offers XOAUTH2; outbids direct SMTP there because the API is not subject
/// to the provider's SMTP restrictions.
#[derive(Debug, Default)]
pub struct GmailApiTransport;

impl GmailApiTransport {
    /// Transport slug.
    pub const SLUG: &'static str = "gmail_api";

    /// Create the transport.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn is_gmail_service(hostname: &str, domain: &str) -> bool {
        hostname.eq_ignore_ascii_case("smtp.gmail.com")
            || domain.eq_ignore_ascii_case("gmail.com")
            || domain.eq_ignore_ascii_case("googlemail.com")
    }

    fn serves(socket: &SocketRecord) -> bool {
        socket.auth_xoauth
            && Self::is_gmail_service(&socket.hostname, &socket.hostname_domain_only)
    }
}

impl Transport for GmailApiTransport {
    fn slug(&self) -> &'static str {
        Self::SLUG
    }

    fn name(&self) -> &'static str {
        "Gmail API"
    }

    fn bid(
        &self,
        socket: &SocketRecord,
        _user_auth_override: Option<AuthType>,
        original_smtp_server: Option<&str>,
    ) -> Option<Recommendation> {
        if !socket.success || !Self::serves(socket) {
            return None;
        }
        let mut priority = PRIORITY_GMAIL_API;
        if let Some(original) = original_smtp_server {
            if Self::is_gmail_service(original, "") {
                debug!(original, "already configured for Google");
                priority += EXISTING_PROVIDER_BONUS;
            }
        }
        Some(Recommendation {
            priority,
            label: format!("{} {} (OAuth 2.0)", self.name(), socket.hostname),
            id: String::new(),
            transport: Self::SLUG.to_string(),
            hostname: socket.hostname.clone(),
            port: socket.port,
            security: Security::Tls,
            auth_type: AuthType::OAuth2,
            message: None,
        })
    }

    fn populate_configuration(&self, hostname: &str) -> ConfigMap {
        shared::base_configuration(Self::SLUG, hostname, 443, Security::Tls, AuthType::OAuth2)
    }

    fn populate_configuration_from_recommendation(
        &self,
        _recommendation: &Recommendation,
    ) -> ConfigMap {
        // The API runs over HTTPS; the probed SMTP port is irrelevant.
        let mut configuration = ConfigMap::new();
        configuration.insert(config_key::PORT.to_string(), 443.into());
        configuration.insert(config_key::ENC_TYPE.to_string(), "ssl".into());
        configuration.insert(config_key::AUTH_TYPE.to_string(), "oauth2".into());
        configuration
    }

    fn create_override_menu_entry(
        &self,
        socket: &SocketRecord,
        winner: Option<&Recommendation>,
        user_socket_override: Option<&str>,
        user_auth_override: Option<AuthType>,
    ) -> Option<OverrideMenuEntry> {
        if !socket.success || !Self::serves(socket) {
            return None;
        }
        let description = socket
            .label
            .clone()
            .unwrap_or_else(|| format!("{} {} (OAuth 2.0)", self.name(), socket.hostname));
        Some(shared::menu_entry(
            socket,
            winner,
            user_socket_override,
            user_auth_override,
            description,
            vec![AuthType::OAuth2],
            AuthType::OAuth2,
        ))
    }

    fn is_oauth_used(&self, _auth_type: AuthType) -> bool {
        true
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
    use crate::testsupport::{probe, socket_from};

    fn gmail_probe() -> mailpilot_core::ProbeResult {
        let mut raw = probe("smtp.gmail.com", 465, "gmail_api", true);
        raw.hostname_domain_only = "gmail.com".to_string();
        raw.protocol = "smtps".to_string();
        raw.secure = true;
        raw.auth_xoauth = true;
        raw
    }

    #[test]
    fn bids_on_gmail_with_xoauth() {
        let transport = GmailApiTransport::new();
        let bid = transport.bid(&socket_from(gmail_probe()), None, None).unwrap();
        assert_eq!(bid.priority, PRIORITY_GMAIL_API);
        assert_eq!(bid.auth_type, AuthType::OAuth2);
        assert_eq!(bid.transport, "gmail_api");
    }

    #[test]
    fn declines_without_xoauth() {
        let transport = GmailApiTransport::new();
        let mut raw = gmail_probe();
        raw.auth_xoauth = false;
        assert!(transport.bid(&socket_from(raw), None, None).is_none());
    }

    #[test]
    fn declines_foreign_hosts() {
        let transport = GmailApiTransport::new();
        let mut raw = gmail_probe();
        raw.hostname = "smtp.example.org".to_string();
        raw.hostname_domain_only = "example.org".to_string();
        assert!(transport.bid(&socket_from(raw), None, None).is_none());
    }

    #[test]
    fn bonus_when_already_on_google() {
        let transport = GmailApiTransport::new();
        let bid = transport
            .bid(&socket_from(gmail_probe()), None, Some("smtp.gmail.com"))
            .unwrap();
        assert_eq!(bid.priority, PRIORITY_GMAIL_API + EXISTING_PROVIDER_BONUS);
    }

    #[test]
    fn configuration_targets_the_api_port() {
        let transport = GmailApiTransport::new();
        let bid = transport.bid(&socket_from(gmail_probe()), None, None).unwrap();
        let specific = transport.populate_configuration_from_recommendation(&bid);
        assert_eq!(specific["port"], serde_json::json!(443));
        assert_eq!(specific["auth_type"], serde_json::json!("oauth2"));
    }

    #[test]
    fn oauth_is_always_used() {
        let transport = GmailApiTransport::new();
        assert!(transport.is_oauth_used(AuthType::None));
        assert!(transport.is_oauth_used(AuthType::Plain));
    }

    #[test]
    fn menu_entry_offers_oauth_only() {
        let transport = GmailApiTransport::new();
        let entry = transport
            .create_override_menu_entry(&socket_from(gmail_probe()), None, None, None)
            .unwrap();
        assert_eq!(entry.auth_options, vec![AuthType::OAuth2]);
        assert_eq!(entry.selected_auth, AuthType::OAuth2);
    }
}
