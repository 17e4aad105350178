//! Hosted API mailer transports (Mandrill, SendGrid).
//!
//! These services accept mail over an HTTPS API authenticated by an API key.
//! A probe that reached the provider's own SMTP endpoint means the user is
//! already pointed at the service, so the API transport outbids generic SMTP
//! there and declines everywhere else.

use mailpilot_core::{
    AuthType, ConfigMap, OverrideMenuEntry, Recommendation, Security, SocketRecord, Transport,
    config_key,
};

use crate::shared;

const PRIORITY_API_MAILER: i32 = 9000;

/// Configuration key for the provider API key.
pub const API_KEY: &str = "api_key";

/// Identity of one hosted mailer service.
#[derive(Debug, Clone, Copy)]
struct ApiService {
    slug: &'static str,
    name: &'static str,
    service_domain: &'static str,
    api_endpoint: &'static str,
}

const MANDRILL: ApiService = ApiService {
    slug: "mandrill",
    name: "Mandrill",
    service_domain: "mandrillapp.com",
    api_endpoint: "mandrillapp.com",
};

const SENDGRID: ApiService = ApiService {
    slug: "sendgrid",
    name: "SendGrid",
    service_domain: "sendgrid.net",
    api_endpoint: "api.sendgrid.com",
};

/// Sends mail through a hosted provider's HTTPS API.
#[derive(Debug)]
pub struct ApiMailerTransport {
    service: ApiService,
}

impl ApiMailerTransport {
    /// The Mandrill transport.
    #[must_use]
    pub const fn mandrill() -> Self {
        Self { service: MANDRILL }
    }

    /// The SendGrid transport.
    #[must_use]
    pub const fn sendgrid() -> Self {
        Self { service: SENDGRID }
    }

    fn serves(&self, socket: &SocketRecord) -> bool {
        let domain = if socket.hostname_domain_only.is_empty() {
            &socket.hostname
        } else {
            &socket.hostname_domain_only
        };
        let domain = domain.to_ascii_lowercase();
        domain == self.service.service_domain
            || domain.ends_with(&format!(".{}", self.service.service_domain))
    }
}

impl Transport for ApiMailerTransport {
    fn slug(&self) -> &'static str {
        self.service.slug
    }

    fn name(&self) -> &'static str {
        self.service.name
    }

    fn bid(
        &self,
        socket: &SocketRecord,
        _user_auth_override: Option<AuthType>,
        _original_smtp_server: Option<&str>,
    ) -> Option<Recommendation> {
        if !socket.success || !self.serves(socket) {
            return None;
        }
        Some(Recommendation {
            priority: PRIORITY_API_MAILER,
            label: format!("{} API", self.service.name),
            id: String::new(),
            transport: self.service.slug.to_string(),
            hostname: self.service.api_endpoint.to_string(),
            port: socket.port,
            security: Security::Tls,
            auth_type: AuthType::None,
            message: None,
        })
    }

    fn populate_configuration(&self, hostname: &str) -> ConfigMap {
        let mut configuration = shared::base_configuration(
            self.service.slug,
            hostname,
            443,
            Security::Tls,
            AuthType::None,
        );
        configuration.insert(API_KEY.to_string(), String::new().into());
        configuration
    }

    fn populate_configuration_from_recommendation(
        &self,
        _recommendation: &Recommendation,
    ) -> ConfigMap {
        // API submission always runs over HTTPS regardless of the probed port.
        let mut configuration = ConfigMap::new();
        configuration.insert(config_key::PORT.to_string(), 443.into());
        configuration.insert(config_key::ENC_TYPE.to_string(), "ssl".into());
        configuration.insert(config_key::AUTH_TYPE.to_string(), "none".into());
        configuration
    }

    fn create_override_menu_entry(
        &self,
        socket: &SocketRecord,
        winner: Option<&Recommendation>,
        user_socket_override: Option<&str>,
        user_auth_override: Option<AuthType>,
    ) -> Option<OverrideMenuEntry> {
        if !socket.success || !self.serves(socket) {
            return None;
        }
        let description = socket
            .label
            .clone()
            .unwrap_or_else(|| format!("{} API", self.service.name));
        Some(shared::menu_entry(
            socket,
            winner,
            user_socket_override,
            user_auth_override,
            description,
            Vec::new(),
            AuthType::None,
        ))
    }

    fn is_oauth_used(&self, _auth_type: AuthType) -> bool {
        false
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

    fn sendgrid_probe() -> mailpilot_core::ProbeResult {
        let mut raw = probe("smtp.sendgrid.net", 587, "sendgrid", true);
        raw.hostname_domain_only = "sendgrid.net".to_string();
        raw.start_tls = true;
        raw.secure = true;
        raw.auth_plain = true;
        raw
    }

    #[test]
    fn bids_on_its_own_service_socket() {
        let transport = ApiMailerTransport::sendgrid();
        let bid = transport
            .bid(&socket_from(sendgrid_probe()), None, None)
            .unwrap();
        assert_eq!(bid.priority, PRIORITY_API_MAILER);
        assert_eq!(bid.hostname, "api.sendgrid.com");
        assert_eq!(bid.transport, "sendgrid");
    }

    #[test]
    fn declines_foreign_sockets() {
        let transport = ApiMailerTransport::sendgrid();
        let mut raw = sendgrid_probe();
        raw.hostname = "smtp.example.org".to_string();
        raw.hostname_domain_only = "example.org".to_string();
        assert!(transport.bid(&socket_from(raw), None, None).is_none());
    }

    #[test]
    fn mandrill_matches_its_domain() {
        let transport = ApiMailerTransport::mandrill();
        let mut raw = probe("smtp.mandrillapp.com", 587, "mandrill", true);
        raw.hostname_domain_only = "mandrillapp.com".to_string();
        let bid = transport.bid(&socket_from(raw), None, None).unwrap();
        assert_eq!(bid.hostname, "mandrillapp.com");
        assert_eq!(transport.slug(), "mandrill");
    }

    #[test]
    fn configuration_includes_api_key_field() {
        let transport = ApiMailerTransport::sendgrid();
        let configuration = transport.populate_configuration("api.sendgrid.com");
        assert!(configuration.contains_key("api_key"));
        assert_eq!(configuration["port"], serde_json::json!(443));
    }

    #[test]
    fn recommendation_configuration_targets_https() {
        let transport = ApiMailerTransport::mandrill();
        let mut raw = probe("smtp.mandrillapp.com", 25, "mandrill", true);
        raw.hostname_domain_only = "mandrillapp.com".to_string();
        let bid = transport.bid(&socket_from(raw), None, None).unwrap();
        let specific = transport.populate_configuration_from_recommendation(&bid);
        assert_eq!(specific["port"], serde_json::json!(443));
        assert_eq!(specific["enc_type"], serde_json::json!("ssl"));
    }

    #[test]
    fn never_uses_oauth() {
        assert!(!ApiMailerTransport::sendgrid().is_oauth_used(AuthType::OAuth2));
        assert!(!ApiMailerTransport::mandrill().is_oauth_used(AuthType::OAuth2));
    }

    #[test]
    fn menu_entry_has_no_auth_choices() {
        let transport = ApiMailerTransport::sendgrid();
        let entry = transport
            .create_override_menu_entry(&socket_from(sendgrid_probe()), None, None, None)
            .unwrap();
        assert!(entry.auth_options.is_empty());
        assert_eq!(entry.description, "SendGrid API");
    }
}
