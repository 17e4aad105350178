//! Test doubles shared by the crate's unit tests.

use std::collections::{HashMap, HashSet};

use crate::socket::{ProbeResult, SocketRecord};
use crate::transport::{
    AuthType, ConfigMap, OverrideMenuEntry, Recommendation, Security, Transport, config_key,
};

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

/// A validated socket record built from [`probe`].
#[allow(clippy::unwrap_used)]
pub fn socket(hostname: &str, port: u16, transport: &str, success: bool) -> SocketRecord {
    SocketRecord::from_probe(probe(hostname, port, transport, success)).unwrap()
}

/// Scriptable transport for engine and registry tests.
pub struct StubTransport {
    slug: &'static str,
    default_priority: i32,
    priorities: HashMap<String, i32>,
    declined_bids: HashSet<String>,
    refused_menus: HashSet<String>,
}

impl StubTransport {
    /// A stub bidding `default_priority` on every successful socket.
    pub fn new(slug: &'static str, default_priority: i32) -> Self {
        Self {
            slug,
            default_priority,
            priorities: HashMap::new(),
            declined_bids: HashSet::new(),
            refused_menus: HashSet::new(),
        }
    }

    /// Bid a specific priority for the given socket id.
    #[must_use]
    pub fn with_priority(mut self, id: &str, priority: i32) -> Self {
        self.priorities.insert(id.to_string(), priority);
        self
    }

    /// Decline to bid on the given socket id.
    #[must_use]
    pub fn declining(mut self, id: &str) -> Self {
        self.declined_bids.insert(id.to_string());
        self
    }

    /// Refuse to build a menu entry for the given socket id.
    #[must_use]
    pub fn refusing_menu(mut self, id: &str) -> Self {
        self.refused_menus.insert(id.to_string());
        self
    }
}

impl Transport for StubTransport {
    fn slug(&self) -> &'static str {
        self.slug
    }

    fn name(&self) -> &'static str {
        "Stub"
    }

    fn bid(
        &self,
        socket: &SocketRecord,
        user_auth_override: Option<AuthType>,
        _original_smtp_server: Option<&str>,
    ) -> Option<Recommendation> {
        if !socket.success || self.declined_bids.contains(&socket.id) {
            return None;
        }
        let priority = self
            .priorities
            .get(&socket.id)
            .copied()
            .unwrap_or(self.default_priority);
        let security = if socket.secure {
            Security::Tls
        } else if socket.start_tls {
            Security::StartTls
        } else {
            Security::None
        };
        Some(Recommendation {
            priority,
            label: format!("{} {}:{}", self.slug, socket.hostname, socket.port),
            id: String::new(),
            transport: self.slug.to_string(),
            hostname: socket.hostname.clone(),
            port: socket.port,
            security,
            auth_type: user_auth_override.unwrap_or(AuthType::Plain),
            message: None,
        })
    }

    fn populate_configuration(&self, hostname: &str) -> ConfigMap {
        let mut configuration = ConfigMap::new();
        configuration.insert(config_key::TRANSPORT_TYPE.to_string(), self.slug.into());
        configuration.insert(config_key::HOSTNAME.to_string(), hostname.into());
        configuration.insert(config_key::PORT.to_string(), 25.into());
        configuration.insert(config_key::ENC_TYPE.to_string(), "none".into());
        configuration.insert(config_key::AUTH_TYPE.to_string(), "none".into());
        configuration
    }

    fn populate_configuration_from_recommendation(
        &self,
        recommendation: &Recommendation,
    ) -> ConfigMap {
        let mut configuration = ConfigMap::new();
        configuration.insert(config_key::PORT.to_string(), recommendation.port.into());
        configuration.insert(
            config_key::ENC_TYPE.to_string(),
            recommendation.security.enc_type().into(),
        );
        configuration.insert(
            config_key::AUTH_TYPE.to_string(),
            recommendation.auth_type.as_str().into(),
        );
        configuration
    }

    fn create_override_menu_entry(
        &self,
        socket: &SocketRecord,
        winner: Option<&Recommendation>,
        user_socket_override: Option<&str>,
        user_auth_override: Option<AuthType>,
    ) -> Option<OverrideMenuEntry> {
        if !socket.success || self.refused_menus.contains(&socket.id) {
            return None;
        }
        let selected = user_socket_override.map_or_else(
            || winner.is_some_and(|w| w.id == socket.id),
            |id| id == socket.id,
        );
        Some(OverrideMenuEntry {
            value: socket.id.clone(),
            description: socket
                .label
                .clone()
                .unwrap_or_else(|| format!("{}:{}", socket.hostname, socket.port)),
            selected,
            auth_options: vec![AuthType::Plain],
            selected_auth: user_auth_override.unwrap_or(AuthType::Plain),
        })
    }

    fn is_oauth_used(&self, auth_type: AuthType) -> bool {
        auth_type == AuthType::OAuth2
    }
}
