//! Helpers shared by the built-in transports.
//!
//! Transports compose with these instead of inheriting from a common base:
//! capability-to-auth mapping, menu entry construction, and the two halves of
//! the configuration payload.

use mailpilot_core::{
    AuthType, ConfigMap, OverrideMenuEntry, Recommendation, Security, SocketRecord, config_key,
};

/// Ports a mail submission service is conventionally reachable on.
#[must_use]
pub fn is_submission_port(port: u16) -> bool {
    matches!(port, 25 | 465 | 587)
}

/// Whether the socket's domain belongs to a provider whose SMTP service
/// expects OAuth 2.0 for first-party clients.
#[must_use]
pub fn is_oauth_provider(socket: &SocketRecord) -> bool {
    let domain = if socket.hostname_domain_only.is_empty() {
        &socket.hostname
    } else {
        &socket.hostname_domain_only
    };
    let domain = domain.to_ascii_lowercase();
    [
        "gmail.com",
        "googlemail.com",
        "outlook.com",
        "hotmail.com",
        "live.com",
        "office365.com",
        "yahoo.com",
        "ymail.com",
    ]
    .iter()
    .any(|provider| domain == *provider || domain.ends_with(&format!(".{provider}")))
}

/// Authentication types the socket advertises, strongest first.
#[must_use]
pub fn auth_options(socket: &SocketRecord) -> Vec<AuthType> {
    let mut options = Vec::new();
    if socket.auth_xoauth {
        options.push(AuthType::OAuth2);
    }
    if socket.auth_crammd5 {
        options.push(AuthType::CramMd5);
    }
    if socket.auth_plain {
        options.push(AuthType::Plain);
    }
    if socket.auth_login {
        options.push(AuthType::Login);
    }
    if socket.auth_none {
        options.push(AuthType::None);
    }
    options
}

/// Pick the authentication type for a socket.
///
/// A user override always wins. Otherwise OAuth 2.0 is preferred on provider
/// hosts that expect it, then the strongest advertised mechanism. Returns
/// `None` when the socket offers no way to submit mail at all.
#[must_use]
pub fn select_auth(socket: &SocketRecord, user_auth_override: Option<AuthType>) -> Option<AuthType> {
    if let Some(auth) = user_auth_override {
        return Some(auth);
    }
    if socket.auth_xoauth && is_oauth_provider(socket) {
        return Some(AuthType::OAuth2);
    }
    if socket.auth_crammd5 {
        return Some(AuthType::CramMd5);
    }
    if socket.auth_plain {
        return Some(AuthType::Plain);
    }
    if socket.auth_login {
        return Some(AuthType::Login);
    }
    if socket.auth_none {
        return Some(AuthType::None);
    }
    None
}

/// Display label for a socket handled by the named transport.
#[must_use]
pub fn describe_socket(name: &str, socket: &SocketRecord, security: Security) -> String {
    format!(
        "{name} {}:{} ({})",
        socket.hostname,
        socket.port,
        security.display_name()
    )
}

/// Base configuration fields every transport populates.
#[must_use]
pub fn base_configuration(
    slug: &str,
    hostname: &str,
    port: u16,
    security: Security,
    auth_type: AuthType,
) -> ConfigMap {
    let mut configuration = ConfigMap::new();
    configuration.insert(config_key::TRANSPORT_TYPE.to_string(), slug.into());
    configuration.insert(config_key::HOSTNAME.to_string(), hostname.into());
    configuration.insert(config_key::PORT.to_string(), port.into());
    configuration.insert(
        config_key::ENC_TYPE.to_string(),
        security.enc_type().into(),
    );
    configuration.insert(
        config_key::AUTH_TYPE.to_string(),
        auth_type.as_str().into(),
    );
    configuration
}

/// Socket-specific configuration derived from a winning recommendation.
#[must_use]
pub fn recommendation_configuration(recommendation: &Recommendation) -> ConfigMap {
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

/// Build an override menu entry with the standard selection rules.
///
/// With a socket override in play, only the overridden socket renders as
/// selected; otherwise the winner does. A user auth override applies to the
/// selected entry only.
#[must_use]
pub fn menu_entry(
    socket: &SocketRecord,
    winner: Option<&Recommendation>,
    user_socket_override: Option<&str>,
    user_auth_override: Option<AuthType>,
    description: String,
    auth_options: Vec<AuthType>,
    auto_auth: AuthType,
) -> OverrideMenuEntry {
    let selected = user_socket_override.map_or_else(
        || winner.is_some_and(|w| w.id == socket.id),
        |id| id == socket.id,
    );
    let selected_auth = if selected {
        user_auth_override.unwrap_or(auto_auth)
    } else {
        auto_auth
    };
    OverrideMenuEntry {
        value: socket.id.clone(),
        description,
        selected,
        auth_options,
        selected_auth,
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
    use crate::testsupport::probe;

    #[test]
    fn submission_ports() {
        assert!(is_submission_port(25));
        assert!(is_submission_port(465));
        assert!(is_submission_port(587));
        assert!(!is_submission_port(2525));
    }

    #[test]
    fn oauth_provider_by_domain() {
        let mut raw = probe("smtp.gmail.com", 587, "smtp", true);
        raw.hostname_domain_only = "gmail.com".to_string();
        let socket = SocketRecord::from_probe(raw).unwrap();
        assert!(is_oauth_provider(&socket));
    }

    #[test]
    fn oauth_provider_falls_back_to_hostname_suffix() {
        let raw = probe("smtp.gmail.com", 587, "smtp", true);
        let socket = SocketRecord::from_probe(raw).unwrap();
        assert!(is_oauth_provider(&socket));
    }

    #[test]
    fn not_an_oauth_provider() {
        let raw = probe("mail.example.org", 587, "smtp", true);
        let socket = SocketRecord::from_probe(raw).unwrap();
        assert!(!is_oauth_provider(&socket));
    }

    #[test]
    fn auth_options_strongest_first() {
        let mut raw = probe("mail.example.org", 587, "smtp", true);
        raw.auth_plain = true;
        raw.auth_login = true;
        raw.auth_crammd5 = true;
        raw.auth_xoauth = true;
        raw.auth_none = true;
        let socket = SocketRecord::from_probe(raw).unwrap();
        assert_eq!(
            auth_options(&socket),
            vec![
                AuthType::OAuth2,
                AuthType::CramMd5,
                AuthType::Plain,
                AuthType::Login,
                AuthType::None,
            ]
        );
    }

    #[test]
    fn select_auth_honors_override() {
        let raw = probe("mail.example.org", 587, "smtp", true);
        let socket = SocketRecord::from_probe(raw).unwrap();
        assert_eq!(
            select_auth(&socket, Some(AuthType::Login)),
            Some(AuthType::Login)
        );
    }

    #[test]
    fn select_auth_prefers_oauth_on_provider_hosts() {
        let mut raw = probe("smtp.gmail.com", 587, "smtp", true);
        raw.hostname_domain_only = "gmail.com".to_string();
        raw.auth_xoauth = true;
        raw.auth_plain = true;
        let socket = SocketRecord::from_probe(raw).unwrap();
        assert_eq!(select_auth(&socket, None), Some(AuthType::OAuth2));
    }

    #[test]
    fn select_auth_skips_oauth_on_generic_hosts() {
        let mut raw = probe("mail.example.org", 587, "smtp", true);
        raw.auth_xoauth = true;
        raw.auth_plain = true;
        let socket = SocketRecord::from_probe(raw).unwrap();
        assert_eq!(select_auth(&socket, None), Some(AuthType::Plain));
    }

    #[test]
    fn select_auth_none_when_nothing_offered() {
        let raw = probe("mail.example.org", 25, "smtp", true);
        let socket = SocketRecord::from_probe(raw).unwrap();
        assert_eq!(select_auth(&socket, None), None);
    }

    #[test]
    fn select_auth_anonymous_submission() {
        let mut raw = probe("mail.example.org", 25, "smtp", true);
        raw.auth_none = true;
        let socket = SocketRecord::from_probe(raw).unwrap();
        assert_eq!(select_auth(&socket, None), Some(AuthType::None));
    }
}
