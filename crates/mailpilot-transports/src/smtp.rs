//! Direct SMTP transport.

use mailpilot_core::{
    AuthType, ConfigMap, OverrideMenuEntry, Recommendation, Security, SocketProtocol,
    SocketRecord, Transport,
};
use tracing::debug;

use crate::shared;

const PRIORITY_IMPLICIT_TLS: i32 = 8000;
const PRIORITY_STARTTLS: i32 = 7000;
const PRIORITY_PLAINTEXT_AUTH: i32 = 2000;
const PRIORITY_PLAINTEXT_ANONYMOUS: i32 = 1000;
const SUBMISSION_PORT_BONUS: i32 = 10;
// Drops an intercepted TLS socket below honest authenticated plaintext.
const INTERCEPTION_PENALTY: i32 = 6500;

/// Sends mail by speaking SMTP to the configured server.
///
/// Bids on any reachable SMTP socket; encrypted sockets outrank plaintext
/// ones, and a socket whose TLS handshake showed signs of interception is
/// ranked below every honest alternative.
#[derive(Debug, Default)]
pub struct SmtpTransport;

impl SmtpTransport {
    /// Transport slug.
    pub const SLUG: &'static str = "smtp";

    /// Create the transport.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Security mode this socket supports, or `None` to decline it.
    fn security_for(socket: &SocketRecord) -> Option<Security> {
        if socket.protocol == SocketProtocol::Smtps || socket.try_smtps {
            // An implicit-TLS attempt that did not end up encrypted is a
            // broken socket, not a plaintext one.
            return socket.secure.then_some(Security::Tls);
        }
        if socket.start_tls {
            return Some(Security::StartTls);
        }
        Some(Security::None)
    }

    fn priority_for(socket: &SocketRecord, security: Security) -> i32 {
        let mut priority = match security {
            Security::Tls => PRIORITY_IMPLICIT_TLS,
            Security::StartTls => PRIORITY_STARTTLS,
            Security::None => {
                if socket.offers_auth() {
                    PRIORITY_PLAINTEXT_AUTH
                } else {
                    PRIORITY_PLAINTEXT_ANONYMOUS
                }
            }
        };
        if shared::is_submission_port(socket.port) {
            priority += SUBMISSION_PORT_BONUS;
        }
        if socket.mitm {
            priority -= INTERCEPTION_PENALTY;
        }
        priority
    }

    fn interception_warning(socket: &SocketRecord) -> Option<String> {
        socket.mitm.then(|| {
            format!(
                "The server at {} identified itself as {}; the connection may be intercepted",
                socket.hostname, socket.reported_hostname
            )
        })
    }
}

impl Transport for SmtpTransport {
    fn slug(&self) -> &'static str {
        Self::SLUG
    }

    fn name(&self) -> &'static str {
        "SMTP"
    }

    fn bid(
        &self,
        socket: &SocketRecord,
        user_auth_override: Option<AuthType>,
        original_smtp_server: Option<&str>,
    ) -> Option<Recommendation> {
        if !socket.success {
            return None;
        }
        let security = Self::security_for(socket)?;
        let auth_type = shared::select_auth(socket, user_auth_override)?;
        let priority = Self::priority_for(socket, security);

        let mut message = Self::interception_warning(socket);
        if let Some(original) = original_smtp_server {
            if message.is_none()
                && !original.is_empty()
                && !original.eq_ignore_ascii_case(&socket.hostname)
            {
                debug!(original, hostname = %socket.hostname, "server differs from prior configuration");
                message = Some(format!(
                    "This replaces your previous outgoing server {original}"
                ));
            }
        }

        Some(Recommendation {
            priority,
            label: shared::describe_socket(self.name(), socket, security),
            id: String::new(),
            transport: Self::SLUG.to_string(),
            hostname: socket.hostname.clone(),
            port: socket.port,
            security,
            auth_type,
            message,
        })
    }

    fn populate_configuration(&self, hostname: &str) -> ConfigMap {
        shared::base_configuration(Self::SLUG, hostname, 25, Security::None, AuthType::None)
    }

    fn populate_configuration_from_recommendation(
        &self,
        recommendation: &Recommendation,
    ) -> ConfigMap {
        shared::recommendation_configuration(recommendation)
    }

    fn create_override_menu_entry(
        &self,
        socket: &SocketRecord,
        winner: Option<&Recommendation>,
        user_socket_override: Option<&str>,
        user_auth_override: Option<AuthType>,
    ) -> Option<OverrideMenuEntry> {
        if !socket.success {
            return None;
        }
        let security = Self::security_for(socket)?;
        let auto_auth = shared::select_auth(socket, None)?;
        let description = socket
            .label
            .clone()
            .unwrap_or_else(|| shared::describe_socket(self.name(), socket, security));
        Some(shared::menu_entry(
            socket,
            winner,
            user_socket_override,
            user_auth_override,
            description,
            shared::auth_options(socket),
            auto_auth,
        ))
    }

    fn is_oauth_used(&self, auth_type: AuthType) -> bool {
        auth_type == AuthType::OAuth2
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

    fn starttls_probe(hostname: &str, port: u16) -> mailpilot_core::ProbeResult {
        let mut raw = probe(hostname, port, "smtp", true);
        raw.start_tls = true;
        raw.secure = true;
        raw.auth_plain = true;
        raw
    }

    fn smtps_probe(hostname: &str, port: u16) -> mailpilot_core::ProbeResult {
        let mut raw = probe(hostname, port, "smtp", true);
        raw.protocol = "smtps".to_string();
        raw.try_smtps = true;
        raw.secure = true;
        raw.auth_plain = true;
        raw
    }

    #[test]
    fn implicit_tls_outranks_starttls() {
        let transport = SmtpTransport::new();
        let smtps = transport
            .bid(&socket_from(smtps_probe("smtp.a.com", 465)), None, None)
            .unwrap();
        let starttls = transport
            .bid(&socket_from(starttls_probe("smtp.a.com", 587)), None, None)
            .unwrap();
        assert!(smtps.priority > starttls.priority);
        assert_eq!(smtps.security, Security::Tls);
        assert_eq!(starttls.security, Security::StartTls);
    }

    #[test]
    fn starttls_outranks_plaintext() {
        let transport = SmtpTransport::new();
        let starttls = transport
            .bid(&socket_from(starttls_probe("smtp.a.com", 587)), None, None)
            .unwrap();
        let mut raw = probe("smtp.a.com", 25, "smtp", true);
        raw.auth_plain = true;
        let plaintext = transport.bid(&socket_from(raw), None, None).unwrap();
        assert!(starttls.priority > plaintext.priority);
        assert_eq!(plaintext.security, Security::None);
    }

    #[test]
    fn intercepted_tls_ranks_below_honest_plaintext() {
        let transport = SmtpTransport::new();
        let mut raw = smtps_probe("smtp.a.com", 465);
        raw.mitm = true;
        raw.reported_hostname = "interceptor.example".to_string();
        let intercepted = transport.bid(&socket_from(raw), None, None).unwrap();

        let mut plain = probe("smtp.a.com", 25, "smtp", true);
        plain.auth_plain = true;
        let honest = transport.bid(&socket_from(plain), None, None).unwrap();

        assert!(intercepted.priority < honest.priority);
        assert!(intercepted.message.unwrap().contains("interceptor.example"));
    }

    #[test]
    fn submission_port_bonus() {
        let transport = SmtpTransport::new();
        let on_587 = transport
            .bid(&socket_from(starttls_probe("smtp.a.com", 587)), None, None)
            .unwrap();
        let on_2525 = transport
            .bid(&socket_from(starttls_probe("smtp.a.com", 2525)), None, None)
            .unwrap();
        assert!(on_587.priority > on_2525.priority);
    }

    #[test]
    fn declines_broken_implicit_tls() {
        let transport = SmtpTransport::new();
        let mut raw = smtps_probe("smtp.a.com", 465);
        raw.secure = false;
        assert!(transport.bid(&socket_from(raw), None, None).is_none());
    }

    #[test]
    fn declines_socket_with_no_way_to_submit() {
        let transport = SmtpTransport::new();
        let raw = probe("smtp.a.com", 25, "smtp", true);
        assert!(transport.bid(&socket_from(raw), None, None).is_none());
    }

    #[test]
    fn anonymous_submission_bids_lowest() {
        let transport = SmtpTransport::new();
        let mut raw = probe("smtp.a.com", 25, "smtp", true);
        raw.auth_none = true;
        let bid = transport.bid(&socket_from(raw), None, None).unwrap();
        assert_eq!(bid.auth_type, AuthType::None);
        assert_eq!(bid.priority, PRIORITY_PLAINTEXT_ANONYMOUS + SUBMISSION_PORT_BONUS);
    }

    #[test]
    fn auth_override_is_honored() {
        let transport = SmtpTransport::new();
        let bid = transport
            .bid(
                &socket_from(starttls_probe("smtp.a.com", 587)),
                Some(AuthType::Login),
                None,
            )
            .unwrap();
        assert_eq!(bid.auth_type, AuthType::Login);
    }

    #[test]
    fn notes_server_change() {
        let transport = SmtpTransport::new();
        let bid = transport
            .bid(
                &socket_from(starttls_probe("smtp.new.com", 587)),
                None,
                Some("smtp.old.com"),
            )
            .unwrap();
        assert!(bid.message.unwrap().contains("smtp.old.com"));

        let unchanged = transport
            .bid(
                &socket_from(starttls_probe("smtp.new.com", 587)),
                None,
                Some("smtp.new.com"),
            )
            .unwrap();
        assert!(unchanged.message.is_none());
    }

    #[test]
    fn menu_entry_uses_engine_label() {
        let transport = SmtpTransport::new();
        let mut socket = socket_from(starttls_probe("smtp.a.com", 587));
        socket.label = Some("SMTP smtp.a.com:587 (STARTTLS)".to_string());
        let entry = transport
            .create_override_menu_entry(&socket, None, None, None)
            .unwrap();
        assert_eq!(entry.description, "SMTP smtp.a.com:587 (STARTTLS)");
        assert_eq!(entry.auth_options, vec![AuthType::Plain]);
        assert!(!entry.selected);
    }

    #[test]
    fn menu_entry_marks_override_selection() {
        let transport = SmtpTransport::new();
        let socket = socket_from(starttls_probe("smtp.a.com", 587));
        let entry = transport
            .create_override_menu_entry(
                &socket,
                None,
                Some("smtp.a.com_587"),
                Some(AuthType::Login),
            )
            .unwrap();
        assert!(entry.selected);
        assert_eq!(entry.selected_auth, AuthType::Login);
    }

    #[test]
    fn menu_entry_declines_unusable_socket() {
        let transport = SmtpTransport::new();
        let socket = socket_from(probe("smtp.a.com", 25, "smtp", true));
        assert!(
            transport
                .create_override_menu_entry(&socket, None, None, None)
                .is_none()
        );
    }

    #[test]
    fn oauth_detection() {
        let transport = SmtpTransport::new();
        assert!(transport.is_oauth_used(AuthType::OAuth2));
        assert!(!transport.is_oauth_used(AuthType::Plain));
    }
}
