//! Socket record types.
//!
//! A [`ProbeResult`] is one raw record from the connectivity test feed. A
//! [`SocketRecord`] is the validated form the engine works with: identity is
//! `hostname_port`, and the `label` field is filled in later by the bidding
//! transport.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Protocol the prober spoke on this socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocketProtocol {
    /// Plaintext SMTP session start (may upgrade via STARTTLS).
    #[default]
    Smtp,
    /// Implicit TLS from the first byte ("smtps").
    Smtps,
}

impl SocketProtocol {
    /// Parses a protocol token from the probe feed.
    ///
    /// The prober only emits `smtp` and `smtps`; anything unrecognized is
    /// treated as a plaintext session start.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("smtps") {
            Self::Smtps
        } else {
            Self::Smtp
        }
    }

    /// Returns the protocol token as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Smtp => "smtp",
            Self::Smtps => "smtps",
        }
    }
}

/// One raw record from the connectivity test feed.
///
/// Field names match the probe payload. Boolean fields tolerate the loose
/// encodings the feed has historically used (`"true"`, `"yes"`, `"1"`, `1`)
/// in addition to JSON booleans.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeResult {
    /// Hostname that was probed.
    pub hostname: String,
    /// Registered domain of the probed hostname.
    #[serde(default)]
    pub hostname_domain_only: String,
    /// Port that was probed.
    pub port: u16,
    /// Protocol token (`smtp` or `smtps`).
    #[serde(default)]
    pub protocol: String,
    /// Whether the session ended up encrypted.
    #[serde(default, deserialize_with = "loose_bool")]
    pub secure: bool,
    /// Whether the reported hostname diverged from the expected one.
    #[serde(default, deserialize_with = "loose_bool")]
    pub mitm: bool,
    /// Hostname the remote server identified itself as.
    #[serde(default)]
    pub reported_hostname: String,
    /// Registered domain of the reported hostname.
    #[serde(default)]
    pub reported_hostname_domain_only: String,
    /// Diagnostic message from the prober, if any.
    #[serde(default)]
    pub message: Option<String>,
    /// STARTTLS was offered.
    #[serde(default, deserialize_with = "loose_bool")]
    pub start_tls: bool,
    /// AUTH PLAIN was offered.
    #[serde(default, deserialize_with = "loose_bool")]
    pub auth_plain: bool,
    /// AUTH LOGIN was offered.
    #[serde(default, deserialize_with = "loose_bool")]
    pub auth_login: bool,
    /// AUTH CRAM-MD5 was offered.
    #[serde(default, deserialize_with = "loose_bool")]
    pub auth_crammd5: bool,
    /// AUTH XOAUTH2 was offered.
    #[serde(default, deserialize_with = "loose_bool")]
    pub auth_xoauth: bool,
    /// The server accepts mail without authentication.
    #[serde(default, deserialize_with = "loose_bool")]
    pub auth_none: bool,
    /// An implicit-TLS connection was attempted on this socket.
    #[serde(default, deserialize_with = "loose_bool")]
    pub try_smtps: bool,
    /// Overall reachability and service outcome.
    #[serde(default, deserialize_with = "loose_bool")]
    pub success: bool,
    /// Slug of the transport this probe was run for.
    #[serde(default)]
    pub transport: String,
}

/// Immutable description of one probed host:port combination.
///
/// Constructed from a [`ProbeResult`]; construction validates the originating
/// transport and the port. The `label` field is the one exception to
/// immutability: the engine writes the bidding transport's label onto the
/// socket so the override menu can render it.
#[derive(Debug, Clone, Serialize)]
pub struct SocketRecord {
    /// Hostname that was probed.
    pub hostname: String,
    /// Registered domain of the probed hostname.
    pub hostname_domain_only: String,
    /// Port that was probed.
    pub port: u16,
    /// Protocol spoken on this socket.
    pub protocol: SocketProtocol,
    /// Whether the session ended up encrypted.
    pub secure: bool,
    /// Whether the reported hostname diverged from the expected one.
    pub mitm: bool,
    /// Hostname the remote server identified itself as.
    pub reported_hostname: String,
    /// Registered domain of the reported hostname.
    pub reported_hostname_domain_only: String,
    /// STARTTLS was offered.
    pub start_tls: bool,
    /// AUTH PLAIN was offered.
    pub auth_plain: bool,
    /// AUTH LOGIN was offered.
    pub auth_login: bool,
    /// AUTH CRAM-MD5 was offered.
    pub auth_crammd5: bool,
    /// AUTH XOAUTH2 was offered.
    pub auth_xoauth: bool,
    /// The server accepts mail without authentication.
    pub auth_none: bool,
    /// An implicit-TLS connection was attempted on this socket.
    pub try_smtps: bool,
    /// Overall reachability and service outcome.
    pub success: bool,
    /// Slug of the transport this probe was run for.
    pub transport: String,
    /// Diagnostic message from the prober, if any.
    pub message: Option<String>,
    /// Stable identity key, `hostname_port`.
    pub id: String,
    /// Display label, written by the bidding transport.
    pub label: Option<String>,
}

impl SocketRecord {
    /// Builds a validated socket record from a probe result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingTransport`] if the probe carries no
    /// originating transport, or [`Error::InvalidPort`] for port 0.
    pub fn from_probe(probe: ProbeResult) -> Result<Self> {
        if probe.transport.trim().is_empty() {
            return Err(Error::MissingTransport {
                hostname: probe.hostname,
                port: probe.port,
            });
        }
        if probe.port == 0 {
            return Err(Error::InvalidPort {
                hostname: probe.hostname,
                port: probe.port,
            });
        }
        let id = format!("{}_{}", probe.hostname, probe.port);
        Ok(Self {
            hostname: probe.hostname,
            hostname_domain_only: probe.hostname_domain_only,
            port: probe.port,
            protocol: SocketProtocol::parse(&probe.protocol),
            secure: probe.secure,
            mitm: probe.mitm,
            reported_hostname: probe.reported_hostname,
            reported_hostname_domain_only: probe.reported_hostname_domain_only,
            start_tls: probe.start_tls,
            auth_plain: probe.auth_plain,
            auth_login: probe.auth_login,
            auth_crammd5: probe.auth_crammd5,
            auth_xoauth: probe.auth_xoauth,
            auth_none: probe.auth_none,
            try_smtps: probe.try_smtps,
            success: probe.success,
            transport: probe.transport,
            message: probe.message,
            id,
            label: None,
        })
    }

    /// Whether any authentication mechanism was offered.
    #[must_use]
    pub const fn offers_auth(&self) -> bool {
        self.auth_plain || self.auth_login || self.auth_crammd5 || self.auth_xoauth
    }
}

/// Accepts JSON booleans plus the loose encodings the probe feed uses.
fn loose_bool<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    struct LooseBool;

    impl de::Visitor<'_> for LooseBool {
        type Value = bool;

        fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("a boolean, integer, or boolean-like string")
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<bool, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<bool, E> {
            Ok(v != 0)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<bool, E> {
            Ok(v != 0)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<bool, E> {
            Ok(matches!(
                v.to_ascii_lowercase().as_str(),
                "true" | "yes" | "on" | "1"
            ))
        }
    }

    deserializer.deserialize_any(LooseBool)
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

    fn probe(hostname: &str, port: u16, transport: &str) -> ProbeResult {
        ProbeResult {
            hostname: hostname.to_string(),
            port,
            transport: transport.to_string(),
            ..Default::default()
        }
    }

    mod protocol_tests {
        use super::*;

        #[test]
        fn parse_smtp() {
            assert_eq!(SocketProtocol::parse("smtp"), SocketProtocol::Smtp);
            assert_eq!(SocketProtocol::parse("SMTP"), SocketProtocol::Smtp);
        }

        #[test]
        fn parse_smtps() {
            assert_eq!(SocketProtocol::parse("smtps"), SocketProtocol::Smtps);
            assert_eq!(SocketProtocol::parse("SMTPS"), SocketProtocol::Smtps);
        }

        #[test]
        fn parse_unknown_falls_back_to_smtp() {
            assert_eq!(SocketProtocol::parse("imap"), SocketProtocol::Smtp);
            assert_eq!(SocketProtocol::parse(""), SocketProtocol::Smtp);
        }

        #[test]
        fn as_str() {
            assert_eq!(SocketProtocol::Smtp.as_str(), "smtp");
            assert_eq!(SocketProtocol::Smtps.as_str(), "smtps");
        }
    }

    mod record_tests {
        use super::*;

        #[test]
        fn id_is_hostname_underscore_port() {
            let socket = SocketRecord::from_probe(probe("smtp.example.com", 587, "smtp")).unwrap();
            assert_eq!(socket.id, "smtp.example.com_587");
        }

        #[test]
        fn empty_transport_fails_construction() {
            let err = SocketRecord::from_probe(probe("smtp.example.com", 587, "")).unwrap_err();
            assert_eq!(
                err,
                Error::MissingTransport {
                    hostname: "smtp.example.com".to_string(),
                    port: 587,
                }
            );
        }

        #[test]
        fn whitespace_transport_fails_construction() {
            let err = SocketRecord::from_probe(probe("smtp.example.com", 587, "  ")).unwrap_err();
            assert!(matches!(err, Error::MissingTransport { .. }));
        }

        #[test]
        fn port_zero_fails_construction() {
            let err = SocketRecord::from_probe(probe("smtp.example.com", 0, "smtp")).unwrap_err();
            assert!(matches!(err, Error::InvalidPort { port: 0, .. }));
        }

        #[test]
        fn label_starts_empty() {
            let socket = SocketRecord::from_probe(probe("smtp.example.com", 25, "smtp")).unwrap();
            assert!(socket.label.is_none());
        }

        #[test]
        fn offers_auth() {
            let mut raw = probe("smtp.example.com", 587, "smtp");
            raw.auth_login = true;
            let socket = SocketRecord::from_probe(raw).unwrap();
            assert!(socket.offers_auth());

            let bare = SocketRecord::from_probe(probe("smtp.example.com", 25, "smtp")).unwrap();
            assert!(!bare.offers_auth());
        }
    }

    mod probe_feed_tests {
        use super::*;

        #[test]
        fn deserializes_json_booleans() {
            let raw = r#"{
                "hostname": "smtp.example.com",
                "hostname_domain_only": "example.com",
                "port": 465,
                "protocol": "smtps",
                "secure": true,
                "mitm": false,
                "reported_hostname": "smtp.example.com",
                "reported_hostname_domain_only": "example.com",
                "start_tls": false,
                "auth_plain": true,
                "auth_login": true,
                "auth_crammd5": false,
                "auth_xoauth": false,
                "auth_none": false,
                "try_smtps": true,
                "success": true,
                "transport": "smtp"
            }"#;
            let parsed: ProbeResult = serde_json::from_str(raw).unwrap();
            assert!(parsed.secure);
            assert!(parsed.success);
            assert!(!parsed.start_tls);
            assert_eq!(parsed.port, 465);
        }

        #[test]
        fn deserializes_loose_booleans() {
            let raw = r#"{
                "hostname": "smtp.example.com",
                "port": 587,
                "secure": "true",
                "start_tls": "yes",
                "auth_plain": "1",
                "auth_login": 1,
                "auth_crammd5": "false",
                "success": "on",
                "transport": "smtp"
            }"#;
            let parsed: ProbeResult = serde_json::from_str(raw).unwrap();
            assert!(parsed.secure);
            assert!(parsed.start_tls);
            assert!(parsed.auth_plain);
            assert!(parsed.auth_login);
            assert!(!parsed.auth_crammd5);
            assert!(parsed.success);
        }

        #[test]
        fn missing_fields_default_to_false() {
            let raw = r#"{"hostname": "h", "port": 25, "transport": "smtp"}"#;
            let parsed: ProbeResult = serde_json::from_str(raw).unwrap();
            assert!(!parsed.secure);
            assert!(!parsed.success);
            assert!(parsed.message.is_none());
        }
    }
}
