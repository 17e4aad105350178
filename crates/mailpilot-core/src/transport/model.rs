//! Shared types for transport bidding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Free-form configuration mapping handed back to the caller.
///
/// Ordered so the payload serializes deterministically.
pub type ConfigMap = BTreeMap<String, serde_json::Value>;

/// Well-known configuration keys.
pub mod config_key {
    /// Transport slug.
    pub const TRANSPORT_TYPE: &str = "transport_type";
    /// Outgoing server hostname.
    pub const HOSTNAME: &str = "hostname";
    /// Outgoing server port.
    pub const PORT: &str = "port";
    /// Connection security token (`none`, `starttls`, `ssl`).
    pub const ENC_TYPE: &str = "enc_type";
    /// Authentication type token.
    pub const AUTH_TYPE: &str = "auth_type";
    /// Which authentication fields the caller should display.
    pub const DISPLAY_AUTH: &str = "display_auth";
    /// Set when the caller supplied a socket or auth override.
    pub const USER_OVERRIDE: &str = "user_override";
    /// Human-readable guidance when no configuration was found.
    pub const MESSAGE: &str = "message";
}

/// Authentication type a transport configures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    /// No authentication.
    #[default]
    None,
    /// AUTH PLAIN.
    Plain,
    /// AUTH LOGIN.
    Login,
    /// AUTH CRAM-MD5.
    CramMd5,
    /// OAuth 2.0 (XOAUTH2).
    OAuth2,
}

impl AuthType {
    /// Parses an authentication type token.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "plain" => Some(Self::Plain),
            "login" => Some(Self::Login),
            "crammd5" => Some(Self::CramMd5),
            "oauth2" => Some(Self::OAuth2),
            _ => None,
        }
    }

    /// Returns the token as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Plain => "plain",
            Self::Login => "login",
            Self::CramMd5 => "crammd5",
            Self::OAuth2 => "oauth2",
        }
    }

    /// Get display name for the authentication type.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::None => "No authentication",
            Self::Plain => "Plain",
            Self::Login => "Login",
            Self::CramMd5 => "CRAM-MD5",
            Self::OAuth2 => "OAuth 2.0",
        }
    }
}

/// Security/encryption mode for the recommended connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    /// No encryption (not recommended).
    None,
    /// STARTTLS upgrade after plaintext connect.
    StartTls,
    /// Implicit TLS (connect directly with TLS).
    #[default]
    Tls,
}

impl Security {
    /// Get display name for the security mode.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::None => "None (insecure)",
            Self::StartTls => "STARTTLS",
            Self::Tls => "SSL/TLS",
        }
    }

    /// Returns the `enc_type` configuration token.
    #[must_use]
    pub const fn enc_type(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::StartTls => "starttls",
            Self::Tls => "ssl",
        }
    }
}

/// One transport's bid for one socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    /// Bid priority; higher wins, transports pick their own scale.
    pub priority: i32,
    /// Display label for this socket.
    pub label: String,
    /// Socket identity key, attached by the engine.
    pub id: String,
    /// Slug of the bidding transport.
    pub transport: String,
    /// Hostname to configure.
    pub hostname: String,
    /// Port to configure.
    pub port: u16,
    /// Security mode to configure.
    pub security: Security,
    /// Authentication type to configure.
    pub auth_type: AuthType,
    /// Optional note for the caller (e.g. an interception warning).
    pub message: Option<String>,
}

/// One selectable alternative in the override menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverrideMenuEntry {
    /// Socket identity key this entry selects.
    pub value: String,
    /// Display description.
    pub description: String,
    /// Whether this entry is the currently selected choice.
    pub selected: bool,
    /// Authentication types the socket supports.
    pub auth_options: Vec<AuthType>,
    /// Authentication type the transport would pick.
    pub selected_auth: AuthType,
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

    mod auth_type_tests {
        use super::*;

        #[test]
        fn parse_round_trips() {
            for auth in [
                AuthType::None,
                AuthType::Plain,
                AuthType::Login,
                AuthType::CramMd5,
                AuthType::OAuth2,
            ] {
                assert_eq!(AuthType::parse(auth.as_str()), Some(auth));
            }
        }

        #[test]
        fn parse_is_case_insensitive() {
            assert_eq!(AuthType::parse("OAUTH2"), Some(AuthType::OAuth2));
            assert_eq!(AuthType::parse("CramMD5"), Some(AuthType::CramMd5));
        }

        #[test]
        fn parse_unknown() {
            assert_eq!(AuthType::parse("ntlm"), None);
        }

        #[test]
        fn serde_tokens() {
            assert_eq!(
                serde_json::to_string(&AuthType::CramMd5).unwrap(),
                "\"crammd5\""
            );
            assert_eq!(
                serde_json::to_string(&AuthType::OAuth2).unwrap(),
                "\"oauth2\""
            );
        }
    }

    mod security_tests {
        use super::*;

        #[test]
        fn default_is_tls() {
            assert_eq!(Security::default(), Security::Tls);
        }

        #[test]
        fn enc_type_tokens() {
            assert_eq!(Security::None.enc_type(), "none");
            assert_eq!(Security::StartTls.enc_type(), "starttls");
            assert_eq!(Security::Tls.enc_type(), "ssl");
        }

        #[test]
        fn display_names() {
            assert_eq!(Security::None.display_name(), "None (insecure)");
            assert_eq!(Security::Tls.display_name(), "SSL/TLS");
            assert_eq!(Security::StartTls.display_name(), "STARTTLS");
        }
    }
}
