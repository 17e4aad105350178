//! # mailpilot-transports
//!
//! Built-in transport capability providers for the mailpilot recommendation
//! engine:
//!
//! - [`SmtpTransport`]: direct SMTP to any reachable server
//! - [`GmailApiTransport`]: Gmail HTTPS API with OAuth 2.0
//! - [`ApiMailerTransport`]: hosted API mailers (Mandrill, SendGrid)
//!
//! Register them all with [`register_builtin_transports`] during startup:
//!
//! ```
//! use mailpilot_core::TransportRegistry;
//! use mailpilot_transports::register_builtin_transports;
//!
//! let mut registry = TransportRegistry::new();
//! register_builtin_transports(&mut registry);
//! assert!(registry.get("smtp").is_ok());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod api;
pub mod gmail;
pub mod shared;
pub mod smtp;

#[cfg(test)]
mod testsupport;

pub use api::ApiMailerTransport;
pub use gmail::GmailApiTransport;
pub use smtp::SmtpTransport;

use mailpilot_core::TransportRegistry;

/// Register every built-in transport, in the standard order.
pub fn register_builtin_transports(registry: &mut TransportRegistry) {
    registry.register(Box::new(SmtpTransport::new()));
    registry.register(Box::new(GmailApiTransport::new()));
    registry.register(Box::new(ApiMailerTransport::mandrill()));
    registry.register(Box::new(ApiMailerTransport::sendgrid()));
}
