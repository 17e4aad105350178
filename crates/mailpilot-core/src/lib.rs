//! # mailpilot-core
//!
//! Transport recommendation engine for mail delivery setup.
//!
//! Given a batch of probe results for candidate SMTP sockets, pluggable
//! transports bid on each socket and the engine selects the single best way
//! to deliver mail. The caller gets back a merged configuration payload and
//! a ranked override menu, or an explicit "no configuration found" outcome.
//!
//! This crate provides:
//! - The socket/probe data model
//! - The [`transport::Transport`] bidding contract and registry
//! - Winner selection with user-override semantics
//! - Override menu construction
//! - Configuration assembly
//!
//! Probing itself is an external concern: this crate is a pure, synchronous
//! computation over already-collected probe data and performs no I/O.
//!
//! ## Quick Start
//!
//! ```
//! use mailpilot_core::{ProbeResult, RecommendationEngine, RecommendationRequest,
//!     TransportRegistry};
//!
//! let registry = TransportRegistry::new();
//! // registry.register(Box::new(SmtpTransport::new())) etc. at startup
//!
//! let engine = RecommendationEngine::new(&registry);
//! let probes: Vec<ProbeResult> = Vec::new(); // from the connectivity test
//! let outcome = engine.wizard_configuration(probes, &RecommendationRequest::default());
//! assert!(!outcome.unwrap().is_configured());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod engine;
mod error;
pub mod socket;
pub mod transport;

#[cfg(test)]
mod testutil;

pub use engine::{
    EngineOutcome, NO_CONFIGURATION_MESSAGE, RecommendationEngine, RecommendationRequest,
    assemble_configuration,
};
pub use error::{Error, Result};
pub use socket::{ProbeResult, SocketProtocol, SocketRecord};
pub use transport::{
    AuthType, ConfigMap, OverrideMenuEntry, Recommendation, Security, Transport,
    TransportRegistry, config_key,
};
