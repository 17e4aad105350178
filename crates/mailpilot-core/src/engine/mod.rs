//! Recommendation engine.
//!
//! Once the connectivity tests have run, the results are analyzed. The
//! transports place bids on the sockets and the highest bid becomes the
//! recommendation. The response also carries an override menu so the user may
//! choose a different socket with different options.

mod assembler;

pub use assembler::assemble_configuration;

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, trace};

use crate::error::Result;
use crate::socket::{ProbeResult, SocketRecord};
use crate::transport::{
    AuthType, ConfigMap, OverrideMenuEntry, Recommendation, TransportRegistry, config_key,
};

/// Guidance shown when no socket produced a qualifying bid.
pub const NO_CONFIGURATION_MESSAGE: &str =
    "Mailpilot can't find any way to send mail on your system. Run a connectivity test.";

/// Caller-supplied parameters for one recommendation pass.
#[derive(Debug, Clone, Default)]
pub struct RecommendationRequest {
    /// Socket id the user insists on, if any.
    pub user_socket_override: Option<String>,
    /// Authentication type the user insists on, if any.
    pub user_auth_override: Option<AuthType>,
    /// The previously configured SMTP server, used by transports to detect
    /// provider-specific conditions.
    pub original_smtp_server: Option<String>,
}

impl RecommendationRequest {
    /// Whether the caller supplied any override.
    #[must_use]
    pub const fn has_user_override(&self) -> bool {
        self.user_socket_override.is_some() || self.user_auth_override.is_some()
    }
}

/// Result of one recommendation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EngineOutcome {
    /// A winning socket was found.
    Configured {
        /// Merged configuration payload for the winner.
        configuration: ConfigMap,
        /// Selectable alternatives, ordered for display.
        override_menu: Vec<OverrideMenuEntry>,
    },
    /// No socket produced a qualifying bid, or the user's socket override
    /// matched nothing. A normal outcome, not an error.
    NoViableSocket {
        /// Default configuration (carries the override flag when set).
        configuration: ConfigMap,
        /// Human-readable guidance for the caller.
        message: String,
    },
}

impl EngineOutcome {
    /// Whether a winning configuration was produced.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        matches!(self, Self::Configured { .. })
    }

    /// The configuration payload of either outcome.
    #[must_use]
    pub const fn configuration(&self) -> &ConfigMap {
        match self {
            Self::Configured { configuration, .. } | Self::NoViableSocket { configuration, .. } => {
                configuration
            }
        }
    }
}

/// Selects the best way to deliver mail from a batch of probe results.
///
/// Holds no state across invocations; safe to share one registry across
/// concurrent request contexts as long as nothing mutates it.
#[derive(Debug)]
pub struct RecommendationEngine<'a> {
    registry: &'a TransportRegistry,
}

impl<'a> RecommendationEngine<'a> {
    /// Create an engine backed by the given registry.
    #[must_use]
    pub const fn new(registry: &'a TransportRegistry) -> Self {
        Self { registry }
    }

    /// Analyze a batch of probe results and build the full setup response.
    ///
    /// # Errors
    ///
    /// Fails on malformed probe input (missing transport, invalid port) or
    /// when a socket references an unregistered transport.
    pub fn wizard_configuration(
        &self,
        probes: Vec<ProbeResult>,
        request: &RecommendationRequest,
    ) -> Result<EngineOutcome> {
        let mut sockets = probes
            .into_iter()
            .map(SocketRecord::from_probe)
            .collect::<Result<Vec<_>>>()?;

        let winner = self.winning_recommendation(&mut sockets, request)?;
        trace!(?winner, "winning recommendation");

        if let Some(winner) = winner {
            let override_menu = self.override_menu(&sockets, Some(&winner), request)?;
            trace!(?override_menu, "override menu");
            let configuration =
                assemble_configuration(self.registry, &winner, request.has_user_override())?;
            trace!(?configuration, "configuration");
            Ok(EngineOutcome::Configured {
                configuration,
                override_menu,
            })
        } else {
            let mut configuration = ConfigMap::new();
            if request.has_user_override() {
                configuration.insert(config_key::USER_OVERRIDE.to_string(), true.into());
            }
            Ok(EngineOutcome::NoViableSocket {
                configuration,
                message: NO_CONFIGURATION_MESSAGE.to_string(),
            })
        }
    }

    /// Build the configuration for an explicitly chosen transport, outside
    /// the bidding flow.
    ///
    /// # Errors
    ///
    /// Fails when the transport is not registered.
    pub fn manual_configuration(
        &self,
        transport_slug: &str,
        auth_type: AuthType,
        hostname: &str,
    ) -> Result<ConfigMap> {
        let transport = self.registry.get(transport_slug)?;
        let mut configuration = transport.populate_configuration(hostname);
        if transport.is_oauth_used(auth_type) {
            configuration.insert(config_key::DISPLAY_AUTH.to_string(), "oauth2".into());
            debug!(display_auth = "oauth2", "answer display_auth");
        }
        trace!(?configuration, "manual configuration");
        Ok(configuration)
    }

    /// For each successful host/port combination, ask its transport whether
    /// it supports the socket and at what priority, and keep the best.
    ///
    /// A single pass in input order carrying the running best. With a socket
    /// override in play, only an exact id match can set or change the
    /// winner; the priority comparison never runs. Ties keep the first-seen
    /// winner.
    ///
    /// # Errors
    ///
    /// Fails when a socket references an unregistered transport.
    pub fn winning_recommendation(
        &self,
        sockets: &mut [SocketRecord],
        request: &RecommendationRequest,
    ) -> Result<Option<Recommendation>> {
        let mut best_priority = -1_i32;
        let mut winner: Option<Recommendation> = None;

        for socket in sockets.iter_mut() {
            if !socket.success {
                continue;
            }
            debug!(
                hostname = %socket.hostname,
                port = socket.port,
                "asking for judgement"
            );
            let Some(mut recommendation) = self.registry.recommendation(
                socket,
                request.user_auth_override,
                request.original_smtp_server.as_deref(),
            )?
            else {
                continue;
            };
            recommendation.id.clone_from(&socket.id);
            socket.label = Some(recommendation.label.clone());
            debug!(
                priority = recommendation.priority,
                id = %recommendation.id,
                "got a recommendation"
            );

            if let Some(user_socket_override) = request.user_socket_override.as_deref() {
                if recommendation.id == user_socket_override {
                    debug!(id = %recommendation.id, "user chosen socket is the winner");
                    winner = Some(recommendation);
                }
            } else if recommendation.priority > best_priority {
                best_priority = recommendation.priority;
                winner = Some(recommendation);
            }
        }

        Ok(winner)
    }

    /// Build the override menu for every successfully probed socket.
    ///
    /// Entries are keyed by socket id and emitted in descending lexicographic
    /// key order, matching the historical response ordering exactly.
    ///
    /// # Errors
    ///
    /// Fails when a socket references an unregistered transport.
    pub fn override_menu(
        &self,
        sockets: &[SocketRecord],
        winner: Option<&Recommendation>,
        request: &RecommendationRequest,
    ) -> Result<Vec<OverrideMenuEntry>> {
        let mut menu: BTreeMap<String, OverrideMenuEntry> = BTreeMap::new();
        for socket in sockets {
            if !socket.success {
                continue;
            }
            let transport = self.registry.get(&socket.transport)?;
            debug!(
                slug = transport.slug(),
                socket = %socket.id,
                "building override menu entry"
            );
            if let Some(entry) = transport.create_override_menu_entry(
                socket,
                winner,
                request.user_socket_override.as_deref(),
                request.user_auth_override,
            ) {
                menu.insert(socket.id.clone(), entry);
            }
        }
        Ok(menu.into_values().rev().collect())
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
    use crate::testutil::{StubTransport, probe, socket};

    fn registry_with(transport: StubTransport) -> TransportRegistry {
        let mut registry = TransportRegistry::new();
        registry.register(Box::new(transport));
        registry
    }

    mod winner_selection_tests {
        use super::*;

        #[test]
        fn failed_sockets_never_bid() {
            let registry = registry_with(StubTransport::new("smtp", 10));
            let engine = RecommendationEngine::new(&registry);
            let mut sockets = vec![
                socket("smtp.a.com", 25, "smtp", false),
                socket("smtp.a.com", 587, "smtp", false),
            ];
            let winner = engine
                .winning_recommendation(&mut sockets, &RecommendationRequest::default())
                .unwrap();
            assert!(winner.is_none());
            assert!(sockets.iter().all(|s| s.label.is_none()));
        }

        #[test]
        fn highest_priority_wins() {
            let registry = registry_with(
                StubTransport::new("smtp", 0)
                    .with_priority("smtp.a.com_587", 10)
                    .with_priority("smtp.a.com_465", 20),
            );
            let engine = RecommendationEngine::new(&registry);
            let mut sockets = vec![
                socket("smtp.a.com", 587, "smtp", true),
                socket("smtp.a.com", 465, "smtp", true),
            ];
            let winner = engine
                .winning_recommendation(&mut sockets, &RecommendationRequest::default())
                .unwrap()
                .unwrap();
            assert_eq!(winner.id, "smtp.a.com_465");
            assert_eq!(winner.priority, 20);
        }

        #[test]
        fn equal_priority_keeps_first_seen() {
            let registry = registry_with(StubTransport::new("smtp", 10));
            let engine = RecommendationEngine::new(&registry);
            let mut sockets = vec![
                socket("smtp.b.com", 587, "smtp", true),
                socket("smtp.a.com", 587, "smtp", true),
            ];
            let winner = engine
                .winning_recommendation(&mut sockets, &RecommendationRequest::default())
                .unwrap()
                .unwrap();
            assert_eq!(winner.id, "smtp.b.com_587");
        }

        #[test]
        fn bids_label_every_successful_socket() {
            let registry = registry_with(StubTransport::new("smtp", 10));
            let engine = RecommendationEngine::new(&registry);
            let mut sockets = vec![
                socket("smtp.a.com", 587, "smtp", true),
                socket("smtp.a.com", 465, "smtp", true),
                socket("smtp.a.com", 25, "smtp", false),
            ];
            engine
                .winning_recommendation(&mut sockets, &RecommendationRequest::default())
                .unwrap();
            assert!(sockets[0].label.is_some());
            assert!(sockets[1].label.is_some());
            assert!(sockets[2].label.is_none());
        }

        #[test]
        fn declined_bids_are_skipped() {
            let registry = registry_with(
                StubTransport::new("smtp", 10).declining("smtp.a.com_465"),
            );
            let engine = RecommendationEngine::new(&registry);
            let mut sockets = vec![
                socket("smtp.a.com", 465, "smtp", true),
                socket("smtp.a.com", 587, "smtp", true),
            ];
            let winner = engine
                .winning_recommendation(&mut sockets, &RecommendationRequest::default())
                .unwrap()
                .unwrap();
            assert_eq!(winner.id, "smtp.a.com_587");
            assert!(sockets[0].label.is_none());
        }

        #[test]
        fn unknown_transport_is_fatal() {
            let registry = TransportRegistry::new();
            let engine = RecommendationEngine::new(&registry);
            let mut sockets = vec![socket("smtp.a.com", 587, "smtp", true)];
            let err = engine
                .winning_recommendation(&mut sockets, &RecommendationRequest::default())
                .unwrap_err();
            assert_eq!(err, crate::Error::TransportNotFound("smtp".to_string()));
        }
    }

    mod override_tests {
        use super::*;

        fn two_socket_batch() -> Vec<SocketRecord> {
            vec![
                socket("smtp.a.com", 587, "smtp", true),
                socket("smtp.a.com", 465, "smtp", true),
            ]
        }

        fn prioritized_registry() -> TransportRegistry {
            registry_with(
                StubTransport::new("smtp", 0)
                    .with_priority("smtp.a.com_587", 10)
                    .with_priority("smtp.a.com_465", 20),
            )
        }

        #[test]
        fn override_beats_higher_priority() {
            let registry = prioritized_registry();
            let engine = RecommendationEngine::new(&registry);
            let request = RecommendationRequest {
                user_socket_override: Some("smtp.a.com_587".to_string()),
                ..Default::default()
            };
            let winner = engine
                .winning_recommendation(&mut two_socket_batch(), &request)
                .unwrap()
                .unwrap();
            assert_eq!(winner.id, "smtp.a.com_587");
            assert_eq!(winner.priority, 10);
        }

        #[test]
        fn override_suppresses_priority_even_after_match() {
            // A higher-priority socket after the override match must not
            // steal the win.
            let registry = registry_with(
                StubTransport::new("smtp", 0)
                    .with_priority("smtp.a.com_587", 10)
                    .with_priority("smtp.a.com_465", 9000),
            );
            let engine = RecommendationEngine::new(&registry);
            let request = RecommendationRequest {
                user_socket_override: Some("smtp.a.com_587".to_string()),
                ..Default::default()
            };
            let winner = engine
                .winning_recommendation(&mut two_socket_batch(), &request)
                .unwrap()
                .unwrap();
            assert_eq!(winner.id, "smtp.a.com_587");
        }

        #[test]
        fn override_matching_nothing_yields_no_winner() {
            let registry = prioritized_registry();
            let engine = RecommendationEngine::new(&registry);
            let request = RecommendationRequest {
                user_socket_override: Some("smtp.b.com_25".to_string()),
                ..Default::default()
            };
            let winner = engine
                .winning_recommendation(&mut two_socket_batch(), &request)
                .unwrap();
            assert!(winner.is_none());
        }

        #[test]
        fn override_matching_failed_socket_yields_no_winner() {
            let registry = prioritized_registry();
            let engine = RecommendationEngine::new(&registry);
            let mut sockets = vec![
                socket("smtp.a.com", 587, "smtp", false),
                socket("smtp.a.com", 465, "smtp", true),
            ];
            let request = RecommendationRequest {
                user_socket_override: Some("smtp.a.com_587".to_string()),
                ..Default::default()
            };
            let winner = engine.winning_recommendation(&mut sockets, &request).unwrap();
            assert!(winner.is_none());
        }
    }

    mod override_menu_tests {
        use super::*;

        #[test]
        fn menu_sorted_descending_by_id() {
            let registry = registry_with(StubTransport::new("smtp", 10));
            let engine = RecommendationEngine::new(&registry);
            let mut sockets = vec![
                socket("smtp.a.com", 25, "smtp", true),
                socket("smtp.b.com", 587, "smtp", true),
                socket("smtp.a.com", 587, "smtp", true),
            ];
            let request = RecommendationRequest::default();
            let winner = engine
                .winning_recommendation(&mut sockets, &request)
                .unwrap();
            let menu = engine
                .override_menu(&sockets, winner.as_ref(), &request)
                .unwrap();
            let values: Vec<_> = menu.iter().map(|e| e.value.as_str()).collect();
            assert_eq!(
                values,
                vec!["smtp.b.com_587", "smtp.a.com_587", "smtp.a.com_25"]
            );
        }

        #[test]
        fn failed_sockets_never_appear() {
            let registry = registry_with(StubTransport::new("smtp", 10));
            let engine = RecommendationEngine::new(&registry);
            let sockets = vec![
                socket("smtp.a.com", 587, "smtp", true),
                socket("smtp.a.com", 465, "smtp", false),
            ];
            let menu = engine
                .override_menu(&sockets, None, &RecommendationRequest::default())
                .unwrap();
            assert_eq!(menu.len(), 1);
            assert_eq!(menu[0].value, "smtp.a.com_587");
        }

        #[test]
        fn duplicate_ids_collapse_last_write_wins() {
            // Two sockets differing only in protocol share an id.
            let registry = registry_with(StubTransport::new("smtp", 10));
            let engine = RecommendationEngine::new(&registry);
            let mut first = socket("smtp.a.com", 587, "smtp", true);
            first.label = Some("first".to_string());
            let mut second = socket("smtp.a.com", 587, "smtp", true);
            second.label = Some("second".to_string());
            let menu = engine
                .override_menu(&[first, second], None, &RecommendationRequest::default())
                .unwrap();
            assert_eq!(menu.len(), 1);
            assert!(menu[0].description.contains("second"));
        }

        #[test]
        fn declined_entries_are_skipped() {
            let registry = registry_with(
                StubTransport::new("smtp", 10).refusing_menu("smtp.a.com_25"),
            );
            let engine = RecommendationEngine::new(&registry);
            let sockets = vec![
                socket("smtp.a.com", 25, "smtp", true),
                socket("smtp.a.com", 587, "smtp", true),
            ];
            let menu = engine
                .override_menu(&sockets, None, &RecommendationRequest::default())
                .unwrap();
            assert_eq!(menu.len(), 1);
            assert_eq!(menu[0].value, "smtp.a.com_587");
        }
    }

    mod wizard_tests {
        use super::*;

        #[test]
        fn empty_batch_finds_nothing() {
            let registry = registry_with(StubTransport::new("smtp", 10));
            let engine = RecommendationEngine::new(&registry);
            let outcome = engine
                .wizard_configuration(vec![], &RecommendationRequest::default())
                .unwrap();
            match outcome {
                EngineOutcome::NoViableSocket {
                    configuration,
                    message,
                } => {
                    assert!(configuration.is_empty());
                    assert_eq!(message, NO_CONFIGURATION_MESSAGE);
                }
                EngineOutcome::Configured { .. } => panic!("expected no configuration"),
            }
        }

        #[test]
        fn winning_batch_produces_configuration_and_menu() {
            let registry = registry_with(
                StubTransport::new("smtp", 0)
                    .with_priority("smtp.a.com_587", 10)
                    .with_priority("smtp.a.com_465", 20),
            );
            let engine = RecommendationEngine::new(&registry);
            let probes = vec![
                probe("smtp.a.com", 587, "smtp", true),
                probe("smtp.a.com", 465, "smtp", true),
            ];
            let outcome = engine
                .wizard_configuration(probes, &RecommendationRequest::default())
                .unwrap();
            match outcome {
                EngineOutcome::Configured {
                    configuration,
                    override_menu,
                } => {
                    assert_eq!(configuration["port"], serde_json::json!(465));
                    assert!(!configuration.contains_key("user_override"));
                    assert_eq!(override_menu.len(), 2);
                }
                EngineOutcome::NoViableSocket { .. } => panic!("expected a configuration"),
            }
        }

        #[test]
        fn user_override_flag_is_set_on_both_outcomes() {
            let registry = registry_with(StubTransport::new("smtp", 10));
            let engine = RecommendationEngine::new(&registry);
            let request = RecommendationRequest {
                user_auth_override: Some(AuthType::Plain),
                ..Default::default()
            };

            let configured = engine
                .wizard_configuration(vec![probe("smtp.a.com", 587, "smtp", true)], &request)
                .unwrap();
            assert_eq!(
                configured.configuration()["user_override"],
                serde_json::json!(true)
            );

            let missed = engine.wizard_configuration(vec![], &request).unwrap();
            assert_eq!(
                missed.configuration()["user_override"],
                serde_json::json!(true)
            );
        }

        #[test]
        fn malformed_probe_fails_fast() {
            let registry = registry_with(StubTransport::new("smtp", 10));
            let engine = RecommendationEngine::new(&registry);
            let probes = vec![probe("smtp.a.com", 587, "", true)];
            assert!(
                engine
                    .wizard_configuration(probes, &RecommendationRequest::default())
                    .is_err()
            );
        }
    }

    mod manual_tests {
        use super::*;

        #[test]
        fn manual_configuration_for_known_transport() {
            let registry = registry_with(StubTransport::new("smtp", 10));
            let engine = RecommendationEngine::new(&registry);
            let configuration = engine
                .manual_configuration("smtp", AuthType::Plain, "smtp.a.com")
                .unwrap();
            assert_eq!(configuration["hostname"], serde_json::json!("smtp.a.com"));
            assert!(!configuration.contains_key("display_auth"));
        }

        #[test]
        fn manual_configuration_flags_oauth() {
            let registry = registry_with(StubTransport::new("smtp", 10));
            let engine = RecommendationEngine::new(&registry);
            let configuration = engine
                .manual_configuration("smtp", AuthType::OAuth2, "smtp.a.com")
                .unwrap();
            assert_eq!(configuration["display_auth"], serde_json::json!("oauth2"));
        }

        #[test]
        fn manual_configuration_unknown_transport_fails() {
            let registry = TransportRegistry::new();
            let engine = RecommendationEngine::new(&registry);
            assert!(
                engine
                    .manual_configuration("smtp", AuthType::Plain, "smtp.a.com")
                    .is_err()
            );
        }
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn batch_strategy() -> impl Strategy<Value = Vec<(u16, i32, bool)>> {
            proptest::collection::vec((1_u16..=u16::MAX, 0_i32..10_000, any::<bool>()), 0..12)
        }

        proptest! {
            #[test]
            fn winner_priority_is_the_maximum(batch in batch_strategy()) {
                let mut stub = StubTransport::new("smtp", 0);
                let mut sockets = Vec::new();
                for (i, (port, priority, success)) in batch.iter().enumerate() {
                    let hostname = format!("smtp.host{i}.com");
                    stub = stub.with_priority(&format!("{hostname}_{port}"), *priority);
                    sockets.push(socket(&hostname, *port, "smtp", *success));
                }
                let mut registry = TransportRegistry::new();
                registry.register(Box::new(stub));
                let engine = RecommendationEngine::new(&registry);

                let winner = engine
                    .winning_recommendation(&mut sockets, &RecommendationRequest::default())
                    .unwrap();
                let max = batch
                    .iter()
                    .filter(|(_, _, success)| *success)
                    .map(|(_, priority, _)| *priority)
                    .max();
                match max {
                    Some(max) => prop_assert_eq!(winner.unwrap().priority, max),
                    None => prop_assert!(winner.is_none()),
                }
            }

            #[test]
            fn equal_bids_keep_the_first_socket(count in 1_usize..10) {
                let mut registry = TransportRegistry::new();
                registry.register(Box::new(StubTransport::new("smtp", 7)));
                let engine = RecommendationEngine::new(&registry);
                let mut sockets: Vec<_> = (0..count)
                    .map(|i| socket(&format!("smtp.host{i}.com"), 587, "smtp", true))
                    .collect();
                let winner = engine
                    .winning_recommendation(&mut sockets, &RecommendationRequest::default())
                    .unwrap()
                    .unwrap();
                prop_assert_eq!(winner.id, "smtp.host0.com_587");
            }

            #[test]
            fn menu_is_descending_by_id(batch in batch_strategy()) {
                let mut registry = TransportRegistry::new();
                registry.register(Box::new(StubTransport::new("smtp", 7)));
                let engine = RecommendationEngine::new(&registry);
                let sockets: Vec<_> = batch
                    .iter()
                    .enumerate()
                    .map(|(i, (port, _, success))| {
                        socket(&format!("smtp.host{i}.com"), *port, "smtp", *success)
                    })
                    .collect();
                let menu = engine
                    .override_menu(&sockets, None, &RecommendationRequest::default())
                    .unwrap();
                for pair in menu.windows(2) {
                    prop_assert!(pair[0].value > pair[1].value);
                }
                let offered = sockets.iter().filter(|s| s.success).count();
                prop_assert_eq!(menu.len(), offered);
            }
        }
    }
}
