//! End-to-end tests for the recommendation flow.
//!
//! These tests drive the engine with the built-in transports over hand-built
//! probe batches, the way the setup flow does after a connectivity test.

use mailpilot_core::{
    AuthType, EngineOutcome, ProbeResult, RecommendationEngine, RecommendationRequest,
    TransportRegistry,
};
use mailpilot_transports::register_builtin_transports;

fn registry() -> TransportRegistry {
    let mut registry = TransportRegistry::new();
    register_builtin_transports(&mut registry);
    registry
}

fn probe(hostname: &str, port: u16, transport: &str) -> ProbeResult {
    ProbeResult {
        hostname: hostname.to_string(),
        port,
        transport: transport.to_string(),
        success: true,
        ..Default::default()
    }
}

fn starttls_probe(hostname: &str, port: u16) -> ProbeResult {
    let mut raw = probe(hostname, port, "smtp");
    raw.start_tls = true;
    raw.secure = true;
    raw.auth_plain = true;
    raw.auth_login = true;
    raw
}

fn smtps_probe(hostname: &str, port: u16) -> ProbeResult {
    let mut raw = probe(hostname, port, "smtp");
    raw.protocol = "smtps".to_string();
    raw.try_smtps = true;
    raw.secure = true;
    raw.auth_plain = true;
    raw
}

fn configured(outcome: EngineOutcome) -> (mailpilot_core::ConfigMap, Vec<mailpilot_core::OverrideMenuEntry>) {
    match outcome {
        EngineOutcome::Configured {
            configuration,
            override_menu,
        } => (configuration, override_menu),
        EngineOutcome::NoViableSocket { message, .. } => {
            panic!("expected a configuration, got: {message}")
        }
    }
}

#[test]
fn empty_batch_yields_no_configuration() {
    let registry = registry();
    let engine = RecommendationEngine::new(&registry);
    let outcome = engine
        .wizard_configuration(vec![], &RecommendationRequest::default())
        .unwrap();
    assert!(!outcome.is_configured());
}

#[test]
fn all_failed_probes_yield_no_configuration() {
    let registry = registry();
    let engine = RecommendationEngine::new(&registry);
    let mut a = starttls_probe("smtp.a.com", 587);
    a.success = false;
    let mut b = smtps_probe("smtp.a.com", 465);
    b.success = false;
    let outcome = engine
        .wizard_configuration(vec![a, b], &RecommendationRequest::default())
        .unwrap();
    match outcome {
        EngineOutcome::NoViableSocket { message, .. } => {
            assert!(message.contains("connectivity test"));
        }
        EngineOutcome::Configured { .. } => panic!("expected no configuration"),
    }
}

#[test]
fn implicit_tls_socket_wins() {
    let registry = registry();
    let engine = RecommendationEngine::new(&registry);
    let probes = vec![
        starttls_probe("smtp.a.com", 587),
        smtps_probe("smtp.a.com", 465),
    ];
    let (configuration, override_menu) = configured(
        engine
            .wizard_configuration(probes, &RecommendationRequest::default())
            .unwrap(),
    );
    assert_eq!(configuration["transport_type"], serde_json::json!("smtp"));
    assert_eq!(configuration["port"], serde_json::json!(465));
    assert_eq!(configuration["enc_type"], serde_json::json!("ssl"));
    assert_eq!(override_menu.len(), 2);
    let selected: Vec<_> = override_menu.iter().filter(|e| e.selected).collect();
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].value, "smtp.a.com_465");
}

#[test]
fn user_override_selects_lower_priority_socket() {
    let registry = registry();
    let engine = RecommendationEngine::new(&registry);
    let probes = vec![
        starttls_probe("smtp.a.com", 587),
        smtps_probe("smtp.a.com", 465),
    ];
    let request = RecommendationRequest {
        user_socket_override: Some("smtp.a.com_587".to_string()),
        ..Default::default()
    };
    let (configuration, override_menu) =
        configured(engine.wizard_configuration(probes, &request).unwrap());
    assert_eq!(configuration["port"], serde_json::json!(587));
    assert_eq!(configuration["enc_type"], serde_json::json!("starttls"));
    assert_eq!(configuration["user_override"], serde_json::json!(true));
    let selected: Vec<_> = override_menu.iter().filter(|e| e.selected).collect();
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].value, "smtp.a.com_587");
}

#[test]
fn override_matching_nothing_yields_no_configuration() {
    let registry = registry();
    let engine = RecommendationEngine::new(&registry);
    let probes = vec![
        starttls_probe("smtp.a.com", 587),
        smtps_probe("smtp.a.com", 465),
    ];
    let request = RecommendationRequest {
        user_socket_override: Some("smtp.b.com_25".to_string()),
        ..Default::default()
    };
    let outcome = engine.wizard_configuration(probes, &request).unwrap();
    match outcome {
        EngineOutcome::NoViableSocket { configuration, .. } => {
            assert_eq!(configuration["user_override"], serde_json::json!(true));
        }
        EngineOutcome::Configured { .. } => panic!("expected no configuration"),
    }
}

#[test]
fn menu_is_descending_by_id_and_excludes_failures() {
    let registry = registry();
    let engine = RecommendationEngine::new(&registry);
    let mut failed = starttls_probe("smtp.c.com", 587);
    failed.success = false;
    let probes = vec![
        starttls_probe("smtp.a.com", 587),
        failed,
        smtps_probe("smtp.b.com", 465),
        starttls_probe("smtp.a.com", 25),
    ];
    let (_, override_menu) = configured(
        engine
            .wizard_configuration(probes, &RecommendationRequest::default())
            .unwrap(),
    );
    let values: Vec<_> = override_menu.iter().map(|e| e.value.as_str()).collect();
    assert_eq!(
        values,
        vec!["smtp.b.com_465", "smtp.a.com_587", "smtp.a.com_25"]
    );
}

#[test]
fn equal_priority_keeps_first_seen() {
    let registry = registry();
    let engine = RecommendationEngine::new(&registry);
    let probes = vec![
        starttls_probe("smtp.b.com", 587),
        starttls_probe("smtp.a.com", 587),
    ];
    let (configuration, _) = configured(
        engine
            .wizard_configuration(probes, &RecommendationRequest::default())
            .unwrap(),
    );
    assert_eq!(configuration["hostname"], serde_json::json!("smtp.b.com"));
}

#[test]
fn gmail_api_outbids_direct_smtp() {
    let registry = registry();
    let engine = RecommendationEngine::new(&registry);

    let mut direct = smtps_probe("smtp.gmail.com", 465);
    direct.hostname_domain_only = "gmail.com".to_string();
    direct.auth_xoauth = true;

    let mut api = smtps_probe("smtp.gmail.com", 465);
    api.hostname_domain_only = "gmail.com".to_string();
    api.auth_xoauth = true;
    api.transport = "gmail_api".to_string();

    let (configuration, _) = configured(
        engine
            .wizard_configuration(vec![direct, api], &RecommendationRequest::default())
            .unwrap(),
    );
    assert_eq!(
        configuration["transport_type"],
        serde_json::json!("gmail_api")
    );
    assert_eq!(configuration["port"], serde_json::json!(443));
    assert_eq!(configuration["auth_type"], serde_json::json!("oauth2"));
}

#[test]
fn provider_api_outbids_generic_smtp() {
    let registry = registry();
    let engine = RecommendationEngine::new(&registry);

    let mut sendgrid = starttls_probe("smtp.sendgrid.net", 587);
    sendgrid.hostname_domain_only = "sendgrid.net".to_string();
    sendgrid.transport = "sendgrid".to_string();

    let probes = vec![starttls_probe("smtp.a.com", 587), sendgrid];
    let (configuration, _) = configured(
        engine
            .wizard_configuration(probes, &RecommendationRequest::default())
            .unwrap(),
    );
    assert_eq!(
        configuration["transport_type"],
        serde_json::json!("sendgrid")
    );
    assert_eq!(
        configuration["hostname"],
        serde_json::json!("api.sendgrid.com")
    );
    assert!(configuration.contains_key("api_key"));
}

#[test]
fn intercepted_socket_loses_to_honest_plaintext() {
    let registry = registry();
    let engine = RecommendationEngine::new(&registry);

    let mut intercepted = smtps_probe("smtp.a.com", 465);
    intercepted.mitm = true;
    intercepted.reported_hostname = "interceptor.example".to_string();

    let mut plain = probe("smtp.a.com", 25, "smtp");
    plain.auth_plain = true;

    let (configuration, _) = configured(
        engine
            .wizard_configuration(vec![intercepted, plain], &RecommendationRequest::default())
            .unwrap(),
    );
    assert_eq!(configuration["port"], serde_json::json!(25));
    assert_eq!(configuration["enc_type"], serde_json::json!("none"));
}

#[test]
fn auth_override_flows_into_configuration() {
    let registry = registry();
    let engine = RecommendationEngine::new(&registry);
    let request = RecommendationRequest {
        user_auth_override: Some(AuthType::Login),
        ..Default::default()
    };
    let (configuration, _) = configured(
        engine
            .wizard_configuration(vec![starttls_probe("smtp.a.com", 587)], &request)
            .unwrap(),
    );
    assert_eq!(configuration["auth_type"], serde_json::json!("login"));
    assert_eq!(configuration["user_override"], serde_json::json!(true));
}

#[test]
fn base_configuration_keys_survive_the_merge() {
    let registry = registry();
    let engine = RecommendationEngine::new(&registry);
    let (configuration, _) = configured(
        engine
            .wizard_configuration(
                vec![starttls_probe("smtp.a.com", 587)],
                &RecommendationRequest::default(),
            )
            .unwrap(),
    );
    let base = registry
        .get("smtp")
        .unwrap()
        .populate_configuration("smtp.a.com");
    for key in base.keys() {
        assert!(configuration.contains_key(key), "missing base key {key}");
    }
}

#[test]
fn manual_configuration_flags_oauth_transports() {
    let registry = registry();
    let engine = RecommendationEngine::new(&registry);

    let gmail = engine
        .manual_configuration("gmail_api", AuthType::OAuth2, "smtp.gmail.com")
        .unwrap();
    assert_eq!(gmail["display_auth"], serde_json::json!("oauth2"));

    let smtp = engine
        .manual_configuration("smtp", AuthType::Plain, "smtp.a.com")
        .unwrap();
    assert!(!smtp.contains_key("display_auth"));

    assert!(
        engine
            .manual_configuration("unknown", AuthType::Plain, "smtp.a.com")
            .is_err()
    );
}

#[test]
fn outcome_serializes_with_status_tag() {
    let registry = registry();
    let engine = RecommendationEngine::new(&registry);
    let outcome = engine
        .wizard_configuration(
            vec![starttls_probe("smtp.a.com", 587)],
            &RecommendationRequest::default(),
        )
        .unwrap();
    let payload = serde_json::to_value(&outcome).unwrap();
    assert_eq!(payload["status"], serde_json::json!("configured"));
    assert!(payload["override_menu"].is_array());
    assert_eq!(
        payload["configuration"]["hostname"],
        serde_json::json!("smtp.a.com")
    );
}
