// crates/consentpro-core/tests/wire_formats.rs
// ============================================================================
// Module: Wire Format Tests
// Description: Backend payload decoding, routing, page locations, and URLs.
// ============================================================================
//! ## Overview
//! Decodes representative backend payloads and checks the lenient defaults,
//! registration routing, page location parsing, and endpoint resolution.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use consentpro_core::ClientLookup;
use consentpro_core::ConsentId;
use consentpro_core::EndpointError;
use consentpro_core::Endpoints;
use consentpro_core::FormEnvelope;
use consentpro_core::NationalId;
use consentpro_core::PageLocation;
use consentpro_core::PendingClientsResponse;
use consentpro_core::PollOutcome;
use consentpro_core::RegistrationPayload;
use consentpro_core::RegistrationResponse;
use consentpro_core::RegistrationRoute;
use consentpro_core::SessionId;
use consentpro_core::SessionStatus;
use consentpro_core::SessionStatusReport;
use consentpro_core::VerificationType;
use consentpro_core::consent_label;
use consentpro_core::endpoints::CLIENT_LOOKUP;
use consentpro_core::endpoints::PROVIDER_SESSION_STATUS;
use serde_json::json;

// ============================================================================
// SECTION: Forms
// ============================================================================

#[test]
fn wrapped_and_bare_forms_decode_alike() {
    let body = json!({
        "id": 3,
        "nombre": "Apertura",
        "tipo_validacion": "biometria_premium",
        "empresa": { "id": 1, "nombre": "Banco", "logo": "/uploads/logos/b.png" },
        "tipos_consentimientos": ["datos_personales", "otro"]
    });
    let bare: FormEnvelope = serde_json::from_value(body.clone()).unwrap();
    let wrapped: FormEnvelope = serde_json::from_value(json!({ "formulario": body })).unwrap();
    let bare = bare.into_form();
    assert_eq!(bare, wrapped.into_form());
    assert_eq!(bare.verification_type, VerificationType::BiometriaPremium);
    assert_eq!(bare.company.name, "Banco");
}

#[test]
fn unknown_verification_type_falls_back_to_sms_email() {
    let form: FormEnvelope =
        serde_json::from_value(json!({ "nombre": "X", "tipo_validacion": "telepatia" })).unwrap();
    assert_eq!(form.into_form().verification_type, VerificationType::SmsEmail);
    let form: FormEnvelope = serde_json::from_value(json!({ "nombre": "X", "tipo_validacion": null })).unwrap();
    assert_eq!(form.into_form().verification_type, VerificationType::SmsEmail);
}

#[test]
fn consent_items_derive_positional_ids_and_catalog_labels() {
    let form: FormEnvelope = serde_json::from_value(json!({
        "tipos_consentimientos": ["imagen", "custom"],
        "archivos_disponibles": { "imagen": [{ "id": 4, "nombre": "img.pdf", "ruta": "img.pdf", "tipo": "imagen" }] }
    }))
    .unwrap();
    let items = form.into_form().consent_items();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, ConsentId::new(1));
    assert_eq!(items[0].label, "Uso de Imagen");
    assert_eq!(items[0].files.len(), 1);
    assert_eq!(items[1].id, ConsentId::new(2));
    assert_eq!(items[1].label, "custom");
    assert!(items[1].description.is_empty());
    assert_eq!(consent_label("terceros").0, "Compartir con Terceros");
}

#[test]
fn preformatted_consents_win_over_types() {
    let form: FormEnvelope = serde_json::from_value(json!({
        "consentimientos": [{ "id": 42, "tipo": "Especial", "descripcion": "d" }],
        "tipos_consentimientos": ["imagen"]
    }))
    .unwrap();
    let form = form.into_form();
    let items = form.consent_items();
    assert_eq!(items.len(), 1);
    assert!(form.has_consent(ConsentId::new(42)));
    assert!(!form.has_consent(ConsentId::new(1)));
}

// ============================================================================
// SECTION: Lookup and Registration
// ============================================================================

#[test]
fn lookup_keeps_unknown_client_fields() {
    let lookup: ClientLookup = serde_json::from_value(json!({
        "cliente_encontrado": true,
        "cliente": { "id": 9, "cedula": "1234567890", "nombre": "Ana", "ciudad": "Quito" }
    }))
    .unwrap();
    let client = lookup.matched().unwrap();
    assert_eq!(client.given_name, "Ana");
    assert!(client.family_name.is_none());
    assert_eq!(client.extra.get("ciudad").unwrap(), "Quito");
}

#[test]
fn lookup_without_flag_is_not_a_match() {
    let lookup: ClientLookup = serde_json::from_value(json!({
        "cliente_encontrado": false,
        "cliente": { "nombre": "Ana" }
    }))
    .unwrap();
    assert!(lookup.matched().is_none());
}

#[test]
fn payload_uses_backend_field_names_and_skips_missing_channels() {
    let payload = RegistrationPayload {
        national_id: NationalId::parse("1234567890").unwrap(),
        given_name: "Ana".to_string(),
        family_name: "Pérez".to_string(),
        email: None,
        phone: Some("0991234567".to_string()),
        consents: vec![ConsentId::new(1), ConsentId::new(3)],
    };
    let value = serde_json::to_value(&payload).unwrap();
    assert_eq!(
        value,
        json!({
            "cedula": "1234567890",
            "nombre": "Ana",
            "apellido": "Pérez",
            "telefono": "0991234567",
            "consentimientos_seleccionados": [1, 3]
        })
    );
}

#[test]
fn malformed_national_id_is_rejected_on_decode() {
    let err = serde_json::from_value::<NationalId>(json!("12ab")).unwrap_err();
    assert!(!err.to_string().is_empty());
}

#[test]
fn registration_routes_follow_precedence() {
    let biometric: RegistrationResponse = serde_json::from_value(json!({
        "tipo_verificacion": "biometria",
        "verification_url": "https://v/1",
        "session_id": "s1",
        "requiere_envio_manual": true
    }))
    .unwrap();
    assert_eq!(
        biometric.route(VerificationType::SmsEmail),
        RegistrationRoute::Biometric { redirect: Some(("https://v/1".to_string(), SessionId::new("s1"))) }
    );

    let no_session: RegistrationResponse =
        serde_json::from_value(json!({ "verification_url": "https://v/1", "session_id": "" })).unwrap();
    assert_eq!(
        no_session.route(VerificationType::BiometriaFree),
        RegistrationRoute::Biometric { redirect: None }
    );

    let manual: RegistrationResponse = serde_json::from_value(json!({ "requiere_envio_manual": true })).unwrap();
    assert_eq!(manual.route(VerificationType::SmsEmail), RegistrationRoute::ManualSms);

    let traditional: RegistrationResponse =
        serde_json::from_value(json!({ "email": { "success": false }, "whatsapp": { "success": true } })).unwrap();
    assert_eq!(
        traditional.route(VerificationType::SmsEmail),
        RegistrationRoute::Dispatched { email: false, whatsapp: true }
    );
}

// ============================================================================
// SECTION: Provider
// ============================================================================

#[test]
fn session_status_is_lenient() {
    let report: SessionStatusReport = serde_json::from_value(json!({ "status": "in_review" })).unwrap();
    assert_eq!(report.status, SessionStatus::Pending);
    assert_eq!(report.outcome(), PollOutcome::Pending);

    let report: SessionStatusReport =
        serde_json::from_value(json!({ "status": "completed", "verified": true, "data": { "x": 1 } })).unwrap();
    assert_eq!(report.outcome(), PollOutcome::Verified);

    let report: SessionStatusReport = serde_json::from_value(json!({ "status": "failed" })).unwrap();
    assert_eq!(report.outcome(), PollOutcome::Failed);
}

#[test]
fn pending_clients_accepts_both_shapes() {
    let client = json!({ "id": 1, "nombre": "Ana", "apellido": "P", "cedula": "1234567890", "token_verificacion": "t1" });
    let top: PendingClientsResponse = serde_json::from_value(json!({
        "clientes": [client.clone()],
        "estadisticas": { "completados_hoy": 2, "total_verificados": 10, "tasa_exito": 0.8 }
    }))
    .unwrap();
    let top = top.normalize();
    assert_eq!(top.clients.len(), 1);
    assert_eq!(top.statistics.unwrap().total_verified, 10);

    let nested: PendingClientsResponse =
        serde_json::from_value(json!({ "success": true, "data": { "clientes": [client] } })).unwrap();
    let nested = nested.normalize();
    assert_eq!(nested.clients[0].verification_token.as_str(), "t1");
    assert!(nested.statistics.is_none());
}

// ============================================================================
// SECTION: Page Location
// ============================================================================

#[test]
fn form_token_comes_from_path_or_query() {
    let path = PageLocation::parse("https://app.test/formulario/abc123").unwrap();
    assert_eq!(path.form_token().unwrap().as_str(), "abc123");

    let both = PageLocation::parse("https://app.test/formulario/abc123?token=q1").unwrap();
    assert_eq!(both.form_token().unwrap().as_str(), "q1");

    let none = PageLocation::parse("https://app.test/otra/abc123").unwrap();
    assert!(none.form_token().is_none());
}

#[test]
fn biometric_return_requires_flag_and_token() {
    let ok = PageLocation::parse(
        "https://app.test/formulario/a?didit_return=true&verification_token=t1&status=approved&verified=true",
    )
    .unwrap();
    let callback = ok.biometric_return().unwrap();
    assert!(callback.is_success());
    assert_eq!(callback.verification_token.as_str(), "t1");

    let declined =
        PageLocation::parse("https://app.test/formulario/a?didit_return=true&verification_token=t1&status=declined")
            .unwrap();
    assert!(!declined.biometric_return().unwrap().is_success());

    let empty = PageLocation::parse("https://app.test/formulario/a?didit_return=true&verification_token=").unwrap();
    assert!(empty.biometric_return().is_none());
}

// ============================================================================
// SECTION: Endpoints
// ============================================================================

#[test]
fn endpoints_substitute_and_escape_segments() {
    let endpoints = Endpoints::parse("https://api.test/base/?debug=1").unwrap();
    let url = endpoints.url_for(CLIENT_LOOKUP, &[("token", "a b"), ("cedula", "1234567890")]).unwrap();
    assert_eq!(url.as_str(), "https://api.test/base/api/formularios/publico/a%20b/buscar-cliente/1234567890");

    let url = endpoints.url_for(PROVIDER_SESSION_STATUS, &[("id", "s/1")]).unwrap();
    assert_eq!(url.as_str(), "https://api.test/base/api/didit/session-status/s%2F1");
}

#[test]
fn endpoints_reject_missing_params_and_bad_bases() {
    let endpoints = Endpoints::parse("http://localhost:8000").unwrap();
    let err = endpoints.url_for(PROVIDER_SESSION_STATUS, &[]).unwrap_err();
    assert_eq!(err, EndpointError::MissingParam("id".to_string()));
    assert!(endpoints.url_for(PROVIDER_SESSION_STATUS, &[("id", "")]).is_err());

    assert!(Endpoints::parse("mailto:a@b.c").is_err());
    assert!(Endpoints::parse("ftp://host/").is_err());
}

#[test]
fn asset_urls_strip_deployment_prefix() {
    let endpoints = Endpoints::parse("https://api.test").unwrap();
    assert_eq!(endpoints.logo_url("logo.png").unwrap(), "https://api.test/uploads/logos/logo.png");
    assert_eq!(
        endpoints.logo_url("/api-consentimientos/uploads/logos/l.png").unwrap(),
        "https://api.test/uploads/logos/l.png"
    );
    assert_eq!(endpoints.pdf_url("terms.pdf").unwrap(), "https://api.test/uploads/pdfs/terms.pdf");
    assert!(endpoints.logo_url("  ").is_none());
}
