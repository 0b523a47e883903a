// crates/consentpro-core/tests/flow_lookup.rs
// ============================================================================
// Module: Flow Load and Lookup Tests
// Description: Form loading, national ID search, personal data, and reset.
// ============================================================================
//! ## Overview
//! Drives the flow through loading and identification against scripted
//! backends and checks the published snapshots and notices.

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

mod common;

use common::Harness;
use common::NATIONAL_ID;
use common::client;
use common::form;
use common::found;
use common::not_found;
use consentpro_core::ApiError;
use consentpro_core::ClientLookup;
use consentpro_core::ConsentId;
use consentpro_core::FlowError;
use consentpro_core::FlowStep;
use consentpro_core::NoticeLevel;
use consentpro_core::PageLocation;
use consentpro_core::ValidationError;
use consentpro_core::VerificationType;

// ============================================================================
// SECTION: Load
// ============================================================================

#[tokio::test]
async fn open_loads_form_and_session_type() {
    let harness = Harness::new(form(VerificationType::SmsDidit), not_found());
    harness.open().await;

    let snapshot = harness.flow.snapshot();
    assert!(snapshot.is_ready());
    assert_eq!(snapshot.session.step, FlowStep::Initial);
    assert_eq!(snapshot.session.verification_type, VerificationType::SmsDidit);
    assert_eq!(harness.flow.consent_items().len(), 2);
    assert_eq!(harness.flow.consent_items()[0].label, "Tratamiento de Datos Personales");
}

#[tokio::test]
async fn open_reads_token_from_query_parameter() {
    let harness = Harness::new(form(VerificationType::SmsEmail), not_found());
    let location = PageLocation::parse("https://app.test/?token=abc123").unwrap();
    harness.flow.open(&location).await.unwrap();
    assert_eq!(harness.flow.snapshot().form_token.unwrap().as_str(), "abc123");
}

#[tokio::test]
async fn open_without_token_records_load_error() {
    let harness = Harness::new(form(VerificationType::SmsEmail), not_found());
    let location = PageLocation::parse("https://app.test/").unwrap();
    let err = harness.flow.open(&location).await.unwrap_err();

    assert!(matches!(err, FlowError::MissingToken));
    assert_eq!(harness.forms.count("fetch_form"), 0);
    assert!(harness.flow.snapshot().load_error.is_some());
}

#[tokio::test]
async fn open_maps_not_found_to_inactive_form_message() {
    let harness = Harness::new(form(VerificationType::SmsEmail), not_found());
    *harness.forms.form.lock().unwrap() = Err(ApiError::Status {
        status: 404,
        message: None,
        error: Some("ignored".to_string()),
    });
    let err = harness.flow.open(&PageLocation::from_token("abc123")).await.unwrap_err();

    assert!(matches!(err, FlowError::Api(_)));
    let snapshot = harness.flow.snapshot();
    assert_eq!(snapshot.load_error.as_deref(), Some("Formulario no encontrado o inactivo"));
    assert!(!snapshot.is_ready());
}

#[tokio::test]
async fn open_maps_network_failure_to_connection_message() {
    let harness = Harness::new(form(VerificationType::SmsEmail), not_found());
    *harness.forms.form.lock().unwrap() = Err(ApiError::Network("refused".to_string()));
    let _ = harness.flow.open(&PageLocation::from_token("abc123")).await;

    let message = harness.notices.last().unwrap().message;
    assert!(message.starts_with("Error de conexión"));
}

#[tokio::test]
async fn load_failure_blocks_later_operations() {
    let harness = Harness::new(form(VerificationType::SmsEmail), not_found());
    *harness.forms.form.lock().unwrap() = Err(ApiError::Network("refused".to_string()));
    let _ = harness.flow.open(&PageLocation::from_token("abc123")).await;

    let err = harness.flow.set_national_id(NATIONAL_ID).unwrap_err();
    assert!(matches!(err, FlowError::FormUnavailable));
    let err = harness.flow.search_national_id().await.unwrap_err();
    assert!(matches!(err, FlowError::FormUnavailable));
}

// ============================================================================
// SECTION: Lookup
// ============================================================================

#[tokio::test]
async fn found_client_prefills_personal_data() {
    let harness = Harness::new(form(VerificationType::SmsEmail), found());
    harness.open().await;
    harness.flow.set_national_id(NATIONAL_ID).unwrap();
    harness.flow.search_national_id().await.unwrap();

    let snapshot = harness.flow.snapshot();
    assert!(snapshot.session.client_found());
    assert_eq!(snapshot.inputs.personal.given_name, "Ana");
    assert_eq!(snapshot.inputs.personal.phone, "0991234567");
    assert_eq!(snapshot.session.step, FlowStep::PersonalDataComplete);
    let notice = harness.notices.last().unwrap();
    assert_eq!(notice.level, NoticeLevel::Success);
    assert_eq!(notice.message, "Cliente encontrado: Ana");
}

#[tokio::test]
async fn server_lookup_message_wins_over_default_text() {
    let lookup = ClientLookup {
        message: Some("Bienvenida de nuevo".to_string()),
        ..found()
    };
    let harness = Harness::new(form(VerificationType::SmsEmail), lookup);
    harness.open().await;
    harness.flow.set_national_id(NATIONAL_ID).unwrap();
    harness.flow.search_national_id().await.unwrap();
    assert_eq!(harness.notices.last().unwrap().message, "Bienvenida de nuevo");
}

#[tokio::test]
async fn missing_client_then_manual_entry_completes_personal_data() {
    let harness = Harness::new(form(VerificationType::SmsEmail), not_found());
    harness.open().await;
    harness.flow.set_national_id(NATIONAL_ID).unwrap();
    harness.flow.search_national_id().await.unwrap();
    assert_eq!(harness.flow.snapshot().session.step, FlowStep::ClientLookupDone);
    assert_eq!(harness.notices.last().unwrap().level, NoticeLevel::Info);

    harness.flow.set_given_name("Ana").unwrap();
    harness.flow.set_family_name("Pérez").unwrap();
    assert!(!harness.flow.validate_personal_data());
    assert_eq!(harness.flow.snapshot().session.step, FlowStep::ClientLookupDone);

    harness.flow.set_phone("0991234567").unwrap();
    assert!(harness.flow.validate_personal_data());
    assert!(harness.flow.snapshot().session.personal_data_complete());
}

#[tokio::test]
async fn biometric_form_requires_valid_email() {
    let harness = Harness::new(form(VerificationType::BiometriaFree), not_found());
    harness.open().await;
    harness.flow.set_national_id(NATIONAL_ID).unwrap();
    harness.flow.search_national_id().await.unwrap();
    harness.flow.set_given_name("Ana").unwrap();
    harness.flow.set_family_name("Pérez").unwrap();
    harness.flow.set_email("bad").unwrap();
    assert!(!harness.flow.validate_personal_data());

    harness.flow.set_email("ana@x.com").unwrap();
    assert!(harness.flow.validate_personal_data());
}

#[tokio::test]
async fn short_national_id_is_rejected_without_request() {
    let harness = Harness::new(form(VerificationType::SmsEmail), found());
    harness.open().await;
    harness.flow.set_national_id("12345").unwrap();
    let err = harness.flow.search_national_id().await.unwrap_err();

    assert!(matches!(err, FlowError::Validation(ValidationError::NationalId)));
    assert_eq!(harness.forms.count("find_client"), 0);
    assert_eq!(harness.notices.last().unwrap().message, "Cédula debe tener 10 dígitos");
}

#[tokio::test]
async fn national_id_input_drops_separators() {
    let harness = Harness::new(form(VerificationType::SmsEmail), found());
    harness.open().await;
    harness.flow.set_national_id("12-345 678 90").unwrap();
    assert_eq!(harness.flow.snapshot().inputs.national_id, NATIONAL_ID);
}

#[tokio::test]
async fn overlong_national_id_is_rejected_without_request() {
    let harness = Harness::new(form(VerificationType::SmsEmail), found());
    harness.open().await;
    harness.flow.set_national_id("123456789012").unwrap();
    assert_eq!(harness.flow.snapshot().inputs.national_id, "123456789012");
    let err = harness.flow.search_national_id().await.unwrap_err();

    assert!(matches!(err, FlowError::Validation(ValidationError::NationalId)));
    assert_eq!(harness.forms.count("find_client"), 0);
}

#[tokio::test]
async fn lookup_failure_keeps_state() {
    let harness = Harness::new(form(VerificationType::SmsEmail), found());
    harness.open().await;
    *harness.forms.lookup.lock().unwrap() = Err(ApiError::Network("timeout".to_string()));
    harness.flow.set_national_id(NATIONAL_ID).unwrap();
    let err = harness.flow.search_national_id().await.unwrap_err();

    assert!(matches!(err, FlowError::Api(_)));
    assert_eq!(harness.flow.snapshot().session.step, FlowStep::Initial);
    assert_eq!(harness.notices.last().unwrap().message, "Error al buscar cliente");
}

#[tokio::test]
async fn search_resets_previous_progress() {
    let harness = Harness::new(form(VerificationType::SmsEmail), found());
    harness.ready_to_register().await;
    assert!(harness.flow.snapshot().session.consents_selected());

    harness.flow.search_national_id().await.unwrap();
    let snapshot = harness.flow.snapshot();
    assert_eq!(snapshot.session.step, FlowStep::PersonalDataComplete);
    assert!(snapshot.inputs.selected_consents.is_empty());
}

// ============================================================================
// SECTION: Personal Data and Consents
// ============================================================================

#[tokio::test]
async fn clearing_a_field_reverts_to_lookup_done() {
    let harness = Harness::new(form(VerificationType::SmsEmail), found());
    harness.ready_to_register().await;
    harness.flow.set_family_name("  ").unwrap();
    assert_eq!(harness.flow.snapshot().session.step, FlowStep::ClientLookupDone);
}

#[tokio::test]
async fn consents_require_a_selection() {
    let harness = Harness::new(form(VerificationType::SmsEmail), found());
    harness.open().await;
    harness.flow.set_national_id(NATIONAL_ID).unwrap();
    harness.flow.search_national_id().await.unwrap();
    let err = harness.flow.confirm_consents().unwrap_err();
    assert!(matches!(err, FlowError::Validation(ValidationError::NoConsentSelected)));

    let err = harness.flow.toggle_consent(ConsentId::new(9)).unwrap_err();
    assert!(matches!(err, FlowError::Validation(ValidationError::UnknownConsent)));
}

#[tokio::test]
async fn deselecting_the_last_consent_leaves_consent_step() {
    let harness = Harness::new(form(VerificationType::SmsEmail), found());
    harness.ready_to_register().await;
    harness.flow.toggle_consent(ConsentId::new(1)).unwrap();
    let snapshot = harness.flow.snapshot();
    assert!(snapshot.inputs.selected_consents.is_empty());
    assert_eq!(snapshot.session.step, FlowStep::PersonalDataComplete);
}

#[tokio::test]
async fn consents_are_refused_before_personal_data() {
    let harness = Harness::new(form(VerificationType::SmsEmail), not_found());
    harness.open().await;
    let err = harness.flow.toggle_consent(ConsentId::new(1)).unwrap_err();
    assert!(matches!(err, FlowError::WrongStep(FlowStep::Initial)));
}

// ============================================================================
// SECTION: Reset
// ============================================================================

#[tokio::test]
async fn reset_keeps_national_id_and_type() {
    let harness = Harness::new(form(VerificationType::SmsDidit), found());
    harness.ready_to_register().await;
    harness.flow.reset().unwrap();

    let snapshot = harness.flow.snapshot();
    assert_eq!(snapshot.session.step, FlowStep::Initial);
    assert_eq!(snapshot.session.verification_type, VerificationType::SmsDidit);
    assert_eq!(snapshot.inputs.national_id, NATIONAL_ID);
    assert!(snapshot.session.client.is_none());
    assert!(snapshot.inputs.selected_consents.is_empty());
    assert!(snapshot.inputs.personal.given_name.is_empty());
}

#[tokio::test]
async fn search_another_clears_national_id() {
    let harness = Harness::new(form(VerificationType::SmsEmail), found());
    harness.ready_to_register().await;
    harness.flow.search_another().unwrap();
    assert!(harness.flow.snapshot().inputs.national_id.is_empty());
}

// ============================================================================
// SECTION: Snapshots and Guard
// ============================================================================

#[tokio::test]
async fn every_commit_publishes_a_higher_revision() {
    let harness = Harness::new(form(VerificationType::SmsEmail), found());
    let mut updates = harness.flow.subscribe();
    harness.open().await;
    let first = harness.flow.snapshot().revision;
    assert!(updates.has_changed().unwrap());
    updates.mark_unchanged();

    harness.flow.set_national_id(NATIONAL_ID).unwrap();
    assert!(updates.has_changed().unwrap());
    assert!(harness.flow.snapshot().revision > first);
}

#[tokio::test]
async fn reload_guard_tracks_unsaved_input() {
    let harness = Harness::new(form(VerificationType::SmsEmail), not_found());
    harness.open().await;
    assert_eq!(harness.host.hook_count(), 0);

    harness.flow.set_national_id("1").unwrap();
    assert!(harness.flow.snapshot().reload_guard);
    assert!(harness.host.would_confirm_unload());

    harness.flow.set_national_id("").unwrap();
    assert!(!harness.flow.snapshot().reload_guard);
    assert_eq!(harness.host.hook_count(), 0);
}

#[tokio::test]
async fn teardown_releases_guard_and_closes_flow() {
    let harness = Harness::new(form(VerificationType::SmsEmail), found());
    harness.open().await;
    harness.flow.set_national_id(NATIONAL_ID).unwrap();
    assert_eq!(harness.host.hook_count(), 1);

    harness.flow.teardown();
    assert_eq!(harness.host.hook_count(), 0);
    let err = harness.flow.search_national_id().await.unwrap_err();
    assert!(matches!(err, FlowError::Closed));
}

#[tokio::test]
async fn audit_masks_national_id() {
    let harness = Harness::new(form(VerificationType::SmsEmail), found());
    harness.open().await;
    harness.flow.set_national_id(NATIONAL_ID).unwrap();
    harness.flow.search_national_id().await.unwrap();

    let events = harness.audit.events.lock().unwrap();
    let lookup = events.iter().rev().find(|event| event.national_id.is_some()).unwrap();
    let masked = lookup.national_id.as_deref().unwrap();
    assert!(masked.ends_with("7890"));
    assert!(!masked.contains("123456"));
    assert_eq!(client().national_id, NATIONAL_ID);
}
