// crates/consentpro-cli/src/render.rs
// ============================================================================
// Module: Text Rendering
// Description: Localized text views of forms, lookups, and flow results.
// Purpose: Keep console layout out of the command dispatcher.
// Dependencies: consentpro-core
// ============================================================================

//! ## Overview
//! Every renderer returns lines instead of writing them, so callers decide
//! the stream and tests compare plain strings.

// ============================================================================
// SECTION: Imports
// ============================================================================

use consentpro_core::ClientLookup;
use consentpro_core::ConsentItem;
use consentpro_core::Endpoints;
use consentpro_core::FormDefinition;
use consentpro_core::PendingClients;
use consentpro_core::PublicFormFlow;

use crate::t;

// ============================================================================
// SECTION: Forms
// ============================================================================

/// Renders a form header followed by its consent items.
#[must_use]
pub fn form_lines(form: &FormDefinition, endpoints: &Endpoints) -> Vec<String> {
    let mut lines = vec![
        t!("form.header", name = form.name),
        t!("form.company", company = form.company.name),
        t!("form.verification", kind = form.verification_type),
    ];
    if let Some(logo) = form.company.logo.as_deref().and_then(|path| endpoints.logo_url(path)) {
        lines.push(t!("form.logo", url = logo));
    }
    lines.extend(consent_lines(&form.consent_items(), endpoints));
    lines
}

/// Renders numbered consent items with their descriptions and documents.
#[must_use]
pub fn consent_lines(items: &[ConsentItem], endpoints: &Endpoints) -> Vec<String> {
    let mut lines = vec![t!("form.consents_header")];
    for item in items {
        lines.push(t!("form.consent_line", id = item.id, label = item.label));
        if !item.description.is_empty() {
            lines.push(t!("form.consent_description", description = item.description));
        }
        for file in &item.files {
            let url = endpoints.pdf_url(&file.path).unwrap_or_default();
            lines.push(t!("form.consent_file", name = file.name, url = url));
        }
    }
    lines
}

// ============================================================================
// SECTION: Lookups
// ============================================================================

/// Renders a client lookup result.
#[must_use]
pub fn lookup_lines(lookup: &ClientLookup) -> Vec<String> {
    let Some(client) = lookup.matched() else {
        return vec![t!("lookup.not_found")];
    };
    let family = client.family_name.clone().unwrap_or_default();
    let full_name = format!("{} {family}", client.given_name).trim_end().to_string();
    let mut lines = vec![t!("lookup.found", name = full_name)];
    let fields = [
        (t!("field.national_id"), client.national_id.clone()),
        (t!("field.email"), client.email.clone().unwrap_or_default()),
        (t!("field.phone"), client.phone.clone().unwrap_or_default()),
    ];
    for (label, value) in fields {
        if !value.is_empty() {
            lines.push(t!("lookup.field", label = label, value = value));
        }
    }
    lines
}

/// Renders the provider's pending-clients listing.
#[must_use]
pub fn pending_lines(pending: &PendingClients) -> Vec<String> {
    let mut lines = vec![t!("pending.header", count = pending.clients.len())];
    for client in &pending.clients {
        let name = format!("{} {}", client.given_name, client.family_name).trim().to_string();
        lines.push(t!(
            "pending.line",
            name = name,
            national_id = client.national_id,
            token = client.verification_token.as_str()
        ));
    }
    if let Some(stats) = pending.statistics {
        lines.push(t!(
            "pending.stats",
            today = stats.completed_today,
            verified = stats.total_verified,
            rate = stats.success_rate
        ));
    }
    lines
}

// ============================================================================
// SECTION: Flow Results
// ============================================================================

/// Renders the closing summary of a finalized flow.
#[must_use]
pub fn summary_lines(flow: &PublicFormFlow) -> Vec<String> {
    let snapshot = flow.snapshot();
    let mut lines = vec![t!("summary.finalized")];
    if snapshot.session.biometric_verified {
        lines.push(t!("summary.biometric"));
    }
    if let Some(url) = flow.certificate_url() {
        lines.push(t!("summary.certificate", url = url));
    }
    if let Some(url) = flow.terms_url() {
        lines.push(t!("summary.terms", url = url));
    }
    for document in &snapshot.session.documents {
        if let Some(name) = document.name.as_deref().or(document.kind.as_deref()) {
            lines.push(t!("summary.document", name = name));
        }
    }
    lines
}
