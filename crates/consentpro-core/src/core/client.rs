// crates/consentpro-core/src/core/client.rs
// ============================================================================
// Module: ConsentPro Client Records
// Description: Existing-client data returned by the national ID lookup.
// Purpose: Prefill personal data for returning people.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The lookup endpoint answers `{cliente_encontrado, cliente, mensaje}`. Only the
//! fields used for prefill are typed; everything else is kept verbatim in
//! [`ClientRecord::extra`] so the raw record survives a round trip.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Client record known to the backend.
///
/// # Invariants
/// - Values are untrusted server data and are only used to prefill inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    /// Client identifier.
    #[serde(default)]
    pub id: u64,
    /// National ID as stored by the backend.
    #[serde(rename = "cedula", default)]
    pub national_id: String,
    /// Given name.
    #[serde(rename = "nombre", default)]
    pub given_name: String,
    /// Family name.
    #[serde(rename = "apellido", default)]
    pub family_name: Option<String>,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Phone number.
    #[serde(rename = "telefono", default)]
    pub phone: Option<String>,
    /// Remaining backend fields.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Result of a national ID lookup scoped to a form token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientLookup {
    /// True when the backend matched an existing client.
    #[serde(rename = "cliente_encontrado", default)]
    pub found: bool,
    /// Matched client record.
    #[serde(rename = "cliente", default)]
    pub client: Option<ClientRecord>,
    /// Optional server message to show the user.
    #[serde(rename = "mensaje", default)]
    pub message: Option<String>,
}

impl ClientLookup {
    /// Returns the matched client when the backend reports a match.
    #[must_use]
    pub const fn matched(&self) -> Option<&ClientRecord> {
        if self.found { self.client.as_ref() } else { None }
    }
}
