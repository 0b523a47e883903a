// crates/consentpro-core/src/core/registration.rs
// ============================================================================
// Module: ConsentPro Registration Payloads
// Description: Register/finalize request body, its response, and code responses.
// Purpose: Type the wire contract of the public registration endpoints.
// Dependencies: serde, serde_json, crate::core::{identifiers, form}
// ============================================================================

//! ## Overview
//! The same registration endpoint both starts verification and finalizes the
//! consents. [`RegistrationResponse::route`] classifies a first-call response
//! into the branch the flow must follow; finalize responses only contribute
//! [`RegistrationResponse::documents`] and an optional refreshed token.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::form::VerificationType;
use crate::core::identifiers::ConsentId;
use crate::core::identifiers::NationalId;
use crate::core::identifiers::SessionId;
use crate::core::identifiers::VerificationToken;

// ============================================================================
// SECTION: Request
// ============================================================================

/// Registration and finalize request body.
///
/// # Invariants
/// - `consents` is non-empty when built by the flow.
/// - Absent contact fields are omitted rather than sent as empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationPayload {
    /// National ID.
    #[serde(rename = "cedula")]
    pub national_id: NationalId,
    /// Given name.
    #[serde(rename = "nombre")]
    pub given_name: String,
    /// Family name.
    #[serde(rename = "apellido")]
    pub family_name: String,
    /// Optional email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Optional phone.
    #[serde(rename = "telefono", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Selected consent identifiers.
    #[serde(rename = "consentimientos_seleccionados")]
    pub consents: Vec<ConsentId>,
}

/// Code verification request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyCodeRequest<'a> {
    /// Form token.
    pub token: &'a str,
    /// Six-digit code.
    #[serde(rename = "codigo")]
    pub code: &'a str,
}

// ============================================================================
// SECTION: Response
// ============================================================================

/// Channel dispatch confirmation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStatus {
    /// True when the channel accepted the code.
    #[serde(default)]
    pub success: bool,
}

/// Document issued after finalize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentDescriptor {
    /// Document kind tag.
    #[serde(rename = "tipo", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Document display name.
    #[serde(rename = "nombre", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Download URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Remaining backend fields.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Registration endpoint response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrationResponse {
    /// Verification kind echoed by the backend (`"biometria"` for the provider path).
    #[serde(rename = "tipo_verificacion", default)]
    pub verification_kind: Option<String>,
    /// Provider redirect URL.
    #[serde(default)]
    pub verification_url: Option<String>,
    /// Provider session identifier.
    #[serde(default)]
    pub session_id: Option<SessionId>,
    /// Verification token for this registration.
    #[serde(rename = "token_verificacion", default)]
    pub verification_token: Option<VerificationToken>,
    /// True when the SMS must be dispatched on explicit request.
    #[serde(rename = "requiere_envio_manual", default)]
    pub manual_dispatch: bool,
    /// Email channel status.
    #[serde(default)]
    pub email: Option<ChannelStatus>,
    /// WhatsApp channel status.
    #[serde(default)]
    pub whatsapp: Option<ChannelStatus>,
    /// Issued documents (finalize only).
    #[serde(rename = "documentos", default)]
    pub documents: Vec<DocumentDescriptor>,
}

/// Verification branch selected by a registration response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationRoute {
    /// Biometric provider path.
    Biometric {
        /// Redirect target and session, when both were supplied.
        redirect: Option<(String, SessionId)>,
    },
    /// SMS dispatched on explicit user request.
    ManualSms,
    /// Code already dispatched by email and/or WhatsApp.
    Dispatched {
        /// Email channel confirmed.
        email: bool,
        /// WhatsApp channel confirmed.
        whatsapp: bool,
    },
}

impl RegistrationResponse {
    /// Classifies the response for a form using `kind`.
    ///
    /// Biometric wins over manual SMS, which wins over the traditional path.
    #[must_use]
    pub fn route(&self, kind: VerificationType) -> RegistrationRoute {
        if self.verification_kind.as_deref() == Some("biometria") || kind.is_biometric() {
            let redirect = match (&self.verification_url, &self.session_id) {
                (Some(url), Some(session)) if !url.is_empty() && !session.as_str().is_empty() => {
                    Some((url.clone(), session.clone()))
                }
                _ => None,
            };
            return RegistrationRoute::Biometric { redirect };
        }
        if self.manual_dispatch || kind == VerificationType::SmsDidit {
            return RegistrationRoute::ManualSms;
        }
        RegistrationRoute::Dispatched {
            email: self.email.is_some_and(|status| status.success),
            whatsapp: self.whatsapp.is_some_and(|status| status.success),
        }
    }
}

/// Response of the code request and code verification endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeResponse {
    /// True when the backend accepted the request.
    #[serde(default)]
    pub success: bool,
    /// Optional server message.
    #[serde(default)]
    pub message: Option<String>,
}
