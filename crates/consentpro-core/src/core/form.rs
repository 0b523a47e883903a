// crates/consentpro-core/src/core/form.rs
// ============================================================================
// Module: ConsentPro Form Definitions
// Description: Public form metadata, verification types, and consent items.
// Purpose: Model the immutable form fetched once per page load.
// Dependencies: serde, crate::core::identifiers
// ============================================================================

//! ## Overview
//! A [`FormDefinition`] carries the owning company, the verification type, and
//! the consent items a person may authorize. Items arrive either pre-formatted
//! or as a list of type tags plus a per-type file map; [`FormDefinition::consent_items`]
//! merges the second shape through a fixed label catalog.
//!
//! # Invariants
//! - Derived consent ids are positional (index + 1) over `consent_types`, so the
//!   source order is never re-sorted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;

use crate::core::identifiers::ConsentId;

// ============================================================================
// SECTION: Verification Type
// ============================================================================

/// Identity verification mechanism configured on a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationType {
    /// Traditional code delivered by email and/or WhatsApp.
    #[default]
    SmsEmail,
    /// Free-tier biometric verification through the external provider.
    BiometriaFree,
    /// Premium biometric verification through the external provider.
    BiometriaPremium,
    /// Paid SMS verification dispatched on explicit request.
    SmsDidit,
}

impl VerificationType {
    /// All verification types in declaration order.
    pub const ALL: [Self; 4] =
        [Self::SmsEmail, Self::BiometriaFree, Self::BiometriaPremium, Self::SmsDidit];

    /// Returns the wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SmsEmail => "sms_email",
            Self::BiometriaFree => "biometria_free",
            Self::BiometriaPremium => "biometria_premium",
            Self::SmsDidit => "sms_didit",
        }
    }

    /// Parses a wire label.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }

    /// Returns true for either biometric tier.
    #[must_use]
    pub const fn is_biometric(self) -> bool {
        matches!(self, Self::BiometriaFree | Self::BiometriaPremium)
    }

    /// Returns true for the premium biometric tier.
    #[must_use]
    pub const fn is_premium(self) -> bool {
        matches!(self, Self::BiometriaPremium)
    }
}

impl fmt::Display for VerificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for VerificationType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(Self::parse).unwrap_or_default())
    }
}

// ============================================================================
// SECTION: Company and Files
// ============================================================================

/// Display information for the company that owns a form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyInfo {
    /// Company identifier.
    #[serde(default)]
    pub id: u64,
    /// Company display name.
    #[serde(rename = "nombre", default)]
    pub name: String,
    /// Relative logo path, when configured.
    #[serde(default)]
    pub logo: Option<String>,
    /// Company slogan, when configured.
    #[serde(default)]
    pub slogan: Option<String>,
}

/// Document attached to a consent type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentFile {
    /// File identifier.
    #[serde(default)]
    pub id: u64,
    /// File display name.
    #[serde(rename = "nombre", default)]
    pub name: String,
    /// Relative storage path.
    #[serde(rename = "ruta", default)]
    pub path: String,
    /// Consent type tag the file belongs to.
    #[serde(rename = "tipo", default)]
    pub kind: String,
}

/// One authorizable consent clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentItem {
    /// Consent identifier submitted on registration.
    pub id: ConsentId,
    /// Display label.
    #[serde(rename = "tipo")]
    pub label: String,
    /// Clause text.
    #[serde(rename = "descripcion", default)]
    pub description: String,
    /// Attached documents.
    #[serde(rename = "archivos", default)]
    pub files: Vec<ConsentFile>,
}

// ============================================================================
// SECTION: Consent Catalog
// ============================================================================

/// Label and clause text for known consent type tags.
const CONSENT_CATALOG: &[(&str, &str, &str)] = &[
    (
        "datos_personales",
        "Tratamiento de Datos Personales",
        "Autorizo el tratamiento de mis datos personales para los fines establecidos en la \
         política de privacidad.",
    ),
    (
        "imagen",
        "Uso de Imagen",
        "Autorizo el uso de mi imagen en materiales promocionales y de comunicación.",
    ),
    (
        "marketing",
        "Comunicaciones de Marketing",
        "Acepto recibir comunicaciones comerciales y promocionales.",
    ),
    ("terceros", "Compartir con Terceros", "Autorizo compartir mis datos con empresas asociadas."),
];

/// Returns the `(label, description)` pair for a consent type tag.
///
/// Unknown tags map to the tag itself with an empty description.
#[must_use]
pub fn consent_label(kind: &str) -> (&str, &'static str) {
    CONSENT_CATALOG
        .iter()
        .find(|(tag, _, _)| *tag == kind)
        .map_or((kind, ""), |(_, label, description)| (*label, *description))
}

// ============================================================================
// SECTION: Form Definition
// ============================================================================

/// Public form metadata fetched by token.
///
/// # Invariants
/// - Immutable once loaded; the flow shares it behind an `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormDefinition {
    /// Form identifier.
    #[serde(default)]
    pub id: u64,
    /// Form display name.
    #[serde(rename = "nombre", default)]
    pub name: String,
    /// Optional form description.
    #[serde(rename = "descripcion", default)]
    pub description: Option<String>,
    /// Owning company display info.
    #[serde(rename = "empresa", default)]
    pub company: CompanyInfo,
    /// Verification type; absent or unknown values fall back to `sms_email`.
    #[serde(rename = "tipo_validacion", default)]
    pub verification_type: VerificationType,
    /// Pre-formatted consent items.
    #[serde(rename = "consentimientos", default)]
    pub consents: Vec<ConsentItem>,
    /// Consent type tags used when no pre-formatted items are present.
    #[serde(rename = "tipos_consentimientos", default)]
    pub consent_types: Vec<String>,
    /// Files keyed by consent type tag.
    #[serde(rename = "archivos_disponibles", default)]
    pub files_by_type: BTreeMap<String, Vec<ConsentFile>>,
}

impl FormDefinition {
    /// Returns the consent items shown to the user.
    ///
    /// Pre-formatted items win; otherwise items are derived from
    /// `consent_types` with positional ids.
    #[must_use]
    pub fn consent_items(&self) -> Vec<ConsentItem> {
        if !self.consents.is_empty() {
            return self.consents.clone();
        }
        let mut items = Vec::with_capacity(self.consent_types.len());
        for (index, kind) in self.consent_types.iter().enumerate() {
            let Ok(position) = u32::try_from(index + 1) else {
                break;
            };
            let (label, description) = consent_label(kind);
            items.push(ConsentItem {
                id: ConsentId::new(position),
                label: label.to_string(),
                description: description.to_string(),
                files: self.files_by_type.get(kind).cloned().unwrap_or_default(),
            });
        }
        items
    }

    /// Returns true when `id` names one of the form's consent items.
    #[must_use]
    pub fn has_consent(&self, id: ConsentId) -> bool {
        self.consent_items().iter().any(|item| item.id == id)
    }
}

// ============================================================================
// SECTION: Response Envelope
// ============================================================================

/// Form fetch response: either wrapped in `formulario` or bare.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FormEnvelope {
    /// `{ "formulario": { ... } }`.
    Wrapped {
        /// Wrapped form definition.
        #[serde(rename = "formulario")]
        form: FormDefinition,
    },
    /// Bare form definition.
    Bare(FormDefinition),
}

impl FormEnvelope {
    /// Unwraps the form definition.
    #[must_use]
    pub fn into_form(self) -> FormDefinition {
        match self {
            Self::Wrapped { form } | Self::Bare(form) => form,
        }
    }
}
