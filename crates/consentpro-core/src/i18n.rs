// crates/consentpro-core/src/i18n.rs
// ============================================================================
// Module: ConsentPro Internationalization
// Description: Message catalog and translation utilities for user-facing notices.
// Purpose: Keep every notice text in one catalog with a Spanish default.
// Dependencies: Standard library collections.
// ============================================================================

//! ## Overview
//! Notices raised by the flow are looked up by key in a static catalog. The
//! public form is Spanish-first; English is available for operators. Keys
//! missing from the selected locale fall back to Spanish and then to the key.
//! Runtime text should be routed through the [`t!`](crate::t) macro.
//!
//! ## Invariants
//! - The catalog is initialized once and read-only thereafter.
//! - Placeholder substitutions preserve argument order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Supported locales.
///
/// # Invariants
/// - [`Locale::Es`] is the default fallback locale.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Locale {
    /// Spanish (default).
    #[default]
    Es,
    /// English.
    En,
}

impl Locale {
    /// Returns the canonical locale label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Es => "es",
            Self::En => "en",
        }
    }

    /// Parses a locale value, tolerating case and region tags (`es-EC`).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        let lang = normalized.split(['-', '_']).next().unwrap_or("");
        match lang {
            "es" => Some(Self::Es),
            "en" => Some(Self::En),
            _ => None,
        }
    }
}

/// Ordered list of supported locales.
pub const SUPPORTED_LOCALES: &[Locale] = &[Locale::Es, Locale::En];

/// A formatted message argument captured by the [`macro@crate::t`] macro.
#[derive(Debug, Clone)]
pub struct MessageArg {
    /// Placeholder name without braces.
    pub key: &'static str,
    /// Preformatted value.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`].
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Locale Selection
// ============================================================================

/// Process-wide locale selection.
static CURRENT_LOCALE: OnceLock<Locale> = OnceLock::new();

/// Sets the locale. Only the first call wins.
pub fn set_locale(locale: Locale) {
    let _ = CURRENT_LOCALE.set(locale);
}

/// Returns the current locale (defaults to Spanish).
#[must_use]
pub fn current_locale() -> Locale {
    CURRENT_LOCALE.get().copied().unwrap_or_default()
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Spanish catalog.
const CATALOG_ES: &[(&str, &str)] = &[
    ("flow.load.missing_token", "Token de formulario no proporcionado"),
    ("flow.load.not_found", "Formulario no encontrado o inactivo"),
    ("flow.load.network", "Error de conexión. Verifica que el backend esté corriendo"),
    ("flow.load.generic", "Error al cargar el formulario"),
    ("flow.lookup.found", "Cliente encontrado: {name}"),
    ("flow.lookup.not_found", "Cliente no encontrado. Ingresa tus datos."),
    ("flow.lookup.failed", "Error al buscar cliente"),
    ("flow.validation.national_id", "Cédula debe tener 10 dígitos"),
    ("flow.validation.code", "Código debe tener 6 dígitos"),
    ("flow.validation.email", "Email inválido"),
    ("flow.validation.phone", "Teléfono inválido"),
    ("flow.validation.incomplete", "Completa todos los campos requeridos"),
    ("flow.validation.no_consent", "Debes seleccionar al menos un consentimiento"),
    ("flow.validation.unknown_consent", "Consentimiento no disponible en este formulario"),
    (
        "flow.register.biometric_sent",
        "Email enviado con enlace de verificación biométrica. Revisa tu correo.",
    ),
    (
        "flow.register.biometric_unavailable",
        "Error: No se pudo iniciar verificación biométrica",
    ),
    ("flow.register.manual_sms", "Haz clic en \"Enviar código SMS\""),
    ("flow.register.code_sent", "Código enviado"),
    ("flow.register.channel_email", " por Email"),
    ("flow.register.channel_whatsapp", " y WhatsApp"),
    ("flow.register.failed", "Error al registrar"),
    ("flow.sms.exhausted", "Has alcanzado el máximo de intentos"),
    ("flow.sms.resent", "Código reenviado exitosamente"),
    ("flow.sms.failed", "Error al reenviar código"),
    ("flow.verify.invalid", "Código inválido"),
    ("flow.finalize.success", "Consentimientos autorizados exitosamente"),
    ("flow.finalize.failed", "Error al completar"),
    ("flow.biometric.return_success", "Verificación biométrica completada exitosamente"),
    (
        "flow.biometric.return_failed",
        "Verificación biométrica fallida. Por favor, intenta nuevamente.",
    ),
    ("flow.poll.failed", "Verificación fallida"),
    ("flow.poll.timeout", "Tiempo de espera agotado"),
];

/// English catalog.
const CATALOG_EN: &[(&str, &str)] = &[
    ("flow.load.missing_token", "Form token not provided"),
    ("flow.load.not_found", "Form not found or inactive"),
    ("flow.load.network", "Connection error. Check that the backend is running"),
    ("flow.load.generic", "Error loading the form"),
    ("flow.lookup.found", "Client found: {name}"),
    ("flow.lookup.not_found", "Client not found. Enter your details."),
    ("flow.lookup.failed", "Error looking up client"),
    ("flow.validation.national_id", "National ID must have 10 digits"),
    ("flow.validation.code", "Code must have 6 digits"),
    ("flow.validation.email", "Invalid email"),
    ("flow.validation.phone", "Invalid phone"),
    ("flow.validation.incomplete", "Fill in all required fields"),
    ("flow.validation.no_consent", "Select at least one consent"),
    ("flow.validation.unknown_consent", "Consent not available in this form"),
    ("flow.register.biometric_sent", "Email sent with the biometric verification link. Check your inbox."),
    ("flow.register.biometric_unavailable", "Error: biometric verification could not be started"),
    ("flow.register.manual_sms", "Click \"Send SMS code\""),
    ("flow.register.code_sent", "Code sent"),
    ("flow.register.channel_email", " by Email"),
    ("flow.register.channel_whatsapp", " and WhatsApp"),
    ("flow.register.failed", "Registration failed"),
    ("flow.sms.exhausted", "You have reached the maximum number of attempts"),
    ("flow.sms.resent", "Code resent successfully"),
    ("flow.sms.failed", "Error resending code"),
    ("flow.verify.invalid", "Invalid code"),
    ("flow.finalize.success", "Consents authorized successfully"),
    ("flow.finalize.failed", "Error completing the process"),
    ("flow.biometric.return_success", "Biometric verification completed successfully"),
    ("flow.biometric.return_failed", "Biometric verification failed. Please try again."),
    ("flow.poll.failed", "Verification failed"),
    ("flow.poll.timeout", "Timed out waiting for verification"),
];

/// Returns the message catalog for the requested locale.
pub(crate) fn catalog_for(locale: Locale) -> &'static HashMap<&'static str, &'static str> {
    static CATALOG_ES_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    static CATALOG_EN_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    match locale {
        Locale::Es => CATALOG_ES_MAP.get_or_init(|| CATALOG_ES.iter().copied().collect()),
        Locale::En => CATALOG_EN_MAP.get_or_init(|| CATALOG_EN.iter().copied().collect()),
    }
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Translates `key` in `locale`, substituting `args`.
#[must_use]
pub fn translate_in(locale: Locale, key: &str, args: Vec<MessageArg>) -> String {
    let template = catalog_for(locale)
        .get(key)
        .copied()
        .or_else(|| catalog_for(Locale::Es).get(key).copied())
        .unwrap_or(key);
    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

/// Translates `key` using the selected locale while substituting `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    translate_in(current_locale(), key, args)
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a localized message from a key and named arguments.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::i18n::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::i18n::translate($key, args)
    }};
}

// ============================================================================
// SECTION: Tests
// ============================================================================
