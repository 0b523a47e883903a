// crates/consentpro-cli/src/i18n.rs
// ============================================================================
// Module: ConsentPro CLI Internationalization
// Description: Message catalog for CLI output and prompts.
// Purpose: Route every CLI string through one catalog sharing the core locale.
// Dependencies: consentpro-core
// ============================================================================

//! ## Overview
//! The CLI keeps its own `cli.*` catalog next to the flow catalog in
//! `consentpro-core`. Both read the same process-wide locale, so a single
//! `--lang` selection covers prompts, results, and flow notices.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

pub use consentpro_core::i18n::Locale;
pub use consentpro_core::i18n::MessageArg;
pub use consentpro_core::i18n::SUPPORTED_LOCALES;
pub use consentpro_core::i18n::current_locale;
pub use consentpro_core::i18n::set_locale;

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Spanish catalog.
const CATALOG_ES: &[(&str, &str)] = &[
    ("main.version", "consentpro {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.write_failed", "No se pudo escribir en {stream}: {error}"),
    ("output.json_failed", "No se pudo serializar la salida: {error}"),
    ("i18n.lang.invalid_env", "Valor inválido para {env}: {value}. Use es o en."),
    ("config.load_failed", "No se pudo cargar la configuración: {error}"),
    ("config.validate.ok", "Configuración válida."),
    ("config.audit_failed", "No se pudo abrir el registro de auditoría: {error}"),
    ("api.init_failed", "No se pudo crear el cliente HTTP: {error}"),
    ("api.call_failed", "La llamada al servidor falló: {error}"),
    ("input.national_id_invalid", "Cédula inválida: {value}"),
    ("input.url_invalid", "URL inválida: {error}"),
    ("form.header", "Formulario: {name}"),
    ("form.company", "Empresa: {company}"),
    ("form.verification", "Verificación: {kind}"),
    ("form.logo", "Logo: {url}"),
    ("form.consents_header", "Consentimientos:"),
    ("form.consent_line", "  [{id}] {label}"),
    ("form.consent_description", "      {description}"),
    ("form.consent_file", "      - {name}: {url}"),
    ("lookup.found", "Cliente encontrado: {name}"),
    ("lookup.not_found", "Cliente no encontrado"),
    ("lookup.field", "  {label}: {value}"),
    ("field.national_id", "Cédula"),
    ("field.given_name", "Nombre"),
    ("field.family_name", "Apellido"),
    ("field.email", "Email"),
    ("field.phone", "Teléfono"),
    ("pending.header", "Clientes pendientes: {count}"),
    ("pending.line", "  {name} ({national_id}) token={token}"),
    ("pending.stats", "Completados hoy: {today} · Verificados: {verified} · Tasa de éxito: {rate}"),
    ("notice.line", "[{level}] {message}"),
    ("host.navigate", "Abra este enlace para continuar la verificación: {url}"),
    ("host.unsaved", "Hay datos sin guardar; el formulario quedó incompleto."),
    ("wizard.prompt.national_id", "Cédula (10 dígitos): "),
    ("wizard.prompt.field", "{label} [{current}]: "),
    ("wizard.prompt.consents", "Números de consentimiento separados por coma: "),
    ("wizard.prompt.send_sms", "Presione Enter para enviar el código por SMS: "),
    ("wizard.prompt.code", "Código de 6 dígitos (r para reenviar): "),
    ("wizard.consent_invalid", "Número de consentimiento inválido: {value}"),
    ("wizard.step_failed", "No se pudo continuar: {error}"),
    ("wizard.waiting", "Esperando la verificación biométrica..."),
    ("wizard.abandoned", "Formulario abandonado."),
    ("wizard.incomplete", "La verificación terminó sin autorización."),
    ("wizard.input_failed", "No se pudo leer la entrada: {error}"),
    ("summary.finalized", "Consentimientos autorizados."),
    ("summary.biometric", "Identidad verificada biométricamente."),
    ("summary.certificate", "Certificado: {url}"),
    ("summary.terms", "Términos autorizados: {url}"),
    ("summary.document", "Documento: {name}"),
    ("resume.no_return", "La URL no contiene un retorno de verificación."),
    ("resume.not_finalized", "El proceso no se completó (paso {step})."),
    ("flow.open_failed", "No se pudo abrir el formulario: {error}"),
];

/// English catalog.
const CATALOG_EN: &[(&str, &str)] = &[
    ("main.version", "consentpro {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("output.json_failed", "Failed to serialize output: {error}"),
    ("i18n.lang.invalid_env", "Invalid value for {env}: {value}. Expected es or en."),
    ("config.load_failed", "Failed to load config: {error}"),
    ("config.validate.ok", "Config valid."),
    ("config.audit_failed", "Failed to open the audit log: {error}"),
    ("api.init_failed", "Failed to build the HTTP client: {error}"),
    ("api.call_failed", "Backend call failed: {error}"),
    ("input.national_id_invalid", "Invalid national ID: {value}"),
    ("input.url_invalid", "Invalid URL: {error}"),
    ("form.header", "Form: {name}"),
    ("form.company", "Company: {company}"),
    ("form.verification", "Verification: {kind}"),
    ("form.logo", "Logo: {url}"),
    ("form.consents_header", "Consents:"),
    ("form.consent_line", "  [{id}] {label}"),
    ("form.consent_description", "      {description}"),
    ("form.consent_file", "      - {name}: {url}"),
    ("lookup.found", "Client found: {name}"),
    ("lookup.not_found", "Client not found"),
    ("lookup.field", "  {label}: {value}"),
    ("field.national_id", "National ID"),
    ("field.given_name", "Given name"),
    ("field.family_name", "Family name"),
    ("field.email", "Email"),
    ("field.phone", "Phone"),
    ("pending.header", "Pending clients: {count}"),
    ("pending.line", "  {name} ({national_id}) token={token}"),
    ("pending.stats", "Completed today: {today} · Verified: {verified} · Success rate: {rate}"),
    ("notice.line", "[{level}] {message}"),
    ("host.navigate", "Open this link to continue verification: {url}"),
    ("host.unsaved", "There is unsaved data; the form was left incomplete."),
    ("wizard.prompt.national_id", "National ID (10 digits): "),
    ("wizard.prompt.field", "{label} [{current}]: "),
    ("wizard.prompt.consents", "Consent numbers separated by commas: "),
    ("wizard.prompt.send_sms", "Press Enter to send the SMS code: "),
    ("wizard.prompt.code", "6-digit code (r to resend): "),
    ("wizard.consent_invalid", "Invalid consent number: {value}"),
    ("wizard.step_failed", "Could not continue: {error}"),
    ("wizard.waiting", "Waiting for biometric verification..."),
    ("wizard.abandoned", "Form abandoned."),
    ("wizard.incomplete", "Verification ended without authorization."),
    ("wizard.input_failed", "Failed to read input: {error}"),
    ("summary.finalized", "Consents authorized."),
    ("summary.biometric", "Identity verified biometrically."),
    ("summary.certificate", "Certificate: {url}"),
    ("summary.terms", "Authorized terms: {url}"),
    ("summary.document", "Document: {name}"),
    ("resume.no_return", "The URL carries no verification return."),
    ("resume.not_finalized", "The process did not complete (step {step})."),
    ("flow.open_failed", "Failed to open the form: {error}"),
];

/// Returns the CLI catalog for the requested locale.
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

/// Formats a localized CLI message from a key and named arguments.
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
