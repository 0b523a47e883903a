// crates/consentpro-core/src/core/endpoints.rs
// ============================================================================
// Module: ConsentPro Endpoint Resolver
// Description: Backend path templates and URL construction with parameter substitution.
// Purpose: Build every backend URL from one base URL and a fixed template table.
// Dependencies: thiserror, url
// ============================================================================

//! ## Overview
//! Templates use `{name}` placeholders that occupy whole path segments.
//! [`Endpoints::url_for`] substitutes them through `url`'s segment encoder, so
//! a hostile token can never add segments or a query string.
//!
//! Security posture: parameter values are untrusted user or server input.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Templates
// ============================================================================

/// Public form fetch.
pub const FORM_BY_TOKEN: &str = "/api/formularios/publico/{token}";
/// Client lookup scoped to a form.
pub const CLIENT_LOOKUP: &str = "/api/formularios/publico/{token}/buscar-cliente/{cedula}";
/// Register or finalize consents.
pub const REGISTER: &str = "/api/formularios/publico/{token}/registrar";
/// Verify a code.
pub const VERIFY_CODE: &str = "/api/formularios/publico/verificar-codigo";
/// Request or resend a code.
pub const REQUEST_CODE: &str = "/api/formularios/publico/{token}/solicitar-codigo";
/// Create a biometric provider session.
pub const PROVIDER_CREATE_SESSION: &str = "/api/didit/create-session";
/// Biometric provider session status.
pub const PROVIDER_SESSION_STATUS: &str = "/api/didit/session-status/{id}";
/// Biometric provider configuration.
pub const PROVIDER_CONFIG: &str = "/api/didit/config";
/// Resend documents for a verified process.
pub const PROVIDER_RESEND_DOCUMENTS: &str = "/api/didit/resend-documents/{token}";
/// Mark a verified process complete.
pub const PROVIDER_COMPLETE_PROCESS: &str = "/api/didit/complete-process/{token}";
/// List clients with a pending verified process.
pub const PROVIDER_PENDING_CLIENTS: &str = "/api/didit/pending-clients";
/// Certificate download.
pub const CERTIFICATE_DOWNLOAD: &str = "/api/certificados/descargar/{token}";
/// Authorized terms download.
pub const TERMS_DOWNLOAD: &str = "/api/certificados/terminos-autorizados/{token}";

/// Backend deployment prefix that leaks into stored asset paths.
const DEPLOYMENT_PREFIX: &str = "/api-consentimientos";
/// Upload directory for company logos.
const LOGO_DIR: &str = "uploads/logos/";
/// Upload directory for consent PDFs.
const PDF_DIR: &str = "uploads/pdfs/";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Endpoint construction failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    /// Base URL cannot carry a path.
    #[error("base url cannot be a base: {0}")]
    InvalidBase(String),
    /// Base URL failed to parse.
    #[error("invalid base url: {0}")]
    Parse(String),
    /// A placeholder had no value or an empty value.
    #[error("missing path parameter: {0}")]
    MissingParam(String),
}

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Backend URL resolver.
///
/// # Invariants
/// - `base` is an absolute http(s) URL that can carry path segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// API base URL, possibly with a deployment path prefix.
    base: Url,
}

impl Endpoints {
    /// Creates a resolver from a base URL string.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError`] when the URL does not parse or cannot carry a path.
    pub fn parse(base: &str) -> Result<Self, EndpointError> {
        let url = Url::parse(base).map_err(|err| EndpointError::Parse(err.to_string()))?;
        Self::new(url)
    }

    /// Creates a resolver from a parsed base URL.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError::InvalidBase`] when the URL cannot carry a path.
    pub fn new(base: Url) -> Result<Self, EndpointError> {
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(EndpointError::InvalidBase(base.to_string()));
        }
        Ok(Self {
            base,
        })
    }

    /// Returns the base URL.
    #[must_use]
    pub const fn base(&self) -> &Url {
        &self.base
    }

    /// Resolves `template` against the base, substituting `{name}` segments.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError::MissingParam`] when a placeholder has no
    /// non-empty value in `params`.
    pub fn url_for(&self, template: &str, params: &[(&str, &str)]) -> Result<Url, EndpointError> {
        let mut segments = Vec::new();
        for segment in template.split('/').filter(|segment| !segment.is_empty()) {
            let value = match segment.strip_prefix('{').and_then(|rest| rest.strip_suffix('}')) {
                Some(name) => params
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| *value)
                    .filter(|value| !value.is_empty())
                    .ok_or_else(|| EndpointError::MissingParam(name.to_string()))?,
                None => segment,
            };
            segments.push(value);
        }
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|()| EndpointError::InvalidBase(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Returns the absolute URL of a company logo.
    #[must_use]
    pub fn logo_url(&self, path: &str) -> Option<String> {
        self.asset_url(path, LOGO_DIR, true)
    }

    /// Returns the absolute URL of a consent PDF.
    #[must_use]
    pub fn pdf_url(&self, path: &str) -> Option<String> {
        self.asset_url(path, PDF_DIR, false)
    }

    /// Resolves an upload path that may be absolute, rooted, or a bare file name.
    fn asset_url(&self, path: &str, dir: &str, rooted_is_absolute: bool) -> Option<String> {
        let path = path.trim();
        if path.is_empty() {
            return None;
        }
        let root = self.base.as_str().trim_end_matches('/');
        if path.starts_with("http://") || path.starts_with("https://") {
            return Some(path.replacen(DEPLOYMENT_PREFIX, "", 1));
        }
        if rooted_is_absolute && path.starts_with('/') {
            return Some(format!("{root}{}", path.replacen(DEPLOYMENT_PREFIX, "", 1)));
        }
        let uploads = if rooted_is_absolute { dir } else { "uploads/" };
        if path.contains(uploads) {
            let clean = path.replacen("/api-consentimientos/", "", 1);
            return Some(format!("{root}/{}", clean.trim_start_matches('/')));
        }
        Some(format!("{root}/{dir}{path}"))
    }
}
