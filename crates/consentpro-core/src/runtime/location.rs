// crates/consentpro-core/src/runtime/location.rs
// ============================================================================
// Module: ConsentPro Page Location
// Description: Form token and biometric return parameters read from the page URL.
// Purpose: Resolve how the public form was reached.
// Dependencies: url, crate::core::identifiers
// ============================================================================

//! ## Overview
//! The form is reachable as `/formulario?token=..` or `/formulario/{token}`;
//! the query parameter wins when both are present. After the biometric
//! provider finishes, it sends the person back with `didit_return`,
//! `verification_token`, `status`, and `verified` appended.

// ============================================================================
// SECTION: Imports
// ============================================================================

use url::Url;

use crate::core::FormToken;
use crate::core::VerificationToken;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Route segment that precedes a path token.
const FORM_ROUTE: &str = "formulario";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Page location the flow was opened with.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageLocation {
    /// Path segments of the page URL.
    segments: Vec<String>,
    /// Decoded query parameters in order.
    query: Vec<(String, String)>,
}

/// Biometric return parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiometricReturn {
    /// Verification token of the returning registration.
    pub verification_token: VerificationToken,
    /// Provider status label.
    pub status: Option<String>,
    /// Provider verified flag, as the literal string received.
    pub verified: Option<String>,
}

impl BiometricReturn {
    /// Returns true when the provider reported an approved, verified session.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status.as_deref(), Some("success" | "approved"))
            && self.verified.as_deref() == Some("true")
    }
}

impl PageLocation {
    /// Parses a page URL.
    ///
    /// # Errors
    ///
    /// Returns [`url::ParseError`] when the URL is malformed.
    pub fn parse(raw: &str) -> Result<Self, url::ParseError> {
        Ok(Self::from_url(&Url::parse(raw)?))
    }

    /// Builds a location from a parsed URL.
    #[must_use]
    pub fn from_url(url: &Url) -> Self {
        let segments = url
            .path_segments()
            .map(|segments| {
                segments.filter(|segment| !segment.is_empty()).map(str::to_string).collect()
            })
            .unwrap_or_default();
        let query = url.query_pairs().map(|(key, value)| (key.into_owned(), value.into_owned())).collect();
        Self {
            segments,
            query,
        }
    }

    /// Builds a location that carries only a form token.
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        Self {
            segments: vec![FORM_ROUTE.to_string(), token.to_string()],
            query: Vec::new(),
        }
    }

    /// Returns the first value of a query parameter.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    /// Returns the form token; the query parameter wins over the path segment.
    #[must_use]
    pub fn form_token(&self) -> Option<FormToken> {
        if let Some(token) = self.query_param("token").filter(|token| !token.is_empty()) {
            return Some(FormToken::new(token));
        }
        self.segments
            .iter()
            .position(|segment| segment == FORM_ROUTE)
            .and_then(|index| self.segments.get(index + 1))
            .filter(|token| !token.is_empty())
            .map(|token| FormToken::new(token.as_str()))
    }

    /// Returns biometric return parameters when this is a provider callback.
    #[must_use]
    pub fn biometric_return(&self) -> Option<BiometricReturn> {
        if self.query_param("didit_return") != Some("true") {
            return None;
        }
        let token = self.query_param("verification_token").filter(|token| !token.is_empty())?;
        Some(BiometricReturn {
            verification_token: VerificationToken::new(token),
            status: self.query_param("status").map(str::to_string),
            verified: self.query_param("verified").map(str::to_string),
        })
    }
}
