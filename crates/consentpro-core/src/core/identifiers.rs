// crates/consentpro-core/src/core/identifiers.rs
// ============================================================================
// Module: ConsentPro Identifiers
// Description: Typed identifiers for forms, people, sessions, and consents.
// Purpose: Keep opaque backend handles and validated user keys apart at compile time.
// Dependencies: serde, crate::core::validation
// ============================================================================

//! ## Overview
//! Opaque backend handles ([`FormToken`], [`SessionId`], [`VerificationToken`])
//! are carried verbatim. User-entered keys ([`NationalId`], [`VerificationCode`])
//! are validated on construction so a value of that type is always well formed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::validation::ValidationError;
use crate::core::validation::validate_code;
use crate::core::validation::validate_national_id;

// ============================================================================
// SECTION: Opaque Identifiers
// ============================================================================

/// Public form token taken from the shared link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormToken(String);

impl FormToken {
    /// Creates a new form token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FormToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for FormToken {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Biometric provider session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a new session identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Verification token issued by the backend for one registration.
///
/// # Invariants
/// - Opaque; used as a path segment for certificate and provider endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerificationToken(String);

impl VerificationToken {
    /// Creates a new verification token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VerificationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for VerificationToken {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Consent item identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsentId(u32);

impl ConsentId {
    /// Creates a new consent identifier.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw numeric value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ConsentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Validated Identifiers
// ============================================================================

/// Ten-digit national ID (cedula).
///
/// # Invariants
/// - Always exactly ten ASCII digits.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NationalId(String);

impl NationalId {
    /// Parses a national ID.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NationalId`] when the value is not ten digits.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        validate_national_id(value)?;
        Ok(Self(value.to_string()))
    }

    /// Returns the national ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the ID with all but the last four digits masked.
    #[must_use]
    pub fn masked(&self) -> String {
        let visible = self.0.len().saturating_sub(4);
        let mut out = "*".repeat(visible);
        out.push_str(&self.0[visible ..]);
        out
    }
}

impl fmt::Debug for NationalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NationalId").field(&self.masked()).finish()
    }
}

impl fmt::Display for NationalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for NationalId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate_national_id(&value)?;
        Ok(Self(value))
    }
}

impl From<NationalId> for String {
    fn from(value: NationalId) -> Self {
        value.0
    }
}

/// Six-digit verification code entered by the user.
///
/// # Invariants
/// - Always exactly six ASCII digits.
#[derive(Clone, PartialEq, Eq)]
pub struct VerificationCode(String);

impl VerificationCode {
    /// Parses a verification code.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::VerificationCode`] when the value is not six digits.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        validate_code(value)?;
        Ok(Self(value.to_string()))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for VerificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VerificationCode(<redacted>)")
    }
}
