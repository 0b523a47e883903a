// crates/consentpro-core/src/core/validation.rs
// ============================================================================
// Module: ConsentPro Field Validation
// Description: Syntactic validators for national IDs, codes, emails, and phones.
// Purpose: Provide pure, allocation-light checks shared by the flow and the CLI.
// Dependencies: regex, thiserror
// ============================================================================

//! ## Overview
//! Field validators mirror the checks the public form applies before any
//! network call. They are pure and never touch session state.
//!
//! Security posture: inputs are untrusted user text; validators only classify
//! and never echo the value back in errors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Number of digits in a national ID (cedula).
pub const NATIONAL_ID_DIGITS: usize = 10;
/// Number of digits in a verification code.
pub const VERIFICATION_CODE_DIGITS: usize = 6;
/// Maximum accepted email length.
pub const MAX_EMAIL_LEN: usize = 100;
/// Minimum digits in a normalized phone number.
pub const MIN_PHONE_DIGITS: usize = 7;
/// Maximum digits in a normalized phone number.
pub const MAX_PHONE_DIGITS: usize = 15;

/// RFC-light email pattern: no whitespace, one `@`, and a dotted domain.
static EMAIL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Client-side validation failures.
///
/// # Invariants
/// - Variants never carry the rejected value.
/// - [`ValidationError::message_key`] is stable for the message catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// National ID is not exactly ten digits.
    #[error("national id must have exactly 10 digits")]
    NationalId,
    /// Verification code is not exactly six digits.
    #[error("verification code must have exactly 6 digits")]
    VerificationCode,
    /// Email address is malformed.
    #[error("email address is malformed")]
    Email,
    /// Phone number is malformed.
    #[error("phone number must have between 7 and 15 digits")]
    Phone,
    /// Required personal data is missing for the verification type.
    #[error("required personal data is incomplete")]
    IncompletePersonalData,
    /// No consent item has been selected.
    #[error("at least one consent must be selected")]
    NoConsentSelected,
    /// Consent identifier is not offered by the form.
    #[error("consent is not offered by this form")]
    UnknownConsent,
}

impl ValidationError {
    /// Returns the message catalog key for the user-facing text.
    #[must_use]
    pub const fn message_key(self) -> &'static str {
        match self {
            Self::NationalId => "flow.validation.national_id",
            Self::VerificationCode => "flow.validation.code",
            Self::Email => "flow.validation.email",
            Self::Phone => "flow.validation.phone",
            Self::IncompletePersonalData => "flow.validation.incomplete",
            Self::NoConsentSelected => "flow.validation.no_consent",
            Self::UnknownConsent => "flow.validation.unknown_consent",
        }
    }
}

// ============================================================================
// SECTION: Validators
// ============================================================================

/// Returns true when `value` consists of exactly `len` ASCII digits.
fn is_digits_of_len(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|byte| byte.is_ascii_digit())
}

/// Returns true when `value` is a syntactically valid national ID.
#[must_use]
pub fn is_valid_national_id(value: &str) -> bool {
    is_digits_of_len(value, NATIONAL_ID_DIGITS)
}

/// Returns true when `value` is a syntactically valid verification code.
#[must_use]
pub fn is_valid_code(value: &str) -> bool {
    is_digits_of_len(value, VERIFICATION_CODE_DIGITS)
}

/// Returns true when `value` matches the email pattern and length bound.
#[must_use]
pub fn is_valid_email(value: &str) -> bool {
    value.len() <= MAX_EMAIL_LEN
        && EMAIL_PATTERN.as_ref().is_some_and(|pattern| pattern.is_match(value))
}

/// Strips every non-digit character from a phone number.
#[must_use]
pub fn normalize_phone(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Returns true when the normalized phone has 7 to 15 digits.
#[must_use]
pub fn is_valid_phone(value: &str) -> bool {
    let digits = normalize_phone(value).len();
    (MIN_PHONE_DIGITS ..= MAX_PHONE_DIGITS).contains(&digits)
}

/// Keeps only the digits of a typed national ID.
///
/// Separators are dropped; the length is left as typed so that
/// [`validate_national_id`] can reject overlong input.
#[must_use]
pub fn sanitize_national_id_input(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Validates a national ID.
///
/// # Errors
///
/// Returns [`ValidationError::NationalId`] when the value is not ten digits.
pub fn validate_national_id(value: &str) -> Result<(), ValidationError> {
    if is_valid_national_id(value) { Ok(()) } else { Err(ValidationError::NationalId) }
}

/// Validates a verification code.
///
/// # Errors
///
/// Returns [`ValidationError::VerificationCode`] when the value is not six digits.
pub fn validate_code(value: &str) -> Result<(), ValidationError> {
    if is_valid_code(value) { Ok(()) } else { Err(ValidationError::VerificationCode) }
}
