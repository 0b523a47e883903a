// crates/consentpro-core/src/core/personal.rs
// ============================================================================
// Module: ConsentPro Personal Data
// Description: Personal data inputs and the completeness rule per verification type.
// Purpose: Decide when the consent section becomes reachable.
// Dependencies: serde, crate::core::{form, validation, client}
// ============================================================================

//! ## Overview
//! [`PersonalData`] holds the raw, user-editable inputs. [`PersonalData::is_complete`]
//! is the pure completeness rule:
//!
//! | Verification type            | Required                               |
//! |------------------------------|----------------------------------------|
//! | `biometria_free` / `premium` | given + family name + valid email      |
//! | `sms_didit`                  | given + family name + phone            |
//! | `sms_email`                  | given + family name + (email or phone) |
//!
//! A field counts as present when it is non-empty after trimming.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::client::ClientRecord;
use crate::core::form::VerificationType;
use crate::core::validation::is_valid_email;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Personal data typed into the public form.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalData {
    /// Given name.
    pub given_name: String,
    /// Family name.
    pub family_name: String,
    /// Email address, possibly empty.
    pub email: String,
    /// Phone number, possibly empty.
    pub phone: String,
}

impl std::fmt::Debug for PersonalData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersonalData")
            .field("given_name", &present(&self.given_name))
            .field("family_name", &present(&self.family_name))
            .field("email", &present(&self.email))
            .field("phone", &present(&self.phone))
            .finish()
    }
}

impl PersonalData {
    /// Builds personal data prefilled from a client record.
    #[must_use]
    pub fn from_client(client: &ClientRecord) -> Self {
        Self {
            given_name: client.given_name.clone(),
            family_name: client.family_name.clone().unwrap_or_default(),
            email: client.email.clone().unwrap_or_default(),
            phone: client.phone.clone().unwrap_or_default(),
        }
    }

    /// Returns true when the data satisfies the rule for `kind`.
    #[must_use]
    pub fn is_complete(&self, kind: VerificationType) -> bool {
        let names = present(&self.given_name) && present(&self.family_name);
        names
            && match kind {
                VerificationType::BiometriaFree | VerificationType::BiometriaPremium => {
                    is_valid_email(self.email.trim())
                }
                VerificationType::SmsDidit => present(&self.phone),
                VerificationType::SmsEmail => present(&self.email) || present(&self.phone),
            }
    }

    /// Returns the trimmed email when present.
    #[must_use]
    pub fn email_opt(&self) -> Option<String> {
        optional(&self.email)
    }

    /// Returns the trimmed phone when present.
    #[must_use]
    pub fn phone_opt(&self) -> Option<String> {
        optional(&self.phone)
    }

    /// Returns true when the given name or email holds text.
    #[must_use]
    pub fn has_any_input(&self) -> bool {
        present(&self.given_name) || present(&self.email)
    }
}

/// Returns true when `value` is non-empty after trimming.
fn present(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Returns the trimmed value when present.
fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
