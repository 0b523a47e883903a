// crates/consentpro-core/src/core/state.rs
// ============================================================================
// Module: ConsentPro Session State
// Description: Flow steps, session record, user inputs, and published snapshots.
// Purpose: Represent the public form session as one closed step plus derived flags.
// Dependencies: crate::core::{client, form, identifiers, personal, registration}, serde
// ============================================================================

//! ## Overview
//! The session is a single [`FlowStep`] plus the data each step owns. Status
//! flags (personal data complete, code verified, completed) are derived from
//! the step instead of being stored, so combinations such as "completed but
//! not verified" cannot be represented.
//!
//! Step order:
//!
//! ```text
//! Initial -> ClientLookupDone -> PersonalDataComplete -> ConsentsSelected
//!   -> CodeRequested -> CodeVerified -> Finalized
//!   -> BiometricRedirected -> CodeVerified -> Finalized
//! ```
//!
//! # Invariants
//! - Every transition goes through [`SessionState::advance`].
//! - [`FlowSnapshot::revision`] strictly increases with every publication.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::client::ClientRecord;
use crate::core::form::FormDefinition;
use crate::core::form::VerificationType;
use crate::core::identifiers::ConsentId;
use crate::core::identifiers::FormToken;
use crate::core::identifiers::NationalId;
use crate::core::identifiers::SessionId;
use crate::core::identifiers::VerificationToken;
use crate::core::personal::PersonalData;
use crate::core::registration::DocumentDescriptor;

// ============================================================================
// SECTION: Flow Step
// ============================================================================

/// Closed set of public form steps.
///
/// # Invariants
/// - Variants are declared in progression order; `Ord` follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStep {
    /// Form loaded; no lookup yet.
    #[default]
    Initial,
    /// National ID lookup answered, found or not.
    ClientLookupDone,
    /// Personal data satisfies the verification type.
    PersonalDataComplete,
    /// At least one consent confirmed.
    ConsentsSelected,
    /// Registration accepted; waiting for a code.
    CodeRequested,
    /// Registration accepted; person sent to the biometric provider.
    BiometricRedirected,
    /// Identity confirmed by code or biometrics.
    CodeVerified,
    /// Consents committed and documents issued.
    Finalized,
}

impl FlowStep {
    /// Returns the stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::ClientLookupDone => "client_lookup_done",
            Self::PersonalDataComplete => "personal_data_complete",
            Self::ConsentsSelected => "consents_selected",
            Self::CodeRequested => "code_requested",
            Self::BiometricRedirected => "biometric_redirected",
            Self::CodeVerified => "code_verified",
            Self::Finalized => "finalized",
        }
    }

    /// Returns true when the edge `self -> to` is allowed.
    ///
    /// Reset to [`FlowStep::Initial`] is always allowed. `Initial -> CodeVerified`
    /// covers a biometric return landing on a fresh page.
    #[must_use]
    pub const fn can_advance_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (_, Self::Initial)
                | (Self::Initial, Self::ClientLookupDone | Self::CodeVerified)
                | (Self::ClientLookupDone, Self::PersonalDataComplete)
                | (Self::PersonalDataComplete, Self::ClientLookupDone | Self::ConsentsSelected)
                | (
                    Self::ConsentsSelected,
                    Self::ClientLookupDone
                        | Self::PersonalDataComplete
                        | Self::CodeRequested
                        | Self::BiometricRedirected
                )
                | (Self::CodeRequested | Self::BiometricRedirected, Self::CodeVerified)
                | (Self::CodeVerified, Self::Finalized)
        )
    }
}

impl fmt::Display for FlowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected step transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid flow transition from {from} to {to}")]
pub struct InvalidTransition {
    /// Step the session was in.
    pub from: FlowStep,
    /// Requested step.
    pub to: FlowStep,
}

// ============================================================================
// SECTION: Code Delivery
// ============================================================================

/// Sub-step of the paid SMS path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmsStep {
    /// Waiting for the person to trigger dispatch.
    AwaitingDispatch,
    /// At least one SMS was dispatched.
    CodeSent,
    /// Code accepted.
    Verified,
}

/// How the verification code reached the person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CodeDelivery {
    /// Sent by the backend during registration.
    Dispatched {
        /// Email channel confirmed.
        email: bool,
        /// WhatsApp channel confirmed.
        whatsapp: bool,
    },
    /// Paid SMS dispatched on explicit request.
    ManualSms {
        /// Current SMS sub-step.
        step: SmsStep,
    },
}

impl CodeDelivery {
    /// Returns true when a code is believed to be on its way.
    #[must_use]
    pub const fn code_sent(self) -> bool {
        match self {
            Self::Dispatched { .. } => true,
            Self::ManualSms { step } => !matches!(step, SmsStep::AwaitingDispatch),
        }
    }
}

// ============================================================================
// SECTION: Session State
// ============================================================================

/// Session record owned by the flow.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionState {
    /// Current step.
    pub step: FlowStep,
    /// National ID committed by the last lookup.
    pub national_id: Option<NationalId>,
    /// Client record matched by the last lookup.
    pub client: Option<ClientRecord>,
    /// Verification type echoed from the form.
    pub verification_type: VerificationType,
    /// Verification token issued by the backend.
    pub verification_token: Option<VerificationToken>,
    /// Code delivery for the code-based paths.
    pub delivery: Option<CodeDelivery>,
    /// Biometric provider session.
    pub biometric_session: Option<SessionId>,
    /// True once biometrics confirmed the identity.
    pub biometric_verified: bool,
    /// Documents issued on finalize.
    pub documents: Vec<DocumentDescriptor>,
}

impl SessionState {
    /// Creates an initial session for a verification type.
    #[must_use]
    pub fn new(verification_type: VerificationType) -> Self {
        Self {
            verification_type,
            ..Self::default()
        }
    }

    /// Moves to `to` when the edge is allowed.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] when the edge is not in the step graph.
    pub const fn advance(&mut self, to: FlowStep) -> Result<(), InvalidTransition> {
        if self.step.can_advance_to(to) {
            self.step = to;
            Ok(())
        } else {
            Err(InvalidTransition {
                from: self.step,
                to,
            })
        }
    }

    /// Returns true when the last lookup matched a client.
    #[must_use]
    pub const fn client_found(&self) -> bool {
        self.client.is_some()
    }

    /// Returns true once personal data has been accepted.
    #[must_use]
    pub fn personal_data_complete(&self) -> bool {
        self.step >= FlowStep::PersonalDataComplete
    }

    /// Returns true once consents have been confirmed.
    #[must_use]
    pub fn consents_selected(&self) -> bool {
        self.step >= FlowStep::ConsentsSelected
    }

    /// Returns true when a code has been sent.
    #[must_use]
    pub fn code_sent(&self) -> bool {
        self.delivery.is_some_and(CodeDelivery::code_sent)
    }

    /// Returns true once identity has been confirmed.
    #[must_use]
    pub fn code_verified(&self) -> bool {
        self.step >= FlowStep::CodeVerified
    }

    /// Returns true once consents are committed.
    #[must_use]
    pub fn completed(&self) -> bool {
        self.step == FlowStep::Finalized
    }

    /// Returns the SMS sub-step on the paid SMS path.
    #[must_use]
    pub const fn sms_step(&self) -> Option<SmsStep> {
        match self.delivery {
            Some(CodeDelivery::ManualSms { step }) => Some(step),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Inputs and Snapshots
// ============================================================================

/// Values typed by the person, kept apart from committed session data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormInputs {
    /// National ID field (digits only, as typed).
    pub national_id: String,
    /// Personal data fields.
    pub personal: PersonalData,
    /// Selected consent identifiers.
    pub selected_consents: BTreeSet<ConsentId>,
    /// Verification code field.
    #[serde(skip)]
    pub code: String,
    /// SMS dispatch attempts consumed.
    pub sms_attempts: u32,
}

/// Immutable view published after every change.
///
/// # Invariants
/// - A new value with a higher `revision` is published for every change.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlowSnapshot {
    /// Publication counter.
    pub revision: u64,
    /// Token the form was opened with.
    pub form_token: Option<FormToken>,
    /// Loaded form definition.
    #[serde(skip)]
    pub form: Option<Arc<FormDefinition>>,
    /// Load failure message; nothing is reachable while set.
    pub load_error: Option<String>,
    /// Session record.
    pub session: SessionState,
    /// Typed inputs.
    pub inputs: FormInputs,
    /// True while a status poll is scheduled.
    pub polling: bool,
    /// True while the reload guard is installed.
    pub reload_guard: bool,
}

impl FlowSnapshot {
    /// Returns true when the form loaded and the session is usable.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.form.is_some() && self.load_error.is_none()
    }

    /// Returns true when leaving the page would lose typed data.
    #[must_use]
    pub fn has_unsaved_data(&self) -> bool {
        !self.inputs.national_id.is_empty()
            || self.inputs.personal.has_any_input()
            || self.session.consents_selected()
            || self.session.code_sent()
    }
}
