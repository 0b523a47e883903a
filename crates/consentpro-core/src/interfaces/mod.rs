// crates/consentpro-core/src/interfaces/mod.rs
// ============================================================================
// Module: ConsentPro Interfaces
// Description: Collaborator contracts for the backend, notices, and the hosting page.
// Purpose: Define the seams the public form runtime drives without knowing transports.
// Dependencies: async-trait, serde_json, thiserror, crate::core
// ============================================================================

//! ## Overview
//! The runtime talks to the outside world through four seams:
//! - [`FormApi`]: public form endpoints.
//! - [`VerificationApi`]: biometric provider endpoints.
//! - [`Notifier`]: transient user-facing notices.
//! - [`PageHost`]: navigation and the unload confirmation hook.
//!
//! Security posture: every response is untrusted; implementations enforce size
//! limits and fail closed on malformed payloads.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::core::ClientLookup;
use crate::core::CodeResponse;
use crate::core::FormDefinition;
use crate::core::FormToken;
use crate::core::NationalId;
use crate::core::PendingClients;
use crate::core::ProcessAck;
use crate::core::RegistrationPayload;
use crate::core::RegistrationResponse;
use crate::core::SessionId;
use crate::core::SessionStatusReport;
use crate::core::VerificationCode;
use crate::core::VerificationSession;
use crate::core::VerificationToken;

// ============================================================================
// SECTION: Api Errors
// ============================================================================

/// Backend call failures.
///
/// # Invariants
/// - [`ApiError::status`] is `0` for failures that never produced an HTTP status.
/// - String payloads may contain untrusted server text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Connection, TLS, or timeout failure.
    #[error("backend unreachable: {0}")]
    Network(String),
    /// Non-success HTTP status.
    #[error("backend returned http {status}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// `message` field of the error body, when present.
        message: Option<String>,
        /// `error` field of the error body, when present.
        error: Option<String>,
    },
    /// Response body was not the expected JSON shape.
    #[error("invalid backend response: {0}")]
    Decode(String),
    /// Response body exceeded the configured limit.
    #[error("backend response exceeds size limit ({actual} > {limit})")]
    ResponseTooLarge {
        /// Actual size in bytes.
        actual: usize,
        /// Maximum size in bytes.
        limit: usize,
    },
    /// Request could not be built.
    #[error("invalid backend request: {0}")]
    Request(String),
}

impl ApiError {
    /// Returns the HTTP status, or `0` when no response was received.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::Status {
                status, ..
            } => *status,
            Self::Network(_) | Self::Decode(_) | Self::ResponseTooLarge { .. } | Self::Request(_) => 0,
        }
    }

    /// Returns the server-provided `message`, falling back to `error`.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status {
                message,
                error,
                ..
            } => message.as_deref().or(error.as_deref()).filter(|text| !text.is_empty()),
            _ => None,
        }
    }

    /// Returns the server-provided `error`, falling back to `message`.
    #[must_use]
    pub fn server_error(&self) -> Option<&str> {
        match self {
            Self::Status {
                message,
                error,
                ..
            } => error.as_deref().or(message.as_deref()).filter(|text| !text.is_empty()),
            _ => None,
        }
    }

    /// Returns true when the request never reached the backend.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

// ============================================================================
// SECTION: Backend Contracts
// ============================================================================

/// Public form endpoints.
#[async_trait]
pub trait FormApi: Send + Sync {
    /// Fetches the form definition for a token.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the call fails or the form is unavailable.
    async fn fetch_form(&self, token: &FormToken) -> Result<FormDefinition, ApiError>;

    /// Looks up a client by national ID within the form's company.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the call fails.
    async fn find_client(
        &self,
        token: &FormToken,
        national_id: &NationalId,
    ) -> Result<ClientLookup, ApiError>;

    /// Registers consents, or finalizes them when verification already passed.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the backend rejects the registration.
    async fn register(
        &self,
        token: &FormToken,
        payload: &RegistrationPayload,
    ) -> Result<RegistrationResponse, ApiError>;

    /// Requests a fresh verification code.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the call fails.
    async fn request_code(&self, token: &FormToken) -> Result<CodeResponse, ApiError>;

    /// Verifies a code.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the call fails.
    async fn verify_code(
        &self,
        token: &FormToken,
        code: &VerificationCode,
    ) -> Result<CodeResponse, ApiError>;
}

/// Biometric verification provider endpoints.
#[async_trait]
pub trait VerificationApi: Send + Sync {
    /// Creates a provider session bound to a verification token.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the call fails.
    async fn create_session(
        &self,
        token: &VerificationToken,
        premium: bool,
    ) -> Result<VerificationSession, ApiError>;

    /// Reads the status of a provider session.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the call fails.
    async fn session_status(&self, session: &SessionId) -> Result<SessionStatusReport, ApiError>;

    /// Reads the provider configuration as reported by the backend.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the call fails.
    async fn provider_config(&self) -> Result<Value, ApiError>;

    /// Resends the documents of a verified process.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the call fails.
    async fn resend_documents(&self, token: &VerificationToken) -> Result<ProcessAck, ApiError>;

    /// Marks a verified process complete on the server.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the call fails.
    async fn complete_process(&self, token: &VerificationToken) -> Result<ProcessAck, ApiError>;

    /// Lists clients whose verified process is still pending.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the call fails.
    async fn pending_clients(&self) -> Result<PendingClients, ApiError>;
}

// ============================================================================
// SECTION: Notices
// ============================================================================

/// Notice severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeLevel {
    /// Operation succeeded.
    Success,
    /// Operation failed.
    Error,
    /// Attention needed.
    Warning,
    /// Informational.
    Info,
}

impl NoticeLevel {
    /// Returns the stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transient user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Localized text.
    pub message: String,
    /// Time before the notice dismisses itself.
    pub ttl: Duration,
}

/// Sink for transient notices.
pub trait Notifier: Send + Sync {
    /// Shows a notice.
    fn notify(&self, notice: Notice);
}

// ============================================================================
// SECTION: Page Host
// ============================================================================

/// Predicate consulted before the page unloads; `true` asks for confirmation.
pub type UnloadHook = Arc<dyn Fn() -> bool + Send + Sync>;

/// Handle of an installed unload hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnloadHookId(u64);

impl UnloadHookId {
    /// Creates a hook handle.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw handle value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Page that hosts the public form.
pub trait PageHost: Send + Sync {
    /// Navigates away to an external URL.
    fn navigate(&self, url: &str);

    /// Installs an unload confirmation hook.
    fn install_unload_hook(&self, hook: UnloadHook) -> UnloadHookId;

    /// Removes a previously installed hook; unknown handles are ignored.
    fn remove_unload_hook(&self, id: UnloadHookId);
}
