// crates/consentpro-core/src/core/verification.rs
// ============================================================================
// Module: ConsentPro Verification Provider Types
// Description: Biometric session, status, and back-office payloads.
// Purpose: Type the contract of the external verification provider endpoints.
// Dependencies: serde, serde_json, crate::core::identifiers
// ============================================================================

//! ## Overview
//! The verification provider issues sessions, reports their status while the
//! person completes biometrics, and exposes back-office calls to finish a
//! stuck process or resend its documents.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::SessionId;
use crate::core::identifiers::VerificationToken;

// ============================================================================
// SECTION: Sessions
// ============================================================================

/// Request body for creating a provider session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateSessionRequest<'a> {
    /// Verification token the session is bound to.
    #[serde(rename = "token_verificacion")]
    pub verification_token: &'a VerificationToken,
    /// Premium tier flag.
    pub is_premium: bool,
}

/// Provider session created for a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSession {
    /// Session identifier.
    pub session_id: SessionId,
    /// Redirect URL for the person.
    pub verification_url: String,
    /// Verification token echoed back.
    #[serde(rename = "token_verificacion", default)]
    pub verification_token: Option<VerificationToken>,
}

/// Provider session lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Still in progress; unknown labels are treated as pending.
    #[default]
    Pending,
    /// Finished; see the verified flag.
    Completed,
    /// Failed permanently.
    Failed,
}

impl SessionStatus {
    /// Returns the wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl<'de> Deserialize<'de> for SessionStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(match raw.as_deref() {
            Some("completed") => Self::Completed,
            Some("failed") => Self::Failed,
            _ => Self::Pending,
        })
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status report for a provider session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStatusReport {
    /// Lifecycle status.
    #[serde(default)]
    pub status: SessionStatus,
    /// True when the identity was verified.
    #[serde(default)]
    pub verified: bool,
    /// Provider-specific detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Terminal classification of a status report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Keep polling.
    Pending,
    /// Completed and verified.
    Verified,
    /// Failed permanently.
    Failed,
}

impl SessionStatusReport {
    /// Classifies the report.
    ///
    /// A completed but unverified session keeps polling.
    #[must_use]
    pub const fn outcome(&self) -> PollOutcome {
        match self.status {
            SessionStatus::Completed if self.verified => PollOutcome::Verified,
            SessionStatus::Failed => PollOutcome::Failed,
            SessionStatus::Completed | SessionStatus::Pending => PollOutcome::Pending,
        }
    }
}

// ============================================================================
// SECTION: Back Office
// ============================================================================

/// Delivery flags reported when a process is completed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDelivery {
    /// Email delivered.
    #[serde(rename = "email_enviado", default)]
    pub email_sent: bool,
    /// SMS delivered.
    #[serde(rename = "sms_enviado", default)]
    pub sms_sent: bool,
}

/// Acknowledgement returned by the complete-process and resend-documents calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessAck {
    /// True when the backend accepted the request.
    #[serde(default)]
    pub success: bool,
    /// Optional server message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Optional server error text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Delivery flags, when documents were sent.
    #[serde(rename = "documentos", default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<DocumentDelivery>,
}

/// Client whose biometric verification finished but whose process is pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingClient {
    /// Client identifier.
    #[serde(default)]
    pub id: u64,
    /// Given name.
    #[serde(rename = "nombre", default)]
    pub given_name: String,
    /// Family name.
    #[serde(rename = "apellido", default)]
    pub family_name: String,
    /// National ID.
    #[serde(rename = "cedula", default)]
    pub national_id: String,
    /// Email.
    #[serde(default)]
    pub email: Option<String>,
    /// Phone.
    #[serde(rename = "telefono", default)]
    pub phone: Option<String>,
    /// Verification token used by the back-office calls.
    #[serde(rename = "token_verificacion")]
    pub verification_token: VerificationToken,
    /// Verification timestamp as sent by the backend.
    #[serde(rename = "fecha_verificacion", default)]
    pub verified_at: Option<String>,
    /// Process state label.
    #[serde(rename = "estado", default)]
    pub state: Option<String>,
}

/// Aggregate counters returned with the pending list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingStatistics {
    /// Processes completed today.
    #[serde(rename = "completados_hoy", default)]
    pub completed_today: u64,
    /// Total verified clients.
    #[serde(rename = "total_verificados", default)]
    pub total_verified: u64,
    /// Success rate as reported by the backend.
    #[serde(rename = "tasa_exito", default)]
    pub success_rate: f64,
}

/// Pending list body, at the top level or nested under `data`.
#[derive(Debug, Clone, Default, Deserialize)]
struct PendingBody {
    /// Pending clients.
    #[serde(rename = "clientes", default)]
    clients: Option<Vec<PendingClient>>,
    /// Aggregate counters.
    #[serde(rename = "estadisticas", default)]
    statistics: Option<PendingStatistics>,
}

/// Pending-clients response as sent by the backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PendingClientsResponse {
    /// Top-level body.
    #[serde(flatten)]
    top: PendingBody,
    /// Nested body.
    #[serde(default)]
    data: Option<PendingBody>,
}

/// Normalized pending-clients listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PendingClients {
    /// Pending clients.
    pub clients: Vec<PendingClient>,
    /// Aggregate counters, when reported.
    pub statistics: Option<PendingStatistics>,
}

impl PendingClientsResponse {
    /// Normalizes either response shape; top-level fields win.
    #[must_use]
    pub fn normalize(self) -> PendingClients {
        let nested = self.data.unwrap_or_default();
        PendingClients {
            clients: self.top.clients.or(nested.clients).unwrap_or_default(),
            statistics: self.top.statistics.or(nested.statistics),
        }
    }
}
