// crates/consentpro-core/src/audit.rs
// ============================================================================
// Module: ConsentPro Flow Audit Logging
// Description: Structured audit events for public form transitions.
// Purpose: Emit redacted JSON-lines records of every flow action and its outcome.
// Dependencies: serde, serde_json, crate::core
// ============================================================================

//! ## Overview
//! Every flow operation records one [`FlowAuditEvent`]. Events name the action,
//! the step before and after, and an outcome label. Personal data never enters
//! an event; the national ID is masked to its last four digits.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::core::FlowStep;
use crate::core::NationalId;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Flow action classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowAction {
    /// Form load.
    Open,
    /// National ID lookup.
    Lookup,
    /// Personal data confirmation.
    PersonalData,
    /// Consent confirmation.
    Consents,
    /// Registration.
    Register,
    /// SMS dispatch or resend.
    DispatchSms,
    /// Code verification.
    VerifyCode,
    /// Finalize.
    Finalize,
    /// Biometric return callback.
    BiometricReturn,
    /// Biometric status poll tick.
    Poll,
    /// Session reset.
    Reset,
    /// Flow teardown.
    Teardown,
}

/// Flow action outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowOutcome {
    /// Action committed.
    Ok,
    /// Rejected locally before any network call.
    Rejected,
    /// Backend or provider failure.
    Failed,
    /// Gave up after the attempt cap.
    Timeout,
}

/// Flow audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct FlowAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Action performed.
    pub action: FlowAction,
    /// Action outcome.
    pub outcome: FlowOutcome,
    /// Step before the action.
    pub step_before: FlowStep,
    /// Step after the action.
    pub step_after: FlowStep,
    /// Form token when known.
    pub form_token: Option<String>,
    /// Masked national ID when known.
    pub national_id: Option<String>,
    /// HTTP status of a failed call (`0` for network failures).
    pub http_status: Option<u16>,
    /// Attempt counter for SMS dispatches and poll ticks.
    pub attempt: Option<u32>,
    /// Short error label.
    pub detail: Option<String>,
}

/// Inputs for building a [`FlowAuditEvent`].
#[derive(Debug, Clone)]
pub struct FlowAuditEventParams {
    /// Action performed.
    pub action: FlowAction,
    /// Action outcome.
    pub outcome: FlowOutcome,
    /// Step before the action.
    pub step_before: FlowStep,
    /// Step after the action.
    pub step_after: FlowStep,
    /// Form token when known.
    pub form_token: Option<String>,
    /// National ID when known; masked on construction.
    pub national_id: Option<NationalId>,
    /// HTTP status of a failed call.
    pub http_status: Option<u16>,
    /// Attempt counter.
    pub attempt: Option<u32>,
    /// Short error label.
    pub detail: Option<String>,
}

impl FlowAuditEvent {
    /// Creates a new audit event with a consistent timestamp.
    #[must_use]
    pub fn new(params: FlowAuditEventParams) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "flow_action",
            timestamp_ms,
            action: params.action,
            outcome: params.outcome,
            step_before: params.step_before,
            step_after: params.step_after,
            form_token: params.form_token,
            national_id: params.national_id.as_ref().map(NationalId::masked),
            http_status: params.http_status,
            attempt: params.attempt,
            detail: params.detail,
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for flow events.
pub trait FlowAuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &FlowAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrFlowAuditSink;

impl FlowAuditSink for StderrFlowAuditSink {
    fn record(&self, event: &FlowAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileFlowAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileFlowAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl FlowAuditSink for FileFlowAuditSink {
    fn record(&self, event: &FlowAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopFlowAuditSink;

impl FlowAuditSink for NoopFlowAuditSink {
    fn record(&self, _event: &FlowAuditEvent) {}
}
