// crates/consentpro-core/src/lib.rs
// ============================================================================
// Module: ConsentPro Core Library
// Description: Public API surface for the ConsentPro public form client.
// Purpose: Expose domain types, backend interfaces, and the flow runtime.
// Dependencies: crate::{core, interfaces, runtime, audit, i18n}
// ============================================================================

//! ## Overview
//! ConsentPro core drives the public consent form: a customer identified by
//! national ID reviews personal data, selects consents, confirms identity by
//! code or biometrics, and authorizes. The crate is transport-agnostic; the
//! backend, notices, and hosting page are reached through traits in
//! [`interfaces`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod i18n;

pub mod audit;
pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use audit::FileFlowAuditSink;
pub use audit::FlowAction;
pub use audit::FlowAuditEvent;
pub use audit::FlowAuditSink;
pub use audit::FlowOutcome;
pub use audit::NoopFlowAuditSink;
pub use audit::StderrFlowAuditSink;
pub use interfaces::ApiError;
pub use interfaces::FormApi;
pub use interfaces::Notice;
pub use interfaces::NoticeLevel;
pub use interfaces::Notifier;
pub use interfaces::PageHost;
pub use interfaces::UnloadHook;
pub use interfaces::UnloadHookId;
pub use interfaces::VerificationApi;
pub use runtime::BiometricReturn;
pub use runtime::FlowDeps;
pub use runtime::FlowError;
pub use runtime::FlowSettings;
pub use runtime::NoticeBoard;
pub use runtime::PageLocation;
pub use runtime::PublicFormFlow;
