// crates/consentpro-core/src/core/mod.rs
// ============================================================================
// Module: ConsentPro Core Types
// Description: Domain types for public forms, people, registrations, and sessions.
// Purpose: Provide stable, serializable types shared by the runtime, client, and CLI.
// Dependencies: serde, serde_json, regex, url
// ============================================================================

//! ## Overview
//! Core types model the backend wire contract and the public form session.
//! They carry no I/O; the runtime drives them through the interfaces module.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod client;
pub mod endpoints;
pub mod form;
pub mod identifiers;
pub mod personal;
pub mod registration;
pub mod state;
pub mod validation;
pub mod verification;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use client::ClientLookup;
pub use client::ClientRecord;
pub use endpoints::EndpointError;
pub use endpoints::Endpoints;
pub use form::CompanyInfo;
pub use form::ConsentFile;
pub use form::ConsentItem;
pub use form::FormDefinition;
pub use form::FormEnvelope;
pub use form::VerificationType;
pub use form::consent_label;
pub use identifiers::ConsentId;
pub use identifiers::FormToken;
pub use identifiers::NationalId;
pub use identifiers::SessionId;
pub use identifiers::VerificationCode;
pub use identifiers::VerificationToken;
pub use personal::PersonalData;
pub use registration::ChannelStatus;
pub use registration::CodeResponse;
pub use registration::DocumentDescriptor;
pub use registration::RegistrationPayload;
pub use registration::RegistrationResponse;
pub use registration::RegistrationRoute;
pub use registration::VerifyCodeRequest;
pub use state::CodeDelivery;
pub use state::FlowSnapshot;
pub use state::FlowStep;
pub use state::FormInputs;
pub use state::InvalidTransition;
pub use state::SessionState;
pub use state::SmsStep;
pub use validation::ValidationError;
pub use verification::CreateSessionRequest;
pub use verification::DocumentDelivery;
pub use verification::PendingClient;
pub use verification::PendingClients;
pub use verification::PendingClientsResponse;
pub use verification::PendingStatistics;
pub use verification::PollOutcome;
pub use verification::ProcessAck;
pub use verification::SessionStatus;
pub use verification::SessionStatusReport;
pub use verification::VerificationSession;
