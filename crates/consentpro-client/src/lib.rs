// crates/consentpro-client/src/lib.rs
// ============================================================================
// Module: ConsentPro Client Library
// Description: HTTP implementation of the ConsentPro backend contracts.
// Purpose: Connect the flow runtime to a live ConsentPro backend.
// Dependencies: reqwest, serde, consentpro-core
// ============================================================================

//! ## Overview
//! [`HttpApi`] implements both [`consentpro_core::FormApi`] and
//! [`consentpro_core::VerificationApi`] over `reqwest`, resolving every URL
//! through [`consentpro_core::Endpoints`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod http;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use http::ApiClientConfig;
pub use http::DEFAULT_MAX_RESPONSE_BYTES;
pub use http::DEFAULT_TIMEOUT;
pub use http::HttpApi;
