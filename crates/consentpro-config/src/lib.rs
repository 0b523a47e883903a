// crates/consentpro-config/src/lib.rs
// ============================================================================
// Module: ConsentPro Config Library
// Description: Configuration model and validation for ConsentPro tools.
// Purpose: Single source of truth for consentpro.toml semantics.
// Dependencies: consentpro-core, consentpro-client, serde, toml
// ============================================================================

//! ## Overview
//! `consentpro-config` loads `consentpro.toml`, applies defaults, validates
//! every field, and converts the result into the runtime and client settings.
//!
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
