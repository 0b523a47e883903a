// crates/consentpro-cli/src/lib.rs
// ============================================================================
// Module: ConsentPro CLI Library
// Description: Shared CLI helpers for the consentpro binary and its tests.
// Purpose: Expose localization, terminal collaborators, rendering, and the wizard.
// Dependencies: consentpro-core, tokio
// ============================================================================

//! ## Overview
//! Library half of the `consentpro` binary. The binary parses arguments and
//! wires collaborators; the pieces that carry behavior live here so they can
//! be tested without spawning a process.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod i18n;
pub mod render;
pub mod terminal;
pub mod wizard;
