// crates/consentpro-core/src/runtime/mod.rs
// ============================================================================
// Module: ConsentPro Runtime
// Description: Public form flow, page location parsing, and notice board.
// Purpose: Drive the consent session against the backend interfaces.
// Dependencies: crate::{core, interfaces, audit, i18n}, tokio
// ============================================================================

//! ## Overview
//! Runtime modules own the live session. Hosts construct a
//! [`PublicFormFlow`] with their collaborators, open it with the page
//! location, and observe snapshots as operations run.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod flow;
pub mod location;
pub mod notices;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use flow::FlowDeps;
pub use flow::FlowError;
pub use flow::FlowSettings;
pub use flow::PublicFormFlow;
pub use location::BiometricReturn;
pub use location::PageLocation;
pub use notices::NoticeBoard;
