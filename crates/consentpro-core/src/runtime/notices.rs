// crates/consentpro-core/src/runtime/notices.rs
// ============================================================================
// Module: ConsentPro Notice Board
// Description: In-memory notice sink with time-based auto-dismissal.
// Purpose: Hold transient notices until their time-to-live elapses.
// Dependencies: tokio, crate::interfaces
// ============================================================================

//! ## Overview
//! [`NoticeBoard`] implements [`Notifier`] by keeping each notice with a
//! deadline. Expired notices disappear from [`NoticeBoard::visible`] without a
//! background timer; the clock is `tokio`'s so paused-time tests control it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;

use tokio::time::Instant;

use crate::interfaces::Notice;
use crate::interfaces::Notifier;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Notice entry with its dismissal deadline.
#[derive(Debug, Clone)]
struct NoticeEntry {
    /// Notice payload.
    notice: Notice,
    /// Instant after which the notice is hidden.
    expires_at: Instant,
}

/// Auto-dismissing notice sink.
///
/// # Invariants
/// - Entries are kept in arrival order.
#[derive(Debug, Default)]
pub struct NoticeBoard {
    /// Notices not yet pruned.
    entries: Mutex<Vec<NoticeEntry>>,
}

impl NoticeBoard {
    /// Creates an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the notices still visible now, oldest first, pruning the rest.
    #[must_use]
    pub fn visible(&self) -> Vec<Notice> {
        let now = Instant::now();
        let Ok(mut entries) = self.entries.lock() else {
            return Vec::new();
        };
        entries.retain(|entry| entry.expires_at > now);
        entries.iter().map(|entry| entry.notice.clone()).collect()
    }

    /// Returns the most recent visible notice.
    #[must_use]
    pub fn latest(&self) -> Option<Notice> {
        self.visible().pop()
    }

    /// Removes every notice.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

impl Notifier for NoticeBoard {
    fn notify(&self, notice: Notice) {
        let expires_at = Instant::now() + notice.ttl;
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(NoticeEntry {
                notice,
                expires_at,
            });
        }
    }
}
