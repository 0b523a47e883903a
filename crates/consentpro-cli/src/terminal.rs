// crates/consentpro-cli/src/terminal.rs
// ============================================================================
// Module: Terminal Collaborators
// Description: Notifier and page host implementations for a terminal session.
// Purpose: Let the flow surface notices and redirects on a console.
// Dependencies: consentpro-core
// ============================================================================

//! ## Overview
//! A terminal has no page to leave, so [`TerminalHost`] prints redirect links
//! and keeps unload hooks in a table the CLI consults when the wizard is
//! abandoned. Notices are written as one line each and never block the flow.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use consentpro_core::Notice;
use consentpro_core::Notifier;
use consentpro_core::PageHost;
use consentpro_core::UnloadHook;
use consentpro_core::UnloadHookId;

use crate::t;

// ============================================================================
// SECTION: Notifier
// ============================================================================

/// Writes each notice as a `[level] message` line.
pub struct TerminalNotifier {
    /// Destination for notice lines.
    out: Mutex<Box<dyn Write + Send>>,
}

impl TerminalNotifier {
    /// Creates a notifier writing to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::with_writer(Box::new(std::io::stderr()))
    }

    /// Creates a notifier writing to `out`.
    #[must_use]
    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

impl Notifier for TerminalNotifier {
    fn notify(&self, notice: Notice) {
        let line = t!("notice.line", level = notice.level, message = notice.message);
        if let Ok(mut out) = self.out.lock() {
            let _ = writeln!(out, "{line}");
            let _ = out.flush();
        }
    }
}

// ============================================================================
// SECTION: Page Host
// ============================================================================

/// Page host backed by a terminal.
pub struct TerminalHost {
    /// Destination for redirect links.
    out: Mutex<Box<dyn Write + Send>>,
    /// URLs the flow navigated to, oldest first.
    navigations: Mutex<Vec<String>>,
    /// Installed unload hooks.
    hooks: Mutex<BTreeMap<u64, UnloadHook>>,
    /// Next hook handle.
    next_id: AtomicU64,
}

impl TerminalHost {
    /// Creates a host printing links to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::with_writer(Box::new(std::io::stderr()))
    }

    /// Creates a host printing links to `out`.
    #[must_use]
    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
            navigations: Mutex::new(Vec::new()),
            hooks: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Returns every URL navigated to so far.
    #[must_use]
    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().map(|urls| urls.clone()).unwrap_or_default()
    }

    /// Returns the number of installed unload hooks.
    #[must_use]
    pub fn hook_count(&self) -> usize {
        self.hooks.lock().map(|hooks| hooks.len()).unwrap_or_default()
    }

    /// Returns true when any installed hook asks to confirm leaving.
    #[must_use]
    pub fn would_confirm_unload(&self) -> bool {
        let hooks: Vec<UnloadHook> =
            self.hooks.lock().map(|hooks| hooks.values().cloned().collect()).unwrap_or_default();
        hooks.iter().any(|hook| hook())
    }
}

impl PageHost for TerminalHost {
    fn navigate(&self, url: &str) {
        if let Ok(mut urls) = self.navigations.lock() {
            urls.push(url.to_string());
        }
        let line = t!("host.navigate", url = url);
        if let Ok(mut out) = self.out.lock() {
            let _ = writeln!(out, "{line}");
            let _ = out.flush();
        }
    }

    fn install_unload_hook(&self, hook: UnloadHook) -> UnloadHookId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut hooks) = self.hooks.lock() {
            hooks.insert(id, hook);
        }
        UnloadHookId::new(id)
    }

    fn remove_unload_hook(&self, id: UnloadHookId) {
        if let Ok(mut hooks) = self.hooks.lock() {
            hooks.remove(&id.get());
        }
    }
}
