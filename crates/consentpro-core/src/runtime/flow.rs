// crates/consentpro-core/src/runtime/flow.rs
// ============================================================================
// Module: ConsentPro Public Form Flow
// Description: State machine driving lookup, consent, verification, and finalize.
// Purpose: Own the public form session and sequence every backend call.
// Dependencies: tokio, crate::{core, interfaces, audit, i18n}
// ============================================================================

//! ## Overview
//! [`PublicFormFlow`] is the single owner of the public form session. Every
//! operation reads the latest [`FlowSnapshot`], computes the next one, and
//! publishes it whole through a `tokio::sync::watch` channel, so observers
//! always see a new value with a higher revision.
//!
//! Concurrency: user operations take an in-flight guard and fail fast with
//! [`FlowError::Busy`] while another operation runs. The biometric poll task
//! waits for the same guard before committing, so a poll-driven finalize and a
//! manual one never interleave. Finalize is a no-op once the session is
//! finalized.
//!
//! Cancellation: the poll and redirect tasks are owned through abort handles.
//! Starting a poll aborts the previous one; reset, teardown, and drop abort
//! both.
//!
//! Failure semantics: no call is retried. Failures raise an auto-dismissing
//! notice and leave the snapshot as it was before the attempt; only the SMS
//! attempt counter is committed ahead of its call.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::Weak;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::MutexGuard;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use url::Url;

use crate::audit::FlowAction;
use crate::audit::FlowAuditEvent;
use crate::audit::FlowAuditEventParams;
use crate::audit::FlowAuditSink;
use crate::audit::FlowOutcome;
use crate::audit::NoopFlowAuditSink;
use crate::core::CodeDelivery;
use crate::core::ConsentId;
use crate::core::ConsentItem;
use crate::core::FlowSnapshot;
use crate::core::FlowStep;
use crate::core::FormDefinition;
use crate::core::FormInputs;
use crate::core::InvalidTransition;
use crate::core::NationalId;
use crate::core::PersonalData;
use crate::core::RegistrationPayload;
use crate::core::RegistrationRoute;
use crate::core::SessionId;
use crate::core::SessionState;
use crate::core::SmsStep;
use crate::core::ValidationError;
use crate::core::VerificationCode;
use crate::core::endpoints::CERTIFICATE_DOWNLOAD;
use crate::core::endpoints::Endpoints;
use crate::core::endpoints::TERMS_DOWNLOAD;
use crate::core::validation::sanitize_national_id_input;
use crate::core::verification::PollOutcome;
use crate::i18n::translate;
use crate::interfaces::ApiError;
use crate::interfaces::FormApi;
use crate::interfaces::Notice;
use crate::interfaces::NoticeLevel;
use crate::interfaces::Notifier;
use crate::interfaces::PageHost;
use crate::interfaces::UnloadHookId;
use crate::interfaces::VerificationApi;
use crate::runtime::location::BiometricReturn;
use crate::runtime::location::PageLocation;
use crate::t;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Default biometric status poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Default cap on biometric status polls.
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 60;
/// Default delay before redirecting to the biometric provider.
pub const DEFAULT_REDIRECT_DELAY: Duration = Duration::from_secs(2);
/// Default notice time-to-live.
pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_secs(5);
/// Default cap on SMS dispatches.
pub const DEFAULT_MAX_SMS_ATTEMPTS: u32 = 3;

/// Flow timing and attempt limits.
///
/// # Invariants
/// - `max_poll_attempts` and `max_sms_attempts` are at least 1 when built from config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowSettings {
    /// Interval between biometric status polls.
    pub poll_interval: Duration,
    /// Poll ticks before giving up.
    pub max_poll_attempts: u32,
    /// Delay before navigating to the provider.
    pub redirect_delay: Duration,
    /// Notice time-to-live.
    pub notice_ttl: Duration,
    /// SMS dispatches allowed per session.
    pub max_sms_attempts: u32,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            redirect_delay: DEFAULT_REDIRECT_DELAY,
            notice_ttl: DEFAULT_NOTICE_TTL,
            max_sms_attempts: DEFAULT_MAX_SMS_ATTEMPTS,
        }
    }
}

/// Collaborators the flow drives.
#[derive(Clone)]
pub struct FlowDeps {
    /// Public form endpoints.
    pub forms: Arc<dyn FormApi>,
    /// Biometric provider endpoints.
    pub verification: Arc<dyn VerificationApi>,
    /// Notice sink.
    pub notifier: Arc<dyn Notifier>,
    /// Hosting page.
    pub host: Arc<dyn PageHost>,
    /// Audit sink.
    pub audit: Arc<dyn FlowAuditSink>,
    /// Backend URL resolver for document links.
    pub endpoints: Endpoints,
}

impl FlowDeps {
    /// Bundles collaborators with a no-op audit sink.
    #[must_use]
    pub fn new(
        forms: Arc<dyn FormApi>,
        verification: Arc<dyn VerificationApi>,
        notifier: Arc<dyn Notifier>,
        host: Arc<dyn PageHost>,
        endpoints: Endpoints,
    ) -> Self {
        Self {
            forms,
            verification,
            notifier,
            host,
            audit: Arc::new(NoopFlowAuditSink),
            endpoints,
        }
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn FlowAuditSink>) -> Self {
        self.audit = audit;
        self
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Flow operation failures.
///
/// # Invariants
/// - Every variant has already been surfaced as a notice when returned from a
///   user operation, except [`FlowError::Busy`], [`FlowError::Closed`], and
///   [`FlowError::WrongStep`].
#[derive(Debug, Error)]
pub enum FlowError {
    /// The page location carried no form token.
    #[error("form token missing from page location")]
    MissingToken,
    /// The form is not loaded or failed to load.
    #[error("form is not available")]
    FormUnavailable,
    /// The flow was torn down.
    #[error("flow has been torn down")]
    Closed,
    /// Another operation is in flight.
    #[error("another operation is in flight")]
    Busy,
    /// Operation is not valid in the current step.
    #[error("operation not allowed in step {0}")]
    WrongStep(FlowStep),
    /// Local validation rejected the input.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Step graph rejected the transition.
    #[error(transparent)]
    Transition(#[from] InvalidTransition),
    /// Backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// Backend answered but declined the request.
    #[error("backend declined the request: {0}")]
    Rejected(String),
    /// Registration answered without a redirect URL or session id.
    #[error("biometric verification could not be started")]
    BiometricUnavailable,
    /// The provider reported a failed or unverified biometric attempt.
    #[error("biometric verification failed")]
    BiometricFailed,
    /// SMS dispatch cap reached.
    #[error("sms attempts exhausted")]
    SmsAttemptsExhausted,
}

impl FlowError {
    /// Returns a short stable label for audit records.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MissingToken => "missing_token",
            Self::FormUnavailable => "form_unavailable",
            Self::Closed => "closed",
            Self::Busy => "busy",
            Self::WrongStep(_) => "wrong_step",
            Self::Validation(_) => "validation",
            Self::Transition(_) => "transition",
            Self::Api(ApiError::Network(_)) => "network",
            Self::Api(_) => "api",
            Self::Rejected(_) => "rejected",
            Self::BiometricUnavailable => "biometric_unavailable",
            Self::BiometricFailed => "biometric_failed",
            Self::SmsAttemptsExhausted => "sms_attempts_exhausted",
        }
    }

    /// Returns the HTTP status of a failed call, if any.
    #[must_use]
    pub const fn http_status(&self) -> Option<u16> {
        match self {
            Self::Api(err) => Some(err.status()),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Flow Handle
// ============================================================================

/// Public form state machine.
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct PublicFormFlow {
    /// Shared flow state.
    shared: Arc<FlowShared>,
}

/// Task handles owned by the flow.
#[derive(Debug, Default)]
struct FlowTasks {
    /// Active biometric poll.
    poll: Option<AbortHandle>,
    /// Pending provider redirect.
    redirect: Option<AbortHandle>,
    /// Bumped whenever the poll slot changes hands.
    generation: u64,
}

/// Installed unload hook, removed when dropped.
struct UnloadGuard {
    /// Host the hook is installed on.
    host: Arc<dyn PageHost>,
    /// Hook handle.
    id: UnloadHookId,
}

impl UnloadGuard {
    /// Installs a hook that asks for confirmation while data would be lost.
    fn install(host: Arc<dyn PageHost>, state: watch::Receiver<FlowSnapshot>) -> Self {
        let id = host.install_unload_hook(Arc::new(move || {
            let snapshot = state.borrow();
            !snapshot.session.completed() && snapshot.has_unsaved_data()
        }));
        Self {
            host,
            id,
        }
    }
}

impl Drop for UnloadGuard {
    fn drop(&mut self) {
        self.host.remove_unload_hook(self.id);
    }
}

/// State shared between the handle and its background tasks.
struct FlowShared {
    /// Collaborators.
    deps: FlowDeps,
    /// Timing and limits.
    settings: FlowSettings,
    /// Published snapshots.
    state: watch::Sender<FlowSnapshot>,
    /// In-flight operation guard.
    op_lock: tokio::sync::Mutex<()>,
    /// Background task handles.
    tasks: Mutex<FlowTasks>,
    /// Reload guard slot.
    guard: Mutex<Option<UnloadGuard>>,
    /// Set once the flow is torn down.
    closed: AtomicBool,
}

impl Drop for FlowShared {
    fn drop(&mut self) {
        if let Ok(mut tasks) = self.tasks.lock() {
            abort_all(&mut tasks);
        }
    }
}

/// Aborts every owned task and invalidates the poll generation.
fn abort_all(tasks: &mut FlowTasks) {
    if let Some(handle) = tasks.poll.take() {
        handle.abort();
    }
    if let Some(handle) = tasks.redirect.take() {
        handle.abort();
    }
    tasks.generation = tasks.generation.wrapping_add(1);
}

impl PublicFormFlow {
    /// Creates a flow with no form loaded.
    #[must_use]
    pub fn new(deps: FlowDeps, settings: FlowSettings) -> Self {
        let (state, _) = watch::channel(FlowSnapshot::default());
        Self {
            shared: Arc::new(FlowShared {
                deps,
                settings,
                state,
                op_lock: tokio::sync::Mutex::new(()),
                tasks: Mutex::new(FlowTasks::default()),
                guard: Mutex::new(None),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Returns the latest snapshot.
    #[must_use]
    pub fn snapshot(&self) -> FlowSnapshot {
        self.shared.snapshot()
    }

    /// Subscribes to snapshot publications.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FlowSnapshot> {
        self.shared.state.subscribe()
    }

    /// Returns the settings the flow runs with.
    #[must_use]
    pub fn settings(&self) -> &FlowSettings {
        &self.shared.settings
    }

    /// Returns the backend resolver used for document and asset links.
    #[must_use]
    pub fn endpoints(&self) -> &Endpoints {
        &self.shared.deps.endpoints
    }

    /// Returns the consent items of the loaded form.
    #[must_use]
    pub fn consent_items(&self) -> Vec<ConsentItem> {
        self.snapshot().form.map(|form| form.consent_items()).unwrap_or_default()
    }

    /// Returns the certificate download URL once a verification token exists.
    #[must_use]
    pub fn certificate_url(&self) -> Option<Url> {
        self.shared.document_url(CERTIFICATE_DOWNLOAD)
    }

    /// Returns the authorized terms download URL once a verification token exists.
    #[must_use]
    pub fn terms_url(&self) -> Option<Url> {
        self.shared.document_url(TERMS_DOWNLOAD)
    }

    /// Returns the company logo URL of the loaded form.
    #[must_use]
    pub fn logo_url(&self) -> Option<String> {
        let form = self.snapshot().form?;
        let logo = form.company.logo.as_deref()?;
        self.shared.deps.endpoints.logo_url(logo)
    }

    /// Returns true when the current personal data satisfies the verification type.
    #[must_use]
    pub fn validate_personal_data(&self) -> bool {
        let snapshot = self.snapshot();
        snapshot.inputs.personal.is_complete(snapshot.session.verification_type)
    }

    /// Loads the form named by `location` and resumes a biometric return.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError`] when the token is missing, the form cannot be
    /// loaded, or the biometric return fails.
    pub async fn open(&self, location: &PageLocation) -> Result<(), FlowError> {
        self.shared.open(location).await
    }

    /// Sets the national ID input, keeping only its digits.
    ///
    /// Length is not checked here; a search rejects anything but ten digits.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError`] when the flow is busy, closed, or finalized.
    pub fn set_national_id(&self, value: &str) -> Result<(), FlowError> {
        let digits = sanitize_national_id_input(value);
        self.shared.edit_inputs(|inputs| inputs.national_id = digits)
    }

    /// Sets the given name input.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError`] when the flow is busy, closed, or finalized.
    pub fn set_given_name(&self, value: &str) -> Result<(), FlowError> {
        let value = value.to_string();
        self.shared.edit_inputs(|inputs| inputs.personal.given_name = value)
    }

    /// Sets the family name input.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError`] when the flow is busy, closed, or finalized.
    pub fn set_family_name(&self, value: &str) -> Result<(), FlowError> {
        let value = value.to_string();
        self.shared.edit_inputs(|inputs| inputs.personal.family_name = value)
    }

    /// Sets the email input.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError`] when the flow is busy, closed, or finalized.
    pub fn set_email(&self, value: &str) -> Result<(), FlowError> {
        let value = value.to_string();
        self.shared.edit_inputs(|inputs| inputs.personal.email = value)
    }

    /// Sets the phone input.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError`] when the flow is busy, closed, or finalized.
    pub fn set_phone(&self, value: &str) -> Result<(), FlowError> {
        let value = value.to_string();
        self.shared.edit_inputs(|inputs| inputs.personal.phone = value)
    }

    /// Sets the verification code input.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError`] when the flow is busy, closed, or finalized.
    pub fn set_code(&self, value: &str) -> Result<(), FlowError> {
        let value = value.trim().to_string();
        self.shared.edit_inputs(|inputs| inputs.code = value)
    }

    /// Searches the typed national ID, resetting the session first.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError`] when the ID is malformed or the lookup fails.
    pub async fn search_national_id(&self) -> Result<(), FlowError> {
        self.shared.search_national_id().await
    }

    /// Confirms personal data and moves to consent selection.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Validation`] when the data is incomplete.
    pub fn confirm_personal_data(&self) -> Result<(), FlowError> {
        self.shared.confirm_personal_data()
    }

    /// Adds or removes a consent from the selection.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError`] when the consent is unknown or the step is wrong.
    pub fn toggle_consent(&self, id: ConsentId) -> Result<(), FlowError> {
        self.shared.toggle_consent(id)
    }

    /// Confirms the consent selection.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Validation`] when nothing is selected.
    pub fn confirm_consents(&self) -> Result<(), FlowError> {
        self.shared.confirm_consents()
    }

    /// Registers the consents and starts the verification branch.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError`] when registration fails or biometrics cannot start.
    pub async fn request_code(&self) -> Result<(), FlowError> {
        self.shared.request_code().await
    }

    /// Dispatches or re-dispatches the paid SMS code.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError`] when attempts are exhausted or the call fails.
    pub async fn resend_sms_code(&self) -> Result<(), FlowError> {
        self.shared.resend_sms_code().await
    }

    /// Verifies the typed code and finalizes on success.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError`] when the code is malformed, rejected, or finalize fails.
    pub async fn verify_code(&self) -> Result<(), FlowError> {
        self.shared.verify_code().await
    }

    /// Finalizes the consents; a no-op once finalized.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError`] when identity is not confirmed or the call fails.
    pub async fn finalize(&self) -> Result<(), FlowError> {
        self.shared.finalize().await
    }

    /// Resets the session, keeping the typed national ID.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError`] when the flow is busy or closed.
    pub fn reset(&self) -> Result<(), FlowError> {
        self.shared.reset(true)
    }

    /// Resets the session and clears the national ID for a new search.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError`] when the flow is busy or closed.
    pub fn search_another(&self) -> Result<(), FlowError> {
        self.shared.reset(false)
    }

    /// Stops background work and releases the reload guard.
    pub fn teardown(&self) {
        self.shared.teardown();
    }
}

// ============================================================================
// SECTION: Operations
// ============================================================================

impl FlowShared {
    /// Returns a clone of the latest snapshot.
    fn snapshot(&self) -> FlowSnapshot {
        self.state.borrow().clone()
    }

    /// Takes the in-flight guard without waiting.
    fn begin(&self) -> Result<MutexGuard<'_, ()>, FlowError> {
        self.ensure_open()?;
        self.op_lock.try_lock().map_err(|_| FlowError::Busy)
    }

    /// Fails with [`FlowError::Closed`] once teardown has run.
    ///
    /// Operations call this after every backend await so a response that
    /// lands after teardown is dropped instead of committed.
    fn ensure_open(&self) -> Result<(), FlowError> {
        if self.closed.load(Ordering::Acquire) { Err(FlowError::Closed) } else { Ok(()) }
    }

    /// Returns the loaded form of a usable session.
    fn ready_form(snapshot: &FlowSnapshot) -> Result<Arc<FormDefinition>, FlowError> {
        match (&snapshot.form, &snapshot.load_error) {
            (Some(form), None) => Ok(Arc::clone(form)),
            _ => Err(FlowError::FormUnavailable),
        }
    }

    /// Publishes `next` as the new snapshot and syncs the reload guard.
    ///
    /// Ignored once the flow is closed.
    fn commit(&self, next: FlowSnapshot) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        self.publish(next);
    }

    /// Publishes `next` unconditionally.
    fn publish(&self, mut next: FlowSnapshot) {
        let polling = self.tasks.lock().is_ok_and(|tasks| tasks.poll.is_some());
        let guarded = !self.closed.load(Ordering::Acquire)
            && !next.session.completed()
            && next.has_unsaved_data();
        self.state.send_modify(|current| {
            next.revision = current.revision.saturating_add(1);
            next.polling = polling;
            next.reload_guard = guarded;
            *current = next;
        });
        self.sync_guard(guarded);
    }

    /// Installs or removes the unload hook to match `wanted`.
    fn sync_guard(&self, wanted: bool) {
        let Ok(mut slot) = self.guard.lock() else {
            return;
        };
        if wanted && slot.is_none() {
            *slot = Some(UnloadGuard::install(Arc::clone(&self.deps.host), self.state.subscribe()));
        } else if !wanted {
            slot.take();
        }
    }

    /// Shows a notice with the configured time-to-live.
    fn notify(&self, level: NoticeLevel, message: String) {
        self.deps.notifier.notify(Notice {
            level,
            message,
            ttl: self.settings.notice_ttl,
        });
    }

    /// Records an audit event for an action that started in `before`.
    fn record(
        &self,
        action: FlowAction,
        before: FlowStep,
        outcome: FlowOutcome,
        error: Option<&FlowError>,
        attempt: Option<u32>,
    ) {
        let snapshot = self.snapshot();
        let event = FlowAuditEvent::new(FlowAuditEventParams {
            action,
            outcome,
            step_before: before,
            step_after: snapshot.session.step,
            form_token: snapshot.form_token.map(|token| token.as_str().to_string()),
            national_id: snapshot.session.national_id,
            http_status: error.and_then(FlowError::http_status),
            attempt,
            detail: error.map(|err| err.kind().to_string()),
        });
        self.deps.audit.record(&event);
    }

    /// Records the outcome of `result` and passes it through.
    fn finish(
        &self,
        action: FlowAction,
        before: FlowStep,
        result: Result<(), FlowError>,
    ) -> Result<(), FlowError> {
        match &result {
            Ok(()) => self.record(action, before, FlowOutcome::Ok, None, None),
            Err(err) => {
                let outcome = match err {
                    FlowError::Api(_)
                    | FlowError::Rejected(_)
                    | FlowError::BiometricUnavailable
                    | FlowError::BiometricFailed => FlowOutcome::Failed,
                    _ => FlowOutcome::Rejected,
                };
                self.record(action, before, outcome, Some(err), None);
            }
        }
        result
    }

    /// Notifies a validation error and returns it.
    fn reject(&self, err: ValidationError) -> FlowError {
        self.notify(NoticeLevel::Error, translate(err.message_key(), Vec::new()));
        FlowError::Validation(err)
    }

    /// Notifies a failed call with the server message or a fallback and returns it.
    fn fail_call(&self, err: ApiError, fallback_key: &str) -> FlowError {
        let message = err
            .server_message()
            .map_or_else(|| translate(fallback_key, Vec::new()), str::to_string);
        self.notify(NoticeLevel::Error, message);
        FlowError::Api(err)
    }

    // ------------------------------------------------------------------------
    // Load
    // ------------------------------------------------------------------------

    /// Loads the form and processes a biometric return.
    async fn open(&self, location: &PageLocation) -> Result<(), FlowError> {
        let _op = self.begin()?;
        let before = self.snapshot().session.step;
        let result = self.open_locked(location).await;
        self.finish(FlowAction::Open, before, result)
    }

    /// Loads the form with the in-flight guard held.
    async fn open_locked(&self, location: &PageLocation) -> Result<(), FlowError> {
        let current = self.snapshot();
        if current.form.is_some() {
            return Err(FlowError::WrongStep(current.session.step));
        }
        let Some(token) = location.form_token() else {
            let message = t!("flow.load.missing_token");
            let mut next = current;
            next.load_error = Some(message.clone());
            self.commit(next);
            self.notify(NoticeLevel::Error, message);
            return Err(FlowError::MissingToken);
        };
        let fetched = self.deps.forms.fetch_form(&token).await;
        self.ensure_open()?;
        match fetched {
            Ok(form) => {
                let mut next = current;
                next.session = SessionState::new(form.verification_type);
                next.form = Some(Arc::new(form));
                next.form_token = Some(token);
                next.load_error = None;
                self.commit(next);
            }
            Err(err) => {
                let message = load_error_message(&err);
                let mut next = current;
                next.form_token = Some(token);
                next.load_error = Some(message.clone());
                self.commit(next);
                self.notify(NoticeLevel::Error, message);
                return Err(FlowError::Api(err));
            }
        }
        match location.biometric_return() {
            Some(callback) => self.resume_biometric(callback).await,
            None => Ok(()),
        }
    }

    /// Applies a biometric provider return and finalizes on success.
    async fn resume_biometric(&self, callback: BiometricReturn) -> Result<(), FlowError> {
        let before = self.snapshot().session.step;
        let success = callback.is_success();
        let mut next = self.snapshot();
        next.session.verification_token = Some(callback.verification_token);
        if !success {
            self.commit(next);
            self.notify(NoticeLevel::Error, t!("flow.biometric.return_failed"));
            let err = FlowError::BiometricFailed;
            self.record(FlowAction::BiometricReturn, before, FlowOutcome::Failed, Some(&err), None);
            return Err(err);
        }
        next.session.advance(FlowStep::CodeVerified)?;
        next.session.biometric_verified = true;
        self.commit(next);
        self.notify(NoticeLevel::Success, t!("flow.biometric.return_success"));
        self.record(FlowAction::BiometricReturn, before, FlowOutcome::Ok, None, None);
        self.finalize_locked().await
    }

    // ------------------------------------------------------------------------
    // Inputs
    // ------------------------------------------------------------------------

    /// Applies an input edit and re-runs personal data validation.
    fn edit_inputs(
        &self,
        edit: impl FnOnce(&mut FormInputs),
    ) -> Result<(), FlowError> {
        let _op = self.begin()?;
        let mut next = self.snapshot();
        Self::ready_form(&next)?;
        if next.session.completed() {
            return Err(FlowError::WrongStep(FlowStep::Finalized));
        }
        edit(&mut next.inputs);
        revalidate(&mut next);
        self.commit(next);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    /// Resets the session and looks up the typed national ID.
    async fn search_national_id(&self) -> Result<(), FlowError> {
        let _op = self.begin()?;
        let before = self.snapshot().session.step;
        let result = self.search_locked().await;
        self.finish(FlowAction::Lookup, before, result)
    }

    /// Lookup body with the in-flight guard held.
    async fn search_locked(&self) -> Result<(), FlowError> {
        let current = self.snapshot();
        Self::ready_form(&current)?;
        let Some(token) = current.form_token.clone() else {
            return Err(FlowError::FormUnavailable);
        };
        let national_id =
            NationalId::parse(&current.inputs.national_id).map_err(|err| self.reject(err))?;
        self.stop_tasks();
        let mut next = reset_snapshot(&current, true);
        self.commit(next.clone());
        let found = self.deps.forms.find_client(&token, &national_id).await;
        self.ensure_open()?;
        let lookup = match found {
            Ok(lookup) => lookup,
            Err(err) => {
                self.notify(NoticeLevel::Error, t!("flow.lookup.failed"));
                return Err(FlowError::Api(err));
            }
        };
        next.session.advance(FlowStep::ClientLookupDone)?;
        next.session.national_id = Some(national_id);
        let server_message = lookup.message.clone().filter(|message| !message.is_empty());
        if let Some(client) = lookup.matched() {
            next.inputs.personal = PersonalData::from_client(client);
            next.session.client = Some(client.clone());
            let message = server_message
                .unwrap_or_else(|| t!("flow.lookup.found", name = client.given_name));
            self.notify(NoticeLevel::Success, message);
        } else {
            next.session.client = None;
            let message = server_message.unwrap_or_else(|| t!("flow.lookup.not_found"));
            self.notify(NoticeLevel::Info, message);
        }
        revalidate(&mut next);
        self.commit(next);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Personal Data and Consents
    // ------------------------------------------------------------------------

    /// Confirms personal data.
    fn confirm_personal_data(&self) -> Result<(), FlowError> {
        let _op = self.begin()?;
        let before = self.snapshot().session.step;
        let result = self.confirm_personal_locked();
        self.finish(FlowAction::PersonalData, before, result)
    }

    /// Personal data confirmation with the in-flight guard held.
    fn confirm_personal_locked(&self) -> Result<(), FlowError> {
        let mut next = self.snapshot();
        Self::ready_form(&next)?;
        let step = next.session.step;
        if !matches!(step, FlowStep::ClientLookupDone | FlowStep::PersonalDataComplete) {
            return Err(FlowError::WrongStep(step));
        }
        if !next.inputs.personal.is_complete(next.session.verification_type) {
            return Err(self.reject(ValidationError::IncompletePersonalData));
        }
        if step == FlowStep::ClientLookupDone {
            next.session.advance(FlowStep::PersonalDataComplete)?;
            self.commit(next);
        }
        Ok(())
    }

    /// Toggles a consent in the selection.
    fn toggle_consent(&self, id: ConsentId) -> Result<(), FlowError> {
        let _op = self.begin()?;
        let mut next = self.snapshot();
        let form = Self::ready_form(&next)?;
        let step = next.session.step;
        if !matches!(step, FlowStep::PersonalDataComplete | FlowStep::ConsentsSelected) {
            return Err(FlowError::WrongStep(step));
        }
        if !form.has_consent(id) {
            return Err(self.reject(ValidationError::UnknownConsent));
        }
        if !next.inputs.selected_consents.remove(&id) {
            next.inputs.selected_consents.insert(id);
        }
        if step == FlowStep::ConsentsSelected && next.inputs.selected_consents.is_empty() {
            next.session.advance(FlowStep::PersonalDataComplete)?;
        }
        self.commit(next);
        Ok(())
    }

    /// Confirms the consent selection.
    fn confirm_consents(&self) -> Result<(), FlowError> {
        let _op = self.begin()?;
        let before = self.snapshot().session.step;
        let result = self.confirm_consents_locked();
        self.finish(FlowAction::Consents, before, result)
    }

    /// Consent confirmation with the in-flight guard held.
    fn confirm_consents_locked(&self) -> Result<(), FlowError> {
        let mut next = self.snapshot();
        Self::ready_form(&next)?;
        let step = next.session.step;
        if !matches!(step, FlowStep::PersonalDataComplete | FlowStep::ConsentsSelected) {
            return Err(FlowError::WrongStep(step));
        }
        if next.inputs.selected_consents.is_empty() {
            return Err(self.reject(ValidationError::NoConsentSelected));
        }
        if step == FlowStep::PersonalDataComplete {
            next.session.advance(FlowStep::ConsentsSelected)?;
            self.commit(next);
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    /// Registers consents and follows the verification branch.
    async fn request_code(self: &Arc<Self>) -> Result<(), FlowError> {
        let _op = self.begin()?;
        let before = self.snapshot().session.step;
        let result = self.request_code_locked().await;
        self.finish(FlowAction::Register, before, result)
    }

    /// Registration with the in-flight guard held.
    async fn request_code_locked(self: &Arc<Self>) -> Result<(), FlowError> {
        let current = self.snapshot();
        Self::ready_form(&current)?;
        if current.session.step != FlowStep::ConsentsSelected {
            return Err(FlowError::WrongStep(current.session.step));
        }
        let Some(token) = current.form_token.clone() else {
            return Err(FlowError::FormUnavailable);
        };
        let payload = registration_payload(&current).map_err(|err| self.reject(err))?;
        let response = self.deps.forms.register(&token, &payload).await;
        self.ensure_open()?;
        let response = response.map_err(|err| self.fail_call(err, "flow.register.failed"))?;
        let kind = current.session.verification_type;
        let mut next = current;
        if let Some(verification_token) = response.verification_token.clone() {
            next.session.verification_token = Some(verification_token);
        }
        match response.route(kind) {
            RegistrationRoute::Biometric {
                redirect: Some((url, session)),
            } => {
                next.session.advance(FlowStep::BiometricRedirected)?;
                next.session.biometric_session = Some(session.clone());
                self.start_polling(session);
                self.commit(next);
                self.notify(NoticeLevel::Success, t!("flow.register.biometric_sent"));
                self.schedule_redirect(url);
            }
            RegistrationRoute::Biometric {
                redirect: None,
            } => {
                self.commit(next);
                self.notify(NoticeLevel::Error, t!("flow.register.biometric_unavailable"));
                return Err(FlowError::BiometricUnavailable);
            }
            RegistrationRoute::ManualSms => {
                next.session.advance(FlowStep::CodeRequested)?;
                next.session.delivery = Some(CodeDelivery::ManualSms {
                    step: SmsStep::AwaitingDispatch,
                });
                self.commit(next);
                self.notify(NoticeLevel::Info, t!("flow.register.manual_sms"));
            }
            RegistrationRoute::Dispatched {
                email,
                whatsapp,
            } => {
                next.session.advance(FlowStep::CodeRequested)?;
                next.session.delivery = Some(CodeDelivery::Dispatched {
                    email,
                    whatsapp,
                });
                self.commit(next);
                let mut message = t!("flow.register.code_sent");
                if email {
                    message.push_str(&t!("flow.register.channel_email"));
                }
                if whatsapp {
                    message.push_str(&t!("flow.register.channel_whatsapp"));
                }
                self.notify(NoticeLevel::Success, message);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Codes
    // ------------------------------------------------------------------------

    /// Dispatches the paid SMS code.
    async fn resend_sms_code(&self) -> Result<(), FlowError> {
        let _op = self.begin()?;
        let before = self.snapshot().session.step;
        let result = self.resend_sms_locked().await;
        let attempt = Some(self.snapshot().inputs.sms_attempts);
        match &result {
            Ok(()) => self.record(FlowAction::DispatchSms, before, FlowOutcome::Ok, None, attempt),
            Err(err) => {
                let outcome = if matches!(err, FlowError::Api(_) | FlowError::Rejected(_)) {
                    FlowOutcome::Failed
                } else {
                    FlowOutcome::Rejected
                };
                self.record(FlowAction::DispatchSms, before, outcome, Some(err), attempt);
            }
        }
        result
    }

    /// SMS dispatch with the in-flight guard held.
    async fn resend_sms_locked(&self) -> Result<(), FlowError> {
        let current = self.snapshot();
        Self::ready_form(&current)?;
        let step = current.session.step;
        if step != FlowStep::CodeRequested || current.session.sms_step().is_none() {
            return Err(FlowError::WrongStep(step));
        }
        let Some(token) = current.form_token.clone() else {
            return Err(FlowError::FormUnavailable);
        };
        if current.inputs.sms_attempts >= self.settings.max_sms_attempts {
            self.notify(NoticeLevel::Error, t!("flow.sms.exhausted"));
            return Err(FlowError::SmsAttemptsExhausted);
        }
        let mut counted = current;
        counted.inputs.sms_attempts = counted.inputs.sms_attempts.saturating_add(1);
        self.commit(counted);
        let response = self.deps.forms.request_code(&token).await;
        self.ensure_open()?;
        let response = response.map_err(|err| self.fail_call(err, "flow.sms.failed"))?;
        if !response.success {
            let message = response
                .message
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| t!("flow.sms.failed"));
            self.notify(NoticeLevel::Error, message.clone());
            return Err(FlowError::Rejected(message));
        }
        let mut next = self.snapshot();
        next.inputs.code.clear();
        next.session.delivery = Some(CodeDelivery::ManualSms {
            step: SmsStep::CodeSent,
        });
        self.commit(next);
        self.notify(NoticeLevel::Success, t!("flow.sms.resent"));
        Ok(())
    }

    /// Verifies the typed code and finalizes.
    async fn verify_code(&self) -> Result<(), FlowError> {
        let _op = self.begin()?;
        let before = self.snapshot().session.step;
        let result = self.verify_code_locked().await;
        let result = self.finish(FlowAction::VerifyCode, before, result);
        if result.is_err() {
            return result;
        }
        self.finalize_locked().await
    }

    /// Code verification with the in-flight guard held; does not finalize.
    async fn verify_code_locked(&self) -> Result<(), FlowError> {
        let current = self.snapshot();
        Self::ready_form(&current)?;
        let step = current.session.step;
        if step != FlowStep::CodeRequested || current.session.delivery.is_none() {
            return Err(FlowError::WrongStep(step));
        }
        let Some(token) = current.form_token.clone() else {
            return Err(FlowError::FormUnavailable);
        };
        let code = VerificationCode::parse(&current.inputs.code).map_err(|err| self.reject(err))?;
        let response = self.deps.forms.verify_code(&token, &code).await;
        self.ensure_open()?;
        let response = response.map_err(|err| self.fail_call(err, "flow.verify.invalid"))?;
        if !response.success {
            let message = response
                .message
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| t!("flow.verify.invalid"));
            self.notify(NoticeLevel::Error, message.clone());
            return Err(FlowError::Rejected(message));
        }
        let mut next = current;
        if next.session.sms_step().is_some() {
            next.session.delivery = Some(CodeDelivery::ManualSms {
                step: SmsStep::Verified,
            });
        }
        next.session.advance(FlowStep::CodeVerified)?;
        self.commit(next);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Finalize
    // ------------------------------------------------------------------------

    /// Finalizes with the in-flight guard taken here.
    async fn finalize(&self) -> Result<(), FlowError> {
        let _op = self.begin()?;
        self.finalize_locked().await
    }

    /// Finalize with the in-flight guard held; idempotent once finalized.
    async fn finalize_locked(&self) -> Result<(), FlowError> {
        let before = self.snapshot().session.step;
        if before == FlowStep::Finalized {
            return Ok(());
        }
        let result = self.finalize_call().await;
        self.finish(FlowAction::Finalize, before, result)
    }

    /// Issues the finalize call and commits the terminal step.
    async fn finalize_call(&self) -> Result<(), FlowError> {
        let current = self.snapshot();
        Self::ready_form(&current)?;
        if current.session.step != FlowStep::CodeVerified {
            return Err(FlowError::WrongStep(current.session.step));
        }
        let Some(token) = current.form_token.clone() else {
            return Err(FlowError::FormUnavailable);
        };
        let mut next = current;
        match registration_payload(&next) {
            Ok(payload) => {
                let response = self.deps.forms.register(&token, &payload).await;
                self.ensure_open()?;
                let response = response.map_err(|err| self.fail_call(err, "flow.finalize.failed"))?;
                next.session.documents = response.documents;
                if let Some(verification_token) = response.verification_token {
                    next.session.verification_token = Some(verification_token);
                }
            }
            Err(validation) => {
                let Some(verification_token) = next.session.verification_token.clone() else {
                    return Err(self.reject(validation));
                };
                let ack = self.deps.verification.complete_process(&verification_token).await;
                self.ensure_open()?;
                let ack = ack.map_err(|err| self.fail_call(err, "flow.finalize.failed"))?;
                if !ack.success {
                    let message = ack
                        .message
                        .or(ack.error)
                        .filter(|message| !message.is_empty())
                        .unwrap_or_else(|| t!("flow.finalize.failed"));
                    self.notify(NoticeLevel::Error, message.clone());
                    return Err(FlowError::Rejected(message));
                }
            }
        }
        next.session.advance(FlowStep::Finalized)?;
        self.stop_tasks();
        self.commit(next);
        self.notify(NoticeLevel::Success, t!("flow.finalize.success"));
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Reset and Teardown
    // ------------------------------------------------------------------------

    /// Resets the session.
    fn reset(&self, keep_national_id: bool) -> Result<(), FlowError> {
        let _op = self.begin()?;
        let before = self.snapshot().session.step;
        self.reset_locked(keep_national_id);
        self.record(FlowAction::Reset, before, FlowOutcome::Ok, None, None);
        Ok(())
    }

    /// Stops background work and rebuilds the session at [`FlowStep::Initial`].
    fn reset_locked(&self, keep_national_id: bool) {
        self.stop_tasks();
        self.commit(reset_snapshot(&self.snapshot(), keep_national_id));
    }

    /// Tears the flow down.
    fn teardown(&self) {
        let before = self.snapshot().session.step;
        self.closed.store(true, Ordering::Release);
        self.stop_tasks();
        self.publish(self.snapshot());
        self.record(FlowAction::Teardown, before, FlowOutcome::Ok, None, None);
    }

    /// Aborts the poll and redirect tasks.
    fn stop_tasks(&self) {
        if let Ok(mut tasks) = self.tasks.lock() {
            abort_all(&mut tasks);
        }
    }

    // ------------------------------------------------------------------------
    // Biometric Tasks
    // ------------------------------------------------------------------------

    /// Starts polling `session`, replacing any previous poll.
    fn start_polling(self: &Arc<Self>, session: SessionId) {
        let Ok(mut tasks) = self.tasks.lock() else {
            return;
        };
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        if let Some(handle) = tasks.poll.take() {
            handle.abort();
        }
        tasks.generation = tasks.generation.wrapping_add(1);
        let generation = tasks.generation;
        let weak = Arc::downgrade(self);
        let settings = self.settings;
        let task = tokio::spawn(poll_session(weak, session, generation, settings));
        tasks.poll = Some(task.abort_handle());
    }

    /// Navigates to the provider after the redirect delay.
    fn schedule_redirect(self: &Arc<Self>, url: String) {
        let Ok(mut tasks) = self.tasks.lock() else {
            return;
        };
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        if let Some(handle) = tasks.redirect.take() {
            handle.abort();
        }
        let weak = Arc::downgrade(self);
        let delay = self.settings.redirect_delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(shared) = weak.upgrade() {
                if let Ok(mut tasks) = shared.tasks.lock() {
                    tasks.redirect = None;
                }
                shared.deps.host.navigate(&url);
            }
        });
        tasks.redirect = Some(task.abort_handle());
    }

    /// Releases the poll slot if `generation` still owns it.
    fn release_poll(&self, generation: u64) -> bool {
        let Ok(mut tasks) = self.tasks.lock() else {
            return false;
        };
        if tasks.generation != generation || tasks.poll.is_none() {
            return false;
        }
        tasks.poll = None;
        true
    }

    /// Commits a terminal poll outcome.
    async fn conclude_poll(&self, generation: u64, outcome: PollEnd, attempt: u32) {
        let _op = self.op_lock.lock().await;
        if !self.release_poll(generation) {
            return;
        }
        let current = self.snapshot();
        let before = current.session.step;
        match outcome {
            PollEnd::Verified => {
                let mut next = current;
                if next.session.advance(FlowStep::CodeVerified).is_err() {
                    self.commit(next);
                    return;
                }
                next.session.biometric_verified = true;
                self.commit(next);
                self.record(FlowAction::Poll, before, FlowOutcome::Ok, None, Some(attempt));
                let _ = self.finalize_locked().await;
            }
            PollEnd::Failed => {
                self.commit(current);
                self.notify(NoticeLevel::Error, t!("flow.poll.failed"));
                let err = FlowError::BiometricFailed;
                self.record(FlowAction::Poll, before, FlowOutcome::Failed, Some(&err), Some(attempt));
            }
            PollEnd::TimedOut => {
                self.commit(current);
                self.notify(NoticeLevel::Error, t!("flow.poll.timeout"));
                self.record(FlowAction::Poll, before, FlowOutcome::Timeout, None, Some(attempt));
            }
        }
    }

    /// Builds a document URL from the verification token.
    fn document_url(&self, template: &str) -> Option<Url> {
        let snapshot = self.snapshot();
        let token = snapshot.session.verification_token?;
        self.deps.endpoints.url_for(template, &[("token", token.as_str())]).ok()
    }
}

// ============================================================================
// SECTION: Poll Task
// ============================================================================

/// Terminal poll results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollEnd {
    /// Completed and verified.
    Verified,
    /// Provider reported failure.
    Failed,
    /// Attempt cap reached.
    TimedOut,
}

/// Polls a provider session until it ends, the cap is reached, or the flow drops.
async fn poll_session(
    shared: Weak<FlowShared>,
    session: SessionId,
    generation: u64,
    settings: FlowSettings,
) {
    let mut attempt: u32 = 0;
    loop {
        tokio::time::sleep(settings.poll_interval).await;
        attempt = attempt.saturating_add(1);
        let Some(flow) = shared.upgrade() else {
            return;
        };
        let before = flow.snapshot().session.step;
        match flow.deps.verification.session_status(&session).await {
            Ok(report) => match report.outcome() {
                PollOutcome::Verified => {
                    flow.conclude_poll(generation, PollEnd::Verified, attempt).await;
                    return;
                }
                PollOutcome::Failed => {
                    flow.conclude_poll(generation, PollEnd::Failed, attempt).await;
                    return;
                }
                PollOutcome::Pending => {}
            },
            Err(err) => {
                let err = FlowError::Api(err);
                flow.record(FlowAction::Poll, before, FlowOutcome::Failed, Some(&err), Some(attempt));
            }
        }
        if attempt >= settings.max_poll_attempts {
            flow.conclude_poll(generation, PollEnd::TimedOut, attempt).await;
            return;
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Moves between lookup and personal-data steps to match the typed data.
fn revalidate(snapshot: &mut FlowSnapshot) {
    let complete = snapshot.inputs.personal.is_complete(snapshot.session.verification_type);
    let target = match (complete, snapshot.session.step) {
        (true, FlowStep::ClientLookupDone) => Some(FlowStep::PersonalDataComplete),
        (false, FlowStep::PersonalDataComplete | FlowStep::ConsentsSelected) => {
            Some(FlowStep::ClientLookupDone)
        }
        _ => None,
    };
    if let Some(step) = target {
        let _ = snapshot.session.advance(step);
    }
}

/// Returns `current` rebuilt at [`FlowStep::Initial`] with cleared inputs.
fn reset_snapshot(current: &FlowSnapshot, keep_national_id: bool) -> FlowSnapshot {
    let mut next = current.clone();
    next.session = SessionState::new(current.session.verification_type);
    next.inputs = FormInputs::default();
    if keep_national_id {
        next.inputs.national_id.clone_from(&current.inputs.national_id);
    }
    next
}

/// Builds the register/finalize payload from committed and typed data.
fn registration_payload(snapshot: &FlowSnapshot) -> Result<RegistrationPayload, ValidationError> {
    let national_id = snapshot.session.national_id.clone().ok_or(ValidationError::NationalId)?;
    let personal = &snapshot.inputs.personal;
    if !personal.is_complete(snapshot.session.verification_type) {
        return Err(ValidationError::IncompletePersonalData);
    }
    if snapshot.inputs.selected_consents.is_empty() {
        return Err(ValidationError::NoConsentSelected);
    }
    Ok(RegistrationPayload {
        national_id,
        given_name: personal.given_name.trim().to_string(),
        family_name: personal.family_name.trim().to_string(),
        email: personal.email_opt(),
        phone: personal.phone_opt(),
        consents: snapshot.inputs.selected_consents.iter().copied().collect(),
    })
}

/// Maps a form load failure to its user-facing message.
fn load_error_message(err: &ApiError) -> String {
    if err.status() == 404 {
        return t!("flow.load.not_found");
    }
    if err.is_network() {
        return t!("flow.load.network");
    }
    err.server_error().map_or_else(|| t!("flow.load.generic"), str::to_string)
}
