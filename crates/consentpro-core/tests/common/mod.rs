// crates/consentpro-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Scripted backends and recording sinks for flow tests.
// Purpose: Build a flow wired to in-memory collaborators with inspectable calls.
// Dependencies: consentpro-core, async-trait, serde_json
// ============================================================================

//! ## Overview
//! Each fake answers from a queue of scripted responses and records the calls
//! it receives. Empty queues fall back to a benign success so tests only
//! script the calls they care about.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    dead_code,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use consentpro_core::ApiError;
use consentpro_core::ClientLookup;
use consentpro_core::ClientRecord;
use consentpro_core::CodeResponse;
use consentpro_core::ConsentId;
use consentpro_core::Endpoints;
use consentpro_core::FlowAuditEvent;
use consentpro_core::FlowAuditSink;
use consentpro_core::FlowDeps;
use consentpro_core::FlowSettings;
use consentpro_core::FormApi;
use consentpro_core::FormDefinition;
use consentpro_core::FormToken;
use consentpro_core::NationalId;
use consentpro_core::Notice;
use consentpro_core::Notifier;
use consentpro_core::PageHost;
use consentpro_core::PageLocation;
use consentpro_core::PendingClients;
use consentpro_core::ProcessAck;
use consentpro_core::PublicFormFlow;
use consentpro_core::RegistrationPayload;
use consentpro_core::RegistrationResponse;
use consentpro_core::SessionId;
use consentpro_core::SessionStatusReport;
use consentpro_core::UnloadHook;
use consentpro_core::UnloadHookId;
use consentpro_core::VerificationApi;
use consentpro_core::VerificationCode;
use consentpro_core::VerificationSession;
use consentpro_core::VerificationToken;
use consentpro_core::VerificationType;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Form token used by every fixture.
pub const FORM_TOKEN: &str = "abc123";
/// National ID used by every fixture.
pub const NATIONAL_ID: &str = "1234567890";

/// Builds a form with two consent types and the given verification type.
pub fn form(kind: VerificationType) -> FormDefinition {
    FormDefinition {
        id: 7,
        name: "Formulario Demo".to_string(),
        verification_type: kind,
        consent_types: vec!["datos_personales".to_string(), "marketing".to_string()],
        ..FormDefinition::default()
    }
}

/// Builds a complete client record.
pub fn client() -> ClientRecord {
    ClientRecord {
        id: 1,
        national_id: NATIONAL_ID.to_string(),
        given_name: "Ana".to_string(),
        family_name: Some("Pérez".to_string()),
        email: Some("ana@x.com".to_string()),
        phone: Some("0991234567".to_string()),
        ..ClientRecord::default()
    }
}

/// Lookup response naming `client()`.
pub fn found() -> ClientLookup {
    ClientLookup {
        found: true,
        client: Some(client()),
        message: None,
    }
}

/// Lookup response with no client.
pub fn not_found() -> ClientLookup {
    ClientLookup::default()
}

/// Status report in the given wire form.
pub fn status(raw: Value) -> SessionStatusReport {
    serde_json::from_value(raw).unwrap()
}

/// Registration response in the given wire form.
pub fn registration(raw: Value) -> RegistrationResponse {
    serde_json::from_value(raw).unwrap()
}

/// Biometric registration response with redirect data.
pub fn biometric_registration() -> RegistrationResponse {
    registration(json!({
        "tipo_verificacion": "biometria",
        "verification_url": "https://v/1",
        "session_id": "s1",
        "token_verificacion": "t1"
    }))
}

// ============================================================================
// SECTION: Form Backend
// ============================================================================

/// Scripted public form backend.
pub struct FakeForms {
    /// Form fetch result.
    pub form: Mutex<Result<FormDefinition, ApiError>>,
    /// Client lookup result.
    pub lookup: Mutex<Result<ClientLookup, ApiError>>,
    /// Queued register results.
    pub register: Mutex<VecDeque<Result<RegistrationResponse, ApiError>>>,
    /// Queued request-code results.
    pub request_code: Mutex<VecDeque<Result<CodeResponse, ApiError>>>,
    /// Queued verify-code results.
    pub verify: Mutex<VecDeque<Result<CodeResponse, ApiError>>>,
    /// Call log by operation name.
    pub calls: Mutex<Vec<&'static str>>,
    /// Register payloads received.
    pub payloads: Mutex<Vec<RegistrationPayload>>,
    /// Codes received.
    pub codes: Mutex<Vec<String>>,
    /// Delay applied before answering a lookup.
    pub lookup_delay: Mutex<Option<Duration>>,
    /// Delay applied before answering a register call.
    pub register_delay: Mutex<Option<Duration>>,
}

impl FakeForms {
    /// Creates a backend serving `form` and `lookup`.
    pub fn new(form: FormDefinition, lookup: ClientLookup) -> Self {
        Self {
            form: Mutex::new(Ok(form)),
            lookup: Mutex::new(Ok(lookup)),
            register: Mutex::new(VecDeque::new()),
            request_code: Mutex::new(VecDeque::new()),
            verify: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            payloads: Mutex::new(Vec::new()),
            codes: Mutex::new(Vec::new()),
            lookup_delay: Mutex::new(None),
            register_delay: Mutex::new(None),
        }
    }

    /// Queues a register result.
    pub fn push_register(&self, result: Result<RegistrationResponse, ApiError>) {
        self.register.lock().unwrap().push_back(result);
    }

    /// Queues a request-code result.
    pub fn push_request_code(&self, result: Result<CodeResponse, ApiError>) {
        self.request_code.lock().unwrap().push_back(result);
    }

    /// Queues a verify-code result.
    pub fn push_verify(&self, result: Result<CodeResponse, ApiError>) {
        self.verify.lock().unwrap().push_back(result);
    }

    /// Counts calls to `name`.
    pub fn count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|call| **call == name).count()
    }

    /// Records a call.
    fn log(&self, name: &'static str) {
        self.calls.lock().unwrap().push(name);
    }
}

/// Successful code response.
fn code_ok() -> CodeResponse {
    CodeResponse {
        success: true,
        message: None,
    }
}

#[async_trait]
impl FormApi for FakeForms {
    async fn fetch_form(&self, _token: &FormToken) -> Result<FormDefinition, ApiError> {
        self.log("fetch_form");
        self.form.lock().unwrap().clone()
    }

    async fn find_client(
        &self,
        _token: &FormToken,
        _national_id: &NationalId,
    ) -> Result<ClientLookup, ApiError> {
        self.log("find_client");
        let delay = *self.lookup_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.lookup.lock().unwrap().clone()
    }

    async fn register(
        &self,
        _token: &FormToken,
        payload: &RegistrationPayload,
    ) -> Result<RegistrationResponse, ApiError> {
        self.log("register");
        self.payloads.lock().unwrap().push(payload.clone());
        let delay = *self.register_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.register.lock().unwrap().pop_front().unwrap_or_else(|| Ok(RegistrationResponse::default()))
    }

    async fn request_code(&self, _token: &FormToken) -> Result<CodeResponse, ApiError> {
        self.log("request_code");
        self.request_code.lock().unwrap().pop_front().unwrap_or_else(|| Ok(code_ok()))
    }

    async fn verify_code(
        &self,
        _token: &FormToken,
        code: &VerificationCode,
    ) -> Result<CodeResponse, ApiError> {
        self.log("verify_code");
        self.codes.lock().unwrap().push(code.as_str().to_string());
        self.verify.lock().unwrap().pop_front().unwrap_or_else(|| Ok(code_ok()))
    }
}

// ============================================================================
// SECTION: Verification Backend
// ============================================================================

/// Scripted biometric provider backend.
#[derive(Default)]
pub struct FakeVerification {
    /// Queued status reports; empty means pending.
    pub statuses: Mutex<VecDeque<Result<SessionStatusReport, ApiError>>>,
    /// Queued complete-process results.
    pub completions: Mutex<VecDeque<Result<ProcessAck, ApiError>>>,
    /// Call log by operation name.
    pub calls: Mutex<Vec<&'static str>>,
    /// Tokens passed to complete-process.
    pub completed_tokens: Mutex<Vec<String>>,
}

impl FakeVerification {
    /// Queues a status report.
    pub fn push_status(&self, result: Result<SessionStatusReport, ApiError>) {
        self.statuses.lock().unwrap().push_back(result);
    }

    /// Counts calls to `name`.
    pub fn count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|call| **call == name).count()
    }

    /// Records a call.
    fn log(&self, name: &'static str) {
        self.calls.lock().unwrap().push(name);
    }
}

#[async_trait]
impl VerificationApi for FakeVerification {
    async fn create_session(
        &self,
        token: &VerificationToken,
        _premium: bool,
    ) -> Result<VerificationSession, ApiError> {
        self.log("create_session");
        Ok(VerificationSession {
            session_id: SessionId::new("s1"),
            verification_url: "https://v/1".to_string(),
            verification_token: Some(token.clone()),
        })
    }

    async fn session_status(&self, _session: &SessionId) -> Result<SessionStatusReport, ApiError> {
        self.log("session_status");
        self.statuses.lock().unwrap().pop_front().unwrap_or_else(|| Ok(SessionStatusReport::default()))
    }

    async fn provider_config(&self) -> Result<Value, ApiError> {
        self.log("provider_config");
        Ok(json!({}))
    }

    async fn resend_documents(&self, _token: &VerificationToken) -> Result<ProcessAck, ApiError> {
        self.log("resend_documents");
        Ok(ProcessAck {
            success: true,
            ..ProcessAck::default()
        })
    }

    async fn complete_process(&self, token: &VerificationToken) -> Result<ProcessAck, ApiError> {
        self.log("complete_process");
        self.completed_tokens.lock().unwrap().push(token.as_str().to_string());
        self.completions.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(ProcessAck {
                success: true,
                ..ProcessAck::default()
            })
        })
    }

    async fn pending_clients(&self) -> Result<PendingClients, ApiError> {
        self.log("pending_clients");
        Ok(PendingClients::default())
    }
}

// ============================================================================
// SECTION: Recording Sinks
// ============================================================================

/// Notifier that keeps every notice.
#[derive(Default)]
pub struct RecordingNotifier {
    /// Notices in arrival order.
    pub notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    /// Returns notice texts in arrival order.
    pub fn messages(&self) -> Vec<String> {
        self.notices.lock().unwrap().iter().map(|notice| notice.message.clone()).collect()
    }

    /// Returns the latest notice.
    pub fn last(&self) -> Option<Notice> {
        self.notices.lock().unwrap().last().cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

/// Page host that records navigation and unload hooks.
#[derive(Default)]
pub struct RecordingHost {
    /// Navigation targets.
    pub navigations: Mutex<Vec<String>>,
    /// Installed hooks by handle.
    pub hooks: Mutex<BTreeMap<u64, UnloadHook>>,
    /// Next hook handle.
    next: AtomicU64,
}

impl RecordingHost {
    /// Returns true when an installed hook asks for unload confirmation.
    pub fn would_confirm_unload(&self) -> bool {
        let hooks: Vec<UnloadHook> = self.hooks.lock().unwrap().values().cloned().collect();
        hooks.iter().any(|hook| hook())
    }

    /// Returns the number of installed hooks.
    pub fn hook_count(&self) -> usize {
        self.hooks.lock().unwrap().len()
    }
}

impl PageHost for RecordingHost {
    fn navigate(&self, url: &str) {
        self.navigations.lock().unwrap().push(url.to_string());
    }

    fn install_unload_hook(&self, hook: UnloadHook) -> UnloadHookId {
        let id = self.next.fetch_add(1, Ordering::SeqCst);
        self.hooks.lock().unwrap().insert(id, hook);
        UnloadHookId::new(id)
    }

    fn remove_unload_hook(&self, id: UnloadHookId) {
        self.hooks.lock().unwrap().remove(&id.get());
    }
}

/// Audit sink that keeps every event.
#[derive(Default)]
pub struct RecordingAudit {
    /// Events in arrival order.
    pub events: Mutex<Vec<FlowAuditEvent>>,
}

impl FlowAuditSink for RecordingAudit {
    fn record(&self, event: &FlowAuditEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Flow wired to fakes.
pub struct Harness {
    /// Flow under test.
    pub flow: PublicFormFlow,
    /// Form backend.
    pub forms: Arc<FakeForms>,
    /// Provider backend.
    pub verification: Arc<FakeVerification>,
    /// Notices.
    pub notices: Arc<RecordingNotifier>,
    /// Page host.
    pub host: Arc<RecordingHost>,
    /// Audit events.
    pub audit: Arc<RecordingAudit>,
}

impl Harness {
    /// Builds a harness with default settings.
    pub fn new(form: FormDefinition, lookup: ClientLookup) -> Self {
        Self::with_settings(form, lookup, FlowSettings::default())
    }

    /// Builds a harness with explicit settings.
    pub fn with_settings(form: FormDefinition, lookup: ClientLookup, settings: FlowSettings) -> Self {
        let forms = Arc::new(FakeForms::new(form, lookup));
        let verification = Arc::new(FakeVerification::default());
        let notices = Arc::new(RecordingNotifier::default());
        let host = Arc::new(RecordingHost::default());
        let audit = Arc::new(RecordingAudit::default());
        let deps = FlowDeps::new(
            forms.clone(),
            verification.clone(),
            notices.clone(),
            host.clone(),
            Endpoints::parse("http://localhost:8000").unwrap(),
        )
        .with_audit(audit.clone());
        Self {
            flow: PublicFormFlow::new(deps, settings),
            forms,
            verification,
            notices,
            host,
            audit,
        }
    }

    /// Opens the flow at the fixture token.
    pub async fn open(&self) {
        self.flow.open(&PageLocation::from_token(FORM_TOKEN)).await.unwrap();
    }

    /// Opens, searches the fixture ID, and confirms prefilled data and the first consent.
    pub async fn ready_to_register(&self) {
        self.open().await;
        self.flow.set_national_id(NATIONAL_ID).unwrap();
        self.flow.search_national_id().await.unwrap();
        self.flow.confirm_personal_data().unwrap();
        self.flow.toggle_consent(ConsentId::new(1)).unwrap();
        self.flow.confirm_consents().unwrap();
    }
}
