// crates/consentpro-cli/src/tests/support.rs
// ============================================================================
// Module: CLI Test Support Helpers
// Description: In-memory backends and capture buffers for CLI unit tests.
// Purpose: Run the wizard and terminal collaborators without a network.
// Dependencies: async-trait, consentpro-core, serde_json
// ============================================================================

#![allow(dead_code, reason = "Helpers are shared across test modules.")]

use std::collections::VecDeque;
use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use consentpro_core::ApiError;
use consentpro_core::ClientLookup;
use consentpro_core::ClientRecord;
use consentpro_core::CodeResponse;
use consentpro_core::Endpoints;
use consentpro_core::FlowDeps;
use consentpro_core::FlowSettings;
use consentpro_core::FormApi;
use consentpro_core::FormDefinition;
use consentpro_core::FormToken;
use consentpro_core::NationalId;
use consentpro_core::NoticeBoard;
use consentpro_core::PageLocation;
use consentpro_core::PendingClients;
use consentpro_core::ProcessAck;
use consentpro_core::PublicFormFlow;
use consentpro_core::RegistrationPayload;
use consentpro_core::RegistrationResponse;
use consentpro_core::SessionId;
use consentpro_core::SessionStatusReport;
use consentpro_core::VerificationApi;
use consentpro_core::VerificationCode;
use consentpro_core::VerificationSession;
use consentpro_core::VerificationToken;
use consentpro_core::VerificationType;
use serde_json::Value;
use serde_json::json;

use crate::terminal::TerminalHost;

/// Form token used by every fixture.
pub const FORM_TOKEN: &str = "abc123";
/// National ID used by every fixture.
pub const NATIONAL_ID: &str = "1234567890";
/// Base URL the fixtures resolve links against.
pub const API_BASE: &str = "http://api.test";

// ============================================================================
// SECTION: Capture Buffer
// ============================================================================

/// Cloneable writer whose bytes can be read back.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Returns everything written so far.
    pub fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Form with two catalog consent types.
pub fn form(kind: VerificationType) -> FormDefinition {
    FormDefinition {
        id: 7,
        name: "Formulario Demo".to_string(),
        verification_type: kind,
        consent_types: vec!["datos_personales".to_string(), "marketing".to_string()],
        ..FormDefinition::default()
    }
}

/// Lookup response naming a complete client.
pub fn found() -> ClientLookup {
    ClientLookup {
        found: true,
        client: Some(ClientRecord {
            id: 1,
            national_id: NATIONAL_ID.to_string(),
            given_name: "Ana".to_string(),
            family_name: Some("Pérez".to_string()),
            email: Some("ana@x.com".to_string()),
            phone: Some("0991234567".to_string()),
            ..ClientRecord::default()
        }),
        message: None,
    }
}

// ============================================================================
// SECTION: Backends
// ============================================================================

/// Scripted public form backend.
pub struct FakeForms {
    /// Form served to every fetch.
    form: FormDefinition,
    /// Lookup served to every search.
    lookup: ClientLookup,
    /// Queued register results; empty means a default success.
    pub register: Mutex<VecDeque<RegistrationResponse>>,
    /// Call log by operation name.
    pub calls: Mutex<Vec<&'static str>>,
    /// Codes received.
    pub codes: Mutex<Vec<String>>,
}

impl FakeForms {
    /// Creates a backend serving `form` and `lookup`.
    pub fn new(form: FormDefinition, lookup: ClientLookup) -> Self {
        Self {
            form,
            lookup,
            register: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            codes: Mutex::new(Vec::new()),
        }
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
impl FormApi for FakeForms {
    async fn fetch_form(&self, _token: &FormToken) -> Result<FormDefinition, ApiError> {
        self.log("fetch_form");
        Ok(self.form.clone())
    }

    async fn find_client(
        &self,
        _token: &FormToken,
        _national_id: &NationalId,
    ) -> Result<ClientLookup, ApiError> {
        self.log("find_client");
        Ok(self.lookup.clone())
    }

    async fn register(
        &self,
        _token: &FormToken,
        _payload: &RegistrationPayload,
    ) -> Result<RegistrationResponse, ApiError> {
        self.log("register");
        Ok(self.register.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn request_code(&self, _token: &FormToken) -> Result<CodeResponse, ApiError> {
        self.log("request_code");
        Ok(CodeResponse {
            success: true,
            message: None,
        })
    }

    async fn verify_code(
        &self,
        _token: &FormToken,
        code: &VerificationCode,
    ) -> Result<CodeResponse, ApiError> {
        self.log("verify_code");
        self.codes.lock().unwrap().push(code.as_str().to_string());
        Ok(CodeResponse {
            success: true,
            message: None,
        })
    }
}

/// Scripted biometric provider.
#[derive(Default)]
pub struct FakeVerification {
    /// Queued status reports; empty means pending.
    pub statuses: Mutex<VecDeque<SessionStatusReport>>,
}

#[async_trait]
impl VerificationApi for FakeVerification {
    async fn create_session(
        &self,
        token: &VerificationToken,
        _premium: bool,
    ) -> Result<VerificationSession, ApiError> {
        Ok(VerificationSession {
            session_id: SessionId::new("s1"),
            verification_url: "https://v/1".to_string(),
            verification_token: Some(token.clone()),
        })
    }

    async fn session_status(&self, _session: &SessionId) -> Result<SessionStatusReport, ApiError> {
        Ok(self.statuses.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn provider_config(&self) -> Result<Value, ApiError> {
        Ok(json!({}))
    }

    async fn resend_documents(&self, _token: &VerificationToken) -> Result<ProcessAck, ApiError> {
        Ok(ProcessAck::default())
    }

    async fn complete_process(&self, _token: &VerificationToken) -> Result<ProcessAck, ApiError> {
        Ok(ProcessAck {
            success: true,
            ..ProcessAck::default()
        })
    }

    async fn pending_clients(&self) -> Result<PendingClients, ApiError> {
        Ok(PendingClients::default())
    }
}

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Flow wired to fakes and a capturing terminal host.
pub struct Harness {
    /// Flow under test.
    pub flow: PublicFormFlow,
    /// Form backend.
    pub forms: Arc<FakeForms>,
    /// Provider backend.
    pub verification: Arc<FakeVerification>,
    /// Terminal host.
    pub host: Arc<TerminalHost>,
    /// Lines the host printed.
    pub host_output: SharedBuffer,
}

impl Harness {
    /// Builds a harness with default settings.
    pub fn new(forms: FakeForms) -> Self {
        let forms = Arc::new(forms);
        let verification = Arc::new(FakeVerification::default());
        let host_output = SharedBuffer::default();
        let host = Arc::new(TerminalHost::with_writer(Box::new(host_output.clone())));
        let deps = FlowDeps::new(
            forms.clone(),
            verification.clone(),
            Arc::new(NoticeBoard::new()),
            host.clone(),
            Endpoints::parse(API_BASE).unwrap(),
        );
        Self {
            flow: PublicFormFlow::new(deps, FlowSettings::default()),
            forms,
            verification,
            host,
            host_output,
        }
    }

    /// Opens the fixture form.
    pub async fn open(&self) {
        self.flow.open(&PageLocation::from_token(FORM_TOKEN)).await.unwrap();
    }
}
