// crates/consentpro-client/src/http.rs
// ============================================================================
// Module: ConsentPro HTTP Client
// Description: reqwest-backed implementation of the form and provider contracts.
// Purpose: Issue backend calls with size limits and uniform error mapping.
// Dependencies: reqwest, serde, serde_json, consentpro-core
// ============================================================================

//! ## Overview
//! Every call resolves its URL from a fixed template, sends JSON, reads the
//! body under a hard byte limit, and decodes it into the core wire types.
//! Non-success statuses become [`ApiError::Status`] carrying the `message` and
//! `error` fields of the backend's error body when it has one.
//!
//! Security posture: responses are untrusted; bodies are size-limited,
//! redirects are never followed, and the bearer token is never logged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use consentpro_core::ApiError;
use consentpro_core::ClientLookup;
use consentpro_core::CodeResponse;
use consentpro_core::CreateSessionRequest;
use consentpro_core::Endpoints;
use consentpro_core::FormApi;
use consentpro_core::FormDefinition;
use consentpro_core::FormEnvelope;
use consentpro_core::FormToken;
use consentpro_core::NationalId;
use consentpro_core::PendingClients;
use consentpro_core::PendingClientsResponse;
use consentpro_core::ProcessAck;
use consentpro_core::RegistrationPayload;
use consentpro_core::RegistrationResponse;
use consentpro_core::SessionId;
use consentpro_core::SessionStatusReport;
use consentpro_core::VerificationApi;
use consentpro_core::VerificationCode;
use consentpro_core::VerificationSession;
use consentpro_core::VerificationToken;
use consentpro_core::VerifyCodeRequest;
use consentpro_core::endpoints::CLIENT_LOOKUP;
use consentpro_core::endpoints::FORM_BY_TOKEN;
use consentpro_core::endpoints::PROVIDER_COMPLETE_PROCESS;
use consentpro_core::endpoints::PROVIDER_CONFIG;
use consentpro_core::endpoints::PROVIDER_CREATE_SESSION;
use consentpro_core::endpoints::PROVIDER_PENDING_CLIENTS;
use consentpro_core::endpoints::PROVIDER_RESEND_DOCUMENTS;
use consentpro_core::endpoints::PROVIDER_SESSION_STATUS;
use consentpro_core::endpoints::REGISTER;
use consentpro_core::endpoints::REQUEST_CODE;
use consentpro_core::endpoints::VERIFY_CODE;
use reqwest::Client;
use reqwest::RequestBuilder;
use reqwest::header::ACCEPT;
use reqwest::header::AUTHORIZATION;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default maximum response body size.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;

/// Body decoded in place of an empty success response.
const EMPTY_OBJECT: &[u8] = b"{}";

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// HTTP client configuration.
///
/// # Invariants
/// - `base_url` is an absolute `http` or `https` URL.
/// - `max_response_bytes` is non-zero.
#[derive(Clone)]
pub struct ApiClientConfig {
    /// Backend base URL, e.g. `https://api.example.com`.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Optional bearer token sent on every request.
    pub bearer_token: Option<String>,
    /// Maximum accepted response body size in bytes.
    pub max_response_bytes: usize,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout: DEFAULT_TIMEOUT,
            bearer_token: None,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }
}

impl std::fmt::Debug for ApiClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClientConfig")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("max_response_bytes", &self.max_response_bytes)
            .finish()
    }
}

// ============================================================================
// SECTION: Wire Helpers
// ============================================================================

/// Error body returned by the backend on non-success statuses.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    /// Human-readable message.
    #[serde(default)]
    message: Option<String>,
    /// Short error description.
    #[serde(default)]
    error: Option<String>,
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// ConsentPro backend client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpApi {
    /// Underlying HTTP client.
    client: Client,
    /// URL resolver.
    endpoints: Endpoints,
    /// Response body limit.
    max_response_bytes: usize,
}

impl HttpApi {
    /// Builds a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Request`] when the base URL or bearer token is
    /// invalid or the HTTP client cannot be constructed.
    pub fn new(config: ApiClientConfig) -> Result<Self, ApiError> {
        if config.max_response_bytes == 0 {
            return Err(ApiError::Request("max_response_bytes must be non-zero".to_string()));
        }
        let endpoints =
            Endpoints::parse(&config.base_url).map_err(|err| ApiError::Request(err.to_string()))?;
        let client = Client::builder()
            .timeout(config.timeout)
            .redirect(Policy::none())
            .default_headers(default_headers(config.bearer_token.as_deref())?)
            .build()
            .map_err(|err| ApiError::Request(err.to_string()))?;
        Ok(Self {
            client,
            endpoints,
            max_response_bytes: config.max_response_bytes,
        })
    }

    /// Returns the URL resolver bound to the base URL.
    #[must_use]
    pub const fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Issues a GET request and decodes the JSON response.
    async fn get<T: DeserializeOwned>(
        &self,
        template: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = self.url(template, params)?;
        self.send(self.client.get(url)).await
    }

    /// Issues a POST request with an optional JSON body and decodes the response.
    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        template: &str,
        params: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let url = self.url(template, params)?;
        let mut request = self.client.post(url);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.send(request).await
    }

    /// Resolves a template into a URL.
    fn url(&self, template: &str, params: &[(&str, &str)]) -> Result<reqwest::Url, ApiError> {
        self.endpoints.url_for(template, params).map_err(|err| ApiError::Request(err.to_string()))
    }

    /// Sends a request and maps the response into a decoded value or error.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let body = read_response_body_with_limit(response, self.max_response_bytes).await?;
        if !status.is_success() {
            let parsed: ErrorBody = serde_json::from_slice(&body).unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: parsed.message,
                error: parsed.error,
            });
        }
        let bytes = if body.iter().all(u8::is_ascii_whitespace) { EMPTY_OBJECT } else { &body };
        serde_json::from_slice(bytes).map_err(|err| ApiError::Decode(err.to_string()))
    }
}

// ============================================================================
// SECTION: Contracts
// ============================================================================

#[async_trait]
impl FormApi for HttpApi {
    async fn fetch_form(&self, token: &FormToken) -> Result<FormDefinition, ApiError> {
        let envelope: FormEnvelope = self.get(FORM_BY_TOKEN, &[("token", token.as_str())]).await?;
        Ok(envelope.into_form())
    }

    async fn find_client(
        &self,
        token: &FormToken,
        national_id: &NationalId,
    ) -> Result<ClientLookup, ApiError> {
        self.get(CLIENT_LOOKUP, &[("token", token.as_str()), ("cedula", national_id.as_str())]).await
    }

    async fn register(
        &self,
        token: &FormToken,
        payload: &RegistrationPayload,
    ) -> Result<RegistrationResponse, ApiError> {
        self.post(REGISTER, &[("token", token.as_str())], Some(payload)).await
    }

    async fn request_code(&self, token: &FormToken) -> Result<CodeResponse, ApiError> {
        self.post::<Value, _>(REQUEST_CODE, &[("token", token.as_str())], None).await
    }

    async fn verify_code(
        &self,
        token: &FormToken,
        code: &VerificationCode,
    ) -> Result<CodeResponse, ApiError> {
        let body = VerifyCodeRequest {
            token: token.as_str(),
            code: code.as_str(),
        };
        self.post(VERIFY_CODE, &[], Some(&body)).await
    }
}

#[async_trait]
impl VerificationApi for HttpApi {
    async fn create_session(
        &self,
        token: &VerificationToken,
        premium: bool,
    ) -> Result<VerificationSession, ApiError> {
        let body = CreateSessionRequest {
            verification_token: token,
            is_premium: premium,
        };
        self.post(PROVIDER_CREATE_SESSION, &[], Some(&body)).await
    }

    async fn session_status(&self, session: &SessionId) -> Result<SessionStatusReport, ApiError> {
        self.get(PROVIDER_SESSION_STATUS, &[("id", session.as_str())]).await
    }

    async fn provider_config(&self) -> Result<Value, ApiError> {
        self.get(PROVIDER_CONFIG, &[]).await
    }

    async fn resend_documents(&self, token: &VerificationToken) -> Result<ProcessAck, ApiError> {
        self.post::<Value, _>(PROVIDER_RESEND_DOCUMENTS, &[("token", token.as_str())], None).await
    }

    async fn complete_process(&self, token: &VerificationToken) -> Result<ProcessAck, ApiError> {
        self.post::<Value, _>(PROVIDER_COMPLETE_PROCESS, &[("token", token.as_str())], None).await
    }

    async fn pending_clients(&self) -> Result<PendingClients, ApiError> {
        let response: PendingClientsResponse = self.get(PROVIDER_PENDING_CLIENTS, &[]).await?;
        Ok(response.normalize())
    }
}

// ============================================================================
// SECTION: HTTP Helpers
// ============================================================================

/// Builds the headers sent on every request.
fn default_headers(bearer_token: Option<&str>) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    if let Some(token) = bearer_token {
        let mut header = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ApiError::Request("invalid bearer token header".to_string()))?;
        header.set_sensitive(true);
        headers.insert(AUTHORIZATION, header);
    }
    Ok(headers)
}

/// Maps a reqwest send failure onto the api error taxonomy.
fn map_transport_error(err: reqwest::Error) -> ApiError {
    if err.is_builder() {
        ApiError::Request(err.to_string())
    } else {
        ApiError::Network(err.to_string())
    }
}

/// Reads a response body while enforcing a hard byte limit.
async fn read_response_body_with_limit(
    mut response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, ApiError> {
    let mut body = Vec::new();
    let mut total: usize = 0;
    while let Some(chunk) = response.chunk().await.map_err(|err| ApiError::Network(err.to_string()))? {
        let next_total = total.checked_add(chunk.len()).ok_or(ApiError::ResponseTooLarge {
            actual: usize::MAX,
            limit,
        })?;
        if next_total > limit {
            return Err(ApiError::ResponseTooLarge {
                actual: next_total,
                limit,
            });
        }
        body.extend_from_slice(&chunk);
        total = next_total;
    }
    Ok(body)
}
