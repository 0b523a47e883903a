// crates/consentpro-client/tests/common/mod.rs
// ============================================================================
// Module: Client Test Helpers
// Description: Scripted tiny_http backend for HTTP client tests.
// Purpose: Serve canned responses and record the requests the client sends.
// Dependencies: consentpro-client, tiny_http
// ============================================================================

//! ## Overview
//! The backend runs on a plain thread so async tests can await the client
//! while tiny_http answers synchronously.

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

use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use consentpro_client::ApiClientConfig;
use consentpro_client::HttpApi;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

/// Request observed by the scripted backend.
#[derive(Debug, Clone)]
pub struct Seen {
    /// HTTP method.
    pub method: String,
    /// Path and query.
    pub url: String,
    /// `Authorization` header value.
    pub authorization: Option<String>,
    /// Raw request body.
    pub body: String,
}

/// Backend that answers each request with the next scripted response.
pub struct ScriptedBackend {
    /// Base URL of the listener.
    pub base_url: String,
    /// Requests observed so far.
    pub seen: Arc<Mutex<Vec<Seen>>>,
    /// Server thread.
    handle: Option<thread::JoinHandle<()>>,
}

impl ScriptedBackend {
    /// Starts a backend that serves `replies` in order, then stops.
    pub fn start(replies: Vec<(u16, String)>) -> Self {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = Arc::clone(&seen);
        let handle = thread::spawn(move || {
            for (status, body) in replies {
                let Ok(Some(mut request)) = server.recv_timeout(Duration::from_secs(5)) else {
                    return;
                };
                let mut text = String::new();
                let _ = request.as_reader().read_to_string(&mut text);
                let authorization = request
                    .headers()
                    .iter()
                    .find(|header| header.field.equiv("Authorization"))
                    .map(|header| header.value.as_str().to_string());
                record.lock().unwrap().push(Seen {
                    method: request.method().as_str().to_string(),
                    url: request.url().to_string(),
                    authorization,
                    body: text,
                });
                let content_type = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap();
                let response = Response::from_string(body).with_status_code(status).with_header(content_type);
                let _ = request.respond(response);
            }
        });
        Self {
            base_url: format!("http://{addr}"),
            seen,
            handle: Some(handle),
        }
    }

    /// Starts a backend answering a single request with JSON.
    pub fn once(status: u16, body: &str) -> Self {
        Self::start(vec![(status, body.to_string())])
    }

    /// Builds a client pointed at this backend.
    pub fn client(&self) -> HttpApi {
        HttpApi::new(self.config()).unwrap()
    }

    /// Client configuration pointed at this backend.
    pub fn config(&self) -> ApiClientConfig {
        ApiClientConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(5),
            ..ApiClientConfig::default()
        }
    }

    /// Waits for the backend thread and returns the observed requests.
    pub fn finish(mut self) -> Vec<Seen> {
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap();
        }
        self.seen.lock().unwrap().clone()
    }
}
