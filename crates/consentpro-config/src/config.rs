// crates/consentpro-config/src/config.rs
// ============================================================================
// Module: ConsentPro Configuration
// Description: Configuration loading and validation for ConsentPro tools.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: consentpro-core, consentpro-client, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section is optional and falls back to the runtime defaults. Values
//! that would make the flow misbehave, such as a zero poll interval, fail
//! validation instead of being clamped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use consentpro_client::ApiClientConfig;
use consentpro_client::DEFAULT_MAX_RESPONSE_BYTES;
use consentpro_core::Endpoints;
use consentpro_core::FileFlowAuditSink;
use consentpro_core::FlowAuditSink;
use consentpro_core::FlowSettings;
use consentpro_core::NoopFlowAuditSink;
use consentpro_core::StderrFlowAuditSink;
use consentpro_core::i18n::Locale;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "consentpro.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "CONSENTPRO_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Upper bound for the request timeout.
const MAX_TIMEOUT_MS: u64 = 300_000;
/// Upper bound for the response body limit.
const MAX_RESPONSE_BYTES_LIMIT: usize = 64 * 1024 * 1024;
/// Lower bound for the poll interval.
const MIN_POLL_INTERVAL_MS: u64 = 100;
/// Upper bound for any flow delay.
const MAX_FLOW_DELAY_MS: u64 = 600_000;
/// Upper bound for poll attempts.
const MAX_POLL_ATTEMPTS_LIMIT: u32 = 10_000;
/// Upper bound for SMS attempts.
const MAX_SMS_ATTEMPTS_LIMIT: u32 = 20;

// ============================================================================
// SECTION: Root
// ============================================================================

/// ConsentPro configuration.
///
/// # Invariants
/// - A value returned by [`ConsentProConfig::load`] has passed [`ConsentProConfig::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentProConfig {
    /// Backend connection settings.
    #[serde(default)]
    pub api: ApiConfig,
    /// Flow timing and limits.
    #[serde(default)]
    pub flow: FlowConfig,
    /// Audit output settings.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Message language settings.
    #[serde(default)]
    pub locale: LocaleConfig,
}

impl ConsentProConfig {
    /// Loads configuration using the default resolution rules.
    ///
    /// Resolution order: `path`, then `CONSENTPRO_CONFIG`, then
    /// `consentpro.toml` in the working directory. Only the last one may be
    /// absent, in which case defaults are returned.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, explicit) = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = match fs::read(&resolved) {
            Ok(bytes) => bytes,
            Err(err) if !explicit && err.kind() == io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => return Err(ConfigError::Io(err.to_string())),
        };
        Self::from_bytes(&bytes)
    }

    /// Parses and validates configuration from raw file contents.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the content is too large, not UTF-8, not
    /// valid TOML, or fails validation.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api.validate()?;
        self.flow.validate()?;
        self.audit.validate()?;
        self.locale.validate()
    }
}

// ============================================================================
// SECTION: Api
// ============================================================================

/// Backend connection settings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Backend base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Optional bearer token for back-office endpoints.
    #[serde(default)]
    pub bearer_token: Option<String>,
    /// Maximum response body size in bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            bearer_token: None,
            max_response_bytes: default_max_response_bytes(),
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout_ms)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("max_response_bytes", &self.max_response_bytes)
            .finish()
    }
}

impl ApiConfig {
    /// Validates the backend settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a field is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(ConfigError::Invalid("api.base_url must be set".to_string()));
        }
        Endpoints::parse(base).map_err(|err| ConfigError::Invalid(format!("api.base_url: {err}")))?;
        if self.timeout_ms == 0 || self.timeout_ms > MAX_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "api.timeout_ms must be between 1 and {MAX_TIMEOUT_MS}"
            )));
        }
        if self.max_response_bytes == 0 || self.max_response_bytes > MAX_RESPONSE_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "api.max_response_bytes must be between 1 and {MAX_RESPONSE_BYTES_LIMIT}"
            )));
        }
        if let Some(token) = &self.bearer_token {
            if token.trim().is_empty() {
                return Err(ConfigError::Invalid("api.bearer_token must be non-empty".to_string()));
            }
            if token.chars().any(char::is_control) {
                return Err(ConfigError::Invalid(
                    "api.bearer_token must not contain control characters".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Converts into the HTTP client configuration.
    #[must_use]
    pub fn client_config(&self) -> ApiClientConfig {
        ApiClientConfig {
            base_url: self.base_url.trim().to_string(),
            timeout: Duration::from_millis(self.timeout_ms),
            bearer_token: self.bearer_token.clone(),
            max_response_bytes: self.max_response_bytes,
        }
    }
}

// ============================================================================
// SECTION: Flow
// ============================================================================

/// Flow timing and limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Interval between biometric status polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Poll ticks before giving up.
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
    /// Delay before navigating to the provider, in milliseconds.
    #[serde(default = "default_redirect_delay_ms")]
    pub redirect_delay_ms: u64,
    /// Notice time-to-live, in milliseconds.
    #[serde(default = "default_notice_ttl_ms")]
    pub notice_ttl_ms: u64,
    /// SMS dispatches allowed per session.
    #[serde(default = "default_max_sms_attempts")]
    pub max_sms_attempts: u32,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_attempts: default_max_poll_attempts(),
            redirect_delay_ms: default_redirect_delay_ms(),
            notice_ttl_ms: default_notice_ttl_ms(),
            max_sms_attempts: default_max_sms_attempts(),
        }
    }
}

impl FlowConfig {
    /// Validates the flow settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a field is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_POLL_INTERVAL_MS ..= MAX_FLOW_DELAY_MS).contains(&self.poll_interval_ms) {
            return Err(ConfigError::Invalid(format!(
                "flow.poll_interval_ms must be between {MIN_POLL_INTERVAL_MS} and {MAX_FLOW_DELAY_MS}"
            )));
        }
        if self.max_poll_attempts == 0 || self.max_poll_attempts > MAX_POLL_ATTEMPTS_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "flow.max_poll_attempts must be between 1 and {MAX_POLL_ATTEMPTS_LIMIT}"
            )));
        }
        if self.redirect_delay_ms > MAX_FLOW_DELAY_MS {
            return Err(ConfigError::Invalid(format!(
                "flow.redirect_delay_ms must be at most {MAX_FLOW_DELAY_MS}"
            )));
        }
        if self.notice_ttl_ms == 0 || self.notice_ttl_ms > MAX_FLOW_DELAY_MS {
            return Err(ConfigError::Invalid(format!(
                "flow.notice_ttl_ms must be between 1 and {MAX_FLOW_DELAY_MS}"
            )));
        }
        if self.max_sms_attempts == 0 || self.max_sms_attempts > MAX_SMS_ATTEMPTS_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "flow.max_sms_attempts must be between 1 and {MAX_SMS_ATTEMPTS_LIMIT}"
            )));
        }
        Ok(())
    }

    /// Converts into runtime settings.
    #[must_use]
    pub const fn settings(&self) -> FlowSettings {
        FlowSettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_poll_attempts: self.max_poll_attempts,
            redirect_delay: Duration::from_millis(self.redirect_delay_ms),
            notice_ttl: Duration::from_millis(self.notice_ttl_ms),
            max_sms_attempts: self.max_sms_attempts,
        }
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit output settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Emit audit events.
    #[serde(default)]
    pub enabled: bool,
    /// JSON-lines output file; stderr when unset.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates the audit settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the path is empty or too long.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", path)?;
        }
        Ok(())
    }

    /// Builds the configured audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the audit file cannot be opened.
    pub fn build_sink(&self) -> Result<Arc<dyn FlowAuditSink>, ConfigError> {
        if !self.enabled {
            return Ok(Arc::new(NoopFlowAuditSink));
        }
        match &self.path {
            Some(path) => {
                let sink = FileFlowAuditSink::new(Path::new(path.trim()))
                    .map_err(|err| ConfigError::Io(err.to_string()))?;
                Ok(Arc::new(sink))
            }
            None => Ok(Arc::new(StderrFlowAuditSink)),
        }
    }
}

// ============================================================================
// SECTION: Locale
// ============================================================================

/// Message language settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleConfig {
    /// Language tag (`es` or `en`).
    #[serde(default)]
    pub lang: Option<String>,
}

impl LocaleConfig {
    /// Validates the language tag.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for unsupported languages.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(lang) = &self.lang
            && Locale::parse(lang).is_none()
        {
            return Err(ConfigError::Invalid(format!("locale.lang is not supported: {lang}")));
        }
        Ok(())
    }

    /// Returns the configured locale, if any.
    #[must_use]
    pub fn locale(&self) -> Option<Locale> {
        self.lang.as_deref().and_then(Locale::parse)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path; the flag is true when the path was requested explicitly.
fn resolve_path(path: Option<&Path>) -> Result<(PathBuf, bool), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default backend base URL.
fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

/// Default request timeout.
const fn default_timeout_ms() -> u64 {
    30_000
}

/// Default response body limit.
const fn default_max_response_bytes() -> usize {
    DEFAULT_MAX_RESPONSE_BYTES
}

/// Default poll interval.
const fn default_poll_interval_ms() -> u64 {
    5_000
}

/// Default poll attempt cap.
const fn default_max_poll_attempts() -> u32 {
    60
}

/// Default redirect delay.
const fn default_redirect_delay_ms() -> u64 {
    2_000
}

/// Default notice time-to-live.
const fn default_notice_ttl_ms() -> u64 {
    5_000
}

/// Default SMS attempt cap.
const fn default_max_sms_attempts() -> u32 {
    3
}
