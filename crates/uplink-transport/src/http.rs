// crates/uplink-transport/src/http.rs
// ============================================================================
// Module: HTTP Ingest Transport
// Description: Blocking HTTP transport for batched telemetry uploads.
// Purpose: Post upload envelopes with bearer auth and bounded responses.
// Dependencies: uplink-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! The HTTP transport posts one upload envelope per request to the ingestion
//! endpoint. It enforces an HTTPS-only default, a single request timeout,
//! disabled redirects, and a cap on how much of any response body is read.
//! Status classification is the contract: 2xx acknowledges the batch, 401 is
//! an identity rejection, and everything else is reported with a bounded
//! detail string. Security posture: response bodies are untrusted input.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::io::Read;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::blocking::Response;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use uplink_core::TransportError;
use uplink_core::UploadBatch;
use uplink_core::UploadReceipt;
use uplink_core::UploadTransport;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default request timeout in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Default cap on response bytes read from the endpoint.
const DEFAULT_MAX_RESPONSE_BYTES: usize = 64 * 1024;
/// Maximum characters of response detail carried in errors.
const MESSAGE_PREVIEW_CHARS: usize = 256;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the HTTP ingest transport.
///
/// The device token never appears in debug output.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct HttpTransportConfig {
    /// Full URL of the ingestion endpoint.
    pub ingest_url: String,
    /// Bearer token identifying this device.
    pub device_token: String,
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum response size read from the endpoint, in bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// User agent string for outbound requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Allow cleartext HTTP (disabled by default).
    #[serde(default)]
    pub allow_http: bool,
}

impl HttpTransportConfig {
    /// Creates a config with default limits for the given endpoint and token.
    #[must_use]
    pub fn new(ingest_url: impl Into<String>, device_token: impl Into<String>) -> Self {
        Self {
            ingest_url: ingest_url.into(),
            device_token: device_token.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            user_agent: default_user_agent(),
            allow_http: false,
        }
    }
}

impl fmt::Debug for HttpTransportConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("HttpTransportConfig")
            .field("ingest_url", &self.ingest_url)
            .field("device_token", &"<redacted>")
            .field("timeout_ms", &self.timeout_ms)
            .field("max_response_bytes", &self.max_response_bytes)
            .field("user_agent", &self.user_agent)
            .field("allow_http", &self.allow_http)
            .finish()
    }
}

/// Returns the default request timeout.
const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Returns the default response size cap.
const fn default_max_response_bytes() -> usize {
    DEFAULT_MAX_RESPONSE_BYTES
}

/// Returns the default user agent string.
fn default_user_agent() -> String {
    "uplink/0.1".to_string()
}

// ============================================================================
// SECTION: Transport Implementation
// ============================================================================

/// Blocking HTTP transport posting upload envelopes to the ingestion endpoint.
#[derive(Debug)]
pub struct HttpIngestTransport {
    /// Transport configuration, including limits and the device token.
    config: HttpTransportConfig,
    /// Parsed ingestion endpoint URL.
    url: Url,
    /// HTTP client used for outbound requests.
    client: Client,
}

impl HttpIngestTransport {
    /// Creates a new HTTP transport with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the ingest URL is invalid, uses a
    /// disallowed scheme, or the HTTP client cannot be created.
    pub fn new(config: HttpTransportConfig) -> Result<Self, TransportError> {
        let url = Url::parse(&config.ingest_url)
            .map_err(|_| TransportError::Network("invalid ingest url".to_string()))?;
        match url.scheme() {
            "https" => {}
            "http" if config.allow_http => {}
            _ => {
                return Err(TransportError::Network(
                    "ingest url scheme must be https".to_string(),
                ));
            }
        }
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|_| TransportError::Network("http client build failed".to_string()))?;
        Ok(Self {
            config,
            url,
            client,
        })
    }
}

impl UploadTransport for HttpIngestTransport {
    fn upload(&self, batch: &UploadBatch) -> Result<UploadReceipt, TransportError> {
        let body =
            serde_json::to_vec(batch).map_err(|err| TransportError::Encode(err.to_string()))?;
        let response = self
            .client
            .post(self.url.clone())
            .header(AUTHORIZATION, format!("Bearer {}", self.config.device_token))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .map_err(|err| TransportError::Network(err.to_string()))?;

        let status = response.status();
        let detail = read_body_capped(response, self.config.max_response_bytes);
        if status.is_success() {
            let records_accepted = parse_records_accepted(&detail);
            debug!(
                stream = batch.stream_name.as_str(),
                records = batch.len(),
                status = status.as_u16(),
                "batch accepted"
            );
            return Ok(UploadReceipt {
                status: status.as_u16(),
                records_accepted,
            });
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(TransportError::AuthRejected(preview(&detail)));
        }
        Err(TransportError::Status {
            status: status.as_u16(),
            message: preview(&detail),
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads at most `max_bytes` of the response body.
///
/// Read failures keep whatever arrived before the failure; the HTTP status
/// line has already been classified by then.
fn read_body_capped(response: Response, max_bytes: usize) -> Vec<u8> {
    let cap = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    let mut buf = Vec::new();
    let mut handle = response.take(cap);
    if handle.read_to_end(&mut buf).is_err() {
        debug!("response body read failed; keeping partial bytes");
    }
    buf
}

/// Extracts the accepted-record counter from an acknowledgement body.
///
/// Acknowledgement parsing is lenient: a missing or malformed body never
/// turns an accepted upload into a failure.
fn parse_records_accepted(body: &[u8]) -> Option<u64> {
    let value: Value = serde_json::from_slice(body).ok()?;
    value.get("records_accepted")?.as_u64()
}

/// Truncates response detail to a bounded string for error context.
fn preview(body: &[u8]) -> String {
    String::from_utf8_lossy(body).chars().take(MESSAGE_PREVIEW_CHARS).collect()
}
