// crates/uplink-config/src/config.rs
// ============================================================================
// Module: Uplink Configuration
// Description: Configuration loading and validation for the delivery agent.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: uplink-core, uplink-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section carries defaults so a minimal file parses, and `validate()`
//! then rejects anything the runtime could not operate on: missing identity,
//! cleartext endpoints without the explicit dev flag, zero intervals.
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use uplink_core::ConnectionClass;
use uplink_core::DEFAULT_MAX_PAYLOAD_BYTES;
use uplink_store_sqlite::SqliteJournalMode;
use uplink_store_sqlite::SqliteSyncMode;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "uplink.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "UPLINK_CONFIG";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of a device identifier.
const MAX_DEVICE_ID_LENGTH: usize = 128;
/// Maximum length of a device token.
const MAX_DEVICE_TOKEN_LENGTH: usize = 256;
/// Maximum length of an application version string.
const MAX_APP_VERSION_LENGTH: usize = 64;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Uplink agent configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UplinkConfig {
    /// Device identity configuration.
    #[serde(default)]
    pub device: DeviceConfig,
    /// Ingestion endpoint configuration.
    #[serde(default)]
    pub endpoint: EndpointConfig,
    /// Durable queue store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Upload scheduling and retention configuration.
    #[serde(default)]
    pub uploader: UploaderScheduleConfig,
    /// Health monitoring configuration.
    #[serde(default)]
    pub health: HealthConfig,
    /// Permission monitoring configuration.
    #[serde(default)]
    pub permissions: PermissionsConfig,
    /// Local storage pressure configuration.
    #[serde(default)]
    pub storage: StorageConfig,
}

impl UplinkConfig {
    /// Loads configuration from disk using the default resolution rules:
    /// explicit path, then [`CONFIG_ENV_VAR`], then `uplink.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.device.validate()?;
        self.endpoint.validate()?;
        self.store.validate()?;
        self.uploader.validate()?;
        self.health.validate()?;
        self.permissions.validate()?;
        self.storage.validate()?;
        Ok(())
    }
}

/// Device identity configuration.
///
/// The device token never appears in debug output.
#[derive(Clone, Default, Deserialize)]
pub struct DeviceConfig {
    /// Stable device identifier reported in every envelope.
    #[serde(default)]
    pub device_id: String,
    /// Bearer token authenticating this device.
    #[serde(default)]
    pub device_token: String,
    /// Application version reported in batch metadata.
    #[serde(default)]
    pub app_version: String,
}

impl fmt::Debug for DeviceConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("DeviceConfig")
            .field("device_id", &self.device_id)
            .field("device_token", &"<redacted>")
            .field("app_version", &self.app_version)
            .finish()
    }
}

impl DeviceConfig {
    /// Validates device identity configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.device_id.trim().is_empty() {
            return Err(ConfigError::Invalid("device.device_id must be non-empty".to_string()));
        }
        if self.device_id.len() > MAX_DEVICE_ID_LENGTH {
            return Err(ConfigError::Invalid("device.device_id exceeds max length".to_string()));
        }
        if self.device_token.trim().is_empty() {
            return Err(ConfigError::Invalid("device.device_token must be non-empty".to_string()));
        }
        if self.device_token.len() > MAX_DEVICE_TOKEN_LENGTH {
            return Err(ConfigError::Invalid("device.device_token exceeds max length".to_string()));
        }
        if self.app_version.trim().is_empty() {
            return Err(ConfigError::Invalid("device.app_version must be non-empty".to_string()));
        }
        if self.app_version.len() > MAX_APP_VERSION_LENGTH {
            return Err(ConfigError::Invalid("device.app_version exceeds max length".to_string()));
        }
        Ok(())
    }
}

/// Ingestion endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    /// Full URL of the ingestion endpoint.
    #[serde(default)]
    pub ingest_url: String,
    /// Request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Maximum response size read from the endpoint, in bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// User agent string for outbound requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Allow cleartext HTTP (explicit opt-in for development).
    #[serde(default)]
    pub allow_http: bool,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            ingest_url: String::new(),
            request_timeout_ms: default_request_timeout_ms(),
            max_response_bytes: default_max_response_bytes(),
            user_agent: default_user_agent(),
            allow_http: false,
        }
    }
}

impl EndpointConfig {
    /// Validates endpoint configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let trimmed = self.ingest_url.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::Invalid("endpoint.ingest_url must be non-empty".to_string()));
        }
        if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
            return Err(ConfigError::Invalid(
                "endpoint.ingest_url must include http:// or https://".to_string(),
            ));
        }
        if trimmed.starts_with("http://") && !self.allow_http {
            return Err(ConfigError::Invalid(
                "endpoint.ingest_url uses http:// without allow_http".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "endpoint.request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.max_response_bytes == 0 {
            return Err(ConfigError::Invalid(
                "endpoint.max_response_bytes must be greater than zero".to_string(),
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid("endpoint.user_agent must be non-empty".to_string()));
        }
        Ok(())
    }
}

/// Durable queue store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Maximum payload size accepted at the enqueue boundary, in bytes.
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteJournalMode::default(),
            sync_mode: SqliteSyncMode::default(),
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

impl StoreConfig {
    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_payload_bytes == 0 {
            return Err(ConfigError::Invalid(
                "store.max_payload_bytes must be greater than zero".to_string(),
            ));
        }
        match self.store_type {
            StoreType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid(
                        "memory store must not set path".to_string(),
                    ));
                }
                Ok(())
            }
            StoreType::Sqlite => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("sqlite store requires path".to_string())
                })?;
                validate_path_string("store.path", &path.to_string_lossy())
            }
        }
    }
}

/// Queue store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// Use the `SQLite`-backed durable store.
    #[default]
    Sqlite,
    /// Use the in-memory store (testing only; queue is lost on restart).
    Memory,
}

/// Upload scheduling and retention configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UploaderScheduleConfig {
    /// Spacing in milliseconds between sync cycles.
    #[serde(default = "default_sync_interval_ms")]
    pub sync_interval_ms: u64,
    /// Grace period in milliseconds before reclaiming stale claims.
    #[serde(default = "default_stale_grace_ms")]
    pub stale_grace_ms: u64,
    /// Spacing in milliseconds between retention purges.
    #[serde(default = "default_purge_interval_ms")]
    pub purge_interval_ms: u64,
    /// Retention window in milliseconds for delivered and terminal items.
    #[serde(default = "default_retention_ms")]
    pub retention_ms: u64,
    /// Connection class assumed before the host reports one.
    #[serde(default = "default_initial_connection")]
    pub initial_connection: ConnectionClass,
}

impl Default for UploaderScheduleConfig {
    fn default() -> Self {
        Self {
            sync_interval_ms: default_sync_interval_ms(),
            stale_grace_ms: default_stale_grace_ms(),
            purge_interval_ms: default_purge_interval_ms(),
            retention_ms: default_retention_ms(),
            initial_connection: default_initial_connection(),
        }
    }
}

impl UploaderScheduleConfig {
    /// Validates uploader scheduling configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.sync_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "uploader.sync_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.stale_grace_ms == 0 {
            return Err(ConfigError::Invalid(
                "uploader.stale_grace_ms must be greater than zero".to_string(),
            ));
        }
        if self.purge_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "uploader.purge_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.retention_ms == 0 {
            return Err(ConfigError::Invalid(
                "uploader.retention_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Health monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    /// Spacing in milliseconds between health check ticks.
    #[serde(default = "default_health_interval_ms")]
    pub check_interval_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: default_health_interval_ms(),
        }
    }
}

impl HealthConfig {
    /// Validates health monitoring configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.check_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "health.check_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Permission monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PermissionsConfig {
    /// Spacing in milliseconds between permission polls.
    #[serde(default = "default_permissions_interval_ms")]
    pub check_interval_ms: u64,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: default_permissions_interval_ms(),
        }
    }
}

impl PermissionsConfig {
    /// Validates permission monitoring configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.check_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "permissions.check_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Local storage pressure configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Store size in bytes above which the agent reports storage pressure.
    #[serde(default = "default_storage_warn_bytes")]
    pub warn_threshold_bytes: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            warn_threshold_bytes: default_storage_warn_bytes(),
        }
    }
}

impl StorageConfig {
    /// Validates storage pressure configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.warn_threshold_bytes == 0 {
            return Err(ConfigError::Invalid(
                "storage.warn_threshold_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
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

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
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
    let path = Path::new(trimmed);
    for component in path.components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Default request timeout for the ingestion endpoint.
const fn default_request_timeout_ms() -> u64 {
    30_000
}

/// Default cap on response bytes read from the endpoint.
const fn default_max_response_bytes() -> usize {
    64 * 1024
}

/// Default user agent string.
fn default_user_agent() -> String {
    "uplink/0.1".to_string()
}

/// Default `SQLite` busy timeout.
const fn default_busy_timeout_ms() -> u64 {
    5_000
}

/// Default payload size limit at the enqueue boundary.
const fn default_max_payload_bytes() -> usize {
    DEFAULT_MAX_PAYLOAD_BYTES
}

/// Default spacing between sync cycles.
const fn default_sync_interval_ms() -> u64 {
    60_000
}

/// Default grace period before reclaiming stale claims.
const fn default_stale_grace_ms() -> u64 {
    300_000
}

/// Default spacing between retention purges.
const fn default_purge_interval_ms() -> u64 {
    21_600_000
}

/// Default retention window: three days.
const fn default_retention_ms() -> u64 {
    259_200_000
}

/// Default connection class before the host reports one.
const fn default_initial_connection() -> ConnectionClass {
    ConnectionClass::Unknown
}

/// Default spacing between health check ticks.
const fn default_health_interval_ms() -> u64 {
    30_000
}

/// Default spacing between permission polls.
const fn default_permissions_interval_ms() -> u64 {
    60_000
}

/// Default storage pressure threshold: 512 MiB.
const fn default_storage_warn_bytes() -> u64 {
    512 * 1024 * 1024
}
