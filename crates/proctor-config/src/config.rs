// crates/proctor-config/src/config.rs
// ============================================================================
// Module: Proctor Configuration
// Description: Configuration loading, environment overrides, and validation.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: proctor-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The path comes from the caller, else `PROCTOR_CONFIG`, else `proctor.toml`
//! in the working directory; only that last default may be absent, in which
//! case built-in defaults apply. A fixed set of environment variables is
//! applied on top of the parsed file before validation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use proctor_store_sqlite::SqliteStoreMode;
use proctor_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "proctor.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "PROCTOR_CONFIG";
/// Environment variable selecting the storage backend.
pub const STORAGE_BACKEND_ENV_VAR: &str = "STORAGE_BACKEND";
/// Environment variable selecting the `SQLite` record store path.
pub const DATABASE_PATH_ENV_VAR: &str = "PROCTOR_DATABASE_PATH";
/// Environment variable overriding the HTTP bind address.
pub const BIND_ENV_VAR: &str = "PROCTOR_BIND";
/// Environment variable overriding the S3 videos bucket.
pub const S3_VIDEOS_BUCKET_ENV_VAR: &str = "PROCTOR_S3_VIDEOS_BUCKET";
/// Environment variable overriding the S3 reports bucket.
pub const S3_REPORTS_BUCKET_ENV_VAR: &str = "PROCTOR_S3_REPORTS_BUCKET";
/// Environment variable overriding the S3 endpoint.
pub const S3_ENDPOINT_ENV_VAR: &str = "PROCTOR_S3_ENDPOINT";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of an S3 bucket name.
const MAX_BUCKET_NAME_LENGTH: usize = 63;
/// Default HTTP bind address.
const DEFAULT_BIND: &str = "127.0.0.1:8000";
/// Default maximum request body size (video uploads).
const DEFAULT_MAX_BODY_BYTES: usize = 256 * 1024 * 1024;
/// Default `SQLite` busy timeout.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Default `SQLite` database path.
const DEFAULT_DATABASE_PATH: &str = "data/proctor.db";
/// Default maximum object size read back from the object store.
const DEFAULT_MAX_OBJECT_BYTES: usize = 512 * 1024 * 1024;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Proctoring backend configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProctorConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Record store configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Artifact storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl ProctorConfig {
    /// Loads configuration from disk, applies environment overrides, and validates.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::load_file(path)?;
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and parses the configuration file without overrides or validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed.
    pub fn load_file(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved.path)?;
        if !resolved.explicit && !resolved.path.exists() {
            return Ok(Self::default());
        }
        let bytes = fs::read(&resolved.path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses configuration from TOML text without overrides or validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the text is not valid configuration.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies environment overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when an override value is malformed.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(STORAGE_BACKEND_ENV_VAR) {
            self.storage.backend = StorageBackend::parse(&value).ok_or_else(|| {
                ConfigError::Invalid(format!("{STORAGE_BACKEND_ENV_VAR} must be local or s3"))
            })?;
        }
        if let Some(value) = lookup(DATABASE_PATH_ENV_VAR) {
            self.database.store_type = DatabaseType::Sqlite;
            self.database.path = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup(BIND_ENV_VAR) {
            self.server.bind = value;
        }
        if let Some(value) = lookup(S3_VIDEOS_BUCKET_ENV_VAR) {
            self.storage.s3.videos_bucket = value;
        }
        if let Some(value) = lookup(S3_REPORTS_BUCKET_ENV_VAR) {
            self.storage.s3.reports_bucket = value;
        }
        if let Some(value) = lookup(S3_ENDPOINT_ENV_VAR) {
            self.storage.s3.endpoint = Some(value);
        }
        Ok(())
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.database.validate()?;
        self.storage.validate()?;
        self.audit.validate()?;
        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address to bind.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Allow cross-origin requests from any origin.
    #[serde(default = "default_true")]
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            cors: true,
        }
    }
}

impl ServerConfig {
    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the bind address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("server.bind is invalid: {}", self.bind)))
    }

    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid("server.max_body_bytes must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Record store backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseType {
    /// In-memory store; data is lost on restart.
    Memory,
    /// `SQLite` file store.
    #[default]
    Sqlite,
}

impl DatabaseType {
    /// Returns the canonical backend name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite => "sqlite",
        }
    }
}

/// Record store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: DatabaseType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            store_type: DatabaseType::Sqlite,
            path: Some(PathBuf::from(DEFAULT_DATABASE_PATH)),
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl DatabaseConfig {
    /// Validates record store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.store_type {
            DatabaseType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid(
                        "memory database must not set path".to_string(),
                    ));
                }
                Ok(())
            }
            DatabaseType::Sqlite => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("sqlite database requires path".to_string())
                })?;
                validate_path_string("database.path", &path.to_string_lossy())?;
                if self.busy_timeout_ms == 0 {
                    return Err(ConfigError::Invalid(
                        "database.busy_timeout_ms must be > 0".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Artifact storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Local filesystem directories.
    #[default]
    Local,
    /// S3-compatible object store.
    S3,
}

impl StorageBackend {
    /// Parses a backend name, ignoring ASCII case and surrounding whitespace.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Some(Self::Local),
            "s3" => Some(Self::S3),
            _ => None,
        }
    }

    /// Returns the canonical backend name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::S3 => "s3",
        }
    }
}

/// Artifact storage configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Selected backend.
    #[serde(default)]
    pub backend: StorageBackend,
    /// Directory for local video files.
    #[serde(default = "default_video_dir")]
    pub video_dir: PathBuf,
    /// Directory for local report files.
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,
    /// Directory that server-side video imports read from.
    #[serde(default = "default_import_dir")]
    pub import_dir: PathBuf,
    /// S3 settings, used when `backend = "s3"`.
    #[serde(default)]
    pub s3: S3StorageConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            video_dir: default_video_dir(),
            report_dir: default_report_dir(),
            import_dir: default_import_dir(),
            s3: S3StorageConfig::default(),
        }
    }
}

impl StorageConfig {
    /// Validates storage configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("storage.import_dir", &self.import_dir.to_string_lossy())?;
        match self.backend {
            StorageBackend::Local => {
                validate_path_string("storage.video_dir", &self.video_dir.to_string_lossy())?;
                validate_path_string("storage.report_dir", &self.report_dir.to_string_lossy())?;
                if self.video_dir == self.report_dir {
                    return Err(ConfigError::Invalid(
                        "storage.video_dir and storage.report_dir must differ".to_string(),
                    ));
                }
                Ok(())
            }
            StorageBackend::S3 => self.s3.validate(),
        }
    }
}

/// S3-compatible object store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct S3StorageConfig {
    /// Bucket holding session recordings.
    #[serde(default = "default_videos_bucket")]
    pub videos_bucket: String,
    /// Bucket holding rendered reports.
    #[serde(default = "default_reports_bucket")]
    pub reports_bucket: String,
    /// Optional region (defaults to the AWS environment).
    #[serde(default)]
    pub region: Option<String>,
    /// Optional endpoint for S3-compatible stores.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Optional key prefix inside both buckets.
    #[serde(default)]
    pub prefix: Option<String>,
    /// Force path-style addressing.
    #[serde(default)]
    pub force_path_style: bool,
    /// Allow non-TLS endpoints (explicit opt-in).
    #[serde(default)]
    pub allow_http: bool,
    /// Maximum object size read back into memory.
    #[serde(default = "default_max_object_bytes")]
    pub max_object_bytes: usize,
}

impl Default for S3StorageConfig {
    fn default() -> Self {
        Self {
            videos_bucket: default_videos_bucket(),
            reports_bucket: default_reports_bucket(),
            region: None,
            endpoint: None,
            prefix: None,
            force_path_style: false,
            allow_http: false,
            max_object_bytes: default_max_object_bytes(),
        }
    }
}

impl S3StorageConfig {
    /// Validates object-store configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when object-store settings are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_bucket("storage.s3.videos_bucket", &self.videos_bucket)?;
        validate_bucket("storage.s3.reports_bucket", &self.reports_bucket)?;
        if let Some(endpoint) = &self.endpoint {
            let trimmed = endpoint.trim();
            if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
                return Err(ConfigError::Invalid(
                    "storage.s3.endpoint must include http:// or https://".to_string(),
                ));
            }
            if trimmed.starts_with("http://") && !self.allow_http {
                return Err(ConfigError::Invalid(
                    "storage.s3.endpoint uses http:// without allow_http".to_string(),
                ));
            }
        }
        if let Some(prefix) = &self.prefix {
            validate_object_store_prefix(prefix)?;
        }
        if self.max_object_bytes == 0 {
            return Err(ConfigError::Invalid(
                "storage.s3.max_object_bytes must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Audit logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Enable structured audit logging.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Optional audit log path (JSON lines); stderr when unset.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", path)?;
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

/// Resolved config path and whether the caller asked for it explicitly.
struct ResolvedPath {
    /// Path to read.
    path: PathBuf,
    /// False only for the built-in default name.
    explicit: bool,
}

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<ResolvedPath, ConfigError> {
    if let Some(path) = path {
        return Ok(ResolvedPath {
            path: path.to_path_buf(),
            explicit: true,
        });
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(ResolvedPath {
            path: PathBuf::from(env_path),
            explicit: true,
        });
    }
    Ok(ResolvedPath {
        path: PathBuf::from(DEFAULT_CONFIG_NAME),
        explicit: false,
    })
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
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates an S3 bucket name.
fn validate_bucket(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be set")));
    }
    if trimmed.len() > MAX_BUCKET_NAME_LENGTH || trimmed.contains(['/', '\\']) {
        return Err(ConfigError::Invalid(format!("{field} is not a valid bucket name")));
    }
    Ok(())
}

/// Validates the object-store prefix string.
fn validate_object_store_prefix(value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid("storage.s3.prefix must be non-empty".to_string()));
    }
    if trimmed.contains('\\') {
        return Err(ConfigError::Invalid(
            "storage.s3.prefix must not contain backslashes".to_string(),
        ));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("storage.s3.prefix exceeds max length".to_string()));
    }
    if trimmed.starts_with('/') {
        return Err(ConfigError::Invalid("storage.s3.prefix must be relative".to_string()));
    }
    let normalized = trimmed.strip_suffix('/').unwrap_or(trimmed);
    for component in Path::new(normalized).components() {
        match component {
            Component::Normal(value) => {
                if value.to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
                    return Err(ConfigError::Invalid(
                        "storage.s3.prefix segment too long".to_string(),
                    ));
                }
            }
            _ => {
                return Err(ConfigError::Invalid(
                    "storage.s3.prefix must not contain traversal".to_string(),
                ));
            }
        }
    }
    Ok(())
}

/// Default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Default request body limit.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Default busy timeout.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Default local video directory.
fn default_video_dir() -> PathBuf {
    PathBuf::from("data/videos")
}

/// Default local report directory.
fn default_report_dir() -> PathBuf {
    PathBuf::from("data/reports")
}

/// Default server-side import directory.
fn default_import_dir() -> PathBuf {
    PathBuf::from("frontend/data")
}

/// Default videos bucket.
fn default_videos_bucket() -> String {
    "videos".to_string()
}

/// Default reports bucket.
fn default_reports_bucket() -> String {
    "reports".to_string()
}

/// Default object read limit.
const fn default_max_object_bytes() -> usize {
    DEFAULT_MAX_OBJECT_BYTES
}

/// Serde helper for boolean defaults that are on.
const fn default_true() -> bool {
    true
}
