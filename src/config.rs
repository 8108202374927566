use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_STORAGE_DIR: &str = "./storage/pdf";
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY_SECS: u64 = 5;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the summarizer service.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the remote summarization engine (the `/summarize` path is appended).
    pub summary_service_url: String,
    /// Directory holding uploaded PDF files.
    pub storage_dir: PathBuf,
    /// Optional SQLite file backing the document store; in-memory when unset.
    pub document_db_path: Option<PathBuf>,
    /// Largest accepted upload, in bytes.
    pub max_upload_bytes: u64,
    /// Timeout applied to each outbound summarization call.
    pub summary_request_timeout_secs: u64,
    /// Total number of remote attempts per summarize request.
    pub summary_max_attempts: u32,
    /// Base backoff unit; attempt `n` waits `n * delay` before retrying.
    pub summary_retry_delay_secs: u64,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Log file path; `logs/pdf-summarizer.log` when unset.
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            summary_service_url: load_env("SUMMARY_SERVICE_URL")?,
            storage_dir: load_env_optional("STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR)),
            document_db_path: load_env_optional("DOCUMENT_DB_PATH").map(PathBuf::from),
            max_upload_bytes: parse_optional("MAX_UPLOAD_BYTES")?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            summary_request_timeout_secs: parse_nonzero(
                "SUMMARY_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?,
            summary_max_attempts: parse_nonzero("SUMMARY_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?,
            summary_retry_delay_secs: parse_optional("SUMMARY_RETRY_DELAY_SECS")?
                .unwrap_or(DEFAULT_RETRY_DELAY_SECS),
            server_port: parse_optional("SERVER_PORT")?,
            log_file: load_env_optional("PDF_SUMMARIZER_LOG_FILE").map(PathBuf::from),
        })
    }

    /// Per-call timeout for the summarization client.
    pub fn summary_request_timeout(&self) -> Duration {
        Duration::from_secs(self.summary_request_timeout_secs)
    }

    /// Base delay between summarization attempts.
    pub fn summary_retry_delay(&self) -> Duration {
        Duration::from_secs(self.summary_retry_delay_secs)
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    load_env_optional(key).ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

/// Parse an optional positive count, falling back to `default` when unset. Zero is rejected.
fn parse_nonzero<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialEq + Default,
{
    let value = parse_optional(key)?.unwrap_or(default);
    if value == T::default() {
        return Err(ConfigError::InvalidValue(key.to_string()));
    }
    Ok(value)
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        summary_service_url = %config.summary_service_url,
        storage_dir = %config.storage_dir.display(),
        document_db_path = ?config.document_db_path,
        max_attempts = config.summary_max_attempts,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}
