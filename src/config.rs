use std::sync::Arc;
use std::time::Duration;

use crate::error::{AnalyticsError, ErrorCode, Result};
use crate::http::RetryConfig;
use crate::{SDK_NAME, SDK_VERSION};

pub const DEFAULT_HOST: &str = "https://api.segment.io";
pub const DEFAULT_PATH: &str = "/v1/batch";
/// Number of buffered messages that triggers a flush.
pub const DEFAULT_FLUSH_AT: usize = 20;
/// Serialized-size flush threshold. The batch endpoint rejects payloads over
/// 500 KB, so the buffer flushes once it approaches 450 KB.
pub const DEFAULT_MAX_BATCH_BYTES: usize = 450 * 1024;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_RETRY_COUNT: u32 = 3;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Handler for terminal delivery errors. When configured, exhausted batches
/// are routed here after their callbacks have resolved.
pub type ErrorHandler = Arc<dyn Fn(&AnalyticsError) + Send + Sync>;

/// Library identity stamped into every message's `context.library` and the
/// outbound `user-agent`. Injected at client construction rather than read
/// from ambient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryInfo {
    pub name: String,
    pub version: String,
}

impl Default for LibraryInfo {
    fn default() -> Self {
        Self {
            name: SDK_NAME.to_string(),
            version: SDK_VERSION.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct AnalyticsOptions {
    pub write_key: String,
    pub host: String,
    pub path: String,
    pub flush_at: usize,
    pub max_batch_bytes: usize,
    pub flush_interval: Duration,
    pub retry: RetryConfig,
    pub timeout: Duration,
    pub enabled: bool,
    pub error_handler: Option<ErrorHandler>,
    pub http_client: Option<reqwest::Client>,
    pub library: LibraryInfo,
}

impl std::fmt::Debug for AnalyticsOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsOptions")
            .field("host", &self.host)
            .field("path", &self.path)
            .field("flush_at", &self.flush_at)
            .field("max_batch_bytes", &self.max_batch_bytes)
            .field("flush_interval", &self.flush_interval)
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .field("enabled", &self.enabled)
            .field("error_handler", &self.error_handler.is_some())
            .field("library", &self.library)
            .finish()
    }
}

impl AnalyticsOptions {
    pub fn new(write_key: impl Into<String>) -> Self {
        Self::builder(write_key).build()
    }

    pub fn builder(write_key: impl Into<String>) -> AnalyticsOptionsBuilder {
        AnalyticsOptionsBuilder::new(write_key)
    }

    pub fn validate(&self) -> Result<()> {
        if self.write_key.is_empty() {
            return Err(AnalyticsError::config_error(
                ErrorCode::ConfigMissingWriteKey,
                "Write key is required",
            ));
        }

        if url::Url::parse(&self.host).is_err() {
            return Err(AnalyticsError::config_error(
                ErrorCode::ConfigInvalidHost,
                format!("Invalid host URL: {}", self.host),
            ));
        }

        if self.flush_interval.is_zero() {
            return Err(AnalyticsError::config_error(
                ErrorCode::ConfigInvalidInterval,
                "Flush interval must be positive",
            ));
        }

        if self.timeout.is_zero() {
            return Err(AnalyticsError::config_error(
                ErrorCode::ConfigInvalidInterval,
                "Request timeout must be positive",
            ));
        }

        Ok(())
    }

    /// Full endpoint URL for batch submission.
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.host, self.path)
    }
}

pub struct AnalyticsOptionsBuilder {
    write_key: String,
    host: String,
    path: String,
    flush_at: usize,
    max_batch_bytes: usize,
    flush_interval: Duration,
    retry: RetryConfig,
    timeout: Duration,
    enabled: bool,
    error_handler: Option<ErrorHandler>,
    http_client: Option<reqwest::Client>,
    library: LibraryInfo,
}

impl AnalyticsOptionsBuilder {
    pub fn new(write_key: impl Into<String>) -> Self {
        Self {
            write_key: write_key.into(),
            host: DEFAULT_HOST.to_string(),
            path: DEFAULT_PATH.to_string(),
            flush_at: DEFAULT_FLUSH_AT,
            max_batch_bytes: DEFAULT_MAX_BATCH_BYTES,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            retry: RetryConfig {
                retries: DEFAULT_RETRY_COUNT,
                ..RetryConfig::default()
            },
            timeout: DEFAULT_TIMEOUT,
            enabled: true,
            error_handler: None,
            http_client: None,
            library: LibraryInfo::default(),
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = trim_trailing_slash(host.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = trim_trailing_slash(path.into());
        self
    }

    /// Count flush threshold. Clamped to at least 1.
    pub fn flush_at(mut self, flush_at: usize) -> Self {
        self.flush_at = flush_at.max(1);
        self
    }

    pub fn max_batch_bytes(mut self, bytes: usize) -> Self {
        self.max_batch_bytes = bytes;
        self
    }

    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Number of retries after the initial delivery attempt.
    pub fn retry_count(mut self, count: u32) -> Self {
        self.retry.retries = count;
        self
    }

    /// Full retry policy override (backoff schedule included).
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disabled clients validate and resolve callbacks but transmit nothing.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn error_handler(mut self, handler: ErrorHandler) -> Self {
        self.error_handler = Some(handler);
        self
    }

    /// Custom transport client. Replaces the internally built `reqwest`
    /// client; the caller is then responsible for timeouts.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn library(mut self, library: LibraryInfo) -> Self {
        self.library = library;
        self
    }

    pub fn build(self) -> AnalyticsOptions {
        AnalyticsOptions {
            write_key: self.write_key,
            host: self.host,
            path: self.path,
            flush_at: self.flush_at,
            max_batch_bytes: self.max_batch_bytes,
            flush_interval: self.flush_interval,
            retry: self.retry,
            timeout: self.timeout,
            enabled: self.enabled,
            error_handler: self.error_handler,
            http_client: self.http_client,
            library: self.library,
        }
    }
}

fn trim_trailing_slash(mut value: String) -> String {
    while value.ends_with('/') {
        value.pop();
    }
    value
}
