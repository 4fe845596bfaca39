use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Configuration errors
    ConfigMissingWriteKey,
    ConfigInvalidHost,
    ConfigInvalidInterval,

    // Validation errors
    ValidationMissingIdentity,
    ValidationEmptyEvent,
    ValidationEmptyGroupId,
    ValidationEmptyPreviousId,

    // Network errors
    NetworkError,
    NetworkTimeout,
    NetworkRetryLimit,

    // HTTP errors
    HttpBadRequest,
    HttpUnauthorized,
    HttpForbidden,
    HttpNotFound,
    HttpRateLimited,
    HttpServerError,
    HttpTimeout,
    HttpNetworkError,

    // Client lifecycle errors
    ClientClosed,
    FlushFailed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigMissingWriteKey => "CONFIG_MISSING_WRITE_KEY",
            ErrorCode::ConfigInvalidHost => "CONFIG_INVALID_HOST",
            ErrorCode::ConfigInvalidInterval => "CONFIG_INVALID_INTERVAL",
            ErrorCode::ValidationMissingIdentity => "VALIDATION_MISSING_IDENTITY",
            ErrorCode::ValidationEmptyEvent => "VALIDATION_EMPTY_EVENT",
            ErrorCode::ValidationEmptyGroupId => "VALIDATION_EMPTY_GROUP_ID",
            ErrorCode::ValidationEmptyPreviousId => "VALIDATION_EMPTY_PREVIOUS_ID",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::NetworkTimeout => "NETWORK_TIMEOUT",
            ErrorCode::NetworkRetryLimit => "NETWORK_RETRY_LIMIT",
            ErrorCode::HttpBadRequest => "HTTP_BAD_REQUEST",
            ErrorCode::HttpUnauthorized => "HTTP_UNAUTHORIZED",
            ErrorCode::HttpForbidden => "HTTP_FORBIDDEN",
            ErrorCode::HttpNotFound => "HTTP_NOT_FOUND",
            ErrorCode::HttpRateLimited => "HTTP_RATE_LIMITED",
            ErrorCode::HttpServerError => "HTTP_SERVER_ERROR",
            ErrorCode::HttpTimeout => "HTTP_TIMEOUT",
            ErrorCode::HttpNetworkError => "HTTP_NETWORK_ERROR",
            ErrorCode::ClientClosed => "CLIENT_CLOSED",
            ErrorCode::FlushFailed => "FLUSH_FAILED",
        }
    }
}

#[derive(Error, Debug)]
#[error("[{code}] {message}")]
pub struct AnalyticsError {
    pub code: ErrorCode,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AnalyticsError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn config_error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, message)
    }

    pub fn validation_error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, message)
    }

    pub fn network_error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, message)
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::ConfigMissingWriteKey
                | ErrorCode::ConfigInvalidHost
                | ErrorCode::ConfigInvalidInterval
        )
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::ValidationMissingIdentity
                | ErrorCode::ValidationEmptyEvent
                | ErrorCode::ValidationEmptyGroupId
                | ErrorCode::ValidationEmptyPreviousId
        )
    }

    pub fn is_network_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::NetworkError
                | ErrorCode::NetworkTimeout
                | ErrorCode::NetworkRetryLimit
                | ErrorCode::HttpBadRequest
                | ErrorCode::HttpUnauthorized
                | ErrorCode::HttpForbidden
                | ErrorCode::HttpNotFound
                | ErrorCode::HttpRateLimited
                | ErrorCode::HttpServerError
                | ErrorCode::HttpTimeout
                | ErrorCode::HttpNetworkError
        )
    }
}

// Every callback in a failed batch receives the same terminal error, so the
// error must be cloneable. The source cannot be cloned and is dropped.
impl Clone for AnalyticsError {
    fn clone(&self) -> Self {
        Self {
            code: self.code,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = AnalyticsError::new(ErrorCode::ValidationMissingIdentity, "no identity");
        assert_eq!(format!("{}", error), "[VALIDATION_MISSING_IDENTITY] no identity");
    }

    #[test]
    fn test_error_categories() {
        assert!(AnalyticsError::new(ErrorCode::ConfigMissingWriteKey, "x").is_config_error());
        assert!(AnalyticsError::new(ErrorCode::ValidationEmptyEvent, "x").is_validation_error());
        assert!(AnalyticsError::new(ErrorCode::HttpServerError, "x").is_network_error());
        assert!(!AnalyticsError::new(ErrorCode::HttpServerError, "x").is_validation_error());
    }

    #[test]
    fn test_clone_drops_source() {
        let source = std::io::Error::new(std::io::ErrorKind::Other, "io");
        let error = AnalyticsError::with_source(ErrorCode::NetworkError, "boom", source);
        let cloned = error.clone();
        assert_eq!(cloned.code, ErrorCode::NetworkError);
        assert_eq!(cloned.message, "boom");
        assert!(cloned.source.is_none());
        assert!(error.source.is_some());
    }
}
