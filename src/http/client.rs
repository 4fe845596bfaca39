use reqwest::{Client, StatusCode};
use std::sync::Arc;

use crate::config::AnalyticsOptions;
use crate::delivery::{BatchEnvelope, BatchTransport};
use crate::error::{AnalyticsError, ErrorCode, Result};

/// Production transport: POSTs a batch envelope to the collection endpoint.
///
/// The write key travels as the basic-auth username (no password) and the
/// user-agent identifies the library and its version. Retry is layered on
/// top by the delivery service; each call here is a single attempt.
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    write_key: String,
    user_agent: String,
}

impl HttpTransport {
    pub fn new(options: &AnalyticsOptions) -> Result<Self> {
        let client = match &options.http_client {
            Some(client) => client.clone(),
            None => Client::builder()
                .timeout(options.timeout)
                .build()
                .map_err(|e| {
                    AnalyticsError::with_source(
                        ErrorCode::NetworkError,
                        "Failed to create HTTP client",
                        e,
                    )
                })?,
        };

        Ok(Self {
            client,
            endpoint: options.endpoint(),
            write_key: options.write_key.clone(),
            user_agent: format!("{}/{}", options.library.name, options.library.version),
        })
    }

    pub async fn send_batch(&self, envelope: &BatchEnvelope) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.write_key, None::<&str>)
            .header("User-Agent", &self.user_agent)
            .json(envelope)
            .send()
            .await
            .map_err(convert_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(status_to_error(status, &body))
    }

    /// Adapt into the closure-typed transport seam the delivery service
    /// consumes.
    pub fn into_transport(self) -> BatchTransport {
        let this = Arc::new(self);
        Arc::new(move |envelope| {
            let this = Arc::clone(&this);
            Box::pin(async move { this.send_batch(&envelope).await })
        })
    }
}

fn status_to_error(status: StatusCode, body: &str) -> AnalyticsError {
    let (code, category) = match status {
        StatusCode::BAD_REQUEST => (ErrorCode::HttpBadRequest, "Client Error"),
        StatusCode::UNAUTHORIZED => (ErrorCode::HttpUnauthorized, "Authentication Error"),
        StatusCode::FORBIDDEN => (ErrorCode::HttpForbidden, "Authorization Error"),
        StatusCode::NOT_FOUND => (ErrorCode::HttpNotFound, "Not Found"),
        StatusCode::TOO_MANY_REQUESTS => (ErrorCode::HttpRateLimited, "Rate Limited"),
        s if s.is_server_error() => (ErrorCode::HttpServerError, "Server Error"),
        s if s.is_client_error() => (ErrorCode::HttpBadRequest, "Client Error"),
        _ => (ErrorCode::HttpServerError, "Server Error"),
    };

    AnalyticsError::network_error(code, format!("{}: {} - {}", category, status.as_u16(), body))
}

fn convert_error(error: reqwest::Error) -> AnalyticsError {
    if error.is_timeout() {
        AnalyticsError::with_source(ErrorCode::HttpTimeout, "Request timed out", error)
    } else if error.is_connect() {
        AnalyticsError::with_source(ErrorCode::HttpNetworkError, "Connection failed", error)
    } else {
        AnalyticsError::with_source(ErrorCode::NetworkError, error.to_string(), error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LibraryInfo;

    #[test]
    fn test_endpoint_from_options() {
        let options = AnalyticsOptions::builder("key")
            .host("https://collector.example.com/")
            .path("/v1/batch")
            .build();
        let transport = HttpTransport::new(&options).unwrap();
        assert_eq!(transport.endpoint, "https://collector.example.com/v1/batch");
    }

    #[test]
    fn test_user_agent_carries_library_identity() {
        let options = AnalyticsOptions::builder("key")
            .library(LibraryInfo {
                name: "my-wrapper".to_string(),
                version: "9.9.9".to_string(),
            })
            .build();
        let transport = HttpTransport::new(&options).unwrap();
        assert_eq!(transport.user_agent, "my-wrapper/9.9.9");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_to_error(StatusCode::BAD_REQUEST, "").code,
            ErrorCode::HttpBadRequest
        );
        assert_eq!(
            status_to_error(StatusCode::UNAUTHORIZED, "").code,
            ErrorCode::HttpUnauthorized
        );
        assert_eq!(
            status_to_error(StatusCode::TOO_MANY_REQUESTS, "").code,
            ErrorCode::HttpRateLimited
        );
        assert_eq!(
            status_to_error(StatusCode::SERVICE_UNAVAILABLE, "").code,
            ErrorCode::HttpServerError
        );
        assert_eq!(
            status_to_error(StatusCode::CONFLICT, "").code,
            ErrorCode::HttpBadRequest
        );
    }
}
