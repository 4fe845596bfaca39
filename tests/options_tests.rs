use analytics_rust::{AnalyticsOptions, ErrorCode, RetryConfig, SDK_NAME, SDK_VERSION};
use std::time::Duration;

#[test]
fn test_default_values() {
    let options = AnalyticsOptions::new("test_write_key");

    assert_eq!(options.write_key, "test_write_key");
    assert_eq!(options.host, "https://api.segment.io");
    assert_eq!(options.path, "/v1/batch");
    assert_eq!(options.flush_at, 20);
    assert_eq!(options.max_batch_bytes, 450 * 1024);
    assert_eq!(options.flush_interval, Duration::from_secs(10));
    assert_eq!(options.retry.retries, 3);
    assert_eq!(options.timeout, Duration::from_secs(10));
    assert!(options.enabled);
    assert!(options.error_handler.is_none());
    assert!(options.http_client.is_none());
    assert_eq!(options.library.name, SDK_NAME);
    assert_eq!(options.library.version, SDK_VERSION);
}

#[test]
fn test_builder_custom_values() {
    let options = AnalyticsOptions::builder("test_write_key")
        .host("https://collector.example.com")
        .path("/v2/ingest")
        .flush_at(50)
        .max_batch_bytes(100_000)
        .flush_interval(Duration::from_secs(30))
        .retry_count(5)
        .timeout(Duration::from_secs(5))
        .enabled(false)
        .build();

    assert_eq!(options.host, "https://collector.example.com");
    assert_eq!(options.path, "/v2/ingest");
    assert_eq!(options.flush_at, 50);
    assert_eq!(options.max_batch_bytes, 100_000);
    assert_eq!(options.flush_interval, Duration::from_secs(30));
    assert_eq!(options.retry.retries, 5);
    assert_eq!(options.timeout, Duration::from_secs(5));
    assert!(!options.enabled);
}

#[test]
fn test_builder_full_retry_override() {
    let retry = RetryConfig::builder()
        .retries(1)
        .base_delay_ms(250)
        .max_delay_ms(2000)
        .backoff_multiplier(3.0)
        .jitter_ms(10)
        .build();
    let options = AnalyticsOptions::builder("key").retry(retry).build();

    assert_eq!(options.retry.retries, 1);
    assert_eq!(options.retry.base_delay_ms, 250);
    assert_eq!(options.retry.max_delay_ms, 2000);
    assert_eq!(options.retry.backoff_multiplier, 3.0);
    assert_eq!(options.retry.jitter_ms, 10);
}

#[test]
fn test_trailing_slashes_trimmed() {
    let options = AnalyticsOptions::builder("key")
        .host("https://collector.example.com///")
        .path("/v1/batch/")
        .build();

    assert_eq!(options.endpoint(), "https://collector.example.com/v1/batch");
}

#[test]
fn test_flush_at_clamped_to_one() {
    let options = AnalyticsOptions::builder("key").flush_at(0).build();
    assert_eq!(options.flush_at, 1);
}

#[test]
fn test_validate_rejects_empty_write_key() {
    let err = AnalyticsOptions::new("").validate().unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigMissingWriteKey);
    assert!(err.is_config_error());
}

#[test]
fn test_validate_rejects_invalid_host() {
    let options = AnalyticsOptions::builder("key").host("::garbage::").build();
    let err = options.validate().unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigInvalidHost);
}

#[test]
fn test_validate_rejects_zero_timeout() {
    let options = AnalyticsOptions::builder("key")
        .timeout(Duration::ZERO)
        .build();
    let err = options.validate().unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigInvalidInterval);
}

#[test]
fn test_validate_accepts_defaults() {
    assert!(AnalyticsOptions::new("key").validate().is_ok());
}
