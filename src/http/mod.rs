pub mod client;
pub mod retry;

pub use client::HttpTransport;
pub use retry::{is_retryable, with_retry, with_retry_predicate, RetryConfig, RetryConfigBuilder};
