//! Batching analytics client for Rust.
//!
//! Events (identify/track/group/page/screen/alias) are validated, buffered,
//! and delivered to a collection endpoint as atomic batches with bounded
//! retry. Each event may carry a completion callback that resolves exactly
//! once with the delivery outcome.
//!
//! # Quick Start
//!
//! ```no_run
//! use analytics_rust::{Analytics, AnalyticsOptions, TrackParams, CommonParams};
//!
//! #[tokio::main]
//! async fn main() -> analytics_rust::Result<()> {
//!     let options = AnalyticsOptions::builder("YOUR_WRITE_KEY")
//!         .flush_at(20)
//!         .build();
//!     let client = Analytics::new(options)?;
//!
//!     client.track(
//!         TrackParams {
//!             common: CommonParams {
//!                 user_id: Some("user-123".to_string()),
//!                 ..Default::default()
//!             },
//!             event: "Signed Up".to_string(),
//!             ..Default::default()
//!         },
//!         Some(Box::new(|result| {
//!             if let Err(error) = result {
//!                 eprintln!("event failed: {error}");
//!             }
//!         })),
//!     );
//!
//!     // Deliver everything still buffered before exiting.
//!     client.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod delivery;
pub mod error;
pub mod http;
pub mod message;
pub mod queue;
mod client;

pub use client::Analytics;
pub use config::{
    AnalyticsOptions, AnalyticsOptionsBuilder, ErrorHandler, LibraryInfo, DEFAULT_FLUSH_AT,
    DEFAULT_FLUSH_INTERVAL, DEFAULT_HOST, DEFAULT_MAX_BATCH_BYTES, DEFAULT_PATH,
    DEFAULT_RETRY_COUNT, DEFAULT_TIMEOUT,
};
pub use delivery::{BatchEnvelope, BatchTransport, Completion, DeliveryService, PendingSignal};
pub use error::{AnalyticsError, ErrorCode, Result};
pub use http::{HttpTransport, RetryConfig, RetryConfigBuilder};
pub use message::{
    AliasParams, CommonParams, GroupParams, IdentifyParams, Message, MessageBody, PageParams,
    ScreenParams, TrackParams,
};
pub use queue::{Batch, Queue};

/// Library name stamped into `context.library` and the outbound user-agent.
pub const SDK_NAME: &str = "analytics-rust";

/// Library version stamped alongside [`SDK_NAME`].
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");
