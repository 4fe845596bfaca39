//! Batch delivery with retry classification and callback resolution.
//!
//! A [`DeliveryService`] owns the outbound transport handle, submits a batch
//! with bounded retry, exposes an in-flight pending signal, and resolves
//! every callback in the batch exactly once. Failure is per-batch: every
//! message in a failed batch receives the same terminal error.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Notify;

use crate::config::ErrorHandler;
use crate::error::{AnalyticsError, Result};
use crate::http::retry::{is_retryable, with_retry_predicate, RetryConfig};
use crate::message::Message;
use crate::queue::Batch;

/// Submission envelope POSTed to the collection endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEnvelope {
    pub batch: Vec<Message>,
    pub sent_at: DateTime<Utc>,
}

/// Single-invocation outcome handler attached to one event.
///
/// Resolved exactly once per message: synchronously with a validation error,
/// or after delivery with `Ok(envelope)` on success and the terminal error
/// on failure.
pub type Completion = Box<dyn FnOnce(Result<Arc<BatchEnvelope>>) + Send>;

/// Submit-once transport seam. The production implementation wraps an HTTP
/// client; tests substitute closures. Retry lives outside this call.
pub type BatchTransport =
    Arc<dyn Fn(BatchEnvelope) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send + Sync>;

/// Observable in-flight indicator. Counter-based so several batches can be
/// pending concurrently; `is_pending` reports whether any delivery attempt
/// is between submission start and resolution.
#[derive(Clone)]
pub struct PendingSignal {
    inner: Arc<PendingInner>,
}

struct PendingInner {
    in_flight: AtomicUsize,
    idle: Notify,
}

impl PendingSignal {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(PendingInner {
                in_flight: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire) > 0
    }

    /// Raise the signal for the lifetime of the returned guard. The guard
    /// releases on drop, so the signal resets even if the attempt panics.
    pub(crate) fn raise(&self) -> PendingGuard {
        self.inner.in_flight.fetch_add(1, Ordering::AcqRel);
        PendingGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Wait until no delivery attempt is in flight. Returns immediately
    /// when already idle.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.inner.in_flight.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Default for PendingSignal {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) struct PendingGuard {
    inner: Arc<PendingInner>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.inner.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}

pub struct DeliveryService {
    transport: BatchTransport,
    retry: RetryConfig,
    pending: PendingSignal,
    error_handler: Option<ErrorHandler>,
}

impl DeliveryService {
    pub fn new(
        transport: BatchTransport,
        retry: RetryConfig,
        error_handler: Option<ErrorHandler>,
    ) -> Self {
        Self {
            transport,
            retry,
            pending: PendingSignal::new(),
            error_handler,
        }
    }

    pub fn pending(&self) -> &PendingSignal {
        &self.pending
    }

    /// Submit one flushed batch: build the envelope, attempt delivery with
    /// bounded retry, and resolve every callback in original order.
    ///
    /// On terminal failure the callbacks resolve first; the error then goes
    /// to the configured handler, or is returned to the caller when no
    /// handler exists so the fault stays observable.
    pub async fn submit(&self, batch: Batch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let (messages, callbacks) = batch.into_parts();
        tracing::debug!(batch_size = messages.len(), "submitting batch");

        let envelope = BatchEnvelope {
            batch: messages,
            sent_at: Utc::now(),
        };

        let result = {
            let _pending = self.pending.raise();
            with_retry_predicate(
                || (self.transport)(envelope.clone()),
                &self.retry,
                is_retryable,
            )
            .await
        };

        let envelope = Arc::new(envelope);
        match result {
            Ok(()) => {
                for callback in callbacks.into_iter().flatten() {
                    callback(Ok(Arc::clone(&envelope)));
                }
                Ok(())
            }
            Err(error) => {
                tracing::warn!(error = %error, "batch delivery failed");
                for callback in callbacks.into_iter().flatten() {
                    callback(Err(error.clone()));
                }
                match &self.error_handler {
                    Some(handler) => {
                        handler(&error);
                        Ok(())
                    }
                    None => Err(error),
                }
            }
        }
    }
}
