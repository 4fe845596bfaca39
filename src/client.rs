//! Public client: validates events on the caller's side of the channel,
//! buffers them under a single lock, and hands due batches to the delivery
//! service from a background flush task.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, MissedTickBehavior};

use crate::config::AnalyticsOptions;
use crate::delivery::{BatchEnvelope, BatchTransport, Completion, DeliveryService, PendingSignal};
use crate::error::{AnalyticsError, ErrorCode, Result};
use crate::http::HttpTransport;
use crate::message::{
    AliasParams, GroupParams, IdentifyParams, Message, PageParams, ScreenParams, TrackParams,
};
use crate::queue::Queue;

struct FlushRequest {
    ack: Option<oneshot::Sender<()>>,
}

/// Batching analytics client.
///
/// Each dispatch method validates and constructs the event synchronously;
/// valid events enter the shared buffer in call order. When a flush
/// condition trips (count, serialized size, or the periodic interval) the
/// background task drains the whole buffer into a batch and submits it on
/// its own task, so delivery never blocks accumulation and several batches
/// can be in flight at once.
pub struct Analytics {
    options: AnalyticsOptions,
    state: Arc<Mutex<Queue>>,
    delivery: Arc<DeliveryService>,
    flush_tx: mpsc::Sender<FlushRequest>,
    shutdown_tx: mpsc::Sender<()>,
}

impl Analytics {
    /// Create a client with the production HTTP transport.
    ///
    /// Must be called within a Tokio runtime: the flush worker is spawned
    /// here.
    pub fn new(options: AnalyticsOptions) -> Result<Self> {
        options.validate()?;
        let transport = HttpTransport::new(&options)?.into_transport();
        Ok(Self::with_transport(options, transport))
    }

    /// Create a client over a custom transport. Options are taken as-is;
    /// endpoint and credential fields are unused since the transport owns
    /// the wire.
    pub fn with_transport(options: AnalyticsOptions, transport: BatchTransport) -> Self {
        let delivery = Arc::new(DeliveryService::new(
            transport,
            options.retry.clone(),
            options.error_handler.clone(),
        ));
        let state = Arc::new(Mutex::new(Queue::new(
            options.flush_at,
            options.max_batch_bytes,
        )));

        let (flush_tx, flush_rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        spawn_worker(
            Arc::clone(&state),
            Arc::clone(&delivery),
            flush_rx,
            shutdown_rx,
            options.flush_interval,
        );

        Self {
            options,
            state,
            delivery,
            flush_tx,
            shutdown_tx,
        }
    }

    pub fn identify(&self, params: IdentifyParams, callback: Option<Completion>) {
        self.dispatch(Message::identify(params, &self.options.library), callback);
    }

    pub fn track(&self, params: TrackParams, callback: Option<Completion>) {
        self.dispatch(Message::track(params, &self.options.library), callback);
    }

    pub fn group(&self, params: GroupParams, callback: Option<Completion>) {
        self.dispatch(Message::group(params, &self.options.library), callback);
    }

    pub fn page(&self, params: PageParams, callback: Option<Completion>) {
        self.dispatch(Message::page(params, &self.options.library), callback);
    }

    pub fn screen(&self, params: ScreenParams, callback: Option<Completion>) {
        self.dispatch(Message::screen(params, &self.options.library), callback);
    }

    pub fn alias(&self, params: AliasParams, callback: Option<Completion>) {
        self.dispatch(Message::alias(params, &self.options.library), callback);
    }

    fn dispatch(&self, built: Result<Message>, callback: Option<Completion>) {
        let message = match built {
            Ok(message) => message,
            Err(error) => {
                // Validation failures resolve synchronously and never buffer.
                tracing::debug!(error = %error, "rejected invalid event");
                if let Some(callback) = callback {
                    callback(Err(error));
                }
                return;
            }
        };

        if !self.options.enabled {
            // Disabled clients validate, then drop without transmitting.
            if let Some(callback) = callback {
                callback(Ok(Arc::new(BatchEnvelope {
                    batch: vec![message],
                    sent_at: Utc::now(),
                })));
            }
            return;
        }

        let due = {
            let mut queue = self.state.lock();
            queue.enqueue(message, callback);
            queue.is_due()
        };

        if due {
            // A lost signal is fine: the interval tick picks the batch up.
            let _ = self.flush_tx.try_send(FlushRequest { ack: None });
        }
    }

    /// Force a flush regardless of thresholds, then wait until no delivery
    /// attempt is in flight.
    pub async fn flush(&self) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.flush_tx
            .send(FlushRequest { ack: Some(ack_tx) })
            .await
            .map_err(|_| AnalyticsError::new(ErrorCode::ClientClosed, "Flush worker stopped"))?;
        ack_rx
            .await
            .map_err(|_| AnalyticsError::new(ErrorCode::FlushFailed, "Flush request dropped"))?;
        Ok(())
    }

    /// Final flush, then stop the background task.
    pub async fn shutdown(&self) {
        let _ = self.flush().await;
        let _ = self.shutdown_tx.send(()).await;
    }

    /// Whether any batch is currently between submission start and attempt
    /// resolution.
    pub fn is_pending(&self) -> bool {
        self.delivery.pending().is_pending()
    }

    pub fn pending(&self) -> PendingSignal {
        self.delivery.pending().clone()
    }

    /// Number of buffered events not yet flushed.
    pub fn queued(&self) -> usize {
        self.state.lock().len()
    }
}

fn spawn_worker(
    state: Arc<Mutex<Queue>>,
    delivery: Arc<DeliveryService>,
    mut flush_rx: mpsc::Receiver<FlushRequest>,
    mut shutdown_rx: mpsc::Receiver<()>,
    flush_interval: Duration,
) {
    tokio::spawn(async move {
        let mut ticker = interval(flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    drain_remaining(&state, &delivery).await;
                    tracing::debug!("flush worker shutting down");
                    break;
                }
                request = flush_rx.recv() => match request {
                    Some(request) => {
                        let batch = state.lock().take_batch();
                        let delivery = Arc::clone(&delivery);
                        tokio::spawn(async move {
                            if !batch.is_empty() {
                                if let Err(error) = delivery.submit(batch).await {
                                    tracing::error!(
                                        error = %error,
                                        "batch delivery failed with no error handler configured"
                                    );
                                }
                            }
                            if let Some(ack) = request.ack {
                                // Forced flushes also wait out batches that
                                // were already in flight.
                                delivery.pending().wait_idle().await;
                                let _ = ack.send(());
                            }
                        });
                    }
                    // Every sender dropped: the client is gone.
                    None => {
                        drain_remaining(&state, &delivery).await;
                        break;
                    }
                },
                _ = ticker.tick() => {
                    let batch = {
                        let mut queue = state.lock();
                        if queue.is_empty() {
                            continue;
                        }
                        queue.take_batch()
                    };
                    tracing::debug!(batch_size = batch.len(), "interval flush");
                    let delivery = Arc::clone(&delivery);
                    tokio::spawn(async move {
                        if let Err(error) = delivery.submit(batch).await {
                            tracing::error!(
                                error = %error,
                                "batch delivery failed with no error handler configured"
                            );
                        }
                    });
                }
            }
        }
    });
}

async fn drain_remaining(state: &Arc<Mutex<Queue>>, delivery: &Arc<DeliveryService>) {
    let batch = state.lock().take_batch();
    if !batch.is_empty() {
        if let Err(error) = delivery.submit(batch).await {
            tracing::error!(
                error = %error,
                "batch delivery failed with no error handler configured"
            );
        }
    }
}
