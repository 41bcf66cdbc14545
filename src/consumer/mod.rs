//! Event loop and acknowledgment boundary.
//!
//! # Data Flow
//! ```text
//! Subscription<T>
//!     → next delivery (or shutdown)
//!     → Handle<T>::handle (raced against shutdown)
//!     → outcome counted
//!     → Delivery::ack (best-effort)
//! ```
//!
//! # Design Decisions
//! - One loop per channel, strictly sequential
//! - Ack after the attempt whatever the outcome; failures are not retried
//!   through redelivery
//! - A message interrupted by shutdown is dropped unacknowledged so the
//!   transport redelivers it

use std::sync::Arc;

use futures_util::StreamExt;

use crate::dispatch::Handle;
use crate::lifecycle::ShutdownListener;
use crate::observability::metrics;
use crate::transport::Subscription;

/// Counters for one loop run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopReport {
    /// Messages handled and acknowledged (ack failures included).
    pub processed: u64,
    /// Acknowledgments that failed.
    pub ack_failures: u64,
    /// True when a message was abandoned mid-flight by shutdown.
    pub abandoned: bool,
}

/// Drain `subscription` through `handler` until it ends or shutdown fires.
pub async fn run_loop<T, H>(
    mut subscription: Subscription<T>,
    handler: Arc<H>,
    mut shutdown: ShutdownListener,
) -> LoopReport
where
    T: Send + Sync + 'static,
    H: Handle<T> + ?Sized,
{
    let channel = handler.channel();
    let mut report = LoopReport::default();
    tracing::info!(channel, "Consumer started");

    loop {
        let delivery = tokio::select! {
            biased;
            _ = shutdown.recv() => break,
            next = subscription.next() => match next {
                Some(delivery) => delivery,
                None => {
                    tracing::info!(channel, "Subscription closed");
                    break;
                }
            },
        };

        let outcome = tokio::select! {
            biased;
            _ = shutdown.recv() => {
                tracing::warn!(
                    channel,
                    message_id = %delivery.id(),
                    "Shutdown while processing; message left unacknowledged"
                );
                report.abandoned = true;
                break;
            }
            outcome = handler.handle(delivery.id(), delivery.message()) => outcome,
        };

        metrics::record_message(channel, outcome.label());
        tracing::debug!(channel, message_id = %delivery.id(), outcome = outcome.label(), "Message processed");

        if let Err(e) = delivery.ack().await {
            metrics::record_ack_failure(channel);
            report.ack_failures += 1;
            tracing::error!(channel, message_id = %delivery.id(), error = %e, "Unable to acknowledge message");
        }
        report.processed += 1;
    }

    tracing::info!(channel, processed = report.processed, "Consumer stopped");
    report
}
