//! In-process bounded queues.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::model::{ChangeMessage, EventMessage};
use crate::transport::publisher::{PublishError, Publisher};
use crate::transport::{Acknowledger, Delivery, Subscription, Subscriptions, TransportError};

struct OneshotAcker {
    tx: Mutex<Option<oneshot::Sender<()>>>,
}

#[async_trait]
impl Acknowledger for OneshotAcker {
    async fn ack(&self, message_id: &str) -> Result<(), TransportError> {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
        match tx {
            Some(tx) => tx
                .send(())
                .map_err(|_| TransportError::Closed(message_id.to_string())),
            None => Err(TransportError::AlreadyAcknowledged(message_id.to_string())),
        }
    }
}

/// Resolves once the consumer acknowledges the published message.
#[derive(Debug)]
pub struct AckReceipt {
    id: String,
    rx: oneshot::Receiver<()>,
}

impl AckReceipt {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the ack. `false` when the delivery was dropped unacknowledged.
    pub async fn acknowledged(self) -> bool {
        self.rx.await.is_ok()
    }

    /// Like [`AckReceipt::acknowledged`], bounded by `limit`.
    pub async fn acknowledged_within(self, limit: Duration) -> bool {
        matches!(tokio::time::timeout(limit, self.rx).await, Ok(Ok(())))
    }
}

/// Producer half of a bounded in-process channel.
#[derive(Debug)]
pub struct MemoryQueue<T> {
    tx: mpsc::Sender<Delivery<T>>,
}

impl<T> Clone for MemoryQueue<T> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<T: Send + 'static> MemoryQueue<T> {
    pub fn channel(depth: usize) -> (Self, Subscription<T>) {
        let (tx, rx) = mpsc::channel(depth);
        let subscription = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|delivery| (delivery, rx))
        })
        .boxed();
        (Self { tx }, subscription)
    }

    /// Enqueue a message under a fresh id.
    pub async fn publish(&self, message: T) -> Result<AckReceipt, TransportError> {
        self.publish_with_id(Uuid::new_v4().to_string(), message).await
    }

    /// Enqueue a message under a caller-chosen id (redelivery keeps its id).
    pub async fn publish_with_id(
        &self,
        id: impl Into<String>,
        message: T,
    ) -> Result<AckReceipt, TransportError> {
        let id = id.into();
        let (ack_tx, ack_rx) = oneshot::channel();
        let acker = OneshotAcker { tx: Mutex::new(Some(ack_tx)) };
        let delivery = Delivery::new(id.clone(), message, Box::new(acker));

        self.tx
            .send(delivery)
            .await
            .map_err(|_| TransportError::QueueClosed)?;

        Ok(AckReceipt { id, rx: ack_rx })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Both inbound channels plus a recording publisher.
#[derive(Debug, Clone)]
pub struct MemoryBus {
    pub events: MemoryQueue<EventMessage>,
    pub changes: MemoryQueue<ChangeMessage>,
    published: std::sync::Arc<Mutex<Vec<(String, ChangeMessage)>>>,
}

impl MemoryBus {
    pub fn new(depth: usize) -> (Self, Subscriptions) {
        let (events, event_sub) = MemoryQueue::channel(depth);
        let (changes, change_sub) = MemoryQueue::channel(depth);
        let bus = Self {
            events,
            changes,
            published: Default::default(),
        };
        (bus, Subscriptions { events: event_sub, changes: change_sub })
    }

    /// Change messages published through this bus, with their subjects.
    pub fn published(&self) -> Vec<(String, ChangeMessage)> {
        self.published.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl Publisher for MemoryBus {
    async fn publish_change(&self, subject: &str, message: &ChangeMessage) -> Result<(), PublishError> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((subject.to_string(), message.clone()));
        Ok(())
    }
}
