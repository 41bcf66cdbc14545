//! Message transport subsystem.
//!
//! # Data Flow
//! ```text
//! producer (ingress handler, test, dev tooling)
//!     → memory.rs (bounded queue per channel, one oneshot per delivery)
//!     → Subscription<T> (stream of Delivery<T>)
//!     → consumer loop
//!     → Delivery::ack() → producer's AckReceipt resolves
//!
//! metering
//!     → publisher.rs (Publisher::publish_change)
//! ```
//!
//! # Design Decisions
//! - Delivery is at-least-once: an unacknowledged delivery is the producer's
//!   to redeliver
//! - A delivery can be acknowledged once; a second ack is an error
//! - Subscriptions are plain streams so any transport can feed the loops

pub mod memory;
pub mod publisher;

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use thiserror::Error;

use crate::model::{ChangeMessage, EventMessage};

pub use memory::{AckReceipt, MemoryBus, MemoryQueue};
pub use publisher::{HttpPublisher, PublishError, Publisher};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("message {0} was already acknowledged")]
    AlreadyAcknowledged(String),

    #[error("subscription for message {0} is closed")]
    Closed(String),

    #[error("queue is closed")]
    QueueClosed,
}

/// Transport-side acknowledgment of a single delivery.
#[async_trait]
pub trait Acknowledger: Send + Sync {
    async fn ack(&self, message_id: &str) -> Result<(), TransportError>;
}

/// One delivered message plus the means to acknowledge it.
pub struct Delivery<T> {
    id: String,
    message: T,
    acker: Box<dyn Acknowledger>,
    acked: AtomicBool,
}

impl<T> Delivery<T> {
    pub fn new(id: impl Into<String>, message: T, acker: Box<dyn Acknowledger>) -> Self {
        Self {
            id: id.into(),
            message,
            acker,
            acked: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn message(&self) -> &T {
        &self.message
    }

    pub fn is_acked(&self) -> bool {
        self.acked.load(Ordering::Acquire)
    }

    /// Acknowledge the delivery. Fails on a second call.
    pub async fn ack(&self) -> Result<(), TransportError> {
        if self.acked.swap(true, Ordering::AcqRel) {
            return Err(TransportError::AlreadyAcknowledged(self.id.clone()));
        }
        self.acker.ack(&self.id).await
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Delivery<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("id", &self.id)
            .field("message", &self.message)
            .field("acked", &self.is_acked())
            .finish()
    }
}

/// Stream of deliveries for one channel.
pub type Subscription<T> = BoxStream<'static, Delivery<T>>;

/// The two inbound channels.
pub struct Subscriptions {
    pub events: Subscription<EventMessage>,
    pub changes: Subscription<ChangeMessage>,
}

impl std::fmt::Debug for Subscriptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriptions").finish_non_exhaustive()
    }
}
