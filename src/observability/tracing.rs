//! Per-message spans.
//!
//! Every processed message runs inside a span named after its channel. The
//! inbound trace context is attached verbatim so log lines can be joined with
//! the producer's trace.

use tracing::Span;

use crate::model::InboundEvent;

pub const EVENTS_CHANNEL: &str = "events";
pub const CHANGES_CHANNEL: &str = "changes";

macro_rules! channel_span {
    ($name:literal, $message_id:expr, $event:expr) => {
        tracing::info_span!(
            $name,
            message_id = %$message_id,
            subject_id = %$event.subject_id(),
            event_type = %$event.event_type(),
            trace_context = ?$event.trace_context(),
            loadbalancer_id = tracing::field::Empty,
        )
    };
}

/// Span for one message on `channel`.
pub fn message_span<E: InboundEvent>(channel: &str, message_id: &str, event: &E) -> Span {
    if channel == CHANGES_CHANNEL {
        channel_span!("process_change", message_id, event)
    } else {
        channel_span!("process_event", message_id, event)
    }
}

/// Record the resolved load balancer on the current span.
pub fn record_loadbalancer(id: &impl std::fmt::Display) {
    Span::current().record("loadbalancer_id", tracing::field::display(id));
}
