//! Domain model shared by every subsystem.
//!
//! # Data Flow
//! ```text
//! transport Delivery<EventMessage | ChangeMessage>
//!     → id.rs (PrefixedId: subject + associated ids)
//!     → load_balancer.rs (LoadBalancerRef built by the classifier)
//!     → DeploymentTarget + ValueOverride handed to the reconciler
//! ```
//!
//! # Design Decisions
//! - Identifiers stay textual; the prefix is the only structure we rely on
//! - A LoadBalancerRef lives for one message and is never persisted

pub mod id;
pub mod load_balancer;
pub mod message;

pub use id::PrefixedId;
pub use load_balancer::{
    DeploymentTarget, LbKind, LoadBalancerRef, LoadBalancerSnapshot, Resources, TargetError,
    ValueOverride,
};
pub use message::{
    ChangeMessage, ChangeType, DomainEvent, EventMessage, FieldChange, InboundEvent,
    IP_ADDRESS_ASSIGNED, IP_ADDRESS_UNASSIGNED,
};
