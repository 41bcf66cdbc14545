//! Event classification subsystem.
//!
//! # Data Flow
//! ```text
//! InboundEvent (subject + associated ids)
//!     → location.rs (drop events outside configured locations)
//!     → classifier.rs (DirectLb | AssociatedLb | NotLb)
//!     → LoadBalancerRef handed to the dispatcher
//! ```
//!
//! # Design Decisions
//! - Both stages are pure functions of their inputs; no I/O
//! - Classification never errors, it returns NotLb
//! - Location matching is by suffix so one token matches a family of ids

pub mod classifier;
pub mod location;

pub use classifier::Classifier;
pub use location::{passes, LocationFilter};
