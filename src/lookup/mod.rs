//! Load balancer lookup subsystem.
//!
//! # Data Flow
//! ```text
//! dispatcher (classified LoadBalancerRef)
//!     → LoadBalancerLookup::get(id)
//!         - http.rs (load balancer API over HTTP)
//!         - memory.rs (in-process table, dev mode and tests)
//!     → LoadBalancerSnapshot attached to the ref
//! ```
//!
//! # Design Decisions
//! - Lookup failures are never retried here; the dispatcher drops the event
//! - Every request has a deadline

pub mod http;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{LoadBalancerSnapshot, PrefixedId};

pub use http::HttpLookup;
pub use memory::MemoryLookup;

/// Errors returned by a lookup backend.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("load balancer {0} not found")]
    NotFound(PrefixedId),

    #[error("lookup request failed: {0}")]
    Request(String),

    #[error("lookup timed out after {0} seconds")]
    Timeout(u64),

    #[error("unexpected lookup response status {0}")]
    Status(u16),

    #[error("unable to decode lookup response: {0}")]
    Decode(String),
}

pub type LookupResult<T> = Result<T, LookupError>;

/// Fetches the current declared configuration of a load balancer.
#[async_trait]
pub trait LoadBalancerLookup: Send + Sync {
    async fn get(&self, id: &PrefixedId) -> LookupResult<LoadBalancerSnapshot>;
}
