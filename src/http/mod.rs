//! HTTP surface subsystem.
//!
//! # Data Flow
//! ```text
//! GET /livez, /readyz
//!     → health.rs (process up / operator consuming)
//!
//! POST /events/{topic}, /changes/{topic}
//!     → ingress.rs (topic check, JSON decode)
//!     → MemoryQueue::publish → consumer loop
//!     → AckReceipt resolves → 202, or 503 when never acknowledged
//! ```

pub mod health;
pub mod ingress;
pub mod server;

pub use health::Readiness;
pub use server::HttpServer;
