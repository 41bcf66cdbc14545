//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → consumer loops stop pulling → in-flight message abandoned
//!             → HTTP surface stops accepting → operator exits
//! ```
//!
//! # Design Decisions
//! - One broadcast coordinator shared by every long-running task
//! - Late subscribers still observe a shutdown that already happened

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownListener};
pub use signals::wait_for_signal;
