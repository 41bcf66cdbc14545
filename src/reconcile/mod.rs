//! Reconciliation subsystem.
//!
//! # Data Flow
//! ```text
//! dispatcher decision (create | update | delete)
//!     → overrides.rs (chart values from the snapshot)
//!     → gate.rs (serialise operations per load balancer id)
//!     → operations.rs (Reconciler: create / update / delete / has_deployment)
//!     → backend.rs (DeploymentBackend trait)
//!         - helm.rs (helm + kubectl)
//!         - memory.rs (in-process, dev mode and tests)
//! ```
//!
//! # Design Decisions
//! - The reconciler owns all mutation of deployment state
//! - Every operation is keyed solely by the load balancer id
//! - create is an upsert and delete tolerates absence, so redelivery is safe
//! - update never creates

pub mod backend;
pub mod gate;
pub mod helm;
pub mod memory;
pub mod operations;
pub mod overrides;

pub use backend::{BackendError, BackendResult, DeploymentBackend};
pub use gate::KeyedGate;
pub use helm::HelmBackend;
pub use memory::{BackendCall, BackendOp, MemoryBackend};
pub use operations::{ReconcileError, ReconcileResult, Reconciler, UpdateOutcome};
pub use overrides::OverrideBuilder;
