//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + CLI overrides
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → OperatorConfig (validated, immutable)
//!     → passed by value/Arc into classifier, dispatcher and adapters
//! ```
//!
//! # Design Decisions
//! - Config is built once at startup; nothing in the core reads globals
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Startup errors are fatal; per-message errors never are

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, read_config, ConfigError};
pub use schema::{
    ApiConfig, ChartConfig, EventsConfig, HealthConfig, MetadataConfig, MeteringConfig,
    ObservabilityConfig, OperatorConfig,
};
pub use validation::{validate_config, ValidationError};
