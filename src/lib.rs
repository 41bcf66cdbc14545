//! Load balancer operator library.

pub mod classify;
pub mod config;
pub mod consumer;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod lookup;
pub mod metering;
pub mod model;
pub mod observability;
pub mod operator;
pub mod reconcile;
pub mod status;
pub mod transport;

pub use config::OperatorConfig;
pub use dispatch::{Dispatcher, Outcome};
pub use error::OperatorError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use operator::{Adapters, Operator};
