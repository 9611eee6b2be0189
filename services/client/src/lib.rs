pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod telemetry;

pub use app::{App, BackendKind};
pub use config::{BackendSelection, Config, ConfigError};
pub use error::ClientError;
