//! services/client/src/telemetry.rs

use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global tracing subscriber at `level`. Returns `false` when one
/// was already installed, e.g. by an embedding host or an earlier call.
pub fn init(level: Level) -> bool {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
