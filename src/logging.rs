//! Log output for hosts and tools embedding the engine.
//!
//! The engine itself only emits `log` records. These helpers install a
//! `tracing-subscriber` formatter that also picks those records up.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str = "info";

/// `RUST_LOG` when set, `default_filter` otherwise.
pub fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Registry with the env filter and a formatter, not yet installed.
fn subscriber(default_filter: &str) -> impl SubscriberInitExt {
    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(fmt::layer().with_target(true).with_level(true))
}

/// Installs the global subscriber. Returns false if one was already set,
/// which leaves the existing subscriber in place.
pub fn init(default_filter: &str) -> bool {
    subscriber(default_filter).try_init().is_ok()
}
