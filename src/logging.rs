//! Logging Initialization
//!
//! Structured tracing setup for embedders. `RUST_LOG` wins over the default
//! level when set.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber.
///
/// Safe to call once per process; embedders that install their own
/// subscriber should skip this.
pub fn init(default_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
