//! Logging setup.
//!
//! One call at startup wires `tracing` with an env-filterable subscriber;
//! `RAMPART_LOG` overrides the default level.

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. Safe to call once per process.
pub fn init() {
    let filter = EnvFilter::try_from_env("RAMPART_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(true).init();
}
