//! Logging bootstrap for Rindex.
//!
//! The index reports its operations and structural events (splits,
//! condensation, root changes) through `tracing`. With the `setup_tracing`
//! feature enabled, a subscriber is installed at startup when the
//! `DEBUG_RINDEX` environment variable names a log level (`error`, `warn`,
//! `info`, or anything else truthy for full debug output). Unset, empty,
//! `0`, `false`, and `off` leave logging disabled.

use ctor::ctor;
use tracing::Level;

const ENV_VAR: &str = "DEBUG_RINDEX";

fn requested_level() -> Option<Level> {
    let value = std::env::var(ENV_VAR).ok()?;
    match value.to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "off" => None,
        "error" => Some(Level::ERROR),
        "warn" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        _ => Some(Level::DEBUG),
    }
}

#[ctor]
fn init_tracing() {
    if let Some(level) = requested_level() {
        tracing_subscriber::fmt().with_max_level(level).init();
    }
}
