//! Tracing setup for embedders.
//!
//! Filter precedence: `RUST_LOG`, then the configured filter, then `off`.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const MAX_FILTER_LEN: usize = 4096;

fn parse_filter(raw: &str) -> Option<EnvFilter> {
    let raw = raw.trim();
    // Ignore empty or absurdly long filters rather than failing startup.
    if raw.is_empty() || raw.len() > MAX_FILTER_LEN {
        return None;
    }
    EnvFilter::try_new(raw).ok()
}

/// Pick the filter from `RUST_LOG`, falling back to `configured`.
pub fn resolve_filter(env_value: Option<&str>, configured: Option<&str>) -> EnvFilter {
    env_value
        .and_then(parse_filter)
        .or_else(|| configured.and_then(parse_filter))
        .unwrap_or_else(|| EnvFilter::new("off"))
}

/// Install the global subscriber.
///
/// Returns `false` if a subscriber was already installed.
pub fn init(configured: Option<&str>) -> bool {
    let env_value = std::env::var("RUST_LOG").ok();
    let filter = resolve_filter(env_value.as_deref(), configured);

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init()
        .is_ok()
}
