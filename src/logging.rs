// Tracing subscriber setup

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "vibelist=info,vibelist_lib=info,tower_http=info";

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
/// Safe to call more than once; later calls are ignored.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_err()
    {
        tracing::debug!("Tracing subscriber already installed");
    }
}
