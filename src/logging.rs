//! Tracing subscriber setup for binaries embedding the board.

use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter directive.
pub const LOG_ENV_VAR: &str = "DEALBOARD_LOG";

/// Installs a global `fmt` subscriber.
///
/// The filter comes from `DEALBOARD_LOG` when set and valid, otherwise from
/// `default_filter` (e.g. `"dealboard=info"`). Returns `false` if a global
/// subscriber was already installed.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
