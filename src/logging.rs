//! Logger setup.
//!
//! The library only emits through the `log` facade. Hosts that do not
//! install their own logger can call [`init`].

use crate::config::LogLevel;

/// Install a logger filtered at `level`.
///
/// On native targets this is `env_logger`, and `RUST_LOG` still overrides
/// the level. A second call keeps the first logger.
pub fn init(level: LogLevel) {
    #[cfg(not(target_arch = "wasm32"))]
    {
        let result = env_logger::Builder::new()
            .filter_level(level.to_level_filter())
            .parse_default_env()
            .try_init();
        if let Err(e) = result {
            log::debug!("Logger already initialized: {}", e);
        }
    }

    #[cfg(target_arch = "wasm32")]
    log::set_max_level(level.to_level_filter());
}
