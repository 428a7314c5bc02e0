//! Logging utilities
//!
//! All modules log through the `log` facade; `env_logger` is the default
//! backend installed by hosts that have no logger of their own.

pub use log::{debug, info, warn, error, trace};

use log::LevelFilter;

/// Initialize the logging system with `RUST_LOG`, falling back to `info`
pub fn init() {
    init_with_level("info");
}

/// Initialize the logging system with a default level.
///
/// `RUST_LOG` still takes precedence when set. Unknown level names fall back
/// to `info`. Calling this more than once is harmless.
pub fn init_with_level(level: &str) {
    let filter = parse_level(level);
    let _ = env_logger::Builder::new()
        .filter_level(filter)
        .parse_env("RUST_LOG")
        .try_init();
}

/// Parse a level name ("trace", "debug", "info", "warn", "error", "off")
pub fn parse_level(level: &str) -> LevelFilter {
    level.trim().parse().unwrap_or(LevelFilter::Info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), LevelFilter::Debug);
        assert_eq!(parse_level(" WARN "), LevelFilter::Warn);
        assert_eq!(parse_level("off"), LevelFilter::Off);
        assert_eq!(parse_level("loud"), LevelFilter::Info);
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_with_level("error");
        init_with_level("trace");
    }
}
