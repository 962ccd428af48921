//! Logging utilities
//!
//! This module sets up the `log` facade with `env_logger`.
//!
//! # Example
//!
//! ```rust
//! use olist_etl::utils::Logger;
//!
//! Logger::init();
//! log::info!("loader started");
//! ```

use log::LevelFilter;

/// Logger setup
pub struct Logger;

impl Logger {
    /// Initialize the logger at `info`
    ///
    /// `RUST_LOG` still applies on top of the default level, e.g.
    /// `RUST_LOG=olist_etl=debug` prints every statement issued.
    pub fn init() {
        Self::init_with_level(LevelFilter::Info);
    }

    /// Initialize logger with custom log level
    ///
    /// Calling this more than once is harmless; later calls are ignored.
    ///
    /// # Arguments
    /// * `level` - Log level filter
    pub fn init_with_level(level: LevelFilter) {
        let _ = env_logger::Builder::new()
            .filter_level(level)
            .parse_default_env()
            .format_timestamp_millis()
            .try_init();
    }

    /// Level for a count of `-v` flags
    pub fn level_for_verbosity(verbose: u8) -> LevelFilter {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_init_twice() {
        Logger::init_with_level(LevelFilter::Trace);
        assert_ne!(log::max_level(), LevelFilter::Off);

        // a second call neither panics nor replaces the installed logger
        let installed = log::max_level();
        Logger::init_with_level(LevelFilter::Error);
        assert_eq!(log::max_level(), installed);
    }

    #[test]
    fn test_level_for_verbosity() {
        assert_eq!(Logger::level_for_verbosity(0), LevelFilter::Info);
        assert_eq!(Logger::level_for_verbosity(1), LevelFilter::Debug);
        assert_eq!(Logger::level_for_verbosity(5), LevelFilter::Trace);
    }
}
