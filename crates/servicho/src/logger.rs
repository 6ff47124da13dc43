//! Logging setup built on `tracing`.
//!
//! Verbosity is decided in this order:
//! 1. `--verbose`: debug level for servicho
//! 2. `--quiet`: errors only
//! 3. `RUST_LOG`: custom filter
//! 4. Default: info level for servicho
//!
//! ```rust,no_run
//! use servicho::logger::init_logger;
//!
//! init_logger(false, false, false);
//! tracing::info!("ready");
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERBOSE_FILTER: &str = "servicho=debug";
const QUIET_FILTER: &str = "servicho=error";
const DEFAULT_FILTER: &str = "servicho=info";

/// Pick the filter for the given flags.
pub fn build_filter(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Initialize the global tracing subscriber. Call once, before logging.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    // A subscriber may already be installed (tests, embedding).
    let _ = tracing_subscriber::registry()
        .with(build_filter(verbose, quiet))
        .with(fmt_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_filter() {
        let filter = build_filter(true, false);
        assert_eq!(filter.to_string(), VERBOSE_FILTER);
    }

    #[test]
    fn test_quiet_filter() {
        let filter = build_filter(false, true);
        assert_eq!(filter.to_string(), QUIET_FILTER);
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        init_logger(false, true, true);
        init_logger(false, true, true);
    }
}
