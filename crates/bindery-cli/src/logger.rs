//! Logging setup for the bindery CLI.
//!
//! Log lines go to stderr so `bindery deps` can print JSON to stdout.
//!
//! ```rust,no_run
//! use bindery_cli::logger::init_logger;
//! use tracing::info;
//!
//! init_logger(false, false, false);
//! info!("Starting build");
//! ```

use std::io::IsTerminal;

use bindery_bundler::logging::LogLevel;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber.
///
/// Level, in order of precedence: `--verbose` (debug), `--quiet` (errors
/// only), `RUST_LOG`, then info for bindery crates. Calling it twice is a
/// no-op.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    init_logger_with_filter(filter_for(verbose, quiet), no_color);
}

/// Install the global subscriber with an explicit filter.
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color && should_use_colors())
        .without_time()
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

fn filter_for(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(LogLevel::Debug.directives())
    } else if quiet {
        EnvFilter::new(LogLevel::Error.directives())
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(LogLevel::Info.directives()))
    }
}

/// Whether stderr should get ANSI colors. `NO_COLOR` disables them,
/// `FORCE_COLOR` forces them, otherwise only terminals get colors.
pub fn should_use_colors() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    std::io::stderr().is_terminal()
}

#[cfg(test)]
mod tests {
    use super::*;

    // The subscriber is global; these only check filter construction.

    #[test]
    fn test_verbose_filter_enables_debug() {
        let filter = filter_for(true, false);
        assert!(filter.to_string().contains("bindery_bundler=debug"));
    }

    #[test]
    fn test_quiet_filter_is_errors_only() {
        let filter = filter_for(false, true);
        assert!(filter.to_string().contains("bindery_graph=error"));
    }
}
