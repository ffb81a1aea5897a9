//! Logging helpers for bindery.
//!
//! Only available with the `logging` feature. Library users get plain
//! `tracing` events and install their own subscriber; applications can call
//! [`init_logging`] once at startup.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Crates whose events the helpers enable.
const CRATES: &[&str] = &["bindery_graph", "bindery_bundler", "bindery_cli", "bindery"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Silent,
    Error,
    /// Errors, plus missing imports and unloadable files.
    Warn,
    /// One line per bundle (default).
    #[default]
    Info,
    /// Every link decision.
    Debug,
    Trace,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Silent => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// `EnvFilter` directives enabling this level for bindery crates only;
    /// dependencies stay at `warn`.
    pub fn directives(&self) -> String {
        if *self == LogLevel::Silent {
            return "off".to_string();
        }
        let mut directives = vec!["warn".to_string()];
        directives.extend(
            CRATES
                .iter()
                .map(|name| format!("{}={}", name, self.as_filter())),
        );
        directives.join(",")
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "silent" | "off" => Ok(LogLevel::Silent),
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("Invalid log level: {}", other)),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter())
    }
}

fn install(filter: EnvFilter) {
    INIT.call_once(|| {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_target(false).without_time())
            .try_init();
    });
}

/// Install a global subscriber at `level`. Only the first call in a process
/// has any effect.
///
/// ```rust,no_run
/// use bindery_bundler::logging::{init_logging, LogLevel};
///
/// init_logging(LogLevel::Info);
/// ```
pub fn init_logging(level: LogLevel) {
    install(EnvFilter::new(level.directives()));
}

/// Like [`init_logging`], but `RUST_LOG` wins when it is set and valid.
pub fn init_logging_from_env() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(LogLevel::default().directives()));
    install(filter);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_from_str() {
        assert_eq!("info".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("off".parse::<LogLevel>().unwrap(), LogLevel::Silent);
        assert_eq!("TRACE".parse::<LogLevel>().unwrap(), LogLevel::Trace);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn directives_scope_bindery_crates() {
        assert_eq!(
            LogLevel::Debug.directives(),
            "warn,bindery_graph=debug,bindery_bundler=debug,bindery_cli=debug,bindery=debug"
        );
        assert_eq!(LogLevel::Silent.directives(), "off");
        assert_eq!(LogLevel::Silent.to_string(), "off");
    }
}
