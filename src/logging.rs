//! Diagnostic logging for the watch service.
//!
//! Output is a compact, timestamped line per event. Levels come from the
//! `[logging]` settings table unless `RUST_LOG` is set, which wins.
//!
//! ```toml
//! [logging]
//! default = "warn"
//!
//! [logging.modules]
//! "workspace_watch::watcher" = "debug"
//! ```

use std::sync::Once;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

static INIT: Once = Once::new();

/// Wall-clock time as HH:MM:SS.mmm
struct ClockTime;

impl FormatTime for ClockTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// Build the filter directive string for a logging config.
fn filter_directives(config: &LoggingConfig) -> String {
    let mut directives = config.default.clone();
    let mut modules: Vec<_> = config.modules.iter().collect();
    modules.sort();
    for (target, level) in modules {
        directives.push_str(&format!(",{target}={level}"));
    }
    directives
}

/// Install the global subscriber. Only the first call has any effect.
///
/// Logs go to stderr so the CLI can keep stdout for its own output.
pub fn init_with_config(config: &LoggingConfig) {
    INIT.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(filter_directives(config))
        };

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_timer(ClockTime)
            .with_level(true)
            .with_filter(filter);

        // A host application may already own the global subscriber.
        let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
    });
}

/// Install the subscriber with `LoggingConfig::default()` (warn and above).
pub fn init() {
    init_with_config(&LoggingConfig::default());
}

/// Info-level event tagged with the component that produced it.
///
/// ```ignore
/// log_event!("orchestrator", "watching", "{} project roots", roots.len());
/// ```
#[macro_export]
macro_rules! log_event {
    ($component:expr, $event:expr) => {
        tracing::info!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::info!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}

/// Debug-level variant of [`log_event!`].
#[macro_export]
macro_rules! debug_event {
    ($component:expr, $event:expr) => {
        tracing::debug!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::debug!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}

/// Warn-level variant for failures the service recovers from.
#[macro_export]
macro_rules! warn_event {
    ($component:expr, $event:expr) => {
        tracing::warn!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::warn!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directives_sorted() {
        let mut config = LoggingConfig::default();
        config.modules.insert("b".to_string(), "trace".to_string());
        config.modules.insert("a".to_string(), "debug".to_string());

        assert_eq!(filter_directives(&config), "warn,a=debug,b=trace");
    }

    #[test]
    fn test_init_is_repeatable() {
        init();
        init_with_config(&LoggingConfig::default());
    }
}
