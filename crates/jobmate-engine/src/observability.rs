//! Process-wide tracing setup for hosts, examples, and manual testing.
//!
//! Library code only emits events; whoever owns the process decides whether
//! and where they go.

use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static INIT: OnceCell<()> = OnceCell::new();

/// Initializes tracing once per process; later calls are no-ops, and a
/// global subscriber installed by the host is left in place.
///
/// `JOBMATE_LOG` (falling back to `RUST_LOG`, default `info`) sets the
/// filter. `JOBMATE_LOG_JSON` redirects output as JSONL to the given file
/// path. `JOBMATE_LOG_ENABLED=0` disables logging entirely.
pub fn init_logging() {
    INIT.get_or_init(|| {
        if !logging_enabled() {
            return;
        }
        let registry = tracing_subscriber::registry().with(env_filter());
        match json_log_path() {
            Some(path) => {
                let dir = path
                    .parent()
                    .filter(|parent| !parent.as_os_str().is_empty())
                    .unwrap_or_else(|| Path::new("."));
                let file = path
                    .file_name()
                    .map(|name| name.to_os_string())
                    .unwrap_or_else(|| "jobmate.log".into());
                let writer = tracing_appender::rolling::never(dir, file);
                // The embedding application may own the global subscriber
                // already; losing that race is fine.
                let _ = registry
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_current_span(true)
                            .with_span_list(true)
                            .with_target(false)
                            .with_writer(writer),
                    )
                    .try_init();
            }
            None => {
                let _ = registry
                    .with(tracing_subscriber::fmt::layer().compact())
                    .try_init();
            }
        }
    });
}

fn logging_enabled() -> bool {
    match std::env::var("JOBMATE_LOG_ENABLED") {
        Ok(value) => parse_bool(&value),
        Err(_) => true,
    }
}

fn env_filter() -> EnvFilter {
    let directives = std::env::var("JOBMATE_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    EnvFilter::new(directives)
}

fn json_log_path() -> Option<PathBuf> {
    match std::env::var("JOBMATE_LOG_JSON") {
        Ok(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => None,
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on" | "enabled"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerates_a_preinstalled_global_subscriber() {
        let _ = tracing::subscriber::set_global_default(tracing_subscriber::registry());
        init_logging();
        init_logging();
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        for value in ["1", "true", "YES", " on ", "Enabled"] {
            assert!(parse_bool(value), "{value}");
        }
        for value in ["0", "false", "off", "", "junk"] {
            assert!(!parse_bool(value), "{value}");
        }
    }
}
