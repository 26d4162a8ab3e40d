//! Tracing setup for the `rlbatch` binary.
//!
//! Diagnostics go to stderr. stdout carries trainer output and narration, and
//! the two must never interleave on one stream.

use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` wins over `level`; a second call
/// is a no-op.
pub fn init_tracing(json: bool, level: Level) {
    let json_layer = json.then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| {
        fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    let _ = tracing_subscriber::registry()
        .with(log_filter(level))
        .with(json_layer)
        .with(text_layer)
        .try_init();
}

fn log_filter(level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_init_is_harmless() {
        init_tracing(false, Level::INFO);
        init_tracing(true, Level::DEBUG);
        tracing::info!(event = "telemetry.test");
    }

    #[test]
    fn test_filter_defaults_to_requested_level() {
        if std::env::var_os("RUST_LOG").is_none() {
            assert_eq!(
                log_filter(Level::DEBUG).max_level_hint(),
                Some(LevelFilter::DEBUG)
            );
        }
    }
}
