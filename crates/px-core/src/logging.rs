//! Logging initialization using the `tracing` ecosystem.
//!
//! Provides:
//! - Console output (colored, human-readable)
//! - File output (daily rotation via `tracing-appender`)
//! - Configurable log level via env var `RUST_LOG` or the config's `logging.level`
//!
//! Library code only emits `tracing` events. Installing a subscriber is left to
//! the application, which may use [`init_logging`] or its own setup.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

/// Install the global tracing subscriber described by `config`.
///
/// Returns an error instead of panicking when a global subscriber is already
/// installed, or when the level string is not a valid filter.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)?,
    };

    let console_layer = fmt::layer().with_target(true).with_thread_ids(true).with_ansi(true);

    if let Some(dir) = &config.log_dir {
        let file_appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
        let file_layer =
            fmt::layer().with_writer(file_appender).with_ansi(false).with_target(true).with_thread_ids(true);

        tracing_subscriber::registry().with(env_filter).with(console_layer).with(file_layer).try_init()?;
    } else {
        tracing_subscriber::registry().with(env_filter).with(console_layer).try_init()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_level_is_an_error() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LoggingConfig { level: "px_core=loudest".into(), ..LoggingConfig::default() };
        assert!(init_logging(&config).is_err());
    }
}
