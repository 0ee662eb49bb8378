use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{
    config::LoggingConfig,
    error::{CardsError, Result},
};

/// Installs the global tracing subscriber for a front end.
///
/// `RUST_LOG` wins over the configured level. Output goes to stderr so it
/// never mixes with rendered tables on stdout. Fails if a subscriber is
/// already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| CardsError::ConfigError(format!("invalid log level: {}", e)))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| CardsError::ConfigError(e.to_string()))
}
