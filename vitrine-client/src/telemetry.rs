//! Tracing subscriber setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LogSettings};
use crate::error::ClientError;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured filter. Logs go to stderr so the
/// CLI's JSON output on stdout stays machine-readable.
pub fn init_tracing(settings: &LogSettings) -> Result<(), ClientError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.filter));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match settings.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };
    result.map_err(|e| ClientError::Telemetry(e.to_string()))?;

    tracing::debug!(format = ?settings.format, filter = %settings.filter, "Tracing initialized");
    Ok(())
}
