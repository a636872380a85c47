// Logging module for structured logging using the tracing crate

use std::error::Error;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

/// Initialize the tracing subscriber for structured logging
///
/// The subscriber is configured with:
/// - JSON or plain text formatting, selected by `format`
/// - Filtering from `RUST_LOG`, defaulting to INFO
/// - Output to stdout for container/cloud-native deployments
///
/// # Errors
///
/// Returns an error if `RUST_LOG` cannot be parsed or a global subscriber is
/// already installed.
///
/// # Examples
///
/// ```no_run
/// use signed_image_proxy::config::LogFormat;
/// use signed_image_proxy::logging::init_subscriber;
///
/// init_subscriber(LogFormat::Json).expect("Failed to initialize logging");
/// tracing::info!("Application started");
/// ```
pub fn init_subscriber(format: LogFormat) -> Result<(), Box<dyn Error + Send + Sync>> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()?
        .add_directive("pingora_core=warn".parse()?)
        .add_directive("hyper=info".parse()?);

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_target(true),
            )
            .try_init()?,
        LogFormat::Text => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()?,
    }

    Ok(())
}
