//! Logging initialization for the `fhirtypes` binary
//!
//! Logs always go to stderr so command output on stdout stays machine-readable.
//! `RUST_LOG` overrides the configured level.

use crate::settings::LoggingSettings;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init_logging(settings: &LoggingSettings) -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::registry().with(build_env_filter(settings));

    if settings.json {
        let layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(std::io::stderr);
        subscriber.with(layer).try_init()?;
    } else {
        let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
        subscriber.with(layer).try_init()?;
    }
    Ok(())
}

fn build_env_filter(settings: &LoggingSettings) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // `fhirtypes` also covers the fhirtypes_* library targets
        EnvFilter::new(format!("fhirtypes={}", settings.level))
    })
}
