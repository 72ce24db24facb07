//! Logging bootstrap for the catalog API.

use catalog_kernel::settings::LogFormat;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing pipeline.
///
/// `RUST_LOG` overrides the default filter. Safe to call more than once;
/// later calls are no-ops.
pub fn init(format: &LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "catalog_app=info,catalog_http=info,tower_http=info".into());

    let registry = tracing_subscriber::registry().with(filter);

    let initialized = match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .is_ok(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .is_ok(),
    };

    if initialized {
        tracing::debug!(?format, "telemetry initialized");
    }
}
