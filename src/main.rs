mod modules;

use anyhow::Context;
use catalog_kernel::settings::Settings;
use catalog_kernel::{InitCtx, ModuleRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load catalog settings")?;

    catalog_telemetry::init(&settings.telemetry.log_format);

    tracing::info!(
        env = ?settings.environment,
        "catalog-app bootstrap starting"
    );

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry);

    let ctx = InitCtx {
        settings: &settings,
    };
    registry.init_modules(&ctx).await?;
    registry.start_modules(&ctx).await?;

    catalog_http::start_server(&registry, &settings).await?;

    registry.stop_modules().await?;
    Ok(())
}
