mod modules;

use anyhow::Context;
use library_db::Database;
use library_kernel::{settings::Settings, InitCtx, ModuleRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load settings")?;

    library_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.url,
        "library-app starting"
    );

    // One connection handle for the whole process.
    let db = Database::connect(&settings.database)
        .await
        .with_context(|| "failed to connect to MongoDB")?;

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, &db);

    let ctx = InitCtx {
        settings: &settings,
    };
    registry.init_modules(&ctx).await?;
    registry.start_modules(&ctx).await?;

    // Serves until shutdown is requested.
    library_http::start_server(&registry, &settings).await?;

    registry.stop_modules().await?;
    db.shutdown().await;

    tracing::info!("library-app stopped");
    Ok(())
}
