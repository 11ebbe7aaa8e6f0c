use foodgram::{
    config::{catalog, database, settings},
    core::{ingredient, short_link::ShortLinkCodec},
    errors::Result,
};
use dotenvy::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal since env vars can be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load application settings
    let app_config = settings::load_default_config()
        .inspect_err(|e| error!("Critical error loading application configuration: {}", e))?;
    ShortLinkCodec::from_settings(&app_config.short_link)
        .inspect_err(|e| error!("Invalid short link settings: {}", e))?;
    info!("Successfully processed application configuration.");

    // 4. Initialize database
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Seed the ingredient catalog
    let entries = catalog::load_catalog(&app_config.catalog.ingredients_path)
        .inspect_err(|e| error!("Failed to load ingredient catalog: {}", e))?;
    let added = ingredient::seed_catalog(&db, &entries)
        .await
        .inspect_err(|e| error!("Failed to seed ingredient catalog: {}", e))?;
    info!(
        "Ingredient catalog ready: {} entries in file, {} newly added",
        entries.len(),
        added
    );

    Ok(())
}
