use anyhow::{Context, Result};
use catalog_recon::config::CatalogConfig;
use catalog_recon::report::{Report, render_text};
use catalog_recon::{CatalogFetcher, DatasetStore, reconcile};
use std::env;
use tracing::info;

const DEFAULT_CONFIG: &str = "src/configs/catalog.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load environment variables
    dotenv::dotenv().ok();

    let args: Vec<String> = env::args().collect();

    // Reconcile the last saved fetch instead of hitting the API again
    let from_storage = args.iter().any(|arg| arg == "--from-storage" || arg == "-s");
    let as_json = args.iter().any(|arg| arg == "--json");
    let config_path = args
        .iter()
        .position(|arg| arg == "--config" || arg == "-c")
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
        .unwrap_or(DEFAULT_CONFIG);

    let config = CatalogConfig::from_file(config_path)
        .with_context(|| format!("Failed to load catalog configuration from {}", config_path))?;

    info!("Loaded config for {}: {}", config.api.name, config.api.base_url);

    let store = DatasetStore;

    let actual = if from_storage {
        info!("🚀 Reconciling stored products from {}", config.storage.actual_path);
        store
            .load(&config.storage.actual_path)
            .context("Failed to load previously fetched products")?
    } else {
        info!("🚀 Fetching products from {}", config.api.base_url);
        let fetcher = CatalogFetcher::from_config(&config)?;
        let actual = fetcher
            .fetch_all(&config.api.base_url, config.pagination.page_size)
            .await
            .with_context(|| format!("Failed to fetch catalog from {}", config.api.name))?;

        store
            .save(&actual, &config.storage.actual_path)
            .context("Failed to store fetched products")?;
        actual
    };

    let expected = store
        .load(&config.storage.expected_path)
        .context("Failed to load expected product data")?;

    let result = reconcile(&actual, &expected).context("Reconciliation failed")?;

    if as_json {
        let report = Report::new(&config.api.name, &result);
        println!("{}", report.to_json()?);
    } else {
        println!("{}", render_text(&result));
    }

    info!("✅ Reconciliation of {} products complete", result.actual_count);

    Ok(())
}
