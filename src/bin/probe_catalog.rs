use anyhow::Result;
use catalog_recon::CatalogFetcher;
use catalog_recon::config::CatalogConfig;
use std::env;

fn usage() {
    println!("Usage: cargo run --bin probe_catalog [config.toml]");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();
    dotenv::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        usage();
        return Ok(());
    }

    let config_path = args
        .get(1)
        .map(String::as_str)
        .unwrap_or("src/configs/catalog.toml");

    let config = CatalogConfig::from_file(config_path)?;
    let fetcher = CatalogFetcher::from_config(&config)?;

    println!("=== CATALOG PROBE ===\n");
    println!("Source: {} ({})", config.api.name, config.api.base_url);

    let total = fetcher.probe_total(&config.api.base_url).await?;
    let pages = total.div_ceil(config.pagination.page_size);

    println!("✅ Catalog reports {} products", total);
    println!(
        "📊 A full fetch needs {} pages of {} ({} in flight)",
        pages, config.pagination.page_size, config.fetch.concurrency
    );

    Ok(())
}
