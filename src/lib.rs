pub mod config;
pub mod derivation;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod snapshot;
pub mod source;
pub mod store;

pub use config::{CatalogConfig, CliArgs, Command, ConfigArgs};
pub use derivation::{DerivationPolicy, StockThresholds};
pub use error::{CatalogError, ErrorState};
pub use logging::{LoggingConfig, init_logging};
pub use model::{Category, CategoryId, Product, ProductId, Rating, RawProduct, StockStatus};
pub use snapshot::CatalogSnapshot;
pub use source::{CatalogSource, HttpCatalogSource};
pub use store::{CatalogState, CatalogStore};

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;

/// Load the catalog and answer one command, writing JSON to `out`.
pub async fn run_command<W: Write>(
    store: &CatalogStore,
    command: &Command,
    out: &mut W,
) -> Result<()> {
    let snapshot = match store.ensure_loaded().await {
        Ok(snapshot) => snapshot,
        Err(error) => {
            tracing::error!(category = error.category(), %error, "catalog unavailable");
            anyhow::bail!(error.user_message());
        }
    };

    match command {
        Command::Search { query } => {
            let query = query.join(" ");
            let hits = snapshot.search(&query);
            tracing::info!(query = %query, hits = hits.len(), "search");
            write_json(out, &hits)
        }
        Command::Show { product_id } => {
            let id = ProductId::new(product_id.as_str());
            match snapshot.find_by_id(&id) {
                Some(product) => write_json(out, &product),
                None => anyhow::bail!("product {id} not found"),
            }
        }
        Command::Category { category_id } => {
            let id = CategoryId::new(category_id.as_str());
            match snapshot.by_category(&id) {
                Some(products) => write_json(out, &products),
                None => anyhow::bail!("category {id} not found"),
            }
        }
        Command::Sale => write_json(out, &snapshot.sale_products()),
        Command::Categories => write_json(out, &snapshot.category_counts()),
    }
}

fn write_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).context("failed to encode output")?;
    writeln!(out).context("failed to write output")?;
    Ok(())
}

pub async fn run(config: CatalogConfig, command: Command) -> Result<()> {
    config.validate()?;
    tracing::info!(api = %config.api_base_url, "starting catalog client");

    let store = CatalogStore::from_config(&config)?;
    let mut buffer = Vec::new();
    run_command(&store, &command, &mut buffer).await?;
    std::io::stdout()
        .write_all(&buffer)
        .context("failed to write to stdout")?;

    tracing::debug!(metrics = %metrics::METRICS.encode(), "catalog metrics");
    Ok(())
}
