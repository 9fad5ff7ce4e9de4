use crate::derivation::{
    DEFAULT_LOW_STOCK_THRESHOLD, DEFAULT_MINOR_UNIT_DIGITS, DerivationPolicy, StockThresholds,
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:3000/api";
const DEFAULT_PRODUCTS_PATH: &str = "/products";
const DEFAULT_CATEGORIES_PATH: &str = "/categories";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const MAX_MINOR_UNIT_DIGITS: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    pub api_base_url: String,
    pub products_path: String,
    pub categories_path: String,
    pub request_timeout_secs: u64,
    pub low_stock_threshold: u32,
    pub minor_unit_digits: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            products_path: DEFAULT_PRODUCTS_PATH.to_string(),
            categories_path: DEFAULT_CATEGORIES_PATH.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            minor_unit_digits: DEFAULT_MINOR_UNIT_DIGITS,
        }
    }
}

impl CatalogConfig {
    pub fn from_args(args: ConfigArgs) -> Result<Self> {
        let ConfigArgs {
            config,
            api_url: cli_api_url,
            products_path: cli_products_path,
            categories_path: cli_categories_path,
            request_timeout_secs: cli_timeout,
            low_stock_threshold: cli_low_stock,
            minor_unit_digits: cli_minor_unit_digits,
        } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let PartialConfig {
            api_base_url: file_api_url,
            products_path: file_products_path,
            categories_path: file_categories_path,
            request_timeout_secs: file_timeout,
            low_stock_threshold: file_low_stock,
            minor_unit_digits: file_minor_unit_digits,
        } = file_config;

        let defaults = Self::default();

        Ok(Self {
            api_base_url: cli_api_url
                .or(file_api_url)
                .map(|url| url.trim().to_string())
                .unwrap_or(defaults.api_base_url),
            products_path: cli_products_path
                .or(file_products_path)
                .unwrap_or(defaults.products_path),
            categories_path: cli_categories_path
                .or(file_categories_path)
                .unwrap_or(defaults.categories_path),
            request_timeout_secs: cli_timeout
                .or(file_timeout)
                .unwrap_or(defaults.request_timeout_secs),
            low_stock_threshold: cli_low_stock
                .or(file_low_stock)
                .unwrap_or(defaults.low_stock_threshold),
            minor_unit_digits: cli_minor_unit_digits
                .or(file_minor_unit_digits)
                .unwrap_or(defaults.minor_unit_digits),
        })
    }

    /// Fail fast on settings that would only surface as fetch errors later.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.api_base_url.is_empty(),
            "api base url must not be empty"
        );
        anyhow::ensure!(
            self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"),
            "api base url {:?} must use http or https",
            self.api_base_url
        );
        anyhow::ensure!(
            self.request_timeout_secs > 0,
            "request timeout must be at least one second"
        );
        anyhow::ensure!(
            self.minor_unit_digits <= MAX_MINOR_UNIT_DIGITS,
            "minor unit digits must be between 0 and {}, got {}",
            MAX_MINOR_UNIT_DIGITS,
            self.minor_unit_digits
        );
        Ok(())
    }

    pub fn derivation_policy(&self) -> DerivationPolicy {
        DerivationPolicy {
            minor_unit_digits: self.minor_unit_digits,
            stock: StockThresholds {
                low_stock: self.low_stock_threshold,
            },
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "skincare-catalog",
    about = "Browse the skincare product catalog from the command line",
    version
)]
pub struct CliArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Default, Clone)]
pub struct ConfigArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)",
        global = true
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "SKINCARE_CATALOG_API_URL",
        value_name = "URL",
        help = "Base URL of the catalog API",
        global = true
    )]
    pub api_url: Option<String>,

    #[arg(
        long,
        env = "SKINCARE_CATALOG_PRODUCTS_PATH",
        value_name = "PATH",
        help = "Path of the product list endpoint",
        global = true
    )]
    pub products_path: Option<String>,

    #[arg(
        long,
        env = "SKINCARE_CATALOG_CATEGORIES_PATH",
        value_name = "PATH",
        help = "Path of the category list endpoint",
        global = true
    )]
    pub categories_path: Option<String>,

    #[arg(
        long,
        env = "SKINCARE_CATALOG_REQUEST_TIMEOUT",
        value_name = "SECS",
        help = "Per-request timeout enforced by the HTTP client",
        value_parser = clap::value_parser!(u64),
        global = true
    )]
    pub request_timeout_secs: Option<u64>,

    #[arg(
        long,
        env = "SKINCARE_CATALOG_LOW_STOCK",
        value_name = "N",
        help = "Stock quantity at or below which a product shows as low stock",
        value_parser = clap::value_parser!(u32),
        global = true
    )]
    pub low_stock_threshold: Option<u32>,

    #[arg(
        long,
        env = "SKINCARE_CATALOG_MINOR_UNIT_DIGITS",
        value_name = "N",
        help = "Decimal places of the currency's minor unit",
        value_parser = clap::value_parser!(u32),
        global = true
    )]
    pub minor_unit_digits: Option<u32>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Search products by name, description, brand or category
    Search { query: Vec<String> },
    /// Show one product
    Show { product_id: String },
    /// List the products of a category
    Category { category_id: String },
    /// List discounted products
    Sale,
    /// List categories with product counts
    Categories,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialConfig {
    api_base_url: Option<String>,
    products_path: Option<String>,
    categories_path: Option<String>,
    request_timeout_secs: Option<u64>,
    low_stock_threshold: Option<u32>,
    minor_unit_digits: Option<u32>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
