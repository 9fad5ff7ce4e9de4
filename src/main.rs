use clap::Parser;
use skincare_catalog::{CatalogConfig, CliArgs, LoggingConfig, init_logging, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logging_config = LoggingConfig::from_env();
    let _guard = init_logging(logging_config)?;

    let cli = CliArgs::parse();
    let config = CatalogConfig::from_args(cli.config)?;

    run(config, cli.command).await
}
