use std::{path::PathBuf, sync::Arc};

use chart_client::ChartClient;
use chart_templater::{web, Configuration, HelmCli, Pipeline};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
struct Cli {
    /// Configuration file, defaults to $CONFIG_FILE then ./config.yaml
    #[arg(short, long, env = "CONFIG_FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let args = Cli::parse();
    let config = Configuration::load(args.config.as_deref())?;
    debug!(config=?config);

    let client = ChartClient::new(config.scratch_dir.clone(), config.fetch_limits())?;
    let engine = Arc::new(HelmCli::new(config.helm.binary.clone(), config.helm_timeout()));
    let pipeline = Arc::new(Pipeline::new(
        client,
        engine,
        config.render_settings(),
        config.extract_limits(),
    ));

    let app = web::router(pipeline, &config.static_dir);
    web::run_web_app(config.listen, app).await
}
