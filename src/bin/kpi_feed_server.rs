use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;

use kpi_feed::config::{Route, RouteKind, ServerConfig};
use kpi_feed::server::FeedServer;

#[derive(Parser, Debug)]
#[command(name = "kpi-feed-server")]
#[command(about = "Serve KPI CSV logs with time-window, column and down-sampling queries")]
struct Args {
    /// JSON config file (routes, bind address, window tunables)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind (overrides config)
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Disable Access-Control-Allow-* headers
    #[arg(long)]
    no_cors: bool,

    /// Windowed CSV route, NAME=PATH (e.g. KPI_Metrics.csv=logs/KPI_Metrics.csv)
    #[arg(long = "csv", value_name = "NAME=PATH")]
    csv: Vec<String>,

    /// Static file route, NAME=PATH (e.g. NIST.svg=Images/NIST_Dark.svg)
    #[arg(long = "asset", value_name = "NAME=PATH")]
    asset: Vec<String>,

    /// Rows within this many periods of `to` are never down-sampled (0 disables)
    #[arg(long)]
    tail_window: Option<u32>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ServerConfig::default(),
    };

    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if args.no_cors {
        config.cors = false;
    }
    if let Some(tail) = args.tail_window {
        config.window.tail_window = (tail > 0).then_some(tail);
    }
    for spec in &args.csv {
        config.routes.push(Route::parse_spec(spec, RouteKind::Csv)?);
    }
    for spec in &args.asset {
        config.routes.push(Route::parse_spec(spec, RouteKind::Static)?);
    }

    if config.routes.is_empty() {
        anyhow::bail!("No routes configured; pass --config or --csv NAME=PATH");
    }

    let server = FeedServer::new(config).context("Failed to start feed server")?;
    info!("Listening on {}", server.server_url());
    server.block();
    Ok(())
}
