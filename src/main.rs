//! CLI entry point for the GTFS-RT merger.
//!
//! `serve` (the default) exposes the merged feeds over HTTP; `snapshot` runs a
//! single fetch cycle and prints the result.

use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use gtfs_rt_merger::api::{self, TrainsResponse};
use gtfs_rt_merger::cache::{SnapshotCache, SystemClock};
use gtfs_rt_merger::fetch::{
    DEFAULT_ALERTS_URL, DEFAULT_TRIP_UPDATES_URL, DEFAULT_VEHICLE_POSITIONS_URL, FeedEndpoints,
    FeedFetcher,
};
use gtfs_rt_merger::snapshot::build_snapshot;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "gtfs_rt_merger")]
#[command(about = "Merges GTFS-RT JSON feeds into one train view and serves it", long_about = None)]
struct Cli {
    #[command(flatten)]
    feeds: FeedArgs,

    #[command(flatten)]
    server: ServerArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the merged feeds over HTTP (default)
    Serve,
    /// Fetch and merge the feeds once and print the result as JSON
    Snapshot,
}

#[derive(Args)]
struct FeedArgs {
    /// Vehicle positions feed URL
    #[arg(long, env = "VEHICLE_POSITIONS_URL", default_value = DEFAULT_VEHICLE_POSITIONS_URL, global = true)]
    vehicle_positions_url: String,

    /// Trip updates feed URL
    #[arg(long, env = "TRIP_UPDATES_URL", default_value = DEFAULT_TRIP_UPDATES_URL, global = true)]
    trip_updates_url: String,

    /// Service alerts feed URL
    #[arg(long, env = "ALERTS_URL", default_value = DEFAULT_ALERTS_URL, global = true)]
    alerts_url: String,

    /// Upper bound on a single feed fetch, in seconds
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 10, global = true)]
    fetch_timeout_secs: u64,
}

#[derive(Args)]
struct ServerArgs {
    /// Interface to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0", global = true)]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3000, global = true)]
    port: u16,

    /// Seconds a merged snapshot is reused before the feeds are fetched again
    #[arg(long, env = "CACHE_TTL_SECS", default_value_t = 30, global = true)]
    cache_ttl_secs: u64,
}

impl FeedArgs {
    fn fetcher(&self) -> Result<FeedFetcher> {
        let endpoints = FeedEndpoints {
            vehicle_positions: self.vehicle_positions_url.clone(),
            trip_updates: self.trip_updates_url.clone(),
            alerts: self.alerts_url.clone(),
        };
        FeedFetcher::new(endpoints, Duration::from_secs(self.fetch_timeout_secs))
            .context("failed to build HTTP client")
    }
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/gtfs_rt_merger.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("gtfs_rt_merger.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let fetcher = cli.feeds.fetcher()?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(fetcher, &cli.server).await?,
        Commands::Snapshot => {
            let snapshot = build_snapshot(&fetcher, &SystemClock).await;
            println!(
                "{}",
                serde_json::to_string_pretty(&TrainsResponse::from(&snapshot))?
            );
        }
    }

    Ok(())
}

/// Runs the HTTP API until the process is stopped.
async fn serve(fetcher: FeedFetcher, args: &ServerArgs) -> Result<()> {
    let endpoints = fetcher.endpoints();
    info!(
        vehicle_positions = %endpoints.vehicle_positions,
        trip_updates = %endpoints.trip_updates,
        alerts = %endpoints.alerts,
        "Upstream feeds"
    );

    let cache = web::Data::new(SnapshotCache::new(
        fetcher,
        Duration::from_secs(args.cache_ttl_secs),
    ));

    let server = HttpServer::new(move || {
        App::new()
            .app_data(cache.clone())
            .wrap(Cors::permissive())
            .wrap(middleware::Compress::default())
            .wrap(middleware::Logger::default())
            .configure(api::configure)
    })
    .bind((args.host.as_str(), args.port))
    .with_context(|| format!("failed to bind {}:{}", args.host, args.port))?;

    info!(
        host = %args.host,
        port = args.port,
        cache_ttl_secs = args.cache_ttl_secs,
        "Listening: GET / /api/trenes /api/incidencias /api/lineas"
    );

    server.run().await.context("HTTP server stopped with an error")
}
