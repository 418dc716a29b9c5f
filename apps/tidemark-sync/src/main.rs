use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tidemark_application::config::{load_config, Config};
use tidemark_application::sync::sync_once;
use tidemark_domain::repositories::OhlcStore;
use tidemark_infrastructure::market_data::TiingoClient;
use tidemark_infrastructure::persistence::PostgresOhlcStore;

#[derive(Parser)]
#[command(name = "tidemark-sync")]
#[command(about = "Incremental Tiingo-to-PostgreSQL OHLC sync.", version)]
struct Cli {
    /// Config file path (TOML). If omitted, uses env TIDEMARK_CONFIG.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the configured database and table if either is missing.
    Ensure,
    /// Ensure, then print the current sync watermark.
    Watermark,
    /// Ensure, fetch daily bars since the watermark, insert the new ones.
    Sync {
        /// Fetch window end date (YYYY-MM-DD). Defaults to today in UTC.
        #[arg(long)]
        end: Option<NaiveDate>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = init_tracing() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
    if let Err(err) = init_metrics() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }

    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let config_path = cli
        .config
        .or_else(|| {
            std::env::var("TIDEMARK_CONFIG")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
        })
        .ok_or_else(|| "missing --config and env TIDEMARK_CONFIG is not set".to_string())?;

    let config = load_config(&config_path).map_err(|err| err.to_string())?;
    let schema = config.table_schema().map_err(|err| err.to_string())?;
    let connection = config.connection().map_err(|err| err.to_string())?;
    let table = config.table.name.as_str();
    let date_column = config.table.date_column.as_str();

    match cli.command {
        Commands::Ensure => {
            let store = PostgresOhlcStore::ensure_ready(&connection, table, &schema)
                .map_err(|err| err.to_string())?;
            println!("ready: database={} table={}", store.database, table);
            Ok(())
        }
        Commands::Watermark => {
            let mut store = PostgresOhlcStore::ensure_ready(&connection, table, &schema)
                .map_err(|err| err.to_string())?;
            let mark = store
                .last_synced_at(table, date_column)
                .map_err(|err| err.to_string())?;
            println!("{mark}");
            Ok(())
        }
        Commands::Sync { end } => {
            let end = end.unwrap_or_else(|| Utc::now().date_naive());
            let mut store = PostgresOhlcStore::ensure_ready(&connection, table, &schema)
                .map_err(|err| err.to_string())?;
            let feed = build_feed(&config)?;
            let report = sync_once(
                &mut store,
                &feed,
                &schema,
                table,
                date_column,
                &config.tiingo.ticker,
                end,
            )
            .map_err(|err| err.to_string())?;
            println!(
                "done: table={} fetched={} inserted={}",
                table, report.fetched, report.inserted
            );
            Ok(())
        }
    }
}

fn build_feed(config: &Config) -> Result<TiingoClient, String> {
    let token = config.tiingo_token().map_err(|err| err.to_string())?;
    match &config.tiingo.base_url {
        Some(base) => TiingoClient::with_base_url(base.clone(), token),
        None => TiingoClient::new(token),
    }
    .map_err(|err| err.to_string())
}

fn init_tracing() -> Result<(), String> {
    let filter = std::env::var("TIDEMARK_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|err| format!("invalid log filter: {err}"))?;

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    Ok(())
}

#[cfg(feature = "prometheus")]
fn init_metrics() -> Result<Option<SocketAddr>, String> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let Some(raw) = std::env::var("TIDEMARK_METRICS_ADDR").ok() else {
        return Ok(None);
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }

    let addr: SocketAddr = raw
        .parse()
        .map_err(|err| format!("invalid TIDEMARK_METRICS_ADDR (expected host:port): {err}"))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|err| format!("failed to install prometheus exporter: {err}"))?;

    tracing::info!(metrics_addr = %addr, "prometheus metrics exporter enabled");
    Ok(Some(addr))
}

#[cfg(not(feature = "prometheus"))]
fn init_metrics() -> Result<Option<SocketAddr>, String> {
    Ok(None)
}
