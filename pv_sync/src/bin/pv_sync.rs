use std::path::PathBuf;
use std::time::Duration as StdDuration;

use anyhow::Result;
use chrono::{Duration, NaiveDate};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use pv_sync::config::Config;
use pv_sync::db;
use pv_sync::store::SqliteStore;
use pv_sync::sync::{SyncOptions, sync_systems};
use telemetry_ingestor::providers::TelemetryProvider;
use telemetry_ingestor::providers::pvoutput::PvOutputProvider;
use telemetry_ingestor::rate_limit::RateLimitedFetcher;
use telemetry_ingestor::transport::ReqwestTransport;

#[derive(Parser)]
#[command(version, about = "PV telemetry sync CLI")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, value_name = "FILE", default_value = "pv_sync.toml")]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Fetch uncovered days for the given systems into the local store.
    Sync {
        /// First day of the window.
        #[arg(long)]
        from: NaiveDate,
        /// Last day of the window (inclusive).
        #[arg(long)]
        to: NaiveDate,
        /// System ids to sync.
        #[arg(long, value_delimiter = ',', required = true)]
        systems: Vec<i64>,
        /// Stop the run on quota exhaustion instead of waiting for the reset.
        #[arg(long)]
        no_wait: bool,
    },
    /// Fetch full history for one system via the batch endpoint and print it.
    BatchStatus {
        /// System id to fetch.
        #[arg(long)]
        system: i64,
        /// Last day to include; defaults to the source's choice.
        #[arg(long)]
        date_to: Option<NaiveDate>,
        /// How many times to poll before giving up.
        #[arg(long, default_value_t = 10)]
        max_attempts: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    let (api_key, account_system_id) = config.credentials()?;

    let transport = ReqwestTransport::new(StdDuration::from_secs(30))?;
    let fetcher = RateLimitedFetcher::new(transport)
        .with_safety_margin(Duration::seconds(config.safety_margin_secs));
    let mut provider = PvOutputProvider::new(fetcher, api_key, account_system_id)
        .with_base_url(config.base_url.clone());
    if let Some(url) = &config.data_service_url {
        provider = provider.with_data_service_url(url.clone());
    }

    match cli.cmd {
        Cmd::Sync {
            from,
            to,
            systems,
            no_wait,
        } => {
            db::migrate::run_sqlite(&config.database_path)?;
            let mut conn = db::connection::connect_sqlite(&config.database_path)?;

            let opts = SyncOptions {
                start_date: from,
                end_date: to,
                min_outputs_per_day: config.min_outputs_per_day,
                wait_on_limit: !no_wait,
            };
            let report = sync_systems(&mut conn, &SqliteStore::new(), &provider, &systems, &opts)
                .await?;
            println!("{report}");
        }
        Cmd::BatchStatus {
            system,
            date_to,
            max_attempts,
        } => {
            let rows = provider
                .batch_status(system, date_to, max_attempts, true)
                .await?;
            for row in rows {
                println!(
                    "{},{},{},{},{}",
                    row.ts,
                    fmt_opt(row.cumulative_energy_wh),
                    fmt_opt(row.instantaneous_power_w),
                    fmt_opt(row.temperature_c),
                    fmt_opt(row.voltage),
                );
            }
        }
    }

    Ok(())
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
