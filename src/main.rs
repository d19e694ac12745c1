use anyhow::Result;
use creelscraper::{config::Config, duck::DuckStore, fetch, pipeline::Pipeline};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into());
        EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"))
    });
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = ?e, "ingest failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    // ─── 2) configure ───────────────────────────────────────────────
    let config = Config::from_env();
    info!(
        csv_url = %config.csv_url,
        csv_path = ?config.csv_path,
        sample_date_param = ?config.sample_date_param,
        batch_size = config.batch_size,
        dry_run = config.dry_run,
        database = %config.database_path.display(),
        "configured"
    );

    // ─── 3) open store & client ─────────────────────────────────────
    let client = fetch::http_client()?;
    let store = DuckStore::open(&config.database_path)?;

    // ─── 4) run once; the store is closed on every path ──────────────
    let summary = Pipeline::new(store, client, config).run_once().await?;

    let json = serde_json::to_string(&summary)?;
    info!(summary = %json, "all done");
    println!("{}", json);
    Ok(())
}
