mod action;
mod app;
mod component;
mod components;
mod mpv;
mod theme;
mod widgets;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use curate_core::config::Config;
use curate_core::fetch::RadioBrowserClient;
use curate_core::platform;
use curate_core::seed::PersistedSelectionSeed;
use curate_core::session::CurationSession;

/// Curate internet radio stations for one tag into a JSON list.
#[derive(Debug, Parser)]
#[command(name = "curate-stations", version)]
struct Args {
    /// Directory tag to fetch (overrides `fetch.tag`).
    #[arg(long)]
    tag: Option<String>,

    /// Previously curated file used to pre-select stations.
    #[arg(long, value_name = "PATH")]
    curated: Option<PathBuf>,

    /// Directory the export is written to.
    #[arg(long, value_name = "DIR")]
    export_dir: Option<PathBuf>,

    /// Maximum number of stations to fetch.
    #[arg(long)]
    limit: Option<u32>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("curate-stations: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let data_dir = platform::data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating {}", data_dir.display()))?;

    let log_path = data_dir.join("curate.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("opening {}", log_path.display()))?;

    // RUST_LOG overrides; HTTP client internals stay at warn by default.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("curate-stations log: {}", log_path.display());
    tracing::info!("curate-stations starting");

    let mut config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("config unreadable, using defaults: {:#}", e);
        Config::default()
    });
    if let Some(tag) = args.tag {
        config.fetch.tag = tag;
    }
    if let Some(limit) = args.limit {
        config.fetch.limit = limit;
    }
    if let Some(curated) = args.curated {
        config.paths.curated_file = curated;
    }
    if let Some(dir) = args.export_dir {
        config.paths.export_dir = dir;
    }

    eprintln!("fetching stations tagged '{}'…", config.fetch.tag);
    let client = RadioBrowserClient::new(config.fetch.clone(), platform::fetch_state_file())?;
    let catalog = client.fetch_catalog().await?;
    tracing::info!("catalog: {} station(s)", catalog.len());

    let (seed, seed_err) = PersistedSelectionSeed::load_or_empty(&config.paths.curated_file);
    let startup_notice = seed_err.map(|e| {
        tracing::warn!("{}; starting with an empty selection", e);
        format!("{}; starting with an empty selection", e)
    });

    let session = CurationSession::new(catalog, seed);
    app::App::new(
        session,
        config.fetch.tag.clone(),
        config.paths.export_path(),
        config.preview.volume,
        startup_notice,
    )
    .run()
    .await
}
