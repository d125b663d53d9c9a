// src/main.rs — livetrack entry point

use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use livetrack::cli::console::{spawn_stdin_reader, Console};
use livetrack::cli::query::Queries;
use livetrack::cli::{Cli, Commands};
use livetrack::infra::config::Config;
use livetrack::infra::logger;
use livetrack::storage::{self, spawn_store_server, StoreHandle};
use livetrack::upstream::acfun::AcFunClient;
use livetrack::upstream::UpstreamApi;
use livetrack::watch::{WatchSettings, Watcher};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logger::init_logging(&cli.log_level);

    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Falls back to defaults if no config.toml
    let mut config = if let Some(ref path) = cli.config {
        Config::load_from(std::path::Path::new(path))?
    } else {
        Config::load()?
    };

    let command = cli.command.unwrap_or_default();
    if let Commands::Watch {
        ref owners,
        interval,
        ..
    } = command
    {
        if !owners.is_empty() {
            config.watch.owners = owners.clone();
        }
        if let Some(secs) = interval {
            config.watch.poll_interval_secs = secs;
        }
        config.validate()?;
    }

    let upstream: Arc<dyn UpstreamApi> = Arc::new(AcFunClient::new(config.upstream.clone())?);
    let settings = WatchSettings::from_config(&config);
    let live = Queries::new(
        upstream.clone(),
        settings.retry.clone(),
        settings.signs.clone(),
    );

    match command {
        Commands::Watch { no_console, .. } => {
            let (store, store_task) = open_store(&config)?;
            let console_queries = live.with_store(store.clone());
            let result =
                run_watch(upstream, console_queries, store, settings, !no_console).await;
            drain_store(store_task).await;
            result
        }
        Commands::List { owner, limit } => {
            let (store, store_task) = open_store(&config)?;
            let result = live.with_store(store).list(owner, limit).await;
            drain_store(store_task).await;
            result
        }
        Commands::Fetch { owner } => live.fetch(owner).await,
        Commands::Playback { session_ids } => live.playback(&session_ids).await,
    }
}

fn open_store(config: &Config) -> anyhow::Result<(StoreHandle, JoinHandle<()>)> {
    let conn = storage::open(&config.storage.resolved_db_path())?;
    Ok(spawn_store_server(conn))
}

/// Wait for the store to drain its queue. Every handle must be gone by now.
async fn drain_store(store_task: JoinHandle<()>) {
    if let Err(e) = store_task.await {
        tracing::warn!("Store task ended abnormally: {e}");
    }
}

async fn run_watch(
    upstream: Arc<dyn UpstreamApi>,
    queries: Queries,
    store: StoreHandle,
    settings: WatchSettings,
    with_console: bool,
) -> anyhow::Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);

    tokio::spawn({
        let shutdown_tx = shutdown_tx.clone();
        async move {
            wait_for_signal().await;
            tracing::info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    let console = if with_console {
        let console = Console::new(queries);
        Some(tokio::spawn(
            console.run(spawn_stdin_reader(), shutdown_tx.clone()),
        ))
    } else {
        None
    };

    let mut watcher = Watcher::new(upstream, store, settings);
    let result = watcher.run(shutdown_rx).await;

    // Wake the console if the loop ended on its own
    let _ = shutdown_tx.send(true);
    if let Some(console) = console {
        let _ = console.await;
    }

    let in_flight = watcher.in_flight();
    if in_flight > 0 {
        tracing::warn!(in_flight, "Abandoning unfinished enrichment tasks");
    }
    drop(watcher);

    result.map_err(|e| {
        tracing::error!("Too many errors fetching the live list, exiting");
        anyhow::Error::from(e)
    })
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!("Cannot listen for SIGTERM: {e}");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
