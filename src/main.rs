use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use stereo_viewer::config::{Configuration, DriverKind, SourcePaths};
use stereo_viewer::events::{ImmersiveEvent, ImmersiveRequest, LoadRequest, SourceEvent};
use stereo_viewer::tasks;

#[derive(Debug, Parser)]
#[command(name = "stereo-viewer", version, about = "Stereoscopic image viewer")]
struct Args {
    /// Path to a YAML configuration file.
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Side-by-side composite image to view.
    #[arg(long, value_name = "FILE")]
    composite: Option<PathBuf>,

    /// Left-eye image of a pair.
    #[arg(long, value_name = "FILE", requires = "right")]
    left: Option<PathBuf>,

    /// Right-eye image of a pair.
    #[arg(long, value_name = "FILE", requires = "left")]
    right: Option<PathBuf>,

    /// Immersive driver to negotiate spatial sessions with.
    #[arg(long, value_enum, value_name = "KIND")]
    immersive_driver: Option<DriverKind>,

    /// Start in borderless fullscreen.
    #[arg(long)]
    fullscreen: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Configuration::default(),
    };

    // Sources named on the command line replace the configured block wholesale.
    if args.composite.is_some() || args.left.is_some() {
        cfg.source = SourcePaths {
            composite: args.composite,
            left: args.left,
            right: args.right,
        };
    }
    if let Some(kind) = args.immersive_driver {
        cfg.immersive_driver = kind;
    }
    if args.fullscreen {
        cfg.window.fullscreen = true;
    }
    let cfg = cfg.validated().context("invalid configuration values")?;

    let requests = cfg.source.requests()?;
    if requests.is_empty() {
        warn!("no sources configured; the window opens idle");
    }

    // Channels (small/bounded)
    let (load_tx, load_rx) = mpsc::channel::<LoadRequest>(4); // viewer/watcher -> loader
    let (source_tx, source_rx) = mpsc::channel::<SourceEvent>(2); // loader -> viewer
    let (driver_tx, driver_rx) = mpsc::channel::<ImmersiveRequest>(8); // viewer -> driver
    let (driver_event_tx, driver_event_rx) = mpsc::channel::<ImmersiveEvent>(16); // driver -> viewer

    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("ctrl-c handler failed: {err}");
                return;
            }
            info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    let mut tasks = JoinSet::new();

    tasks.spawn({
        let source_tx = source_tx.clone();
        let cancel = cancel.clone();
        let max_dimension = cfg.max_source_dimension;
        async move {
            tasks::loader::run(load_rx, source_tx, cancel, max_dimension)
                .await
                .context("loader task failed")
        }
    });

    tasks.spawn({
        let requests = requests.clone();
        let load_tx = load_tx.clone();
        let cancel = cancel.clone();
        async move {
            tasks::watch::run(requests, load_tx, cancel)
                .await
                .context("watch task failed")
        }
    });

    tasks.spawn({
        let kind = cfg.immersive_driver;
        let driver_event_tx = driver_event_tx.clone();
        let cancel = cancel.clone();
        async move {
            tasks::immersive::run(kind, driver_rx, driver_event_tx, cancel)
                .await
                .context("immersive driver task failed")
        }
    });

    if let Some(request) = requests.first() {
        load_tx
            .send(LoadRequest(request.clone()))
            .await
            .context("failed to queue the initial load")?;
    }

    // Run the windowed viewer on the main thread (blocking) after spawning other tasks.
    // This call returns when the window closes or cancellation occurs.
    if let Err(e) = tasks::viewer::run_windowed(
        cfg,
        requests,
        source_rx,
        load_tx,
        driver_tx,
        driver_event_rx,
        cancel.clone(),
    )
    .context("viewer failed")
    {
        error!("{e:?}");
    }
    // Ensure other tasks are asked to stop.
    cancel.cancel();

    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("task error: {e:?}"),
            Err(e) => error!("join error: {e}"),
        }
    }

    Ok(())
}
