//! VScroll feed demo host - Main entry point
//!
//! Plays the configured feed through a simulated scroll: each item is made
//! visible in turn, allowed to play for a dwell time, optionally tapped for
//! replay, then scrolled away. The walk ends by scrolling back to the first
//! item, which resumes where it was left.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use vscroll_common::config::ConfigResolver;
use vscroll_common::events::EventBus;
use vscroll_common::human_time::format_offset_opt;
use vscroll_common::{PlaybackOffset, VideoId};
use vscroll_feed::feed::FeedHandle;
use vscroll_feed::media::{
    AssetLoader, HttpAssetLoader, SimulatedAssetLoader, SimulatedPlayerFactory,
};
use vscroll_feed::{FeedController, PositionStore, SessionOptions, SessionSinks};

/// Length reported for items whose probe carries no duration
const SIMULATED_DURATION_SECS: f64 = 30.0;

/// Probe latency in offline mode
const OFFLINE_LATENCY: Duration = Duration::from_millis(300);

/// Command-line arguments for vscroll-feed
#[derive(Parser, Debug)]
#[command(name = "vscroll-feed")]
#[command(about = "Vertically scrolling video feed demo host")]
#[command(version)]
struct Args {
    /// Configuration file (overrides VSCROLL_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seconds each item stays visible
    #[arg(short, long, default_value = "3", env = "VSCROLL_DWELL_SECS")]
    dwell_secs: u64,

    /// Tap every Nth item for replay (0 disables)
    #[arg(short, long, default_value = "0")]
    replay_every: usize,

    /// Probe with the simulated loader instead of HTTP
    #[arg(long)]
    offline: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let resolver = ConfigResolver::new(args.config.clone());
    let config = resolver.load().context("Failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.logging.level;
        EnvFilter::new(format!("vscroll_feed={level},vscroll_common={level}"))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        "Starting vscroll-feed v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match resolver.config_path() {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: built-in defaults"),
    }

    let items: Vec<VideoId> = config.videos.iter().map(VideoId::new).collect();
    let options = SessionOptions::from(&config);
    let store = Arc::new(PositionStore::new());

    let loader: Arc<dyn AssetLoader> = if args.offline {
        info!("Offline mode: simulated readiness probes");
        Arc::new(SimulatedAssetLoader::new(
            OFFLINE_LATENCY,
            PlaybackOffset::from_secs(SIMULATED_DURATION_SECS),
        ))
    } else {
        Arc::new(
            HttpAssetLoader::new(config.probe_timeout())
                .context("Failed to initialize HTTP loader")?,
        )
    };
    let players = Arc::new(SimulatedPlayerFactory::new(PlaybackOffset::from_secs(
        SIMULATED_DURATION_SECS,
    )));

    let completed = Arc::new(AtomicUsize::new(0));
    let errors = Arc::new(AtomicUsize::new(0));
    let sinks = {
        let completed = Arc::clone(&completed);
        let errors = Arc::clone(&errors);
        Box::new(move |index: usize, video_id: &VideoId| {
            let completed = Arc::clone(&completed);
            let errors = Arc::clone(&errors);
            let failed_id = video_id.clone();
            SessionSinks::new(
                move || {
                    completed.fetch_add(1, Ordering::Relaxed);
                },
                move || {
                    warn!("Item {} ({}) could not be played", index, failed_id);
                    errors.fetch_add(1, Ordering::Relaxed);
                },
            )
        })
    };

    let events = EventBus::default();
    let event_log = tokio::spawn(log_events(events.subscribe()));

    let controller = FeedController::new(items.clone(), Arc::clone(&store), loader, players, options)
        .with_event_bus(events)
        .with_sinks(sinks);
    let (handle, controller_task) = controller.spawn(32);

    let dwell = Duration::from_secs(args.dwell_secs);
    tokio::select! {
        result = scroll_feed(&handle, items.len(), dwell, args.replay_every) => {
            result.context("Feed walk failed")?;
            info!("Feed walk finished");
        }
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    drop(handle);
    controller_task
        .await
        .context("Feed controller task failed")?;
    event_log.abort();

    let positions = store.snapshot();
    info!("Stored positions ({} of {} items):", positions.len(), items.len());
    for (index, video_id) in items.iter().enumerate() {
        info!(
            "  [{}] {} at {}",
            index,
            video_id,
            format_offset_opt(positions.get(video_id).copied())
        );
    }
    info!(
        "Completed: {}, errors: {}",
        completed.load(Ordering::Relaxed),
        errors.load(Ordering::Relaxed)
    );

    Ok(())
}

/// Walk the feed top to bottom, then scroll back to the first item
///
/// The neighbor below the visible item is constructed ahead of time, and
/// the item above is torn down once it leaves the window, as a list host
/// recycling views would do.
async fn scroll_feed(
    handle: &FeedHandle,
    count: usize,
    dwell: Duration,
    replay_every: usize,
) -> vscroll_feed::Result<()> {
    for index in 0..count {
        handle.view_appeared(index).await?;
        if index + 1 < count {
            handle.view_appeared(index + 1).await?;
        }

        info!("Scrolled to item {}", index);
        handle.activate(index).await?;
        tokio::time::sleep(dwell).await;

        if replay_every > 0 && (index + 1) % replay_every == 0 && handle.replay(index).await? {
            tokio::time::sleep(dwell).await;
        }

        handle.deactivate(index).await?;
        if index > 0 {
            handle.view_disappeared(index - 1).await?;
        }
    }

    if count > 0 {
        info!("Scrolling back to item 0");
        handle.view_appeared(0).await?;
        handle.activate(0).await?;
        tokio::time::sleep(dwell).await;
        handle.deactivate(0).await?;
    }
    Ok(())
}

/// Log every feed event as a JSON line
async fn log_events(mut rx: broadcast::Receiver<vscroll_common::events::FeedEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(line) => debug!("event {}", line),
                Err(e) => warn!("Failed to serialize {} event: {}", event.kind(), e),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Event log lagged, {} events skipped", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
