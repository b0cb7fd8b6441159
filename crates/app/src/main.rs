//! pdf-kiosk
//!
//! Shows a row of PDF documents, each flipping through its pages on its own
//! timer and reloading from disk (or HTTP) periodically, next to weather and
//! marquee widgets.
//!
//! SIGHUP re-reads the configuration and applies a changed container size;
//! Ctrl-C shuts down.

mod cli;
mod config;
mod display;

use anyhow::{Context, Result};
use clap::Parser;
use kiosk_core::Carousel;
use kiosk_render::PdfiumService;
use kiosk_widgets::{WeatherProducer, WidgetBoard, WidgetPollers};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Args;
use crate::config::KioskConfig;
use crate::display::Display;

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = args
        .resolve_config()
        .context("failed to load configuration")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;

    runtime.block_on(run(args, config))
}

async fn run(args: Args, config: KioskConfig) -> Result<()> {
    tracing::info!(
        base_dir = %config.base_dir.display(),
        documents = config.documents.len(),
        "starting kiosk"
    );

    let service = PdfiumService::bind()
        .context("failed to bind PDFium")?
        .with_base_dir(&config.base_dir);

    if let Some(dir) = &config.snapshot_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create snapshot directory {}", dir.display()))?;
    }

    let display = Display::new(&config);
    let carousel = Carousel::new(Arc::new(service), config.carousel_config(), display.surfaces())?;

    let board = match config.widgets_snapshot_path() {
        Some(path) => WidgetBoard::new().with_snapshot_path(path),
        None => WidgetBoard::new(),
    };
    let pollers = WidgetPollers::new(config.widget_config(), board);
    let producer = config.producer_config().map(WeatherProducer::new);

    if let Some(producer) = &producer {
        producer.start();
    }
    carousel.start();
    pollers.start();

    let mut hangup = Hangup::new()?;
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for shutdown signal")?;
                break;
            }
            () = hangup.recv() => reload(&args, &display, &carousel),
        }
    }

    tracing::info!("shutting down");
    carousel.stop();
    pollers.stop();
    if let Some(producer) = &producer {
        producer.stop();
    }
    Ok(())
}

/// Re-read the configuration and refit every page if the container changed.
/// Other settings take effect on the next start.
fn reload(args: &Args, display: &Display, carousel: &Carousel) {
    let config = match args.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "configuration reload failed, keeping current settings");
            return;
        }
    };

    let size = config.container_size();
    if display.set_container_size(size) {
        tracing::info!(width = size.width, height = size.height, "container resized");
        carousel.on_resize();
    } else {
        tracing::info!("configuration reloaded, container size unchanged");
    }
}

#[cfg(unix)]
struct Hangup(tokio::signal::unix::Signal);

#[cfg(unix)]
impl Hangup {
    fn new() -> Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        signal(SignalKind::hangup())
            .map(Self)
            .context("failed to listen for SIGHUP")
    }

    async fn recv(&mut self) {
        if self.0.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
struct Hangup;

#[cfg(not(unix))]
impl Hangup {
    fn new() -> Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) {
        std::future::pending::<()>().await;
    }
}
