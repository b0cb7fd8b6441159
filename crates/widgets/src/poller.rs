//! Periodic widget refresh
//!
//! Weather (with forecast) and marquee are fetched once at start and then on
//! their own timers. Each refresh runs as its own task, so a slow endpoint
//! never delays the next tick of either timer.

use kiosk_scheduler::TimerSet;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::board::WidgetBoard;
use crate::config::WidgetConfig;

/// Timers keeping a [`WidgetBoard`] up to date
pub struct WidgetPollers {
    board: WidgetBoard,
    config: Arc<WidgetConfig>,
    timers: TimerSet,
}

impl WidgetPollers {
    pub fn new(config: WidgetConfig, board: WidgetBoard) -> Self {
        Self {
            board,
            config: Arc::new(config),
            timers: TimerSet::new(),
        }
    }

    pub fn board(&self) -> &WidgetBoard {
        &self.board
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    /// Refresh every widget now and arm the refresh timers.
    ///
    /// Returns the initial refresh tasks. Must be called from within a tokio
    /// runtime; calling it again while running does nothing.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        if !self.timers.is_empty() {
            tracing::warn!("widget pollers already started");
            return Vec::new();
        }

        let initial = vec![
            spawn_weather(&self.board, &self.config),
            spawn_marquee(&self.board, &self.config),
        ];

        let (board, config) = (self.board.clone(), self.config.clone());
        self.timers
            .every("weather", self.config.weather_interval, move || {
                spawn_weather(&board, &config);
            });

        let (board, config) = (self.board.clone(), self.config.clone());
        self.timers
            .every("marquee", self.config.marquee_interval, move || {
                spawn_marquee(&board, &config);
            });

        tracing::info!(
            weather_interval = ?self.config.weather_interval,
            marquee_interval = ?self.config.marquee_interval,
            "widget pollers started"
        );
        initial
    }

    /// Stop both refresh timers. Refreshes already in flight still finish.
    pub fn stop(&self) {
        let timers = self.timers.stop_all();
        tracing::info!(timers, "widget pollers stopped");
    }

    pub fn is_running(&self) -> bool {
        !self.timers.is_empty()
    }
}

fn spawn_weather(board: &WidgetBoard, config: &Arc<WidgetConfig>) -> JoinHandle<()> {
    let (board, config) = (board.clone(), config.clone());
    tokio::spawn(async move {
        // Failures are logged by the board.
        let _ = board.refresh_weather(&config).await;
    })
}

fn spawn_marquee(board: &WidgetBoard, config: &Arc<WidgetConfig>) -> JoinHandle<()> {
    let (board, config) = (board.clone(), config.clone());
    tokio::spawn(async move {
        let _ = board.refresh_marquee(&config).await;
    })
}
