//! Latest widget content
//!
//! The board keeps whatever each widget last fetched successfully. A failed
//! refresh never clears it, so the kiosk keeps showing stale data rather than
//! an empty panel. With a snapshot path set, every successful refresh also
//! writes the whole board as JSON for the display to pick up.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::WidgetConfig;
use crate::marquee::Marquee;
use crate::source::{FetchError, Source};
use crate::weather::{CurrentWeather, ForecastDay, ForecastPanel, WeatherPanel};

/// Snapshot of every widget
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoardState {
    pub weather: Option<WeatherPanel>,
    pub forecast: Option<ForecastPanel>,
    pub marquee: Option<String>,
    /// Time of the last successful refresh of any widget
    pub updated_at: Option<DateTime<Utc>>,
}

/// Shared, cheaply cloneable widget state
#[derive(Debug, Clone, Default)]
pub struct WidgetBoard {
    state: Arc<RwLock<BoardState>>,
    snapshot_path: Option<Arc<PathBuf>>,
}

impl WidgetBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the board to `path` as JSON after every successful refresh.
    pub fn with_snapshot_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.snapshot_path = Some(Arc::new(path.as_ref().to_path_buf()));
        self
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref().map(PathBuf::as_path)
    }

    /// Write the current board to the snapshot path, if one is set.
    ///
    /// A failed write is logged; the board itself is unaffected.
    pub async fn publish(&self) {
        let Some(path) = self.snapshot_path.as_deref() else {
            return;
        };
        let json = match serde_json::to_vec_pretty(&self.snapshot()) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize widget board");
                return;
            }
        };
        match tokio::fs::write(path, json).await {
            Ok(()) => tracing::trace!(path = %path.display(), "widget board published"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to write widget board"),
        }
    }

    pub fn snapshot(&self) -> BoardState {
        self.state.read().clone()
    }

    pub fn weather(&self) -> Option<WeatherPanel> {
        self.state.read().weather.clone()
    }

    pub fn forecast(&self) -> Option<ForecastPanel> {
        self.state.read().forecast.clone()
    }

    pub fn marquee(&self) -> Option<String> {
        self.state.read().marquee.clone()
    }

    pub fn set_weather(&self, panel: WeatherPanel) {
        let mut state = self.state.write();
        state.weather = Some(panel);
        state.updated_at = Some(Utc::now());
    }

    /// Replace the whole forecast strip.
    pub fn set_forecast(&self, panel: ForecastPanel) {
        let mut state = self.state.write();
        state.forecast = Some(panel);
        state.updated_at = Some(Utc::now());
    }

    pub fn set_marquee(&self, text: impl Into<String>) {
        let mut state = self.state.write();
        state.marquee = Some(text.into());
        state.updated_at = Some(Utc::now());
    }

    /// Fetch the current weather and the forecast. Each one that fails is
    /// logged and keeps its previous content.
    pub async fn refresh_weather(&self, config: &WidgetConfig) -> Result<(), FetchError> {
        let current = Source::resolve(&config.weather_url, &config.base_dir)
            .fetch_json::<CurrentWeather>()
            .await;
        let forecast = Source::resolve(&config.forecast_url, &config.base_dir)
            .fetch_json::<Vec<ForecastDay>>()
            .await;

        let current = current.map(|current| {
            let panel = WeatherPanel::new(&current, &config.weather_icon);
            tracing::info!(headline = %panel.headline, min = %panel.min_label, max = %panel.max_label, "weather updated");
            self.set_weather(panel);
        });
        if let Err(e) = &current {
            tracing::warn!(error = %e, "failed to refresh weather");
        }

        let forecast = forecast.map(|days| {
            let panel = ForecastPanel::new(&days, &config.icon_dir);
            for entry in &panel.entries {
                tracing::info!(day = %entry.label, temperatures = %entry.temperatures, "forecast updated");
            }
            self.set_forecast(panel);
        });
        if let Err(e) = &forecast {
            tracing::warn!(error = %e, "failed to refresh forecast");
        }

        if current.is_ok() || forecast.is_ok() {
            self.publish().await;
        }
        current.and(forecast)
    }

    /// Fetch the marquee text, keeping the previous text on failure.
    pub async fn refresh_marquee(&self, config: &WidgetConfig) -> Result<(), FetchError> {
        match Source::resolve(&config.marquee_url, &config.base_dir)
            .fetch_json::<Marquee>()
            .await
        {
            Ok(marquee) => {
                tracing::info!(text = %marquee.text(), "marquee updated");
                self.set_marquee(marquee.infos);
                self.publish().await;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to refresh marquee");
                Err(e)
            }
        }
    }
}
