//! Widget data locations and refresh intervals

use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_WEATHER_INTERVAL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_MARQUEE_INTERVAL: Duration = Duration::from_secs(60);

/// Where widget data lives and how often it is fetched again
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetConfig {
    /// Directory relative resource references resolve against
    pub base_dir: PathBuf,
    /// Current weather resource
    pub weather_url: String,
    /// Forecast resource (array of days)
    pub forecast_url: String,
    /// Image shown next to the current weather
    pub weather_icon: String,
    /// Directory holding one `{date}.png` per forecast day
    pub icon_dir: String,
    /// Marquee text resource
    pub marquee_url: String,
    /// Refresh interval of weather and forecast
    pub weather_interval: Duration,
    /// Refresh interval of the marquee
    pub marquee_interval: Duration,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            weather_url: "output/wetterdaten.json".to_string(),
            forecast_url: "output/wettervorhersage.json".to_string(),
            weather_icon: "output/wetter_icon.png".to_string(),
            icon_dir: "output".to_string(),
            marquee_url: "output/infos.json".to_string(),
            weather_interval: DEFAULT_WEATHER_INTERVAL,
            marquee_interval: DEFAULT_MARQUEE_INTERVAL,
        }
    }
}

impl WidgetConfig {
    pub fn with_base_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.base_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_weather_interval(mut self, interval: Duration) -> Self {
        self.weather_interval = interval;
        self
    }

    pub fn with_marquee_interval(mut self, interval: Duration) -> Self {
        self.marquee_interval = interval;
        self
    }
}
