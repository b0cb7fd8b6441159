//! OpenWeatherMap producer
//!
//! Fetches current conditions and the 5-day/3-hour forecast for one city and
//! writes them in the layout the weather panels read: `wetterdaten.json` plus
//! `wetter_icon.png` for the current weather, and `wettervorhersage.json` plus
//! one `{date}.png` per forecast day. Icons are copied from a directory of
//! `{icon-code}.png` files.

use chrono::{Local, NaiveDate};
use kiosk_scheduler::TimerSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::source::{FetchError, Source};
use crate::weather::{CurrentWeather, ForecastDay, Temperature};

pub const DEFAULT_API_BASE: &str = "http://api.openweathermap.org/data/2.5";
pub const DEFAULT_PRODUCER_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Forecast days written, starting tomorrow
pub const PRODUCED_FORECAST_DAYS: usize = 3;

/// Forecast entry whose conditions stand for the whole day
const MIDDAY: &str = "12:00:00";

pub const CURRENT_FILE: &str = "wetterdaten.json";
pub const CURRENT_ICON_FILE: &str = "wetter_icon.png";
pub const FORECAST_FILE: &str = "wettervorhersage.json";

/// Where and how often weather data is produced
#[derive(Debug, Clone, PartialEq)]
pub struct ProducerConfig {
    pub api_key: String,
    pub city: String,
    pub api_base: String,
    /// Directory of `{icon-code}.png` images
    pub icon_source_dir: PathBuf,
    /// Directory the JSON files and icons are written to
    pub output_dir: PathBuf,
    pub interval: Duration,
}

impl ProducerConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            city: "Berlin".to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            icon_source_dir: PathBuf::from("Datenback_images"),
            output_dir: PathBuf::from("output"),
            interval: DEFAULT_PRODUCER_INTERVAL,
        }
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = city.into();
        self
    }

    pub fn with_dirs<P: AsRef<Path>, Q: AsRef<Path>>(mut self, icon_source_dir: P, output_dir: Q) -> Self {
        self.icon_source_dir = icon_source_dir.as_ref().to_path_buf();
        self.output_dir = output_dir.as_ref().to_path_buf();
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    fn endpoint(&self, kind: &str) -> String {
        format!(
            "{}/{kind}?q={}&appid={}&units=metric&lang=de",
            self.api_base.trim_end_matches('/'),
            self.city,
            self.api_key
        )
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiMain {
    pub temp: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    #[serde(default)]
    pub humidity: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiCondition {
    pub description: String,
    pub icon: String,
}

/// Response of the `weather` endpoint
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiCurrent {
    pub name: String,
    pub main: ApiMain,
    pub weather: Vec<ApiCondition>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiForecastEntry {
    /// `YYYY-MM-DD HH:MM:SS`
    pub dt_txt: String,
    pub main: ApiMain,
    pub weather: Vec<ApiCondition>,
}

/// Response of the `forecast` endpoint
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiForecast {
    pub list: Vec<ApiForecastEntry>,
}

fn celsius(value: f64) -> Temperature {
    Temperature::Text(format!("{}°C", value.round() as i64))
}

/// Current weather as written to `wetterdaten.json`. `None` when the
/// response carries no condition.
pub fn current_weather(data: &ApiCurrent) -> Option<CurrentWeather> {
    let condition = data.weather.first()?;
    Some(CurrentWeather {
        weather: condition.description.clone(),
        akt_temperature: celsius(data.main.temp),
        min_temperature: celsius(data.main.temp_min),
        max_temperature: celsius(data.main.temp_max),
        city: Some(data.name.clone()),
        humidity: Some(Temperature::Text(format!("{}%", data.main.humidity.round() as i64))),
        icon: Some(condition.icon.clone()),
    })
}

struct DailyAggregate {
    min: f64,
    max: f64,
    condition: ApiCondition,
    midday: bool,
}

/// Daily forecast after `today`: the lowest minimum and highest maximum of
/// each day, with the conditions of its midday entry (or its first entry if
/// there is none). At most [`PRODUCED_FORECAST_DAYS`] days, in date order.
pub fn daily_forecast(data: &ApiForecast, today: NaiveDate) -> Vec<ForecastDay> {
    let mut days: BTreeMap<NaiveDate, DailyAggregate> = BTreeMap::new();

    for entry in &data.list {
        let Some((date, time)) = entry.dt_txt.split_once(' ') else {
            continue;
        };
        let Ok(date) = NaiveDate::parse_from_str(date, "%Y-%m-%d") else {
            continue;
        };
        let Some(condition) = entry.weather.first() else {
            continue;
        };
        if date <= today {
            continue;
        }

        let midday = time == MIDDAY;
        days.entry(date)
            .and_modify(|day| {
                day.min = day.min.min(entry.main.temp_min);
                day.max = day.max.max(entry.main.temp_max);
                if midday && !day.midday {
                    day.condition = condition.clone();
                    day.midday = true;
                }
            })
            .or_insert_with(|| DailyAggregate {
                min: entry.main.temp_min,
                max: entry.main.temp_max,
                condition: condition.clone(),
                midday,
            });
    }

    days.into_iter()
        .take(PRODUCED_FORECAST_DAYS)
        .map(|(date, day)| ForecastDay {
            date: date.format("%Y-%m-%d").to_string(),
            min_temperature: celsius(day.min),
            max_temperature: celsius(day.max),
            weather: Some(day.condition.description),
            icon: Some(day.condition.icon),
        })
        .collect()
}

/// Periodic producer of the weather resources
pub struct WeatherProducer {
    config: Arc<ProducerConfig>,
    timers: TimerSet,
}

impl WeatherProducer {
    pub fn new(config: ProducerConfig) -> Self {
        Self {
            config: Arc::new(config),
            timers: TimerSet::new(),
        }
    }

    pub fn config(&self) -> &ProducerConfig {
        &self.config
    }

    /// Produce once now and then on every interval.
    ///
    /// Returns the initial run. Calling it again while running does nothing.
    pub fn start(&self) -> Option<JoinHandle<()>> {
        if !self.timers.is_empty() {
            tracing::warn!("weather producer already started");
            return None;
        }

        let initial = spawn_produce(&self.config);
        let config = self.config.clone();
        self.timers.every("weather-producer", self.config.interval, move || {
            spawn_produce(&config);
        });
        tracing::info!(city = %self.config.city, interval = ?self.config.interval, "weather producer started");
        Some(initial)
    }

    pub fn stop(&self) {
        let timers = self.timers.stop_all();
        tracing::info!(timers, "weather producer stopped");
    }

    pub fn is_running(&self) -> bool {
        !self.timers.is_empty()
    }
}

fn spawn_produce(config: &Arc<ProducerConfig>) -> JoinHandle<()> {
    let config = config.clone();
    tokio::spawn(async move {
        produce(&config).await;
    })
}

/// Fetch both endpoints and write whatever arrived. Each failure is logged
/// and leaves the previous files in place.
pub async fn produce(config: &ProducerConfig) {
    let current = Source::Http(config.endpoint("weather"))
        .fetch_json::<ApiCurrent>()
        .await;
    let forecast = Source::Http(config.endpoint("forecast"))
        .fetch_json::<ApiForecast>()
        .await;

    match current {
        Ok(data) => {
            if let Err(e) = write_current(config, &data).await {
                tracing::warn!(error = %e, "failed to write current weather");
            }
        }
        // The request URL carries the API key, so only the city is logged.
        Err(_) => tracing::warn!(city = %config.city, "failed to fetch current weather"),
    }

    match forecast {
        Ok(data) => {
            let today = Local::now().date_naive();
            if let Err(e) = write_forecast(config, &data, today).await {
                tracing::warn!(error = %e, "failed to write forecast");
            }
        }
        Err(_) => tracing::warn!(city = %config.city, "failed to fetch forecast"),
    }
}

/// Write `wetterdaten.json` and copy the matching icon to `wetter_icon.png`.
pub async fn write_current(config: &ProducerConfig, data: &ApiCurrent) -> Result<(), FetchError> {
    let Some(current) = current_weather(data) else {
        return Err(FetchError::Decode {
            location: "weather".to_string(),
            reason: "response has no weather condition".to_string(),
        });
    };

    create_output_dir(&config.output_dir).await?;
    write_json(&config.output_dir.join(CURRENT_FILE), &current).await?;
    if let Some(icon) = &current.icon {
        copy_icon(config, icon, CURRENT_ICON_FILE).await;
    }
    tracing::info!(city = %data.name, weather = %current.weather, "current weather written");
    Ok(())
}

/// Write `wettervorhersage.json` for the days after `today` and copy one
/// icon per day to `{date}.png`.
pub async fn write_forecast(
    config: &ProducerConfig,
    data: &ApiForecast,
    today: NaiveDate,
) -> Result<(), FetchError> {
    let days = daily_forecast(data, today);

    create_output_dir(&config.output_dir).await?;
    write_json(&config.output_dir.join(FORECAST_FILE), &days).await?;
    for day in &days {
        if let Some(icon) = &day.icon {
            copy_icon(config, icon, &format!("{}.png", day.date)).await;
        }
    }
    tracing::info!(days = days.len(), "forecast written");
    Ok(())
}

async fn create_output_dir(dir: &Path) -> Result<(), FetchError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| FetchError::Write {
            path: dir.to_path_buf(),
            source,
        })
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), FetchError> {
    let json = serde_json::to_vec_pretty(value).map_err(|e| FetchError::Decode {
        location: path.display().to_string(),
        reason: e.to_string(),
    })?;
    tokio::fs::write(path, json)
        .await
        .map_err(|source| FetchError::Write {
            path: path.to_path_buf(),
            source,
        })
}

/// A missing source icon is logged; the panel then shows the previous image.
async fn copy_icon(config: &ProducerConfig, icon: &str, target: &str) {
    let from = config.icon_source_dir.join(format!("{icon}.png"));
    let to = config.output_dir.join(target);
    match tokio::fs::copy(&from, &to).await {
        Ok(_) => tracing::debug!(from = %from.display(), to = %to.display(), "icon copied"),
        Err(e) => tracing::warn!(icon = %from.display(), error = %e, "weather icon not copied"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::WidgetBoard;
    use crate::config::WidgetConfig;
    use std::fs;
    use tempfile::TempDir;

    fn entry(dt_txt: &str, min: f64, max: f64, description: &str, icon: &str) -> ApiForecastEntry {
        ApiForecastEntry {
            dt_txt: dt_txt.to_string(),
            main: ApiMain {
                temp: (min + max) / 2.0,
                temp_min: min,
                temp_max: max,
                humidity: 50.0,
            },
            weather: vec![ApiCondition {
                description: description.to_string(),
                icon: icon.to_string(),
            }],
        }
    }

    fn current() -> ApiCurrent {
        serde_json::from_str(
            r#"{
                "name": "Berlin",
                "main": {"temp": 21.6, "temp_min": 18.2, "temp_max": 24.5, "humidity": 63},
                "weather": [{"id": 500, "description": "Leichter Regen", "icon": "10d"}],
                "wind": {"speed": 3.1}
            }"#,
        )
        .unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()
    }

    fn setup() -> (TempDir, ProducerConfig) {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("icons")).unwrap();
        fs::write(dir.path().join("icons/10d.png"), b"rain").unwrap();
        fs::write(dir.path().join("icons/01d.png"), b"sun").unwrap();
        let config = ProducerConfig::new("secret")
            .with_dirs(dir.path().join("icons"), dir.path().join("output"));
        (dir, config)
    }

    #[test]
    fn test_endpoint() {
        let config = ProducerConfig::new("k3y").with_city("Hamburg");
        assert_eq!(
            config.endpoint("forecast"),
            "http://api.openweathermap.org/data/2.5/forecast?q=Hamburg&appid=k3y&units=metric&lang=de"
        );
    }

    #[test]
    fn test_current_weather_formats_temperatures() {
        let weather = current_weather(&current()).unwrap();
        assert_eq!(weather.akt_temperature.to_string(), "22°C");
        assert_eq!(weather.min_temperature.to_string(), "18°C");
        assert_eq!(weather.max_temperature.to_string(), "25°C");
        assert_eq!(weather.humidity.unwrap().to_string(), "63%");
        assert_eq!(weather.weather, "Leichter Regen");
        assert_eq!(weather.city.as_deref(), Some("Berlin"));
        assert_eq!(weather.icon.as_deref(), Some("10d"));
    }

    #[test]
    fn test_current_weather_without_condition() {
        let mut data = current();
        data.weather.clear();
        assert_eq!(current_weather(&data), None);
    }

    #[test]
    fn test_forecast_skips_today_and_aggregates_days() {
        let data = ApiForecast {
            list: vec![
                entry("2024-05-06 21:00:00", 5.0, 9.0, "Klar", "01n"),
                entry("2024-05-07 09:00:00", 8.4, 14.0, "Bewölkt", "04d"),
                entry("2024-05-07 12:00:00", 11.0, 19.6, "Sonnig", "01d"),
                entry("2024-05-07 15:00:00", 12.0, 18.0, "Regen", "10d"),
            ],
        };

        let days = daily_forecast(&data, today());

        assert_eq!(days.len(), 1);
        assert_eq!(days[0].date, "2024-05-07");
        assert_eq!(days[0].min_temperature.to_string(), "8°C");
        assert_eq!(days[0].max_temperature.to_string(), "20°C");
        assert_eq!(days[0].weather.as_deref(), Some("Sonnig"));
        assert_eq!(days[0].icon.as_deref(), Some("01d"));
    }

    #[test]
    fn test_forecast_without_midday_uses_first_entry() {
        let data = ApiForecast {
            list: vec![
                entry("2024-05-08 00:00:00", 3.0, 4.0, "Nebel", "50n"),
                entry("2024-05-08 03:00:00", 2.0, 3.0, "Klar", "01n"),
            ],
        };

        let days = daily_forecast(&data, today());
        assert_eq!(days[0].weather.as_deref(), Some("Nebel"));
        assert_eq!(days[0].min_temperature.to_string(), "2°C");
    }

    #[test]
    fn test_forecast_is_capped_and_ordered() {
        let data = ApiForecast {
            list: ["2024-05-10", "2024-05-08", "2024-05-07", "2024-05-11", "2024-05-09"]
                .iter()
                .map(|date| entry(&format!("{date} 12:00:00"), 1.0, 2.0, "x", "01d"))
                .chain([entry("kaputt", 1.0, 2.0, "x", "01d")])
                .collect(),
        };

        let dates: Vec<_> = daily_forecast(&data, today())
            .into_iter()
            .map(|day| day.date)
            .collect();
        assert_eq!(dates, ["2024-05-07", "2024-05-08", "2024-05-09"]);
    }

    #[tokio::test]
    async fn test_written_files_feed_the_weather_panels() {
        let (dir, config) = setup();
        let forecast = ApiForecast {
            list: vec![
                entry("2024-05-07 12:00:00", 9.0, 17.0, "Sonnig", "01d"),
                entry("2024-05-08 12:00:00", 7.0, 12.0, "Regen", "10d"),
            ],
        };

        write_current(&config, &current()).await.unwrap();
        write_forecast(&config, &forecast, today()).await.unwrap();

        let output = dir.path().join("output");
        assert_eq!(fs::read(output.join(CURRENT_ICON_FILE)).unwrap(), b"rain");
        assert_eq!(fs::read(output.join("2024-05-07.png")).unwrap(), b"sun");
        assert_eq!(fs::read(output.join("2024-05-08.png")).unwrap(), b"rain");

        let widgets = WidgetConfig::default().with_base_dir(dir.path());
        let board = WidgetBoard::new();
        board.refresh_weather(&widgets).await.unwrap();
        assert_eq!(board.weather().unwrap().headline, "Leichter Regen, 22°C");
        let panel = board.forecast().unwrap();
        assert_eq!(panel.entries[0].label, "Di.");
        assert_eq!(panel.entries[1].temperatures, "7°C / 12°C");
    }

    #[tokio::test]
    async fn test_missing_icon_still_writes_data() {
        let (dir, config) = setup();
        let mut data = current();
        data.weather[0].icon = "13n".to_string();

        write_current(&config, &data).await.unwrap();

        let output = dir.path().join("output");
        assert!(output.join(CURRENT_FILE).exists());
        assert!(!output.join(CURRENT_ICON_FILE).exists());
    }
}
