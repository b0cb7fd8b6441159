//! Current weather and forecast panels

use chrono::{DateTime, Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Most forecast days shown at once
pub const MAX_FORECAST_DAYS: usize = 7;

/// A temperature as published: either a bare number or preformatted text
/// such as `"21°C"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Temperature {
    Number(f64),
    Text(String),
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // f64's Display already drops a trailing ".0"
            Temperature::Number(value) => write!(f, "{value}"),
            Temperature::Text(text) => f.write_str(text),
        }
    }
}

/// Contents of the current weather resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    /// Condition description, e.g. "Leichter Regen"
    pub weather: String,
    pub akt_temperature: Temperature,
    pub min_temperature: Temperature,
    pub max_temperature: Temperature,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<Temperature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Text and image shown in the current weather panel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherPanel {
    pub headline: String,
    pub icon: String,
    pub min_label: String,
    pub max_label: String,
}

impl WeatherPanel {
    pub fn new(current: &CurrentWeather, icon: &str) -> Self {
        Self {
            headline: format!("{}, {}", current.weather, current.akt_temperature),
            icon: icon.to_string(),
            min_label: format!("Min: {}", current.min_temperature),
            max_label: format!("Max: {}", current.max_temperature),
        }
    }
}

/// One day of the forecast resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    /// Calendar date, `YYYY-MM-DD`
    pub date: String,
    pub min_temperature: Temperature,
    pub max_temperature: Temperature,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// One rendered forecast day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastEntry {
    pub label: String,
    pub icon: String,
    pub temperatures: String,
}

impl ForecastEntry {
    pub fn new(day: &ForecastDay, icon_dir: &str) -> Self {
        Self {
            label: weekday_label(&day.date),
            icon: format!("{}/{}.png", icon_dir.trim_end_matches('/'), day.date),
            temperatures: format!("{} / {}", day.min_temperature, day.max_temperature),
        }
    }
}

/// The forecast strip: the first [`MAX_FORECAST_DAYS`] days in order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ForecastPanel {
    pub entries: Vec<ForecastEntry>,
}

impl ForecastPanel {
    pub fn new(days: &[ForecastDay], icon_dir: &str) -> Self {
        Self {
            entries: days
                .iter()
                .take(MAX_FORECAST_DAYS)
                .map(|day| ForecastEntry::new(day, icon_dir))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Short German weekday name for a date, or the date itself if it does not
/// parse.
pub fn weekday_label(date: &str) -> String {
    parse_date(date)
        .map(|d| german_weekday(d.weekday()).to_string())
        .unwrap_or_else(|| date.to_string())
}

fn parse_date(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(date).ok().map(|dt| dt.date_naive()))
}

fn german_weekday(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Mo.",
        Weekday::Tue => "Di.",
        Weekday::Wed => "Mi.",
        Weekday::Thu => "Do.",
        Weekday::Fri => "Fr.",
        Weekday::Sat => "Sa.",
        Weekday::Sun => "So.",
    }
}
