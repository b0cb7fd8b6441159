//! Kiosk configuration
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. A TOML file (optional; built-in defaults otherwise)
//! 2. `KIOSK_*` environment variables
//! 3. Command-line flags
//!
//! Example file:
//!
//! ```toml
//! base_dir = "/srv/kiosk"
//! documents = ["pdfs/1.pdf", "pdfs/2.pdf", "pdfs/3.pdf"]
//! advance_secs = 15
//! reload_secs = 60
//!
//! [widgets]
//! weather_secs = 3600
//! marquee_secs = 60
//!
//! [producer]
//! enabled = true
//! city = "Berlin"
//! ```
//!
//! The OpenWeatherMap key is only read from `OPENWEATHER_API_KEY`.

use kiosk_core::{CarouselConfig, SlotConfig, DEFAULT_DOCUMENT_COUNT, REFERENCE_SCALE};
use kiosk_render::Size;
use kiosk_widgets::producer::{DEFAULT_API_BASE, DEFAULT_PRODUCER_INTERVAL};
use kiosk_widgets::{ProducerConfig, WidgetConfig};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const ENV_BASE_DIR: &str = "KIOSK_BASE_DIR";
pub const ENV_RELOAD_SECS: &str = "KIOSK_RELOAD_SECS";
pub const ENV_ADVANCE_SECS: &str = "KIOSK_ADVANCE_SECS";
pub const ENV_WEATHER_SECS: &str = "KIOSK_WEATHER_SECS";
pub const ENV_MARQUEE_SECS: &str = "KIOSK_MARQUEE_SECS";
pub const ENV_SNAPSHOT_DIR: &str = "KIOSK_SNAPSHOT_DIR";
pub const ENV_PRODUCER_ENABLED: &str = "KIOSK_PRODUCER_ENABLED";
pub const ENV_OPENWEATHER_API_KEY: &str = "OPENWEATHER_API_KEY";

/// Errors loading or validating the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Widget resource locations and refresh intervals
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WidgetSettings {
    pub weather_url: String,
    pub forecast_url: String,
    pub weather_icon: String,
    pub icon_dir: String,
    pub marquee_url: String,
    pub weather_secs: u64,
    pub marquee_secs: u64,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        let defaults = WidgetConfig::default();
        Self {
            weather_url: defaults.weather_url,
            forecast_url: defaults.forecast_url,
            weather_icon: defaults.weather_icon,
            icon_dir: defaults.icon_dir,
            marquee_url: defaults.marquee_url,
            weather_secs: defaults.weather_interval.as_secs(),
            marquee_secs: defaults.marquee_interval.as_secs(),
        }
    }
}

/// Weather producer settings
#[derive(Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProducerSettings {
    pub enabled: bool,
    pub city: String,
    pub api_base: String,
    /// Directory of `{icon-code}.png` images, relative to `base_dir`
    pub icon_source_dir: PathBuf,
    /// Directory the weather files are written to, relative to `base_dir`
    pub output_dir: PathBuf,
    pub interval_secs: u64,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for ProducerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            city: "Berlin".to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            icon_source_dir: PathBuf::from("Datenback_images"),
            output_dir: PathBuf::from("output"),
            interval_secs: DEFAULT_PRODUCER_INTERVAL.as_secs(),
            api_key: None,
        }
    }
}

impl std::fmt::Debug for ProducerSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProducerSettings")
            .field("enabled", &self.enabled)
            .field("city", &self.city)
            .field("api_base", &self.api_base)
            .field("icon_source_dir", &self.icon_source_dir)
            .field("output_dir", &self.output_dir)
            .field("interval_secs", &self.interval_secs)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Complete kiosk configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KioskConfig {
    /// Directory relative document and widget references resolve against
    pub base_dir: PathBuf,
    /// Documents in display order
    pub documents: Vec<String>,
    /// Advance interval shared by every document
    pub advance_secs: u64,
    /// Per-document advance intervals; overrides `advance_secs` when set
    pub advance_secs_per_document: Option<Vec<u64>>,
    pub reload_secs: u64,
    pub reference_scale: f32,
    /// Size of each canvas container in pixels
    pub container_width: f32,
    pub container_height: f32,
    /// Write every presented page as `slot-<n>.png` into this directory
    pub snapshot_dir: Option<PathBuf>,
    pub widgets: WidgetSettings,
    pub producer: ProducerSettings,
}

impl Default for KioskConfig {
    fn default() -> Self {
        let carousel = CarouselConfig::default();
        Self {
            base_dir: PathBuf::from("."),
            documents: (1..=DEFAULT_DOCUMENT_COUNT)
                .map(|n| format!("pdfs/{n}.pdf"))
                .collect(),
            advance_secs: kiosk_core::DEFAULT_ADVANCE_INTERVAL.as_secs(),
            advance_secs_per_document: None,
            reload_secs: carousel.reload_interval.as_secs(),
            reference_scale: REFERENCE_SCALE,
            container_width: 800.0,
            container_height: 600.0,
            snapshot_dir: None,
            widgets: WidgetSettings::default(),
            producer: ProducerSettings::default(),
        }
    }
}

impl KioskConfig {
    /// Load the file (if any), apply the environment and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Apply `KIOSK_*` environment overrides.
    pub fn apply_env(mut self) -> Result<Self, ConfigError> {
        if let Ok(val) = std::env::var(ENV_BASE_DIR) {
            self.base_dir = PathBuf::from(val);
        }
        if let Some(secs) = env_secs(ENV_RELOAD_SECS)? {
            self.reload_secs = secs;
        }
        if let Some(secs) = env_secs(ENV_ADVANCE_SECS)? {
            self.advance_secs = secs;
            self.advance_secs_per_document = None;
        }
        if let Some(secs) = env_secs(ENV_WEATHER_SECS)? {
            self.widgets.weather_secs = secs;
        }
        if let Some(secs) = env_secs(ENV_MARQUEE_SECS)? {
            self.widgets.marquee_secs = secs;
        }
        if let Ok(val) = std::env::var(ENV_SNAPSHOT_DIR) {
            self.snapshot_dir = Some(PathBuf::from(val));
        }
        if let Ok(val) = std::env::var(ENV_PRODUCER_ENABLED) {
            self.producer.enabled = match val.trim() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: ENV_PRODUCER_ENABLED.to_string(),
                        value: val,
                    })
                }
            };
        }
        if let Ok(key) = std::env::var(ENV_OPENWEATHER_API_KEY) {
            let key = key.trim();
            if !key.is_empty() {
                self.producer.api_key = Some(key.to_string());
            }
        }
        Ok(self)
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.documents.is_empty() {
            return Err(ConfigError::Invalid("at least one document is required".into()));
        }

        let intervals = [
            ("advance_secs", self.advance_secs),
            ("reload_secs", self.reload_secs),
            ("widgets.weather_secs", self.widgets.weather_secs),
            ("widgets.marquee_secs", self.widgets.marquee_secs),
            ("producer.interval_secs", self.producer.interval_secs),
        ];
        if let Some((key, _)) = intervals.iter().find(|(_, secs)| *secs == 0) {
            return Err(ConfigError::Invalid(format!("{key} must be greater than zero")));
        }

        if let Some(per_document) = &self.advance_secs_per_document {
            if per_document.len() != self.documents.len() {
                return Err(ConfigError::Invalid(format!(
                    "advance_secs_per_document has {} entries but {} documents are configured",
                    per_document.len(),
                    self.documents.len()
                )));
            }
            if per_document.contains(&0) {
                return Err(ConfigError::Invalid(
                    "advance_secs_per_document entries must be greater than zero".into(),
                ));
            }
        }

        let positive = |v: f32| v.is_finite() && v > 0.0;
        if !positive(self.container_width) || !positive(self.container_height) {
            return Err(ConfigError::Invalid(format!(
                "container size {}x{} must be positive",
                self.container_width, self.container_height
            )));
        }
        if !positive(self.reference_scale) {
            return Err(ConfigError::Invalid(format!(
                "reference_scale {} must be positive",
                self.reference_scale
            )));
        }

        if self.producer.enabled && self.producer.api_key.is_none() {
            return Err(ConfigError::Invalid(format!(
                "the weather producer needs {ENV_OPENWEATHER_API_KEY}"
            )));
        }

        Ok(())
    }

    pub fn container_size(&self) -> Size {
        Size::new(self.container_width, self.container_height)
    }

    /// Advance interval of document `index`.
    pub fn advance_interval(&self, index: usize) -> Duration {
        let secs = self
            .advance_secs_per_document
            .as_ref()
            .and_then(|per_document| per_document.get(index).copied())
            .unwrap_or(self.advance_secs);
        Duration::from_secs(secs)
    }

    pub fn carousel_config(&self) -> CarouselConfig {
        CarouselConfig {
            slots: self
                .documents
                .iter()
                .enumerate()
                .map(|(index, url)| {
                    SlotConfig::new(url.clone()).with_advance_interval(self.advance_interval(index))
                })
                .collect(),
            reload_interval: Duration::from_secs(self.reload_secs),
            reference_scale: self.reference_scale,
        }
    }

    pub fn widget_config(&self) -> WidgetConfig {
        let widgets = &self.widgets;
        WidgetConfig {
            base_dir: self.base_dir.clone(),
            weather_url: widgets.weather_url.clone(),
            forecast_url: widgets.forecast_url.clone(),
            weather_icon: widgets.weather_icon.clone(),
            icon_dir: widgets.icon_dir.clone(),
            marquee_url: widgets.marquee_url.clone(),
            weather_interval: Duration::from_secs(widgets.weather_secs),
            marquee_interval: Duration::from_secs(widgets.marquee_secs),
        }
    }

    /// Weather producer configuration, `None` unless the producer is enabled
    /// and has an API key.
    pub fn producer_config(&self) -> Option<ProducerConfig> {
        let producer = &self.producer;
        let api_key = producer.api_key.as_ref().filter(|_| producer.enabled)?;
        Some(ProducerConfig {
            api_key: api_key.clone(),
            city: producer.city.clone(),
            api_base: producer.api_base.clone(),
            icon_source_dir: self.base_dir.join(&producer.icon_source_dir),
            output_dir: self.base_dir.join(&producer.output_dir),
            interval: Duration::from_secs(producer.interval_secs),
        })
    }

    /// Widget board snapshot file, if snapshots are enabled.
    pub fn widgets_snapshot_path(&self) -> Option<PathBuf> {
        self.snapshot_dir.as_ref().map(|dir| dir.join("widgets.json"))
    }

    /// Snapshot file for canvas `index`, if snapshots are enabled.
    pub fn snapshot_path(&self, index: usize) -> Option<PathBuf> {
        self.snapshot_dir
            .as_ref()
            .map(|dir| dir.join(format!("slot-{index}.png")))
    }
}

fn env_secs(key: &str) -> Result<Option<u64>, ConfigError> {
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: val,
            }),
        Err(_) => Ok(None),
    }
}
