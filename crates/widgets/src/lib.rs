//! Kiosk Widgets Library
//!
//! Weather, forecast and marquee panels shown around the document carousel,
//! fed from JSON resources refreshed on timers, and the producer that writes
//! the weather resources from OpenWeatherMap.

pub mod board;
pub mod config;
pub mod marquee;
pub mod poller;
pub mod producer;
pub mod source;
pub mod weather;

pub use board::{BoardState, WidgetBoard};
pub use config::{WidgetConfig, DEFAULT_MARQUEE_INTERVAL, DEFAULT_WEATHER_INTERVAL};
pub use marquee::Marquee;
pub use poller::WidgetPollers;
pub use producer::{ProducerConfig, WeatherProducer};
pub use source::{FetchError, Source};
pub use weather::{
    weekday_label, CurrentWeather, ForecastDay, ForecastEntry, ForecastPanel, Temperature,
    WeatherPanel, MAX_FORECAST_DAYS,
};
