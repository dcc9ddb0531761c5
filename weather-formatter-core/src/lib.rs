//! Core library for the `weather-formatter` CLI.
//!
//! This crate defines:
//! - Condition-to-icon mapping
//! - The observation model and the delimiter-based output formatter
//! - Layered configuration (defaults, file, explicit overrides)
//! - Abstraction over the weather data source, with an OpenWeatherMap implementation
//!
//! It is used by `weather-formatter-cli`, but the formatter has no I/O of its own and can
//! be reused by anything that produces [`Observation`]s.

pub mod config;
pub mod error;
pub mod format;
pub mod icons;
pub mod model;
pub mod provider;

pub use config::{Config, PartialConfig};
pub use error::{ValidationErrors, WeatherApiError};
pub use format::{FormatConfig, Formatter, apply_preamble};
pub use icons::IconMapper;
pub use model::{
    ForecastDay, ForecastRequest, Location, Observation, PrecipSource, Units, WeatherReport,
};
pub use provider::WeatherSource;
