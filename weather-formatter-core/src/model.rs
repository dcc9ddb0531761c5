use std::{fmt, str::FromStr};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One weather sample, either current conditions or an hourly forecast entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    /// 12-hour clock label in the observer's local time, e.g. "1pm".
    pub hour_label: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub condition_text: String,
    pub condition_code: i64,
    /// Rain plus snow volume, or probability 0-100, depending on [`PrecipSource`].
    pub precipitation: f64,
    pub humidity: i64,
    pub wind_speed: f64,
    pub wind_direction: i64,
    pub pressure: i64,
    pub uv_index: Option<f64>,
    pub visibility: Option<i64>,
    pub dew_point: Option<f64>,
    /// The raw provider payload for this sample.
    ///
    /// Dotted output fields read from here. Leaves that are not strings render as JSON
    /// text, so booleans come out as `true`/`false` and nulls as `null`.
    #[serde(default)]
    pub extra_fields: Map<String, Value>,
}

/// Current conditions plus the hourly samples returned alongside them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub current: Observation,
    pub hourly: Vec<Observation>,
}

/// What to fetch and how much of the hourly forecast to keep.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRequest {
    pub location: Location,
    pub hours: usize,
    pub day: ForecastDay,
    pub units: Units,
    pub precip_source: PrecipSource,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    Coordinates { latitude: f64, longitude: f64 },
    /// 5-digit US ZIP code, resolved through geocoding.
    Zip(String),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Coordinates { latitude, longitude } => write!(f, "lat={latitude}, lon={longitude}"),
            Location::Zip(zip) => write!(f, "zip {zip}"),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid {kind} '{value}', expected one of: {expected}")]
pub struct ParseVariantError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

/// Which calendar day the hourly forecast is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastDay {
    #[default]
    Today,
    Tomorrow,
}

impl ForecastDay {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastDay::Today => "today",
            ForecastDay::Tomorrow => "tomorrow",
        }
    }

    /// Days after the current local date.
    pub fn offset_days(&self) -> u64 {
        match self {
            ForecastDay::Today => 0,
            ForecastDay::Tomorrow => 1,
        }
    }
}

impl fmt::Display for ForecastDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ForecastDay {
    type Err = ParseVariantError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "today" => Ok(ForecastDay::Today),
            "tomorrow" => Ok(ForecastDay::Tomorrow),
            _ => Err(ParseVariantError {
                kind: "forecast day",
                value: value.to_string(),
                expected: "today, tomorrow",
            }),
        }
    }
}

/// Unit system requested from the weather API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// Fahrenheit, miles/hour.
    #[default]
    Imperial,
    /// Celsius, metres/second.
    Metric,
    /// Kelvin, metres/second.
    Standard,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Imperial => "imperial",
            Units::Metric => "metric",
            Units::Standard => "standard",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Units {
    type Err = ParseVariantError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "imperial" => Ok(Units::Imperial),
            "metric" => Ok(Units::Metric),
            "standard" => Ok(Units::Standard),
            _ => Err(ParseVariantError {
                kind: "unit system",
                value: value.to_string(),
                expected: "imperial, metric, standard",
            }),
        }
    }
}

/// What the `precip` field carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrecipSource {
    /// Rain plus snow volume over the last hour.
    #[default]
    Amount,
    /// Probability of precipitation, 0-100.
    Probability,
}

impl PrecipSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrecipSource::Amount => "amount",
            PrecipSource::Probability => "probability",
        }
    }
}

impl fmt::Display for PrecipSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrecipSource {
    type Err = ParseVariantError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "amount" => Ok(PrecipSource::Amount),
            "probability" | "pop" => Ok(PrecipSource::Probability),
            _ => Err(ParseVariantError {
                kind: "precipitation source",
                value: value.to_string(),
                expected: "amount, probability",
            }),
        }
    }
}

/// Render a time as an unpadded 12-hour label with lowercase suffix ("1pm", "12am").
pub fn hour_label<Tz>(time: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    time.format("%-I%P").to_string()
}
