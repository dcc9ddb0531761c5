use crate::{
    Config, WeatherApiError,
    model::{ForecastDay, ForecastRequest, Location, Observation, PrecipSource, Units, WeatherReport},
    provider::openweather::OpenWeatherClient,
};
use async_trait::async_trait;
use chrono::{DateTime, Days, TimeZone};
use std::fmt::Debug;
use tracing::debug;

pub mod openweather;

/// A source of current conditions and hourly forecasts.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    /// Resolve a US ZIP code to `(latitude, longitude)`.
    async fn geocode_zip(&self, zipcode: &str) -> Result<(f64, f64), WeatherApiError>;

    /// Current conditions plus every hourly sample the source offers.
    async fn fetch_report(
        &self,
        latitude: f64,
        longitude: f64,
        units: Units,
        precip_source: PrecipSource,
    ) -> Result<WeatherReport, WeatherApiError>;
}

/// Construct the weather source from config.
pub fn source_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherSource>> {
    let api_key = config
        .api_key
        .as_deref()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "No API key configured.\n\
                 Hint: run `weather-formatter configure` or pass --api-key."
            )
        })?;

    Ok(Box::new(OpenWeatherClient::new(api_key.to_owned())?))
}

/// Coordinates pass through; ZIP codes are geocoded.
pub async fn resolve_location(
    source: &dyn WeatherSource,
    location: &Location,
) -> Result<(f64, f64), WeatherApiError> {
    match location {
        Location::Coordinates { latitude, longitude } => Ok((*latitude, *longitude)),
        Location::Zip(zip) => {
            debug!(zip = %zip, "geocoding zipcode");
            let coords = source.geocode_zip(zip).await?;
            debug!(lat = coords.0, lon = coords.1, "geocoded");
            Ok(coords)
        }
    }
}

/// Fetch a report whose hourly list is trimmed to the requested day and length.
pub async fn fetch_forecast<Tz: TimeZone>(
    source: &dyn WeatherSource,
    request: &ForecastRequest,
    now: &DateTime<Tz>,
) -> Result<WeatherReport, WeatherApiError> {
    let (lat, lon) = resolve_location(source, &request.location).await?;

    debug!(lat, lon, units = %request.units, "fetching weather");
    let report = source.fetch_report(lat, lon, request.units, request.precip_source).await?;

    let hourly = select_forecast(report.hourly, request.hours, request.day, now);
    debug!(entries = hourly.len(), day = %request.day, "selected forecast entries");

    Ok(WeatherReport { current: report.current, hourly })
}

/// Keep samples that fall on the requested local day, in order, at most `hours` of them.
///
/// "Local" is the timezone of `now`.
pub fn select_forecast<Tz: TimeZone>(
    hourly: Vec<Observation>,
    hours: usize,
    day: ForecastDay,
    now: &DateTime<Tz>,
) -> Vec<Observation> {
    let tz = now.timezone();
    let Some(target) = now.date_naive().checked_add_days(Days::new(day.offset_days())) else {
        return Vec::new();
    };

    hourly
        .into_iter()
        .filter(|obs| obs.timestamp.with_timezone(&tz).date_naive() == target)
        .take(hours)
        .collect()
}
