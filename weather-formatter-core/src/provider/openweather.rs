use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::{fmt, time::Duration};
use tracing::debug;

use crate::{
    WeatherApiError,
    model::{Observation, PrecipSource, Units, WeatherReport, hour_label},
};

use super::WeatherSource;

const ONE_CALL_URL: &str = "https://api.openweathermap.org/data/3.0/onecall";
const GEO_ZIP_URL: &str = "https://api.openweathermap.org/geo/1.0/zip";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// OpenWeatherMap One Call API 3.0 client.
///
/// One request returns both the current conditions and the hourly forecast.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    http: Client,
    one_call_url: String,
    geo_url: String,
}

impl OpenWeatherClient {
    pub fn new(api_key: String) -> Result<Self, WeatherApiError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(WeatherApiError::Network)?;

        Ok(Self {
            api_key,
            http,
            one_call_url: ONE_CALL_URL.to_string(),
            geo_url: GEO_ZIP_URL.to_string(),
        })
    }

    /// Point the client at other endpoints, e.g. a local test server.
    pub fn with_base_urls(mut self, one_call_url: &str, geo_url: &str) -> Self {
        self.one_call_url = one_call_url.to_string();
        self.geo_url = geo_url.to_string();
        self
    }

    async fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String, WeatherApiError> {
        let res = self.http.get(url).query(query).send().await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            debug!(%status, url, "weather API request failed");
            return Err(WeatherApiError::from_status(status.as_u16(), &body));
        }

        Ok(body)
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    async fn geocode_zip(&self, zipcode: &str) -> Result<(f64, f64), WeatherApiError> {
        let body = self
            .get_text(
                &self.geo_url,
                &[("zip", format!("{zipcode},US")), ("appid", self.api_key.clone())],
            )
            .await?;

        parse_geocode(&body, zipcode)
    }

    async fn fetch_report(
        &self,
        latitude: f64,
        longitude: f64,
        units: Units,
        precip_source: PrecipSource,
    ) -> Result<WeatherReport, WeatherApiError> {
        let body = self
            .get_text(
                &self.one_call_url,
                &[
                    ("lat", latitude.to_string()),
                    ("lon", longitude.to_string()),
                    ("appid", self.api_key.clone()),
                    ("units", units.as_str().to_string()),
                    ("exclude", "minutely,daily,alerts".to_string()),
                ],
            )
            .await?;

        parse_one_call(&body, precip_source, &Local)
    }
}

#[derive(Debug, Deserialize)]
struct OwGeocode {
    lat: Option<f64>,
    lon: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwOneCall {
    #[serde(default)]
    current: Map<String, Value>,
    #[serde(default)]
    hourly: Vec<Map<String, Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwSample {
    dt: i64,
    temp: f64,
    feels_like: f64,
    humidity: i64,
    pressure: i64,
    wind_speed: f64,
    wind_deg: i64,
    uvi: Option<f64>,
    visibility: Option<i64>,
    dew_point: Option<f64>,
    pop: Option<f64>,
    weather: Vec<OwCondition>,
    rain: Option<OwVolume>,
    snow: Option<OwVolume>,
}

#[derive(Debug, Deserialize)]
struct OwCondition {
    #[serde(default)]
    id: i64,
    #[serde(default = "unknown_condition")]
    description: String,
}

#[derive(Debug, Default, Deserialize)]
struct OwVolume {
    #[serde(rename = "1h", default)]
    one_hour: f64,
}

fn unknown_condition() -> String {
    "unknown".to_string()
}

/// Extract coordinates from a geocoding response.
pub fn parse_geocode(body: &str, zipcode: &str) -> Result<(f64, f64), WeatherApiError> {
    let parsed: OwGeocode = serde_json::from_str(body)?;
    match (parsed.lat, parsed.lon) {
        (Some(lat), Some(lon)) => Ok((lat, lon)),
        _ => Err(WeatherApiError::Geocode(zipcode.to_string())),
    }
}

/// Turn a One Call response into a report, labelling hours in `tz`.
///
/// Missing measurements default to zero and a missing description to "unknown"; each
/// sample keeps its raw JSON object as `extra_fields`.
pub fn parse_one_call<Tz>(
    body: &str,
    precip_source: PrecipSource,
    tz: &Tz,
) -> Result<WeatherReport, WeatherApiError>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let parsed: OwOneCall = serde_json::from_str(body)?;

    let current = observation(parsed.current, precip_source, tz)?;
    let hourly = parsed
        .hourly
        .into_iter()
        .map(|raw| observation(raw, precip_source, tz))
        .collect::<Result<Vec<_>, _>>()?;

    debug!(hourly = hourly.len(), "parsed One Call response");
    Ok(WeatherReport { current, hourly })
}

fn observation<Tz>(
    raw: Map<String, Value>,
    precip_source: PrecipSource,
    tz: &Tz,
) -> Result<Observation, WeatherApiError>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let sample: OwSample = serde_json::from_value(Value::Object(raw.clone()))?;

    let timestamp = DateTime::<Utc>::from_timestamp(sample.dt, 0).unwrap_or_default();
    let (condition_code, condition_text) = sample
        .weather
        .into_iter()
        .next()
        .map(|w| (w.id, w.description))
        .unwrap_or_else(|| (0, unknown_condition()));

    let precipitation = match precip_source {
        PrecipSource::Amount => {
            let volume = |v: Option<OwVolume>| v.map_or(0.0, |v| v.one_hour);
            volume(sample.rain) + volume(sample.snow)
        }
        PrecipSource::Probability => sample.pop.unwrap_or(0.0) * 100.0,
    };

    Ok(Observation {
        timestamp,
        hour_label: hour_label(&timestamp.with_timezone(tz)),
        temperature: sample.temp,
        feels_like: sample.feels_like,
        condition_text,
        condition_code,
        precipitation,
        humidity: sample.humidity,
        wind_speed: sample.wind_speed,
        wind_direction: sample.wind_deg,
        pressure: sample.pressure,
        uv_index: sample.uvi,
        visibility: sample.visibility,
        dew_point: sample.dew_point,
        extra_fields: raw,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        task::JoinHandle,
    };

    const ONE_CALL: &str = r#"{
        "lat": 40.7128,
        "lon": -74.006,
        "timezone": "America/New_York",
        "timezone_offset": -14400,
        "current": {
            "dt": 1717257600,
            "temp": 74.93,
            "feels_like": 75.2,
            "pressure": 1012,
            "humidity": 61,
            "dew_point": 60.1,
            "uvi": 6.12,
            "visibility": 10000,
            "wind_speed": 8.05,
            "wind_deg": 200,
            "weather": [{ "id": 800, "main": "Clear", "description": "clear sky", "icon": "01d" }]
        },
        "hourly": [
            {
                "dt": 1717261200,
                "temp": 75.6,
                "feels_like": 75.9,
                "pressure": 1012,
                "humidity": 60,
                "wind_speed": 9.1,
                "wind_deg": 210,
                "pop": 0.35,
                "rain": { "1h": 0.42 },
                "weather": [{ "id": 500, "main": "Rain", "description": "light rain", "icon": "10d" }]
            },
            {
                "dt": 1717264800,
                "temp": 76.1,
                "feels_like": 76.4,
                "pressure": 1011,
                "humidity": 58,
                "wind_speed": 10.2,
                "wind_deg": 215,
                "pop": 0,
                "rain": { "1h": 0.25 },
                "snow": { "1h": 0.1 },
                "weather": []
            }
        ]
    }"#;

    fn eastern() -> FixedOffset {
        FixedOffset::west_opt(4 * 3600).unwrap()
    }

    #[test]
    fn parses_current_and_hourly() {
        let report = parse_one_call(ONE_CALL, PrecipSource::Amount, &eastern()).unwrap();

        let current = &report.current;
        // 1717257600 is 2024-06-01 16:00 UTC, noon at UTC-4.
        assert_eq!(current.hour_label, "12pm");
        assert_eq!(current.temperature, 74.93);
        assert_eq!(current.condition_text, "clear sky");
        assert_eq!(current.condition_code, 800);
        assert_eq!(current.precipitation, 0.0);
        assert_eq!(current.uv_index, Some(6.12));
        assert_eq!(current.visibility, Some(10000));
        assert_eq!(current.dew_point, Some(60.1));
        assert_eq!(current.extra_fields.get("timezone"), None);

        assert_eq!(report.hourly.len(), 2);
        let first = &report.hourly[0];
        assert_eq!(first.hour_label, "1pm");
        assert_eq!(first.condition_text, "light rain");
        assert_eq!(first.precipitation, 0.42);
        assert_eq!(first.wind_direction, 210);
        assert_eq!(first.uv_index, None);
        assert_eq!(first.extra_fields.get("pop"), Some(&serde_json::json!(0.35)));
    }

    #[test]
    fn amount_sums_rain_and_snow() {
        let report = parse_one_call(ONE_CALL, PrecipSource::Amount, &eastern()).unwrap();
        assert!((report.hourly[1].precipitation - 0.35).abs() < 1e-9);
    }

    #[test]
    fn probability_scales_pop_to_percent() {
        let report = parse_one_call(ONE_CALL, PrecipSource::Probability, &eastern()).unwrap();
        assert!((report.hourly[0].precipitation - 35.0).abs() < 1e-9);
        assert_eq!(report.hourly[1].precipitation, 0.0);
        // Current conditions carry no probability.
        assert_eq!(report.current.precipitation, 0.0);
    }

    #[test]
    fn missing_weather_entry_is_unknown() {
        let report = parse_one_call(ONE_CALL, PrecipSource::Amount, &eastern()).unwrap();
        assert_eq!(report.hourly[1].condition_text, "unknown");
        assert_eq!(report.hourly[1].condition_code, 0);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let report = parse_one_call("{}", PrecipSource::Amount, &Utc).unwrap();
        assert!(report.hourly.is_empty());
        assert_eq!(report.current.temperature, 0.0);
        assert_eq!(report.current.hour_label, "12am");
    }

    #[test]
    fn invalid_json_is_reported() {
        let err = parse_one_call("<html>", PrecipSource::Amount, &Utc).unwrap_err();
        assert!(matches!(err, WeatherApiError::InvalidJson(_)));
        assert!(err.to_string().starts_with("Invalid JSON response from API"));
    }

    #[test]
    fn geocode_extracts_coordinates() {
        let body = r#"{"zip":"10001","name":"New York","lat":40.7484,"lon":-73.9967,"country":"US"}"#;
        assert_eq!(parse_geocode(body, "10001").unwrap(), (40.7484, -73.9967));
    }

    #[test]
    fn geocode_without_coordinates_fails() {
        let err = parse_geocode(r#"{"zip":"99999"}"#, "99999").unwrap_err();
        assert!(err.to_string().contains("Could not geocode ZIP code 99999"));
    }

    /// Answer one request on a local port with a canned response; yields the request line.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = stream.read(&mut buf).await.unwrap();
            let request_line =
                String::from_utf8_lossy(&buf[..n]).lines().next().unwrap_or_default().to_string();

            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            request_line
        });

        (base, handle)
    }

    fn local_client(base: &str) -> OpenWeatherClient {
        let mut client = OpenWeatherClient::new("KEY".into()).unwrap();
        client.http = Client::builder().no_proxy().build().unwrap();
        client.with_base_urls(&format!("{base}/onecall"), &format!("{base}/zip"))
    }

    #[tokio::test]
    async fn geocode_requests_us_zip_from_configured_url() {
        let body = r#"{"zip":"10001","lat":40.7484,"lon":-73.9967,"country":"US"}"#;
        let (base, server) = serve_once("200 OK", body).await;

        let coords = local_client(&base).geocode_zip("10001").await.unwrap();
        assert_eq!(coords, (40.7484, -73.9967));

        let request_line = server.await.unwrap();
        assert!(request_line.starts_with("GET /zip?zip=10001%2CUS&appid=KEY "), "{request_line}");
    }

    #[tokio::test]
    async fn fetch_report_parses_one_call_response() {
        let (base, server) = serve_once("200 OK", ONE_CALL).await;

        let report = local_client(&base)
            .fetch_report(40.7128, -74.006, Units::Metric, PrecipSource::Amount)
            .await
            .unwrap();
        assert_eq!(report.current.temperature, 74.93);
        assert_eq!(report.hourly.len(), 2);

        let request_line = server.await.unwrap();
        assert!(request_line.starts_with("GET /onecall?lat=40.7128&lon=-74.006"), "{request_line}");
        assert!(request_line.contains("units=metric"), "{request_line}");
        assert!(request_line.contains("exclude=minutely%2Cdaily%2Calerts"), "{request_line}");
    }

    #[tokio::test]
    async fn unauthorized_response_maps_to_invalid_api_key() {
        let (base, server) = serve_once("401 Unauthorized", r#"{"cod":401}"#).await;

        let err = local_client(&base)
            .fetch_report(1.0, 2.0, Units::Imperial, PrecipSource::Amount)
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherApiError::InvalidApiKey));
        server.await.unwrap();
    }
}
