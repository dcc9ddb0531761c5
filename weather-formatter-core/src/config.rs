use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::{
    error::ValidationErrors,
    format::FormatConfig,
    icons::IconMapper,
    model::{ForecastDay, ForecastRequest, Location, PrecipSource, Units},
};

/// A layer of configuration where every setting is optional.
///
/// Both the config file and explicit command-line flags are read into this shape; a
/// `None` never overrides a lower layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zipcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast_hours: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast_day: Option<ForecastDay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<Units>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precip_source: Option<PrecipSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_separator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_separator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preamble: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_fields: Option<Vec<String>>,

    /// Example TOML:
    /// [icon_mappings]
    /// "clear sky" = "9"
    /// default = "?"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_mappings: Option<BTreeMap<String, String>>,
}

impl PartialConfig {
    /// Load a config file, or `None` if it doesn't exist yet.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: PartialConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        debug!(path = %path.display(), "loaded configuration file");
        Ok(Some(cfg))
    }

    /// Save to disk, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        create_parent_dir(path)?;

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_key: Option<String>,
    pub zipcode: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub forecast_hours: i64,
    pub forecast_day: ForecastDay,
    pub units: Units,
    pub precip_source: PrecipSource,
    pub entry_separator: String,
    pub field_separator: String,
    pub preamble: String,
    pub output_fields: Vec<String>,
    /// Empty means the built-in table.
    pub icon_mappings: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        let format = FormatConfig::default();
        Self {
            api_key: None,
            zipcode: None,
            latitude: None,
            longitude: None,
            forecast_hours: 5,
            forecast_day: ForecastDay::default(),
            units: Units::default(),
            precip_source: PrecipSource::default(),
            entry_separator: format.entry_separator,
            field_separator: format.field_separator,
            preamble: format.preamble,
            output_fields: format.output_fields,
            icon_mappings: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Resolve settings with precedence: built-in default < file < explicit override.
    pub fn layered(file: Option<&PartialConfig>, overrides: &PartialConfig) -> Self {
        let base = Self::default();
        let base = match file {
            Some(file) => base.overlay(file),
            None => base,
        };
        base.overlay(overrides)
    }

    /// A copy of `self` with every setting present in `layer` replaced.
    pub fn overlay(self, layer: &PartialConfig) -> Self {
        Self {
            api_key: layer.api_key.clone().or(self.api_key),
            zipcode: layer.zipcode.clone().or(self.zipcode),
            latitude: layer.latitude.or(self.latitude),
            longitude: layer.longitude.or(self.longitude),
            forecast_hours: layer.forecast_hours.unwrap_or(self.forecast_hours),
            forecast_day: layer.forecast_day.unwrap_or(self.forecast_day),
            units: layer.units.unwrap_or(self.units),
            precip_source: layer.precip_source.unwrap_or(self.precip_source),
            entry_separator: layer.entry_separator.clone().unwrap_or(self.entry_separator),
            field_separator: layer.field_separator.clone().unwrap_or(self.field_separator),
            preamble: layer.preamble.clone().unwrap_or(self.preamble),
            output_fields: layer.output_fields.clone().unwrap_or(self.output_fields),
            icon_mappings: layer.icon_mappings.clone().unwrap_or(self.icon_mappings),
        }
    }

    /// Check the resolved settings, reporting every problem at once.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        if self.location().is_none() {
            errors.push("either latitude/longitude or zipcode is required");
        }

        check_location_fields(self.latitude, self.longitude, self.zipcode.as_deref(), &mut errors);

        if self.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
            errors.push("api_key is required");
        }

        check_forecast_hours(self.forecast_hours, &mut errors);

        if self.output_fields.is_empty() {
            errors.push("output_fields must contain at least one field");
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Coordinates win over a ZIP code when both are configured.
    pub fn location(&self) -> Option<Location> {
        match (self.latitude, self.longitude, &self.zipcode) {
            (Some(latitude), Some(longitude), _) => {
                Some(Location::Coordinates { latitude, longitude })
            }
            (_, _, Some(zip)) => Some(Location::Zip(zip.clone())),
            _ => None,
        }
    }

    /// The fetch parameters, or `None` when no location is configured.
    pub fn forecast_request(&self) -> Option<ForecastRequest> {
        Some(ForecastRequest {
            location: self.location()?,
            hours: usize::try_from(self.forecast_hours).unwrap_or(0),
            day: self.forecast_day,
            units: self.units,
            precip_source: self.precip_source,
        })
    }

    pub fn format_config(&self) -> FormatConfig {
        FormatConfig {
            entry_separator: self.entry_separator.clone(),
            field_separator: self.field_separator.clone(),
            output_fields: self.output_fields.clone(),
            preamble: self.preamble.clone(),
        }
    }

    pub fn icon_mapper(&self) -> IconMapper {
        if self.icon_mappings.is_empty() {
            IconMapper::default()
        } else {
            IconMapper::new(&self.icon_mappings)
        }
    }
}

/// Path to the config file in the platform config directory.
pub fn default_config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("dev", "weather-formatter", "weather-formatter")
        .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

    Ok(dirs.config_dir().join("config.toml"))
}

/// Write the commented starter config to `path`.
pub fn write_default_template(path: &Path) -> Result<()> {
    create_parent_dir(path)?;

    fs::write(path, default_template())
        .with_context(|| format!("Cannot create configuration file at {}", path.display()))?;

    debug!(path = %path.display(), "wrote default configuration template");
    Ok(())
}

/// Split a comma-separated field list, trimming names and dropping empty ones.
pub fn parse_field_list(fields: &str) -> Vec<String> {
    fields
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(String::from)
        .collect()
}

pub fn is_us_zipcode(zip: &str) -> bool {
    zip.len() == 5 && zip.bytes().all(|b| b.is_ascii_digit())
}

pub fn is_valid_latitude(latitude: f64) -> bool {
    (-90.0..=90.0).contains(&latitude)
}

pub fn is_valid_longitude(longitude: f64) -> bool {
    (-180.0..=180.0).contains(&longitude)
}

/// Range and format checks for whichever location settings are present.
pub fn check_location_fields(
    latitude: Option<f64>,
    longitude: Option<f64>,
    zipcode: Option<&str>,
    errors: &mut ValidationErrors,
) {
    if latitude.is_some_and(|lat| !is_valid_latitude(lat)) {
        errors.push("latitude must be a number between -90 and 90");
    }
    if longitude.is_some_and(|lon| !is_valid_longitude(lon)) {
        errors.push("longitude must be a number between -180 and 180");
    }
    if zipcode.is_some_and(|zip| !is_us_zipcode(zip)) {
        errors.push("zipcode must be a 5-digit US ZIP code");
    }
}

pub fn check_forecast_hours(hours: i64, errors: &mut ValidationErrors) {
    if hours <= 0 {
        errors.push("forecast_hours must be a positive integer");
    }
}

fn create_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })
        }
        _ => Ok(()),
    }
}

fn default_template() -> String {
    let mut out = String::from(TEMPLATE_HEADER);
    out.push_str("\n[icon_mappings]\n");
    for (condition, icon) in IconMapper::default_mappings() {
        out.push_str(&format!("{condition:?} = {icon:?}\n"));
    }
    out
}

const TEMPLATE_HEADER: &str = r##"# Weather Formatter configuration
#
# Settings given on the command line override the values in this file.

# OpenWeatherMap API key (One Call API 3.0 subscription).
# Sign up at: https://home.openweathermap.org/subscriptions
api_key = "YOUR_API_KEY_HERE"

# Location: EITHER a 5-digit US ZIP code OR latitude/longitude.
zipcode = "10001"
# latitude = 40.7128    # -90 to 90
# longitude = -74.0060  # -180 to 180

# Number of hourly entries to print.
forecast_hours = 5

# "today" or "tomorrow".
forecast_day = "today"

# "imperial", "metric" or "standard".
units = "imperial"

# What `precip` shows: "amount" (rain + snow over the hour) or "probability" (0-100).
precip_source = "amount"

# Placed around the current temperature and after every forecast entry.
entry_separator = "#"

# Joins the fields within one entry.
field_separator = ","

# Prefix for the whole output line.
preamble = ""

# Fields per entry, in order. Built in: hour, icon, temp, feels_like, precip,
# humidity, wind_speed, wind_direction, pressure, uv_index, visibility, dew_point.
# Any other name is looked up in the raw API sample, with dots for nesting
# (e.g. "pop" or "rain.1h").
output_fields = ["hour", "icon", "temp", "precip"]

# Condition description -> icon code. Matching ignores case and surrounding
# whitespace; "default" is used for anything unmapped.
"##;
