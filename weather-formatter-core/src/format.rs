//! Rendering of observations into a delimiter-based output line.
//!
//! Layout: `[preamble] SEP current SEP entry SEP entry SEP ...`, where each entry is the
//! configured fields joined by the field separator. Unresolvable custom fields are dropped
//! from their entry rather than rendered empty.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{icons::IconMapper, model::Observation};

/// Rendered in place of an unset optional measurement.
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatConfig {
    /// Placed around the current temperature and after every entry.
    pub entry_separator: String,
    /// Joins field values within one entry.
    pub field_separator: String,
    /// Field names in output order; duplicates repeat the field.
    pub output_fields: Vec<String>,
    /// Literal prefix for the whole line.
    pub preamble: String,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            entry_separator: "#".to_string(),
            field_separator: ",".to_string(),
            output_fields: default_output_fields(),
            preamble: String::new(),
        }
    }
}

pub fn default_output_fields() -> Vec<String> {
    ["hour", "icon", "temp", "precip"].map(String::from).to_vec()
}

/// A field an entry can carry. Names outside the fixed set are dotted paths into
/// [`Observation::extra_fields`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    Hour,
    Icon,
    Temp,
    FeelsLike,
    Precip,
    Humidity,
    WindSpeed,
    WindDirection,
    Pressure,
    UvIndex,
    Visibility,
    DewPoint,
    Custom(String),
}

impl Field {
    pub fn parse(name: &str) -> Self {
        match name {
            "hour" => Field::Hour,
            "icon" => Field::Icon,
            "temp" => Field::Temp,
            "feels_like" => Field::FeelsLike,
            "precip" => Field::Precip,
            "humidity" => Field::Humidity,
            "wind_speed" => Field::WindSpeed,
            "wind_direction" => Field::WindDirection,
            "pressure" => Field::Pressure,
            "uv_index" => Field::UvIndex,
            "visibility" => Field::Visibility,
            "dew_point" => Field::DewPoint,
            other => Field::Custom(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Formatter {
    config: FormatConfig,
    fields: Vec<Field>,
    icons: IconMapper,
}

impl Formatter {
    pub fn new(config: FormatConfig, icons: IconMapper) -> Self {
        let fields = config.output_fields.iter().map(|name| Field::parse(name)).collect();
        Self { config, fields, icons }
    }

    /// Render the current temperature followed by one entry per forecast sample.
    ///
    /// An empty forecast yields just the temperature between two entry separators.
    pub fn format_output(&self, current_temperature: f64, forecast: &[Observation]) -> String {
        let sep = self.config.entry_separator.as_str();

        let mut output = String::new();
        output.push_str(sep);
        output.push_str(&truncate(current_temperature));
        output.push_str(sep);

        for observation in forecast {
            output.push_str(&self.format_entry(observation));
            output.push_str(sep);
        }

        apply_preamble(&output, &self.config.preamble)
    }

    /// Join the configured fields of one sample, skipping fields that do not resolve.
    pub fn format_entry(&self, observation: &Observation) -> String {
        let values: Vec<Cow<'_, str>> = self
            .fields
            .iter()
            .filter_map(|field| self.field_value(observation, field))
            .collect();

        values.join(self.config.field_separator.as_str())
    }

    /// Text for one field, or `None` when a custom path does not resolve.
    pub fn field_value<'a>(
        &'a self,
        observation: &'a Observation,
        field: &Field,
    ) -> Option<Cow<'a, str>> {
        let value = match field {
            Field::Hour => Cow::Borrowed(observation.hour_label.as_str()),
            Field::Icon => Cow::Borrowed(self.icons.map_condition(&observation.condition_text)),
            Field::Temp => Cow::Owned(truncate(observation.temperature)),
            Field::FeelsLike => Cow::Owned(truncate(observation.feels_like)),
            Field::Precip => Cow::Owned(one_decimal(observation.precipitation)),
            Field::Humidity => Cow::Owned(observation.humidity.to_string()),
            Field::WindSpeed => Cow::Owned(one_decimal(observation.wind_speed)),
            Field::WindDirection => Cow::Owned(observation.wind_direction.to_string()),
            Field::Pressure => Cow::Owned(observation.pressure.to_string()),
            Field::UvIndex => or_not_available(observation.uv_index.map(one_decimal)),
            Field::Visibility => or_not_available(observation.visibility.map(|v| v.to_string())),
            Field::DewPoint => or_not_available(observation.dew_point.map(truncate)),
            Field::Custom(path) => Cow::Owned(lookup_path(&observation.extra_fields, path)?),
        };
        Some(value)
    }
}

/// Prefix `output` with `preamble`; an empty preamble leaves it unchanged.
pub fn apply_preamble(output: &str, preamble: &str) -> String {
    if preamble.is_empty() {
        output.to_string()
    } else {
        format!("{preamble}{output}")
    }
}

/// Walk a dot-separated path through nested objects and render the value found there.
///
/// Strings render without quotes, everything else as compact JSON. Any missing key, or a
/// step into something that is not an object, yields `None`.
pub fn lookup_path(fields: &Map<String, Value>, path: &str) -> Option<String> {
    let mut keys = path.split('.');
    let mut value = fields.get(keys.next()?)?;
    for key in keys {
        value = value.as_object()?.get(key)?;
    }

    Some(match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

/// Truncate toward zero; `-0.5` renders as `"0"`.
fn truncate(value: f64) -> String {
    (value.trunc() as i64).to_string()
}

fn one_decimal(value: f64) -> String {
    format!("{value:.1}")
}

fn or_not_available(value: Option<String>) -> Cow<'static, str> {
    value.map_or(Cow::Borrowed(NOT_AVAILABLE), Cow::Owned)
}
