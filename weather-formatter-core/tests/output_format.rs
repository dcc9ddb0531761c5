use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::{Map, json};
use weather_formatter_core::{
    FormatConfig, Formatter, IconMapper, Observation, PrecipSource, apply_preamble,
    provider::openweather::parse_one_call,
};

fn entry(hour: &str, temp: f64) -> Observation {
    Observation {
        timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap(),
        hour_label: hour.to_string(),
        temperature: temp,
        feels_like: temp - 2.0,
        condition_text: "clear sky".to_string(),
        condition_code: 800,
        precipitation: 0.0,
        humidity: 60,
        wind_speed: 5.5,
        wind_direction: 180,
        pressure: 1013,
        uv_index: None,
        visibility: None,
        dew_point: None,
        extra_fields: Map::new(),
    }
}

fn clear_sky_icons() -> IconMapper {
    IconMapper::new([("clear sky", "9"), ("default", "?")])
}

fn config(entry_sep: &str, field_sep: &str, fields: &[&str]) -> FormatConfig {
    FormatConfig {
        entry_separator: entry_sep.to_string(),
        field_separator: field_sep.to_string(),
        output_fields: fields.iter().map(|f| f.to_string()).collect(),
        preamble: String::new(),
    }
}

#[test]
fn empty_forecast_brackets_truncated_temperature() {
    let fmt = Formatter::new(FormatConfig::default(), IconMapper::default());
    assert_eq!(fmt.format_output(74.9, &[]), "#74#");
    assert_eq!(fmt.format_output(-0.5, &[]), "#0#");
    assert_eq!(fmt.format_output(-12.7, &[]), "#-12#");

    let fmt = Formatter::new(config("<>", ";", &["hour"]), IconMapper::default());
    assert_eq!(fmt.format_output(33.0, &[]), "<>33<>");
}

#[test]
fn default_layout_with_two_entries() {
    let fmt = Formatter::new(FormatConfig::default(), clear_sky_icons());
    let forecast = [entry("1pm", 75.0), entry("2pm", 76.0)];
    assert_eq!(fmt.format_output(74.0, &forecast), "#74#1pm,9,75,0.0#2pm,9,76,0.0#");
}

#[test]
fn custom_separators() {
    let fmt = Formatter::new(config("|", ";", &["hour", "temp"]), clear_sky_icons());
    let forecast = [entry("1pm", 75.0), entry("2pm", 76.0)];
    assert_eq!(fmt.format_output(74.0, &forecast), "|74|1pm;75|2pm;76|");
}

#[test]
fn preamble_is_prefix_only() {
    let body = "#74#1pm,9,75,0.0#";
    assert_eq!(apply_preamble(body, ""), body);
    assert_eq!(apply_preamble(body, "WEATHER:"), format!("WEATHER:{body}"));

    let cfg = FormatConfig { preamble: "WEATHER:".to_string(), ..FormatConfig::default() };
    let fmt = Formatter::new(cfg, clear_sky_icons());
    assert_eq!(fmt.format_output(74.0, &[entry("1pm", 75.0)]), "WEATHER:#74#1pm,9,75,0.0#");
}

#[test]
fn optional_fields_fall_back_to_not_available() {
    let fmt = Formatter::new(
        config("#", ",", &["hour", "uv_index", "visibility", "dew_point", "temp"]),
        clear_sky_icons(),
    );
    assert_eq!(fmt.format_output(70.0, &[entry("9am", 68.4)]), "#70#9am,N/A,N/A,N/A,68#");
}

#[test]
fn dotted_custom_fields() {
    let mut obs = entry("1pm", 75.0);
    obs.extra_fields = json!({ "nested": { "field": "nested_value" } })
        .as_object()
        .cloned()
        .unwrap();

    let fmt = Formatter::new(config("#", ",", &["hour", "nested.field"]), clear_sky_icons());
    assert_eq!(fmt.format_output(74.0, &[obs.clone()]), "#74#1pm,nested_value#");

    let fmt = Formatter::new(config("#", ",", &["hour", "nested.missing"]), clear_sky_icons());
    assert_eq!(fmt.format_output(74.0, &[obs]), "#74#1pm#");
}

#[test]
fn repeated_formatting_is_identical() {
    let fmt = Formatter::new(
        config("#", ",", &["hour", "icon", "temp", "feels_like", "precip", "wind_speed"]),
        IconMapper::default(),
    );
    let forecast = [entry("1pm", 75.3), entry("2pm", 76.8), entry("3pm", 77.1)];

    let first = fmt.format_output(74.6, &forecast);
    for _ in 0..10 {
        assert_eq!(fmt.format_output(74.6, &forecast), first);
    }
}

#[test]
fn parsed_api_samples_render_end_to_end() {
    let body = json!({
        "current": { "dt": 1717257600, "temp": 74.93, "weather": [{ "id": 800, "description": "Clear Sky" }] },
        "hourly": [
            {
                "dt": 1717261200, "temp": 75.6, "pop": 0.2, "humidity": 60,
                "rain": { "1h": 1.26 },
                "weather": [{ "id": 501, "description": "moderate rain" }]
            },
            {
                "dt": 1717264800, "temp": 76.1, "pop": 0, "humidity": 58,
                "weather": [{ "id": 211, "description": "thunderstorm" }]
            }
        ]
    })
    .to_string();

    let report = parse_one_call(&body, PrecipSource::Amount, &Utc).unwrap();
    let fmt = Formatter::new(
        config("#", ",", &["hour", "icon", "temp", "precip", "humidity", "pop"]),
        IconMapper::default(),
    );

    assert_eq!(
        fmt.format_output(report.current.temperature, &report.hourly),
        "#74#5pm,7,75,1.3,60,0.2#6pm,5,76,0.0,58,0#"
    );
}
