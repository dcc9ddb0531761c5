use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use inquire::{CustomType, Password, PasswordDisplayMode, Select, Text, validator::Validation};
use tracing::{debug, info};
use weather_formatter_core::{
    Config, ForecastDay, Formatter, PartialConfig, PrecipSource, Units, ValidationErrors,
    WeatherApiError,
    config::{
        check_forecast_hours, check_location_fields, default_config_path, is_us_zipcode,
        is_valid_latitude, is_valid_longitude, parse_field_list, write_default_template,
    },
    provider::{fetch_forecast, source_from_config},
};

const EXAMPLES: &str = "\
Examples:
  weather-formatter --lat 40.7128 --lon -74.0060 -k YOUR_API_KEY
  weather-formatter -z 10001 -k YOUR_API_KEY
  weather-formatter --config my_config.toml --hours 8 --day tomorrow
  weather-formatter -z 90210 --fields hour,icon,temp,humidity
  weather-formatter --preamble \"WEATHER:\" --entry-sep \"|\"

Settings come from the config file and are overridden by command-line flags.
If the config file does not exist yet, a commented default is written on first run.";

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "weather-formatter",
    version,
    about = "Retrieve weather data and print it as a compact, configurable line",
    after_help = EXAMPLES
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub overrides: OverrideArgs,

    /// Path to the configuration file [default: platform config dir]
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging on stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactively store the API key and location in the config file.
    Configure,

    /// Write the default configuration template.
    Init {
        /// Overwrite an existing config file.
        #[arg(long)]
        force: bool,
    },
}

/// Settings that override the config file when given.
#[derive(Debug, Args)]
pub struct OverrideArgs {
    /// Latitude for the weather lookup
    #[arg(long = "lat", visible_alias = "latitude", allow_negative_numbers = true)]
    pub latitude: Option<f64>,

    /// Longitude for the weather lookup
    #[arg(long = "lon", visible_alias = "longitude", allow_negative_numbers = true)]
    pub longitude: Option<f64>,

    /// US ZIP code (5 digits), converted to coordinates
    #[arg(short, long)]
    pub zipcode: Option<String>,

    /// OpenWeatherMap API key
    #[arg(short = 'k', long)]
    pub api_key: Option<String>,

    /// Number of forecast hours to print [default: 5]
    #[arg(long, allow_negative_numbers = true)]
    pub hours: Option<i64>,

    /// Forecast day: today or tomorrow [default: today]
    #[arg(short, long)]
    pub day: Option<ForecastDay>,

    /// Unit system: imperial, metric or standard [default: imperial]
    #[arg(short, long)]
    pub units: Option<Units>,

    /// What `precip` shows: amount or probability [default: amount]
    #[arg(long = "precip")]
    pub precip_source: Option<PrecipSource>,

    /// Entry separator [default: #]
    #[arg(short, long, allow_hyphen_values = true)]
    pub entry_sep: Option<String>,

    /// Field separator [default: ,]
    #[arg(short, long, allow_hyphen_values = true)]
    pub field_sep: Option<String>,

    /// Comma-separated fields per entry, e.g. hour,icon,temp,precip
    #[arg(long)]
    pub fields: Option<String>,

    /// Prefix for the whole output line
    #[arg(short, long, allow_hyphen_values = true)]
    pub preamble: Option<String>,
}

impl OverrideArgs {
    /// Checks that can run before the config file is read.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        check_location_fields(self.latitude, self.longitude, self.zipcode.as_deref(), &mut errors);
        if let Some(hours) = self.hours {
            check_forecast_hours(hours, &mut errors);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    pub fn to_layer(&self) -> PartialConfig {
        PartialConfig {
            api_key: self.api_key.clone(),
            zipcode: self.zipcode.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            forecast_hours: self.hours,
            forecast_day: self.day,
            units: self.units,
            precip_source: self.precip_source,
            entry_separator: self.entry_sep.clone(),
            field_separator: self.field_sep.clone(),
            preamble: self.preamble.clone(),
            output_fields: self.fields.as_deref().map(parse_field_list),
            icon_mappings: None,
        }
    }
}

/// Failures grouped by the exit code they produce.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Error: {0:#}")]
    Config(anyhow::Error),

    #[error("{errors}\n\nPlease check your configuration file ({path}) or command-line arguments.")]
    Invalid { errors: ValidationErrors, path: String },

    #[error("Weather API error: {0}")]
    Api(#[from] WeatherApiError),

    #[error("Error: {0:#}")]
    Processing(anyhow::Error),

    #[error("Error: {0:#}")]
    FileSystem(anyhow::Error),
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Config(_) | CliError::Invalid { .. } => 1,
            CliError::Api(_) => 2,
            CliError::Processing(_) => 3,
            CliError::FileSystem(_) => 4,
        }
    }
}

impl Cli {
    pub async fn run(self) -> Result<(), CliError> {
        let path = match &self.config {
            Some(path) => path.clone(),
            None => default_config_path().map_err(CliError::Config)?,
        };

        match self.command {
            Some(Command::Configure) => configure(&path).map_err(CliError::Config),
            Some(Command::Init { force }) => init(&path, force),
            None => show(&self.overrides, &path).await,
        }
    }
}

/// Load, merge and validate settings, then fetch and print one formatted line.
async fn show(overrides: &OverrideArgs, path: &Path) -> Result<(), CliError> {
    let invalid =
        |errors: ValidationErrors| CliError::Invalid { errors, path: path.display().to_string() };

    overrides.validate().map_err(invalid)?;

    let Some(file) = PartialConfig::load(path).map_err(CliError::Config)? else {
        info!(path = %path.display(), "no configuration file found");
        write_default_template(path).map_err(CliError::FileSystem)?;
        eprintln!("Created default configuration file: {}", path.display());
        eprintln!("Please edit the file to add your API key and zipcode, then run again.");
        return Ok(());
    };

    let config = Config::layered(Some(&file), &overrides.to_layer());
    config.validate().map_err(invalid)?;
    debug!(location = ?config.location(), "configuration validated");

    let request = config
        .forecast_request()
        .context("No location specified (latitude/longitude or zipcode required)")
        .map_err(CliError::Config)?;

    let source = source_from_config(&config).map_err(CliError::Processing)?;
    let report = fetch_forecast(source.as_ref(), &request, &Local::now()).await?;
    debug!(current = report.current.temperature, entries = report.hourly.len(), "fetched weather");

    let formatter = Formatter::new(config.format_config(), config.icon_mapper());
    let output = formatter.format_output(report.current.temperature, &report.hourly);
    debug!(%output, "formatted output");

    println!("{output}");
    Ok(())
}

fn init(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::FileSystem(anyhow::anyhow!(
            "Configuration file already exists: {}\nHint: pass --force to overwrite it.",
            path.display()
        )));
    }

    write_default_template(path).map_err(CliError::FileSystem)?;
    eprintln!("Created default configuration file: {}", path.display());
    Ok(())
}

/// Prompt for credentials and location, keeping every other setting in the file.
fn configure(path: &Path) -> anyhow::Result<()> {
    let mut layer = PartialConfig::load(path)?.unwrap_or_default();

    let api_key = Password::new("OpenWeatherMap API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .with_validator(|key: &str| {
            Ok(if key.trim().is_empty() {
                Validation::Invalid("API key cannot be empty".into())
            } else {
                Validation::Valid
            })
        })
        .prompt()
        .context("Failed to read API key")?;
    layer.api_key = Some(api_key.trim().to_string());

    let kind = Select::new("Locate weather by:", vec!["ZIP code", "Coordinates"])
        .prompt()
        .context("Failed to read location type")?;

    if kind == "ZIP code" {
        let zip = Text::new("US ZIP code:")
            .with_initial_value(layer.zipcode.as_deref().unwrap_or_default())
            .with_validator(|zip: &str| {
                Ok(if is_us_zipcode(zip) {
                    Validation::Valid
                } else {
                    Validation::Invalid("ZIP code must be 5 digits".into())
                })
            })
            .prompt()
            .context("Failed to read ZIP code")?;
        layer.zipcode = Some(zip);
        layer.latitude = None;
        layer.longitude = None;
    } else {
        let latitude = CustomType::<f64>::new("Latitude:")
            .with_error_message("Please enter a decimal number")
            .prompt()
            .context("Failed to read latitude")?;
        let longitude = CustomType::<f64>::new("Longitude:")
            .with_error_message("Please enter a decimal number")
            .prompt()
            .context("Failed to read longitude")?;
        if !is_valid_latitude(latitude) || !is_valid_longitude(longitude) {
            bail!("Coordinates out of range: latitude -90..90, longitude -180..180");
        }
        layer.latitude = Some(latitude);
        layer.longitude = Some(longitude);
        layer.zipcode = None;
    }

    layer.save(path)?;
    println!("Saved configuration to {}", path.display());
    Ok(())
}
