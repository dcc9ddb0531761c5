use std::fmt;

/// Failures talking to the weather API, with messages meant for the end user.
#[derive(Debug, thiserror::Error)]
pub enum WeatherApiError {
    #[error("Invalid API key. Please check your OpenWeatherMap API key in the configuration.")]
    InvalidApiKey,

    #[error("Location not found. Please check your coordinates or ZIP code.")]
    LocationNotFound,

    #[error("API rate limit exceeded. Please wait a moment and try again.")]
    RateLimited,

    #[error("API error: {status} - {body}")]
    Status { status: u16, body: String },

    #[error("Could not geocode ZIP code {0}. Please verify it's a valid US ZIP code.")]
    Geocode(String),

    #[error("Invalid JSON response from API: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Request timed out. Please check your internet connection and try again.")]
    Timeout,

    #[error("Connection failed. Please check your internet connection and try again.")]
    Connection,

    #[error("Network error occurred: {0}")]
    Network(#[source] reqwest::Error),
}

impl WeatherApiError {
    /// Map an HTTP error status to the matching variant.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 => WeatherApiError::InvalidApiKey,
            404 => WeatherApiError::LocationNotFound,
            429 => WeatherApiError::RateLimited,
            _ => WeatherApiError::Status { status, body: truncate_body(body) },
        }
    }
}

impl From<reqwest::Error> for WeatherApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            WeatherApiError::Timeout
        } else if err.is_connect() {
            WeatherApiError::Connection
        } else {
            WeatherApiError::Network(err)
        }
    }
}

/// Every problem found while validating a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationErrors(Vec<String>);

impl ValidationErrors {
    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.0.iter().any(|m| m.contains(needle))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Configuration errors:")?;
        for message in &self.0 {
            write!(f, "\n  - {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
