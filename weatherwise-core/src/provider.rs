use async_trait::async_trait;
use std::fmt::Debug;

use crate::{Config, model::Observation};

pub mod openweather;

pub use openweather::OpenWeatherProvider;

/// Why a weather fetch failed. Each variant gets its own user-facing message.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The server answered, but not with usable weather data.
    #[error("Invalid weather response: {0}")]
    InvalidResponse(String),
    #[error("Weather request failed with status {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Weather request timed out")]
    Timeout,
    #[error("Too many redirects")]
    TooManyRedirects,
    #[error("Weather request error: {0}")]
    Request(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_redirect() {
            FetchError::TooManyRedirects
        } else if err.is_connect() {
            FetchError::Connection(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Http { status: status.as_u16(), body: String::new() }
        } else if err.is_decode() {
            FetchError::InvalidResponse(err.to_string())
        } else {
            FetchError::Request(err.to_string())
        }
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current_weather(&self, city: &str) -> Result<Observation, FetchError>;
}

/// Construct the OpenWeather provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let api_key = config.api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No OpenWeather API key configured.\n\
             Hint: run `weatherwise configure` or set WEATHERWISE_API_KEY."
        )
    })?;

    let provider = OpenWeatherProvider::with_base_url(
        api_key.to_owned(),
        config.openweather.base_url(),
        config.openweather.timeout(),
    )?;

    Ok(Box::new(provider))
}
