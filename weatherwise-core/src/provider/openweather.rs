use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::model::{Observation, kelvin_to_celsius, mps_to_kmh};

use super::{FetchError, WeatherProvider};

pub const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn with_base_url(
        api_key: String,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    /// Kelvin; no `units` parameter is sent.
    temp: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    id: i32,
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    /// Metres per second.
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    /// Integer on success, sometimes a string on errors.
    cod: serde_json::Value,
    name: String,
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
}

impl OwCurrentResponse {
    fn is_ok(&self) -> bool {
        self.cod.as_i64() == Some(200) || self.cod.as_str() == Some("200")
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current_weather(&self, city: &str) -> Result<Observation, FetchError> {
        let url = format!("{}/data/2.5/weather", self.base_url);
        debug!(%city, "requesting current weather from OpenWeather");

        let res = self
            .http
            .get(&url)
            .query(&[("q", city), ("appid", self.api_key.as_str())])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let parsed: OwCurrentResponse = serde_json::from_str(&body)
            .map_err(|e| FetchError::InvalidResponse(format!("unexpected JSON: {e}")))?;

        if !parsed.is_ok() {
            return Err(FetchError::InvalidResponse(format!("response code {}", parsed.cod)));
        }

        let weather = parsed
            .weather
            .first()
            .ok_or_else(|| FetchError::InvalidResponse("no weather entry".to_string()))?;

        Ok(Observation {
            location_name: parsed.name,
            temperature_c: kelvin_to_celsius(parsed.main.temp),
            condition_code: weather.id,
            description: weather.description.clone(),
            humidity_pct: parsed.main.humidity,
            wind_kmh: mps_to_kmh(parsed.wind.speed),
            observed_at: DateTime::<Utc>::from_timestamp(parsed.dt, 0).unwrap_or_else(Utc::now),
        })
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
