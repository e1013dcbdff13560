use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::condition::Condition;

/// Current conditions for one city, already converted to metric units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub location_name: String,
    pub temperature_c: f64,
    pub condition_code: i32,
    /// Provider's own free-text description, e.g. "scattered clouds".
    pub description: String,
    pub humidity_pct: u8,
    pub wind_kmh: f64,
    pub observed_at: DateTime<Utc>,
}

impl Observation {
    pub fn condition(&self) -> Condition {
        Condition::from_code(self.condition_code)
    }

    pub fn advice_request(&self) -> AdviceRequest {
        AdviceRequest {
            temperature_c: self.temperature_c,
            wind_kmh: self.wind_kmh,
            humidity_pct: self.humidity_pct,
            condition_code: self.condition_code,
        }
    }
}

/// Inputs for one clothing-advice request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdviceRequest {
    pub temperature_c: f64,
    pub wind_kmh: f64,
    pub humidity_pct: u8,
    pub condition_code: i32,
}

impl AdviceRequest {
    pub fn condition(&self) -> Condition {
        Condition::from_code(self.condition_code)
    }
}

/// A finished lookup, ready to render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherReport {
    pub observation: Observation,
    pub advice: String,
}

impl WeatherReport {
    pub fn glyph(&self) -> &'static str {
        self.observation.condition().glyph()
    }

    /// Provider description with every word capitalised.
    pub fn title(&self) -> String {
        capwords(&self.observation.description)
    }

    pub fn temperature(&self, unit: TemperatureUnit) -> String {
        unit.format(self.observation.temperature_c)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn convert(&self, celsius: f64) -> f64 {
        match self {
            Self::Celsius => celsius,
            Self::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
        }
    }

    /// Whole degrees with unit symbol, e.g. `21°C`.
    pub fn format(&self, celsius: f64) -> String {
        format!("{:.0}{}", self.convert(celsius), self.symbol())
    }

    pub fn toggled(&self) -> Self {
        match self {
            Self::Celsius => Self::Fahrenheit,
            Self::Fahrenheit => Self::Celsius,
        }
    }
}

pub(crate) fn kelvin_to_celsius(kelvin: f64) -> f64 {
    kelvin - 273.15
}

pub(crate) fn mps_to_kmh(mps: f64) -> f64 {
    mps * 3.6
}

fn capwords(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
