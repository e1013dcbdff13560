use serde::{Deserialize, Serialize};

/// Weather condition groups, mapped from OpenWeather condition ids.
/// See: https://openweathermap.org/weather-conditions
///
/// This is the only code → phrase/glyph table in the crate; both the
/// advice prompt and the fallback rule read from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Thunderstorm,
    Drizzle,
    Rain,
    FreezingRain,
    ShowerRain,
    Snow,
    Sleet,
    HeavySnow,
    Atmosphere,
    Clear,
    FewClouds,
    ScatteredClouds,
    BrokenClouds,
    Overcast,
    Unknown,
}

impl Condition {
    pub fn from_code(code: i32) -> Self {
        match code {
            200..=232 => Self::Thunderstorm,
            300..=321 => Self::Drizzle,
            500..=504 => Self::Rain,
            511 => Self::FreezingRain,
            520..=531 => Self::ShowerRain,
            600..=602 => Self::Snow,
            611..=616 => Self::Sleet,
            620..=622 => Self::HeavySnow,
            701..=781 => Self::Atmosphere,
            800 => Self::Clear,
            801 => Self::FewClouds,
            802 => Self::ScatteredClouds,
            803 => Self::BrokenClouds,
            804 => Self::Overcast,
            _ => Self::Unknown,
        }
    }

    /// Human-readable Vietnamese phrase, used in prompts and fallback advice.
    pub fn phrase(&self) -> &'static str {
        match self {
            Self::Thunderstorm => "Dông, sấm sét, có thể có mưa lớn",
            Self::Drizzle => "Mưa phùn hoặc mưa nhẹ",
            Self::Rain => "Mưa vừa hoặc mưa lớn",
            Self::FreezingRain => "Mưa tuyết",
            Self::ShowerRain => "Mưa rào hoặc mưa lớn rải rác",
            Self::Snow => "Tuyết rơi nhẹ đến vừa",
            Self::Sleet => "Tuyết ướt hoặc mưa tuyết",
            Self::HeavySnow => "Tuyết rơi dày",
            Self::Atmosphere => "Sương mù hoặc hiện tượng khí quyển đặc biệt",
            Self::Clear => "Trời quang đãng, có nắng",
            Self::FewClouds => "Ít mây, nắng nhẹ, không có mưa, không có tuyết",
            Self::ScatteredClouds => "Trời có mây rải rác, không có mưa, không có tuyết",
            Self::BrokenClouds => "Trời nhiều mây, không có mưa, không có tuyết",
            Self::Overcast => "Trời âm u, mây dày đặc, không có tuyết",
            Self::Unknown => "Trời đẹp",
        }
    }

    /// Display glyph. Unknown conditions have none.
    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Thunderstorm => "⛈️",
            Self::Drizzle => "🌦️",
            Self::Rain | Self::ShowerRain => "🌧️",
            Self::FreezingRain | Self::Snow | Self::Sleet => "🌨️",
            Self::HeavySnow => "❄️",
            Self::Atmosphere => "🌫️",
            Self::Clear => "☀️",
            Self::FewClouds => "🌤️",
            Self::ScatteredClouds => "⛅",
            Self::BrokenClouds => "🌥️",
            Self::Overcast => "☁️",
            Self::Unknown => "",
        }
    }
}
