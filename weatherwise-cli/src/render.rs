use chrono::Local;
use weatherwise_core::{LoadStatus, TemperatureUnit, WeatherReport};

/// Multi-line, human-readable report.
pub fn report(report: &WeatherReport, unit: TemperatureUnit) -> String {
    let obs = &report.observation;
    let glyph = report.glyph();

    let mut out = String::new();
    out.push_str(&obs.location_name);
    out.push_str("  ");
    out.push_str(&report.temperature(unit));
    if !glyph.is_empty() {
        out.push(' ');
        out.push_str(glyph);
    }
    out.push('\n');
    out.push_str(&report.title());
    out.push('\n');
    out.push_str(&format!(
        "Độ ẩm {}% · Gió {:.1} km/h · cập nhật {}\n",
        obs.humidity_pct,
        obs.wind_kmh,
        obs.observed_at.with_timezone(&Local).format("%H:%M"),
    ));
    out.push_str(&format!("\n{}\n", report.advice));
    out
}

pub fn model_status(status: LoadStatus) -> &'static str {
    match status {
        LoadStatus::Unloaded => "AI advice: not started",
        LoadStatus::Loading => "AI advice: loading model, using quick tips meanwhile",
        LoadStatus::Ready => "AI advice: ready",
        LoadStatus::Failed => "AI advice: unavailable, using quick tips",
    }
}
