use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand};
use inquire::{Confirm, Password, PasswordDisplayMode, Text};
use std::{sync::Arc, time::Duration};
use tokio::runtime::Handle;
use tracing::debug;
use weatherwise_core::{
    AdviceEngine, Config, LoadStatus, Lookup, LookupError, TemperatureUnit, WeatherReport,
    model_source_from_config, provider_from_config,
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherwise", version, about = "Current weather with clothing advice")]
pub struct Cli {
    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key and advice settings.
    Configure {
        /// API key; prompted for when omitted.
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Show current weather and clothing advice for a city.
    Show {
        /// City name, e.g. "Hanoi".
        city: String,

        /// Display the temperature in Fahrenheit.
        #[arg(long)]
        fahrenheit: bool,

        /// Skip the language model and use rule-based advice only.
        #[arg(long)]
        no_ai: bool,

        /// Wait up to SECS for the language model before advising. Without
        /// it the model is not loaded and the advice is rule-based.
        #[arg(long, value_name = "SECS")]
        wait_model: Option<u64>,
    },

    /// Look up cities one after another; the model loads in the background.
    Interactive {
        /// Start with Fahrenheit display.
        #[arg(long)]
        fahrenheit: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { api_key } => configure(api_key).await,
            Command::Show { city, fahrenheit, no_ai, wait_model } => {
                let config = Config::load()?;
                let unit = unit_for(&config, fahrenheit);
                let model_wait = show_model_wait(no_ai, wait_model);
                let lookup = build_lookup(&config, model_wait.is_none())?;

                let report = show(&lookup, &city, model_wait)
                    .await
                    .map_err(|err| anyhow!(err.user_message()))?;
                print!("{}", render::report(&report, unit));
                Ok(())
            }
            Command::Interactive { fahrenheit } => {
                let config = Config::load()?;
                let unit = unit_for(&config, fahrenheit);
                let lookup = build_lookup(&config, false)?;
                interactive(lookup, unit).await
            }
        }
    }
}

fn unit_for(config: &Config, fahrenheit: bool) -> TemperatureUnit {
    if fahrenheit { TemperatureUnit::Fahrenheit } else { config.display.unit }
}

/// `show` exits right after printing; the model is loaded only when the
/// caller waits for it.
fn show_model_wait(no_ai: bool, wait_model: Option<u64>) -> Option<Duration> {
    if no_ai { None } else { wait_model.map(Duration::from_secs) }
}

async fn show(
    lookup: &Lookup,
    city: &str,
    model_wait: Option<Duration>,
) -> Result<WeatherReport, LookupError> {
    if let Some(wait) = model_wait {
        lookup.advice().ensure_loading_started();
        let status = lookup.advice().wait_until_settled(wait).await;
        debug!(?status, "model wait finished");
    }

    lookup.lookup(city).await
}

fn build_lookup(config: &Config, no_ai: bool) -> anyhow::Result<Lookup> {
    let runtime = Handle::current();
    let provider = Arc::from(provider_from_config(config)?);

    let advice = if no_ai || !config.advice.enabled {
        AdviceEngine::disabled(runtime.clone())
    } else {
        AdviceEngine::new(model_source_from_config(config), runtime.clone())
    };

    Ok(Lookup::new(provider, advice, runtime))
}

async fn configure(api_key: Option<String>) -> anyhow::Result<()> {
    let path = Config::config_file_path()?;
    let mut config = Config::load_from(&path)?;
    let current_model = config.advice.model.clone();
    let enabled = config.advice.enabled;

    // Prompts block on stdin, keep them off the runtime workers.
    let answers = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let key = match api_key {
            Some(key) => key,
            None => Password::new("OpenWeather API key:")
                .with_display_mode(PasswordDisplayMode::Masked)
                .without_confirmation()
                .prompt()?,
        };

        let use_ai = Confirm::new("Use a local Ollama model for clothing advice?")
            .with_default(enabled)
            .prompt()?;

        let model = if use_ai {
            Text::new("Ollama model:").with_default(&current_model).prompt()?
        } else {
            current_model
        };

        Ok((key, use_ai, model))
    })
    .await
    .context("Configuration prompt task failed")??;

    let (key, use_ai, model) = answers;
    if key.trim().is_empty() {
        bail!("API key must not be empty");
    }

    config.set_api_key(key.trim().to_string());
    config.advice.enabled = use_ai;
    config.advice.model = model;
    config.save_to(&path)?;

    println!("Configuration saved to {}", path.display());
    Ok(())
}

async fn interactive(lookup: Lookup, mut unit: TemperatureUnit) -> anyhow::Result<()> {
    lookup.advice().ensure_loading_started();
    println!("Enter a city name. `:unit` switches °C/°F, `:q` or an empty line quits.");

    loop {
        println!("{}", render::model_status(lookup.advice().status()));

        let input = tokio::task::spawn_blocking(|| Text::new("City:").prompt())
            .await
            .context("Input prompt task failed")?;

        let line = match input {
            Ok(line) => line,
            Err(
                inquire::InquireError::OperationCanceled
                | inquire::InquireError::OperationInterrupted,
            ) => break,
            Err(err) => return Err(err.into()),
        };

        match line.trim() {
            "" | ":q" => break,
            ":unit" => {
                unit = unit.toggled();
                println!("Temperatures now in {}", unit.symbol());
                continue;
            }
            city => match lookup.lookup(city).await {
                Ok(report) => println!("\n{}", render::report(&report, unit)),
                Err(err) => println!("\n{}\n", err.user_message()),
            },
        }
    }

    if lookup.advice().status() == LoadStatus::Loading {
        debug!("exiting while the advice model is still loading");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use weatherwise_core::fallback;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn openweather() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "cod": 200,
                "name": "Hanoi",
                "dt": 1_700_000_000,
                "main": { "temp": 305.15, "humidity": 80 },
                "weather": [{ "id": 500, "main": "Rain", "description": "light rain" }],
                "wind": { "speed": 2.5 }
            })))
            .mount(&server)
            .await;
        server
    }

    fn config_for(weather: &MockServer, ollama: &MockServer) -> Config {
        let mut config = Config::default();
        config.set_api_key("KEY".into());
        config.openweather.base_url = Some(weather.uri());
        config.advice.endpoint = ollama.uri();
        config
    }

    #[test]
    fn parses_show_with_flags() {
        let cli = Cli::parse_from([
            "weatherwise",
            "show",
            "Ho Chi Minh City",
            "--fahrenheit",
            "--wait-model",
            "15",
        ]);

        match cli.command {
            Command::Show { city, fahrenheit, no_ai, wait_model } => {
                assert_eq!(city, "Ho Chi Minh City");
                assert!(fahrenheit);
                assert!(!no_ai);
                assert_eq!(wait_model, Some(15));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn verbose_is_global() {
        let cli = Cli::parse_from(["weatherwise", "interactive", "-v"]);
        assert!(cli.verbose);
    }

    #[test]
    fn show_loads_the_model_only_when_asked_to_wait() {
        assert_eq!(show_model_wait(false, None), None);
        assert_eq!(show_model_wait(true, Some(10)), None);
        assert_eq!(show_model_wait(false, Some(10)), Some(Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn show_without_wait_never_contacts_ollama() {
        let weather = openweather().await;
        let ollama = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&ollama)
            .await;

        let config = config_for(&weather, &ollama);
        let wait = show_model_wait(false, None);
        let lookup = build_lookup(&config, wait.is_none()).unwrap();

        let report = show(&lookup, "Hanoi", wait).await.unwrap();

        assert_eq!(report.advice, fallback::advise(&report.observation.advice_request()));
        let settled = lookup.advice().wait_until_settled(Duration::from_secs(5)).await;
        assert_eq!(settled, LoadStatus::Failed);
        ollama.verify().await;
    }

    #[tokio::test]
    async fn show_with_wait_uses_the_loaded_model() {
        let weather = openweather().await;
        let ollama = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": [{ "name": "llama3.2:1b" }]
            })))
            .mount(&ollama)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "done": true })))
            .expect(1)
            .mount(&ollama)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": { "role": "assistant", "content": "Nhớ mang áo mưa." },
                "done": true
            })))
            .mount(&ollama)
            .await;

        let config = config_for(&weather, &ollama);
        let wait = show_model_wait(false, Some(5));
        let lookup = build_lookup(&config, wait.is_none()).unwrap();

        let report = show(&lookup, "Hanoi", wait).await.unwrap();

        assert_eq!(lookup.advice().status(), LoadStatus::Ready);
        assert_eq!(report.advice, "Nhớ mang áo mưa.");
    }

    #[test]
    fn flag_overrides_configured_unit() {
        let config = Config::default();
        assert_eq!(unit_for(&config, false), TemperatureUnit::Celsius);
        assert_eq!(unit_for(&config, true), TemperatureUnit::Fahrenheit);
    }
}
