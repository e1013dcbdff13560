//! Core library for the `weatherwise` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeather data source
//! - Condition-code translation and rule-based clothing advice
//! - A lazily loaded language-model advice engine
//! - The lookup orchestrator tying these together
//!
//! It is used by `weatherwise-cli`, but can also be reused by other front-ends.

pub mod advice;
pub mod condition;
pub mod config;
pub mod fallback;
pub mod llm;
pub mod lookup;
pub mod model;
pub mod prompt;
pub mod provider;

pub use advice::{AdviceEngine, LoadStatus};
pub use condition::Condition;
pub use config::Config;
pub use llm::{ModelSource, TextModel, model_source_from_config};
pub use lookup::{Lookup, LookupError, PendingLookup};
pub use model::{AdviceRequest, Observation, TemperatureUnit, WeatherReport};
pub use provider::{FetchError, WeatherProvider, provider_from_config};
