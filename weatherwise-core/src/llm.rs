//! Seam between the advice engine and a generative text model.
//!
//! A [`ModelSource`] knows how to acquire a model once; the resulting
//! [`TextModel`] answers chat-style requests with a structured [`Generation`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, sync::Arc};

use crate::Config;

pub mod ollama;

pub use ollama::{OllamaModel, OllamaSource};

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model server unavailable: {0}")]
    Unavailable(String),
    #[error("Model '{0}' is not installed on the model server")]
    ModelNotFound(String),
    #[error("Model request timed out")]
    Timeout,
    #[error("Model request failed: {0}")]
    Http(String),
    #[error("Failed to parse model response: {0}")]
    Parse(String),
    #[error("Model produced no text")]
    EmptyOutput,
    #[error("AI advice is disabled")]
    Disabled,
}

impl From<reqwest::Error> for ModelError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ModelError::Timeout
        } else if err.is_connect() {
            ModelError::Unavailable(err.to_string())
        } else if err.is_decode() {
            ModelError::Parse(err.to_string())
        } else {
            ModelError::Http(err.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    #[serde(other)]
    Other,
}

/// One conversational turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Sampling knobs passed through to the model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub repeat_penalty: f32,
}

/// Turns produced by one generation call, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generation {
    pub turns: Vec<ChatMessage>,
}

impl Generation {
    pub fn new(turns: Vec<ChatMessage>) -> Self {
        Self { turns }
    }

    fn last_assistant_turn(&self) -> Option<&ChatMessage> {
        self.turns.iter().rev().find(|turn| turn.role == Role::Assistant)
    }

    /// Assistant reply if there is an assistant turn, otherwise the whole
    /// transcript trimmed.
    pub fn into_text(self) -> Result<String, ModelError> {
        let text = match self.last_assistant_turn() {
            Some(turn) => turn.content.trim().to_string(),
            None => self
                .turns
                .iter()
                .map(|turn| turn.content.as_str())
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string(),
        };

        if text.is_empty() {
            Err(ModelError::EmptyOutput)
        } else {
            Ok(text)
        }
    }
}

/// A loaded model that can answer chat requests.
#[async_trait]
pub trait TextModel: Send + Sync + Debug {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        sampling: &SamplingParams,
    ) -> Result<Generation, ModelError>;
}

/// Where a [`TextModel`] comes from. `load` may be slow.
#[async_trait]
pub trait ModelSource: Send + Sync + Debug {
    async fn load(&self) -> Result<Arc<dyn TextModel>, ModelError>;

    /// Short label for logs.
    fn describe(&self) -> String;
}

/// Source that never yields a model, for when AI advice is switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledSource;

#[async_trait]
impl ModelSource for DisabledSource {
    async fn load(&self) -> Result<Arc<dyn TextModel>, ModelError> {
        Err(ModelError::Disabled)
    }

    fn describe(&self) -> String {
        "disabled".to_string()
    }
}

/// Model source described by the `[advice]` config section.
pub fn model_source_from_config(config: &Config) -> Arc<dyn ModelSource> {
    if config.advice.enabled {
        Arc::new(OllamaSource::new(&config.advice.endpoint, &config.advice.model))
    } else {
        Arc::new(DisabledSource)
    }
}
