use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tracing::debug;

use super::{ChatMessage, Generation, ModelError, ModelSource, SamplingParams, TextModel};

pub const OLLAMA_DEFAULT_URL: &str = "http://127.0.0.1:11434";
pub const DEFAULT_MODEL: &str = "llama3.2:1b";

/// Loading pulls the weights into memory on the server; allow for that.
const LOAD_TIMEOUT: Duration = Duration::from_secs(180);
const CHAT_TIMEOUT: Duration = Duration::from_secs(90);
const KEEP_ALIVE: &str = "30m";

/// Acquires a model from a local Ollama server: checks it is installed,
/// then warms it so the first chat does not pay the load cost.
#[derive(Debug, Clone)]
pub struct OllamaSource {
    base_url: String,
    model: String,
    http: Client,
}

impl OllamaSource {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            http: Client::new(),
        }
    }

    async fn installed_models(&self) -> Result<Vec<String>, ModelError> {
        let url = format!("{}/api/tags", self.base_url);
        let res = self.http.get(&url).timeout(LOAD_TIMEOUT).send().await?;

        let status = res.status();
        if !status.is_success() {
            return Err(ModelError::Http(format!("GET /api/tags returned {status}")));
        }

        let tags: TagsResponse = res.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn warm_up(&self) -> Result<(), ModelError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = WarmUpRequest {
            model: &self.model,
            prompt: "",
            stream: false,
            keep_alive: KEEP_ALIVE,
        };

        let res = self.http.post(&url).json(&body).timeout(LOAD_TIMEOUT).send().await?;
        let status = res.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ModelError::ModelNotFound(self.model.clone()));
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ModelError::Http(format!("warm-up returned {status}: {body}")));
        }

        Ok(())
    }
}

#[async_trait]
impl ModelSource for OllamaSource {
    async fn load(&self) -> Result<Arc<dyn TextModel>, ModelError> {
        let installed = self.installed_models().await?;
        if !has_model(&installed, &self.model) {
            return Err(ModelError::ModelNotFound(self.model.clone()));
        }
        debug!(model = %self.model, "model installed, warming up");

        self.warm_up().await?;

        Ok(Arc::new(OllamaModel {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            http: self.http.clone(),
        }))
    }

    fn describe(&self) -> String {
        format!("ollama:{} at {}", self.model, self.base_url)
    }
}

/// Tags compare equal when either the full name matches or the request
/// omits the tag and the installed model is `:latest`.
fn has_model(installed: &[String], wanted: &str) -> bool {
    installed.iter().any(|name| {
        name == wanted || (!wanted.contains(':') && *name == format!("{wanted}:latest"))
    })
}

/// A model resident on an Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaModel {
    base_url: String,
    model: String,
    http: Client,
}

#[async_trait]
impl TextModel for OllamaModel {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        sampling: &SamplingParams,
    ) -> Result<Generation, ModelError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            keep_alive: KEEP_ALIVE,
            options: ChatOptions {
                num_predict: sampling.max_tokens,
                temperature: sampling.temperature,
                top_k: sampling.top_k,
                top_p: sampling.top_p,
                repeat_penalty: sampling.repeat_penalty,
            },
        };

        debug!(model = %self.model, turns = messages.len(), "sending chat request");

        let res = self.http.post(&url).json(&body).timeout(CHAT_TIMEOUT).send().await?;
        let status = res.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ModelError::ModelNotFound(self.model.clone()));
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ModelError::Http(format!("chat returned {status}: {body}")));
        }

        let text = res.text().await?;
        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|e| ModelError::Parse(e.to_string()))?;

        let mut turns = messages.to_vec();
        turns.push(parsed.message);
        Ok(Generation::new(turns))
    }
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

#[derive(Debug, Serialize)]
struct WarmUpRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    keep_alive: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    keep_alive: &'a str,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    num_predict: u32,
    temperature: f32,
    top_k: u32,
    top_p: f32,
    repeat_penalty: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sampling() -> SamplingParams {
        SamplingParams {
            max_tokens: 250,
            temperature: 0.5,
            top_k: 50,
            top_p: 0.95,
            repeat_penalty: 1.0,
        }
    }

    async fn mount_tags(server: &MockServer, names: &[&str]) {
        let models: Vec<_> = names.iter().map(|n| serde_json::json!({ "name": n })).collect();
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "models": models })))
            .mount(server)
            .await;
    }

    #[test]
    fn model_name_matching() {
        let installed = vec!["llama3.2:1b".to_string(), "qwen2.5:latest".to_string()];

        assert!(has_model(&installed, "llama3.2:1b"));
        assert!(has_model(&installed, "qwen2.5"));
        assert!(!has_model(&installed, "llama3.2"));
        assert!(!has_model(&installed, "mistral"));
    }

    #[tokio::test]
    async fn load_checks_tags_and_warms_up() {
        let server = MockServer::start().await;
        mount_tags(&server, &["llama3.2:1b"]).await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(serde_json::json!({ "model": "llama3.2:1b", "prompt": "" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "done": true })))
            .expect(1)
            .mount(&server)
            .await;

        let source = OllamaSource::new(server.uri(), "llama3.2:1b");
        assert!(source.load().await.is_ok());
    }

    #[tokio::test]
    async fn load_fails_when_model_not_installed() {
        let server = MockServer::start().await;
        mount_tags(&server, &["mistral:7b"]).await;

        let source = OllamaSource::new(server.uri(), "llama3.2:1b");
        let err = source.load().await.unwrap_err();

        assert!(matches!(err, ModelError::ModelNotFound(name) if name == "llama3.2:1b"));
    }

    #[tokio::test]
    async fn load_fails_when_server_unreachable() {
        // Nothing listens on port 9 on loopback.
        let source = OllamaSource::new("http://127.0.0.1:9", "llama3.2:1b");
        let err = source.load().await.unwrap_err();

        assert!(matches!(err, ModelError::Unavailable(_) | ModelError::Http(_)));
    }

    #[tokio::test]
    async fn chat_sends_sampling_options_and_returns_reply_turn() {
        let server = MockServer::start().await;
        mount_tags(&server, &["llama3.2:1b"]).await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "done": true })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({
                "stream": false,
                "options": { "num_predict": 250, "top_k": 50 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "llama3.2:1b",
                "message": { "role": "assistant", "content": " Mặc áo thun mỏng. " },
                "done": true
            })))
            .mount(&server)
            .await;

        let model = OllamaSource::new(server.uri(), "llama3.2:1b").load().await.unwrap();
        let messages = vec![ChatMessage::system("rules"), ChatMessage::user("hỏi")];
        let generation = model.chat(&messages, &sampling()).await.unwrap();

        assert_eq!(generation.turns.len(), 3);
        assert_eq!(generation.turns[2].role, Role::Assistant);
        assert_eq!(generation.into_text().unwrap(), "Mặc áo thun mỏng.");
    }

    #[tokio::test]
    async fn chat_with_malformed_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let model = OllamaModel {
            base_url: server.uri(),
            model: "llama3.2:1b".into(),
            http: Client::new(),
        };
        let err = model.chat(&[ChatMessage::user("hi")], &sampling()).await.unwrap_err();

        assert!(matches!(err, ModelError::Parse(_)));
    }
}
