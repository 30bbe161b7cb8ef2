//! Ollama client
//!
//! Talks to a locally running Ollama daemon over its HTTP API:
//! `/api/tags` for the installed model list and `/api/chat` for
//! non-streaming chat completions.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default Ollama daemon address
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// A chat message in Ollama's role/content shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "system", "user", or "assistant"
    pub role: String,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Build a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Build an assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

/// Client for a local Ollama daemon
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    /// Create a client for the given daemon URL
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// List models installed in the local daemon
    ///
    /// # Errors
    ///
    /// Returns error if the daemon is unreachable or responds with an
    /// error status
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            tracing::error!(error = %e, url = %url, "Ollama unreachable");
            Error::Llm(format!("Ollama unreachable at {}: {e}", self.base_url))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Llm(format!("Ollama error {status}: {body}")));
        }

        let tags: TagsResponse = response.json().await?;
        let models: Vec<String> = tags.models.into_iter().map(|m| m.name).collect();

        tracing::debug!(count = models.len(), "listed Ollama models");
        Ok(models)
    }

    /// Send a chat conversation and return the assistant reply
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the daemon responds with
    /// an error status
    pub async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest {
            model,
            messages,
            stream: false,
        };

        tracing::debug!(model, turns = messages.len(), "sending chat request");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Ollama chat request failed");
                Error::Llm(format!("Ollama unreachable at {}: {e}", self.base_url))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Ollama chat error");
            return Err(Error::Llm(format!("Ollama error {status}: {body}")));
        }

        let result: ChatResponse = response.json().await?;
        tracing::debug!(chars = result.message.content.len(), "chat response received");

        Ok(result.message.content)
    }

    /// Base URL of the daemon this client talks to
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_stripped() {
        let client = OllamaClient::new("http://localhost:11434/");
        assert_eq!(client.base_url(), "http://localhost:11434");

        let client = OllamaClient::new("http://localhost:11434");
        assert_eq!(client.base_url(), "http://localhost:11434");
    }

    #[test]
    fn chat_response_parses() {
        let json = r#"{
            "model": "llama3",
            "message": {"role": "assistant", "content": "Hi there"},
            "done": true
        }"#;
        let parsed: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.message.role, "assistant");
        assert_eq!(parsed.message.content, "Hi there");
    }

    #[test]
    fn tags_response_parses() {
        let json = r#"{
            "models": [
                {"name": "llama3:latest", "size": 4661224676},
                {"name": "deepseek-r1:1.5b", "size": 1117322768}
            ]
        }"#;
        let parsed: TagsResponse = serde_json::from_str(json).unwrap();
        let names: Vec<String> = parsed.models.into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["llama3:latest", "deepseek-r1:1.5b"]);
    }

    #[test]
    fn message_constructors_set_roles() {
        assert_eq!(ChatMessage::user("hi").role, "user");
        assert_eq!(ChatMessage::assistant("hello").role, "assistant");
    }
}
