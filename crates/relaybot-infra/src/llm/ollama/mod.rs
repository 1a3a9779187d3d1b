//! OllamaClient -- concrete [`InferenceClient`] implementation for Ollama.
//!
//! Sends non-streaming requests to the Ollama chat API (`/api/chat`) and
//! checks reachability through `/api/tags`. Connect and request timeouts come
//! from [`OllamaConfig`].

pub mod types;

use std::time::Duration;

use tracing::warn;

use relaybot_core::llm::provider::InferenceClient;
use relaybot_types::config::OllamaConfig;
use relaybot_types::llm::{InferenceError, Message};

use self::types::{OllamaChatRequest, OllamaChatResponse, OllamaMessage};

/// Longest error body carried into an [`InferenceError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// Ollama inference client.
///
/// Holds one pooled `reqwest::Client`; cloning it is cheap and every
/// session shares it.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    request_timeout: Duration,
}

impl OllamaClient {
    /// Build a client from the `[ollama]` config section.
    pub fn new(config: &OllamaConfig) -> Result<Self, InferenceError> {
        let request_timeout = Duration::from_secs(config.request_timeout_secs);
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(request_timeout)
            .build()
            .map_err(|e| InferenceError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn to_ollama_request(&self, messages: &[Message]) -> OllamaChatRequest {
        OllamaChatRequest {
            model: self.model.clone(),
            messages: messages.iter().map(OllamaMessage::from).collect(),
            stream: false,
        }
    }

    fn map_reqwest_error(&self, err: reqwest::Error) -> InferenceError {
        if err.is_timeout() {
            InferenceError::Timeout(self.request_timeout)
        } else {
            InferenceError::Transport(format!("HTTP request failed: {err}"))
        }
    }
}

impl InferenceClient for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, InferenceError> {
        let body = self.to_ollama_request(messages);

        let response = self
            .client
            .post(self.url("/api/chat"))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let mut error_body = response.text().await.unwrap_or_default();
            if error_body.len() > MAX_ERROR_BODY {
                let mut end = MAX_ERROR_BODY;
                while !error_body.is_char_boundary(end) {
                    end -= 1;
                }
                error_body.truncate(end);
            }
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body: error_body,
            });
        }

        let chat: OllamaChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                InferenceError::Timeout(self.request_timeout)
            } else {
                InferenceError::MalformedResponse(format!("failed to parse response: {e}"))
            }
        })?;

        if !chat.done {
            warn!(model = %self.model, "Ollama reply is not marked done; it may be truncated");
        }
        chat.into_content()
            .ok_or_else(|| InferenceError::MalformedResponse("response has no message content".to_string()))
    }

    async fn health_check(&self) -> Result<(), InferenceError> {
        let response = self
            .client
            .get(self.url("/api/tags"))
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(InferenceError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str, request_timeout_secs: u64) -> OllamaConfig {
        OllamaConfig {
            base_url: base_url.to_string(),
            model: "llama3.1".to_string(),
            request_timeout_secs,
            connect_timeout_secs: 1,
        }
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = OllamaClient::new(&config("http://localhost:11434/", 5)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.url("/api/chat"), "http://localhost:11434/api/chat");
        assert_eq!(client.name(), "ollama");
        assert_eq!(client.model(), "llama3.1");
    }

    #[tokio::test]
    async fn test_complete_sends_history_and_returns_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({
                "model": "llama3.1",
                "stream": false,
                "messages": [
                    {"role": "system", "content": "S"},
                    {"role": "user", "content": "2+2?"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "llama3.1",
                "message": {"role": "assistant", "content": "4"},
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OllamaClient::new(&config(&server.uri(), 5)).unwrap();
        let reply = client
            .complete(&[Message::system("S"), Message::user("2+2?")])
            .await
            .unwrap();
        assert_eq!(reply, "4");
    }

    #[tokio::test]
    async fn test_complete_maps_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(404).set_body_string(r#"{"error":"model 'llama3.1' not found"}"#),
            )
            .mount(&server)
            .await;

        let client = OllamaClient::new(&config(&server.uri(), 5)).unwrap();
        let err = client.complete(&[Message::user("hi")]).await.unwrap_err();
        match err {
            InferenceError::Status { status, body } => {
                assert_eq!(status, 404);
                assert!(body.contains("not found"));
            }
            other => panic!("Expected Status, got: {other}"),
        }
    }

    #[tokio::test]
    async fn test_complete_rejects_missing_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"done": true})))
            .mount(&server)
            .await;

        let client = OllamaClient::new(&config(&server.uri(), 5)).unwrap();
        let err = client.complete(&[Message::user("hi")]).await.unwrap_err();
        assert!(matches!(err, InferenceError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_complete_rejects_non_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
            .mount(&server)
            .await;

        let client = OllamaClient::new(&config(&server.uri(), 5)).unwrap();
        let err = client.complete(&[Message::user("hi")]).await.unwrap_err();
        assert!(matches!(err, InferenceError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_complete_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"message": {"role": "assistant", "content": "late"}}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = OllamaClient::new(&config(&server.uri(), 1)).unwrap();
        let err = client.complete(&[Message::user("hi")]).await.unwrap_err();
        assert!(err.is_timeout(), "expected timeout, got: {err}");
    }

    #[tokio::test]
    async fn test_complete_connection_refused_is_transport_error() {
        // Bind then drop a listener so the port is known to be closed.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = OllamaClient::new(&config(&format!("http://{addr}"), 5)).unwrap();
        let err = client.complete(&[Message::user("hi")]).await.unwrap_err();
        assert!(matches!(err, InferenceError::Transport(_)));
    }

    #[tokio::test]
    async fn test_health_check() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"models": []})))
            .mount(&server)
            .await;

        let client = OllamaClient::new(&config(&server.uri(), 5)).unwrap();
        client.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn test_health_check_failure_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = OllamaClient::new(&config(&server.uri(), 5)).unwrap();
        let err = client.health_check().await.unwrap_err();
        assert!(matches!(err, InferenceError::Status { status: 503, .. }));
    }
}
