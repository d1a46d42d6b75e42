//! OpenAI-compatible completion backend
//!
//! Posts the conversation to `{base_url}/chat/completions` and returns the
//! first choice. Works with any server speaking the same protocol.

use crate::config::FileCompletionConfig;
use async_trait::async_trait;
use avachat_application::{CompletionBackend, CompletionError};
use avachat_domain::{CompletionMessage, Role};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    role: Option<String>,
    content: Option<String>,
}

/// [`CompletionBackend`] for OpenAI-compatible chat completion APIs
pub struct OpenAiCompletionBackend {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiCompletionBackend {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, CompletionError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| CompletionError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    /// Build from the `[completion]` section, reading the key from its env var
    pub fn from_config(config: &FileCompletionConfig) -> Result<Self, CompletionError> {
        let api_key = std::env::var(&config.api_key_env).unwrap_or_default();
        if api_key.trim().is_empty() {
            return Err(CompletionError::ConnectionError(format!(
                "No API key configured. Set ${}.",
                config.api_key_env
            )));
        }
        Self::new(
            &config.base_url,
            &api_key,
            &config.model,
            config.timeout_seconds.map(Duration::from_secs),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        if self.base_url.contains("/chat/completions") {
            self.base_url.clone()
        } else {
            format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
        }
    }
}

fn map_transport_error(e: reqwest::Error) -> CompletionError {
    if e.is_timeout() {
        CompletionError::Timeout
    } else if e.is_connect() {
        CompletionError::ConnectionError(e.to_string())
    } else {
        CompletionError::RequestFailed(e.to_string())
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompletionBackend {
    async fn generate_reply(
        &self,
        messages: &[CompletionMessage],
    ) -> Result<CompletionMessage, CompletionError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.text,
                })
                .collect(),
        };
        debug!(
            "POST {} ({} messages, model {})",
            self.endpoint(),
            messages.len(),
            self.model
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

        let Some(choice) = completion.choices.into_iter().next() else {
            return Err(CompletionError::InvalidResponse("no choices".to_string()));
        };
        let text = choice
            .message
            .content
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| CompletionError::InvalidResponse("no text".to_string()))?;
        let role = choice
            .message
            .role
            .and_then(|r| r.parse().ok())
            .unwrap_or(Role::Assistant);

        Ok(CompletionMessage::new(role, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve one HTTP exchange and hand back the raw request body
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/v1", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(split) = text.find("\r\n\r\n") {
                    let length = text[..split]
                        .lines()
                        .find_map(|l| {
                            l.to_ascii_lowercase()
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if request.len() >= split + 4 + length || n == 0 {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let text = String::from_utf8_lossy(&request).to_string();
            text.split("\r\n\r\n").nth(1).unwrap_or_default().to_string()
        });
        (url, handle)
    }

    fn backend(url: &str) -> OpenAiCompletionBackend {
        OpenAiCompletionBackend::new(url, "sk-test", "gpt-test", Some(Duration::from_secs(5)))
            .unwrap()
    }

    #[tokio::test]
    async fn test_returns_first_choice() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"Hey friend!"}}]}"#,
        )
        .await;

        let reply = backend(&url)
            .generate_reply(&[
                CompletionMessage::system("You are a cat"),
                CompletionMessage::user("Hello there"),
            ])
            .await
            .unwrap();
        assert_eq!(reply, CompletionMessage::assistant("Hey friend!"));

        let body: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(body["model"], "gpt-test");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Hello there");
    }

    #[tokio::test]
    async fn test_empty_choices_is_invalid_response() {
        let (url, _server) = serve_once("200 OK", r#"{"choices":[]}"#).await;
        let err = backend(&url)
            .generate_reply(&[CompletionMessage::user("Hello there")])
            .await
            .unwrap_err();
        assert!(err.is_invalid_response());
    }

    #[tokio::test]
    async fn test_missing_content_is_invalid_response() {
        let (url, _server) =
            serve_once("200 OK", r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#)
                .await;
        let err = backend(&url)
            .generate_reply(&[CompletionMessage::user("Hello there")])
            .await
            .unwrap_err();
        assert!(err.is_invalid_response());
    }

    #[tokio::test]
    async fn test_http_error_maps_to_api_error() {
        let (url, _server) =
            serve_once("429 Too Many Requests", r#"{"error":"rate limited"}"#).await;
        let err = backend(&url)
            .generate_reply(&[CompletionMessage::user("Hello there")])
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CompletionError::Api {
                status: 429,
                message: r#"{"error":"rate limited"}"#.to_string(),
            }
        );
    }

    #[test]
    fn test_endpoint_building() {
        assert_eq!(
            backend("https://api.openai.com/v1/").endpoint(),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            backend("http://localhost/v1/chat/completions").endpoint(),
            "http://localhost/v1/chat/completions"
        );
    }

    #[test]
    fn test_from_config_requires_api_key() {
        let config = FileCompletionConfig {
            api_key_env: "AVACHAT_TEST_KEY_THAT_IS_NOT_SET".to_string(),
            ..FileCompletionConfig::default()
        };
        let err = OpenAiCompletionBackend::from_config(&config).err().unwrap();
        assert!(matches!(err, CompletionError::ConnectionError(_)));
    }
}
