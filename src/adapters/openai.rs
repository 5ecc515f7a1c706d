use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adapters::llm::{
    ChatRequest, CompletionError, LLMAdapter, Message, ModelConfig, DEFAULT_BASE_URL,
};

pub struct OpenAIAdapter {
    client: Client,
    config: ModelConfig,
    api_key: String,
    base_url: String,
}

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    n: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAIAdapter {
    /// Builds the adapter from an already resolved configuration; the key is
    /// not looked up again here.
    pub fn new(config: ModelConfig) -> Result<Self, CompletionError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or(CompletionError::MissingApiKey)?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        // No timeout: a round trip blocks until the server answers.
        let client = Client::builder().build().map_err(CompletionError::Client)?;

        Ok(Self {
            client,
            config,
            api_key,
            base_url,
        })
    }
}

#[async_trait]
impl LLMAdapter for OpenAIAdapter {
    async fn complete(&self, request: &ChatRequest) -> Result<Vec<String>, CompletionError> {
        let openai_request = OpenAIRequest {
            model: &self.config.model_name,
            messages: &request.messages,
            n: request.choices,
            temperature: self.config.temperature,
        };

        debug!(
            "Requesting {} completions from {} ({} messages)",
            request.choices,
            self.config.model_name,
            request.messages.len()
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&openai_request)
            .send()
            .await
            .map_err(CompletionError::Transport)?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let openai_response: OpenAIResponse =
            response.json().await.map_err(CompletionError::Transport)?;

        if openai_response.choices.is_empty() {
            return Err(CompletionError::EmptyResponse);
        }

        Ok(openai_response
            .choices
            .into_iter()
            .map(|choice| choice.message.content.unwrap_or_default().trim().to_string())
            .collect())
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::llm::ErrorKind;
    use mockito::Matcher;
    use serde_json::json;

    fn adapter_for(server: &mockito::ServerGuard) -> OpenAIAdapter {
        OpenAIAdapter::new(ModelConfig {
            model_name: "gpt-4".to_string(),
            api_key: Some("test-key".to_string()),
            base_url: Some(server.url()),
            temperature: None,
        })
        .unwrap()
    }

    fn request() -> ChatRequest {
        ChatRequest {
            messages: vec![Message::system("rules"), Message::user("The git diff summary is:\n+x")],
            choices: 3,
        }
    }

    #[tokio::test]
    async fn test_complete_returns_trimmed_choices_in_order() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-4",
                "n": 3,
                "messages": [
                    {"role": "system", "content": "rules"},
                    {"role": "user", "content": "The git diff summary is:\n+x"}
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "choices": [
                        {"index": 0, "message": {"role": "assistant", "content": "  Add parser\n"}},
                        {"index": 1, "message": {"role": "assistant", "content": "Fix lexer"}},
                        {"index": 2, "message": {"role": "assistant", "content": "\tUpdate docs "}}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let choices = adapter_for(&server).complete(&request()).await.unwrap();
        assert_eq!(choices, vec!["Add parser", "Fix lexer", "Update docs"]);
        mock.assert_async().await;
    }

    #[test]
    fn test_temperature_is_omitted_unless_configured() {
        let messages = vec![Message::user("hint")];
        let without = serde_json::to_value(OpenAIRequest {
            model: "gpt-4",
            messages: &messages,
            n: 3,
            temperature: None,
        })
        .unwrap();
        assert!(without.get("temperature").is_none());
        assert_eq!(without["n"], 3);

        let with = serde_json::to_value(OpenAIRequest {
            model: "gpt-4",
            messages: &messages,
            n: 1,
            temperature: Some(0.5),
        })
        .unwrap();
        assert_eq!(with["temperature"], 0.5);
    }

    #[tokio::test]
    async fn test_null_content_becomes_empty_candidate() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(json!({"choices": [{"message": {"content": null}}]}).to_string())
            .create_async()
            .await;

        let choices = adapter_for(&server).complete(&request()).await.unwrap();
        assert_eq!(choices, vec![String::new()]);
    }

    #[tokio::test]
    async fn test_non_200_surfaces_status_and_raw_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body("{\"error\":{\"message\":\"Incorrect API key\"}}")
            .create_async()
            .await;

        let err = adapter_for(&server).complete(&request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Request);
        match err {
            CompletionError::Api { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "{\"error\":{\"message\":\"Incorrect API key\"}}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_empty_choices_is_request_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body("{\"choices\": []}")
            .create_async()
            .await;

        let err = adapter_for(&server).complete(&request()).await.unwrap_err();
        assert!(matches!(err, CompletionError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_malformed_body_is_transport_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let err = adapter_for(&server).complete(&request()).await.unwrap_err();
        assert!(matches!(err, CompletionError::Transport(_)));
        assert_eq!(err.kind(), ErrorKind::Request);
    }

    #[test]
    fn test_missing_key_is_rejected() {
        let result = OpenAIAdapter::new(ModelConfig::default());
        assert!(matches!(result, Err(CompletionError::MissingApiKey)));
    }

    #[test]
    fn test_base_url_trailing_slash_is_dropped() {
        let adapter = OpenAIAdapter::new(ModelConfig {
            api_key: Some("k".to_string()),
            base_url: Some("http://localhost:8080/v1/".to_string()),
            ..ModelConfig::default()
        })
        .unwrap();
        assert_eq!(adapter.base_url, "http://localhost:8080/v1");
        assert_eq!(adapter.model_name(), "gpt-4");
    }
}
