use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, warn};

use super::{ChatMessage, CompletionError, CompletionProvider, CompletionResult};

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

const CHAT_MODEL: &str = "gpt-3.5-turbo";
const MAX_COMPLETION_TOKENS: u32 = 100;
const SAMPLING_TEMPERATURE: f64 = 0.7;

/// Total attempts per question, counting the first one.
const MAX_ATTEMPTS: u32 = 3;
/// Backoff before retry n is `BACKOFF_BASE * 2^n`.
const BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Chat-completion client for the OpenAI HTTP API.
///
/// Owns the bounded retry loop: rate-limit responses are retried with
/// exponential backoff, anything else fails the call immediately.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    backoff_base: Duration,
}

impl OpenAiClient {
    pub fn new(client: Client, api_key: String) -> anyhow::Result<Self> {
        if api_key.trim().is_empty() {
            anyhow::bail!("OPENAI_API_KEY not set");
        }
        Ok(Self {
            client,
            api_key,
            base_url: OPENAI_API_BASE.to_string(),
            backoff_base: BACKOFF_BASE,
        })
    }

    /// Point the client at a different API base, e.g. a mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the backoff base so tests do not sleep for whole seconds.
    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn complete_once(&self, messages: &[ChatMessage]) -> CompletionResult<String> {
        let payload = ChatCompletionRequest {
            model: CHAT_MODEL,
            messages,
            max_tokens: MAX_COMPLETION_TOKENS,
            temperature: SAMPLING_TEMPERATURE,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| CompletionError::Fatal(format!("completion request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::RateLimited(provider_error_message(&body)));
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read response body>".to_string());
            return Err(CompletionError::Fatal(format!(
                "completion request failed with status {status}: {}",
                provider_error_message(&body)
            )));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Fatal(format!("malformed completion response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                CompletionError::Fatal(
                    "completion response contained no message content".to_string(),
                )
            })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    async fn complete(&self, messages: Vec<ChatMessage>) -> CompletionResult<String> {
        let mut attempt = 0u32;
        loop {
            match self.complete_once(&messages).await {
                Err(CompletionError::RateLimited(message)) if attempt + 1 < MAX_ATTEMPTS => {
                    let delay = self.backoff_base * 2u32.pow(attempt);
                    warn!(
                        "Rate limited on attempt {}/{}, backing off for {:?}: {}",
                        attempt + 1,
                        MAX_ATTEMPTS,
                        delay,
                        message
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
                Ok(answer) => {
                    debug!("Completion succeeded on attempt {}", attempt + 1);
                    return Ok(answer);
                }
            }
        }
    }
}

/// Pull the human-readable message out of an OpenAI error envelope, falling
/// back to the raw body when it is not one.
fn provider_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::persona_conversation;
    use std::time::Instant;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // Short backoff keeps the retry tests fast while preserving the 1x/2x
    // schedule shape.
    const TEST_BACKOFF: Duration = Duration::from_millis(20);

    fn completion_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [
                {"message": {"role": "assistant", "content": text}}
            ]
        })
    }

    fn rate_limit_body() -> serde_json::Value {
        serde_json::json!({
            "error": {"message": "Rate limit reached", "type": "requests"}
        })
    }

    fn client_for(server: &MockServer) -> OpenAiClient {
        OpenAiClient::new(Client::new(), "test-key".to_string())
            .expect("client")
            .with_base_url(server.uri())
            .with_backoff_base(TEST_BACKOFF)
    }

    #[test]
    fn new_requires_api_key() {
        let err = OpenAiClient::new(Client::new(), "  ".to_string())
            .expect_err("blank key should fail");
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[tokio::test]
    async fn complete_sends_expected_payload_and_trims_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-3.5-turbo",
                "max_tokens": 100,
                "temperature": 0.7,
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(completion_body(" Hello there ")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let answer = client
            .complete(persona_conversation("who are you?"))
            .await
            .expect("answer");

        assert_eq!(answer, "Hello there");
    }

    #[tokio::test]
    async fn complete_retries_rate_limits_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(rate_limit_body()))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("recovered")))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let started = Instant::now();
        let answer = client
            .complete(persona_conversation("q"))
            .await
            .expect("answer after retries");

        assert_eq!(answer, "recovered");
        // Backoff of 1x then 2x the base ran before the third attempt.
        assert!(started.elapsed() >= TEST_BACKOFF * 3);
    }

    #[tokio::test]
    async fn complete_gives_up_after_three_rate_limited_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(rate_limit_body()))
            .expect(3)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .complete(persona_conversation("q"))
            .await
            .expect_err("should exhaust retries");

        assert_eq!(err, CompletionError::RateLimited("Rate limit reached".to_string()));
    }

    #[tokio::test]
    async fn complete_does_not_retry_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let started = Instant::now();
        let err = client
            .complete(persona_conversation("q"))
            .await
            .expect_err("server error is fatal");

        assert!(matches!(&err, CompletionError::Fatal(msg) if msg.contains("500")));
        // No backoff for non-retryable failures.
        assert!(started.elapsed() < TEST_BACKOFF);
    }

    #[tokio::test]
    async fn complete_treats_missing_content_as_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .complete(persona_conversation("q"))
            .await
            .expect_err("empty choices are fatal");

        assert!(matches!(&err, CompletionError::Fatal(msg) if msg.contains("no message content")));
    }

    #[tokio::test]
    async fn complete_treats_unreachable_provider_as_fatal() {
        // Nothing listens on this port; the connect error must not be retried.
        let client = OpenAiClient::new(Client::new(), "test-key".to_string())
            .expect("client")
            .with_base_url("http://127.0.0.1:9")
            .with_backoff_base(TEST_BACKOFF);

        let err = client
            .complete(persona_conversation("q"))
            .await
            .expect_err("connect error is fatal");

        assert!(matches!(&err, CompletionError::Fatal(msg) if msg.contains("request failed")));
    }

    #[test]
    fn provider_error_message_prefers_envelope_message() {
        let body = r#"{"error": {"message": "Rate limit reached", "code": "rate_limit"}}"#;
        assert_eq!(provider_error_message(body), "Rate limit reached");
        assert_eq!(provider_error_message("plain text"), "plain text");
    }
}
