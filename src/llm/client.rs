//! OpenAI-compatible chat-completions client for case analysis.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::prompt;
use crate::error::AnalysisError;
use crate::records::CaseRecord;

/// Maximum completion tokens requested per analysis.
const MAX_COMPLETION_TOKENS: u32 = 5000;

/// Configuration for the remote analysis service.
///
/// Constructed once at startup and handed to the client; there is no
/// process-wide mutable client state.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the OpenAI-compatible API (e.g. "https://api.example.com/v1").
    pub base_url: String,
    /// Optional bearer token for authentication.
    pub api_key: Option<String>,
    /// Model identifier to request.
    pub model: String,
    /// Per-call deadline.
    pub timeout: Duration,
}

/// Trait for services that can analyze a single case record.
///
/// The scheduler depends only on this contract, so tests substitute
/// scripted implementations for the remote service.
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    /// Produce the analysis text for one record.
    async fn analyze(&self, record: &CaseRecord) -> Result<String, AnalysisError>;
}

/// Client for OpenAI-compatible chat-completions APIs.
pub struct ChatClient {
    config: ClientConfig,
    http_client: Client,
}

impl ChatClient {
    /// Create a new client from an explicit configuration.
    pub fn new(config: ClientConfig) -> Self {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to build HTTP client - system TLS configuration error");

        Self {
            config,
            http_client,
        }
    }

    /// Get the API base URL.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Get the configured model.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Get the API key masked for safe logging.
    pub fn api_key_masked(&self) -> String {
        match &self.config.api_key {
            None => "<none>".to_string(),
            Some(key) if key.len() <= 8 => "*".repeat(key.len()),
            Some(key) => format!("{}...{}", &key[..4], &key[key.len() - 4..]),
        }
    }
}

#[async_trait]
impl AnalysisClient for ChatClient {
    async fn analyze(&self, record: &CaseRecord) -> Result<String, AnalysisError> {
        let api_request = ApiRequest {
            model: self.config.model.clone(),
            messages: vec![ApiMessage {
                role: "user".to_string(),
                content: prompt::render(record),
            }],
            max_tokens: Some(MAX_COMPLETION_TOKENS),
        };

        let url = format!("{}/chat/completions", self.config.base_url);

        let mut http_request = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json");

        if let Some(ref api_key) = self.config.api_key {
            http_request = http_request.header("Authorization", format!("Bearer {}", api_key));
        }

        let http_response = http_request
            .json(&api_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnalysisError::RequestFailed(format!("request timed out: {}", e))
                } else if e.is_connect() {
                    AnalysisError::RequestFailed(format!("connection failed: {}", e))
                } else {
                    AnalysisError::RequestFailed(e.to_string())
                }
            })?;

        let status = http_response.status();

        if !status.is_success() {
            let status_code = status.as_u16();
            let error_text = http_response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());

            if let Ok(error_response) = serde_json::from_str::<ApiErrorResponse>(&error_text) {
                if status_code == 429 {
                    return Err(AnalysisError::RateLimited(error_response.error.message));
                }

                return Err(AnalysisError::Api {
                    code: status_code,
                    message: error_response.error.message,
                });
            }

            return Err(AnalysisError::Api {
                code: status_code,
                message: error_text,
            });
        }

        let api_response: ApiResponse = http_response
            .json()
            .await
            .map_err(|e| AnalysisError::ParseError(format!("Failed to parse API response: {}", e)))?;

        let content = api_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(AnalysisError::EmptyResponse);
        }

        match prompt::format_warning(&content) {
            Some(warning) => Ok(format!("{}{}", content, warning)),
            None => Ok(content),
        }
    }
}

/// Internal request structure for the chat-completions API.
#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Internal message structure for requests and responses.
#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    content: String,
}

/// Internal response structure from the chat-completions API.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

/// Internal choice structure from the API response.
#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

/// Error response from the API.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

/// Error detail from the API.
#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(base_url: &str, api_key: Option<&str>) -> ClientConfig {
        ClientConfig {
            base_url: base_url.to_string(),
            api_key: api_key.map(|k| k.to_string()),
            model: "test-model".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    fn sample_record() -> CaseRecord {
        CaseRecord {
            index: 3,
            age: 64,
            sex: "M".to_string(),
            chief_complaint: "chest pain".to_string(),
            present_history: "angina".to_string(),
            past_history: "hypertension".to_string(),
            surgery_day: "2024-03-01".to_string(),
            cta_report: "LAD 70%".to_string(),
        }
    }

    #[test]
    fn test_chat_client_new() {
        let client = ChatClient::new(test_config("http://localhost:4000", Some("test-key")));

        assert_eq!(client.base_url(), "http://localhost:4000");
        assert_eq!(client.model(), "test-model");
    }

    #[test]
    fn test_api_key_masked_none() {
        let client = ChatClient::new(test_config("http://localhost:4000", None));
        assert_eq!(client.api_key_masked(), "<none>");
    }

    #[test]
    fn test_api_key_masked_short() {
        let client = ChatClient::new(test_config("http://localhost:4000", Some("abc")));
        assert_eq!(client.api_key_masked(), "***");
    }

    #[test]
    fn test_api_key_masked_normal() {
        let client =
            ChatClient::new(test_config("http://localhost:4000", Some("sk-1234567890abcdef")));
        assert_eq!(client.api_key_masked(), "sk-1...cdef");
    }

    #[test]
    fn test_api_request_serialization() {
        let request = ApiRequest {
            model: "test-model".to_string(),
            messages: vec![ApiMessage {
                role: "user".to_string(),
                content: "analyze".to_string(),
            }],
            max_tokens: Some(5000),
        };

        let json = serde_json::to_string(&request).expect("serialization should succeed");
        assert!(json.contains("\"model\":\"test-model\""));
        assert!(json.contains("\"max_tokens\":5000"));
        assert!(json.contains("\"role\":\"user\""));
    }

    #[tokio::test]
    async fn test_analyze_connection_error_is_transient() {
        // Port 65535 is unlikely to have a listener; the failure must be
        // classified as retryable.
        let client = ChatClient::new(test_config("http://localhost:65535", None));

        let result = client.analyze(&sample_record()).await;

        let err = result.expect_err("analyze should fail without a server");
        assert!(matches!(err, AnalysisError::RequestFailed(_)));
        assert!(err.is_transient(), "connection failure should be transient");
    }
}
