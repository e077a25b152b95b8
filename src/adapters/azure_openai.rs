use crate::domain::ports::{
    ChatCompletion, ChatMessage, CompletionSettings, TextCompletion, TextEmbedding,
};
use crate::utils::error::{PlannerError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_VERSION: &str = "2023-05-15";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

/// Azure OpenAI 部署的連線資訊
#[derive(Clone)]
struct AzureDeployment {
    client: Client,
    deployment_name: String,
    endpoint: String,
    api_key: String,
    api_version: String,
}

impl std::fmt::Debug for AzureDeployment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureDeployment")
            .field("deployment_name", &self.deployment_name)
            .field("endpoint", &self.endpoint)
            .field("api_key", &"***")
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl AzureDeployment {
    fn new(deployment_name: &str, endpoint: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            deployment_name: deployment_name.to_string(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    fn url(&self, operation: &str) -> String {
        format!(
            "{}/openai/deployments/{}/{}?api-version={}",
            self.endpoint, self.deployment_name, operation, self.api_version
        )
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        operation: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.url(operation);
        tracing::debug!("📡 POST {} (deployment: {})", url, self.deployment_name);

        let response = self
            .client
            .post(&url)
            .header("api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("📡 Response status: {}", status);

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PlannerError::ServiceError {
                status: status.as_u16(),
                message: extract_error_message(&text),
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

fn empty_choices() -> PlannerError {
    PlannerError::ServiceError {
        status: 200,
        message: "response contained no choices".to_string(),
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    text: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

fn stop_sequences(settings: &CompletionSettings) -> Option<&[String]> {
    if settings.stop_sequences.is_empty() {
        None
    } else {
        Some(&settings.stop_sequences)
    }
}

macro_rules! deployment_builders {
    ($ty:ident) => {
        impl $ty {
            pub fn new(deployment_name: &str, endpoint: &str, api_key: &str) -> Self {
                Self {
                    inner: AzureDeployment::new(deployment_name, endpoint, api_key),
                }
            }

            pub fn with_api_version(mut self, api_version: &str) -> Self {
                self.inner.api_version = api_version.to_string();
                self
            }

            pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
                self.inner.client = Client::builder().timeout(timeout).build()?;
                Ok(self)
            }

            pub fn deployment_name(&self) -> &str {
                &self.inner.deployment_name
            }
        }
    };
}

/// Chat 部署；同時可當作文字補全服務使用 (提示以單一 user 訊息送出)
#[derive(Debug, Clone)]
pub struct AzureChatCompletion {
    inner: AzureDeployment,
}

deployment_builders!(AzureChatCompletion);

#[async_trait]
impl ChatCompletion for AzureChatCompletion {
    async fn complete_chat(
        &self,
        messages: &[ChatMessage],
        settings: &CompletionSettings,
    ) -> Result<String> {
        let request = ChatRequest {
            messages,
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            top_p: settings.top_p,
            stop: stop_sequences(settings),
        };

        let response: ChatResponse = self.inner.post("chat/completions", &request).await?;
        let choice = response.choices.into_iter().next().ok_or_else(empty_choices)?;
        Ok(choice.message.content.unwrap_or_default())
    }
}

#[async_trait]
impl TextCompletion for AzureChatCompletion {
    async fn complete(&self, prompt: &str, settings: &CompletionSettings) -> Result<String> {
        self.complete_chat(&[ChatMessage::user(prompt)], settings).await
    }
}

/// 傳統 completions 端點
#[derive(Debug, Clone)]
pub struct AzureTextCompletion {
    inner: AzureDeployment,
}

deployment_builders!(AzureTextCompletion);

#[async_trait]
impl TextCompletion for AzureTextCompletion {
    async fn complete(&self, prompt: &str, settings: &CompletionSettings) -> Result<String> {
        let request = CompletionRequest {
            prompt,
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            top_p: settings.top_p,
            stop: stop_sequences(settings),
        };

        let response: CompletionResponse = self.inner.post("completions", &request).await?;
        let choice = response.choices.into_iter().next().ok_or_else(empty_choices)?;
        Ok(choice.text)
    }
}

#[derive(Debug, Clone)]
pub struct AzureTextEmbedding {
    inner: AzureDeployment,
}

deployment_builders!(AzureTextEmbedding);

#[async_trait]
impl TextEmbedding for AzureTextEmbedding {
    async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response: EmbeddingResponse = self
            .inner
            .post("embeddings", &EmbeddingRequest { input: texts })
            .await?;

        let mut data = response.data;
        if data.len() != texts.len() {
            return Err(PlannerError::ServiceError {
                status: 200,
                message: format!(
                    "expected {} embeddings, received {}",
                    texts.len(),
                    data.len()
                ),
            });
        }
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deployment_url() {
        let chat = AzureChatCompletion::new("gpt-35-turbo", "https://contoso.openai.azure.com/", "key");
        assert_eq!(
            chat.inner.url("chat/completions"),
            "https://contoso.openai.azure.com/openai/deployments/gpt-35-turbo/chat/completions?api-version=2023-05-15"
        );

        let chat = chat.with_api_version("2024-02-01");
        assert!(chat.inner.url("chat/completions").ends_with("api-version=2024-02-01"));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let chat = AzureChatCompletion::new("gpt-35-turbo", "https://contoso.openai.azure.com", "super-secret-key");
        let embedding = AzureTextEmbedding::new("ada", "https://contoso.openai.azure.com", "super-secret-key");

        for debug in [format!("{:?}", chat), format!("{:?}", embedding)] {
            assert!(!debug.contains("super-secret-key"));
            assert!(debug.contains("***"));
        }
    }

    #[test]
    fn test_extract_error_message() {
        let body = r#"{"error":{"code":"401","message":"Access denied due to invalid subscription key."}}"#;
        assert_eq!(
            extract_error_message(body),
            "Access denied due to invalid subscription key."
        );
        assert_eq!(extract_error_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(extract_error_message(""), "empty response body");
    }

    #[test]
    fn test_chat_request_omits_empty_stop() {
        let messages = [ChatMessage::user("hi")];
        let settings = CompletionSettings::default();
        let request = ChatRequest {
            messages: &messages,
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            top_p: settings.top_p,
            stop: stop_sequences(&settings),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("stop").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
    }
}
