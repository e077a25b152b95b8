use crate::utils::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// 送往模型的生成參數
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionSettings {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub stop_sequences: Vec<String>,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            max_tokens: 256,
            temperature: 0.0,
            top_p: 1.0,
            stop_sequences: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, prompt: &str, settings: &CompletionSettings) -> Result<String>;
}

#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete_chat(
        &self,
        messages: &[ChatMessage],
        settings: &CompletionSettings,
    ) -> Result<String>;
}

#[async_trait]
pub trait TextEmbedding: Send + Sync {
    async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
