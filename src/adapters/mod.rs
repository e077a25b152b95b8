// Adapters layer: concrete implementations for external systems (hosted model services over http).

pub mod azure_openai;

pub use azure_openai::{AzureChatCompletion, AzureTextCompletion, AzureTextEmbedding};
