use crate::adapters::azure_openai::{
    AzureChatCompletion, AzureTextEmbedding, DEFAULT_API_VERSION, DEFAULT_TIMEOUT_SECONDS,
};
use crate::config::azure::AzureOpenAiSettings;
use crate::core::kernel::Kernel;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use std::sync::Arc;
use std::time::Duration;

pub const CHAT_DEPLOYMENT: &str = "gpt-35-turbo";
pub const EMBEDDING_DEPLOYMENT: &str = "text-embedding-ada-002";

pub const CHAT_SERVICE_ID: &str = "chat_completion";
pub const TEXT_SERVICE_ID: &str = "text_completion";
pub const EMBEDDING_SERVICE_ID: &str = "text_embedding";

#[derive(Debug, Clone, PartialEq)]
pub struct KernelOptions {
    pub use_embeddings: bool,
    pub use_chat_model: bool,
    pub chat_deployment: String,
    pub embedding_deployment: String,
    pub api_version: String,
    pub timeout: Duration,
}

impl Default for KernelOptions {
    fn default() -> Self {
        Self {
            use_embeddings: false,
            use_chat_model: false,
            chat_deployment: CHAT_DEPLOYMENT.to_string(),
            embedding_deployment: EMBEDDING_DEPLOYMENT.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
        }
    }
}

/// 建立 kernel 並註冊一個補全服務 (chat 或 text)，需要時再加上 embedding 服務
pub fn initialize_kernel(
    settings: &AzureOpenAiSettings,
    use_embeddings: bool,
    use_chat_model: bool,
) -> Result<Kernel> {
    initialize_kernel_with(
        settings,
        &KernelOptions {
            use_embeddings,
            use_chat_model,
            ..KernelOptions::default()
        },
    )
}

pub fn initialize_kernel_with(settings: &AzureOpenAiSettings, options: &KernelOptions) -> Result<Kernel> {
    settings.validate()?;

    let mut kernel = Kernel::new();
    let completion = Arc::new(
        AzureChatCompletion::new(&options.chat_deployment, &settings.endpoint, &settings.api_key)
            .with_api_version(&options.api_version)
            .with_timeout(options.timeout)?,
    );

    if options.use_chat_model {
        kernel.add_chat_service(CHAT_SERVICE_ID, completion)?;
    } else {
        kernel.add_text_completion_service(TEXT_SERVICE_ID, completion)?;
    }

    if options.use_embeddings {
        let embedding = AzureTextEmbedding::new(
            &options.embedding_deployment,
            &settings.endpoint,
            &settings.api_key,
        )
        .with_api_version(&options.api_version)
        .with_timeout(options.timeout)?;
        kernel.add_text_embedding_generation_service(EMBEDDING_SERVICE_ID, Arc::new(embedding))?;
    }

    tracing::info!(
        "🔧 Kernel initialized (chat: {}, embeddings: {}, services: {:?})",
        options.use_chat_model,
        options.use_embeddings,
        kernel.service_ids()
    );
    Ok(kernel)
}
