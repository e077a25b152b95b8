use crate::config::toml_config::{LoggingConfig, TomlConfig};
use crate::utils::error::Result;
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "sequential-planner")]
#[command(about = "Ask a hosted language model for an ordered plan of plugin functions")]
pub struct CliConfig {
    /// Natural-language goal to plan for
    pub goal: String,

    /// Path to TOML configuration file (defaults to AZURE_OPENAI_* environment variables)
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(long, help = "Service endpoint, overrides the config")]
    pub endpoint: Option<String>,

    #[arg(long, help = "API key, overrides the config")]
    pub api_key: Option<String>,

    #[arg(long, help = "Completion deployment name")]
    pub deployment: Option<String>,

    #[arg(long, help = "Register the completion service as a chat service")]
    pub chat: bool,

    #[arg(long, help = "Register a text embedding service for relevance filtering")]
    pub embeddings: bool,

    #[arg(long)]
    pub relevancy_threshold: Option<f64>,

    #[arg(long)]
    pub max_relevant_functions: Option<usize>,

    #[arg(long, help = "Plan creation attempts")]
    pub retries: Option<u32>,

    #[arg(long, help = "Run the plan after creating it")]
    pub execute: bool,

    #[arg(long, default_value = "", help = "Initial input when executing the plan")]
    pub input: String,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log as JSON lines")]
    pub json_logs: bool,
}

impl CliConfig {
    /// 載入設定檔 (或環境變數) 後套用命令列覆蓋
    pub fn resolve(&self) -> Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::from_env()?,
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut TomlConfig) {
        if let Some(endpoint) = &self.endpoint {
            config.service.endpoint = endpoint.clone();
        }
        if let Some(api_key) = &self.api_key {
            config.service.api_key = api_key.clone();
        }
        if let Some(deployment) = &self.deployment {
            config.service.deployment_name = Some(deployment.clone());
        }
        if self.chat {
            config.service.use_chat_model = Some(true);
        }
        if self.embeddings {
            config.service.use_embeddings = Some(true);
        }
        if let Some(threshold) = self.relevancy_threshold {
            config.planner.relevancy_threshold = Some(threshold);
        }
        if let Some(max) = self.max_relevant_functions {
            config.planner.max_relevant_functions = max;
        }
        if let Some(retries) = self.retries {
            config.retry.attempts = retries;
        }
        // 旗標只能開啟日誌選項，不會關掉設定檔中已開啟的項目
        if self.verbose || self.json_logs {
            let logging = config.logging.get_or_insert_with(LoggingConfig::default);
            if self.verbose {
                logging.verbose = Some(true);
            }
            if self.json_logs {
                logging.json = Some(true);
            }
        }
    }
}
