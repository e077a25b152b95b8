use crate::adapters::azure_openai::{DEFAULT_API_VERSION, DEFAULT_TIMEOUT_SECONDS};
use crate::config::azure::{AzureOpenAiSettings, ENV_DEPLOYMENT_NAME};
use crate::core::planner::SequentialPlannerConfig;
use crate::core::retry::{RetryPolicy, DEFAULT_RETRIES};
use crate::core::setup::{KernelOptions, CHAT_DEPLOYMENT, EMBEDDING_DEPLOYMENT};
use crate::utils::error::{PlannerError, Result};
use crate::utils::validation::{validate_positive_number, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub service: ServiceConfig,
    #[serde(default)]
    pub planner: SequentialPlannerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub endpoint: String,
    pub api_key: String,
    pub deployment_name: Option<String>,
    pub embedding_deployment_name: Option<String>,
    pub api_version: Option<String>,
    pub use_chat_model: Option<bool>,
    pub use_embeddings: Option<bool>,
    pub timeout_seconds: Option<u64>,
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"***")
            .field("deployment_name", &self.deployment_name)
            .field("embedding_deployment_name", &self.embedding_deployment_name)
            .field("api_version", &self.api_version)
            .field("use_chat_model", &self.use_chat_model)
            .field("use_embeddings", &self.use_embeddings)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub attempts: u32,
    pub delay_unit_ms: Option<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_RETRIES,
            delay_unit_ms: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub verbose: Option<bool>,
    pub json: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(PlannerError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| PlannerError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 沒有設定檔時，直接以環境變數組成配置
    pub fn from_env() -> Result<Self> {
        let settings = AzureOpenAiSettings::from_env()?;
        Ok(Self {
            service: ServiceConfig {
                endpoint: settings.endpoint,
                api_key: settings.api_key,
                deployment_name: std::env::var(ENV_DEPLOYMENT_NAME)
                    .ok()
                    .filter(|v| !v.trim().is_empty()),
                embedding_deployment_name: None,
                api_version: None,
                use_chat_model: None,
                use_embeddings: None,
                timeout_seconds: None,
            },
            planner: SequentialPlannerConfig::default(),
            retry: RetryConfig::default(),
            logging: None,
        })
    }

    /// 替換環境變數 (例如 ${AZURE_OPENAI_API_KEY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| PlannerError::config(e.to_string()))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        self.settings().validate()?;
        self.planner.validate()?;
        validate_positive_number("retry.attempts", self.retry.attempts as usize, 1)?;
        if let Some(timeout) = self.service.timeout_seconds {
            validate_positive_number("service.timeout_seconds", timeout as usize, 1)?;
        }
        Ok(())
    }

    pub fn settings(&self) -> AzureOpenAiSettings {
        AzureOpenAiSettings::new(
            self.chat_deployment(),
            &self.service.api_key,
            &self.service.endpoint,
        )
    }

    pub fn chat_deployment(&self) -> &str {
        self.service.deployment_name.as_deref().unwrap_or(CHAT_DEPLOYMENT)
    }

    pub fn kernel_options(&self) -> KernelOptions {
        KernelOptions {
            use_embeddings: self.use_embeddings(),
            use_chat_model: self.service.use_chat_model.unwrap_or(false),
            chat_deployment: self.chat_deployment().to_string(),
            embedding_deployment: self
                .service
                .embedding_deployment_name
                .clone()
                .unwrap_or_else(|| EMBEDDING_DEPLOYMENT.to_string()),
            api_version: self
                .service
                .api_version
                .clone()
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            timeout: Duration::from_secs(self.service.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS)),
        }
    }

    /// 設定了相關性門檻就需要 embedding 服務
    pub fn use_embeddings(&self) -> bool {
        self.service
            .use_embeddings
            .unwrap_or(self.planner.relevancy_threshold.is_some())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let policy = RetryPolicy::new(self.retry.attempts);
        match self.retry.delay_unit_ms {
            Some(ms) => policy.with_delay_unit(Duration::from_millis(ms)),
            None => policy,
        }
    }

    pub fn verbose(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.verbose).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
