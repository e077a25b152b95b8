use crate::utils::error::{PlannerError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_url, Validate};
use serde::{Deserialize, Serialize};

pub const ENV_DEPLOYMENT_NAME: &str = "AZURE_OPENAI_DEPLOYMENT_NAME";
pub const ENV_API_KEY: &str = "AZURE_OPENAI_API_KEY";
pub const ENV_ENDPOINT: &str = "AZURE_OPENAI_ENDPOINT";

/// 託管模型的連線設定：(識別名稱, 金鑰, 端點)
#[derive(Clone, Serialize, Deserialize)]
pub struct AzureOpenAiSettings {
    pub deployment_name: String,
    pub api_key: String,
    pub endpoint: String,
}

impl std::fmt::Debug for AzureOpenAiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureOpenAiSettings")
            .field("deployment_name", &self.deployment_name)
            .field("api_key", &"***")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl AzureOpenAiSettings {
    pub fn new(deployment_name: &str, api_key: &str, endpoint: &str) -> Self {
        Self {
            deployment_name: deployment_name.to_string(),
            api_key: api_key.to_string(),
            endpoint: endpoint.to_string(),
        }
    }

    /// 從環境變數讀取；缺少金鑰或端點時回傳 MissingConfigError
    pub fn from_env() -> Result<Self> {
        let read = |name: &str| -> Result<String> {
            std::env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| PlannerError::MissingConfigError {
                    field: name.to_string(),
                })
        };

        Ok(Self {
            deployment_name: std::env::var(ENV_DEPLOYMENT_NAME).unwrap_or_default(),
            api_key: read(ENV_API_KEY)?,
            endpoint: read(ENV_ENDPOINT)?,
        })
    }
}

impl Validate for AzureOpenAiSettings {
    fn validate(&self) -> Result<()> {
        validate_url("service.endpoint", &self.endpoint)?;
        validate_non_empty_string("service.api_key", &self.api_key)?;
        if self.api_key.starts_with("${") {
            return Err(PlannerError::ConfigValidationError {
                field: "service.api_key".to_string(),
                message: format!("environment variable {} was not substituted", self.api_key),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_key() {
        let settings = AzureOpenAiSettings::new("", "secret-key", "https://contoso.openai.azure.com");
        assert!(!format!("{:?}", settings).contains("secret-key"));
    }

    #[test]
    fn test_validate() {
        assert!(AzureOpenAiSettings::new("", "key", "https://contoso.openai.azure.com")
            .validate()
            .is_ok());
        assert!(AzureOpenAiSettings::new("", "", "https://contoso.openai.azure.com")
            .validate()
            .is_err());
        assert!(AzureOpenAiSettings::new("", "${AZURE_OPENAI_API_KEY}", "https://contoso.openai.azure.com")
            .validate()
            .is_err());
        assert!(AzureOpenAiSettings::new("", "key", "contoso").validate().is_err());
    }
}
