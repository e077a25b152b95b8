use thiserror::Error;

/// 規劃失敗的種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanningErrorKind {
    InvalidGoal,
    InvalidPlan,
    InvalidConfiguration,
    CreatePlanError,
}

impl std::fmt::Display for PlanningErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PlanningErrorKind::InvalidGoal => "invalid goal",
            PlanningErrorKind::InvalidPlan => "invalid plan",
            PlanningErrorKind::InvalidConfiguration => "invalid configuration",
            PlanningErrorKind::CreatePlanError => "create plan error",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Service returned HTTP {status}: {message}")]
    ServiceError { status: u16, message: String },

    #[error("No {kind} service registered")]
    ServiceNotFound { kind: String },

    #[error("Service '{id}' is already registered")]
    DuplicateService { id: String },

    #[error("Plugin error: {message}")]
    PluginError { message: String },

    #[error("Function '{function}' not found in plugin '{plugin}'")]
    FunctionNotFound { plugin: String, function: String },

    #[error("Function '{function}' failed: {message}")]
    FunctionInvocationError { function: String, message: String },

    #[error("Planning failed ({kind}): {message}")]
    Planning {
        kind: PlanningErrorKind,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Service,
    Configuration,
    Plugin,
    Planning,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PlannerError {
    pub fn planning(kind: PlanningErrorKind, message: impl Into<String>) -> Self {
        PlannerError::Planning {
            kind,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        PlannerError::ConfigError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            PlannerError::ApiError(_) => ErrorCategory::Network,
            PlannerError::ServiceError { .. } | PlannerError::ServiceNotFound { .. } => {
                ErrorCategory::Service
            }
            PlannerError::ConfigError { .. }
            | PlannerError::ConfigValidationError { .. }
            | PlannerError::InvalidConfigValueError { .. }
            | PlannerError::MissingConfigError { .. }
            | PlannerError::DuplicateService { .. } => ErrorCategory::Configuration,
            PlannerError::PluginError { .. }
            | PlannerError::FunctionNotFound { .. }
            | PlannerError::FunctionInvocationError { .. } => ErrorCategory::Plugin,
            PlannerError::Planning { .. } => ErrorCategory::Planning,
            PlannerError::IoError(_) | PlannerError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network | ErrorCategory::Planning => ErrorSeverity::Medium,
            ErrorCategory::Service => match self {
                PlannerError::ServiceError { status, .. } if *status == 429 || *status >= 500 => {
                    ErrorSeverity::Medium
                }
                _ => ErrorSeverity::High,
            },
            ErrorCategory::Configuration | ErrorCategory::Plugin => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 模型輸出不穩定或服務暫時失敗時值得重試
    pub fn is_retryable(&self) -> bool {
        match self {
            PlannerError::ApiError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            PlannerError::ServiceError { status, .. } => *status == 429 || *status >= 500,
            PlannerError::Planning { kind, .. } => matches!(
                kind,
                PlanningErrorKind::InvalidPlan | PlanningErrorKind::CreatePlanError
            ),
            _ => false,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            PlannerError::ApiError(_) => {
                "Check network connectivity and the service endpoint URL".to_string()
            }
            PlannerError::ServiceError { status: 401, .. }
            | PlannerError::ServiceError { status: 403, .. } => {
                "Check the API key (AZURE_OPENAI_API_KEY)".to_string()
            }
            PlannerError::ServiceError { status: 404, .. } => {
                "Check the deployment name and endpoint".to_string()
            }
            PlannerError::ServiceError { .. } => {
                "The service is busy or failing; retry later".to_string()
            }
            PlannerError::ServiceNotFound { kind } => {
                format!("Register a {} service on the kernel before planning", kind)
            }
            PlannerError::MissingConfigError { field } => {
                format!("Provide '{}' in the config file, CLI flags or environment", field)
            }
            PlannerError::ConfigError { .. }
            | PlannerError::ConfigValidationError { .. }
            | PlannerError::InvalidConfigValueError { .. }
            | PlannerError::DuplicateService { .. } => {
                "Fix the configuration and run again".to_string()
            }
            PlannerError::PluginError { .. } | PlannerError::FunctionNotFound { .. } => {
                "Check plugin and function names (letters, digits and '_' only)".to_string()
            }
            PlannerError::FunctionInvocationError { .. } => {
                "Check the step parameters produced by the planner".to_string()
            }
            PlannerError::Planning {
                kind: PlanningErrorKind::InvalidGoal,
                ..
            } => "Provide a non-empty goal".to_string(),
            PlannerError::Planning { .. } => {
                "Model output is non-deterministic; retry or rephrase the goal".to_string()
            }
            PlannerError::IoError(_) => "Check file paths and permissions".to_string(),
            PlannerError::SerializationError(_) => {
                "The service returned an unexpected payload".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not reach the model service: {}", self),
            ErrorCategory::Service => format!("The model service rejected the request: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Plugin => format!("Plugin problem: {}", self),
            ErrorCategory::Planning => format!("Could not create a plan: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, PlannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_retryable_by_status() {
        let busy = PlannerError::ServiceError {
            status: 429,
            message: "rate limited".into(),
        };
        let denied = PlannerError::ServiceError {
            status: 401,
            message: "bad key".into(),
        };
        assert!(busy.is_retryable());
        assert!(!denied.is_retryable());
        assert_eq!(busy.severity(), ErrorSeverity::Medium);
        assert_eq!(denied.severity(), ErrorSeverity::High);
    }

    #[test]
    fn test_planning_error_category() {
        let err = PlannerError::planning(PlanningErrorKind::InvalidGoal, "The goal specified is empty");
        assert_eq!(err.category(), ErrorCategory::Planning);
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("invalid goal"));
    }
}
