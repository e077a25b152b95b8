use crate::core::kernel::Kernel;
use crate::core::plan_parser::parse_plan;
use crate::domain::model::{FunctionView, Plan};
use crate::domain::ports::CompletionSettings;
use crate::utils::error::{PlannerError, PlanningErrorKind, Result};
use crate::utils::validation::{validate_positive_number, validate_range, Validate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 規劃器自身使用、不應出現在計畫中的插件
pub const RESTRICTED_PLUGIN_NAME: &str = "SequentialPlanner_Excluded";

/// 函式說明在語意記憶中的 collection
pub const PLANNER_MEMORY_COLLECTION: &str = "planner.functions_manual";

const PLANNER_PROMPT: &str = r#"You are a planner. Build a plan that achieves the [GOAL] using only the functions listed under [AVAILABLE FUNCTIONS].

Rules:
- Respond with a single JSON object and nothing else.
- Name each function by its fully qualified name, exactly as listed.
- Put the function inputs in "args". Leave out inputs that should keep their default value.
- To pass the output of a step to a later step, set "set_context_variable" to a variable name on the producing step and use "$NAME" as the argument value on the consuming step.
- Set "append_to_result" to a variable name when the output of a step belongs in the final result.
- Never invent functions. If the goal cannot be achieved with the listed functions, respond with {"plan": []}.

Output format:
{"plan": [{"function": "Plugin.Function", "args": {"input": "..."}, "set_context_variable": "OPTIONAL", "append_to_result": "OPTIONAL"}]}

[AVAILABLE FUNCTIONS]
{{$available_functions}}

[GOAL]
{{$goal}}

[PLAN]
"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequentialPlannerConfig {
    pub relevancy_threshold: Option<f64>,
    pub max_relevant_functions: usize,
    pub excluded_plugins: Vec<String>,
    pub excluded_functions: Vec<String>,
    pub included_functions: Vec<String>,
    pub max_tokens: u32,
    pub allow_missing_functions: bool,
}

impl Default for SequentialPlannerConfig {
    fn default() -> Self {
        Self {
            relevancy_threshold: None,
            max_relevant_functions: 100,
            excluded_plugins: Vec::new(),
            excluded_functions: Vec::new(),
            included_functions: Vec::new(),
            max_tokens: 1024,
            allow_missing_functions: false,
        }
    }
}

impl SequentialPlannerConfig {
    pub fn with_relevancy(relevancy_threshold: f64, max_relevant_functions: usize) -> Self {
        Self {
            relevancy_threshold: Some(relevancy_threshold),
            max_relevant_functions,
            ..Self::default()
        }
    }
}

impl Validate for SequentialPlannerConfig {
    fn validate(&self) -> Result<()> {
        if let Some(threshold) = self.relevancy_threshold {
            validate_range("planner.relevancy_threshold", threshold, 0.0, 1.0)?;
        }
        validate_positive_number("planner.max_relevant_functions", self.max_relevant_functions, 1)?;
        validate_positive_number("planner.max_tokens", self.max_tokens as usize, 1)?;
        Ok(())
    }
}

/// 請模型把目標拆成依序呼叫的插件函式
pub struct SequentialPlanner {
    kernel: Arc<Kernel>,
    config: SequentialPlannerConfig,
}

impl SequentialPlanner {
    pub fn new(kernel: Arc<Kernel>, config: Option<SequentialPlannerConfig>) -> Self {
        let mut config = config.unwrap_or_default();
        if !config
            .excluded_plugins
            .iter()
            .any(|p| p == RESTRICTED_PLUGIN_NAME)
        {
            config.excluded_plugins.push(RESTRICTED_PLUGIN_NAME.to_string());
        }
        Self { kernel, config }
    }

    pub fn config(&self) -> &SequentialPlannerConfig {
        &self.config
    }

    pub fn kernel(&self) -> &Arc<Kernel> {
        &self.kernel
    }

    pub async fn create_plan(&self, goal: &str) -> Result<Plan> {
        let goal = goal.trim();
        if goal.is_empty() {
            return Err(PlannerError::planning(
                PlanningErrorKind::InvalidGoal,
                "The goal specified is empty",
            ));
        }
        self.config.validate().map_err(|e| {
            PlannerError::planning(PlanningErrorKind::InvalidConfiguration, e.to_string())
        })?;

        tracing::info!("🧭 Creating plan for goal: {}", goal);

        let manual = self.functions_manual(goal).await?;
        let prompt = render_prompt(goal, &manual);
        let settings = CompletionSettings {
            max_tokens: self.config.max_tokens,
            temperature: 0.0,
            top_p: 0.0,
            stop_sequences: Vec::new(),
        };

        let response = self.kernel.complete(&prompt, &settings).await?;
        tracing::debug!("📝 Planner response: {}", response.trim());

        let plugins = self.kernel.plugins();
        let plan = parse_plan(
            response.trim(),
            goal,
            |plugin, function| {
                plugins
                    .get_function(plugin, function)
                    .map(|f| f.describe().clone())
            },
            self.config.allow_missing_functions,
        )?;

        if plan.steps().is_empty() {
            return Err(PlannerError::planning(
                PlanningErrorKind::CreatePlanError,
                format!(
                    "Not possible to create plan for goal with available functions.\nGoal:{}\nFunctions:\n{}",
                    goal, manual
                ),
            ));
        }

        tracing::info!("✅ Plan created with {} steps", plan.steps().len());
        Ok(plan)
    }

    pub async fn functions_manual(&self, goal: &str) -> Result<String> {
        let functions = self.available_functions(goal).await?;
        Ok(functions
            .iter()
            .map(FunctionView::to_manual_string)
            .collect::<Vec<_>>()
            .join("\n\n"))
    }

    /// 排除指定插件/函式後的可用函式；設定相關性門檻且有語意記憶時再以目標做篩選
    pub async fn available_functions(&self, goal: &str) -> Result<Vec<FunctionView>> {
        let available: Vec<FunctionView> = self
            .kernel
            .functions_view()
            .into_iter()
            .filter(|f| {
                !self.config.excluded_plugins.contains(&f.plugin_name)
                    && !self.config.excluded_functions.contains(&f.name)
            })
            .collect();

        let Some(threshold) = self.config.relevancy_threshold else {
            return Ok(available);
        };
        let Some(memory) = self.kernel.memory() else {
            tracing::debug!("No semantic memory registered, skipping relevance filtering");
            return Ok(available);
        };

        for function in &available {
            let key = function.fully_qualified_name();
            if !memory.contains(PLANNER_MEMORY_COLLECTION, &key).await {
                memory
                    .save_information(
                        PLANNER_MEMORY_COLLECTION,
                        &key,
                        &function.to_embedding_string(),
                        &function.description,
                    )
                    .await?;
            }
        }

        let hits = memory
            .search(
                PLANNER_MEMORY_COLLECTION,
                goal,
                self.config.max_relevant_functions,
                threshold,
            )
            .await?;

        let mut relevant: Vec<FunctionView> = available
            .iter()
            .filter(|f| {
                let key = f.fully_qualified_name();
                hits.iter().any(|hit| hit.id == key)
            })
            .cloned()
            .collect();

        for name in &self.config.included_functions {
            if !relevant.iter().any(|f| &f.name == name) {
                relevant.extend(available.iter().filter(|f| &f.name == name).cloned());
            }
        }

        relevant.sort_by(|a, b| {
            (a.plugin_name.as_str(), a.name.as_str()).cmp(&(b.plugin_name.as_str(), b.name.as_str()))
        });

        tracing::debug!(
            "🔎 {} of {} functions relevant to the goal",
            relevant.len(),
            available.len()
        );
        Ok(relevant)
    }
}

pub fn render_prompt(goal: &str, manual: &str) -> String {
    PLANNER_PROMPT
        .replace("{{$available_functions}}", manual)
        .replace("{{$goal}}", goal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::plugin::{KernelFunction, Plugin};
    use crate::domain::model::{ParameterView, GLOBAL_PLUGIN_NAME};
    use crate::domain::ports::{TextCompletion, TextEmbedding};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// 記錄收到的提示並回傳固定答案
    struct Scripted {
        response: String,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(response: &str) -> Arc<Self> {
            Arc::new(Self {
                response: response.to_string(),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextCompletion for Scripted {
        async fn complete(&self, prompt: &str, settings: &CompletionSettings) -> Result<String> {
            assert_eq!(settings.temperature, 0.0);
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.response.clone())
        }
    }

    struct KeywordEmbedding;

    #[async_trait]
    impl TextEmbedding for KeywordEmbedding {
        async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let t = t.to_lowercase();
                    vec![t.contains("email") as u8 as f32, t.contains("story") as u8 as f32]
                })
                .collect())
        }
    }

    struct Tools;

    impl Plugin for Tools {
        fn functions(&self) -> Vec<KernelFunction> {
            vec![
                KernelFunction::native("SendEmail", "Send an email", |v| Ok(v.input().to_string()))
                    .with_parameter(ParameterView::new("input", "Body")),
                KernelFunction::native("TellStory", "Tell a story", |v| Ok(v.input().to_string()))
                    .with_parameter(ParameterView::new("input", "Topic")),
            ]
        }
    }

    fn kernel_with(response: &str, embeddings: bool) -> (Arc<Kernel>, Arc<Scripted>) {
        let service = Scripted::new(response);
        let mut kernel = Kernel::new();
        kernel
            .add_text_completion_service("text_completion", service.clone())
            .unwrap();
        if embeddings {
            kernel
                .add_text_embedding_generation_service("text_embedding", Arc::new(KeywordEmbedding))
                .unwrap();
        }
        kernel.import_plugin(Tools, None).unwrap();
        (Arc::new(kernel), service)
    }

    #[tokio::test]
    async fn test_empty_goal_rejected() {
        let (kernel, service) = kernel_with("{}", false);
        let planner = SequentialPlanner::new(kernel, None);

        let err = planner.create_plan("   ").await.unwrap_err();
        assert!(matches!(
            err,
            PlannerError::Planning { kind: PlanningErrorKind::InvalidGoal, .. }
        ));
        assert!(service.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prompt_contains_goal_and_manual() {
        let (kernel, service) = kernel_with(r#"{"plan":[{"function":"SendEmail"}]}"#, false);
        let planner = SequentialPlanner::new(kernel, None);

        let plan = planner.create_plan("Email Kai").await.unwrap();
        assert!(plan.has_step("SendEmail", GLOBAL_PLUGIN_NAME));

        let prompts = service.prompts.lock().unwrap();
        assert!(prompts[0].contains("[GOAL]\nEmail Kai"));
        assert!(prompts[0].contains("_GLOBAL_FUNCTIONS_.SendEmail:"));
        assert!(prompts[0].contains("_GLOBAL_FUNCTIONS_.TellStory:"));
    }

    #[tokio::test]
    async fn test_no_steps_is_create_plan_error() {
        let (kernel, _) = kernel_with(r#"{"plan": []}"#, false);
        let planner = SequentialPlanner::new(kernel, None);

        let err = planner.create_plan("Fly to the moon").await.unwrap_err();
        assert!(matches!(
            err,
            PlannerError::Planning { kind: PlanningErrorKind::CreatePlanError, .. }
        ));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_excluded_functions_not_offered() {
        let (kernel, _) = kernel_with("{}", false);
        let config = SequentialPlannerConfig {
            excluded_functions: vec!["TellStory".to_string()],
            ..Default::default()
        };
        let planner = SequentialPlanner::new(kernel, Some(config));

        let names: Vec<String> = planner
            .available_functions("anything")
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["SendEmail"]);
        assert!(planner
            .config()
            .excluded_plugins
            .contains(&RESTRICTED_PLUGIN_NAME.to_string()));
    }

    #[tokio::test]
    async fn test_relevance_filtering() {
        let (kernel, _) = kernel_with("{}", true);
        let planner = SequentialPlanner::new(
            kernel.clone(),
            Some(SequentialPlannerConfig::with_relevancy(0.65, 30)),
        );

        let names: Vec<String> = planner
            .available_functions("send an email to Kai")
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["SendEmail"]);

        // 已記住的函式不會重新寫入
        let memory = kernel.memory().unwrap();
        assert!(memory.contains(PLANNER_MEMORY_COLLECTION, "_GLOBAL_FUNCTIONS_.TellStory").await);
    }

    #[tokio::test]
    async fn test_included_functions_survive_filtering() {
        let (kernel, _) = kernel_with("{}", true);
        let config = SequentialPlannerConfig {
            included_functions: vec!["TellStory".to_string()],
            ..SequentialPlannerConfig::with_relevancy(0.65, 30)
        };
        let planner = SequentialPlanner::new(kernel, Some(config));

        let names: Vec<String> = planner
            .available_functions("send an email to Kai")
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["SendEmail", "TellStory"]);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let (kernel, _) = kernel_with("{}", false);
        let planner = SequentialPlanner::new(
            kernel,
            Some(SequentialPlannerConfig::with_relevancy(1.5, 30)),
        );
        let err = planner.create_plan("Email Kai").await.unwrap_err();
        assert!(matches!(
            err,
            PlannerError::Planning { kind: PlanningErrorKind::InvalidConfiguration, .. }
        ));
    }
}
