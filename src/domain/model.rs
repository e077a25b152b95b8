use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// 未指定名稱時匯入插件所使用的名稱
pub const GLOBAL_PLUGIN_NAME: &str = "_GLOBAL_FUNCTIONS_";

/// 預設的主要輸入變數
pub const INPUT_VARIABLE: &str = "input";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterView {
    pub name: String,
    pub description: String,
    pub default_value: Option<String>,
}

impl ParameterView {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            default_value: None,
        }
    }

    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionView {
    pub name: String,
    pub plugin_name: String,
    pub description: String,
    pub parameters: Vec<ParameterView>,
    pub is_semantic: bool,
}

impl FunctionView {
    pub fn fully_qualified_name(&self) -> String {
        format!("{}.{}", self.plugin_name, self.name)
    }

    /// 規劃提示中列出的函式說明
    pub fn to_manual_string(&self) -> String {
        let inputs = self
            .parameters
            .iter()
            .map(|p| match p.default_value.as_deref() {
                Some(default) if !default.is_empty() => format!(
                    "  - {}: {} (default value: {})",
                    p.name, p.description, default
                ),
                _ => format!("  - {}: {}", p.name, p.description),
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "{}:\n  description: {}\n  inputs:\n{}\n",
            self.fully_qualified_name(),
            self.description,
            inputs
        )
    }

    /// 相關性搜尋時拿去做 embedding 的文字
    pub fn to_embedding_string(&self) -> String {
        let inputs = self
            .parameters
            .iter()
            .map(|p| format!("    - {}: {}", p.name, p.description))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "{}:\n  description: {}\n  inputs:\n{}\n",
            self.name, self.description, inputs
        )
    }
}

/// 保持插入順序、鍵不分大小寫的變數集合
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextVariables {
    entries: Vec<(String, String)>,
}

impl ContextVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(input: impl Into<String>) -> Self {
        let mut variables = Self::new();
        variables.set(INPUT_VARIABLE, input);
        variables
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(&name))
        {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn input(&self) -> &str {
        self.get(INPUT_VARIABLE).unwrap_or_default()
    }

    pub fn update(&mut self, other: &ContextVariables) {
        for (name, value) in other.iter() {
            self.set(name, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::ops::Index<&str> for ContextVariables {
    type Output = str;

    fn index(&self, name: &str) -> &str {
        match self.get(name) {
            Some(value) => value,
            None => panic!("context variable '{}' is not set", name),
        }
    }
}

impl Serialize for ContextVariables {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanStep {
    pub name: String,
    pub plugin_name: String,
    pub description: String,
    pub parameters: ContextVariables,
    pub outputs: Vec<String>,
}

impl PlanStep {
    /// 找不到對應函式時只保留目標文字的步驟
    pub fn from_goal(goal: impl Into<String>) -> Self {
        let goal = goal.into();
        Self {
            name: String::new(),
            plugin_name: String::new(),
            description: goal,
            parameters: ContextVariables::new(),
            outputs: Vec::new(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        !self.name.is_empty()
    }

    pub fn matches(&self, function_name: &str, plugin_name: &str) -> bool {
        self.name == function_name && self.plugin_name == plugin_name
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub goal: String,
    steps: Vec<PlanStep>,
    pub outputs: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Plan {
    pub fn from_goal(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            steps: Vec::new(),
            outputs: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn add_step(&mut self, step: PlanStep) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn has_step(&self, function_name: &str, plugin_name: &str) -> bool {
        self.steps
            .iter()
            .any(|step| step.matches(function_name, plugin_name))
    }
}
