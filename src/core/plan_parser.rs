use crate::domain::model::{ContextVariables, FunctionView, Plan, PlanStep, GLOBAL_PLUGIN_NAME};
use crate::utils::error::{PlannerError, PlanningErrorKind, Result};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::OnceLock;

#[derive(Debug, Deserialize)]
struct RawPlan {
    plan: Vec<RawStep>,
}

#[derive(Debug, Deserialize)]
struct RawStep {
    #[serde(default)]
    function: String,
    #[serde(default)]
    args: serde_json::Map<String, Value>,
    #[serde(default, alias = "setContextVariable")]
    set_context_variable: Option<String>,
    #[serde(default, alias = "appendToResult")]
    append_to_result: Option<String>,
}

fn fenced_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("fenced block pattern is valid")
    })
}

/// 從文字中找出第一個能解析為計畫的 JSON 物件；前後的說明文字 (含大括號) 都略過
fn first_plan_in(text: &str) -> std::result::Result<RawPlan, Option<serde_json::Error>> {
    let mut last_error = None;
    for (start, _) in text.match_indices('{') {
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<RawPlan>();
        match stream.next() {
            Some(Ok(plan)) => return Ok(plan),
            Some(Err(e)) => last_error = Some(e),
            None => {}
        }
    }
    Err(last_error)
}

/// 取出模型回覆中的計畫 (``` 區塊優先，否則掃描整段回覆)
fn extract_plan(response: &str) -> std::result::Result<RawPlan, Option<serde_json::Error>> {
    if let Some(block) = fenced_block().captures(response).and_then(|caps| caps.get(1)) {
        if let Ok(plan) = first_plan_in(block.as_str()) {
            return Ok(plan);
        }
    }
    first_plan_in(response)
}

/// "Plugin.Function" 拆成 (plugin, function)；沒有插件時視為全域函式
pub fn split_function_name(qualified: &str) -> (&str, &str) {
    match qualified.split_once('.') {
        Some((plugin, function)) if !plugin.is_empty() => (plugin, function),
        Some((_, function)) => (GLOBAL_PLUGIN_NAME, function),
        None => (GLOBAL_PLUGIN_NAME, qualified),
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// 將模型回覆轉為 Plan
///
/// `lookup` 依 (plugin, function) 找出函式描述。步驟參數先填入函式宣告的預設值，
/// 再由模型提供的 args 覆寫。
pub fn parse_plan<F>(response: &str, goal: &str, lookup: F, allow_missing_functions: bool) -> Result<Plan>
where
    F: Fn(&str, &str) -> Option<FunctionView>,
{
    let raw = extract_plan(response).map_err(|e| {
        let message = match e {
            Some(e) => format!("Failed to parse plan JSON ({}): '{}'", e, response.trim()),
            None => format!("Failed to find a plan in the response: '{}'", response.trim()),
        };
        PlannerError::planning(PlanningErrorKind::InvalidPlan, message)
    })?;

    let mut plan = Plan::from_goal(goal);

    for raw_step in raw.plan {
        let qualified = raw_step.function.trim();
        let (plugin_name, function_name) = split_function_name(qualified);

        let Some(view) = lookup(plugin_name, function_name).filter(|_| !function_name.is_empty()) else {
            if allow_missing_functions {
                tracing::warn!("⚠️ Function '{}' not found, keeping it as a goal step", qualified);
                plan.add_step(PlanStep::from_goal(qualified));
                continue;
            }
            return Err(PlannerError::planning(
                PlanningErrorKind::InvalidPlan,
                format!(
                    "Failed to find function '{}' in plugin '{}'.",
                    function_name, plugin_name
                ),
            ));
        };

        let mut parameters = ContextVariables::new();
        for parameter in &view.parameters {
            parameters.set(
                parameter.name.as_str(),
                parameter.default_value.clone().unwrap_or_default(),
            );
        }
        for (name, value) in &raw_step.args {
            if let Some(value) = value_to_string(value) {
                parameters.set(name.as_str(), value);
            }
        }

        let mut outputs = Vec::new();
        if let Some(variable) = raw_step.set_context_variable.filter(|v| !v.is_empty()) {
            outputs.push(variable);
        }
        if let Some(variable) = raw_step.append_to_result.filter(|v| !v.is_empty()) {
            if !outputs.contains(&variable) {
                outputs.push(variable.clone());
            }
            plan.outputs.push(variable);
        }

        plan.add_step(PlanStep {
            name: view.name.clone(),
            plugin_name: view.plugin_name.clone(),
            description: view.description.clone(),
            parameters,
            outputs,
        });
    }

    Ok(plan)
}
