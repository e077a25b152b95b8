use crate::domain::model::{ContextVariables, FunctionView, ParameterView};
use crate::utils::error::{PlannerError, Result};
use crate::utils::validation::validate_identifier;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

pub type NativeHandler = Arc<dyn Fn(&ContextVariables) -> Result<String> + Send + Sync>;

/// 可被規劃器呼叫的原生函式
#[derive(Clone)]
pub struct KernelFunction {
    view: FunctionView,
    handler: NativeHandler,
}

impl KernelFunction {
    pub fn native<F>(name: &str, description: &str, handler: F) -> Self
    where
        F: Fn(&ContextVariables) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            view: FunctionView {
                name: name.to_string(),
                plugin_name: String::new(),
                description: description.to_string(),
                parameters: Vec::new(),
                is_semantic: false,
            },
            handler: Arc::new(handler),
        }
    }

    pub fn with_parameter(mut self, parameter: ParameterView) -> Self {
        self.view.parameters.push(parameter);
        self
    }

    pub fn name(&self) -> &str {
        &self.view.name
    }

    pub fn plugin_name(&self) -> &str {
        &self.view.plugin_name
    }

    pub fn describe(&self) -> &FunctionView {
        &self.view
    }

    /// 先套用參數預設值，再以呼叫端提供的變數覆寫
    pub fn invoke(&self, variables: &ContextVariables) -> Result<String> {
        let mut effective = ContextVariables::new();
        for parameter in &self.view.parameters {
            if let Some(default) = &parameter.default_value {
                effective.set(parameter.name.as_str(), default.as_str());
            }
        }
        effective.update(variables);

        tracing::debug!("⚙️ Invoking {}", self.view.fully_qualified_name());
        (self.handler)(&effective)
    }
}

impl std::fmt::Debug for KernelFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelFunction")
            .field("view", &self.view)
            .finish_non_exhaustive()
    }
}

/// 一組具名函式
pub trait Plugin {
    fn functions(&self) -> Vec<KernelFunction>;
}

#[derive(Debug, Default)]
struct PluginEntry {
    name: String,
    functions: BTreeMap<String, Arc<KernelFunction>>,
}

/// 以插件、函式名稱 (不分大小寫) 索引的函式集合
#[derive(Debug, Default)]
pub struct PluginCollection {
    plugins: BTreeMap<String, PluginEntry>,
}

impl PluginCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_plugin(&mut self, plugin_name: &str, functions: Vec<KernelFunction>) -> Result<()> {
        validate_identifier("plugin_name", plugin_name)?;

        let plugin_key = plugin_name.to_lowercase();
        let mut seen = HashSet::new();
        for function in &functions {
            validate_identifier("function_name", function.name())?;
            let key = function.name().to_lowercase();
            let registered = self
                .plugins
                .get(&plugin_key)
                .is_some_and(|entry| entry.functions.contains_key(&key));
            if registered || !seen.insert(key) {
                return Err(PlannerError::PluginError {
                    message: format!(
                        "Function '{}' is already registered in plugin '{}'",
                        function.name(),
                        plugin_name
                    ),
                });
            }
        }

        // 全部檢查通過才寫入，避免插件只匯入一半
        let entry = self.plugins.entry(plugin_key).or_insert_with(|| PluginEntry {
            name: plugin_name.to_string(),
            functions: BTreeMap::new(),
        });
        for mut function in functions {
            function.view.plugin_name = entry.name.clone();
            entry
                .functions
                .insert(function.name().to_lowercase(), Arc::new(function));
        }

        Ok(())
    }

    pub fn get_function(&self, plugin_name: &str, function_name: &str) -> Option<Arc<KernelFunction>> {
        self.plugins
            .get(&plugin_name.to_lowercase())
            .and_then(|entry| entry.functions.get(&function_name.to_lowercase()))
            .cloned()
    }

    pub fn functions_view(&self) -> Vec<FunctionView> {
        self.plugins
            .values()
            .flat_map(|entry| entry.functions.values())
            .map(|function| function.describe().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.values().map(|entry| entry.functions.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
