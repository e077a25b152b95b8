use crate::core::memory::SemanticTextMemory;
use crate::core::plugin::{KernelFunction, Plugin, PluginCollection};
use crate::domain::model::{ContextVariables, FunctionView, GLOBAL_PLUGIN_NAME};
use crate::domain::ports::{
    ChatCompletion, ChatMessage, CompletionSettings, TextCompletion, TextEmbedding,
};
use crate::utils::error::{PlannerError, Result};
use std::sync::Arc;

/// 同類服務的註冊表；第一個註冊的是預設服務
struct ServiceRegistry<T: ?Sized> {
    services: Vec<(String, Arc<T>)>,
}

impl<T: ?Sized> ServiceRegistry<T> {
    fn new() -> Self {
        Self {
            services: Vec::new(),
        }
    }

    fn add(&mut self, service_id: &str, service: Arc<T>) -> Result<()> {
        if self.get(service_id).is_some() {
            return Err(PlannerError::DuplicateService {
                id: service_id.to_string(),
            });
        }
        self.services.push((service_id.to_string(), service));
        Ok(())
    }

    fn get(&self, service_id: &str) -> Option<&Arc<T>> {
        self.services
            .iter()
            .find(|(id, _)| id == service_id)
            .map(|(_, service)| service)
    }

    fn default_service(&self) -> Option<&Arc<T>> {
        self.services.first().map(|(_, service)| service)
    }

    fn ids(&self) -> Vec<&str> {
        self.services.iter().map(|(id, _)| id.as_str()).collect()
    }
}

/// AI 服務與插件的容器
pub struct Kernel {
    text_completion: ServiceRegistry<dyn TextCompletion>,
    chat_completion: ServiceRegistry<dyn ChatCompletion>,
    text_embedding: ServiceRegistry<dyn TextEmbedding>,
    plugins: PluginCollection,
    memory: Option<Arc<SemanticTextMemory>>,
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

impl Kernel {
    pub fn new() -> Self {
        Self {
            text_completion: ServiceRegistry::new(),
            chat_completion: ServiceRegistry::new(),
            text_embedding: ServiceRegistry::new(),
            plugins: PluginCollection::new(),
            memory: None,
        }
    }

    pub fn add_text_completion_service(
        &mut self,
        service_id: &str,
        service: Arc<dyn TextCompletion>,
    ) -> Result<()> {
        self.text_completion.add(service_id, service)?;
        tracing::debug!("🔌 Registered text completion service '{}'", service_id);
        Ok(())
    }

    pub fn add_chat_service(&mut self, service_id: &str, service: Arc<dyn ChatCompletion>) -> Result<()> {
        self.chat_completion.add(service_id, service)?;
        tracing::debug!("🔌 Registered chat service '{}'", service_id);
        Ok(())
    }

    /// 第一個 embedding 服務同時成為語意記憶的後端
    pub fn add_text_embedding_generation_service(
        &mut self,
        service_id: &str,
        service: Arc<dyn TextEmbedding>,
    ) -> Result<()> {
        self.text_embedding.add(service_id, service.clone())?;
        if self.memory.is_none() {
            self.memory = Some(Arc::new(SemanticTextMemory::new(service)));
        }
        tracing::debug!("🔌 Registered text embedding service '{}'", service_id);
        Ok(())
    }

    pub fn text_completion_service(&self, service_id: Option<&str>) -> Option<Arc<dyn TextCompletion>> {
        match service_id {
            Some(id) => self.text_completion.get(id).cloned(),
            None => self.text_completion.default_service().cloned(),
        }
    }

    pub fn chat_service(&self, service_id: Option<&str>) -> Option<Arc<dyn ChatCompletion>> {
        match service_id {
            Some(id) => self.chat_completion.get(id).cloned(),
            None => self.chat_completion.default_service().cloned(),
        }
    }

    pub fn text_embedding_service(&self, service_id: Option<&str>) -> Option<Arc<dyn TextEmbedding>> {
        match service_id {
            Some(id) => self.text_embedding.get(id).cloned(),
            None => self.text_embedding.default_service().cloned(),
        }
    }

    pub fn service_ids(&self) -> Vec<&str> {
        let mut ids = self.chat_completion.ids();
        ids.extend(self.text_completion.ids());
        ids.extend(self.text_embedding.ids());
        ids
    }

    pub fn memory(&self) -> Option<&Arc<SemanticTextMemory>> {
        self.memory.as_ref()
    }

    /// 未指定名稱時匯入為全域函式
    pub fn import_plugin<P: Plugin>(&mut self, plugin: P, plugin_name: Option<&str>) -> Result<()> {
        let plugin_name = plugin_name.unwrap_or(GLOBAL_PLUGIN_NAME);
        let functions = plugin.functions();
        let count = functions.len();
        self.plugins.add_plugin(plugin_name, functions)?;
        tracing::info!("🧩 Imported {} functions into plugin '{}'", count, plugin_name);
        Ok(())
    }

    pub fn plugins(&self) -> &PluginCollection {
        &self.plugins
    }

    pub fn get_function(&self, plugin_name: &str, function_name: &str) -> Result<Arc<KernelFunction>> {
        self.plugins
            .get_function(plugin_name, function_name)
            .ok_or_else(|| PlannerError::FunctionNotFound {
                plugin: plugin_name.to_string(),
                function: function_name.to_string(),
            })
    }

    pub fn functions_view(&self) -> Vec<FunctionView> {
        self.plugins.functions_view()
    }

    pub fn invoke_function(
        &self,
        plugin_name: &str,
        function_name: &str,
        variables: &ContextVariables,
    ) -> Result<String> {
        self.get_function(plugin_name, function_name)?.invoke(variables)
    }

    /// 有 chat 服務時優先使用，提示以單一 user 訊息送出
    pub async fn complete(&self, prompt: &str, settings: &CompletionSettings) -> Result<String> {
        if let Some(chat) = self.chat_completion.default_service() {
            tracing::debug!("💬 Completing prompt with chat service");
            return chat
                .complete_chat(&[ChatMessage::user(prompt)], settings)
                .await;
        }

        if let Some(text) = self.text_completion.default_service() {
            tracing::debug!("💬 Completing prompt with text completion service");
            return text.complete(prompt, settings).await;
        }

        Err(PlannerError::ServiceNotFound {
            kind: "completion".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ParameterView;
    use async_trait::async_trait;

    struct Fixed(&'static str);

    #[async_trait]
    impl TextCompletion for Fixed {
        async fn complete(&self, _prompt: &str, _settings: &CompletionSettings) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[async_trait]
    impl ChatCompletion for Fixed {
        async fn complete_chat(
            &self,
            messages: &[ChatMessage],
            _settings: &CompletionSettings,
        ) -> Result<String> {
            Ok(format!("{}:{}", self.0, messages.len()))
        }
    }

    struct Greeter;

    impl Plugin for Greeter {
        fn functions(&self) -> Vec<KernelFunction> {
            vec![KernelFunction::native("Greet", "Greet someone", |vars| {
                Ok(format!("Hello, {}", vars.input()))
            })
            .with_parameter(ParameterView::new("input", "Name"))]
        }
    }

    #[tokio::test]
    async fn test_complete_prefers_chat() {
        let mut kernel = Kernel::new();
        kernel
            .add_text_completion_service("text", Arc::new(Fixed("text")))
            .unwrap();
        assert_eq!(
            kernel.complete("hi", &CompletionSettings::default()).await.unwrap(),
            "text"
        );

        kernel.add_chat_service("chat", Arc::new(Fixed("chat"))).unwrap();
        assert_eq!(
            kernel.complete("hi", &CompletionSettings::default()).await.unwrap(),
            "chat:1"
        );
    }

    #[tokio::test]
    async fn test_complete_without_service() {
        let kernel = Kernel::new();
        let err = kernel
            .complete("hi", &CompletionSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PlannerError::ServiceNotFound { .. }));
    }

    #[test]
    fn test_duplicate_service_id() {
        let mut kernel = Kernel::new();
        kernel.add_chat_service("chat", Arc::new(Fixed("a"))).unwrap();
        let err = kernel.add_chat_service("chat", Arc::new(Fixed("b"))).unwrap_err();
        assert!(matches!(err, PlannerError::DuplicateService { .. }));
        assert_eq!(kernel.service_ids(), vec!["chat"]);
    }

    #[test]
    fn test_import_plugin_defaults_to_global() {
        let mut kernel = Kernel::new();
        kernel.import_plugin(Greeter, None).unwrap();
        kernel.import_plugin(Greeter, Some("Friendly")).unwrap();

        let global = kernel.get_function(GLOBAL_PLUGIN_NAME, "greet").unwrap();
        assert_eq!(global.plugin_name(), GLOBAL_PLUGIN_NAME);
        assert_eq!(
            kernel
                .invoke_function("friendly", "Greet", &ContextVariables::with_input("Kai"))
                .unwrap(),
            "Hello, Kai"
        );
        assert_eq!(kernel.functions_view().len(), 2);
        assert!(kernel.get_function("Missing", "Greet").is_err());
    }
}
