use crate::core::kernel::Kernel;
use crate::domain::model::{ContextVariables, Plan, INPUT_VARIABLE};
use crate::utils::error::Result;

impl Plan {
    /// 依序執行每個步驟
    ///
    /// 每一步的輸出成為下一步的 `input`；`$NAME` 形式的參數值以先前步驟設定的變數取代。
    /// 找不到函式的目標步驟會被略過。
    pub fn invoke(&self, kernel: &Kernel, input: &str) -> Result<ContextVariables> {
        let mut context = ContextVariables::with_input(input);

        for (index, step) in self.steps().iter().enumerate() {
            if !step.is_resolved() {
                tracing::warn!("⏭️ Step {} has no function ({}), skipping", index + 1, step.description);
                continue;
            }

            let mut variables = ContextVariables::new();
            for (name, value) in step.parameters.iter() {
                // 沒有對應變數時保留原字面值 (例如 "$5 off")
                let resolved = value
                    .strip_prefix('$')
                    .and_then(|reference| context.get(reference))
                    .unwrap_or(value);
                variables.set(name, resolved);
            }
            if variables.get(INPUT_VARIABLE).map_or(true, str::is_empty) {
                variables.set(INPUT_VARIABLE, context.input());
            }

            tracing::info!(
                "▶️ Step {}/{}: {}.{}",
                index + 1,
                self.steps().len(),
                step.plugin_name,
                step.name
            );
            let output = kernel.invoke_function(&step.plugin_name, &step.name, &variables)?;

            for variable in &step.outputs {
                if self.outputs.contains(variable) {
                    let appended = match context.get(variable) {
                        Some(existing) if !existing.is_empty() => format!("{}\n{}", existing, output),
                        _ => output.clone(),
                    };
                    context.set(variable.as_str(), appended);
                } else {
                    context.set(variable.as_str(), output.as_str());
                }
            }
            context.set(INPUT_VARIABLE, output);
        }

        Ok(context)
    }
}
