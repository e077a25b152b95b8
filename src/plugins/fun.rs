use crate::core::plugin::{KernelFunction, Plugin};
use crate::domain::model::ParameterView;

#[derive(Debug, Clone, Copy, Default)]
pub struct FunPluginFake;

impl Plugin for FunPluginFake {
    fn functions(&self) -> Vec<KernelFunction> {
        vec![KernelFunction::native("WriteJoke", "Write a funny joke", |vars| {
            let topic = match vars.input().trim() {
                "" => "computers",
                topic => topic,
            };
            Ok(format!(
                "Why did the {} cross the road? To get to the other tab.",
                topic
            ))
        })
        .with_parameter(ParameterView::new("input", "The topic of the joke."))]
    }
}
