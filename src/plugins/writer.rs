use crate::core::plugin::{KernelFunction, Plugin};
use crate::domain::model::ParameterView;

pub const DEFAULT_END_MARKER: &str = "<!--===ENDPART===-->";
pub const MAX_CHAPTERS: usize = 50;

#[derive(Debug, Clone, Copy, Default)]
pub struct WriterPluginFake;

impl Plugin for WriterPluginFake {
    fn functions(&self) -> Vec<KernelFunction> {
        vec![
            KernelFunction::native("Translate", "Translate the input to another language", |vars| {
                Ok(format!(
                    "Translated to {}: {}",
                    vars.get("language").unwrap_or_default(),
                    vars.input()
                ))
            })
            .with_parameter(ParameterView::new("input", "The text to translate."))
            .with_parameter(ParameterView::new("language", "The language to translate to.")),
            KernelFunction::native("Summarize", "Summarize the input", |vars| {
                let summary: String = vars.input().split_whitespace().take(12).collect::<Vec<_>>().join(" ");
                Ok(summary)
            })
            .with_parameter(ParameterView::new("input", "The text to summarize.")),
            KernelFunction::native("NovelOutline", "Write a novel outline.", |vars| {
                let chapters: usize = vars
                    .get("chapterCount")
                    .and_then(|count| count.trim().parse().ok())
                    .unwrap_or(3)
                    .min(MAX_CHAPTERS);
                let marker = vars.get("endMarker").unwrap_or(DEFAULT_END_MARKER);
                let outline = (1..=chapters)
                    .map(|n| format!("Chapter {}: {}\n{}", n, vars.input(), marker))
                    .collect::<Vec<_>>()
                    .join("\n");
                Ok(outline)
            })
            .with_parameter(ParameterView::new("input", "The title of the novel."))
            .with_parameter(ParameterView::new(
                "chapterCount",
                "The number of chapters to write.",
            ))
            .with_parameter(
                ParameterView::new("endMarker", "The marker to use to end each chapter.")
                    .with_default(DEFAULT_END_MARKER),
            ),
        ]
    }
}
