//! Prompt domain
//!
//! Prompts sent to the text-completion capability during tool selection.

use crate::core::string::truncate;
use crate::tool::entities::ToolDescriptor;

/// Maximum characters of a tool summary included in the selection prompt
const SUMMARY_MAX_CHARS: usize = 160;

/// Templates for the tool-selection prompt
pub struct SelectionPrompt;

impl SelectionPrompt {
    /// System-style preamble describing the selector's job
    pub fn system() -> &'static str {
        r#"You are a research assistant choosing computational tools for a scientific investigation.
Pick only tools from the catalog below whose capabilities directly serve the topic.
Prefer fewer, well-matched tools over many loosely related ones.
Never invent tool names."#
    }

    /// Full prompt for choosing up to `max_chosen` tools for `topic`.
    pub fn build<T: AsRef<ToolDescriptor>>(topic: &str, candidates: &[T], max_chosen: usize) -> String {
        let mut prompt = format!(
            "{}\n\nResearch topic:\n{}\n\nAvailable tools:\n",
            Self::system(),
            topic.trim()
        );

        for candidate in candidates {
            let tool = candidate.as_ref();
            prompt.push_str(&format!("- {}", tool.name));
            if !tool.category.is_empty() {
                prompt.push_str(&format!(" [{}]", tool.category));
            }
            let summary = tool.summary();
            if !summary.is_empty() {
                prompt.push_str(&format!(": {}", truncate(summary, SUMMARY_MAX_CHARS)));
            }
            let params: Vec<String> = tool
                .declared_parameters
                .iter()
                .map(|p| {
                    if p.required {
                        format!("{}*", p.name)
                    } else {
                        p.name.clone()
                    }
                })
                .collect();
            if !params.is_empty() {
                prompt.push_str(&format!(" (params: {})", params.join(", ")));
            }
            prompt.push('\n');
        }

        prompt.push_str(&format!(
            r#"
Choose at most {} tools. Parameters marked with * are required.
Respond with JSON only, in this exact shape:

```json
{{"tools": [{{"name": "<tool name>", "rationale": "<one sentence>", "score": <0.0-1.0>, "parameters": {{}}}}]}}
```"#,
            max_chosen
        ));

        prompt
    }
}
