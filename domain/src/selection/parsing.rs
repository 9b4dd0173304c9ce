//! Selection parsing from text-completion responses.
//!
//! The selector asks for a JSON document of the form:
//!
//! ```json
//! {"tools": [{"name": "pubmed", "rationale": "...", "score": 0.9, "parameters": {"query": "..."}}]}
//! ```
//!
//! Models wrap JSON in prose or code fences often enough that we accept:
//! 1. ` ```json ` (or bare ` ``` `) fenced blocks
//! 2. The entire response being JSON
//! 3. The first balanced `{ ... }` object embedded in prose
//!
//! A bare top-level array of choices is also accepted.

use crate::tool::entities::Parameters;
use serde::Deserialize;
use serde_json::Value;

/// One tool choice as returned by the text-completion capability.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ParsedChoice {
    #[serde(alias = "tool", alias = "tool_name")]
    pub name: String,
    #[serde(default, alias = "reason", alias = "justification")]
    pub rationale: String,
    /// Optional rating; higher is better
    #[serde(default, alias = "confidence", alias = "relevance")]
    pub score: Option<f64>,
    #[serde(default, alias = "params", alias = "suggested_parameters")]
    pub parameters: Parameters,
}

#[derive(Debug, Deserialize)]
struct SelectionEnvelope {
    #[serde(alias = "chosen_tools", alias = "selection", alias = "choices")]
    tools: Vec<ParsedChoice>,
}

/// Parse a completion response into a list of choices.
///
/// Returns `None` when no JSON matching the expected schema can be found.
/// An empty `tools` list parses successfully as an empty vector; the
/// selector decides whether that is usable.
pub fn parse_selection_response(response: &str) -> Option<Vec<ParsedChoice>> {
    for candidate in json_candidates(response) {
        if let Some(choices) = parse_value(&candidate) {
            return Some(choices);
        }
    }
    None
}

fn parse_value(value: &Value) -> Option<Vec<ParsedChoice>> {
    match value {
        Value::Object(_) => serde_json::from_value::<SelectionEnvelope>(value.clone())
            .ok()
            .map(|e| e.tools),
        Value::Array(_) => serde_json::from_value::<Vec<ParsedChoice>>(value.clone()).ok(),
        _ => None,
    }
}

/// Collect every JSON value the response might contain, in preference order.
fn json_candidates(response: &str) -> Vec<Value> {
    let mut candidates = Vec::new();

    // 1. Fenced blocks
    let mut in_block = false;
    let mut current_block = String::new();
    for line in response.lines() {
        let trimmed = line.trim();
        if !in_block && (trimmed == "```json" || trimmed == "```") {
            in_block = true;
            current_block.clear();
        } else if in_block && trimmed == "```" {
            in_block = false;
            if let Ok(v) = serde_json::from_str::<Value>(&current_block) {
                candidates.push(v);
            }
        } else if in_block {
            current_block.push_str(line);
            current_block.push('\n');
        }
    }

    // 2. Whole response
    if let Ok(v) = serde_json::from_str::<Value>(response.trim()) {
        candidates.push(v);
    }

    // 3. First balanced object in prose
    if let Some(obj) = first_balanced_object(response)
        && let Ok(v) = serde_json::from_str::<Value>(obj)
    {
        candidates.push(v);
    }

    candidates
}

/// Find the first `{...}` span with balanced braces, ignoring braces in strings.
fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_raw_json() {
        let response = r#"{"tools": [{"name": "pubmed", "rationale": "literature", "score": 0.8}]}"#;
        let choices = parse_selection_response(response).unwrap();
        assert_eq!(choices.len(), 1);
        assert_eq!(choices[0].name, "pubmed");
        assert_eq!(choices[0].rationale, "literature");
        assert_eq!(choices[0].score, Some(0.8));
    }

    #[test]
    fn test_parse_fenced_block() {
        let response = "Here is my pick:\n```json\n{\"tools\": [{\"name\": \"blast\", \"parameters\": {\"db\": \"nr\"}}]}\n```\nThanks";
        let choices = parse_selection_response(response).unwrap();
        assert_eq!(choices[0].name, "blast");
        assert_eq!(choices[0].parameters.get("db").unwrap(), "nr");
    }

    #[test]
    fn test_parse_embedded_object() {
        let response = r#"Sure. {"tools": [{"tool": "uniprot", "reason": "has {braces} in text"}]} Done."#;
        let choices = parse_selection_response(response).unwrap();
        assert_eq!(choices[0].name, "uniprot");
        assert_eq!(choices[0].rationale, "has {braces} in text");
    }

    #[test]
    fn test_parse_bare_array() {
        let response = r#"[{"name": "a"}, {"name": "b"}]"#;
        let choices = parse_selection_response(response).unwrap();
        assert_eq!(choices.len(), 2);
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_selection_response("I think you should use PubMed.").is_none());
        assert!(parse_selection_response(r#"{"answer": 42}"#).is_none());
    }
}
