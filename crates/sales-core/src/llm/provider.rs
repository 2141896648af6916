//! Text-completion capability
//!
//! Executors depend on [`CompletionProvider`] rather than a concrete client,
//! so tests can substitute scripted providers.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::tool::ToolManager;
use crate::Result;

/// Shape the reply is asked to take: a JSON object with one string field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSchema {
    pub name: String,
    pub field: String,
    pub description: String,
}

impl ResponseSchema {
    pub fn new(
        name: impl Into<String>,
        field: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            description: description.into(),
        }
    }

    /// Output format instruction appended to the system prompt
    pub fn instruction(&self) -> String {
        format!(
            "Respond ONLY with a JSON object named {} of the form {{\"{}\": \"...\"}}, where \"{}\" is {}. Do not add any text outside the JSON object.",
            self.name, self.field, self.field, self.description
        )
    }
}

/// One completion request
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub schema: Option<ResponseSchema>,
    pub max_tokens: u64,
    /// Upper bound on model turns when tools are in play
    pub max_iterations: usize,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            schema: None,
            max_tokens: 2048,
            max_iterations: 5,
        }
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn schema(mut self, schema: ResponseSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// System prompt with the schema instruction appended
    pub fn effective_system(&self) -> Option<String> {
        match (&self.system, &self.schema) {
            (Some(system), Some(schema)) => Some(format!("{}\n\n{}", system, schema.instruction())),
            (None, Some(schema)) => Some(schema.instruction()),
            (system, None) => system.clone(),
        }
    }
}

/// Reply decoded against a [`ResponseSchema`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredReply {
    pub text: String,
    /// Whether `text` came from the schema field rather than raw model output
    pub structured: bool,
}

impl StructuredReply {
    /// Decode raw model output.
    ///
    /// Accepts a bare JSON object or one wrapped in a code fence. Anything
    /// else is taken as the field value itself.
    pub fn parse(raw: &str, schema: Option<&ResponseSchema>) -> Self {
        let trimmed = raw.trim();
        let Some(schema) = schema else {
            return Self {
                text: trimmed.to_string(),
                structured: false,
            };
        };

        let candidate = strip_code_fence(trimmed);
        if let Ok(JsonValue::Object(map)) = serde_json::from_str::<JsonValue>(candidate) {
            if let Some(JsonValue::String(text)) = map.get(&schema.field) {
                return Self {
                    text: text.clone(),
                    structured: true,
                };
            }
        }

        Self {
            text: trimmed.to_string(),
            structured: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Text-in/text-out completion with optional tool use
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest, tools: &ToolManager) -> Result<StructuredReply>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> ResponseSchema {
        ResponseSchema::new("ExpertResponse", "information", "the facts")
    }

    #[test]
    fn test_parse_bare_json() {
        let reply = StructuredReply::parse(r#"{"information": "Vision AI costs $8,000/month"}"#, Some(&schema()));
        assert!(reply.structured);
        assert_eq!(reply.text, "Vision AI costs $8,000/month");
    }

    #[test]
    fn test_parse_fenced_json() {
        let raw = "```json\n{\"information\": \"fenced\"}\n```";
        let reply = StructuredReply::parse(raw, Some(&schema()));
        assert!(reply.structured);
        assert_eq!(reply.text, "fenced");
    }

    #[test]
    fn test_plain_text_is_used_as_field() {
        let reply = StructuredReply::parse("  just words  ", Some(&schema()));
        assert!(!reply.structured);
        assert_eq!(reply.text, "just words");
    }

    #[test]
    fn test_wrong_field_falls_back_to_raw() {
        let raw = r#"{"other": "x"}"#;
        let reply = StructuredReply::parse(raw, Some(&schema()));
        assert!(!reply.structured);
        assert_eq!(reply.text, raw);
    }

    #[test]
    fn test_effective_system_appends_instruction() {
        let request = CompletionRequest::new("q").system("be factual").schema(schema());
        let system = request.effective_system().unwrap();
        assert!(system.starts_with("be factual"));
        assert!(system.contains("\"information\""));
    }
}
