//! Conversation messages and boundary normalization
//!
//! Information Hiding:
//! - Message ids are assigned here and nowhere else
//! - Callers hand over whatever JSON they received; `normalize` decides
//!   what it means

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Ai,
    System,
}

impl Role {
    /// Parse a wire role. Accepts the chat-completions spellings as aliases.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "human" | "user" => Some(Role::Human),
            "ai" | "assistant" => Some(Role::Ai),
            "system" => Some(Role::System),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Human => "human",
            Role::Ai => "ai",
            Role::System => "system",
        }
    }
}

/// A message as stored in a thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
        }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Self::new(Role::Human, content)
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self::new(Role::Ai, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn to_wire(&self) -> WireMessage {
        WireMessage {
            kind: self.role.as_str().to_string(),
            content: self.content.clone(),
        }
    }
}

/// `{type, content}` shape exchanged with clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
}

pub fn to_wire(messages: &[Message]) -> Vec<WireMessage> {
    messages.iter().map(Message::to_wire).collect()
}

/// Map any inbound message shape onto a canonical `Message`.
///
/// Objects use `type` (or `role`) and `content`; unknown roles fall back to
/// human. Bare strings become human messages, and anything else is kept as
/// its JSON text.
pub fn normalize(value: &Value) -> Message {
    match value {
        Value::Object(map) => {
            let role = map
                .get("type")
                .or_else(|| map.get("role"))
                .and_then(Value::as_str)
                .and_then(Role::parse)
                .unwrap_or(Role::Human);
            let content = map.get("content").map(content_text).unwrap_or_default();
            Message::new(role, content)
        }
        other => Message::human(content_text(other)),
    }
}

fn content_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_typed_object() {
        let msg = normalize(&json!({"type": "ai", "content": "hello"}));
        assert_eq!(msg.role, Role::Ai);
        assert_eq!(msg.content, "hello");
        assert!(!msg.id.is_empty());
    }

    #[test]
    fn test_normalize_role_alias() {
        let msg = normalize(&json!({"role": "user", "content": "hi"}));
        assert_eq!(msg.role, Role::Human);

        let msg = normalize(&json!({"role": "assistant", "content": "yo"}));
        assert_eq!(msg.role, Role::Ai);
    }

    #[test]
    fn test_normalize_unknown_shapes_default_to_human() {
        let msg = normalize(&json!({"type": "tool", "content": "x"}));
        assert_eq!(msg.role, Role::Human);

        let msg = normalize(&json!("just text"));
        assert_eq!(msg.role, Role::Human);
        assert_eq!(msg.content, "just text");

        let msg = normalize(&json!(42));
        assert_eq!(msg.role, Role::Human);
        assert_eq!(msg.content, "42");
    }

    #[test]
    fn test_normalize_coerces_non_string_content() {
        let msg = normalize(&json!({"type": "human", "content": ["a", 1]}));
        assert_eq!(msg.content, r#"["a",1]"#);

        let msg = normalize(&json!({"type": "human"}));
        assert_eq!(msg.content, "");
    }

    #[test]
    fn test_wire_shape() {
        let wire = serde_json::to_value(Message::ai("done").to_wire()).unwrap();
        assert_eq!(wire, json!({"type": "ai", "content": "done"}));
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(Message::human("a").id, Message::human("a").id);
    }
}
