use chrono::{ DateTime, Utc };
use serde::{ Deserializer, Serialize, Deserialize };
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Anything the backend does not mark as `user` is shown as the assistant.
impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error> where D: Deserializer<'de> {
        let raw = String::deserialize(deserializer)?;
        Ok(if raw == "user" { Role::User } else { Role::Assistant })
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A file citation attached to a completed assistant message.
///
/// `start_index` and `end_index` count Unicode scalar values of the final
/// message content, never of a partially streamed prefix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub start_index: usize,
    pub end_index: usize,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Empty for messages loaded from history.
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    pub is_streaming: bool,
    #[serde(default)]
    pub send_failed: bool,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(id: String, content: impl Into<String>) -> Self {
        Self {
            id,
            role: Role::User,
            content: content.into(),
            annotations: Vec::new(),
            is_streaming: false,
            send_failed: false,
            created_at: Utc::now(),
        }
    }

    /// Empty assistant message that is about to receive streamed content.
    pub fn assistant_placeholder(id: String) -> Self {
        Self {
            id,
            role: Role::Assistant,
            content: String::new(),
            annotations: Vec::new(),
            is_streaming: true,
            send_failed: false,
            created_at: Utc::now(),
        }
    }

    pub fn assistant_final(id: String, content: impl Into<String>) -> Self {
        Self {
            is_streaming: false,
            content: content.into(),
            ..Self::assistant_placeholder(id)
        }
    }
}

/// One entry of `GET /chat/history`; the server returns them newest-first.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub annotations: Option<Vec<Annotation>>,
}

impl HistoryEntry {
    pub fn into_message(self) -> ChatMessage {
        let created_at = self.created_at
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|ts| ts.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        ChatMessage {
            id: String::new(),
            role: self.role,
            content: self.content,
            annotations: self.annotations.unwrap_or_default(),
            is_streaming: false,
            send_failed: false,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_entry_parses_optional_fields() {
        let raw =
            r#"[
            {"role":"assistant","content":"See [doc]","created_at":"2024-05-01T10:00:00Z",
             "annotations":[{"start_index":4,"end_index":9,"text":"[doc]","file_name":"a.md","type":"file_citation"}]},
            {"role":"user","content":"hi"}
        ]"#;
        let entries: Vec<HistoryEntry> = serde_json::from_str(raw).unwrap();
        assert_eq!(entries.len(), 2);

        let assistant = entries[0].clone().into_message();
        assert_eq!(assistant.role, Role::Assistant);
        assert!(assistant.id.is_empty());
        assert!(!assistant.is_streaming);
        assert_eq!(assistant.created_at.to_rfc3339(), "2024-05-01T10:00:00+00:00");
        assert_eq!(assistant.annotations[0].file_name.as_deref(), Some("a.md"));

        let user = entries[1].clone().into_message();
        assert_eq!(user.role, Role::User);
        assert!(user.annotations.is_empty());
    }

    #[test]
    fn unknown_roles_load_as_assistant() {
        let raw = r#"[{"role":"tool","content":"lookup"},{"role":"system","content":"rules"},{"role":"user","content":"q"}]"#;
        let entries: Vec<HistoryEntry> = serde_json::from_str(raw).unwrap();
        let roles: Vec<Role> = entries
            .iter()
            .map(|e| e.role)
            .collect();
        assert_eq!(roles, vec![Role::Assistant, Role::Assistant, Role::User]);
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
    }

    #[test]
    fn annotation_without_text_defaults_to_empty() {
        let a: Annotation = serde_json::from_str(r#"{"start_index":1,"end_index":2}"#).unwrap();
        assert_eq!(a.text, "");
        assert_eq!(a.file_name, None);
    }
}
