use crate::models::chat::Annotation;
use serde::{ Serialize, Deserialize };
use serde_json::Value as JsonValue;

pub const DEFAULT_ERROR_MESSAGE: &str = "An error occurred.";

/// Body of `POST /chat`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
}

/// One classified `data:` payload of the chat stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Server-side failure mid-stream; ends the read loop.
    Error {
        message: String,
    },
    StreamEnd,
    /// Run/status metadata, observed only.
    ThreadRun {
        content: JsonValue,
    },
    /// Full final text, superseding anything streamed so far.
    Completed {
        content: String,
        annotations: Vec<Annotation>,
    },
    Delta {
        content: String,
    },
    Unrecognized(JsonValue),
}

impl StreamEvent {
    pub fn classify(data: JsonValue) -> Self {
        if let Some(error) = data.get("error").filter(|e| is_truthy(e)) {
            return StreamEvent::Error { message: error_message(error) };
        }

        match data.get("type").and_then(JsonValue::as_str) {
            Some("stream_end") => {
                return StreamEvent::StreamEnd;
            }
            Some("thread_run") => {
                let content = data.get("content").cloned().unwrap_or(JsonValue::Null);
                return StreamEvent::ThreadRun { content };
            }
            Some("completed_message") => {
                let content = data
                    .get("content")
                    .and_then(JsonValue::as_str)
                    .unwrap_or_default()
                    .to_string();
                let annotations = data
                    .get("annotations")
                    .map(parse_annotations)
                    .unwrap_or_default();
                return StreamEvent::Completed { content, annotations };
            }
            _ => {}
        }

        match data.get("content").and_then(JsonValue::as_str) {
            Some(content) => StreamEvent::Delta { content: content.to_string() },
            None => StreamEvent::Unrecognized(data),
        }
    }
}

fn error_message(error: &JsonValue) -> String {
    match error {
        JsonValue::String(message) => message.clone(),
        JsonValue::Object(fields) =>
            fields
                .get("message")
                .and_then(JsonValue::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or(DEFAULT_ERROR_MESSAGE)
                .to_string(),
        _ => DEFAULT_ERROR_MESSAGE.to_string(),
    }
}

fn parse_annotations(raw: &JsonValue) -> Vec<Annotation> {
    let Some(items) = raw.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            match serde_json::from_value::<Annotation>(item.clone()) {
                Ok(annotation) => Some(annotation),
                Err(e) => {
                    log::warn!("Skipping unreadable annotation {}: {}", item, e);
                    None
                }
            }
        })
        .collect()
}

fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_takes_precedence_over_type() {
        let event = StreamEvent::classify(
            json!({"type": "completed_message", "content": "x", "error": {"message": "boom"}})
        );
        assert_eq!(event, StreamEvent::Error { message: "boom".into() });
    }

    #[test]
    fn error_without_message_uses_fallback() {
        let event = StreamEvent::classify(json!({"error": {"code": 500}}));
        assert_eq!(event, StreamEvent::Error { message: DEFAULT_ERROR_MESSAGE.into() });

        let event = StreamEvent::classify(json!({"error": "thread expired"}));
        assert_eq!(event, StreamEvent::Error { message: "thread expired".into() });
    }

    #[test]
    fn falsy_error_field_is_ignored() {
        let event = StreamEvent::classify(json!({"error": null, "content": "hi"}));
        assert_eq!(event, StreamEvent::Delta { content: "hi".into() });
    }

    #[test]
    fn classifies_known_types() {
        assert_eq!(StreamEvent::classify(json!({"type": "stream_end"})), StreamEvent::StreamEnd);
        assert_eq!(
            StreamEvent::classify(json!({"type": "thread_run", "content": {"status": "queued"}})),
            StreamEvent::ThreadRun { content: json!({"status": "queued"}) }
        );
        assert_eq!(
            StreamEvent::classify(json!({"type": "message", "content": "tok"})),
            StreamEvent::Delta { content: "tok".into() }
        );
    }

    #[test]
    fn completed_message_keeps_annotations() {
        let event = StreamEvent::classify(
            json!({
            "type": "completed_message",
            "content": "Answer [1]",
            "annotations": [
                {"start_index": 7, "end_index": 10, "text": "[1]", "file_name": "guide.md"},
                {"bogus": true}
            ]
        })
        );
        match event {
            StreamEvent::Completed { content, annotations } => {
                assert_eq!(content, "Answer [1]");
                assert_eq!(annotations.len(), 1);
                assert_eq!(annotations[0].file_name.as_deref(), Some("guide.md"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn shape_without_content_is_unrecognized() {
        let event = StreamEvent::classify(json!({"type": "heartbeat"}));
        assert!(matches!(event, StreamEvent::Unrecognized(_)));
    }
}
