pub mod terminal;

use crate::error::ChatError;
use crate::models::chat::{ Annotation, ChatMessage };

/// Presentation boundary. The core calls these on every state change and
/// never looks at how they are rendered.
pub trait RenderSink: Send + Sync {
    fn on_message_appended(&self, message: &ChatMessage);

    fn on_content_updated(
        &self,
        message_id: &str,
        content: &str,
        is_streaming: bool,
        annotations: &[Annotation]
    );

    fn on_responding_changed(&self, _responding: bool) {}

    fn on_send_failed(&self, _message_id: &str, _error: &ChatError) {}

    fn on_conversation_cleared(&self) {}
}

/// Sink for headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl RenderSink for NullSink {
    fn on_message_appended(&self, _message: &ChatMessage) {}

    fn on_content_updated(
        &self,
        _message_id: &str,
        _content: &str,
        _is_streaming: bool,
        _annotations: &[Annotation]
    ) {}
}
