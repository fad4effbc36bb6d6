use crate::error::ChatError;
use crate::models::chat::{ ChatMessage, Role };
use crate::render::RenderSink;
use log::debug;
use std::sync::atomic::{ AtomicU64, Ordering };
use std::sync::Arc;
use uuid::Uuid;

/// Strategy for identifying live (non-historical) messages.
pub trait MessageIds: Send + Sync {
    fn next_id(&self, role: Role) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

impl MessageIds for UuidIds {
    fn next_id(&self, role: Role) -> String {
        format!("{}-{}", role, Uuid::new_v4())
    }
}

/// Deterministic ids: `user-1`, `assistant-2`, ...
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl MessageIds for SequentialIds {
    fn next_id(&self, role: Role) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", role, n)
    }
}

/// The message list of one chat thread.
///
/// Every mutation goes through here so the render sink sees each change.
pub struct Conversation {
    messages: Vec<ChatMessage>,
    responding: bool,
    /// Session allowed to write stream output.
    turn: Option<Uuid>,
    sink: Arc<dyn RenderSink>,
}

impl Conversation {
    pub fn new(sink: Arc<dyn RenderSink>) -> Self {
        Self {
            messages: Vec::new(),
            responding: false,
            turn: None,
            sink,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn get(&self, id: &str) -> Option<&ChatMessage> {
        self.messages.iter().rev().find(|m| !m.id.is_empty() && m.id == id)
    }

    pub fn is_responding(&self) -> bool {
        self.responding
    }

    pub fn in_progress(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().filter(|m| m.is_streaming)
    }

    pub fn append(&mut self, message: ChatMessage) {
        debug!("Appending {} message {:?}", message.role, message.id);
        self.sink.on_message_appended(&message);
        self.messages.push(message);
    }

    /// Applies `update` to the message and pushes the result to the sink.
    /// Returns `false` when no message has that id.
    pub fn update<F>(&mut self, id: &str, update: F) -> bool where F: FnOnce(&mut ChatMessage) {
        let Some(message) = self.messages
            .iter_mut()
            .rev()
            .find(|m| !m.id.is_empty() && m.id == id) else {
            return false;
        };
        update(message);
        self.sink.on_content_updated(
            &message.id,
            &message.content,
            message.is_streaming,
            &message.annotations
        );
        true
    }

    pub fn set_responding(&mut self, responding: bool) {
        if self.responding != responding {
            self.responding = responding;
            self.sink.on_responding_changed(responding);
        }
    }

    /// Hands the conversation to `session_id`. Whatever an earlier session
    /// left streaming is finalized now, so at most one message is ever in
    /// progress.
    pub fn claim_turn(&mut self, session_id: Uuid) {
        let streaming: Vec<String> = self
            .in_progress()
            .map(|m| m.id.clone())
            .collect();
        for id in streaming {
            debug!("Finalizing {} before session {} starts", id, session_id);
            self.update(&id, |m| {
                m.is_streaming = false;
            });
        }
        self.turn = Some(session_id);
    }

    pub fn holds_turn(&self, session_id: Uuid) -> bool {
        self.turn == Some(session_id)
    }

    /// Gives the turn back. Returns `false` when a newer session has taken it.
    pub fn release_turn(&mut self, session_id: Uuid) -> bool {
        match self.turn {
            Some(current) if current == session_id => {
                self.turn = None;
                true
            }
            Some(_) => false,
            None => true,
        }
    }

    /// Most recent live user message.
    pub fn last_user_message(&self) -> Option<&ChatMessage> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User && !m.id.is_empty())
    }

    pub fn mark_send_failed(&mut self, id: &str, error: &ChatError) {
        if let Some(message) = self.messages.iter_mut().rev().find(|m| m.id == id) {
            message.send_failed = true;
            self.sink.on_send_failed(id, error);
        }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.responding = false;
        self.turn = None;
        self.sink.on_conversation_cleared();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::NullSink;

    #[test]
    fn sequential_ids_count_across_roles() {
        let ids = SequentialIds::default();
        assert_eq!(ids.next_id(Role::User), "user-1");
        assert_eq!(ids.next_id(Role::Assistant), "assistant-2");
    }

    #[test]
    fn uuid_ids_are_unique() {
        let ids = UuidIds;
        assert_ne!(ids.next_id(Role::User), ids.next_id(Role::User));
    }

    #[test]
    fn update_ignores_historical_messages() {
        let mut convo = Conversation::new(Arc::new(NullSink));
        convo.append(ChatMessage::assistant_final(String::new(), "old"));
        assert!(!convo.update("", |m| m.content.push('!')));
        assert_eq!(convo.messages()[0].content, "old");
    }

    #[test]
    fn claiming_a_turn_finalizes_leftover_streaming() {
        let mut convo = Conversation::new(Arc::new(NullSink));
        let (old, new) = (Uuid::new_v4(), Uuid::new_v4());
        convo.claim_turn(old);
        convo.append(ChatMessage::assistant_placeholder("assistant-1".into()));
        assert_eq!(convo.in_progress().count(), 1);

        convo.claim_turn(new);
        assert_eq!(convo.in_progress().count(), 0);
        assert!(!convo.holds_turn(old));
        assert!(!convo.release_turn(old));
        assert!(convo.release_turn(new));
        assert!(convo.release_turn(new));
    }

    #[test]
    fn last_user_message_skips_history() {
        let mut convo = Conversation::new(Arc::new(NullSink));
        convo.append(ChatMessage::user(String::new(), "from history"));
        assert!(convo.last_user_message().is_none());
        convo.append(ChatMessage::user("user-1".into(), "live"));
        convo.append(ChatMessage::assistant_final("assistant-2".into(), "reply"));
        assert_eq!(convo.last_user_message().map(|m| m.content.as_str()), Some("live"));
    }

    #[test]
    fn clear_resets_responding() {
        let mut convo = Conversation::new(Arc::new(NullSink));
        convo.append(ChatMessage::user("user-1".into(), "hi"));
        convo.set_responding(true);
        convo.clear();
        assert!(convo.messages().is_empty());
        assert!(!convo.is_responding());
    }
}
