use crate::conversation::{ Conversation, MessageIds };
use crate::models::chat::{ ChatMessage, Role };
use crate::models::event::StreamEvent;
use log::{ debug, error, info };

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Stop reading; carries the server's error message.
    Halt(String),
}

/// Folds stream events into the one assistant message a turn is building.
#[derive(Debug, Default)]
pub struct StreamReducer {
    current: Option<String>,
}

impl StreamReducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_message(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn apply(
        &mut self,
        conversation: &mut Conversation,
        ids: &dyn MessageIds,
        event: StreamEvent
    ) -> Flow {
        match event {
            StreamEvent::Error { message } => {
                error!("Server reported a stream error: {}", message);
                let id = self.ensure_target(conversation, ids);
                conversation.update(&id, |m| {
                    m.content = message.clone();
                    m.is_streaming = false;
                });
                conversation.set_responding(false);
                self.current = None;
                Flow::Halt(message)
            }
            StreamEvent::StreamEnd => {
                info!("Stream end marker received.");
                conversation.set_responding(false);
                self.release(conversation);
                Flow::Continue
            }
            StreamEvent::ThreadRun { content } => {
                info!("Run status info: {}", content);
                Flow::Continue
            }
            StreamEvent::Completed { content, annotations } => {
                debug!("Received completed message: {}", content);
                let id = self.ensure_target(conversation, ids);
                conversation.update(&id, |m| {
                    m.content = content;
                    m.annotations = annotations;
                    m.is_streaming = false;
                });
                conversation.set_responding(false);
                Flow::Continue
            }
            StreamEvent::Delta { content } => {
                debug!("Received streaming chunk: {}", content);
                let id = self.ensure_target(conversation, ids);
                conversation.update(&id, |m| {
                    m.content.push_str(&content);
                    m.is_streaming = true;
                });
                Flow::Continue
            }
            StreamEvent::Unrecognized(data) => {
                debug!("Ignoring unrecognized event: {}", data);
                Flow::Continue
            }
        }
    }

    /// Finalizes the current message, if any, leaving its content as is.
    pub fn release(&mut self, conversation: &mut Conversation) {
        let Some(id) = self.current.take() else {
            return;
        };
        let still_streaming = conversation
            .get(&id)
            .map(|m| m.is_streaming)
            .unwrap_or(false);
        if still_streaming {
            conversation.update(&id, |m| {
                m.is_streaming = false;
            });
        }
    }

    fn ensure_target(&mut self, conversation: &mut Conversation, ids: &dyn MessageIds) -> String {
        if let Some(id) = &self.current {
            if conversation.get(id).is_some() {
                return id.clone();
            }
        }
        let id = ids.next_id(Role::Assistant);
        conversation.append(ChatMessage::assistant_placeholder(id.clone()));
        debug!("Created new assistant message {}", id);
        self.current = Some(id.clone());
        id
    }
}
