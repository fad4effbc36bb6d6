use crate::conversation::{ Conversation, MessageIds, UuidIds };
use crate::error::{ ChatError, TransportError };
use crate::history;
use crate::models::chat::{ ChatMessage, Role };
use crate::render::RenderSink;
use crate::session::{ SessionEnd, StreamSession };
use crate::transport::ChatTransport;

use futures::future::{ AbortHandle, Abortable, Aborted };
use log::{ debug, error, info };
use std::sync::{ Arc, Mutex as StdMutex, MutexGuard };
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input; nothing was sent or recorded.
    Rejected,
    /// The response stream ran to completion.
    Completed,
}

struct InFlight {
    session_id: Uuid,
    handle: AbortHandle,
}

/// Owns the conversation and at most one in-flight stream session.
pub struct ChatClient {
    transport: Arc<dyn ChatTransport>,
    conversation: Arc<Mutex<Conversation>>,
    ids: Arc<dyn MessageIds>,
    in_flight: StdMutex<Option<InFlight>>,
}

impl ChatClient {
    pub fn new(transport: Arc<dyn ChatTransport>, sink: Arc<dyn RenderSink>) -> Self {
        Self::with_ids(transport, sink, Arc::new(UuidIds))
    }

    pub fn with_ids(
        transport: Arc<dyn ChatTransport>,
        sink: Arc<dyn RenderSink>,
        ids: Arc<dyn MessageIds>
    ) -> Self {
        Self {
            transport,
            conversation: Arc::new(Mutex::new(Conversation::new(sink))),
            ids,
            in_flight: StdMutex::new(None),
        }
    }

    pub fn conversation(&self) -> Arc<Mutex<Conversation>> {
        Arc::clone(&self.conversation)
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.conversation.lock().await.messages().to_vec()
    }

    pub async fn is_responding(&self) -> bool {
        self.conversation.lock().await.is_responding()
    }

    pub fn has_in_flight(&self) -> bool {
        self.in_flight_slot().is_some()
    }

    pub async fn load_history(&self) -> Result<usize, ChatError> {
        history
            ::load_history(self.transport.as_ref(), &self.conversation).await
            .map_err(ChatError::from)
    }

    /// Sends one user message and streams the reply into the conversation.
    ///
    /// Any session still in flight is aborted first, so only one stream ever
    /// writes to the conversation. An abort surfaces as `ChatError::Aborted`
    /// and an error event from the server as `ChatError::Server`.
    pub async fn send_message(&self, text: &str) -> Result<SendOutcome, ChatError> {
        let message = match validate_input(text) {
            Ok(message) => message,
            Err(e) => {
                debug!("Not sending: {}", e);
                return Ok(SendOutcome::Rejected);
            }
        };

        info!("Sending message: {}", message);

        // Registering aborts any previous session before this one touches state.
        let mut session = StreamSession::new();
        let (handle, registration) = AbortHandle::new_pair();
        self.register(session.id(), handle);

        let user_id = self.ids.next_id(Role::User);
        {
            let mut convo = self.conversation.lock().await;
            convo.claim_turn(session.id());
            convo.append(ChatMessage::user(user_id.clone(), message));
            convo.set_responding(true);
        }

        let result = Abortable::new(self.exchange(&mut session, message), registration).await;

        self.unregister(session.id());
        let mut convo = self.conversation.lock().await;
        session.close(&mut convo);

        match result {
            Err(Aborted) | Ok(Ok(SessionEnd::Superseded)) => {
                info!("Fetch request aborted by user.");
                Err(ChatError::Aborted)
            }
            Ok(Ok(SessionEnd::Exhausted)) => Ok(SendOutcome::Completed),
            Ok(Ok(SessionEnd::ServerError(message))) => Err(ChatError::Server(message)),
            Ok(Ok(SessionEnd::ReadFailed(e))) => Err(ChatError::from(e)),
            Ok(Err(e)) => {
                let err = ChatError::from(e);
                error!("Fetch failed: {}", err);
                if err.is_send_failure() {
                    convo.mark_send_failed(&user_id, &err);
                }
                Err(err)
            }
        }
    }

    /// Aborts the in-flight session, if any.
    pub fn cancel(&self) {
        if let Some(in_flight) = self.in_flight_slot().take() {
            in_flight.handle.abort();
            info!("Abort signaled to cancel ongoing request {}.", in_flight.session_id);
        }
    }

    /// Cancels, forgets the thread cookies and empties the conversation.
    pub async fn new_thread(&self) {
        self.cancel();
        self.transport.reset_session();
        self.conversation.lock().await.clear();
        info!("Started a new thread.");
    }

    /// Text of a live user message, handed back for editing.
    pub async fn edit_message(&self, message_id: &str) -> Option<String> {
        let convo = self.conversation.lock().await;
        convo
            .get(message_id)
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.clone())
    }

    pub async fn last_user_message_id(&self) -> Option<String> {
        self.conversation
            .lock().await
            .last_user_message()
            .map(|m| m.id.clone())
    }

    /// Sends the text of an earlier user message again as a new turn.
    pub async fn resubmit(&self, message_id: &str) -> Result<SendOutcome, ChatError> {
        let text = self
            .edit_message(message_id).await
            .ok_or_else(|| ChatError::UnknownMessage(message_id.to_string()))?;
        debug!("Resubmitting {}", message_id);
        self.send_message(&text).await
    }

    pub async fn fetch_document(&self, file_name: &str) -> Result<String, ChatError> {
        self.transport.fetch_document(file_name).await.map_err(|e| {
            error!("Error fetching document '{}': {}", file_name, e);
            ChatError::from(e)
        })
    }

    async fn exchange(
        &self,
        session: &mut StreamSession,
        message: &str
    ) -> Result<SessionEnd, TransportError> {
        let stream = self.transport.post_chat(message).await?;
        info!("Starting to handle streaming response...");
        Ok(session.run(stream, &self.conversation, self.ids.as_ref()).await)
    }

    fn register(&self, session_id: Uuid, handle: AbortHandle) {
        let previous = self.in_flight_slot().replace(InFlight { session_id, handle });
        if let Some(previous) = previous {
            previous.handle.abort();
            info!("Superseded in-flight request {}.", previous.session_id);
        }
    }

    /// Clears the slot if it still belongs to `session_id`.
    fn unregister(&self, session_id: Uuid) {
        let mut slot = self.in_flight_slot();
        if slot.as_ref().is_some_and(|current| current.session_id == session_id) {
            *slot = None;
        }
    }

    fn in_flight_slot(&self) -> MutexGuard<'_, Option<InFlight>> {
        self.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Trims the input; blank messages are never sent.
pub fn validate_input(text: &str) -> Result<&str, ChatError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(ChatError::EmptyInput)
    } else {
        Ok(trimmed)
    }
}
