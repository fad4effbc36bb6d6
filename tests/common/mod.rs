#![allow(dead_code)]

use agent_chat::error::{ ChatError, TransportError };
use agent_chat::models::chat::{ Annotation, ChatMessage, HistoryEntry };
use agent_chat::render::RenderSink;
use agent_chat::transport::{ ByteStream, ChatTransport };
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{ HashMap, VecDeque };
use std::sync::atomic::{ AtomicUsize, Ordering };
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

pub enum Reply {
    Chunks(Vec<&'static str>),
    Channel(mpsc::Receiver<Result<Bytes, TransportError>>),
    Fail(TransportError),
}

/// Backend double that answers each post with the next scripted reply.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    posted: Mutex<Vec<String>>,
    history: Mutex<Option<Result<Vec<HistoryEntry>, TransportError>>>,
    documents: HashMap<String, String>,
    resets: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, reply: Reply) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn history(self, history: Result<Vec<HistoryEntry>, TransportError>) -> Self {
        *self.history.lock().unwrap() = Some(history);
        self
    }

    pub fn document(mut self, name: &str, text: &str) -> Self {
        self.documents.insert(name.to_string(), text.to_string());
        self
    }

    pub fn posted(&self) -> Vec<String> {
        self.posted.lock().unwrap().clone()
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn post_chat(&self, message: &str) -> Result<ByteStream, TransportError> {
        self.posted.lock().unwrap().push(message.to_string());
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Chunks(chunks)) => {
                let items: Vec<Result<Bytes, TransportError>> = chunks
                    .into_iter()
                    .map(|c| Ok(Bytes::from_static(c.as_bytes())))
                    .collect();
                Ok(Box::pin(futures::stream::iter(items)))
            }
            Some(Reply::Channel(rx)) => Ok(Box::pin(ReceiverStream::new(rx))),
            Some(Reply::Fail(e)) => Err(e),
            None => Err(TransportError::Network("no scripted reply".into())),
        }
    }

    async fn fetch_history(&self) -> Result<Vec<HistoryEntry>, TransportError> {
        self.history.lock().unwrap().take().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_document(&self, file_name: &str) -> Result<String, TransportError> {
        self.documents
            .get(file_name)
            .cloned()
            .ok_or(TransportError::HttpStatus { status: 404 })
    }

    fn reset_session(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Appended(String),
    Updated {
        id: String,
        content: String,
        is_streaming: bool,
    },
    Responding(bool),
    SendFailed(String),
    Cleared,
}

/// Records every notification the conversation emits.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: SinkEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl RenderSink for RecordingSink {
    fn on_message_appended(&self, message: &ChatMessage) {
        self.push(SinkEvent::Appended(message.id.clone()));
    }

    fn on_content_updated(
        &self,
        message_id: &str,
        content: &str,
        is_streaming: bool,
        _annotations: &[Annotation]
    ) {
        self.push(SinkEvent::Updated {
            id: message_id.to_string(),
            content: content.to_string(),
            is_streaming,
        });
    }

    fn on_responding_changed(&self, responding: bool) {
        self.push(SinkEvent::Responding(responding));
    }

    fn on_send_failed(&self, message_id: &str, _error: &ChatError) {
        self.push(SinkEvent::SendFailed(message_id.to_string()));
    }

    fn on_conversation_cleared(&self) {
        self.push(SinkEvent::Cleared);
    }
}

pub fn chunk(text: &'static str) -> Result<Bytes, TransportError> {
    Ok(Bytes::from_static(text.as_bytes()))
}
