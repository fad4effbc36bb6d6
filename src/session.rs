use crate::conversation::{ Conversation, MessageIds };
use crate::error::TransportError;
use crate::stream::{ EventFramer, Flow, StreamReducer };
use crate::transport::ByteStream;
use futures::StreamExt;
use log::{ error, info };
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug)]
pub enum SessionEnd {
    /// The reader reported no more chunks.
    Exhausted,
    /// The stream carried an explicit error event.
    ServerError(String),
    ReadFailed(TransportError),
    /// A newer session claimed the conversation before this one finished.
    Superseded,
}

/// One request/response exchange: framing buffer plus the message it builds.
pub struct StreamSession {
    id: Uuid,
    framer: EventFramer,
    reducer: StreamReducer,
}

impl StreamSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            framer: EventFramer::new(),
            reducer: StreamReducer::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Frames and reduces one chunk in full.
    pub fn apply_chunk(
        &mut self,
        chunk: &[u8],
        conversation: &mut Conversation,
        ids: &dyn MessageIds
    ) -> Flow {
        for event in self.framer.push(chunk) {
            if let Flow::Halt(message) = self.reducer.apply(conversation, ids, event) {
                return Flow::Halt(message);
            }
        }
        Flow::Continue
    }

    /// Reads until the stream is exhausted, fails, reports an error event or
    /// loses the conversation to a newer session. The conversation lock is
    /// held for the whole of each chunk.
    pub async fn run(
        &mut self,
        mut stream: ByteStream,
        conversation: &Mutex<Conversation>,
        ids: &dyn MessageIds
    ) -> SessionEnd {
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => {
                    let mut convo = conversation.lock().await;
                    if !convo.holds_turn(self.id) {
                        info!(
                            "Session {} superseded, dropping its stream (message {:?}).",
                            self.id,
                            self.reducer.current_message()
                        );
                        return SessionEnd::Superseded;
                    }
                    if let Flow::Halt(message) = self.apply_chunk(&bytes, &mut convo, ids) {
                        return SessionEnd::ServerError(message);
                    }
                }
                Err(e) => {
                    error!("Stream reading failed: {}", e);
                    return SessionEnd::ReadFailed(e);
                }
            }
        }
        self.framer.finish();
        info!("SSE stream ended by server.");
        SessionEnd::Exhausted
    }

    /// Tears the session down. A message left mid-stream keeps its content
    /// but is no longer in progress.
    pub fn close(&mut self, conversation: &mut Conversation) {
        self.reducer.release(conversation);
        if conversation.release_turn(self.id) {
            conversation.set_responding(false);
        }
    }
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}
