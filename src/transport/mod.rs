pub mod http;

use crate::error::TransportError;
use crate::models::chat::HistoryEntry;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

pub use self::http::{ Endpoints, HttpTransport };

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Backend operations the chat client depends on.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Posts one user message and returns the response body as a byte stream.
    async fn post_chat(&self, message: &str) -> Result<ByteStream, TransportError>;

    /// Prior turns, newest first.
    async fn fetch_history(&self) -> Result<Vec<HistoryEntry>, TransportError>;

    async fn fetch_document(&self, file_name: &str) -> Result<String, TransportError>;

    /// Forgets server-side thread state (cookies) so the next send starts a new thread.
    fn reset_session(&self) {}
}
