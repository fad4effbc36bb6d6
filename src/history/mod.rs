use crate::conversation::Conversation;
use crate::error::TransportError;
use crate::models::chat::ChatMessage;
use crate::transport::ChatTransport;
use log::{ error, info };
use tokio::sync::Mutex;

pub const HISTORY_LOAD_FAILED: &str = "Error occurs while loading chat history!";

/// Populates the conversation with prior turns, oldest first.
///
/// On failure a single assistant message announcing it is appended instead;
/// there is no retry.
pub async fn load_history(
    transport: &dyn ChatTransport,
    conversation: &Mutex<Conversation>
) -> Result<usize, TransportError> {
    match transport.fetch_history().await {
        Ok(entries) => {
            let count = entries.len();
            let mut convo = conversation.lock().await;
            for entry in entries.into_iter().rev() {
                convo.append(entry.into_message());
            }
            info!("Loaded {} history messages", count);
            Ok(count)
        }
        Err(e) => {
            error!("Failed to load chat history: {}", e);
            let mut convo = conversation.lock().await;
            convo.append(ChatMessage::assistant_final(String::new(), HISTORY_LOAD_FAILED));
            Err(e)
        }
    }
}
