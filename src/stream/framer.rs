use crate::error::ChatError;
use crate::models::event::StreamEvent;
use crate::stream::decoder::Utf8StreamDecoder;
use log::{ debug, warn };
use serde_json::Value as JsonValue;

pub const DATA_PREFIX: &str = "data: ";

/// Turns arbitrarily chunked bytes into classified stream events.
///
/// Every complete `data: ` line is one event; blank lines and any other SSE
/// fields are dropped, so event boundaries never depend on blank lines.
#[derive(Debug, Default)]
pub struct EventFramer {
    decoder: Utf8StreamDecoder,
    buffer: String,
}

impl EventFramer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        let text = self.decoder.decode(chunk);
        debug!("Raw chunk from stream: {:?}", text);
        self.buffer.push_str(&text);

        let mut events = Vec::new();
        let mut consumed = 0;
        while let Some(offset) = self.buffer[consumed..].find('\n') {
            let boundary = consumed + offset;
            let line = self.buffer[consumed..boundary].trim();
            consumed = boundary + 1;

            debug!("SSE line: {}", line);
            match parse_line(line) {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {}
                Err(e) => warn!("{}", e),
            }
        }
        self.buffer.drain(..consumed);
        events
    }

    /// Called once the reader is exhausted. Text without a trailing newline
    /// never forms an event.
    pub fn finish(&mut self) {
        let tail = self.decoder.finish();
        self.buffer.push_str(&tail);
        if !self.buffer.trim().is_empty() {
            debug!("Discarding unterminated stream tail: {:?}", self.buffer);
        }
        self.buffer.clear();
    }

    pub fn buffered(&self) -> &str {
        &self.buffer
    }
}

/// Parses one trimmed line. `Ok(None)` means the line is not an event.
pub fn parse_line(line: &str) -> Result<Option<StreamEvent>, ChatError> {
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Ok(None);
    };
    let data: JsonValue = serde_json
        ::from_str(payload)
        .map_err(|e| ChatError::MalformedEvent(format!("{} in {:?}", e, payload)))?;
    debug!("Parsed SSE event: {}", data);
    Ok(Some(StreamEvent::classify(data)))
}
