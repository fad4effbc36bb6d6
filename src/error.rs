use thiserror::Error;

/// Failures of a single HTTP exchange with the backend.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("server responded with HTTP {status}")]
    HttpStatus {
        status: u16,
    },

    #[error("response carried no readable body")]
    StreamUnsupported,

    #[error("network failure: {0}")]
    Network(String),

    #[error("invalid endpoint: {0}")]
    Endpoint(String),

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            TransportError::HttpStatus { status: status.as_u16() }
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

impl From<url::ParseError> for TransportError {
    fn from(err: url::ParseError) -> Self {
        TransportError::Endpoint(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyInput,

    #[error("message failed to send (HTTP {status})")]
    HttpStatus {
        status: u16,
    },

    #[error("response stream unsupported")]
    StreamUnsupported,

    #[error("request aborted")]
    Aborted,

    #[error("message failed to send: {0}")]
    Network(String),

    #[error("malformed event payload: {0}")]
    MalformedEvent(String),

    #[error("server reported an error: {0}")]
    Server(String),

    #[error("no user message with id {0:?}")]
    UnknownMessage(String),
}

impl ChatError {
    /// Whether the user should see a "message failed to send" state.
    pub fn is_send_failure(&self) -> bool {
        matches!(self, ChatError::HttpStatus { .. } | ChatError::Network(_))
    }
}

impl From<TransportError> for ChatError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::HttpStatus { status } => ChatError::HttpStatus { status },
            TransportError::StreamUnsupported => ChatError::StreamUnsupported,
            TransportError::Network(msg) => ChatError::Network(msg),
            TransportError::Endpoint(msg) => ChatError::Network(msg),
            TransportError::Decode(msg) => ChatError::Network(msg),
        }
    }
}
