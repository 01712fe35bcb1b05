//! Error types for the messaging subsystem.

#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    #[error("Request on topic '{topic}' timed out after {timeout_ms}ms")]
    Timeout { topic: String, timeout_ms: u64 },

    #[error("Request on topic '{topic}' was canceled before a reply arrived")]
    Canceled { topic: String },

    #[error("Handler error on topic '{topic}': {message}")]
    Handler { topic: String, message: String },

    #[error("Internal messaging error: {0}")]
    Internal(String),
}

pub type MessagingResult<T> = std::result::Result<T, MessagingError>;
