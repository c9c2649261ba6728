//! Error types for the receiver.

/// Errors produced while receiving an upload.
#[derive(Debug, thiserror::Error)]
pub enum ReceiveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad header: {0}")]
    Header(#[from] uplink_protocol::HeaderError),

    #[error("timed out")]
    Timeout,

    #[error("cancelled")]
    Cancelled,
}
