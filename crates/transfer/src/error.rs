//! Error types for the transfer.

use uplink_protocol::NameError;

use crate::stack::StackError;
use crate::status::Status;
use crate::store::StoreError;

/// Why a transfer failed. Network failures carry the status the connection
/// had reached.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("invalid file name: {0}")]
    InvalidName(#[from] NameError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file store: {0}")]
    Storage(#[from] StoreError),

    #[error("connect failed: {0}")]
    Connect(#[source] StackError),

    #[error("write rejected while {status}: {source}")]
    Write { status: Status, source: StackError },

    #[error("no progress for {polls} poll intervals while {status}")]
    Timeout { status: Status, polls: u32 },

    #[error("remote closed while {status} ({sent_len}/{data_len} bytes acknowledged)")]
    RemoteClosed {
        status: Status,
        sent_len: u64,
        data_len: u64,
    },

    #[error("connection aborted while {status}: {source}")]
    Aborted { status: Status, source: StackError },

    #[error("protocol violation while {status}: {detail}")]
    Protocol { status: Status, detail: String },
}

/// Coarse failure classification for callers that only branch on the cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidName,
    Config,
    Storage,
    Connect,
    Write,
    Timeout,
    RemoteClosed,
    Aborted,
    Protocol,
}

impl TransferError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidName(_) => FailureKind::InvalidName,
            Self::Config(_) => FailureKind::Config,
            Self::Storage(_) => FailureKind::Storage,
            Self::Connect(_) => FailureKind::Connect,
            Self::Write { .. } => FailureKind::Write,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::RemoteClosed { .. } => FailureKind::RemoteClosed,
            Self::Aborted { .. } => FailureKind::Aborted,
            Self::Protocol { .. } => FailureKind::Protocol,
        }
    }

    /// The status reached before the failure, for network failures.
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::Connect(_) => Some(Status::Init),
            Self::Write { status, .. }
            | Self::Timeout { status, .. }
            | Self::RemoteClosed { status, .. }
            | Self::Aborted { status, .. }
            | Self::Protocol { status, .. } => Some(*status),
            Self::InvalidName(_) | Self::Config(_) | Self::Storage(_) => None,
        }
    }
}
