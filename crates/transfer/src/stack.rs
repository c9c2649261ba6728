//! The non-blocking TCP stack seam.
//!
//! The state machine never touches sockets directly. It asks a [`TcpStack`]
//! to connect, write, and close, and learns about everything else through
//! [`StackEvent`]s returned by [`TcpStack::next_event`].

use std::future::Future;
use std::io;
use std::net::SocketAddr;

/// Identifies one endpoint inside a stack. Carried by every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PcbId(pub u64);

impl std::fmt::Display for PcbId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pcb#{}", self.0)
    }
}

/// Owned handle to a TCP endpoint.
///
/// Not `Clone`: whoever holds it releases it by moving it into
/// [`TcpStack::close`], so a handle can only be released once.
#[derive(Debug, PartialEq, Eq)]
pub struct Pcb {
    id: PcbId,
}

impl Pcb {
    /// Creates a handle. Only stack implementations should call this.
    pub fn new(id: PcbId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> PcbId {
        self.id
    }
}

/// Errors reported by a TCP stack.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StackError {
    #[error("connection refused")]
    Refused,

    #[error("host unreachable")]
    Unreachable,

    #[error("timed out")]
    TimedOut,

    #[error("connection reset")]
    Reset,

    #[error("out of buffer memory")]
    Memory,

    #[error("not connected")]
    NotConnected,

    #[error("stack already has a connection in flight")]
    Busy,

    #[error("I/O error: {0}")]
    Io(String),
}

impl StackError {
    /// Maps an OS error onto the stack's error set.
    pub fn from_io(e: &io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::ConnectionRefused => Self::Refused,
            io::ErrorKind::HostUnreachable | io::ErrorKind::NetworkUnreachable => {
                Self::Unreachable
            }
            io::ErrorKind::TimedOut => Self::TimedOut,
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => Self::Reset,
            io::ErrorKind::NotConnected => Self::NotConnected,
            io::ErrorKind::OutOfMemory => Self::Memory,
            _ => Self::Io(e.to_string()),
        }
    }
}

/// Completion notifications delivered by the stack, in the order the stack
/// processed them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackEvent {
    /// The handshake completed.
    Connected { pcb: PcbId },
    /// The connection attempt failed.
    ConnectFailed { pcb: PcbId, error: StackError },
    /// `len` more bytes were acknowledged by the peer.
    Sent { pcb: PcbId, len: usize },
    /// The peer sent `len` bytes.
    Received { pcb: PcbId, len: usize },
    /// The peer closed its side of the connection.
    RemoteClosed { pcb: PcbId },
    /// The connection was aborted by the stack.
    Error { pcb: PcbId, error: StackError },
}

impl StackEvent {
    /// The endpoint this event belongs to.
    pub fn pcb(&self) -> PcbId {
        match self {
            Self::Connected { pcb }
            | Self::ConnectFailed { pcb, .. }
            | Self::Sent { pcb, .. }
            | Self::Received { pcb, .. }
            | Self::RemoteClosed { pcb }
            | Self::Error { pcb, .. } => *pcb,
        }
    }
}

/// A non-blocking TCP stack with event-based completion.
pub trait TcpStack {
    /// Requests a connection to `addr`. Completion arrives as
    /// [`StackEvent::Connected`] or [`StackEvent::ConnectFailed`].
    fn connect(&mut self, addr: SocketAddr) -> Result<Pcb, StackError>;

    /// Queues up to `data.len()` bytes and returns how many were accepted.
    ///
    /// Accepting fewer bytes (including zero) means the send buffer is full;
    /// the caller offers the rest at a later write opportunity.
    fn write(&mut self, pcb: &Pcb, data: &[u8]) -> Result<usize, StackError>;

    /// Releases the endpoint. Events for it are never delivered afterwards.
    fn close(&mut self, pcb: Pcb);

    /// Waits for the stack to produce its next event.
    ///
    /// Must be cancel safe: dropping the future before it completes loses
    /// no event.
    fn next_event(&mut self) -> impl Future<Output = StackEvent> + Send;
}
