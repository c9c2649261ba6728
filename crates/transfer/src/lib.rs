//! Single-file upload over a non-blocking TCP stack.
//!
//! One call to [`send_file`] opens one connection, writes the filename
//! header, streams the file, and waits until every payload byte has been
//! acknowledged. The [`Connection`] state machine is purely reactive: it only
//! moves when the [`TcpStack`] reports an event or the poll timer ticks.
//!
//! ```text
//!  Init ──connected──▶ Connected ──header queued──▶ HeaderOk
//!                                                      │
//!                                          last byte queued
//!                                                      ▼
//!                        Success ◀──all bytes acked── DataSent
//! ```
//!
//! Any error, remote close, or too many stalled poll intervals aborts the
//! transfer from any non-terminal state.

pub mod config;
pub mod connection;
pub mod error;
pub mod send;
pub mod stack;
pub mod status;
pub mod store;
pub mod tokio_stack;

#[cfg(test)]
mod mock;

pub use config::UploadConfig;
pub use connection::{Connection, Step};
pub use error::{FailureKind, TransferError};
pub use send::{TransferSummary, send_file, send_file_ok};
pub use stack::{Pcb, PcbId, StackError, StackEvent, TcpStack};
pub use status::Status;
pub use store::{DirStore, FileSource, FileStore, StoreError};
pub use tokio_stack::TokioStack;

use std::time::Duration;

/// Default upload server.
pub const DEFAULT_SERVER: &str = "40.68.254.87:557";

/// Default interval between liveness polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default number of consecutive poll intervals without progress before the
/// transfer is aborted.
pub const DEFAULT_MAX_STALLED_POLLS: u32 = 4;

/// Default size of the file read buffer.
pub const DEFAULT_READ_BUF_LEN: usize = 1024;

/// Default send buffer capacity of [`TokioStack`] (two 1460-byte segments).
pub const DEFAULT_SEND_BUFFER_LEN: usize = 2 * 1460;
