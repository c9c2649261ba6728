//! Receiving end of the uplink protocol.
//!
//! Accepts one upload per connection: a fixed-length filename header, then
//! raw bytes until the sender closes. Files land in a base directory under
//! the name from the header.

pub mod error;
pub mod server;

pub use error::ReceiveError;
pub use server::{ReceivedFile, UploadReceiver};

use std::time::Duration;

/// Socket read buffer size (64 KB).
pub const RECV_BUFFER_SIZE: usize = 64 * 1024;

/// Time allowed for the header to arrive after accept.
pub const HEADER_TIMEOUT: Duration = Duration::from_secs(10);

/// Time allowed between two payload reads before the upload is dropped.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(30);
