//! Upload configuration.

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uplink_protocol::NamingRule;

use crate::error::TransferError;
use crate::{
    DEFAULT_MAX_STALLED_POLLS, DEFAULT_POLL_INTERVAL, DEFAULT_READ_BUF_LEN,
    DEFAULT_SEND_BUFFER_LEN, DEFAULT_SERVER,
};

/// Everything a transfer needs to know that is not the file itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Upload server address.
    #[serde(default = "default_server")]
    pub server: SocketAddr,

    /// Liveness poll interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Consecutive poll intervals without progress before aborting.
    #[serde(default = "default_max_stalled_polls")]
    pub max_stalled_polls: u32,

    /// Bytes read from the file store per chunk.
    #[serde(default = "default_read_buf_len")]
    pub read_buf_len: usize,

    /// Send buffer capacity of the TCP stack.
    #[serde(default = "default_send_buffer_len")]
    pub send_buffer_len: usize,

    /// Upload filename convention.
    #[serde(default)]
    pub naming: NamingRule,
}

fn default_server() -> SocketAddr {
    DEFAULT_SERVER
        .parse()
        .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 557)))
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

fn default_max_stalled_polls() -> u32 {
    DEFAULT_MAX_STALLED_POLLS
}

fn default_read_buf_len() -> usize {
    DEFAULT_READ_BUF_LEN
}

fn default_send_buffer_len() -> usize {
    DEFAULT_SEND_BUFFER_LEN
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            poll_interval_ms: default_poll_interval_ms(),
            max_stalled_polls: default_max_stalled_polls(),
            read_buf_len: default_read_buf_len(),
            send_buffer_len: default_send_buffer_len(),
            naming: NamingRule::default(),
        }
    }
}

impl UploadConfig {
    /// Default configuration pointed at `server`.
    pub fn with_server(server: SocketAddr) -> Self {
        Self {
            server,
            ..Self::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Rejects values the state machine cannot run with.
    pub fn check(&self) -> Result<(), TransferError> {
        if self.poll_interval_ms == 0 {
            return Err(TransferError::Config("poll_interval_ms must be > 0".into()));
        }
        if self.max_stalled_polls == 0 {
            return Err(TransferError::Config("max_stalled_polls must be > 0".into()));
        }
        if self.read_buf_len == 0 {
            return Err(TransferError::Config("read_buf_len must be > 0".into()));
        }
        if self.send_buffer_len == 0 {
            return Err(TransferError::Config("send_buffer_len must be > 0".into()));
        }
        self.naming.check()?;
        Ok(())
    }
}
