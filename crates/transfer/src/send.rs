//! The `send_file` entry point.

use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};
use uplink_protocol::FileHeader;

use crate::config::UploadConfig;
use crate::connection::{Connection, Step};
use crate::error::TransferError;
use crate::stack::{StackEvent, TcpStack};
use crate::status::Status;
use crate::store::FileStore;

/// What a successful transfer did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSummary {
    pub filename: String,
    pub data_len: u64,
    pub sent_len: u64,
    pub elapsed: Duration,
    /// Every status the connection passed through.
    pub trail: Vec<Status>,
}

enum Wake {
    Event(StackEvent),
    Tick,
}

/// Uploads `filename` from `store` to `config.server` over `stack`.
///
/// Returns once every payload byte is acknowledged or the transfer fails.
/// Exactly one connection is opened and it is always released before this
/// returns.
pub async fn send_file<T, F>(
    stack: &mut T,
    store: &F,
    config: &UploadConfig,
    filename: &str,
) -> Result<TransferSummary, TransferError>
where
    T: TcpStack,
    F: FileStore,
{
    config.check()?;
    let header = FileHeader::new(filename, &config.naming)?;
    let source = store.open(filename)?;

    let started = Instant::now();
    let mut conn = Connection::open(stack, source, header, config)?;
    info!(
        file = conn.header().name(),
        server = %conn.remote_addr(),
        pcb = %conn.pcb_id(),
        header_len = conn.header().len(),
        data_len = conn.data_len(),
        "upload started"
    );

    let period = config.poll_interval();
    let mut ticker = tokio::time::interval_at(started + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let wake = tokio::select! {
            event = stack.next_event() => Wake::Event(event),
            _ = ticker.tick() => Wake::Tick,
        };

        let step = match wake {
            Wake::Event(event) => conn.handle(stack, event),
            Wake::Tick => conn.on_poll(stack),
        };

        match step {
            Ok(Step::Continue | Step::Ignored) => {}
            Ok(Step::Complete) => break,
            Err(e) => {
                warn!(file = filename, error = %e, "upload failed");
                return Err(e);
            }
        }
    }

    let summary = TransferSummary {
        filename: filename.into(),
        data_len: conn.data_len(),
        sent_len: conn.sent_len(),
        elapsed: started.elapsed(),
        trail: conn.trail().to_vec(),
    };
    info!(
        file = filename,
        bytes = summary.sent_len,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "upload complete"
    );
    Ok(summary)
}

/// [`send_file`] reduced to whether the file was delivered.
pub async fn send_file_ok<T, F>(
    stack: &mut T,
    store: &F,
    config: &UploadConfig,
    filename: &str,
) -> bool
where
    T: TcpStack,
    F: FileStore,
{
    send_file(stack, store, config, filename).await.is_ok()
}
