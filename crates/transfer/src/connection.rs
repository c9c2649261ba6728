//! Per-transfer connection state machine.
//!
//! A [`Connection`] owns everything one upload needs: the stack handle, the
//! open file, the header and the byte counters. It is driven from outside by
//! two inputs only:
//! - [`Connection::handle`] for every [`StackEvent`] the stack reports.
//! - [`Connection::on_poll`] once per poll interval.
//!
//! Both return a [`Step`]. On any error the handle has already been released
//! when the error is returned, and every later input is ignored.

use std::net::SocketAddr;

use tracing::{debug, trace, warn};
use uplink_protocol::FileHeader;

use crate::config::UploadConfig;
use crate::error::TransferError;
use crate::stack::{Pcb, PcbId, StackEvent, TcpStack};
use crate::status::Status;
use crate::store::{FileSource, StoreError};

/// What an input did to the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The transfer is still in flight.
    Continue,
    /// The input was for a stale or released endpoint and changed nothing.
    Ignored,
    /// Every payload byte is acknowledged; the handle has been released.
    Complete,
}

/// One in-flight upload.
pub struct Connection<S: FileSource> {
    pcb: Option<Pcb>,
    pcb_id: PcbId,
    remote_addr: SocketAddr,
    status: Status,
    trail: Vec<Status>,

    header: FileHeader,
    header_queued: usize,
    header_acked: usize,

    source: S,
    data_len: u64,
    queued_len: u64,
    sent_len: u64,
    pending: Vec<u8>,
    pending_off: usize,
    read_buf_len: usize,

    stalled_polls: u32,
    max_stalled_polls: u32,
}

impl<S: FileSource> Connection<S> {
    /// Requests a connection to `config.server` and returns the record in
    /// [`Status::Init`].
    pub fn open<T: TcpStack>(
        stack: &mut T,
        source: S,
        header: FileHeader,
        config: &UploadConfig,
    ) -> Result<Self, TransferError> {
        let remote_addr = config.server;
        let pcb = stack.connect(remote_addr).map_err(TransferError::Connect)?;
        let data_len = source.len();

        debug!(
            pcb = %pcb.id(),
            %remote_addr,
            file = header.name(),
            data_len,
            "connect requested"
        );

        Ok(Self {
            pcb_id: pcb.id(),
            pcb: Some(pcb),
            remote_addr,
            status: Status::Init,
            trail: vec![Status::Init],
            header,
            header_queued: 0,
            header_acked: 0,
            source,
            data_len,
            queued_len: 0,
            sent_len: 0,
            pending: Vec::new(),
            pending_off: 0,
            read_buf_len: config.read_buf_len,
            stalled_polls: 0,
            max_stalled_polls: config.max_stalled_polls,
        })
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Every status this connection has been in, oldest first.
    pub fn trail(&self) -> &[Status] {
        &self.trail
    }

    pub fn pcb_id(&self) -> PcbId {
        self.pcb_id
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Payload length in bytes.
    pub fn data_len(&self) -> u64 {
        self.data_len
    }

    /// Payload bytes acknowledged by the peer.
    pub fn sent_len(&self) -> u64 {
        self.sent_len
    }

    /// Payload bytes accepted by the stack, acknowledged or not.
    pub fn queued_len(&self) -> u64 {
        self.queued_len
    }

    /// Whether the handle is still held.
    pub fn is_live(&self) -> bool {
        self.pcb.is_some()
    }

    /// Applies one stack event.
    pub fn handle<T: TcpStack>(
        &mut self,
        stack: &mut T,
        event: StackEvent,
    ) -> Result<Step, TransferError> {
        if !self.is_live() || event.pcb() != self.pcb_id {
            trace!(live = %self.pcb_id, event = ?event, "ignoring stale event");
            return Ok(Step::Ignored);
        }

        let result = self.on_event(stack, event);
        self.settle(stack, result)
    }

    /// Applies one poll tick: retries pending writes and aborts the transfer
    /// once `max_stalled_polls` consecutive intervals pass without progress.
    pub fn on_poll<T: TcpStack>(&mut self, stack: &mut T) -> Result<Step, TransferError> {
        if !self.is_live() {
            return Ok(Step::Ignored);
        }

        let result = self.poll_tick(stack);
        self.settle(stack, result)
    }

    fn settle<T: TcpStack>(
        &mut self,
        stack: &mut T,
        result: Result<Step, TransferError>,
    ) -> Result<Step, TransferError> {
        match result {
            Ok(Step::Complete) => {
                self.release(stack);
                Ok(Step::Complete)
            }
            Ok(step) => Ok(step),
            Err(e) => {
                warn!(pcb = %self.pcb_id, status = %self.status, error = %e, "transfer aborted");
                self.release(stack);
                Err(e)
            }
        }
    }

    fn on_event<T: TcpStack>(
        &mut self,
        stack: &mut T,
        event: StackEvent,
    ) -> Result<Step, TransferError> {
        match event {
            StackEvent::Connected { .. } => {
                if self.status != Status::Init {
                    return Err(self.protocol("duplicate connect completion"));
                }
                self.advance(Status::Connected)?;
                self.made_progress();
                self.pump(stack)?;
                self.check_complete()
            }
            StackEvent::ConnectFailed { error, .. } => {
                if self.status != Status::Init {
                    return Err(TransferError::Aborted {
                        status: self.status,
                        source: error,
                    });
                }
                Err(TransferError::Connect(error))
            }
            StackEvent::Sent { len, .. } => {
                self.acknowledge(len)?;
                self.pump(stack)?;
                self.check_complete()
            }
            StackEvent::Received { len, .. } => {
                // The server sends no application-level reply.
                debug!(pcb = %self.pcb_id, len, "discarding received data");
                Ok(Step::Continue)
            }
            StackEvent::RemoteClosed { .. } => Err(TransferError::RemoteClosed {
                status: self.status,
                sent_len: self.sent_len,
                data_len: self.data_len,
            }),
            StackEvent::Error { error, .. } => Err(TransferError::Aborted {
                status: self.status,
                source: error,
            }),
        }
    }

    fn poll_tick<T: TcpStack>(&mut self, stack: &mut T) -> Result<Step, TransferError> {
        let before = self.stalled_polls;
        self.stalled_polls += 1;
        self.pump(stack)?;

        // `pump` resets the counter when it queued anything.
        if self.stalled_polls > before && self.stalled_polls >= self.max_stalled_polls {
            return Err(TransferError::Timeout {
                status: self.status,
                polls: self.stalled_polls,
            });
        }
        trace!(pcb = %self.pcb_id, status = %self.status, stalled = self.stalled_polls, "poll");
        self.check_complete()
    }

    /// Credits `len` acknowledged bytes: header bytes first, then payload.
    fn acknowledge(&mut self, len: usize) -> Result<(), TransferError> {
        let header_len = self.header.len();
        let unacked_header = self.header_queued - self.header_acked;
        let unacked_payload = self.queued_len - self.sent_len;
        if len as u64 > unacked_header as u64 + unacked_payload {
            return Err(self.protocol(&format!(
                "acknowledged {len} bytes with only {} in flight",
                unacked_header as u64 + unacked_payload
            )));
        }

        let header_part = len.min(unacked_header);
        self.header_acked += header_part;
        self.sent_len += (len - header_part) as u64;
        debug_assert!(self.header_acked <= header_len);
        debug_assert!(self.sent_len <= self.data_len);

        if len > 0 {
            self.made_progress();
        }
        trace!(
            pcb = %self.pcb_id,
            len,
            sent_len = self.sent_len,
            data_len = self.data_len,
            "acknowledged"
        );
        Ok(())
    }

    /// Offers as many bytes to the stack as it will take, advancing status
    /// as each phase is fully queued.
    fn pump<T: TcpStack>(&mut self, stack: &mut T) -> Result<(), TransferError> {
        loop {
            match self.status {
                Status::Init | Status::DataSent | Status::Success => return Ok(()),
                Status::Connected => {
                    let n = self.write(stack, HeaderOrPayload::Header)?;
                    if self.header_queued < self.header.len() {
                        if n == 0 {
                            return Ok(());
                        }
                        continue;
                    }
                    self.advance(Status::HeaderOk)?;
                }
                Status::HeaderOk => {
                    if self.queued_len == self.data_len {
                        self.advance(Status::DataSent)?;
                        return Ok(());
                    }
                    if self.pending_off == self.pending.len() {
                        self.refill()?;
                    }
                    if self.write(stack, HeaderOrPayload::Payload)? == 0 {
                        return Ok(());
                    }
                }
            }
        }
    }

    fn write<T: TcpStack>(
        &mut self,
        stack: &mut T,
        what: HeaderOrPayload,
    ) -> Result<usize, TransferError> {
        let Some(pcb) = self.pcb.as_ref() else {
            return Ok(0);
        };
        let data = match what {
            HeaderOrPayload::Header => &self.header.as_bytes()[self.header_queued..],
            HeaderOrPayload::Payload => &self.pending[self.pending_off..],
        };
        let offered = data.len();
        let n = stack.write(pcb, data).map_err(|source| TransferError::Write {
            status: self.status,
            source,
        })?;
        if n > offered {
            return Err(self.protocol(&format!("stack accepted {n} of {offered} bytes")));
        }

        match what {
            HeaderOrPayload::Header => self.header_queued += n,
            HeaderOrPayload::Payload => {
                self.pending_off += n;
                self.queued_len += n as u64;
            }
        }
        if n > 0 {
            self.made_progress();
        }
        trace!(pcb = %self.pcb_id, ?what, offered, accepted = n, "write");
        Ok(n)
    }

    /// Reads the next chunk of the file into the pending buffer.
    fn refill(&mut self) -> Result<(), TransferError> {
        let want = (self.data_len - self.queued_len).min(self.read_buf_len as u64) as usize;
        self.pending.resize(want, 0);
        let n = self.source.read_chunk(&mut self.pending)?;
        if n == 0 {
            return Err(StoreError::Truncated {
                expected: self.data_len,
                actual: self.queued_len,
            }
            .into());
        }
        self.pending.truncate(n);
        self.pending_off = 0;
        Ok(())
    }

    fn check_complete(&mut self) -> Result<Step, TransferError> {
        if self.status == Status::DataSent
            && self.header_acked == self.header.len()
            && self.sent_len == self.data_len
        {
            self.advance(Status::Success)?;
            return Ok(Step::Complete);
        }
        Ok(Step::Continue)
    }

    fn advance(&mut self, next: Status) -> Result<(), TransferError> {
        debug_assert!(
            self.status.can_advance_to(next),
            "illegal transition {} -> {next}",
            self.status
        );
        if !self.status.can_advance_to(next) {
            return Err(self.protocol(&format!("illegal transition to {next}")));
        }
        debug!(pcb = %self.pcb_id, from = %self.status, to = %next, "status");
        self.status = next;
        self.trail.push(next);
        Ok(())
    }

    fn made_progress(&mut self) {
        self.stalled_polls = 0;
    }

    fn protocol(&self, detail: &str) -> TransferError {
        TransferError::Protocol {
            status: self.status,
            detail: detail.into(),
        }
    }

    fn release<T: TcpStack>(&mut self, stack: &mut T) {
        if let Some(pcb) = self.pcb.take() {
            debug!(pcb = %pcb.id(), status = %self.status, "releasing pcb");
            stack.close(pcb);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum HeaderOrPayload {
    Header,
    Payload,
}
