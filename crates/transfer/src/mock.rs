//! Scripted stack and in-memory store for state machine tests.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;

use crate::stack::{Pcb, PcbId, StackError, StackEvent, TcpStack};
use crate::store::{FileSource, FileStore, StoreError};

/// How the mock answers a connect request.
#[derive(Debug, Clone)]
pub(crate) enum OnConnect {
    Complete,
    Fail(StackError),
    Hang,
    Reject(StackError),
}

pub(crate) struct MockStack {
    next_id: u64,
    on_connect: OnConnect,
    auto_ack: bool,
    events: VecDeque<StackEvent>,
    write_limits: VecDeque<usize>,
    write_error: Option<StackError>,
    inject_after: Option<(usize, fn(PcbId) -> StackEvent)>,
    abort_delivered: bool,
    writes_after_abort: usize,
    live: Option<PcbId>,
    connects: Vec<SocketAddr>,
    write_calls: Vec<(usize, usize)>,
    wire: Vec<u8>,
    closed: Vec<PcbId>,
}

impl MockStack {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 1,
            on_connect: OnConnect::Complete,
            auto_ack: false,
            events: VecDeque::new(),
            write_limits: VecDeque::new(),
            write_error: None,
            inject_after: None,
            abort_delivered: false,
            writes_after_abort: 0,
            live: None,
            connects: Vec::new(),
            write_calls: Vec::new(),
            wire: Vec::new(),
            closed: Vec::new(),
        }
    }

    /// A stack that completes connects and acknowledges every accepted byte.
    pub(crate) fn acking() -> Self {
        let mut stack = Self::new();
        stack.auto_ack = true;
        stack
    }

    pub(crate) fn on_connect(&mut self, behavior: OnConnect) {
        self.on_connect = behavior;
    }

    /// Caps the bytes accepted by successive write calls. Calls past the
    /// end of the list accept everything.
    pub(crate) fn limit_writes(&mut self, limits: impl IntoIterator<Item = usize>) {
        self.write_limits.extend(limits);
    }

    pub(crate) fn fail_next_write(&mut self, error: StackError) {
        self.write_error = Some(error);
    }

    /// Queues a reset at the first write call after `bytes` bytes were
    /// written. That call accepts nothing.
    pub(crate) fn reset_after(&mut self, bytes: usize) {
        self.inject_after = Some((bytes, |pcb| StackEvent::Error {
            pcb,
            error: StackError::Reset,
        }));
    }

    /// Like [`reset_after`](Self::reset_after) but the peer closes instead.
    pub(crate) fn close_after(&mut self, bytes: usize) {
        self.inject_after = Some((bytes, |pcb| StackEvent::RemoteClosed { pcb }));
    }

    pub(crate) fn push(&mut self, event: StackEvent) {
        self.events.push_back(event);
    }

    pub(crate) fn connects(&self) -> &[SocketAddr] {
        &self.connects
    }

    /// `(offered, accepted)` for every write call.
    pub(crate) fn write_calls(&self) -> &[(usize, usize)] {
        &self.write_calls
    }

    /// Write calls made after a reset or close was delivered.
    pub(crate) fn writes_after_abort(&self) -> usize {
        self.writes_after_abort
    }

    pub(crate) fn wire(&self) -> &[u8] {
        &self.wire
    }

    pub(crate) fn closed(&self) -> &[PcbId] {
        &self.closed
    }
}

impl TcpStack for MockStack {
    fn connect(&mut self, addr: SocketAddr) -> Result<Pcb, StackError> {
        if let OnConnect::Reject(e) = &self.on_connect {
            return Err(e.clone());
        }
        if self.live.is_some() {
            return Err(StackError::Busy);
        }

        let id = PcbId(self.next_id);
        self.next_id += 1;
        self.live = Some(id);
        self.connects.push(addr);

        match &self.on_connect {
            OnConnect::Complete => self.push(StackEvent::Connected { pcb: id }),
            OnConnect::Fail(error) => self.push(StackEvent::ConnectFailed {
                pcb: id,
                error: error.clone(),
            }),
            OnConnect::Hang | OnConnect::Reject(_) => {}
        }
        Ok(Pcb::new(id))
    }

    fn write(&mut self, pcb: &Pcb, data: &[u8]) -> Result<usize, StackError> {
        if self.live != Some(pcb.id()) {
            return Err(StackError::NotConnected);
        }
        if self.abort_delivered {
            self.writes_after_abort += 1;
        }
        if let Some(error) = self.write_error.take() {
            self.write_calls.push((data.len(), 0));
            return Err(error);
        }
        if let Some((after, make)) = self.inject_after
            && self.wire.len() >= after
        {
            self.inject_after = None;
            self.push(make(pcb.id()));
            self.write_calls.push((data.len(), 0));
            return Ok(0);
        }

        let cap = self.write_limits.pop_front().unwrap_or(usize::MAX);
        let n = data.len().min(cap);
        self.wire.extend_from_slice(&data[..n]);
        self.write_calls.push((data.len(), n));
        if self.auto_ack && n > 0 {
            self.push(StackEvent::Sent {
                pcb: pcb.id(),
                len: n,
            });
        }
        Ok(n)
    }

    fn close(&mut self, pcb: Pcb) {
        assert!(
            !self.closed.contains(&pcb.id()),
            "{} released twice",
            pcb.id()
        );
        if self.live == Some(pcb.id()) {
            self.live = None;
        }
        self.closed.push(pcb.id());
    }

    async fn next_event(&mut self) -> StackEvent {
        match self.events.pop_front() {
            Some(event) => {
                if matches!(
                    event,
                    StackEvent::Error { .. } | StackEvent::RemoteClosed { .. }
                ) {
                    self.abort_delivered = true;
                }
                event
            }
            None => std::future::pending().await,
        }
    }
}

/// An in-memory file.
pub(crate) struct MemFile {
    data: Vec<u8>,
    offset: usize,
}

impl MemFile {
    pub(crate) fn new(data: &[u8]) -> Self {
        Self {
            data: data.to_vec(),
            offset: 0,
        }
    }
}

impl FileSource for MemFile {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, StoreError> {
        let n = buf.len().min(self.data.len() - self.offset);
        buf[..n].copy_from_slice(&self.data[self.offset..self.offset + n]);
        self.offset += n;
        Ok(n)
    }
}

#[derive(Default)]
pub(crate) struct MemStore {
    files: HashMap<String, Vec<u8>>,
}

impl MemStore {
    pub(crate) fn with(name: &str, data: &[u8]) -> Self {
        let mut store = Self::default();
        store.insert(name, data);
        store
    }

    pub(crate) fn insert(&mut self, name: &str, data: &[u8]) {
        self.files.insert(name.into(), data.to_vec());
    }
}

impl FileStore for MemStore {
    type Source = MemFile;

    fn open(&self, name: &str) -> Result<MemFile, StoreError> {
        self.files
            .get(name)
            .map(|data| MemFile::new(data))
            .ok_or_else(|| StoreError::NotFound(name.into()))
    }
}
