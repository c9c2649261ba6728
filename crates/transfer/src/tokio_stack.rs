//! [`TcpStack`] over tokio sockets.
//!
//! Holds at most one endpoint. Writes land in a bounded send buffer, the way
//! an embedded stack's `sndbuf` works, and are drained into the socket from
//! [`TcpStack::next_event`]. Bytes are reported as acknowledged once the
//! kernel has taken them; the OS owns delivery from there.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace};

use crate::DEFAULT_SEND_BUFFER_LEN;
use crate::stack::{Pcb, PcbId, StackError, StackEvent, TcpStack};

/// Read buffer for data the peer sends back.
const RECV_BUFFER_SIZE: usize = 512;

type ConnectFuture = Pin<Box<dyn Future<Output = io::Result<TcpStream>> + Send>>;

enum Slot {
    Idle,
    Connecting {
        id: PcbId,
        connect: ConnectFuture,
    },
    Open {
        id: PcbId,
        stream: TcpStream,
        outgoing: Vec<u8>,
    },
    /// The socket is gone but the owner has not released the handle yet.
    Dead {
        id: PcbId,
    },
}

impl Slot {
    fn id(&self) -> Option<PcbId> {
        match self {
            Self::Idle => None,
            Self::Connecting { id, .. } | Self::Open { id, .. } | Self::Dead { id } => Some(*id),
        }
    }
}

enum Io {
    Wrote(io::Result<usize>),
    Read(io::Result<usize>),
}

/// A single-connection TCP stack backed by tokio.
pub struct TokioStack {
    send_buffer_len: usize,
    next_id: u64,
    slot: Slot,
    recv_buf: Vec<u8>,
}

impl Default for TokioStack {
    fn default() -> Self {
        Self::new(DEFAULT_SEND_BUFFER_LEN)
    }
}

impl TokioStack {
    /// Creates a stack whose send buffer holds `send_buffer_len` bytes.
    pub fn new(send_buffer_len: usize) -> Self {
        Self {
            send_buffer_len: send_buffer_len.max(1),
            next_id: 1,
            slot: Slot::Idle,
            recv_buf: vec![0u8; RECV_BUFFER_SIZE],
        }
    }

    /// Free space in the send buffer of `pcb`.
    pub fn send_buffer(&self, pcb: &Pcb) -> usize {
        match &self.slot {
            Slot::Open { id, outgoing, .. } if *id == pcb.id() => {
                self.send_buffer_len - outgoing.len()
            }
            _ => 0,
        }
    }
}

impl TcpStack for TokioStack {
    fn connect(&mut self, addr: SocketAddr) -> Result<Pcb, StackError> {
        if !matches!(self.slot, Slot::Idle) {
            return Err(StackError::Busy);
        }

        let id = PcbId(self.next_id);
        self.next_id += 1;
        self.slot = Slot::Connecting {
            id,
            connect: Box::pin(TcpStream::connect(addr)),
        };
        debug!(pcb = %id, %addr, "connecting");
        Ok(Pcb::new(id))
    }

    fn write(&mut self, pcb: &Pcb, data: &[u8]) -> Result<usize, StackError> {
        match &mut self.slot {
            Slot::Open { id, outgoing, .. } if *id == pcb.id() => {
                let room = self.send_buffer_len - outgoing.len();
                let n = data.len().min(room);
                outgoing.extend_from_slice(&data[..n]);
                Ok(n)
            }
            Slot::Dead { id } if *id == pcb.id() => Err(StackError::Reset),
            _ => Err(StackError::NotConnected),
        }
    }

    fn close(&mut self, pcb: Pcb) {
        if self.slot.id() == Some(pcb.id()) {
            debug!(pcb = %pcb.id(), "closing");
            self.slot = Slot::Idle;
        }
    }

    async fn next_event(&mut self) -> StackEvent {
        match &mut self.slot {
            Slot::Idle | Slot::Dead { .. } => std::future::pending().await,
            Slot::Connecting { id, connect } => {
                let id = *id;
                let result = connect.as_mut().await;
                match result {
                    Ok(stream) => {
                        if let Err(e) = stream.set_nodelay(true) {
                            trace!(pcb = %id, error = %e, "set_nodelay failed");
                        }
                        self.slot = Slot::Open {
                            id,
                            stream,
                            outgoing: Vec::with_capacity(self.send_buffer_len),
                        };
                        StackEvent::Connected { pcb: id }
                    }
                    Err(e) => {
                        self.slot = Slot::Dead { id };
                        StackEvent::ConnectFailed {
                            pcb: id,
                            error: StackError::from_io(&e),
                        }
                    }
                }
            }
            Slot::Open {
                id,
                stream,
                outgoing,
            } => {
                let id = *id;
                let io = {
                    let (mut reader, mut writer) = stream.split();
                    if outgoing.is_empty() {
                        Io::Read(reader.read(&mut self.recv_buf).await)
                    } else {
                        tokio::select! {
                            res = writer.write(&outgoing[..]) => Io::Wrote(res),
                            res = reader.read(&mut self.recv_buf) => Io::Read(res),
                        }
                    }
                };

                let event = match io {
                    Io::Wrote(Ok(0)) => StackEvent::Error {
                        pcb: id,
                        error: StackError::Reset,
                    },
                    Io::Wrote(Ok(n)) => {
                        outgoing.drain(..n);
                        return StackEvent::Sent { pcb: id, len: n };
                    }
                    Io::Read(Ok(0)) => StackEvent::RemoteClosed { pcb: id },
                    Io::Read(Ok(n)) => return StackEvent::Received { pcb: id, len: n },
                    Io::Wrote(Err(e)) | Io::Read(Err(e)) => StackEvent::Error {
                        pcb: id,
                        error: StackError::from_io(&e),
                    },
                };
                self.slot = Slot::Dead { id };
                event
            }
        }
    }
}
