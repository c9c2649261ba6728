//! Upload receiver (server side).
//!
//! Binds a listener, accepts connections one at a time, reads the header,
//! and streams the payload into `<base_path>/<name>`. Payload is written to
//! a `.part` file first and renamed once the sender closes cleanly, so an
//! aborted upload never leaves a truncated file under its final name.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uplink_protocol::NamingRule;
use uplink_protocol::wire::read_header;

use crate::error::ReceiveError;
use crate::{HEADER_TIMEOUT, IDLE_TIMEOUT, RECV_BUFFER_SIZE};

/// A completed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFile {
    pub name: String,
    pub path: PathBuf,
    pub bytes: u64,
    pub peer: SocketAddr,
}

/// TCP server that stores uploads in a directory.
pub struct UploadReceiver {
    base_path: PathBuf,
    rule: NamingRule,
    cancel: CancellationToken,
}

impl UploadReceiver {
    pub fn new(base_path: PathBuf, rule: NamingRule, cancel: CancellationToken) -> Self {
        Self {
            base_path,
            rule,
            cancel,
        }
    }

    /// Binds a listener on `addr`. Port 0 picks an ephemeral port.
    pub async fn listen(&self, addr: SocketAddr) -> Result<TcpListener, ReceiveError> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "upload receiver listening");
        Ok(listener)
    }

    /// Receives uploads until cancelled. Failed uploads are logged and do
    /// not stop the loop.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ReceiveError> {
        loop {
            match self.accept_and_receive(&listener).await {
                Ok(file) => {
                    info!(name = %file.name, bytes = file.bytes, peer = %file.peer, "upload stored");
                }
                Err(ReceiveError::Cancelled) => {
                    info!("upload receiver stopped");
                    return Ok(());
                }
                Err(ReceiveError::Io(e)) if is_accept_fatal(&e) => return Err(e.into()),
                Err(e) => warn!(error = %e, "upload rejected"),
            }
        }
    }

    /// Accepts a single connection and receives one upload from it.
    pub async fn accept_and_receive(
        &self,
        listener: &TcpListener,
    ) -> Result<ReceivedFile, ReceiveError> {
        let (stream, peer) = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                return Err(ReceiveError::Cancelled);
            }
            result = listener.accept() => result?,
        };
        debug!(%peer, "upload connection accepted");
        self.receive(stream, peer).await
    }

    /// Receives one upload from an accepted stream.
    pub async fn receive(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
    ) -> Result<ReceivedFile, ReceiveError> {
        let mut reader = BufReader::with_capacity(RECV_BUFFER_SIZE, stream);

        let header = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                return Err(ReceiveError::Cancelled);
            }
            result = tokio::time::timeout(HEADER_TIMEOUT, read_header(&mut reader, &self.rule)) => {
                match result {
                    Ok(Ok(h)) => h,
                    Ok(Err(e)) => return Err(e.into()),
                    Err(_) => return Err(ReceiveError::Timeout),
                }
            }
        };

        let name = header.name().to_string();
        let path = self.base_path.join(&name);
        let part = part_path(&path);
        tokio::fs::create_dir_all(&self.base_path).await?;

        match self.copy_payload(&mut reader, &part).await {
            Ok(bytes) => {
                tokio::fs::rename(&part, &path).await?;
                debug!(%name, bytes, "upload received");
                Ok(ReceivedFile {
                    name,
                    path,
                    bytes,
                    peer,
                })
            }
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&part).await {
                    debug!(path = %part.display(), error = %rm, "could not remove partial upload");
                }
                Err(e)
            }
        }
    }

    async fn copy_payload(
        &self,
        reader: &mut BufReader<TcpStream>,
        part: &Path,
    ) -> Result<u64, ReceiveError> {
        let mut file = tokio::fs::File::create(part).await?;
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        let mut total: u64 = 0;

        loop {
            let n = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return Err(ReceiveError::Cancelled);
                }
                result = tokio::time::timeout(IDLE_TIMEOUT, reader.read(&mut buf)) => {
                    match result {
                        Ok(r) => r?,
                        Err(_) => return Err(ReceiveError::Timeout),
                    }
                }
            };
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n]).await?;
            total += n as u64;
        }

        file.flush().await?;
        file.sync_all().await?;
        Ok(total)
    }
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

/// Accept errors that mean the listener itself is unusable.
fn is_accept_fatal(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::InvalidInput | std::io::ErrorKind::PermissionDenied
    )
}
