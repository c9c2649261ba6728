use std::io::Read;
use std::path::{Path, PathBuf};

/// Errors produced by a file store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("file shrank during transfer: expected {expected} bytes, read {actual}")]
    Truncated { expected: u64, actual: u64 },
}

/// An open file being read front to back.
pub trait FileSource {
    /// Total length in bytes, fixed when the file was opened.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads the next chunk into `buf`. Returns 0 at end of file.
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, StoreError>;
}

/// Local storage that uploads are read from.
pub trait FileStore {
    type Source: FileSource;

    /// Opens the file called `name` for reading.
    fn open(&self, name: &str) -> Result<Self::Source, StoreError>;
}

// ---------------------------------------------------------------------------
// DirStore
// ---------------------------------------------------------------------------

/// A [`FileStore`] over one directory on the local filesystem.
///
/// Names are joined to the base directory as-is; callers validate them
/// against the naming rule first.
#[derive(Debug, Clone)]
pub struct DirStore {
    base_path: PathBuf,
}

impl DirStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl FileStore for DirStore {
    type Source = DirFile;

    fn open(&self, name: &str) -> Result<DirFile, StoreError> {
        let path = self.base_path.join(name);
        let file = match std::fs::File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let len = file.metadata()?.len();
        Ok(DirFile {
            file,
            len,
            offset: 0,
        })
    }
}

/// A file opened by [`DirStore`].
pub struct DirFile {
    file: std::fs::File,
    len: u64,
    offset: u64,
}

impl DirFile {
    /// Bytes read so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Bytes remaining to read.
    pub fn remaining(&self) -> u64 {
        self.len - self.offset
    }
}

impl FileSource for DirFile {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, StoreError> {
        let remaining = self.remaining();
        if remaining == 0 {
            return Ok(0);
        }

        let read_size = std::cmp::min(remaining, buf.len() as u64) as usize;
        let n = self.file.read(&mut buf[..read_size])?;
        if n == 0 {
            return Err(StoreError::Truncated {
                expected: self.len,
                actual: self.offset,
            });
        }
        self.offset += n as u64;
        Ok(n)
    }
}
