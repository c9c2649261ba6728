//! TCP wire format for uploads.
//!
//! # Wire format
//!
//! ```text
//! Client -> Server:
//!   [header_len bytes: filename ASCII + NUL, e.g. "00042.SST\0"]
//!   [file bytes until close]
//! ```
//!
//! `header_len` is fixed by the [`NamingRule`] (10 bytes by default), so the
//! header carries no length prefix.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{HeaderError, NameError};
use crate::naming::NamingRule;

/// The upload header: the validated filename and its NUL terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    name: String,
    bytes: Vec<u8>,
}

impl FileHeader {
    /// Builds a header for `name`, validating it against `rule`.
    pub fn new(name: &str, rule: &NamingRule) -> Result<Self, NameError> {
        rule.validate(name)?;
        let mut bytes = Vec::with_capacity(name.len() + 1);
        bytes.extend_from_slice(name.as_bytes());
        bytes.push(0);
        Ok(Self {
            name: name.into(),
            bytes,
        })
    }

    /// The filename carried by this header, without the terminator.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Header bytes exactly as they go on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Header length in bytes, terminator included.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false: a header holds at least its terminator.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Reads a header of `rule.header_len()` bytes and validates it.
pub async fn read_header<R: AsyncRead + Unpin>(
    reader: &mut R,
    rule: &NamingRule,
) -> Result<FileHeader, HeaderError> {
    rule.check()?;
    let mut buf = vec![0u8; rule.header_len()];
    reader.read_exact(&mut buf).await?;
    if buf.pop() != Some(0) {
        return Err(HeaderError::Unterminated);
    }
    if !buf.is_ascii() {
        return Err(HeaderError::NotAscii);
    }
    let name = String::from_utf8(buf).map_err(|_| HeaderError::NotAscii)?;
    Ok(FileHeader::new(&name, rule)?)
}
