//! Wire protocol for single-file uploads.
//!
//! An upload is one TCP connection carrying a fixed-length filename header
//! followed by the raw file bytes. There is no length prefix and no end
//! marker: the receiver reads until the sender closes.
//!
//! # Wire format
//!
//! See [`wire`] for the byte layout and [`naming`] for the filename rule.

pub mod error;
pub mod naming;
pub mod wire;

pub use error::{HeaderError, NameError};
pub use naming::NamingRule;
pub use wire::FileHeader;

/// Default number of digits in an upload's numeric stem.
pub const DEFAULT_STEM_DIGITS: usize = 5;

/// Default upload extension.
pub const DEFAULT_EXTENSION: &str = "SST";

/// Header length for the default naming rule: `00000.SST` plus the NUL
/// terminator.
pub const DEFAULT_HEADER_LEN: usize = DEFAULT_STEM_DIGITS + 1 + DEFAULT_EXTENSION.len() + 1;
