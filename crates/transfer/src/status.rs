//! Transfer status.

/// Position of a [`crate::Connection`] in the upload sequence.
///
/// Status only moves forward, one step at a time. Failure is not a status:
/// it ends the connection from whatever status it had reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    /// Record allocated, connect requested.
    #[default]
    Init,
    /// TCP handshake completed.
    Connected,
    /// Filename header fully accepted by the stack.
    HeaderOk,
    /// Every payload byte accepted by the stack.
    DataSent,
    /// Every payload byte acknowledged by the peer.
    Success,
}

impl Status {
    /// The status that follows this one, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Init => Some(Self::Connected),
            Self::Connected => Some(Self::HeaderOk),
            Self::HeaderOk => Some(Self::DataSent),
            Self::DataSent => Some(Self::Success),
            Self::Success => None,
        }
    }

    /// Whether `to` is a legal transition from this status.
    pub fn can_advance_to(self, to: Self) -> bool {
        self.next() == Some(to)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Init => "init",
            Self::Connected => "connected",
            Self::HeaderOk => "header_ok",
            Self::DataSent => "data_sent",
            Self::Success => "success",
        };
        f.write_str(s)
    }
}
