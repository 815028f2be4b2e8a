use std::io;

use thiserror::Error;

/// Failure of a TFTP operation
///
/// Every variant is terminal for the session that produced it. A stale
/// duplicate DATA block is not an error and never shows up here.
#[derive(Debug, Error)]
pub enum Error {
    /// The request could not be put on the wire
    #[error("cannot encode packet: {0}")]
    Encoding(String),

    /// A send or receive call failed
    #[error("transport failure: {0}")]
    Transport(#[from] io::Error),

    /// Retry budget ran out with no reply
    #[error("no reply after {attempts} attempts")]
    Timeout { attempts: u32 },

    /// The peer sent something that makes no sense at this point
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The server sent an ERROR packet
    #[error("server error {code}: {message}")]
    Remote { code: u16, message: String },

    /// Datagram too short for the packet its opcode claims
    #[error("malformed packet: {0}")]
    Malformed(String),
}

/// Category of an [`Error`], without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Encoding,
    Transport,
    Timeout,
    Protocol,
    Remote,
    Malformed,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Encoding(_) => ErrorKind::Encoding,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Remote { .. } => ErrorKind::Remote,
            Self::Malformed(_) => ErrorKind::Malformed,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
