//! TFTP packet encoding and decoding
//!
//! Pure functions over byte slices, no I/O. Every encoder returns a freshly
//! allocated buffer and every decoder borrows from the slice it was given, so
//! a DATA payload still being consumed never aliases an outbound ACK.
//!
//! ```text
//!  RRQ/WRQ | 01/02 | filename | 0 | mode | 0 |
//!  DATA    | 03    | block#   | payload (0..512) |
//!  ACK     | 04    | block#   |
//!  ERROR   | 05    | code     | message | 0 |
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{Error, Result};

/// Well-known TFTP server port
pub const DEFAULT_PORT: u16 = 69;

/// Largest datagram the protocol exchanges (header + full data block)
pub const MAX_PACKET_SIZE: usize = 516;

/// Largest DATA payload; anything shorter ends the transfer
pub const MAX_DATA_SIZE: usize = 512;

/// Opcode plus block number / error code
pub const HEADER_SIZE: usize = 4;

/// TFTP opcode
///
/// Decoding is total: values outside the five RFC 1350 codes are kept as
/// `Unknown` and left for the session to reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Rrq,
    Wrq,
    Data,
    Ack,
    Error,
    Unknown(u16),
}

impl Opcode {
    pub fn from_u16(value: u16) -> Self {
        match value {
            1 => Self::Rrq,
            2 => Self::Wrq,
            3 => Self::Data,
            4 => Self::Ack,
            5 => Self::Error,
            other => Self::Unknown(other),
        }
    }

    pub fn as_u16(self) -> u16 {
        match self {
            Self::Rrq => 1,
            Self::Wrq => 2,
            Self::Data => 3,
            Self::Ack => 4,
            Self::Error => 5,
            Self::Unknown(other) => other,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rrq => write!(f, "RRQ"),
            Self::Wrq => write!(f, "WRQ"),
            Self::Data => write!(f, "DATA"),
            Self::Ack => write!(f, "ACK"),
            Self::Error => write!(f, "ERROR"),
            Self::Unknown(code) => write!(f, "opcode {}", code),
        }
    }
}

/// Transfer mode token carried in a request
///
/// Only `octet` is exercised; `netascii` is sent verbatim and the payload is
/// never translated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    #[default]
    Octet,
    NetAscii,
}

impl TransferMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Octet => "octet",
            Self::NetAscii => "netascii",
        }
    }
}

impl FromStr for TransferMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "octet" => Ok(Self::Octet),
            "netascii" => Ok(Self::NetAscii),
            _ => Err(Error::Encoding(format!("unsupported transfer mode '{}'", s))),
        }
    }
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error codes defined by RFC 1350
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NotDefined = 0,
    FileNotFound = 1,
    AccessViolation = 2,
    DiskFull = 3,
    IllegalOperation = 4,
    UnknownTransferId = 5,
    FileAlreadyExists = 6,
    NoSuchUser = 7,
}

impl ErrorCode {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(Self::NotDefined),
            1 => Some(Self::FileNotFound),
            2 => Some(Self::AccessViolation),
            3 => Some(Self::DiskFull),
            4 => Some(Self::IllegalOperation),
            5 => Some(Self::UnknownTransferId),
            6 => Some(Self::FileAlreadyExists),
            7 => Some(Self::NoSuchUser),
            _ => None,
        }
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn default_message(self) -> &'static str {
        match self {
            Self::NotDefined => "Not defined",
            Self::FileNotFound => "File not found",
            Self::AccessViolation => "Access violation",
            Self::DiskFull => "Disk full or allocation exceeded",
            Self::IllegalOperation => "Illegal TFTP operation",
            Self::UnknownTransferId => "Unknown transfer ID",
            Self::FileAlreadyExists => "File already exists",
            Self::NoSuchUser => "No such user",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.default_message(), self.as_u16())
    }
}

/// Encode a read request
///
/// Fails if either string contains a NUL byte, if the filename is empty, or
/// if the packet would not fit in a single datagram.
pub fn encode_rrq(filename: &str, mode: TransferMode) -> Result<Vec<u8>> {
    if filename.is_empty() {
        return Err(Error::Encoding("filename is empty".to_string()));
    }
    if filename.contains('\0') {
        return Err(Error::Encoding(format!(
            "filename {:?} contains a NUL byte",
            filename
        )));
    }

    let mode = mode.as_str();
    let len = 2 + filename.len() + 1 + mode.len() + 1;
    if len > MAX_PACKET_SIZE {
        return Err(Error::Encoding(format!(
            "RRQ packet is {} bytes, limit is {}",
            len, MAX_PACKET_SIZE
        )));
    }

    let mut buf = Vec::with_capacity(len);
    buf.extend_from_slice(&Opcode::Rrq.as_u16().to_be_bytes());
    buf.extend_from_slice(filename.as_bytes());
    buf.push(0);
    buf.extend_from_slice(mode.as_bytes());
    buf.push(0);
    Ok(buf)
}

/// Encode an acknowledgment for `block`
pub fn encode_ack(block: u16) -> [u8; HEADER_SIZE] {
    let op = Opcode::Ack.as_u16().to_be_bytes();
    let block = block.to_be_bytes();
    [op[0], op[1], block[0], block[1]]
}

/// Encode a data block
pub fn encode_data(block: u16, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > MAX_DATA_SIZE {
        return Err(Error::Encoding(format!(
            "data payload is {} bytes, limit is {}",
            payload.len(),
            MAX_DATA_SIZE
        )));
    }

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(&Opcode::Data.as_u16().to_be_bytes());
    buf.extend_from_slice(&block.to_be_bytes());
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Encode an error packet
pub fn encode_error(code: u16, message: &str) -> Result<Vec<u8>> {
    if message.contains('\0') {
        return Err(Error::Encoding(format!(
            "error message {:?} contains a NUL byte",
            message
        )));
    }
    let len = HEADER_SIZE + message.len() + 1;
    if len > MAX_PACKET_SIZE {
        return Err(Error::Encoding(format!(
            "ERROR packet is {} bytes, limit is {}",
            len, MAX_PACKET_SIZE
        )));
    }

    let mut buf = Vec::with_capacity(len);
    buf.extend_from_slice(&Opcode::Error.as_u16().to_be_bytes());
    buf.extend_from_slice(&code.to_be_bytes());
    buf.extend_from_slice(message.as_bytes());
    buf.push(0);
    Ok(buf)
}

/// Read the opcode of any packet
pub fn decode_header(bytes: &[u8]) -> Result<Opcode> {
    match bytes {
        [hi, lo, ..] => Ok(Opcode::from_u16(u16::from_be_bytes([*hi, *lo]))),
        _ => Err(Error::Malformed(format!(
            "{} byte datagram has no opcode",
            bytes.len()
        ))),
    }
}

/// Split a DATA packet into block number and payload
///
/// An empty payload is valid and marks a zero-length final block.
pub fn decode_data(bytes: &[u8]) -> Result<(u16, &[u8])> {
    let block = header_word(bytes, Opcode::Data)?;
    Ok((block, &bytes[HEADER_SIZE..]))
}

/// Read the block number of an ACK packet
pub fn decode_ack(bytes: &[u8]) -> Result<u16> {
    header_word(bytes, Opcode::Ack)
}

/// Split an ERROR packet into code and message
///
/// The message stops at the first NUL; a missing terminator is tolerated.
pub fn decode_error(bytes: &[u8]) -> Result<(u16, String)> {
    let code = header_word(bytes, Opcode::Error)?;
    let text = &bytes[HEADER_SIZE..];
    let end = text.iter().position(|&b| b == 0).unwrap_or(text.len());
    Ok((code, String::from_utf8_lossy(&text[..end]).into_owned()))
}

fn header_word(bytes: &[u8], opcode: Opcode) -> Result<u16> {
    if bytes.len() < HEADER_SIZE {
        return Err(Error::Malformed(format!(
            "{} packet needs {} bytes, got {}",
            opcode,
            HEADER_SIZE,
            bytes.len()
        )));
    }
    Ok(u16::from_be_bytes([bytes[2], bytes[3]]))
}
