//! TFTP core protocol implementation
//!
//! This module contains the core components of the TFTP protocol:
//! - `packet`: Packet encoding and decoding
//! - `socket`: Socket abstraction layer
//! - `error`: Error taxonomy shared by codec and session

mod error;
pub mod packet;
mod socket;

// Public core types
pub use error::{Error, ErrorKind, Result};
pub use packet::{ErrorCode, Opcode, TransferMode};
pub use socket::{Socket, is_timeout};
