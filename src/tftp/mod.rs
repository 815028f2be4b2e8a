//! TFTP (Trivial File Transfer Protocol) read client
//!
//! This module implements the download side of
//! [RFC 1350](https://www.rfc-editor.org/rfc/rfc1350) TFTP Protocol version 2
//! over UDP. Option negotiation (RFC 2347 and friends) and uploads are not
//! supported.
//!
//! ## Module Structure
//!
//! ```text
//! tftp/
//! ├── core/           # Core protocol implementation
//! │   ├── packet      # Packet encoding/decoding
//! │   ├── socket      # Socket abstraction layer
//! │   └── error       # Error taxonomy
//! │
//! └── client/         # TFTP client
//!     ├── config      # Client configuration
//!     ├── session     # Transfer state machine
//!     └── client      # Socket setup
//! ```
//!
//! ## Usage Examples
//!
//! ### Download a file
//!
//! ```rust,no_run
//! use xtftp::tftp::client::{Client, ClientConfig};
//!
//! let config = ClientConfig::new("192.168.1.100".parse().unwrap(), 69);
//! let transfer = Client::new(config).request("pxelinux.0").unwrap();
//! println!("received {} bytes", transfer.len());
//! ```

// Submodules
pub mod client;
pub mod core;

// Re-export commonly used types for convenience
pub use self::client::{Client, ClientConfig, Transfer};
pub use self::core::{Error, ErrorKind, TransferMode};
