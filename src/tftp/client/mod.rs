//! TFTP client implementation
//!
//! - `config`: Client configuration
//! - `session`: Read transfer state machine
//! - `client`: Socket setup around a session

mod client;
mod config;
mod session;

pub use client::Client;
pub use config::{ClientConfig, DEFAULT_RETRIES, DEFAULT_TIMEOUT};
pub use session::{Session, State, Transfer};
