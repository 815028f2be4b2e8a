//! Read transfer state machine
//!
//! ```text
//! Idle --start--> Requesting --RRQ sent--> AwaitingBlock --short block--> Completed
//!                     |                      |    ^
//!                     +------> Failed <------+    +-- full block / duplicate / timeout
//! ```
//!
//! A session owns its socket for the whole transfer and drops it as soon as
//! it reaches a terminal state.

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use super::config::ClientConfig;
use crate::tftp::core::packet::{
    MAX_DATA_SIZE, MAX_PACKET_SIZE, decode_data, decode_error, decode_header, encode_ack,
    encode_error, encode_rrq,
};
use crate::tftp::core::{Error, ErrorCode, Opcode, Result, Socket, TransferMode, is_timeout};

/// Lifecycle of a [`Session`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Requesting,
    AwaitingBlock,
    Completed,
    Failed,
}

impl State {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// A completed download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    data: Vec<u8>,
    bytes: u64,
}

impl Transfer {
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of payload bytes received
    pub fn len(&self) -> u64 {
        self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes == 0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// One read request and the exchange that follows it
///
/// # Example
///
/// ```rust,no_run
/// use std::net::UdpSocket;
/// use xtftp::tftp::client::{ClientConfig, Session};
/// use xtftp::tftp::core::TransferMode;
///
/// let config = ClientConfig::new("192.168.1.100".parse().unwrap(), 69);
/// let socket = UdpSocket::bind("0.0.0.0:0").unwrap();
/// let session = Session::new(socket, config.server_addr(), &config).unwrap();
/// let transfer = session.request("pxelinux.0", TransferMode::Octet).unwrap();
/// println!("{} bytes", transfer.len());
/// ```
pub struct Session<S: Socket = UdpSocket> {
    socket: Option<S>,
    server: SocketAddr,
    // Transfer ID of the server, fixed by its first reply
    peer: Option<SocketAddr>,
    timeout: Duration,
    retries: u32,
    retries_left: u32,
    strict_sequence: bool,
    state: State,
    filename: String,
    expected_block: u16,
    last_acked: Option<u16>,
    // Last datagram put on the wire, resent on timeout
    last_sent: Vec<u8>,
    last_dest: SocketAddr,
    data: Vec<u8>,
    bytes: u64,
    error: Option<Error>,
}

impl<S: Socket> Session<S> {
    /// Wrap an open socket; nothing is sent until [`Session::start`]
    pub fn new(socket: S, server: SocketAddr, config: &ClientConfig) -> Result<Self> {
        socket.set_read_timeout(Some(config.timeout))?;

        Ok(Self {
            socket: Some(socket),
            server,
            peer: None,
            timeout: config.timeout,
            retries: config.retries,
            retries_left: config.retries,
            strict_sequence: config.strict_sequence,
            state: State::Idle,
            filename: String::new(),
            expected_block: 1,
            last_acked: None,
            last_sent: Vec::new(),
            last_dest: server,
            data: Vec::new(),
            bytes: 0,
            error: None,
        })
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Address replies are accepted from, once the server has answered
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Received bytes and their count, only once the transfer completed
    pub fn result(&self) -> Option<(&[u8], u64)> {
        match self.state {
            State::Completed => Some((&self.data, self.bytes)),
            _ => None,
        }
    }

    /// Why the transfer failed, only once it has
    pub fn error(&self) -> Option<&Error> {
        match self.state {
            State::Failed => self.error.as_ref(),
            _ => None,
        }
    }

    /// Send the read request
    pub fn start(&mut self, filename: &str, mode: TransferMode) -> State {
        if self.state != State::Idle {
            log::warn!("Session for {} already started", self.filename);
            return self.state;
        }

        self.filename = filename.to_string();
        self.state = State::Requesting;
        log::info!("Requesting {} ({}) from {}", filename, mode, self.server);

        let sent = encode_rrq(filename, mode).and_then(|rrq| self.transmit(rrq, self.server));
        match sent {
            Ok(()) => {
                self.expected_block = 1;
                self.retries_left = self.retries;
                self.state = State::AwaitingBlock;
            }
            Err(err) => self.fail(err),
        }
        self.state
    }

    /// Wait for one datagram (or one timeout) and act on it
    pub fn step(&mut self) -> State {
        if self.state != State::AwaitingBlock {
            return self.state;
        }
        if let Err(err) = self.receive() {
            self.fail(err);
        }
        self.state
    }

    /// Drive the exchange until it completes or fails
    pub fn run(&mut self) -> State {
        while self.state == State::AwaitingBlock {
            self.step();
        }
        self.state
    }

    /// Start, run to the end and hand back the result
    pub fn request(mut self, filename: &str, mode: TransferMode) -> Result<Transfer> {
        self.start(filename, mode);
        self.run();
        self.into_result()
    }

    pub fn into_result(mut self) -> Result<Transfer> {
        match self.state {
            State::Completed => Ok(Transfer {
                data: std::mem::take(&mut self.data),
                bytes: self.bytes,
            }),
            State::Failed => Err(self
                .error
                .take()
                .unwrap_or_else(|| Error::Protocol("failed without a reason".to_string()))),
            state => Err(Error::Protocol(format!(
                "transfer of {} not finished ({:?})",
                self.filename, state
            ))),
        }
    }

    /// Abandon the transfer and release the socket
    pub fn close(&mut self) {
        if !self.state.is_terminal() {
            self.fail(Error::Transport(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                "transfer abandoned",
            )));
        }
        self.socket = None;
    }

    fn receive(&mut self) -> Result<()> {
        let mut buf = [0u8; MAX_PACKET_SIZE];
        let received = self.socket()?.recv_from(&mut buf);
        let (len, from) = match received {
            Ok(received) => received,
            Err(err) if is_timeout(&err) => return self.retransmit(),
            Err(err) => return Err(err.into()),
        };
        let packet = &buf[..len];

        match self.peer {
            Some(peer) if peer != from => self.reject_stranger(from, packet),
            _ => self.dispatch(from, packet),
        }
    }

    fn dispatch(&mut self, from: SocketAddr, packet: &[u8]) -> Result<()> {
        match decode_header(packet)? {
            Opcode::Data => {
                let (block, payload) = decode_data(packet)?;
                self.learn_peer(from);
                self.on_data(block, payload)
            }
            Opcode::Error => {
                let (code, message) = decode_error(packet)?;
                self.learn_peer(from);
                match ErrorCode::from_u16(code) {
                    Some(known) => log::debug!("{} reported {}", from, known),
                    None => log::debug!("{} reported unknown error code {}", from, code),
                }
                Err(Error::Remote { code, message })
            }
            other => Err(Error::Protocol(format!(
                "unexpected {} from {} while awaiting block {}",
                other, from, self.expected_block
            ))),
        }
    }

    fn on_data(&mut self, block: u16, payload: &[u8]) -> Result<()> {
        if block == self.expected_block {
            self.data.extend_from_slice(payload);
            self.bytes += payload.len() as u64;
            self.last_acked = Some(block);
            self.expected_block = block.wrapping_add(1);
            self.retries_left = self.retries;
            log::debug!("Block {} received, {} bytes", block, payload.len());

            self.send_ack(block)?;

            if payload.len() < MAX_DATA_SIZE {
                log::info!(
                    "Transfer of {} complete. Total bytes: {}",
                    self.filename,
                    self.bytes
                );
                self.state = State::Completed;
                self.socket = None;
            }
            return Ok(());
        }

        if self.last_acked == Some(block) {
            log::warn!("Duplicate block {}, acknowledging again", block);
            return self.send_ack(block);
        }

        if self.strict_sequence {
            return Err(Error::Protocol(format!(
                "received block {}, expected {}",
                block, self.expected_block
            )));
        }
        log::warn!(
            "Discarding out-of-sequence block {}, expected {}",
            block,
            self.expected_block
        );
        Ok(())
    }

    fn learn_peer(&mut self, from: SocketAddr) {
        if self.peer.is_none() {
            if from != self.server {
                log::debug!("Server answered from {}, switching transfer peer", from);
            }
            self.peer = Some(from);
        }
    }

    fn send_ack(&mut self, block: u16) -> Result<()> {
        let dest = self.peer.unwrap_or(self.server);
        self.transmit(encode_ack(block).to_vec(), dest)
    }

    fn transmit(&mut self, packet: Vec<u8>, dest: SocketAddr) -> Result<()> {
        self.socket()?.send_to(&packet, dest)?;
        self.last_sent = packet;
        self.last_dest = dest;
        Ok(())
    }

    fn retransmit(&mut self) -> Result<()> {
        if self.retries_left == 0 {
            return Err(Error::Timeout {
                attempts: self.retries + 1,
            });
        }
        self.retries_left -= 1;
        log::warn!(
            "No reply within {:?}, resending to {} ({} retries left)",
            self.timeout,
            self.last_dest,
            self.retries_left
        );
        self.socket()?.send_to(&self.last_sent, self.last_dest)?;
        Ok(())
    }

    // RFC 1350 section 4: datagrams from another transfer ID get an error
    // reply and leave the transfer untouched.
    fn reject_stranger(&mut self, from: SocketAddr, packet: &[u8]) -> Result<()> {
        log::warn!(
            "Ignoring {} byte datagram from {}, transfer peer is {:?}",
            packet.len(),
            from,
            self.peer
        );
        let code = ErrorCode::UnknownTransferId;
        let reply = encode_error(code.as_u16(), code.default_message())?;
        if let Err(err) = self.socket()?.send_to(&reply, from) {
            log::warn!("Failed to notify {}: {}", from, err);
        }
        Ok(())
    }

    fn fail(&mut self, err: Error) {
        log::warn!("Transfer of {} failed: {}", self.filename, err);
        self.state = State::Failed;
        self.error = Some(err);
        self.socket = None;
    }

    fn socket(&self) -> Result<&S> {
        self.socket.as_ref().ok_or_else(|| {
            Error::Transport(io::Error::new(
                io::ErrorKind::NotConnected,
                "session socket already released",
            ))
        })
    }
}
