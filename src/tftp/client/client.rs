use std::io::Write;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use super::config::ClientConfig;
use super::session::{Session, Transfer};
use crate::tftp::core::Result;

/// TFTP client
///
/// Downloads files (RRQ) from one server. Each request runs on its own
/// ephemeral socket, so one `Client` can be shared by several threads.
///
/// # Example
///
/// ```rust,no_run
/// use xtftp::tftp::client::{Client, ClientConfig};
/// use std::fs::File;
///
/// let config = ClientConfig::new("192.168.1.100".parse().unwrap(), 69);
/// let client = Client::new(config);
///
/// // Download file
/// let file = File::create("local.bin").unwrap();
/// client.get("remote.bin", file).unwrap();
/// ```
pub struct Client {
    config: ClientConfig,
}

impl Client {
    /// Create a new TFTP client
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Download a file from the server and keep it in memory
    pub fn request(&self, remote_file: &str) -> Result<Transfer> {
        let server_addr = self.config.server_addr();
        log::info!("Downloading {} from {}", remote_file, server_addr);

        let local_addr: SocketAddr = match server_addr {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local_addr)?;
        log::debug!("Transfer socket bound to {}", socket.local_addr()?);

        let session = Session::new(socket, server_addr, &self.config)?;
        session.request(remote_file, self.config.mode)
    }

    /// Download a file from the server into `sink`
    ///
    /// Returns the number of bytes written. The sink only sees data once the
    /// whole transfer has succeeded; a failure to write is reported as a
    /// transport error.
    pub fn get<W: Write>(&self, remote_file: &str, mut sink: W) -> Result<u64> {
        let transfer = self.request(remote_file)?;
        sink.write_all(transfer.data())?;
        sink.flush()?;
        Ok(transfer.len())
    }
}
