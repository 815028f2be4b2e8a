use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::tftp::core::TransferMode;
use crate::tftp::core::packet::DEFAULT_PORT;

/// Default per-receive wait, the conventional TFTP retransmission interval
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of retransmissions before a transfer gives up
pub const DEFAULT_RETRIES: u32 = 5;

/// TFTP client configuration
///
/// Every field can also be read from a TOML file; missing keys keep their
/// defaults.
///
/// ```toml
/// server_ip = "192.168.1.100"
/// server_port = 69
/// timeout = "5s"
/// retries = 5
/// mode = "octet"
/// strict_sequence = true
/// ```
///
/// # Example
///
/// ```rust
/// use xtftp::tftp::client::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::new("192.168.1.100".parse().unwrap(), 69)
///     .with_timeout(Duration::from_secs(2))
///     .with_retries(3);
/// assert_eq!(config.retries, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Server IP address
    pub server_ip: IpAddr,
    /// Server port number
    pub server_port: u16,
    /// How long each receive waits before retransmitting
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Retransmissions allowed while waiting for one reply
    pub retries: u32,
    /// Transfer mode token sent in the request
    pub mode: TransferMode,
    /// Fail on an out-of-order block instead of discarding it
    pub strict_sequence: bool,
}

impl ClientConfig {
    /// Create new client configuration
    ///
    /// # Arguments
    ///
    /// * `server_ip` - Server IP address
    /// * `server_port` - Server port number (usually 69)
    pub fn new(server_ip: IpAddr, server_port: u16) -> Self {
        Self {
            server_ip,
            server_port,
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            mode: TransferMode::Octet,
            strict_sequence: true,
        }
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("invalid client configuration")
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Address the read request is sent to
    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server_ip, self.server_port)
    }

    /// Set timeout duration
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set retransmission budget
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Set transfer mode
    pub fn with_mode(mut self, mode: TransferMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set out-of-order block handling
    pub fn with_strict_sequence(mut self, strict: bool) -> Self {
        self.strict_sequence = strict;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.server_addr(), "127.0.0.1:69".parse().unwrap());
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.retries, 5);
        assert_eq!(config.mode, TransferMode::Octet);
        assert!(config.strict_sequence);
    }

    #[test]
    fn toml_overrides() {
        let config = ClientConfig::from_toml_str(
            r#"
            server_ip = "10.0.0.7"
            server_port = 6969
            timeout = "1500ms"
            retries = 2
            mode = "netascii"
            strict_sequence = false
            "#,
        )
        .unwrap();
        assert_eq!(config.server_addr(), "10.0.0.7:6969".parse().unwrap());
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.retries, 2);
        assert_eq!(config.mode, TransferMode::NetAscii);
        assert!(!config.strict_sequence);
    }

    #[test]
    fn toml_partial_keeps_defaults() {
        let config = ClientConfig::from_toml_str("retries = 9").unwrap();
        assert_eq!(config.retries, 9);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.server_port, DEFAULT_PORT);
    }

    #[test]
    fn toml_rejects_unknown_keys() {
        assert!(ClientConfig::from_toml_str("blksize = 1024").is_err());
        assert!(ClientConfig::from_toml_str("mode = \"mail\"").is_err());
    }

    #[test]
    fn load_from_file() {
        let path = std::env::temp_dir().join(format!("xtftp_config_{}.toml", std::process::id()));
        std::fs::write(&path, "server_ip = \"::1\"\ntimeout = \"2s\"\n").unwrap();
        let config = ClientConfig::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(config.server_addr(), "[::1]:69".parse().unwrap());
        assert_eq!(config.timeout, Duration::from_secs(2));

        assert!(ClientConfig::load(Path::new("/nonexistent/xtftp.toml")).is_err());
    }
}
