use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use xtftp::tftp::client::{Client, ClientConfig};
use xtftp::tftp::core::TransferMode;

/// Download a file from a TFTP server
#[derive(Parser, Debug)]
#[command(name = "xtftp", version, about)]
struct Cli {
    /// Server host name or IP address
    server: String,

    /// Remote file name
    file: String,

    /// Server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Write the file here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seconds to wait for each reply
    #[arg(long)]
    timeout: Option<u64>,

    /// Retransmissions before giving up
    #[arg(long)]
    retries: Option<u32>,

    /// Transfer mode (octet or netascii)
    #[arg(long)]
    mode: Option<TransferMode>,

    /// Discard out-of-order blocks instead of aborting
    #[arg(long)]
    lenient: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logger(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {:<5}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.args()
            )
        })
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };

    let server = resolve(&cli.server, cli.port.unwrap_or(config.server_port))?;
    config.server_ip = server.ip();
    config.server_port = server.port();

    if let Some(secs) = cli.timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    if let Some(retries) = cli.retries {
        config = config.with_retries(retries);
    }
    if let Some(mode) = cli.mode {
        config = config.with_mode(mode);
    }
    if cli.lenient {
        config = config.with_strict_sequence(false);
    }

    let client = Client::new(config);
    let bytes = match &cli.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            client.get(&cli.file, BufWriter::new(file))?
        }
        None => client.get(&cli.file, io::stdout().lock())?,
    };

    info!("Received {} ({} bytes)", cli.file, bytes);
    Ok(())
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .with_context(|| format!("Failed to resolve {}", host))?
        .next()
        .ok_or_else(|| anyhow::anyhow!("No address found for {}", host))
}
