/// Integration tests: run the client against a minimal TFTP server on
/// loopback. The server answers every request from a fresh ephemeral port,
/// like a real tftpd does.
use std::net::{SocketAddr, UdpSocket};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use xtftp::tftp::core::Opcode;
use xtftp::tftp::core::packet::{
    MAX_DATA_SIZE, MAX_PACKET_SIZE, decode_ack, decode_header, encode_data, encode_error,
};
use xtftp::tftp::{Client, ClientConfig, Error, ErrorKind};

enum Behaviour {
    Serve(Vec<u8>),
    // Pretend the ACK for block 1 got lost and send block 1 again
    LoseFirstAck(Vec<u8>),
    NotFound,
}

/// Serve one read request; the thread yields every ACK it received
fn spawn_server(behaviour: Behaviour) -> (SocketAddr, JoinHandle<Vec<u16>>) {
    let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
    listener
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = thread::spawn(move || {
        let mut buf = [0u8; MAX_PACKET_SIZE];
        let (len, client) = listener.recv_from(&mut buf).unwrap();
        assert_eq!(decode_header(&buf[..len]).unwrap(), Opcode::Rrq);

        let transfer = UdpSocket::bind("127.0.0.1:0").unwrap();
        transfer
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();

        let (content, lose_first_ack) = match behaviour {
            Behaviour::Serve(content) => (content, false),
            Behaviour::LoseFirstAck(content) => (content, true),
            Behaviour::NotFound => {
                let err = encode_error(1, "File not found").unwrap();
                transfer.send_to(&err, client).unwrap();
                return Vec::new();
            }
        };

        let mut acks = Vec::new();
        let blocks = content.len() / MAX_DATA_SIZE + 1;
        for index in 0..blocks {
            let block = (index + 1) as u16;
            let start = index * MAX_DATA_SIZE;
            let end = (start + MAX_DATA_SIZE).min(content.len());
            let packet = encode_data(block, &content[start..end]).unwrap();

            transfer.send_to(&packet, client).unwrap();
            loop {
                let (len, _) = transfer.recv_from(&mut buf).unwrap();
                let acked = decode_ack(&buf[..len]).unwrap();
                acks.push(acked);
                if lose_first_ack && block == 1 && acks.len() == 1 {
                    transfer.send_to(&packet, client).unwrap();
                    continue;
                }
                if acked == block {
                    break;
                }
            }
        }
        acks
    });

    (addr, handle)
}

fn config(addr: SocketAddr) -> ClientConfig {
    ClientConfig::new(addr.ip(), addr.port())
        .with_timeout(Duration::from_secs(1))
        .with_retries(3)
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[test]
fn report_bin_over_loopback() {
    let _ = env_logger::try_init();

    let content = pattern(712);
    let (addr, server) = spawn_server(Behaviour::Serve(content.clone()));

    let transfer = Client::new(config(addr)).request("report.bin").unwrap();
    assert_eq!(transfer.len(), 712);
    assert_eq!(transfer.data(), &content[..]);
    assert_eq!(server.join().unwrap(), vec![1, 2]);
}

#[test]
fn exact_multiple_ends_with_empty_block() {
    let _ = env_logger::try_init();

    let content = pattern(MAX_DATA_SIZE * 3);
    let (addr, server) = spawn_server(Behaviour::Serve(content.clone()));

    let mut sink = Vec::new();
    let bytes = Client::new(config(addr)).get("three.bin", &mut sink).unwrap();
    assert_eq!(bytes, 1536);
    assert_eq!(sink, content);
    assert_eq!(server.join().unwrap(), vec![1, 2, 3, 4]);
}

#[test]
fn lost_ack_does_not_duplicate_data() {
    let _ = env_logger::try_init();

    let content = pattern(1000);
    let (addr, server) = spawn_server(Behaviour::LoseFirstAck(content.clone()));

    let transfer = Client::new(config(addr)).request("retry.bin").unwrap();
    assert_eq!(transfer.into_bytes(), content);
    assert_eq!(server.join().unwrap(), vec![1, 1, 2]);
}

#[test]
fn missing_file_reports_remote_error() {
    let _ = env_logger::try_init();

    let (addr, server) = spawn_server(Behaviour::NotFound);

    let err = Client::new(config(addr)).request("missing.bin").unwrap_err();
    match err {
        Error::Remote { code, ref message } => {
            assert_eq!(code, 1);
            assert_eq!(message, "File not found");
        }
        other => panic!("expected remote error, got {:?}", other),
    }
    server.join().unwrap();
}

#[test]
fn silent_server_times_out() {
    let _ = env_logger::try_init();

    // Bound but never read, so every request goes unanswered
    let silent = UdpSocket::bind("127.0.0.1:0").unwrap();
    let addr = silent.local_addr().unwrap();
    let config = ClientConfig::new(addr.ip(), addr.port())
        .with_timeout(Duration::from_millis(100))
        .with_retries(2);

    let started = Instant::now();
    let err = Client::new(config).request("nothing.bin").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert!(started.elapsed() < Duration::from_secs(5));
}
