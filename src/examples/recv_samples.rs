use log::{debug, error, info, warn};
use sparse_frame::*;
use std::net::UdpSocket;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    println!("🌀 Sparse Frame - Receiver");
    println!("📡 Listening on 127.0.0.1:50052...\n");

    let sock = UdpSocket::bind("127.0.0.1:50052")?;
    let mut buf = vec![0u8; 65536];

    let hello = loop {
        let (size, src) = sock.recv_from(&mut buf)?;
        match Hello::from_bytes(&buf[..size]) {
            Ok(hello) if hello.compatible() => {
                info!("hello from {}: {:?} {:?}", src, hello.kind()?, hello.config);
                break hello;
            }
            Ok(hello) => warn!("incompatible peer {}: v{} {}", src, hello.v, hello.endian),
            Err(e) => warn!("waiting for hello, dropped {} bytes: {}", size, e),
        }
    };

    let total = hello.columns as usize;
    let mut decoder = StreamDecoder::new(hello.config.channels);
    let mut packets = 0;

    while decoder.columns() < total {
        let (size, _) = sock.recv_from(&mut buf)?;
        match decoder.push(&buf[..size]) {
            Ok(packet) => {
                packets += 1;
                debug!(
                    "packet #{}: skip={} cols={} active={}",
                    packets,
                    packet.skip_count,
                    packet.columns,
                    packet.active()
                );
            }
            Err(e) => error!("failed to decode packet: {}", e),
        }
    }

    let samples = decoder.finish(total);
    let nonzero = samples.iter().filter(|&&x| x != 0.0).count();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📦 {} packets, {} columns", packets, total);
    println!("   Channels: {}", hello.config.channels);
    println!("   Non-zero cells: {}", nonzero);

    Ok(())
}
