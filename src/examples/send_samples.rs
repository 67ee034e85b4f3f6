use log::{debug, info};
use rand::Rng;
use sparse_frame::*;
use std::net::UdpSocket;

const COLUMNS: usize = 48_000;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    println!("🌀 Sparse Frame - Sending samples");

    let config = match std::env::args().nth(1) {
        Some(path) => StreamConfig::load(path)?,
        None => StreamConfig {
            channels: 8,
            eps: 1e-3,
            ..StreamConfig::default()
        },
    };

    let sock = UdpSocket::bind("0.0.0.0:0")?;
    sock.connect("127.0.0.1:50052")?;

    // Handshake first so the receiver can size its decoder
    let encoder = PrefixBitmaskEncoder::new();
    let hello = Hello::new(encoder.kind(), config, COLUMNS as u64);
    sock.send(&hello.to_bytes()?)?;
    info!("sent hello: {:?}", hello);

    let samples = synthesize(config.channels as usize, COLUMNS);

    let mut sent = 0;
    let mut bytes = 0;
    for packet in PacketStream::new(encoder, &samples, config)? {
        let packet = packet?;
        sock.send(&packet)?;
        sent += 1;
        bytes += packet.len();
        debug!("packet #{} {} bytes", sent, packet.len());
    }

    let raw = samples.len() * std::mem::size_of::<f32>();
    println!("✅ Sent {} packets, {} bytes ({} raw)", sent, bytes, raw);

    Ok(())
}

/// Bursts of tones on a few channels separated by silence.
fn synthesize(channels: usize, columns: usize) -> Vec<f32> {
    let mut rng = rand::thread_rng();
    let mut samples = vec![0.0f32; channels * columns];

    let mut col = 0;
    while col < columns {
        col += rng.gen_range(100..4000);
        let burst = rng.gen_range(50..800).min(columns.saturating_sub(col));
        let voice = rng.gen_range(0..channels);
        let freq = rng.gen_range(0.01..0.2f32);
        for k in 0..burst {
            let phase = k as f32 * freq * std::f32::consts::TAU;
            samples[(col + k) * channels + voice] = 0.8 * phase.sin();
        }
        col += burst;
    }

    samples
}
