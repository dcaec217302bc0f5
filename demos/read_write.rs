//! Example: reading and writing DM/WR words
//!
//! Run with: cargo run --example read_write -- 192.168.1.250
//!
//! Set `RUST_LOG=fins_udp=trace` to see every datagram the transport moves.

use fins_udp::{device_error_description, Client, ClientConfig, FinsError, READ_FAILED};
use std::net::Ipv4Addr;
use tracing::{info, warn};

fn main() -> fins_udp::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let plc_ip: Ipv4Addr = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(Ipv4Addr::new(192, 168, 1, 250));

    let config = ClientConfig::new(plc_ip).with_timeout_ms(500);
    let mut client = Client::connect(config)?;
    info!(plc = %plc_ip, local = ?client.local_addr(), "client ready");

    // Single words, sentinel on failure
    client.write_data_memory(100, 1234)?;
    match client.read_data_memory(100) {
        READ_FAILED => warn!("D100 read failed"),
        value => info!("D100 = {}", value),
    }

    // Arrays
    client.write_work_memory_words(0, &[0x00FF, 0xFF00])?;
    let words = client.read_work_memory_words(0, 2)?;
    info!("W0-W1 = {:04X?}", words);

    // Typed errors
    match client.read_data_memory_words(32000, 4) {
        Ok(words) => info!("D32000-D32003 = {:?}", words),
        Err(FinsError::DeviceError { main_code, sub_code }) => warn!(
            main_code,
            sub_code,
            "PLC rejected read: {}",
            device_error_description(main_code, sub_code)
        ),
        Err(e) => warn!("read failed: {}", e),
    }

    client.close();
    Ok(())
}
