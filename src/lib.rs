//! # FINS/UDP memory-area client
//!
//! A client for the Omron FINS protocol over UDP, reading and writing the
//! Data Memory (DM), Work Memory (WR) and CIO areas of a PLC.
//!
//! This is a **protocol-only** library. Each call produces exactly 1 request
//! and at most 1 accepted response. No automatic retries, caching or
//! reconnection, and no logging from the protocol core: failures come back as
//! a typed [`FinsError`] and the application decides what to do with them.
//!
//! ## Layers
//!
//! - **Frame codec** - [`FinsHeader`], [`ReadWordCommand`], [`WriteWordCommand`],
//!   [`CommandFrame`], [`FinsResponse`], [`decode_response`]. Pure, no I/O.
//! - **Session sequencer** - [`SidSequencer`], the 8-bit Service ID counter.
//! - **Exchange controller** - [`ExchangeController`], one bounded
//!   request/response cycle over a [`DatagramTransport`].
//! - **Memory facade** - [`Client`], DM/WR scalar and array operations.
//!
//! ## Quick Start
//!
//! ```no_run
//! use fins_udp::{Client, ClientConfig, READ_FAILED};
//! use std::net::Ipv4Addr;
//! use std::time::Duration;
//!
//! fn main() -> fins_udp::Result<()> {
//!     let config = ClientConfig::new(Ipv4Addr::new(192, 168, 1, 250))
//!         .with_timeout(Duration::from_millis(500));
//!     let mut client = Client::connect(config)?;
//!
//!     // Read 10 words from DM100
//!     let data = client.read_data_memory_words(100, 10)?;
//!     println!("DM100-109: {:?}", data);
//!
//!     // Write values to DM200
//!     client.write_data_memory_words(200, &[0x1234, 0x5678])?;
//!
//!     // Single word, sentinel on failure
//!     let w0 = client.read_work_memory(0);
//!     if w0 != READ_FAILED {
//!         println!("W0 = {}", w0);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Memory Areas
//!
//! | Area | Code | Facade |
//! |------|------|--------|
//! | [`MemoryArea::DM`] | `0x82` | `*_data_memory*` |
//! | [`MemoryArea::WR`] | `0xB1` | `*_work_memory*` |
//! | [`MemoryArea::CIO`] | `0x30` | generic [`Client::read`] / [`Client::write`] |
//!
//! ## Error Handling
//!
//! ```no_run
//! use fins_udp::{device_error_description, Client, ClientConfig, FinsError};
//! use std::net::Ipv4Addr;
//!
//! let mut client = Client::connect(ClientConfig::new(Ipv4Addr::new(192, 168, 1, 250)))?;
//!
//! match client.read_data_memory_words(100, 10) {
//!     Ok(data) => println!("Data: {:?}", data),
//!     Err(FinsError::ResponseTimeout { .. }) => println!("No answer; retry later"),
//!     Err(FinsError::DeviceError { main_code, sub_code }) => {
//!         println!(
//!             "PLC error 0x{:02X}/0x{:02X}: {}",
//!             main_code,
//!             sub_code,
//!             device_error_description(main_code, sub_code)
//!         );
//!     }
//!     Err(e) => println!("Error: {}", e),
//! }
//! # Ok::<(), FinsError>(())
//! ```
//!
//! ## Custom transports
//!
//! Any datagram layer can carry the protocol by implementing
//! [`DatagramTransport`]; the wait loop yields to a [`Scheduler`] between
//! polls so a host watchdog or cooperative executor keeps running.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod client;
mod command;
mod config;
mod error;
mod exchange;
mod header;
mod memory;
mod response;
mod sequencer;
mod shared;
mod transport;

// Public re-exports
pub use client::{Client, READ_FAILED};
pub use command::{
    encode_read_command, encode_write_command, write_command_size, CommandFrame, ReadWordCommand,
    WriteWordCommand, COMMAND_FIXED_SIZE,
};
#[cfg(feature = "config")]
pub use config::ClientSettings;
pub use config::{ClientConfig, DEFAULT_LOCAL_PORT};
pub use error::{device_error_description, FinsError, Result};
pub use exchange::{ExchangeController, ExchangeState};
pub use header::{FinsHeader, NodeAddress, DEFAULT_SOURCE_NODE, FINS_HEADER_SIZE};
pub use memory::MemoryArea;
pub use response::{decode_response, FinsResponse, MIN_RESPONSE_SIZE};
pub use sequencer::SidSequencer;
pub use shared::SharedClient;
pub use transport::{
    DatagramTransport, Scheduler, SleepScheduler, UdpTransport, DEFAULT_FINS_PORT,
    DEFAULT_TIMEOUT, MAX_PACKET_SIZE, POLL_INTERVAL,
};
