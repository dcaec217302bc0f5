//! Memory-area client for Omron PLCs.
//!
//! [`Client`] binds the Data Memory and Work Memory areas onto the generic
//! read/write of the [`ExchangeController`]. Every call is exactly one
//! request and one response; there are no retries, caches or reconnection.
//!
//! # Example
//!
//! ```no_run
//! use fins_udp::{Client, ClientConfig, MemoryArea};
//! use std::net::Ipv4Addr;
//!
//! let config = ClientConfig::new(Ipv4Addr::new(192, 168, 1, 250));
//! let mut client = Client::connect(config)?;
//!
//! // Read 10 words from DM100
//! let data = client.read_data_memory_words(100, 10)?;
//!
//! // Write one word to W20
//! client.write_work_memory(20, 0x00FF)?;
//!
//! // CIO through the generic API
//! let cio = client.read(MemoryArea::CIO, 0, 4)?;
//! # Ok::<(), fins_udp::FinsError>(())
//! ```
//!
//! # Thread Safety
//!
//! All operations take `&mut self`. To share one client between threads, wrap
//! it in a [`SharedClient`](crate::SharedClient), which serializes whole
//! exchanges.

use std::net::SocketAddr;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::exchange::{ExchangeController, ExchangeState};
use crate::header::NodeAddress;
use crate::memory::MemoryArea;
use crate::transport::{DatagramTransport, Scheduler, SleepScheduler, UdpTransport};

/// Value returned by the single-word reads when the exchange fails.
///
/// It lies outside `0..=65535`, so it cannot be mistaken for a word. This is
/// the only place in the crate where a failure is folded into a value; every
/// other operation returns a [`Result`].
pub const READ_FAILED: i32 = -1;

/// FINS client for Data Memory and Work Memory access.
pub struct Client<T = UdpTransport, S = SleepScheduler> {
    exchange: ExchangeController<T, S>,
}

impl Client<UdpTransport, SleepScheduler> {
    /// Creates a client over UDP and binds it to the configured local address.
    ///
    /// # Errors
    ///
    /// Returns `FinsError::TransportBind` if the socket cannot be bound.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use fins_udp::{Client, ClientConfig};
    /// use std::net::Ipv4Addr;
    ///
    /// let client = Client::connect(ClientConfig::new(Ipv4Addr::new(192, 168, 1, 250))).unwrap();
    /// ```
    pub fn connect(config: ClientConfig) -> Result<Self> {
        Self::with_transport(config, UdpTransport::new())
    }

    /// Returns the bound local address of the UDP socket.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.exchange.transport().local_addr()
    }
}

impl<T: DatagramTransport> Client<T, SleepScheduler> {
    /// Creates a client over a custom transport and binds it.
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self> {
        Self::with_parts(config, transport, SleepScheduler)
    }
}

impl<T: DatagramTransport, S: Scheduler> Client<T, S> {
    /// Creates a client from a transport and a scheduler and binds it.
    ///
    /// # Errors
    ///
    /// Returns `FinsError::TransportBind` if the transport cannot be bound.
    pub fn with_parts(config: ClientConfig, transport: T, scheduler: S) -> Result<Self> {
        let mut exchange = ExchangeController::new(&config, transport, scheduler);
        exchange.open()?;
        Ok(Self { exchange })
    }

    /// Reads `count` words from any memory area.
    pub fn read(&mut self, area: MemoryArea, address: u16, count: u16) -> Result<Vec<u16>> {
        self.exchange.perform_read(area, address, count)
    }

    /// Reads `out.len()` words from any memory area into `out`.
    pub fn read_into(&mut self, area: MemoryArea, address: u16, out: &mut [u16]) -> Result<usize> {
        self.exchange.perform_read_into(area, address, out)
    }

    /// Writes words to any memory area.
    pub fn write(&mut self, area: MemoryArea, address: u16, data: &[u16]) -> Result<()> {
        self.exchange.perform_write(area, address, data)
    }

    fn read_word_or_sentinel(&mut self, area: MemoryArea, address: u16) -> i32 {
        let mut word = [0u16; 1];
        match self.read_into(area, address, &mut word) {
            Ok(1) => i32::from(word[0]),
            _ => READ_FAILED,
        }
    }

    // DM (Data Memory)

    /// Reads one DM word, or [`READ_FAILED`] on any failure.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use fins_udp::{Client, ClientConfig, READ_FAILED};
    /// use std::net::Ipv4Addr;
    ///
    /// let mut client = Client::connect(ClientConfig::new(Ipv4Addr::new(192, 168, 1, 250))).unwrap();
    /// match client.read_data_memory(100) {
    ///     READ_FAILED => println!("read failed"),
    ///     value => println!("D100 = {}", value),
    /// }
    /// ```
    pub fn read_data_memory(&mut self, address: u16) -> i32 {
        self.read_word_or_sentinel(MemoryArea::DM, address)
    }

    /// Reads `count` DM words.
    pub fn read_data_memory_words(&mut self, address: u16, count: u16) -> Result<Vec<u16>> {
        self.read(MemoryArea::DM, address, count)
    }

    /// Reads `out.len()` DM words into `out`.
    pub fn read_data_memory_into(&mut self, address: u16, out: &mut [u16]) -> Result<usize> {
        self.read_into(MemoryArea::DM, address, out)
    }

    /// Writes one DM word.
    pub fn write_data_memory(&mut self, address: u16, value: u16) -> Result<()> {
        self.write(MemoryArea::DM, address, &[value])
    }

    /// Writes consecutive DM words.
    pub fn write_data_memory_words(&mut self, address: u16, data: &[u16]) -> Result<()> {
        self.write(MemoryArea::DM, address, data)
    }

    // WR (Work Memory)

    /// Reads one WR word, or [`READ_FAILED`] on any failure.
    pub fn read_work_memory(&mut self, address: u16) -> i32 {
        self.read_word_or_sentinel(MemoryArea::WR, address)
    }

    /// Reads `count` WR words.
    pub fn read_work_memory_words(&mut self, address: u16, count: u16) -> Result<Vec<u16>> {
        self.read(MemoryArea::WR, address, count)
    }

    /// Reads `out.len()` WR words into `out`.
    pub fn read_work_memory_into(&mut self, address: u16, out: &mut [u16]) -> Result<usize> {
        self.read_into(MemoryArea::WR, address, out)
    }

    /// Writes one WR word.
    pub fn write_work_memory(&mut self, address: u16, value: u16) -> Result<()> {
        self.write(MemoryArea::WR, address, &[value])
    }

    /// Writes consecutive WR words.
    pub fn write_work_memory_words(&mut self, address: u16, data: &[u16]) -> Result<()> {
        self.write(MemoryArea::WR, address, data)
    }

    /// Closes the underlying transport.
    pub fn close(&mut self) {
        self.exchange.close();
    }
}

impl<T, S> Client<T, S> {
    /// Returns the response timeout.
    pub fn timeout(&self) -> Duration {
        self.exchange.timeout()
    }

    /// Sets the response timeout for subsequent operations.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.exchange.set_timeout(timeout);
    }

    /// Returns the state the last exchange ended in.
    pub fn last_state(&self) -> ExchangeState {
        self.exchange.state()
    }

    /// Returns the source node address.
    pub fn source(&self) -> NodeAddress {
        self.exchange.source()
    }

    /// Returns the destination node address.
    pub fn destination(&self) -> NodeAddress {
        self.exchange.destination()
    }

    /// Returns the underlying exchange controller.
    pub fn exchange(&self) -> &ExchangeController<T, S> {
        &self.exchange
    }

    /// Returns the underlying exchange controller mutably.
    pub fn exchange_mut(&mut self) -> &mut ExchangeController<T, S> {
        &mut self.exchange
    }
}

impl<T: std::fmt::Debug, S> std::fmt::Debug for Client<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("exchange", &self.exchange)
            .finish()
    }
}
