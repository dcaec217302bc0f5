//! Serialized access to one client from several threads.
//!
//! A [`Client`] reuses one receive buffer and one SID counter for every
//! exchange, so two exchanges must never overlap. [`SharedClient`] holds a
//! mutex for the whole encode → send → await → decode cycle of each call.
//!
//! # Example
//!
//! ```no_run
//! use fins_udp::{Client, ClientConfig, SharedClient};
//! use std::net::Ipv4Addr;
//! use std::sync::Arc;
//!
//! let client = Client::connect(ClientConfig::new(Ipv4Addr::new(192, 168, 1, 250))).unwrap();
//! let shared = Arc::new(SharedClient::new(client));
//!
//! let worker = {
//!     let shared = Arc::clone(&shared);
//!     std::thread::spawn(move || shared.read_data_memory(100))
//! };
//! shared.write_data_memory(200, 1).unwrap();
//! let _ = worker.join();
//! ```

use parking_lot::{Mutex, MutexGuard};

use crate::client::Client;
use crate::error::Result;
use crate::memory::MemoryArea;
use crate::transport::{DatagramTransport, Scheduler, SleepScheduler, UdpTransport};

/// A [`Client`] behind a mutex; each method is one serialized exchange.
pub struct SharedClient<T = UdpTransport, S = SleepScheduler> {
    inner: Mutex<Client<T, S>>,
}

impl<T: DatagramTransport, S: Scheduler> SharedClient<T, S> {
    /// Wraps a client.
    pub fn new(client: Client<T, S>) -> Self {
        Self {
            inner: Mutex::new(client),
        }
    }

    /// Locks the client for a sequence of operations.
    ///
    /// Other callers block until the guard is dropped.
    pub fn lock(&self) -> MutexGuard<'_, Client<T, S>> {
        self.inner.lock()
    }

    /// Unwraps the client.
    pub fn into_inner(self) -> Client<T, S> {
        self.inner.into_inner()
    }

    /// See [`Client::read`].
    pub fn read(&self, area: MemoryArea, address: u16, count: u16) -> Result<Vec<u16>> {
        self.lock().read(area, address, count)
    }

    /// See [`Client::write`].
    pub fn write(&self, area: MemoryArea, address: u16, data: &[u16]) -> Result<()> {
        self.lock().write(area, address, data)
    }

    /// See [`Client::read_data_memory`].
    pub fn read_data_memory(&self, address: u16) -> i32 {
        self.lock().read_data_memory(address)
    }

    /// See [`Client::read_data_memory_words`].
    pub fn read_data_memory_words(&self, address: u16, count: u16) -> Result<Vec<u16>> {
        self.lock().read_data_memory_words(address, count)
    }

    /// See [`Client::write_data_memory`].
    pub fn write_data_memory(&self, address: u16, value: u16) -> Result<()> {
        self.lock().write_data_memory(address, value)
    }

    /// See [`Client::write_data_memory_words`].
    pub fn write_data_memory_words(&self, address: u16, data: &[u16]) -> Result<()> {
        self.lock().write_data_memory_words(address, data)
    }

    /// See [`Client::read_work_memory`].
    pub fn read_work_memory(&self, address: u16) -> i32 {
        self.lock().read_work_memory(address)
    }

    /// See [`Client::read_work_memory_words`].
    pub fn read_work_memory_words(&self, address: u16, count: u16) -> Result<Vec<u16>> {
        self.lock().read_work_memory_words(address, count)
    }

    /// See [`Client::write_work_memory`].
    pub fn write_work_memory(&self, address: u16, value: u16) -> Result<()> {
        self.lock().write_work_memory(address, value)
    }

    /// See [`Client::write_work_memory_words`].
    pub fn write_work_memory_words(&self, address: u16, data: &[u16]) -> Result<()> {
        self.lock().write_work_memory_words(address, data)
    }
}

impl<T: std::fmt::Debug, S> std::fmt::Debug for SharedClient<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.try_lock() {
            Some(client) => f.debug_struct("SharedClient").field("client", &*client).finish(),
            None => f.debug_struct("SharedClient").field("client", &"<locked>").finish(),
        }
    }
}
