//! Datagram transport layer for FINS communication.
//!
//! The exchange controller talks to the network only through the
//! [`DatagramTransport`] trait: bind, send, poll for an incoming datagram,
//! read it, close. It knows nothing about sockets; the transport knows nothing
//! about FINS.
//!
//! [`UdpTransport`] is the default implementation over a non-blocking
//! [`UdpSocket`]. Any other datagram layer (an embedded network stack, a test
//! double) can be plugged in by implementing the trait.
//!
//! The wait for a reply is cooperative: between polls the controller hands
//! control to a [`Scheduler`], which by default yields the thread and sleeps
//! for the poll interval.
//!
//! # Constants
//!
//! - [`DEFAULT_FINS_PORT`] - Default FINS UDP port (9600)
//! - [`DEFAULT_TIMEOUT`] - Default response timeout (2 seconds)
//! - [`MAX_PACKET_SIZE`] - Receive buffer capacity (2048 bytes)
//! - [`POLL_INTERVAL`] - Minimum pause between polls (1 ms)

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use tracing::{debug, trace};

/// Default FINS UDP port.
pub const DEFAULT_FINS_PORT: u16 = 9600;

/// Default timeout waiting for a response.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

/// Maximum FINS datagram size handled by this client.
pub const MAX_PACKET_SIZE: usize = 2048;

/// Minimum pause between two polls of the transport.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Connectionless datagram endpoint used by the exchange controller.
pub trait DatagramTransport {
    /// Opens the endpoint on the given local address.
    fn bind(&mut self, local: SocketAddr) -> io::Result<()>;

    /// Sends one datagram, returning the number of bytes written.
    fn send_to(&mut self, dest: SocketAddr, bytes: &[u8]) -> io::Result<usize>;

    /// Returns the size of the next available datagram, or 0 if none.
    ///
    /// Must not block.
    fn poll_incoming(&mut self) -> io::Result<usize>;

    /// Moves the available datagram into `buf`, returning the bytes copied.
    ///
    /// A datagram larger than `buf` is truncated.
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Tears the endpoint down. Further sends fail until rebound.
    fn close(&mut self);
}

/// Host scheduler the wait loop yields to between polls.
pub trait Scheduler {
    /// Cedes the processor for at least `min_interval`.
    fn yield_now(&mut self, min_interval: Duration);
}

/// Default scheduler: yields the OS thread, then sleeps.
#[derive(Debug, Clone, Copy, Default)]
pub struct SleepScheduler;

impl Scheduler for SleepScheduler {
    fn yield_now(&mut self, min_interval: Duration) {
        std::thread::yield_now();
        std::thread::sleep(min_interval);
    }
}

/// UDP transport for FINS communication.
///
/// The socket is non-blocking. A poll that finds a datagram receives it into
/// an internal buffer of [`MAX_PACKET_SIZE`] bytes and holds it until
/// [`read_available`](DatagramTransport::read_available) is called.
///
/// Once something has been sent, only datagrams from that destination are
/// kept; traffic from any other peer is dropped while polling.
///
/// # Example
///
/// ```no_run
/// use fins_udp::{DatagramTransport, UdpTransport};
///
/// let mut transport = UdpTransport::new();
/// transport.bind("0.0.0.0:9600".parse().unwrap()).unwrap();
/// transport.send_to("192.168.1.250:9600".parse().unwrap(), &[0x80, 0x00, 0x02]).unwrap();
/// ```
pub struct UdpTransport {
    socket: Option<UdpSocket>,
    peer: Option<SocketAddr>,
    scratch: Vec<u8>,
    pending: usize,
}

impl UdpTransport {
    /// Creates an unbound transport.
    pub fn new() -> Self {
        Self {
            socket: None,
            peer: None,
            scratch: vec![0u8; MAX_PACKET_SIZE],
            pending: 0,
        }
    }

    /// Returns the bound local address, if any.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    /// Returns whether the transport is bound.
    pub fn is_bound(&self) -> bool {
        self.socket.is_some()
    }

    fn socket(&self) -> io::Result<&UdpSocket> {
        self.socket
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "transport is not bound"))
    }
}

impl Default for UdpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl DatagramTransport for UdpTransport {
    fn bind(&mut self, local: SocketAddr) -> io::Result<()> {
        let socket = UdpSocket::bind(local)?;
        socket.set_nonblocking(true)?;
        debug!(local = %socket.local_addr()?, "udp transport bound");
        self.socket = Some(socket);
        self.peer = None;
        self.pending = 0;
        Ok(())
    }

    fn send_to(&mut self, dest: SocketAddr, bytes: &[u8]) -> io::Result<usize> {
        let written = self.socket()?.send_to(bytes, dest)?;
        trace!(%dest, len = bytes.len(), written, "datagram sent");
        self.peer = Some(dest);
        Ok(written)
    }

    fn poll_incoming(&mut self) -> io::Result<usize> {
        if self.pending > 0 {
            return Ok(self.pending);
        }
        let socket = match self.socket.as_ref() {
            Some(socket) => socket,
            None => return Ok(0),
        };
        loop {
            match socket.recv_from(&mut self.scratch) {
                Ok((len, from)) if self.peer.map_or(true, |peer| peer == from) => {
                    trace!(%from, len, "datagram received");
                    self.pending = len;
                    return Ok(len);
                }
                Ok((len, from)) => {
                    trace!(%from, len, "datagram from unexpected peer dropped");
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(0),
                Err(e) => return Err(e),
            }
        }
    }

    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = self.pending.min(buf.len());
        buf[..len].copy_from_slice(&self.scratch[..len]);
        self.pending = 0;
        Ok(len)
    }

    fn close(&mut self) {
        if let Some(socket) = self.socket.take() {
            debug!(local = ?socket.local_addr().ok(), "udp transport closed");
        }
        self.peer = None;
        self.pending = 0;
    }
}

impl std::fmt::Debug for UdpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpTransport")
            .field("local_addr", &self.local_addr())
            .field("peer", &self.peer)
            .field("pending", &self.pending)
            .finish()
    }
}
