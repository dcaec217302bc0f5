//! In-memory PLC used by the integration tests.
//!
//! `SimulatedPlc` implements `DatagramTransport`: every command sent through
//! it is parsed and answered from a word map, and the answer is queued as the
//! next incoming datagram. Tests keep a `PlcHandle` to inspect memory and
//! inject faults after the transport has moved into a client.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use fins_udp::{CommandFrame, DatagramTransport};
use parking_lot::Mutex;

#[derive(Debug, Default)]
pub struct PlcState {
    pub memory: HashMap<(u8, u16), u16>,
    pub received: Vec<Vec<u8>>,
    pub outbox: VecDeque<Vec<u8>>,
    /// Status pair returned instead of success.
    pub status: Option<(u8, u8)>,
    /// Never answer.
    pub silent: bool,
    /// Queue a response with a foreign SID ahead of the real one.
    pub stale_first: bool,
    /// Cut every response down to this many bytes.
    pub truncate_to: Option<usize>,
    pub bound: Option<SocketAddr>,
    pub closed: bool,
}

#[derive(Debug, Clone)]
pub struct PlcHandle(Arc<Mutex<PlcState>>);

impl PlcHandle {
    pub fn with<R>(&self, f: impl FnOnce(&mut PlcState) -> R) -> R {
        f(&mut self.0.lock())
    }

    pub fn word(&self, area: u8, address: u16) -> u16 {
        self.with(|s| s.memory.get(&(area, address)).copied().unwrap_or(0))
    }

    pub fn set_word(&self, area: u8, address: u16, value: u16) {
        self.with(|s| s.memory.insert((area, address), value));
    }

    pub fn received(&self) -> Vec<Vec<u8>> {
        self.with(|s| s.received.clone())
    }
}

#[derive(Debug)]
pub struct SimulatedPlc {
    state: Arc<Mutex<PlcState>>,
}

impl SimulatedPlc {
    pub fn new() -> (Self, PlcHandle) {
        let state = Arc::new(Mutex::new(PlcState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            PlcHandle(state),
        )
    }
}

/// Builds a response to `frame` with the given status and data bytes.
pub fn response_to(frame: &CommandFrame<'_>, sid: u8, status: (u8, u8), data: &[u8]) -> Vec<u8> {
    let h = frame.header;
    let mut bytes = vec![
        0xC0, 0x00, 0x02, h.sna, h.sa1, h.sa2, h.dna, h.da1, h.da2, sid, frame.mrc, frame.src,
        status.0, status.1,
    ];
    bytes.extend_from_slice(data);
    bytes
}

fn answer(state: &mut PlcState, frame: &CommandFrame<'_>) -> Vec<u8> {
    let sid = frame.header.sid;
    if let Some(status) = state.status {
        return response_to(frame, sid, status, &[]);
    }
    if frame.is_write() {
        for (i, word) in frame.words().enumerate() {
            let address = frame.address.wrapping_add(i as u16);
            state.memory.insert((frame.area_code, address), word);
        }
        return response_to(frame, sid, (0, 0), &[]);
    }
    if frame.is_read() {
        let mut data = Vec::with_capacity(usize::from(frame.count) * 2);
        for i in 0..frame.count {
            let address = frame.address.wrapping_add(i);
            let word = state.memory.get(&(frame.area_code, address)).copied().unwrap_or(0);
            data.extend_from_slice(&word.to_be_bytes());
        }
        return response_to(frame, sid, (0, 0), &data);
    }
    // Service not supported.
    response_to(frame, sid, (0x04, 0x01), &[])
}

impl DatagramTransport for SimulatedPlc {
    fn bind(&mut self, local: SocketAddr) -> io::Result<()> {
        let mut state = self.state.lock();
        state.bound = Some(local);
        state.closed = false;
        Ok(())
    }

    fn send_to(&mut self, _dest: SocketAddr, bytes: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        state.received.push(bytes.to_vec());
        if state.silent {
            return Ok(bytes.len());
        }
        let frame = CommandFrame::parse(bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

        if state.stale_first {
            let stale = response_to(&frame, frame.header.sid.wrapping_add(100), (0, 0), &[0xDE, 0xAD]);
            state.outbox.push_back(stale);
        }
        let mut reply = answer(&mut state, &frame);
        if let Some(len) = state.truncate_to {
            reply.truncate(len);
        }
        state.outbox.push_back(reply);
        Ok(bytes.len())
    }

    fn poll_incoming(&mut self) -> io::Result<usize> {
        Ok(self.state.lock().outbox.front().map_or(0, Vec::len))
    }

    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let datagram = self.state.lock().outbox.pop_front().unwrap_or_default();
        let len = datagram.len().min(buf.len());
        buf[..len].copy_from_slice(&datagram[..len]);
        Ok(len)
    }

    fn close(&mut self) {
        self.state.lock().closed = true;
    }
}

/// A transport that accepts every send and never receives anything.
#[derive(Debug, Default)]
pub struct SilentTransport {
    pub polls: usize,
}

impl DatagramTransport for SilentTransport {
    fn bind(&mut self, _local: SocketAddr) -> io::Result<()> {
        Ok(())
    }

    fn send_to(&mut self, _dest: SocketAddr, bytes: &[u8]) -> io::Result<usize> {
        Ok(bytes.len())
    }

    fn poll_incoming(&mut self) -> io::Result<usize> {
        self.polls += 1;
        Ok(0)
    }

    fn read_available(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Ok(0)
    }

    fn close(&mut self) {}
}
