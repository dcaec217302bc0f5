//! One FINS request/response cycle.
//!
//! [`ExchangeController`] owns everything a single exchange touches: the
//! transport, the SID sequencer and a reusable transmit/receive buffer pair.
//! Exchange methods take `&mut self`, so one controller runs at most one
//! exchange at a time and the buffers are never shared.
//!
//! Each call walks the states
//! `Idle → Sending → AwaitingReply → {Completed | TimedOut | Failed}`:
//!
//! 1. A fresh SID is drawn and the command is encoded into the transmit buffer.
//! 2. The command is sent; an I/O error or short write fails the exchange.
//! 3. The transport is polled until a datagram arrives or the timeout elapses.
//!    Between empty polls the [`Scheduler`] is given control for at least
//!    [`POLL_INTERVAL`].
//! 4. The datagram is read into the receive buffer and decoded.
//!
//! There is exactly one attempt per call. Whether and when to retry after a
//! timeout or device error is up to the caller.
//!
//! With SID matching on (the default), a datagram of valid length that is not
//! a response carrying the command's SID, addressed from the destination node
//! back to the source node, is dropped and the wait continues under the same
//! deadline.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::command::{ReadWordCommand, WriteWordCommand, COMMAND_FIXED_SIZE};
use crate::config::ClientConfig;
use crate::error::{FinsError, Result};
use crate::header::{FinsHeader, NodeAddress};
use crate::memory::MemoryArea;
use crate::response::{decode_response, MIN_RESPONSE_SIZE};
use crate::sequencer::SidSequencer;
use crate::transport::{DatagramTransport, Scheduler, SleepScheduler, MAX_PACKET_SIZE, POLL_INTERVAL};

/// Progress of the most recent exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    /// No exchange started, or the last one was rejected before sending.
    Idle,
    /// Command encoded and being handed to the transport.
    Sending,
    /// Command sent, waiting for the response.
    AwaitingReply,
    /// Response received with success status.
    Completed,
    /// Deadline elapsed without a response.
    TimedOut,
    /// Send failed or the response was malformed or reported an error.
    Failed,
}

/// Executes FINS read/write exchanges over a [`DatagramTransport`].
pub struct ExchangeController<T, S = SleepScheduler> {
    transport: T,
    scheduler: S,
    sequencer: SidSequencer,
    local_addr: SocketAddr,
    plc_addr: SocketAddr,
    source: NodeAddress,
    destination: NodeAddress,
    timeout: Duration,
    match_sid: bool,
    tx: Vec<u8>,
    rx: Vec<u8>,
    state: ExchangeState,
}

impl<T: DatagramTransport, S: Scheduler> ExchangeController<T, S> {
    /// Creates a controller. The transport is not bound until [`open`](Self::open).
    pub fn new(config: &ClientConfig, transport: T, scheduler: S) -> Self {
        Self {
            transport,
            scheduler,
            sequencer: SidSequencer::new(),
            local_addr: config.local_addr,
            plc_addr: config.plc_addr,
            source: config.source,
            destination: config.destination,
            timeout: config.timeout,
            match_sid: config.match_sid,
            tx: vec![0u8; MAX_PACKET_SIZE],
            rx: vec![0u8; MAX_PACKET_SIZE],
            state: ExchangeState::Idle,
        }
    }

    /// Binds the transport to the configured local address.
    ///
    /// # Errors
    ///
    /// Returns `FinsError::TransportBind` if the endpoint cannot be opened.
    pub fn open(&mut self) -> Result<()> {
        self.transport
            .bind(self.local_addr)
            .map_err(FinsError::TransportBind)
    }

    /// Closes the transport.
    pub fn close(&mut self) {
        self.transport.close();
    }

    /// Largest word count a single read can return.
    pub fn max_read_words(&self) -> usize {
        (self.rx.len() - MIN_RESPONSE_SIZE) / 2
    }

    /// Largest word count a single write can carry.
    pub fn max_write_words(&self) -> usize {
        (self.tx.len() - COMMAND_FIXED_SIZE) / 2
    }

    /// Reads `count` words starting at `address`.
    ///
    /// Returns the words decoded from the response, which may be fewer than
    /// requested if the PLC sends less data.
    ///
    /// # Errors
    ///
    /// - `InvalidParameter` if `count` is 0 or above [`max_read_words`](Self::max_read_words)
    /// - `TransportSend`, `TransportReceive`, `ResponseTimeout`,
    ///   `MalformedFrame`, `DeviceError` from the exchange itself
    pub fn perform_read(&mut self, area: MemoryArea, address: u16, count: u16) -> Result<Vec<u16>> {
        let mut words = vec![0u16; usize::from(count)];
        let n = self.perform_read_into(area, address, &mut words)?;
        words.truncate(n);
        Ok(words)
    }

    /// Reads `out.len()` words starting at `address` into `out`.
    ///
    /// Returns the number of words written.
    pub fn perform_read_into(
        &mut self,
        area: MemoryArea,
        address: u16,
        out: &mut [u16],
    ) -> Result<usize> {
        self.state = ExchangeState::Idle;
        let count = out.len();
        if count == 0 {
            return Err(FinsError::invalid_parameter("count", "must be greater than 0"));
        }
        if count > self.max_read_words() {
            return Err(FinsError::invalid_parameter(
                "count",
                format!("must not exceed {}", self.max_read_words()),
            ));
        }

        let header = self.next_header();
        // Bounded by max_read_words above.
        let cmd = ReadWordCommand::new(header, area, address, count as u16);
        let len = self.encode(|buf| cmd.encode_into(buf))?;
        self.send_command(len)?;
        let rx_len = self.await_reply(header.sid)?;

        let result = decode_response(&self.rx[..rx_len], Some(out));
        self.finish(result)
    }

    /// Writes `data` starting at `address`.
    ///
    /// # Errors
    ///
    /// - `InvalidParameter` if `data` is empty or longer than
    ///   [`max_write_words`](Self::max_write_words)
    /// - `TransportSend`, `TransportReceive`, `ResponseTimeout`,
    ///   `MalformedFrame`, `DeviceError` from the exchange itself
    pub fn perform_write(&mut self, area: MemoryArea, address: u16, data: &[u16]) -> Result<()> {
        self.state = ExchangeState::Idle;
        if data.is_empty() {
            return Err(FinsError::invalid_parameter("data", "must not be empty"));
        }
        if data.len() > self.max_write_words() {
            return Err(FinsError::invalid_parameter(
                "data",
                format!("must not exceed {} words", self.max_write_words()),
            ));
        }

        let header = self.next_header();
        let cmd = WriteWordCommand::new(header, area, address, data)?;
        let len = self.encode(|buf| cmd.encode_into(buf))?;
        self.send_command(len)?;
        let rx_len = self.await_reply(header.sid)?;

        let result = decode_response(&self.rx[..rx_len], None).map(|_| ());
        self.finish(result)
    }

    fn next_header(&mut self) -> FinsHeader {
        FinsHeader::command(self.destination, self.source, self.sequencer.next_sid())
    }

    fn encode(&mut self, f: impl FnOnce(&mut [u8]) -> Result<usize>) -> Result<usize> {
        self.state = ExchangeState::Sending;
        f(&mut self.tx).map_err(|e| self.fail(e))
    }

    fn send_command(&mut self, len: usize) -> Result<()> {
        match self.transport.send_to(self.plc_addr, &self.tx[..len]) {
            Ok(written) if written == len => {
                self.state = ExchangeState::AwaitingReply;
                Ok(())
            }
            Ok(written) => Err(self.fail(FinsError::short_write(written, len))),
            Err(e) => Err(self.fail(FinsError::TransportSend(e))),
        }
    }

    /// Waits for the response to `sid`, returning its length in the receive buffer.
    fn await_reply(&mut self, sid: u8) -> Result<usize> {
        let started = Instant::now();
        loop {
            let available = self
                .transport
                .poll_incoming()
                .map_err(|e| self.fail(FinsError::TransportReceive(e)))?;

            if available > 0 {
                let len = self
                    .transport
                    .read_available(&mut self.rx)
                    .map_err(|e| self.fail(FinsError::TransportReceive(e)))?;
                if self.is_awaited_reply(len, sid) {
                    return Ok(len);
                }
            }

            if started.elapsed() >= self.timeout {
                self.state = ExchangeState::TimedOut;
                return Err(FinsError::timeout(self.timeout));
            }
            if available == 0 {
                self.scheduler.yield_now(POLL_INTERVAL);
            }
        }
    }

    /// A reply is ours when it is a response carrying `sid`, sent by the
    /// destination node to the source node. Short datagrams are always handed
    /// to the decoder so they surface as `MalformedFrame`.
    fn is_awaited_reply(&self, len: usize, sid: u8) -> bool {
        if !self.match_sid || len < MIN_RESPONSE_SIZE {
            return true;
        }
        FinsHeader::from_bytes(&self.rx[..len])
            .map(|header| {
                header.is_response()
                    && header.sid == sid
                    && header.destination() == self.source
                    && header.source() == self.destination
            })
            .unwrap_or(false)
    }

    fn fail(&mut self, err: FinsError) -> FinsError {
        self.state = ExchangeState::Failed;
        err
    }

    fn finish<R>(&mut self, result: Result<R>) -> Result<R> {
        self.state = if result.is_ok() {
            ExchangeState::Completed
        } else {
            ExchangeState::Failed
        };
        result
    }
}

impl<T, S> ExchangeController<T, S> {
    /// Returns the state the last exchange ended in.
    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// Returns the last SID issued.
    pub fn last_sid(&self) -> u8 {
        self.sequencer.current()
    }

    /// Returns the response timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sets the response timeout for subsequent exchanges.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Returns the PLC socket address.
    pub fn plc_addr(&self) -> SocketAddr {
        self.plc_addr
    }

    /// Returns the source node address.
    pub fn source(&self) -> NodeAddress {
        self.source
    }

    /// Returns the destination node address.
    pub fn destination(&self) -> NodeAddress {
        self.destination
    }

    /// Returns a reference to the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns a mutable reference to the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

impl<T: std::fmt::Debug, S> std::fmt::Debug for ExchangeController<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeController")
            .field("transport", &self.transport)
            .field("plc_addr", &self.plc_addr)
            .field("source", &self.source)
            .field("destination", &self.destination)
            .field("timeout", &self.timeout)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;
    use std::net::Ipv4Addr;

    /// Replays queued datagrams and records what was sent.
    #[derive(Debug, Default)]
    struct ScriptedTransport {
        sent: Vec<Vec<u8>>,
        incoming: VecDeque<Vec<u8>>,
        short_by: usize,
        fail_send: bool,
        fail_bind: bool,
        fail_poll: bool,
        fail_read: bool,
    }

    impl DatagramTransport for ScriptedTransport {
        fn bind(&mut self, _local: SocketAddr) -> io::Result<()> {
            if self.fail_bind {
                return Err(io::Error::new(io::ErrorKind::AddrInUse, "in use"));
            }
            Ok(())
        }

        fn send_to(&mut self, _dest: SocketAddr, bytes: &[u8]) -> io::Result<usize> {
            if self.fail_send {
                return Err(io::Error::new(io::ErrorKind::Other, "link down"));
            }
            self.sent.push(bytes.to_vec());
            Ok(bytes.len() - self.short_by)
        }

        fn poll_incoming(&mut self) -> io::Result<usize> {
            if self.fail_poll {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
            }
            Ok(self.incoming.front().map_or(0, Vec::len))
        }

        fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.fail_read {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
            }
            let datagram = self.incoming.pop_front().unwrap_or_default();
            let len = datagram.len().min(buf.len());
            buf[..len].copy_from_slice(&datagram[..len]);
            Ok(len)
        }

        fn close(&mut self) {}
    }

    #[derive(Debug, Default)]
    struct CountingScheduler {
        yields: usize,
    }

    impl Scheduler for CountingScheduler {
        fn yield_now(&mut self, min_interval: Duration) {
            self.yields += 1;
            std::thread::sleep(min_interval);
        }
    }

    fn response(sid: u8, status: [u8; 2], data: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0xC0, 0x00, 0x02, 0x00, 0x22, 0x00, 0x00, 0x00, 0x00, sid, 0x01, 0x01];
        bytes.extend_from_slice(&status);
        bytes.extend_from_slice(data);
        bytes
    }

    fn controller(
        transport: ScriptedTransport,
    ) -> ExchangeController<ScriptedTransport, CountingScheduler> {
        let config = ClientConfig::new(Ipv4Addr::LOCALHOST).with_timeout_ms(30);
        ExchangeController::new(&config, transport, CountingScheduler::default())
    }

    #[test]
    fn test_read_completes() {
        let mut transport = ScriptedTransport::default();
        transport.incoming.push_back(response(1, [0, 0], &[0x12, 0x34, 0xAB, 0xCD]));
        let mut ctl = controller(transport);

        let words = ctl.perform_read(MemoryArea::DM, 100, 2).unwrap();
        assert_eq!(words, vec![0x1234, 0xABCD]);
        assert_eq!(ctl.state(), ExchangeState::Completed);

        let sent = &ctl.transport().sent[0];
        assert_eq!(sent.len(), 18);
        assert_eq!(sent[9], 1);
        assert_eq!(&sent[10..], &[0x01, 0x01, 0x82, 0x00, 0x64, 0x00, 0x00, 0x02]);
    }

    #[test]
    fn test_write_ignores_response_data() {
        let mut transport = ScriptedTransport::default();
        transport.incoming.push_back(response(1, [0, 0], &[0xFF, 0xFF]));
        let mut ctl = controller(transport);

        ctl.perform_write(MemoryArea::WR, 7, &[0x0102]).unwrap();
        assert_eq!(ctl.state(), ExchangeState::Completed);
        assert_eq!(&ctl.transport().sent[0][10..], &[
            0x01, 0x02, 0xB1, 0x00, 0x07, 0x00, 0x00, 0x01, 0x01, 0x02
        ]);
    }

    #[test]
    fn test_sid_advances_per_command() {
        let mut transport = ScriptedTransport::default();
        transport.incoming.push_back(response(1, [0, 0], &[0, 1]));
        transport.incoming.push_back(response(2, [0, 0], &[]));
        let mut ctl = controller(transport);

        ctl.perform_read(MemoryArea::DM, 0, 1).unwrap();
        ctl.perform_write(MemoryArea::DM, 0, &[1]).unwrap();
        assert_eq!(ctl.last_sid(), 2);
        assert_eq!(ctl.transport().sent[1][9], 2);
    }

    #[test]
    fn test_timeout_yields_between_polls() {
        let mut ctl = controller(ScriptedTransport::default());

        let err = ctl.perform_read(MemoryArea::DM, 0, 1).unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(ctl.state(), ExchangeState::TimedOut);
        assert!(ctl.scheduler.yields > 0);
    }

    #[test]
    fn test_short_write_fails() {
        let transport = ScriptedTransport {
            short_by: 1,
            ..Default::default()
        };
        let mut ctl = controller(transport);

        match ctl.perform_read(MemoryArea::DM, 0, 1) {
            Err(FinsError::TransportSend(e)) => assert_eq!(e.kind(), io::ErrorKind::WriteZero),
            other => panic!("Expected TransportSend, got {:?}", other),
        }
        assert_eq!(ctl.state(), ExchangeState::Failed);
    }

    #[test]
    fn test_send_error_fails() {
        let transport = ScriptedTransport {
            fail_send: true,
            ..Default::default()
        };
        let mut ctl = controller(transport);

        assert!(matches!(
            ctl.perform_write(MemoryArea::DM, 0, &[1]),
            Err(FinsError::TransportSend(_))
        ));
        assert_eq!(ctl.state(), ExchangeState::Failed);
    }

    #[test]
    fn test_bind_error() {
        let transport = ScriptedTransport {
            fail_bind: true,
            ..Default::default()
        };
        let mut ctl = controller(transport);
        assert!(matches!(ctl.open(), Err(FinsError::TransportBind(_))));
    }

    #[test]
    fn test_malformed_response() {
        let mut transport = ScriptedTransport::default();
        transport.incoming.push_back(vec![0xC0, 0x00, 0x02]);
        let mut ctl = controller(transport);

        assert!(matches!(
            ctl.perform_read(MemoryArea::DM, 0, 1),
            Err(FinsError::MalformedFrame { length: 3 })
        ));
        assert_eq!(ctl.state(), ExchangeState::Failed);
    }

    #[test]
    fn test_device_error_propagates() {
        let mut transport = ScriptedTransport::default();
        transport.incoming.push_back(response(1, [0x11, 0x03], &[]));
        let mut ctl = controller(transport);

        let err = ctl.perform_read(MemoryArea::DM, 0, 1).unwrap_err();
        assert_eq!(err.device_codes(), Some((0x11, 0x03)));
        assert_eq!(ctl.state(), ExchangeState::Failed);
        // One attempt only.
        assert_eq!(ctl.transport().sent.len(), 1);
    }

    #[test]
    fn test_stale_sid_is_discarded() {
        let mut transport = ScriptedTransport::default();
        transport.incoming.push_back(response(0x99, [0, 0], &[0xDE, 0xAD]));
        transport.incoming.push_back(response(1, [0, 0], &[0x00, 0x2A]));
        let mut ctl = controller(transport);

        assert_eq!(ctl.perform_read(MemoryArea::DM, 0, 1).unwrap(), vec![0x2A]);
    }

    #[test]
    fn test_command_echo_is_discarded() {
        let mut transport = ScriptedTransport::default();
        let mut echo = response(1, [0, 0], &[0xDE, 0xAD]);
        echo[0] = 0x80;
        transport.incoming.push_back(echo);
        let mut ctl = controller(transport);

        assert!(ctl.perform_read(MemoryArea::DM, 0, 1).unwrap_err().is_timeout());
    }

    #[test]
    fn test_first_datagram_accepted_without_sid_matching() {
        let mut transport = ScriptedTransport::default();
        transport.incoming.push_back(response(0x99, [0, 0], &[0x00, 0x07]));
        let config = ClientConfig::new(Ipv4Addr::LOCALHOST)
            .with_timeout_ms(30)
            .with_sid_matching(false);
        let mut ctl = ExchangeController::new(&config, transport, CountingScheduler::default());

        assert_eq!(ctl.perform_read(MemoryArea::DM, 0, 1).unwrap(), vec![7]);
    }

    #[test]
    fn test_count_limits() {
        let mut ctl = controller(ScriptedTransport::default());
        assert_eq!(ctl.max_read_words(), 1017);
        assert_eq!(ctl.max_write_words(), 1015);

        assert!(matches!(
            ctl.perform_read(MemoryArea::DM, 0, 0),
            Err(FinsError::InvalidParameter { .. })
        ));
        assert!(matches!(
            ctl.perform_read(MemoryArea::DM, 0, 1018),
            Err(FinsError::InvalidParameter { .. })
        ));
        assert!(matches!(
            ctl.perform_write(MemoryArea::DM, 0, &[]),
            Err(FinsError::InvalidParameter { .. })
        ));
        assert!(matches!(
            ctl.perform_write(MemoryArea::DM, 0, &[0u16; 1016]),
            Err(FinsError::InvalidParameter { .. })
        ));
        assert_eq!(ctl.state(), ExchangeState::Idle);
        assert!(ctl.transport().sent.is_empty());
    }

    #[test]
    fn test_short_read_response_truncates() {
        let mut transport = ScriptedTransport::default();
        transport.incoming.push_back(response(1, [0, 0], &[0x00, 0x05]));
        let mut ctl = controller(transport);

        assert_eq!(ctl.perform_read(MemoryArea::WR, 0, 3).unwrap(), vec![5]);
    }

    #[test]
    fn test_configured_addresses_in_header() {
        let mut transport = ScriptedTransport::default();
        let mut reply = response(1, [0, 0], &[]);
        reply[3..9].copy_from_slice(&[0x01, 0x05, 0x00, 0x02, 0x0A, 0x00]);
        transport.incoming.push_back(reply);
        let config = ClientConfig::new(Ipv4Addr::LOCALHOST)
            .with_source(NodeAddress::new(1, 5, 0))
            .with_destination(NodeAddress::new(2, 10, 0));
        let mut ctl = ExchangeController::new(&config, transport, CountingScheduler::default());

        ctl.perform_write(MemoryArea::DM, 0, &[0]).unwrap();
        assert_eq!(&ctl.transport().sent[0][..10], &[
            0x80, 0x00, 0x02, 0x02, 0x0A, 0x00, 0x01, 0x05, 0x00, 0x01
        ]);
    }

    #[test]
    fn test_reply_for_other_node_is_discarded() {
        let mut transport = ScriptedTransport::default();
        let mut foreign = response(1, [0, 0], &[0xDE, 0xAD]);
        foreign[4] = 0x99;
        transport.incoming.push_back(foreign);
        transport.incoming.push_back(response(1, [0, 0], &[0x00, 0x2A]));
        let mut ctl = controller(transport);

        assert_eq!(ctl.perform_read(MemoryArea::DM, 0, 1).unwrap(), vec![0x2A]);
        assert_eq!(ctl.state(), ExchangeState::Completed);
    }

    #[test]
    fn test_reply_from_other_node_is_discarded() {
        let mut transport = ScriptedTransport::default();
        let mut foreign = response(1, [0, 0], &[0xDE, 0xAD]);
        foreign[7] = 0x05;
        transport.incoming.push_back(foreign);
        let mut ctl = controller(transport);

        assert!(ctl.perform_read(MemoryArea::DM, 0, 1).unwrap_err().is_timeout());
        assert_eq!(ctl.state(), ExchangeState::TimedOut);
    }

    #[test]
    fn test_poll_error_fails() {
        let transport = ScriptedTransport {
            fail_poll: true,
            ..Default::default()
        };
        let mut ctl = controller(transport);

        assert!(matches!(
            ctl.perform_read(MemoryArea::DM, 0, 1),
            Err(FinsError::TransportReceive(_))
        ));
        assert_eq!(ctl.state(), ExchangeState::Failed);
        assert_eq!(ctl.scheduler.yields, 0);
    }

    #[test]
    fn test_read_error_fails() {
        let mut transport = ScriptedTransport {
            fail_read: true,
            ..Default::default()
        };
        transport.incoming.push_back(response(1, [0, 0], &[]));
        let mut ctl = controller(transport);

        match ctl.perform_write(MemoryArea::WR, 0, &[1]) {
            Err(FinsError::TransportReceive(e)) => {
                assert_eq!(e.kind(), io::ErrorKind::ConnectionReset)
            }
            other => panic!("Expected TransportReceive, got {:?}", other),
        }
        assert_eq!(ctl.state(), ExchangeState::Failed);
    }

    #[test]
    fn test_short_stray_datagram_ends_wait() {
        let mut transport = ScriptedTransport::default();
        transport.incoming.push_back(vec![0x01, 0x02, 0x03]);
        transport.incoming.push_back(response(1, [0, 0], &[0x00, 0x2A]));
        let mut ctl = controller(transport);

        assert!(matches!(
            ctl.perform_read(MemoryArea::DM, 0, 1),
            Err(FinsError::MalformedFrame { length: 3 })
        ));
        // The valid reply is left for the caller to drain.
        assert_eq!(ctl.transport().incoming.len(), 1);
    }
}
