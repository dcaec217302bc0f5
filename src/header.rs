//! The 10-byte routing header carried at the front of every FINS frame.
//!
//! Layout, one byte per field:
//!
//! ```text
//!  0    1    2    3    4    5    6    7    8    9
//! ICF  RSV  GCT  DNA  DA1  DA2  SNA  SA1  SA2  SID
//!      \__ 0    \_ destination _/ \_ source ___/  \_ echoed by the PLC
//! ```
//!
//! Source and destination come from [`ClientConfig`](crate::ClientConfig).
//! Out of the box the client is node `0x22` and the PLC is node 0, both on
//! the local network.
//!
//! # Example
//!
//! ```
//! use fins_udp::{FinsHeader, NodeAddress};
//!
//! let header = FinsHeader::command(NodeAddress::local(), NodeAddress::client_default(), 0x01);
//! assert_eq!(
//!     header.to_bytes(),
//!     [0x80, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x22, 0x00, 0x01]
//! );
//! ```

use crate::error::{FinsError, Result};

/// Length of the routing header.
pub const FINS_HEADER_SIZE: usize = 10;

/// Source node number used when none is configured.
pub const DEFAULT_SOURCE_NODE: u8 = 0x22;

/// ICF for a command that expects a response.
pub(crate) const ICF_RESPONSE_REQUIRED: u8 = 0x80;
/// ICF for a command sent without expecting a response.
pub(crate) const ICF_NO_RESPONSE: u8 = 0x81;
/// ICF bit that marks a frame as a response.
pub(crate) const ICF_RESPONSE_BIT: u8 = 0x40;
/// Gateway count written into every command.
pub(crate) const GATEWAY_COUNT: u8 = 0x02;

/// Where a frame comes from or goes to: network, node and unit number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeAddress {
    /// 0 addresses the segment the client sits on.
    pub network: u8,
    /// Station number on that network.
    pub node: u8,
    /// 0 is the CPU unit.
    pub unit: u8,
}

impl NodeAddress {
    /// Builds an address from its three parts.
    pub fn new(network: u8, node: u8, unit: u8) -> Self {
        Self {
            network,
            node,
            unit,
        }
    }

    /// `0.0.0`, the CPU unit of the PLC on the local segment.
    ///
    /// Default destination.
    pub fn local() -> Self {
        Self::new(0, 0, 0)
    }

    /// Creates the default source address of this client (node `0x22`).
    ///
    /// # Example
    ///
    /// ```
    /// use fins_udp::NodeAddress;
    ///
    /// let src = NodeAddress::client_default();
    /// assert_eq!((src.network, src.node, src.unit), (0, 0x22, 0));
    /// ```
    pub fn client_default() -> Self {
        Self::new(0, DEFAULT_SOURCE_NODE, 0)
    }
}

impl Default for NodeAddress {
    fn default() -> Self {
        Self::local()
    }
}

impl std::fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.network, self.node, self.unit)
    }
}

/// Decoded routing header of a command or a response.
///
/// Fields keep their wire names so a hex dump can be read against them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinsHeader {
    /// Control flags. Commands use `0x80` (answer wanted) or `0x81`;
    /// responses have bit 6 set.
    pub icf: u8,
    /// Always zero.
    pub rsv: u8,
    /// Permitted bridge hops.
    pub gct: u8,
    /// Destination network.
    pub dna: u8,
    /// Destination node.
    pub da1: u8,
    /// Destination unit.
    pub da2: u8,
    /// Source network.
    pub sna: u8,
    /// Source node.
    pub sa1: u8,
    /// Source unit.
    pub sa2: u8,
    /// Service ID, echoed back in the response.
    pub sid: u8,
}

impl FinsHeader {
    /// Creates a command header that requests a response.
    ///
    /// # Example
    ///
    /// ```
    /// use fins_udp::{FinsHeader, NodeAddress};
    ///
    /// let header = FinsHeader::command(NodeAddress::new(0, 10, 0), NodeAddress::new(0, 1, 0), 7);
    /// assert_eq!(header.icf, 0x80);
    /// assert_eq!(header.sid, 7);
    /// ```
    pub fn command(destination: NodeAddress, source: NodeAddress, sid: u8) -> Self {
        Self {
            icf: ICF_RESPONSE_REQUIRED,
            rsv: 0x00,
            gct: GATEWAY_COUNT,
            dna: destination.network,
            da1: destination.node,
            da2: destination.unit,
            sna: source.network,
            sa1: source.node,
            sa2: source.unit,
            sid,
        }
    }

    /// Selects whether the PLC is asked to answer this command.
    pub fn with_response_required(mut self, required: bool) -> Self {
        self.icf = if required {
            ICF_RESPONSE_REQUIRED
        } else {
            ICF_NO_RESPONSE
        };
        self
    }

    /// Serializes the header to bytes.
    pub fn to_bytes(self) -> [u8; FINS_HEADER_SIZE] {
        [
            self.icf, self.rsv, self.gct, self.dna, self.da1, self.da2, self.sna, self.sa1,
            self.sa2, self.sid,
        ]
    }

    /// Writes the header at offset 0 of `buf` and returns the bytes written.
    ///
    /// # Errors
    ///
    /// Returns `FinsError::InvalidParameter` if `buf` is shorter than 10 bytes.
    pub fn encode_into(self, buf: &mut [u8]) -> Result<usize> {
        if buf.len() < FINS_HEADER_SIZE {
            return Err(FinsError::invalid_parameter(
                "buffer",
                format!("need {} bytes for the header, got {}", FINS_HEADER_SIZE, buf.len()),
            ));
        }
        buf[..FINS_HEADER_SIZE].copy_from_slice(&self.to_bytes());
        Ok(FINS_HEADER_SIZE)
    }

    /// Parses a header from the first 10 bytes of `data`.
    ///
    /// # Errors
    ///
    /// Returns `FinsError::MalformedFrame` if the slice is too short.
    ///
    /// # Example
    ///
    /// ```
    /// use fins_udp::FinsHeader;
    ///
    /// let bytes = [0xC0, 0x00, 0x02, 0x00, 0x22, 0x00, 0x00, 0x00, 0x00, 0x01];
    /// let header = FinsHeader::from_bytes(&bytes).unwrap();
    /// assert!(header.is_response());
    /// ```
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < FINS_HEADER_SIZE {
            return Err(FinsError::malformed(data.len()));
        }

        Ok(Self {
            icf: data[0],
            rsv: data[1],
            gct: data[2],
            dna: data[3],
            da1: data[4],
            da2: data[5],
            sna: data[6],
            sa1: data[7],
            sa2: data[8],
            sid: data[9],
        })
    }

    /// Returns whether this is a response header.
    pub fn is_response(self) -> bool {
        (self.icf & ICF_RESPONSE_BIT) != 0
    }

    /// Returns the destination node address.
    pub fn destination(self) -> NodeAddress {
        NodeAddress::new(self.dna, self.da1, self.da2)
    }

    /// Returns the source node address.
    pub fn source(self) -> NodeAddress {
        NodeAddress::new(self.sna, self.sa1, self.sa2)
    }
}
