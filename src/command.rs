//! FINS command structures and serialization.
//!
//! Two commands are supported, both word-level:
//!
//! - [`ReadWordCommand`] - Memory Area Read (`01 01`)
//! - [`WriteWordCommand`] - Memory Area Write (`01 02`)
//!
//! Body layout after the 10-byte header:
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 10 | 2 | Command code (MRC, SRC) |
//! | 12 | 1 | Memory area code |
//! | 13 | 2 | Start address (big-endian) |
//! | 15 | 1 | Bit offset (always 0) |
//! | 16 | 2 | Item count (big-endian) |
//! | 18 | 2·n | Write data (write only, big-endian words) |
//!
//! Commands encode into a caller-provided buffer so that one transmit buffer
//! can be reused for every exchange. [`CommandFrame::parse`] reads a raw
//! command back, which is what a PLC (or a test double) does on receipt.
//!
//! # Example
//!
//! ```
//! use fins_udp::{FinsHeader, MemoryArea, NodeAddress, ReadWordCommand};
//!
//! let header = FinsHeader::command(NodeAddress::local(), NodeAddress::client_default(), 0x01);
//! let cmd = ReadWordCommand::new(header, MemoryArea::DM, 100, 10);
//!
//! let mut buf = [0u8; 32];
//! let len = cmd.encode_into(&mut buf).unwrap();
//! assert_eq!(len, 18);
//! assert_eq!(&buf[10..18], &[0x01, 0x01, 0x82, 0x00, 0x64, 0x00, 0x00, 0x0A]);
//! ```

use crate::error::{FinsError, Result};
use crate::header::{FinsHeader, FINS_HEADER_SIZE};
use crate::memory::MemoryArea;

/// Memory Area Read command code (MRC).
pub(crate) const MRC_MEMORY_READ: u8 = 0x01;
/// Memory Area Read command sub-code (SRC).
pub(crate) const SRC_MEMORY_READ: u8 = 0x01;
/// Memory Area Write command code (MRC).
pub(crate) const MRC_MEMORY_WRITE: u8 = 0x01;
/// Memory Area Write command sub-code (SRC).
pub(crate) const SRC_MEMORY_WRITE: u8 = 0x02;

/// Size of a read command, and of the fixed part of a write command.
pub const COMMAND_FIXED_SIZE: usize = FINS_HEADER_SIZE + 8;

/// Returns the encoded size of a write command carrying `count` words.
pub fn write_command_size(count: usize) -> usize {
    COMMAND_FIXED_SIZE + count * 2
}

fn check_capacity(buf: &[u8], needed: usize) -> Result<()> {
    if buf.len() < needed {
        return Err(FinsError::invalid_parameter(
            "buffer",
            format!("need {} bytes, got {}", needed, buf.len()),
        ));
    }
    Ok(())
}

/// Writes the command code and word address block shared by read and write.
fn encode_body(
    buf: &mut [u8],
    header: FinsHeader,
    code: [u8; 2],
    area: MemoryArea,
    address: u16,
    count: u16,
) -> Result<usize> {
    let mut pos = header.encode_into(buf)?;
    let [addr_hi, addr_lo] = address.to_be_bytes();
    let [count_hi, count_lo] = count.to_be_bytes();
    let body = [
        code[0],
        code[1],
        area.code(),
        addr_hi,
        addr_lo,
        0x00,
        count_hi,
        count_lo,
    ];
    buf[pos..pos + body.len()].copy_from_slice(&body);
    pos += body.len();
    Ok(pos)
}

/// Command for reading words from PLC memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadWordCommand {
    header: FinsHeader,
    area: MemoryArea,
    address: u16,
    count: u16,
}

impl ReadWordCommand {
    /// Creates a new read word command.
    ///
    /// The count is not range-checked here; the exchange controller bounds it
    /// by the capacity of its receive buffer.
    pub fn new(header: FinsHeader, area: MemoryArea, address: u16, count: u16) -> Self {
        Self {
            header,
            area,
            address,
            count,
        }
    }

    /// Returns the service ID.
    pub fn sid(&self) -> u8 {
        self.header.sid
    }

    /// Writes header and body into `buf`, returning the total length (18).
    ///
    /// # Errors
    ///
    /// Returns `FinsError::InvalidParameter` if `buf` is shorter than 18 bytes.
    pub fn encode_into(&self, buf: &mut [u8]) -> Result<usize> {
        check_capacity(buf, COMMAND_FIXED_SIZE)?;
        encode_body(
            buf,
            self.header,
            [MRC_MEMORY_READ, SRC_MEMORY_READ],
            self.area,
            self.address,
            self.count,
        )
    }

    /// Serializes the command to a fresh byte vector.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; COMMAND_FIXED_SIZE];
        // The vector is sized for the command, so encoding cannot fail.
        let _ = self.encode_into(&mut bytes);
        bytes
    }
}

/// Command for writing words to PLC memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteWordCommand<'a> {
    header: FinsHeader,
    area: MemoryArea,
    address: u16,
    data: &'a [u16],
}

impl<'a> WriteWordCommand<'a> {
    /// Creates a new write word command over `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` holds more words than the 16-bit count field
    /// can express.
    pub fn new(header: FinsHeader, area: MemoryArea, address: u16, data: &'a [u16]) -> Result<Self> {
        if data.len() > usize::from(u16::MAX) {
            return Err(FinsError::invalid_parameter(
                "data",
                format!("must not exceed {} words", u16::MAX),
            ));
        }
        Ok(Self {
            header,
            area,
            address,
            data,
        })
    }

    /// Returns the service ID.
    pub fn sid(&self) -> u8 {
        self.header.sid
    }

    /// Returns the encoded size of this command.
    pub fn encoded_len(&self) -> usize {
        write_command_size(self.data.len())
    }

    /// Writes header, body and data words into `buf`, returning the total length.
    ///
    /// # Errors
    ///
    /// Returns `FinsError::InvalidParameter` if `buf` is shorter than
    /// `18 + 2 * data.len()` bytes.
    pub fn encode_into(&self, buf: &mut [u8]) -> Result<usize> {
        check_capacity(buf, self.encoded_len())?;
        // Length was bounded by `new`.
        let count = self.data.len() as u16;
        let mut pos = encode_body(
            buf,
            self.header,
            [MRC_MEMORY_WRITE, SRC_MEMORY_WRITE],
            self.area,
            self.address,
            count,
        )?;
        for word in self.data {
            buf[pos..pos + 2].copy_from_slice(&word.to_be_bytes());
            pos += 2;
        }
        Ok(pos)
    }

    /// Serializes the command to a fresh byte vector.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; self.encoded_len()];
        // Sized by `encoded_len`, so encoding cannot fail.
        let _ = self.encode_into(&mut bytes);
        bytes
    }
}

/// Encodes a memory area read command into `buf`.
///
/// Shorthand for [`ReadWordCommand::encode_into`].
pub fn encode_read_command(
    buf: &mut [u8],
    header: FinsHeader,
    area: MemoryArea,
    address: u16,
    count: u16,
) -> Result<usize> {
    ReadWordCommand::new(header, area, address, count).encode_into(buf)
}

/// Encodes a memory area write command into `buf`.
///
/// Shorthand for [`WriteWordCommand::encode_into`].
pub fn encode_write_command(
    buf: &mut [u8],
    header: FinsHeader,
    area: MemoryArea,
    address: u16,
    data: &[u16],
) -> Result<usize> {
    WriteWordCommand::new(header, area, address, data)?.encode_into(buf)
}

/// Decoded view of a raw read/write command frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame<'a> {
    /// Command header.
    pub header: FinsHeader,
    /// Main Request Code.
    pub mrc: u8,
    /// Sub Request Code.
    pub src: u8,
    /// Memory area byte, as sent.
    pub area_code: u8,
    /// Start word address.
    pub address: u16,
    /// Bit offset byte.
    pub bit: u8,
    /// Item count.
    pub count: u16,
    /// Trailing bytes after the count (write data for write commands).
    pub payload: &'a [u8],
}

impl<'a> CommandFrame<'a> {
    /// Parses a command frame.
    ///
    /// # Errors
    ///
    /// Returns `FinsError::MalformedFrame` if the frame is shorter than 18
    /// bytes, or if a write command carries fewer data bytes than its count.
    ///
    /// # Example
    ///
    /// ```
    /// use fins_udp::{CommandFrame, FinsHeader, MemoryArea, NodeAddress, WriteWordCommand};
    ///
    /// let header = FinsHeader::command(NodeAddress::local(), NodeAddress::client_default(), 3);
    /// let bytes = WriteWordCommand::new(header, MemoryArea::WR, 5, &[0xBEEF]).unwrap().to_bytes();
    ///
    /// let frame = CommandFrame::parse(&bytes).unwrap();
    /// assert!(frame.is_write());
    /// assert_eq!(frame.area().unwrap(), MemoryArea::WR);
    /// assert_eq!(frame.words().collect::<Vec<_>>(), vec![0xBEEF]);
    /// ```
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() < COMMAND_FIXED_SIZE {
            return Err(FinsError::malformed(bytes.len()));
        }
        let header = FinsHeader::from_bytes(bytes)?;
        let body = &bytes[FINS_HEADER_SIZE..];
        let frame = Self {
            header,
            mrc: body[0],
            src: body[1],
            area_code: body[2],
            address: u16::from_be_bytes([body[3], body[4]]),
            bit: body[5],
            count: u16::from_be_bytes([body[6], body[7]]),
            payload: &bytes[COMMAND_FIXED_SIZE..],
        };
        if frame.is_write() && frame.payload.len() < usize::from(frame.count) * 2 {
            return Err(FinsError::malformed(bytes.len()));
        }
        Ok(frame)
    }

    /// Returns whether this is a Memory Area Read command.
    pub fn is_read(&self) -> bool {
        (self.mrc, self.src) == (MRC_MEMORY_READ, SRC_MEMORY_READ)
    }

    /// Returns whether this is a Memory Area Write command.
    pub fn is_write(&self) -> bool {
        (self.mrc, self.src) == (MRC_MEMORY_WRITE, SRC_MEMORY_WRITE)
    }

    /// Returns the memory area named by the area byte.
    pub fn area(&self) -> Result<MemoryArea> {
        MemoryArea::try_from(self.area_code)
    }

    /// Iterates the write data as big-endian words, bounded by the count.
    pub fn words(&self) -> impl Iterator<Item = u16> + 'a {
        let payload: &'a [u8] = self.payload;
        payload
            .chunks_exact(2)
            .take(usize::from(self.count))
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
    }
}
