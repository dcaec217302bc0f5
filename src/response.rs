//! Decoding of the PLC's answer to a memory-area command.
//!
//! An answer is the 10-byte header, the echoed command code (MRC, SRC), the
//! two end-code bytes (MRES, SRES) and, for reads, the words in big-endian
//! order. Anything shorter than 14 bytes is malformed.
//!
//! A response is successful only if both status bytes are zero. Any other
//! pair is returned verbatim as [`FinsError::DeviceError`].
//!
//! [`FinsResponse`] borrows the receive buffer it was parsed from, so it is
//! valid until that buffer is reused for the next datagram.
//!
//! # Example
//!
//! ```
//! use fins_udp::decode_response;
//!
//! let bytes = [
//!     0xC0, 0x00, 0x02, 0x00, 0x22, 0x00, 0x00, 0x00, 0x00, 0x01, // header
//!     0x01, 0x01, // MRC, SRC
//!     0x00, 0x00, // success codes
//!     0x12, 0x34, 0x56, 0x78, // data: 0x1234, 0x5678
//! ];
//!
//! let mut words = [0u16; 2];
//! let n = decode_response(&bytes, Some(&mut words)).unwrap();
//! assert_eq!(n, 2);
//! assert_eq!(words, [0x1234, 0x5678]);
//! ```

use crate::error::{FinsError, Result};
use crate::header::{FinsHeader, FINS_HEADER_SIZE};

/// Header, command echo and end code: the shortest well-formed answer.
pub const MIN_RESPONSE_SIZE: usize = FINS_HEADER_SIZE + 4;

/// Parsed view over a FINS response datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinsResponse<'a> {
    /// Response header.
    pub header: FinsHeader,
    /// Main Request Code echo.
    pub mrc: u8,
    /// Sub Request Code echo.
    pub src: u8,
    /// Main response code (0x00 = success).
    pub main_code: u8,
    /// Sub response code (0x00 = success).
    pub sub_code: u8,
    /// Word payload, empty for writes.
    pub data: &'a [u8],
}

impl<'a> FinsResponse<'a> {
    /// Splits a datagram into its parts.
    ///
    /// Only the length is validated here; status is checked by
    /// [`check_status`](Self::check_status).
    ///
    /// # Errors
    ///
    /// Returns `FinsError::MalformedFrame` if fewer than 14 bytes are given.
    pub fn from_bytes(data: &'a [u8]) -> Result<Self> {
        if data.len() < MIN_RESPONSE_SIZE {
            return Err(FinsError::malformed(data.len()));
        }

        let header = FinsHeader::from_bytes(&data[..FINS_HEADER_SIZE])?;

        Ok(Self {
            header,
            mrc: data[FINS_HEADER_SIZE],
            src: data[FINS_HEADER_SIZE + 1],
            main_code: data[FINS_HEADER_SIZE + 2],
            sub_code: data[FINS_HEADER_SIZE + 3],
            data: &data[MIN_RESPONSE_SIZE..],
        })
    }

    /// Returns whether the response indicates success (both codes zero).
    pub fn is_success(&self) -> bool {
        self.main_code == 0x00 && self.sub_code == 0x00
    }

    /// Returns an error if the response carries a non-zero status pair.
    ///
    /// # Errors
    ///
    /// Returns `FinsError::DeviceError` with the codes as received.
    pub fn check_status(&self) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(FinsError::device_error(self.main_code, self.sub_code))
        }
    }

    /// Returns the number of complete words in the data section.
    pub fn word_count(&self) -> usize {
        self.data.len() / 2
    }

    /// Iterates the data section as big-endian words.
    ///
    /// An odd trailing byte is ignored.
    pub fn words(&self) -> impl Iterator<Item = u16> + 'a {
        let data: &'a [u8] = self.data;
        data.chunks_exact(2)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
    }

    /// Copies data words into `out`, returning how many were written.
    ///
    /// At most `out.len()` words are written.
    pub fn words_into(&self, out: &mut [u16]) -> usize {
        let mut written = 0;
        for (slot, word) in out.iter_mut().zip(self.words()) {
            *slot = word;
            written += 1;
        }
        written
    }
}

/// Validates a response and decodes its data words.
///
/// Checks the length, then the status pair, and only then decodes
/// `(len - 14) / 2` words into `out` (bounded by `out.len()`). Returns the
/// number of words written, or 0 when `out` is `None`.
///
/// # Errors
///
/// - `FinsError::MalformedFrame` if `buf` is shorter than 14 bytes
/// - `FinsError::DeviceError` if either status byte is non-zero; `out` is
///   left untouched
pub fn decode_response(buf: &[u8], out: Option<&mut [u16]>) -> Result<usize> {
    let response = FinsResponse::from_bytes(buf)?;
    response.check_status()?;
    Ok(out.map_or(0, |out| response.words_into(out)))
}
