//! Memory area definitions for the FINS protocol.
//!
//! | Area | Description | Area code |
//! |------|-------------|:---------:|
//! | DM | Data Memory - numeric data storage | `0x82` |
//! | WR | Work area - temporary work words | `0xB1` |
//! | CIO | Core I/O - inputs, outputs, internal relays | `0x30` |
//!
//! All access is word-level; the bit-offset byte of every command is zero.
//!
//! # Example
//!
//! ```
//! use fins_udp::MemoryArea;
//!
//! assert_eq!(MemoryArea::DM.code(), 0x82);
//! assert_eq!(MemoryArea::try_from(0xB1).unwrap(), MemoryArea::WR);
//! assert_eq!("cio".parse::<MemoryArea>().unwrap(), MemoryArea::CIO);
//! assert_eq!(MemoryArea::DM.to_string(), "DM");
//! ```

use std::str::FromStr;

use crate::error::FinsError;

/// Memory areas addressable by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryArea {
    /// DM (Data Memory) area.
    DM,
    /// WR (Work) area.
    WR,
    /// CIO (Core I/O) area.
    CIO,
}

impl MemoryArea {
    /// All areas, in area-code order of the facade (DM, WR, CIO).
    pub const ALL: [MemoryArea; 3] = [MemoryArea::DM, MemoryArea::WR, MemoryArea::CIO];

    /// Returns the area byte written into read/write commands.
    pub fn code(self) -> u8 {
        match self {
            MemoryArea::DM => 0x82,
            MemoryArea::WR => 0xB1,
            MemoryArea::CIO => 0x30,
        }
    }
}

impl TryFrom<u8> for MemoryArea {
    type Error = FinsError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        MemoryArea::ALL
            .into_iter()
            .find(|area| area.code() == code)
            .ok_or_else(|| {
                FinsError::invalid_parameter("area", format!("unknown area code 0x{:02X}", code))
            })
    }
}

impl FromStr for MemoryArea {
    type Err = FinsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DM" | "D" => Ok(MemoryArea::DM),
            "WR" | "W" => Ok(MemoryArea::WR),
            "CIO" => Ok(MemoryArea::CIO),
            other => Err(FinsError::invalid_parameter(
                "area",
                format!("unknown memory area '{}'", other),
            )),
        }
    }
}

impl std::fmt::Display for MemoryArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryArea::DM => write!(f, "DM"),
            MemoryArea::WR => write!(f, "WR"),
            MemoryArea::CIO => write!(f, "CIO"),
        }
    }
}
