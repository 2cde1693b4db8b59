//! Core errors
//!
//! Every fallible boundary in this crate (ROM loading, mapper dispatch,
//! cartridge flashing) reports through one of the two enums below rather
//! than panicking, so a host can surface a human-readable message and branch
//! on a stable kind tag.

use thiserror::Error;

/// Errors surfaced while parsing an iNES ROM image.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("not an iNES file: expected magic \"NES\\x1A\", found {found:02X?}")]
    BadMagic { found: [u8; 4] },

    #[error("truncated iNES file: expected {expected} more byte(s) for {section}")]
    Truncated { section: &'static str, expected: usize },

    #[error("iNES header declares zero PRG-ROM banks")]
    ZeroPrgBanks,

    #[error("mapper {0} is not implemented; only mapper 0 (NROM) is supported")]
    UnsupportedMapper(u8),
}

/// Kind tag for [`CoreError`], so callers can branch without matching on the
/// message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    IllegalArgument,
    IllegalOperation,
    SizeOverflow,
    UnsupportedMapper,
}

/// Runtime programming errors: an out-of-contract call into the mapper or
/// cartridge plumbing. These are "core bugs" per design — a well-behaved
/// caller never triggers them — but the library reports them as `Result`
/// rather than panicking so tests and debuggers can observe the failure.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("address ${address:04X} is below the mapper's ROM window ($8000)")]
    RomAddressBelowWindow { address: u16 },

    #[error("mapper has no cartridge RAM attached")]
    NoCartridgeRam,

    #[error("flash payload of {payload_len} byte(s) at ${address:04X} overflows its {span_len}-byte destination span")]
    FlashOverflow {
        address: u16,
        payload_len: usize,
        span_len: usize,
    },
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::RomAddressBelowWindow { .. } => ErrorKind::IllegalArgument,
            CoreError::NoCartridgeRam => ErrorKind::IllegalOperation,
            CoreError::FlashOverflow { .. } => ErrorKind::SizeOverflow,
        }
    }
}

impl LoadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoadError::UnsupportedMapper(_) => ErrorKind::UnsupportedMapper,
            _ => ErrorKind::IllegalArgument,
        }
    }
}
