//! I2C bus transport.
//!
//! The driver talks to the sensor through [`BusTransport`], a blocking register
//! access interface. [`LinuxI2cBus`] implements it over `/dev/i2c-N`.
//!
//! # Invariants
//!
//! - One owner per bus handle; callers sharing a physical bus between sensors
//!   must serialize whole register reads, not individual transfers
//! - A register read is address-write followed by data-read with no other
//!   transfer in between
//! - Address must be 7-bit (valid range: 0x00..=0x7F)

pub mod linux;
#[cfg(test)]
pub(crate) mod mock;

use std::io;
use std::path::PathBuf;

pub use linux::LinuxI2cBus;

/// Errors reported by a [`BusTransport`].
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// The bus device node could not be opened (missing, permission denied).
    #[error("failed to open I2C bus {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },

    /// Selecting the slave address failed (invalid, or claimed by a kernel driver).
    #[error("failed to select I2C slave 0x{address:02x}: {source}")]
    Address { address: u8, source: io::Error },

    /// A write or read failed at the OS level.
    #[error("I2C transfer failed: {0}")]
    Io(#[source] io::Error),

    /// A transfer moved fewer bytes than requested.
    #[error("short I2C transfer: expected {expected} bytes, got {actual}")]
    ShortTransfer { expected: usize, actual: usize },
}

impl BusError {
    /// Open and address failures mean the session cannot start at all.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BusError::Open { .. } | BusError::Address { .. })
    }
}

pub type Result<T> = core::result::Result<T, BusError>;

/// Blocking register access to one I2C slave.
pub trait BusTransport {
    /// Re-targets the handle at another 7-bit slave address.
    fn select_slave(&mut self, address: u8) -> Result<()>;

    /// Writes `bytes` to the selected slave in one transaction.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()>;

    /// Fills `buffer` from the selected slave in one transaction.
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<()>;

    /// Reads `buffer.len()` bytes starting at `register`.
    ///
    /// The register pointer write must succeed before any data is read; on
    /// failure the read phase is skipped and `buffer` must not be trusted.
    fn read_register(&mut self, register: u8, buffer: &mut [u8]) -> Result<()> {
        self.write_bytes(&[register])?;
        self.read_bytes(buffer)
    }

    /// Writes `value` to `register`.
    fn write_register(&mut self, register: u8, value: u8) -> Result<()> {
        self.write_bytes(&[register, value])
    }
}

impl<T: BusTransport + ?Sized> BusTransport for &mut T {
    fn select_slave(&mut self, address: u8) -> Result<()> {
        (**self).select_slave(address)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_bytes(bytes)
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<()> {
        (**self).read_bytes(buffer)
    }

    fn read_register(&mut self, register: u8, buffer: &mut [u8]) -> Result<()> {
        (**self).read_register(register, buffer)
    }
}

pub(crate) fn check_address(address: u8) -> Result<()> {
    if address > 0x7F {
        return Err(BusError::Address {
            address,
            source: io::Error::new(io::ErrorKind::InvalidInput, "not a 7-bit address"),
        });
    }
    Ok(())
}
