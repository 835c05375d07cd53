//! Linux `i2c-dev` transport (`/dev/i2c-N`).

use std::io;
use std::path::{Path, PathBuf};

use i2cdev::core::{I2CMessage, I2CTransfer};
use i2cdev::linux::{LinuxI2CDevice, LinuxI2CError, LinuxI2CMessage};
use log::debug;

use crate::bus::{BusError, BusTransport, Result, check_address};

/// Bus handle bound to one slave on a Linux I2C adapter.
///
/// Every transfer goes through `I2C_RDWR`, so a register read is a single
/// write + repeated-start + read transaction. The device file is closed when the
/// value is dropped, on success and error paths alike.
pub struct LinuxI2cBus {
    device: LinuxI2CDevice,
    path: PathBuf,
    address: u8,
}

impl LinuxI2cBus {
    /// Opens `path` and selects `address` (`I2C_SLAVE`).
    ///
    /// # Errors
    /// - `BusError::Open` if the device node cannot be opened
    /// - `BusError::Address` if the address is not 7-bit or the ioctl fails
    ///   (`EBUSY` when a kernel driver is bound to the slave)
    pub fn open(path: impl AsRef<Path>, address: u8) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        check_address(address)?;

        let device = LinuxI2CDevice::new(&path, u16::from(address)).map_err(|e| match e {
            // The device node is opened first; only that step reports plain I/O errors
            LinuxI2CError::Io(source) => BusError::Open {
                path: path.clone(),
                source,
            },
            other => BusError::Address {
                address,
                source: io::Error::from(other),
            },
        })?;

        debug!("opened {} for slave 0x{:02x}", path.display(), address);
        Ok(Self {
            device,
            path,
            address,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    fn transfer<'a>(
        &mut self,
        messages: &'a mut [LinuxI2CMessage<'a>],
        lengths: &[usize],
    ) -> Result<()> {
        let done = self.device.transfer(messages).map_err(|e| BusError::Io(e.into()))? as usize;
        if done < lengths.len() {
            return Err(BusError::ShortTransfer {
                expected: lengths.iter().sum(),
                actual: lengths[..done].iter().sum(),
            });
        }
        Ok(())
    }
}

impl BusTransport for LinuxI2cBus {
    fn select_slave(&mut self, address: u8) -> Result<()> {
        check_address(address)?;
        self.device
            .set_slave_address(u16::from(address))
            .map_err(|e| BusError::Address {
                address,
                source: e.into(),
            })?;
        self.address = address;
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let addr = u16::from(self.address);
        let mut messages = [LinuxI2CMessage::write(bytes).with_address(addr)];
        self.transfer(&mut messages, &[bytes.len()])
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<()> {
        let addr = u16::from(self.address);
        let len = buffer.len();
        let mut messages = [LinuxI2CMessage::read(buffer).with_address(addr)];
        self.transfer(&mut messages, &[len])
    }

    fn read_register(&mut self, register: u8, buffer: &mut [u8]) -> Result<()> {
        let addr = u16::from(self.address);
        let len = buffer.len();
        let pointer = [register];
        let mut messages = [
            LinuxI2CMessage::write(&pointer).with_address(addr),
            LinuxI2CMessage::read(buffer).with_address(addr),
        ];
        self.transfer(&mut messages, &[1, len])
    }
}

impl Drop for LinuxI2cBus {
    fn drop(&mut self) {
        debug!("closing {}", self.path.display());
    }
}
