//! Register-file mock of a BME280 for tests.

use std::io;
use std::time::{Duration, Instant};

use crate::bme280::registers::{BME280_CHIP_ID, BMP280_CHIP_ID, Bme280Register};
use crate::bus::{BusError, BusTransport, Result, check_address};

/// Bus transaction type for logging
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transaction {
    Select(u8),
    Write(Vec<u8>),
    Read { register: u8, len: usize },
}

/// Calibration block from the Bosch datasheet worked example
/// (dig_T1..dig_P9, reserved 0xA0, dig_H1 = 75).
pub const DATASHEET_CALIB_TP: [u8; 26] = [
    0x70, 0x6B, 0x43, 0x67, 0x18, 0xFC, // T1=27504 T2=26435 T3=-1000
    0x7D, 0x8E, 0x43, 0xD6, 0xD0, 0x0B, // P1=36477 P2=-10685 P3=3024
    0x27, 0x0B, 0x8C, 0x00, 0xF9, 0xFF, // P4=2855 P5=140 P6=-7
    0x8C, 0x3C, 0xF8, 0xC6, 0x70, 0x17, // P7=15500 P8=-14600 P9=6000
    0x00, 0x4B,
];

/// dig_H2=362 dig_H3=0 dig_H4=324 dig_H5=50 dig_H6=30
pub const DATASHEET_CALIB_HUM: [u8; 7] = [0x6A, 0x01, 0x00, 0x14, 0x24, 0x03, 0x1E];

/// adc_P=415148 adc_T=519888 adc_H=30000
pub const DATASHEET_SAMPLES: [u8; 8] = [0x65, 0x5A, 0xC0, 0x7E, 0xED, 0x00, 0x75, 0x30];

/// Data registers 0xF7..=0xFE before the first conversion completes.
const RESET_SAMPLES: [u8; 8] = [0x80, 0x00, 0x00, 0x80, 0x00, 0x00, 0x80, 0x00];

/// Mock bus
///
/// Emulates the chip's 256-byte register space: a write sets the register
/// pointer (and stores register/value pairs), a read streams bytes from the
/// pointer with auto-increment. Every transaction is recorded and failures can
/// be injected per operation.
#[derive(Debug)]
pub struct MockBus {
    registers: [u8; 256],
    pointer: u8,
    address: Option<u8>,
    transactions: Vec<Transaction>,
    fail_selects: u32,
    fail_writes: u32,
    fail_reads: u32,
    fail_read_register: Option<u8>,
    conversion_time: Option<Duration>,
    conversion_started: Option<Instant>,
}

impl MockBus {
    /// Blank register file.
    pub fn new() -> Self {
        Self {
            registers: [0; 256],
            pointer: 0,
            address: None,
            transactions: Vec::new(),
            fail_selects: 0,
            fail_writes: 0,
            fail_reads: 0,
            fail_read_register: None,
            conversion_time: None,
            conversion_started: None,
        }
    }

    /// BME280 loaded with the datasheet calibration and samples.
    pub fn bme280() -> Self {
        let mut bus = Self::new();
        bus.set_registers(Bme280Register::Id.addr(), &[BME280_CHIP_ID]);
        bus.set_registers(Bme280Register::CalibStart.addr(), &DATASHEET_CALIB_TP);
        bus.set_registers(Bme280Register::CalibHumStart.addr(), &DATASHEET_CALIB_HUM);
        bus.set_registers(Bme280Register::PressMsb.addr(), &DATASHEET_SAMPLES);
        bus
    }

    /// BMP280: same calibration and samples, no humidity block.
    pub fn bmp280() -> Self {
        let mut bus = Self::new();
        bus.set_registers(Bme280Register::Id.addr(), &[BMP280_CHIP_ID]);
        bus.set_registers(Bme280Register::CalibStart.addr(), &DATASHEET_CALIB_TP[..24]);
        bus.set_registers(Bme280Register::PressMsb.addr(), &DATASHEET_SAMPLES[..6]);
        bus
    }

    /// Data registers read back their reset values until `time` has passed
    /// since ctrl_meas last selected forced or normal mode.
    pub fn with_conversion_time(mut self, time: Duration) -> Self {
        self.conversion_time = Some(time);
        self
    }

    fn conversion_done(&self) -> bool {
        match (self.conversion_time, self.conversion_started) {
            (None, _) => true,
            (Some(time), Some(started)) => started.elapsed() >= time,
            (Some(_), None) => false,
        }
    }

    pub fn set_registers(&mut self, start: u8, data: &[u8]) {
        let start = usize::from(start);
        self.registers[start..start + data.len()].copy_from_slice(data);
    }

    pub fn register(&self, register: u8) -> u8 {
        self.registers[usize::from(register)]
    }

    /// Get transaction log (for test verification)
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn clear_transactions(&mut self) {
        self.transactions.clear();
    }

    pub fn fail_next_selects(&mut self, count: u32) {
        self.fail_selects = count;
    }

    pub fn fail_next_writes(&mut self, count: u32) {
        self.fail_writes = count;
    }

    pub fn fail_next_reads(&mut self, count: u32) {
        self.fail_reads = count;
        self.fail_read_register = None;
    }

    /// Fails the next `count` reads that start at `register`; other reads pass.
    pub fn fail_reads_at(&mut self, register: u8, count: u32) {
        self.fail_reads = count;
        self.fail_read_register = Some(register);
    }

    fn injected() -> io::Error {
        io::Error::other("injected failure")
    }
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new()
    }
}

impl BusTransport for MockBus {
    fn select_slave(&mut self, address: u8) -> Result<()> {
        check_address(address)?;
        self.transactions.push(Transaction::Select(address));
        if self.fail_selects > 0 {
            self.fail_selects -= 1;
            return Err(BusError::Address {
                address,
                source: Self::injected(),
            });
        }
        self.address = Some(address);
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.transactions.push(Transaction::Write(bytes.to_vec()));
        if self.fail_writes > 0 {
            self.fail_writes -= 1;
            return Err(BusError::Io(Self::injected()));
        }
        if self.address.is_none() {
            return Err(BusError::Io(io::Error::new(
                io::ErrorKind::NotConnected,
                "no slave selected",
            )));
        }
        if let Some(&register) = bytes.first() {
            self.pointer = register;
        }
        for pair in bytes.chunks_exact(2) {
            self.registers[usize::from(pair[0])] = pair[1];
            if pair[0] == Bme280Register::CtrlMeas.addr() && pair[1] & 0x03 != 0 {
                self.conversion_started = Some(Instant::now());
            }
        }
        Ok(())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<()> {
        self.transactions.push(Transaction::Read {
            register: self.pointer,
            len: buffer.len(),
        });
        let targeted = self.fail_read_register.is_none_or(|r| r == self.pointer);
        if self.fail_reads > 0 && targeted {
            self.fail_reads -= 1;
            return Err(BusError::ShortTransfer {
                expected: buffer.len(),
                actual: 0,
            });
        }
        let converted = self.conversion_done();
        for (offset, byte) in buffer.iter_mut().enumerate() {
            let register = (usize::from(self.pointer) + offset) % 256;
            *byte = match register.checked_sub(usize::from(Bme280Register::PressMsb.addr())) {
                Some(i) if !converted && i < RESET_SAMPLES.len() => RESET_SAMPLES[i],
                _ => self.registers[register],
            };
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_sets_pointer_and_stores_pairs() {
        let mut bus = MockBus::new();
        bus.select_slave(0x76).unwrap();
        bus.write_register(0xF4, 0x27).unwrap();
        assert_eq!(bus.register(0xF4), 0x27);

        let mut buf = [0u8; 2];
        bus.read_register(0xF4, &mut buf).unwrap();
        assert_eq!(buf, [0x27, 0x00]);
        assert_eq!(
            bus.transactions(),
            &[
                Transaction::Select(0x76),
                Transaction::Write(vec![0xF4, 0x27]),
                Transaction::Write(vec![0xF4]),
                Transaction::Read {
                    register: 0xF4,
                    len: 2
                },
            ]
        );
    }

    #[test]
    fn data_registers_hold_reset_values_until_converted() {
        let mut bus = MockBus::bme280().with_conversion_time(Duration::from_millis(5));
        bus.select_slave(0x76).unwrap();

        let mut raw = [0u8; 8];
        bus.read_register(0xF7, &mut raw).unwrap();
        assert_eq!(raw, RESET_SAMPLES);

        bus.write_register(0xF4, 0x27).unwrap();
        std::thread::sleep(Duration::from_millis(6));
        bus.read_register(0xF7, &mut raw).unwrap();
        assert_eq!(raw, DATASHEET_SAMPLES);

        // Calibration is readable at any time
        let mut id = [0u8; 1];
        bus.read_register(0xD0, &mut id).unwrap();
        assert_eq!(id, [0x60]);
    }

    #[test]
    fn injected_write_failure_skips_read() {
        let mut bus = MockBus::bme280();
        bus.select_slave(0x76).unwrap();
        bus.clear_transactions();
        bus.fail_next_writes(1);

        let mut buf = [0u8; 3];
        assert!(bus.read_register(0xFA, &mut buf).is_err());
        assert_eq!(bus.transactions(), &[Transaction::Write(vec![0xFA])]);
    }
}
