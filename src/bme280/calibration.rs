//! BME280 calibration coefficients.
//!
//! This module loads and decodes the factory-trimmed compensation coefficients
//! (registers 0x88–0xA1 and 0xE1–0xE7), as described in the Bosch BME280
//! datasheet (BST-BME280-DS002, section 4.2.2 "Trimming parameter readout").

use log::debug;

use crate::bme280::registers::{Bme280Register, CALIB_HUM_LEN, CALIB_TP_LEN};
use crate::bme280::{Bme280Error, Chip};
use crate::bus::BusTransport;

/// Temperature coefficients, registers 0x88–0x8D (little-endian pairs).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TemperatureCalibration {
    /// Unsigned, typical ~27000–28000
    pub dig_t1: u16,
    pub dig_t2: i16,
    pub dig_t3: i16,
}

impl TemperatureCalibration {
    /// Decodes `dig_T1` (unsigned) and `dig_T2`/`dig_T3` (two's complement).
    pub fn from_bytes(bytes: &[u8; 6]) -> Self {
        Self {
            dig_t1: u16::from_le_bytes([bytes[0], bytes[1]]),
            dig_t2: i16::from_le_bytes([bytes[2], bytes[3]]),
            dig_t3: i16::from_le_bytes([bytes[4], bytes[5]]),
        }
    }
}

/// Pressure coefficients, registers 0x8E–0x9F.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PressureCalibration {
    /// Unsigned, typical ~30000–37000
    pub dig_p1: u16,
    pub dig_p2: i16,
    pub dig_p3: i16,
    pub dig_p4: i16,
    pub dig_p5: i16,
    pub dig_p6: i16,
    pub dig_p7: i16,
    pub dig_p8: i16,
    pub dig_p9: i16,
}

impl PressureCalibration {
    pub fn from_bytes(bytes: &[u8; 18]) -> Self {
        let signed = |i: usize| i16::from_le_bytes([bytes[i], bytes[i + 1]]);
        Self {
            dig_p1: u16::from_le_bytes([bytes[0], bytes[1]]),
            dig_p2: signed(2),
            dig_p3: signed(4),
            dig_p4: signed(6),
            dig_p5: signed(8),
            dig_p6: signed(10),
            dig_p7: signed(12),
            dig_p8: signed(14),
            dig_p9: signed(16),
        }
    }
}

/// Humidity coefficients: `dig_H1` at 0xA1, the rest at 0xE1–0xE7.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HumidityCalibration {
    pub dig_h1: u8,
    pub dig_h2: i16,
    pub dig_h3: u8,
    /// 12-bit signed: 0xE4 is bits 11:4, 0xE5 bits 3:0 are bits 3:0
    pub dig_h4: i16,
    /// 12-bit signed: 0xE6 is bits 11:4, 0xE5 bits 7:4 are bits 3:0
    pub dig_h5: i16,
    pub dig_h6: i8,
}

impl HumidityCalibration {
    pub fn from_bytes(dig_h1: u8, bytes: &[u8; CALIB_HUM_LEN]) -> Self {
        Self {
            dig_h1,
            dig_h2: i16::from_le_bytes([bytes[0], bytes[1]]),
            dig_h3: bytes[2],
            dig_h4: (i16::from(bytes[3] as i8) << 4) | i16::from(bytes[4] & 0x0F),
            dig_h5: (i16::from(bytes[5] as i8) << 4) | i16::from(bytes[4] >> 4),
            dig_h6: bytes[6] as i8,
        }
    }
}

/// Full coefficient set for one session. `humidity` is `None` on a BMP280.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Calibration {
    pub temperature: TemperatureCalibration,
    pub pressure: PressureCalibration,
    pub humidity: Option<HumidityCalibration>,
}

impl Calibration {
    /// Reads the calibration blocks from the sensor.
    ///
    /// One 26-byte burst at 0x88, plus a 7-byte burst at 0xE1 when the chip has
    /// a humidity channel. Must be called once per session, after reset and
    /// chip ID verification.
    ///
    /// # Errors
    /// - `Bme280Error::Bus` if either burst read fails
    /// - `Bme280Error::InvalidCalibration` if the temperature block is blank
    pub fn read<T: BusTransport>(bus: &mut T, chip: Chip) -> Result<Self, Bme280Error> {
        let mut tp = [0u8; CALIB_TP_LEN];
        bus.read_register(Bme280Register::CalibStart.addr(), &mut tp)?;

        let humidity = if chip.has_humidity() {
            let mut hum = [0u8; CALIB_HUM_LEN];
            bus.read_register(Bme280Register::CalibHumStart.addr(), &mut hum)?;
            Some(hum)
        } else {
            None
        };

        let calib = Self::decode(&tp, humidity.as_ref())?;
        debug!("calibration loaded: {:?}", calib);
        Ok(calib)
    }

    /// Decodes raw calibration blocks.
    ///
    /// A temperature block of all 0x00 or all 0xFF means the bus returned
    /// nothing useful (floating lines, or a chip still copying its NVM) and is
    /// rejected so compensation never runs on unset coefficients.
    pub fn decode(
        tp: &[u8; CALIB_TP_LEN],
        humidity: Option<&[u8; CALIB_HUM_LEN]>,
    ) -> Result<Self, Bme280Error> {
        let (temp_bytes, rest) = tp.split_at(6);
        if temp_bytes.iter().all(|&b| b == 0x00) || temp_bytes.iter().all(|&b| b == 0xFF) {
            return Err(Bme280Error::InvalidCalibration);
        }

        let mut temp = [0u8; 6];
        temp.copy_from_slice(temp_bytes);
        let mut press = [0u8; 18];
        press.copy_from_slice(&rest[..18]);

        Ok(Self {
            temperature: TemperatureCalibration::from_bytes(&temp),
            pressure: PressureCalibration::from_bytes(&press),
            // 0xA0 is reserved, dig_H1 sits at 0xA1
            humidity: humidity.map(|hum| HumidityCalibration::from_bytes(tp[25], hum)),
        })
    }
}
