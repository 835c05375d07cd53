//! Raw ADC decoding and the datasheet floating-point compensation formulas
//! (BME280 datasheet section 4.2.3 and appendix 8.1).
//!
//! Every function here is pure: the `t_fine` carry is returned from
//! [`compensate_temperature`] as a [`TFine`] and passed explicitly to the
//! pressure and humidity formulas.

use crate::bme280::calibration::{HumidityCalibration, PressureCalibration, TemperatureCalibration};

/// Uncompensated 20-bit temperature or pressure reading.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawSample(u32);

impl RawSample {
    /// Value reported for a skipped channel or before the first conversion.
    pub const SKIPPED: RawSample = RawSample(0x80000);

    pub const fn new(value: u32) -> Self {
        Self(value & 0xF_FFFF)
    }

    /// Assembles `msb`, `lsb` and `xlsb` register values; the low nibble of
    /// `xlsb` is padding.
    pub const fn from_bytes(bytes: [u8; 3]) -> Self {
        Self(((bytes[0] as u32) << 12) | ((bytes[1] as u32) << 4) | ((bytes[2] as u32) >> 4))
    }

    pub const fn value(self) -> u32 {
        self.0
    }

    pub fn is_skipped(self) -> bool {
        self == Self::SKIPPED
    }
}

/// Uncompensated 16-bit humidity reading.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawHumidity(u16);

impl RawHumidity {
    pub const SKIPPED: RawHumidity = RawHumidity(0x8000);

    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    pub const fn from_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_be_bytes(bytes))
    }

    pub const fn value(self) -> u16 {
        self.0
    }

    pub fn is_skipped(self) -> bool {
        self == Self::SKIPPED
    }
}

/// Fine temperature carried from temperature compensation into the pressure
/// and humidity formulas. Only [`compensate_temperature`] creates one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TFine(i32);

impl TFine {
    pub const fn value(self) -> i32 {
        self.0
    }
}

/// Compensates a raw temperature reading.
///
/// Returns the temperature in °C and the `t_fine` carry. The carry is the
/// double-precision intermediate truncated toward zero, as a narrowing cast
/// would do.
pub fn compensate_temperature(raw: RawSample, calib: &TemperatureCalibration) -> (f64, TFine) {
    let adc_t = f64::from(raw.value());
    let dig_t1 = f64::from(calib.dig_t1);
    let dig_t2 = f64::from(calib.dig_t2);
    let dig_t3 = f64::from(calib.dig_t3);

    let var1 = (adc_t / 16384.0 - dig_t1 / 1024.0) * dig_t2;
    let delta = adc_t / 131072.0 - dig_t1 / 8192.0;
    let var2 = delta * delta * dig_t3;

    let fine = var1 + var2;
    (fine / 5120.0, TFine(fine as i32))
}

/// Compensates a raw pressure reading. Returns pressure in Pa.
///
/// A calibration whose `dig_P1` term cancels out yields 0.0 instead of dividing
/// by zero.
pub fn compensate_pressure(raw: RawSample, t_fine: TFine, calib: &PressureCalibration) -> f64 {
    let adc_p = f64::from(raw.value());

    let mut var1 = f64::from(t_fine.value()) / 2.0 - 64000.0;
    let mut var2 = var1 * var1 * f64::from(calib.dig_p6) / 32768.0;
    var2 += var1 * f64::from(calib.dig_p5) * 2.0;
    var2 = var2 / 4.0 + f64::from(calib.dig_p4) * 65536.0;
    var1 = (f64::from(calib.dig_p3) * var1 * var1 / 524288.0 + f64::from(calib.dig_p2) * var1)
        / 524288.0;
    var1 = (1.0 + var1 / 32768.0) * f64::from(calib.dig_p1);

    if var1 == 0.0 {
        return 0.0;
    }

    let mut p = 1048576.0 - adc_p;
    p = (p - var2 / 4096.0) * 6250.0 / var1;
    var1 = f64::from(calib.dig_p9) * p * p / 2147483648.0;
    var2 = p * f64::from(calib.dig_p8) / 32768.0;
    p + (var1 + var2 + f64::from(calib.dig_p7)) / 16.0
}

/// Compensates a raw humidity reading. Returns relative humidity in %, clamped
/// to 0..=100.
pub fn compensate_humidity(raw: RawHumidity, t_fine: TFine, calib: &HumidityCalibration) -> f64 {
    let adc_h = f64::from(raw.value());

    let var1 = f64::from(t_fine.value()) - 76800.0;
    let var2 = f64::from(calib.dig_h4) * 64.0 + f64::from(calib.dig_h5) / 16384.0 * var1;
    let var3 = adc_h - var2;
    let var4 = f64::from(calib.dig_h2) / 65536.0;
    let var5 = 1.0 + f64::from(calib.dig_h3) / 67108864.0 * var1;
    let var6 = 1.0 + f64::from(calib.dig_h6) / 67108864.0 * var1 * var5;
    let var6 = var3 * var4 * (var5 * var6);

    let humidity = var6 * (1.0 - f64::from(calib.dig_h1) * var6 / 524288.0);
    humidity.clamp(0.0, 100.0)
}
