/// BME280 register map (Bosch Sensortec BME280 datasheet BST-BME280-DS002, rev 1.6).
///
/// The BMP280 shares this map below 0xF2; it has no humidity block, no `CtrlHum`
/// and no `HumMsb`/`HumLsb` data registers.
///
/// Key groups:
/// - **Measurement results** - 0xF7–0xFE (8 bytes): pressure (20-bit), temperature (20-bit),
///   humidity (16-bit)
/// - **Control registers** - 0xF2 (humidity oversampling), 0xF4 (measurement config),
///   0xF5 (IIR + standby)
/// - **Status** - 0xF3 (measuring / im_update bits)
/// - **Reset & ID** - 0xE0 (soft reset), 0xD0 (chip ID)
/// - **Calibration** - 0x88–0xA1 (26 bytes) and 0xE1–0xE7 (7 bytes), read-only, factory trimmed
///
/// Usage example:
/// ```rust
/// use rpi_bme280::bme280::registers::Bme280Register;
/// let write = [Bme280Register::CtrlMeas as u8, 0x27];
/// assert_eq!(write[0], 0xF4);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Bme280Register {
    HumLsb = 0xFE,
    HumMsb = 0xFD,
    TempXlsb = 0xFC,
    TempLsb = 0xFB,
    TempMsb = 0xFA,
    PressXlsb = 0xF9,
    PressLsb = 0xF8,
    PressMsb = 0xF7,
    Config = 0xF5,
    CtrlMeas = 0xF4,
    // bit 3 - measuring, bit 0 - NVM data being copied
    Status = 0xF3,
    // Only takes effect after a following write to CtrlMeas
    CtrlHum = 0xF2,
    // dig_H2..dig_H6, 7 bytes
    CalibHumStart = 0xE1,
    // Write 0xB6 for a full power-on reset
    Reset = 0xE0,
    Id = 0xD0,
    // dig_T1..dig_P9, reserved byte, dig_H1
    CalibStart = 0x88,
}

impl Bme280Register {
    pub const fn addr(self) -> u8 {
        self as u8
    }
}

pub const BME280_RESET_REG_VALUE: u8 = 0xB6;
pub const BME280_CHIP_ID: u8 = 0x60;
pub const BMP280_CHIP_ID: u8 = 0x58;

/// Slave address with SDO tied to GND.
pub const BME280_I2C_ADDR_PRIMARY: u8 = 0x76;
/// Slave address with SDO tied to VDDIO.
pub const BME280_I2C_ADDR_SECONDARY: u8 = 0x77;

/// Length of the 0x88–0xA1 calibration burst.
pub const CALIB_TP_LEN: usize = 26;
/// Length of the 0xE1–0xE7 humidity calibration burst.
pub const CALIB_HUM_LEN: usize = 7;

/// `Status` bit set while a conversion is running.
pub const STATUS_MEASURING: u8 = 0x08;
/// `Status` bit set while NVM calibration data is copied to image registers.
pub const STATUS_IM_UPDATE: u8 = 0x01;
