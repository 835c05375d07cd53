use embassy_time::Duration;

use crate::bme280::registers::{BME280_RESET_REG_VALUE, Bme280Register};

/// Oversampling setting for one measurement channel.
///
/// The same 3-bit code is used by `osrs_t` (ctrl_meas 0xF4, bits 7:5), `osrs_p`
/// (ctrl_meas, bits 4:2) and `osrs_h` (ctrl_hum 0xF2, bits 2:0).
///
/// | Variant | Code | Temperature resolution | Pressure resolution | Typical use                 |
/// |---------|------|------------------------|---------------------|-----------------------------|
/// | Skipped | 000  | -                      | -                   | Channel disabled            |
/// | X1      | 001  | 16 bit, 0.0050 °C      | 16 bit, 2.62 Pa     | Weather (lowest power)      |
/// | X2      | 010  | 17 bit, 0.0025 °C      | 17 bit, 1.31 Pa     | Low-power handheld          |
/// | X4      | 011  | 18 bit, 0.0012 °C      | 18 bit, 0.66 Pa     | Standard / balanced         |
/// | X8      | 100  | 19 bit, 0.0006 °C      | 19 bit, 0.33 Pa     | High resolution             |
/// | X16     | 101  | 20 bit, 0.0003 °C      | 20 bit, 0.16 Pa     | Ultra-high (indoor nav)     |
///
/// Codes 110 and 111 are treated as ×16 by the chip and are never written here.
/// A skipped channel reads back as 0x80000 (0x8000 for humidity).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Oversampling {
    Skipped = 0b000,
    X1 = 0b001,
    X2 = 0b010,
    X4 = 0b011,
    X8 = 0b100,
    X16 = 0b101,
}

impl Oversampling {
    /// Number of samples averaged per conversion (0 for a skipped channel).
    pub const fn factor(self) -> u32 {
        match self {
            Oversampling::Skipped => 0,
            Oversampling::X1 => 1,
            Oversampling::X2 => 2,
            Oversampling::X4 => 4,
            Oversampling::X8 => 8,
            Oversampling::X16 => 16,
        }
    }

    pub const fn is_enabled(self) -> bool {
        !matches!(self, Oversampling::Skipped)
    }
}

/// Power mode (mode[1:0] in ctrl_meas 0xF4, bits 1:0).
///
/// | Variant | Value | Behavior                                                                  |
/// |---------|-------|---------------------------------------------------------------------------|
/// | Sleep   | 00    | No measurements; lowest power; registers readable                         |
/// | Forced  | 01    | One measurement cycle, then back to sleep; host must re-trigger each read |
/// | Normal  | 11    | Continuous: measure → standby (t_sb) → measure                            |
///
/// Forced mode suits low sampling rates such as a weather station polled every few
/// seconds. Normal mode is the one to pair with the IIR filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PowerMode {
    Sleep = 0b00,
    Forced = 0b01,
    Normal = 0b11,
}

/// IIR filter coefficient (filter[2:0] in config 0xF5, bits 4:2).
///
/// | Variant | filter | Samples to reach ≥75% of a step | Typical use case                  |
/// |---------|--------|---------------------------------|-----------------------------------|
/// | Off     | 000    | 1                               | Weather, humidity sensing         |
/// | X2      | 001    | 2                               | Moderate smoothing                |
/// | X4      | 010    | 5                               | -                                 |
/// | X8      | 011    | 11                              | -                                 |
/// | X16     | 100    | 22                              | Indoor navigation, gaming         |
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum IirFilter {
    Off = 0b000,
    X2 = 0b001,
    X4 = 0b010,
    X8 = 0b011,
    X16 = 0b100,
}

/// Standby duration in Normal mode (t_sb[2:0] in config 0xF5, bits 7:5).
///
/// The 10 ms and 20 ms codes are BME280 specific; the BMP280 maps the same codes
/// to 2000 ms and 4000 ms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum StandbyTime {
    Ms0_5 = 0b000,
    Ms62_5 = 0b001,
    Ms125 = 0b010,
    Ms250 = 0b011,
    Ms500 = 0b100,
    Ms1000 = 0b101,
    Ms10 = 0b110,
    Ms20 = 0b111,
}

/// Recommended modes of operation (BME280 datasheet section 3.5).
///
/// | Preset           | Mode   | Oversampling (T/P/H) | Filter | Standby |
/// |------------------|--------|----------------------|--------|---------|
/// | Weather          | Forced | ×1 / ×1 / ×1         | Off    | -       |
/// | Humidity         | Forced | ×1 / skip / ×1       | Off    | -       |
/// | IndoorNavigation | Normal | ×2 / ×16 / ×1        | ×16    | 0.5 ms  |
/// | Gaming           | Normal | ×1 / ×4 / skip       | ×16    | 0.5 ms  |
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bme280Preset {
    Weather,
    Humidity,
    IndoorNavigation,
    Gaming,
}

impl core::str::FromStr for Bme280Preset {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weather" => Ok(Bme280Preset::Weather),
            "humidity" => Ok(Bme280Preset::Humidity),
            "indoor" => Ok(Bme280Preset::IndoorNavigation),
            "gaming" => Ok(Bme280Preset::Gaming),
            _ => Err(()),
        }
    }
}

/// Measurement configuration applied when a session is opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bme280Config {
    pub temperature: Oversampling,
    pub pressure: Oversampling,
    pub humidity: Oversampling,
    pub mode: PowerMode,
    pub filter: IirFilter,
    pub standby: StandbyTime,
}

impl Default for Bme280Config {
    /// ×1 oversampling on every channel, Normal mode, no filter, 1 s standby.
    fn default() -> Self {
        Self {
            temperature: Oversampling::X1,
            pressure: Oversampling::X1,
            humidity: Oversampling::X1,
            mode: PowerMode::Normal,
            filter: IirFilter::Off,
            standby: StandbyTime::Ms1000,
        }
    }
}

impl Bme280Config {
    /// Default configuration with pressure and humidity conversions disabled.
    pub fn temperature_only() -> Self {
        Self::default()
            .with_pressure(Oversampling::Skipped)
            .with_humidity(Oversampling::Skipped)
    }

    /// Creates a configuration from one of the datasheet's recommended modes.
    pub fn default_with_preset(preset: Bme280Preset) -> Self {
        match preset {
            Bme280Preset::Weather => Self {
                temperature: Oversampling::X1,
                pressure: Oversampling::X1,
                humidity: Oversampling::X1,
                mode: PowerMode::Forced,
                filter: IirFilter::Off,
                standby: StandbyTime::Ms1000,
            },

            Bme280Preset::Humidity => Self {
                temperature: Oversampling::X1,
                pressure: Oversampling::Skipped,
                humidity: Oversampling::X1,
                mode: PowerMode::Forced,
                filter: IirFilter::Off,
                standby: StandbyTime::Ms1000,
            },

            Bme280Preset::IndoorNavigation => Self {
                temperature: Oversampling::X2,
                pressure: Oversampling::X16,
                humidity: Oversampling::X1,
                mode: PowerMode::Normal,
                filter: IirFilter::X16,
                standby: StandbyTime::Ms0_5,
            },

            Bme280Preset::Gaming => Self {
                temperature: Oversampling::X1,
                pressure: Oversampling::X4,
                humidity: Oversampling::Skipped,
                mode: PowerMode::Normal,
                filter: IirFilter::X16,
                standby: StandbyTime::Ms0_5,
            },
        }
    }

    pub fn with_temperature(mut self, oversampling: Oversampling) -> Self {
        self.temperature = oversampling;
        self
    }

    pub fn with_pressure(mut self, oversampling: Oversampling) -> Self {
        self.pressure = oversampling;
        self
    }

    pub fn with_humidity(mut self, oversampling: Oversampling) -> Self {
        self.humidity = oversampling;
        self
    }

    pub fn with_mode(mut self, mode: PowerMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_filter(mut self, filter: IirFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_standby(mut self, standby: StandbyTime) -> Self {
        self.standby = standby;
        self
    }

    /// True when only the temperature channel needs to be read back.
    pub fn is_temperature_only(&self) -> bool {
        !self.pressure.is_enabled() && !self.humidity.is_enabled()
    }

    /// ctrl_hum (0xF2): osrs_h in bits 2:0.
    pub fn ctrl_hum_value(&self) -> u8 {
        self.humidity as u8
    }

    /// ctrl_meas (0xF4): osrs_t in bits 7:5, osrs_p in bits 4:2, mode in bits 1:0.
    pub fn ctrl_meas_value(&self) -> u8 {
        ((self.temperature as u8) << 5) | ((self.pressure as u8) << 2) | self.mode as u8
    }

    /// config (0xF5): t_sb in bits 7:5, filter in bits 4:2, spi3w_en left cleared.
    pub fn config_value(&self) -> u8 {
        ((self.standby as u8) << 5) | ((self.filter as u8) << 2)
    }

    /// Register/value pairs written at session start.
    ///
    /// ctrl_hum only latches on the following ctrl_meas write, and config may be
    /// ignored in Normal mode, so ctrl_meas (which carries the mode) goes last.
    /// `with_humidity` is false for the BMP280, which has no ctrl_hum register.
    pub fn register_writes(&self, with_humidity: bool) -> Vec<[u8; 2]> {
        let mut writes = Vec::with_capacity(3);
        if with_humidity {
            writes.push([Bme280Register::CtrlHum.addr(), self.ctrl_hum_value()]);
        }
        writes.push([Bme280Register::Config.addr(), self.config_value()]);
        writes.push([Bme280Register::CtrlMeas.addr(), self.ctrl_meas_value()]);
        writes
    }

    /// Soft reset command (0xE0 ← 0xB6).
    pub const fn reset_command() -> [u8; 2] {
        [Bme280Register::Reset.addr(), BME280_RESET_REG_VALUE]
    }

    /// Worst-case conversion time (datasheet appendix B, t_measure,max).
    pub fn max_measurement_time(&self) -> Duration {
        let mut micros: u64 = 1250 + 2300 * u64::from(self.temperature.factor());
        if self.pressure.is_enabled() {
            micros += 2300 * u64::from(self.pressure.factor()) + 575;
        }
        if self.humidity.is_enabled() {
            micros += 2300 * u64::from(self.humidity.factor()) + 575;
        }
        Duration::from_micros(micros)
    }
}
