pub mod calibration;
pub mod compensation;
pub mod config;
pub mod registers;

use std::fmt;
use std::path::Path;
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::bme280::{
    calibration::Calibration,
    compensation::{
        RawHumidity, RawSample, compensate_humidity, compensate_pressure, compensate_temperature,
    },
    config::{Bme280Config, PowerMode},
    registers::{
        BME280_CHIP_ID, BMP280_CHIP_ID, Bme280Register, STATUS_IM_UPDATE, STATUS_MEASURING,
    },
};
use crate::bus::{BusError, BusTransport, LinuxI2cBus};

/// Datasheet start-up time before the status register is readable after reset.
const RESET_STARTUP: Duration = Duration::from_millis(2);
/// Status polls before giving up on the NVM copy or a conversion.
const STATUS_POLLS: u32 = 10;
const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Errors reported by a [`Bme280Session`].
#[derive(Debug, thiserror::Error)]
pub enum Bme280Error {
    /// The session is not open (never opened, failed to open, or closed)
    #[error("sensor session not ready")]
    NotReady,
    /// `open` was called on a session that is already Ready
    #[error("sensor session already open")]
    AlreadyOpen,
    /// Bus open, address select, write or read failed
    #[error(transparent)]
    Bus(#[from] BusError),
    /// Chip ID is neither 0x60 (BME280) nor 0x58 (BMP280)
    #[error("unsupported chip id 0x{0:02x}")]
    UnsupportedChip(u8),
    /// Calibration block read back blank
    #[error("calibration block is blank")]
    InvalidCalibration,
    /// Temperature register still holds the reset value (no conversion yet)
    #[error("no measurement available yet")]
    NoData,
}

impl Bme280Error {
    /// True for errors after which the session stays Ready and the next poll may
    /// simply retry.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Bme280Error::Bus(e) => !e.is_fatal(),
            Bme280Error::NoData => true,
            _ => false,
        }
    }
}

/// Sensor variant identified by the chip ID register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Chip {
    Bme280,
    Bmp280,
}

impl Chip {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            BME280_CHIP_ID => Some(Chip::Bme280),
            BMP280_CHIP_ID => Some(Chip::Bmp280),
            _ => None,
        }
    }

    pub fn has_humidity(self) -> bool {
        matches!(self, Chip::Bme280)
    }
}

/// Session lifecycle. `Opening`, `Configuring` and `CalibrationLoaded` are only
/// observable while `open` runs; a failed `open` falls back to `Closed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Opening,
    Configuring,
    CalibrationLoaded,
    Ready,
}

/// One compensated reading.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Measurement {
    /// Temperature in °C.
    pub temperature_c: f64,
    /// Pressure in hPa, `None` when the channel is skipped.
    pub pressure_hpa: Option<f64>,
    /// Relative humidity in %, `None` when skipped or on a BMP280.
    pub humidity_pct: Option<f64>,
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Temp: {:.2}°C", self.temperature_c)?;
        if let Some(p) = self.pressure_hpa {
            write!(f, " Pressure: {:.2} hPa", p)?;
        }
        if let Some(h) = self.humidity_pct {
            write!(f, " Humidity: {:.2}%", h)?;
        }
        Ok(())
    }
}

struct Ready<T> {
    bus: T,
    chip: Chip,
    calib: Calibration,
}

/// BME280 driver session (blocking I²C).
///
/// Owns the bus handle and the calibration read at open time. Both live in the
/// Ready state only, so no compensation can run without coefficients. Dropping
/// or closing the session releases the bus.
pub struct Bme280Session<T: BusTransport> {
    config: Bme280Config,
    state: SessionState,
    ready: Option<Ready<T>>,
}

impl<T: BusTransport> Bme280Session<T> {
    pub fn new(config: Bme280Config) -> Self {
        Self {
            config,
            state: SessionState::Closed,
            ready: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    pub fn config(&self) -> &Bme280Config {
        &self.config
    }

    pub fn chip(&self) -> Option<Chip> {
        self.ready.as_ref().map(|r| r.chip)
    }

    pub fn calibration(&self) -> Option<&Calibration> {
        self.ready.as_ref().map(|r| &r.calib)
    }

    /// Initializes the sensor over an already opened transport.
    ///
    /// Sequence:
    /// 1. Select `address`
    /// 2. Soft reset (0xE0 ← 0xB6), wait 10 ms
    /// 3. Verify chip ID (0xD0 is 0x60 or 0x58)
    /// 4. Write ctrl_hum, config and ctrl_meas
    /// 5. Read calibration coefficients
    ///
    /// On any failure the transport is dropped and the session is Closed.
    ///
    /// # Errors
    /// Returns `Bme280Error` on any bus failure, chip ID mismatch or blank
    /// calibration; `AlreadyOpen` if the session is Ready.
    pub fn open_with(&mut self, mut bus: T, address: u8) -> Result<(), Bme280Error> {
        if self.ready.is_some() {
            return Err(Bme280Error::AlreadyOpen);
        }

        self.state = SessionState::Opening;
        match self.initialize(&mut bus, address) {
            Ok((chip, calib)) => {
                self.ready = Some(Ready { bus, chip, calib });
                self.state = SessionState::Ready;
                info!("{:?} at 0x{:02x} ready", chip, address);
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Closed;
                Err(e)
            }
        }
    }

    fn initialize(&mut self, bus: &mut T, address: u8) -> Result<(Chip, Calibration), Bme280Error> {
        bus.select_slave(address)?;

        bus.write_bytes(&Bme280Config::reset_command())?;
        thread::sleep(RESET_STARTUP);
        if !wait_status_clear(bus, STATUS_IM_UPDATE)? {
            warn!("NVM copy still running after reset");
        }

        let mut chip_id = [0u8; 1];
        bus.read_register(Bme280Register::Id.addr(), &mut chip_id)?;
        let chip = Chip::from_id(chip_id[0]).ok_or(Bme280Error::UnsupportedChip(chip_id[0]))?;
        debug!("chip id 0x{:02x} ({:?})", chip_id[0], chip);

        self.state = SessionState::Configuring;
        for write in self.config.register_writes(chip.has_humidity()) {
            debug!("reg 0x{:02x} <- 0x{:02x}", write[0], write[1]);
            bus.write_bytes(&write)?;
        }

        let calib = Calibration::read(bus, chip)?;
        self.state = SessionState::CalibrationLoaded;

        // The first normal-mode conversion starts with the ctrl_meas write
        if self.config.mode == PowerMode::Normal {
            thread::sleep(measurement_wait(&self.config));
        }
        Ok((chip, calib))
    }

    /// Reads and compensates one measurement.
    ///
    /// Temperature-only configurations read the 3 temperature bytes at 0xFA;
    /// otherwise one burst from 0xF7 covers every channel of the same
    /// conversion. A failed read leaves the session Ready.
    ///
    /// # Errors
    /// - `NotReady` if the session is not open
    /// - `Bus` if a transfer fails (recoverable)
    /// - `NoData` if the chip has not completed a conversion yet (recoverable)
    pub fn read_measurement(&mut self) -> Result<Measurement, Bme280Error> {
        let config = self.config;
        let ready = self.ready.as_mut().ok_or(Bme280Error::NotReady)?;

        if config.mode == PowerMode::Forced {
            trigger_forced(&mut ready.bus, &config)?;
        }

        let with_humidity = ready.chip.has_humidity() && config.humidity.is_enabled();
        let (raw_t, raw_p, raw_h) = if config.is_temperature_only() {
            let mut raw = [0u8; 3];
            ready.bus.read_register(Bme280Register::TempMsb.addr(), &mut raw)?;
            (RawSample::from_bytes(raw), None, None)
        } else {
            let mut raw = [0u8; 8];
            let len = if ready.chip.has_humidity() { 8 } else { 6 };
            ready
                .bus
                .read_register(Bme280Register::PressMsb.addr(), &mut raw[..len])?;
            (
                RawSample::from_bytes([raw[3], raw[4], raw[5]]),
                config
                    .pressure
                    .is_enabled()
                    .then(|| RawSample::from_bytes([raw[0], raw[1], raw[2]])),
                with_humidity.then(|| RawHumidity::from_bytes([raw[6], raw[7]])),
            )
        };
        debug!("raw T={:?} P={:?} H={:?}", raw_t, raw_p, raw_h);

        if raw_t.is_skipped() {
            return Err(Bme280Error::NoData);
        }

        let (temperature_c, t_fine) = compensate_temperature(raw_t, &ready.calib.temperature);
        let pressure_hpa = raw_p
            .filter(|raw| !raw.is_skipped())
            .map(|raw| compensate_pressure(raw, t_fine, &ready.calib.pressure) / 100.0);
        let humidity_pct = match (raw_h, ready.calib.humidity.as_ref()) {
            (Some(raw), Some(calib)) if !raw.is_skipped() => {
                Some(compensate_humidity(raw, t_fine, calib))
            }
            _ => None,
        };
        if raw_p.is_some() != pressure_hpa.is_some() || raw_h.is_some() != humidity_pct.is_some() {
            debug!("enabled channel still holds its reset value");
        }

        Ok(Measurement {
            temperature_c,
            pressure_hpa,
            humidity_pct,
        })
    }

    /// Releases the bus. Later operations fail with `NotReady`.
    pub fn close(&mut self) {
        if let Some(ready) = self.ready.take() {
            info!("{:?} session closed", ready.chip);
        }
        self.state = SessionState::Closed;
    }
}

impl Bme280Session<LinuxI2cBus> {
    /// Opens `device_path` and initializes the sensor at `address`.
    ///
    /// # Errors
    /// `Bus(Open)` and `Bus(Address)` are fatal for this session; see
    /// [`Bme280Session::open_with`] for the rest.
    pub fn open(&mut self, device_path: impl AsRef<Path>, address: u8) -> Result<(), Bme280Error> {
        if self.ready.is_some() {
            return Err(Bme280Error::AlreadyOpen);
        }
        let bus = LinuxI2cBus::open(device_path, address)?;
        debug!("using {} for slave 0x{:02x}", bus.path().display(), bus.address());
        self.open_with(bus, address)
    }
}

/// Starts a forced-mode conversion and waits for it to finish.
fn trigger_forced<T: BusTransport>(bus: &mut T, config: &Bme280Config) -> Result<(), Bme280Error> {
    bus.write_register(Bme280Register::CtrlMeas.addr(), config.ctrl_meas_value())?;
    thread::sleep(measurement_wait(config));

    if !wait_status_clear(bus, STATUS_MEASURING)? {
        warn!("conversion still running after {:?}", config.max_measurement_time());
    }
    Ok(())
}

fn measurement_wait(config: &Bme280Config) -> Duration {
    Duration::from_micros(config.max_measurement_time().as_micros())
}

/// Polls the status register until every bit in `mask` is clear.
/// Returns `false` if the bits are still set after the last poll.
fn wait_status_clear<T: BusTransport>(bus: &mut T, mask: u8) -> Result<bool, Bme280Error> {
    let mut status = [0u8; 1];
    for _ in 0..STATUS_POLLS {
        bus.read_register(Bme280Register::Status.addr(), &mut status)?;
        if status[0] & mask == 0 {
            return Ok(true);
        }
        thread::sleep(STATUS_POLL_INTERVAL);
    }
    Ok(false)
}
