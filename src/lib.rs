//! User-space driver for Bosch BME280/BMP280 sensors on Linux I2C buses.
//!
//! [`Bme280Session`] owns the bus handle, initializes the chip, loads its
//! calibration and turns raw ADC samples into compensated measurements.
//! [`monitor::run`] polls a session on a fixed interval and forwards each
//! reading to a [`monitor::sink::MeasurementSink`].
//!
//! ```no_run
//! use rpi_bme280::bme280::config::Bme280Config;
//! use rpi_bme280::{Bme280Error, Bme280Session, LinuxI2cBus};
//!
//! fn main() -> Result<(), Bme280Error> {
//!     let mut session: Bme280Session<LinuxI2cBus> = Bme280Session::new(Bme280Config::default());
//!     session.open("/dev/i2c-1", 0x76)?;
//!     println!("{}", session.read_measurement()?);
//!     session.close();
//!     Ok(())
//! }
//! ```

pub mod bme280;
pub mod bus;
pub mod monitor;

pub use bme280::{Bme280Error, Bme280Session, Chip, Measurement, SessionState};
pub use bus::{BusError, BusTransport, LinuxI2cBus};
