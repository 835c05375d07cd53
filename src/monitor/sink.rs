//! Measurement consumers for the polling loop.

use std::io::{self, Write};

use log::{debug, info};

use crate::bme280::Measurement;

/// Delivery guarantee requested from a sink, in MQTT QoS terms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Delivery {
    /// QoS 0: the sink may drop the measurement silently
    FireAndForget,
    /// QoS 1: the sink reports any failure to hand the measurement on
    #[default]
    Acknowledged,
}

impl Delivery {
    pub fn from_qos(qos: u8) -> Option<Self> {
        match qos {
            0 => Some(Delivery::FireAndForget),
            1 => Some(Delivery::Acknowledged),
            _ => None,
        }
    }

    pub fn qos(self) -> u8 {
        match self {
            Delivery::FireAndForget => 0,
            Delivery::Acknowledged => 1,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("sink write failed: {0}")]
    Io(#[from] io::Error),
}

/// Destination for compensated measurements.
///
/// `deliver` must not block waiting on a remote peer; the poll interval is
/// driven by the caller.
pub trait MeasurementSink {
    fn deliver(&mut self, measurement: &Measurement, delivery: Delivery) -> Result<(), SinkError>;
}

impl<S: MeasurementSink + ?Sized> MeasurementSink for &mut S {
    fn deliver(&mut self, measurement: &Measurement, delivery: Delivery) -> Result<(), SinkError> {
        (**self).deliver(measurement, delivery)
    }
}

/// Writes one payload line per measurement, to stdout by default.
pub struct StdoutSink<W: Write = io::Stdout> {
    out: W,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self { out: io::stdout() }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> StdoutSink<W> {
    pub fn with_writer(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, measurement: &Measurement) -> io::Result<()> {
        writeln!(self.out, "{}", measurement)
    }
}

impl<W: Write> MeasurementSink for StdoutSink<W> {
    fn deliver(&mut self, measurement: &Measurement, delivery: Delivery) -> Result<(), SinkError> {
        match delivery {
            Delivery::FireAndForget => {
                if let Err(e) = self.write_line(measurement) {
                    debug!("dropped measurement: {}", e);
                }
                Ok(())
            }
            Delivery::Acknowledged => {
                self.write_line(measurement)?;
                self.out.flush()?;
                Ok(())
            }
        }
    }
}

/// Emits each measurement as an `info` log record.
#[derive(Debug, Default)]
pub struct LogSink;

impl MeasurementSink for LogSink {
    fn deliver(&mut self, measurement: &Measurement, _delivery: Delivery) -> Result<(), SinkError> {
        info!("{}", measurement);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    const SAMPLE: Measurement = Measurement {
        temperature_c: 21.5,
        pressure_hpa: Some(1013.25),
        humidity_pct: None,
    };

    #[test]
    fn writes_payload_line() {
        let mut sink = StdoutSink::with_writer(Vec::new());
        sink.deliver(&SAMPLE, Delivery::Acknowledged).unwrap();
        sink.deliver(&SAMPLE, Delivery::FireAndForget).unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            out,
            "Temp: 21.50°C Pressure: 1013.25 hPa\nTemp: 21.50°C Pressure: 1013.25 hPa\n"
        );
    }

    #[test]
    fn acknowledged_reports_write_failure() {
        let mut sink = StdoutSink::with_writer(BrokenPipe);
        assert!(matches!(
            sink.deliver(&SAMPLE, Delivery::Acknowledged),
            Err(SinkError::Io(_))
        ));
    }

    #[test]
    fn fire_and_forget_drops_silently() {
        let mut sink = StdoutSink::with_writer(BrokenPipe);
        assert!(sink.deliver(&SAMPLE, Delivery::FireAndForget).is_ok());
    }

    #[test]
    fn qos_mapping() {
        assert_eq!(Delivery::from_qos(0), Some(Delivery::FireAndForget));
        assert_eq!(Delivery::from_qos(1), Some(Delivery::Acknowledged));
        assert_eq!(Delivery::from_qos(2), None);
        assert_eq!(Delivery::Acknowledged.qos(), 1);
    }
}
