//! Periodic polling of a [`Bme280Session`] into a [`MeasurementSink`].

pub mod config;
pub mod sink;

use embassy_time::{Duration, Ticker};
use log::{error, info, warn};

use crate::bme280::{Bme280Error, Bme280Session};
use crate::bus::BusTransport;
use crate::monitor::sink::{Delivery, MeasurementSink};

pub use config::{ConfigError, MonitorConfig, SinkKind};
pub use sink::{LogSink, SinkError, StdoutSink};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub delivery: Delivery,
    /// Stop after this many poll attempts, successful or not
    pub max_polls: Option<u64>,
    /// Stop once this many recoverable read errors happen in a row
    pub max_consecutive_failures: Option<u32>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(config::DEFAULT_INTERVAL_SECS),
            delivery: Delivery::Acknowledged,
            max_polls: None,
            max_consecutive_failures: Some(config::DEFAULT_MAX_FAILURES),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollStats {
    pub polls: u64,
    pub delivered: u64,
    pub read_errors: u64,
    pub sink_errors: u64,
}

/// Polling ended early on a sensor error.
#[derive(Debug, thiserror::Error)]
#[error("polling stopped: {source}")]
pub struct PollError {
    pub stats: PollStats,
    #[source]
    pub source: Bme280Error,
}

/// Reads one measurement per tick and hands it to `sink`.
///
/// The first read happens immediately. Recoverable read errors are logged and
/// retried on the next tick; sink errors are logged and never stop the loop.
///
/// # Errors
/// Returns [`PollError`] on a fatal sensor error, or when the last
/// consecutive recoverable error exceeds `max_consecutive_failures`.
pub async fn run<T, S>(
    session: &mut Bme280Session<T>,
    sink: &mut S,
    config: &PollConfig,
) -> Result<PollStats, PollError>
where
    T: BusTransport,
    S: MeasurementSink + ?Sized,
{
    let mut ticker = Ticker::every(config.interval);
    let mut stats = PollStats::default();
    let mut streak = 0u32;

    info!(
        "polling every {} ms (qos {})",
        config.interval.as_millis(),
        config.delivery.qos()
    );

    loop {
        stats.polls += 1;

        match session.read_measurement() {
            Ok(measurement) => {
                streak = 0;
                match sink.deliver(&measurement, config.delivery) {
                    Ok(()) => stats.delivered += 1,
                    Err(e) => {
                        stats.sink_errors += 1;
                        warn!("delivery failed: {}", e);
                    }
                }
            }
            Err(e) if e.is_recoverable() => {
                stats.read_errors += 1;
                streak += 1;
                if config
                    .max_consecutive_failures
                    .is_some_and(|max| streak > max)
                {
                    error!("{} consecutive read failures, last: {}", streak, e);
                    return Err(PollError { stats, source: e });
                }
                warn!("read failed ({} in a row): {}", streak, e);
            }
            Err(e) => {
                error!("sensor error: {}", e);
                return Err(PollError { stats, source: e });
            }
        }

        if config.max_polls.is_some_and(|max| stats.polls >= max) {
            return Ok(stats);
        }

        ticker.next().await;
    }
}
