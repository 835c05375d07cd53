//! Monitor process configuration from the command line.

use std::path::PathBuf;

use embassy_time::Duration;

use crate::bme280::config::{Bme280Config, Bme280Preset, Oversampling};
use crate::bme280::registers::BME280_I2C_ADDR_PRIMARY;
use crate::monitor::PollConfig;
use crate::monitor::sink::Delivery;

pub const DEFAULT_DEVICE: &str = "/dev/i2c-1";
pub const DEFAULT_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_MAX_FAILURES: u32 = 3;
/// One day. Keeps `Duration::from_secs` well inside the tick range.
pub const MAX_INTERVAL_SECS: u64 = 86_400;

pub const USAGE: &str = "rpi-bme280 - poll a BME280/BMP280 over Linux I2C\n\n\
     Usage: rpi-bme280 [OPTIONS]\n\n\
     Options:\n\
     \x20 --device <PATH>        I2C adapter device (default: /dev/i2c-1)\n\
     \x20 --address <ADDR>       Sensor address, hex or decimal (default: 0x76)\n\
     \x20 --interval <SECS>      Seconds between polls, 1..=86400 (default: 5)\n\
     \x20 --count <N>            Stop after N polls (default: run forever)\n\
     \x20 --max-failures <N>     Consecutive read failures before reopening (default: 3)\n\
     \x20 --preset <NAME>        weather, humidity, indoor or gaming\n\
     \x20 --temperature-only     Skip pressure and humidity\n\
     \x20 --sink <stdout|log>    Measurement destination (default: stdout)\n\
     \x20 --qos <0|1>            Delivery guarantee (default: 1)\n\
     \x20 -h, --help             Show this help";

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("help requested")]
    HelpRequested,
    #[error("unknown argument '{0}'")]
    UnknownArgument(String),
    #[error("--{0} requires a value")]
    MissingValue(&'static str),
    #[error("invalid value '{value}' for --{flag}")]
    InvalidValue { flag: &'static str, value: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SinkKind {
    #[default]
    Stdout,
    Log,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MonitorConfig {
    pub device: PathBuf,
    pub address: u8,
    pub interval: Duration,
    /// `None` polls until a fatal error
    pub count: Option<u64>,
    pub max_failures: u32,
    pub sensor: Bme280Config,
    pub sink: SinkKind,
    pub delivery: Delivery,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from(DEFAULT_DEVICE),
            address: BME280_I2C_ADDR_PRIMARY,
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            count: None,
            max_failures: DEFAULT_MAX_FAILURES,
            sensor: Bme280Config::default(),
            sink: SinkKind::Stdout,
            delivery: Delivery::Acknowledged,
        }
    }
}

impl MonitorConfig {
    /// Parses arguments, program name excluded.
    ///
    /// `--temperature-only` applies on top of `--preset` regardless of order.
    pub fn from_args<I, S>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = Self::default();
        let mut preset = None;
        let mut temperature_only = false;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_ref() {
                "--device" => config.device = PathBuf::from(value(&mut args, "device")?),
                "--address" => {
                    let raw = value(&mut args, "address")?;
                    config.address = parse_address(&raw).ok_or(ConfigError::InvalidValue {
                        flag: "address",
                        value: raw,
                    })?;
                }
                "--interval" => {
                    let secs: u64 = parse_number(&mut args, "interval")?;
                    if !(1..=MAX_INTERVAL_SECS).contains(&secs) {
                        return Err(ConfigError::InvalidValue {
                            flag: "interval",
                            value: secs.to_string(),
                        });
                    }
                    config.interval = Duration::from_secs(secs);
                }
                "--count" => config.count = Some(parse_number(&mut args, "count")?),
                "--max-failures" => config.max_failures = parse_number(&mut args, "max-failures")?,
                "--preset" => {
                    let raw = value(&mut args, "preset")?;
                    let parsed = raw.parse::<Bme280Preset>();
                    preset = Some(parsed.map_err(|_| ConfigError::InvalidValue {
                        flag: "preset",
                        value: raw,
                    })?);
                }
                "--temperature-only" => temperature_only = true,
                "--sink" => {
                    let raw = value(&mut args, "sink")?;
                    config.sink = match raw.as_str() {
                        "stdout" => SinkKind::Stdout,
                        "log" => SinkKind::Log,
                        _ => return Err(ConfigError::InvalidValue { flag: "sink", value: raw }),
                    };
                }
                "--qos" => {
                    let raw = value(&mut args, "qos")?;
                    config.delivery = raw
                        .parse::<u8>()
                        .ok()
                        .and_then(Delivery::from_qos)
                        .ok_or(ConfigError::InvalidValue { flag: "qos", value: raw })?;
                }
                "-h" | "--help" => return Err(ConfigError::HelpRequested),
                other => return Err(ConfigError::UnknownArgument(other.to_string())),
            }
        }

        if let Some(preset) = preset {
            config.sensor = Bme280Config::default_with_preset(preset);
        }
        if temperature_only {
            config.sensor = config
                .sensor
                .with_pressure(Oversampling::Skipped)
                .with_humidity(Oversampling::Skipped);
        }
        Ok(config)
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: self.interval,
            delivery: self.delivery,
            max_polls: self.count,
            max_consecutive_failures: Some(self.max_failures),
        }
    }
}

fn value<I, S>(args: &mut I, flag: &'static str) -> Result<String, ConfigError>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    args.next()
        .map(|v| v.as_ref().to_string())
        .ok_or(ConfigError::MissingValue(flag))
}

fn parse_number<I, S, N>(args: &mut I, flag: &'static str) -> Result<N, ConfigError>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
    N: std::str::FromStr,
{
    let raw = value(args, flag)?;
    raw.parse().map_err(|_| ConfigError::InvalidValue { flag, value: raw })
}

/// `0x76`, `0X77` or `118`; 7-bit only.
fn parse_address(raw: &str) -> Option<u8> {
    let address = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16).ok()?,
        None => raw.parse().ok()?,
    };
    (address <= 0x7F).then_some(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bme280::config::PowerMode;

    #[test]
    fn defaults_match_reference_deployment() {
        let config = MonitorConfig::from_args(Vec::<String>::new()).unwrap();
        assert_eq!(config.device, PathBuf::from("/dev/i2c-1"));
        assert_eq!(config.address, 0x76);
        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(config.delivery, Delivery::Acknowledged);

        let poll = config.poll_config();
        assert_eq!(poll.max_polls, None);
        assert_eq!(poll.max_consecutive_failures, Some(3));
    }

    #[test]
    fn parses_all_flags() {
        let config = MonitorConfig::from_args([
            "--device", "/dev/i2c-0", "--address", "0x77", "--interval", "2", "--count", "10",
            "--max-failures", "5", "--sink", "log", "--qos", "0",
        ])
        .unwrap();
        assert_eq!(config.device, PathBuf::from("/dev/i2c-0"));
        assert_eq!(config.address, 0x77);
        assert_eq!(config.interval, Duration::from_secs(2));
        assert_eq!(config.count, Some(10));
        assert_eq!(config.max_failures, 5);
        assert_eq!(config.sink, SinkKind::Log);
        assert_eq!(config.delivery, Delivery::FireAndForget);
    }

    #[test]
    fn address_accepts_hex_and_decimal() {
        assert_eq!(parse_address("0x76"), Some(0x76));
        assert_eq!(parse_address("0X77"), Some(0x77));
        assert_eq!(parse_address("118"), Some(0x76));
        assert_eq!(parse_address("0x80"), None);
        assert_eq!(parse_address("bogus"), None);
    }

    #[test]
    fn temperature_only_overrides_preset() {
        let config =
            MonitorConfig::from_args(["--temperature-only", "--preset", "gaming"]).unwrap();
        assert!(config.sensor.is_temperature_only());
        assert_eq!(config.sensor.mode, PowerMode::Normal);
        assert_eq!(config.sensor.temperature, Oversampling::X1);
    }

    #[test]
    fn weather_preset_uses_forced_mode() {
        let config = MonitorConfig::from_args(["--preset", "weather"]).unwrap();
        assert_eq!(config.sensor.mode, PowerMode::Forced);
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(
            MonitorConfig::from_args(["--interval"]),
            Err(ConfigError::MissingValue("interval"))
        );
        assert_eq!(
            MonitorConfig::from_args(["--interval", "0"]),
            Err(ConfigError::InvalidValue {
                flag: "interval",
                value: "0".into()
            })
        );
        for too_long in ["86401", "18446744073710"] {
            assert_eq!(
                MonitorConfig::from_args(["--interval", too_long]),
                Err(ConfigError::InvalidValue {
                    flag: "interval",
                    value: too_long.into()
                })
            );
        }
        assert_eq!(
            MonitorConfig::from_args(["--interval", "86400"]).map(|c| c.interval),
            Ok(Duration::from_secs(86_400))
        );
        assert_eq!(
            MonitorConfig::from_args(["--qos", "2"]),
            Err(ConfigError::InvalidValue {
                flag: "qos",
                value: "2".into()
            })
        );
        assert_eq!(
            MonitorConfig::from_args(["--verbose"]),
            Err(ConfigError::UnknownArgument("--verbose".into()))
        );
        assert_eq!(
            MonitorConfig::from_args(["-h"]),
            Err(ConfigError::HelpRequested)
        );
    }
}
