use std::process;

use embassy_executor::Spawner;
use embassy_time::Timer;
use log::{error, info};
use rpi_bme280::Bme280Session;
use rpi_bme280::LinuxI2cBus;
use rpi_bme280::monitor::config::USAGE;
use rpi_bme280::monitor::sink::MeasurementSink;
use rpi_bme280::monitor::{self, ConfigError, LogSink, MonitorConfig, SinkKind, StdoutSink};

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match MonitorConfig::from_args(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(ConfigError::HelpRequested) => {
            println!("{USAGE}");
            process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {e}\n\n{USAGE}");
            process::exit(2);
        }
    };

    if let Err(e) = spawner.spawn(read_temp_press_hum(config)) {
        error!("failed to start monitor task: {:?}", e);
        process::exit(1);
    }
}

#[embassy_executor::task]
async fn read_temp_press_hum(config: MonitorConfig) {
    info!("'read_temp_press_hum' has been started");
    let code = match config.sink {
        SinkKind::Stdout => monitor_with(&config, &mut StdoutSink::new()).await,
        SinkKind::Log => monitor_with(&config, &mut LogSink).await,
    };
    process::exit(code);
}

/// Polls until the requested count is reached or the sensor cannot be opened.
/// A loop that ends on an error closes the session and reopens it after one
/// interval, which also re-reads the calibration.
async fn monitor_with<S: MeasurementSink>(config: &MonitorConfig, sink: &mut S) -> i32 {
    let mut session: Bme280Session<LinuxI2cBus> = Bme280Session::new(config.sensor);
    let mut poll = config.poll_config();

    loop {
        if let Err(e) = session.open(&config.device, config.address) {
            error!(
                "failed to open sensor at {} 0x{:02x}: {}",
                config.device.display(),
                config.address,
                e
            );
            return 1;
        }

        match monitor::run(&mut session, sink, &poll).await {
            Ok(stats) => {
                info!(
                    "finished after {} polls ({} delivered, {} read errors, {} sink errors)",
                    stats.polls, stats.delivered, stats.read_errors, stats.sink_errors
                );
                session.close();
                return 0;
            }
            Err(e) => {
                error!("{}", e);
                session.close();

                if let Some(max) = poll.max_polls {
                    let left = max.saturating_sub(e.stats.polls);
                    if left == 0 {
                        return 1;
                    }
                    poll.max_polls = Some(left);
                }

                info!("reopening in {} s", poll.interval.as_secs());
                Timer::after(poll.interval).await;
            }
        }
    }
}
