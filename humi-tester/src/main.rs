use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use clap::{Parser, ValueEnum};
use embedded_hal::{
    delay::DelayNs,
    i2c::{I2c, SevenBitAddress},
};
use linux_embedded_hal::Delay;
use temphum11::{
    AcquisitionMode, DEVICE_ID, Error, MANUFACTURER_ID, TempHum11, TemperatureUnit,
};

mod bus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Unit {
    Celsius,
    Kelvin,
    Fahrenheit,
}

impl From<Unit> for TemperatureUnit {
    fn from(unit: Unit) -> Self {
        match unit {
            Unit::Celsius => TemperatureUnit::Celsius,
            Unit::Kelvin => TemperatureUnit::Kelvin,
            Unit::Fahrenheit => TemperatureUnit::Fahrenheit,
        }
    }
}

impl Unit {
    fn symbol(self) -> &'static str {
        match self {
            Unit::Celsius => "°C",
            Unit::Kelvin => "K",
            Unit::Fahrenheit => "°F",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Separate temperature and humidity reads
    Independent,
    /// One read for both, temperature first
    Combined,
}

impl From<Mode> for AcquisitionMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Independent => AcquisitionMode::Independent,
            Mode::Combined => AcquisitionMode::Combined,
        }
    }
}

/// Read temperature and humidity from a Temp&Hum 11 (HDC1080) sensor
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// I2C bus number (e.g., 1 for /dev/i2c-1)
    #[arg(short, long, default_value_t = 1)]
    bus: u8,
    /// Temperature unit
    #[arg(short, long, value_enum, default_value_t = Unit::Celsius)]
    unit: Unit,
    /// Acquisition mode
    #[arg(short, long, value_enum, default_value_t = Mode::Independent)]
    mode: Mode,
    /// Enable the on-chip heater
    #[arg(long, default_value_t = false)]
    heater: bool,
    /// Time between samples in milliseconds
    #[arg(short, long, default_value_t = 1000)]
    interval: u64,
    /// Stop after this many samples
    #[arg(short = 'n', long)]
    count: Option<usize>,
}

fn main() {
    // Initialize the logger
    env_logger::init();
    // Parse command line arguments
    let args = Args::parse();
    log::info!("Arguments: {args:#?}");
    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            log::info!("Received Ctrl+C, stopping...");
            running.store(false, Ordering::Relaxed);
        })
        .expect("Error setting Ctrl-C handler");
    }
    let i2c = match bus::open(args.bus) {
        Ok(i2c) => i2c,
        Err(e) => {
            log::error!("[TH11] Could not open bus: {e}");
            std::process::exit(1);
        }
    };
    let mut dev = TempHum11::new(i2c, Delay);
    if let Err(e) = setup(&mut dev, &args) {
        log::error!("[TH11] Sensor 0x{:02x}: setup failed: {e:?}", dev.get_address());
        std::process::exit(1);
    }
    run(&mut dev, &args, &running);
    log::info!("[TH11] Exiting.");
}

/// Check the IDs and apply the requested configuration.
fn setup<I: I2c<SevenBitAddress>, D: DelayNs>(
    dev: &mut TempHum11<I, D>,
    args: &Args,
) -> Result<(), Error<I::Error>> {
    let mfg = dev.get_manufacturer_id()?;
    let id = dev.get_device_id()?;
    if mfg != MANUFACTURER_ID || id != DEVICE_ID {
        log::warn!(
            "[TH11] Sensor 0x{:02x}: unexpected IDs (manufacturer 0x{mfg:04x}, device 0x{id:04x})",
            dev.get_address()
        );
    } else {
        let serial = dev.get_serial()?;
        log::info!(
            "[TH11] Sensor 0x{:02x}: HDC1080 found, serial 0x{serial:012x}",
            dev.get_address()
        );
    }
    dev.apply_default_configuration()?;
    dev.set_acquisition_mode(args.mode.into())?;
    if args.heater {
        dev.set_heater(true)?;
    }
    Ok(())
}

/// Take one sample: temperature in `unit` and relative humidity in percent.
fn sample<I: I2c<SevenBitAddress>, D: DelayNs>(
    dev: &mut TempHum11<I, D>,
    unit: Unit,
) -> Result<(f32, f32), Error<I::Error>> {
    match dev.get_mode() {
        AcquisitionMode::Independent => {
            let temp = dev.get_temperature(unit.into())?;
            let hum = dev.get_humidity()?;
            Ok((temp, hum))
        }
        AcquisitionMode::Combined => {
            let (celsius, hum) = dev.get_temperature_humidity()?;
            Ok((TemperatureUnit::from(unit).convert_celsius(celsius), hum))
        }
    }
}

fn run<I: I2c<SevenBitAddress>, D: DelayNs>(
    dev: &mut TempHum11<I, D>,
    args: &Args,
    running: &AtomicBool,
) {
    let interval = Duration::from_millis(args.interval);
    let mut taken = 0usize;
    while running.load(Ordering::Relaxed) && args.count.is_none_or(|n| taken < n) {
        let start = Instant::now();
        match sample(dev, args.unit) {
            Ok((temp, hum)) => log::info!(
                "[TH11] Sensor 0x{:02x}: {temp:.2} {}, {hum:.2}%",
                dev.get_address(),
                args.unit.symbol()
            ),
            Err(e) => log::error!(
                "[TH11] Sensor 0x{:02x}: Error reading: {e:?}",
                dev.get_address()
            ),
        }
        taken += 1;
        log::debug!(
            "[TH11] Sample took {:.2} ms.",
            start.elapsed().as_secs_f64() * 1000.0
        );
        if start.elapsed() < interval {
            std::thread::sleep(interval - start.elapsed());
        }
    }
}
