use linux_embedded_hal::I2cdev;

/// Clock the sensor bus is expected to run at. On Linux the rate is fixed by
/// the device tree, so it is only reported.
pub const BUS_CLOCK_HZ: u32 = 100_000;

/// Character device for an I2C bus number.
pub fn path(bus: u8) -> String {
    format!("/dev/i2c-{bus}")
}

/// Open an I2C bus by number.
pub fn open(bus: u8) -> std::io::Result<I2cdev> {
    let path = path(bus);
    log::info!(
        "[TH11] Opening bus: {path} (expecting {} kHz)",
        BUS_CLOCK_HZ / 1000
    );
    I2cdev::new(&path).map_err(|e| std::io::Error::other(format!("{path}: {e}")))
}
