use embedded_hal::{
    delay::DelayNs,
    i2c::{I2c, SevenBitAddress},
};

use crate::{
    Error, Humidity, Temperature,
    register::{
        AcquisitionMode, Configuration, DeviceId, HumidityResolution, ManufacturerId,
        SLAVE_ADDRESS, SerialId, TempHum11Register, TemperatureResolution, TemperatureUnit,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Settling delays between selecting a register and reading its content.
pub struct Timing {
    /// Delay before reading a single 16-bit register, in milliseconds.
    pub register_settle_ms: u32,
    /// Delay before reading temperature and humidity in one transaction, in milliseconds.
    pub combined_settle_ms: u32,
}

impl Timing {
    /// Default settle time for single register reads.
    pub const REGISTER_SETTLE_MS: u32 = 10;
    /// Default settle time for combined reads and soft resets.
    pub const COMBINED_SETTLE_MS: u32 = 15;
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            register_settle_ms: Self::REGISTER_SETTLE_MS,
            combined_settle_ms: Self::COMBINED_SETTLE_MS,
        }
    }
}

/// Represents the HDC1080 sensor on a Temp&Hum 11 board.
pub struct TempHum11<I, D> {
    pub(crate) i2c: I,
    pub(crate) delay: D,
    pub(crate) address: u8,
    pub(crate) config: Configuration,
    pub(crate) mode: AcquisitionMode,
    pub(crate) timing: Timing,
}

#[derive(Debug, Default)]
/// Builder for a Temp&Hum 11 sensor.
pub struct TempHum11Builder {
    pub(crate) timing: Timing,
}

impl TempHum11Builder {
    /// Set the settling delays used by the driver.
    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    /// Build the driver on top of an already configured bus.
    ///
    /// No bus traffic is generated. The driver assumes the device is in its
    /// power-on state until a configuration is written.
    pub fn build<I: I2c<SevenBitAddress>, D: DelayNs>(self, i2c: I, delay: D) -> TempHum11<I, D> {
        TempHum11 {
            i2c,
            delay,
            address: SLAVE_ADDRESS,
            config: Configuration::default(),
            mode: AcquisitionMode::Independent,
            timing: self.timing,
        }
    }
}

impl<I: I2c<SevenBitAddress>, D: DelayNs> TempHum11<I, D> {
    /// Create a driver with the default settling delays.
    pub fn new(i2c: I, delay: D) -> Self {
        TempHum11Builder::default().build(i2c, delay)
    }

    /// Release the bus and the delay provider.
    pub fn release(self) -> (I, D) {
        (self.i2c, self.delay)
    }

    /// Get the address of the device.
    pub fn get_address(&self) -> u8 {
        self.address
    }

    /// Get the current acquisition mode.
    pub fn get_mode(&self) -> AcquisitionMode {
        self.mode
    }

    /// Get the last configuration written to the device.
    pub fn get_configuration(&self) -> Configuration {
        self.config
    }

    /// Get the settling delays.
    pub fn get_timing(&self) -> Timing {
        self.timing
    }

    pub(crate) fn fetch(
        &mut self,
        register: u8,
        settle_ms: u32,
        buf: &mut [u8],
    ) -> Result<(), Error<I::Error>> {
        self.i2c.write(self.address, &[register])?;
        self.delay.delay_ms(settle_ms);
        self.i2c.read(self.address, buf)?;
        log::trace!(
            "[TH11] 0x{:02x}: reg 0x{:02x} -> {:02x?}",
            self.address,
            register,
            buf
        );
        Ok(())
    }

    /// Write a raw configuration word.
    ///
    /// The word is sent verbatim. The acquisition mode used by
    /// [`TempHum11::get_temperature_humidity`] is only changed through
    /// [`TempHum11::set_acquisition_mode`]; a word with the reset bit set
    /// does not clear the mode flag, unlike [`TempHum11::reset`].
    pub fn write_configuration(&mut self, config: u16) -> Result<(), Error<I::Error>> {
        Configuration::from_bits(config).write(self)
    }

    /// Normal operation, heater disabled, independent acquisition and 14-bit resolution.
    pub fn apply_default_configuration(&mut self) -> Result<(), Error<I::Error>> {
        self.write_configuration(Configuration::DEFAULT)
    }

    /// Read a 16-bit register.
    pub fn read_register(&mut self, address: u8) -> Result<u16, Error<I::Error>> {
        let settle = self.timing.register_settle_ms;
        let mut buffer = [0u8; 2];
        self.fetch(address, settle, &mut buffer)?;
        Ok(u16::from_be_bytes(buffer))
    }

    /// Read the current temperature value.
    pub fn read_temperature(&mut self) -> Result<Temperature, Error<I::Error>> {
        let mut v = Temperature::default();
        v.read(self)?;
        Ok(v)
    }

    /// Read the current humidity value.
    pub fn read_humidity(&mut self) -> Result<Humidity, Error<I::Error>> {
        let mut v = Humidity::default();
        v.read(self)?;
        Ok(v)
    }

    /// Measure the temperature in the given unit.
    pub fn get_temperature(&mut self, unit: TemperatureUnit) -> Result<f32, Error<I::Error>> {
        Ok(self.read_temperature()?.in_unit(unit))
    }

    /// Measure the relative humidity in percent.
    pub fn get_humidity(&mut self) -> Result<f32, Error<I::Error>> {
        Ok(self.read_humidity()?.percentage())
    }

    /// Measure temperature (Celsius) and relative humidity in one transaction.
    ///
    /// Only available in [`AcquisitionMode::Combined`]. In independent mode
    /// `(0.0, 0.0)` is returned and the bus is left untouched.
    pub fn get_temperature_humidity(&mut self) -> Result<(f32, f32), Error<I::Error>> {
        if self.mode != AcquisitionMode::Combined {
            log::warn!(
                "[TH11] 0x{:02x}: combined read requested in independent mode",
                self.address
            );
            return Ok((0.0, 0.0));
        }
        let settle = self.timing.combined_settle_ms;
        let mut buf = [0u8; 4];
        self.fetch(Temperature::ADDRESS, settle, &mut buf)?;
        let temp = Temperature::from_raw(u16::from_be_bytes([buf[0], buf[1]]));
        let hum = Humidity::from_raw(u16::from_be_bytes([buf[2], buf[3]]));
        Ok((temp.celsius(), hum.percentage()))
    }

    /// Read the device ID register. A genuine HDC1080 reports [`crate::DEVICE_ID`].
    pub fn get_device_id(&mut self) -> Result<u16, Error<I::Error>> {
        let mut id = DeviceId::default();
        id.read(self)?;
        Ok(id.value())
    }

    /// Read the manufacturer ID register. Texas Instruments parts report [`crate::MANUFACTURER_ID`].
    pub fn get_manufacturer_id(&mut self) -> Result<u16, Error<I::Error>> {
        let mut id = ManufacturerId::default();
        id.read(self)?;
        Ok(id.value())
    }

    /// Get the serial number of the sensor.
    pub fn get_serial(&mut self) -> Result<u64, Error<I::Error>> {
        let mut serial = SerialId::default();
        serial.read(self)?;
        Ok(serial.value())
    }

    /// Select independent or combined acquisition.
    ///
    /// The bare mode word ([`Configuration::TEMP_HUM_ACQUIRED`] or
    /// [`Configuration::TEMP_FIRST`]) is written, so heater and resolution
    /// return to their defaults.
    pub fn set_acquisition_mode(&mut self, mode: AcquisitionMode) -> Result<(), Error<I::Error>> {
        let word = match mode {
            AcquisitionMode::Independent => Configuration::TEMP_HUM_ACQUIRED,
            AcquisitionMode::Combined => Configuration::TEMP_FIRST,
        };
        self.write_configuration(word)?;
        self.mode = mode;
        log::debug!("[TH11] 0x{:02x}: acquisition mode {mode:?}", self.address);
        Ok(())
    }

    /// Set the heater state of the sensor.
    pub fn set_heater(&mut self, enable: bool) -> Result<(), Error<I::Error>> {
        self.config.with_heater_enable(enable).write(self)
    }

    /// Set the humidity and temperature resolutions.
    pub fn set_resolution(
        &mut self,
        humidity_resolution: HumidityResolution,
        temperature_resolution: TemperatureResolution,
    ) -> Result<(), Error<I::Error>> {
        self.config
            .with_humidity_resolution(humidity_resolution)
            .with_temperature_resolution(temperature_resolution)
            .write(self)
    }

    /// Perform a soft reset of the sensor.
    ///
    /// The device returns to its power-on configuration and the driver falls
    /// back to independent acquisition.
    pub fn reset(&mut self) -> Result<(), Error<I::Error>> {
        Configuration::new().with_reset(true).write(self)?;
        self.delay.delay_ms(self.timing.combined_settle_ms);
        self.mode = AcquisitionMode::Independent;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::{vec, vec::Vec};

    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::{
        delay::NoopDelay,
        i2c::{Mock as I2cMock, Transaction},
    };
    use float_cmp::approx_eq;

    use super::*;

    /// Records every delay request in nanoseconds.
    #[derive(Default)]
    struct SpyDelay {
        calls: Vec<u64>,
    }

    impl DelayNs for SpyDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.calls.push(ns as u64);
        }

        fn delay_us(&mut self, us: u32) {
            self.calls.push(us as u64 * 1_000);
        }

        fn delay_ms(&mut self, ms: u32) {
            self.calls.push(ms as u64 * 1_000_000);
        }
    }

    fn config_write(word: u16) -> Transaction {
        let [hi, lo] = word.to_be_bytes();
        Transaction::write(SLAVE_ADDRESS, vec![0x02, hi, lo])
    }

    fn register_read(register: u8, data: [u8; 2]) -> [Transaction; 2] {
        [
            Transaction::write(SLAVE_ADDRESS, vec![register]),
            Transaction::read(SLAVE_ADDRESS, data.to_vec()),
        ]
    }

    fn finish<D: DelayNs>(dev: TempHum11<I2cMock, D>) -> D {
        let (mut i2c, delay) = dev.release();
        i2c.done();
        delay
    }

    #[test]
    fn build_is_silent() {
        let i2c = I2cMock::new(&[]);
        let dev = TempHum11::new(i2c, NoopDelay::new());
        assert_eq!(dev.get_address(), 0x40);
        assert_eq!(dev.get_mode(), AcquisitionMode::Independent);
        assert_eq!(dev.get_timing(), Timing::default());
        finish(dev);
    }

    #[test]
    fn write_configuration_frame() {
        let i2c = I2cMock::new(&[config_write(0x1234)]);
        let mut dev = TempHum11::new(i2c, NoopDelay::new());
        dev.write_configuration(0x1234).unwrap();
        assert_eq!(dev.get_configuration().into_bits(), 0x1234);
        finish(dev);
    }

    #[test]
    fn default_configuration() {
        let i2c = I2cMock::new(&[config_write(0x0000)]);
        let mut dev = TempHum11::new(i2c, NoopDelay::new());
        dev.apply_default_configuration().unwrap();
        let cfg = dev.get_configuration();
        assert!(!cfg.heater_enable());
        assert_eq!(cfg.mode(), AcquisitionMode::Independent);
        assert_eq!(cfg.humidity_resolution(), HumidityResolution::FourteenBit);
        assert_eq!(cfg.temperature_resolution(), TemperatureResolution::FourteenBit);
        finish(dev);
    }

    #[test]
    fn read_register_waits_before_reading() {
        let i2c = I2cMock::new(&register_read(0xFE, [0x54, 0x49]));
        let mut dev = TempHum11::new(i2c, SpyDelay::default());
        assert_eq!(dev.read_register(0xFE).unwrap(), 0x5449);
        let delay = finish(dev);
        assert_eq!(delay.calls, vec![10_000_000]);
    }

    #[test]
    fn custom_timing_is_used() {
        let i2c = I2cMock::new(&register_read(0x01, [0x00, 0x00]));
        let mut dev = TempHum11Builder::default()
            .with_timing(Timing {
                register_settle_ms: 3,
                combined_settle_ms: 7,
            })
            .build(i2c, SpyDelay::default());
        dev.get_humidity().unwrap();
        let delay = finish(dev);
        assert_eq!(delay.calls.iter().sum::<u64>(), 3_000_000);
    }

    #[test]
    fn temperature_in_all_units() {
        let expectations: Vec<Transaction> = (0..3)
            .flat_map(|_| register_read(0x00, [0x80, 0x00]))
            .collect();
        let i2c = I2cMock::new(&expectations);
        let mut dev = TempHum11::new(i2c, NoopDelay::new());
        let c = dev.get_temperature(TemperatureUnit::Celsius).unwrap();
        let k = dev.get_temperature(TemperatureUnit::Kelvin).unwrap();
        let f = dev.get_temperature(TemperatureUnit::Fahrenheit).unwrap();
        assert!(approx_eq!(f32, c, 42.5, ulps = 2));
        assert!(approx_eq!(f32, k, 315.65, epsilon = 1e-4));
        assert!(approx_eq!(f32, f, 108.5, ulps = 2));
        finish(dev);
    }

    #[test]
    fn humidity_reading() {
        let i2c = I2cMock::new(&register_read(0x01, [0x40, 0x00]));
        let mut dev = TempHum11::new(i2c, NoopDelay::new());
        assert!(approx_eq!(f32, dev.get_humidity().unwrap(), 25.0, ulps = 2));
        finish(dev);
    }

    #[test]
    fn combined_read_in_independent_mode_skips_bus() {
        let i2c = I2cMock::new(&[]);
        let mut dev = TempHum11::new(i2c, NoopDelay::new());
        assert_eq!(dev.get_temperature_humidity().unwrap(), (0.0, 0.0));
        finish(dev);
    }

    #[test]
    fn combined_read() {
        let i2c = I2cMock::new(&[
            config_write(0x1000),
            Transaction::write(SLAVE_ADDRESS, vec![0x00]),
            Transaction::read(SLAVE_ADDRESS, vec![0x80, 0x00, 0x40, 0x00]),
        ]);
        let mut dev = TempHum11::new(i2c, SpyDelay::default());
        dev.set_acquisition_mode(AcquisitionMode::Combined).unwrap();
        let (t, h) = dev.get_temperature_humidity().unwrap();
        assert!(approx_eq!(f32, t, 42.5, ulps = 2));
        assert!(approx_eq!(f32, h, 25.0, ulps = 2));
        let delay = finish(dev);
        assert_eq!(delay.calls, vec![15_000_000]);
    }

    #[test]
    fn last_mode_wins() {
        let i2c = I2cMock::new(&[config_write(0x0000), config_write(0x1000), config_write(0x0000)]);
        let mut dev = TempHum11::new(i2c, NoopDelay::new());
        dev.set_acquisition_mode(AcquisitionMode::Independent).unwrap();
        dev.set_acquisition_mode(AcquisitionMode::Combined).unwrap();
        dev.set_acquisition_mode(AcquisitionMode::Independent).unwrap();
        assert_eq!(dev.get_mode(), AcquisitionMode::Independent);
        // no transactions left, so this must not touch the bus
        assert_eq!(dev.get_temperature_humidity().unwrap(), (0.0, 0.0));
        finish(dev);
    }

    #[test]
    fn raw_configuration_keeps_mode_flag() {
        let i2c = I2cMock::new(&[config_write(Configuration::TEMP_FIRST)]);
        let mut dev = TempHum11::new(i2c, NoopDelay::new());
        dev.write_configuration(Configuration::TEMP_FIRST).unwrap();
        assert_eq!(dev.get_mode(), AcquisitionMode::Independent);
        finish(dev);
    }

    #[test]
    fn identification() {
        let mut expectations = Vec::new();
        expectations.extend(register_read(0xFF, [0x10, 0x50]));
        expectations.extend(register_read(0xFE, [0x54, 0x49]));
        let i2c = I2cMock::new(&expectations);
        let mut dev = TempHum11::new(i2c, NoopDelay::new());
        assert_eq!(dev.get_device_id().unwrap(), crate::DEVICE_ID);
        assert_eq!(dev.get_manufacturer_id().unwrap(), crate::MANUFACTURER_ID);
        finish(dev);
    }

    #[test]
    fn serial_number() {
        let mut expectations = Vec::new();
        expectations.extend(register_read(0xFB, [0x01, 0x23]));
        expectations.extend(register_read(0xFC, [0x45, 0x67]));
        expectations.extend(register_read(0xFD, [0x89, 0x80]));
        let i2c = I2cMock::new(&expectations);
        let mut dev = TempHum11::new(i2c, NoopDelay::new());
        assert_eq!(dev.get_serial().unwrap(), 0x0123_4567_8980);
        finish(dev);
    }

    #[test]
    fn bus_failure_is_reported() {
        let i2c = I2cMock::new(&[
            Transaction::write(SLAVE_ADDRESS, vec![0x00]),
            Transaction::read(SLAVE_ADDRESS, vec![0x00, 0x00]).with_error(ErrorKind::Other),
            Transaction::write(SLAVE_ADDRESS, vec![0xFF]),
            Transaction::read(SLAVE_ADDRESS, vec![0x00, 0x00]).with_error(ErrorKind::Other),
        ]);
        let mut dev = TempHum11::new(i2c, NoopDelay::new());
        assert!(matches!(
            dev.get_temperature(TemperatureUnit::Celsius),
            Err(Error::I2c(ErrorKind::Other))
        ));
        assert_eq!(dev.get_device_id().unwrap_or_default(), 0);
        finish(dev);
    }

    #[test]
    fn mode_word_is_written_verbatim() {
        let i2c = I2cMock::new(&[
            config_write(0x2000),
            config_write(0x1000),
            config_write(0x3600),
            config_write(0x0000),
        ]);
        let mut dev = TempHum11::new(i2c, NoopDelay::new());
        dev.set_heater(true).unwrap();
        dev.set_acquisition_mode(AcquisitionMode::Combined).unwrap();
        assert!(!dev.get_configuration().heater_enable());
        assert_eq!(dev.get_configuration().mode(), AcquisitionMode::Combined);
        dev.write_configuration(0x3600).unwrap();
        dev.set_acquisition_mode(AcquisitionMode::Independent).unwrap();
        assert_eq!(dev.get_configuration(), Configuration::default());
        finish(dev);
    }

    #[test]
    fn raw_reset_word_keeps_mode_flag() {
        let i2c = I2cMock::new(&[config_write(0x1000), config_write(0x8000)]);
        let mut dev = TempHum11::new(i2c, NoopDelay::new());
        dev.set_acquisition_mode(AcquisitionMode::Combined).unwrap();
        dev.write_configuration(Configuration::SOFTWARE_RESET).unwrap();
        assert_eq!(dev.get_configuration(), Configuration::default());
        assert_eq!(dev.get_mode(), AcquisitionMode::Combined);
        finish(dev);
    }

    #[test]
    fn heater_and_resolution_follow_mode() {
        let i2c = I2cMock::new(&[
            config_write(0x1000),
            config_write(0x3000),
            config_write(0x3600),
            config_write(0x1600),
        ]);
        let mut dev = TempHum11::new(i2c, NoopDelay::new());
        dev.set_acquisition_mode(AcquisitionMode::Combined).unwrap();
        dev.set_heater(true).unwrap();
        dev.set_resolution(HumidityResolution::EightBit, TemperatureResolution::ElevenBit)
            .unwrap();
        dev.set_heater(false).unwrap();
        assert_eq!(dev.get_mode(), AcquisitionMode::Combined);
        finish(dev);
    }

    #[test]
    fn soft_reset_restores_defaults() {
        let i2c = I2cMock::new(&[
            config_write(0x1000),
            config_write(0x8000),
            config_write(0x0000),
        ]);
        let mut dev = TempHum11::new(i2c, SpyDelay::default());
        dev.set_acquisition_mode(AcquisitionMode::Combined).unwrap();
        dev.reset().unwrap();
        assert_eq!(dev.get_mode(), AcquisitionMode::Independent);
        assert_eq!(dev.get_configuration(), Configuration::default());
        dev.set_heater(false).unwrap();
        let delay = finish(dev);
        assert_eq!(delay.calls, vec![15_000_000]);
    }

    #[test]
    fn register_direction_is_enforced() {
        let i2c = I2cMock::new(&[]);
        let mut dev = TempHum11::new(i2c, NoopDelay::new());
        assert!(matches!(
            Configuration::default().read(&mut dev),
            Err(Error::WriteOnly)
        ));
        assert!(matches!(
            DeviceId::default().write(&mut dev),
            Err(Error::ReadOnly)
        ));
        finish(dev);
    }
}
