use bitfield_struct::bitfield;
use embedded_hal::{
    delay::DelayNs,
    i2c::{I2c, SevenBitAddress},
};

use crate::{Error, device::TempHum11};

/// 7-bit I2C address of the HDC1080. The address is not configurable.
pub const SLAVE_ADDRESS: u8 = 0x40;
/// Expected content of the manufacturer ID register (Texas Instruments).
pub const MANUFACTURER_ID: u16 = 0x5449;
/// Expected content of the device ID register.
pub const DEVICE_ID: u16 = 0x1050;

const KELVIN_OFFSET: f32 = 273.15;

pub(crate) trait TempHum11Register: Default {
    const ADDRESS: u8;
    const REGISTER_LEN: usize;

    fn read<I: I2c<SevenBitAddress>, D: DelayNs>(
        &mut self,
        _dev: &mut TempHum11<I, D>,
    ) -> Result<(), Error<I::Error>> {
        Err(Error::WriteOnly)
    }

    fn write<I: I2c<SevenBitAddress>, D: DelayNs>(
        &mut self,
        _dev: &mut TempHum11<I, D>,
    ) -> Result<(), Error<I::Error>> {
        Err(Error::ReadOnly)
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Unit in which a temperature is reported.
pub enum TemperatureUnit {
    #[default]
    /// Degrees Celsius.
    Celsius = 0x00,
    /// Kelvin.
    Kelvin = 0x01,
    /// Degrees Fahrenheit.
    Fahrenheit = 0x02,
}

impl TryFrom<u8> for TemperatureUnit {
    /// The rejected value.
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(TemperatureUnit::Celsius),
            0x01 => Ok(TemperatureUnit::Kelvin),
            0x02 => Ok(TemperatureUnit::Fahrenheit),
            other => Err(other),
        }
    }
}

impl TemperatureUnit {
    /// Converts a temperature in Celsius to this unit.
    pub fn convert_celsius(self, celsius: f32) -> f32 {
        match self {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Kelvin => celsius + KELVIN_OFFSET,
            TemperatureUnit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
/// Represents a temperature measurement from the HDC1080 sensor.
pub struct Temperature {
    pub(crate) value: u16,
}

impl Temperature {
    /// Wraps a raw register value.
    pub const fn from_raw(value: u16) -> Self {
        Self { value }
    }

    /// The raw register value.
    pub fn raw(&self) -> u16 {
        self.value
    }

    /// Converts the raw temperature value to Celsius.
    pub fn celsius(&self) -> f32 {
        (self.value as f32 / 65536.0) * 165.0 - 40.0
    }

    /// Converts the raw temperature value to Kelvin.
    pub fn kelvin(&self) -> f32 {
        TemperatureUnit::Kelvin.convert_celsius(self.celsius())
    }

    /// Converts the raw temperature value to Fahrenheit.
    pub fn fahrenheit(&self) -> f32 {
        TemperatureUnit::Fahrenheit.convert_celsius(self.celsius())
    }

    /// Converts the raw temperature value to the given unit.
    pub fn in_unit(&self, unit: TemperatureUnit) -> f32 {
        unit.convert_celsius(self.celsius())
    }
}

impl TempHum11Register for Temperature {
    const ADDRESS: u8 = 0x00;

    const REGISTER_LEN: usize = 2;

    fn read<I: I2c<SevenBitAddress>, D: DelayNs>(
        &mut self,
        dev: &mut TempHum11<I, D>,
    ) -> Result<(), Error<I::Error>> {
        self.value = dev.read_register(Self::ADDRESS)?;
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
/// Represents a humidity measurement from the HDC1080 sensor.
pub struct Humidity {
    pub(crate) value: u16,
}

impl Humidity {
    /// Wraps a raw register value.
    pub const fn from_raw(value: u16) -> Self {
        Self { value }
    }

    /// The raw register value.
    pub fn raw(&self) -> u16 {
        self.value
    }

    /// Converts the raw humidity value to percentage (0-100).
    pub fn percentage(&self) -> f32 {
        (self.value as f32 / 65536.0) * 100.0
    }
}

impl TempHum11Register for Humidity {
    const ADDRESS: u8 = 0x01;

    const REGISTER_LEN: usize = 2;

    fn read<I: I2c<SevenBitAddress>, D: DelayNs>(
        &mut self,
        dev: &mut TempHum11<I, D>,
    ) -> Result<(), Error<I::Error>> {
        self.value = dev.read_register(Self::ADDRESS)?;
        Ok(())
    }
}

#[bitfield(u16)]
#[derive(PartialEq, Eq)]
/// Configuration register of the HDC1080.
///
/// The register is treated as write-only: the driver keeps a copy of the last
/// word it sent instead of reading it back.
pub struct Configuration {
    #[bits(8)]
    __reserved_low: u8,
    /// Humidity measurement resolution.
    #[bits(2, default = HumidityResolution::FourteenBit)]
    pub humidity_resolution: HumidityResolution,
    /// Temperature measurement resolution.
    #[bits(1, default = TemperatureResolution::FourteenBit)]
    pub temperature_resolution: TemperatureResolution,
    /// Set by the device when the supply voltage is below 2.8 V.
    #[bits(1, default = false, access = RO)]
    pub battery_low: bool,
    /// Acquisition mode.
    #[bits(1, default = AcquisitionMode::Independent)]
    pub mode: AcquisitionMode,
    /// Heater enable.
    #[bits(1, default = false)]
    pub heater_enable: bool,
    #[bits(1)]
    __reserved_high: bool,
    /// Software reset.
    #[bits(1, default = false)]
    pub reset: bool,
}

impl Configuration {
    /// Normal operation, no reset pending.
    pub const NORMAL_OPERATION: u16 = 0x0000;
    /// Software reset. The bit clears itself once the reset completes.
    pub const SOFTWARE_RESET: u16 = 0x8000;
    /// Heater disabled.
    pub const HEATER_DISABLED: u16 = 0x0000;
    /// Heater enabled.
    pub const HEATER_ENABLED: u16 = 0x2000;
    /// Temperature or humidity is acquired per trigger.
    pub const TEMP_HUM_ACQUIRED: u16 = 0x0000;
    /// Temperature and humidity are acquired in sequence, temperature first.
    pub const TEMP_FIRST: u16 = 0x1000;
    /// Supply voltage above 2.8 V.
    pub const BATTERY_ABOVE_2V8: u16 = 0x0000;
    /// Supply voltage below 2.8 V.
    pub const BATTERY_BELOW_2V8: u16 = 0x0800;
    /// 14-bit temperature resolution.
    pub const TEMP_RESOLUTION_14BIT: u16 = 0x0000;
    /// 11-bit temperature resolution.
    pub const TEMP_RESOLUTION_11BIT: u16 = 0x0400;
    /// 14-bit humidity resolution.
    pub const HUM_RESOLUTION_14BIT: u16 = 0x0000;
    /// 11-bit humidity resolution.
    pub const HUM_RESOLUTION_11BIT: u16 = 0x0100;
    /// 8-bit humidity resolution.
    pub const HUM_RESOLUTION_8BIT: u16 = 0x0200;

    /// Normal operation, heater off, independent acquisition, 14-bit resolution on both channels.
    pub const DEFAULT: u16 = Self::NORMAL_OPERATION
        | Self::HEATER_DISABLED
        | Self::TEMP_HUM_ACQUIRED
        | Self::TEMP_RESOLUTION_14BIT
        | Self::HUM_RESOLUTION_14BIT;
}

impl TempHum11Register for Configuration {
    const ADDRESS: u8 = 0x02;

    const REGISTER_LEN: usize = 2;

    fn write<I: I2c<SevenBitAddress>, D: DelayNs>(
        &mut self,
        dev: &mut TempHum11<I, D>,
    ) -> Result<(), Error<I::Error>> {
        let buffer = self.into_bits().to_be_bytes();
        dev.i2c
            .write(dev.address, &[Self::ADDRESS, buffer[0], buffer[1]])?;
        log::debug!(
            "[TH11] 0x{:02x}: configuration <- 0x{:04x}",
            dev.address,
            self.into_bits()
        );
        // a reset returns the device to its power-on configuration
        dev.config = if self.reset() {
            Configuration::default()
        } else {
            *self
        };
        Ok(())
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Acquisition mode for the HDC1080 sensor.
pub enum AcquisitionMode {
    #[default]
    /// Temperature and humidity are read in separate transactions.
    Independent = 0b0,
    /// Temperature and humidity are read together, temperature first.
    Combined = 0b1,
}

impl TryFrom<u8> for AcquisitionMode {
    /// The rejected value.
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AcquisitionMode::Independent),
            1 => Ok(AcquisitionMode::Combined),
            other => Err(other),
        }
    }
}

impl AcquisitionMode {
    pub(crate) const fn from_bits(bits: u8) -> Self {
        match bits {
            0b0 => AcquisitionMode::Independent,
            _ => AcquisitionMode::Combined,
        }
    }

    pub(crate) const fn into_bits(self) -> u8 {
        match self {
            AcquisitionMode::Independent => 0b0,
            AcquisitionMode::Combined => 0b1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
/// Humidity measurement resolution for the HDC1080 sensor.
pub enum HumidityResolution {
    /// 8-bit resolution, with a conversion time of 2.5 milliseconds.
    EightBit = 0b10,
    /// 11-bit resolution, with a conversion time of 3.85 milliseconds.
    ElevenBit = 0b01,
    #[default]
    /// 14-bit resolution, with a conversion time of 6.5 milliseconds.
    FourteenBit = 0b00,
}

impl HumidityResolution {
    pub(crate) const fn from_bits(bits: u8) -> Self {
        match bits {
            0b00 => HumidityResolution::FourteenBit,
            0b01 => HumidityResolution::ElevenBit,
            // 0b11 is reserved and behaves as 8-bit
            _ => HumidityResolution::EightBit,
        }
    }

    pub(crate) const fn into_bits(self) -> u8 {
        match self {
            HumidityResolution::EightBit => 0b10,
            HumidityResolution::ElevenBit => 0b01,
            HumidityResolution::FourteenBit => 0b00,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
/// Temperature measurement resolution for the HDC1080 sensor.
pub enum TemperatureResolution {
    /// 11-bit resolution, with a conversion time of 3.65 milliseconds.
    ElevenBit = 0b1,
    #[default]
    /// 14-bit resolution, with a conversion time of 6.35 milliseconds.
    FourteenBit = 0b0,
}

impl TemperatureResolution {
    pub(crate) const fn from_bits(bits: u8) -> Self {
        match bits {
            0b0 => TemperatureResolution::FourteenBit,
            _ => TemperatureResolution::ElevenBit,
        }
    }

    pub(crate) const fn into_bits(self) -> u8 {
        match self {
            TemperatureResolution::ElevenBit => 0b1,
            TemperatureResolution::FourteenBit => 0b0,
        }
    }
}

#[derive(Debug, Default)]
/// 48-bit factory serial number, spread over three 16-bit registers.
pub(crate) struct SerialId(u64);

impl SerialId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl SerialId {
    /// Number of consecutive 16-bit registers holding the serial number.
    const WORDS: u8 = 3;
}

impl TempHum11Register for SerialId {
    const ADDRESS: u8 = 0xFB;
    const REGISTER_LEN: usize = 2;

    fn read<I: I2c<SevenBitAddress>, D: DelayNs>(
        &mut self,
        dev: &mut TempHum11<I, D>,
    ) -> Result<(), Error<I::Error>> {
        let mut value = 0u64;
        for offset in 0..Self::WORDS {
            let word = dev.read_register(Self::ADDRESS + offset)?;
            value = value << 16 | word as u64;
        }
        self.0 = value;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub(crate) struct ManufacturerId(u16);

impl ManufacturerId {
    pub fn value(&self) -> u16 {
        self.0
    }
}

impl TempHum11Register for ManufacturerId {
    const ADDRESS: u8 = 0xFE;
    const REGISTER_LEN: usize = 2;

    fn read<I: I2c<SevenBitAddress>, D: DelayNs>(
        &mut self,
        dev: &mut TempHum11<I, D>,
    ) -> Result<(), Error<I::Error>> {
        self.0 = dev.read_register(Self::ADDRESS)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub(crate) struct DeviceId(u16);

impl DeviceId {
    pub fn value(&self) -> u16 {
        self.0
    }
}

impl TempHum11Register for DeviceId {
    const ADDRESS: u8 = 0xFF;
    const REGISTER_LEN: usize = 2;

    fn read<I: I2c<SevenBitAddress>, D: DelayNs>(
        &mut self,
        dev: &mut TempHum11<I, D>,
    ) -> Result<(), Error<I::Error>> {
        self.0 = dev.read_register(Self::ADDRESS)?;
        Ok(())
    }
}
