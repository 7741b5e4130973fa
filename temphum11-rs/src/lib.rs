#![no_std]
#![deny(missing_docs)]
//!# TempHum11 - Driver for the Texas Instruments HDC1080 Humidity and Temperature Sensor
//! This crate provides a driver for the HDC1080 found on Temp&Hum 11 boards, allowing you to
//! read humidity and temperature data over any [`embedded_hal::i2c::I2c`] bus.
//! It supports independent and combined acquisition, resolution and heater settings, and
//! reports temperatures in Celsius, Kelvin or Fahrenheit.
mod device;
mod error;
mod register;

pub use device::{TempHum11, TempHum11Builder, Timing};
pub use error::Error;
pub use register::{
    AcquisitionMode, Configuration, DEVICE_ID, Humidity, HumidityResolution, MANUFACTURER_ID,
    SLAVE_ADDRESS, Temperature, TemperatureResolution, TemperatureUnit,
};
