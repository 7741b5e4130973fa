#[derive(Debug)]
/// Represents errors that can occur while interacting with the HDC1080 sensor.
pub enum Error<E> {
    /// An error occurred while communicating with the I2C bus.
    I2c(E),
    /// Attempted to write to a register that is not writable.
    ReadOnly,
    /// Attempted to read from a register that is not readable.
    WriteOnly,
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::I2c(e)
    }
}
