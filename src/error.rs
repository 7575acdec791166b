use esp_idf_svc::sys::EspError;
use std::fmt;

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// GPIO error.
    GpioError(String),

    /// I2C error.
    I2cError(String),

    /// Peripherals error.
    PeripheralsError(String),

    /// Power management error.
    PowerError(String),

    /// Sensor error.
    SensorError(String),

    /// Transport error.
    TransportError(String),
}

/// Implement the conversion from `EspError` to `AppError`.
impl From<EspError> for AppError {
    /// Convert an `EspError` to an `AppError`.
    ///
    /// # Parameters
    /// - `error`: The ESP-IDF error.
    ///
    /// # Returns
    /// The application error.
    fn from(error: EspError) -> Self {
        AppError::I2cError(format!("ESP-IDF error: {:?}", error))
    }
}

/// Implement the conversion from `AppError` to the sequencer's channel error.
impl From<AppError> for shield_core::sequencer::ChannelError {
    /// Convert an `AppError` to a `ChannelError`.
    ///
    /// # Parameters
    /// - `error`: The application error.
    ///
    /// # Returns
    /// The channel error.
    fn from(error: AppError) -> Self {
        shield_core::sequencer::ChannelError::new(error.to_string())
    }
}

/// Implement the `Display` trait for `AppError`.
impl fmt::Display for AppError {
    /// Format the error message.
    ///
    /// # Parameters
    /// - `f`: The formatter.
    ///
    /// # Returns
    /// The result of the operation.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::GpioError(msg) => write!(f, "GPIO error: {}", msg),
            AppError::I2cError(msg) => write!(f, "I2C error: {}", msg),
            AppError::PeripheralsError(msg) => write!(f, "Peripherals error: {}", msg),
            AppError::PowerError(msg) => write!(f, "Power management error: {}", msg),
            AppError::SensorError(msg) => write!(f, "Sensor error: {}", msg),
            AppError::TransportError(msg) => write!(f, "Transport error: {}", msg),
        }
    }
}

/// Implement the `Error` trait for `AppError`.
impl std::error::Error for AppError {}
