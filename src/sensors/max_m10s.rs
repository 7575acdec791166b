use crate::board::EnvBus;
use crate::error::AppError;
use crate::sensors::I2C_TIMEOUT;
use log::info;
use shield_core::ubx::pmreq_backup;

/// MAX-M10S I2C address.
const MAX_M10S_ADDRESS: u8 = 0x42;

/// MAX-M10S GNSS module interface. The shield does not use position fixes;
/// the module is sent to its backup state during the self test to save
/// power.
pub struct MaxM10s {
  /// The environmental I2C bus.
  i2c: EnvBus,
}

/// The MAX-M10S module implementation.
impl MaxM10s {
  /// Create a new MAX-M10S module handle.
  ///
  /// # Parameters
  /// - `i2c`: The environmental I2C bus.
  ///
  /// # Returns
  /// The MAX-M10S module handle.
  pub fn new(i2c: EnvBus) -> Self {
    Self { i2c }
  }

  /// Send the receiver to its backup state. It stops acquiring and only
  /// keeps its backup RAM powered until the next power cycle.
  ///
  /// # Returns
  /// The result of the operation.
  pub fn power_off_backup(&mut self) -> Result<(), AppError> {
    info!("Power Off MAX-M10S (GNSS Module)");

    let frame = pmreq_backup();

    let mut i2c = self.i2c.borrow_mut();
    i2c.write(MAX_M10S_ADDRESS, &frame, I2C_TIMEOUT)
      .map_err(|e| AppError::SensorError(format!(
        "Failed to send power request to module at address 0x{:02x}: {:?}",
        MAX_M10S_ADDRESS, e
      )))
  }
}
