pub mod as7331;
pub mod bh1730;
pub mod bme688;
pub mod ilps28qsw;
pub mod ism330dhcx;
pub mod lis2duxs12;
pub mod max77654;
pub mod max_m10s;
pub mod scd41;
pub mod sgp41;

use crate::error::AppError;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::i2c::I2cDriver;

/// I2C transaction timeout in FreeRTOS ticks.
pub const I2C_TIMEOUT: u32 = 100;

/// Settle time after asserting power or bus-enable lines, in milliseconds.
pub const POWER_SETTLE_MS: u32 = 100;

/// Write a single register.
///
/// # Parameters
/// - `i2c`: The I2C driver.
/// - `address`: The 7-bit device address.
/// - `register`: The register address.
/// - `value`: The value to write.
///
/// # Returns
/// The result of the operation.
pub fn write_reg(
  i2c: &mut I2cDriver<'_>,
  address: u8,
  register: u8,
  value: u8,
) -> Result<(), AppError> {
  i2c.write(address, &[register, value], I2C_TIMEOUT)
    .map_err(|e| AppError::SensorError(format!(
      "Failed to write register 0x{:02x} on device at address 0x{:02x}: {:?}",
      register, address, e
    )))
}

/// Read a single register.
///
/// # Parameters
/// - `i2c`: The I2C driver.
/// - `address`: The 7-bit device address.
/// - `register`: The register address.
///
/// # Returns
/// The register value.
pub fn read_reg(i2c: &mut I2cDriver<'_>, address: u8, register: u8) -> Result<u8, AppError> {
  let mut buffer = [0u8; 1];
  read_regs(i2c, address, register, &mut buffer)?;

  Ok(buffer[0])
}

/// Read consecutive registers.
///
/// # Parameters
/// - `i2c`: The I2C driver.
/// - `address`: The 7-bit device address.
/// - `register`: The first register address.
/// - `buffer`: The buffer to fill.
///
/// # Returns
/// The result of the operation.
pub fn read_regs(
  i2c: &mut I2cDriver<'_>,
  address: u8,
  register: u8,
  buffer: &mut [u8],
) -> Result<(), AppError> {
  i2c.write_read(address, &[register], buffer, I2C_TIMEOUT)
    .map_err(|e| AppError::SensorError(format!(
      "Failed to read register 0x{:02x} on device at address 0x{:02x}: {:?}",
      register, address, e
    )))
}

/// Send a 16-bit Sensirion command, optionally followed by CRC-protected
/// argument words.
///
/// # Parameters
/// - `i2c`: The I2C driver.
/// - `address`: The 7-bit device address.
/// - `command`: The command code.
/// - `arguments`: The argument words.
///
/// # Returns
/// The result of the operation.
pub fn sensirion_send(
  i2c: &mut I2cDriver<'_>,
  address: u8,
  command: u16,
  arguments: &[u16],
) -> Result<(), AppError> {
  let mut frame = Vec::with_capacity(2 + 3 * arguments.len());
  frame.extend_from_slice(&command.to_be_bytes());

  for &argument in arguments {
    shield_core::sensirion::push_word(&mut frame, argument);
  }

  i2c.write(address, &frame, I2C_TIMEOUT)
    .map_err(|e| AppError::SensorError(format!(
      "Failed to send command 0x{:04x} to sensor at address 0x{:02x}: {:?}",
      command, address, e
    )))
}

/// Read a Sensirion response after the command's execution delay.
///
/// # Parameters
/// - `i2c`: The I2C driver.
/// - `address`: The 7-bit device address.
/// - `delay_ms`: The command execution time.
/// - `buffer`: The response buffer.
///
/// # Returns
/// The result of the operation.
pub fn sensirion_read(
  i2c: &mut I2cDriver<'_>,
  address: u8,
  delay_ms: u32,
  buffer: &mut [u8],
) -> Result<(), AppError> {
  FreeRtos::delay_ms(delay_ms);

  i2c.read(address, buffer, I2C_TIMEOUT)
    .map_err(|e| AppError::SensorError(format!(
      "Failed to read response from sensor at address 0x{:02x}: {:?}",
      address, e
    )))
}
