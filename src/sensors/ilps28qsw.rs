use crate::board::EnvBus;
use crate::error::AppError;
use crate::sensors::{read_reg, read_regs, write_reg};
use esp_idf_svc::hal::delay::FreeRtos;
use log::info;
use shield_core::ilps28qsw::{pressure_hpa, pressure_raw, temperature_c};

/// ILPS28QSW I2C address.
const ILPS28QSW_ADDRESS: u8 = 0x5c;

/// Device identification register.
const REG_WHO_AM_I: u8 = 0x0f;

/// Control register 1: output data rate and averaging.
const REG_CTRL_REG1: u8 = 0x10;

/// Control register 2: software reset, block data update.
const REG_CTRL_REG2: u8 = 0x11;

/// Control register 3: address auto-increment, analog hub enable.
const REG_CTRL_REG3: u8 = 0x12;

/// Pressure output, low byte first.
const REG_PRESS_OUT_XL: u8 = 0x28;

/// Temperature output, low byte first.
const REG_TEMP_OUT_L: u8 = 0x2b;

/// WHO_AM_I response.
pub const CHIP_ID: u8 = 0xb4;

/// CTRL_REG2 software reset bit.
const CTRL_REG2_SWRESET: u8 = 0x04;

/// CTRL_REG2 block data update bit.
const CTRL_REG2_BDU: u8 = 0x08;

/// CTRL_REG3 register address auto-increment bit.
const CTRL_REG3_IF_ADD_INC: u8 = 0x01;

/// CTRL_REG1 value: 4 Hz output data rate, 16 sample averaging, low pass
/// filter at ODR/4, 1260 hPa full scale.
const CTRL_REG1_MODE: u8 = 0x15;

/// ILPS28QSW pressure sensor interface. The sensor has no power gating; it
/// is configured into continuous mode on power up and parked at ODR off on
/// power down.
pub struct Ilps28qsw {
  /// The environmental I2C bus.
  i2c: EnvBus,
}

/// The ILPS28QSW sensor implementation.
impl Ilps28qsw {
  /// Create a new ILPS28QSW sensor.
  ///
  /// # Parameters
  /// - `i2c`: The environmental I2C bus.
  ///
  /// # Returns
  /// The ILPS28QSW sensor.
  pub fn new(i2c: EnvBus) -> Self {
    Self { i2c }
  }

  /// Read the device identification register.
  ///
  /// # Returns
  /// The chip id.
  pub fn chip_id(&mut self) -> Result<u8, AppError> {
    let mut i2c = self.i2c.borrow_mut();
    read_reg(&mut i2c, ILPS28QSW_ADDRESS, REG_WHO_AM_I)
  }

  /// Reset the sensor and wait for the reset to complete.
  ///
  /// # Returns
  /// The result of the operation.
  pub fn reset(&mut self) -> Result<(), AppError> {
    let mut i2c = self.i2c.borrow_mut();
    write_reg(&mut i2c, ILPS28QSW_ADDRESS, REG_CTRL_REG2, CTRL_REG2_SWRESET)?;

    // The reset bit self-clears within a few register clock cycles.
    for _ in 0..100 {
      let ctrl = read_reg(&mut i2c, ILPS28QSW_ADDRESS, REG_CTRL_REG2)?;

      if ctrl & CTRL_REG2_SWRESET == 0 {
        return Ok(());
      }

      FreeRtos::delay_ms(1);
    }

    Err(AppError::SensorError(format!(
      "Reset did not complete on sensor at address 0x{:02x}",
      ILPS28QSW_ADDRESS
    )))
  }

  /// Configure continuous measurement: block data update, register
  /// auto-increment, 4 Hz output data rate with 16 sample averaging.
  ///
  /// # Returns
  /// The result of the operation.
  pub fn configure(&mut self) -> Result<(), AppError> {
    let mut i2c = self.i2c.borrow_mut();

    write_reg(&mut i2c, ILPS28QSW_ADDRESS, REG_CTRL_REG2, CTRL_REG2_BDU)?;

    // Auto-increment on, analog hub disabled to save power.
    write_reg(&mut i2c, ILPS28QSW_ADDRESS, REG_CTRL_REG3, CTRL_REG3_IF_ADD_INC)?;

    write_reg(&mut i2c, ILPS28QSW_ADDRESS, REG_CTRL_REG1, CTRL_REG1_MODE)?;

    info!(" - Output Data Rate                    : 4 Hz, 16 sample average");

    Ok(())
  }

  /// Park the sensor in power down mode (output data rate off).
  ///
  /// # Returns
  /// The result of the operation.
  pub fn power_down(&mut self) -> Result<(), AppError> {
    let mut i2c = self.i2c.borrow_mut();
    write_reg(&mut i2c, ILPS28QSW_ADDRESS, REG_CTRL_REG1, 0x00)
  }

  /// Read the latest pressure and temperature sample.
  ///
  /// # Returns
  /// Pressure in hPa and temperature in °C.
  pub fn read(&mut self) -> Result<(f64, f64), AppError> {
    let mut i2c = self.i2c.borrow_mut();

    let mut pressure = [0u8; 3];
    read_regs(&mut i2c, ILPS28QSW_ADDRESS, REG_PRESS_OUT_XL, &mut pressure)?;

    let mut temperature = [0u8; 2];
    read_regs(&mut i2c, ILPS28QSW_ADDRESS, REG_TEMP_OUT_L, &mut temperature)?;

    Ok((
      pressure_hpa(pressure_raw(pressure)),
      temperature_c(i16::from_le_bytes(temperature)),
    ))
  }
}
