use crate::board::SystemBus;
use crate::error::AppError;
use crate::sensors::{read_reg, read_regs, write_reg};
use esp_idf_svc::hal::delay::FreeRtos;
use shield_core::motion::{lis2duxs12_accel_mg, lis2duxs12_temperature_c};

/// LIS2DUXS12 I2C address.
const LIS2DUXS12_ADDRESS: u8 = 0x19;

/// Device identification register.
const REG_WHO_AM_I: u8 = 0x0f;

/// Control register 1: software reset.
const REG_CTRL1: u8 = 0x10;

/// Control register 5: output data rate, bandwidth, full scale.
const REG_CTRL5: u8 = 0x17;

/// Temperature output, low byte first.
const REG_OUT_T_L: u8 = 0x26;

/// Acceleration output, low byte first.
const REG_OUT_X_L: u8 = 0x28;

/// WHO_AM_I response.
pub const CHIP_ID: u8 = 0x47;

/// CTRL1 software reset bit.
const CTRL1_SW_RESET: u8 = 0x20;

/// CTRL5: 1.6 Hz ultra low power rate, bandwidth ODR/16, ±2 g full scale.
const CTRL5_MODE: u8 = 0x1c;

/// Wake-up time from deep power down in milliseconds.
const WAKE_UP_MS: u32 = 25;

/// LIS2DUXS12 accelerometer interface. Exercised by the self test only; the
/// accelerometer does not contribute to the CSV record.
pub struct Lis2duxs12 {
  /// The system I2C bus.
  i2c: SystemBus,
}

/// The LIS2DUXS12 sensor implementation.
impl Lis2duxs12 {
  /// Create a new LIS2DUXS12 sensor.
  ///
  /// # Parameters
  /// - `i2c`: The system I2C bus.
  ///
  /// # Returns
  /// The LIS2DUXS12 sensor.
  pub fn new(i2c: SystemBus) -> Self {
    Self { i2c }
  }

  /// Leave deep power down. Any bus activity on the device address wakes the
  /// part; the first transaction is not acknowledged.
  pub fn exit_deep_power_down(&mut self) {
    let mut i2c = self.i2c.lock().unwrap();

    let mut probe = [0u8; 1];
    let _ = i2c.read(LIS2DUXS12_ADDRESS, &mut probe, crate::sensors::I2C_TIMEOUT);

    FreeRtos::delay_ms(WAKE_UP_MS);
  }

  /// Read the device identification register.
  ///
  /// # Returns
  /// The chip id.
  pub fn chip_id(&mut self) -> Result<u8, AppError> {
    let mut i2c = self.i2c.lock().unwrap();
    read_reg(&mut i2c, LIS2DUXS12_ADDRESS, REG_WHO_AM_I)
  }

  /// Reset the device and wait for the reset to complete.
  ///
  /// # Returns
  /// The result of the operation.
  pub fn reset(&mut self) -> Result<(), AppError> {
    let mut i2c = self.i2c.lock().unwrap();
    write_reg(&mut i2c, LIS2DUXS12_ADDRESS, REG_CTRL1, CTRL1_SW_RESET)?;

    for _ in 0..100 {
      let ctrl = read_reg(&mut i2c, LIS2DUXS12_ADDRESS, REG_CTRL1)?;

      if ctrl & CTRL1_SW_RESET == 0 {
        return Ok(());
      }

      FreeRtos::delay_ms(1);
    }

    Err(AppError::SensorError(format!(
      "Reset did not complete on sensor at address 0x{:02x}",
      LIS2DUXS12_ADDRESS
    )))
  }

  /// Configure 1.6 Hz ultra low power mode at ±2 g full scale.
  ///
  /// # Returns
  /// The result of the operation.
  pub fn configure(&mut self) -> Result<(), AppError> {
    let mut i2c = self.i2c.lock().unwrap();
    write_reg(&mut i2c, LIS2DUXS12_ADDRESS, REG_CTRL5, CTRL5_MODE)
  }

  /// Read the acceleration in mg.
  ///
  /// # Returns
  /// The acceleration per axis.
  pub fn read_acceleration_mg(&mut self) -> Result<[f64; 3], AppError> {
    let mut i2c = self.i2c.lock().unwrap();

    let mut data = [0u8; 6];
    read_regs(&mut i2c, LIS2DUXS12_ADDRESS, REG_OUT_X_L, &mut data)?;

    Ok([
      lis2duxs12_accel_mg(i16::from_le_bytes([data[0], data[1]])),
      lis2duxs12_accel_mg(i16::from_le_bytes([data[2], data[3]])),
      lis2duxs12_accel_mg(i16::from_le_bytes([data[4], data[5]])),
    ])
  }

  /// Read the die temperature in °C.
  ///
  /// # Returns
  /// The temperature.
  pub fn read_temperature_c(&mut self) -> Result<f64, AppError> {
    let mut i2c = self.i2c.lock().unwrap();

    let mut data = [0u8; 2];
    read_regs(&mut i2c, LIS2DUXS12_ADDRESS, REG_OUT_T_L, &mut data)?;

    Ok(lis2duxs12_temperature_c(i16::from_le_bytes(data)))
  }
}
