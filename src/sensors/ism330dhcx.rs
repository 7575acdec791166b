use crate::board::SystemBus;
use crate::error::AppError;
use crate::sensors::{read_reg, read_regs, write_reg};
use esp_idf_svc::hal::delay::FreeRtos;
use shield_core::motion::{
  accel_sensitivity_mg, convert_axes, gyro_sensitivity_mdps, AccelFullScale, GyroFullScale,
};

/// ISM330DHCX I2C address.
const ISM330DHCX_ADDRESS: u8 = 0x6a;

/// Device identification register.
const REG_WHO_AM_I: u8 = 0x0f;

/// FIFO control register 4: FIFO mode.
const REG_FIFO_CTRL4: u8 = 0x0a;

/// Accelerometer control register: output data rate and full scale.
const REG_CTRL1_XL: u8 = 0x10;

/// Gyroscope control register: output data rate and full scale.
const REG_CTRL2_G: u8 = 0x11;

/// Common control register: reset, block data update, auto-increment.
const REG_CTRL3_C: u8 = 0x12;

/// Gyroscope output, low byte first.
const REG_OUTX_L_G: u8 = 0x22;

/// Accelerometer output, low byte first.
const REG_OUTX_L_A: u8 = 0x28;

/// WHO_AM_I response.
pub const CHIP_ID: u8 = 0x6b;

/// CTRL3_C software reset bit.
const CTRL3_SW_RESET: u8 = 0x01;

/// CTRL3_C register auto-increment bit.
const CTRL3_IF_INC: u8 = 0x04;

/// CTRL3_C block data update bit.
const CTRL3_BDU: u8 = 0x40;

/// FIFO bypass mode.
const FIFO_BYPASS: u8 = 0x00;

/// CTRL1_XL: 12.5 Hz output data rate, ±2 g full scale.
const CTRL1_ODR_12HZ5_FS_2G: u8 = 0x10;

/// CTRL2_G: 12.5 Hz output data rate, 2000 dps full scale.
const CTRL2_ODR_12HZ5_FS_2000DPS: u8 = 0x1c;

/// ISM330DHCX IMU interface. Exercised by the self test only; the IMU does
/// not contribute to the CSV record.
pub struct Ism330Dhcx {
  /// The system I2C bus.
  i2c: SystemBus,
}

/// The ISM330DHCX sensor implementation.
impl Ism330Dhcx {
  /// Create a new ISM330DHCX sensor.
  ///
  /// # Parameters
  /// - `i2c`: The system I2C bus.
  ///
  /// # Returns
  /// The ISM330DHCX sensor.
  pub fn new(i2c: SystemBus) -> Self {
    Self { i2c }
  }

  /// Read the device identification register.
  ///
  /// # Returns
  /// The chip id.
  pub fn chip_id(&mut self) -> Result<u8, AppError> {
    let mut i2c = self.i2c.lock().unwrap();
    read_reg(&mut i2c, ISM330DHCX_ADDRESS, REG_WHO_AM_I)
  }

  /// Reset the device, then configure block data update, register
  /// auto-increment, FIFO bypass, and 12.5 Hz output on both sensors.
  ///
  /// # Returns
  /// The result of the operation.
  pub fn configure(&mut self) -> Result<(), AppError> {
    let mut i2c = self.i2c.lock().unwrap();

    write_reg(&mut i2c, ISM330DHCX_ADDRESS, REG_CTRL3_C, CTRL3_SW_RESET)?;
    drop(i2c);
    FreeRtos::delay_ms(20);

    let mut i2c = self.i2c.lock().unwrap();
    write_reg(
      &mut i2c,
      ISM330DHCX_ADDRESS,
      REG_CTRL3_C,
      CTRL3_BDU | CTRL3_IF_INC,
    )?;
    write_reg(&mut i2c, ISM330DHCX_ADDRESS, REG_FIFO_CTRL4, FIFO_BYPASS)?;
    write_reg(
      &mut i2c,
      ISM330DHCX_ADDRESS,
      REG_CTRL1_XL,
      CTRL1_ODR_12HZ5_FS_2G,
    )?;
    write_reg(
      &mut i2c,
      ISM330DHCX_ADDRESS,
      REG_CTRL2_G,
      CTRL2_ODR_12HZ5_FS_2000DPS,
    )
  }

  /// Read the acceleration in mg at the configured ±2 g full scale.
  ///
  /// # Returns
  /// The acceleration per axis.
  pub fn read_acceleration_mg(&mut self) -> Result<[f64; 3], AppError> {
    let raw = self.read_axes(REG_OUTX_L_A)?;

    Ok(convert_axes(
      raw,
      accel_sensitivity_mg(AccelFullScale::Fs2g),
    ))
  }

  /// Read the angular rate in mdps at the configured 2000 dps full scale.
  ///
  /// # Returns
  /// The angular rate per axis.
  pub fn read_angular_rate_mdps(&mut self) -> Result<[f64; 3], AppError> {
    let raw = self.read_axes(REG_OUTX_L_G)?;

    Ok(convert_axes(
      raw,
      gyro_sensitivity_mdps(GyroFullScale::Fs2000Dps),
    ))
  }

  /// Read one three-axis output block.
  ///
  /// # Parameters
  /// - `register`: The first output register.
  ///
  /// # Returns
  /// The raw axis values.
  fn read_axes(&mut self, register: u8) -> Result<[i16; 3], AppError> {
    let mut i2c = self.i2c.lock().unwrap();

    let mut data = [0u8; 6];
    read_regs(&mut i2c, ISM330DHCX_ADDRESS, register, &mut data)?;

    Ok([
      i16::from_le_bytes([data[0], data[1]]),
      i16::from_le_bytes([data[2], data[3]]),
      i16::from_le_bytes([data[4], data[5]]),
    ])
  }
}
