use crate::board::EnvBus;
use crate::error::AppError;
use crate::sensors::{read_reg, read_regs, write_reg};
use shield_core::bh1730::{integration_time_us, lux, ITIME_50MS};

/// BH1730FVC I2C address.
const BH1730_ADDRESS: u8 = 0x29;

/// Command opcode prefix for register access.
const CMD_REGISTER: u8 = 0x80;

/// Control register: power, ADC enable, data valid.
const REG_CONTROL: u8 = 0x00;

/// Integration time register.
const REG_TIMING: u8 = 0x01;

/// Gain register.
const REG_GAIN: u8 = 0x07;

/// Part number / revision register.
const REG_ID: u8 = 0x12;

/// Visible channel data, low byte first.
const REG_DATA0_LOW: u8 = 0x14;

/// IR channel data, low byte first.
const REG_DATA1_LOW: u8 = 0x16;

/// CONTROL: internal oscillator on.
const CONTROL_POWER: u8 = 0x01;

/// CONTROL: continuous ADC measurement.
const CONTROL_ADC_EN: u8 = 0x02;

/// CONTROL: measurement data is valid.
const CONTROL_ADC_VALID: u8 = 0x10;

/// Gain register value for x64.
const GAIN_X64_REG: u8 = 0x02;

/// Gain factor configured by `GAIN_X64_REG`.
const GAIN_X64: u8 = 64;

/// BH1730FVC ambient light sensor interface.
pub struct Bh1730 {
  /// The environmental I2C bus.
  i2c: EnvBus,

  /// The configured gain factor.
  gain: u8,

  /// The configured integration time register value.
  itime: u8,
}

/// The BH1730FVC sensor implementation.
impl Bh1730 {
  /// Create a new BH1730FVC sensor.
  ///
  /// # Parameters
  /// - `i2c`: The environmental I2C bus.
  ///
  /// # Returns
  /// The BH1730FVC sensor.
  pub fn new(i2c: EnvBus) -> Self {
    Self {
      i2c,
      gain: GAIN_X64,
      itime: ITIME_50MS,
    }
  }

  /// Turn the oscillator and ADC on.
  ///
  /// # Returns
  /// The result of the operation.
  pub fn power_on(&mut self) -> Result<(), AppError> {
    let mut i2c = self.i2c.borrow_mut();
    write_reg(
      &mut i2c,
      BH1730_ADDRESS,
      CMD_REGISTER | REG_CONTROL,
      CONTROL_POWER | CONTROL_ADC_EN,
    )
  }

  /// Turn the sensor off.
  ///
  /// # Returns
  /// The result of the operation.
  pub fn power_down(&mut self) -> Result<(), AppError> {
    let mut i2c = self.i2c.borrow_mut();
    write_reg(&mut i2c, BH1730_ADDRESS, CMD_REGISTER | REG_CONTROL, 0x00)
  }

  /// Configure gain and integration time (x64, ~50 ms).
  ///
  /// # Returns
  /// The result of the operation.
  pub fn configure(&mut self) -> Result<(), AppError> {
    let mut i2c = self.i2c.borrow_mut();

    write_reg(&mut i2c, BH1730_ADDRESS, CMD_REGISTER | REG_TIMING, self.itime)?;
    write_reg(&mut i2c, BH1730_ADDRESS, CMD_REGISTER | REG_GAIN, GAIN_X64_REG)?;

    log::info!(
      " - Integration Time                    : {:.2} ms",
      integration_time_us(self.itime) as f64 / 1000.0
    );
    log::info!(" - Gain                                : x{}", self.gain);

    Ok(())
  }

  /// Read the part number register.
  ///
  /// # Returns
  /// The part number / revision byte.
  pub fn part_id(&mut self) -> Result<u8, AppError> {
    let mut i2c = self.i2c.borrow_mut();
    read_reg(&mut i2c, BH1730_ADDRESS, CMD_REGISTER | REG_ID)
  }

  /// Read the measurement valid flag.
  ///
  /// # Returns
  /// Whether the current data registers hold a completed measurement.
  pub fn data_valid(&mut self) -> Result<bool, AppError> {
    let mut i2c = self.i2c.borrow_mut();
    let control = read_reg(&mut i2c, BH1730_ADDRESS, CMD_REGISTER | REG_CONTROL)?;

    Ok(control & CONTROL_ADC_VALID != 0)
  }

  /// Read the visible channel counts.
  ///
  /// # Returns
  /// The visible channel counts.
  pub fn read_visible(&mut self) -> Result<u16, AppError> {
    let mut i2c = self.i2c.borrow_mut();
    let mut data = [0u8; 2];
    read_regs(&mut i2c, BH1730_ADDRESS, CMD_REGISTER | REG_DATA0_LOW, &mut data)?;

    Ok(u16::from_le_bytes(data))
  }

  /// Read the IR channel counts.
  ///
  /// # Returns
  /// The IR channel counts.
  pub fn read_ir(&mut self) -> Result<u16, AppError> {
    let mut i2c = self.i2c.borrow_mut();
    let mut data = [0u8; 2];
    read_regs(&mut i2c, BH1730_ADDRESS, CMD_REGISTER | REG_DATA1_LOW, &mut data)?;

    Ok(u16::from_le_bytes(data))
  }

  /// Read both channels and compute the illuminance.
  ///
  /// # Returns
  /// The illuminance in lux.
  pub fn read_lux(&mut self) -> Result<u32, AppError> {
    let visible = self.read_visible()?;
    let ir = self.read_ir()?;

    Ok(lux(visible, ir, self.gain, self.itime))
  }
}
