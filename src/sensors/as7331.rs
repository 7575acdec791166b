use crate::board::{EnvBus, RailPin, SensePin};
use crate::error::AppError;
use crate::sensors::{read_reg, read_regs, write_reg, POWER_SETTLE_MS};
use esp_idf_svc::hal::delay::FreeRtos;
use log::info;
use shield_core::as7331::{Status, UvReading};

/// AS7331 I2C address.
const AS7331_ADDRESS: u8 = 0x74;

/// Operational state register (both device states).
const REG_OSR: u8 = 0x00;

/// Chip id register (configuration state).
const REG_AGEN: u8 = 0x02;

/// Configuration register 1: gain and conversion time.
const REG_CREG1: u8 = 0x06;

/// Configuration register 3: measurement mode, standby, clock.
const REG_CREG3: u8 = 0x08;

/// Break time register.
const REG_BREAK: u8 = 0x09;

/// Temperature output register (measurement state).
const REG_TEMP: u8 = 0x01;

/// OSR: start measurement.
const OSR_SS: u8 = 0x80;

/// OSR: power down.
const OSR_PD: u8 = 0x40;

/// OSR: software reset.
const OSR_SW_RES: u8 = 0x08;

/// OSR device operating state: configuration.
const OSR_DOS_CONFIGURATION: u8 = 0x02;

/// OSR device operating state: measurement.
const OSR_DOS_MEASUREMENT: u8 = 0x03;

/// Chip id of the AS7331.
pub const CHIP_ID: u8 = 0x21;

/// Command measurement mode (one shot, externally triggered).
const MMODE_CMD: u8 = 0x40;

/// Internal clock selection: 1.024 MHz.
const CCLK_1024: u8 = 0x00;

/// Sample break time: 8 us steps.
const BREAK_TIME: u8 = 255;

/// ADC gain code: gain = 2^(11 - code), code 10 -> x2.
const GAIN_CODE: u8 = 10;

/// Conversion time code: 2^code ms, code 11 -> 2048 ms.
const TIME_CODE: u8 = 11;

/// AS7331 UV sensor interface. Data-ready is signalled on a dedicated GPIO
/// line rather than by polling the status register.
pub struct As7331 {
  /// The environmental I2C bus.
  i2c: EnvBus,

  /// The sensor I2C bus-enable line.
  bus_enable: RailPin,

  /// The data-ready input line.
  ready: SensePin,
}

/// The AS7331 sensor implementation.
impl As7331 {
  /// Create a new AS7331 sensor.
  ///
  /// # Parameters
  /// - `i2c`: The environmental I2C bus.
  /// - `bus_enable`: The sensor I2C bus-enable line.
  /// - `ready`: The data-ready input line.
  ///
  /// # Returns
  /// The AS7331 sensor.
  pub fn new(i2c: EnvBus, bus_enable: RailPin, ready: SensePin) -> Self {
    Self {
      i2c,
      bus_enable,
      ready,
    }
  }

  /// Connect the sensor to the I2C bus and leave the power down state.
  ///
  /// # Returns
  /// The result of the operation.
  pub fn power_on(&mut self) -> Result<(), AppError> {
    info!(" - Turn on AS7331");

    self.bus_enable
      .set_high()
      .map_err(|e| AppError::GpioError(format!("AS7331 I2C EN GPIO configuration error: {:?}", e)))?;

    // Wait for I2C bus to be ready
    FreeRtos::delay_ms(POWER_SETTLE_MS);

    self.power_up()
  }

  /// Enter the power down state and disconnect the sensor from the bus.
  ///
  /// # Returns
  /// The result of the operation.
  pub fn power_off(&mut self) -> Result<(), AppError> {
    info!(" - Power off AS7331");

    self.power_down()?;

    self.bus_enable
      .set_low()
      .map_err(|e| AppError::GpioError(format!("AS7331 I2C EN GPIO configuration error: {:?}", e)))
  }

  /// Clear the power down bit.
  ///
  /// # Returns
  /// The result of the operation.
  pub fn power_up(&mut self) -> Result<(), AppError> {
    let mut i2c = self.i2c.borrow_mut();
    let osr = read_reg(&mut i2c, AS7331_ADDRESS, REG_OSR)?;

    write_reg(&mut i2c, AS7331_ADDRESS, REG_OSR, osr & !OSR_PD)
  }

  /// Set the power down bit.
  ///
  /// # Returns
  /// The result of the operation.
  pub fn power_down(&mut self) -> Result<(), AppError> {
    let mut i2c = self.i2c.borrow_mut();
    let osr = read_reg(&mut i2c, AS7331_ADDRESS, REG_OSR)?;

    write_reg(&mut i2c, AS7331_ADDRESS, REG_OSR, osr | OSR_PD)
  }

  /// Software reset. The sensor wakes up in configuration state.
  ///
  /// # Returns
  /// The result of the operation.
  pub fn reset(&mut self) -> Result<(), AppError> {
    let mut i2c = self.i2c.borrow_mut();
    write_reg(&mut i2c, AS7331_ADDRESS, REG_OSR, OSR_SW_RES)?;
    drop(i2c);

    FreeRtos::delay_ms(1);

    Ok(())
  }

  /// Switch to the configuration state.
  ///
  /// # Returns
  /// The result of the operation.
  pub fn set_configuration_mode(&mut self) -> Result<(), AppError> {
    let mut i2c = self.i2c.borrow_mut();
    write_reg(&mut i2c, AS7331_ADDRESS, REG_OSR, OSR_DOS_CONFIGURATION)
  }

  /// Switch to the measurement state.
  ///
  /// # Returns
  /// The result of the operation.
  pub fn set_measurement_mode(&mut self) -> Result<(), AppError> {
    let mut i2c = self.i2c.borrow_mut();
    write_reg(&mut i2c, AS7331_ADDRESS, REG_OSR, OSR_DOS_MEASUREMENT)
  }

  /// Read the chip id (configuration state only).
  ///
  /// # Returns
  /// The chip id.
  pub fn chip_id(&mut self) -> Result<u8, AppError> {
    let mut i2c = self.i2c.borrow_mut();
    read_reg(&mut i2c, AS7331_ADDRESS, REG_AGEN)
  }

  /// Write the measurement configuration: command mode, 1.024 MHz clock,
  /// gain x2, 2048 ms conversion time (configuration state only).
  ///
  /// # Returns
  /// The result of the operation.
  pub fn configure(&mut self) -> Result<(), AppError> {
    let mut i2c = self.i2c.borrow_mut();

    write_reg(
      &mut i2c,
      AS7331_ADDRESS,
      REG_CREG1,
      (GAIN_CODE << 4) | TIME_CODE,
    )?;
    write_reg(&mut i2c, AS7331_ADDRESS, REG_CREG3, MMODE_CMD | CCLK_1024)?;
    write_reg(&mut i2c, AS7331_ADDRESS, REG_BREAK, BREAK_TIME)
  }

  /// Start a one shot measurement (measurement state only).
  ///
  /// # Returns
  /// The result of the operation.
  pub fn start_measurement(&mut self) -> Result<(), AppError> {
    let mut i2c = self.i2c.borrow_mut();
    let osr = read_reg(&mut i2c, AS7331_ADDRESS, REG_OSR)?;

    write_reg(&mut i2c, AS7331_ADDRESS, REG_OSR, osr | OSR_SS)
  }

  /// Whether the data-ready line is asserted.
  pub fn data_ready(&self) -> bool {
    self.ready.is_high()
  }

  /// Read the status word of the measurement state.
  ///
  /// # Returns
  /// The decoded status.
  pub fn status(&mut self) -> Result<Status, AppError> {
    let mut i2c = self.i2c.borrow_mut();

    let mut word = [0u8; 2];
    read_regs(&mut i2c, AS7331_ADDRESS, REG_OSR, &mut word)?;

    Ok(Status::from_byte(word[1]))
  }

  /// Read temperature and all three UV channels in one burst.
  ///
  /// # Returns
  /// The UV reading.
  pub fn read_all(&mut self) -> Result<UvReading, AppError> {
    let mut i2c = self.i2c.borrow_mut();

    let mut data = [0u8; 8];
    read_regs(&mut i2c, AS7331_ADDRESS, REG_TEMP, &mut data)?;

    Ok(UvReading::from_le_bytes(data))
  }
}
