use crate::board::{RailPin, SystemBus};
use crate::error::AppError;
use crate::sensors::{sensirion_read, sensirion_send, POWER_SETTLE_MS};
use esp_idf_svc::hal::delay::FreeRtos;
use log::info;
use shield_core::sensirion::read_words;
use shield_core::sgp41::{parse_raw_signals, parse_word};

/// Command to run the conditioning phase.
const CMD_EXECUTE_CONDITIONING: u16 = 0x2612;

/// Command to measure the raw VOC and NOx signals.
const CMD_MEASURE_RAW_SIGNALS: u16 = 0x2619;

/// Command to run the built-in self test.
const CMD_EXECUTE_SELF_TEST: u16 = 0x280e;

/// Command to read the serial number.
const CMD_GET_SERIAL_NUMBER: u16 = 0x3682;

/// Command to turn the hotplate heater off.
const CMD_TURN_HEATER_OFF: u16 = 0x3615;

/// SGP41 I2C address.
const SGP41_ADDRESS: u8 = 0x59;

/// Raw signal measurement duration in milliseconds.
const MEASURE_DELAY_MS: u32 = 50;

/// Self test duration in milliseconds.
const SELF_TEST_DELAY_MS: u32 = 320;

/// SGP41 VOC/NOx sensor interface.
pub struct Sgp41 {
  /// The system I2C bus.
  i2c: SystemBus,

  /// The sensor power rail.
  power: RailPin,

  /// The sensor I2C bus-enable line.
  bus_enable: RailPin,
}

/// The SGP41 sensor implementation.
impl Sgp41 {
  /// Create a new SGP41 sensor.
  ///
  /// # Parameters
  /// - `i2c`: The system I2C bus.
  /// - `power`: The sensor power rail.
  /// - `bus_enable`: The sensor I2C bus-enable line.
  ///
  /// # Returns
  /// The SGP41 sensor.
  pub fn new(i2c: SystemBus, power: RailPin, bus_enable: RailPin) -> Self {
    Self {
      i2c,
      power,
      bus_enable,
    }
  }

  /// Assert the power and bus-enable lines.
  ///
  /// # Returns
  /// The result of the operation.
  pub fn power_on(&mut self) -> Result<(), AppError> {
    info!(" - Turn on SGP41");

    self.power
      .set_high()
      .map_err(|e| AppError::GpioError(format!("SGP41 EN GPIO configuration error: {:?}", e)))?;

    self.bus_enable
      .set_high()
      .map_err(|e| AppError::GpioError(format!("SGP41 I2C EN GPIO configuration error: {:?}", e)))?;

    // Wait for I2C bus to be ready
    FreeRtos::delay_ms(POWER_SETTLE_MS);

    Ok(())
  }

  /// Release the bus-enable and power lines.
  ///
  /// # Returns
  /// The result of the operation.
  pub fn power_off(&mut self) -> Result<(), AppError> {
    info!(" - Power off SGP41");

    self.bus_enable
      .set_low()
      .map_err(|e| AppError::GpioError(format!("SGP41 I2C EN GPIO configuration error: {:?}", e)))?;

    self.power
      .set_low()
      .map_err(|e| AppError::GpioError(format!("SGP41 EN GPIO configuration error: {:?}", e)))
  }

  /// Run one conditioning step with the given compensation ticks.
  ///
  /// # Parameters
  /// - `humidity_ticks`: Relative humidity compensation ticks.
  /// - `temperature_ticks`: Temperature compensation ticks.
  ///
  /// # Returns
  /// The raw VOC signal measured during conditioning.
  pub fn execute_conditioning(
    &mut self,
    humidity_ticks: u16,
    temperature_ticks: u16,
  ) -> Result<u16, AppError> {
    let mut i2c = self.i2c.lock().unwrap();
    sensirion_send(
      &mut i2c,
      SGP41_ADDRESS,
      CMD_EXECUTE_CONDITIONING,
      &[humidity_ticks, temperature_ticks],
    )?;

    let mut buffer = [0u8; 3];
    sensirion_read(&mut i2c, SGP41_ADDRESS, MEASURE_DELAY_MS, &mut buffer)?;

    parse_word(&buffer).map_err(|e| {
      AppError::SensorError(format!(
        "Invalid conditioning response from sensor at address 0x{:02x}: {}",
        SGP41_ADDRESS, e
      ))
    })
  }

  /// Measure the raw VOC and NOx signals.
  ///
  /// # Parameters
  /// - `humidity_ticks`: Relative humidity compensation ticks.
  /// - `temperature_ticks`: Temperature compensation ticks.
  ///
  /// # Returns
  /// The raw VOC and NOx signals.
  pub fn measure_raw_signals(
    &mut self,
    humidity_ticks: u16,
    temperature_ticks: u16,
  ) -> Result<(u16, u16), AppError> {
    let mut i2c = self.i2c.lock().unwrap();
    sensirion_send(
      &mut i2c,
      SGP41_ADDRESS,
      CMD_MEASURE_RAW_SIGNALS,
      &[humidity_ticks, temperature_ticks],
    )?;

    let mut buffer = [0u8; 6];
    sensirion_read(&mut i2c, SGP41_ADDRESS, MEASURE_DELAY_MS, &mut buffer)?;

    parse_raw_signals(&buffer).map_err(|e| {
      AppError::SensorError(format!(
        "Invalid raw signal response from sensor at address 0x{:02x}: {}",
        SGP41_ADDRESS, e
      ))
    })
  }

  /// Run the built-in self test.
  ///
  /// # Returns
  /// The raw self test result word.
  pub fn execute_self_test(&mut self) -> Result<u16, AppError> {
    let mut i2c = self.i2c.lock().unwrap();
    sensirion_send(&mut i2c, SGP41_ADDRESS, CMD_EXECUTE_SELF_TEST, &[])?;

    let mut buffer = [0u8; 3];
    sensirion_read(&mut i2c, SGP41_ADDRESS, SELF_TEST_DELAY_MS, &mut buffer)?;

    parse_word(&buffer).map_err(|e| {
      AppError::SensorError(format!(
        "Invalid self test response from sensor at address 0x{:02x}: {}",
        SGP41_ADDRESS, e
      ))
    })
  }

  /// Read the serial number.
  ///
  /// # Returns
  /// The serial number.
  pub fn serial_number(&mut self) -> Result<u64, AppError> {
    let mut i2c = self.i2c.lock().unwrap();
    sensirion_send(&mut i2c, SGP41_ADDRESS, CMD_GET_SERIAL_NUMBER, &[])?;

    let mut buffer = [0u8; 9];
    sensirion_read(&mut i2c, SGP41_ADDRESS, 1, &mut buffer)?;

    let words = read_words::<3>(&buffer).map_err(|e| {
      AppError::SensorError(format!(
        "Invalid serial number from sensor at address 0x{:02x}: {}",
        SGP41_ADDRESS, e
      ))
    })?;

    Ok(((words[0] as u64) << 32) | ((words[1] as u64) << 16) | words[2] as u64)
  }

  /// Turn the hotplate heater off.
  ///
  /// # Returns
  /// The result of the operation.
  pub fn turn_heater_off(&mut self) -> Result<(), AppError> {
    info!(" - Turn off heater of SGP41");

    let mut i2c = self.i2c.lock().unwrap();
    sensirion_send(&mut i2c, SGP41_ADDRESS, CMD_TURN_HEATER_OFF, &[])?;
    drop(i2c);

    FreeRtos::delay_ms(1);

    Ok(())
  }
}
