use crate::board::{RailPin, SystemBus};
use crate::error::AppError;
use crate::sensors::{sensirion_read, sensirion_send, POWER_SETTLE_MS};
use esp_idf_svc::hal::delay::FreeRtos;
use log::info;
use shield_core::scd41::{data_ready, parse_measurement, RawMeasurement};
use shield_core::sensirion::read_words;

/// Command to read measurement.
const CMD_READ_MEASUREMENT: u16 = 0xec05;

/// Command to start periodic measurement.
const CMD_START_PERIODIC_MEASUREMENT: u16 = 0x21b1;

/// Command to stop periodic measurement.
const CMD_STOP_PERIODIC_MEASUREMENT: u16 = 0x3f86;

/// Command to read the data ready status.
const CMD_GET_DATA_READY_STATUS: u16 = 0xe4b8;

/// Command to read the serial number.
const CMD_GET_SERIAL_NUMBER: u16 = 0x3682;

/// Command to trigger a single shot measurement.
const CMD_MEASURE_SINGLE_SHOT: u16 = 0x219d;

/// Command to wake the sensor up.
const CMD_WAKE_UP: u16 = 0x36f6;

/// Command to enter the power down state.
const CMD_POWER_DOWN: u16 = 0x36e0;

/// SCD41 I2C address.
const SCD41_ADDRESS: u8 = 0x62;

/// SCD41 CO2 sensor interface.
pub struct Scd41 {
  /// The system I2C bus.
  i2c: SystemBus,

  /// The sensor power rail.
  power: RailPin,

  /// The sensor I2C bus-enable line.
  bus_enable: RailPin,
}

/// The SCD41 sensor implementation.
impl Scd41 {
  /// Create a new SCD41 sensor.
  ///
  /// # Parameters
  /// - `i2c`: The system I2C bus.
  /// - `power`: The sensor power rail.
  /// - `bus_enable`: The sensor I2C bus-enable line.
  ///
  /// # Returns
  /// The SCD41 sensor.
  pub fn new(i2c: SystemBus, power: RailPin, bus_enable: RailPin) -> Self {
    Self {
      i2c,
      power,
      bus_enable,
    }
  }

  /// Assert the power and bus-enable lines, then wake the sensor.
  ///
  /// # Returns
  /// The result of the operation.
  pub fn power_on(&mut self) -> Result<(), AppError> {
    info!(" - Turn on SCD41");

    self.power
      .set_high()
      .map_err(|e| AppError::GpioError(format!("SCD41 EN GPIO configuration error: {:?}", e)))?;

    self.bus_enable
      .set_high()
      .map_err(|e| AppError::GpioError(format!("SCD41 I2C EN GPIO init error: {:?}", e)))?;

    // Wait for I2C bus to be ready
    FreeRtos::delay_ms(POWER_SETTLE_MS);

    // The wake-up command is not acknowledged from the power down state.
    let mut i2c = self.i2c.lock().unwrap();
    let _ = sensirion_send(&mut i2c, SCD41_ADDRESS, CMD_WAKE_UP, &[]);
    drop(i2c);

    FreeRtos::delay_ms(30);

    Ok(())
  }

  /// Enter the power down state and release the power and bus-enable lines.
  ///
  /// # Returns
  /// The result of the operation.
  pub fn power_off(&mut self) -> Result<(), AppError> {
    info!(" - Power off SCD41");

    {
      let mut i2c = self.i2c.lock().unwrap();
      sensirion_send(&mut i2c, SCD41_ADDRESS, CMD_POWER_DOWN, &[])?;
    }

    self.power
      .set_low()
      .map_err(|e| AppError::GpioError(format!("SCD41 EN GPIO configuration error: {:?}", e)))?;

    self.bus_enable
      .set_low()
      .map_err(|e| AppError::GpioError(format!("SCD41 I2C EN GPIO configuration error: {:?}", e)))
  }

  /// Start periodic measurement.
  ///
  /// # Returns
  /// The result of the operation.
  pub fn start_periodic_measurement(&mut self) -> Result<(), AppError> {
    let mut i2c = self.i2c.lock().unwrap();
    sensirion_send(&mut i2c, SCD41_ADDRESS, CMD_START_PERIODIC_MEASUREMENT, &[])
  }

  /// Stop periodic measurement.
  ///
  /// # Returns
  /// The result of the operation.
  pub fn stop_periodic_measurement(&mut self) -> Result<(), AppError> {
    let mut i2c = self.i2c.lock().unwrap();
    sensirion_send(&mut i2c, SCD41_ADDRESS, CMD_STOP_PERIODIC_MEASUREMENT, &[])?;
    drop(i2c);

    FreeRtos::delay_ms(500);

    Ok(())
  }

  /// Trigger a single shot measurement; poll the data ready status for the
  /// result.
  ///
  /// # Returns
  /// The result of the operation.
  pub fn measure_single_shot(&mut self) -> Result<(), AppError> {
    let mut i2c = self.i2c.lock().unwrap();
    sensirion_send(&mut i2c, SCD41_ADDRESS, CMD_MEASURE_SINGLE_SHOT, &[])
  }

  /// Read the data ready status.
  ///
  /// # Returns
  /// Whether a measurement is ready to read.
  pub fn data_ready(&mut self) -> Result<bool, AppError> {
    let mut i2c = self.i2c.lock().unwrap();
    sensirion_send(&mut i2c, SCD41_ADDRESS, CMD_GET_DATA_READY_STATUS, &[])?;

    let mut buffer = [0u8; 3];
    sensirion_read(&mut i2c, SCD41_ADDRESS, 1, &mut buffer)?;

    let [word] = read_words::<1>(&buffer).map_err(|e| {
      AppError::SensorError(format!(
        "Invalid data ready response from sensor at address 0x{:02x}: {}",
        SCD41_ADDRESS, e
      ))
    })?;

    Ok(data_ready(word))
  }

  /// Read measurement.
  ///
  /// # Returns
  /// The measurement.
  pub fn read_measurement(&mut self) -> Result<RawMeasurement, AppError> {
    let mut i2c = self.i2c.lock().unwrap();
    sensirion_send(&mut i2c, SCD41_ADDRESS, CMD_READ_MEASUREMENT, &[])?;

    let mut buffer = [0u8; 9];
    sensirion_read(&mut i2c, SCD41_ADDRESS, 1, &mut buffer)?;

    parse_measurement(&buffer).map_err(|e| {
      AppError::SensorError(format!(
        "Invalid measurement data from sensor at address 0x{:02x}: {}",
        SCD41_ADDRESS, e
      ))
    })
  }

  /// Read the serial number.
  ///
  /// # Returns
  /// The serial number.
  pub fn serial_number(&mut self) -> Result<u64, AppError> {
    let mut i2c = self.i2c.lock().unwrap();
    sensirion_send(&mut i2c, SCD41_ADDRESS, CMD_GET_SERIAL_NUMBER, &[])?;

    let mut buffer = [0u8; 9];
    sensirion_read(&mut i2c, SCD41_ADDRESS, 1, &mut buffer)?;

    let words = read_words::<3>(&buffer).map_err(|e| {
      AppError::SensorError(format!(
        "Invalid serial number from sensor at address 0x{:02x}: {}",
        SCD41_ADDRESS, e
      ))
    })?;

    Ok(((words[0] as u64) << 32) | ((words[1] as u64) << 16) | words[2] as u64)
  }
}
