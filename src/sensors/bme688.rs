use crate::board::EnvBus;
use crate::error::AppError;
use crate::sensors::{read_reg, read_regs, write_reg};
use shield_core::bme688::{Calibration, Measurement, RawField};

/// BME688 I2C address.
const BME688_ADDRESS: u8 = 0x76;

/// Chip id register.
const REG_CHIP_ID: u8 = 0xd0;

/// Measurement status register of field 0.
const REG_MEAS_STATUS_0: u8 = 0x1d;

/// First data register of field 0 (pressure MSB).
const REG_PRESS_MSB: u8 = 0x1f;

/// Gas resistance data registers of field 0 (high range variant).
const REG_GAS_R_MSB: u8 = 0x2c;

/// Heater resistance set point for profile 0.
const REG_RES_HEAT_0: u8 = 0x5a;

/// Heater duration for profile 0.
const REG_GAS_WAIT_0: u8 = 0x64;

/// Gas measurement control register.
const REG_CTRL_GAS_1: u8 = 0x71;

/// Humidity oversampling control register.
const REG_CTRL_HUM: u8 = 0x72;

/// Temperature/pressure oversampling and mode control register.
const REG_CTRL_MEAS: u8 = 0x74;

/// IIR filter configuration register.
const REG_CONFIG: u8 = 0x75;

/// First calibration coefficient block.
const REG_COEFF1: u8 = 0x8a;

/// Second calibration coefficient block.
const REG_COEFF2: u8 = 0xe1;

/// Third calibration coefficient block.
const REG_COEFF3: u8 = 0x00;

/// Chip id of the BME688.
pub const CHIP_ID: u8 = 0x61;

/// New data flag in the measurement status register.
const MEAS_STATUS_NEW_DATA: u8 = 0x80;

/// Gas valid flag in the gas LSB register.
const GAS_VALID: u8 = 0x20;

/// CTRL_HUM: humidity oversampling x2.
const OSR_HUM_X2: u8 = 0x02;

/// CTRL_MEAS: temperature oversampling x8, pressure oversampling x4.
const OSR_TEMP_PRESS: u8 = 0xb0;

/// CTRL_MEAS mode bits: forced measurement.
const MODE_FORCED: u8 = 0x01;

/// CONFIG: IIR filter coefficient 3.
const IIR_FILTER_3: u8 = 0x08;

/// CTRL_GAS_1: run gas measurement with heater profile 0 (high range
/// variant run_gas bit).
const RUN_GAS: u8 = 0x20;

/// Heater duration register value for 100 ms.
const GAS_WAIT_100MS: u8 = 0x59;

/// Heater target plate temperature in °C.
const HEATER_TARGET_C: f64 = 300.0;

/// Ambient temperature assumed for the heater set point in °C.
const HEATER_AMBIENT_C: f64 = 25.0;

/// BME688 environmental sensor interface. The sensor has no power gating;
/// each sample runs one forced measurement with the gas heater enabled.
pub struct Bme688 {
  /// The environmental I2C bus.
  i2c: EnvBus,

  /// The device calibration, read once during configuration.
  calibration: Option<Calibration>,
}

/// The BME688 sensor implementation.
impl Bme688 {
  /// Create a new BME688 sensor.
  ///
  /// # Parameters
  /// - `i2c`: The environmental I2C bus.
  ///
  /// # Returns
  /// The BME688 sensor.
  pub fn new(i2c: EnvBus) -> Self {
    Self {
      i2c,
      calibration: None,
    }
  }

  /// Read the chip id register.
  ///
  /// # Returns
  /// The chip id.
  pub fn chip_id(&mut self) -> Result<u8, AppError> {
    let mut i2c = self.i2c.borrow_mut();
    read_reg(&mut i2c, BME688_ADDRESS, REG_CHIP_ID)
  }

  /// Probe the device: the chip id must match the BME688.
  ///
  /// # Returns
  /// The result of the operation.
  pub fn probe(&mut self) -> Result<(), AppError> {
    let id = self.chip_id()?;

    if id != CHIP_ID {
      return Err(AppError::SensorError(format!(
        "Unexpected chip id 0x{:02x} from sensor at address 0x{:02x} (expected 0x{:02x})",
        id, BME688_ADDRESS, CHIP_ID
      )));
    }

    Ok(())
  }

  /// Read the calibration coefficients and configure oversampling, IIR
  /// filtering and the gas heater profile.
  ///
  /// # Returns
  /// The result of the operation.
  pub fn configure(&mut self) -> Result<(), AppError> {
    let mut i2c = self.i2c.borrow_mut();

    let mut coeff1 = [0u8; 23];
    read_regs(&mut i2c, BME688_ADDRESS, REG_COEFF1, &mut coeff1)?;

    let mut coeff2 = [0u8; 14];
    read_regs(&mut i2c, BME688_ADDRESS, REG_COEFF2, &mut coeff2)?;

    let mut coeff3 = [0u8; 5];
    read_regs(&mut i2c, BME688_ADDRESS, REG_COEFF3, &mut coeff3)?;

    let calibration = Calibration::from_registers(&coeff1, &coeff2, &coeff3);

    write_reg(&mut i2c, BME688_ADDRESS, REG_CTRL_HUM, OSR_HUM_X2)?;
    write_reg(&mut i2c, BME688_ADDRESS, REG_CONFIG, IIR_FILTER_3)?;
    write_reg(&mut i2c, BME688_ADDRESS, REG_CTRL_MEAS, OSR_TEMP_PRESS)?;

    write_reg(&mut i2c, BME688_ADDRESS, REG_GAS_WAIT_0, GAS_WAIT_100MS)?;
    write_reg(
      &mut i2c,
      BME688_ADDRESS,
      REG_RES_HEAT_0,
      calibration.heater_set_point(HEATER_AMBIENT_C, HEATER_TARGET_C),
    )?;
    write_reg(&mut i2c, BME688_ADDRESS, REG_CTRL_GAS_1, RUN_GAS)?;

    self.calibration = Some(calibration);

    Ok(())
  }

  /// Trigger one forced measurement.
  ///
  /// # Returns
  /// The result of the operation.
  pub fn trigger_measurement(&mut self) -> Result<(), AppError> {
    let mut i2c = self.i2c.borrow_mut();
    write_reg(
      &mut i2c,
      BME688_ADDRESS,
      REG_CTRL_MEAS,
      OSR_TEMP_PRESS | MODE_FORCED,
    )
  }

  /// Read the new data flag.
  ///
  /// # Returns
  /// Whether a completed measurement is available.
  pub fn data_ready(&mut self) -> Result<bool, AppError> {
    let mut i2c = self.i2c.borrow_mut();
    let status = read_reg(&mut i2c, BME688_ADDRESS, REG_MEAS_STATUS_0)?;

    Ok(status & MEAS_STATUS_NEW_DATA != 0)
  }

  /// Read and compensate the latest measurement.
  ///
  /// # Returns
  /// The compensated measurement.
  pub fn read(&mut self) -> Result<Measurement, AppError> {
    let calibration = self.calibration.ok_or_else(|| {
      AppError::SensorError(format!(
        "Sensor at address 0x{:02x} read before configuration",
        BME688_ADDRESS
      ))
    })?;

    let mut i2c = self.i2c.borrow_mut();

    // Pressure(3), temperature(3), humidity(2) in one burst.
    let mut data = [0u8; 8];
    read_regs(&mut i2c, BME688_ADDRESS, REG_PRESS_MSB, &mut data)?;

    let mut gas = [0u8; 2];
    read_regs(&mut i2c, BME688_ADDRESS, REG_GAS_R_MSB, &mut gas)?;

    let raw = RawField {
      adc_pressure: ((data[0] as u32) << 12) | ((data[1] as u32) << 4) | (data[2] as u32 >> 4),
      adc_temperature: ((data[3] as u32) << 12) | ((data[4] as u32) << 4) | (data[5] as u32 >> 4),
      adc_humidity: u16::from_be_bytes([data[6], data[7]]),
      adc_gas: ((gas[0] as u16) << 2) | (gas[1] as u16 >> 6),
      gas_range: gas[1] & 0x0f,
      gas_valid: gas[1] & GAS_VALID != 0,
    };

    Ok(calibration.compensate(&raw))
  }
}
