use crate::board::{AmuxAdc, SystemBus};
use crate::error::AppError;
use crate::sensors::{read_reg, write_reg};
use esp_idf_svc::hal::delay::FreeRtos;

/// MAX77654 I2C address.
const MAX77654_ADDRESS: u8 = 0x48;

/// Charger status register A.
const REG_STAT_CHG_A: u8 = 0x02;

/// Charger configuration register I: analog multiplexer channel select.
const REG_CNFG_CHG_I: u8 = 0x28;

/// AMUX settle time after a channel change, in milliseconds.
const AMUX_SETTLE_MS: u32 = 2;

/// AMUX disabled channel code.
const AMUX_OFF: u8 = 0x00;

/// PMIC telemetry channel routed through the analog multiplexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryChannel {
  /// Analog ground reference.
  Agnd,

  /// System supply voltage.
  Vsys,

  /// Charger input voltage.
  ChginVoltage,

  /// Charger input current.
  ChginCurrent,

  /// Battery voltage.
  BatteryVoltage,

  /// Battery charge current, as percent of the fast-charge setting.
  BatteryChargeCurrent,

  /// Battery discharge current on the 8.2 mA range.
  BatteryDischargeCurrent,

  /// Thermistor voltage.
  Thermistor,

  /// Thermistor bias voltage.
  ThermistorBias,
}

/// The telemetry channel implementation.
impl TelemetryChannel {
  /// All channels, in the order the self test reports them.
  pub const ALL: [TelemetryChannel; 9] = [
    TelemetryChannel::Agnd,
    TelemetryChannel::Vsys,
    TelemetryChannel::ChginVoltage,
    TelemetryChannel::ChginCurrent,
    TelemetryChannel::BatteryVoltage,
    TelemetryChannel::BatteryChargeCurrent,
    TelemetryChannel::BatteryDischargeCurrent,
    TelemetryChannel::Thermistor,
    TelemetryChannel::ThermistorBias,
  ];

  /// The AMUX channel select code.
  fn amux_code(self) -> u8 {
    match self {
      TelemetryChannel::Agnd => 0x01,
      TelemetryChannel::ChginVoltage => 0x02,
      TelemetryChannel::ChginCurrent => 0x03,
      TelemetryChannel::Vsys => 0x04,
      TelemetryChannel::BatteryVoltage => 0x05,
      TelemetryChannel::BatteryChargeCurrent => 0x06,
      TelemetryChannel::BatteryDischargeCurrent => 0x07,
      TelemetryChannel::Thermistor => 0x08,
      TelemetryChannel::ThermistorBias => 0x09,
    }
  }

  /// The channel name used in log output.
  pub fn name(self) -> &'static str {
    match self {
      TelemetryChannel::Agnd => "AGND Voltage",
      TelemetryChannel::Vsys => "VSYS Voltage",
      TelemetryChannel::ChginVoltage => "CHGIN Voltage",
      TelemetryChannel::ChginCurrent => "CHGIN Current",
      TelemetryChannel::BatteryVoltage => "Battery Voltage",
      TelemetryChannel::BatteryChargeCurrent => "Battery Current",
      TelemetryChannel::BatteryDischargeCurrent => "Battery Discharge Current",
      TelemetryChannel::Thermistor => "Thermistor Voltage",
      TelemetryChannel::ThermistorBias => "Thermistor Bias",
    }
  }

  /// The unit of the reported value.
  pub fn unit(self) -> &'static str {
    match self {
      TelemetryChannel::ChginCurrent | TelemetryChannel::BatteryDischargeCurrent => "mA",
      TelemetryChannel::BatteryChargeCurrent => "%",
      _ => "mV",
    }
  }

  /// Convert the AMUX output voltage to the channel's reported value.
  ///
  /// The voltage monitors divide their rail by four onto the AMUX pin; the
  /// current monitors map their full range onto 1.25 V.
  fn convert(self, amux_mv: u16) -> i32 {
    let amux_mv = amux_mv as i32;

    match self {
      TelemetryChannel::Agnd
      | TelemetryChannel::Thermistor
      | TelemetryChannel::ThermistorBias => amux_mv,
      TelemetryChannel::Vsys
      | TelemetryChannel::ChginVoltage
      | TelemetryChannel::BatteryVoltage => amux_mv * 4,
      TelemetryChannel::ChginCurrent => amux_mv * 475 / 1250,
      TelemetryChannel::BatteryChargeCurrent => amux_mv * 100 / 1250,
      TelemetryChannel::BatteryDischargeCurrent => amux_mv * 82 / 12500,
    }
  }
}

/// MAX77654 PMIC telemetry interface. The handle is shared between the
/// acquisition thread and the power management thread behind a mutex; every
/// caller holds the lock for exactly one measurement.
pub struct Max77654 {
  /// The system I2C bus.
  i2c: SystemBus,

  /// The AMUX readback path.
  amux: AmuxAdc,
}

/// The MAX77654 PMIC implementation.
impl Max77654 {
  /// Create a new MAX77654 PMIC handle.
  ///
  /// # Parameters
  /// - `i2c`: The system I2C bus.
  /// - `amux`: The AMUX readback path.
  ///
  /// # Returns
  /// The MAX77654 PMIC handle.
  pub fn new(i2c: SystemBus, amux: AmuxAdc) -> Self {
    Self { i2c, amux }
  }

  /// Read the charger status register.
  ///
  /// # Returns
  /// The raw charger status byte.
  pub fn charger_status(&mut self) -> Result<u8, AppError> {
    let mut i2c = self.i2c.lock().unwrap();
    read_reg(&mut i2c, MAX77654_ADDRESS, REG_STAT_CHG_A)
      .map_err(|e| AppError::PowerError(e.to_string()))
  }

  /// Measure one telemetry channel: route it to the AMUX pin, sample the
  /// ADC, convert, and disable the multiplexer again.
  ///
  /// # Parameters
  /// - `channel`: The telemetry channel.
  ///
  /// # Returns
  /// The measured value in the channel's unit.
  pub fn measure(&mut self, channel: TelemetryChannel) -> Result<i32, AppError> {
    self.select_amux(channel.amux_code())?;
    FreeRtos::delay_ms(AMUX_SETTLE_MS);

    let sample = self.amux.read_mv();

    // Always park the multiplexer, even when sampling failed.
    self.select_amux(AMUX_OFF)?;

    Ok(channel.convert(sample?))
  }

  /// Write the AMUX channel select bits.
  ///
  /// # Parameters
  /// - `code`: The channel select code.
  ///
  /// # Returns
  /// The result of the operation.
  fn select_amux(&mut self, code: u8) -> Result<(), AppError> {
    let mut i2c = self.i2c.lock().unwrap();

    let config = read_reg(&mut i2c, MAX77654_ADDRESS, REG_CNFG_CHG_I)
      .map_err(|e| AppError::PowerError(e.to_string()))?;

    write_reg(
      &mut i2c,
      MAX77654_ADDRESS,
      REG_CNFG_CHG_I,
      (config & 0xf0) | (code & 0x0f),
    )
    .map_err(|e| AppError::PowerError(e.to_string()))
  }
}
