use crate::error::AppError;
use esp_idf_svc::hal::adc::attenuation::DB_11;
use esp_idf_svc::hal::adc::oneshot::config::AdcChannelConfig;
use esp_idf_svc::hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_svc::hal::adc::ADC1;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::{AnyInputPin, AnyOutputPin, Gpio3, Input, Output, PinDriver};
use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

/// Maximum number of devices reported by one bus scan.
const SCAN_CAPACITY: usize = 16;

/// First address probed by a bus scan.
const SCAN_FIRST_ADDRESS: u8 = 0x08;

/// Last address probed by a bus scan.
const SCAN_LAST_ADDRESS: u8 = 0x77;

/// A power rail or bus-enable line.
pub type RailPin = PinDriver<'static, AnyOutputPin, Output>;

/// A sensor readiness input line.
pub type SensePin = PinDriver<'static, AnyInputPin, Input>;

/// The system I2C bus, shared with the power management thread.
pub type SystemBus = Arc<Mutex<I2cDriver<'static>>>;

/// The environmental I2C bus, used by the acquisition thread only.
pub type EnvBus = Rc<RefCell<I2cDriver<'static>>>;

/// The board wiring: both I2C buses, the sensor power and enable lines, the
/// UV sensor readiness input, the debug signal outputs and the PMIC monitor
/// ADC. Constructed once from the ESP32 peripherals and consumed by the
/// sensor contexts.
pub struct Board {
  /// System I2C bus (CO2, VOC, IMU, accelerometer, PMIC).
  pub bus_system: SystemBus,

  /// Environmental I2C bus (pressure, environmental, light, UV, GNSS).
  pub bus_env: EnvBus,

  /// CO2 sensor power rail.
  pub scd41_power: RailPin,

  /// CO2 sensor I2C bus-enable line.
  pub scd41_bus_enable: RailPin,

  /// VOC sensor power rail.
  pub sgp41_power: RailPin,

  /// VOC sensor I2C bus-enable line.
  pub sgp41_bus_enable: RailPin,

  /// UV sensor I2C bus-enable line.
  pub as7331_bus_enable: RailPin,

  /// UV sensor data-ready input.
  pub as7331_ready: SensePin,

  /// Debug signal lines.
  pub signals: DebugSignals,

  /// PMIC analog multiplexer readback.
  pub amux: AmuxAdc,
}

/// The board implementation.
impl Board {
  /// Create the board wiring.
  ///
  /// # Parameters
  /// - `peripherals`: The ESP32 peripherals.
  ///
  /// # Returns
  /// The board.
  pub fn new(peripherals: Peripherals) -> Result<Self, AppError> {
    let config = I2cConfig::default().baudrate(100.kHz().into());

    let bus_system = Arc::new(Mutex::new(
      I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio8,
        peripherals.pins.gpio9,
        &config,
      )
      .map_err(|e| AppError::I2cError(format!("Failed to initialize system I2C bus: {:?}", e)))?,
    ));

    let bus_env = Rc::new(RefCell::new(
      I2cDriver::new(
        peripherals.i2c1,
        peripherals.pins.gpio17,
        peripherals.pins.gpio18,
        &config,
      )
      .map_err(|e| {
        AppError::I2cError(format!("Failed to initialize environmental I2C bus: {:?}", e))
      })?,
    ));

    let scd41_power = output_pin(peripherals.pins.gpio4.downgrade_output(), "SCD41 power")?;
    let scd41_bus_enable = output_pin(peripherals.pins.gpio5.downgrade_output(), "SCD41 I2C EN")?;
    let sgp41_power = output_pin(peripherals.pins.gpio6.downgrade_output(), "SGP41 power")?;
    let sgp41_bus_enable = output_pin(peripherals.pins.gpio7.downgrade_output(), "SGP41 I2C EN")?;
    let as7331_bus_enable =
      output_pin(peripherals.pins.gpio10.downgrade_output(), "AS7331 I2C EN")?;

    let as7331_ready = PinDriver::input(peripherals.pins.gpio12.downgrade_input())
      .map_err(|e| AppError::GpioError(format!("Failed to configure AS7331 ready input: {:?}", e)))?;

    let signals = DebugSignals::new(
      output_pin(peripherals.pins.gpio13.downgrade_output(), "debug signal 1")?,
      output_pin(peripherals.pins.gpio14.downgrade_output(), "debug signal 2")?,
    );

    let amux = AmuxAdc::new(peripherals.adc1, peripherals.pins.gpio3)?;

    Ok(Self {
      bus_system,
      bus_env,
      scd41_power,
      scd41_bus_enable,
      sgp41_power,
      sgp41_bus_enable,
      as7331_bus_enable,
      as7331_ready,
      signals,
      amux,
    })
  }
}

/// Configure an output pin, initially low.
///
/// # Parameters
/// - `pin`: The pin to configure.
/// - `name`: The line name for error messages.
///
/// # Returns
/// The pin driver.
fn output_pin(pin: AnyOutputPin, name: &str) -> Result<RailPin, AppError> {
  let mut driver = PinDriver::output(pin)
    .map_err(|e| AppError::GpioError(format!("Failed to configure {} line: {:?}", name, e)))?;

  driver
    .set_low()
    .map_err(|e| AppError::GpioError(format!("Failed to clear {} line: {:?}", name, e)))?;

  Ok(driver)
}

/// The two debug signal lines: line 1 marks activity windows, line 2 carries
/// short sync pulses between per-sensor sections.
pub struct DebugSignals {
  /// Activity marker line.
  line1: RailPin,

  /// Sync pulse line.
  line2: RailPin,
}

/// The debug signals implementation.
impl DebugSignals {
  /// Create the debug signals, both lines low.
  pub fn new(line1: RailPin, line2: RailPin) -> Self {
    Self { line1, line2 }
  }

  /// Set the activity marker line.
  ///
  /// # Parameters
  /// - `active`: The line state.
  pub fn set_activity(&mut self, active: bool) {
    let result = if active {
      self.line1.set_high()
    } else {
      self.line1.set_low()
    };

    if let Err(e) = result {
      log::warn!("Failed to drive debug signal 1: {:?}", e);
    }
  }

  /// Toggle the activity marker line.
  pub fn toggle_activity(&mut self) {
    if let Err(e) = self.line1.toggle() {
      log::warn!("Failed to toggle debug signal 1: {:?}", e);
    }
  }

  /// Send a 1 ms sync pulse on the sync line.
  pub fn sync(&mut self) {
    if self.line2.set_high().is_ok() {
      FreeRtos::delay_ms(1);
    }

    if let Err(e) = self.line2.set_low() {
      log::warn!("Failed to drive debug signal 2: {:?}", e);
    }
  }
}

/// Readback path for the PMIC analog multiplexer output.
pub struct AmuxAdc {
  /// The ADC unit.
  adc: AdcDriver<'static, ADC1>,

  /// The AMUX sense pin.
  pin: Gpio3,

  /// The channel configuration.
  config: AdcChannelConfig,
}

/// The AMUX ADC implementation.
impl AmuxAdc {
  /// Create the AMUX readback path.
  ///
  /// # Parameters
  /// - `adc`: The ADC1 peripheral.
  /// - `pin`: The AMUX sense pin.
  ///
  /// # Returns
  /// The AMUX ADC.
  pub fn new(adc: ADC1, pin: Gpio3) -> Result<Self, AppError> {
    let adc = AdcDriver::new(adc)
      .map_err(|e| AppError::PowerError(format!("Failed to initialize ADC: {:?}", e)))?;

    let config = AdcChannelConfig {
      attenuation: DB_11,
      ..Default::default()
    };

    Ok(Self { adc, pin, config })
  }

  /// Sample the AMUX output in millivolts.
  ///
  /// # Returns
  /// The sampled voltage.
  pub fn read_mv(&mut self) -> Result<u16, AppError> {
    let mut channel = AdcChannelDriver::new(&self.adc, &mut self.pin, &self.config)
      .map_err(|e| AppError::PowerError(format!("Failed to open AMUX ADC channel: {:?}", e)))?;

    self
      .adc
      .read(&mut channel)
      .map_err(|e| AppError::PowerError(format!("Failed to sample AMUX output: {:?}", e)))
  }
}

/// Scan an I2C bus for responding devices.
///
/// # Parameters
/// - `i2c`: The I2C driver.
///
/// # Returns
/// The responding addresses, at most `SCAN_CAPACITY` of them.
pub fn scan_bus(i2c: &mut I2cDriver<'_>) -> heapless::Vec<u8, SCAN_CAPACITY> {
  let mut found = heapless::Vec::new();

  for address in SCAN_FIRST_ADDRESS..=SCAN_LAST_ADDRESS {
    let mut probe = [0u8; 1];

    if i2c.read(address, &mut probe, 100).is_ok() && found.push(address).is_err() {
      break;
    }
  }

  found
}
