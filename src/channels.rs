use crate::board::DebugSignals;
use crate::error::AppError;
use crate::sensors::as7331::As7331;
use crate::sensors::bh1730::Bh1730;
use crate::sensors::bme688::Bme688;
use crate::sensors::ilps28qsw::Ilps28qsw;
use crate::sensors::scd41::Scd41;
use crate::sensors::sgp41::Sgp41;
use log::{debug, info};
use shield_core::poll::{poll_until, PollOutcome, Timekeeper};
use shield_core::record::SensorRecord;
use shield_core::sequencer::{ChannelError, SensorChannel};
use shield_core::sgp41::{DEFAULT_HUMIDITY_TICKS, DEFAULT_TEMPERATURE_TICKS};
use std::cell::RefCell;
use std::rc::Rc;

/// Data-ready poll interval in microseconds.
pub const POLL_INTERVAL_US: u32 = 100;

/// Data-ready timeout budget in milliseconds.
pub const DATA_READY_TIMEOUT_MS: u32 = 10_000;

/// VOC sensor conditioning time in milliseconds.
const SGP41_CONDITIONING_MS: u32 = 10_000;

/// Shared debug signal lines.
pub type SharedSignals = Rc<RefCell<DebugSignals>>;

/// Poll a sensor's readiness predicate with the standard interval and
/// timeout, logging the observed latency.
///
/// # Parameters
/// - `timekeeper`: The clock and delay provider.
/// - `name`: The sensor name for log messages.
/// - `predicate`: The readiness predicate.
///
/// # Returns
/// The result of the operation.
pub fn wait_ready(
  timekeeper: &dyn Timekeeper,
  name: &str,
  predicate: impl FnMut() -> Result<bool, AppError>,
) -> Result<(), ChannelError> {
  match poll_until(timekeeper, POLL_INTERVAL_US, DATA_READY_TIMEOUT_MS, predicate) {
    Ok(PollOutcome::Ready { elapsed_ms }) => {
      debug!("{} Data ready after {} ms", name, elapsed_ms);
      Ok(())
    }
    Ok(PollOutcome::TimedOut) => Err(ChannelError::new(format!(
      "{} Timeout waiting for data ready status",
      name
    ))),
    Err(e) => Err(e.into()),
  }
}

/// CO2 sensor channel.
pub struct Scd41Channel {
  /// The sensor context.
  sensor: Rc<RefCell<Scd41>>,

  /// The debug signal lines.
  signals: SharedSignals,
}

/// The CO2 channel implementation.
impl Scd41Channel {
  /// Create the channel.
  pub fn new(sensor: Rc<RefCell<Scd41>>, signals: SharedSignals) -> Self {
    Self { sensor, signals }
  }
}

/// Implement the `SensorChannel` trait for `Scd41Channel`.
impl SensorChannel for Scd41Channel {
  fn name(&self) -> &'static str {
    "SCD41"
  }

  /// Power the sensor up and start periodic measurement.
  fn power_on(&mut self, _timekeeper: &dyn Timekeeper) -> Result<(), ChannelError> {
    let mut sensor = self.sensor.borrow_mut();
    sensor.power_on()?;
    sensor.start_periodic_measurement()?;

    Ok(())
  }

  /// Wait for data-ready, then read CO2, temperature and humidity.
  fn sample(
    &mut self,
    timekeeper: &dyn Timekeeper,
    record: &mut SensorRecord,
  ) -> Result<(), ChannelError> {
    let mut sensor = self.sensor.borrow_mut();

    wait_ready(timekeeper, self.name(), || sensor.data_ready())?;

    let measurement = sensor.read_measurement()?;
    record.scd41_co2 = measurement.co2_ppm;
    record.scd41_temperature = measurement.temperature_c();
    record.scd41_humidity = measurement.humidity_percent();

    drop(sensor);
    self.signals.borrow_mut().sync();

    Ok(())
  }

  /// Stop periodic measurement and power the sensor down.
  fn power_off(&mut self, _timekeeper: &dyn Timekeeper) -> Result<(), ChannelError> {
    info!(" - Stop periodic measurement of SCD41");

    let mut sensor = self.sensor.borrow_mut();
    sensor.stop_periodic_measurement()?;
    sensor.power_off()?;

    Ok(())
  }
}

/// VOC sensor channel.
pub struct Sgp41Channel {
  /// The sensor context.
  sensor: Rc<RefCell<Sgp41>>,

  /// The debug signal lines.
  signals: SharedSignals,
}

/// The VOC channel implementation.
impl Sgp41Channel {
  /// Create the channel.
  pub fn new(sensor: Rc<RefCell<Sgp41>>, signals: SharedSignals) -> Self {
    Self { sensor, signals }
  }
}

/// Implement the `SensorChannel` trait for `Sgp41Channel`.
impl SensorChannel for Sgp41Channel {
  fn name(&self) -> &'static str {
    "SGP41"
  }

  /// Power the sensor up and run the conditioning phase.
  fn power_on(&mut self, timekeeper: &dyn Timekeeper) -> Result<(), ChannelError> {
    let mut sensor = self.sensor.borrow_mut();
    sensor.power_on()?;

    info!(" - Start conditioning for 10s");
    let conditioning_voc =
      sensor.execute_conditioning(DEFAULT_HUMIDITY_TICKS, DEFAULT_TEMPERATURE_TICKS)?;
    timekeeper.sleep_ms(SGP41_CONDITIONING_MS);
    info!(" - SRAW VOC (Conditioning)             : {}", conditioning_voc);

    info!(" - Start measuring raw signals");
    let (voc, nox) =
      sensor.measure_raw_signals(DEFAULT_HUMIDITY_TICKS, DEFAULT_TEMPERATURE_TICKS)?;
    info!(" - SRAW VOC                            : {}", voc);
    info!(" - SRAW NOX                            : {}", nox);

    Ok(())
  }

  /// Measure the raw VOC and NOx signals.
  fn sample(
    &mut self,
    _timekeeper: &dyn Timekeeper,
    record: &mut SensorRecord,
  ) -> Result<(), ChannelError> {
    let mut sensor = self.sensor.borrow_mut();

    let (voc, nox) =
      sensor.measure_raw_signals(DEFAULT_HUMIDITY_TICKS, DEFAULT_TEMPERATURE_TICKS)?;
    record.sgp41_voc = voc;
    record.sgp41_nox = nox;

    drop(sensor);
    self.signals.borrow_mut().sync();

    Ok(())
  }

  /// Turn the heater off and power the sensor down.
  fn power_off(&mut self, _timekeeper: &dyn Timekeeper) -> Result<(), ChannelError> {
    let mut sensor = self.sensor.borrow_mut();
    sensor.turn_heater_off()?;
    sensor.power_off()?;

    Ok(())
  }
}

/// Pressure sensor channel.
pub struct Ilps28qswChannel {
  /// The sensor context.
  sensor: Rc<RefCell<Ilps28qsw>>,

  /// The debug signal lines.
  signals: SharedSignals,
}

/// The pressure channel implementation.
impl Ilps28qswChannel {
  /// Create the channel.
  pub fn new(sensor: Rc<RefCell<Ilps28qsw>>, signals: SharedSignals) -> Self {
    Self { sensor, signals }
  }
}

/// Implement the `SensorChannel` trait for `Ilps28qswChannel`.
impl SensorChannel for Ilps28qswChannel {
  fn name(&self) -> &'static str {
    "ILPS28QSW"
  }

  /// Reset the sensor and configure continuous measurement. The sensor has
  /// no power gating.
  fn power_on(&mut self, _timekeeper: &dyn Timekeeper) -> Result<(), ChannelError> {
    let mut sensor = self.sensor.borrow_mut();
    sensor.reset()?;
    sensor.configure()?;

    Ok(())
  }

  /// Read the latest pressure and temperature sample.
  fn sample(
    &mut self,
    _timekeeper: &dyn Timekeeper,
    record: &mut SensorRecord,
  ) -> Result<(), ChannelError> {
    let mut sensor = self.sensor.borrow_mut();

    let (pressure_hpa, temperature_c) = sensor.read()?;
    record.ilps28qsw_pressure = pressure_hpa;
    record.ilps28qsw_temperature = temperature_c;

    drop(sensor);
    self.signals.borrow_mut().sync();

    Ok(())
  }

  /// Park the sensor in power down mode.
  fn power_off(&mut self, _timekeeper: &dyn Timekeeper) -> Result<(), ChannelError> {
    self.sensor.borrow_mut().power_down()?;

    Ok(())
  }
}

/// Environmental sensor channel. This is the mandatory device: startup
/// aborts when its chip id probe fails.
pub struct Bme688Channel {
  /// The sensor context.
  sensor: Rc<RefCell<Bme688>>,

  /// The debug signal lines.
  signals: SharedSignals,
}

/// The environmental channel implementation.
impl Bme688Channel {
  /// Create the channel.
  pub fn new(sensor: Rc<RefCell<Bme688>>, signals: SharedSignals) -> Self {
    Self { sensor, signals }
  }
}

/// Implement the `SensorChannel` trait for `Bme688Channel`.
impl SensorChannel for Bme688Channel {
  fn name(&self) -> &'static str {
    "BME688"
  }

  fn mandatory(&self) -> bool {
    true
  }

  /// Verify the chip id.
  fn probe(&mut self) -> Result<(), ChannelError> {
    self.sensor.borrow_mut().probe()?;

    Ok(())
  }

  /// Read the calibration and configure oversampling and the gas heater.
  /// The sensor has no power gating.
  fn power_on(&mut self, _timekeeper: &dyn Timekeeper) -> Result<(), ChannelError> {
    self.sensor.borrow_mut().configure()?;

    Ok(())
  }

  /// Run one forced measurement and read the compensated values.
  fn sample(
    &mut self,
    timekeeper: &dyn Timekeeper,
    record: &mut SensorRecord,
  ) -> Result<(), ChannelError> {
    let mut sensor = self.sensor.borrow_mut();

    sensor.trigger_measurement()?;
    wait_ready(timekeeper, self.name(), || sensor.data_ready())?;

    let measurement = sensor.read()?;
    record.bme688_temperature = measurement.temperature_c;
    record.bme688_pressure = measurement.pressure_pa / 1000.0;
    record.bme688_humidity = measurement.humidity_percent;
    record.bme688_gas_resistance = measurement.gas_resistance_ohm;

    drop(sensor);
    self.signals.borrow_mut().sync();

    Ok(())
  }

  /// Nothing to do: the forced measurement mode returns to sleep on its own.
  fn power_off(&mut self, _timekeeper: &dyn Timekeeper) -> Result<(), ChannelError> {
    Ok(())
  }
}

/// Ambient light sensor channel.
pub struct Bh1730Channel {
  /// The sensor context.
  sensor: Rc<RefCell<Bh1730>>,

  /// The debug signal lines.
  signals: SharedSignals,
}

/// The light channel implementation.
impl Bh1730Channel {
  /// Create the channel.
  pub fn new(sensor: Rc<RefCell<Bh1730>>, signals: SharedSignals) -> Self {
    Self { sensor, signals }
  }
}

/// Implement the `SensorChannel` trait for `Bh1730Channel`.
impl SensorChannel for Bh1730Channel {
  fn name(&self) -> &'static str {
    "BH1730FVC"
  }

  /// Turn the sensor on and configure gain and integration time.
  fn power_on(&mut self, _timekeeper: &dyn Timekeeper) -> Result<(), ChannelError> {
    info!(" - Turn on BH1730FVC");
    let mut sensor = self.sensor.borrow_mut();
    sensor.power_on()?;

    info!(" - Configuring BH1730FVC");
    sensor.configure()?;

    Ok(())
  }

  /// Wait for a valid measurement and read both channels and the lux value.
  fn sample(
    &mut self,
    timekeeper: &dyn Timekeeper,
    record: &mut SensorRecord,
  ) -> Result<(), ChannelError> {
    let mut sensor = self.sensor.borrow_mut();

    wait_ready(timekeeper, self.name(), || sensor.data_valid())?;

    record.bh1730_visible = sensor.read_visible()?;
    record.bh1730_ir = sensor.read_ir()?;
    record.bh1730_lux = sensor.read_lux()?;

    drop(sensor);
    self.signals.borrow_mut().sync();

    Ok(())
  }

  /// Turn the sensor off.
  fn power_off(&mut self, _timekeeper: &dyn Timekeeper) -> Result<(), ChannelError> {
    self.sensor.borrow_mut().power_down()?;

    Ok(())
  }
}

/// UV sensor channel.
pub struct As7331Channel {
  /// The sensor context.
  sensor: Rc<RefCell<As7331>>,

  /// The debug signal lines.
  signals: SharedSignals,
}

/// The UV channel implementation.
impl As7331Channel {
  /// Create the channel.
  pub fn new(sensor: Rc<RefCell<As7331>>, signals: SharedSignals) -> Self {
    Self { sensor, signals }
  }
}

/// Implement the `SensorChannel` trait for `As7331Channel`.
impl SensorChannel for As7331Channel {
  fn name(&self) -> &'static str {
    "AS7331"
  }

  /// Power up, reset, configure command mode and start the first one shot
  /// measurement.
  fn power_on(&mut self, _timekeeper: &dyn Timekeeper) -> Result<(), ChannelError> {
    let mut sensor = self.sensor.borrow_mut();

    sensor.power_on()?;
    sensor.reset()?;

    // The reset leaves the device powered down again.
    sensor.power_up()?;

    info!(" - Configuring AS7331");
    sensor.set_configuration_mode()?;
    sensor.configure()?;

    info!(" - Starting continuous measurement");
    sensor.set_measurement_mode()?;

    // Already start the first measurement.
    sensor.start_measurement()?;

    Ok(())
  }

  /// Wait for the external ready line, read all channels, and start the
  /// next one shot measurement.
  fn sample(
    &mut self,
    timekeeper: &dyn Timekeeper,
    record: &mut SensorRecord,
  ) -> Result<(), ChannelError> {
    let mut sensor = self.sensor.borrow_mut();

    wait_ready(timekeeper, self.name(), || Ok(sensor.data_ready()))?;

    let reading = sensor.read_all()?;
    record.as7331_temperature = reading.temperature_c();
    record.as7331_uva = reading.uva;
    record.as7331_uvb = reading.uvb;
    record.as7331_uvc = reading.uvc;

    // Already start next measurement.
    sensor.start_measurement()?;

    drop(sensor);
    self.signals.borrow_mut().sync();

    Ok(())
  }

  /// Power the sensor down and disconnect it from the bus.
  fn power_off(&mut self, _timekeeper: &dyn Timekeeper) -> Result<(), ChannelError> {
    self.sensor.borrow_mut().power_off()?;

    Ok(())
  }
}
