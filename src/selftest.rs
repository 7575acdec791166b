use crate::board::{scan_bus, EnvBus, SystemBus};
use crate::channels::{wait_ready, SharedSignals};
use crate::sensors::as7331::{As7331, CHIP_ID as AS7331_CHIP_ID};
use crate::sensors::bh1730::Bh1730;
use crate::sensors::bme688::Bme688;
use crate::sensors::ilps28qsw::{Ilps28qsw, CHIP_ID as ILPS28QSW_CHIP_ID};
use crate::sensors::ism330dhcx::{Ism330Dhcx, CHIP_ID as ISM330DHCX_CHIP_ID};
use crate::sensors::lis2duxs12::{Lis2duxs12, CHIP_ID as LIS2DUXS12_CHIP_ID};
use crate::sensors::max77654::{Max77654, TelemetryChannel};
use crate::sensors::max_m10s::MaxM10s;
use crate::sensors::scd41::Scd41;
use crate::sensors::sgp41::Sgp41;
use log::{error, info};
use shield_core::poll::Timekeeper;
use shield_core::sgp41::{DEFAULT_HUMIDITY_TICKS, DEFAULT_TEMPERATURE_TICKS, SELF_TEST_OK};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

/// Every device exercised by the self-test pass.
pub struct Devices {
  /// The system I2C bus, for the bus scan.
  pub bus_system: SystemBus,

  /// The environmental I2C bus, for the bus scan.
  pub bus_env: EnvBus,

  /// The CO2 sensor.
  pub scd41: Rc<RefCell<Scd41>>,

  /// The VOC sensor.
  pub sgp41: Rc<RefCell<Sgp41>>,

  /// The pressure sensor.
  pub ilps28qsw: Rc<RefCell<Ilps28qsw>>,

  /// The environmental sensor.
  pub bme688: Rc<RefCell<Bme688>>,

  /// The ambient light sensor.
  pub bh1730: Rc<RefCell<Bh1730>>,

  /// The UV sensor.
  pub as7331: Rc<RefCell<As7331>>,

  /// The IMU.
  pub ism330dhcx: Ism330Dhcx,

  /// The accelerometer.
  pub lis2duxs12: Lis2duxs12,

  /// The PMIC handle, shared with the power management thread.
  pub pmic: Arc<Mutex<Max77654>>,

  /// The GNSS module.
  pub max_m10s: MaxM10s,

  /// The debug signal lines.
  pub signals: SharedSignals,
}

/// Run every device's self test once, logging but never gating. The GNSS
/// module is sent to backup at the end of the pass to save power.
///
/// # Parameters
/// - `devices`: The devices under test.
/// - `timekeeper`: The clock and delay provider.
pub fn run_all(devices: &mut Devices, timekeeper: &dyn Timekeeper) {
  info!("Scanning system I2C bus");
  {
    let mut i2c = devices.bus_system.lock().unwrap();
    for address in scan_bus(&mut i2c) {
      info!(" - Found device at address 0x{:02x}", address);
    }
  }

  info!("Scanning environmental I2C bus");
  {
    let mut i2c = devices.bus_env.borrow_mut();
    for address in scan_bus(&mut i2c) {
      info!(" - Found device at address 0x{:02x}", address);
    }
  }

  let signals = Rc::clone(&devices.signals);
  let mut section = |body: &mut dyn FnMut()| {
    signals.borrow_mut().sync();
    signals.borrow_mut().set_activity(true);
    body();
    signals.borrow_mut().set_activity(false);
  };

  section(&mut || test_as7331(&devices.as7331, timekeeper));
  section(&mut || test_bh1730(&devices.bh1730, timekeeper));
  section(&mut || test_ism330dhcx(&mut devices.ism330dhcx));
  section(&mut || test_lis2duxs12(&mut devices.lis2duxs12));
  section(&mut || test_bme688(&devices.bme688, timekeeper));
  section(&mut || test_ilps28qsw(&devices.ilps28qsw));
  section(&mut || test_scd41(&devices.scd41, timekeeper));
  section(&mut || test_sgp41(&devices.sgp41));
  section(&mut || test_max77654(&devices.pmic));

  devices.signals.borrow_mut().sync();
  if let Err(e) = devices.max_m10s.power_off_backup() {
    error!(" * Error powering off GNSS module: {}", e);
  }

  devices.signals.borrow_mut().sync();
}

/// Test the AS7331 (UV sensor).
fn test_as7331(sensor: &Rc<RefCell<As7331>>, timekeeper: &dyn Timekeeper) {
  info!("Testing AS7331 (UV Sensor)");
  let mut sensor = sensor.borrow_mut();

  if let Err(e) = sensor.power_on() {
    error!(" * Error powering on AS7331: {}", e);
    return;
  }

  if let Err(e) = sensor.reset() {
    error!(" * Error resetting AS7331: {}", e);
    return;
  }

  if let Err(e) = sensor.power_up() {
    error!(" * Error powering up AS7331: {}", e);
    return;
  }

  if let Err(e) = sensor.set_configuration_mode() {
    error!(" * Error setting configuration mode: {}", e);
  }

  match sensor.chip_id() {
    Ok(id) if id == AS7331_CHIP_ID => {
      info!(" - ID                                  : 0x{:02x}", id)
    }
    Ok(id) => error!(" * Unexpected device ID 0x{:02x}", id),
    Err(e) => error!(" * Error getting ID: {}", e),
  }

  if let Err(e) = sensor.configure() {
    error!(" * Error initializing AS7331: {}", e);
  }

  if let Err(e) = sensor.set_measurement_mode() {
    error!(" * Error setting measurement mode: {}", e);
  }

  match sensor.status() {
    Ok(status) => {
      info!(" - Power Down Enabled                  : {}", status.powerstate as u8);
      info!(" - Standby State                       : {}", status.standbystate as u8);
      info!(" - Not Ready                           : {}", status.notready as u8);
      info!(" - Data Ready                          : {}", status.ndata as u8);
      info!(" - Data Overwrite                      : {}", status.ldata as u8);
      info!(" - ADC Overflow                        : {}", status.adcof as u8);
    }
    Err(e) => error!(" * Error getting status: {}", e),
  }

  if let Err(e) = sensor.start_measurement() {
    error!(" * Error starting one shot: {}", e);
  }

  if let Err(e) = wait_ready(timekeeper, "AS7331", || Ok(sensor.data_ready())) {
    error!(" * {}", e);
  }

  match sensor.read_all() {
    Ok(reading) => {
      info!(" - Temp                                : {:.2} °C", reading.temperature_c());
      info!(" - UVA                                 : {}", reading.uva);
      info!(" - UVB                                 : {}", reading.uvb);
      info!(" - UVC                                 : {}", reading.uvc);
    }
    Err(e) => error!(" * Error reading all: {}", e),
  }

  if let Err(e) = sensor.power_off() {
    error!(" * Error powering off AS7331: {}", e);
  }
}

/// Test the BH1730FVC (light sensor).
fn test_bh1730(sensor: &Rc<RefCell<Bh1730>>, timekeeper: &dyn Timekeeper) {
  info!("Testing BH1730FVC (Light Sensor)");
  let mut sensor = sensor.borrow_mut();

  if let Err(e) = sensor.power_on() {
    error!(" * Error powering on BH1730FVC: {}", e);
    return;
  }

  match sensor.part_id() {
    Ok(id) => info!(" - Part ID                             : 0x{:02x}", id),
    Err(e) => error!(" * Error reading part ID: {}", e),
  }

  if let Err(e) = sensor.configure() {
    error!(" * Error initializing BH1730FVC: {}", e);
    return;
  }

  if let Err(e) = wait_ready(timekeeper, "BH1730FVC", || sensor.data_valid()) {
    error!(" * {}", e);
  }

  match sensor.read_visible() {
    Ok(visible) => info!(" - Visible                             : {}", visible),
    Err(e) => error!(" * Error reading visible light: {}", e),
  }

  match sensor.read_ir() {
    Ok(ir) => info!(" - IR                                  : {}", ir),
    Err(e) => error!(" * Error reading IR light: {}", e),
  }

  match sensor.read_lux() {
    Ok(lux) => info!(" - LUX                                 : {}", lux),
    Err(e) => error!(" * Error reading lux: {}", e),
  }

  if let Err(e) = sensor.power_down() {
    error!(" * Error powering down BH1730FVC: {}", e);
  }
}

/// Test the ISM330DHCX (IMU).
fn test_ism330dhcx(sensor: &mut Ism330Dhcx) {
  info!("Testing ISM330DHCX (IMU)");

  match sensor.chip_id() {
    Ok(id) if id == ISM330DHCX_CHIP_ID => {
      info!(" - ID                                  : 0x{:02x}", id)
    }
    Ok(id) => error!(" * Unexpected device ID 0x{:02x}", id),
    Err(e) => {
      error!(" * Error getting device ID: {}", e);
      return;
    }
  }

  if let Err(e) = sensor.configure() {
    error!(" * Error configuring IMU: {}", e);
    return;
  }

  match sensor.read_acceleration_mg() {
    Ok(acceleration) => {
      info!(" - Acceleration X                      : {:7.2} mg", acceleration[0]);
      info!(" - Acceleration Y                      : {:7.2} mg", acceleration[1]);
      info!(" - Acceleration Z                      : {:7.2} mg", acceleration[2]);
    }
    Err(e) => error!(" * Error reading accel raw data: {}", e),
  }

  match sensor.read_angular_rate_mdps() {
    Ok(rate) => {
      info!(" - Gyroscope X                         : {:10.2} °/s", rate[0] / 1000.0);
      info!(" - Gyroscope Y                         : {:10.2} °/s", rate[1] / 1000.0);
      info!(" - Gyroscope Z                         : {:10.2} °/s", rate[2] / 1000.0);
    }
    Err(e) => error!(" * Error reading gyro raw data: {}", e),
  }
}

/// Test the LIS2DUXS12 (accelerometer).
fn test_lis2duxs12(sensor: &mut Lis2duxs12) {
  info!("Testing LIS2DUXS12 (Accelerometer)");

  sensor.exit_deep_power_down();

  match sensor.chip_id() {
    Ok(id) if id == LIS2DUXS12_CHIP_ID => {
      info!(" - ID                                  : 0x{:02x}", id)
    }
    Ok(id) => error!(" * Unexpected device ID 0x{:02x}", id),
    Err(e) => error!(" * Error getting ID: {}", e),
  }

  if let Err(e) = sensor.reset() {
    error!(" * Error during reset: {}", e);
    return;
  }

  if let Err(e) = sensor.configure() {
    error!(" * Error setting mode: {}", e);
  }

  match sensor.read_acceleration_mg() {
    Ok(acceleration) => {
      info!(" - Acceleration X                      : {:7.2} mg", acceleration[0]);
      info!(" - Acceleration Y                      : {:7.2} mg", acceleration[1]);
      info!(" - Acceleration Z                      : {:7.2} mg", acceleration[2]);
    }
    Err(e) => error!(" * Error getting data: {}", e),
  }

  match sensor.read_temperature_c() {
    Ok(temperature) => {
      info!(" - Temperature                         : {:.2} °C", temperature)
    }
    Err(e) => error!(" * Error getting temperature: {}", e),
  }
}

/// Test the BME688 (environmental sensor).
fn test_bme688(sensor: &Rc<RefCell<Bme688>>, timekeeper: &dyn Timekeeper) {
  info!("Testing BME688 (Environmental Sensor)");
  let mut sensor = sensor.borrow_mut();

  if let Err(e) = sensor.probe() {
    error!(" * {}", e);
    return;
  }

  if let Err(e) = sensor.configure() {
    error!(" * Error configuring BME688: {}", e);
    return;
  }

  if let Err(e) = sensor.trigger_measurement() {
    error!(" * Error triggering measurement: {}", e);
    return;
  }

  if let Err(e) = wait_ready(timekeeper, "BME688", || sensor.data_ready()) {
    error!(" * {}", e);
    return;
  }

  match sensor.read() {
    Ok(measurement) => {
      info!(" - Temperature                         : {:.6} °C", measurement.temperature_c);
      info!(" - Pressure                            : {:.6} kPa", measurement.pressure_pa / 1000.0);
      info!(" - Humidity                            : {:.6} %", measurement.humidity_percent);
      info!(" - Gas Resistance                      : {:.6} ohm", measurement.gas_resistance_ohm);
    }
    Err(e) => error!(" * Error reading measurement: {}", e),
  }
}

/// Test the ILPS28QSW (pressure sensor).
fn test_ilps28qsw(sensor: &Rc<RefCell<Ilps28qsw>>) {
  info!("Testing ILPS28QSW (Pressure Sensor)");
  let mut sensor = sensor.borrow_mut();

  match sensor.chip_id() {
    Ok(id) if id == ILPS28QSW_CHIP_ID => {
      info!(" - ID                                  : 0x{:02x}", id)
    }
    Ok(id) => error!(" * Unexpected device ID 0x{:02x}", id),
    Err(e) => {
      error!(" * Error getting device ID: {}", e);
      return;
    }
  }

  if let Err(e) = sensor.reset() {
    error!(" * Error during reset: {}", e);
    return;
  }

  if let Err(e) = sensor.configure() {
    error!(" * Error during init: {}", e);
  }

  match sensor.read() {
    Ok((pressure_hpa, temperature_c)) => {
      info!(" - Pressure                            : {:4.2} kPa", pressure_hpa / 10.0);
      info!(" - Temperature                         : {:4.2} °C", temperature_c);
    }
    Err(e) => error!(" * Error getting data: {}", e),
  }
}

/// Test the SCD41 (CO2 sensor).
fn test_scd41(sensor: &Rc<RefCell<Scd41>>, timekeeper: &dyn Timekeeper) {
  info!("Testing SCD41 (CO2 Sensor)");
  let mut sensor = sensor.borrow_mut();

  if let Err(e) = sensor.power_on() {
    error!(" * Error powering on SCD41: {}", e);
    return;
  }

  if let Err(e) = sensor.stop_periodic_measurement() {
    error!(" * Error stopping periodic measurement: {}", e);
  }

  match sensor.serial_number() {
    Ok(serial) => info!(" - Serial Number                       : {}", serial),
    Err(e) => error!(" * Error getting serial number: {}", e),
  }

  if let Err(e) = sensor.measure_single_shot() {
    error!(" * Error starting single shot measurement: {}", e);
  }

  if let Err(e) = wait_ready(timekeeper, "SCD41", || sensor.data_ready()) {
    error!(" * {}", e);
  }

  match sensor.read_measurement() {
    Ok(measurement) => {
      info!(" - CO2                                 : {} ppm", measurement.co2_ppm);
      info!(" - Temperature                         : {:.2} °C", measurement.temperature_c());
      info!(" - Humidity                            : {:.2} % RH", measurement.humidity_percent());
    }
    Err(e) => error!(" * Error reading measurement: {}", e),
  }

  if let Err(e) = sensor.power_off() {
    error!(" * Error powering off SCD41: {}", e);
  }
}

/// Test the SGP41 (VOC sensor).
fn test_sgp41(sensor: &Rc<RefCell<Sgp41>>) {
  info!("Testing SGP41 (VOC Sensor)");
  let mut sensor = sensor.borrow_mut();

  if let Err(e) = sensor.power_on() {
    error!(" * Error powering on SGP41: {}", e);
    return;
  }

  match sensor.serial_number() {
    Ok(serial) => info!(" - Serial Number                       : {}", serial),
    Err(e) => error!(" * Error getting serial number: {}", e),
  }

  match sensor.execute_self_test() {
    Ok(result) if result == SELF_TEST_OK => {
      info!(" - Self Test                           : 0x{:04x}", result)
    }
    Ok(result) => error!(" * Self test reported failure: 0x{:04x}", result),
    Err(e) => error!(" * Error self testing: {}", e),
  }

  match sensor.measure_raw_signals(DEFAULT_HUMIDITY_TICKS, DEFAULT_TEMPERATURE_TICKS) {
    Ok((voc, nox)) => {
      info!(" - SRAW VOC                            : {}", voc);
      info!(" - SRAW NOX                            : {}", nox);
    }
    Err(e) => error!(" * Error reading signals: {}", e),
  }

  if let Err(e) = sensor.power_off() {
    error!(" * Error powering off SGP41: {}", e);
  }
}

/// Test the MAX77654 (PMIC) telemetry. The mutex is held for one
/// measurement call at a time.
fn test_max77654(pmic: &Arc<Mutex<Max77654>>) {
  info!("Testing MAX77654 (PMIC)");

  match pmic.lock().unwrap().charger_status() {
    Ok(status) => info!(" - Charger Status                      : 0x{:02x}", status),
    Err(e) => error!(" * Error reading charger status: {}", e),
  }

  for channel in TelemetryChannel::ALL {
    let measured = pmic.lock().unwrap().measure(channel);

    match measured {
      Ok(value) => info!(
        " - {:<37}: {} {}",
        channel.name(),
        value,
        channel.unit()
      ),
      Err(e) => {
        error!(" * PMIC measure failed: {}", e);
        return;
      }
    }
  }
}
