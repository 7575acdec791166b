use crate::board::{AmuxAdc, SystemBus};
use crate::error::AppError;
use crate::sensors::max77654::{Max77654, TelemetryChannel};
use log::{info, warn};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Battery telemetry sampling interval of the monitor thread.
const MONITOR_INTERVAL: Duration = Duration::from_secs(30);

/// Battery voltage below which the monitor warns, in millivolts.
const LOW_BATTERY_MV: i32 = 3300;

/// Monitor thread stack size in bytes.
const MONITOR_STACK_BYTES: usize = 8192;

/// The power management subsystem: owns the PMIC handle and runs a
/// background thread that periodically samples battery telemetry. The PMIC
/// handle is shared behind a mutex; every user locks it for exactly one
/// measurement call.
pub struct PowerManager {
  /// The shared PMIC handle.
  pmic: Arc<Mutex<Max77654>>,
}

/// The power manager implementation.
impl PowerManager {
  /// Create the power management subsystem.
  ///
  /// # Parameters
  /// - `i2c`: The system I2C bus.
  /// - `amux`: The AMUX readback path.
  ///
  /// # Returns
  /// The power manager.
  pub fn init(i2c: SystemBus, amux: AmuxAdc) -> Self {
    Self {
      pmic: Arc::new(Mutex::new(Max77654::new(i2c, amux))),
    }
  }

  /// Start the battery monitor thread.
  ///
  /// # Returns
  /// The result of the operation.
  pub fn start(&self) -> Result<(), AppError> {
    let pmic = Arc::clone(&self.pmic);

    thread::Builder::new()
      .name("pwr-monitor".into())
      .stack_size(MONITOR_STACK_BYTES)
      .spawn(move || monitor_loop(pmic))
      .map_err(|e| AppError::PowerError(format!("Failed to spawn monitor thread: {}", e)))?;

    Ok(())
  }

  /// The shared PMIC handle.
  pub fn pmic(&self) -> Arc<Mutex<Max77654>> {
    Arc::clone(&self.pmic)
  }
}

/// Periodically sample battery voltage and system voltage, warn when the
/// battery runs low.
///
/// # Parameters
/// - `pmic`: The shared PMIC handle.
fn monitor_loop(pmic: Arc<Mutex<Max77654>>) {
  loop {
    thread::sleep(MONITOR_INTERVAL);

    let battery_mv = {
      let mut pmic = pmic.lock().unwrap();
      pmic.measure(TelemetryChannel::BatteryVoltage)
    };

    let vsys_mv = {
      let mut pmic = pmic.lock().unwrap();
      pmic.measure(TelemetryChannel::Vsys)
    };

    match (battery_mv, vsys_mv) {
      (Ok(battery), Ok(vsys)) => {
        info!("Battery: {} mV, VSYS: {} mV", battery, vsys);

        if battery < LOW_BATTERY_MV {
          warn!("Battery voltage low: {} mV", battery);
        }
      }
      (Err(e), _) | (_, Err(e)) => warn!("PMIC telemetry failed: {}", e),
    }
  }
}
