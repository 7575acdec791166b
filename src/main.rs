mod board;
mod channels;
mod console;
mod error;
mod power;
mod selftest;
mod sensors;
mod time;

use crate::board::Board;
use crate::channels::{
  As7331Channel, Bh1730Channel, Bme688Channel, Ilps28qswChannel, Scd41Channel, Sgp41Channel,
};
use crate::console::UsbConsole;
use crate::error::AppError;
use crate::power::PowerManager;
use crate::selftest::Devices;
use crate::sensors::as7331::As7331;
use crate::sensors::bh1730::Bh1730;
use crate::sensors::bme688::Bme688;
use crate::sensors::ilps28qsw::Ilps28qsw;
use crate::sensors::ism330dhcx::Ism330Dhcx;
use crate::sensors::lis2duxs12::Lis2duxs12;
use crate::sensors::max_m10s::MaxM10s;
use crate::sensors::scd41::Scd41;
use crate::sensors::sgp41::Sgp41;
use crate::time::FreeRtosTime;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::prelude::*;
use esp_idf_svc::log::EspLogger;
use esp_idf_svc::sys::link_patches;
use log::{error, info};
use shield_core::sequencer::{FailurePolicy, SensorChannel, Sequencer};
use std::cell::RefCell;
use std::rc::Rc;

/// Sampling period in milliseconds.
const SAMPLING_PERIOD_MS: u32 = 5000;

/// Settle time between power management start and transport checks.
const STARTUP_SETTLE_MS: u32 = 100;

/// Settle time before the sensor self tests.
const SELF_TEST_SETTLE_MS: u32 = 5000;

/// Delay before exiting on a fatal error.
const ERROR_DELAY_MS: u32 = 1000;

/// Process exit code for fatal startup errors.
const EXIT_FATAL: i32 = -1;

/// This function initializes the system and runs the acquisition life cycle.
///
/// # Returns
/// The result of the operation.
fn main() -> Result<(), AppError> {
  // Initialize system
  link_patches();
  EspLogger::initialize_default();
  info!("Sensor shield data logger starting...");

  let peripherals = Peripherals::take()
    .map_err(|_| AppError::PeripheralsError("Failed to acquire ESP32 peripherals".into()))?;

  let board = Board::new(peripherals)?;

  let signals = Rc::new(RefCell::new(board.signals));
  signals.borrow_mut().set_activity(false);

  // Initialize and start power management
  let power = PowerManager::init(board.bus_system.clone(), board.amux);
  power.start()?;

  FreeRtos::delay_ms(STARTUP_SETTLE_MS);

  // Sensor contexts, shared between the self-test pass and the channels.
  let scd41 = Rc::new(RefCell::new(Scd41::new(
    board.bus_system.clone(),
    board.scd41_power,
    board.scd41_bus_enable,
  )));
  let sgp41 = Rc::new(RefCell::new(Sgp41::new(
    board.bus_system.clone(),
    board.sgp41_power,
    board.sgp41_bus_enable,
  )));
  let ilps28qsw = Rc::new(RefCell::new(Ilps28qsw::new(board.bus_env.clone())));
  let bme688 = Rc::new(RefCell::new(Bme688::new(board.bus_env.clone())));
  let bh1730 = Rc::new(RefCell::new(Bh1730::new(board.bus_env.clone())));
  let as7331 = Rc::new(RefCell::new(As7331::new(
    board.bus_env.clone(),
    board.as7331_bus_enable,
    board.as7331_ready,
  )));

  let mut devices = Devices {
    bus_system: board.bus_system.clone(),
    bus_env: board.bus_env.clone(),
    scd41: Rc::clone(&scd41),
    sgp41: Rc::clone(&sgp41),
    ilps28qsw: Rc::clone(&ilps28qsw),
    bme688: Rc::clone(&bme688),
    bh1730: Rc::clone(&bh1730),
    as7331: Rc::clone(&as7331),
    ism330dhcx: Ism330Dhcx::new(board.bus_system.clone()),
    lis2duxs12: Lis2duxs12::new(board.bus_system.clone()),
    pmic: power.pmic(),
    max_m10s: MaxM10s::new(board.bus_env.clone()),
    signals: Rc::clone(&signals),
  };

  // Channels in power-up order; shutdown walks them in reverse.
  let channels: Vec<Box<dyn SensorChannel>> = vec![
    Box::new(Scd41Channel::new(Rc::clone(&scd41), Rc::clone(&signals))),
    Box::new(Sgp41Channel::new(Rc::clone(&sgp41), Rc::clone(&signals))),
    Box::new(Ilps28qswChannel::new(
      Rc::clone(&ilps28qsw),
      Rc::clone(&signals),
    )),
    Box::new(Bme688Channel::new(Rc::clone(&bme688), Rc::clone(&signals))),
    Box::new(Bh1730Channel::new(Rc::clone(&bh1730), Rc::clone(&signals))),
    Box::new(As7331Channel::new(Rc::clone(&as7331), Rc::clone(&signals))),
  ];

  let timekeeper = FreeRtosTime::new();
  let mut transport = UsbConsole::new();
  let mut sequencer = Sequencer::new(channels, FailurePolicy::FailStop, SAMPLING_PERIOD_MS);

  FreeRtos::delay_ms(SELF_TEST_SETTLE_MS);

  let result = sequencer.run(&timekeeper, &mut transport, &mut || {
    selftest::run_all(&mut devices, &timekeeper)
  });

  match result {
    Ok(()) => {
      info!("Acquisition finished");
      Ok(())
    }
    Err(e) => {
      error!("{}", e);
      FreeRtos::delay_ms(ERROR_DELAY_MS);
      std::process::exit(EXIT_FATAL);
    }
  }
}
