use esp_idf_svc::hal::delay::FreeRtos;
use shield_core::poll::Timekeeper;
use std::time::Instant;

/// Timekeeper backed by the FreeRTOS tick: uptime relative to construction,
/// delays via the RTOS so other tasks keep running.
pub struct FreeRtosTime {
  /// Boot reference point.
  boot: Instant,
}

/// The FreeRTOS timekeeper implementation.
impl FreeRtosTime {
  /// Create a timekeeper; uptime is measured from this moment.
  pub fn new() -> Self {
    Self {
      boot: Instant::now(),
    }
  }
}

/// Implement the `Timekeeper` trait for `FreeRtosTime`.
impl Timekeeper for FreeRtosTime {
  /// Milliseconds since boot.
  fn uptime_ms(&self) -> u32 {
    self.boot.elapsed().as_millis() as u32
  }

  /// Block for the given number of milliseconds.
  fn sleep_ms(&self, ms: u32) {
    FreeRtos::delay_ms(ms);
  }

  /// Block for the given number of microseconds.
  fn sleep_us(&self, us: u32) {
    FreeRtos::delay_us(us);
  }
}
