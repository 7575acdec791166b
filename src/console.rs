use shield_core::sequencer::{ChannelError, Transport};
use std::io::{self, Write};

/// CSV output over the USB serial console. The ESP-IDF console owns the
/// USB-CDC endpoint; readiness means the console accepts and flushes writes.
pub struct UsbConsole;

/// The USB console implementation.
impl UsbConsole {
  /// Create the console transport.
  pub fn new() -> Self {
    Self
  }
}

/// Implement the `Transport` trait for `UsbConsole`.
impl Transport for UsbConsole {
  /// Whether the console accepts writes.
  fn ready(&mut self) -> bool {
    io::stdout().flush().is_ok()
  }

  /// Write one newline-terminated line.
  ///
  /// # Parameters
  /// - `line`: The line, without its newline.
  ///
  /// # Returns
  /// The result of the operation.
  fn write_line(&mut self, line: &str) -> Result<(), ChannelError> {
    let mut stdout = io::stdout();

    stdout
      .write_all(line.as_bytes())
      .and_then(|_| stdout.write_all(b"\n"))
      .and_then(|_| stdout.flush())
      .map_err(|e| ChannelError::new(format!("Console write failed: {}", e)))
  }
}
