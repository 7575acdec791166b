//! The acquisition sequencer.
//!
//! Drives a fixed set of sensor channels through the firmware's life cycle:
//! transport and mandatory-device checks, one self-test pass, per-sensor
//! power-up and configuration, the steady-state sample/print/pace loop, and
//! an orderly power-down in reverse power-up order.

use core::fmt;

use log::{error, info, warn};

use crate::pacing::Pacer;
use crate::poll::Timekeeper;
use crate::record::{SensorRecord, CSV_HEADER};

/// Error raised by a sensor channel operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelError {
    /// Human readable failure description.
    pub message: String,
}

impl ChannelError {
    /// Create a new channel error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ChannelError {}

/// Fatal startup error. Any of these aborts the run before the steady-state
/// loop is entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatalError {
    /// The output transport never became ready.
    TransportNotReady,

    /// A mandatory device did not respond to its presence probe.
    DeviceNotReady {
        /// Channel name.
        name: &'static str,
    },

    /// A channel failed to power up or configure.
    PowerOn {
        /// Channel name.
        name: &'static str,

        /// Underlying failure.
        error: ChannelError,
    },

    /// Writing to the transport failed.
    Transport {
        /// Underlying failure.
        error: ChannelError,
    },
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalError::TransportNotReady => write!(f, "Output transport not ready"),
            FatalError::DeviceNotReady { name } => {
                write!(f, "Mandatory device {name} not ready")
            }
            FatalError::PowerOn { name, error } => {
                write!(f, "Powering on {name} failed: {error}")
            }
            FatalError::Transport { error } => write!(f, "Transport write failed: {error}"),
        }
    }
}

impl std::error::Error for FatalError {}

/// What to do when a sensor fails during the steady-state loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Treat any sensor malfunction as requiring a full safe shutdown: the
    /// loop ends and every channel is powered off.
    #[default]
    FailStop,

    /// Keep acquiring: the failed sensor keeps its previous field values for
    /// this record and is retried next cycle.
    Isolate,
}

/// One sensor's hookup to the acquisition life cycle.
pub trait SensorChannel {
    /// Channel name used in log messages.
    fn name(&self) -> &'static str;

    /// Whether startup must abort when this device does not answer its probe.
    fn mandatory(&self) -> bool {
        false
    }

    /// Probe device presence without side effects.
    fn probe(&mut self) -> Result<(), ChannelError> {
        Ok(())
    }

    /// Assert power rails and perform one-time configuration.
    fn power_on(&mut self, timekeeper: &dyn Timekeeper) -> Result<(), ChannelError>;

    /// Wait for data-ready, read, convert and store into the record.
    fn sample(
        &mut self,
        timekeeper: &dyn Timekeeper,
        record: &mut SensorRecord,
    ) -> Result<(), ChannelError>;

    /// Enter the device's low-power state and release power rails.
    fn power_off(&mut self, timekeeper: &dyn Timekeeper) -> Result<(), ChannelError>;
}

/// The CSV output transport.
pub trait Transport {
    /// Whether the transport is up and accepting writes.
    fn ready(&mut self) -> bool;

    /// Write one line, newline terminated by the transport.
    fn write_line(&mut self, line: &str) -> Result<(), ChannelError>;
}

/// The acquisition sequencer. Channels are held in power-up order; shutdown
/// walks them in reverse.
pub struct Sequencer<'a> {
    channels: Vec<Box<dyn SensorChannel + 'a>>,
    policy: FailurePolicy,
    period_ms: u32,
}

impl<'a> Sequencer<'a> {
    /// Create a sequencer.
    ///
    /// # Arguments
    /// * `channels` - The sensor channels in power-up order.
    /// * `policy` - The steady-state failure policy.
    /// * `period_ms` - The sampling period in milliseconds.
    ///
    /// # Returns
    /// * `Sequencer` - The sequencer.
    pub fn new(
        channels: Vec<Box<dyn SensorChannel + 'a>>,
        policy: FailurePolicy,
        period_ms: u32,
    ) -> Self {
        Self {
            channels,
            policy,
            period_ms,
        }
    }

    /// Run the full life cycle. Returns `Ok(())` only after the steady-state
    /// loop has ended and every channel has been through power-off; any
    /// startup failure returns early without touching sensor power.
    ///
    /// # Arguments
    /// * `timekeeper` - The clock and delay provider.
    /// * `transport` - The CSV output transport.
    /// * `self_test` - Diagnostics pass run once before power-up; its results
    ///   are logged by the callee and never gate progress.
    ///
    /// # Returns
    /// * `Result<(), FatalError>` - Clean shutdown, or the startup failure.
    pub fn run(
        &mut self,
        timekeeper: &dyn Timekeeper,
        transport: &mut dyn Transport,
        self_test: &mut dyn FnMut(),
    ) -> Result<(), FatalError> {
        if !transport.ready() {
            error!("Output transport not ready");
            return Err(FatalError::TransportNotReady);
        }

        for channel in self.channels.iter_mut().filter(|c| c.mandatory()) {
            if let Err(error) = channel.probe() {
                error!(" * {} not ready: {}", channel.name(), error);
                return Err(FatalError::DeviceNotReady {
                    name: channel.name(),
                });
            }
        }

        info!("===== Testing all sensors ======");
        self_test();

        info!("===== Gathering Data ======");
        for channel in self.channels.iter_mut() {
            info!("Preparing {}", channel.name());
            if let Err(error) = channel.power_on(timekeeper) {
                error!(" * {} Error powering on: {}", channel.name(), error);
                return Err(FatalError::PowerOn {
                    name: channel.name(),
                    error,
                });
            }
        }

        // Sensors are powered from here on: any exit path walks power-off.
        if let Err(error) = transport.write_line(CSV_HEADER) {
            self.shutdown(timekeeper);
            return Err(FatalError::Transport { error });
        }

        self.acquire(timekeeper, transport);
        self.shutdown(timekeeper);

        Ok(())
    }

    /// The steady-state loop. Ends on the first sensor failure under
    /// `FailStop`, or on a transport write failure.
    fn acquire(&mut self, timekeeper: &dyn Timekeeper, transport: &mut dyn Transport) {
        let mut record = SensorRecord::default();
        let mut pacer = Pacer::new(self.period_ms, timekeeper.uptime_ms());

        'acquisition: loop {
            for channel in self.channels.iter_mut() {
                if let Err(error) = channel.sample(timekeeper, &mut record) {
                    error!(" * {} Error reading measurement: {}", channel.name(), error);

                    match self.policy {
                        FailurePolicy::FailStop => break 'acquisition,
                        FailurePolicy::Isolate => {
                            warn!(
                                " * {} skipped this cycle, keeping previous values",
                                channel.name()
                            );
                        }
                    }
                }
            }

            record.timestamp_ms = timekeeper.uptime_ms();

            if let Err(error) = transport.write_line(&record.to_csv_line()) {
                error!(" * Error writing record: {}", error);
                break 'acquisition;
            }

            pacer.pace(timekeeper);
        }
    }

    /// Power down every channel in reverse power-up order. Individual
    /// failures are logged and do not stop the walk.
    fn shutdown(&mut self, timekeeper: &dyn Timekeeper) {
        info!("===== Powering off sensors ======");

        for channel in self.channels.iter_mut().rev() {
            info!(" - Power off {}", channel.name());
            if let Err(error) = channel.power_off(timekeeper) {
                error!(" * {} Error powering off: {}", channel.name(), error);
            }
        }
    }
}

/// Tests.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockClock;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Shared journal of life-cycle events, in call order.
    type Journal = Rc<RefCell<Vec<String>>>;

    /// Scripted channel: stores a fixed CO2 value on sample and fails on
    /// request.
    struct ScriptedChannel {
        name: &'static str,
        mandatory: bool,
        journal: Journal,
        probe_ok: bool,
        power_on_ok: bool,
        /// Cycle index (0-based) at which sampling starts failing, if any.
        fail_sample_at: Option<u32>,
        samples: u32,
        co2: u16,
    }

    impl ScriptedChannel {
        fn new(name: &'static str, journal: &Journal) -> Self {
            Self {
                name,
                mandatory: false,
                journal: Rc::clone(journal),
                probe_ok: true,
                power_on_ok: true,
                fail_sample_at: None,
                samples: 0,
                co2: 800,
            }
        }
    }

    impl SensorChannel for ScriptedChannel {
        fn name(&self) -> &'static str {
            self.name
        }

        fn mandatory(&self) -> bool {
            self.mandatory
        }

        fn probe(&mut self) -> Result<(), ChannelError> {
            self.journal.borrow_mut().push(format!("probe {}", self.name));
            if self.probe_ok {
                Ok(())
            } else {
                Err(ChannelError::new("no response"))
            }
        }

        fn power_on(&mut self, _timekeeper: &dyn Timekeeper) -> Result<(), ChannelError> {
            self.journal
                .borrow_mut()
                .push(format!("power_on {}", self.name));
            if self.power_on_ok {
                Ok(())
            } else {
                Err(ChannelError::new("enable line stuck"))
            }
        }

        fn sample(
            &mut self,
            _timekeeper: &dyn Timekeeper,
            record: &mut SensorRecord,
        ) -> Result<(), ChannelError> {
            let cycle = self.samples;
            self.samples += 1;

            if self.fail_sample_at.is_some_and(|at| cycle >= at) {
                return Err(ChannelError::new("read failure"));
            }

            record.scd41_co2 = self.co2;
            Ok(())
        }

        fn power_off(&mut self, _timekeeper: &dyn Timekeeper) -> Result<(), ChannelError> {
            self.journal
                .borrow_mut()
                .push(format!("power_off {}", self.name));
            Ok(())
        }
    }

    /// Transport that records lines and can be scripted to stop accepting
    /// writes after a budget, ending the otherwise endless loop.
    struct MockTransport {
        ready: bool,
        lines: Vec<String>,
        accept: usize,
    }

    impl MockTransport {
        fn accepting(lines: usize) -> Self {
            Self {
                ready: true,
                lines: Vec::new(),
                accept: lines,
            }
        }
    }

    impl Transport for MockTransport {
        fn ready(&mut self) -> bool {
            self.ready
        }

        fn write_line(&mut self, line: &str) -> Result<(), ChannelError> {
            if self.lines.len() >= self.accept {
                return Err(ChannelError::new("transport closed"));
            }
            self.lines.push(line.to_string());
            Ok(())
        }
    }

    fn channels(
        journal: &Journal,
        names: &[&'static str],
    ) -> Vec<Box<dyn SensorChannel + 'static>> {
        names
            .iter()
            .map(|name| Box::new(ScriptedChannel::new(name, journal)) as Box<dyn SensorChannel>)
            .collect()
    }

    #[test]
    fn transport_not_ready_is_fatal_before_any_power_on() {
        let journal: Journal = Rc::default();
        let mut sequencer =
            Sequencer::new(channels(&journal, &["a", "b"]), FailurePolicy::FailStop, 5000);

        let mut transport = MockTransport::accepting(10);
        transport.ready = false;

        let result = sequencer.run(&MockClock::new(), &mut transport, &mut || {});
        assert_eq!(result, Err(FatalError::TransportNotReady));
        assert!(journal.borrow().is_empty());
    }

    #[test]
    fn mandatory_probe_failure_aborts_without_power_on() {
        let journal: Journal = Rc::default();
        let mut list = channels(&journal, &["co2", "env"]);

        let mut env = ScriptedChannel::new("env", &journal);
        env.mandatory = true;
        env.probe_ok = false;
        list[1] = Box::new(env);

        let mut sequencer = Sequencer::new(list, FailurePolicy::FailStop, 5000);
        let mut transport = MockTransport::accepting(10);
        let mut tested = false;

        let result = sequencer.run(&MockClock::new(), &mut transport, &mut || tested = true);

        assert_eq!(result, Err(FatalError::DeviceNotReady { name: "env" }));
        assert_eq!(journal.borrow().as_slice(), ["probe env"]);
        assert!(!tested);
        assert!(transport.lines.is_empty());
    }

    #[test]
    fn power_on_failure_aborts_startup() {
        let journal: Journal = Rc::default();
        let mut list = channels(&journal, &["a", "b", "c"]);

        let mut b = ScriptedChannel::new("b", &journal);
        b.power_on_ok = false;
        list[1] = Box::new(b);

        let mut sequencer = Sequencer::new(list, FailurePolicy::FailStop, 5000);
        let mut transport = MockTransport::accepting(10);

        let result = sequencer.run(&MockClock::new(), &mut transport, &mut || {});

        assert!(matches!(
            result,
            Err(FatalError::PowerOn { name: "b", .. })
        ));
        assert_eq!(
            journal.borrow().as_slice(),
            ["power_on a", "power_on b"]
        );
        assert!(transport.lines.is_empty());
    }

    #[test]
    fn mid_loop_failure_stops_output_and_powers_down_in_reverse() {
        let journal: Journal = Rc::default();
        let mut list = channels(&journal, &["a", "b", "c", "d"]);

        // Channel "b" fails on the third cycle.
        let mut b = ScriptedChannel::new("b", &journal);
        b.fail_sample_at = Some(2);
        list[1] = Box::new(b);

        let mut sequencer = Sequencer::new(list, FailurePolicy::FailStop, 5000);
        let mut transport = MockTransport::accepting(100);

        let result = sequencer.run(&MockClock::new(), &mut transport, &mut || {});
        assert_eq!(result, Ok(()));

        // Header plus exactly two records, nothing after the failure.
        assert_eq!(transport.lines.len(), 3);
        assert_eq!(transport.lines[0], CSV_HEADER);

        let shutdown: Vec<_> = journal
            .borrow()
            .iter()
            .filter(|entry| entry.starts_with("power_off"))
            .cloned()
            .collect();
        assert_eq!(
            shutdown,
            ["power_off d", "power_off c", "power_off b", "power_off a"]
        );
    }

    #[test]
    fn every_cycle_emits_one_record_with_timestamp() {
        let journal: Journal = Rc::default();
        let clock = MockClock::new();

        let mut sequencer =
            Sequencer::new(channels(&journal, &["co2"]), FailurePolicy::FailStop, 5000);

        // Header plus two records, then the transport closes the loop.
        let mut transport = MockTransport::accepting(3);
        let result = sequencer.run(&clock, &mut transport, &mut || {});
        assert_eq!(result, Ok(()));

        assert_eq!(transport.lines.len(), 3);
        assert!(transport.lines[1].starts_with("0,800,"));

        // The second record is stamped one period later.
        assert!(transport.lines[2].starts_with("5000,800,"));
    }

    #[test]
    fn isolate_policy_keeps_the_loop_alive() {
        let journal: Journal = Rc::default();
        let mut list = channels(&journal, &["a", "b"]);

        let mut b = ScriptedChannel::new("b", &journal);
        b.fail_sample_at = Some(0);
        list[1] = Box::new(b);

        let mut sequencer = Sequencer::new(list, FailurePolicy::Isolate, 5000);
        let mut transport = MockTransport::accepting(4);

        let result = sequencer.run(&MockClock::new(), &mut transport, &mut || {});
        assert_eq!(result, Ok(()));

        // The failing channel never blocks output: header plus three records.
        assert_eq!(transport.lines.len(), 4);
    }

    #[test]
    fn self_test_runs_once_before_power_up() {
        let journal: Journal = Rc::default();
        let test_journal = Rc::clone(&journal);

        let mut sequencer =
            Sequencer::new(channels(&journal, &["a"]), FailurePolicy::FailStop, 5000);

        let mut transport = MockTransport::accepting(1);
        let result = sequencer.run(&MockClock::new(), &mut transport, &mut || {
            test_journal.borrow_mut().push("self_test".to_string());
        });
        assert_eq!(result, Ok(()));

        assert_eq!(
            journal.borrow().as_slice(),
            ["self_test", "power_on a", "power_off a"]
        );
    }
}
