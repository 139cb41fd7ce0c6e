//! In-memory peripherals and a manually advanced clock.
//!
//! These stand in for the Raspberry Pi GPIO and the tokio timer in tests,
//! recording every write so toggling can be checked without hardware.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::{OpenError, OutputError};
use crate::peripheral::{DigitalOutput, Level, PeripheralManager};
use crate::scheduler::{Callback, Scheduler};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct Line {
    held: bool,
    level: Level,
    writes: Vec<Level>,
    releases: u32,
    /// 1-based index of the write that fails.
    fail_at: Option<usize>,
    permission_denied: bool,
}

/// Fixed set of named output lines.
#[derive(Debug, Clone)]
pub struct MockPeripheralManager {
    lines: BTreeMap<String, Arc<Mutex<Line>>>,
}

impl MockPeripheralManager {
    pub fn new<I, N>(names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        let lines = names
            .into_iter()
            .map(|name| (name.into(), Arc::default()))
            .collect();
        Self { lines }
    }

    /// Makes the `nth` write (counting from 1) to `name` fail.
    pub fn fail_write(&self, name: &str, nth: usize) {
        if let Some(line) = self.lines.get(name) {
            lock(line).fail_at = Some(nth);
        }
    }

    pub fn deny(&self, name: &str) {
        if let Some(line) = self.lines.get(name) {
            lock(line).permission_denied = true;
        }
    }

    pub fn probe(&self, name: &str) -> Option<LineProbe> {
        self.lines.get(name).cloned().map(LineProbe)
    }
}

impl PeripheralManager for MockPeripheralManager {
    type Output = MockOutput;

    fn digital_output_names(&self) -> Vec<String> {
        self.lines.keys().cloned().collect()
    }

    fn open_digital_output(&self, name: &str) -> Result<MockOutput, OpenError> {
        let line = self
            .lines
            .get(name)
            .ok_or_else(|| OpenError::NotFound(name.to_owned()))?;

        let mut state = lock(line);
        if state.permission_denied {
            return Err(OpenError::PermissionDenied {
                name: name.to_owned(),
                reason: "denied by mock".to_owned(),
            });
        }
        if state.held {
            return Err(OpenError::AlreadyInUse(name.to_owned()));
        }
        state.held = true;

        Ok(MockOutput {
            name: name.to_owned(),
            line: line.clone(),
            closed: false,
        })
    }
}

#[derive(Debug)]
pub struct MockOutput {
    name: String,
    line: Arc<Mutex<Line>>,
    closed: bool,
}

impl MockOutput {
    fn ensure_open(&self) -> Result<(), OutputError> {
        if self.closed {
            Err(OutputError::Closed(self.name.clone()))
        } else {
            Ok(())
        }
    }
}

impl DigitalOutput for MockOutput {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_initial_level(&mut self, level: Level) -> Result<(), OutputError> {
        self.ensure_open()?;
        lock(&self.line).level = level;
        Ok(())
    }

    fn write(&mut self, level: Level) -> Result<(), OutputError> {
        self.ensure_open()?;
        let mut line = lock(&self.line);
        if line.fail_at == Some(line.writes.len() + 1) {
            return Err(OutputError::Write {
                pin: self.name.clone(),
                reason: "injected failure".to_owned(),
            });
        }
        line.writes.push(level);
        line.level = level;
        Ok(())
    }

    fn read(&self) -> Level {
        lock(&self.line).level
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let mut line = lock(&self.line);
        line.held = false;
        line.releases += 1;
    }
}

/// Read-only view of a mock line for assertions.
#[derive(Debug, Clone)]
pub struct LineProbe(Arc<Mutex<Line>>);

impl LineProbe {
    pub fn writes(&self) -> Vec<Level> {
        lock(&self.0).writes.clone()
    }

    pub fn level(&self) -> Level {
        lock(&self.0).level
    }

    pub fn is_held(&self) -> bool {
        lock(&self.0).held
    }

    pub fn releases(&self) -> u32 {
        lock(&self.0).releases
    }
}

#[derive(Default)]
struct Queue {
    now: Duration,
    next_id: u64,
    pending: BTreeMap<(Duration, u64), Callback>,
}

/// Scheduler driven by [`advance`](ManualScheduler::advance) instead of a
/// real clock.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    queue: Arc<Mutex<Queue>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManualToken {
    deadline: Duration,
    id: u64,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        lock(&self.queue).now
    }

    pub fn pending(&self) -> usize {
        lock(&self.queue).pending.len()
    }

    /// Moves the clock forward, firing every callback that falls due in
    /// deadline order. Callbacks scheduled while advancing fire too if their
    /// deadline is within the window.
    pub fn advance(&self, by: Duration) {
        let target = lock(&self.queue).now + by;
        loop {
            let due = {
                let mut queue = lock(&self.queue);
                match queue.pending.keys().next().copied() {
                    Some(key @ (deadline, _)) if deadline <= target => {
                        queue.now = deadline;
                        queue.pending.remove(&key)
                    }
                    _ => None,
                }
            };
            match due {
                Some(callback) => callback(),
                None => break,
            }
        }
        lock(&self.queue).now = target;
    }
}

impl Scheduler for ManualScheduler {
    type Token = ManualToken;

    fn schedule_after(&self, delay: Duration, callback: Callback) -> ManualToken {
        let mut queue = lock(&self.queue);
        let token = ManualToken {
            deadline: queue.now + delay,
            id: queue.next_id,
        };
        queue.next_id += 1;
        queue.pending.insert((token.deadline, token.id), callback);
        token
    }

    fn cancel(&self, token: &ManualToken) {
        lock(&self.queue).pending.remove(&(token.deadline, token.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_open_of_held_line_fails() {
        let manager = MockPeripheralManager::new(["BCM6"]);
        let mut first = manager.open_digital_output("BCM6").unwrap();

        assert!(matches!(
            manager.open_digital_output("BCM6"),
            Err(OpenError::AlreadyInUse(_))
        ));

        first.close();
        assert!(manager.open_digital_output("BCM6").is_ok());
    }

    #[test]
    fn open_reports_unknown_and_denied_lines() {
        let manager = MockPeripheralManager::new(["BCM6", "BCM13"]);
        manager.deny("BCM13");

        assert!(matches!(
            manager.open_digital_output("BCM99"),
            Err(OpenError::NotFound(_))
        ));
        assert!(matches!(
            manager.open_digital_output("BCM13"),
            Err(OpenError::PermissionDenied { .. })
        ));
        assert_eq!(manager.digital_output_names(), ["BCM13", "BCM6"]);
    }

    #[test]
    fn closed_output_rejects_writes() {
        let manager = MockPeripheralManager::new(["BCM6"]);
        let mut output = manager.open_digital_output("BCM6").unwrap();
        output.write(Level::High).unwrap();

        output.close();
        output.close();

        assert!(output.is_closed());
        assert!(matches!(
            output.write(Level::Low),
            Err(OutputError::Closed(_))
        ));
        assert!(matches!(
            output.set_initial_level(Level::Low),
            Err(OutputError::Closed(_))
        ));
        assert_eq!(manager.probe("BCM6").unwrap().releases(), 1);
    }

    #[test]
    fn initial_level_is_not_a_write() {
        let manager = MockPeripheralManager::new(["BCM6"]);
        let mut output = manager.open_digital_output("BCM6").unwrap();
        output.set_initial_level(Level::High).unwrap();

        let probe = manager.probe("BCM6").unwrap();
        assert_eq!(probe.level(), Level::High);
        assert!(probe.writes().is_empty());
    }

    #[test]
    fn manual_scheduler_fires_in_deadline_order() {
        let scheduler = ManualScheduler::new();
        let fired = Arc::new(Mutex::new(Vec::new()));
        for (delay, tag) in [(30, 'c'), (10, 'a'), (20, 'b')] {
            let fired = fired.clone();
            scheduler.schedule_after(
                Duration::from_millis(delay),
                Box::new(move || fired.lock().unwrap().push(tag)),
            );
        }

        scheduler.advance(Duration::from_millis(25));
        assert_eq!(*fired.lock().unwrap(), ['a', 'b']);
        assert_eq!(scheduler.now(), Duration::from_millis(25));

        scheduler.advance(Duration::from_millis(5));
        assert_eq!(*fired.lock().unwrap(), ['a', 'b', 'c']);
    }

    #[test]
    fn manual_scheduler_honours_cancel() {
        let scheduler = ManualScheduler::new();
        let fired = Arc::new(Mutex::new(0));
        let token = {
            let fired = fired.clone();
            scheduler.schedule_after(
                Duration::from_millis(10),
                Box::new(move || *fired.lock().unwrap() += 1),
            )
        };

        scheduler.cancel(&token);
        scheduler.cancel(&token);
        scheduler.advance(Duration::from_millis(100));
        assert_eq!(*fired.lock().unwrap(), 0);
        assert_eq!(scheduler.pending(), 0);
    }
}
