use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use log::{debug, error, info};
use tokio::sync::mpsc::UnboundedSender;

use crate::error::{StartError, ToggleFault};
use crate::peripheral::{DigitalOutput, Level};
use crate::scheduler::Scheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Constructed, not started yet. The output is still held.
    Idle,
    /// Exactly one toggle firing is pending.
    Running,
    /// Stopped after running (or after a fault); the output is closed.
    Released,
}

/// Drives one digital output between LOW and HIGH at a fixed period.
///
/// Every firing writes the negated level and then re-arms the next one, so
/// there is never more than one firing pending. [`stop`](Self::stop) cancels
/// that firing and releases the output; the controller cannot be restarted
/// afterwards.
pub struct BlinkController<O: DigitalOutput, S: Scheduler> {
    shared: Arc<Shared<O, S>>,
}

struct Shared<O: DigitalOutput, S: Scheduler> {
    scheduler: S,
    interval: Duration,
    state: Mutex<State<O, S::Token>>,
}

struct State<O, T> {
    output: O,
    phase: Phase,
    pending: Option<T>,
    toggles: u64,
    faults: Option<UnboundedSender<ToggleFault>>,
}

impl<O: DigitalOutput, S: Scheduler> BlinkController<O, S> {
    /// `output` should already be open and set to its initial level, LOW by
    /// convention. Nothing is scheduled until [`start`](Self::start).
    pub fn new(output: O, interval: Duration, scheduler: S) -> Self {
        Self {
            shared: Arc::new(Shared {
                scheduler,
                interval,
                state: Mutex::new(State {
                    output,
                    phase: Phase::Idle,
                    pending: None,
                    toggles: 0,
                    faults: None,
                }),
            }),
        }
    }

    /// Sets the channel on which toggle failures are reported.
    pub fn with_fault_channel(self, faults: UnboundedSender<ToggleFault>) -> Self {
        self.shared.lock().faults = Some(faults);
        self
    }

    pub fn start(&mut self) -> Result<(), StartError> {
        let mut state = self.shared.lock();
        match state.phase {
            Phase::Running => return Err(StartError::AlreadyRunning),
            Phase::Released => return Err(StartError::ClosedHandle),
            Phase::Idle if state.output.is_closed() => return Err(StartError::ClosedHandle),
            Phase::Idle => {}
        }
        if self.shared.interval.is_zero() {
            return Err(StartError::ZeroInterval);
        }

        state.phase = Phase::Running;
        Shared::arm(&self.shared, &mut state);
        info!(
            "Blinking {} every {:?}",
            state.output.name(),
            self.shared.interval
        );
        Ok(())
    }

    /// Cancels the pending toggle and releases the output. No toggle is
    /// written after this returns. Does nothing unless running.
    pub fn stop(&mut self) {
        let mut state = self.shared.lock();
        if state.phase != Phase::Running {
            return;
        }
        self.shared.release(&mut state);
        info!(
            "Stopped blinking {} after {} toggles",
            state.output.name(),
            state.toggles
        );
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().phase == Phase::Running
    }

    /// Number of successful writes since [`start`](Self::start).
    pub fn toggles(&self) -> u64 {
        self.shared.lock().toggles
    }

    pub fn level(&self) -> Level {
        self.shared.lock().output.read()
    }

    pub fn interval(&self) -> Duration {
        self.shared.interval
    }

    pub fn pin(&self) -> String {
        self.shared.lock().output.name().to_owned()
    }
}

impl<O: DigitalOutput, S: Scheduler> Drop for BlinkController<O, S> {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        self.shared.release(&mut state);
    }
}

impl<O: DigitalOutput, S: Scheduler> Shared<O, S> {
    fn lock(&self) -> MutexGuard<'_, State<O, S::Token>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn arm(this: &Arc<Self>, state: &mut State<O, S::Token>) {
        let weak = Arc::downgrade(this);
        let token = this
            .scheduler
            .schedule_after(this.interval, Box::new(move || Self::fire(&weak)));
        state.pending = Some(token);
    }

    fn fire(weak: &Weak<Self>) {
        let Some(this) = weak.upgrade() else {
            return;
        };
        let mut state = this.lock();
        // stop() may have won the lock while this firing was in flight
        if state.phase != Phase::Running {
            return;
        }
        state.pending = None;

        let level = !state.output.read();
        debug!("Turning {} {}", state.output.name(), level);

        match state.output.write(level) {
            Ok(()) => {
                state.toggles += 1;
                Self::arm(&this, &mut state);
            }
            Err(source) => {
                error!("Toggle failed, stopping: {source}");
                this.release(&mut state);
                let fault = ToggleFault {
                    pin: state.output.name().to_owned(),
                    toggles: state.toggles,
                    source,
                };
                if let Some(faults) = &state.faults {
                    // owner dropped the receiver; the fault is already logged
                    _ = faults.send(fault);
                }
            }
        }
    }

    fn release(&self, state: &mut State<O, S::Token>) {
        if let Some(token) = state.pending.take() {
            self.scheduler.cancel(&token);
        }
        if state.phase == Phase::Running {
            state.phase = Phase::Released;
        }
        state.output.close();
    }
}
