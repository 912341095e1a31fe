use super::keypad::Keypad;
use super::vm::VirtualMachine;
use crate::error::VmError;
use std::{
    panic,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};
use tracing::debug;

/// Cancel signal for a running machine, cheap to clone across threads.
#[derive(Clone, Debug, Default)]
pub struct Stopper(Arc<AtomicBool>);

impl Stopper {
    pub fn new() -> Stopper {
        Stopper::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Counts wall-clock timer periods that elapsed since it was last asked.
pub struct TimerClock {
    interval: Duration,
    next: Instant,
}

impl TimerClock {
    pub fn new(interval: Duration) -> TimerClock {
        TimerClock {
            interval,
            next: Instant::now() + interval,
        }
    }

    /// Number of periods due now. After a long stall the count is capped at
    /// 255, enough to drain any timer, and the clock resynchronises.
    pub fn due_ticks(&mut self) -> u32 {
        if self.interval.as_nanos() == 0 {
            return 0;
        }
        let now = Instant::now();
        let mut ticks = 0;
        while now >= self.next {
            ticks += 1;
            self.next += self.interval;
            if ticks == u8::MAX as u32 {
                self.next = now + self.interval;
                break;
            }
        }
        ticks
    }
}

/// Stops the wrapped signal when dropped.
struct StopOnDrop(Stopper);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        self.0.stop();
    }
}

/// A machine running on its own thread. Dropping the handle without joining
/// stops the machine before its next instruction.
pub struct RunHandle<K: Keypad> {
    stopper: Stopper,
    join_handle: JoinHandle<(VirtualMachine<K>, Result<(), VmError>)>,
    _stop_on_drop: StopOnDrop,
}

impl<K: Keypad> RunHandle<K> {
    pub fn stopper(&self) -> &Stopper {
        &self.stopper
    }

    /// Asks the machine to stop before its next instruction. A machine
    /// blocked on a key read only notices once its keypad returns.
    pub fn stop(&self) {
        self.stopper.stop();
    }

    /// Waits for the run to end and hands the machine back with the result.
    pub fn join(self) -> (VirtualMachine<K>, Result<(), VmError>) {
        match self.join_handle.join() {
            Ok(outcome) => outcome,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    /// Stops the machine and waits for it.
    pub fn stop_and_join(self) -> (VirtualMachine<K>, Result<(), VmError>) {
        self.stop();
        self.join()
    }
}

/// Runs `vm` on a new thread until `stopper` is stopped or a step fails.
pub fn spawn<K>(mut vm: VirtualMachine<K>, stopper: Stopper) -> RunHandle<K>
where
    K: Keypad + Send + 'static,
{
    let run_stopper = stopper.clone();
    let join_handle = thread::spawn(move || {
        let result = vm.run(&run_stopper);
        debug!(ok = result.is_ok(), "executor thread finished");
        (vm, result)
    });
    RunHandle {
        _stop_on_drop: StopOnDrop(stopper.clone()),
        stopper,
        join_handle,
    }
}
