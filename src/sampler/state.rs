//! Shared run state
//!
//! `collected` and `active` are written from interrupt context (the
//! collector) and from task context (`start`/`stop`), so they live in a
//! single atomic cell and move only through CAS transitions; neither side
//! can observe a torn intermediate. The run target is published with
//! release ordering before the alarm is armed and read back with acquire
//! ordering from the collector.

use portable_atomic::{AtomicU32, Ordering};

use super::Error;

/// Packed into `phase`: bit 16 is the active flag, bits 0..16 hold the
/// number of samples collected so far.
const ACTIVE: u32 = 1 << 16;
const COLLECTED_MASK: u32 = 0xFFFF;

/// Outcome of recording one alarm fire.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RunProgress {
    /// Sample counted, more are needed; the alarm should be re-armed.
    InProgress(u16),
    /// Sample counted and the target is reached; the same transition
    /// deactivated the run, the alarm should be disarmed.
    Complete(u16),
    /// No run is active (an external `stop` won the race); nothing was
    /// counted.
    Idle,
}

/// The one piece of state shared between interrupt and task context.
pub struct RunState {
    phase: AtomicU32,
    target: AtomicU32,
}

impl RunState {
    /// An idle run state, suitable for a `static`.
    pub const fn new() -> Self {
        Self {
            phase: AtomicU32::new(0),
            target: AtomicU32::new(0),
        }
    }

    /// Activate a run of `target` samples, resetting `collected` to zero.
    ///
    /// Fails with [`Error::AlreadyRunning`] if a run is active; the
    /// active run is left untouched. The caller must arm the alarm only
    /// after this returns, so the collector never observes a half-built
    /// run.
    pub(super) fn begin(&self, target: u16) -> Result<(), Error> {
        let mut phase = self.phase.load(Ordering::Relaxed);
        loop {
            if phase & ACTIVE != 0 {
                return Err(Error::AlreadyRunning);
            }
            match self.phase.compare_exchange_weak(
                phase,
                ACTIVE,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => phase = actual,
            }
        }
        self.target.store(u32::from(target), Ordering::Release);
        Ok(())
    }

    /// Count one collected sample.
    ///
    /// Reaching the target clears the active flag in the same CAS as the
    /// final increment, so completion and the last count are indivisible.
    pub(super) fn record(&self) -> RunProgress {
        let target = self.target.load(Ordering::Acquire);
        let mut phase = self.phase.load(Ordering::Relaxed);
        loop {
            if phase & ACTIVE == 0 {
                return RunProgress::Idle;
            }
            let collected = (phase & COLLECTED_MASK) + 1;
            let complete = collected >= target;
            let next = if complete { collected } else { ACTIVE | collected };
            match self.phase.compare_exchange_weak(
                phase,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    return if complete {
                        RunProgress::Complete(collected as u16)
                    } else {
                        RunProgress::InProgress(collected as u16)
                    };
                }
                Err(actual) => phase = actual,
            }
        }
    }

    /// Deactivate the run, keeping `collected` and the target readable.
    ///
    /// Idempotent, and safe to race against [`record`](Self::record) from
    /// the other context; returns whether this call did the deactivation.
    pub(super) fn finish(&self) -> bool {
        let previous = self.phase.fetch_and(!ACTIVE, Ordering::AcqRel);
        previous & ACTIVE != 0
    }

    /// Whether a run is active.
    pub fn is_active(&self) -> bool {
        self.phase.load(Ordering::Acquire) & ACTIVE != 0
    }

    /// Samples collected in the current (or last) run.
    pub fn collected(&self) -> u16 {
        (self.phase.load(Ordering::Acquire) & COLLECTED_MASK) as u16
    }

    /// Target of the current (or last) run.
    pub fn target(&self) -> u16 {
        self.target.load(Ordering::Acquire) as u16
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}
