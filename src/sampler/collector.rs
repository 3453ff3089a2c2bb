//! Interrupt-context sample collector
//!
//! The highest-frequency path in the pipeline. Per alarm fire it does one
//! converter read, one non-blocking queue push and one CAS on the shared
//! run state. No allocation, no blocking, no other I/O.

use super::queue::SampleProducer;
use super::state::{RunProgress, RunState};
use super::{SampleAlarm, SampleSource};

/// The interrupt-side half of the pipeline.
///
/// Owns the sample source and the queue producer; meant to be moved into
/// the timer interrupt handler and driven by [`on_alarm`](Self::on_alarm).
pub struct Collector<'a, S> {
    source: S,
    producer: SampleProducer<'a>,
    run: &'a RunState,
    dropped: u32,
}

impl<'a, S: SampleSource> Collector<'a, S> {
    pub fn new(source: S, producer: SampleProducer<'a>, run: &'a RunState) -> Self {
        Self {
            source,
            producer,
            run,
            dropped: 0,
        }
    }

    /// Handle one alarm fire.
    ///
    /// Reads a sample, hands it to the consumer (a full queue drops it
    /// silently) and counts it against the run. While the run is short of
    /// its target the alarm is re-armed for the next fire; the completing
    /// fire, or a racing external stop, disarms it instead. Completion
    /// goes through the same idempotent state transition as
    /// `Sampler::stop`.
    pub fn on_alarm<A: SampleAlarm>(&mut self, alarm: &mut A) {
        let sample = self.source.read_raw_sample();
        if self.producer.push(sample).is_err() {
            self.dropped = self.dropped.wrapping_add(1);
        }
        match self.run.record() {
            RunProgress::InProgress(_) => alarm.rearm_for_next_fire(),
            RunProgress::Complete(_) | RunProgress::Idle => alarm.disarm(),
        }
    }

    /// Samples discarded because the queue was full at push time.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}
