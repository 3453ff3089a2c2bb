//! Burst sampling pipeline
//!
//! The pipeline is split along the interrupt/task boundary. Interrupt
//! context owns a [`Collector`]: one converter read and one non-blocking
//! queue push per alarm fire. Task context owns a [`Sampler`]: the
//! start/stop state machine, the growable sample buffer and the emit path.
//! The two sides share only the [`RunState`] cell (atomics) and the SPSC
//! queue, so neither ever takes a lock on the hot path.

use core::fmt;
use core::fmt::Write;

use fugit::HertzU32;

#[cfg(feature = "async")]
mod async_api;
mod buffer;
mod collector;
mod config;
mod queue;
mod state;

pub use collector::Collector;
pub use config::{
    Config, DEFAULT_INITIAL_CAPACITY, DEFAULT_MAX_CAPACITY, DEFAULT_SAMPLE_RATE,
};
pub use queue::{SampleConsumer, SampleDropped, SampleProducer, SampleQueue, QUEUE_DEPTH};
pub use state::{RunProgress, RunState};

use buffer::SampleBuffer;

/// One unconverted converter code, nominally 12 bits wide.
pub type RawSample = u16;

/// Errors that may occur when operating the sampler
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A run is already active.
    ///
    /// Acquisition is single-run-at-a-time; the active run is left
    /// untouched and the request must be reissued once it has ended.
    AlreadyRunning,
    /// Growing the sample buffer failed, either because the allocator
    /// refused the request or because the grown capacity would exceed
    /// the configured ceiling. Buffer and run state are unchanged.
    ResourceExhausted,
}

/// Source of raw converter codes.
///
/// Implementations must be non-blocking and constant-time; the sampler
/// calls this once per alarm fire, from interrupt context.
pub trait SampleSource {
    /// Read one raw code from the converter.
    fn read_raw_sample(&mut self) -> RawSample;
}

/// Periodic alarm capability.
///
/// All methods must be idempotent and safe to call from both interrupt
/// and task context; on shared hardware the glue code is expected to
/// serialize access (an RTIC resource or a `critical_section::Mutex`
/// both fit the `&mut` receivers). The hardware interrupt flag is
/// assumed to be acknowledged by the platform before the collector's
/// callback runs.
pub trait SampleAlarm {
    /// Arm the alarm to fire periodically at `rate`.
    fn arm(&mut self, rate: HertzU32);
    /// Re-enable the alarm for its next fire.
    ///
    /// Required on timers configured one-shot-per-alarm; a no-op is fine
    /// when the hardware auto-reloads.
    fn rearm_for_next_fire(&mut self);
    /// Stop the alarm from firing. Must tolerate an already-disarmed
    /// alarm.
    fn disarm(&mut self);
    /// Zero the alarm's counter so the first fire happens one full
    /// period after [`arm`](Self::arm).
    fn reset_counter(&mut self);
}

/// The task-context half of the pipeline: run lifecycle, sample buffer
/// and emission.
///
/// Exactly one `Sampler` exists per pipeline. It is the only writer of
/// the buffer and the only consumer of the queue; the paired
/// [`Collector`] lives on the interrupt side.
pub struct Sampler<'a> {
    run: &'a RunState,
    consumer: SampleConsumer<'a>,
    buffer: SampleBuffer,
    rate: HertzU32,
    pending_empty_emit: bool,
}

impl<'a> Sampler<'a> {
    /// Build the task side of the pipeline.
    ///
    /// Allocates the initial sample buffer; fails with
    /// [`Error::ResourceExhausted`] if that allocation is refused.
    pub fn new(
        run: &'a RunState,
        consumer: SampleConsumer<'a>,
        config: Config,
    ) -> Result<Self, Error> {
        let buffer = SampleBuffer::new(config.initial_capacity, config.max_capacity)?;
        Ok(Self {
            run,
            consumer,
            buffer,
            rate: config.sample_rate,
            pending_empty_emit: false,
        })
    }

    /// Start a run of `target` samples.
    ///
    /// Refuses with [`Error::AlreadyRunning`] while a run is active and
    /// with [`Error::ResourceExhausted`] if the buffer cannot grow to
    /// `target`; neither failure mutates run state. On success the alarm
    /// is armed last, after the buffer and the run counters are fully
    /// committed, because its first fire can happen at any instant after
    /// arming.
    ///
    /// A `target` of zero completes immediately: the alarm is never armed
    /// and the empty sequence is emitted on the next [`service`] pass.
    ///
    /// [`service`]: Self::service
    pub fn start<A: SampleAlarm>(&mut self, target: u16, alarm: &mut A) -> Result<(), Error> {
        if self.run.is_active() {
            return Err(Error::AlreadyRunning);
        }
        // Samples left behind by a stopped run must not bleed into the
        // new run's buffer.
        while self.consumer.dequeue().is_some() {}
        self.buffer.ensure_capacity(usize::from(target))?;
        self.buffer.clear();
        if target == 0 {
            self.pending_empty_emit = true;
            #[cfg(feature = "async")]
            async_api::SAMPLE_WAKER.wake();
            return Ok(());
        }
        self.run.begin(target)?;
        alarm.reset_counter();
        alarm.arm(self.rate);
        Ok(())
    }

    /// End the active run without emitting.
    ///
    /// No-op when idle. Samples already queued are still drained into the
    /// buffer by [`service`](Self::service), but the emit threshold is
    /// never reached, so the run produces no output.
    pub fn stop<A: SampleAlarm>(&mut self, alarm: &mut A) {
        if self.run.finish() {
            alarm.disarm();
        }
    }

    /// Whether a run is currently active. Safe from any context.
    pub fn is_running(&self) -> bool {
        self.run.is_active()
    }

    /// Drain queued samples into the buffer and emit when complete.
    ///
    /// Appends every queued sample in arrival order, never past the run's
    /// target. When the buffer reaches the target the whole sequence is
    /// written to `sink` as comma-separated decimals terminated by a line
    /// break, and `Ok(Some(count))` is returned. Calling with nothing
    /// queued is a harmless no-op, so spurious wake-ups are fine.
    pub fn service<W: Write>(&mut self, sink: &mut W) -> Result<Option<u16>, fmt::Error> {
        if self.pending_empty_emit {
            self.pending_empty_emit = false;
            sink.write_char('\n')?;
            return Ok(Some(0));
        }
        let target = usize::from(self.run.target());
        while let Some(sample) = self.consumer.dequeue() {
            if self.buffer.len() < target {
                self.buffer.append(sample);
                if self.buffer.len() == target {
                    self.emit(sink)?;
                    return Ok(Some(target as u16));
                }
            }
        }
        Ok(None)
    }

    fn emit<W: Write>(&self, sink: &mut W) -> fmt::Result {
        for (i, sample) in self.buffer.as_slice().iter().enumerate() {
            if i > 0 {
                sink.write_char(',')?;
            }
            write!(sink, "{}", sample)?;
        }
        sink.write_char('\n')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ramp(u16);

    impl SampleSource for Ramp {
        fn read_raw_sample(&mut self) -> RawSample {
            let value = self.0;
            self.0 = self.0.wrapping_add(1);
            value
        }
    }

    #[derive(Default)]
    struct TestAlarm {
        pending: bool,
        rate: Option<HertzU32>,
        arms: u32,
        disarms: u32,
        counter_resets: u32,
    }

    impl SampleAlarm for TestAlarm {
        fn arm(&mut self, rate: HertzU32) {
            self.pending = true;
            self.rate = Some(rate);
            self.arms += 1;
        }

        fn rearm_for_next_fire(&mut self) {
            self.pending = true;
        }

        fn disarm(&mut self) {
            self.pending = false;
            self.disarms += 1;
        }

        fn reset_counter(&mut self) {
            self.counter_resets += 1;
        }
    }

    fn fire(collector: &mut Collector<'_, Ramp>, alarm: &mut TestAlarm, times: usize) -> usize {
        let mut fired = 0;
        for _ in 0..times {
            if !alarm.pending {
                break;
            }
            alarm.pending = false;
            collector.on_alarm(alarm);
            fired += 1;
        }
        fired
    }

    #[test]
    fn full_run_emits_in_order() {
        let run = RunState::new();
        let mut queue = SampleQueue::new();
        let (producer, consumer) = queue.split();
        let mut collector = Collector::new(Ramp(0), producer, &run);
        let mut sampler = Sampler::new(&run, consumer, Config::new().initial_capacity(16))
            .unwrap();
        let mut alarm = TestAlarm::default();
        let mut out = String::new();

        sampler.start(5, &mut alarm).unwrap();
        assert!(sampler.is_running());
        assert_eq!(alarm.counter_resets, 1);
        assert_eq!(alarm.rate, Some(HertzU32::from_raw(12_000)));

        assert_eq!(fire(&mut collector, &mut alarm, 10), 5);
        assert_eq!(sampler.service(&mut out), Ok(Some(5)));
        assert_eq!(out, "0,1,2,3,4\n");
        assert!(!sampler.is_running());
        assert!(!alarm.pending);
    }

    #[test]
    fn start_while_running_is_refused() {
        let run = RunState::new();
        let mut queue = SampleQueue::new();
        let (producer, consumer) = queue.split();
        let mut collector = Collector::new(Ramp(0), producer, &run);
        let mut sampler = Sampler::new(&run, consumer, Config::new().initial_capacity(16))
            .unwrap();
        let mut alarm = TestAlarm::default();

        sampler.start(5, &mut alarm).unwrap();
        fire(&mut collector, &mut alarm, 2);

        assert_eq!(sampler.start(3, &mut alarm), Err(Error::AlreadyRunning));
        assert_eq!(run.target(), 5);
        assert_eq!(alarm.arms, 1);

        // The original run is unaffected and still completes.
        fire(&mut collector, &mut alarm, 3);
        let mut out = String::new();
        assert_eq!(sampler.service(&mut out), Ok(Some(5)));
        assert_eq!(out, "0,1,2,3,4\n");
    }

    #[test]
    fn stop_mid_run_emits_nothing() {
        let run = RunState::new();
        let mut queue = SampleQueue::new();
        let (producer, consumer) = queue.split();
        let mut collector = Collector::new(Ramp(0), producer, &run);
        let mut sampler = Sampler::new(&run, consumer, Config::new().initial_capacity(16))
            .unwrap();
        let mut alarm = TestAlarm::default();
        let mut out = String::new();

        sampler.start(10, &mut alarm).unwrap();
        fire(&mut collector, &mut alarm, 4);
        sampler.stop(&mut alarm);

        assert!(!sampler.is_running());
        assert!(!alarm.pending);
        assert_eq!(fire(&mut collector, &mut alarm, 5), 0);
        assert_eq!(sampler.service(&mut out), Ok(None));
        assert_eq!(out, "");
    }

    #[test]
    fn stop_when_idle_is_a_no_op() {
        let run = RunState::new();
        let mut queue = SampleQueue::new();
        let (_producer, consumer) = queue.split();
        let mut sampler = Sampler::new(&run, consumer, Config::new().initial_capacity(16))
            .unwrap();
        let mut alarm = TestAlarm::default();

        sampler.stop(&mut alarm);
        sampler.stop(&mut alarm);
        assert_eq!(alarm.disarms, 0);
        assert!(!sampler.is_running());
    }

    #[test]
    fn stopping_twice_after_a_run_disarms_once() {
        let run = RunState::new();
        let mut queue = SampleQueue::new();
        let (_producer, consumer) = queue.split();
        let mut sampler = Sampler::new(&run, consumer, Config::new().initial_capacity(16))
            .unwrap();
        let mut alarm = TestAlarm::default();

        sampler.start(10, &mut alarm).unwrap();
        sampler.stop(&mut alarm);
        sampler.stop(&mut alarm);
        assert_eq!(alarm.disarms, 1);
    }

    #[test]
    fn zero_sample_run_emits_empty_line() {
        let run = RunState::new();
        let mut queue = SampleQueue::new();
        let (_producer, consumer) = queue.split();
        let mut sampler = Sampler::new(&run, consumer, Config::new().initial_capacity(16))
            .unwrap();
        let mut alarm = TestAlarm::default();
        let mut out = String::new();

        sampler.start(0, &mut alarm).unwrap();
        assert!(!sampler.is_running());
        assert_eq!(alarm.arms, 0);
        assert_eq!(sampler.service(&mut out), Ok(Some(0)));
        assert_eq!(out, "\n");
        assert_eq!(sampler.service(&mut out), Ok(None));
    }

    #[test]
    fn overflow_drops_end_the_run_without_emission() {
        let run = RunState::new();
        let mut queue = SampleQueue::new();
        let (producer, consumer) = queue.split();
        let mut collector = Collector::new(Ramp(0), producer, &run);
        let mut sampler = Sampler::new(&run, consumer, Config::new().initial_capacity(64))
            .unwrap();
        let mut alarm = TestAlarm::default();
        let mut out = String::new();

        // 30 fires against a 20-deep queue with no consumer in between.
        sampler.start(30, &mut alarm).unwrap();
        assert_eq!(fire(&mut collector, &mut alarm, 40), 30);
        assert!(!sampler.is_running());
        assert_eq!(run.collected(), 30);
        assert_eq!(collector.dropped(), 10);

        // The delivered prefix is buffered in order but never emitted.
        assert_eq!(sampler.service(&mut out), Ok(None));
        assert_eq!(out, "");
    }

    #[test]
    fn stale_queued_samples_do_not_bleed_into_the_next_run() {
        let run = RunState::new();
        let mut queue = SampleQueue::new();
        let (producer, consumer) = queue.split();
        let mut collector = Collector::new(Ramp(0), producer, &run);
        let mut sampler = Sampler::new(&run, consumer, Config::new().initial_capacity(16))
            .unwrap();
        let mut alarm = TestAlarm::default();
        let mut out = String::new();

        // Abort a run with samples still queued, then start a fresh one.
        sampler.start(10, &mut alarm).unwrap();
        fire(&mut collector, &mut alarm, 3);
        sampler.stop(&mut alarm);

        sampler.start(2, &mut alarm).unwrap();
        fire(&mut collector, &mut alarm, 2);
        assert_eq!(sampler.service(&mut out), Ok(Some(2)));
        assert_eq!(out, "3,4\n");
    }

    #[test]
    fn consecutive_runs_reuse_the_pipeline() {
        let run = RunState::new();
        let mut queue = SampleQueue::new();
        let (producer, consumer) = queue.split();
        let mut collector = Collector::new(Ramp(0), producer, &run);
        let mut sampler = Sampler::new(&run, consumer, Config::new().initial_capacity(16))
            .unwrap();
        let mut alarm = TestAlarm::default();

        let mut out = String::new();
        sampler.start(3, &mut alarm).unwrap();
        fire(&mut collector, &mut alarm, 3);
        assert_eq!(sampler.service(&mut out), Ok(Some(3)));
        assert_eq!(out, "0,1,2\n");

        out.clear();
        sampler.start(4, &mut alarm).unwrap();
        fire(&mut collector, &mut alarm, 4);
        assert_eq!(sampler.service(&mut out), Ok(Some(4)));
        assert_eq!(out, "3,4,5,6\n");
    }

    #[test]
    fn failed_growth_leaves_the_sampler_usable() {
        let run = RunState::new();
        let mut queue = SampleQueue::new();
        let (producer, consumer) = queue.split();
        let mut collector = Collector::new(Ramp(0), producer, &run);
        let config = Config::new().initial_capacity(16).max_capacity(64);
        let mut sampler = Sampler::new(&run, consumer, config).unwrap();
        let mut alarm = TestAlarm::default();

        assert_eq!(sampler.start(500, &mut alarm), Err(Error::ResourceExhausted));
        assert!(!sampler.is_running());
        assert_eq!(alarm.arms, 0);

        let mut out = String::new();
        sampler.start(2, &mut alarm).unwrap();
        fire(&mut collector, &mut alarm, 2);
        assert_eq!(sampler.service(&mut out), Ok(Some(2)));
        assert_eq!(out, "0,1\n");
    }

    #[test]
    fn service_keeps_up_with_a_long_run() {
        let run = RunState::new();
        let mut queue = SampleQueue::new();
        let (producer, consumer) = queue.split();
        let mut collector = Collector::new(Ramp(0), producer, &run);
        let mut sampler = Sampler::new(&run, consumer, Config::new().initial_capacity(16))
            .unwrap();
        let mut alarm = TestAlarm::default();
        let mut out = String::new();

        sampler.start(100, &mut alarm).unwrap();
        let mut emitted = None;
        while emitted.is_none() {
            assert!(fire(&mut collector, &mut alarm, 10) > 0);
            emitted = sampler.service(&mut out).unwrap();
        }
        assert_eq!(emitted, Some(100));
        assert_eq!(collector.dropped(), 0);
        let values: Vec<u16> = out
            .trim_end()
            .split(',')
            .map(|v| v.parse().unwrap())
            .collect();
        assert_eq!(values, (0..100).collect::<Vec<u16>>());
    }
}
