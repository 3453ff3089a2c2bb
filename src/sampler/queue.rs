//! Interrupt-to-task sample hand-off
//!
//! A thin wrapper over `heapless::spsc`: lock-free, strictly FIFO, one
//! producer (the collector, in interrupt context) and one consumer (the
//! sampler task).

use heapless::spsc::{Consumer, Producer, Queue};

use super::RawSample;

/// Backing storage size; the queue holds one less, i.e. 20 in-flight
/// samples.
pub const QUEUE_DEPTH: usize = 21;

/// A sample was discarded because the queue was full at push time.
///
/// Never surfaced past the producer: the pipeline accepts sample loss
/// over blocking the interrupt.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SampleDropped;

/// The bounded FIFO carrying raw samples across the interrupt boundary.
pub struct SampleQueue {
    inner: Queue<RawSample, QUEUE_DEPTH>,
}

impl SampleQueue {
    /// An empty queue, suitable for a `static`.
    pub const fn new() -> Self {
        Self {
            inner: Queue::new(),
        }
    }

    /// Split into the interrupt-side producer and the task-side consumer.
    pub fn split(&mut self) -> (SampleProducer<'_>, SampleConsumer<'_>) {
        let (producer, consumer) = self.inner.split();
        (
            SampleProducer { inner: producer },
            SampleConsumer { inner: consumer },
        )
    }
}

impl Default for SampleQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Interrupt-side handle; push only.
pub struct SampleProducer<'a> {
    inner: Producer<'a, RawSample, QUEUE_DEPTH>,
}

impl SampleProducer<'_> {
    /// Non-blocking push; a full queue drops the sample.
    pub fn push(&mut self, sample: RawSample) -> Result<(), SampleDropped> {
        match self.inner.enqueue(sample) {
            Ok(()) => {
                #[cfg(feature = "async")]
                super::async_api::SAMPLE_WAKER.wake();
                Ok(())
            }
            Err(_) => Err(SampleDropped),
        }
    }
}

/// Task-side handle; pop only.
pub struct SampleConsumer<'a> {
    inner: Consumer<'a, RawSample, QUEUE_DEPTH>,
}

impl SampleConsumer<'_> {
    /// Pop the oldest queued sample, if any.
    pub fn dequeue(&mut self) -> Option<RawSample> {
        self.inner.dequeue()
    }

    /// Whether a sample is ready to be popped.
    pub fn ready(&self) -> bool {
        self.inner.ready()
    }
}
