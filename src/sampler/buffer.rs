//! Growable sample store
//!
//! Owned exclusively by the task side; the collector never touches it.
//! Capacity grows by an explicit integer 3/2 policy with checked
//! arithmetic and a configurable ceiling, and only ever between runs:
//! `Sampler::start` sizes the buffer before the alarm is armed.

use alloc::vec::Vec;

use super::{Error, RawSample};

pub struct SampleBuffer {
    samples: Vec<RawSample>,
    max_capacity: usize,
}

impl SampleBuffer {
    /// Allocate a buffer with room for `initial_capacity` samples.
    pub(super) fn new(initial_capacity: usize, max_capacity: usize) -> Result<Self, Error> {
        let mut samples = Vec::new();
        samples
            .try_reserve_exact(initial_capacity)
            .map_err(|_| Error::ResourceExhausted)?;
        Ok(Self {
            samples,
            max_capacity,
        })
    }

    /// Make sure at least `target` samples fit without reallocation.
    ///
    /// Grows by repeated 3/2 steps until the capacity exceeds `target`.
    /// Fails without touching the existing allocation or contents when
    /// the grown capacity would pass the ceiling, the step arithmetic
    /// overflows, or the allocator refuses the request.
    pub(super) fn ensure_capacity(&mut self, target: usize) -> Result<(), Error> {
        let mut capacity = self.samples.capacity();
        if target <= capacity {
            return Ok(());
        }
        while capacity <= target {
            capacity = grow_step(capacity).ok_or(Error::ResourceExhausted)?;
        }
        if capacity > self.max_capacity {
            // The last step may overshoot the ceiling; the ceiling itself
            // is still acceptable as long as it covers the target.
            capacity = self.max_capacity;
            if capacity <= target {
                return Err(Error::ResourceExhausted);
            }
        }
        self.samples
            .try_reserve_exact(capacity - self.samples.len())
            .map_err(|_| Error::ResourceExhausted)
    }

    /// Append one sample. The caller guarantees capacity, so this never
    /// reallocates mid-run.
    pub(super) fn append(&mut self, sample: RawSample) {
        debug_assert!(self.samples.len() < self.samples.capacity());
        self.samples.push(sample);
    }

    pub(super) fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.samples.capacity()
    }

    /// Buffered samples in acquisition order.
    pub fn as_slice(&self) -> &[RawSample] {
        &self.samples
    }
}

/// One growth step: 3/2, rounded down, but always at least one larger.
fn grow_step(capacity: usize) -> Option<usize> {
    let grown = capacity.checked_mul(3)? / 2;
    Some(grown.max(capacity + 1))
}
