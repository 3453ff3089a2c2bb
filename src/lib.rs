//! Fixed-rate burst acquisition of an analog input.
//!
//! A periodic hardware alarm drives an interrupt-context collector that
//! reads one raw converter code per fire and hands it to a task-context
//! consumer over a bounded SPSC queue. The consumer accumulates samples
//! into a growable buffer and, once the requested count is reached, emits
//! them as one comma-separated line on the output sink. A small
//! line-oriented command protocol (`reset`, `read <n>`) starts runs and
//! restarts the device.
//!
//! The crate is hardware-agnostic: the converter, the periodic alarm and
//! the reset line are capability traits ([`sampler::SampleSource`],
//! [`sampler::SampleAlarm`], [`command::ResetControl`]) and the output
//! sink is any [`core::fmt::Write`] implementor, so the same pipeline runs
//! against a real timer/ADC pair or against mocks on the host.
//!
//! ```ignore
//! static RUN: RunState = RunState::new();
//! static QUEUE: StaticCell<SampleQueue> = StaticCell::new();
//!
//! let (producer, consumer) = QUEUE.init(SampleQueue::new()).split();
//! let mut sampler = Sampler::new(&RUN, consumer, Config::new())?;
//! // Move `Collector::new(adc, producer, &RUN)` into the timer ISR,
//! // then feed serial lines to `command::dispatch` and call
//! // `sampler.service(&mut uart)` from the acquisition task.
//! ```

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod command;
pub mod prelude;
pub mod sampler;

pub use command::{dispatch, Command, CommandError, ResetControl};
pub use sampler::{Collector, Config, Error, RawSample, Sampler};
