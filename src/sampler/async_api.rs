//! Async wait path for the acquisition task.
//!
//! The interrupt-side producer wakes [`SAMPLE_WAKER`] after every
//! successful push, so an async acquisition task can sleep between alarm
//! fires instead of polling the queue.

use core::convert::Infallible;
use core::fmt;
use core::future::poll_fn;
use core::task::Poll;

use embassy_sync::waitqueue::AtomicWaker;

use super::Sampler;

/// Registered by the (single) acquisition task, woken by the producer.
pub(super) static SAMPLE_WAKER: AtomicWaker = AtomicWaker::new();

impl Sampler<'_> {
    /// Suspend until at least one sample is queued.
    ///
    /// Also wakes for a pending empty-run emission. Spurious wake-ups
    /// only cost an empty [`service`](Self::service) pass.
    pub async fn wait_sample(&mut self) {
        poll_fn(|cx| {
            SAMPLE_WAKER.register(cx.waker());
            if self.consumer.ready() || self.pending_empty_emit {
                Poll::Ready(())
            } else {
                Poll::Pending
            }
        })
        .await
    }

    /// Drive acquisition forever: sleep until samples arrive, drain them
    /// into the buffer and emit completed runs to `sink`.
    pub async fn drive<W: fmt::Write>(&mut self, sink: &mut W) -> Result<Infallible, fmt::Error> {
        loop {
            self.wait_sample().await;
            self.service(sink)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use core::future::Future;
    use core::pin::pin;
    use core::task::{Context, RawWaker, RawWakerVTable, Waker};

    use crate::sampler::{Config, RunState, SampleQueue, Sampler};

    const VTABLE: RawWakerVTable = RawWakerVTable::new(
        |_| RawWaker::new(core::ptr::null(), &VTABLE),
        |_| {},
        |_| {},
        |_| {},
    );

    fn noop_waker() -> Waker {
        unsafe { Waker::from_raw(RawWaker::new(core::ptr::null(), &VTABLE)) }
    }

    #[test]
    fn wait_sample_pends_until_a_sample_arrives() {
        let run = RunState::new();
        let mut queue = SampleQueue::new();
        let (mut producer, consumer) = queue.split();
        let mut sampler = Sampler::new(&run, consumer, Config::new().initial_capacity(8))
            .unwrap();

        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);

        let mut wait = pin!(sampler.wait_sample());
        assert!(wait.as_mut().poll(&mut cx).is_pending());

        producer.push(7).unwrap();
        assert!(wait.as_mut().poll(&mut cx).is_ready());
    }
}
