use std::time::Duration;

use futures::{future::BoxFuture, Stream, StreamExt};
use log::debug;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;

use super::dispatcher::Dispatcher;

/// Time the bridge needs before a write shows up in `GET /lights`.
pub const SETTLE_DELAY: Duration = Duration::from_millis(100);

/// A single "read everything and publish it" cycle.
pub trait PollCycle: Clone + Send + Sync + 'static {
    fn poll_once(&self) -> BoxFuture<'static, ()>;
}

/// Feeds poll cycles into the dispatcher, either periodically or shortly
/// after a write.
#[derive(Clone)]
pub struct PollScheduler<P> {
    dispatcher: Dispatcher,
    poller: P,
}

impl<P: PollCycle> PollScheduler<P> {
    pub fn new(dispatcher: Dispatcher, poller: P) -> Self {
        PollScheduler { dispatcher, poller }
    }

    /// Periodic trigger. Skipped while the dispatcher still has work so a slow
    /// bridge doesn't pile up polls. Returns whether a poll was enqueued.
    pub fn tick(&self) -> bool {
        if self.dispatcher.pending() {
            debug!(
                "Dispatcher busy ({} running), skipping periodic poll",
                self.dispatcher.running()
            );
            return false;
        }

        self.dispatcher.enqueue(self.poller.poll_once());
        true
    }

    /// Debounce trigger, always enqueues a poll once the bridge has settled.
    pub fn after_write(&self) {
        self.dispatcher.enqueue_after(SETTLE_DELAY, self.poller.poll_once());
    }

    /// Runs [`PollScheduler::tick`] for every item of `ticks` until the stream
    /// ends or the returned task is aborted.
    pub fn spawn_periodic<S>(&self, ticks: S) -> JoinHandle<()>
    where
        S: Stream<Item = ()> + Send + 'static,
    {
        let scheduler = self.clone();

        tokio::spawn(async move {
            let mut ticks = Box::pin(ticks);

            while ticks.next().await.is_some() {
                scheduler.tick();
            }
        })
    }
}

/// Ticks every `period`, the first one immediately.
pub fn interval_ticks(period: Duration) -> impl Stream<Item = ()> + Send + 'static {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    IntervalStream::new(interval).map(|_| ())
}
