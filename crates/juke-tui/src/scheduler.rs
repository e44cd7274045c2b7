//! PollScheduler — fixed-period refresh timer for the live channel.
//!
//! The callback sits behind a mutex that `stop()` empties, so once `stop()`
//! returns the callback has been dropped and cannot run again, no matter what
//! the tick source does afterwards.  The callback must not call `stop()`.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Something that fires periodically.  Returns `false` once it will never
/// fire again.
pub trait TickSource: Send + 'static {
    fn next_tick(&mut self) -> impl Future<Output = bool> + Send;
}

impl TickSource for Interval {
    async fn next_tick(&mut self) -> bool {
        self.tick().await;
        true
    }
}

/// Manually driven ticks, one per `()` sent.
impl TickSource for mpsc::UnboundedReceiver<()> {
    async fn next_tick(&mut self) -> bool {
        self.recv().await.is_some()
    }
}

type Callback = Box<dyn FnMut() + Send>;

pub struct PollScheduler {
    callback: Arc<Mutex<Option<Callback>>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PollScheduler {
    /// Call `callback` every `period`, first call immediately.
    pub fn start<F>(period: Duration, callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        debug!("poll scheduler started, period {:?}", period);
        Self::start_with(ticker, callback)
    }

    pub fn start_with<S, F>(mut source: S, callback: F) -> Self
    where
        S: TickSource,
        F: FnMut() + Send + 'static,
    {
        let callback: Arc<Mutex<Option<Callback>>> = Arc::new(Mutex::new(Some(Box::new(callback))));
        let cancel = CancellationToken::new();

        let slot = callback.clone();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    alive = source.next_tick() => {
                        if !alive {
                            break;
                        }
                        let mut guard = slot.lock().unwrap_or_else(|e| e.into_inner());
                        match guard.as_mut() {
                            Some(cb) => cb(),
                            None => break,
                        }
                    }
                }
            }
        });

        Self {
            callback,
            cancel,
            task: Some(task),
        }
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    pub fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        self.cancel.cancel();
        // Waits out a callback already in progress, then drops it.
        self.callback
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        task.abort();
        debug!("poll scheduler stopped");
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl FnMut() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (count, move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_no_callbacks_after_stop_with_fake_clock() {
        let (clock, source) = mpsc::unbounded_channel::<()>();
        let (count, cb) = counter();
        let mut scheduler = PollScheduler::start_with(source, cb);

        clock.send(()).unwrap();
        clock.send(()).unwrap();
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        scheduler.stop();
        assert!(!scheduler.is_running());

        // The clock keeps firing; nothing listens any more.
        for _ in 0..5 {
            let _ = clock.send(());
        }
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_period() {
        let (count, cb) = counter();
        let mut scheduler = PollScheduler::start(Duration::from_millis(1000), cb);

        // Ticks at 0, 1000, 2000, 3000.
        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 4);

        scheduler.stop();
        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(count.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_drop_stops() {
        let (clock, source) = mpsc::unbounded_channel::<()>();
        let (count, cb) = counter();
        let scheduler = PollScheduler::start_with(source, cb);
        drop(scheduler);
        let _ = clock.send(());
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_exhausted_source_ends_task() {
        let (clock, source) = mpsc::unbounded_channel::<()>();
        let (count, cb) = counter();
        let mut scheduler = PollScheduler::start_with(source, cb);
        clock.send(()).unwrap();
        drop(clock);
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        scheduler.stop();
    }
}
