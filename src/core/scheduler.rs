//! Periodic refresh with a single-schedule invariant.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Owns at most one periodic task. Starting a schedule cancels the previous
/// one; stopping is synchronous and a no-op when nothing is running.
pub struct RefreshScheduler {
    period: Duration,
    handle: Option<JoinHandle<()>>,
}

impl RefreshScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            handle: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Runs `task` every period, first after one full period has elapsed.
    pub fn start<F, Fut>(&mut self, task: F)
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.stop();
        let period = self.period;
        debug!(period_secs = period.as_secs(), "Starting refresh schedule");
        self.handle = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                task().await;
            }
        }));
    }

    /// Cancels the running schedule. Returns whether one was running.
    pub fn stop(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                debug!("Stopped refresh schedule");
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_INTERVAL)
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_task(
        counter: &Arc<AtomicUsize>,
    ) -> impl Fn() -> futures::future::Ready<()> + Send + 'static {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            futures::future::ready(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_keeps_a_single_schedule() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut scheduler = RefreshScheduler::default();

        scheduler.start(counting_task(&counter));
        assert!(scheduler.stop());
        scheduler.start(counting_task(&counter));
        scheduler.start(counting_task(&counter));
        assert!(scheduler.is_active());

        time::sleep(Duration::from_secs(31)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut scheduler = RefreshScheduler::new(Duration::from_secs(5));

        scheduler.start(counting_task(&counter));
        assert!(scheduler.stop());
        assert!(!scheduler.stop());
        assert!(!scheduler.is_active());

        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_schedule() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let mut scheduler = RefreshScheduler::new(Duration::from_secs(1));
            scheduler.start(counting_task(&counter));
        }
        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
