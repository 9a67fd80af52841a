//! Cancellable repeating task used for health polling.

use std::{future::Future, time::Duration};

use tokio::{runtime::Handle, sync::oneshot, time::sleep};
use tracing::debug;

/// Handle to a repeating task that waits `interval` after each completed run.
///
/// Dropping the handle cancels the pending wait. A run that already started is left to finish,
/// no further run is scheduled after it.
pub(crate) struct PollHandle {
    _stop: oneshot::Sender<()>,
}

impl PollHandle {
    /// Spawn the task on `runtime`.
    ///
    /// With `run_first` the first run starts immediately instead of after one interval.
    pub(crate) fn spawn<F, Fut>(
        runtime: &Handle,
        interval: Duration,
        run_first: bool,
        mut run: F,
    ) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        runtime.spawn(async move {
            if run_first {
                run().await;
            }

            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    _ = sleep(interval) => {}
                }
                run().await;
            }

            debug!("polling task cancelled");
        });

        Self { _stop: stop_tx }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, impl FnMut() -> futures::future::Ready<()> + Send + 'static)
    {
        let runs = Arc::new(AtomicUsize::new(0));
        let tick = {
            let runs = runs.clone();
            move || {
                runs.fetch_add(1, Ordering::SeqCst);
                futures::future::ready(())
            }
        };
        (runs, tick)
    }

    #[tokio::test(start_paused = true)]
    async fn waits_one_interval_before_first_run() {
        let (runs, tick) = counter();
        let _handle = PollHandle::spawn(&Handle::current(), Duration::from_secs(1), false, tick);

        tokio::task::yield_now().await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(1_500)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        sleep(Duration::from_secs(1)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn run_first_starts_immediately() {
        let (runs, tick) = counter();
        let _handle = PollHandle::spawn(&Handle::current(), Duration::from_secs(1), true, tick);

        tokio::task::yield_now().await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_stops_future_runs() {
        let (runs, tick) = counter();
        let handle = PollHandle::spawn(&Handle::current(), Duration::from_secs(1), false, tick);

        sleep(Duration::from_millis(1_500)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        drop(handle);
        sleep(Duration::from_secs(10)).await;

        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
