use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::info;
use tokio::sync::Notify;

/// Cooperative stop flag shared between the poll loop and the signal task.
///
/// The flag is the only state that crosses tasks. Long waits go through
/// [`StopSignal::sleep`] so a stop request cuts them short.
#[derive(Clone, Default)]
pub struct StopSignal {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    stopped: AtomicBool,
    notify: Notify,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Resolves once a stop has been requested.
    pub async fn stopped(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.is_stopped() {
            return;
        }

        notified.await;
    }

    /// Sleeps for `duration` or until a stop is requested, whichever is first.
    pub async fn sleep(&self, duration: Duration) {
        tokio::select! {
            () = tokio::time::sleep(duration) => {}
            () = self.stopped() => {}
        }
    }
}

/// Trips `stop` on SIGINT (Ctrl+C) or SIGTERM.
pub fn install(stop: StopSignal) {
    tokio::spawn(async move {
        wait_for_signal().await;
        stop.stop();
    });
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT, stopping after the current checkpoint"),
        () = terminate => info!("Received SIGTERM, stopping after the current checkpoint"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_stop_is_visible_to_clones() {
        let stop = StopSignal::new();
        let other = stop.clone();
        assert!(!other.is_stopped());

        stop.stop();
        assert!(other.is_stopped());
    }

    #[tokio::test]
    async fn test_sleep_returns_early_on_stop() {
        let stop = StopSignal::new();
        let trigger = stop.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.stop();
        });

        let started = Instant::now();
        stop.sleep(Duration::from_secs(30)).await;
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_stopped_resolves_for_waiters() {
        let stop = StopSignal::new();
        let waiter = stop.clone();

        let handle = tokio::spawn(async move { waiter.stopped().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        stop.stop();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("stopped() should resolve after stop()")
            .unwrap();

        // Already stopped: no notification left to wait for.
        tokio::time::timeout(Duration::from_secs(1), stop.stopped())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_sleep_after_stop_is_immediate() {
        let stop = StopSignal::new();
        stop.stop();

        let started = Instant::now();
        stop.sleep(Duration::from_secs(30)).await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
