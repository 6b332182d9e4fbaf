//! Debouncing of change-event bursts.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

/// Consume change events from `rx` and call `on_settle` once per burst.
///
/// Each incoming event resets the settle deadline; `on_settle` runs only
/// after `window` has elapsed with no further events, so rapid successive
/// changes collapse into a single trigger. Returns when the channel
/// closes; a burst still pending at close fires its trigger first.
pub async fn debounce<F, Fut>(mut rx: mpsc::Receiver<PathBuf>, window: Duration, mut on_settle: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    loop {
        // Wait for the first event of a burst.
        match rx.recv().await {
            Some(path) => debug!("Change burst started by {}", path.display()),
            None => return,
        }

        let mut deadline = Instant::now() + window;
        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(path) => {
                        debug!("Change burst extended by {}", path.display());
                        deadline = Instant::now() + window;
                    }
                    None => {
                        on_settle().await;
                        return;
                    }
                },
                _ = sleep_until(deadline) => {
                    debug!("Change burst settled");
                    on_settle().await;
                    break;
                }
            }
        }
    }
}
