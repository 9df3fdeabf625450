//! Background task that periodically sweeps the [`ResponseCache`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::info;

use crate::cache::ResponseCache;

/// Spawns a task that sleeps `interval_secs` seconds, then invokes `evict()`
/// on the cache, forever, until aborted. Returns `None` without spawning
/// anything when `interval_secs == 0`, rather than spawning a task whose loop
/// would never fire.
///
/// Cancellation: the returned handle's `abort()` cancels the task promptly,
/// including while it is asleep, since `tokio::time::sleep` is itself an
/// abort-safe suspension point.
pub fn spawn_cleaner(cache: Arc<Mutex<ResponseCache>>, interval_secs: u64) -> Option<JoinHandle<()>> {
    if interval_secs == 0 {
        return None;
    }

    let interval = Duration::from_secs(interval_secs);
    Some(tokio::spawn(async move {
        info!(interval_secs, "periodic cache cleaner started");
        loop {
            tokio::time::sleep(interval).await;

            let mut cache = cache.lock().await;
            if cache.size() == 0 {
                info!("periodic cleaner tick: cache empty, skipping");
                continue;
            }

            info!(size = cache.size(), "periodic cleaner tick: evicting");
            cache.evict();
        }
    }))
}
