use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::alloc::Allocator;
use crate::observability;

/// Handle to the running quota reset loop. Dropping it does not stop the
/// loop; call [`ResetHandle::stop`] to cancel and join it.
pub struct ResetHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl ResetHandle {
    /// Signal the loop to stop and wait for it to exit. No quota clear
    /// happens after this returns.
    pub async fn stop(self) {
        self.token.cancel();
        let _ = self.task.await;
    }
}

/// Spawn the background task that wholesale-clears client quota every
/// `period`, first firing one full period after spawn.
pub fn spawn(allocator: Arc<Allocator>, period: Duration) -> ResetHandle {
    let token = CancellationToken::new();
    let task = tokio::spawn(run(allocator, period, token.clone()));
    ResetHandle { token, task }
}

async fn run(allocator: Arc<Allocator>, period: Duration, token: CancellationToken) {
    let mut interval = time::interval_at(Instant::now() + period, period);
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = interval.tick() => {
                let cleared = allocator.reset_quotas().await;
                metrics::counter!(observability::QUOTA_RESETS_TOTAL).increment(1);
                metrics::histogram!(observability::QUOTA_ENTRIES_CLEARED).record(cleared as f64);
                info!("cleared quota state for {cleared} clients");
            }
        }
    }
}
