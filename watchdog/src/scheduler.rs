use crate::cycle::OfflineChecker;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

/// Fires a cycle on every tick. Each cycle runs in its own task so a slow
/// cycle never delays or blocks the next one.
pub async fn run_scheduler(checker: Arc<OfflineChecker>, every: Duration) {
    info!("Starting offline checks every {:?}", every);

    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let checker = Arc::clone(&checker);
        let handle = tokio::spawn(async move { checker.run_cycle_now().await });

        // Watch the cycle without holding up the ticker.
        tokio::spawn(async move {
            if let Err(e) = handle.await {
                error!("Offline check task aborted: {}", e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{DeliveryError, RegistryError};
    use crate::model::{Notification, Snapshot};
    use crate::notifier::Notifier;
    use crate::registry::RegistryReader;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingRegistry {
        reads: AtomicUsize,
    }

    #[async_trait]
    impl RegistryReader for CountingRegistry {
        async fn snapshot(&self) -> Result<Option<Snapshot>, RegistryError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
    }

    struct NoopNotifier;

    #[async_trait]
    impl Notifier for NoopNotifier {
        async fn send(&self, _notification: &Notification) -> Result<String, DeliveryError> {
            Ok(String::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_cycle_per_tick() {
        let registry = Arc::new(CountingRegistry::default());
        let checker = Arc::new(OfflineChecker::new(registry.clone(), Arc::new(NoopNotifier)));

        let driver = tokio::spawn(run_scheduler(checker, Duration::from_secs(60)));

        // First tick fires immediately, then at 60s and 120s.
        tokio::time::sleep(Duration::from_secs(150)).await;
        driver.abort();

        assert_eq!(registry.reads.load(Ordering::SeqCst), 3);
    }
}
