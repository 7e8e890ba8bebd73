//! Store watcher feeding the change signal.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::observability::metrics;
use crate::store::{KeyValueStore, StoreError};
use crate::watch::signal::{ChangeNotifier, Notify};

/// Watches a prefix forever and raises a coalesced signal on every mutation.
pub struct ChangeWatcher<S: ?Sized> {
    store: Arc<S>,
    prefix: String,
    retry_interval: Duration,
    notifier: ChangeNotifier,
}

impl<S> ChangeWatcher<S>
where
    S: KeyValueStore + ?Sized + 'static,
{
    pub fn new(store: Arc<S>, prefix: &str, retry_interval: Duration, notifier: ChangeNotifier) -> Self {
        Self {
            store,
            prefix: prefix.to_string(),
            retry_interval,
            notifier,
        }
    }

    /// Run the watch loop on its own task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Watch until the signal's receiving side is dropped.
    ///
    /// Watch errors never escape. The cause is logged and the loop sleeps for
    /// the fixed retry interval, then polls the same subscription again so
    /// its position in the change history is kept. Only a cleared history
    /// starts a fresh subscription, and that raises a signal of its own since
    /// changes may have been missed.
    pub async fn run(self) {
        tracing::info!(prefix = %self.prefix, "Change watcher started");
        let mut watch = self.store.watch(&self.prefix);

        loop {
            match watch.next().await {
                Ok(event) => {
                    metrics::record_watch_event();
                    tracing::debug!(action = %event.action, key = %event.key, index = event.index, "Change observed");
                    if !self.signal() {
                        return;
                    }
                }
                Err(e) => {
                    metrics::record_watch_error();
                    let cleared = matches!(e, StoreError::IndexCleared(_));
                    tracing::warn!(
                        prefix = %self.prefix,
                        error = %e,
                        index_cleared = cleared,
                        retry_in = ?self.retry_interval,
                        "Watch failed, retrying after delay"
                    );
                    tokio::time::sleep(self.retry_interval).await;

                    if cleared {
                        watch = self.store.watch(&self.prefix);
                        tracing::info!(prefix = %self.prefix, "Watch history lost, resubscribed and forcing a rebuild");
                        if !self.signal() {
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Raise the change signal. Returns `false` once nobody listens.
    fn signal(&self) -> bool {
        match self.notifier.notify() {
            Notify::Sent => true,
            Notify::Coalesced => {
                tracing::trace!("Change already pending, coalesced");
                true
            }
            Notify::Closed => {
                tracing::info!("Change signal closed, watcher exiting");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Node, StoreError, StoreResult, StoreWatch, WatchEvent};
    use crate::watch::signal::change_channel;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store whose first subscription fails `failures` times before
    /// delivering one event. Later subscriptions never deliver.
    struct FlakyStore {
        subscriptions: Arc<AtomicUsize>,
        failures: usize,
        cleared: bool,
    }

    struct FlakyWatch {
        failures: usize,
        cleared: bool,
        deliver: bool,
    }

    #[async_trait]
    impl StoreWatch for FlakyWatch {
        async fn next(&mut self) -> StoreResult<WatchEvent> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(if self.cleared {
                    StoreError::IndexCleared("history cleared".into())
                } else {
                    StoreError::Transient("connection refused".into())
                });
            }
            if !self.deliver {
                std::future::pending::<()>().await;
            }
            self.deliver = false;
            Ok(WatchEvent {
                action: "set".into(),
                key: "/ft/services/a/healthcheck".into(),
                index: 1,
            })
        }
    }

    #[async_trait]
    impl KeyValueStore for FlakyStore {
        async fn get(&self, path: &str, _recursive: bool) -> StoreResult<Node> {
            Err(StoreError::NotFound(path.to_string()))
        }
        async fn set(&self, _key: &str, _value: &str) -> StoreResult<()> {
            Ok(())
        }
        async fn delete(&self, _key: &str, _recursive: bool) -> StoreResult<()> {
            Ok(())
        }
        fn watch(&self, _prefix: &str) -> Box<dyn StoreWatch> {
            let first = self.subscriptions.fetch_add(1, Ordering::SeqCst) == 0;
            Box::new(FlakyWatch {
                failures: if first { self.failures } else { 0 },
                cleared: self.cleared,
                deliver: first,
            })
        }
    }

    fn flaky(failures: usize, cleared: bool) -> (Arc<FlakyStore>, Arc<AtomicUsize>) {
        let subscriptions = Arc::new(AtomicUsize::new(0));
        let store = Arc::new(FlakyStore {
            subscriptions: subscriptions.clone(),
            failures,
            cleared,
        });
        (store, subscriptions)
    }

    #[tokio::test]
    async fn test_transient_errors_keep_subscription() {
        let (store, subscriptions) = flaky(2, false);
        let (notifier, mut signal) = change_channel();
        let handle = ChangeWatcher::new(store, "/ft/services", Duration::from_millis(10), notifier).spawn();

        let got = tokio::time::timeout(Duration::from_secs(2), signal.wait()).await;
        assert_eq!(got.ok(), Some(true));
        assert_eq!(subscriptions.load(Ordering::SeqCst), 1);
        handle.abort();
    }

    #[tokio::test]
    async fn test_cleared_history_resubscribes_and_signals() {
        let (store, subscriptions) = flaky(1, true);
        let (notifier, mut signal) = change_channel();
        let handle = ChangeWatcher::new(store, "/ft/services", Duration::from_millis(10), notifier).spawn();

        // the replacement subscription never delivers, so this comes from the reset
        let got = tokio::time::timeout(Duration::from_secs(2), signal.wait()).await;
        assert_eq!(got.ok(), Some(true));
        assert_eq!(subscriptions.load(Ordering::SeqCst), 2);
        handle.abort();
    }

    #[tokio::test]
    async fn test_exits_when_signal_dropped() {
        let store = Arc::new(MemoryStore::new());
        let (notifier, signal) = change_channel();
        let handle = ChangeWatcher::new(store.clone(), "/ft/services", Duration::from_millis(10), notifier).spawn();
        drop(signal);

        // give the watcher time to subscribe before publishing
        tokio::time::sleep(Duration::from_millis(50)).await;
        store.publish("/ft/services/a/healthcheck", "true").await.unwrap();

        let finished = tokio::time::timeout(Duration::from_secs(2), handle).await;
        assert!(finished.is_ok());
    }
}
