//! Single-slot change signal.

use tokio::sync::mpsc;

/// Create a connected notifier/signal pair.
pub fn change_channel() -> (ChangeNotifier, ChangeSignal) {
    let (tx, rx) = mpsc::channel(1);
    (ChangeNotifier { tx }, ChangeSignal { rx })
}

/// Sending half, held by the watcher.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: mpsc::Sender<()>,
}

/// Result of a notify attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notify {
    /// The slot was empty and now holds a signal.
    Sent,
    /// A signal was already pending; this one was folded into it.
    Coalesced,
    /// Nobody is listening any more.
    Closed,
}

impl ChangeNotifier {
    /// Record that something changed. Never blocks.
    pub fn notify(&self) -> Notify {
        match self.tx.try_send(()) {
            Ok(()) => Notify::Sent,
            Err(mpsc::error::TrySendError::Full(())) => Notify::Coalesced,
            Err(mpsc::error::TrySendError::Closed(())) => Notify::Closed,
        }
    }
}

/// Receiving half, held by the orchestrator.
#[derive(Debug)]
pub struct ChangeSignal {
    rx: mpsc::Receiver<()>,
}

impl ChangeSignal {
    /// Wait until a change is pending and consume it.
    ///
    /// Returns `false` once every notifier is gone.
    pub async fn wait(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }

    /// Discard a pending signal, if any. Returns whether one was pending.
    pub fn drain(&mut self) -> bool {
        self.rx.try_recv().is_ok()
    }
}
