//! Reachability of the remote store, as reported by whatever owns the transport.

use tokio::sync::watch;

/// External signal answering "can the remote store be reached right now".
pub trait ConnectivitySignal: Send + Sync {
    fn is_reachable(&self) -> bool;

    /// Receiver that observes every change of the reachable flag
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// Settable connectivity signal backed by a `watch` channel
pub struct Connectivity {
    tx: watch::Sender<bool>,
}

impl Connectivity {
    pub fn new(reachable: bool) -> Self {
        let (tx, _rx) = watch::channel(reachable);
        Self { tx }
    }

    /// Update the flag. Returns true if the value changed.
    pub fn set_reachable(&self, reachable: bool) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == reachable {
                false
            } else {
                *current = reachable;
                true
            }
        })
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new(false)
    }
}

impl ConnectivitySignal for Connectivity {
    fn is_reachable(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
