//! Relay Pair

use tokio::sync::watch;

/// Shared close handle for the two streams of one relay.
///
/// Both copy directions hold the pair; whichever stops first calls
/// [`RelayPair::close`], and the other direction sees it through
/// [`RelayPair::closed`] and winds down.
#[derive(Debug)]
pub struct RelayPair {
    closed_tx: watch::Sender<bool>,
}

impl RelayPair {
    pub fn new() -> Self {
        let (closed_tx, _) = watch::channel(false);
        Self { closed_tx }
    }

    /// Close the pair. Returns `true` only for the call that actually closed it.
    pub fn close(&self) -> bool {
        !self.closed_tx.send_replace(true)
    }

    pub fn is_closed(&self) -> bool {
        *self.closed_tx.borrow()
    }

    /// Resolves once the pair has been closed
    pub async fn closed(&self) {
        let mut rx = self.closed_tx.subscribe();
        // The sender lives in `self`, so this only errors if the pair is gone
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

impl Default for RelayPair {
    fn default() -> Self {
        Self::new()
    }
}
