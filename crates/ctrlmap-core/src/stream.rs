// ── Change subscriptions ──
//
// Every committed mutation publishes its snapshot on a `watch`
// channel. Slow subscribers skip intermediate versions and always see
// the newest one.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::store::Snapshot;

/// A subscription to committed inventory snapshots.
pub struct InventoryStream {
    current: Snapshot,
    receiver: watch::Receiver<Snapshot>,
}

impl InventoryStream {
    pub(crate) fn new(receiver: watch::Receiver<Snapshot>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at subscription time, or at the last `changed()`.
    pub fn current(&self) -> &Snapshot {
        &self.current
    }

    /// The newest published snapshot.
    pub fn latest(&self) -> Snapshot {
        self.receiver.borrow().clone()
    }

    /// Wait for the next commit. `None` once the inventory is dropped.
    pub async fn changed(&mut self) -> Option<Snapshot> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Convert into a `Stream`. The first item is the current snapshot.
    pub fn into_stream(self) -> SnapshotStream {
        SnapshotStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` of committed snapshots backed by a `watch::Receiver`.
pub struct SnapshotStream {
    inner: WatchStream<Snapshot>,
}

impl Stream for SnapshotStream {
    type Item = Snapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Snapshot>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::command::CreateControllerRequest;
    use crate::store::Inventory;

    #[tokio::test]
    async fn commits_are_published() {
        let inventory = Inventory::default();
        let mut stream = inventory.subscribe();
        assert_eq!(stream.current().version(), 0);

        inventory
            .create_controller(CreateControllerRequest::named("Panorama1"))
            .unwrap();
        let snap = stream.changed().await.unwrap();
        assert_eq!(snap.version(), 1);
        assert!(snap.controller_by_name("Panorama1").is_some());
        assert_eq!(stream.current().version(), 1);
    }

    #[tokio::test]
    async fn dropped_inventory_ends_the_subscription() {
        let inventory = Inventory::default();
        let mut stream = inventory.subscribe();
        drop(inventory);
        assert!(stream.changed().await.is_none());
        assert_eq!(stream.latest().version(), 0);
    }

    #[test]
    fn stream_yields_the_current_snapshot_first() {
        use tokio_stream::StreamExt;

        let inventory = Inventory::default();
        let mut stream = inventory.subscribe().into_stream();
        let first = tokio_test::block_on(stream.next()).unwrap();
        assert_eq!(first.version(), 0);
    }
}
