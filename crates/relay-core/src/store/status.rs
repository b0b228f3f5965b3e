// ── Latest-snapshot store ──
//
// Single writer (the feed task), many readers. Each publish replaces the
// whole snapshot; readers see either the previous or the new one, never
// a mix. Late subscribers get the current snapshot without waiting.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use chrono::{DateTime, Utc};
use futures_core::Stream;
use futures_util::stream::{self, BoxStream, StreamExt};
use serde::Serialize;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::feed::ConnectionState;
use crate::model::StatusSnapshot;

/// A snapshot together with the channel generation that delivered it.
#[derive(Debug, Clone, Serialize)]
pub struct Published {
    pub snapshot: Arc<StatusSnapshot>,
    /// [`ConnectionState::generation`] of the channel the frame arrived on.
    pub generation: u64,
    /// Local wall-clock time the frame was accepted.
    pub received_at: DateTime<Utc>,
}

impl Published {
    /// `true` when this snapshot came from the channel that is open now.
    /// A snapshot from a superseded generation is never current, even if
    /// a newer channel has since opened.
    pub fn is_current(&self, connection: &ConnectionState) -> bool {
        connection.is_open() && connection.generation == self.generation
    }
}

type Slot = Option<Published>;

/// Holds the newest accepted [`StatusSnapshot`] and the channel's
/// [`ConnectionState`].
pub struct StatusStore {
    snapshot: watch::Sender<Slot>,
    connection: watch::Sender<ConnectionState>,
    accepted: AtomicU64,
    dropped: AtomicU64,
    closed: CancellationToken,
}

impl StatusStore {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(None);
        let (connection, _) = watch::channel(ConnectionState::default());

        Self {
            snapshot,
            connection,
            accepted: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            closed: CancellationToken::new(),
        }
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Replace the current snapshot and wake every subscriber. `generation`
    /// is the channel generation the frame arrived on.
    ///
    /// Returns `false` (and changes nothing) once the store is closed.
    pub fn publish(&self, snapshot: StatusSnapshot, generation: u64) -> bool {
        if self.closed.is_cancelled() {
            debug!("store closed, discarding snapshot");
            return false;
        }
        self.snapshot.send_replace(Some(Published {
            snapshot: Arc::new(snapshot),
            generation,
            received_at: Utc::now(),
        }));
        self.accepted.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Count a frame that failed to decode. The snapshot is untouched.
    pub fn record_dropped_frame(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Update the connection state. Always notifies, even when unchanged.
    pub fn set_connection(&self, state: ConnectionState) {
        self.connection.send_replace(state);
    }

    /// Stop accepting snapshots and end every subscription. Idempotent.
    pub fn close(&self) {
        if !self.closed.is_cancelled() {
            debug!("closing status store");
            self.closed.cancel();
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// The newest snapshot, or `None` before the first frame.
    pub fn current(&self) -> Option<Arc<StatusSnapshot>> {
        self.snapshot
            .borrow()
            .as_ref()
            .map(|p| Arc::clone(&p.snapshot))
    }

    /// The newest snapshot with its generation and receive time.
    pub fn published(&self) -> Option<Published> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes. The subscription is primed with the
    /// current snapshot, if any.
    pub fn subscribe(&self) -> Subscription {
        Subscription::new(self.snapshot.subscribe(), self.closed.clone())
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.connection.borrow()
    }

    pub fn subscribe_connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe()
    }

    /// `true` only while the channel is open and the current snapshot was
    /// delivered by that same channel.
    pub fn is_live(&self) -> bool {
        let connection = self.connection_state();
        self.snapshot
            .borrow()
            .as_ref()
            .is_some_and(|p| p.is_current(&connection))
    }

    pub fn accepted_frames(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

impl Default for StatusStore {
    fn default() -> Self {
        Self::new()
    }
}

// ── Subscription ─────────────────────────────────────────────────────

fn snapshot_of(slot: &Slot) -> Option<Arc<StatusSnapshot>> {
    slot.as_ref().map(|p| Arc::clone(&p.snapshot))
}

/// A consumer's handle on the snapshot stream.
///
/// Snapshots are delivered newest-first: a slow consumer skips
/// intermediate snapshots but never sees an older one after a newer one.
pub struct Subscription {
    current: Option<Arc<StatusSnapshot>>,
    receiver: Option<watch::Receiver<Slot>>,
    closed: CancellationToken,
}

impl Subscription {
    fn new(receiver: watch::Receiver<Slot>, closed: CancellationToken) -> Self {
        let current = snapshot_of(&receiver.borrow());
        Self {
            current,
            receiver: Some(receiver),
            closed,
        }
    }

    /// The snapshot most recently delivered to this subscription.
    pub fn current(&self) -> Option<&Arc<StatusSnapshot>> {
        self.current.as_ref()
    }

    /// Wait for the next snapshot.
    ///
    /// Returns `None` once unsubscribed or once the store is closed.
    pub async fn changed(&mut self) -> Option<Arc<StatusSnapshot>> {
        loop {
            let rx = self.receiver.as_mut()?;
            let ended = tokio::select! {
                biased;
                () = self.closed.cancelled() => true,
                result = rx.changed() => result.is_err(),
            };
            if ended {
                self.receiver = None;
                return None;
            }

            let snapshot = snapshot_of(&rx.borrow_and_update());
            if let Some(snapshot) = snapshot {
                self.current = Some(Arc::clone(&snapshot));
                return Some(snapshot);
            }
        }
    }

    /// Stop receiving updates. Safe to call any number of times.
    pub fn unsubscribe(&mut self) {
        self.receiver = None;
    }

    pub fn is_active(&self) -> bool {
        self.receiver.is_some() && !self.closed.is_cancelled()
    }

    /// Convert into a `Stream` that yields the current snapshot (if any)
    /// and then every subsequent one. Ends when the store is closed or
    /// dropped, and is empty if already unsubscribed.
    pub fn into_stream(self) -> SnapshotStream {
        let inner = match self.receiver {
            Some(rx) => WatchStream::new(rx)
                .filter_map(|slot| std::future::ready(snapshot_of(&slot)))
                .take_until(self.closed.cancelled_owned())
                .boxed(),
            None => stream::empty().boxed(),
        };
        SnapshotStream { inner }
    }
}

/// `Stream` adapter over a [`Subscription`].
pub struct SnapshotStream {
    inner: BoxStream<'static, Arc<StatusSnapshot>>,
}

impl Stream for SnapshotStream {
    type Item = Arc<StatusSnapshot>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use futures_util::StreamExt;

    use crate::feed::{Backoff, ConnectionState};

    fn snapshot(queue: u64) -> StatusSnapshot {
        StatusSnapshot {
            broker_connected: true,
            broker_endpoint: "tls://tak.example:8089".into(),
            outbound_queue_depth: queue,
            last_connect_error: None,
            jobs: Vec::new(),
            server_time: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn empty_store_has_no_snapshot() {
        let store = StatusStore::new();
        assert!(store.current().is_none());
        assert!(store.subscribe().current().is_none());
        assert!(!store.is_live());
    }

    #[test]
    fn late_subscriber_gets_current_snapshot_immediately() {
        let store = StatusStore::new();
        store.publish(snapshot(1), 1);
        store.publish(snapshot(2), 1);

        let sub = store.subscribe();
        assert_eq!(sub.current().unwrap().outbound_queue_depth, 2);
    }

    #[tokio::test]
    async fn changed_delivers_newest_and_skips_intermediate() {
        let store = StatusStore::new();
        let mut sub = store.subscribe();

        store.publish(snapshot(1), 1);
        store.publish(snapshot(2), 1);
        store.publish(snapshot(3), 1);

        let next = sub.changed().await.unwrap();
        assert_eq!(next.outbound_queue_depth, 3);
        assert_eq!(sub.current().unwrap().outbound_queue_depth, 3);
        assert_eq!(store.accepted_frames(), 3);
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent_and_ends_changes() {
        let store = StatusStore::new();
        let mut sub = store.subscribe();
        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!sub.is_active());

        store.publish(snapshot(1), 1);
        assert!(sub.changed().await.is_none());
    }

    #[tokio::test]
    async fn close_rejects_publishes_and_wakes_subscribers() {
        let store = Arc::new(StatusStore::new());
        store.publish(snapshot(1), 1);
        let mut sub = store.subscribe();

        let waiter = tokio::spawn(async move { sub.changed().await });
        tokio::task::yield_now().await;

        store.close();
        store.close();
        assert!(waiter.await.unwrap().is_none());

        assert!(!store.publish(snapshot(9), 1));
        assert_eq!(store.current().unwrap().outbound_queue_depth, 1);
        assert!(store.is_closed());
    }

    #[test]
    fn is_live_requires_open_channel_and_a_snapshot() {
        let store = StatusStore::new();
        store.set_connection(ConnectionState::open(1));
        assert!(!store.is_live());

        store.publish(snapshot(1), 1);
        assert!(store.is_live());
        assert_eq!(store.published().unwrap().generation, 1);

        let mut backoff = Backoff::new();
        let delay = backoff.fail();
        store.set_connection(ConnectionState::reconnecting(1, &backoff, delay));
        assert!(!store.is_live());
        // The last snapshot stays readable while reconnecting.
        assert!(store.current().is_some());
    }

    #[test]
    fn snapshot_from_superseded_generation_is_not_live() {
        let store = StatusStore::new();
        store.set_connection(ConnectionState::open(1));
        store.publish(snapshot(1), 1);
        assert!(store.is_live());

        // Reconnected, but the new channel has not sent anything yet
        store.set_connection(ConnectionState::open(2));
        assert!(!store.is_live());
        let published = store.published().unwrap();
        assert!(!published.is_current(&store.connection_state()));

        store.publish(snapshot(2), 2);
        assert!(store.is_live());
    }

    #[test]
    fn dropped_frames_are_counted_without_touching_snapshot() {
        let store = StatusStore::new();
        store.publish(snapshot(5), 1);
        store.record_dropped_frame();
        assert_eq!(store.dropped_frames(), 1);
        assert_eq!(store.current().unwrap().outbound_queue_depth, 5);
    }

    #[tokio::test]
    async fn stream_yields_current_then_updates() {
        let store = StatusStore::new();
        store.publish(snapshot(1), 1);
        let mut stream = store.subscribe().into_stream();

        assert_eq!(stream.next().await.unwrap().outbound_queue_depth, 1);
        store.publish(snapshot(2), 1);
        assert_eq!(stream.next().await.unwrap().outbound_queue_depth, 2);
    }

    #[tokio::test]
    async fn stream_ends_when_store_closes() {
        let store = StatusStore::new();
        store.publish(snapshot(1), 1);
        let mut stream = store.subscribe().into_stream();
        assert_eq!(stream.next().await.unwrap().outbound_queue_depth, 1);

        store.close();
        let next = tokio::time::timeout(std::time::Duration::from_secs(1), stream.next())
            .await
            .unwrap();
        assert!(next.is_none());
    }

    #[tokio::test]
    async fn stream_of_unsubscribed_subscription_is_empty() {
        let store = StatusStore::new();
        store.publish(snapshot(1), 1);
        let mut sub = store.subscribe();
        sub.unsubscribe();
        assert!(sub.into_stream().next().await.is_none());
    }
}
