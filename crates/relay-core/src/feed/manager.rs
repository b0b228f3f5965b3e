// ── Feed task: reconnect loop ──
//
// One task per console. At most one channel exists at a time: the
// previous frame stream is dropped before the next `open` begins, and
// every await point races the cancellation token so shutdown takes
// effect in any phase.

use std::sync::Arc;

use futures_util::StreamExt;
use relay_api::{Connector, FrameStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::ConnectionState;
use super::backoff::Backoff;
use crate::decode::decode;
use crate::store::StatusStore;

/// Handle on a running feed task.
///
/// Dropping the handle cancels the task without waiting for it.
pub struct FeedHandle {
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl FeedHandle {
    /// Spawn the feed task for `endpoint`, publishing into `store`.
    pub fn spawn<C: Connector>(connector: C, endpoint: Url, store: Arc<StatusStore>) -> Self {
        Self::spawn_with_cancel(connector, endpoint, store, CancellationToken::new())
    }

    /// Like [`spawn`](Self::spawn), stopping when `cancel` fires.
    pub fn spawn_with_cancel<C: Connector>(
        connector: C,
        endpoint: Url,
        store: Arc<StatusStore>,
        cancel: CancellationToken,
    ) -> Self {
        let task = tokio::spawn(run_feed(connector, endpoint, store, cancel.clone()));
        Self {
            cancel,
            task: Mutex::new(Some(task)),
        }
    }

    /// Request shutdown. Idempotent; returns immediately.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Wait for the task to exit. Returns at once if already joined.
    pub async fn join(&self) {
        let task = self.task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "status feed task panicked");
            }
        }
    }

    /// Shut down and wait for the task to exit.
    pub async fn shutdown_and_join(&self) {
        self.shutdown();
        self.join().await;
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Task body ────────────────────────────────────────────────────────

/// How one open channel ended.
enum ChannelEnd {
    Cancelled,
    Closed,
    Failed(relay_api::Error),
}

async fn run_feed<C: Connector>(
    connector: C,
    endpoint: Url,
    store: Arc<StatusStore>,
    cancel: CancellationToken,
) {
    let mut backoff = Backoff::new();
    let mut generation: u64 = 0;

    loop {
        generation += 1;
        store.set_connection(ConnectionState::connecting(generation, &backoff));
        debug!(generation, attempt = backoff.attempt(), "opening status channel");

        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connector.open(&endpoint) => result,
        };

        match opened {
            Ok(frames) => {
                backoff.reset();
                store.set_connection(ConnectionState::open(generation));
                info!(generation, "status channel open");

                match pump_frames(frames, generation, &store, &cancel).await {
                    ChannelEnd::Cancelled => break,
                    ChannelEnd::Closed => info!(generation, "status channel closed by server"),
                    ChannelEnd::Failed(e) => warn!(generation, error = %e, "status channel lost"),
                }
            }
            Err(e) => {
                warn!(generation, error = %e, "status channel open failed");
            }
        }

        let delay = backoff.fail();
        store.set_connection(ConnectionState::reconnecting(generation, &backoff, delay));
        info!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            attempt = backoff.attempt(),
            "reconnecting status channel"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }

    store.set_connection(ConnectionState::closed(generation, &backoff));
    debug!(generation, "status feed stopped");
}

/// Decode and publish frames until the channel ends or shutdown fires.
/// The stream is dropped on return, which closes the channel.
async fn pump_frames(
    mut frames: FrameStream,
    generation: u64,
    store: &StatusStore,
    cancel: &CancellationToken,
) -> ChannelEnd {
    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return ChannelEnd::Cancelled,
            next = frames.next() => next,
        };

        match next {
            Some(Ok(frame)) => match decode(&frame) {
                Ok(snapshot) => {
                    if cancel.is_cancelled() {
                        return ChannelEnd::Cancelled;
                    }
                    store.publish(snapshot, generation);
                }
                Err(e) => {
                    debug!(error = %e, "dropping undecodable status frame");
                    store.record_dropped_frame();
                }
            },
            Some(Err(e)) => return ChannelEnd::Failed(e),
            None => return ChannelEnd::Closed,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use futures_util::StreamExt;
    use relay_api::Frame;
    use tokio::sync::mpsc;
    use tokio::time::Instant;
    use tokio_stream::wrappers::UnboundedReceiverStream;

    use super::*;
    use crate::feed::ConnectionPhase;

    type FrameTx = mpsc::UnboundedSender<Result<Frame, relay_api::Error>>;

    enum Step {
        Refuse,
        Accept(mpsc::UnboundedReceiver<Result<Frame, relay_api::Error>>),
    }

    /// Connector that replays a fixed script of open outcomes and then
    /// hangs forever in `open`.
    #[derive(Clone, Default)]
    struct ScriptedConnector {
        steps: Arc<StdMutex<VecDeque<Step>>>,
        opened_at: Arc<StdMutex<Vec<Instant>>>,
    }

    impl ScriptedConnector {
        fn refuse(&self) {
            self.steps.lock().unwrap().push_back(Step::Refuse);
        }

        fn accept(&self) -> FrameTx {
            let (tx, rx) = mpsc::unbounded_channel();
            self.steps.lock().unwrap().push_back(Step::Accept(rx));
            tx
        }

        fn open_count(&self) -> usize {
            self.opened_at.lock().unwrap().len()
        }

        /// Whole seconds between consecutive `open` calls.
        fn gaps(&self) -> Vec<u64> {
            let at = self.opened_at.lock().unwrap();
            at.windows(2)
                .map(|w| (w[1] - w[0]).as_secs())
                .collect()
        }
    }

    impl Connector for ScriptedConnector {
        fn open(
            &self,
            _endpoint: &Url,
        ) -> impl Future<Output = Result<FrameStream, relay_api::Error>> + Send {
            self.opened_at.lock().unwrap().push(Instant::now());
            let step = self.steps.lock().unwrap().pop_front();
            async move {
                match step {
                    Some(Step::Refuse) => Err(relay_api::Error::WebSocketConnect("refused".into())),
                    Some(Step::Accept(rx)) => Ok(UnboundedReceiverStream::new(rx).boxed()),
                    None => std::future::pending().await,
                }
            }
        }
    }

    fn endpoint() -> Url {
        Url::parse("ws://relay.test/api/v1/ws/status").unwrap()
    }

    fn frame(queue: u64) -> Result<Frame, relay_api::Error> {
        Ok(Frame::Text(format!(
            r#"{{"tak_connected": true, "tak_url": "tls://tak:8089", "tx_queue_size": {queue},
                "enablements": [], "server_time": "2026-03-01T12:00:00Z"}}"#
        )))
    }

    async fn wait_until(
        store: &StatusStore,
        pred: impl FnMut(&ConnectionState) -> bool,
    ) -> ConnectionState {
        let mut rx = store.subscribe_connection();
        let state = *rx.wait_for(pred).await.unwrap();
        state
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_failures_back_off_exponentially_to_ceiling() {
        let connector = ScriptedConnector::default();
        for _ in 0..8 {
            connector.refuse();
        }
        let store = Arc::new(StatusStore::new());
        let handle = FeedHandle::spawn(connector.clone(), endpoint(), Arc::clone(&store));

        // Eight refusals, then the ninth open hangs.
        wait_until(&store, |s| s.generation == 9).await;

        assert_eq!(connector.gaps(), vec![1, 2, 4, 8, 16, 30, 30, 30]);
        handle.shutdown_and_join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn successful_open_resets_backoff() {
        let connector = ScriptedConnector::default();
        connector.refuse();
        connector.refuse();
        let tx = connector.accept();
        connector.refuse();

        let store = Arc::new(StatusStore::new());
        let handle = FeedHandle::spawn(connector.clone(), endpoint(), Arc::clone(&store));

        let open = wait_until(&store, ConnectionState::is_open).await;
        assert_eq!(open.generation, 3);
        assert_eq!(open.attempt, 0);

        // Server drops the channel.
        drop(tx);

        wait_until(&store, |s| s.generation == 5).await;
        assert_eq!(connector.gaps(), vec![1, 2, 1, 2]);
        handle.shutdown_and_join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn channel_error_schedules_retry_at_floor() {
        let connector = ScriptedConnector::default();
        let tx = connector.accept();
        let store = Arc::new(StatusStore::new());
        let handle = FeedHandle::spawn(connector.clone(), endpoint(), Arc::clone(&store));

        wait_until(&store, ConnectionState::is_open).await;
        tx.send(Err(relay_api::Error::IdleTimeout { idle_secs: 60 }))
            .unwrap();

        let state = wait_until(&store, ConnectionState::is_reconnecting).await;
        assert_eq!(state.retry_in, Some(Duration::from_secs(1)));
        assert_eq!(state.attempt, 1);
        assert_eq!(state.next_delay, Duration::from_secs(2));
        handle.shutdown_and_join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_frames_are_dropped_without_closing_channel() {
        let connector = ScriptedConnector::default();
        let tx = connector.accept();
        let store = Arc::new(StatusStore::new());
        let mut sub = store.subscribe();
        let handle = FeedHandle::spawn(connector.clone(), endpoint(), Arc::clone(&store));

        tx.send(frame(1)).unwrap();
        assert_eq!(sub.changed().await.unwrap().outbound_queue_depth, 1);

        tx.send(Ok(Frame::Text("not json".into()))).unwrap();
        tx.send(Ok(Frame::Binary(vec![0xff, 0x00]))).unwrap();
        tx.send(frame(2)).unwrap();
        assert_eq!(sub.changed().await.unwrap().outbound_queue_depth, 2);

        assert_eq!(store.dropped_frames(), 2);
        assert_eq!(store.accepted_frames(), 2);
        assert!(store.is_live());
        assert_eq!(connector.open_count(), 1);
        handle.shutdown_and_join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn reopened_channel_is_not_live_until_its_first_frame() {
        let connector = ScriptedConnector::default();
        let first = connector.accept();
        let second = connector.accept();
        let store = Arc::new(StatusStore::new());
        let mut sub = store.subscribe();
        let handle = FeedHandle::spawn(connector.clone(), endpoint(), Arc::clone(&store));

        first.send(frame(1)).unwrap();
        sub.changed().await.unwrap();
        assert!(store.is_live());
        drop(first);

        let reopened = wait_until(&store, |s| s.is_open() && s.generation == 2).await;
        assert_eq!(store.published().unwrap().generation, 1);
        assert!(!store.published().unwrap().is_current(&reopened));
        assert!(!store.is_live());

        second.send(frame(2)).unwrap();
        sub.changed().await.unwrap();
        assert_eq!(store.published().unwrap().generation, 2);
        assert!(store.is_live());
        handle.shutdown_and_join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_during_backoff_stops_without_reopening() {
        let connector = ScriptedConnector::default();
        connector.refuse();
        let store = Arc::new(StatusStore::new());
        let handle = FeedHandle::spawn(connector.clone(), endpoint(), Arc::clone(&store));

        wait_until(&store, ConnectionState::is_reconnecting).await;
        handle.shutdown();
        handle.shutdown();
        handle.join().await;
        handle.join().await;

        assert_eq!(store.connection_state().phase, ConnectionPhase::Closed);
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(connector.open_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_while_connecting_closes() {
        let connector = ScriptedConnector::default();
        let store = Arc::new(StatusStore::new());
        let handle = FeedHandle::spawn(connector.clone(), endpoint(), Arc::clone(&store));

        wait_until(&store, |s| s.generation == 1).await;
        handle.shutdown_and_join().await;

        let state = store.connection_state();
        assert_eq!(state.phase, ConnectionPhase::Closed);
        assert!(!store.is_live());
    }

    #[tokio::test(start_paused = true)]
    async fn frames_after_shutdown_are_never_published() {
        let connector = ScriptedConnector::default();
        let tx = connector.accept();
        let store = Arc::new(StatusStore::new());
        let mut sub = store.subscribe();
        let handle = FeedHandle::spawn(connector.clone(), endpoint(), Arc::clone(&store));

        tx.send(frame(1)).unwrap();
        sub.changed().await.unwrap();

        handle.shutdown_and_join().await;
        // The channel was torn down with the task.
        assert!(tx.send(frame(2)).is_err());
        assert_eq!(store.current().unwrap().outbound_queue_depth, 1);
        assert_eq!(store.accepted_frames(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_cancels_task() {
        let connector = ScriptedConnector::default();
        connector.refuse();
        let store = Arc::new(StatusStore::new());
        let handle = FeedHandle::spawn(connector.clone(), endpoint(), Arc::clone(&store));

        wait_until(&store, ConnectionState::is_reconnecting).await;
        drop(handle);

        let state = wait_until(&store, |s| s.phase == ConnectionPhase::Closed).await;
        assert_eq!(state.generation, 1);
    }
}
