//! Live now-playing fan-out
//!
//! One notifier per process. It owns the current [`NowPlaying`] value and
//! the set of open subscribers. The poll loop is the only regular writer;
//! the SSE endpoint may additionally kick an out-of-band refresh when the
//! first viewer connects.
//!
//! **Wakeup model:** every subscriber holds a `Notify`. `notify_one` stores
//! at most one permit, so several changes before a subscriber reads collapse
//! into one pending wakeup and the subscriber then reads the latest value.
//! This is a live status indicator, intermediate values may be skipped.
//!
//! **Locking:** value, subscriber map and the closed flag share one
//! `std::sync::Mutex` that is never held across an `.await`. `refresh()` is
//! additionally serialized by an async gate so two refreshes never
//! interleave.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::display::NowPlaying;
use super::source::{RecentTracksSource, SourceError};

/// Generated handle identifying one subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

/// Result of one `refresh()` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Value identical to the stored one, nobody woken
    Unchanged,
    /// Value replaced, `woken` subscribers notified
    Changed { woken: usize },
}

struct Shared {
    current: NowPlaying,
    subscribers: HashMap<SubscriberId, Arc<Notify>>,
    closed: bool,
}

pub struct NowPlayingNotifier {
    source: Arc<dyn RecentTracksSource>,
    shared: Mutex<Shared>,
    refresh_gate: tokio::sync::Mutex<()>,
    next_id: AtomicU64,
}

impl NowPlayingNotifier {
    pub fn new(source: Arc<dyn RecentTracksSource>) -> Self {
        Self {
            source,
            shared: Mutex::new(Shared {
                current: NowPlaying::Nothing,
                subscribers: HashMap::new(),
                closed: false,
            }),
            refresh_gate: tokio::sync::Mutex::new(()),
            next_id: AtomicU64::new(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        // A panic elsewhere cannot leave Shared half-updated: every mutation
        // is a single assignment or map operation.
        self.shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current value
    pub fn snapshot(&self) -> NowPlaying {
        self.lock().current.clone()
    }

    /// False when the source is unconfigured and nothing should be polled
    pub fn is_live(&self) -> bool {
        self.source.is_live()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Query the source once and publish the result
    ///
    /// Never fails: every source error becomes [`NowPlaying::Nothing`].
    pub async fn refresh(&self) -> RefreshOutcome {
        let _gate = self.refresh_gate.lock().await;

        let next = match self.source.latest_track().await {
            Ok(play) => NowPlaying::Track(play),
            Err(SourceError::NotConfigured) => NowPlaying::Nothing,
            Err(e) => {
                warn!("{} refresh failed: {}", self.source.source_id(), e);
                NowPlaying::Nothing
            }
        };

        self.publish(next)
    }

    /// Store `next` and wake every subscriber if it differs from the current value
    fn publish(&self, next: NowPlaying) -> RefreshOutcome {
        let mut shared = self.lock();
        if shared.current == next {
            return RefreshOutcome::Unchanged;
        }

        debug!("Now playing changed: {}", next.text());
        shared.current = next;
        for wake in shared.subscribers.values() {
            wake.notify_one();
        }
        RefreshOutcome::Changed {
            woken: shared.subscribers.len(),
        }
    }

    /// Poll forever, skipping the source entirely while nobody is subscribed
    pub async fn poll_loop(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if self.subscriber_count() > 0 {
                self.refresh().await;
            }
        }
    }

    /// Spawn [`poll_loop`](Self::poll_loop) on the runtime
    ///
    /// The returned handle is the only way to stop it; abort it at shutdown.
    pub fn spawn_poller(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        info!(
            "Starting {} poller (interval {} ms)",
            self.source.source_id(),
            interval.as_millis()
        );
        tokio::spawn(Arc::clone(self).poll_loop(interval))
    }

    /// Register a new subscriber
    ///
    /// The subscription is deregistered when dropped.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let wake = Arc::new(Notify::new());

        let mut shared = self.lock();
        if !shared.closed {
            shared.subscribers.insert(id, Arc::clone(&wake));
        }
        debug!(
            "Subscriber {:?} registered ({} active)",
            id,
            shared.subscribers.len()
        );
        drop(shared);

        Subscription {
            notifier: Arc::clone(self),
            id,
            wake,
            last: None,
        }
    }

    /// Read the current value and swap in a fresh wakeup, atomically
    ///
    /// Wakeups queued before the first read are discarded with the old
    /// `Notify`; any change after the read lands on the new one.
    fn prime(&self, id: SubscriberId) -> (NowPlaying, Arc<Notify>) {
        let wake = Arc::new(Notify::new());
        let mut shared = self.lock();
        if !shared.closed {
            shared.subscribers.insert(id, Arc::clone(&wake));
        }
        (shared.current.clone(), wake)
    }

    fn unsubscribe(&self, id: SubscriberId) {
        let mut shared = self.lock();
        if shared.subscribers.remove(&id).is_some() {
            debug!(
                "Subscriber {:?} removed ({} active)",
                id,
                shared.subscribers.len()
            );
        }
    }

    /// Deregister and wake every subscriber so their streams end
    pub fn shutdown(&self) {
        let mut shared = self.lock();
        shared.closed = true;
        let subscribers = std::mem::take(&mut shared.subscribers);
        drop(shared);

        info!("Now-playing notifier closing {} subscriber(s)", subscribers.len());
        for wake in subscribers.values() {
            wake.notify_one();
        }
    }

    fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

/// One open viewer of the now-playing value
pub struct Subscription {
    notifier: Arc<NowPlayingNotifier>,
    id: SubscriberId,
    wake: Arc<Notify>,
    /// Last value handed out; `None` until the first `next()`
    last: Option<NowPlaying>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next value to show
    ///
    /// The first call returns the current value immediately; later calls
    /// wait for a change and never repeat the previous value. Returns `None`
    /// once the notifier has shut down.
    pub async fn next(&mut self) -> Option<NowPlaying> {
        if self.last.is_none() {
            let (value, wake) = self.notifier.prime(self.id);
            self.wake = wake;
            self.last = Some(value.clone());
            return Some(value);
        }

        loop {
            if self.notifier.is_closed() {
                return None;
            }
            self.wake.notified().await;
            if self.notifier.is_closed() {
                return None;
            }

            let value = self.notifier.snapshot();
            if self.last.as_ref() != Some(&value) {
                self.last = Some(value.clone());
                return Some(value);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.notifier.unsubscribe(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nowplaying::display::TrackPlay;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    /// Source replaying a script of responses, repeating the last one
    struct ScriptedSource {
        calls: AtomicUsize,
        script: Mutex<VecDeque<Result<TrackPlay, ()>>>,
        last: Mutex<Option<Result<TrackPlay, ()>>>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<TrackPlay, ()>>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                script: Mutex::new(script.into()),
                last: Mutex::new(None),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RecentTracksSource for ScriptedSource {
        fn source_id(&self) -> &'static str {
            "scripted"
        }

        async fn latest_track(&self) -> Result<TrackPlay, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            let result = match next {
                Some(r) => {
                    *self.last.lock().unwrap() = Some(r.clone());
                    r
                }
                None => self.last.lock().unwrap().clone().unwrap_or(Err(())),
            };
            result.map_err(|_| SourceError::Unavailable("scripted failure".to_string()))
        }
    }

    fn song(name: &str, now_playing: bool) -> TrackPlay {
        TrackPlay {
            track: name.to_string(),
            artist: "Artist A".to_string(),
            url: "http://x".to_string(),
            now_playing,
        }
    }

    fn notifier(source: Arc<ScriptedSource>) -> Arc<NowPlayingNotifier> {
        Arc::new(NowPlayingNotifier::new(source))
    }

    /// True if `next()` has nothing pending within a short window
    async fn is_idle(sub: &mut Subscription) -> bool {
        tokio::time::timeout(Duration::from_millis(50), sub.next())
            .await
            .is_err()
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_poll_loop_never_calls_source() {
        let source = ScriptedSource::new(vec![Ok(song("Song A", true))]);
        let notifier = notifier(source.clone());

        let poller = notifier.spawn_poller(Duration::from_secs(2));
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(source.calls(), 0);
        poller.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_loop_refreshes_while_subscribed() {
        let source = ScriptedSource::new(vec![Ok(song("Song A", true))]);
        let notifier = notifier(source.clone());
        let poller = notifier.spawn_poller(Duration::from_secs(2));

        let sub = notifier.subscribe();
        tokio::time::sleep(Duration::from_secs(7)).await;
        let calls_while_subscribed = source.calls();
        assert!(calls_while_subscribed >= 3, "got {}", calls_while_subscribed);

        drop(sub);
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(source.calls() <= calls_while_subscribed + 1);
        poller.abort();
    }

    #[tokio::test]
    async fn test_equal_refreshes_wake_once() {
        let source = ScriptedSource::new(vec![Ok(song("Song A", true)), Ok(song("Song A", true))]);
        let notifier = notifier(source);
        let mut sub = notifier.subscribe();
        assert_eq!(sub.next().await, Some(NowPlaying::Nothing));

        assert_eq!(notifier.refresh().await, RefreshOutcome::Changed { woken: 1 });
        assert_eq!(notifier.refresh().await, RefreshOutcome::Unchanged);

        assert_eq!(sub.next().await, Some(NowPlaying::Track(song("Song A", true))));
        assert!(is_idle(&mut sub).await);
    }

    #[tokio::test]
    async fn test_first_element_is_current_value() {
        let source = ScriptedSource::new(vec![Ok(song("Song A", false))]);
        let notifier = notifier(source);
        notifier.refresh().await;

        let mut sub = notifier.subscribe();
        assert_eq!(sub.next().await, Some(NowPlaying::Track(song("Song A", false))));
        assert!(is_idle(&mut sub).await);
    }

    #[tokio::test]
    async fn test_fan_out_reaches_every_subscriber_once() {
        let source = ScriptedSource::new(vec![Ok(song("Song A", true))]);
        let notifier = notifier(source);

        let mut subs: Vec<Subscription> = (0..5).map(|_| notifier.subscribe()).collect();
        for sub in subs.iter_mut() {
            assert_eq!(sub.next().await, Some(NowPlaying::Nothing));
        }

        assert_eq!(notifier.refresh().await, RefreshOutcome::Changed { woken: 5 });

        for sub in subs.iter_mut() {
            assert_eq!(sub.next().await, Some(NowPlaying::Track(song("Song A", true))));
            assert!(is_idle(sub).await);
        }
    }

    #[tokio::test]
    async fn test_dropped_subscription_is_deregistered() {
        let source = ScriptedSource::new(vec![Ok(song("Song A", true)), Ok(song("Song B", true))]);
        let notifier = notifier(source);

        let keep = notifier.subscribe();
        let gone = notifier.subscribe();
        let mut also_gone = notifier.subscribe();
        assert_eq!(also_gone.next().await, Some(NowPlaying::Nothing));
        assert_eq!(notifier.subscriber_count(), 3);

        drop(gone);
        drop(also_gone);
        assert_eq!(notifier.subscriber_count(), 1);

        assert_eq!(notifier.refresh().await, RefreshOutcome::Changed { woken: 1 });
        drop(keep);
        assert_eq!(notifier.refresh().await, RefreshOutcome::Changed { woken: 0 });
    }

    #[tokio::test]
    async fn test_source_failure_degrades_to_nothing() {
        let source = ScriptedSource::new(vec![Ok(song("Song A", true)), Err(()), Err(())]);
        let notifier = notifier(source);
        let mut sub = notifier.subscribe();
        sub.next().await;

        notifier.refresh().await;
        assert_eq!(sub.next().await, Some(NowPlaying::Track(song("Song A", true))));

        assert_eq!(notifier.refresh().await, RefreshOutcome::Changed { woken: 1 });
        assert_eq!(notifier.snapshot(), NowPlaying::Nothing);
        assert_eq!(sub.next().await, Some(NowPlaying::Nothing));

        // Already the placeholder: a second failure changes nothing
        assert_eq!(notifier.refresh().await, RefreshOutcome::Unchanged);
        assert!(is_idle(&mut sub).await);
    }

    #[tokio::test]
    async fn test_multiple_changes_collapse_to_latest() {
        let source = ScriptedSource::new(vec![
            Ok(song("Song A", true)),
            Ok(song("Song B", true)),
            Ok(song("Song C", true)),
        ]);
        let notifier = notifier(source);
        let mut sub = notifier.subscribe();
        sub.next().await;

        for _ in 0..3 {
            notifier.refresh().await;
        }

        assert_eq!(sub.next().await, Some(NowPlaying::Track(song("Song C", true))));
        assert!(is_idle(&mut sub).await);
    }

    #[tokio::test]
    async fn test_shutdown_ends_streams_and_clears_subscribers() {
        let source = ScriptedSource::new(vec![]);
        let notifier = notifier(source);
        let mut sub = notifier.subscribe();
        assert_eq!(sub.next().await, Some(NowPlaying::Nothing));

        let waiter = tokio::spawn(async move { sub.next().await });
        tokio::task::yield_now().await;

        notifier.shutdown();
        assert_eq!(notifier.subscriber_count(), 0);
        assert_eq!(waiter.await.unwrap(), None);

        // Late subscribers get the current value and nothing else
        let mut late = notifier.subscribe();
        assert_eq!(notifier.subscriber_count(), 0);
        assert_eq!(late.next().await, Some(NowPlaying::Nothing));
        assert_eq!(late.next().await, None);
    }

    #[tokio::test]
    async fn test_subscriber_ids_are_unique() {
        let notifier = notifier(ScriptedSource::new(vec![]));
        let a = notifier.subscribe();
        let b = notifier.subscribe();
        assert_ne!(a.id(), b.id());
        assert!(a.id() < b.id());
    }
}
