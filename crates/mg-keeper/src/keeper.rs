//! Correlation registry
//!
//! Holds every pending request in registration order. Each inbound event is
//! offered to the waiters of its kind; the first whose predicate accepts it
//! claims it and is removed. Unclaimed waiters stay registered until their
//! owner closes them.

use mg_core::{Error, Event, EventBody, Result};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use crate::metrics::KeeperMetrics;
use crate::waiter::{Pending, Waiter};

pub struct Keeper {
    waiters: Mutex<Vec<Waiter>>,
    metrics: KeeperMetrics,
}

impl Keeper {
    pub fn new() -> Self {
        Self::with_metrics(KeeperMetrics::default())
    }

    pub fn with_metrics(metrics: KeeperMetrics) -> Self {
        Self {
            waiters: Mutex::new(Vec::new()),
            metrics,
        }
    }

    pub fn metrics(&self) -> &KeeperMetrics {
        &self.metrics
    }

    // A panicking predicate must not wedge every later dispatch.
    fn lock(&self) -> MutexGuard<'_, Vec<Waiter>> {
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a waiter; it competes for events from now on
    pub fn register(&self, waiter: Waiter) {
        debug!(waiter_id = %waiter.id, kind = %waiter.kind, "Registering waiter");
        self.lock().push(waiter);
        self.metrics.waiter_registered();
    }

    /// Register and return a guard that closes the waiter when dropped
    pub fn register_guarded(self: &Arc<Self>, waiter: Waiter) -> WaiterGuard {
        let guard = WaiterGuard {
            keeper: Arc::clone(self),
            id: waiter.id.clone(),
        };
        self.register(waiter);
        guard
    }

    /// Offer an event to the registered waiters.
    ///
    /// Returns the id of the waiter that claimed it, if any. At most one
    /// waiter is resolved per event.
    pub fn dispatch(&self, event: &Event) -> Option<String> {
        let mut body = event.body.clone();
        let mut waiters = self.lock();

        loop {
            let position = self.find_match(&mut waiters, event, &body);

            let Some(position) = position else {
                drop(waiters);
                self.metrics.event_unclaimed();
                return None;
            };

            let waiter = waiters.remove(position);
            self.metrics.waiter_removed();

            match waiter.sink.send(body) {
                Ok(()) => {
                    debug!(waiter_id = %waiter.id, kind = %event.kind, "Event claimed");
                    return Some(waiter.id);
                }
                // Owner gave up between the match and the send; offer the body to the next one.
                Err(returned) => {
                    debug!(waiter_id = %waiter.id, "Waiter abandoned during dispatch");
                    body = returned;
                }
            }
        }
    }

    /// Index of the first waiter accepting `body`. A waiter whose predicate
    /// panics is evicted; its owner sees the wait fail.
    fn find_match(
        &self,
        waiters: &mut Vec<Waiter>,
        event: &Event,
        body: &EventBody,
    ) -> Option<usize> {
        let mut index = 0;
        while index < waiters.len() {
            let waiter = &waiters[index];
            match panic::catch_unwind(AssertUnwindSafe(|| waiter.matches(event.kind, body))) {
                Ok(true) => return Some(index),
                Ok(false) => index += 1,
                Err(_) => {
                    let evicted = waiters.remove(index);
                    self.metrics.waiter_removed();
                    error!(
                        waiter_id = %evicted.id,
                        kind = %event.kind,
                        "Waiter predicate panicked; waiter evicted"
                    );
                }
            }
        }
        None
    }

    /// Remove a waiter. Unknown or already removed ids are ignored.
    pub fn close(&self, id: &str) {
        let removed = {
            let mut waiters = self.lock();
            let before = waiters.len();
            waiters.retain(|w| w.id != id);
            before - waiters.len()
        };
        if removed > 0 {
            self.metrics.waiter_removed();
            debug!(waiter_id = %id, "Waiter closed");
        }
    }

    /// Block until the waiter is resolved or `timeout` elapses.
    ///
    /// On timeout the waiter is still registered; the caller must close it.
    pub async fn wait(&self, pending: Pending, timeout: Duration) -> Result<EventBody> {
        let started = Instant::now();
        let Pending { id, kind, done } = pending;

        match tokio::time::timeout(timeout, done).await {
            Ok(Ok(body)) => {
                self.metrics.waiter_matched(started.elapsed());
                Ok(body)
            }
            Ok(Err(_)) => Err(Error::internal(format!(
                "waiter {} was closed before a {} event arrived",
                id, kind
            ))),
            Err(_) => {
                self.metrics.waiter_timed_out();
                warn!(waiter_id = %id, kind = %kind, ?timeout, "Wait timed out");
                Err(Error::timeout(format!(
                    "no matching {} event within {}ms",
                    kind,
                    timeout.as_millis()
                )))
            }
        }
    }

    /// Number of registered waiters
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Keeper {
    fn default() -> Self {
        Self::new()
    }
}

/// Closes its waiter on drop, whichever way the owning operation exits
pub struct WaiterGuard {
    keeper: Arc<Keeper>,
    id: String,
}

impl WaiterGuard {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for WaiterGuard {
    fn drop(&mut self) {
        self.keeper.close(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mg_core::{ActionKind, OutputEvent, ResourceEvent};

    fn resource_event(kind: ActionKind, unique: &str) -> Event {
        Event::new(
            kind,
            EventBody::Resource(ResourceEvent {
                path: format!("/media/{}.mp4", unique),
                unique: unique.to_string(),
                error: String::new(),
            }),
        )
    }

    #[tokio::test]
    async fn test_predicate_isolation() {
        let keeper = Keeper::new();
        let (w1, p1) = Waiter::for_unique(ActionKind::ResourceAdd, "r1");
        let (w2, p2) = Waiter::for_unique(ActionKind::ResourceAdd, "r2");
        let id2 = w2.id().to_string();
        keeper.register(w1);
        keeper.register(w2);

        assert_eq!(
            keeper.dispatch(&resource_event(ActionKind::ResourceAdd, "r2")),
            Some(id2)
        );
        keeper.dispatch(&resource_event(ActionKind::ResourceAdd, "r1"));

        let b1 = keeper.wait(p1, Duration::from_secs(1)).await.unwrap();
        let b2 = keeper.wait(p2, Duration::from_secs(1)).await.unwrap();
        assert_eq!(b1.unique(), Some("r1"));
        assert_eq!(b2.unique(), Some("r2"));
        assert!(keeper.is_empty());
    }

    #[tokio::test]
    async fn test_first_registered_wins() {
        let keeper = Keeper::new();
        let (first, p_first) = Waiter::any(ActionKind::ResourceStart);
        let (second, p_second) = Waiter::any(ActionKind::ResourceStart);
        let second_id = second.id().to_string();
        keeper.register(first);
        keeper.register(second);

        keeper.dispatch(&resource_event(ActionKind::ResourceStart, "r1"));
        assert_eq!(keeper.len(), 1);
        assert!(keeper
            .wait(p_first, Duration::from_millis(50))
            .await
            .is_ok());

        let err = keeper
            .wait(p_second, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
        keeper.close(&second_id);
        assert!(keeper.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_kind_is_not_claimed() {
        let keeper = Keeper::new();
        let (waiter, _pending) = Waiter::for_unique(ActionKind::OutputAdd, "o1");
        keeper.register(waiter);

        let event = Event::new(
            ActionKind::OutputRemove,
            EventBody::Output(OutputEvent {
                path: "rtmp://h/live".into(),
                unique: "o1".into(),
                error: String::new(),
            }),
        );
        assert_eq!(keeper.dispatch(&event), None);
        assert_eq!(keeper.len(), 1);
    }

    #[tokio::test]
    async fn test_timed_out_waiter_is_removed_by_guard() {
        let keeper = Arc::new(Keeper::new());
        let baseline = keeper.len();

        {
            let (waiter, pending) = Waiter::for_unique(ActionKind::ResourceAdd, "never");
            let _guard = keeper.register_guarded(waiter);
            assert_eq!(keeper.len(), baseline + 1);

            let err = keeper
                .wait(pending, Duration::from_millis(10))
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Timeout(_)));
        }

        assert_eq!(keeper.len(), baseline);
        assert_eq!(keeper.metrics().timed_out(), 1);
        assert_eq!(keeper.metrics().active(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_waiter_passes_event_on() {
        let keeper = Keeper::new();
        let (dead, dead_pending) = Waiter::any(ActionKind::PlayStop);
        let (live, live_pending) = Waiter::any(ActionKind::PlayStop);
        let live_id = live.id().to_string();
        keeper.register(dead);
        keeper.register(live);
        drop(dead_pending);

        let event = Event::new(
            ActionKind::PlayStop,
            EventBody::Play(mg_core::PlayEvent::default()),
        );
        assert_eq!(keeper.dispatch(&event), Some(live_id));
        assert!(keeper.wait(live_pending, Duration::from_millis(50)).await.is_ok());
    }

    #[tokio::test]
    async fn test_panicking_predicate_is_evicted() {
        let keeper = Keeper::new();
        let (bad, bad_pending) = Waiter::new(ActionKind::ResourceAdd, |_| panic!("predicate bug"));
        let (good, good_pending) = Waiter::for_unique(ActionKind::ResourceAdd, "r1");
        let good_id = good.id().to_string();
        keeper.register(bad);
        keeper.register(good);

        let claimed = keeper.dispatch(&resource_event(ActionKind::ResourceAdd, "r1"));
        assert_eq!(claimed, Some(good_id));
        assert!(keeper.is_empty());
        assert_eq!(keeper.metrics().active(), 0);

        assert!(keeper
            .wait(good_pending, Duration::from_millis(50))
            .await
            .is_ok());
        let err = keeper
            .wait(bad_pending, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn test_close_is_idempotent() {
        let keeper = Keeper::new();
        let (waiter, _pending) = Waiter::any(ActionKind::PlayStop);
        let id = waiter.id().to_string();
        keeper.register(waiter);

        keeper.close(&id);
        keeper.close(&id);
        keeper.close("waiter-never-registered");
        assert!(keeper.is_empty());
        assert_eq!(keeper.metrics().active(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_registration() {
        let keeper = Arc::new(Keeper::new());
        let mut handles = Vec::new();

        for i in 0..64 {
            let keeper = Arc::clone(&keeper);
            handles.push(tokio::spawn(async move {
                let unique = format!("r{}", i);
                let (waiter, pending) = Waiter::for_unique(ActionKind::ResourceAdd, unique.clone());
                let _guard = keeper.register_guarded(waiter);
                keeper
                    .wait(pending, Duration::from_secs(5))
                    .await
                    .map(|body| body.unique() == Some(unique.as_str()))
            }));
        }

        while keeper.len() < 64 {
            tokio::task::yield_now().await;
        }
        for i in (0..64).rev() {
            keeper.dispatch(&resource_event(ActionKind::ResourceAdd, &format!("r{}", i)));
        }

        for handle in handles {
            assert!(handle.await.unwrap().unwrap());
        }
        assert!(keeper.is_empty());
        assert_eq!(keeper.metrics().matched(), 64);
    }
}
