// Reactive selector - a projected view of the snapshot stream
//
// The projection runs on every publish and the owner is notified every time,
// even when the projected value did not change. `Selector::distinct` is the
// opt-in variant that suppresses notifications for equal values.

use crate::hub::{SnapshotHub, Subscription};
use crate::types::Snapshot;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Live value derived from the hub through a pure projection
pub struct Selector<T> {
    value: watch::Receiver<Option<T>>,
    notifications: Arc<AtomicU64>,
    subscription: Subscription,
}

impl<T> Selector<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Re-evaluate `project` and notify on every publish
    pub fn new<F>(hub: &SnapshotHub, project: F) -> Self
    where
        F: Fn(&Snapshot) -> T + Send + Sync + 'static,
    {
        let (tx, rx) = watch::channel(None);
        let notifications = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&notifications);

        let subscription = hub.subscribe(move |snapshot: &Arc<Snapshot>| {
            tx.send_replace(Some(project(snapshot)));
            counter.fetch_add(1, Ordering::Relaxed);
        });

        Self {
            value: rx,
            notifications,
            subscription,
        }
    }

    /// Like `new`, but only notify when the projected value changes
    pub fn distinct<F>(hub: &SnapshotHub, project: F) -> Self
    where
        F: Fn(&Snapshot) -> T + Send + Sync + 'static,
        T: PartialEq,
    {
        let (tx, rx) = watch::channel(None);
        let notifications = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&notifications);

        let subscription = hub.subscribe(move |snapshot: &Arc<Snapshot>| {
            let next = project(snapshot);
            let changed = tx.send_if_modified(|current| {
                if current.as_ref() == Some(&next) {
                    false
                } else {
                    *current = Some(next);
                    true
                }
            });
            if changed {
                counter.fetch_add(1, Ordering::Relaxed);
            }
        });

        Self {
            value: rx,
            notifications,
            subscription,
        }
    }

    /// Current projected value; `None` before the first publish
    pub fn get(&self) -> Option<T> {
        self.value.borrow().clone()
    }

    /// Receiver that wakes on every notification
    pub fn watch(&self) -> watch::Receiver<Option<T>> {
        self.value.clone()
    }

    /// Number of notifications delivered so far
    pub fn notifications(&self) -> u64 {
        self.notifications.load(Ordering::Relaxed)
    }

    /// Stop tracking the hub; the last value stays readable
    pub fn detach(&self) {
        self.subscription.unsubscribe();
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_active()
    }
}

impl<T> Drop for Selector<T> {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}
