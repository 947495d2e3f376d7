// Snapshot hub - fan-out of parsed snapshots to registered listeners
//
// The hub keeps the latest snapshot, derives the data status from it, and
// invokes every registered listener synchronously on the publishing task.
// Listeners run with no lock held, so they may subscribe, unsubscribe or
// read `latest()` from inside their callback.

use crate::types::{DataStatus, Snapshot};
use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Receiver of published snapshots
pub trait SnapshotListener: Send + Sync {
    fn on_snapshot(&self, snapshot: &Arc<Snapshot>);
}

impl<F> SnapshotListener for F
where
    F: Fn(&Arc<Snapshot>) + Send + Sync,
{
    fn on_snapshot(&self, snapshot: &Arc<Snapshot>) {
        self(snapshot)
    }
}

type ListenerEntry = (u64, Arc<dyn SnapshotListener>);

struct HubInner {
    latest: RwLock<Option<Arc<Snapshot>>>,
    // Registration order is dispatch order
    listeners: RwLock<Vec<ListenerEntry>>,
    next_id: AtomicU64,
    data_status: watch::Sender<DataStatus>,
}

impl HubInner {
    fn is_registered(&self, id: u64) -> bool {
        self.listeners.read().iter().any(|(entry_id, _)| *entry_id == id)
    }

    fn remove(&self, id: u64) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(entry_id, _)| *entry_id != id);
        listeners.len() != before
    }
}

/// Distributes each published snapshot to every current subscriber
#[derive(Clone)]
pub struct SnapshotHub {
    inner: Arc<HubInner>,
}

impl SnapshotHub {
    pub fn new() -> Self {
        let (data_status, _) = watch::channel(DataStatus::None);
        Self {
            inner: Arc::new(HubInner {
                latest: RwLock::new(None),
                listeners: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
                data_status,
            }),
        }
    }

    /// Register a listener; it receives snapshots starting with the next publish
    pub fn subscribe<L>(&self, listener: L) -> Subscription
    where
        L: SnapshotListener + 'static,
    {
        self.subscribe_arc(Arc::new(listener))
    }

    /// Register an already shared listener
    pub fn subscribe_arc(&self, listener: Arc<dyn SnapshotListener>) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.write().push((id, listener));
        debug!("Snapshot listener {} registered", id);

        Subscription {
            id,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Store the snapshot as latest, recompute data status and notify listeners
    ///
    /// Never fails: a panicking listener is logged and skipped.
    pub fn publish(&self, snapshot: Snapshot) {
        let snapshot = Arc::new(snapshot);

        *self.inner.latest.write() = Some(Arc::clone(&snapshot));
        self.inner
            .data_status
            .send_if_modified(|current| replace_if_changed(current, snapshot.data_status()));

        // Listeners added during dispatch are not in this copy
        let listeners: Vec<ListenerEntry> = self.inner.listeners.read().clone();

        for (id, listener) in listeners {
            // Unsubscribed earlier in this same dispatch
            if !self.inner.is_registered(id) {
                continue;
            }

            let result = catch_unwind(AssertUnwindSafe(|| listener.on_snapshot(&snapshot)));
            if result.is_err() {
                warn!("Snapshot listener {} panicked, skipping", id);
            }
        }
    }

    /// Most recently published snapshot
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.inner.latest.read().clone()
    }

    /// Freshness derived from the latest snapshot
    pub fn data_status(&self) -> DataStatus {
        *self.inner.data_status.borrow()
    }

    /// Change notifications for the data status
    pub fn watch_data_status(&self) -> watch::Receiver<DataStatus> {
        self.inner.data_status.subscribe()
    }

    /// Force the data status to `None` (the stream went away)
    pub fn mark_no_data(&self) {
        self.inner
            .data_status
            .send_if_modified(|current| replace_if_changed(current, DataStatus::None));
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.read().len()
    }
}

impl Default for SnapshotHub {
    fn default() -> Self {
        Self::new()
    }
}

fn replace_if_changed(current: &mut DataStatus, next: DataStatus) -> bool {
    if *current == next {
        false
    } else {
        *current = next;
        true
    }
}

/// Handle returned by `SnapshotHub::subscribe`
///
/// Dropping the handle does not unsubscribe; call `unsubscribe`.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    hub: Weak<HubInner>,
}

impl Subscription {
    /// Stop receiving snapshots. Safe to call repeatedly and from inside a listener.
    pub fn unsubscribe(&self) {
        if let Some(hub) = self.hub.upgrade() {
            if hub.remove(self.id) {
                debug!("Snapshot listener {} unregistered", self.id);
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.hub
            .upgrade()
            .map(|hub| hub.is_registered(self.id))
            .unwrap_or(false)
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttitudeData;
    use parking_lot::Mutex;

    fn snapshot(ts: i64) -> Snapshot {
        Snapshot::at(ts)
    }

    fn recorder() -> (Arc<Mutex<Vec<i64>>>, impl Fn(&Arc<Snapshot>) + Send + Sync) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |s: &Arc<Snapshot>| sink.lock().push(s.ts))
    }

    #[test]
    fn test_fan_out_to_every_subscriber() {
        let hub = SnapshotHub::new();
        let (a, listener_a) = recorder();
        let (b, listener_b) = recorder();
        let (c, listener_c) = recorder();
        let _sa = hub.subscribe(listener_a);
        let sb = hub.subscribe(listener_b);
        let _sc = hub.subscribe(listener_c);

        sb.unsubscribe();
        hub.publish(snapshot(1));

        assert_eq!(*a.lock(), vec![1]);
        assert!(b.lock().is_empty());
        assert_eq!(*c.lock(), vec![1]);
        assert_eq!(hub.subscriber_count(), 2);
    }

    #[test]
    fn test_same_snapshot_instance_delivered() {
        let hub = SnapshotHub::new();
        let received: Arc<Mutex<Vec<Arc<Snapshot>>>> = Arc::new(Mutex::new(Vec::new()));
        for _ in 0..3 {
            let sink = Arc::clone(&received);
            let _ = hub.subscribe(move |s: &Arc<Snapshot>| sink.lock().push(Arc::clone(s)));
        }

        hub.publish(snapshot(7));

        let received = received.lock();
        assert_eq!(received.len(), 3);
        let latest = hub.latest().unwrap();
        assert!(received.iter().all(|s| Arc::ptr_eq(s, &latest)));
    }

    #[test]
    fn test_late_subscriber_not_backfilled() {
        let hub = SnapshotHub::new();
        hub.publish(snapshot(1));

        let (seen, listener) = recorder();
        let _sub = hub.subscribe(listener);
        assert!(seen.lock().is_empty());
        assert_eq!(hub.latest().unwrap().ts, 1);

        hub.publish(snapshot(2));
        assert_eq!(*seen.lock(), vec![2]);
    }

    #[test]
    fn test_latest_replaces_without_merging() {
        let hub = SnapshotHub::new();
        let mut first = snapshot(1);
        first.attitude = Some(AttitudeData {
            pitch: 1.0,
            roll: 2.0,
            heading: 3.0,
        });
        first.attitude_ts = Some(1);
        hub.publish(first);
        hub.publish(snapshot(2));

        let latest = hub.latest().unwrap();
        assert_eq!(latest.ts, 2);
        assert!(latest.attitude.is_none());
    }

    #[test]
    fn test_subscribe_during_dispatch_waits_for_next_publish() {
        let hub = SnapshotHub::new();
        let late_seen = Arc::new(Mutex::new(Vec::new()));
        let late_subs = Arc::new(Mutex::new(Vec::new()));

        let hub_clone = hub.clone();
        let seen = Arc::clone(&late_seen);
        let subs = Arc::clone(&late_subs);
        let registered = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let _outer = hub.subscribe(move |_: &Arc<Snapshot>| {
            if !registered.swap(true, Ordering::SeqCst) {
                let sink = Arc::clone(&seen);
                let sub = hub_clone.subscribe(move |s: &Arc<Snapshot>| sink.lock().push(s.ts));
                subs.lock().push(sub);
            }
        });

        hub.publish(snapshot(1));
        assert!(late_seen.lock().is_empty());

        hub.publish(snapshot(2));
        assert_eq!(*late_seen.lock(), vec![2]);
    }

    #[test]
    fn test_unsubscribe_from_inside_listener() {
        let hub = SnapshotHub::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let calls = Arc::new(AtomicU64::new(0));

        let slot_clone = Arc::clone(&slot);
        let calls_clone = Arc::clone(&calls);
        let sub = hub.subscribe(move |_: &Arc<Snapshot>| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            if let Some(sub) = slot_clone.lock().as_ref() {
                sub.unsubscribe();
            }
        });
        *slot.lock() = Some(sub);

        hub.publish(snapshot(1));
        hub.publish(snapshot(2));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_unsubscribe_later_listener_mid_dispatch() {
        let hub = SnapshotHub::new();
        let target: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let target_clone = Arc::clone(&target);
        let _first = hub.subscribe(move |_: &Arc<Snapshot>| {
            if let Some(sub) = target_clone.lock().as_ref() {
                sub.unsubscribe();
            }
        });
        let (seen, listener) = recorder();
        *target.lock() = Some(hub.subscribe(listener));

        hub.publish(snapshot(1));
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let hub = SnapshotHub::new();
        let _bad = hub.subscribe(|_: &Arc<Snapshot>| panic!("listener failure"));
        let (seen, listener) = recorder();
        let _good = hub.subscribe(listener);

        hub.publish(snapshot(1));
        hub.publish(snapshot(2));

        assert_eq!(*seen.lock(), vec![1, 2]);
        assert_eq!(hub.subscriber_count(), 2);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let hub = SnapshotHub::new();
        let sub = hub.subscribe(|_: &Arc<Snapshot>| {});
        assert!(sub.is_active());
        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!sub.is_active());

        // Outliving the hub is harmless
        let sub = hub.subscribe(|_: &Arc<Snapshot>| {});
        drop(hub);
        sub.unsubscribe();
        assert!(!sub.is_active());
    }

    #[test]
    fn test_data_status_follows_publish() {
        let hub = SnapshotHub::new();
        assert_eq!(hub.data_status(), DataStatus::None);

        let mut fresh = snapshot(5000);
        fresh.attitude_ts = Some(3500);
        hub.publish(fresh);
        assert_eq!(hub.data_status(), DataStatus::Receiving);

        let mut stale = snapshot(5000);
        stale.attitude_ts = Some(2000);
        hub.publish(stale);
        assert_eq!(hub.data_status(), DataStatus::Stale);

        hub.publish(snapshot(6000));
        assert_eq!(hub.data_status(), DataStatus::None);

        let mut fresh = snapshot(7000);
        fresh.attitude_ts = Some(6999);
        hub.publish(fresh);
        hub.mark_no_data();
        assert_eq!(hub.data_status(), DataStatus::None);
    }

    #[test]
    fn test_fifo_per_subscriber() {
        let hub = SnapshotHub::new();
        let (seen, listener) = recorder();
        let _sub = hub.subscribe(listener);

        for ts in 0..50 {
            hub.publish(snapshot(ts));
        }

        assert_eq!(*seen.lock(), (0..50).collect::<Vec<_>>());
    }
}
