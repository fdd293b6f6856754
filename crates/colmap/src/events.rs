//! Snapshot notifications with isolated subscriber dispatch.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SnapshotEvent {
    /// A build completed and replaced the cached snapshot.
    Updated { text: String },
    /// A build failed; the previous snapshot (if any) is still cached.
    BuildFailed { message: String },
    /// The cached snapshot was dropped after a structural change.
    Invalidated,
}

impl SnapshotEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SnapshotEvent::Updated { .. } => "snapshot:updated",
            SnapshotEvent::BuildFailed { .. } => "snapshot:failed",
            SnapshotEvent::Invalidated => "snapshot:invalidated",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for SubscriptionId {
    fn from(value: u64) -> Self {
        SubscriptionId(value)
    }
}

type Subscriber = Rc<dyn Fn(&SnapshotEvent)>;

/// Fire-and-forget fan-out to any number of subscribers.
#[derive(Default)]
pub struct EventHub {
    next_id: Cell<u64>,
    subscribers: RefCell<Vec<(SubscriptionId, Subscriber)>>,
}

impl fmt::Debug for EventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHub")
            .field("subscribers", &self.len())
            .finish()
    }
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&SnapshotEvent) + 'static,
    {
        let id = SubscriptionId(self.next_id.get() + 1);
        self.next_id.set(id.0);
        self.subscribers.borrow_mut().push((id, Rc::new(callback)));
        id
    }

    /// Returns false when `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
        subscribers.len() != before
    }

    pub fn clear(&self) {
        self.subscribers.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.subscribers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.borrow().is_empty()
    }

    /// Deliver `event` to every subscriber registered at the time of the call.
    ///
    /// A subscriber that panics is skipped over; delivery continues with the
    /// next one. Returns the number of subscribers that failed.
    pub fn emit(&self, event: &SnapshotEvent) -> usize {
        let subscribers: Vec<(SubscriptionId, Subscriber)> = self
            .subscribers
            .borrow()
            .iter()
            .map(|(id, sub)| (*id, Rc::clone(sub)))
            .collect();

        let mut failed = 0;
        for (id, subscriber) in subscribers {
            if catch_unwind(AssertUnwindSafe(|| subscriber(event))).is_err() {
                failed += 1;
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    event = event.name(),
                    subscription = id.as_u64(),
                    "snapshot subscriber panicked"
                );
                #[cfg(not(feature = "tracing"))]
                let _ = id;
            }
        }
        failed
    }
}
