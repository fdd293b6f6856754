//! Workbook structure snapshot cache.
//!
//! Single-threaded and cooperative: every host round-trip is a suspension
//! point where other callers (UI events, change notifications) may run. A
//! second [`SnapshotCache::ensure_fresh`] arriving while a build is suspended
//! returns [`RefreshOutcome::InProgress`] immediately instead of queueing.

use std::cell::{Cell, RefCell};

use crate::clock::{Clock, Instant, SystemClock};
use crate::config::SnapshotConfig;
use crate::events::{EventHub, SnapshotEvent, SubscriptionId};
use crate::host::WorkbookHost;
use crate::snapshot::{Snapshot, SnapshotBuilder};

/// What a call to [`SnapshotCache::ensure_fresh`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshOutcome {
    /// Another build was already running; nothing was read.
    InProgress,
    /// The cached snapshot is younger than the TTL; nothing was read.
    Fresh,
    /// A build completed and replaced the snapshot.
    Rebuilt,
    /// A build completed but an invalidation arrived while it ran; its result was dropped.
    Discarded,
    /// A build failed; the previous snapshot was kept.
    Failed,
}

impl RefreshOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            RefreshOutcome::InProgress => "inProgress",
            RefreshOutcome::Fresh => "fresh",
            RefreshOutcome::Rebuilt => "rebuilt",
            RefreshOutcome::Discarded => "discarded",
            RefreshOutcome::Failed => "failed",
        }
    }
}

/// Clears the in-progress flag when a build finishes or its future is dropped.
struct BuildGuard<'a>(&'a Cell<bool>);

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

pub struct SnapshotCache<H, C = SystemClock> {
    host: H,
    clock: C,
    config: SnapshotConfig,
    builder: SnapshotBuilder,
    snapshot: RefCell<Option<Snapshot>>,
    building: Cell<bool>,
    generation: Cell<u64>,
    events: EventHub,
}

impl<H: WorkbookHost> SnapshotCache<H, SystemClock> {
    pub fn new(host: H) -> Self {
        Self::with_config(host, SnapshotConfig::default())
    }

    pub fn with_config(host: H, config: SnapshotConfig) -> Self {
        Self::with_clock(host, SystemClock, config)
    }
}

impl<H: WorkbookHost, C: Clock> SnapshotCache<H, C> {
    pub fn with_clock(host: H, clock: C, config: SnapshotConfig) -> Self {
        Self {
            host,
            clock,
            builder: SnapshotBuilder::new(config.max_data_rows),
            config,
            snapshot: RefCell::new(None),
            building: Cell::new(false),
            generation: Cell::new(0),
            events: EventHub::new(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    pub fn is_building(&self) -> bool {
        self.building.get()
    }

    /// Make the cached snapshot at most one TTL old, rebuilding if needed.
    ///
    /// Never returns an error: failures are logged, announced through
    /// [`SnapshotEvent::BuildFailed`], and leave the previous snapshot in place.
    pub async fn ensure_fresh(&self, force: bool) -> RefreshOutcome {
        if self.building.get() {
            #[cfg(feature = "tracing")]
            tracing::trace!(force, "snapshot build already running");
            return RefreshOutcome::InProgress;
        }
        if !force && self.is_fresh() {
            #[cfg(feature = "tracing")]
            tracing::debug!("using cached workbook snapshot");
            return RefreshOutcome::Fresh;
        }

        self.building.set(true);
        let _guard = BuildGuard(&self.building);
        let generation = self.generation.get();

        #[cfg(feature = "tracing")]
        tracing::debug!(force, generation, "rebuilding workbook snapshot");

        match self.builder.build(&self.host).await {
            Ok(_) if generation != self.generation.get() => {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    started = generation,
                    current = self.generation.get(),
                    "workbook changed during build; dropping result"
                );
                RefreshOutcome::Discarded
            }
            Ok(entries) => {
                let snapshot = Snapshot::new(entries, self.clock.now());
                let text = snapshot.text().to_owned();
                *self.snapshot.borrow_mut() = Some(snapshot);
                #[cfg(feature = "tracing")]
                tracing::info!(bytes = text.len(), "workbook snapshot updated");
                self.events.emit(&SnapshotEvent::Updated { text });
                RefreshOutcome::Rebuilt
            }
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %err, "workbook snapshot build failed");
                self.events.emit(&SnapshotEvent::BuildFailed {
                    message: err.to_string(),
                });
                RefreshOutcome::Failed
            }
        }
    }

    /// A snapshot with empty text (a document with no sheets) still counts as
    /// cached until the TTL lapses; it is not rebuilt on every call the way an
    /// absent snapshot is.
    fn is_fresh(&self) -> bool {
        self.snapshot.borrow().as_ref().is_some_and(|snapshot| {
            self.clock.now().duration_since(snapshot.built_at()) < self.config.ttl
        })
    }

    /// Cached snapshot text, or an empty string when nothing is cached.
    pub fn current_snapshot(&self) -> String {
        self.snapshot
            .borrow()
            .as_ref()
            .map(|snapshot| snapshot.text().to_owned())
            .unwrap_or_default()
    }

    /// Structured copy of the cached snapshot.
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.snapshot.borrow().clone()
    }

    pub fn built_at(&self) -> Option<Instant> {
        self.snapshot.borrow().as_ref().map(Snapshot::built_at)
    }

    /// Drop the cached snapshot after a structural workbook change.
    ///
    /// Takes effect immediately, with no TTL grace. A build already running
    /// when this is called will discard its result.
    pub fn invalidate(&self) {
        self.snapshot.borrow_mut().take();
        self.generation.set(self.generation.get() + 1);
        #[cfg(feature = "tracing")]
        tracing::debug!(
            generation = self.generation.get(),
            "workbook snapshot invalidated"
        );
        self.events.emit(&SnapshotEvent::Invalidated);
    }

    /// Return to the freshly constructed state: no snapshot, no subscribers.
    pub fn reset(&self) {
        self.snapshot.borrow_mut().take();
        self.generation.set(self.generation.get() + 1);
        self.events.clear();
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&SnapshotEvent) + 'static,
    {
        self.events.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }
}
