//! Pin lifecycle manager.
//!
//! Owns the in-memory list of active pins and keeps three parties in step: the
//! durable pin store, the external surface registry, and the list observers.
//!
//! - Every mutation of the active list happens under one lock that is never held
//!   across an `.await`; the published snapshot is replaced while that lock is held.
//! - Store writes after a surface operation are best effort: failures are logged
//!   and the next startup reconciliation repairs the drift.
//! - Adds for the same content are serialized through a per-content gate so a
//!   re-pin always lands after the add it duplicates.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use anyhow::Context;
use futures::StreamExt;
use pt_core::ports::{
    ClockPort, HistoryNotifierPort, MetadataFetcherPort, PinQuery, PinRepositoryPort,
    SurfaceRegistryError, SurfaceRegistryPort, SurfaceStateStream,
};
use pt_core::{
    ContentError, ContentErrorCode, Pin, PinId, ProcessedContent, SurfaceContentState, SurfaceId,
    SurfaceState,
};
use tokio::sync::watch;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::content_processor::ContentProcessor;
use crate::shared_processing::{SharedPinProcessingState, SharedProcessing};
use crate::surface_observers::SurfaceObserverRegistry;

/// Ports the manager is built from.
pub struct PinLifecycleDeps {
    pub repo: Arc<dyn PinRepositoryPort>,
    pub registry: Arc<dyn SurfaceRegistryPort>,
    pub fetcher: Arc<dyn MetadataFetcherPort>,
    pub clock: Arc<dyn ClockPort>,
    pub history_notifier: Arc<dyn HistoryNotifierPort>,
    pub observers: Arc<SurfaceObserverRegistry>,
}

/// Outcome of startup reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    pub restored: usize,
    pub moved_to_history: usize,
}

/// Active pin plus the surface it is bound to in memory.
///
/// `surface` is `None` only while a freshly inserted pin waits for its surface.
struct ActivePin {
    pin: Pin,
    surface: Option<SurfaceId>,
}

struct Inner {
    repo: Arc<dyn PinRepositoryPort>,
    registry: Arc<dyn SurfaceRegistryPort>,
    clock: Arc<dyn ClockPort>,
    history_notifier: Arc<dyn HistoryNotifierPort>,
    observers: Arc<SurfaceObserverRegistry>,
    processor: ContentProcessor,
    active: Mutex<Vec<ActivePin>>,
    active_tx: watch::Sender<Vec<Pin>>,
    content_gates: Mutex<HashMap<String, Weak<tokio::sync::Mutex<()>>>>,
    shared: SharedProcessing,
}

impl Inner {
    fn lock_active(&self) -> MutexGuard<'_, Vec<ActivePin>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs a synchronous mutation of the active list and publishes the result.
    fn mutate_active<R>(&self, mutation: impl FnOnce(&mut Vec<ActivePin>) -> R) -> R {
        let mut active = self.lock_active();
        let result = mutation(&mut active);
        let snapshot: Vec<Pin> = active.iter().map(|entry| entry.pin.clone()).collect();
        self.active_tx.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
        result
    }

    fn content_gate(&self, content: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut gates = self
            .content_gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        gates.retain(|_, gate| gate.strong_count() > 0);
        if let Some(gate) = gates.get(content).and_then(Weak::upgrade) {
            return gate;
        }
        let gate = Arc::new(tokio::sync::Mutex::new(()));
        gates.insert(content.to_string(), Arc::downgrade(&gate));
        gate
    }
}

/// Cheap to clone; every clone drives the same state.
#[derive(Clone)]
pub struct PinLifecycleManager {
    inner: Arc<Inner>,
}

impl PinLifecycleManager {
    pub fn new(deps: PinLifecycleDeps) -> Self {
        let (active_tx, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(Inner {
                repo: deps.repo,
                registry: deps.registry,
                clock: deps.clock,
                history_notifier: deps.history_notifier,
                observers: deps.observers,
                processor: ContentProcessor::new(deps.fetcher),
                active: Mutex::new(Vec::new()),
                active_tx,
                content_gates: Mutex::new(HashMap::new()),
                shared: SharedProcessing::new(),
            }),
        }
    }

    /// Snapshot of the active pins, newest first.
    pub fn active_pins(&self) -> Vec<Pin> {
        self.inner.active_tx.borrow().clone()
    }

    pub fn subscribe_active_pins(&self) -> watch::Receiver<Vec<Pin>> {
        self.inner.active_tx.subscribe()
    }

    pub fn shared_processing_state(&self) -> SharedPinProcessingState {
        self.inner.shared.state()
    }

    pub fn subscribe_shared_processing(&self) -> watch::Receiver<SharedPinProcessingState> {
        self.inner.shared.subscribe()
    }

    pub fn reset_shared_pin_processing_state(&self) {
        self.inner.shared.reset();
    }

    /// Rebuilds the active list from the store and the registry's live surfaces.
    ///
    /// Pins whose surface vanished while the app was not running move to history.
    /// If either source cannot be read the active list is left untouched.
    #[tracing::instrument(name = "usecase.pin_lifecycle.sync_on_startup", skip(self))]
    pub async fn sync_on_startup(&self) -> anyhow::Result<ReconciliationReport> {
        let inner = &self.inner;
        let live: HashSet<SurfaceId> = inner
            .registry
            .all_live_handles()
            .await
            .context("failed to enumerate live surfaces")?
            .into_iter()
            .collect();
        let now = inner.clock.now();
        let candidates = inner
            .repo
            .query(PinQuery::active(now))
            .await
            .context("failed to query active pins")?;

        let mut reconciled = Vec::with_capacity(candidates.len());
        let mut moved_to_history = 0;
        for mut pin in candidates {
            match pin.surface_handle_id.clone().filter(|id| live.contains(id)) {
                Some(surface_id) => reconciled.push(ActivePin {
                    pin,
                    surface: Some(surface_id),
                }),
                None => {
                    debug!(pin_id = %pin.id, "surface gone while not running, moving pin to history");
                    pin.move_to_history(now);
                    self.persist(&pin).await;
                    moved_to_history += 1;
                }
            }
        }

        let to_observe: Vec<(PinId, SurfaceId)> = reconciled
            .iter()
            .filter_map(|entry| {
                entry
                    .surface
                    .clone()
                    .map(|surface_id| (entry.pin.id.clone(), surface_id))
            })
            .collect();
        let report = ReconciliationReport {
            restored: reconciled.len(),
            moved_to_history,
        };

        inner.mutate_active(|active| *active = reconciled);
        for (pin_id, surface_id) in to_observe {
            self.observe_surface(pin_id, surface_id);
        }
        if moved_to_history > 0 {
            inner.history_notifier.notify_history_changed();
        }

        info!(
            restored = report.restored,
            moved_to_history = report.moved_to_history,
            "startup reconciliation finished"
        );
        Ok(report)
    }

    /// Pins processed content, or re-pins it when the same content is already active.
    #[tracing::instrument(
        name = "usecase.pin_lifecycle.add_pin",
        skip(self, processed),
        fields(kind = %processed.kind)
    )]
    pub async fn add_pin(&self, processed: ProcessedContent) -> Result<SurfaceId, ContentError> {
        let gate = self.inner.content_gate(&processed.original_content);
        let _permit = gate.lock().await;

        let duplicate = self.inner.mutate_active(|active| {
            active
                .iter()
                .position(|entry| entry.pin.content == processed.original_content)
                .map(|index| active.remove(index))
        });

        match duplicate {
            Some(existing) => self.repin(existing, processed).await,
            None => self.insert_new(processed).await,
        }
    }

    /// Classifies, enriches and pins raw content.
    pub async fn add_pin_and_process(&self, content: &str) -> Result<SurfaceId, ContentError> {
        let processed = self.inner.processor.process(content).await?;
        self.add_pin(processed).await
    }

    /// Submission path used by share-sheet style entry points.
    ///
    /// Returns `None` when another submission is still loading and this one was
    /// ignored; otherwise the terminal state that was published.
    #[tracing::instrument(name = "usecase.pin_lifecycle.process_shared_content", skip_all)]
    pub async fn process_and_pin_shared_content(
        &self,
        content: &str,
    ) -> Option<SharedPinProcessingState> {
        let shared = &self.inner.shared;
        let Some(_submission) = shared.try_begin() else {
            debug!("shared submission already in flight, ignoring");
            return None;
        };

        let outcome = match self.inner.processor.process(content).await {
            Err(err) => SharedPinProcessingState::Error(err),
            Ok(processed) => match self.add_pin(processed.clone()).await {
                Ok(_) => SharedPinProcessingState::Success { preview: processed },
                Err(err) => SharedPinProcessingState::Error(err),
            },
        };

        shared.finish(outcome.clone());
        Some(outcome)
    }

    /// Removes the pins at the given positions of the active list.
    ///
    /// Out-of-range and repeated indices are ignored.
    #[tracing::instrument(name = "usecase.pin_lifecycle.remove_pins", skip(self))]
    pub async fn remove_pins(&self, indices: &[usize]) -> usize {
        let removed = self.inner.mutate_active(|active| {
            let mut picked: Vec<usize> = indices
                .iter()
                .copied()
                .filter(|index| *index < active.len())
                .collect();
            picked.sort_unstable();
            picked.dedup();
            picked
                .into_iter()
                .rev()
                .map(|index| active.remove(index))
                .collect::<Vec<_>>()
        });

        let count = removed.len();
        for entry in removed {
            self.retire(entry).await;
        }
        count
    }

    /// Removes one active pin by id. Returns `false` when it was not active.
    #[tracing::instrument(name = "usecase.pin_lifecycle.remove_pin", skip_all, fields(pin_id = %pin_id))]
    pub async fn remove_pin(&self, pin_id: &PinId) -> bool {
        let removed = self.inner.mutate_active(|active| {
            active
                .iter()
                .position(|entry| entry.pin.id == *pin_id)
                .map(|index| active.remove(index))
        });

        match removed {
            Some(entry) => {
                self.retire(entry).await;
                true
            }
            None => false,
        }
    }

    /// Puts a pin back on a surface for a fresh lifetime, keeping its identity.
    ///
    /// Any active pin with the same id or content gives up its surface first.
    /// `Ok(None)` means the new surface could not be started; the pin keeps its
    /// advanced timestamps until the next reconciliation moves it back to history.
    #[tracing::instrument(name = "usecase.pin_lifecycle.restore_pin", skip_all, fields(pin_id = %pin_id))]
    pub async fn restore_pin(&self, pin_id: &PinId) -> anyhow::Result<Option<SurfaceId>> {
        let inner = &self.inner;
        let content = inner
            .repo
            .get(pin_id)
            .await?
            .with_context(|| format!("pin {pin_id} not found"))?
            .content;

        let gate = inner.content_gate(&content);
        let _permit = gate.lock().await;

        let mut pin = inner
            .repo
            .get(pin_id)
            .await?
            .with_context(|| format!("pin {pin_id} not found"))?;

        let displaced = inner.mutate_active(|active| {
            let (displaced, kept): (Vec<_>, Vec<_>) = active
                .drain(..)
                .partition(|entry| entry.pin.id == *pin_id || entry.pin.content == content);
            *active = kept;
            displaced
        });

        let now = inner.clock.now();
        for entry in displaced {
            inner.observers.cancel(&entry.pin.id);
            if let Some(surface_id) = &entry.surface {
                self.end_surface(surface_id).await;
            }
            if entry.pin.id != *pin_id {
                let mut other = entry.pin;
                other.move_to_history(now);
                self.persist(&other).await;
                inner.history_notifier.notify_history_changed();
            }
        }

        pin.restart_lifetime(now);
        pin.surface_handle_id = None;
        let processed = pin.to_processed_content();

        match self.start_surface(&pin, SurfaceContentState::from(&processed)).await {
            Ok(surface_id) => {
                pin.surface_handle_id = Some(surface_id.clone());
                self.persist(&pin).await;
                self.activate(pin, surface_id.clone());
                inner.history_notifier.notify_history_changed();
                info!(surface_id = %surface_id, "pin restored from history");
                Ok(Some(surface_id))
            }
            Err(err) => {
                warn!(error = %err, "could not start surface for restored pin");
                self.persist(&pin).await;
                inner.history_notifier.notify_history_changed();
                Ok(None)
            }
        }
    }

    /// Cleanup after a surface ended outside the app's control.
    ///
    /// The stored pin is only moved to history while it is still bound to the
    /// ended surface. Another process may have re-pinned or removed it in the
    /// meantime; then only this process's in-memory entry is dropped.
    /// Idempotent: only the first call for a given pin/surface pair has an effect.
    #[tracing::instrument(
        name = "usecase.pin_lifecycle.surface_terminated",
        skip_all,
        fields(pin_id = %pin_id, surface_id = %surface_id)
    )]
    pub async fn handle_surface_terminated(&self, pin_id: &PinId, surface_id: &SurfaceId) {
        let inner = &self.inner;
        let removed = inner.mutate_active(|active| {
            let before = active.len();
            active.retain(|entry| {
                !(entry.pin.id == *pin_id && entry.surface.as_ref() == Some(surface_id))
            });
            before != active.len()
        });

        let stored = match inner.repo.get(pin_id).await {
            Ok(stored) => stored,
            Err(err) => {
                warn!(error = %err, "failed to load pin for surface cleanup");
                None
            }
        };

        let Some(mut pin) =
            stored.filter(|pin| pin.surface_handle_id.as_ref() == Some(surface_id))
        else {
            debug!(removed, "stored pin no longer bound to this surface, leaving it as is");
            if removed {
                inner.history_notifier.notify_history_changed();
            }
            return;
        };

        pin.move_to_history(inner.clock.now());
        self.persist(&pin).await;
        inner.history_notifier.notify_history_changed();
        info!("surface ended externally, pin moved to history");
    }

    async fn insert_new(&self, processed: ProcessedContent) -> Result<SurfaceId, ContentError> {
        let inner = &self.inner;
        let mut pin = Pin::new(&processed, inner.clock.now());
        let pin_id = pin.id.clone();

        if let Err(err) = inner.repo.insert(&pin).await {
            warn!(error = %err, "failed to store new pin");
            return Err(ContentError::new(ContentErrorCode::Storage));
        }
        inner.mutate_active(|active| {
            active.insert(
                0,
                ActivePin {
                    pin: pin.clone(),
                    surface: None,
                },
            )
        });

        let surface_id = match self
            .start_surface(&pin, SurfaceContentState::from(&processed))
            .await
        {
            Ok(surface_id) => surface_id,
            Err(err) => {
                warn!(pin_id = %pin_id, error = %err, "could not start surface, rolling back pin");
                inner.mutate_active(|active| active.retain(|entry| entry.pin.id != pin_id));
                if let Err(err) = inner.repo.delete(&pin_id).await {
                    warn!(pin_id = %pin_id, error = %err, "failed to delete rolled back pin");
                }
                return Err(ContentError::surface_start_failed());
            }
        };

        pin.surface_handle_id = Some(surface_id.clone());
        self.persist(&pin).await;

        let bound = inner.mutate_active(|active| {
            match active.iter_mut().find(|entry| entry.pin.id == pin_id) {
                Some(entry) => {
                    entry.pin.surface_handle_id = Some(surface_id.clone());
                    entry.surface = Some(surface_id.clone());
                    true
                }
                None => false,
            }
        });
        if !bound {
            warn!(pin_id = %pin_id, "pin was removed while its surface was starting");
            self.end_surface(&surface_id).await;
            pin.move_to_history(inner.clock.now());
            self.persist(&pin).await;
            return Err(ContentError::surface_start_failed());
        }

        self.observe_surface(pin_id.clone(), surface_id.clone());
        info!(pin_id = %pin_id, surface_id = %surface_id, "pin added");
        Ok(surface_id)
    }

    async fn repin(
        &self,
        existing: ActivePin,
        processed: ProcessedContent,
    ) -> Result<SurfaceId, ContentError> {
        let inner = &self.inner;
        let ActivePin { mut pin, surface } = existing;
        debug!(pin_id = %pin.id, "content already pinned, restarting its surface");

        inner.observers.cancel(&pin.id);
        if let Some(old_surface) = &surface {
            self.end_surface(old_surface).await;
        }

        let now = inner.clock.now();
        pin.restart_lifetime(now);
        pin.apply_metadata(&processed);
        pin.surface_handle_id = None;

        match self
            .start_surface(&pin, SurfaceContentState::from(&processed))
            .await
        {
            Ok(surface_id) => {
                pin.surface_handle_id = Some(surface_id.clone());
                self.persist(&pin).await;
                info!(pin_id = %pin.id, surface_id = %surface_id, "pin re-pinned");
                self.activate(pin, surface_id.clone());
                Ok(surface_id)
            }
            Err(err) => {
                warn!(pin_id = %pin.id, error = %err, "could not restart surface, pin moves to history");
                pin.move_to_history(now);
                self.persist(&pin).await;
                inner.history_notifier.notify_history_changed();
                Err(ContentError::surface_start_failed())
            }
        }
    }

    /// Moves a pin that was just taken out of the active list to history and
    /// ends its surface.
    async fn retire(&self, entry: ActivePin) {
        let inner = &self.inner;
        let ActivePin { mut pin, surface } = entry;

        pin.show_in_history_at = inner.clock.now();
        self.persist(&pin).await;
        inner.history_notifier.notify_history_changed();

        inner.observers.cancel(&pin.id);
        if let Some(surface_id) = &surface {
            self.end_surface(surface_id).await;
        }

        pin.surface_handle_id = None;
        self.persist(&pin).await;
        info!(pin_id = %pin.id, "pin removed");
    }

    /// Inserts at the head of the active list and starts observing.
    fn activate(&self, pin: Pin, surface_id: SurfaceId) {
        let pin_id = pin.id.clone();
        self.inner.mutate_active(|active| {
            active.retain(|entry| entry.pin.id != pin_id);
            active.insert(
                0,
                ActivePin {
                    pin,
                    surface: Some(surface_id.clone()),
                },
            );
        });
        self.observe_surface(pin_id, surface_id);
    }

    async fn start_surface(
        &self,
        pin: &Pin,
        state: SurfaceContentState,
    ) -> Result<SurfaceId, SurfaceRegistryError> {
        self.inner
            .registry
            .create(pin.surface_attributes(), state)
            .await
    }

    async fn end_surface(&self, surface_id: &SurfaceId) {
        if let Err(err) = self.inner.registry.end(surface_id).await {
            warn!(surface_id = %surface_id, error = %err, "failed to end surface");
        }
    }

    async fn persist(&self, pin: &Pin) {
        if let Err(err) = self.inner.repo.update(pin).await {
            warn!(pin_id = %pin.id, error = %err, "failed to persist pin");
        }
    }

    fn observe_surface(&self, pin_id: PinId, surface_id: SurfaceId) {
        let stream = self.inner.registry.state_changes(&surface_id);
        let manager = Arc::downgrade(&self.inner);
        let observers = Arc::clone(&self.inner.observers);
        let span = info_span!(
            "usecase.pin_lifecycle.observe_surface",
            pin_id = %pin_id,
            surface_id = %surface_id
        );
        let (task_pin, task_surface) = (pin_id.clone(), surface_id.clone());

        self.inner.observers.spawn(
            pin_id,
            surface_id,
            async move {
                let last = wait_for_termination(stream).await;
                debug!(state = ?last, "surface observer finished");
                if let Some(inner) = manager.upgrade() {
                    PinLifecycleManager { inner }
                        .handle_surface_terminated(&task_pin, &task_surface)
                        .await;
                }
                observers.finish(&task_pin, &task_surface);
            }
            .instrument(span),
        );
    }
}

/// Waits for a terminal state. A stream that completes without one counts as ended.
async fn wait_for_termination(mut stream: SurfaceStateStream) -> Option<SurfaceState> {
    while let Some(state) = stream.next().await {
        match state {
            SurfaceState::Ended | SurfaceState::Dismissed => return Some(state),
            SurfaceState::Stale => debug!("surface went stale"),
            SurfaceState::Active => {}
        }
    }
    None
}
