use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use pt_core::{PinId, SurfaceId};
use tokio::task::AbortHandle;
use tracing::debug;

struct ObserverEntry {
    surface_id: SurfaceId,
    handle: AbortHandle,
}

/// Owns the long-running observer task of every pin with a live surface.
///
/// At most one observer exists per pin. Registering a new one aborts the
/// previous task, and callers cancel observers before they end a surface on
/// purpose, so a deliberate end is never mistaken for an external one.
pub struct SurfaceObserverRegistry {
    tasks: Mutex<HashMap<PinId, ObserverEntry>>,
}

impl SurfaceObserverRegistry {
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PinId, ObserverEntry>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawns `observer` for the given pin/surface pair. Must be called inside a tokio runtime.
    pub fn spawn<F>(&self, pin_id: PinId, surface_id: SurfaceId, observer: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.lock();
        let handle = tokio::spawn(observer).abort_handle();
        debug!(pin_id = %pin_id, surface_id = %surface_id, "surface observer started");
        if let Some(previous) = tasks.insert(pin_id, ObserverEntry { surface_id, handle }) {
            previous.handle.abort();
        }
    }

    /// Aborts the observer of `pin_id`, if any.
    pub fn cancel(&self, pin_id: &PinId) -> bool {
        match self.lock().remove(pin_id) {
            Some(entry) => {
                entry.handle.abort();
                debug!(pin_id = %pin_id, surface_id = %entry.surface_id, "surface observer cancelled");
                true
            }
            None => false,
        }
    }

    pub fn cancel_many<'a>(&self, pin_ids: impl IntoIterator<Item = &'a PinId>) -> usize {
        pin_ids.into_iter().filter(|id| self.cancel(id)).count()
    }

    /// Called by an observer when it is done. Leaves a newer observer of the same pin alone.
    pub fn finish(&self, pin_id: &PinId, surface_id: &SurfaceId) {
        let mut tasks = self.lock();
        if tasks
            .get(pin_id)
            .is_some_and(|entry| entry.surface_id == *surface_id)
        {
            tasks.remove(pin_id);
        }
    }

    pub fn is_observing(&self, pin_id: &PinId) -> bool {
        self.lock().contains_key(pin_id)
    }

    /// Aborts every observer. Used when the process shuts down.
    pub fn shutdown(&self) {
        for (_, entry) in self.lock().drain() {
            entry.handle.abort();
        }
    }
}

#[cfg(test)]
impl SurfaceObserverRegistry {
    fn observed_surface(&self, pin_id: &PinId) -> Option<SurfaceId> {
        self.lock().get(pin_id).map(|entry| entry.surface_id.clone())
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Default for SurfaceObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::time::{advance, sleep, Duration};

    fn ids(pin: &str, surface: &str) -> (PinId, SurfaceId) {
        (PinId::from(pin), SurfaceId::from(surface))
    }

    #[tokio::test]
    async fn cancel_stops_running_observer() {
        tokio::time::pause();
        let registry = SurfaceObserverRegistry::new();
        let fired = Arc::new(AtomicBool::new(false));
        let (pin_id, surface_id) = ids("pin-1", "surface-1");

        let flag = fired.clone();
        registry.spawn(pin_id.clone(), surface_id, async move {
            sleep(Duration::from_secs(5)).await;
            flag.store(true, Ordering::SeqCst);
        });
        assert!(registry.is_observing(&pin_id));

        assert!(registry.cancel(&pin_id));
        advance(Duration::from_secs(10)).await;
        tokio::task::yield_now().await;

        assert!(!fired.load(Ordering::SeqCst));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn spawn_replaces_existing_observer_for_same_pin() {
        tokio::time::pause();
        let registry = SurfaceObserverRegistry::new();
        let first_fired = Arc::new(AtomicBool::new(false));
        let pin_id = PinId::from("pin-2");

        let flag = first_fired.clone();
        registry.spawn(pin_id.clone(), SurfaceId::from("old"), async move {
            sleep(Duration::from_secs(5)).await;
            flag.store(true, Ordering::SeqCst);
        });
        registry.spawn(pin_id.clone(), SurfaceId::from("new"), async {
            sleep(Duration::from_secs(60)).await;
        });

        advance(Duration::from_secs(10)).await;
        tokio::task::yield_now().await;

        assert!(!first_fired.load(Ordering::SeqCst));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.observed_surface(&pin_id), Some(SurfaceId::from("new")));
    }

    #[tokio::test]
    async fn finish_ignores_stale_surface() {
        let registry = SurfaceObserverRegistry::new();
        let pin_id = PinId::from("pin-3");
        registry.spawn(pin_id.clone(), SurfaceId::from("current"), std::future::pending());

        registry.finish(&pin_id, &SurfaceId::from("previous"));
        assert!(registry.is_observing(&pin_id));

        registry.finish(&pin_id, &SurfaceId::from("current"));
        assert!(!registry.is_observing(&pin_id));
    }

    #[tokio::test]
    async fn cancel_many_counts_only_known_pins() {
        let registry = SurfaceObserverRegistry::new();
        let (a, sa) = ids("a", "sa");
        let (b, sb) = ids("b", "sb");
        registry.spawn(a.clone(), sa, std::future::pending());
        registry.spawn(b.clone(), sb, std::future::pending());

        let unknown = PinId::from("c");
        assert_eq!(registry.cancel_many([&a, &b, &unknown]), 2);
        assert!(registry.is_empty());
    }
}
