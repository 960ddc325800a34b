//! History view over the pin store.

use std::sync::Arc;

use anyhow::bail;
use pt_core::ports::{ClockPort, HistoryNotifierPort, PinQuery, PinRepositoryPort};
use pt_core::{Pin, PinId};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::surface_observers::SurfaceObserverRegistry;

/// History notifier backed by a watch channel carrying a change counter.
pub struct WatchHistoryNotifier {
    tx: watch::Sender<u64>,
}

impl WatchHistoryNotifier {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }
}

impl Default for WatchHistoryNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryNotifierPort for WatchHistoryNotifier {
    fn notify_history_changed(&self) {
        self.tx.send_modify(|generation| *generation = generation.wrapping_add(1));
    }
}

/// Keeps a published, most-recent-first list of historical pins.
pub struct HistoryManager {
    repo: Arc<dyn PinRepositoryPort>,
    clock: Arc<dyn ClockPort>,
    observers: Arc<SurfaceObserverRegistry>,
    history_tx: watch::Sender<Vec<Pin>>,
}

impl HistoryManager {
    pub fn new(
        repo: Arc<dyn PinRepositoryPort>,
        clock: Arc<dyn ClockPort>,
        observers: Arc<SurfaceObserverRegistry>,
    ) -> Self {
        let (history_tx, _) = watch::channel(Vec::new());
        Self {
            repo,
            clock,
            observers,
            history_tx,
        }
    }

    pub fn history(&self) -> Vec<Pin> {
        self.history_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Pin>> {
        self.history_tx.subscribe()
    }

    #[tracing::instrument(name = "usecase.history.refresh", skip(self))]
    pub async fn refresh(&self) -> anyhow::Result<Vec<Pin>> {
        let pins = self
            .repo
            .query(PinQuery::history(self.clock.now()))
            .await?;
        self.history_tx.send_replace(pins.clone());
        Ok(pins)
    }

    /// Permanently deletes one historical pin.
    #[tracing::instrument(name = "usecase.history.delete_pin", skip_all, fields(pin_id = %pin_id))]
    pub async fn delete_pin(&self, pin_id: &PinId) -> anyhow::Result<()> {
        let Some(pin) = self.repo.get(pin_id).await? else {
            bail!("pin {pin_id} not found");
        };
        if pin.is_active_at(self.clock.now()) {
            bail!("pin {pin_id} is still active; remove it first");
        }

        self.observers.cancel(pin_id);
        self.repo.delete(pin_id).await?;
        info!("historical pin deleted");
        self.refresh().await?;
        Ok(())
    }

    /// Deletes every historical pin. Returns how many were removed.
    #[tracing::instrument(name = "usecase.history.clear", skip(self))]
    pub async fn clear_history(&self) -> anyhow::Result<usize> {
        let now = self.clock.now();
        let historical = self.repo.query(PinQuery::history(now)).await?;
        self.observers
            .cancel_many(historical.iter().map(|pin| &pin.id));

        let removed = self.repo.delete_historical(now).await?;
        info!(removed, "history cleared");
        self.refresh().await?;
        Ok(removed)
    }

    /// Refreshes on every change signal until the notifier goes away.
    pub async fn run_refresh_listener(&self, mut signal: watch::Receiver<u64>) {
        while signal.changed().await.is_ok() {
            if let Err(err) = self.refresh().await {
                warn!(error = %err, "failed to refresh history");
            }
        }
    }
}
