use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use pt_core::ports::{ClockPort, SurfaceRegistryError, SurfaceRegistryPort, SurfaceStateStream};
use pt_core::{SurfaceAttributes, SurfaceContentState, SurfaceId, SurfaceState, TimestampMs};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::record::{RegistryFile, SurfaceRecord};

fn backend(context: &str, path: &Path, err: impl std::fmt::Display) -> SurfaceRegistryError {
    SurfaceRegistryError::Backend(format!("{context} {}: {err}", path.display()))
}

/// Reads the state file. Shared by the registry and its state streams.
#[derive(Clone)]
struct StateFile {
    path: PathBuf,
}

impl StateFile {
    async fn load(&self) -> Result<RegistryFile, SurfaceRegistryError> {
        match fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| backend("parse surface registry failed:", &self.path, e)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(RegistryFile::default()),
            Err(err) => Err(backend("read surface registry failed:", &self.path, err)),
        }
    }

    /// Atomic replace via a sibling temp file.
    async fn store(&self, file: &RegistryFile) -> Result<(), SurfaceRegistryError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| backend("create surface registry dir failed:", dir, e))?;
        }

        let content = serde_json::to_vec_pretty(file)
            .map_err(|e| backend("serialize surface registry failed:", &self.path, e))?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, content)
            .await
            .map_err(|e| backend("write temp surface registry failed:", &tmp_path, e))?;
        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| backend("rename temp surface registry failed:", &self.path, e))?;
        Ok(())
    }
}

/// Surface registry kept in a JSON file so surfaces outlive the process.
///
/// Entries past their stale date turn `stale`, then `ended` once the grace
/// period is over; ended and dismissed entries are pruned on the next write.
/// Other processes (another CLI invocation, a `watch` session) may change the
/// file at any time; state streams pick those changes up by polling.
pub struct FileSurfaceRegistry {
    file: StateFile,
    poll_interval: Duration,
    max_live: usize,
    clock: Arc<dyn ClockPort>,
    write_lock: Mutex<()>,
}

impl FileSurfaceRegistry {
    pub fn new(
        path: impl Into<PathBuf>,
        poll_interval: Duration,
        max_live: usize,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            file: StateFile { path: path.into() },
            poll_interval,
            max_live,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file.path
    }

    /// Live entries, highest relevance first.
    pub async fn live_records(&self) -> Result<Vec<SurfaceRecord>, SurfaceRegistryError> {
        let now = self.clock.now();
        let mut records: Vec<SurfaceRecord> = self
            .file
            .load()
            .await?
            .surfaces
            .into_iter()
            .filter(|record| record.is_live_at(now))
            .collect();
        records.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        Ok(records)
    }

    /// Marks a surface dismissed, as a user swipe would.
    pub async fn dismiss(&self, surface_id: &SurfaceId) -> Result<(), SurfaceRegistryError> {
        self.modify(|file, now| {
            let record = file
                .surfaces
                .iter_mut()
                .find(|record| record.id == *surface_id && record.is_live_at(now))
                .ok_or_else(|| SurfaceRegistryError::NotFound(surface_id.clone()))?;
            record.dismissed = true;
            Ok(())
        })
        .await?;
        info!(surface_id = %surface_id, "surface dismissed");
        Ok(())
    }

    /// Load, prune, mutate, store under the in-process write lock. Nothing is
    /// written when `mutation` fails.
    async fn modify<R>(
        &self,
        mutation: impl FnOnce(&mut RegistryFile, TimestampMs) -> Result<R, SurfaceRegistryError>,
    ) -> Result<R, SurfaceRegistryError> {
        let _guard = self.write_lock.lock().await;
        let now = self.clock.now();
        let mut file = self.file.load().await?;
        let before = file.surfaces.len();
        file.surfaces.retain(|record| record.is_live_at(now));
        if file.surfaces.len() != before {
            debug!(pruned = before - file.surfaces.len(), "pruned finished surfaces");
        }

        let result = mutation(&mut file, now)?;
        self.file.store(&file).await?;
        Ok(result)
    }
}

#[async_trait]
impl SurfaceRegistryPort for FileSurfaceRegistry {
    async fn create(
        &self,
        attributes: SurfaceAttributes,
        state: SurfaceContentState,
    ) -> Result<SurfaceId, SurfaceRegistryError> {
        let max_live = self.max_live;
        let surface_id = self
            .modify(|file, _| {
                if file.surfaces.len() >= max_live {
                    return Err(SurfaceRegistryError::LimitReached(max_live));
                }
                let surface_id = SurfaceId::new();
                file.surfaces
                    .push(SurfaceRecord::new(surface_id.clone(), attributes, state));
                Ok(surface_id)
            })
            .await?;
        debug!(surface_id = %surface_id, "surface created");
        Ok(surface_id)
    }

    async fn update(
        &self,
        surface_id: &SurfaceId,
        state: SurfaceContentState,
    ) -> Result<(), SurfaceRegistryError> {
        self.modify(|file, _| {
            let record = file
                .surfaces
                .iter_mut()
                .find(|record| record.id == *surface_id)
                .ok_or_else(|| SurfaceRegistryError::NotFound(surface_id.clone()))?;
            record.content = state;
            Ok(())
        })
        .await
    }

    async fn end(&self, surface_id: &SurfaceId) -> Result<(), SurfaceRegistryError> {
        self.modify(|file, _| {
            file.surfaces.retain(|record| record.id != *surface_id);
            Ok(())
        })
        .await?;
        debug!(surface_id = %surface_id, "surface ended");
        Ok(())
    }

    async fn all_live_handles(&self) -> Result<Vec<SurfaceId>, SurfaceRegistryError> {
        Ok(self
            .live_records()
            .await?
            .into_iter()
            .map(|record| record.id)
            .collect())
    }

    fn state_changes(&self, surface_id: &SurfaceId) -> SurfaceStateStream {
        let poll = StatePoll {
            file: self.file.clone(),
            clock: Arc::clone(&self.clock),
            surface_id: surface_id.clone(),
            interval: self.poll_interval,
            last: None,
        };

        Box::pin(stream::unfold(Some(poll), |poll| async move {
            let mut poll = poll?;
            loop {
                if let Some(state) = poll.current().await {
                    if poll.last != Some(state) {
                        poll.last = Some(state);
                        let next = (!state.is_terminal()).then_some(poll);
                        return Some((state, next));
                    }
                }
                tokio::time::sleep(poll.interval).await;
            }
        }))
    }
}

struct StatePoll {
    file: StateFile,
    clock: Arc<dyn ClockPort>,
    surface_id: SurfaceId,
    interval: Duration,
    last: Option<SurfaceState>,
}

impl StatePoll {
    /// `None` when the file could not be read; the poll simply tries again.
    async fn current(&self) -> Option<SurfaceState> {
        match self.file.load().await {
            Ok(file) => Some(
                file.surfaces
                    .iter()
                    .find(|record| record.id == self.surface_id)
                    .map_or(SurfaceState::Ended, |record| {
                        record.state_at(self.clock.now())
                    }),
            ),
            Err(err) => {
                warn!(surface_id = %self.surface_id, error = %err, "surface state unavailable");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use pt_core::{PinKind, PIN_ACTIVE_LIFETIME_MS};
    use std::sync::atomic::{AtomicI64, Ordering};
    use tempfile::TempDir;

    use crate::surface::STALE_GRACE_MS;

    struct ManualClock(AtomicI64);

    impl ClockPort for ManualClock {
        fn now_ms(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn attributes(created_at: i64) -> SurfaceAttributes {
        SurfaceAttributes {
            kind: PinKind::Text,
            creation_date: TimestampMs::from_epoch_millis(created_at),
            relevance_score: created_at as f64 / 1000.0,
        }
    }

    fn content(text: &str) -> SurfaceContentState {
        SurfaceContentState {
            content: text.into(),
            metadata_title: None,
            metadata_icon: None,
        }
    }

    fn registry(dir: &TempDir, clock: Arc<ManualClock>, max_live: usize) -> FileSurfaceRegistry {
        FileSurfaceRegistry::new(
            dir.path().join("surfaces.json"),
            Duration::from_millis(10),
            max_live,
            clock,
        )
    }

    async fn next_state(stream: &mut SurfaceStateStream) -> Option<SurfaceState> {
        tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("state change in time")
    }

    #[tokio::test]
    async fn created_surfaces_survive_a_new_registry_instance() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock(AtomicI64::new(1_000)));
        let first = registry(&dir, clock.clone(), 8);

        let older = first.create(attributes(1_000), content("a")).await.unwrap();
        let newer = first.create(attributes(2_000), content("b")).await.unwrap();

        let second = registry(&dir, clock, 8);
        assert_eq!(second.all_live_handles().await.unwrap(), vec![newer, older]);
    }

    #[tokio::test]
    async fn missing_file_means_no_surfaces() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock(AtomicI64::new(0)));

        assert!(registry(&dir, clock, 8)
            .all_live_handles()
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn create_fails_at_live_limit() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock(AtomicI64::new(0)));
        let registry = registry(&dir, clock, 1);

        let first = registry.create(attributes(0), content("a")).await.unwrap();
        let err = registry
            .create(attributes(0), content("b"))
            .await
            .unwrap_err();
        assert!(matches!(err, SurfaceRegistryError::LimitReached(1)));

        registry.end(&first).await.unwrap();
        assert!(registry.create(attributes(0), content("b")).await.is_ok());
    }

    #[tokio::test]
    async fn end_is_idempotent_and_update_needs_live_surface() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock(AtomicI64::new(0)));
        let registry = registry(&dir, clock, 8);
        let surface = registry.create(attributes(0), content("a")).await.unwrap();

        registry.update(&surface, content("edited")).await.unwrap();
        assert_eq!(registry.live_records().await.unwrap()[0].content.content, "edited");

        registry.end(&surface).await.unwrap();
        registry.end(&surface).await.unwrap();
        assert!(matches!(
            registry.update(&surface, content("late")).await,
            Err(SurfaceRegistryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn expired_surfaces_are_not_live() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock(AtomicI64::new(0)));
        let registry = registry(&dir, clock.clone(), 8);
        registry.create(attributes(0), content("a")).await.unwrap();

        clock
            .0
            .store(PIN_ACTIVE_LIFETIME_MS, Ordering::SeqCst);
        assert_eq!(registry.all_live_handles().await.unwrap().len(), 1);

        clock
            .0
            .store(PIN_ACTIVE_LIFETIME_MS + STALE_GRACE_MS, Ordering::SeqCst);
        assert!(registry.all_live_handles().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn dismissal_is_streamed_then_stream_completes() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock(AtomicI64::new(0)));
        let registry = registry(&dir, clock, 8);
        let surface = registry.create(attributes(0), content("a")).await.unwrap();

        let mut states = registry.state_changes(&surface);
        assert_eq!(next_state(&mut states).await, Some(SurfaceState::Active));

        registry.dismiss(&surface).await.unwrap();

        assert_eq!(next_state(&mut states).await, Some(SurfaceState::Dismissed));
        assert_eq!(next_state(&mut states).await, None);
        assert!(registry.all_live_handles().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stream_reports_stale_before_ended() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock(AtomicI64::new(0)));
        let registry = registry(&dir, clock.clone(), 8);
        let surface = registry.create(attributes(0), content("a")).await.unwrap();
        let mut states = registry.state_changes(&surface);
        assert_eq!(next_state(&mut states).await, Some(SurfaceState::Active));

        clock.0.store(PIN_ACTIVE_LIFETIME_MS, Ordering::SeqCst);
        assert_eq!(next_state(&mut states).await, Some(SurfaceState::Stale));

        clock
            .0
            .store(PIN_ACTIVE_LIFETIME_MS + STALE_GRACE_MS, Ordering::SeqCst);
        assert_eq!(next_state(&mut states).await, Some(SurfaceState::Ended));
    }

    #[tokio::test]
    async fn unknown_surface_streams_ended() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock(AtomicI64::new(0)));
        let registry = registry(&dir, clock, 8);

        let mut states = registry.state_changes(&SurfaceId::from("nope"));

        assert_eq!(next_state(&mut states).await, Some(SurfaceState::Ended));
        assert_eq!(next_state(&mut states).await, None);
    }

    #[tokio::test]
    async fn dismissing_unknown_surface_fails() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock(AtomicI64::new(0)));

        let err = registry(&dir, clock, 8)
            .dismiss(&SurfaceId::from("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, SurfaceRegistryError::NotFound(_)));
    }
}
