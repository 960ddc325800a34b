//! In-memory port implementations shared by the pt-app integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use pt_app::{PinLifecycleDeps, PinLifecycleManager, SurfaceObserverRegistry};
use pt_core::ports::{
    ClipboardTextPort, ClockPort, HistoryNotifierPort, MetadataFetcherPort, PinQuery, PinRepositoryError,
    PinRepositoryPort, PinSort, SurfaceRegistryError, SurfaceRegistryPort, SurfaceStateStream,
};
use pt_core::{
    LinkMetadata, Pin, PinId, SurfaceAttributes, SurfaceContentState, SurfaceId, SurfaceState,
    TimestampMs,
};
use tokio::sync::{watch, Notify};

pub const T0: i64 = 1_700_000_000_000;

static TRACE_INIT: Once = Once::new();

/// Routes `RUST_LOG`-filtered tracing output through the test harness.
pub fn init_tracing() {
    TRACE_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub struct TestClock {
    now: AtomicI64,
}

impl TestClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl ClockPort for TestClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct MemoryPinRepo {
    pins: Mutex<HashMap<PinId, Pin>>,
    pub fail_insert: AtomicBool,
    pub fail_query: AtomicBool,
}

impl MemoryPinRepo {
    pub fn stored(&self, pin_id: &PinId) -> Option<Pin> {
        self.pins.lock().unwrap().get(pin_id).cloned()
    }

    pub fn all(&self) -> Vec<Pin> {
        self.pins.lock().unwrap().values().cloned().collect()
    }

    pub fn seed(&self, pin: Pin) {
        self.pins.lock().unwrap().insert(pin.id.clone(), pin);
    }
}

#[async_trait]
impl PinRepositoryPort for MemoryPinRepo {
    async fn insert(&self, pin: &Pin) -> Result<(), PinRepositoryError> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(PinRepositoryError::Storage("disk full".into()));
        }
        self.pins.lock().unwrap().insert(pin.id.clone(), pin.clone());
        Ok(())
    }

    async fn update(&self, pin: &Pin) -> Result<(), PinRepositoryError> {
        let mut pins = self.pins.lock().unwrap();
        match pins.get_mut(&pin.id) {
            Some(stored) => {
                *stored = pin.clone();
                Ok(())
            }
            None => Err(PinRepositoryError::NotFound(pin.id.clone())),
        }
    }

    async fn delete(&self, pin_id: &PinId) -> Result<(), PinRepositoryError> {
        self.pins.lock().unwrap().remove(pin_id);
        Ok(())
    }

    async fn get(&self, pin_id: &PinId) -> Result<Option<Pin>, PinRepositoryError> {
        Ok(self.stored(pin_id))
    }

    async fn query(&self, query: PinQuery) -> Result<Vec<Pin>, PinRepositoryError> {
        if self.fail_query.load(Ordering::SeqCst) {
            return Err(PinRepositoryError::Storage("locked".into()));
        }
        let mut pins: Vec<Pin> = self
            .pins
            .lock()
            .unwrap()
            .values()
            .filter(|pin| query.matches(pin))
            .cloned()
            .collect();
        match query.sort {
            PinSort::CreationDateDesc => pins.sort_by(|a, b| b.creation_date.cmp(&a.creation_date)),
            PinSort::ShowInHistoryAtDesc => {
                pins.sort_by(|a, b| b.show_in_history_at.cmp(&a.show_in_history_at))
            }
        }
        Ok(pins)
    }

    async fn delete_historical(&self, now: TimestampMs) -> Result<usize, PinRepositoryError> {
        let mut pins = self.pins.lock().unwrap();
        let before = pins.len();
        pins.retain(|_, pin| pin.is_active_at(now));
        Ok(before - pins.len())
    }
}

/// Registry whose surfaces are driven by the test through `emit`.
#[derive(Default)]
pub struct FakeSurfaceRegistry {
    surfaces: Mutex<HashMap<SurfaceId, watch::Sender<SurfaceState>>>,
    created: Mutex<Vec<(SurfaceId, SurfaceContentState)>>,
    ended: Mutex<Vec<SurfaceId>>,
    next_id: AtomicUsize,
    create_gate: Mutex<Option<Arc<Notify>>>,
    waiting_creates: AtomicUsize,
    pub fail_create: AtomicBool,
    pub fail_enumerate: AtomicBool,
}

impl FakeSurfaceRegistry {
    pub fn emit(&self, surface_id: &SurfaceId, state: SurfaceState) {
        if let Some(tx) = self.surfaces.lock().unwrap().get(surface_id) {
            tx.send_replace(state);
        }
    }

    /// Drops the sender so the state stream completes without a terminal state.
    pub fn vanish(&self, surface_id: &SurfaceId) {
        self.surfaces.lock().unwrap().remove(surface_id);
    }

    /// Registers a surface that survived from an earlier run.
    pub fn adopt(&self, surface_id: &SurfaceId) {
        let (tx, _) = watch::channel(SurfaceState::Active);
        self.surfaces.lock().unwrap().insert(surface_id.clone(), tx);
    }

    pub fn is_live(&self, surface_id: &SurfaceId) -> bool {
        self.surfaces.lock().unwrap().contains_key(surface_id)
    }

    pub fn live_count(&self) -> usize {
        self.surfaces.lock().unwrap().len()
    }

    pub fn ended(&self) -> Vec<SurfaceId> {
        self.ended.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<(SurfaceId, SurfaceContentState)> {
        self.created.lock().unwrap().clone()
    }

    /// Makes every `create` wait until [`Self::release_creates`].
    pub fn hold_creates(&self) {
        *self.create_gate.lock().unwrap() = Some(Arc::new(Notify::new()));
    }

    /// Lets waiting creates finish; later creates no longer wait.
    pub fn release_creates(&self) {
        if let Some(gate) = self.create_gate.lock().unwrap().take() {
            gate.notify_waiters();
        }
    }

    /// Number of `create` calls currently held.
    pub fn waiting_creates(&self) -> usize {
        self.waiting_creates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SurfaceRegistryPort for FakeSurfaceRegistry {
    async fn create(
        &self,
        _attributes: SurfaceAttributes,
        state: SurfaceContentState,
    ) -> Result<SurfaceId, SurfaceRegistryError> {
        let gate = self.create_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            let released = gate.notified();
            self.waiting_creates.fetch_add(1, Ordering::SeqCst);
            released.await;
            self.waiting_creates.fetch_sub(1, Ordering::SeqCst);
        }
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(SurfaceRegistryError::NotAuthorized);
        }
        let id = SurfaceId::from(format!(
            "surface-{}",
            self.next_id.fetch_add(1, Ordering::SeqCst)
        ));
        let (tx, _) = watch::channel(SurfaceState::Active);
        self.surfaces.lock().unwrap().insert(id.clone(), tx);
        self.created.lock().unwrap().push((id.clone(), state));
        Ok(id)
    }

    async fn update(
        &self,
        surface_id: &SurfaceId,
        _state: SurfaceContentState,
    ) -> Result<(), SurfaceRegistryError> {
        if self.is_live(surface_id) {
            Ok(())
        } else {
            Err(SurfaceRegistryError::NotFound(surface_id.clone()))
        }
    }

    async fn end(&self, surface_id: &SurfaceId) -> Result<(), SurfaceRegistryError> {
        if let Some(tx) = self.surfaces.lock().unwrap().remove(surface_id) {
            tx.send_replace(SurfaceState::Ended);
        }
        self.ended.lock().unwrap().push(surface_id.clone());
        Ok(())
    }

    async fn all_live_handles(&self) -> Result<Vec<SurfaceId>, SurfaceRegistryError> {
        if self.fail_enumerate.load(Ordering::SeqCst) {
            return Err(SurfaceRegistryError::Backend("registry offline".into()));
        }
        Ok(self.surfaces.lock().unwrap().keys().cloned().collect())
    }

    fn state_changes(&self, surface_id: &SurfaceId) -> SurfaceStateStream {
        let Some(rx) = self
            .surfaces
            .lock()
            .unwrap()
            .get(surface_id)
            .map(|tx| tx.subscribe())
        else {
            return Box::pin(stream::iter([SurfaceState::Ended]));
        };

        Box::pin(stream::unfold(rx, |mut rx| async move {
            rx.changed().await.ok()?;
            let state = *rx.borrow_and_update();
            Some((state, rx))
        }))
    }
}

#[derive(Default)]
pub struct CountingNotifier {
    count: AtomicUsize,
}

impl CountingNotifier {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl HistoryNotifierPort for CountingNotifier {
    fn notify_history_changed(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Returns a fixed title for every link. Can be held open to simulate a slow fetch.
#[derive(Default)]
pub struct StubFetcher {
    pub title: Option<String>,
    pub hold: Option<Arc<Notify>>,
}

#[async_trait]
impl MetadataFetcherPort for StubFetcher {
    async fn fetch(&self, _url: &str) -> Option<LinkMetadata> {
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
        self.title.as_ref().map(|title| LinkMetadata {
            title: Some(title.clone()),
            icon: None,
        })
    }
}

/// Clipboard held in memory; starts with the given text.
#[derive(Default)]
pub struct MemoryClipboard {
    text: Mutex<Option<String>>,
    pub fail_write: AtomicBool,
}

impl MemoryClipboard {
    pub fn holding(text: Option<&str>) -> Self {
        Self {
            text: Mutex::new(text.map(str::to_owned)),
            fail_write: AtomicBool::new(false),
        }
    }

    pub fn text(&self) -> Option<String> {
        self.text.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClipboardTextPort for MemoryClipboard {
    async fn read_text(&self) -> anyhow::Result<Option<String>> {
        Ok(self.text())
    }

    async fn write_text(&self, text: &str) -> anyhow::Result<()> {
        if self.fail_write.load(Ordering::SeqCst) {
            anyhow::bail!("clipboard locked");
        }
        *self.text.lock().unwrap() = Some(text.to_owned());
        Ok(())
    }
}

pub struct Harness {
    pub manager: PinLifecycleManager,
    pub repo: Arc<MemoryPinRepo>,
    pub registry: Arc<FakeSurfaceRegistry>,
    pub clock: Arc<TestClock>,
    pub notifier: Arc<CountingNotifier>,
    pub observers: Arc<SurfaceObserverRegistry>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_fetcher(StubFetcher::default())
    }

    pub fn with_fetcher(fetcher: StubFetcher) -> Self {
        init_tracing();
        Self::assemble(
            Arc::new(MemoryPinRepo::default()),
            Arc::new(FakeSurfaceRegistry::default()),
            Arc::new(TestClock::new(T0)),
            fetcher,
        )
    }

    /// A second app process: same storage, registry and clock, its own manager,
    /// observers and notifier.
    pub fn peer(&self) -> Self {
        Self::assemble(
            self.repo.clone(),
            self.registry.clone(),
            self.clock.clone(),
            StubFetcher::default(),
        )
    }

    fn assemble(
        repo: Arc<MemoryPinRepo>,
        registry: Arc<FakeSurfaceRegistry>,
        clock: Arc<TestClock>,
        fetcher: StubFetcher,
    ) -> Self {
        let notifier = Arc::new(CountingNotifier::default());
        let observers = Arc::new(SurfaceObserverRegistry::new());
        let manager = PinLifecycleManager::new(PinLifecycleDeps {
            repo: repo.clone(),
            registry: registry.clone(),
            fetcher: Arc::new(fetcher),
            clock: clock.clone(),
            history_notifier: notifier.clone(),
            observers: observers.clone(),
        });
        Self {
            manager,
            repo,
            registry,
            clock,
            notifier,
            observers,
        }
    }
}

/// Yields until `condition` holds, failing the test after a generous bound.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    let wait = async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("condition not reached in time");
}
