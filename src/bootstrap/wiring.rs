//! # Dependency Injection
//!
//! The only place that depends on `pt-infra`, `pt-platform` and `pt-app` at once.
//! It assembles; it does not decide. Business rules live in the use cases and
//! config defaults are resolved in `config.rs` before anything is built here.

use std::path::Path;
use std::sync::Arc;

use pt_app::{
    HistoryManager, PinLifecycleDeps, PinLifecycleManager, SurfaceObserverRegistry,
    WatchHistoryNotifier,
};
use pt_core::ports::{ClipboardTextPort, ClockPort, PinRepositoryPort, ShareInboxPort};
use pt_infra::db::executor::DieselSqliteExecutor;
use pt_infra::db::pool::{init_db_pool, DbPool};
use pt_infra::db::repositories::DieselPinRepository;
use pt_infra::{FileShareInbox, HttpMetadataFetcher, SystemClock};
use pt_platform::{ArboardClipboard, FileSurfaceRegistry};
use tokio::task::JoinHandle;

use super::config::ResolvedConfig;

/// Result type for wiring operations
pub type WiringResult<T> = Result<T, WiringError>;

/// Errors during dependency injection
#[derive(Debug, thiserror::Error)]
pub enum WiringError {
    #[error("Database initialization failed: {0}")]
    DatabaseInit(String),

    #[error("Metadata client initialization failed: {0}")]
    MetadataClientInit(String),
}

/// Create database connection pool
///
/// # Errors
///
/// Returns `WiringError::DatabaseInit` if the path is not valid UTF-8, the pool
/// cannot be built or migrations fail.
fn create_db_pool(db_path: &Path) -> WiringResult<DbPool> {
    let db_url = db_path
        .to_str()
        .ok_or_else(|| WiringError::DatabaseInit("Invalid database path".to_string()))?;

    init_db_pool(db_url)
        .map_err(|e| WiringError::DatabaseInit(format!("Failed to initialize DB: {:#}", e)))
}

/// Everything a command needs, wired and ready.
///
/// `registry` and `share_inbox` are kept concrete as well: the CLI dismisses
/// surfaces and writes hand-off records, which no use case does.
pub struct AppRuntime {
    pub manager: PinLifecycleManager,
    pub history: Arc<HistoryManager>,
    pub history_notifier: Arc<WatchHistoryNotifier>,
    pub observers: Arc<SurfaceObserverRegistry>,
    pub registry: Arc<FileSurfaceRegistry>,
    pub share_inbox: Arc<FileShareInbox>,
    pub clipboard: Arc<dyn ClipboardTextPort>,
}

impl AppRuntime {
    /// Keeps the history list in step with the lifecycle manager's change signals.
    pub fn spawn_history_listener(&self) -> JoinHandle<()> {
        let history = self.history.clone();
        let signal = self.history_notifier.subscribe();
        tokio::spawn(async move { history.run_refresh_listener(signal).await })
    }

    pub fn share_inbox_port(&self) -> Arc<dyn ShareInboxPort> {
        self.share_inbox.clone()
    }

    /// Stops every surface observer. Pins and surfaces are left as they are.
    pub fn shutdown(&self) {
        self.observers.shutdown();
    }
}

/// Build the runtime from resolved settings.
///
/// # Errors
///
/// Returns `WiringError` if any infrastructure component fails to initialize.
pub fn wire_dependencies(config: &ResolvedConfig) -> WiringResult<AppRuntime> {
    let db_pool = create_db_pool(&config.database_path)?;
    let repo: Arc<dyn PinRepositoryPort> =
        Arc::new(DieselPinRepository::new(DieselSqliteExecutor::new(db_pool)));

    let clock: Arc<dyn ClockPort> = Arc::new(SystemClock);
    let registry = Arc::new(FileSurfaceRegistry::new(
        config.surface_registry_path.clone(),
        config.surface_poll_interval,
        config.max_live_surfaces,
        clock.clone(),
    ));
    let fetcher = HttpMetadataFetcher::new(
        config.metadata_timeout,
        &config.metadata_user_agent,
        config.metadata_icon_size,
    )
    .map_err(|e| WiringError::MetadataClientInit(format!("{:#}", e)))?;

    let observers = Arc::new(SurfaceObserverRegistry::new());
    let history_notifier = Arc::new(WatchHistoryNotifier::new());

    let manager = PinLifecycleManager::new(PinLifecycleDeps {
        repo: repo.clone(),
        registry: registry.clone(),
        fetcher: Arc::new(fetcher),
        clock: clock.clone(),
        history_notifier: history_notifier.clone(),
        observers: observers.clone(),
    });
    let history = Arc::new(HistoryManager::new(repo, clock, observers.clone()));

    tracing::debug!(
        database = %config.database_path.display(),
        registry = %config.surface_registry_path.display(),
        "runtime wired"
    );

    Ok(AppRuntime {
        manager,
        history,
        history_notifier,
        observers,
        registry,
        share_inbox: Arc::new(FileShareInbox::new(config.share_inbox_path.clone())),
        clipboard: Arc::new(ArboardClipboard),
    })
}
