//! Postit application orchestration layer
//!
//! This crate contains the pin lifecycle use cases. It only depends on `pt-core`
//! ports; concrete stores, registries and fetchers are injected by the shell.
//!
//! ```text
//! [entry points: manual / share link / share inbox / clipboard]
//!         ↓
//! ContentProcessor (classify + enrich)
//!         ↓
//! PinLifecycleManager (add / re-pin / remove / restore / reconcile)
//!         ↓                        ↘
//! SurfaceObserverRegistry          HistoryNotifier → HistoryManager
//! ```

pub mod content_processor;
pub mod copy_pin;
pub mod entry_points;
pub mod history;
pub mod pin_lifecycle;
pub mod shared_processing;
pub mod surface_observers;

pub use content_processor::ContentProcessor;
pub use copy_pin::CopyPinToClipboard;
pub use entry_points::{EntryOutcome, PinFromClipboard, PinFromShareInbox, PinFromShareLink};
pub use history::{HistoryManager, WatchHistoryNotifier};
pub use pin_lifecycle::{PinLifecycleDeps, PinLifecycleManager, ReconciliationReport};
pub use shared_processing::{SharedPinProcessingState, SubmissionGuard, SubmissionSlot};
pub use surface_observers::SurfaceObserverRegistry;
