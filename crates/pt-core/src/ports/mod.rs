//! Port interfaces for the application layer
//!
//! Ports define the contract between the application logic (use cases)
//! and infrastructure implementations. This follows Hexagonal Architecture
//! principles, allowing the pin lifecycle to remain independent of the store,
//! the surface registry and the network.
//!
//! ## Port Placement Guidelines
//!
//! A port belongs here when it represents a business capability, is used by more
//! than one use case, and is implemented by the infrastructure or platform layer.

pub mod app_dirs;
pub mod clipboard_text;
mod clock;
pub mod errors;
pub mod history_notifier;
pub mod metadata;
pub mod pin_repository;
pub mod share_inbox;
pub mod surface_registry;

pub use app_dirs::AppDirsPort;
pub use clipboard_text::ClipboardTextPort;
pub use clock::*;
pub use errors::{AppDirsError, PinRepositoryError, SurfaceRegistryError};
pub use history_notifier::HistoryNotifierPort;
pub use metadata::MetadataFetcherPort;
pub use pin_repository::{PinFilter, PinQuery, PinRepositoryPort, PinSort};
pub use share_inbox::ShareInboxPort;
pub use surface_registry::{SurfaceRegistryPort, SurfaceStateStream};
