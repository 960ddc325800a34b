//! # pt-core
//!
//! Core domain models and ports for Postit.
//!
//! This crate contains pure business logic without any infrastructure dependencies.
//! Everything that talks to the outside world (the pin store, the surface registry,
//! the metadata fetcher) is reached through a port trait in [`ports`].

pub mod app_dirs;
pub mod config;
pub mod content;
pub mod ids;
pub mod pin;
pub mod ports;
pub mod share;
pub mod surface;
pub mod timestamp;

// Re-export commonly used types at the crate root
pub use config::AppConfig;
pub use content::{ContentError, ContentErrorCode, LinkMetadata, ProcessedContent};
pub use ids::{PinId, SurfaceId};
pub use pin::{Pin, PinKind, PIN_ACTIVE_LIFETIME_MS};
pub use share::SharedPin;
pub use surface::{SurfaceAttributes, SurfaceContentState, SurfaceState};
pub use timestamp::TimestampMs;
