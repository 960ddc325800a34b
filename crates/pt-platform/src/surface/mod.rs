//! Desktop stand-in for the OS live-surface registry.

mod file_registry;
mod record;

pub use file_registry::FileSurfaceRegistry;
pub use record::{SurfaceRecord, STALE_GRACE_MS};
