pub mod config;
pub mod tracing;
pub mod wiring;

pub use config::{load_config, load_resolved, resolve_config, ResolvedConfig};
pub use wiring::{wire_dependencies, AppRuntime, WiringError};
