use thiserror::Error;

use crate::ids::{PinId, SurfaceId};

#[derive(Debug, Error)]
pub enum PinRepositoryError {
    #[error("pin not found: {0}")]
    NotFound(PinId),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Failures reported by the surface registry.
///
/// The lifecycle manager does not distinguish between these; any of them means
/// "could not start" to the user.
#[derive(Debug, Error)]
pub enum SurfaceRegistryError {
    #[error("surfaces are not authorized")]
    NotAuthorized,

    #[error("live surface limit reached ({0})")]
    LimitReached(usize),

    #[error("surface not found: {0}")]
    NotFound(SurfaceId),

    #[error("surface registry error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum AppDirsError {
    #[error("system data-local directory is unavailable")]
    DataLocalDirUnavailable,
}
