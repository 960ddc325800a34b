use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::ids::SurfaceId;
use crate::ports::errors::SurfaceRegistryError;
use crate::surface::{SurfaceAttributes, SurfaceContentState, SurfaceState};

pub type SurfaceStateStream = BoxStream<'static, SurfaceState>;

/// Externally managed registry of live ephemeral surfaces.
///
/// The registry may end or dismiss surfaces on its own at any time, including
/// while the app is not running. Callers must treat it as the authority on
/// whether a surface is still showing.
#[async_trait]
pub trait SurfaceRegistryPort: Send + Sync {
    async fn create(
        &self,
        attributes: SurfaceAttributes,
        state: SurfaceContentState,
    ) -> Result<SurfaceId, SurfaceRegistryError>;

    async fn update(
        &self,
        surface_id: &SurfaceId,
        state: SurfaceContentState,
    ) -> Result<(), SurfaceRegistryError>;

    /// Ends the surface and waits until the registry confirms it is gone.
    async fn end(&self, surface_id: &SurfaceId) -> Result<(), SurfaceRegistryError>;

    async fn all_live_handles(&self) -> Result<Vec<SurfaceId>, SurfaceRegistryError>;

    /// Stream of state transitions for one surface.
    ///
    /// Completes once the surface reaches a terminal state or disappears.
    fn state_changes(&self, surface_id: &SurfaceId) -> SurfaceStateStream;
}
