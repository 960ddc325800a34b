use async_trait::async_trait;

use crate::share::SharedPin;

/// Hand-off slot written by the share extension.
#[async_trait]
pub trait ShareInboxPort: Send + Sync {
    /// Takes the pending record, if any, and clears the slot so it is handled once.
    async fn read_and_clear(&self) -> anyhow::Result<Option<SharedPin>>;
}
