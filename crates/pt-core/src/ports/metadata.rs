use async_trait::async_trait;

use crate::content::LinkMetadata;

/// Link enrichment service.
///
/// Single attempt, no retries. `None` on any failure of the page fetch; a missing
/// title or icon is reported through the corresponding `LinkMetadata` field.
#[async_trait]
pub trait MetadataFetcherPort: Send + Sync {
    async fn fetch(&self, url: &str) -> Option<LinkMetadata>;
}
