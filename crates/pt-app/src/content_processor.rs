use std::sync::Arc;

use pt_core::content::classify;
use pt_core::ports::MetadataFetcherPort;
use pt_core::{ContentError, PinKind, ProcessedContent};
use tracing::debug;

/// Classifies submitted content and enriches links with metadata.
pub struct ContentProcessor {
    fetcher: Arc<dyn MetadataFetcherPort>,
}

impl ContentProcessor {
    pub fn new(fetcher: Arc<dyn MetadataFetcherPort>) -> Self {
        Self { fetcher }
    }

    /// Enrichment never fails the submission: a link whose metadata cannot be
    /// fetched is still pinned, just without title and icon.
    #[tracing::instrument(name = "usecase.content_processor.process", skip_all)]
    pub async fn process(&self, content: &str) -> Result<ProcessedContent, ContentError> {
        let (content, kind) = classify(content)?;
        let processed = ProcessedContent::plain(content, kind);

        match kind {
            PinKind::Text => Ok(processed),
            PinKind::Url => {
                let metadata = self.fetcher.fetch(&processed.original_content).await;
                if metadata.is_none() {
                    debug!("no metadata for link; pinning without it");
                }
                Ok(processed.with_metadata(metadata))
            }
        }
    }
}
