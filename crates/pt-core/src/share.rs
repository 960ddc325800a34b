//! Share hand-off formats.
//!
//! The share extension reaches the app two ways: a deep link carrying the content in a
//! query parameter, or a JSON record dropped into a shared inbox. Both decode to a
//! plain string that goes through the regular processing pipeline.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::pin::PinKind;

pub const SHARE_LINK_SCHEME: &str = "postit";
pub const SHARE_LINK_HOST: &str = "share-sheet";
pub const SHARE_CONTENT_QUERY_ITEM: &str = "content";

/// Record written by the share extension into the hand-off inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedPin {
    pub content: String,
    #[serde(rename = "type")]
    pub kind: PinKind,
}

/// Extracts the shared content from `postit://share-sheet?content=...`.
///
/// Returns `None` for any other scheme or host, or when the query item is missing.
pub fn parse_share_link(link: &str) -> Option<String> {
    let url = Url::parse(link.trim()).ok()?;
    if url.scheme() != SHARE_LINK_SCHEME || url.host_str() != Some(SHARE_LINK_HOST) {
        tracing::debug!(scheme = url.scheme(), "ignoring link that is not a share link");
        return None;
    }

    url.query_pairs()
        .find(|(name, _)| name == SHARE_CONTENT_QUERY_ITEM)
        .map(|(_, value)| value.into_owned())
}

/// Builds the deep link the share extension opens to hand content over.
pub fn build_share_link(content: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(content.as_bytes()).collect();
    format!("{SHARE_LINK_SCHEME}://{SHARE_LINK_HOST}?{SHARE_CONTENT_QUERY_ITEM}={encoded}")
}
