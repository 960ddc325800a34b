//! Link enrichment: page title and icon for URL pins.

mod html;
mod http_fetcher;
mod icon;

pub use html::{parse_page, PageMetadata};
pub use http_fetcher::HttpMetadataFetcher;
pub use icon::normalize_icon;
