pub mod db;
pub mod metadata;
pub mod share;
pub mod time;

pub use metadata::HttpMetadataFetcher;
pub use share::FileShareInbox;
pub use time::SystemClock;
