//! Content classification and the processing result handed to the lifecycle manager.

use serde::{Deserialize, Serialize};

use crate::pin::PinKind;

/// Case-insensitive prefix that marks content as a link.
pub const URL_SCHEME_TOKEN: &str = "http";

/// Result of running submitted content through classification and enrichment.
///
/// Ephemeral: produced once per submission and consumed by `add_pin`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedContent {
    pub original_content: String,
    pub kind: PinKind,
    pub metadata_title: Option<String>,
    pub metadata_icon: Option<Vec<u8>>,
}

impl ProcessedContent {
    pub fn plain(content: impl Into<String>, kind: PinKind) -> Self {
        Self {
            original_content: content.into(),
            kind,
            metadata_title: None,
            metadata_icon: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Option<LinkMetadata>) -> Self {
        if let Some(metadata) = metadata {
            self.metadata_title = metadata.title;
            self.metadata_icon = metadata.icon;
        }
        self
    }
}

/// Enrichment data for a link. Either field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkMetadata {
    pub title: Option<String>,
    pub icon: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentErrorCode {
    EmptyContent,
    SurfaceStartFailed,
    Storage,
    Unknown,
}

impl ContentErrorCode {
    pub fn default_message(&self) -> &'static str {
        match self {
            ContentErrorCode::EmptyContent => "nothing to pin",
            ContentErrorCode::SurfaceStartFailed => "could not start",
            ContentErrorCode::Storage => "could not save the pin",
            ContentErrorCode::Unknown => "something went wrong",
        }
    }
}

/// User-facing failure of a submission.
///
/// Dispatch and equality use `code`; `message` only carries display detail.
#[derive(Debug, Clone, Eq, Serialize, Deserialize, thiserror::Error)]
pub struct ContentError {
    pub code: ContentErrorCode,
    pub message: Option<String>,
}

impl ContentError {
    pub fn new(code: ContentErrorCode) -> Self {
        Self {
            code,
            message: None,
        }
    }

    pub fn with_message(code: ContentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }

    pub fn empty_content() -> Self {
        Self::new(ContentErrorCode::EmptyContent)
    }

    pub fn surface_start_failed() -> Self {
        Self::new(ContentErrorCode::SurfaceStartFailed)
    }

    pub fn display_message(&self) -> &str {
        self.message
            .as_deref()
            .unwrap_or_else(|| self.code.default_message())
    }
}

impl std::fmt::Display for ContentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_message())
    }
}

impl PartialEq for ContentError {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

/// Classifies raw submitted text.
///
/// Content is a link iff it starts with [`URL_SCHEME_TOKEN`] (ignoring case). Nothing
/// else is checked; a link that turns out malformed just gets no metadata. The only
/// failure is input that is empty after trimming.
pub fn classify(raw: &str) -> Result<(String, PinKind), ContentError> {
    let content = raw.trim();
    if content.is_empty() {
        return Err(ContentError::empty_content());
    }

    let is_link = content
        .get(..URL_SCHEME_TOKEN.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(URL_SCHEME_TOKEN));

    let kind = if is_link {
        PinKind::Url
    } else {
        PinKind::Text
    };

    Ok((content.to_string(), kind))
}
