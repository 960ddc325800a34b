//! Data exchanged with the ephemeral surface registry.

use serde::{Deserialize, Serialize};

use crate::content::ProcessedContent;
use crate::pin::PinKind;
use crate::timestamp::TimestampMs;

/// Static attributes fixed when a surface is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceAttributes {
    pub kind: PinKind,
    pub creation_date: TimestampMs,
    /// Higher ranks first; newer pins get higher scores.
    pub relevance_score: f64,
}

/// Dynamic state rendered on a surface; may be replaced with `update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceContentState {
    pub content: String,
    pub metadata_title: Option<String>,
    pub metadata_icon: Option<Vec<u8>>,
}

impl From<&ProcessedContent> for SurfaceContentState {
    fn from(processed: &ProcessedContent) -> Self {
        Self {
            content: processed.original_content.clone(),
            metadata_title: processed.metadata_title.clone(),
            metadata_icon: processed.metadata_icon.clone(),
        }
    }
}

/// Lifecycle state reported by the registry for one surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceState {
    Active,
    Stale,
    Ended,
    Dismissed,
}

impl SurfaceState {
    /// `Ended` and `Dismissed` mean the surface is gone for good.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SurfaceState::Ended | SurfaceState::Dismissed)
    }
}
