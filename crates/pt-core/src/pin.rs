//! Pin domain model.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::content::ProcessedContent;
use crate::ids::{PinId, SurfaceId};
use crate::surface::{SurfaceAttributes, SurfaceContentState};
use crate::timestamp::TimestampMs;

/// How long a pin stays on its surface before it moves to history.
pub const PIN_ACTIVE_LIFETIME_MS: i64 = 8 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinKind {
    Text,
    Url,
}

impl PinKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PinKind::Text => "text",
            PinKind::Url => "url",
        }
    }
}

impl std::fmt::Display for PinKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown pin kind: {0}")]
pub struct UnknownPinKind(pub String);

impl FromStr for PinKind {
    type Err = UnknownPinKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(PinKind::Text),
            "url" => Ok(PinKind::Url),
            other => Err(UnknownPinKind(other.to_string())),
        }
    }
}

/// A durable pin record.
///
/// `show_in_history_at` is the single source of the active/historical split:
/// a pin is active iff `show_in_history_at > now`. There is no stored flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pin {
    pub id: PinId,
    pub content: String,
    pub kind: PinKind,
    pub creation_date: TimestampMs,
    pub show_in_history_at: TimestampMs,
    pub metadata_title: Option<String>,
    pub metadata_icon: Option<Vec<u8>>,
    /// Registry handle of the live surface, `None` whenever no surface is believed live.
    pub surface_handle_id: Option<SurfaceId>,
}

impl Pin {
    /// Builds a fresh pin from processed content, active for the full lifetime.
    pub fn new(processed: &ProcessedContent, now: TimestampMs) -> Self {
        Self {
            id: PinId::new(),
            content: processed.original_content.clone(),
            kind: processed.kind,
            creation_date: now,
            show_in_history_at: now.add_millis(PIN_ACTIVE_LIFETIME_MS),
            metadata_title: processed.metadata_title.clone(),
            metadata_icon: processed.metadata_icon.clone(),
            surface_handle_id: None,
        }
    }

    pub fn is_active_at(&self, now: TimestampMs) -> bool {
        self.show_in_history_at > now
    }

    /// Restarts the active window, as done by re-pin and restore.
    pub fn restart_lifetime(&mut self, now: TimestampMs) {
        self.creation_date = now;
        self.show_in_history_at = now.add_millis(PIN_ACTIVE_LIFETIME_MS);
    }

    pub fn apply_metadata(&mut self, processed: &ProcessedContent) {
        self.metadata_title = processed.metadata_title.clone();
        self.metadata_icon = processed.metadata_icon.clone();
    }

    /// Moves the pin to history immediately and drops its surface handle.
    pub fn move_to_history(&mut self, now: TimestampMs) {
        self.show_in_history_at = now;
        self.surface_handle_id = None;
    }

    /// Rebuilds the processing result from stored fields, without re-enrichment.
    pub fn to_processed_content(&self) -> ProcessedContent {
        ProcessedContent {
            original_content: self.content.clone(),
            kind: self.kind,
            metadata_title: self.metadata_title.clone(),
            metadata_icon: self.metadata_icon.clone(),
        }
    }

    pub fn surface_attributes(&self) -> SurfaceAttributes {
        SurfaceAttributes {
            kind: self.kind,
            creation_date: self.creation_date,
            relevance_score: self.creation_date.as_secs_f64(),
        }
    }

    pub fn surface_content_state(&self) -> SurfaceContentState {
        SurfaceContentState {
            content: self.content.clone(),
            metadata_title: self.metadata_title.clone(),
            metadata_icon: self.metadata_icon.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processed(content: &str, kind: PinKind) -> ProcessedContent {
        ProcessedContent {
            original_content: content.to_string(),
            kind,
            metadata_title: None,
            metadata_icon: None,
        }
    }

    #[test]
    fn new_pin_is_active_for_eight_hours() {
        let now = TimestampMs::from_epoch_millis(1_000);
        let pin = Pin::new(&processed("buy milk", PinKind::Text), now);

        assert_eq!(pin.creation_date, now);
        assert_eq!(
            pin.show_in_history_at.as_millis(),
            1_000 + 8 * 60 * 60 * 1000
        );
        assert!(pin.is_active_at(now));
        assert!(!pin.is_active_at(pin.show_in_history_at));
        assert!(pin.surface_handle_id.is_none());
    }

    #[test]
    fn move_to_history_clears_surface_handle() {
        let now = TimestampMs::from_epoch_millis(5_000);
        let mut pin = Pin::new(&processed("note", PinKind::Text), now);
        pin.surface_handle_id = Some(SurfaceId::from("s-1"));

        let later = TimestampMs::from_epoch_millis(6_000);
        pin.move_to_history(later);

        assert_eq!(pin.show_in_history_at, later);
        assert!(pin.surface_handle_id.is_none());
        assert!(!pin.is_active_at(later));
    }

    #[test]
    fn restart_lifetime_keeps_identity() {
        let mut pin = Pin::new(
            &processed("https://example.com", PinKind::Url),
            TimestampMs::from_epoch_millis(0),
        );
        let id = pin.id.clone();

        pin.restart_lifetime(TimestampMs::from_epoch_millis(10_000));

        assert_eq!(pin.id, id);
        assert_eq!(pin.creation_date.as_millis(), 10_000);
        assert_eq!(
            pin.show_in_history_at.as_millis(),
            10_000 + PIN_ACTIVE_LIFETIME_MS
        );
    }

    #[test]
    fn relevance_score_tracks_creation_seconds() {
        let pin = Pin::new(
            &processed("x", PinKind::Text),
            TimestampMs::from_epoch_millis(42_500),
        );
        assert_eq!(pin.surface_attributes().relevance_score, 42.5);
    }

    #[test]
    fn kind_round_trips_through_str() {
        assert_eq!("url".parse::<PinKind>().unwrap(), PinKind::Url);
        assert_eq!(PinKind::Text.as_str(), "text");
        assert!("image".parse::<PinKind>().is_err());
    }
}
