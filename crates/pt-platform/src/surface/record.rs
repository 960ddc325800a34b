use pt_core::{
    PinKind, SurfaceAttributes, SurfaceContentState, SurfaceId, SurfaceState, TimestampMs,
    PIN_ACTIVE_LIFETIME_MS,
};
use serde::{Deserialize, Serialize};

/// How long a surface stays on screen, marked stale, after its stale date.
pub const STALE_GRACE_MS: i64 = 15 * 60 * 1000;

/// One surface entry of the registry state file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceRecord {
    pub id: SurfaceId,
    pub kind: PinKind,
    pub creation_date_ms: i64,
    pub stale_date_ms: i64,
    pub relevance_score: f64,
    pub content: SurfaceContentState,
    #[serde(default)]
    pub dismissed: bool,
}

impl SurfaceRecord {
    pub fn new(id: SurfaceId, attributes: SurfaceAttributes, content: SurfaceContentState) -> Self {
        let creation_date_ms = attributes.creation_date.as_millis();
        Self {
            id,
            kind: attributes.kind,
            creation_date_ms,
            stale_date_ms: creation_date_ms.saturating_add(PIN_ACTIVE_LIFETIME_MS),
            relevance_score: attributes.relevance_score,
            content,
            dismissed: false,
        }
    }

    pub fn state_at(&self, now: TimestampMs) -> SurfaceState {
        let now = now.as_millis();
        if self.dismissed {
            SurfaceState::Dismissed
        } else if now >= self.stale_date_ms.saturating_add(STALE_GRACE_MS) {
            SurfaceState::Ended
        } else if now >= self.stale_date_ms {
            SurfaceState::Stale
        } else {
            SurfaceState::Active
        }
    }

    pub fn is_live_at(&self, now: TimestampMs) -> bool {
        !self.state_at(now).is_terminal()
    }
}

/// On-disk layout of the registry state file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct RegistryFile {
    #[serde(default)]
    pub surfaces: Vec<SurfaceRecord>,
}
