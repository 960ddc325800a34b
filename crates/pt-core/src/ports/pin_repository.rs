use async_trait::async_trait;

use crate::ids::PinId;
use crate::pin::Pin;
use crate::ports::errors::PinRepositoryError;
use crate::timestamp::TimestampMs;

/// Which pins a query selects, evaluated against the given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinFilter {
    /// `show_in_history_at > now`
    ActiveAt(TimestampMs),
    /// `show_in_history_at <= now`
    HistoricalAt(TimestampMs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinSort {
    CreationDateDesc,
    ShowInHistoryAtDesc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinQuery {
    pub filter: PinFilter,
    pub sort: PinSort,
}

impl PinQuery {
    /// Pins that should currently be on a surface, newest first.
    pub fn active(now: TimestampMs) -> Self {
        Self {
            filter: PinFilter::ActiveAt(now),
            sort: PinSort::CreationDateDesc,
        }
    }

    /// Pins in history, most recently archived first.
    pub fn history(now: TimestampMs) -> Self {
        Self {
            filter: PinFilter::HistoricalAt(now),
            sort: PinSort::ShowInHistoryAtDesc,
        }
    }

    pub fn matches(&self, pin: &Pin) -> bool {
        match self.filter {
            PinFilter::ActiveAt(now) => pin.show_in_history_at > now,
            PinFilter::HistoricalAt(now) => pin.show_in_history_at <= now,
        }
    }
}

/// Durable pin store.
#[async_trait]
pub trait PinRepositoryPort: Send + Sync {
    async fn insert(&self, pin: &Pin) -> Result<(), PinRepositoryError>;

    /// Overwrites every mutable field of an existing pin.
    async fn update(&self, pin: &Pin) -> Result<(), PinRepositoryError>;

    async fn delete(&self, pin_id: &PinId) -> Result<(), PinRepositoryError>;

    async fn get(&self, pin_id: &PinId) -> Result<Option<Pin>, PinRepositoryError>;

    async fn query(&self, query: PinQuery) -> Result<Vec<Pin>, PinRepositoryError>;

    /// Permanently removes every pin in history at `now`. Returns the number removed.
    async fn delete_historical(&self, now: TimestampMs) -> Result<usize, PinRepositoryError>;
}
