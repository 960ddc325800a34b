use std::str::FromStr;

use anyhow::Result;
use pt_core::{Pin, PinId, PinKind, SurfaceId, TimestampMs};

use crate::db::models::{NewPinRow, PinRow};
use crate::db::ports::{InsertMapper, RowMapper};

pub struct PinRowMapper;

impl InsertMapper<Pin, NewPinRow> for PinRowMapper {
    fn to_row(&self, domain: &Pin) -> Result<NewPinRow> {
        Ok(NewPinRow {
            id: domain.id.to_string(),
            content: domain.content.clone(),
            kind: domain.kind.as_str().to_string(),
            creation_date_ms: domain.creation_date.as_millis(),
            show_in_history_at_ms: domain.show_in_history_at.as_millis(),
            metadata_title: domain.metadata_title.clone(),
            metadata_icon: domain.metadata_icon.clone(),
            surface_handle_id: domain.surface_handle_id.as_ref().map(|id| id.to_string()),
        })
    }
}

impl RowMapper<PinRow, Pin> for PinRowMapper {
    fn to_domain(&self, row: &PinRow) -> Result<Pin> {
        let kind = PinKind::from_str(&row.kind)
            .map_err(|e| anyhow::anyhow!("invalid pin kind for pin {}: {}", row.id, e))?;

        Ok(Pin {
            id: PinId::from(row.id.clone()),
            content: row.content.clone(),
            kind,
            creation_date: TimestampMs::from_epoch_millis(row.creation_date_ms),
            show_in_history_at: TimestampMs::from_epoch_millis(row.show_in_history_at_ms),
            metadata_title: row.metadata_title.clone(),
            metadata_icon: row.metadata_icon.clone(),
            surface_handle_id: row.surface_handle_id.clone().map(SurfaceId::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_kind_is_rejected() {
        let row = PinRow {
            id: "p".into(),
            content: "x".into(),
            kind: "image".into(),
            creation_date_ms: 0,
            show_in_history_at_ms: 0,
            metadata_title: None,
            metadata_icon: None,
            surface_handle_id: None,
        };

        let err = PinRowMapper.to_domain(&row).unwrap_err();
        assert!(err.to_string().contains("invalid pin kind"));
    }
}
