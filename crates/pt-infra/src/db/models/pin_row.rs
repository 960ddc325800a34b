use diesel::prelude::*;

use crate::db::schema::t_pin;

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = t_pin)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PinRow {
    pub id: String,
    pub content: String,
    pub kind: String,
    pub creation_date_ms: i64,
    pub show_in_history_at_ms: i64,
    pub metadata_title: Option<String>,
    pub metadata_icon: Option<Vec<u8>>,
    pub surface_handle_id: Option<String>,
}

/// Insert and full-overwrite row. `None` columns are written as NULL on update.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = t_pin)]
#[diesel(treat_none_as_null = true)]
pub struct NewPinRow {
    pub id: String,
    pub content: String,
    pub kind: String,
    pub creation_date_ms: i64,
    pub show_in_history_at_ms: i64,
    pub metadata_title: Option<String>,
    pub metadata_icon: Option<Vec<u8>>,
    pub surface_handle_id: Option<String>,
}
