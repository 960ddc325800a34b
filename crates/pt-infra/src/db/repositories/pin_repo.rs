use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl, SelectableHelper};
use pt_core::ports::{PinFilter, PinQuery, PinRepositoryError, PinRepositoryPort, PinSort};
use pt_core::{Pin, PinId, TimestampMs};

use crate::db::mappers::PinRowMapper;
use crate::db::models::PinRow;
use crate::db::ports::{DbExecutor, InsertMapper, RowMapper};
use crate::db::schema::t_pin;

pub struct DieselPinRepository<E>
where
    E: DbExecutor,
{
    executor: E,
    mapper: PinRowMapper,
}

impl<E> DieselPinRepository<E>
where
    E: DbExecutor,
{
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            mapper: PinRowMapper,
        }
    }
}

fn storage(err: anyhow::Error) -> PinRepositoryError {
    PinRepositoryError::Storage(format!("{err:#}"))
}

#[async_trait::async_trait]
impl<E> PinRepositoryPort for DieselPinRepository<E>
where
    E: DbExecutor,
{
    async fn insert(&self, pin: &Pin) -> Result<(), PinRepositoryError> {
        let row = self.mapper.to_row(pin).map_err(storage)?;
        self.executor
            .run(|conn| {
                diesel::insert_into(t_pin::table)
                    .values(&row)
                    .execute(conn)?;
                Ok(())
            })
            .map_err(storage)
    }

    async fn update(&self, pin: &Pin) -> Result<(), PinRepositoryError> {
        let row = self.mapper.to_row(pin).map_err(storage)?;
        let updated = self
            .executor
            .run(|conn| {
                let updated = diesel::update(t_pin::table.find(&row.id))
                    .set(&row)
                    .execute(conn)?;
                Ok(updated)
            })
            .map_err(storage)?;

        if updated == 0 {
            return Err(PinRepositoryError::NotFound(pin.id.clone()));
        }
        Ok(())
    }

    async fn delete(&self, pin_id: &PinId) -> Result<(), PinRepositoryError> {
        let id = pin_id.to_string();
        self.executor
            .run(|conn| {
                diesel::delete(t_pin::table.find(&id)).execute(conn)?;
                Ok(())
            })
            .map_err(storage)
    }

    async fn get(&self, pin_id: &PinId) -> Result<Option<Pin>, PinRepositoryError> {
        let id = pin_id.to_string();
        let row = self
            .executor
            .run(|conn| {
                let row = t_pin::table
                    .find(&id)
                    .select(PinRow::as_select())
                    .first::<PinRow>(conn)
                    .optional()?;
                Ok(row)
            })
            .map_err(storage)?;

        row.map(|row| self.mapper.to_domain(&row))
            .transpose()
            .map_err(storage)
    }

    async fn query(&self, query: PinQuery) -> Result<Vec<Pin>, PinRepositoryError> {
        let rows = self
            .executor
            .run(|conn| {
                let mut statement = t_pin::table.select(PinRow::as_select()).into_boxed();
                statement = match query.filter {
                    PinFilter::ActiveAt(now) => {
                        statement.filter(t_pin::show_in_history_at_ms.gt(now.as_millis()))
                    }
                    PinFilter::HistoricalAt(now) => {
                        statement.filter(t_pin::show_in_history_at_ms.le(now.as_millis()))
                    }
                };
                statement = match query.sort {
                    PinSort::CreationDateDesc => statement.order(t_pin::creation_date_ms.desc()),
                    PinSort::ShowInHistoryAtDesc => {
                        statement.order(t_pin::show_in_history_at_ms.desc())
                    }
                };
                Ok(statement.load::<PinRow>(conn)?)
            })
            .map_err(storage)?;

        rows.iter()
            .map(|row| self.mapper.to_domain(row))
            .collect::<anyhow::Result<Vec<_>>>()
            .map_err(storage)
    }

    async fn delete_historical(&self, now: TimestampMs) -> Result<usize, PinRepositoryError> {
        self.executor
            .run(|conn| {
                let removed = diesel::delete(
                    t_pin::table.filter(t_pin::show_in_history_at_ms.le(now.as_millis())),
                )
                .execute(conn)?;
                Ok(removed)
            })
            .map_err(storage)
    }
}
