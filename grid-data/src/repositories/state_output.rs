use crate::entities::StateOutputRow;
use r2e_data::DataError;
use r2e_data_sqlx::SqlxErrorExt;
use uuid::Uuid;

/// Repository for the `state_outputs` cache table.
///
/// The mutating helpers take a generic `sqlx::PgExecutor` so the caller (the
/// State Service's `UpdateStateContent` transaction) can run them against a
/// `&mut Transaction<'_, Postgres>` — see `r2e_data_sqlx::Tx` — for the
/// content-replace + stale-row-delete + output-upsert steps to commit or roll
/// back as one unit.
#[derive(Clone)]
pub struct StateOutputRepository {
    pool: sqlx::PgPool,
}

impl StateOutputRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_state(&self, state_guid: Uuid) -> Result<Vec<StateOutputRow>, DataError> {
        sqlx::query_as::<_, StateOutputRow>(
            "SELECT * FROM state_outputs WHERE state_guid = $1 ORDER BY output_key",
        )
        .bind(state_guid)
        .fetch_all(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_data_error)
    }

    pub async fn find_one(
        &self,
        state_guid: Uuid,
        output_key: &str,
    ) -> Result<Option<StateOutputRow>, DataError> {
        sqlx::query_as::<_, StateOutputRow>(
            "SELECT * FROM state_outputs WHERE state_guid = $1 AND output_key = $2",
        )
        .bind(state_guid)
        .bind(output_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_data_error)
    }

    /// Delete output rows belonging to a prior serial — step 4.b of
    /// `UpdateStateContent`.
    pub async fn delete_stale<'e, E>(
        executor: E,
        state_guid: Uuid,
        current_serial: i64,
    ) -> Result<(), DataError>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query("DELETE FROM state_outputs WHERE state_guid = $1 AND state_serial <> $2")
            .bind(state_guid)
            .bind(current_serial)
            .execute(executor)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        Ok(())
    }

    /// Upsert one output row — step 4.c of `UpdateStateContent`.
    pub async fn upsert<'e, E>(executor: E, row: &StateOutputRow) -> Result<(), DataError>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query(
            "INSERT INTO state_outputs (state_guid, output_key, sensitive, state_serial, value_digest, validation_status)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (state_guid, output_key)
             DO UPDATE SET sensitive = excluded.sensitive, state_serial = excluded.state_serial,
                           value_digest = excluded.value_digest, validation_status = excluded.validation_status",
        )
        .bind(row.state_guid)
        .bind(&row.output_key)
        .bind(row.sensitive)
        .bind(row.state_serial)
        .bind(&row.value_digest)
        .bind(&row.validation_status)
        .execute(executor)
        .await
        .map_err(SqlxErrorExt::into_data_error)?;
        Ok(())
    }
}
