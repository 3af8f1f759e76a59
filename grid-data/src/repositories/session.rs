use crate::entities::SessionRow;
use r2e_data::DataError;
use r2e_data_sqlx::SqlxErrorExt;
use uuid::Uuid;

#[derive(Clone)]
pub struct SessionRepository {
    pool: sqlx::PgPool,
}

impl SessionRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<SessionRow>, DataError> {
        sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)
    }

    pub async fn insert(&self, row: &SessionRow) -> Result<SessionRow, DataError> {
        sqlx::query_as::<_, SessionRow>(
            "INSERT INTO sessions (id, principal_id, principal_kind, created_at, last_used_at, revoked, expires_at)
             VALUES ($1, $2, $3, now(), now(), false, $4)
             RETURNING *",
        )
        .bind(row.id)
        .bind(row.principal_id)
        .bind(&row.principal_kind)
        .bind(row.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_data_error)
    }

    pub async fn touch(&self, id: Uuid) -> Result<(), DataError> {
        sqlx::query("UPDATE sessions SET last_used_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        Ok(())
    }

    pub async fn revoke(&self, id: Uuid) -> Result<bool, DataError> {
        let result = sqlx::query("UPDATE sessions SET revoked = true WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        Ok(result.rows_affected() > 0)
    }
}
