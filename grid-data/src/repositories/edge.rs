use crate::entities::EdgeRow;
use r2e_data::{DataError, Page, Pageable, Repository};
use r2e_data_sqlx::SqlxErrorExt;
use uuid::Uuid;

#[derive(Clone)]
pub struct EdgeRepository {
    pool: sqlx::PgPool,
}

impl EdgeRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }

    pub async fn find_by_from_output_and_to(
        &self,
        from_state: Uuid,
        from_output: &str,
        to_state: Uuid,
    ) -> Result<Option<EdgeRow>, DataError> {
        sqlx::query_as::<_, EdgeRow>(
            "SELECT * FROM edges WHERE from_state = $1 AND from_output = $2 AND to_state = $3",
        )
        .bind(from_state)
        .bind(from_output)
        .bind(to_state)
        .fetch_optional(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_data_error)
    }

    pub async fn find_incoming(&self, to_state: Uuid) -> Result<Vec<EdgeRow>, DataError> {
        sqlx::query_as::<_, EdgeRow>("SELECT * FROM edges WHERE to_state = $1 ORDER BY id")
            .bind(to_state)
            .fetch_all(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)
    }

    pub async fn find_outgoing(&self, from_state: Uuid) -> Result<Vec<EdgeRow>, DataError> {
        sqlx::query_as::<_, EdgeRow>("SELECT * FROM edges WHERE from_state = $1 ORDER BY id")
            .bind(from_state)
            .fetch_all(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)
    }

    pub async fn search_by_output(&self, key: &str) -> Result<Vec<EdgeRow>, DataError> {
        sqlx::query_as::<_, EdgeRow>("SELECT * FROM edges WHERE from_output = $1 ORDER BY id")
            .bind(key)
            .fetch_all(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)
    }

    pub async fn find_all_edges(&self) -> Result<Vec<EdgeRow>, DataError> {
        sqlx::query_as::<_, EdgeRow>("SELECT * FROM edges ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)
    }

    /// All `(from_state, to_state)` pairs, for cycle detection and topological
    /// traversal. Returned without the rest of the row to keep the graph walk
    /// cheap on wide edge tables.
    pub async fn all_adjacency(&self) -> Result<Vec<(Uuid, Uuid)>, DataError> {
        sqlx::query_as::<_, (Uuid, Uuid)>("SELECT from_state, to_state FROM edges")
            .fetch_all(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)
    }

    pub async fn insert(&self, row: &EdgeRow) -> Result<EdgeRow, DataError> {
        sqlx::query_as::<_, EdgeRow>(
            "INSERT INTO edges (from_state, from_output, to_state, to_input_name, status,
                                in_digest, out_digest, last_in_at, last_out_at, mock_value, validation_status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING *",
        )
        .bind(row.from_state)
        .bind(&row.from_output)
        .bind(row.to_state)
        .bind(&row.to_input_name)
        .bind(&row.status)
        .bind(&row.in_digest)
        .bind(&row.out_digest)
        .bind(row.last_in_at)
        .bind(row.last_out_at)
        .bind(&row.mock_value)
        .bind(&row.validation_status)
        .fetch_one(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_data_error)
    }

    /// Persist a changed status/digest pair for an edge — used by the
    /// Edge-Update Job, which only writes when something actually changed.
    pub async fn update_status(
        &self,
        id: i64,
        status: &str,
        in_digest: &str,
        out_digest: &str,
        last_in_at: Option<chrono::DateTime<chrono::Utc>>,
        last_out_at: Option<chrono::DateTime<chrono::Utc>>,
        mock_value: Option<&serde_json::Value>,
    ) -> Result<(), DataError> {
        sqlx::query(
            "UPDATE edges SET status = $2, in_digest = $3, out_digest = $4,
             last_in_at = COALESCE($5, last_in_at), last_out_at = COALESCE($6, last_out_at),
             mock_value = $7
             WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .bind(in_digest)
        .bind(out_digest)
        .bind(last_in_at)
        .bind(last_out_at)
        .bind(mock_value)
        .execute(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_data_error)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Repository<EdgeRow, i64> for EdgeRepository {
    async fn find_by_id(&self, id: &i64) -> Result<Option<EdgeRow>, DataError> {
        sqlx::query_as::<_, EdgeRow>("SELECT * FROM edges WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)
    }

    async fn find_all(&self) -> Result<Vec<EdgeRow>, DataError> {
        self.find_all_edges().await
    }

    async fn find_all_paged(&self, pageable: &Pageable) -> Result<Page<EdgeRow>, DataError> {
        let total: i64 = sqlx::query_scalar("SELECT count(*) FROM edges")
            .fetch_one(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        let rows = sqlx::query_as::<_, EdgeRow>("SELECT * FROM edges ORDER BY id LIMIT $1 OFFSET $2")
            .bind(pageable.size as i64)
            .bind(pageable.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        Ok(Page::new(rows, pageable, total.max(0) as u64))
    }

    async fn save(&self, entity: &EdgeRow) -> Result<EdgeRow, DataError> {
        sqlx::query_as::<_, EdgeRow>(
            "UPDATE edges SET status = $2, in_digest = $3, out_digest = $4, last_in_at = $5,
             last_out_at = $6, mock_value = $7, validation_status = $8
             WHERE id = $1 RETURNING *",
        )
        .bind(entity.id)
        .bind(&entity.status)
        .bind(&entity.in_digest)
        .bind(&entity.out_digest)
        .bind(entity.last_in_at)
        .bind(entity.last_out_at)
        .bind(&entity.mock_value)
        .bind(&entity.validation_status)
        .fetch_one(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_data_error)
    }

    async fn delete(&self, id: &i64) -> Result<bool, DataError> {
        let result = sqlx::query("DELETE FROM edges WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<u64, DataError> {
        let total: i64 = sqlx::query_scalar("SELECT count(*) FROM edges")
            .fetch_one(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        Ok(total.max(0) as u64)
    }
}
