use crate::entities::StateRow;
use r2e_data::{DataError, Page, Pageable, Repository};
use r2e_data_sqlx::{SqlxErrorExt, SqlxRepository};
use sqlx::Postgres;
use uuid::Uuid;

/// Repository for the `states` table.
///
/// Domain-specific operations (lock/unlock, the atomic content+outputs
/// transaction) live here as inherent methods alongside the generic
/// [`Repository`] CRUD surface; the content-update transaction itself is
/// owned by `grid-state`, which calls [`StateRepository::pool`] to begin it.
#[derive(Clone)]
pub struct StateRepository {
    inner: SqlxRepository<StateRow, Postgres>,
}

impl StateRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self {
            inner: SqlxRepository::new(pool),
        }
    }

    pub fn pool(&self) -> &sqlx::PgPool {
        self.inner.pool()
    }

    pub async fn find_by_logic_id(&self, logic_id: &str) -> Result<Option<StateRow>, DataError> {
        sqlx::query_as::<_, StateRow>(
            "SELECT * FROM states WHERE logic_id = $1 AND deleted = false",
        )
        .bind(logic_id)
        .fetch_optional(self.pool())
        .await
        .map_err(SqlxErrorExt::into_data_error)
    }

    pub async fn find_by_guids(&self, guids: &[Uuid]) -> Result<Vec<StateRow>, DataError> {
        sqlx::query_as::<_, StateRow>(
            "SELECT * FROM states WHERE guid = ANY($1) AND deleted = false",
        )
        .bind(guids)
        .fetch_all(self.pool())
        .await
        .map_err(SqlxErrorExt::into_data_error)
    }

    pub async fn insert(&self, row: &StateRow) -> Result<StateRow, DataError> {
        sqlx::query_as::<_, StateRow>(
            "INSERT INTO states (guid, logic_id, labels, content, serial, locked, deleted, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, false, now(), now())
             RETURNING *",
        )
        .bind(row.guid)
        .bind(&row.logic_id)
        .bind(&row.labels)
        .bind(&row.content)
        .bind(row.serial)
        .bind(row.locked)
        .fetch_one(self.pool())
        .await
        .map_err(SqlxErrorExt::into_data_error)
    }

    pub async fn set_lock(
        &self,
        guid: Uuid,
        lock_id: &str,
        operation: &str,
        who: &str,
        version: &str,
        path: &str,
        owner_principal_id: Uuid,
    ) -> Result<(), DataError> {
        sqlx::query(
            "UPDATE states SET locked = true, lock_id = $2, lock_operation = $3, lock_who = $4,
             lock_version = $5, lock_created = now(), lock_path = $6, lock_owner_principal_id = $7,
             updated_at = now()
             WHERE guid = $1",
        )
        .bind(guid)
        .bind(lock_id)
        .bind(operation)
        .bind(who)
        .bind(version)
        .bind(path)
        .bind(owner_principal_id)
        .execute(self.pool())
        .await
        .map_err(SqlxErrorExt::into_data_error)?;
        Ok(())
    }

    pub async fn clear_lock(&self, guid: Uuid) -> Result<(), DataError> {
        sqlx::query(
            "UPDATE states SET locked = false, lock_id = NULL, lock_operation = NULL, lock_who = NULL,
             lock_version = NULL, lock_created = NULL, lock_path = NULL, lock_owner_principal_id = NULL,
             updated_at = now()
             WHERE guid = $1",
        )
        .bind(guid)
        .execute(self.pool())
        .await
        .map_err(SqlxErrorExt::into_data_error)?;
        Ok(())
    }

    pub async fn update_labels(&self, guid: Uuid, labels: &serde_json::Value) -> Result<(), DataError> {
        sqlx::query("UPDATE states SET labels = $2, updated_at = now() WHERE guid = $1")
            .bind(guid)
            .bind(labels)
            .execute(self.pool())
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        Ok(())
    }

    pub async fn soft_delete(&self, guid: Uuid) -> Result<(), DataError> {
        sqlx::query("UPDATE states SET deleted = true, updated_at = now() WHERE guid = $1")
            .bind(guid)
            .execute(self.pool())
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Repository<StateRow, Uuid> for StateRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<StateRow>, DataError> {
        sqlx::query_as::<_, StateRow>("SELECT * FROM states WHERE guid = $1 AND deleted = false")
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(SqlxErrorExt::into_data_error)
    }

    async fn find_all(&self) -> Result<Vec<StateRow>, DataError> {
        sqlx::query_as::<_, StateRow>("SELECT * FROM states WHERE deleted = false ORDER BY created_at")
            .fetch_all(self.pool())
            .await
            .map_err(SqlxErrorExt::into_data_error)
    }

    async fn find_all_paged(&self, pageable: &Pageable) -> Result<Page<StateRow>, DataError> {
        let total: i64 = sqlx::query_scalar("SELECT count(*) FROM states WHERE deleted = false")
            .fetch_one(self.pool())
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        let rows = sqlx::query_as::<_, StateRow>(
            "SELECT * FROM states WHERE deleted = false ORDER BY created_at LIMIT $1 OFFSET $2",
        )
        .bind(pageable.size as i64)
        .bind(pageable.offset() as i64)
        .fetch_all(self.pool())
        .await
        .map_err(SqlxErrorExt::into_data_error)?;
        Ok(Page::new(rows, pageable, total.max(0) as u64))
    }

    async fn save(&self, entity: &StateRow) -> Result<StateRow, DataError> {
        sqlx::query_as::<_, StateRow>(
            "UPDATE states SET logic_id = $2, labels = $3, content = $4, serial = $5, updated_at = now()
             WHERE guid = $1 RETURNING *",
        )
        .bind(entity.guid)
        .bind(&entity.logic_id)
        .bind(&entity.labels)
        .bind(&entity.content)
        .bind(entity.serial)
        .fetch_one(self.pool())
        .await
        .map_err(SqlxErrorExt::into_data_error)
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, DataError> {
        let result = sqlx::query("UPDATE states SET deleted = true WHERE guid = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<u64, DataError> {
        let total: i64 = sqlx::query_scalar("SELECT count(*) FROM states WHERE deleted = false")
            .fetch_one(self.pool())
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        Ok(total.max(0) as u64)
    }
}
