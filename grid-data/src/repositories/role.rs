use crate::entities::RoleRow;
use r2e_data::{DataError, Page, Pageable, Repository};
use r2e_data_sqlx::SqlxErrorExt;
use uuid::Uuid;

#[derive(Clone)]
pub struct RoleRepository {
    pool: sqlx::PgPool,
}

impl RoleRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<RoleRow>, DataError> {
        sqlx::query_as::<_, RoleRow>("SELECT * FROM roles WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)
    }

    pub async fn find_by_names(&self, names: &[String]) -> Result<Vec<RoleRow>, DataError> {
        sqlx::query_as::<_, RoleRow>("SELECT * FROM roles WHERE name = ANY($1)")
            .bind(names)
            .fetch_all(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)
    }

    pub async fn insert(&self, row: &RoleRow) -> Result<RoleRow, DataError> {
        sqlx::query_as::<_, RoleRow>(
            "INSERT INTO roles (id, name, description, scope_expr, create_constraints, immutable_keys, actions, version)
             VALUES ($1, $2, $3, $4, $5, $6, $7, 1)
             RETURNING *",
        )
        .bind(row.id)
        .bind(&row.name)
        .bind(&row.description)
        .bind(&row.scope_expr)
        .bind(&row.create_constraints)
        .bind(&row.immutable_keys)
        .bind(&row.actions)
        .fetch_one(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_data_error)
    }

    /// Optimistic-concurrency update: only applies when `expected_version`
    /// still matches the stored row, bumping `version` by one.
    pub async fn update(
        &self,
        row: &RoleRow,
        expected_version: i64,
    ) -> Result<Option<RoleRow>, DataError> {
        sqlx::query_as::<_, RoleRow>(
            "UPDATE roles SET description = $2, scope_expr = $3, create_constraints = $4,
             immutable_keys = $5, actions = $6, version = version + 1
             WHERE id = $1 AND version = $7
             RETURNING *",
        )
        .bind(row.id)
        .bind(&row.description)
        .bind(&row.scope_expr)
        .bind(&row.create_constraints)
        .bind(&row.immutable_keys)
        .bind(&row.actions)
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_data_error)
    }

    /// Roles with at least one direct or group assignment block deletion.
    pub async fn has_assignments(&self, id: Uuid) -> Result<bool, DataError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT count(*) FROM (
                SELECT role_id FROM user_roles WHERE role_id = $1
                UNION ALL
                SELECT role_id FROM group_roles WHERE role_id = $1
             ) assigned",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_data_error)?;
        Ok(count > 0)
    }
}

#[async_trait::async_trait]
impl Repository<RoleRow, Uuid> for RoleRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<RoleRow>, DataError> {
        sqlx::query_as::<_, RoleRow>("SELECT * FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)
    }

    async fn find_all(&self) -> Result<Vec<RoleRow>, DataError> {
        sqlx::query_as::<_, RoleRow>("SELECT * FROM roles ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)
    }

    async fn find_all_paged(&self, pageable: &Pageable) -> Result<Page<RoleRow>, DataError> {
        let total: i64 = sqlx::query_scalar("SELECT count(*) FROM roles")
            .fetch_one(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        let rows = sqlx::query_as::<_, RoleRow>("SELECT * FROM roles ORDER BY name LIMIT $1 OFFSET $2")
            .bind(pageable.size as i64)
            .bind(pageable.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        Ok(Page::new(rows, pageable, total.max(0) as u64))
    }

    async fn save(&self, entity: &RoleRow) -> Result<RoleRow, DataError> {
        sqlx::query_as::<_, RoleRow>(
            "UPDATE roles SET description = $2, scope_expr = $3, create_constraints = $4,
             immutable_keys = $5, actions = $6, version = $7
             WHERE id = $1 RETURNING *",
        )
        .bind(entity.id)
        .bind(&entity.description)
        .bind(&entity.scope_expr)
        .bind(&entity.create_constraints)
        .bind(&entity.immutable_keys)
        .bind(&entity.actions)
        .bind(entity.version)
        .fetch_one(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_data_error)
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, DataError> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<u64, DataError> {
        let total: i64 = sqlx::query_scalar("SELECT count(*) FROM roles")
            .fetch_one(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        Ok(total.max(0) as u64)
    }
}
