use crate::entities::GroupRoleRow;
use r2e_data::DataError;
use r2e_data_sqlx::SqlxErrorExt;
use uuid::Uuid;

/// Backs the Group→Role Cache's periodic refresh: `find_all` is the full
/// snapshot source it swaps in atomically.
#[derive(Clone)]
pub struct GroupRoleRepository {
    pool: sqlx::PgPool,
}

impl GroupRoleRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_all(&self) -> Result<Vec<GroupRoleRow>, DataError> {
        sqlx::query_as::<_, GroupRoleRow>("SELECT * FROM group_roles")
            .fetch_all(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)
    }

    pub async fn find_by_group(&self, group_name: &str) -> Result<Vec<GroupRoleRow>, DataError> {
        sqlx::query_as::<_, GroupRoleRow>("SELECT * FROM group_roles WHERE group_name = $1")
            .bind(group_name)
            .fetch_all(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)
    }

    pub async fn insert(&self, row: &GroupRoleRow) -> Result<(), DataError> {
        sqlx::query(
            "INSERT INTO group_roles (group_name, role_id, assigned_by) VALUES ($1, $2, $3)
             ON CONFLICT (group_name, role_id) DO UPDATE SET assigned_by = excluded.assigned_by",
        )
        .bind(&row.group_name)
        .bind(row.role_id)
        .bind(&row.assigned_by)
        .execute(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_data_error)?;
        Ok(())
    }

    pub async fn delete(&self, group_name: &str, role_id: Uuid) -> Result<bool, DataError> {
        let result = sqlx::query("DELETE FROM group_roles WHERE group_name = $1 AND role_id = $2")
            .bind(group_name)
            .bind(role_id)
            .execute(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        Ok(result.rows_affected() > 0)
    }
}
