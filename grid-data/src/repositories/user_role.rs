use crate::entities::UserRoleRow;
use r2e_data::DataError;
use r2e_data_sqlx::SqlxErrorExt;
use uuid::Uuid;

#[derive(Clone)]
pub struct UserRoleRepository {
    pool: sqlx::PgPool,
}

impl UserRoleRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<UserRoleRow>, DataError> {
        sqlx::query_as::<_, UserRoleRow>("SELECT * FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)
    }

    pub async fn insert(&self, row: &UserRoleRow) -> Result<(), DataError> {
        sqlx::query(
            "INSERT INTO user_roles (user_id, role_id, scope_override) VALUES ($1, $2, $3)
             ON CONFLICT (user_id, role_id) DO UPDATE SET scope_override = excluded.scope_override",
        )
        .bind(row.user_id)
        .bind(row.role_id)
        .bind(&row.scope_override)
        .execute(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_data_error)?;
        Ok(())
    }

    pub async fn delete(&self, user_id: Uuid, role_id: Uuid) -> Result<bool, DataError> {
        let result = sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(user_id)
            .bind(role_id)
            .execute(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        Ok(result.rows_affected() > 0)
    }
}
