use crate::entities::LabelPolicyRow;
use r2e_data::DataError;
use r2e_data_sqlx::SqlxErrorExt;

#[derive(Clone)]
pub struct LabelPolicyRepository {
    pool: sqlx::PgPool,
}

impl LabelPolicyRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_current(&self) -> Result<Option<LabelPolicyRow>, DataError> {
        sqlx::query_as::<_, LabelPolicyRow>(
            "SELECT * FROM label_policies ORDER BY version DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_data_error)
    }

    pub async fn insert_new_version(
        &self,
        max_keys: i32,
        max_value_len: i32,
        allowed_keys: &serde_json::Value,
    ) -> Result<LabelPolicyRow, DataError> {
        sqlx::query_as::<_, LabelPolicyRow>(
            "INSERT INTO label_policies (version, max_keys, max_value_len, allowed_keys)
             VALUES (COALESCE((SELECT max(version) FROM label_policies), 0) + 1, $1, $2, $3)
             RETURNING *",
        )
        .bind(max_keys)
        .bind(max_value_len)
        .bind(allowed_keys)
        .fetch_one(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_data_error)
    }
}
