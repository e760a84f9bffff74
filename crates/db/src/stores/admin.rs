use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use reacji_core::domain::AdminUser;
use reacji_core::errors::StoreError;
use reacji_core::store::AdminStore;

use super::map_sqlx_error;
use crate::DbPool;

pub struct SqlAdminStore {
    pool: DbPool,
}

impl SqlAdminStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdminStore for SqlAdminStore {
    async fn get_by_user_id(&self, user_id: &str) -> Result<Option<AdminUser>, StoreError> {
        let row = sqlx::query(
            "SELECT user_id, username, permission, created_at, updated_at \
             FROM admin_users WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(|row| user_from_row(&row)).transpose()
    }

    async fn upsert(&self, mut user: AdminUser) -> Result<AdminUser, StoreError> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO admin_users (user_id, username, permission, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                username = excluded.username,
                permission = excluded.permission,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&user.user_id)
        .bind(&user.username)
        .bind(user.permission.as_str())
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        user.updated_at = Some(now);
        Ok(user)
    }

    async fn delete(&self, user_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM admin_users WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<AdminUser>, StoreError> {
        let rows = sqlx::query(
            "SELECT user_id, username, permission, created_at, updated_at \
             FROM admin_users ORDER BY user_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(user_from_row).collect()
    }
}

fn user_from_row(row: &SqliteRow) -> Result<AdminUser, StoreError> {
    let permission = row
        .get::<String, _>("permission")
        .parse()
        .map_err(StoreError::Validation)?;

    Ok(AdminUser {
        user_id: row.get("user_id"),
        username: row.get("username"),
        permission,
        created_at: parse_timestamp(row, "created_at")?,
        updated_at: parse_timestamp(row, "updated_at")?,
    })
}

fn parse_timestamp(row: &SqliteRow, column: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
    row.get::<Option<String>, _>(column)
        .map(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .map(|parsed| parsed.with_timezone(&Utc))
                .map_err(|error| StoreError::Operation(format!("decode {column}: {error}")))
        })
        .transpose()
}
