use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::Row;

use crate::domain::auth::errors::StorageError;
use crate::domain::auth::models::App;
use crate::domain::auth::models::AppId;
use crate::domain::auth::ports::AppRepository;

pub struct PostgresAppRepository {
    pool: PgPool,
}

impl PostgresAppRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Register an app unless one with the same ID already exists.
    ///
    /// Returns whether a row was inserted; an existing app is left untouched.
    ///
    /// # Errors
    /// * `Database` - Query failed, including a name taken by another ID
    pub async fn insert_if_absent(&self, app: &App) -> Result<bool, StorageError> {
        let result = sqlx::query(
            r#"
            INSERT INTO apps (id, name)
            VALUES ($1, $2)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(app.id.0)
        .bind(&app.name)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl AppRepository for PostgresAppRepository {
    async fn find_by_id(&self, id: AppId) -> Result<App, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT id, name
            FROM apps
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?
        .ok_or(StorageError::AppNotFound)?;

        Ok(App {
            id: AppId(
                row.try_get("id")
                    .map_err(|e| StorageError::Database(e.to_string()))?,
            ),
            name: row
                .try_get("name")
                .map_err(|e| StorageError::Database(e.to_string()))?,
        })
    }
}
