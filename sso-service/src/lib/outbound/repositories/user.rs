use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::Row;

use crate::domain::auth::errors::StorageError;
use crate::domain::auth::models::User;
use crate::domain::auth::models::UserId;
use crate::domain::auth::ports::PrivilegeRepository;
use crate::domain::auth::ports::UserRepository;

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn save(&self, email: &str, password_hash: &str) -> Result<UserId, StorageError> {
        // Uniqueness is enforced by the users_email_key constraint, so two
        // concurrent inserts cannot both succeed.
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO users (email, pass_hash)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return StorageError::UserAlreadyExists;
                }
            }
            StorageError::Database(e.to_string())
        })?;

        Ok(UserId(id))
    }

    async fn find_by_email(&self, email: &str) -> Result<User, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT id, email, pass_hash
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?
        .ok_or(StorageError::UserNotFound)?;

        Ok(User {
            id: UserId(
                row.try_get("id")
                    .map_err(|e| StorageError::Database(e.to_string()))?,
            ),
            email: row
                .try_get("email")
                .map_err(|e| StorageError::Database(e.to_string()))?,
            password_hash: row
                .try_get("pass_hash")
                .map_err(|e| StorageError::Database(e.to_string()))?,
        })
    }
}

#[async_trait]
impl PrivilegeRepository for PostgresUserRepository {
    async fn is_admin(&self, user_id: UserId) -> Result<bool, StorageError> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT is_admin
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?
        .ok_or(StorageError::UserNotFound)
    }
}
