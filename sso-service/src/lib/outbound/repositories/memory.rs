use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::auth::errors::StorageError;
use crate::domain::auth::models::App;
use crate::domain::auth::models::AppId;
use crate::domain::auth::models::User;
use crate::domain::auth::models::UserId;
use crate::domain::auth::ports::AppRepository;
use crate::domain::auth::ports::PrivilegeRepository;
use crate::domain::auth::ports::UserRepository;

#[derive(Debug, Default)]
struct UserTable {
    last_id: i64,
    /// email -> user id
    by_email: HashMap<String, UserId>,
    /// user id -> (user, is_admin)
    by_id: HashMap<UserId, (User, bool)>,
}

/// In-memory user store.
///
/// Insert-if-absent happens under a single write lock, so email uniqueness
/// holds across concurrent registrations. Ids start at 1.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserRepository {
    table: Arc<RwLock<UserTable>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the administrator flag of an existing user.
    ///
    /// # Errors
    /// * `UserNotFound` - No user with this ID
    pub async fn set_admin(&self, user_id: UserId, is_admin: bool) -> Result<(), StorageError> {
        let mut table = self.table.write().await;
        let (_, flag) = table
            .by_id
            .get_mut(&user_id)
            .ok_or(StorageError::UserNotFound)?;
        *flag = is_admin;

        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.by_id.len()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn save(&self, email: &str, password_hash: &str) -> Result<UserId, StorageError> {
        let mut table = self.table.write().await;

        if table.by_email.contains_key(email) {
            return Err(StorageError::UserAlreadyExists);
        }

        table.last_id += 1;
        let id = UserId(table.last_id);
        let user = User {
            id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
        };

        table.by_email.insert(email.to_string(), id);
        table.by_id.insert(id, (user, false));

        Ok(id)
    }

    async fn find_by_email(&self, email: &str) -> Result<User, StorageError> {
        let table = self.table.read().await;

        table
            .by_email
            .get(email)
            .and_then(|id| table.by_id.get(id))
            .map(|(user, _)| user.clone())
            .ok_or(StorageError::UserNotFound)
    }
}

#[async_trait]
impl PrivilegeRepository for InMemoryUserRepository {
    async fn is_admin(&self, user_id: UserId) -> Result<bool, StorageError> {
        self.table
            .read()
            .await
            .by_id
            .get(&user_id)
            .map(|(_, is_admin)| *is_admin)
            .ok_or(StorageError::UserNotFound)
    }
}

/// In-memory application registry.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAppRepository {
    apps: Arc<RwLock<HashMap<AppId, App>>>,
}

impl InMemoryAppRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) an application.
    pub async fn insert(&self, app: App) {
        self.apps.write().await.insert(app.id, app);
    }
}

#[async_trait]
impl AppRepository for InMemoryAppRepository {
    async fn find_by_id(&self, id: AppId) -> Result<App, StorageError> {
        self.apps
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StorageError::AppNotFound)
    }
}
