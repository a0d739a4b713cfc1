use async_trait::async_trait;

use crate::domain::auth::errors::AuthError;
use crate::domain::auth::errors::StorageError;
use crate::domain::auth::models::App;
use crate::domain::auth::models::AppId;
use crate::domain::auth::models::LoginCommand;
use crate::domain::auth::models::RegisterCommand;
use crate::domain::auth::models::User;
use crate::domain::auth::models::UserId;

/// Port for authentication use cases.
#[async_trait]
pub trait AuthServicePort: Send + Sync + 'static {
    /// Register a new user.
    ///
    /// # Arguments
    /// * `command` - Email and plaintext password
    ///
    /// # Returns
    /// Identifier assigned to the new user
    ///
    /// # Errors
    /// * `InvalidInput` - Email or password is empty
    /// * `UserExists` - Email is already registered
    /// * `Internal` - Hashing or storage failed
    async fn register(&self, command: RegisterCommand) -> Result<UserId, AuthError>;

    /// Verify credentials and issue an access token for an application.
    ///
    /// # Arguments
    /// * `command` - Email, plaintext password and application ID
    ///
    /// # Returns
    /// Signed access token
    ///
    /// # Errors
    /// * `InvalidInput` - A field is empty or the app ID is unset
    /// * `InvalidCredentials` - Unknown email, wrong password or unknown app
    /// * `Internal` - Hashing, storage or signing failed
    async fn login(&self, command: LoginCommand) -> Result<String, AuthError>;

    /// Check whether a user holds administrator privileges.
    ///
    /// # Errors
    /// * `InvalidCredentials` - User does not exist
    /// * `Internal` - Storage failed
    async fn is_admin(&self, user_id: UserId) -> Result<bool, AuthError>;
}

/// User persistence and lookup.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Persist a new user.
    ///
    /// Must be atomic with respect to email uniqueness: of two concurrent saves
    /// with the same email exactly one succeeds.
    ///
    /// # Returns
    /// Identifier assigned by storage
    ///
    /// # Errors
    /// * `UserAlreadyExists` - Email is already registered
    /// * `Database` - Storage operation failed
    async fn save(&self, email: &str, password_hash: &str) -> Result<UserId, StorageError>;

    /// Retrieve a user by email (exact, case-sensitive match).
    ///
    /// # Errors
    /// * `UserNotFound` - No user with this email
    /// * `Database` - Storage operation failed
    async fn find_by_email(&self, email: &str) -> Result<User, StorageError>;
}

/// Application lookup.
#[async_trait]
pub trait AppRepository: Send + Sync + 'static {
    /// Retrieve an application by identifier.
    ///
    /// # Errors
    /// * `AppNotFound` - No application with this ID
    /// * `Database` - Storage operation failed
    async fn find_by_id(&self, id: AppId) -> Result<App, StorageError>;
}

/// Privilege lookup.
#[async_trait]
pub trait PrivilegeRepository: Send + Sync + 'static {
    /// Read the administrator flag of a user.
    ///
    /// # Errors
    /// * `UserNotFound` - No user with this ID
    /// * `Database` - Storage operation failed
    async fn is_admin(&self, user_id: UserId) -> Result<bool, StorageError>;
}
