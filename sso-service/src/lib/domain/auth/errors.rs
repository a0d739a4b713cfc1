use thiserror::Error;

/// Outcome reported by a storage backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("user already exists")]
    UserAlreadyExists,

    #[error("user not found")]
    UserNotFound,

    #[error("app not found")]
    AppNotFound,

    #[error("Database error: {0}")]
    Database(String),
}

/// Top-level error for authentication operations.
///
/// Unknown email, wrong password, unknown application and unknown user are
/// all reported as `InvalidCredentials`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("user already exists")]
    UserExists,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UserAlreadyExists => AuthError::UserExists,
            StorageError::UserNotFound | StorageError::AppNotFound => {
                AuthError::InvalidCredentials
            }
            StorageError::Database(msg) => AuthError::Internal(msg),
        }
    }
}
