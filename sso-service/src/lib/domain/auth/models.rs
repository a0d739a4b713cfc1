use std::fmt;

use crate::domain::auth::errors::AuthError;

/// Registered user account.
///
/// `password_hash` is a PHC string produced by the password hasher and is
/// never logged or returned to callers.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

/// User identifier assigned by storage on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Relying application a token is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct App {
    pub id: AppId,
    pub name: String,
}

/// Application identifier. Zero means "not set".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AppId(pub i32);

impl AppId {
    pub fn is_unset(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Command to register a new user.
#[derive(Clone)]
pub struct RegisterCommand {
    email: String,
    password: String,
}

impl RegisterCommand {
    /// Construct a register command, rejecting empty fields.
    ///
    /// # Errors
    /// * `InvalidInput` - Email or password is empty
    pub fn new(email: String, password: String) -> Result<Self, AuthError> {
        if email.is_empty() {
            return Err(AuthError::InvalidInput("missing email".to_string()));
        }
        if password.is_empty() {
            return Err(AuthError::InvalidInput("missing password".to_string()));
        }

        Ok(Self { email, password })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

/// Command to log a user into an application.
#[derive(Clone)]
pub struct LoginCommand {
    email: String,
    password: String,
    app_id: AppId,
}

impl LoginCommand {
    /// Construct a login command, rejecting empty fields and an unset app.
    ///
    /// # Errors
    /// * `InvalidInput` - Email or password is empty, or app ID is zero
    pub fn new(email: String, password: String, app_id: AppId) -> Result<Self, AuthError> {
        if email.is_empty() {
            return Err(AuthError::InvalidInput("missing email".to_string()));
        }
        if password.is_empty() {
            return Err(AuthError::InvalidInput("missing password".to_string()));
        }
        if app_id.is_unset() {
            return Err(AuthError::InvalidInput("missing app ID".to_string()));
        }

        Ok(Self {
            email,
            password,
            app_id,
        })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn app_id(&self) -> AppId {
        self.app_id
    }
}

// Passwords stay out of debug output.
impl fmt::Debug for RegisterCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterCommand")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for LoginCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCommand")
            .field("email", &self.email)
            .field("app_id", &self.app_id)
            .finish_non_exhaustive()
    }
}
