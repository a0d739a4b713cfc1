use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use auth::Authenticator;
use auth::Claims;

use crate::domain::auth::errors::AuthError;
use crate::domain::auth::errors::StorageError;
use crate::domain::auth::models::LoginCommand;
use crate::domain::auth::models::RegisterCommand;
use crate::domain::auth::models::UserId;
use crate::domain::auth::ports::AppRepository;
use crate::domain::auth::ports::AuthServicePort;
use crate::domain::auth::ports::PrivilegeRepository;
use crate::domain::auth::ports::UserRepository;

/// Password behind the hash verified when a login names an unknown email.
const UNKNOWN_USER_PASSWORD: &str = "unknown-user-placeholder";

/// Domain service implementation for authentication.
///
/// Holds no per-request state; every call is independent and nothing is
/// retried.
pub struct AuthService<UR, AR, PR>
where
    UR: UserRepository,
    AR: AppRepository,
    PR: PrivilegeRepository,
{
    users: Arc<UR>,
    apps: Arc<AR>,
    privileges: Arc<PR>,
    authenticator: Arc<Authenticator>,
    token_ttl: Duration,
    /// Hash verified for unknown emails so both credential failures cost one
    /// Argon2 verification.
    unknown_user_hash: Option<String>,
}

impl<UR, AR, PR> AuthService<UR, AR, PR>
where
    UR: UserRepository,
    AR: AppRepository,
    PR: PrivilegeRepository,
{
    /// Create a new auth service with injected dependencies.
    ///
    /// # Arguments
    /// * `users` - User persistence implementation
    /// * `apps` - Application lookup implementation
    /// * `privileges` - Privilege lookup implementation
    /// * `authenticator` - Password hasher and token signer
    /// * `token_ttl` - Lifetime applied to every issued token
    pub fn new(
        users: Arc<UR>,
        apps: Arc<AR>,
        privileges: Arc<PR>,
        authenticator: Arc<Authenticator>,
        token_ttl: Duration,
    ) -> Self {
        let unknown_user_hash = match authenticator.hash_password(UNKNOWN_USER_PASSWORD) {
            Ok(hash) => Some(hash),
            Err(e) => {
                tracing::error!(error = %e, "Failed to hash unknown-user password");
                None
            }
        };

        Self {
            users,
            apps,
            privileges,
            authenticator,
            token_ttl,
            unknown_user_hash,
        }
    }

    async fn hash_password(&self, password: String) -> Result<String, AuthError> {
        let hasher = self.authenticator.password_hasher().clone();

        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("Password hashing task failed: {}", e)))?
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    async fn verify_password(&self, password: String, hash: String) -> Result<bool, AuthError> {
        let hasher = self.authenticator.password_hasher().clone();

        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::Internal(format!("Password verification task failed: {}", e)))?
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    /// Run one discarded verification, matching the cost of a wrong password.
    async fn verify_unknown_user(&self, password: &str) {
        if let Some(hash) = &self.unknown_user_hash {
            let _ = self.verify_password(password.to_string(), hash.clone()).await;
        }
    }
}

#[async_trait]
impl<UR, AR, PR> AuthServicePort for AuthService<UR, AR, PR>
where
    UR: UserRepository,
    AR: AppRepository,
    PR: PrivilegeRepository,
{
    async fn register(&self, command: RegisterCommand) -> Result<UserId, AuthError> {
        const OP: &str = "auth.register";
        tracing::info!(op = OP, email = %command.email(), "Registering new user");

        let password_hash = self
            .hash_password(command.password().to_string())
            .await
            .map_err(|e| {
                tracing::error!(op = OP, email = %command.email(), error = %e, "Failed to hash password");
                e
            })?;

        match self.users.save(command.email(), &password_hash).await {
            Ok(user_id) => {
                tracing::info!(op = OP, email = %command.email(), user_id = %user_id, "User registered");
                Ok(user_id)
            }
            Err(StorageError::UserAlreadyExists) => {
                tracing::warn!(op = OP, email = %command.email(), "User already exists");
                Err(AuthError::UserExists)
            }
            Err(e) => {
                tracing::error!(op = OP, email = %command.email(), error = %e, "Failed to save user");
                Err(AuthError::Internal(e.to_string()))
            }
        }
    }

    async fn login(&self, command: LoginCommand) -> Result<String, AuthError> {
        const OP: &str = "auth.login";
        let app_id = command.app_id();
        tracing::info!(op = OP, email = %command.email(), app_id = %app_id, "Logging in user");

        let user = match self.users.find_by_email(command.email()).await {
            Ok(user) => user,
            Err(StorageError::UserNotFound) => {
                self.verify_unknown_user(command.password()).await;
                tracing::warn!(op = OP, email = %command.email(), "Invalid credentials: user not found");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                tracing::error!(op = OP, email = %command.email(), error = %e, "Failed to get user");
                return Err(AuthError::Internal(e.to_string()));
            }
        };

        let matched = self
            .verify_password(command.password().to_string(), user.password_hash.clone())
            .await
            .map_err(|e| {
                tracing::error!(op = OP, user_id = %user.id, error = %e, "Failed to verify password");
                e
            })?;

        if !matched {
            tracing::warn!(op = OP, user_id = %user.id, "Invalid credentials: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let app = match self.apps.find_by_id(app_id).await {
            Ok(app) => app,
            Err(StorageError::AppNotFound) => {
                tracing::warn!(op = OP, user_id = %user.id, app_id = %app_id, "Invalid credentials: app not found");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                tracing::error!(op = OP, app_id = %app_id, error = %e, "Failed to get app");
                return Err(AuthError::Internal(e.to_string()));
            }
        };

        let claims = Claims::new(user.id, &user.email, app.id.0, self.token_ttl);
        let token = self.authenticator.issue_token(&claims).map_err(|e| {
            tracing::error!(op = OP, user_id = %user.id, app_id = %app.id, error = %e, "Failed to issue token");
            AuthError::Internal(e.to_string())
        })?;

        tracing::info!(op = OP, user_id = %user.id, app_id = %app.id, app = %app.name, "User logged in");

        Ok(token)
    }

    async fn is_admin(&self, user_id: UserId) -> Result<bool, AuthError> {
        const OP: &str = "auth.is_admin";
        tracing::info!(op = OP, user_id = %user_id, "Checking if user is admin");

        match self.privileges.is_admin(user_id).await {
            Ok(is_admin) => {
                tracing::info!(op = OP, user_id = %user_id, is_admin, "Checked admin flag");
                Ok(is_admin)
            }
            Err(StorageError::UserNotFound) => {
                tracing::warn!(op = OP, user_id = %user_id, "Invalid credentials: user not found");
                Err(AuthError::InvalidCredentials)
            }
            Err(e) => {
                tracing::error!(op = OP, user_id = %user_id, error = %e, "Failed to check admin flag");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use auth::PasswordHasher;
    use mockall::mock;

    use super::*;
    use crate::domain::auth::models::App;
    use crate::domain::auth::models::AppId;
    use crate::domain::auth::models::User;

    const SECRET: &[u8] = b"test_secret_key_at_least_32_bytes!";

    mock! {
        pub TestUserRepository {}

        #[async_trait]
        impl UserRepository for TestUserRepository {
            async fn save(&self, email: &str, password_hash: &str) -> Result<UserId, StorageError>;
            async fn find_by_email(&self, email: &str) -> Result<User, StorageError>;
        }
    }

    mock! {
        pub TestAppRepository {}

        #[async_trait]
        impl AppRepository for TestAppRepository {
            async fn find_by_id(&self, id: AppId) -> Result<App, StorageError>;
        }
    }

    mock! {
        pub TestPrivilegeRepository {}

        #[async_trait]
        impl PrivilegeRepository for TestPrivilegeRepository {
            async fn is_admin(&self, user_id: UserId) -> Result<bool, StorageError>;
        }
    }

    type TestService =
        AuthService<MockTestUserRepository, MockTestAppRepository, MockTestPrivilegeRepository>;

    fn authenticator(secret: &[u8]) -> Arc<Authenticator> {
        Arc::new(Authenticator::with_hasher(
            secret,
            PasswordHasher::with_params(8, 1, 1).unwrap(),
        ))
    }

    fn service(
        users: MockTestUserRepository,
        apps: MockTestAppRepository,
        privileges: MockTestPrivilegeRepository,
    ) -> TestService {
        AuthService::new(
            Arc::new(users),
            Arc::new(apps),
            Arc::new(privileges),
            authenticator(SECRET),
            Duration::from_secs(3600),
        )
    }

    fn stored_user(password: &str) -> User {
        let hash = PasswordHasher::with_params(8, 1, 1)
            .unwrap()
            .hash(password)
            .unwrap();

        User {
            id: UserId(1),
            email: "a@x.com".to_string(),
            password_hash: hash,
        }
    }

    fn login_command(password: &str, app_id: i32) -> LoginCommand {
        LoginCommand::new("a@x.com".to_string(), password.to_string(), AppId(app_id)).unwrap()
    }

    #[tokio::test]
    async fn test_register_success() {
        let mut users = MockTestUserRepository::new();
        users
            .expect_save()
            .withf(|email, hash| email == "a@x.com" && hash.starts_with("$argon2id$"))
            .times(1)
            .returning(|_, _| Ok(UserId(1)));

        let service = service(
            users,
            MockTestAppRepository::new(),
            MockTestPrivilegeRepository::new(),
        );

        let command = RegisterCommand::new("a@x.com".to_string(), "p1".to_string()).unwrap();
        let result = service.register(command).await;

        assert_eq!(result, Ok(UserId(1)));
    }

    #[tokio::test]
    async fn test_register_never_stores_plaintext() {
        let mut users = MockTestUserRepository::new();
        users
            .expect_save()
            .withf(|_, hash| !hash.contains("plaintext-secret"))
            .times(1)
            .returning(|_, _| Ok(UserId(5)));

        let service = service(
            users,
            MockTestAppRepository::new(),
            MockTestPrivilegeRepository::new(),
        );

        let command =
            RegisterCommand::new("a@x.com".to_string(), "plaintext-secret".to_string()).unwrap();
        assert!(service.register(command).await.is_ok());
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let mut users = MockTestUserRepository::new();
        users
            .expect_save()
            .times(1)
            .returning(|_, _| Err(StorageError::UserAlreadyExists));

        let service = service(
            users,
            MockTestAppRepository::new(),
            MockTestPrivilegeRepository::new(),
        );

        let command = RegisterCommand::new("a@x.com".to_string(), "p2".to_string()).unwrap();
        let result = service.register(command).await;

        assert_eq!(result, Err(AuthError::UserExists));
    }

    #[tokio::test]
    async fn test_register_storage_failure() {
        let mut users = MockTestUserRepository::new();
        users
            .expect_save()
            .times(1)
            .returning(|_, _| Err(StorageError::Database("connection reset".to_string())));

        let service = service(
            users,
            MockTestAppRepository::new(),
            MockTestPrivilegeRepository::new(),
        );

        let command = RegisterCommand::new("a@x.com".to_string(), "p1".to_string()).unwrap();
        let result = service.register(command).await;

        assert!(matches!(result, Err(AuthError::Internal(msg)) if msg.contains("connection reset")));
    }

    #[tokio::test]
    async fn test_login_success() {
        let mut users = MockTestUserRepository::new();
        let mut apps = MockTestAppRepository::new();

        let user = stored_user("p1");
        users
            .expect_find_by_email()
            .withf(|email| email == "a@x.com")
            .times(1)
            .returning(move |_| Ok(user.clone()));

        apps.expect_find_by_id()
            .withf(|id| *id == AppId(42))
            .times(1)
            .returning(|id| {
                Ok(App {
                    id,
                    name: "test-app".to_string(),
                })
            });

        let service = service(users, apps, MockTestPrivilegeRepository::new());

        let token = service
            .login(login_command("p1", 42))
            .await
            .expect("Login failed");

        let claims = authenticator(SECRET)
            .validate_token(&token)
            .expect("Token validation failed");

        assert_eq!(claims.user_id(), Some(1));
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.app_id, 42);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[tokio::test]
    async fn test_login_uses_configured_ttl() {
        let mut users = MockTestUserRepository::new();
        let mut apps = MockTestAppRepository::new();

        let user = stored_user("p1");
        users
            .expect_find_by_email()
            .returning(move |_| Ok(user.clone()));
        apps.expect_find_by_id().returning(|id| {
            Ok(App {
                id,
                name: "test-app".to_string(),
            })
        });

        let service = AuthService::new(
            Arc::new(users),
            Arc::new(apps),
            Arc::new(MockTestPrivilegeRepository::new()),
            authenticator(SECRET),
            Duration::from_secs(90),
        );

        let token = service.login(login_command("p1", 7)).await.unwrap();
        let claims = authenticator(SECRET).validate_token(&token).unwrap();

        assert_eq!(claims.exp - claims.iat, 90);
    }

    #[tokio::test]
    async fn test_login_unknown_email() {
        let mut users = MockTestUserRepository::new();
        let mut apps = MockTestAppRepository::new();

        users
            .expect_find_by_email()
            .times(1)
            .returning(|_| Err(StorageError::UserNotFound));
        apps.expect_find_by_id().times(0);

        let service = service(users, apps, MockTestPrivilegeRepository::new());

        let result = service.login(login_command("p1", 42)).await;
        assert_eq!(result, Err(AuthError::InvalidCredentials));
    }

    #[test]
    fn test_unknown_user_hash_uses_configured_work_factor() {
        let service = service(
            MockTestUserRepository::new(),
            MockTestAppRepository::new(),
            MockTestPrivilegeRepository::new(),
        );

        let hash = service.unknown_user_hash.as_deref().unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("m=8,t=1,p=1"));
    }

    #[tokio::test]
    async fn test_login_unknown_email_costs_a_verification() {
        // A work factor large enough that one verification dominates the
        // mocked storage round trip.
        let authenticator = Arc::new(Authenticator::with_hasher(
            SECRET,
            PasswordHasher::with_params(1024, 2, 1).unwrap(),
        ));
        let known_user = User {
            id: UserId(1),
            email: "a@x.com".to_string(),
            password_hash: authenticator.hash_password("p1").unwrap(),
        };

        let mut users = MockTestUserRepository::new();
        users.expect_find_by_email().returning(move |email| {
            if email == "a@x.com" {
                Ok(known_user.clone())
            } else {
                Err(StorageError::UserNotFound)
            }
        });

        let service = AuthService::new(
            Arc::new(users),
            Arc::new(MockTestAppRepository::new()),
            Arc::new(MockTestPrivilegeRepository::new()),
            authenticator,
            Duration::from_secs(3600),
        );

        let wrong_password = LoginCommand::new("a@x.com".into(), "nope".into(), AppId(42)).unwrap();
        let unknown_email = LoginCommand::new("b@x.com".into(), "nope".into(), AppId(42)).unwrap();

        let mut wrong_password_elapsed = Duration::ZERO;
        let mut unknown_email_elapsed = Duration::ZERO;
        for _ in 0..3 {
            let started = std::time::Instant::now();
            let result = service.login(wrong_password.clone()).await;
            wrong_password_elapsed += started.elapsed();
            assert_eq!(result, Err(AuthError::InvalidCredentials));

            let started = std::time::Instant::now();
            let result = service.login(unknown_email.clone()).await;
            unknown_email_elapsed += started.elapsed();
            assert_eq!(result, Err(AuthError::InvalidCredentials));
        }

        assert!(
            unknown_email_elapsed * 3 >= wrong_password_elapsed,
            "unknown email {:?} vs wrong password {:?}",
            unknown_email_elapsed,
            wrong_password_elapsed
        );
    }

    #[tokio::test]
    async fn test_login_wrong_password_checked_before_app() {
        let mut users = MockTestUserRepository::new();
        let mut apps = MockTestAppRepository::new();

        let user = stored_user("p1");
        users
            .expect_find_by_email()
            .times(1)
            .returning(move |_| Ok(user.clone()));
        apps.expect_find_by_id().times(0);

        let service = service(users, apps, MockTestPrivilegeRepository::new());

        let result = service.login(login_command("wrong", 42)).await;
        assert_eq!(result, Err(AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_login_unknown_app() {
        let mut users = MockTestUserRepository::new();
        let mut apps = MockTestAppRepository::new();

        let user = stored_user("p1");
        users
            .expect_find_by_email()
            .returning(move |_| Ok(user.clone()));
        apps.expect_find_by_id()
            .times(1)
            .returning(|_| Err(StorageError::AppNotFound));

        let service = service(users, apps, MockTestPrivilegeRepository::new());

        let result = service.login(login_command("p1", 999)).await;
        assert_eq!(result, Err(AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_login_malformed_stored_hash() {
        let mut users = MockTestUserRepository::new();
        let mut apps = MockTestAppRepository::new();

        users.expect_find_by_email().returning(|_| {
            Ok(User {
                id: UserId(1),
                email: "a@x.com".to_string(),
                password_hash: "not-a-phc-string".to_string(),
            })
        });
        apps.expect_find_by_id().times(0);

        let service = service(users, apps, MockTestPrivilegeRepository::new());

        let result = service.login(login_command("p1", 42)).await;
        assert!(matches!(result, Err(AuthError::Internal(_))));
    }

    #[tokio::test]
    async fn test_login_storage_failure() {
        let mut users = MockTestUserRepository::new();
        users
            .expect_find_by_email()
            .returning(|_| Err(StorageError::Database("timeout".to_string())));

        let service = service(
            users,
            MockTestAppRepository::new(),
            MockTestPrivilegeRepository::new(),
        );

        let result = service.login(login_command("p1", 42)).await;
        assert!(matches!(result, Err(AuthError::Internal(_))));
    }

    #[tokio::test]
    async fn test_login_signing_failure() {
        let mut users = MockTestUserRepository::new();
        let mut apps = MockTestAppRepository::new();

        let user = stored_user("p1");
        users
            .expect_find_by_email()
            .returning(move |_| Ok(user.clone()));
        apps.expect_find_by_id().returning(|id| {
            Ok(App {
                id,
                name: "test-app".to_string(),
            })
        });

        let service = AuthService::new(
            Arc::new(users),
            Arc::new(apps),
            Arc::new(MockTestPrivilegeRepository::new()),
            authenticator(b""),
            Duration::from_secs(3600),
        );

        let result = service.login(login_command("p1", 42)).await;
        assert!(matches!(result, Err(AuthError::Internal(_))));
    }

    #[tokio::test]
    async fn test_is_admin_passthrough() {
        let mut privileges = MockTestPrivilegeRepository::new();
        privileges
            .expect_is_admin()
            .withf(|id| *id == UserId(1))
            .returning(|_| Ok(true));
        privileges
            .expect_is_admin()
            .withf(|id| *id == UserId(2))
            .returning(|_| Ok(false));

        let service = service(
            MockTestUserRepository::new(),
            MockTestAppRepository::new(),
            privileges,
        );

        assert_eq!(service.is_admin(UserId(1)).await, Ok(true));
        assert_eq!(service.is_admin(UserId(2)).await, Ok(false));
    }

    #[tokio::test]
    async fn test_is_admin_unknown_user() {
        let mut privileges = MockTestPrivilegeRepository::new();
        privileges
            .expect_is_admin()
            .times(1)
            .returning(|_| Err(StorageError::UserNotFound));

        let service = service(
            MockTestUserRepository::new(),
            MockTestAppRepository::new(),
            privileges,
        );

        assert_eq!(
            service.is_admin(UserId(404)).await,
            Err(AuthError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn test_is_admin_storage_failure() {
        let mut privileges = MockTestPrivilegeRepository::new();
        privileges
            .expect_is_admin()
            .returning(|_| Err(StorageError::Database("down".to_string())));

        let service = service(
            MockTestUserRepository::new(),
            MockTestAppRepository::new(),
            privileges,
        );

        assert!(matches!(
            service.is_admin(UserId(1)).await,
            Err(AuthError::Internal(_))
        ));
    }
}
