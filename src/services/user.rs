//! User service
//!
//! Registration, token login/logout, session validation and password
//! changes. Tokens are opaque session ids stored in the `sessions` table.

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{CreateUserInput, ListParams, PagedResult, Session, User, EMAIL_MAX_LEN, NAME_MAX_LEN};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Default session lifetime in days
const DEFAULT_SESSION_TTL_DAYS: i64 = 30;

static USERNAME_RE: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"^[\w.@+-]+$"));

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Invalid login credentials
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Invalid input
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Email or username already taken
    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Login credentials
#[derive(Debug, Clone, serde::Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_ttl_days: i64,
}

impl UserService {
    /// Create a new user service with the default session lifetime
    pub fn new(user_repo: Arc<dyn UserRepository>, session_repo: Arc<dyn SessionRepository>) -> Self {
        Self::with_session_ttl(user_repo, session_repo, DEFAULT_SESSION_TTL_DAYS)
    }

    /// Create a new user service with a custom session lifetime
    pub fn with_session_ttl(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_ttl_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_ttl_days,
        }
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// - `ValidationError` for empty, too long or malformed fields
    /// - `UserExists` if the email or username is taken
    pub async fn register(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        validate_register_input(&input)?;

        if self
            .user_repo
            .get_by_email(&input.email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(
                "Пользователь с такой эл. почтой уже существует".to_string(),
            ));
        }

        if self
            .user_repo
            .get_by_username(&input.username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(
                "Пользователь с таким юзернеймом уже существует".to_string(),
            ));
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let user = User::new(
            input.email,
            input.username,
            input.first_name,
            input.last_name,
            password_hash,
        );

        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;

        tracing::info!(user_id = created.id, username = %created.username, "User registered");
        Ok(created)
    }

    /// Exchange email and password for a new session
    pub async fn login(&self, input: LoginInput) -> Result<Session, UserServiceError> {
        let invalid = || {
            UserServiceError::AuthenticationError(
                "Невозможно войти с предоставленными учетными данными".to_string(),
            )
        };

        let user = self
            .user_repo
            .get_by_email(&input.email)
            .await
            .context("Failed to get user by email")?
            .ok_or_else(invalid)?;

        let password_valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;
        if !password_valid {
            return Err(invalid());
        }

        let session = Session::issue(user.id, self.session_ttl_days);
        let session = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        tracing::debug!(user_id = user.id, "Session issued");
        Ok(session)
    }

    /// Invalidate a session token
    pub async fn logout(&self, token: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve a token to its user. Expired sessions are removed and
    /// treated as absent.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(session) => session,
            None => return Ok(None),
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!("Failed to remove expired session: {:#}", e);
            }
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;
        Ok(user)
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i64) -> Result<User, UserServiceError> {
        self.user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?
            .ok_or_else(|| UserServiceError::NotFound("Пользователь не найден".to_string()))
    }

    /// Paginated list of all users
    pub async fn list(&self, params: &ListParams) -> Result<PagedResult<User>, UserServiceError> {
        let (users, total) = self
            .user_repo
            .list(params)
            .await
            .context("Failed to list users")?;
        Ok(PagedResult::new(users, total, params))
    }

    /// Change the password after checking the current one
    pub async fn set_password(
        &self,
        user: &User,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), UserServiceError> {
        let current_valid = verify_password(current_password, &user.password_hash)
            .context("Failed to verify password")?;
        if !current_valid {
            return Err(UserServiceError::ValidationError(
                "Неверный текущий пароль".to_string(),
            ));
        }

        if new_password.is_empty() {
            return Err(UserServiceError::ValidationError(
                "Пароль не может быть пустым".to_string(),
            ));
        }

        let password_hash = hash_password(new_password).context("Failed to hash password")?;
        self.user_repo
            .update_password(user.id, &password_hash)
            .await
            .context("Failed to update password")?;
        Ok(())
    }

    /// Delete all expired sessions, returning how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        Ok(count)
    }
}

fn validate_register_input(input: &CreateUserInput) -> Result<(), UserServiceError> {
    let email = input.email.trim();
    if email.is_empty() {
        return Err(UserServiceError::ValidationError(
            "Эл. почта обязательна".to_string(),
        ));
    }
    if email.chars().count() > EMAIL_MAX_LEN || !email.contains('@') {
        return Err(UserServiceError::ValidationError(
            "Введите правильный адрес эл. почты".to_string(),
        ));
    }

    if input.username.is_empty() || input.username.chars().count() > NAME_MAX_LEN {
        return Err(UserServiceError::ValidationError(format!(
            "Юзернейм должен содержать от 1 до {} символов",
            NAME_MAX_LEN
        )));
    }
    let username_re = USERNAME_RE
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Invalid username pattern: {}", e))?;
    if !username_re.is_match(&input.username) {
        return Err(UserServiceError::ValidationError(
            "Юзернейм может содержать только буквы, цифры и символы @/./+/-/_".to_string(),
        ));
    }

    for (field, value) in [("Имя", &input.first_name), ("Фамилия", &input.last_name)] {
        if value.trim().is_empty() || value.chars().count() > NAME_MAX_LEN {
            return Err(UserServiceError::ValidationError(format!(
                "{}: от 1 до {} символов",
                field, NAME_MAX_LEN
            )));
        }
    }

    if input.password.is_empty() {
        return Err(UserServiceError::ValidationError(
            "Пароль не может быть пустым".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};

    async fn setup_test_service() -> (DynDatabasePool, UserService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        (pool, UserService::new(user_repo, session_repo))
    }

    fn input(username: &str) -> CreateUserInput {
        CreateUserInput {
            email: format!("{}@example.com", username),
            username: username.to_string(),
            first_name: "Иван".to_string(),
            last_name: "Петров".to_string(),
            password: "s3cret-pass".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_user() {
        let (_pool, service) = setup_test_service().await;

        let user = service.register(input("cook")).await.expect("Failed to register");

        assert!(user.id > 0);
        assert_eq!(user.email, "cook@example.com");
        assert!(user.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_register_duplicates_rejected() {
        let (_pool, service) = setup_test_service().await;
        service.register(input("cook")).await.unwrap();

        let same_email = CreateUserInput {
            username: "other".to_string(),
            ..input("cook")
        };
        assert!(matches!(
            service.register(same_email).await,
            Err(UserServiceError::UserExists(_))
        ));

        let same_username = CreateUserInput {
            email: "other@example.com".to_string(),
            ..input("cook")
        };
        assert!(matches!(
            service.register(same_username).await,
            Err(UserServiceError::UserExists(_))
        ));
    }

    #[tokio::test]
    async fn test_register_validation() {
        let (_pool, service) = setup_test_service().await;

        let cases = [
            CreateUserInput { username: "bad name".to_string(), ..input("a") },
            CreateUserInput { username: "x".repeat(151), ..input("b") },
            CreateUserInput { email: "not-an-email".to_string(), ..input("c") },
            CreateUserInput { first_name: " ".to_string(), ..input("d") },
            CreateUserInput { last_name: String::new(), ..input("e") },
            CreateUserInput { password: String::new(), ..input("f") },
        ];

        for case in cases {
            assert!(matches!(
                service.register(case).await,
                Err(UserServiceError::ValidationError(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_login_and_validate_session() {
        let (_pool, service) = setup_test_service().await;
        let user = service.register(input("cook")).await.unwrap();

        let session = service
            .login(LoginInput {
                email: "cook@example.com".to_string(),
                password: "s3cret-pass".to_string(),
            })
            .await
            .expect("Login failed");

        let resolved = service.validate_session(&session.id).await.unwrap();
        assert_eq!(resolved.map(|u| u.id), Some(user.id));

        service.logout(&session.id).await.unwrap();
        assert!(service.validate_session(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_invalid_credentials() {
        let (_pool, service) = setup_test_service().await;
        service.register(input("cook")).await.unwrap();

        let wrong_password = service
            .login(LoginInput {
                email: "cook@example.com".to_string(),
                password: "nope".to_string(),
            })
            .await;
        assert!(matches!(wrong_password, Err(UserServiceError::AuthenticationError(_))));

        let unknown = service
            .login(LoginInput {
                email: "ghost@example.com".to_string(),
                password: "s3cret-pass".to_string(),
            })
            .await;
        assert!(matches!(unknown, Err(UserServiceError::AuthenticationError(_))));
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected_and_removed() {
        let (pool, service) = setup_test_service().await;
        let user = service.register(input("cook")).await.unwrap();

        let session_repo = SqlxSessionRepository::new(pool.clone());
        let mut session = Session::issue(user.id, 30);
        session.expires_at = chrono::Utc::now() - chrono::Duration::minutes(1);
        session_repo.create(&session).await.unwrap();

        assert!(service.validate_session(&session.id).await.unwrap().is_none());
        assert!(session_repo.get_by_id(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_password() {
        let (_pool, service) = setup_test_service().await;
        let user = service.register(input("cook")).await.unwrap();

        let wrong = service.set_password(&user, "wrong", "new-pass").await;
        assert!(matches!(wrong, Err(UserServiceError::ValidationError(_))));

        service.set_password(&user, "s3cret-pass", "new-pass").await.unwrap();

        let session = service
            .login(LoginInput {
                email: "cook@example.com".to_string(),
                password: "new-pass".to_string(),
            })
            .await;
        assert!(session.is_ok());
    }

    #[tokio::test]
    async fn test_get_by_id_and_list() {
        let (_pool, service) = setup_test_service().await;
        let first = service.register(input("first")).await.unwrap();
        service.register(input("second")).await.unwrap();

        assert_eq!(service.get_by_id(first.id).await.unwrap().username, "first");
        assert!(matches!(
            service.get_by_id(999).await,
            Err(UserServiceError::NotFound(_))
        ));

        let page = service.list(&ListParams::new(1, 1)).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
        assert!(page.has_next());
    }
}
