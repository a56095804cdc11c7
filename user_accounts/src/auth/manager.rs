//! Account manager: registration, credential verification, and user admin.

use std::sync::Arc;

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use super::errors::{AuthError, AuthResult};
use super::models::{RegisterRequest, TokenPair, User, UserId};
use super::tokens::TokenIssuer;
use crate::db::UserRepository;

/// Registration and password verification over Argon2id hashes.
///
/// Stateless over the user repository; the only configuration is the hash
/// time cost (work factor).
pub struct AccountManager {
    users: Arc<dyn UserRepository>,
    tokens: Arc<TokenIssuer>,
    hash_time_cost: u32,
}

impl AccountManager {
    pub fn new(users: Arc<dyn UserRepository>, tokens: Arc<TokenIssuer>, hash_time_cost: u32) -> Self {
        Self {
            users,
            tokens,
            hash_time_cost,
        }
    }

    /// Register a new user
    ///
    /// Username and email existence are checked independently before the
    /// insert; the window between check and insert is covered only by the
    /// store's unique constraints.
    ///
    /// # Errors
    ///
    /// * `AuthError::Validation` - Missing username, email, or password
    /// * `AuthError::UsernameTaken` - Username already exists
    /// * `AuthError::EmailTaken` - Email already exists
    pub async fn register(&self, request: RegisterRequest) -> AuthResult<UserId> {
        if request.username.trim().is_empty()
            || request.email.trim().is_empty()
            || request.password.is_empty()
        {
            return Err(AuthError::Validation(
                "Username, Email, and password required".to_string(),
            ));
        }

        if self
            .users
            .find_by_username(&request.username)
            .await?
            .is_some()
        {
            return Err(AuthError::UsernameTaken);
        }

        if self.users.find_by_email(&request.email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = self.hash_password(&request.password)?;

        self.users
            .create(&request.username, &request.email, &password_hash)
            .await
    }

    /// Verify credentials and issue a token pair.
    ///
    /// The identifier matches either username or email. Unknown users,
    /// users without a password (OTP-only rows), and wrong passwords all
    /// produce the same `InvalidCredentials` error, so a caller cannot
    /// enumerate accounts.
    pub async fn login(&self, identifier: &str, password: &str) -> AuthResult<TokenPair> {
        if identifier.trim().is_empty() || password.is_empty() {
            return Err(AuthError::Validation(
                "Username or Email and password required".to_string(),
            ));
        }

        let credentials = self
            .users
            .find_credentials(identifier)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let stored_hash = credentials
            .password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;

        self.verify_password(password, stored_hash)?;

        self.tokens
            .issue_pair(credentials.user_id, &credentials.name)
            .await
    }

    /// Re-hash and store a new password for an existing user.
    pub async fn update_password(&self, user_id: UserId, password: &str) -> AuthResult<()> {
        if password.is_empty() {
            return Err(AuthError::Validation("Password is required.".to_string()));
        }

        let password_hash = self.hash_password(password)?;
        if !self
            .users
            .update_password_hash(user_id, &password_hash)
            .await?
        {
            return Err(AuthError::UserNotFound);
        }
        Ok(())
    }

    /// List all users.
    pub async fn list_users(&self) -> AuthResult<Vec<User>> {
        self.users.list().await
    }

    /// Fetch a single user by id.
    pub async fn get_user(&self, user_id: UserId) -> AuthResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Delete a user by id.
    pub async fn delete_user(&self, user_id: UserId) -> AuthResult<()> {
        if !self.users.delete(user_id).await? {
            return Err(AuthError::UserNotFound);
        }
        Ok(())
    }

    /// Hash a password with Argon2id and a fresh random salt
    fn hash_password(&self, password: &str) -> AuthResult<String> {
        let params = Params::new(
            Params::DEFAULT_M_COST,
            self.hash_time_cost,
            Params::DEFAULT_P_COST,
            None,
        )
        .map_err(|_| AuthError::HashingFailed)?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let salt = SaltString::generate(&mut OsRng);
        Ok(argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|_| AuthError::HashingFailed)?
            .to_string())
    }

    /// Verify password against hash; parameters come from the hash string
    fn verify_password(&self, password: &str, hash: &str) -> AuthResult<()> {
        let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| AuthError::InvalidCredentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::mock::{MockRefreshTokenRepository, MockUserRepository};
    use chrono::Duration;

    fn setup() -> (Arc<MockUserRepository>, AccountManager) {
        let users = Arc::new(MockUserRepository::new());
        let store = Arc::new(MockRefreshTokenRepository::new());
        let tokens = Arc::new(TokenIssuer::new(
            store,
            "access_secret_for_tests_only_0000".to_string(),
            "refresh_secret_for_tests_only_000".to_string(),
            Duration::minutes(15),
            Duration::days(7),
        ));
        let manager = AccountManager::new(users.clone(), tokens, 2);
        (users, manager)
    }

    fn request(username: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_hashes_password() {
        let (users, manager) = setup();

        let user_id = manager
            .register(request("alice", "alice@x.com", "pw123"))
            .await
            .expect("registration should succeed");

        let hash = users.password_hash(user_id).expect("hash should be stored");
        assert_ne!(hash, "pw123", "plaintext must never be stored");
        // The stored hash verifies against the original password.
        manager
            .login("alice", "pw123")
            .await
            .expect("login with original password should succeed");
    }

    #[tokio::test]
    async fn test_register_requires_all_fields() {
        let (_, manager) = setup();

        for bad in [
            request("", "a@x.com", "pw"),
            request("a", "", "pw"),
            request("a", "a@x.com", ""),
        ] {
            let result = manager.register(bad).await;
            assert!(matches!(result, Err(AuthError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn test_register_rejects_taken_username_and_email() {
        let (_, manager) = setup();
        manager
            .register(request("alice", "alice@x.com", "pw123"))
            .await
            .unwrap();

        let username_taken = manager
            .register(request("alice", "other@x.com", "pw456"))
            .await;
        assert!(matches!(username_taken, Err(AuthError::UsernameTaken)));

        let email_taken = manager
            .register(request("bob", "alice@x.com", "pw456"))
            .await;
        assert!(matches!(email_taken, Err(AuthError::EmailTaken)));
    }

    #[tokio::test]
    async fn test_login_failure_is_uniform() {
        let (_, manager) = setup();
        manager
            .register(request("alice", "alice@x.com", "pw123"))
            .await
            .unwrap();

        let wrong_password = manager.login("alice", "wrongpw").await.unwrap_err();
        let unknown_user = manager.login("nobody", "wrongpw").await.unwrap_err();

        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_user, AuthError::InvalidCredentials));
        assert_eq!(
            wrong_password.client_message(),
            unknown_user.client_message()
        );
    }

    #[tokio::test]
    async fn test_login_accepts_email_identifier() {
        let (_, manager) = setup();
        manager
            .register(request("alice", "alice@x.com", "pw123"))
            .await
            .unwrap();

        let pair = manager.login("alice@x.com", "pw123").await.unwrap();
        assert!(!pair.access_token.is_empty());
        assert!(!pair.refresh_token.is_empty());
    }

    #[tokio::test]
    async fn test_login_rejects_otp_only_user() {
        let (users, manager) = setup();
        users.create_with_email("passwordless@x.com").await.unwrap();

        let result = manager.login("passwordless@x.com", "anything").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_update_password_rehashes() {
        let (users, manager) = setup();
        let user_id = manager
            .register(request("alice", "alice@x.com", "pw123"))
            .await
            .unwrap();
        let old_hash = users.password_hash(user_id).unwrap();

        manager.update_password(user_id, "newpw456").await.unwrap();
        let new_hash = users.password_hash(user_id).unwrap();
        assert_ne!(old_hash, new_hash);

        assert!(manager.login("alice", "pw123").await.is_err());
        manager.login("alice", "newpw456").await.unwrap();
    }

    #[tokio::test]
    async fn test_update_password_unknown_user() {
        let (_, manager) = setup();
        let result = manager.update_password(999, "pw").await;
        assert!(matches!(result, Err(AuthError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_admin_ops() {
        let (_, manager) = setup();
        let id = manager
            .register(request("alice", "alice@x.com", "pw123"))
            .await
            .unwrap();

        let all = manager.list_users().await.unwrap();
        assert_eq!(all.len(), 1);

        let user = manager.get_user(id).await.unwrap();
        assert_eq!(user.username.as_deref(), Some("alice"));

        manager.delete_user(id).await.unwrap();
        assert!(matches!(
            manager.get_user(id).await,
            Err(AuthError::UserNotFound)
        ));
        assert!(matches!(
            manager.delete_user(id).await,
            Err(AuthError::UserNotFound)
        ));
    }
}
