//! Repository trait definitions for testability and dependency injection.
//!
//! This module provides trait-based abstractions over database operations,
//! enabling better testing through mock implementations and dependency
//! injection. One repository per entity; each method is a single statement
//! so concurrent requests coordinate only through the store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::auth::{AuthResult, Credentials, OtpRecord, User, UserId};

/// Trait for user repository operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a skeleton user holding only an email (OTP-request path)
    async fn create_with_email(&self, email: &str) -> AuthResult<UserId>;

    /// Create a fully registered user
    async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> AuthResult<UserId>;

    /// Find user by email
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    /// Find user by username
    async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>>;

    /// Find user by ID
    async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<User>>;

    /// Fetch login credentials by username or email
    async fn find_credentials(&self, identifier: &str) -> AuthResult<Option<Credentials>>;

    /// List all users
    async fn list(&self) -> AuthResult<Vec<User>>;

    /// Set the verified flag
    async fn mark_verified(&self, user_id: UserId) -> AuthResult<()>;

    /// Replace the stored password hash; false when no such user
    async fn update_password_hash(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> AuthResult<bool>;

    /// Delete a user; false when no such user
    async fn delete(&self, user_id: UserId) -> AuthResult<bool>;
}

/// Trait for OTP record operations
#[async_trait]
pub trait OtpRepository: Send + Sync {
    /// Insert or overwrite the user's OTP record in one statement
    async fn upsert(
        &self,
        user_id: UserId,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()>;

    /// Fetch the user's OTP record, if any
    async fn find_by_user(&self, user_id: UserId) -> AuthResult<Option<OtpRecord>>;

    /// Consume the user's OTP record
    async fn delete_by_user(&self, user_id: UserId) -> AuthResult<()>;
}

/// Trait for refresh token operations
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    /// Persist a refresh token verbatim
    async fn insert(&self, token: &str, user_id: UserId) -> AuthResult<()>;

    /// Whether the token value is in the persisted set
    async fn exists(&self, token: &str) -> AuthResult<bool>;

    /// Delete by exact token value; false when not found
    async fn delete_by_token(&self, token: &str) -> AuthResult<bool>;

    /// Delete every token owned by a user; returns rows removed
    async fn delete_by_user(&self, user_id: UserId) -> AuthResult<u64>;
}

fn row_to_user(row: &sqlx::postgres::PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        verified: row.get("verified"),
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
    }
}

/// Default PostgreSQL implementation of `UserRepository`
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_with_email(&self, email: &str) -> AuthResult<UserId> {
        let row = sqlx::query("INSERT INTO users (email) VALUES ($1) RETURNING id")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("id"))
    }

    async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> AuthResult<UserId> {
        let row = sqlx::query(
            "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("id"))
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, email, verified, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(row_to_user))
    }

    async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, email, verified, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(row_to_user))
    }

    async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, email, verified, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(row_to_user))
    }

    async fn find_credentials(&self, identifier: &str) -> AuthResult<Option<Credentials>> {
        let row = sqlx::query(
            "SELECT id, username, email, password_hash FROM users
             WHERE username = $1 OR email = $1",
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| {
            let username: Option<String> = r.get("username");
            let email: String = r.get("email");
            Credentials {
                user_id: r.get("id"),
                name: username.unwrap_or(email),
                password_hash: r.get("password_hash"),
            }
        }))
    }

    async fn list(&self) -> AuthResult<Vec<User>> {
        let rows =
            sqlx::query("SELECT id, username, email, verified, created_at FROM users ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.iter().map(row_to_user).collect())
    }

    async fn mark_verified(&self, user_id: UserId) -> AuthResult<()> {
        sqlx::query("UPDATE users SET verified = TRUE WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_password_hash(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> AuthResult<bool> {
        let result = sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, user_id: UserId) -> AuthResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Default PostgreSQL implementation of `OtpRepository`
pub struct PgOtpRepository {
    pool: PgPool,
}

impl PgOtpRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OtpRepository for PgOtpRepository {
    async fn upsert(
        &self,
        user_id: UserId,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()> {
        sqlx::query(
            "INSERT INTO otp_codes (user_id, code, expires_at)
             VALUES ($1, $2, $3)
             ON CONFLICT (user_id)
             DO UPDATE SET code = EXCLUDED.code, expires_at = EXCLUDED.expires_at",
        )
        .bind(user_id)
        .bind(code)
        .bind(expires_at.naive_utc())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_user(&self, user_id: UserId) -> AuthResult<Option<OtpRecord>> {
        let row = sqlx::query("SELECT user_id, code, expires_at FROM otp_codes WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| OtpRecord {
            user_id: r.get("user_id"),
            code: r.get("code"),
            expires_at: r.get::<chrono::NaiveDateTime, _>("expires_at").and_utc(),
        }))
    }

    async fn delete_by_user(&self, user_id: UserId) -> AuthResult<()> {
        sqlx::query("DELETE FROM otp_codes WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Default PostgreSQL implementation of `RefreshTokenRepository`
pub struct PgRefreshTokenRepository {
    pool: PgPool,
}

impl PgRefreshTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenRepository for PgRefreshTokenRepository {
    async fn insert(&self, token: &str, user_id: UserId) -> AuthResult<()> {
        sqlx::query("INSERT INTO refresh_tokens (token, user_id) VALUES ($1, $2)")
            .bind(token)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn exists(&self, token: &str) -> AuthResult<bool> {
        let row = sqlx::query("SELECT 1 AS present FROM refresh_tokens WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn delete_by_token(&self, token: &str) -> AuthResult<bool> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_user(&self, user_id: UserId) -> AuthResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Mock implementations for testing
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct StoredUser {
        user: User,
        password_hash: Option<String>,
    }

    pub struct MockUserRepository {
        users: Arc<Mutex<HashMap<UserId, StoredUser>>>,
        next_id: Arc<Mutex<UserId>>,
    }

    impl Default for MockUserRepository {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockUserRepository {
        pub fn new() -> Self {
            Self {
                users: Arc::new(Mutex::new(HashMap::new())),
                next_id: Arc::new(Mutex::new(1)),
            }
        }

        fn allocate_id(&self) -> UserId {
            let mut next_id = self.next_id.lock().unwrap();
            let id = *next_id;
            *next_id += 1;
            id
        }

        /// Stored hash for a user, for assertions
        pub fn password_hash(&self, user_id: UserId) -> Option<String> {
            self.users
                .lock()
                .unwrap()
                .get(&user_id)
                .and_then(|s| s.password_hash.clone())
        }
    }

    #[async_trait]
    impl UserRepository for MockUserRepository {
        async fn create_with_email(&self, email: &str) -> AuthResult<UserId> {
            let id = self.allocate_id();
            let user = User {
                id,
                username: None,
                email: email.to_string(),
                verified: false,
                created_at: Utc::now(),
            };
            self.users
                .lock()
                .unwrap()
                .insert(id, StoredUser { user, password_hash: None });
            Ok(id)
        }

        async fn create(
            &self,
            username: &str,
            email: &str,
            password_hash: &str,
        ) -> AuthResult<UserId> {
            let id = self.allocate_id();
            let user = User {
                id,
                username: Some(username.to_string()),
                email: email.to_string(),
                verified: false,
                created_at: Utc::now(),
            };
            self.users.lock().unwrap().insert(
                id,
                StoredUser {
                    user,
                    password_hash: Some(password_hash.to_string()),
                },
            );
            Ok(id)
        }

        async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
            let users = self.users.lock().unwrap();
            Ok(users
                .values()
                .find(|s| s.user.email == email)
                .map(|s| s.user.clone()))
        }

        async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>> {
            let users = self.users.lock().unwrap();
            Ok(users
                .values()
                .find(|s| s.user.username.as_deref() == Some(username))
                .map(|s| s.user.clone()))
        }

        async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<User>> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .get(&user_id)
                .map(|s| s.user.clone()))
        }

        async fn find_credentials(&self, identifier: &str) -> AuthResult<Option<Credentials>> {
            let users = self.users.lock().unwrap();
            Ok(users
                .values()
                .find(|s| {
                    s.user.username.as_deref() == Some(identifier) || s.user.email == identifier
                })
                .map(|s| Credentials {
                    user_id: s.user.id,
                    name: s
                        .user
                        .username
                        .clone()
                        .unwrap_or_else(|| s.user.email.clone()),
                    password_hash: s.password_hash.clone(),
                }))
        }

        async fn list(&self) -> AuthResult<Vec<User>> {
            let users = self.users.lock().unwrap();
            let mut all: Vec<User> = users.values().map(|s| s.user.clone()).collect();
            all.sort_by_key(|u| u.id);
            Ok(all)
        }

        async fn mark_verified(&self, user_id: UserId) -> AuthResult<()> {
            if let Some(stored) = self.users.lock().unwrap().get_mut(&user_id) {
                stored.user.verified = true;
            }
            Ok(())
        }

        async fn update_password_hash(
            &self,
            user_id: UserId,
            password_hash: &str,
        ) -> AuthResult<bool> {
            let mut users = self.users.lock().unwrap();
            match users.get_mut(&user_id) {
                Some(stored) => {
                    stored.password_hash = Some(password_hash.to_string());
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn delete(&self, user_id: UserId) -> AuthResult<bool> {
            Ok(self.users.lock().unwrap().remove(&user_id).is_some())
        }
    }

    #[derive(Default)]
    pub struct MockOtpRepository {
        records: Arc<Mutex<HashMap<UserId, OtpRecord>>>,
    }

    impl MockOtpRepository {
        pub fn new() -> Self {
            Self::default()
        }

        /// Stored code for a user, for assertions
        pub fn stored_code(&self, user_id: UserId) -> Option<String> {
            self.records
                .lock()
                .unwrap()
                .get(&user_id)
                .map(|r| r.code.clone())
        }
    }

    #[async_trait]
    impl OtpRepository for MockOtpRepository {
        async fn upsert(
            &self,
            user_id: UserId,
            code: &str,
            expires_at: DateTime<Utc>,
        ) -> AuthResult<()> {
            self.records.lock().unwrap().insert(
                user_id,
                OtpRecord {
                    user_id,
                    code: code.to_string(),
                    expires_at,
                },
            );
            Ok(())
        }

        async fn find_by_user(&self, user_id: UserId) -> AuthResult<Option<OtpRecord>> {
            Ok(self.records.lock().unwrap().get(&user_id).cloned())
        }

        async fn delete_by_user(&self, user_id: UserId) -> AuthResult<()> {
            self.records.lock().unwrap().remove(&user_id);
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct MockRefreshTokenRepository {
        tokens: Arc<Mutex<HashMap<String, UserId>>>,
    }

    impl MockRefreshTokenRepository {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn count_for(&self, user_id: UserId) -> usize {
            self.tokens
                .lock()
                .unwrap()
                .values()
                .filter(|owner| **owner == user_id)
                .count()
        }
    }

    #[async_trait]
    impl RefreshTokenRepository for MockRefreshTokenRepository {
        async fn insert(&self, token: &str, user_id: UserId) -> AuthResult<()> {
            self.tokens
                .lock()
                .unwrap()
                .insert(token.to_string(), user_id);
            Ok(())
        }

        async fn exists(&self, token: &str) -> AuthResult<bool> {
            Ok(self.tokens.lock().unwrap().contains_key(token))
        }

        async fn delete_by_token(&self, token: &str) -> AuthResult<bool> {
            Ok(self.tokens.lock().unwrap().remove(token).is_some())
        }

        async fn delete_by_user(&self, user_id: UserId) -> AuthResult<u64> {
            let mut tokens = self.tokens.lock().unwrap();
            let before = tokens.len();
            tokens.retain(|_, owner| *owner != user_id);
            Ok((before - tokens.len()) as u64)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_user_lookup_paths() {
            let repo = MockUserRepository::new();

            let skeleton = repo.create_with_email("otp@example.com").await.unwrap();
            let registered = repo
                .create("alice", "alice@example.com", "hash123")
                .await
                .unwrap();
            assert_eq!(skeleton, 1);
            assert_eq!(registered, 2);

            let by_email = repo.find_by_email("otp@example.com").await.unwrap().unwrap();
            assert!(by_email.username.is_none());
            assert!(!by_email.verified);

            let by_username = repo.find_by_username("alice").await.unwrap().unwrap();
            assert_eq!(by_username.id, registered);

            assert!(repo.find_by_id(999).await.unwrap().is_none());
        }

        #[tokio::test]
        async fn test_mock_credentials_match_username_or_email() {
            let repo = MockUserRepository::new();
            let id = repo
                .create("bob", "bob@example.com", "hash456")
                .await
                .unwrap();

            let by_username = repo.find_credentials("bob").await.unwrap().unwrap();
            let by_email = repo
                .find_credentials("bob@example.com")
                .await
                .unwrap()
                .unwrap();
            assert_eq!(by_username.user_id, id);
            assert_eq!(by_email.user_id, id);
            assert_eq!(by_username.name, "bob");

            assert!(repo.find_credentials("nobody").await.unwrap().is_none());
        }

        #[tokio::test]
        async fn test_mock_otp_upsert_overwrites() {
            let repo = MockOtpRepository::new();
            let expires = Utc::now() + chrono::Duration::minutes(10);

            repo.upsert(1, "111111", expires).await.unwrap();
            repo.upsert(1, "222222", expires).await.unwrap();

            let record = repo.find_by_user(1).await.unwrap().unwrap();
            assert_eq!(record.code, "222222");

            repo.delete_by_user(1).await.unwrap();
            assert!(repo.find_by_user(1).await.unwrap().is_none());
        }

        #[tokio::test]
        async fn test_mock_refresh_tokens_delete_by_user() {
            let repo = MockRefreshTokenRepository::new();
            repo.insert("tok-a", 1).await.unwrap();
            repo.insert("tok-b", 1).await.unwrap();
            repo.insert("tok-c", 2).await.unwrap();

            assert!(repo.exists("tok-a").await.unwrap());
            assert_eq!(repo.delete_by_user(1).await.unwrap(), 2);
            assert!(!repo.exists("tok-a").await.unwrap());
            assert!(repo.exists("tok-c").await.unwrap());
        }
    }
}
