//! # User Accounts
//!
//! A user-account and authentication library: registration with email
//! one-time-password (OTP) verification, password-based login, and JWT
//! access/refresh token issuance with server-side refresh-token revocation.
//!
//! ## Architecture
//!
//! Durable state lives in PostgreSQL behind per-entity repository traits;
//! the managers in [`auth`] are stateless logic layers holding nothing but
//! their configuration (signing secrets, expiry durations, hash cost).
//!
//! - [`auth::OtpManager`]: single-use numeric email codes proving control
//!   of an address
//! - [`auth::AccountManager`]: registration and credential verification
//!   over Argon2id hashes
//! - [`auth::TokenIssuer`]: access/refresh JWT pairs, rotation on use, and
//!   revocation by value or by user
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use user_accounts::auth::{AccountManager, RegisterRequest, TokenIssuer};
//! use user_accounts::db::{Database, DatabaseConfig, PgRefreshTokenRepository, PgUserRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&DatabaseConfig::default()).await?;
//!     let users = Arc::new(PgUserRepository::new(db.pool().clone()));
//!     let refresh = Arc::new(PgRefreshTokenRepository::new(db.pool().clone()));
//!     let tokens = Arc::new(TokenIssuer::new(
//!         refresh,
//!         "access_secret".to_string(),
//!         "refresh_secret".to_string(),
//!         chrono::Duration::minutes(15),
//!         chrono::Duration::days(7),
//!     ));
//!     let accounts = AccountManager::new(users, tokens, 2);
//!
//!     let user_id = accounts
//!         .register(RegisterRequest {
//!             username: "alice".to_string(),
//!             email: "alice@example.com".to_string(),
//!             password: "correct horse battery".to_string(),
//!         })
//!         .await?;
//!     println!("Registered user {user_id}");
//!     Ok(())
//! }
//! ```

/// Authentication managers, models, and errors.
pub mod auth;

/// PostgreSQL pool, configuration, and repository traits.
pub mod db;

/// Mail delivery abstraction for OTP notification.
pub mod mail;
