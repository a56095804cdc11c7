//! Authentication module providing OTP verification, credential checks,
//! and token lifecycle management.
//!
//! This module implements:
//! - Email OTP request/verification with single-use, upsert-per-user codes
//! - Argon2id password hashing with configurable time cost
//! - JWT access tokens (15-minute expiry by default)
//! - Rotating refresh tokens, persisted server-side for revocation
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use user_accounts::auth::{OtpConfig, OtpManager};
//! use user_accounts::db::{Database, DatabaseConfig, PgOtpRepository, PgUserRepository};
//! use user_accounts::mail::LogMailer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&DatabaseConfig::default()).await?;
//!     let otp = OtpManager::new(
//!         Arc::new(PgUserRepository::new(db.pool().clone())),
//!         Arc::new(PgOtpRepository::new(db.pool().clone())),
//!         Arc::new(LogMailer),
//!         OtpConfig::default(),
//!     );
//!
//!     otp.request_otp("new@example.com").await?;
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod manager;
pub mod models;
pub mod otp;
pub mod tokens;

pub use errors::{AuthError, AuthResult};
pub use manager::AccountManager;
pub use models::{
    Credentials, OtpRecord, RegisterRequest, TokenClaims, TokenPair, User, UserId,
};
pub use otp::{OtpConfig, OtpManager};
pub use tokens::TokenIssuer;
