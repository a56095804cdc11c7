//! Authentication data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User ID type
pub type UserId = i64;

/// User model as exposed through the API.
///
/// The password hash stays inside the store and [`Credentials`]; it is never
/// serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Absent until the user completes registration (an OTP request alone
    /// creates a row with only an email).
    pub username: Option<String>,
    pub email: String,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Login credential row fetched by identifier (username or email).
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user_id: UserId,
    /// Display name embedded in token claims; the username, or the email
    /// for rows created by an OTP request.
    pub name: String,
    /// Absent for users created by an OTP request who never registered.
    pub password_hash: Option<String>,
}

/// One OTP record per user at most; overwritten on each request.
#[derive(Debug, Clone)]
pub struct OtpRecord {
    pub user_id: UserId,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// User registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// JWT claims shared by access and refresh tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: UserId,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

/// Access/refresh token pair issued on login and on rotation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}
