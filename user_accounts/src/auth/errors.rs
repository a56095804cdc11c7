//! Authentication error types.

use thiserror::Error;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Missing or malformed input
    #[error("{0}")]
    Validation(String),

    /// Username already exists
    #[error("Username already taken")]
    UsernameTaken,

    /// Email already exists
    #[error("Email already taken")]
    EmailTaken,

    /// User already completed OTP verification
    #[error("User already verified.")]
    AlreadyVerified,

    /// User not found
    #[error("User not found.")]
    UserNotFound,

    /// No OTP record exists for the user
    #[error("OTP not found. Please request a new one.")]
    OtpNotFound,

    /// Submitted code does not match the stored code
    #[error("Invalid OTP.")]
    InvalidOtp,

    /// Stored code is past its expiration timestamp
    #[error("OTP has expired. Please request a new one.")]
    OtpExpired,

    /// Unknown user or wrong password; deliberately indistinguishable
    #[error("Invalid username, email, or password")]
    InvalidCredentials,

    /// Refresh token missing from the persisted set or failed verification
    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    /// OTP email could not be delivered
    #[error("Error sending OTP.")]
    NotificationFailed,

    /// Password hashing failed
    #[error("Password hashing failed")]
    HashingFailed,

    /// JWT token error
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

impl AuthError {
    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Database and JWT errors are sanitized to prevent information disclosure
    /// about the internal system structure.
    pub fn client_message(&self) -> String {
        match self {
            // Sanitize database errors - don't expose SQL details
            AuthError::Database(_) => "Internal Server Error".to_string(),
            // Sanitize JWT errors - don't expose token structure
            AuthError::Jwt(_) => "Authentication failed".to_string(),
            // All other errors are safe to expose
            _ => self.to_string(),
        }
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;
