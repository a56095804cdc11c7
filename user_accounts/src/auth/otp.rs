//! One-time-password issuance and verification.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::Rng;
use subtle::ConstantTimeEq;

use super::errors::{AuthError, AuthResult};
use crate::db::{OtpRepository, UserRepository};
use crate::mail::{MailMessage, Mailer};

/// OTP issuance settings.
#[derive(Debug, Clone, Copy)]
pub struct OtpConfig {
    /// Number of digits in a generated code
    pub digits: usize,
    /// Minutes until a generated code expires
    pub expiry_minutes: i64,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            digits: 6,
            expiry_minutes: 10,
        }
    }
}

/// Issues and validates single-use numeric email codes.
///
/// Stateless over the user and OTP repositories; at most one live code per
/// user is maintained via a conflict-resolving upsert.
pub struct OtpManager {
    users: Arc<dyn UserRepository>,
    otps: Arc<dyn OtpRepository>,
    mailer: Arc<dyn Mailer>,
    digits: usize,
    expiry: Duration,
}

impl OtpManager {
    pub fn new(
        users: Arc<dyn UserRepository>,
        otps: Arc<dyn OtpRepository>,
        mailer: Arc<dyn Mailer>,
        config: OtpConfig,
    ) -> Self {
        Self {
            users,
            otps,
            mailer,
            digits: config.digits,
            expiry: Duration::minutes(config.expiry_minutes),
        }
    }

    /// Generate a fresh code for the address, creating the user if absent.
    ///
    /// The code is persisted before the email is attempted, so a delivery
    /// failure leaves a valid code behind; the caller can simply request a
    /// new one.
    ///
    /// # Errors
    ///
    /// * `AuthError::AlreadyVerified` - User has already completed verification
    /// * `AuthError::NotificationFailed` - Email delivery failed (code persisted)
    pub async fn request_otp(&self, email: &str) -> AuthResult<()> {
        if email.trim().is_empty() {
            return Err(AuthError::Validation("Email is required".to_string()));
        }

        let user_id = match self.users.find_by_email(email).await? {
            Some(user) if user.verified => return Err(AuthError::AlreadyVerified),
            Some(user) => user.id,
            None => self.users.create_with_email(email).await?,
        };

        let code = generate_code(self.digits);
        let expires_at = Utc::now() + self.expiry;

        // Upsert keyed by user id: only the newest code stays valid.
        self.otps.upsert(user_id, &code, expires_at).await?;

        let message = MailMessage {
            to: email.to_string(),
            subject: "Your OTP for Registration".to_string(),
            body: format!(
                "Your OTP is {code}. It will expire in {} minutes.",
                self.expiry.num_minutes()
            ),
        };

        if let Err(err) = self.mailer.send(&message).await {
            log::warn!("OTP email delivery to {email} failed: {err}");
            return Err(AuthError::NotificationFailed);
        }

        Ok(())
    }

    /// Validate a submitted code and consume it.
    ///
    /// On success the user's verified flag is set and the record deleted, so
    /// a matching, unexpired code can be consumed exactly once. Failure
    /// paths never touch the verified flag.
    ///
    /// # Errors
    ///
    /// * `AuthError::UserNotFound` - No user for that email
    /// * `AuthError::OtpNotFound` - No live code for that user
    /// * `AuthError::InvalidOtp` - Submitted code does not match exactly
    /// * `AuthError::OtpExpired` - Stored code is past its expiration
    pub async fn verify_otp(&self, email: &str, code: &str) -> AuthResult<()> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let record = self
            .otps
            .find_by_user(user.id)
            .await?
            .ok_or(AuthError::OtpNotFound)?;

        if !codes_match(&record.code, code) {
            return Err(AuthError::InvalidOtp);
        }
        if Utc::now() > record.expires_at {
            return Err(AuthError::OtpExpired);
        }

        self.users.mark_verified(user.id).await?;
        // Deleting the record is the single-use consumption.
        self.otps.delete_by_user(user.id).await?;

        Ok(())
    }
}

/// Each digit uniformly random 0-9, sampled independently.
fn generate_code(digits: usize) -> String {
    let mut rng = rand::rng();
    (0..digits)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

/// Exact, constant-time string equality; no normalization.
fn codes_match(stored: &str, submitted: &str) -> bool {
    stored.len() == submitted.len()
        && bool::from(stored.as_bytes().ct_eq(submitted.as_bytes()))
}
