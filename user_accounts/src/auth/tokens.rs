//! Access/refresh token issuance, rotation, and revocation.

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

use super::errors::{AuthError, AuthResult};
use super::models::{TokenClaims, TokenPair, UserId};
use crate::db::RefreshTokenRepository;

/// Mints access/refresh JWT pairs and manages the persisted refresh set.
///
/// Access tokens are stateless and verified by signature alone; refresh
/// tokens are signed with a separate secret and additionally persisted
/// verbatim, so they can be revoked by value and are rotated on every use.
pub struct TokenIssuer {
    store: Arc<dyn RefreshTokenRepository>,
    access_secret: String,
    refresh_secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    /// Create a new token issuer
    ///
    /// # Arguments
    ///
    /// * `store` - Refresh token repository
    /// * `access_secret` - Secret for signing access tokens
    /// * `refresh_secret` - Separate secret for signing refresh tokens
    /// * `access_ttl` - Access token lifetime (15 minutes in production)
    /// * `refresh_ttl` - Refresh token lifetime (7 days in production)
    pub fn new(
        store: Arc<dyn RefreshTokenRepository>,
        access_secret: String,
        refresh_secret: String,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            store,
            access_secret,
            refresh_secret,
            access_ttl,
            refresh_ttl,
        }
    }

    /// Issue an access/refresh pair and persist the refresh token.
    pub async fn issue_pair(&self, user_id: UserId, name: &str) -> AuthResult<TokenPair> {
        let access_token = self.sign(user_id, name, &self.access_secret, self.access_ttl)?;
        let refresh_token = self.sign(user_id, name, &self.refresh_secret, self.refresh_ttl)?;

        self.store.insert(&refresh_token, user_id).await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Exchange a refresh token for a fresh pair, rotating the stored token.
    ///
    /// A token missing from the persisted set is rejected even when its
    /// signature verifies, so revocation wins over cryptographic validity.
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidRefreshToken` - Unknown, expired, or forged token
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenPair> {
        if !self.store.exists(refresh_token).await? {
            return Err(AuthError::InvalidRefreshToken);
        }

        let claims = decode::<TokenClaims>(
            refresh_token,
            &DecodingKey::from_secret(self.refresh_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AuthError::InvalidRefreshToken)?
        .claims;

        // Rotation: the presented token is consumed before the new pair
        // is issued.
        self.store.delete_by_token(refresh_token).await?;

        self.issue_pair(claims.sub, &claims.name).await
    }

    /// Delete a refresh token by exact value; false when not found.
    pub async fn revoke_token(&self, refresh_token: &str) -> AuthResult<bool> {
        Ok(self.store.delete_by_token(refresh_token).await?)
    }

    /// Delete every refresh token for a user; returns rows removed.
    pub async fn revoke_all(&self, user_id: UserId) -> AuthResult<u64> {
        Ok(self.store.delete_by_user(user_id).await?)
    }

    /// Verify an access token and return its claims.
    ///
    /// Stateless: no store lookup, so a revoked user passes until the
    /// access token naturally expires.
    pub fn verify_access_token(&self, token: &str) -> AuthResult<TokenClaims> {
        let token_data = decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(self.access_secret.as_bytes()),
            &Validation::default(),
        )?;

        Ok(token_data.claims)
    }

    fn sign(&self, user_id: UserId, name: &str, secret: &str, ttl: Duration) -> AuthResult<String> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: user_id,
            name: name.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )?;

        Ok(token)
    }
}
