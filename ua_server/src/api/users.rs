//! Account API handlers.
//!
//! This module provides the HTTP REST endpoints for the account service:
//! - Email OTP request and verification
//! - User registration and login
//! - Logout and refresh-token exchange
//! - Basic user CRUD
//!
//! All endpoints return JSON bodies with a `message` field on both the
//! success and error paths (error bodies stay deliberately vague where user
//! enumeration is a concern).
//!
//! # Examples
//!
//! Request an OTP:
//! ```bash
//! curl -X POST http://localhost:4000/api/users/send-otp \
//!   -H "Content-Type: application/json" \
//!   -d '{"email": "new@example.com"}'
//! ```
//!
//! Login:
//! ```bash
//! curl -X POST http://localhost:4000/api/users/login \
//!   -H "Content-Type: application/json" \
//!   -d '{"username": "alice", "password": "pw123"}'
//! ```

use axum::{
    Extension,
    extract::{Path, State},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{COOKIE, SET_COOKIE},
    },
    response::Json,
};
use serde::{Deserialize, Serialize};
use user_accounts::auth::{AuthError, RegisterRequest, TokenClaims, User, UserId};

use super::AppState;
use crate::metrics;

/// Name of the refresh-token cookie.
pub const REFRESH_COOKIE: &str = "refreshToken";

#[derive(Debug, Deserialize)]
pub struct SendOtpPayload {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpPayload {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub otp: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterPayload {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    pub username: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutPayload {
    /// Revoke a single session by exact token value
    pub refresh_token: Option<String>,
    /// Revoke every session for a user
    pub user_id: Option<UserId>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordPayload {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub message: String,
    pub user_id: UserId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

/// Map a domain error onto a status code and a client-safe body.
///
/// Collaborator failures are logged here and collapsed to a generic 500.
fn error_response(err: AuthError) -> HandlerError {
    let status = match &err {
        AuthError::UserNotFound => StatusCode::NOT_FOUND,
        AuthError::InvalidRefreshToken => StatusCode::FORBIDDEN,
        AuthError::Database(_)
        | AuthError::Jwt(_)
        | AuthError::HashingFailed
        | AuthError::NotificationFailed => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("request failed: {err}");
    }

    (
        status,
        Json(ErrorResponse {
            message: err.client_message(),
        }),
    )
}

fn message(text: impl Into<String>) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: text.into(),
    })
}

/// Build the `Set-Cookie` header carrying a refresh token.
fn refresh_cookie(
    token: &str,
    max_age_secs: i64,
    secure: bool,
) -> Result<HeaderValue, HandlerError> {
    let mut cookie =
        format!("{REFRESH_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).map_err(|_| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                message: "Internal Server Error".to_string(),
            }),
        )
    })
}

/// Extract a cookie value from the `Cookie` header, if present.
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == name {
            return Some(val.to_string());
        }
    }
    None
}

/// Request an OTP for an email address, creating the account if absent.
///
/// # Errors
///
/// - `400 Bad Request`: User already verified
/// - `500 Internal Server Error`: Store failure or mail delivery failure
///   (the generated code stays valid either way)
pub async fn send_otp(
    State(state): State<AppState>,
    Json(payload): Json<SendOtpPayload>,
) -> Result<Json<MessageResponse>, HandlerError> {
    state
        .otp
        .request_otp(&payload.email)
        .await
        .map_err(error_response)?;

    metrics::otp_requests_total();
    Ok(message("OTP sent successfully."))
}

/// Verify a submitted OTP and mark the account verified.
///
/// # Errors
///
/// - `404 Not Found`: No user for that email
/// - `400 Bad Request`: Missing, mismatched, or expired code
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpPayload>,
) -> Result<Json<MessageResponse>, HandlerError> {
    match state.otp.verify_otp(&payload.email, &payload.otp).await {
        Ok(()) => {
            metrics::otp_verifications_total(true);
            Ok(message("User verified successfully."))
        }
        Err(err) => {
            metrics::otp_verifications_total(false);
            Err(error_response(err))
        }
    }
}

/// Register a new user account.
///
/// # Response
///
/// On success, returns `201 Created`:
/// ```json
/// {
///   "message": "User created successfully",
///   "userId": 42
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing fields, username or email already taken
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<(StatusCode, Json<RegisterResponse>), HandlerError> {
    let request = RegisterRequest {
        username: payload.username,
        email: payload.email,
        password: payload.password,
    };

    let user_id = state
        .accounts
        .register(request)
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User created successfully".to_string(),
            user_id,
        }),
    ))
}

/// Authenticate a user and issue a token pair.
///
/// The refresh token is set as an HTTP-only cookie; only the access token
/// appears in the body. Unknown users and wrong passwords produce the same
/// 400 response.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<(HeaderMap, Json<TokenResponse>), HandlerError> {
    let identifier = payload
        .username
        .or(payload.email)
        .unwrap_or_default();

    match state.accounts.login(&identifier, &payload.password).await {
        Ok(pair) => {
            metrics::login_attempts_total(true);

            let mut headers = HeaderMap::new();
            headers.insert(
                SET_COOKIE,
                refresh_cookie(
                    &pair.refresh_token,
                    state.cookies.max_age_secs,
                    state.cookies.secure,
                )?,
            );

            Ok((
                headers,
                Json(TokenResponse {
                    access_token: pair.access_token,
                }),
            ))
        }
        Err(err) => {
            metrics::login_attempts_total(false);
            Err(error_response(err))
        }
    }
}

/// Revoke refresh tokens: one by exact value, or all for a user.
pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<LogoutPayload>,
) -> Result<Json<MessageResponse>, HandlerError> {
    if let Some(token) = payload.refresh_token {
        let deleted = state
            .tokens
            .revoke_token(&token)
            .await
            .map_err(error_response)?;
        let text = if deleted {
            "Token deleted successfully"
        } else {
            "Token not found"
        };
        return Ok(message(text));
    }

    let Some(user_id) = payload.user_id else {
        return Err(error_response(AuthError::Validation(
            "Token or User ID required for deletion".to_string(),
        )));
    };

    let removed = state
        .tokens
        .revoke_all(user_id)
        .await
        .map_err(error_response)?;

    let text = if removed > 0 {
        "User tokens deleted successfully"
    } else {
        "No tokens found for this user"
    };
    Ok(message(text))
}

/// Exchange the refresh-token cookie for a new access token.
///
/// The presented refresh token is rotated: it is removed from the persisted
/// set and the replacement is set as a new cookie alongside the response.
///
/// # Errors
///
/// - `403 Forbidden`: Missing cookie, token not in the persisted set, or
///   failed signature verification
pub async fn token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(HeaderMap, Json<TokenResponse>), HandlerError> {
    let Some(refresh_token) = cookie_value(&headers, REFRESH_COOKIE) else {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ErrorResponse {
                message: "Invalid refresh token".to_string(),
            }),
        ));
    };

    let pair = state
        .tokens
        .refresh(&refresh_token)
        .await
        .map_err(error_response)?;

    metrics::token_rotations_total();

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        SET_COOKIE,
        refresh_cookie(
            &pair.refresh_token,
            state.cookies.max_age_secs,
            state.cookies.secure,
        )?,
    );

    Ok((
        response_headers,
        Json(TokenResponse {
            access_token: pair.access_token,
        }),
    ))
}

/// List all users. Password hashes never leave the store.
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, HandlerError> {
    let users = state.accounts.list_users().await.map_err(error_response)?;
    Ok(Json(users))
}

/// Fetch a single user by id.
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<User>, HandlerError> {
    let user = state.accounts.get_user(id).await.map_err(error_response)?;
    Ok(Json(user))
}

/// Delete a user by id.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<MessageResponse>, HandlerError> {
    state
        .accounts
        .delete_user(id)
        .await
        .map_err(error_response)?;
    Ok(message(format!("User with ID {id} deleted successfully.")))
}

/// Replace a user's password.
pub async fn update_password(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(payload): Json<UpdatePasswordPayload>,
) -> Result<Json<MessageResponse>, HandlerError> {
    state
        .accounts
        .update_password(id, &payload.password)
        .await
        .map_err(error_response)?;
    Ok(message("Password updated successfully."))
}

/// Example bearer-gated route; claims come from the auth middleware.
pub async fn protected(Extension(claims): Extension<TokenClaims>) -> Json<MessageResponse> {
    message(format!("Hello {}, you are authenticated.", claims.name))
}
