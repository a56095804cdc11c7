//! Authentication middleware for protected endpoints.
//!
//! Two checks run in order on every protected request: a bearer token must
//! be present in the `Authorization` header (else `401 Unauthorized`), and
//! it must verify against the access-token secret (else `403 Forbidden`).
//! On success the decoded [`TokenClaims`] are inserted into request
//! extensions for downstream handlers; no database lookup happens here, so
//! a revoked user passes until their access token expires.
//!
//! # Extracting claims
//!
//! ```rust,no_run
//! use axum::{Extension, response::Json};
//! use user_accounts::auth::TokenClaims;
//!
//! async fn handler(Extension(claims): Extension<TokenClaims>) -> Json<String> {
//!     Json(format!("authenticated as user {}", claims.sub))
//! }
//! # let _ = handler;
//! ```

use axum::{
    extract::{Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};

use super::AppState;
use crate::logging;

/// Validate the bearer access token and inject its claims.
///
/// # Behavior
///
/// - **Missing/malformed header**: `401 Unauthorized`
/// - **Failed verification (bad signature, expired)**: `403 Forbidden`
/// - **Success**: claims inserted into extensions, next handler runs
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let token = match auth_header {
        Some(t) => t,
        None => return Err(StatusCode::UNAUTHORIZED),
    };

    match state.tokens.verify_access_token(token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            Ok(next.run(request).await)
        }
        Err(_) => {
            logging::log_security_event(
                "invalid_access_token",
                "access token failed verification",
            );
            Err(StatusCode::FORBIDDEN)
        }
    }
}
