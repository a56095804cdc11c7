//! HTTP JSON API for the account service.
//!
//! # Architecture
//!
//! The API is built with:
//! - **Axum**: Async web framework
//! - **Tower**: Middleware for CORS and authentication
//! - **JWT**: Token-based authentication with access/refresh tokens
//!
//! # Modules
//!
//! - [`users`]: Account endpoints (OTP, register, login, logout, token
//!   refresh, user CRUD)
//! - [`middleware`]: Authentication middleware for protected endpoints
//! - [`request_id`]: Request-id generation and propagation
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health                     - Health check (public)
//! POST /api/users/send-otp         - Request an email OTP (public)
//! POST /api/users/verify-otp       - Verify an email OTP (public)
//! POST /api/users/register         - Register user (public)
//! POST /api/users/login            - Login (public)
//! POST /api/users/logout           - Revoke all refresh tokens for a user
//! POST /api/users/token            - Exchange refresh cookie for new tokens
//! GET  /api/users/                 - List users
//! GET  /api/users/{id}             - Get user
//! DELETE /api/users/{id}           - Delete user
//! PATCH /api/users/{id}            - Update password
//! GET  /api/users/protected        - Bearer-gated example route
//! ```
//!
//! # Security
//!
//! - Access tokens expire after 15 minutes and are verified statelessly
//! - Refresh tokens live in an HTTP-only cookie, are persisted server-side,
//!   and rotate on every use
//! - CORS is restricted to `ALLOWED_ORIGIN` when configured, permissive
//!   otherwise

pub mod middleware;
pub mod request_id;
pub mod users;

use axum::{
    Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Json},
    routing::{get, post},
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use user_accounts::auth::{AccountManager, OtpManager, TokenIssuer};

/// Refresh-token cookie parameters.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub secure: bool,
    pub max_age_secs: i64,
}

/// Application state shared across all HTTP handlers.
///
/// Cloned per request (cheap due to Arc wrappers).
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountManager>,
    pub otp: Arc<OtpManager>,
    pub tokens: Arc<TokenIssuer>,
    pub pool: Arc<PgPool>,
    pub cookies: CookieSettings,
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Arguments
///
/// - `state`: Application state with managers
/// - `allowed_origin`: Exact origin allowed for credentialed cross-origin
///   requests; permissive CORS when `None`
pub fn create_router(state: AppState, allowed_origin: Option<String>) -> Router {
    let user_routes = Router::new()
        .route("/send-otp", post(users::send_otp))
        .route("/verify-otp", post(users::verify_otp))
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/logout", post(users::logout))
        .route("/token", post(users::token))
        .route("/", get(users::list_users))
        .route(
            "/{id}",
            get(users::get_user)
                .delete(users::delete_user)
                .patch(users::update_password),
        );

    // Protected routes (require authentication middleware)
    let protected_routes = Router::new()
        .route("/protected", get(users::protected))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/users", user_routes.merge(protected_routes))
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(cors_layer(allowed_origin.as_deref()))
        .with_state(state)
}

/// Build the CORS layer from the configured origin.
///
/// A configured origin gets exact matching with credentials enabled so the
/// refresh cookie survives cross-origin requests; without one the layer is
/// permissive (credentials cannot be combined with a wildcard origin).
fn cors_layer(allowed_origin: Option<&str>) -> CorsLayer {
    match allowed_origin.and_then(|o| o.parse::<HeaderValue>().ok()) {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::PATCH,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_credentials(true),
        None => CorsLayer::permissive(),
    }
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the database answers a trivial query, or
/// `503 Service Unavailable` otherwise.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = sqlx::query("SELECT 1")
        .fetch_one(&*state.pool)
        .await
        .is_ok();

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
