//! User-account HTTP server.
//!
//! Wires the account, OTP, and token managers over a PostgreSQL pool and
//! serves the JSON API with axum.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use chrono::Duration;
use ctrlc::set_handler;
use pico_args::Arguments;
use tracing::info;
use user_accounts::{
    auth::{AccountManager, OtpConfig, OtpManager, TokenIssuer},
    db::{Database, PgOtpRepository, PgRefreshTokenRepository, PgUserRepository, UserRepository},
    mail::{HttpApiMailer, LogMailer, Mailer},
};

use ua_server::api::{self, AppState, CookieSettings};
use ua_server::config::ServerConfig;
use ua_server::{logging, metrics};

const HELP: &str = "\
Run the user-account service

USAGE:
  ua_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:4000]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:4000)
  DATABASE_URL             PostgreSQL connection string
  ACCESS_TOKEN_SECRET      Access token signing secret
  REFRESH_TOKEN_SECRET     Refresh token signing secret
  OTP_DIGITS               Digits per OTP code (default 6)
  OTP_EXPIRY_MINUTES       Minutes until an OTP expires (default 10)
  ALLOWED_ORIGIN           Origin allowed for cross-origin requests
  MAIL_API_URL             HTTP mail API endpoint (log-only mailer when unset)
  (See .env file for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind_override: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let database_url_override: Option<String> = pargs.opt_value_from_str("--db-url")?;

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    logging::init();

    let config = ServerConfig::from_env(bind_override, database_url_override)?;
    config.validate()?;

    info!("Starting user-account server at {}", config.bind);

    let db = Database::new(&config.database)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
    info!("Database connected successfully");

    sqlx::migrate!("./migrations")
        .run(db.pool())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(Error::msg)?;
        info!("Metrics exporter listening on {addr}");
    }

    // Repositories over the shared pool
    let users: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(db.pool().clone()));
    let otp_repo = Arc::new(PgOtpRepository::new(db.pool().clone()));
    let refresh_repo = Arc::new(PgRefreshTokenRepository::new(db.pool().clone()));

    let mailer: Arc<dyn Mailer> = match &config.mail.api_url {
        Some(url) => Arc::new(HttpApiMailer::new(
            url.clone(),
            config.mail.api_key.clone(),
            config.mail.sender_email.clone(),
            config.mail.sender_name.clone(),
        )),
        None => {
            info!("MAIL_API_URL not set; OTP emails will be logged, not sent");
            Arc::new(LogMailer)
        }
    };

    let tokens = Arc::new(TokenIssuer::new(
        refresh_repo,
        config.security.access_token_secret.clone(),
        config.security.refresh_token_secret.clone(),
        Duration::minutes(config.security.access_ttl_minutes),
        Duration::days(config.security.refresh_ttl_days),
    ));
    let accounts = Arc::new(AccountManager::new(
        users.clone(),
        tokens.clone(),
        config.security.hash_time_cost,
    ));
    let otp = Arc::new(OtpManager::new(
        users,
        otp_repo,
        mailer,
        OtpConfig {
            digits: config.otp.digits,
            expiry_minutes: config.otp.expiry_minutes,
        },
    ));

    let state = AppState {
        accounts,
        otp,
        tokens,
        pool: Arc::new(db.pool().clone()),
        cookies: CookieSettings {
            secure: config.cookie_secure,
            max_age_secs: config.security.refresh_ttl_days * 86_400,
        },
    };

    let app = api::create_router(state, config.allowed_origin.clone());

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
}
