//! HTTP server for the user-account service.
//!
//! Exposes the [`api`] router over the managers from the `user_accounts`
//! library, plus configuration, logging, and metrics plumbing.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
