//! Quillboard - social blogging backend
//!
//! Profiles, articles, comments and subscriptions, with a four-level role
//! hierarchy gating bans, reports, role changes and deletions.

pub mod account;
pub mod activity;
pub mod api;
pub mod auth;
pub mod config;
pub mod content;
pub mod context;
pub mod db;
pub mod error;
pub mod mailer;
pub mod metrics;
pub mod moderation;
pub mod rate_limit;
pub mod server;
pub mod validation;

pub use config::ServerConfig;
pub use context::AppContext;
pub use error::{ApiError, ApiResult};
