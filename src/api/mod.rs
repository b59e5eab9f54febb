/// API routes and handlers
pub mod accounts;
pub mod activities;
pub mod articles;
pub mod auth;
pub mod comments;
pub mod health;
pub mod home;
pub mod lists;
pub mod middleware;
pub mod profiles;

use crate::context::AppContext;
use axum::Router;
use serde::Deserialize;
use validator::Validate;

/// Body of ban and unban requests. Length rules live in the moderation service.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ReasonRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReportRequest {
    pub content: String,
}

/// Build the routes mounted under `/api`
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(auth::routes())
        .merge(accounts::routes())
        .merge(profiles::routes())
        .merge(articles::routes())
        .merge(comments::routes())
        .merge(home::routes())
        .merge(lists::routes())
        .merge(activities::routes())
}
