/// Staff listings. Admin or superadmin only.
use crate::{
    auth::ActiveAuthContext,
    context::AppContext,
    error::ApiResult,
    moderation::Role,
};
use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

/// Build list routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/list/moderators", get(moderators))
        .route("/list/notes", get(notes))
        .route("/list/profiles", get(profiles))
        .route("/list/reports/articles", get(reported_articles))
        .route("/list/reports/comments", get(reported_comments))
        .route("/list/reports/profiles", get(reported_profiles))
}

async fn moderators(State(ctx): State<AppContext>, auth: ActiveAuthContext) -> ApiResult<Json<Value>> {
    crate::require_role!(auth.role(), Role::Admin)?;
    Ok(Json(json!({ "moderators": ctx.lists.moderators().await? })))
}

async fn notes(State(ctx): State<AppContext>, auth: ActiveAuthContext) -> ApiResult<Json<Value>> {
    crate::require_role!(auth.role(), Role::Admin)?;
    Ok(Json(json!({ "notes": ctx.lists.notes().await? })))
}

async fn profiles(State(ctx): State<AppContext>, auth: ActiveAuthContext) -> ApiResult<Json<Value>> {
    crate::require_role!(auth.role(), Role::Admin)?;
    Ok(Json(json!({ "state": "allProfiles", "profiles": ctx.lists.profiles().await? })))
}

async fn reported_articles(State(ctx): State<AppContext>, auth: ActiveAuthContext) -> ApiResult<Json<Value>> {
    crate::require_role!(auth.role(), Role::Admin)?;
    Ok(Json(json!({ "articles": ctx.lists.reported_articles().await? })))
}

async fn reported_comments(State(ctx): State<AppContext>, auth: ActiveAuthContext) -> ApiResult<Json<Value>> {
    crate::require_role!(auth.role(), Role::Admin)?;
    Ok(Json(json!({ "comments": ctx.lists.reported_comments().await? })))
}

async fn reported_profiles(State(ctx): State<AppContext>, auth: ActiveAuthContext) -> ApiResult<Json<Value>> {
    crate::require_role!(auth.role(), Role::Admin)?;
    Ok(Json(json!({ "profiles": ctx.lists.reported_profiles().await? })))
}
