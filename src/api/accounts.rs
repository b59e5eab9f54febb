/// Account moderation: ban, unban, role change, delete
use super::ReasonRequest;
use crate::{
    auth::ActiveAuthContext,
    context::AppContext,
    error::ApiResult,
    moderation::{BanLedger, BanTarget, Role},
    validation::ValidatedJson,
};
use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RoleRequest {
    pub role: String,
}

/// Build account routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/account/:id/ban", post(ban_account))
        .route("/account/:id/unban", post(unban_account))
        .route("/account/:id/role", post(change_role))
        .route("/account/:id/bans", get(ban_history))
        .route("/account/:id", delete(delete_account))
}

async fn ban_account(
    State(ctx): State<AppContext>,
    auth: ActiveAuthContext,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<ReasonRequest>,
) -> ApiResult<Json<Value>> {
    let record = ctx
        .moderation
        .apply_ban(auth.user(), BanTarget::Account(id), req.reason.as_deref().unwrap_or_default())
        .await?;

    Ok(Json(json!({ "message": "User has been banned.", "ban": record })))
}

async fn unban_account(
    State(ctx): State<AppContext>,
    auth: ActiveAuthContext,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<ReasonRequest>,
) -> ApiResult<Json<Value>> {
    let record = ctx
        .moderation
        .apply_unban(auth.user(), BanTarget::Account(id), req.reason.as_deref())
        .await?;

    Ok(Json(json!({ "message": "User has been unbanned.", "ban": record })))
}

async fn change_role(
    State(ctx): State<AppContext>,
    auth: ActiveAuthContext,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<RoleRequest>,
) -> ApiResult<Json<Value>> {
    let user = ctx.moderation.apply_role_change(auth.user(), id, &req.role).await?;

    Ok(Json(json!({ "message": "User role updated.", "user": user })))
}

async fn delete_account(
    State(ctx): State<AppContext>,
    auth: ActiveAuthContext,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    ctx.moderation.apply_delete(auth.user(), BanTarget::Account(id)).await?;

    Ok(Json(json!({ "message": "Account deleted successfully." })))
}

/// Ledger entries for an account, newest first. Moderator or higher.
async fn ban_history(
    State(ctx): State<AppContext>,
    auth: ActiveAuthContext,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    crate::require_role!(auth.role(), Role::Moderator)?;

    let bans = BanLedger::new(ctx.db.clone())
        .history(BanTarget::Account(id))
        .await?;

    Ok(Json(json!({ "bans": bans })))
}
