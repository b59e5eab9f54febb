/// Audit trail endpoints
use crate::{
    auth::{ActiveAuthContext, AuthContext},
    context::AppContext,
    error::ApiResult,
    moderation::Role,
};
use axum::{extract::State, routing::get, Json, Router};
use serde_json::Value;

/// Build activity routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/activities", get(my_activities))
        .route("/activities/admins", get(admin_activities))
}

async fn my_activities(State(ctx): State<AppContext>, auth: AuthContext) -> ApiResult<Json<Vec<Value>>> {
    let activities = ctx.activity.for_causer(auth.user.id).await?;
    Ok(Json(activities.iter().map(|a| a.to_json()).collect()))
}

async fn admin_activities(
    State(ctx): State<AppContext>,
    auth: ActiveAuthContext,
) -> ApiResult<Json<Vec<Value>>> {
    crate::require_role!(auth.role(), Role::SuperAdmin)?;

    let activities = ctx
        .activity
        .for_causer_roles(&[Role::Admin, Role::SuperAdmin])
        .await?;
    Ok(Json(activities.iter().map(|a| a.to_json()).collect()))
}
