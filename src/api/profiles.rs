/// Profile endpoints
use super::ReportRequest;
use crate::{
    auth::ActiveAuthContext,
    content::{profiles::ProfilePage, CreateProfileRequest, UpdateProfileRequest},
    context::AppContext,
    db::models::Profile,
    error::ApiResult,
    moderation::ReportTarget,
    validation::ValidatedJson,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

/// Build profile routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/profile",
            get(own_profile)
                .post(create_profile)
                .put(update_profile)
                .delete(delete_profile),
        )
        .route("/profile/:nickname", get(show_profile))
        .route(
            "/profile/:nickname/subscribe",
            post(subscribe).delete(unsubscribe),
        )
        .route(
            "/profile/:nickname/report",
            post(report_profile).delete(dismiss_profile_reports),
        )
}

async fn own_profile(State(ctx): State<AppContext>, auth: ActiveAuthContext) -> ApiResult<Json<Profile>> {
    Ok(Json(ctx.profiles.own(auth.user()).await?))
}

async fn create_profile(
    State(ctx): State<AppContext>,
    auth: ActiveAuthContext,
    ValidatedJson(req): ValidatedJson<CreateProfileRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let profile = ctx.profiles.create(auth.user(), req).await?;
    Ok((StatusCode::CREATED, Json(json!({ "profile": profile }))))
}

async fn update_profile(
    State(ctx): State<AppContext>,
    auth: ActiveAuthContext,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> ApiResult<Json<Value>> {
    let profile = ctx.profiles.update(auth.user(), req).await?;
    Ok(Json(json!({ "profile": profile })))
}

async fn delete_profile(State(ctx): State<AppContext>, auth: ActiveAuthContext) -> ApiResult<Json<Value>> {
    ctx.profiles.delete(auth.user()).await?;
    Ok(Json(json!({ "message": "Profile deleted." })))
}

async fn show_profile(
    State(ctx): State<AppContext>,
    _auth: ActiveAuthContext,
    Path(nickname): Path<String>,
) -> ApiResult<Json<ProfilePage>> {
    Ok(Json(ctx.profiles.show(&nickname).await?))
}

async fn subscribe(
    State(ctx): State<AppContext>,
    auth: ActiveAuthContext,
    Path(nickname): Path<String>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let subscription = ctx.profiles.subscribe(auth.user(), &nickname).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Subscribed successfully.", "subscription": subscription })),
    ))
}

async fn unsubscribe(
    State(ctx): State<AppContext>,
    auth: ActiveAuthContext,
    Path(nickname): Path<String>,
) -> ApiResult<Json<Value>> {
    ctx.profiles.unsubscribe(auth.user(), &nickname).await?;
    Ok(Json(json!({ "message": "Unsubscribed successfully." })))
}

async fn report_profile(
    State(ctx): State<AppContext>,
    auth: ActiveAuthContext,
    Path(nickname): Path<String>,
    ValidatedJson(req): ValidatedJson<ReportRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let report = ctx
        .moderation
        .submit_report(auth.user(), ReportTarget::Profile(nickname), &req.content)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Profile reported successfully.", "report": report })),
    ))
}

async fn dismiss_profile_reports(
    State(ctx): State<AppContext>,
    auth: ActiveAuthContext,
    Path(nickname): Path<String>,
) -> ApiResult<Json<Value>> {
    let target = ReportTarget::Profile(nickname);
    let deleted = ctx.moderation.dismiss_reports(auth.user(), target.clone()).await?;

    Ok(Json(json!({
        "message": format!("{} report(s) on {} deleted successfully.", deleted, target),
        "deleted": deleted,
    })))
}
