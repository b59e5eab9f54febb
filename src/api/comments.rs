/// Comment and note endpoints
use super::{ReasonRequest, ReportRequest};
use crate::{
    auth::ActiveAuthContext,
    context::AppContext,
    error::ApiResult,
    moderation::{BanTarget, ReportTarget},
    validation::ValidatedJson,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};
use serde_json::{json, Value};

/// Build comment routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/comment/:id", delete(delete_comment))
        .route("/comment/:id/ban", post(ban_comment).delete(unban_comment))
        .route(
            "/comment/:id/report",
            post(report_comment).delete(dismiss_comment_reports),
        )
        .route("/note/:id", delete(delete_note))
}

async fn delete_comment(
    State(ctx): State<AppContext>,
    auth: ActiveAuthContext,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    ctx.moderation.apply_delete(auth.user(), BanTarget::Comment(id)).await?;
    Ok(Json(json!({ "message": "Comment deleted." })))
}

async fn ban_comment(
    State(ctx): State<AppContext>,
    auth: ActiveAuthContext,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<ReasonRequest>,
) -> ApiResult<Json<Value>> {
    let record = ctx
        .moderation
        .apply_ban(auth.user(), BanTarget::Comment(id), req.reason.as_deref().unwrap_or_default())
        .await?;

    Ok(Json(json!({ "message": "Comment has been banned.", "ban": record })))
}

async fn unban_comment(
    State(ctx): State<AppContext>,
    auth: ActiveAuthContext,
    Path(id): Path<i64>,
    req: Option<ValidatedJson<ReasonRequest>>,
) -> ApiResult<Json<Value>> {
    let reason = req.and_then(|ValidatedJson(r)| r.reason);

    ctx.moderation
        .apply_unban(auth.user(), BanTarget::Comment(id), reason.as_deref())
        .await?;

    Ok(Json(json!({ "message": "Comment has been unbanned." })))
}

async fn report_comment(
    State(ctx): State<AppContext>,
    auth: ActiveAuthContext,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<ReportRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let report = ctx
        .moderation
        .submit_report(auth.user(), ReportTarget::Comment(id), &req.content)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Comment reported successfully.", "report": report })),
    ))
}

async fn dismiss_comment_reports(
    State(ctx): State<AppContext>,
    auth: ActiveAuthContext,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let target = ReportTarget::Comment(id);
    let deleted = ctx.moderation.dismiss_reports(auth.user(), target.clone()).await?;

    Ok(Json(json!({
        "message": format!("{} report(s) on {} deleted successfully.", deleted, target),
        "deleted": deleted,
    })))
}

async fn delete_note(
    State(ctx): State<AppContext>,
    auth: ActiveAuthContext,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    ctx.articles.delete_note(auth.user(), id).await?;
    Ok(Json(json!({ "message": "Note deleted." })))
}
