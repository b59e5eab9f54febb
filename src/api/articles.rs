/// Article endpoints
use super::{ReasonRequest, ReportRequest};
use crate::{
    auth::{ActiveAuthContext, OptionalAuthContext},
    content::{CreateArticleRequest, TextRequest},
    context::AppContext,
    error::ApiResult,
    moderation::{BanTarget, ReportTarget},
    validation::ValidatedJson,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

/// Build article routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/article", post(create_article))
        .route("/article/:id", get(show_article).delete(delete_article))
        .route("/article/:id/ban", post(ban_article).delete(unban_article))
        .route("/article/:id/like", post(like_article).delete(unlike_article))
        .route("/article/:id/comment", post(comment_article))
        .route("/article/:id/note", post(note_article))
        .route(
            "/article/:id/report",
            post(report_article).delete(dismiss_article_reports),
        )
}

async fn create_article(
    State(ctx): State<AppContext>,
    auth: ActiveAuthContext,
    ValidatedJson(req): ValidatedJson<CreateArticleRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let article = ctx.articles.create(auth.user(), req).await?;
    Ok((StatusCode::CREATED, Json(json!({ "article": article }))))
}

async fn show_article(
    State(ctx): State<AppContext>,
    viewer: OptionalAuthContext,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let article = ctx.articles.show(id).await?;
    let role = viewer
        .auth
        .as_ref()
        .map(|a| a.role().as_str())
        .unwrap_or("guest");

    Ok(Json(json!({ "article": article, "role": role })))
}

async fn delete_article(
    State(ctx): State<AppContext>,
    auth: ActiveAuthContext,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    ctx.moderation.apply_delete(auth.user(), BanTarget::Article(id)).await?;
    Ok(Json(json!({ "message": "Article deleted." })))
}

async fn ban_article(
    State(ctx): State<AppContext>,
    auth: ActiveAuthContext,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<ReasonRequest>,
) -> ApiResult<Json<Value>> {
    let record = ctx
        .moderation
        .apply_ban(auth.user(), BanTarget::Article(id), req.reason.as_deref().unwrap_or_default())
        .await?;

    Ok(Json(json!({ "message": "Article has been banned.", "ban": record })))
}

async fn unban_article(
    State(ctx): State<AppContext>,
    auth: ActiveAuthContext,
    Path(id): Path<i64>,
    req: Option<ValidatedJson<ReasonRequest>>,
) -> ApiResult<Json<Value>> {
    let reason = req.and_then(|ValidatedJson(r)| r.reason);

    ctx.moderation
        .apply_unban(auth.user(), BanTarget::Article(id), reason.as_deref())
        .await?;

    Ok(Json(json!({ "message": "Article has been unbanned." })))
}

async fn like_article(
    State(ctx): State<AppContext>,
    auth: ActiveAuthContext,
    Path(id): Path<i64>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let like = ctx.articles.like(auth.user(), id).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Article liked successfully.", "like": like })),
    ))
}

async fn unlike_article(
    State(ctx): State<AppContext>,
    auth: ActiveAuthContext,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    ctx.articles.unlike(auth.user(), id).await?;
    Ok(Json(json!({ "message": "Like removed successfully." })))
}

async fn comment_article(
    State(ctx): State<AppContext>,
    auth: ActiveAuthContext,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<TextRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let comment = ctx.articles.comment(auth.user(), id, &req.content).await?;
    Ok((StatusCode::CREATED, Json(json!({ "comment": comment }))))
}

async fn note_article(
    State(ctx): State<AppContext>,
    auth: ActiveAuthContext,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<TextRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let note = ctx.articles.create_note(auth.user(), id, &req.content).await?;
    Ok((StatusCode::CREATED, Json(json!({ "note": note }))))
}

async fn report_article(
    State(ctx): State<AppContext>,
    auth: ActiveAuthContext,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<ReportRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let report = ctx
        .moderation
        .submit_report(auth.user(), ReportTarget::Article(id), &req.content)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Article reported successfully.", "report": report })),
    ))
}

async fn dismiss_article_reports(
    State(ctx): State<AppContext>,
    auth: ActiveAuthContext,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let target = ReportTarget::Article(id);
    let deleted = ctx.moderation.dismiss_reports(auth.user(), target.clone()).await?;

    Ok(Json(json!({
        "message": format!("{} report(s) on {} deleted successfully.", deleted, target),
        "deleted": deleted,
    })))
}
