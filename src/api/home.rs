/// Home feed endpoints
use crate::{
    auth::ActiveAuthContext,
    content::SearchRequest,
    context::AppContext,
    error::ApiResult,
    validation::ValidatedJson,
};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

/// Build home routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/home", get(home))
        .route("/home/search", post(search))
        .route("/home/liked", get(liked))
        .route("/home/subscriptions", get(subscriptions))
}

async fn home(State(ctx): State<AppContext>) -> ApiResult<Json<Value>> {
    let articles = ctx.feeds.home().await?;
    Ok(Json(json!({ "state": "allArticles", "articles": articles })))
}

async fn search(
    State(ctx): State<AppContext>,
    ValidatedJson(req): ValidatedJson<SearchRequest>,
) -> ApiResult<Json<Value>> {
    let articles = ctx.feeds.search(&req.query).await?;
    Ok(Json(json!({
        "state": "searchResults",
        "query": req.query,
        "articles": articles,
    })))
}

async fn liked(State(ctx): State<AppContext>, auth: ActiveAuthContext) -> ApiResult<Json<Value>> {
    let articles = ctx.feeds.liked(auth.user()).await?;
    Ok(Json(json!({ "role": auth.role(), "articles": articles })))
}

async fn subscriptions(State(ctx): State<AppContext>, auth: ActiveAuthContext) -> ApiResult<Json<Value>> {
    let subscriptions = ctx.feeds.subscriptions(auth.user()).await?;
    Ok(Json(json!({ "role": auth.role(), "subscriptions": subscriptions })))
}
