/// Registration, login, tokens and email verification
use crate::{
    account::{AuthResponse, LoginRequest, RegisterRequest},
    auth::AuthContext,
    context::AppContext,
    db::models::User,
    error::ApiResult,
    validation::ValidatedJson,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

/// Build auth routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", get(logout))
        .route("/user", get(current_user))
        .route("/email/verification-notification", post(send_verification))
        .route("/email/verify/:token", get(verify_email))
}

async fn register(
    State(ctx): State<AppContext>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let response = ctx.account_manager.register(req).await?;

    // Registration stands even if the mail does not go out
    if let Err(e) = ctx
        .account_manager
        .send_verification_notification(&response.user)
        .await
    {
        tracing::warn!(user = response.user.id, "Failed to send verification email: {}", e);
    }

    Ok((StatusCode::CREATED, Json(response)))
}

async fn login(
    State(ctx): State<AppContext>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    Ok(Json(ctx.account_manager.login(req).await?))
}

async fn logout(State(ctx): State<AppContext>, auth: AuthContext) -> ApiResult<Json<Value>> {
    ctx.account_manager.logout(auth.user.id).await?;
    Ok(Json(json!({ "message": "Logged out successfully." })))
}

async fn current_user(auth: AuthContext) -> Json<User> {
    Json(auth.user)
}

async fn send_verification(State(ctx): State<AppContext>, auth: AuthContext) -> ApiResult<Json<Value>> {
    let message = if ctx.account_manager.send_verification_notification(&auth.user).await? {
        "Verification link sent."
    } else {
        "Email already verified."
    };

    Ok(Json(json!({ "message": message })))
}

async fn verify_email(State(ctx): State<AppContext>, Path(token): Path<String>) -> ApiResult<Json<Value>> {
    let user = ctx.account_manager.verify_email(&token).await?;
    Ok(Json(json!({ "message": "Email verified.", "user": user })))
}
