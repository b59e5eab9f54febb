/// End-to-end tests against the full router on an in-memory database
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use quillboard::{server::build_router, AppContext};
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    ctx: AppContext,
    router: Router,
}

impl TestApp {
    async fn new() -> Self {
        let ctx = AppContext::for_tests().await.expect("test context");
        let router = build_router(ctx.clone());
        Self { ctx, router }
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    /// Register, verify and optionally promote an account. Returns (id, token).
    async fn account(&self, email: &str, role: &str) -> (i64, String) {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "email": email,
                    "password": "correct-horse",
                    "password_confirmation": "correct-horse",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);

        let id = body["user"]["id"].as_i64().unwrap();
        sqlx::query("UPDATE users SET email_verified_at = ?, role = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(role)
            .bind(id)
            .execute(&self.ctx.db)
            .await
            .unwrap();

        (id, body["token"].as_str().unwrap().to_string())
    }
}

#[tokio::test]
async fn test_health_reports_database() {
    let app = TestApp::new().await;

    let (status, body) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, _) = app.request(Method::GET, "/health/live", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = TestApp::new().await;

    let (status, body) = app.request(Method::GET, "/api/nowhere", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
}

#[tokio::test]
async fn test_register_and_login() {
    let app = TestApp::new().await;
    app.account("writer@example.com", "user").await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "Writer@Example.com", "password": "correct-horse" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "user");
    assert!(body["user"].get("password_hash").is_none());

    let token = body["token"].as_str().unwrap().to_string();
    let (status, body) = app.request(Method::GET, "/api/user", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "writer@example.com");

    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "writer@example.com", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let app = TestApp::new().await;
    let (_, token) = app.account("leaving@example.com", "user").await;

    let (status, _) = app.request(Method::GET, "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.request(Method::GET, "/api/user", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_validation_is_422() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "email": "not-an-email",
                "password": "short",
                "password_confirmation": "short",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "InvalidRequest");
}

#[tokio::test]
async fn test_unverified_account_is_forbidden() {
    let app = TestApp::new().await;

    let (_, body) = app
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "email": "fresh@example.com",
                "password": "correct-horse",
                "password_confirmation": "correct-horse",
            })),
        )
        .await;
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = app.request(Method::GET, "/api/home/liked", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Email not verified.");
}

#[tokio::test]
async fn test_public_home_feed() {
    let app = TestApp::new().await;

    let (status, body) = app.request(Method::GET, "/api/home", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "allArticles");
    assert_eq!(body["articles"], json!([]));
}

#[tokio::test]
async fn test_account_ban_flow() {
    let app = TestApp::new().await;
    let (_, moderator) = app.account("mod@example.com", "moderator").await;
    let (user_id, user_token) = app.account("spammer@example.com", "user").await;

    let uri = format!("/api/account/{}/ban", user_id);

    let (status, body) = app
        .request(Method::POST, &uri, Some(&moderator), Some(json!({ "reason": "spam" })))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["ban"]["content"], "spam");

    let (status, body) = app
        .request(Method::POST, &uri, Some(&moderator), Some(json!({ "reason": "again" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User is already banned.");

    let (status, body) = app.request(Method::GET, "/api/home/liked", Some(&user_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "User is banned.");

    let unban = format!("/api/account/{}/unban", user_id);
    let (status, _) = app.request(Method::POST, &unban, Some(&moderator), Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app
        .request(Method::POST, &unban, Some(&moderator), Some(json!({ "reason": "appeal accepted" })))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.request(Method::GET, "/api/home/liked", Some(&user_token), None).await;
    assert_eq!(status, StatusCode::OK);

    // The ban record is replaced by the unban record
    let history = format!("/api/account/{}/bans", user_id);
    let (status, body) = app.request(Method::GET, &history, Some(&moderator), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bans"].as_array().unwrap().len(), 1);
    assert_eq!(body["bans"][0]["content"], "User unbanned. Reason: appeal accepted");

    let (status, _) = app.request(Method::GET, &history, Some(&user_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_moderator_cannot_ban_moderator() {
    let app = TestApp::new().await;
    let (_, moderator) = app.account("mod1@example.com", "moderator").await;
    let (peer_id, _) = app.account("mod2@example.com", "moderator").await;

    let (status, body) = app
        .request(
            Method::POST,
            &format!("/api/account/{}/ban", peer_id),
            Some(&moderator),
            Some(json!({ "reason": "rivalry" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You are not allowed to ban this user.");
}

#[tokio::test]
async fn test_admin_cannot_grant_admin() {
    let app = TestApp::new().await;
    let (_, admin) = app.account("admin@example.com", "admin").await;
    let (user_id, _) = app.account("hopeful@example.com", "user").await;

    let uri = format!("/api/account/{}/role", user_id);

    let (status, body) = app
        .request(Method::POST, &uri, Some(&admin), Some(json!({ "role": "admin" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Admins can only assign roles up to moderator.");

    let (status, body) = app
        .request(Method::POST, &uri, Some(&admin), Some(json!({ "role": "moderator" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "moderator");

    let (status, _) = app
        .request(Method::POST, &uri, Some(&admin), Some(json!({ "role": "overlord" })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_article_report_reaches_staff_listing() {
    let app = TestApp::new().await;
    let (_, author) = app.account("author@example.com", "user").await;
    let (_, reader) = app.account("reader@example.com", "user").await;
    let (_, admin) = app.account("admin@example.com", "admin").await;

    let (status, _) = app
        .request(Method::POST, "/api/profile", Some(&author), Some(json!({ "nickname": "author" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .request(
            Method::POST,
            "/api/article",
            Some(&author),
            Some(json!({ "title": "Hello", "content": "First post" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let article_id = body["article"]["id"].as_i64().unwrap();

    let report_uri = format!("/api/article/{}/report", article_id);
    let (status, _) = app
        .request(Method::POST, &report_uri, Some(&reader), Some(json!({ "content": "offensive" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app.request(Method::GET, "/api/list/reports/articles", Some(&reader), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.request(Method::GET, "/api/list/reports/articles", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["articles"][0]["reports"], 1);
    assert_eq!(body["articles"][0]["reporter"]["email"], "reader@example.com");

    let (status, body) = app.request(Method::DELETE, &report_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 1);

    let (_, body) = app.request(Method::GET, "/api/list/reports/articles", Some(&admin), None).await;
    assert_eq!(body["articles"], json!([]));
}

#[tokio::test]
async fn test_own_activity_trail() {
    let app = TestApp::new().await;
    let (_, token) = app.account("diarist@example.com", "user").await;

    let (status, body) = app.request(Method::GET, "/api/activities", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body
        .as_array()
        .unwrap()
        .iter()
        .any(|a| a["description"] == "User registered"));

    let (status, _) = app.request(Method::GET, "/api/activities/admins", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
