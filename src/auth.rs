/// Authentication extractors and utilities
use crate::{
    api::middleware::extract_bearer_token,
    context::AppContext,
    db::models::User,
    error::ApiError,
    moderation::Role,
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Authenticated context - validates the bearer token and loads the user
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
}

impl AuthContext {
    pub fn role(&self) -> Role {
        self.user.role
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::Authentication("Unauthenticated.".to_string()))?;

        let token = state.account_manager.validate_access_token(&token).await?;

        // A token can outlive its account only until the cascade runs
        let user = state
            .account_manager
            .get_user(token.user_id)
            .await
            .map_err(|e| match e {
                ApiError::NotFound(_) => ApiError::Authentication("Unauthenticated.".to_string()),
                other => other,
            })?;

        Ok(AuthContext { user })
    }
}

/// Authenticated, email verified and not banned
#[derive(Debug, Clone)]
pub struct ActiveAuthContext(pub AuthContext);

impl ActiveAuthContext {
    pub fn user(&self) -> &User {
        &self.0.user
    }

    pub fn role(&self) -> Role {
        self.0.user.role
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for ActiveAuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthContext::from_request_parts(parts, state).await?;

        if auth.user.email_verified_at.is_none() {
            return Err(ApiError::Forbidden("Email not verified.".to_string()));
        }

        if auth.user.is_banned() {
            tracing::debug!(user = auth.user.id, "Rejected request from banned user");
            return Err(ApiError::Forbidden("User is banned.".to_string()));
        }

        Ok(ActiveAuthContext(auth))
    }
}

/// Optional authenticated context - does not fail if no auth provided
#[derive(Debug, Clone)]
pub struct OptionalAuthContext {
    pub auth: Option<AuthContext>,
}

#[async_trait]
impl FromRequestParts<AppContext> for OptionalAuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthContext::from_request_parts(parts, state).await.ok();
        Ok(OptionalAuthContext { auth })
    }
}
