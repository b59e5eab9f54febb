/// Rate Limiting System
use crate::{
    api::middleware::extract_bearer_token,
    config::RateLimitConfig,
    context::AppContext,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::{num::NonZeroU32, sync::Arc, time::Duration};

type DirectLimiter = GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Which quota a request is charged against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Unauthenticated,
    Authenticated,
    Staff,
}

fn quota(rps: u32, burst: u32) -> Quota {
    let rps = NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);
    Quota::per_second(rps).allow_burst(burst)
}

/// Rate limiter manager
#[derive(Clone)]
pub struct RateLimiter {
    enabled: bool,
    authenticated: Arc<DirectLimiter>,
    unauthenticated: Arc<DirectLimiter>,
    staff: Arc<DirectLimiter>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let burst = config.burst_size;

        Self {
            enabled: config.enabled,
            authenticated: Arc::new(GovernorLimiter::direct(quota(config.authenticated_rps, burst))),
            unauthenticated: Arc::new(GovernorLimiter::direct(quota(
                config.unauthenticated_rps,
                burst / 5,
            ))),
            staff: Arc::new(GovernorLimiter::direct(quota(
                config.authenticated_rps.saturating_mul(10),
                burst.saturating_mul(2),
            ))),
        }
    }

    /// Charge one request against a tier
    pub fn check(&self, tier: Tier) -> ApiResult<()> {
        if !self.enabled {
            return Ok(());
        }

        let limiter = match tier {
            Tier::Unauthenticated => &self.unauthenticated,
            Tier::Authenticated => &self.authenticated,
            Tier::Staff => &self.staff,
        };

        limiter.check().map_err(|_| ApiError::RateLimitExceeded {
            retry_after: Duration::from_secs(1),
        })
    }
}

/// Rate limiting middleware
///
/// A request only counts as authenticated if its bearer token validates;
/// admins and superadmins get the staff quota.
pub async fn rate_limit_middleware(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !ctx.rate_limiter.enabled {
        return Ok(next.run(request).await);
    }

    let mut tier = Tier::Unauthenticated;

    if let Some(token) = extract_bearer_token(request.headers()) {
        if let Ok(validated) = ctx.account_manager.validate_access_token(&token).await {
            tier = match ctx.account_manager.get_user(validated.user_id).await {
                Ok(user) if user.role.is_staff() => Tier::Staff,
                _ => Tier::Authenticated,
            };
        }
    }

    if let Err(e) = ctx.rate_limiter.check(tier) {
        tracing::debug!(?tier, "Rate limit exceeded");
        return Err(e);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(enabled: bool) -> RateLimitConfig {
        RateLimitConfig {
            enabled,
            unauthenticated_rps: 5,
            authenticated_rps: 10,
            burst_size: 5,
        }
    }

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = RateLimiter::new(&config(true));

        assert!(limiter.check(Tier::Authenticated).is_ok());
        assert!(limiter.check(Tier::Unauthenticated).is_ok());
        assert!(limiter.check(Tier::Staff).is_ok());
    }

    #[test]
    fn test_burst_limit() {
        let limiter = RateLimiter::new(&config(true));

        for _ in 0..5 {
            assert!(limiter.check(Tier::Authenticated).is_ok());
        }

        assert!(matches!(
            limiter.check(Tier::Authenticated),
            Err(ApiError::RateLimitExceeded { .. })
        ));
    }

    #[test]
    fn test_disabled_limiter_never_rejects() {
        let limiter = RateLimiter::new(&config(false));

        for _ in 0..100 {
            assert!(limiter.check(Tier::Unauthenticated).is_ok());
        }
    }
}
