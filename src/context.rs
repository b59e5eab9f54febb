/// Application context and dependency injection
use crate::{
    account::AccountManager,
    activity::ActivityLogger,
    config::ServerConfig,
    content::{ArticleManager, FeedManager, ProfileManager, StaffLists},
    db,
    error::{ApiError, ApiResult},
    mailer::Mailer,
    moderation::ModerationService,
    rate_limit::RateLimiter,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub account_manager: Arc<AccountManager>,
    pub activity: ActivityLogger,
    // Moderation
    pub moderation: Arc<ModerationService>,
    // Content
    pub profiles: Arc<ProfileManager>,
    pub articles: Arc<ArticleManager>,
    pub feeds: Arc<FeedManager>,
    pub lists: Arc<StaffLists>,
    // Rate limiter
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> ApiResult<Self> {
        config.validate()?;

        Self::ensure_directories(&config).await?;

        let db = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        Self::from_pool(config, db)
    }

    /// Build the service graph on an existing, migrated pool
    pub fn from_pool(config: ServerConfig, db: SqlitePool) -> ApiResult<Self> {
        let config = Arc::new(config);
        let mailer = Mailer::new(config.email.clone())?;
        let activity = ActivityLogger::new(db.clone());

        if !mailer.is_configured() {
            tracing::warn!("SMTP not configured - verification emails will be skipped");
        }

        let account_manager = Arc::new(AccountManager::new(
            db.clone(),
            config.clone(),
            mailer,
            activity.clone(),
        ));

        Ok(Self {
            account_manager,
            moderation: Arc::new(ModerationService::new(db.clone(), activity.clone())),
            profiles: Arc::new(ProfileManager::new(db.clone(), activity.clone())),
            articles: Arc::new(ArticleManager::new(db.clone(), activity.clone())),
            feeds: Arc::new(FeedManager::new(db.clone())),
            lists: Arc::new(StaffLists::new(db.clone(), activity.clone())),
            rate_limiter: Arc::new(RateLimiter::new(&config.rate_limit)),
            activity,
            config,
            db,
        })
    }

    /// In-memory context with migrations applied
    pub async fn for_tests() -> ApiResult<Self> {
        let db = db::memory_pool().await?;
        db::run_migrations(&db).await?;
        Self::from_pool(ServerConfig::for_tests(), db)
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> ApiResult<()> {
        let dir = &config.storage.data_directory;

        if !dir.exists() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                ApiError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
            })?;
        }

        Ok(())
    }
}
