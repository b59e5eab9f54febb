/// Profiles and subscriptions
use super::{
    expand_articles, profile_of_user, profile_summary, ArticleRow, ArticleView, CreateProfileRequest,
    ProfileSummary, UpdateProfileRequest, ARTICLE_ROW_SQL,
};
use crate::{
    activity::{ActivityLogger, NewActivity},
    db::{self, models::{Profile, Subscription, User}},
    error::{ApiError, ApiResult},
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use sqlx::SqlitePool;

/// Profile page: the profile and everything it has published
#[derive(Debug, Clone, Serialize)]
pub struct ProfilePage {
    pub profile: ProfileSummary,
    pub articles: Vec<ArticleView>,
}

fn profile_not_found() -> ApiError {
    ApiError::NotFound("Profile not found.".to_string())
}

fn map_nickname_conflict(e: sqlx::Error) -> ApiError {
    match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            ApiError::Conflict("The nickname has already been taken.".to_string())
        }
        other => ApiError::Database(other),
    }
}

/// Profile manager
#[derive(Clone)]
pub struct ProfileManager {
    db: SqlitePool,
    activity: ActivityLogger,
}

impl ProfileManager {
    pub fn new(db: SqlitePool, activity: ActivityLogger) -> Self {
        Self { db, activity }
    }

    /// The caller's own profile
    pub async fn own(&self, user: &User) -> ApiResult<Profile> {
        let mut conn = self.db.acquire().await?;
        profile_of_user(&mut conn, user.id).await?.ok_or_else(profile_not_found)
    }

    /// Public profile page by nickname
    pub async fn show(&self, nickname: &str) -> ApiResult<ProfilePage> {
        let mut conn = self.db.acquire().await?;

        let profile = profile_summary(&mut conn, nickname)
            .await?
            .ok_or_else(profile_not_found)?;

        let rows = sqlx::query_as::<_, ArticleRow>(&format!(
            "{} WHERE a.author = ? ORDER BY a.created_at DESC, a.id DESC",
            ARTICLE_ROW_SQL
        ))
        .bind(nickname)
        .fetch_all(&mut *conn)
        .await?;

        let articles = expand_articles(&mut conn, rows).await?;

        Ok(ProfilePage { profile, articles })
    }

    /// Create the caller's profile. One per account.
    pub async fn create(&self, user: &User, request: CreateProfileRequest) -> ApiResult<Profile> {
        let mut tx = db::begin_write(&self.db).await?;

        if profile_of_user(&mut tx, user.id).await?.is_some() {
            return Err(ApiError::Conflict("Profile already exists.".to_string()));
        }

        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO profiles (nickname, user_id, description, logo, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&request.nickname)
        .bind(user.id)
        .bind(&request.description)
        .bind(&request.logo)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(map_nickname_conflict)?;

        tx.commit().await?;

        let profile = Profile {
            nickname: request.nickname,
            user_id: user.id,
            description: request.description,
            logo: request.logo,
            created_at: now,
            updated_at: now,
        };

        self.activity
            .record(
                NewActivity::new("profiles", "Profile created")
                    .subject("profile", &profile.nickname)
                    .causer(user.id)
                    .event("created"),
            )
            .await;

        Ok(profile)
    }

    /// Update the caller's profile. Renames cascade to articles, notes and
    /// subscriptions through the nickname foreign keys.
    pub async fn update(&self, user: &User, request: UpdateProfileRequest) -> ApiResult<Profile> {
        let mut tx = db::begin_write(&self.db).await?;

        let mut profile = profile_of_user(&mut tx, user.id).await?.ok_or_else(profile_not_found)?;
        let previous = profile.nickname.clone();

        if let Some(nickname) = request.nickname {
            profile.nickname = nickname;
        }
        if request.description.is_some() {
            profile.description = request.description;
        }
        if request.logo.is_some() {
            profile.logo = request.logo;
        }
        profile.updated_at = Utc::now();

        sqlx::query(
            "UPDATE profiles SET nickname = ?, description = ?, logo = ?, updated_at = ? WHERE nickname = ?",
        )
        .bind(&profile.nickname)
        .bind(&profile.description)
        .bind(&profile.logo)
        .bind(profile.updated_at)
        .bind(&previous)
        .execute(&mut *tx)
        .await
        .map_err(map_nickname_conflict)?;

        tx.commit().await?;

        self.activity
            .record(
                NewActivity::new("profiles", "Profile updated")
                    .subject("profile", &profile.nickname)
                    .causer(user.id)
                    .properties(json!({ "previous_nickname": previous }))
                    .event("updated"),
            )
            .await;

        Ok(profile)
    }

    /// Delete the caller's profile along with its articles
    pub async fn delete(&self, user: &User) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM profiles WHERE user_id = ?")
            .bind(user.id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(profile_not_found());
        }

        self.activity
            .record(
                NewActivity::new("profiles", "Profile deleted")
                    .causer(user.id)
                    .event("deleted"),
            )
            .await;

        Ok(())
    }

    /// Follow another profile
    pub async fn subscribe(&self, user: &User, author: &str) -> ApiResult<Subscription> {
        let mut tx = db::begin_write(&self.db).await?;

        let follower = profile_of_user(&mut tx, user.id).await?.ok_or_else(profile_not_found)?;

        if profile_summary(&mut tx, author).await?.is_none() {
            return Err(profile_not_found());
        }

        if follower.nickname == author {
            return Err(ApiError::BadRequest("You cannot subscribe to yourself.".to_string()));
        }

        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO subscriptions (causer, author, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&follower.nickname)
        .bind(author)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                ApiError::Conflict("Already subscribed.".to_string())
            }
            other => ApiError::Database(other),
        })?;

        tx.commit().await?;

        let subscription = Subscription {
            id: result.last_insert_rowid(),
            causer: follower.nickname,
            author: author.to_string(),
            created_at: now,
            updated_at: now,
        };

        self.activity
            .record(
                NewActivity::new("subscriptions", "Subscribed")
                    .subject("profile", author)
                    .causer(user.id)
                    .event("created"),
            )
            .await;

        Ok(subscription)
    }

    /// Stop following a profile
    pub async fn unsubscribe(&self, user: &User, author: &str) -> ApiResult<()> {
        let mut conn = self.db.acquire().await?;
        let follower = profile_of_user(&mut conn, user.id).await?.ok_or_else(profile_not_found)?;

        let result = sqlx::query("DELETE FROM subscriptions WHERE causer = ? AND author = ?")
            .bind(&follower.nickname)
            .bind(author)
            .execute(&mut *conn)
            .await?;
        drop(conn);

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Subscription not found.".to_string()));
        }

        self.activity
            .record(
                NewActivity::new("subscriptions", "Unsubscribed")
                    .subject("profile", author)
                    .causer(user.id)
                    .event("deleted"),
            )
            .await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{content::test_support, moderation::Role};

    fn create_request(nickname: &str) -> CreateProfileRequest {
        CreateProfileRequest {
            nickname: nickname.to_string(),
            description: Some("hello".to_string()),
            logo: None,
        }
    }

    #[tokio::test]
    async fn test_create_profile_once() {
        let (pool, activity) = test_support::pool().await;
        let manager = ProfileManager::new(pool.clone(), activity);
        let user = test_support::user(&pool, "kit@example.com", Role::User).await;

        let profile = manager.create(&user, create_request("kit")).await.unwrap();
        assert_eq!(profile.nickname, "kit");

        let err = manager.create(&user, create_request("kit2")).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_nickname_must_be_unique() {
        let (pool, activity) = test_support::pool().await;
        let manager = ProfileManager::new(pool.clone(), activity);
        let first = test_support::user(&pool, "a@example.com", Role::User).await;
        let second = test_support::user(&pool, "b@example.com", Role::User).await;

        manager.create(&first, create_request("taken")).await.unwrap();
        let err = manager.create(&second, create_request("taken")).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_keeps_unset_fields() {
        let (pool, activity) = test_support::pool().await;
        let manager = ProfileManager::new(pool.clone(), activity);
        let user = test_support::user(&pool, "kit@example.com", Role::User).await;
        manager.create(&user, create_request("kit")).await.unwrap();

        let updated = manager
            .update(
                &user,
                UpdateProfileRequest {
                    nickname: Some("kitty".to_string()),
                    description: None,
                    logo: Some("logo.png".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.nickname, "kitty");
        assert_eq!(updated.description.as_deref(), Some("hello"));
        assert_eq!(manager.own(&user).await.unwrap().logo.as_deref(), Some("logo.png"));
    }

    #[tokio::test]
    async fn test_subscription_rules() {
        let (pool, activity) = test_support::pool().await;
        let manager = ProfileManager::new(pool.clone(), activity);
        let reader = test_support::user(&pool, "r@example.com", Role::User).await;
        let writer = test_support::user(&pool, "w@example.com", Role::User).await;
        manager.create(&reader, create_request("reader")).await.unwrap();
        manager.create(&writer, create_request("writer")).await.unwrap();

        let err = manager.subscribe(&reader, "reader").await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let err = manager.subscribe(&reader, "nobody").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        manager.subscribe(&reader, "writer").await.unwrap();
        let err = manager.subscribe(&reader, "writer").await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        let page = manager.show("writer").await.unwrap();
        assert_eq!(page.profile.followers, 1);

        manager.unsubscribe(&reader, "writer").await.unwrap();
        let err = manager.unsubscribe(&reader, "writer").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_profile() {
        let (pool, activity) = test_support::pool().await;
        let manager = ProfileManager::new(pool.clone(), activity);
        let user = test_support::user(&pool, "kit@example.com", Role::User).await;

        let err = manager.delete(&user).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        manager.create(&user, create_request("kit")).await.unwrap();
        manager.delete(&user).await.unwrap();
        assert!(matches!(manager.own(&user).await.unwrap_err(), ApiError::NotFound(_)));
    }
}
