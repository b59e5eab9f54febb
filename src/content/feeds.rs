/// Home feed and per-user article listings
use super::{expand_articles, profile_of_user, profile_summary, ArticleRow, ArticleView, ProfileSummary, ARTICLE_ROW_SQL};
use crate::{
    db::models::User,
    error::{ApiError, ApiResult},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

/// A followed author
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionView {
    pub id: i64,
    pub author: ProfileSummary,
    pub created_at: DateTime<Utc>,
}

/// Feed manager
#[derive(Clone)]
pub struct FeedManager {
    db: SqlitePool,
}

impl FeedManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Every article, ordered by title
    pub async fn home(&self) -> ApiResult<Vec<ArticleView>> {
        let mut conn = self.db.acquire().await?;

        let rows = sqlx::query_as::<_, ArticleRow>(&format!(
            "{} ORDER BY a.title ASC, a.id ASC",
            ARTICLE_ROW_SQL
        ))
        .fetch_all(&mut *conn)
        .await?;

        Ok(expand_articles(&mut conn, rows).await?)
    }

    /// Case-insensitive title substring search
    pub async fn search(&self, query: &str) -> ApiResult<Vec<ArticleView>> {
        let mut conn = self.db.acquire().await?;

        let escaped = query
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");

        let rows = sqlx::query_as::<_, ArticleRow>(&format!(
            "{} WHERE a.title LIKE ? ESCAPE '\\' ORDER BY a.title ASC, a.id ASC",
            ARTICLE_ROW_SQL
        ))
        .bind(format!("%{}%", escaped))
        .fetch_all(&mut *conn)
        .await?;

        Ok(expand_articles(&mut conn, rows).await?)
    }

    /// Articles the caller has liked, most recent like first
    pub async fn liked(&self, user: &User) -> ApiResult<Vec<ArticleView>> {
        let mut conn = self.db.acquire().await?;

        let rows = sqlx::query_as::<_, ArticleRow>(&format!(
            r#"{}
            JOIN like_reactions mine ON mine.article_id = a.id
            WHERE mine.causer = ?
            ORDER BY mine.created_at DESC, mine.id DESC"#,
            ARTICLE_ROW_SQL
        ))
        .bind(user.id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(expand_articles(&mut conn, rows).await?)
    }

    /// Authors the caller follows
    pub async fn subscriptions(&self, user: &User) -> ApiResult<Vec<SubscriptionView>> {
        let mut conn = self.db.acquire().await?;

        let profile = profile_of_user(&mut conn, user.id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Profile not found.".to_string()))?;

        let rows: Vec<(i64, String, DateTime<Utc>)> = sqlx::query_as(
            "SELECT id, author, created_at FROM subscriptions WHERE causer = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(&profile.nickname)
        .fetch_all(&mut *conn)
        .await?;

        let mut views = Vec::with_capacity(rows.len());
        for (id, author, created_at) in rows {
            if let Some(author) = profile_summary(&mut conn, &author).await? {
                views.push(SubscriptionView { id, author, created_at });
            }
        }

        Ok(views)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        content::{test_support, ArticleManager, CreateArticleRequest, CreateProfileRequest, ProfileManager},
        moderation::Role,
    };

    struct Fixture {
        feeds: FeedManager,
        articles: ArticleManager,
        profiles: ProfileManager,
        pool: SqlitePool,
    }

    async fn setup() -> Fixture {
        let (pool, activity) = test_support::pool().await;
        Fixture {
            feeds: FeedManager::new(pool.clone()),
            articles: ArticleManager::new(pool.clone(), activity.clone()),
            profiles: ProfileManager::new(pool.clone(), activity),
            pool,
        }
    }

    async fn author(f: &Fixture, email: &str, nickname: &str) -> User {
        let user = test_support::user(&f.pool, email, Role::User).await;
        f.profiles
            .create(
                &user,
                CreateProfileRequest {
                    nickname: nickname.to_string(),
                    description: None,
                    logo: None,
                },
            )
            .await
            .unwrap();
        user
    }

    async fn publish(f: &Fixture, user: &User, title: &str) -> i64 {
        f.articles
            .create(
                user,
                CreateArticleRequest {
                    title: title.to_string(),
                    content: "Body".to_string(),
                    tags: None,
                    thumbnail: None,
                },
            )
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_home_orders_by_title() {
        let f = setup().await;
        let writer = author(&f, "w@example.com", "writer").await;
        publish(&f, &writer, "Zebra").await;
        publish(&f, &writer, "Apple").await;

        let titles: Vec<String> = f.feeds.home().await.unwrap().into_iter().map(|a| a.title).collect();
        assert_eq!(titles, vec!["Apple", "Zebra"]);
    }

    #[tokio::test]
    async fn test_search_is_substring_and_literal() {
        let f = setup().await;
        let writer = author(&f, "w@example.com", "writer").await;
        publish(&f, &writer, "Learning Rust").await;
        publish(&f, &writer, "100% done").await;
        publish(&f, &writer, "Gardening").await;

        let found = f.feeds.search("rust").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Learning Rust");

        let found = f.feeds.search("%").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "100% done");
    }

    #[tokio::test]
    async fn test_liked_and_subscriptions() {
        let f = setup().await;
        let writer = author(&f, "w@example.com", "writer").await;
        let reader = author(&f, "r@example.com", "reader").await;
        let article = publish(&f, &writer, "Hello").await;
        publish(&f, &writer, "Unliked").await;

        f.articles.like(&reader, article).await.unwrap();
        f.profiles.subscribe(&reader, "writer").await.unwrap();

        let liked = f.feeds.liked(&reader).await.unwrap();
        assert_eq!(liked.len(), 1);
        assert_eq!(liked[0].id, article);

        let subscriptions = f.feeds.subscriptions(&reader).await.unwrap();
        assert_eq!(subscriptions.len(), 1);
        assert_eq!(subscriptions[0].author.nickname, "writer");
        assert_eq!(subscriptions[0].author.followers, 1);
    }
}
