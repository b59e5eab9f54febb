/// Staff listings: moderators, notes, profiles and reported content
use super::{all_profile_summaries, profile_summary, ProfileSummary};
use crate::{
    activity::ActivityLogger,
    db::models::{Note, UserRow},
    error::ApiResult,
    moderation::Role,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, Serialize)]
pub struct ModeratorView {
    pub id: i64,
    pub email: String,
    pub notes: Vec<Note>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct NoteListing {
    pub id: i64,
    pub content: String,
    pub causer: String,
    pub article_id: i64,
    pub article_title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileActivityView {
    #[serde(flatten)]
    pub profile: ProfileSummary,
    pub activities: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Reporter {
    pub id: i64,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportedArticle {
    pub id: i64,
    pub author: ProfileSummary,
    pub title: String,
    pub content: String,
    pub tags: Option<String>,
    pub likes: i64,
    pub comments: i64,
    pub reports: i64,
    /// Whoever filed the earliest open report
    pub reporter: Option<Reporter>,
    pub banned_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReportedComment {
    pub id: i64,
    pub causer: i64,
    pub nickname: Option<String>,
    pub article_id: i64,
    pub article_title: String,
    pub content: String,
    pub reports: i64,
    pub banned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportedProfile {
    #[serde(flatten)]
    pub profile: ProfileSummary,
    pub reports: i64,
}

#[derive(FromRow)]
struct ReportedArticleRow {
    id: i64,
    author: String,
    title: String,
    content: String,
    tags: Option<String>,
    likes: i64,
    comments: i64,
    reports: i64,
    banned_at: Option<DateTime<Utc>>,
}

/// Staff listing queries
#[derive(Clone)]
pub struct StaffLists {
    db: SqlitePool,
    activity: ActivityLogger,
}

impl StaffLists {
    pub fn new(db: SqlitePool, activity: ActivityLogger) -> Self {
        Self { db, activity }
    }

    /// Moderators with the notes they have written
    pub async fn moderators(&self) -> ApiResult<Vec<ModeratorView>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, password_hash, role, email_verified_at, banned_at, created_at, updated_at
            FROM users WHERE role = ? ORDER BY id ASC
            "#,
        )
        .bind(Role::Moderator.as_str())
        .fetch_all(&self.db)
        .await?;

        let mut moderators = Vec::with_capacity(rows.len());
        for row in rows {
            let notes = sqlx::query_as::<_, Note>(
                r#"
                SELECT n.id, n.content, n.causer, n.article_id, n.created_at, n.updated_at
                FROM notes n
                JOIN profiles p ON p.nickname = n.causer
                WHERE p.user_id = ?
                ORDER BY n.created_at DESC, n.id DESC
                "#,
            )
            .bind(row.id)
            .fetch_all(&self.db)
            .await?;

            moderators.push(ModeratorView {
                id: row.id,
                email: row.email,
                notes,
            });
        }

        Ok(moderators)
    }

    pub async fn notes(&self) -> ApiResult<Vec<NoteListing>> {
        let notes = sqlx::query_as::<_, NoteListing>(
            r#"
            SELECT n.id, n.content, n.causer, n.article_id, a.title AS article_title,
                   n.created_at, n.updated_at
            FROM notes n
            JOIN articles a ON a.id = n.article_id
            ORDER BY n.created_at DESC, n.id DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(notes)
    }

    /// Every profile, newest first, with the activity recorded against it
    pub async fn profiles(&self) -> ApiResult<Vec<ProfileActivityView>> {
        let summaries = {
            let mut conn = self.db.acquire().await?;
            all_profile_summaries(&mut conn).await?
        };

        let mut views = Vec::with_capacity(summaries.len());
        for profile in summaries {
            let activities = self
                .activity
                .for_subject("profile", &profile.nickname)
                .await?
                .iter()
                .map(|a| a.to_json())
                .collect();

            views.push(ProfileActivityView { profile, activities });
        }

        Ok(views)
    }

    pub async fn reported_articles(&self) -> ApiResult<Vec<ReportedArticle>> {
        let mut conn = self.db.acquire().await?;

        let rows = sqlx::query_as::<_, ReportedArticleRow>(
            r#"
            SELECT a.id, a.author, a.title, a.content, a.tags,
                   (SELECT COUNT(*) FROM like_reactions l WHERE l.article_id = a.id) AS likes,
                   (SELECT COUNT(*) FROM comments c WHERE c.article_id = a.id) AS comments,
                   COUNT(r.id) AS reports,
                   a.banned_at
            FROM articles a
            JOIN reports r ON r.target_type = 'article' AND r.target_id = CAST(a.id AS TEXT)
            GROUP BY a.id
            ORDER BY a.title ASC, a.id ASC
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        let mut articles = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(author) = profile_summary(&mut conn, &row.author).await? else {
                continue;
            };

            let reporter: Option<(i64, String, String)> = sqlx::query_as(
                r#"
                SELECT u.id, u.email, u.role
                FROM reports r
                JOIN users u ON u.id = r.causer
                WHERE r.target_type = 'article' AND r.target_id = ?
                ORDER BY r.created_at ASC, r.id ASC
                LIMIT 1
                "#,
            )
            .bind(row.id.to_string())
            .fetch_optional(&mut *conn)
            .await?;

            let reporter = match reporter {
                Some((id, email, role)) => Some(Reporter {
                    id,
                    email,
                    role: Role::from_str(&role)?,
                }),
                None => None,
            };

            articles.push(ReportedArticle {
                id: row.id,
                author,
                title: row.title,
                content: row.content,
                tags: row.tags,
                likes: row.likes,
                comments: row.comments,
                reports: row.reports,
                reporter,
                banned_at: row.banned_at,
            });
        }

        Ok(articles)
    }

    pub async fn reported_comments(&self) -> ApiResult<Vec<ReportedComment>> {
        let comments = sqlx::query_as::<_, ReportedComment>(
            r#"
            SELECT c.id, c.causer, p.nickname, c.article_id, a.title AS article_title,
                   c.content, COUNT(r.id) AS reports, c.banned_at, c.created_at
            FROM comments c
            JOIN articles a ON a.id = c.article_id
            LEFT JOIN profiles p ON p.user_id = c.causer
            JOIN reports r ON r.target_type = 'comment' AND r.target_id = CAST(c.id AS TEXT)
            GROUP BY c.id
            ORDER BY c.created_at DESC, c.id DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(comments)
    }

    pub async fn reported_profiles(&self) -> ApiResult<Vec<ReportedProfile>> {
        let mut conn = self.db.acquire().await?;

        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT r.target_id, COUNT(*)
            FROM reports r
            JOIN profiles p ON p.nickname = r.target_id
            WHERE r.target_type = 'profile'
            GROUP BY r.target_id
            ORDER BY r.target_id ASC
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        let mut profiles = Vec::with_capacity(rows.len());
        for (nickname, reports) in rows {
            if let Some(profile) = profile_summary(&mut conn, &nickname).await? {
                profiles.push(ReportedProfile { profile, reports });
            }
        }

        Ok(profiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        content::{test_support, ArticleManager, CreateArticleRequest, CreateProfileRequest, ProfileManager},
        moderation::{ModerationService, ReportTarget},
    };

    #[tokio::test]
    async fn test_reported_listings() {
        let (pool, activity) = test_support::pool().await;
        let profiles = ProfileManager::new(pool.clone(), activity.clone());
        let articles = ArticleManager::new(pool.clone(), activity.clone());
        let moderation = ModerationService::new(pool.clone(), activity.clone());
        let lists = StaffLists::new(pool.clone(), activity);

        let writer = test_support::user(&pool, "w@example.com", Role::User).await;
        let reader = test_support::user(&pool, "r@example.com", Role::User).await;
        profiles
            .create(
                &writer,
                CreateProfileRequest {
                    nickname: "writer".to_string(),
                    description: None,
                    logo: None,
                },
            )
            .await
            .unwrap();

        let article = articles
            .create(
                &writer,
                CreateArticleRequest {
                    title: "Hot take".to_string(),
                    content: "Body".to_string(),
                    tags: None,
                    thumbnail: None,
                },
            )
            .await
            .unwrap();
        let comment = articles.comment(&reader, article.id, "rude").await.unwrap();

        moderation
            .submit_report(&reader, ReportTarget::Article(article.id), "spam")
            .await
            .unwrap();
        moderation
            .submit_report(&writer, ReportTarget::Article(article.id), "spam")
            .await
            .unwrap();
        moderation
            .submit_report(&writer, ReportTarget::Comment(comment.id), "rude")
            .await
            .unwrap();
        moderation
            .submit_report(&reader, ReportTarget::Profile("writer".into()), "impersonation")
            .await
            .unwrap();

        let reported = lists.reported_articles().await.unwrap();
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].reports, 2);
        assert_eq!(reported[0].comments, 1);
        assert_eq!(reported[0].reporter.as_ref().map(|r| r.id), Some(reader.id));

        let comments = lists.reported_comments().await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].article_title, "Hot take");

        let reported_profiles = lists.reported_profiles().await.unwrap();
        assert_eq!(reported_profiles.len(), 1);
        assert_eq!(reported_profiles[0].profile.nickname, "writer");

        let all = lists.profiles().await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0]
            .activities
            .iter()
            .any(|a| a["description"] == "Profile created"));
    }

    #[tokio::test]
    async fn test_moderators_with_notes() {
        let (pool, activity) = test_support::pool().await;
        let profiles = ProfileManager::new(pool.clone(), activity.clone());
        let articles = ArticleManager::new(pool.clone(), activity.clone());
        let lists = StaffLists::new(pool.clone(), activity);

        let moderator = test_support::user(&pool, "m@example.com", Role::Moderator).await;
        test_support::user(&pool, "u@example.com", Role::User).await;
        profiles
            .create(
                &moderator,
                CreateProfileRequest {
                    nickname: "mod".to_string(),
                    description: None,
                    logo: None,
                },
            )
            .await
            .unwrap();

        let article = articles
            .create(
                &moderator,
                CreateArticleRequest {
                    title: "Rules".to_string(),
                    content: "Be nice".to_string(),
                    tags: None,
                    thumbnail: None,
                },
            )
            .await
            .unwrap();
        articles.create_note(&moderator, article.id, "pinned").await.unwrap();

        let moderators = lists.moderators().await.unwrap();
        assert_eq!(moderators.len(), 1);
        assert_eq!(moderators[0].notes.len(), 1);

        let notes = lists.notes().await.unwrap();
        assert_eq!(notes[0].article_title, "Rules");
    }
}
