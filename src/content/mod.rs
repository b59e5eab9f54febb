/// Blogging content
///
/// Profiles, articles, comments, likes, moderator notes, subscriptions,
/// and the read models served by the home feed and staff listings.
pub mod articles;
pub mod feeds;
pub mod lists;
pub mod profiles;

pub use articles::ArticleManager;
pub use feeds::FeedManager;
pub use lists::StaffLists;
pub use profiles::ProfileManager;

use crate::db::models::Profile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection};
use validator::Validate;

// ----------------------------------------------------------------------
// Requests
// ----------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProfileRequest {
    #[validate(length(min = 1, max = 255, message = "The nickname field must be 1-255 characters."))]
    pub nickname: String,
    pub description: Option<String>,
    pub logo: Option<String>,
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 255, message = "The nickname field must be 1-255 characters."))]
    pub nickname: Option<String>,
    pub description: Option<String>,
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateArticleRequest {
    #[validate(length(min = 1, max = 255, message = "The title field must be 1-255 characters."))]
    pub title: String,
    #[validate(length(min = 1, message = "The content field is required."))]
    pub content: String,
    pub tags: Option<String>,
    pub thumbnail: Option<String>,
}

/// Comment or moderator note body
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TextRequest {
    #[validate(length(min = 1, max = 1000, message = "The content field must be 1-1000 characters."))]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SearchRequest {
    #[validate(length(min = 1, message = "The query field is required."))]
    pub query: String,
}

// ----------------------------------------------------------------------
// Read models
// ----------------------------------------------------------------------

/// Profile as embedded in other responses
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProfileSummary {
    pub nickname: String,
    pub account_id: i64,
    pub description: Option<String>,
    pub logo: Option<String>,
    pub followers: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CommentView {
    pub id: i64,
    pub causer: i64,
    /// Commenter's nickname, if they have a profile
    pub nickname: Option<String>,
    pub logo: Option<String>,
    pub article_id: i64,
    pub content: String,
    pub banned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleView {
    pub id: i64,
    pub author: ProfileSummary,
    pub title: String,
    pub content: String,
    pub tags: Option<String>,
    pub thumbnail: Option<String>,
    pub likes: i64,
    pub comments: Vec<CommentView>,
    pub banned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ----------------------------------------------------------------------
// Shared queries
// ----------------------------------------------------------------------

const PROFILE_SUMMARY_SQL: &str = r#"
    SELECT p.nickname, p.user_id AS account_id, p.description, p.logo,
           (SELECT COUNT(*) FROM subscriptions s WHERE s.author = p.nickname) AS followers,
           p.created_at, p.updated_at
    FROM profiles p
"#;

pub(crate) async fn profile_summary(
    conn: &mut SqliteConnection,
    nickname: &str,
) -> sqlx::Result<Option<ProfileSummary>> {
    sqlx::query_as::<_, ProfileSummary>(&format!("{} WHERE p.nickname = ?", PROFILE_SUMMARY_SQL))
        .bind(nickname)
        .fetch_optional(&mut *conn)
        .await
}

pub(crate) async fn all_profile_summaries(conn: &mut SqliteConnection) -> sqlx::Result<Vec<ProfileSummary>> {
    sqlx::query_as::<_, ProfileSummary>(&format!(
        "{} ORDER BY p.created_at DESC, p.nickname ASC",
        PROFILE_SUMMARY_SQL
    ))
    .fetch_all(&mut *conn)
    .await
}

pub(crate) async fn profile_of_user(conn: &mut SqliteConnection, user_id: i64) -> sqlx::Result<Option<Profile>> {
    sqlx::query_as::<_, Profile>(
        "SELECT nickname, user_id, description, logo, created_at, updated_at FROM profiles WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await
}

async fn comments_for(conn: &mut SqliteConnection, article_id: i64) -> sqlx::Result<Vec<CommentView>> {
    sqlx::query_as::<_, CommentView>(
        r#"
        SELECT c.id, c.causer, p.nickname, p.logo, c.article_id, c.content,
               c.banned_at, c.created_at, c.updated_at
        FROM comments c
        LEFT JOIN profiles p ON p.user_id = c.causer
        WHERE c.article_id = ?
        ORDER BY c.created_at ASC, c.id ASC
        "#,
    )
    .bind(article_id)
    .fetch_all(&mut *conn)
    .await
}

#[derive(FromRow)]
struct ArticleRow {
    id: i64,
    author: String,
    title: String,
    content: String,
    tags: Option<String>,
    thumbnail: Option<String>,
    likes: i64,
    banned_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Select list for `ArticleRow`; callers append their own FROM tail
const ARTICLE_ROW_SQL: &str = r#"
    SELECT a.id, a.author, a.title, a.content, a.tags, a.thumbnail,
           (SELECT COUNT(*) FROM like_reactions l WHERE l.article_id = a.id) AS likes,
           a.banned_at, a.created_at, a.updated_at
    FROM articles a
"#;

/// Expand article rows into full views with author and comments
async fn expand_articles(conn: &mut SqliteConnection, rows: Vec<ArticleRow>) -> sqlx::Result<Vec<ArticleView>> {
    let mut views = Vec::with_capacity(rows.len());

    for row in rows {
        let Some(author) = profile_summary(conn, &row.author).await? else {
            // Cascades keep this from happening; skip rather than fail the listing
            tracing::warn!(article = row.id, author = %row.author, "Article without author profile");
            continue;
        };

        let comments = comments_for(conn, row.id).await?;

        views.push(ArticleView {
            id: row.id,
            author,
            title: row.title,
            content: row.content,
            tags: row.tags,
            thumbnail: row.thumbnail,
            likes: row.likes,
            comments,
            banned_at: row.banned_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        });
    }

    Ok(views)
}
