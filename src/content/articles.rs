/// Articles, comments, likes and moderator notes
use super::{expand_articles, profile_of_user, ArticleRow, ArticleView, CreateArticleRequest, ARTICLE_ROW_SQL};
use crate::{
    activity::{ActivityLogger, NewActivity},
    db::{self, models::{Article, Comment, LikeReaction, Note, User}},
    error::{ApiError, ApiResult},
    moderation::Role,
};
use chrono::Utc;
use serde_json::json;
use sqlx::{SqliteConnection, SqlitePool};

fn article_not_found() -> ApiError {
    ApiError::NotFound("Article not found.".to_string())
}

async fn article_exists(conn: &mut SqliteConnection, id: i64) -> ApiResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM articles WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

/// Article manager
#[derive(Clone)]
pub struct ArticleManager {
    db: SqlitePool,
    activity: ActivityLogger,
}

impl ArticleManager {
    pub fn new(db: SqlitePool, activity: ActivityLogger) -> Self {
        Self { db, activity }
    }

    /// Publish under the caller's profile
    pub async fn create(&self, user: &User, request: CreateArticleRequest) -> ApiResult<Article> {
        let mut conn = self.db.acquire().await?;

        let profile = profile_of_user(&mut conn, user.id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Profile not found.".to_string()))?;

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO articles (author, title, content, tags, thumbnail, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&profile.nickname)
        .bind(&request.title)
        .bind(&request.content)
        .bind(&request.tags)
        .bind(&request.thumbnail)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;
        drop(conn);

        let article = Article {
            id: result.last_insert_rowid(),
            author: profile.nickname,
            title: request.title,
            content: request.content,
            tags: request.tags,
            thumbnail: request.thumbnail,
            banned_at: None,
            created_at: now,
            updated_at: now,
        };

        tracing::info!(article = article.id, author = %article.author, "Article created");

        self.activity
            .record(
                NewActivity::new("articles", "Article created")
                    .subject("article", article.id)
                    .causer(user.id)
                    .properties(json!({ "title": article.title }))
                    .event("created"),
            )
            .await;

        Ok(article)
    }

    /// Article with author, like count and comments
    pub async fn show(&self, id: i64) -> ApiResult<ArticleView> {
        let mut conn = self.db.acquire().await?;

        let rows = sqlx::query_as::<_, ArticleRow>(&format!("{} WHERE a.id = ?", ARTICLE_ROW_SQL))
            .bind(id)
            .fetch_all(&mut *conn)
            .await?;

        expand_articles(&mut conn, rows)
            .await?
            .into_iter()
            .next()
            .ok_or_else(article_not_found)
    }

    pub async fn like(&self, user: &User, article_id: i64) -> ApiResult<LikeReaction> {
        let mut conn = self.db.acquire().await?;

        if !article_exists(&mut conn, article_id).await? {
            return Err(article_not_found());
        }

        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO like_reactions (causer, article_id, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user.id)
        .bind(article_id)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                ApiError::Conflict("Article already liked.".to_string())
            }
            other => ApiError::Database(other),
        })?;

        Ok(LikeReaction {
            id: result.last_insert_rowid(),
            causer: user.id,
            article_id,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn unlike(&self, user: &User, article_id: i64) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM like_reactions WHERE causer = ? AND article_id = ?")
            .bind(user.id)
            .bind(article_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Like not found.".to_string()));
        }

        Ok(())
    }

    pub async fn comment(&self, user: &User, article_id: i64, content: &str) -> ApiResult<Comment> {
        let mut conn = self.db.acquire().await?;

        if !article_exists(&mut conn, article_id).await? {
            return Err(article_not_found());
        }

        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO comments (causer, article_id, content, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user.id)
        .bind(article_id)
        .bind(content)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;
        drop(conn);

        let comment = Comment {
            id: result.last_insert_rowid(),
            causer: user.id,
            article_id,
            content: content.to_string(),
            banned_at: None,
            created_at: now,
            updated_at: now,
        };

        self.activity
            .record(
                NewActivity::new("comments", "Comment created")
                    .subject("comment", comment.id)
                    .causer(user.id)
                    .properties(json!({ "article_id": article_id }))
                    .event("created"),
            )
            .await;

        Ok(comment)
    }

    /// Attach a moderator note. Moderator or higher, with a profile.
    pub async fn create_note(&self, user: &User, article_id: i64, content: &str) -> ApiResult<Note> {
        crate::require_role!(user.role, Role::Moderator)?;

        let mut conn = self.db.acquire().await?;

        let profile = profile_of_user(&mut conn, user.id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Profile not found.".to_string()))?;

        if !article_exists(&mut conn, article_id).await? {
            return Err(article_not_found());
        }

        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO notes (content, causer, article_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(content)
        .bind(&profile.nickname)
        .bind(article_id)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;
        drop(conn);

        let note = Note {
            id: result.last_insert_rowid(),
            content: content.to_string(),
            causer: profile.nickname,
            article_id,
            created_at: now,
            updated_at: now,
        };

        self.activity
            .record(
                NewActivity::new("notes", "Note created")
                    .subject("note", note.id)
                    .causer(user.id)
                    .event("created"),
            )
            .await;

        Ok(note)
    }

    /// Remove a note. Its author or admin and above.
    pub async fn delete_note(&self, user: &User, note_id: i64) -> ApiResult<()> {
        let mut tx = db::begin_write(&self.db).await?;

        let author: Option<String> = sqlx::query_scalar("SELECT causer FROM notes WHERE id = ?")
            .bind(note_id)
            .fetch_optional(&mut *tx)
            .await?;
        let author = author.ok_or_else(|| ApiError::NotFound("Note not found.".to_string()))?;

        let is_owner = profile_of_user(&mut tx, user.id)
            .await?
            .is_some_and(|p| p.nickname == author);

        if !is_owner && !user.role.is_staff() {
            return Err(ApiError::Forbidden("Forbidden".to_string()));
        }

        sqlx::query("DELETE FROM notes WHERE id = ?")
            .bind(note_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.activity
            .record(
                NewActivity::new("notes", "Note deleted")
                    .subject("note", note_id)
                    .causer(user.id)
                    .event("deleted"),
            )
            .await;

        Ok(())
    }
}
