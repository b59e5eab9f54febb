/// Moderation targets
///
/// Ban-capable and reportable entities are modelled as tagged unions so
/// each variant carries its own identifier type and storage rules.
use crate::error::{ApiError, ApiResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqliteConnection;

/// Entity carrying a `banned_at` column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum BanTarget {
    Account(i64),
    Article(i64),
    Comment(i64),
}

impl BanTarget {
    /// Value stored in `bans.target_type`
    pub fn kind(&self) -> &'static str {
        match self {
            BanTarget::Account(_) => "account",
            BanTarget::Article(_) => "article",
            BanTarget::Comment(_) => "comment",
        }
    }

    /// Human label used in audit descriptions
    pub fn label(&self) -> &'static str {
        match self {
            BanTarget::Account(_) => "User",
            BanTarget::Article(_) => "Article",
            BanTarget::Comment(_) => "Comment",
        }
    }

    /// Subject type recorded on activities
    pub fn subject_type(&self) -> &'static str {
        match self {
            BanTarget::Account(_) => "user",
            BanTarget::Article(_) => "article",
            BanTarget::Comment(_) => "comment",
        }
    }

    /// Name of the log the activity belongs to
    pub fn log_name(&self) -> &'static str {
        match self {
            BanTarget::Account(_) => "users",
            BanTarget::Article(_) => "articles",
            BanTarget::Comment(_) => "comments",
        }
    }

    fn table(&self) -> &'static str {
        match self {
            BanTarget::Account(_) => "users",
            BanTarget::Article(_) => "articles",
            BanTarget::Comment(_) => "comments",
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            BanTarget::Account(id) | BanTarget::Article(id) | BanTarget::Comment(id) => *id,
        }
    }

    pub fn not_found(&self) -> ApiError {
        ApiError::NotFound(format!("{} not found.", self.label()))
    }

    /// Current ban timestamp, or NotFound if the entity does not exist
    pub async fn ban_state(&self, conn: &mut SqliteConnection) -> ApiResult<Option<DateTime<Utc>>> {
        let row: Option<(Option<DateTime<Utc>>,)> =
            sqlx::query_as(&format!("SELECT banned_at FROM {} WHERE id = ?", self.table()))
                .bind(self.id())
                .fetch_optional(&mut *conn)
                .await?;

        row.map(|(banned_at,)| banned_at)
            .ok_or_else(|| self.not_found())
    }

    /// Flip the ban timestamp only if the entity is in the opposite state.
    /// Returns false when another writer got there first.
    pub async fn set_ban_state(
        &self,
        conn: &mut SqliteConnection,
        banned_at: Option<DateTime<Utc>>,
    ) -> ApiResult<bool> {
        let guard = if banned_at.is_some() {
            "banned_at IS NULL"
        } else {
            "banned_at IS NOT NULL"
        };

        let result = sqlx::query(&format!(
            "UPDATE {} SET banned_at = ?, updated_at = ? WHERE id = ? AND {}",
            self.table(),
            guard
        ))
        .bind(banned_at)
        .bind(Utc::now())
        .bind(self.id())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Permanently remove the entity; dependents cascade through foreign keys
    pub async fn delete(&self, conn: &mut SqliteConnection) -> ApiResult<()> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = ?", self.table()))
            .bind(self.id())
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(self.not_found());
        }

        Ok(())
    }
}

/// Entity that can receive reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum ReportTarget {
    Profile(String),
    Article(i64),
    Comment(i64),
}

impl ReportTarget {
    /// Value stored in `reports.target_type`
    pub fn kind(&self) -> &'static str {
        match self {
            ReportTarget::Profile(_) => "profile",
            ReportTarget::Article(_) => "article",
            ReportTarget::Comment(_) => "comment",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReportTarget::Profile(_) => "Profile",
            ReportTarget::Article(_) => "Article",
            ReportTarget::Comment(_) => "Comment",
        }
    }

    pub fn log_name(&self) -> &'static str {
        match self {
            ReportTarget::Profile(_) => "profiles",
            ReportTarget::Article(_) => "articles",
            ReportTarget::Comment(_) => "comments",
        }
    }

    /// Value stored in `reports.target_id`
    pub fn target_id(&self) -> String {
        match self {
            ReportTarget::Profile(nickname) => nickname.clone(),
            ReportTarget::Article(id) | ReportTarget::Comment(id) => id.to_string(),
        }
    }

    pub async fn exists(&self, conn: &mut SqliteConnection) -> ApiResult<bool> {
        let found: Option<i64> = match self {
            ReportTarget::Profile(nickname) => {
                sqlx::query_scalar("SELECT 1 FROM profiles WHERE nickname = ?")
                    .bind(nickname)
                    .fetch_optional(&mut *conn)
                    .await?
            }
            ReportTarget::Article(id) => {
                sqlx::query_scalar("SELECT 1 FROM articles WHERE id = ?")
                    .bind(id)
                    .fetch_optional(&mut *conn)
                    .await?
            }
            ReportTarget::Comment(id) => {
                sqlx::query_scalar("SELECT 1 FROM comments WHERE id = ?")
                    .bind(id)
                    .fetch_optional(&mut *conn)
                    .await?
            }
        };

        Ok(found.is_some())
    }
}

impl std::fmt::Display for ReportTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} #{}", self.kind(), self.target_id())
    }
}
