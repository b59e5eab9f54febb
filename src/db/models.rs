/// Row models for the Quillboard database
use crate::{error::ApiResult, moderation::Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Raw `users` row; the role column is still an unchecked string
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub banned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Account record with a decoded role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub banned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    /// Decode the role column; an unknown value is an invariant violation
    pub fn into_user(self) -> ApiResult<User> {
        Ok(User {
            role: Role::from_str(&self.role)?,
            id: self.id,
            email: self.email,
            password_hash: self.password_hash,
            email_verified_at: self.email_verified_at,
            banned_at: self.banned_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl User {
    pub fn is_banned(&self) -> bool {
        self.banned_at.is_some()
    }
}

/// Public profile, keyed by nickname
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Profile {
    pub nickname: String,
    pub user_id: i64,
    pub description: Option<String>,
    pub logo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    /// Author profile nickname
    pub author: String,
    pub title: String,
    pub content: String,
    pub tags: Option<String>,
    pub thumbnail: Option<String>,
    pub banned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    /// Author user id
    pub causer: i64,
    pub article_id: i64,
    pub content: String,
    pub banned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LikeReaction {
    pub id: i64,
    pub causer: i64,
    pub article_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Moderator note attached to an article
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub content: String,
    /// Author profile nickname
    pub causer: String,
    pub article_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `causer` follows `author`; both are profile nicknames
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub causer: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Ban ledger row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BanRecord {
    pub id: i64,
    pub causer: i64,
    pub target_type: String,
    pub target_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Report ledger row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    pub causer: i64,
    pub target_type: String,
    pub target_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
