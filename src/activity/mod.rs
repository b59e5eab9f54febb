/// Activity log
///
/// Append-only audit trail of significant actions. Writes are a best-effort
/// side channel: they run after the primary transaction has committed and a
/// failure is logged, never returned to the caller.
use crate::{error::ApiResult, metrics, moderation::Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::{types::Json, FromRow, SqlitePool};

/// Stored activity
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Activity {
    pub id: i64,
    pub log_name: String,
    pub description: String,
    pub subject_type: Option<String>,
    pub subject_id: Option<String>,
    pub causer_id: Option<i64>,
    pub properties: Json<Value>,
    pub event: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Activity {
    /// Response shape used by the activity and listing endpoints
    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "log_name": self.log_name,
            "description": self.description,
            "subject_id": self.subject_id,
            "subject_type": self.subject_type,
            "causer_id": self.causer_id,
            "causer_type": self.causer_id.map(|_| "user"),
            "properties": self.properties.0,
            "event": self.event.as_deref().unwrap_or("N/A"),
            "created_at": self.created_at,
            "updated_at": self.updated_at,
            "status": "success",
        })
    }
}

/// Activity about to be recorded
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub log_name: &'static str,
    pub description: String,
    pub subject_type: Option<&'static str>,
    pub subject_id: Option<String>,
    pub causer_id: Option<i64>,
    pub properties: Value,
    pub event: Option<&'static str>,
}

impl NewActivity {
    pub fn new(log_name: &'static str, description: impl Into<String>) -> Self {
        Self {
            log_name,
            description: description.into(),
            subject_type: None,
            subject_id: None,
            causer_id: None,
            properties: json!({}),
            event: None,
        }
    }

    pub fn subject(mut self, subject_type: &'static str, subject_id: impl ToString) -> Self {
        self.subject_type = Some(subject_type);
        self.subject_id = Some(subject_id.to_string());
        self
    }

    pub fn causer(mut self, user_id: i64) -> Self {
        self.causer_id = Some(user_id);
        self
    }

    pub fn properties(mut self, properties: Value) -> Self {
        self.properties = properties;
        self
    }

    pub fn event(mut self, event: &'static str) -> Self {
        self.event = Some(event);
        self
    }
}

/// Activity logger service
#[derive(Clone)]
pub struct ActivityLogger {
    db: SqlitePool,
}

impl ActivityLogger {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Record an activity. Never fails the caller.
    pub async fn record(&self, activity: NewActivity) {
        if let Err(e) = self.insert(&activity).await {
            metrics::AUDIT_FAILURES_TOTAL.inc();
            tracing::warn!(
                log_name = activity.log_name,
                description = %activity.description,
                "Failed to record activity: {}",
                e
            );
        }
    }

    async fn insert(&self, activity: &NewActivity) -> ApiResult<i64> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO activities
            (log_name, description, subject_type, subject_id, causer_id, properties, event, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(activity.log_name)
        .bind(&activity.description)
        .bind(activity.subject_type)
        .bind(&activity.subject_id)
        .bind(activity.causer_id)
        .bind(activity.properties.to_string())
        .bind(activity.event)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Activities caused by a user, newest first
    pub async fn for_causer(&self, user_id: i64) -> ApiResult<Vec<Activity>> {
        let activities = sqlx::query_as::<_, Activity>(
            r#"
            SELECT id, log_name, description, subject_type, subject_id, causer_id,
                   properties, event, created_at, updated_at
            FROM activities
            WHERE causer_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(activities)
    }

    /// Activities caused by any account currently holding one of the roles
    pub async fn for_causer_roles(&self, roles: &[Role]) -> ApiResult<Vec<Activity>> {
        if roles.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; roles.len()].join(", ");
        let sql = format!(
            r#"
            SELECT a.id, a.log_name, a.description, a.subject_type, a.subject_id, a.causer_id,
                   a.properties, a.event, a.created_at, a.updated_at
            FROM activities a
            JOIN users u ON u.id = a.causer_id
            WHERE u.role IN ({})
            ORDER BY a.created_at DESC, a.id DESC
            "#,
            placeholders
        );

        let mut query = sqlx::query_as::<_, Activity>(&sql);
        for role in roles {
            query = query.bind(role.as_str());
        }

        Ok(query.fetch_all(&self.db).await?)
    }

    /// Activities recorded against a subject, newest first
    pub async fn for_subject(&self, subject_type: &str, subject_id: &str) -> ApiResult<Vec<Activity>> {
        let activities = sqlx::query_as::<_, Activity>(
            r#"
            SELECT id, log_name, description, subject_type, subject_id, causer_id,
                   properties, event, created_at, updated_at
            FROM activities
            WHERE subject_type = ? AND subject_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(subject_type)
        .bind(subject_id)
        .fetch_all(&self.db)
        .await?;

        Ok(activities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn setup() -> (SqlitePool, ActivityLogger) {
        let pool = db::memory_pool().await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        (pool.clone(), ActivityLogger::new(pool))
    }

    #[tokio::test]
    async fn test_record_and_list_by_causer() {
        let (_pool, logger) = setup().await;

        logger
            .record(
                NewActivity::new("articles", "Article created")
                    .subject("article", 7)
                    .causer(3)
                    .properties(json!({"title": "Hello"}))
                    .event("created"),
            )
            .await;

        let activities = logger.for_causer(3).await.unwrap();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].description, "Article created");
        assert_eq!(activities[0].subject_id.as_deref(), Some("7"));
        assert_eq!(activities[0].properties.0["title"], "Hello");

        let by_subject = logger.for_subject("article", "7").await.unwrap();
        assert_eq!(by_subject.len(), 1);
    }

    #[tokio::test]
    async fn test_record_swallows_storage_failure() {
        let (pool, logger) = setup().await;
        sqlx::query("DROP TABLE activities").execute(&pool).await.unwrap();

        // Must not panic or propagate
        logger.record(NewActivity::new("users", "User banned")).await;
    }
}
