/// Report ledger
use super::target::ReportTarget;
use crate::{db::models::Report, error::ApiResult};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

/// Report ledger manager
#[derive(Clone)]
pub struct ReportLedger {
    db: SqlitePool,
}

impl ReportLedger {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Append a report inside the caller's transaction
    pub async fn insert(
        conn: &mut SqliteConnection,
        causer: i64,
        target: &ReportTarget,
        content: &str,
    ) -> ApiResult<Report> {
        let now = Utc::now();
        let target_id = target.target_id();

        let result = sqlx::query(
            r#"
            INSERT INTO reports (causer, target_type, target_id, content, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(causer)
        .bind(target.kind())
        .bind(&target_id)
        .bind(content)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(Report {
            id: result.last_insert_rowid(),
            causer,
            target_type: target.kind().to_string(),
            target_id,
            content: content.to_string(),
            created_at: now,
        })
    }

    /// Delete every report on a target and return how many went
    pub async fn delete_all(conn: &mut SqliteConnection, target: &ReportTarget) -> ApiResult<u64> {
        let result = sqlx::query("DELETE FROM reports WHERE target_type = ? AND target_id = ?")
            .bind(target.kind())
            .bind(target.target_id())
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected())
    }

    /// Number of open reports on a target
    pub async fn count(&self, target: &ReportTarget) -> ApiResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reports WHERE target_type = ? AND target_id = ?",
        )
        .bind(target.kind())
        .bind(target.target_id())
        .fetch_one(&self.db)
        .await?;

        Ok(count)
    }
}
