/// Ban ledger
use super::target::BanTarget;
use crate::{db::models::BanRecord, error::ApiResult};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

/// Prefix written to the ledger when an account ban is lifted
pub const ACCOUNT_UNBAN_PREFIX: &str = "User unbanned. Reason: ";

/// Ban ledger manager
#[derive(Clone)]
pub struct BanLedger {
    db: SqlitePool,
}

impl BanLedger {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Append a ban record inside the caller's transaction
    pub async fn insert(
        conn: &mut SqliteConnection,
        causer: i64,
        target: BanTarget,
        content: &str,
    ) -> ApiResult<BanRecord> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO bans (causer, target_type, target_id, content, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(causer)
        .bind(target.kind())
        .bind(target.id())
        .bind(content)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(BanRecord {
            id: result.last_insert_rowid(),
            causer,
            target_type: target.kind().to_string(),
            target_id: target.id(),
            content: content.to_string(),
            created_at: now,
        })
    }

    /// Delete the most recent record for a target. Ties on created_at fall
    /// back to insertion order.
    pub async fn delete_latest(conn: &mut SqliteConnection, target: BanTarget) -> ApiResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM bans
            WHERE id = (
                SELECT id FROM bans
                WHERE target_type = ? AND target_id = ?
                ORDER BY created_at DESC, id DESC
                LIMIT 1
            )
            "#,
        )
        .bind(target.kind())
        .bind(target.id())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Ban records for a target, newest first
    pub async fn history(&self, target: BanTarget) -> ApiResult<Vec<BanRecord>> {
        let records = sqlx::query_as::<_, BanRecord>(
            r#"
            SELECT id, causer, target_type, target_id, content, created_at
            FROM bans
            WHERE target_type = ? AND target_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(target.kind())
        .bind(target.id())
        .fetch_all(&self.db)
        .await?;

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn test_delete_latest_removes_only_newest() {
        let pool = db::memory_pool().await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        let ledger = BanLedger::new(pool.clone());
        let target = BanTarget::Article(4);

        let mut conn = pool.acquire().await.unwrap();
        BanLedger::insert(&mut conn, 1, target, "first").await.unwrap();
        BanLedger::insert(&mut conn, 1, target, "second").await.unwrap();
        BanLedger::insert(&mut conn, 1, BanTarget::Comment(4), "other kind").await.unwrap();

        assert!(BanLedger::delete_latest(&mut conn, target).await.unwrap());
        drop(conn);

        let remaining = ledger.history(target).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].content, "first");

        let other = ledger.history(BanTarget::Comment(4)).await.unwrap();
        assert_eq!(other.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_latest_on_empty_ledger() {
        let pool = db::memory_pool().await.unwrap();
        db::run_migrations(&pool).await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        assert!(!BanLedger::delete_latest(&mut conn, BanTarget::Account(1)).await.unwrap());
    }
}
