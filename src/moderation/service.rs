/// Moderation state machine
///
/// Every transition runs its precondition check and its writes in one
/// transaction. The ban flip itself is a conditional update, so two racing
/// requests cannot both pass. Activity entries are written after commit.
use super::{
    bans::{BanLedger, ACCOUNT_UNBAN_PREFIX},
    reports::ReportLedger,
    roles::Role,
    target::{BanTarget, ReportTarget},
};
use crate::{
    account::AccountManager,
    activity::{ActivityLogger, NewActivity},
    db::{self, models::{BanRecord, Report, User}},
    error::{ApiError, ApiResult},
    metrics,
};
use chrono::Utc;
use serde_json::json;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};

/// Longest accepted ban reason or report body
pub const MAX_REASON_LENGTH: usize = 1000;

fn validate_text(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::Validation(format!("The {} field is required.", field)));
    }

    if value.chars().count() > MAX_REASON_LENGTH {
        return Err(ApiError::Validation(format!(
            "The {} field must not be greater than {} characters.",
            field, MAX_REASON_LENGTH
        )));
    }

    Ok(())
}

/// Moderation service
#[derive(Clone)]
pub struct ModerationService {
    db: SqlitePool,
    activity: ActivityLogger,
}

impl ModerationService {
    pub fn new(db: SqlitePool, activity: ActivityLogger) -> Self {
        Self { db, activity }
    }

    // ------------------------------------------------------------------
    // Ban / unban
    // ------------------------------------------------------------------

    /// Check that `actor` may ban or unban `target`
    pub async fn authorize_ban(&self, actor: &User, target: BanTarget) -> ApiResult<()> {
        let mut conn = self.db.acquire().await?;
        Self::check_ban_authority(&mut conn, actor, target, "ban").await
    }

    async fn check_ban_authority(
        conn: &mut SqliteConnection,
        actor: &User,
        target: BanTarget,
        verb: &str,
    ) -> ApiResult<()> {
        match target {
            BanTarget::Account(id) => {
                let subject = AccountManager::find_user(conn, id)
                    .await?
                    .ok_or_else(|| target.not_found())?;

                if !actor.role.can_act_on(subject.role) {
                    warn!(
                        actor = actor.id,
                        target = id,
                        "Ban rejected: {} cannot act on {}",
                        actor.role,
                        subject.role
                    );
                    return Err(ApiError::Forbidden(format!(
                        "You are not allowed to {} this user.",
                        verb
                    )));
                }
            }
            BanTarget::Article(_) | BanTarget::Comment(_) => {
                // Content has no role; compare against a fixed minimum
                target.ban_state(conn).await?;

                if !actor.role.is_staff() {
                    return Err(ApiError::Forbidden(format!(
                        "Only admins can {} a {}.",
                        verb,
                        target.kind()
                    )));
                }
            }
        }

        Ok(())
    }

    /// Active -> Banned
    pub async fn apply_ban(&self, actor: &User, target: BanTarget, reason: &str) -> ApiResult<BanRecord> {
        validate_text("reason", reason)?;

        let mut tx = db::begin_write(&self.db).await?;

        Self::check_ban_authority(&mut tx, actor, target, "ban").await?;

        let already = || ApiError::AlreadyInState(format!("{} is already banned.", target.label()));

        if target.ban_state(&mut tx).await?.is_some() {
            return Err(already());
        }

        if !target.set_ban_state(&mut tx, Some(Utc::now())).await? {
            return Err(already());
        }

        let record = BanLedger::insert(&mut tx, actor.id, target, reason).await?;

        tx.commit().await?;

        metrics::record_moderation_action("ban", target.kind());
        info!(actor = actor.id, target = target.id(), kind = target.kind(), "{} banned", target.label());

        self.activity
            .record(
                NewActivity::new(target.log_name(), format!("{} banned", target.label()))
                    .subject(target.subject_type(), target.id())
                    .causer(actor.id)
                    .properties(json!({ "reason": reason }))
                    .event("banned"),
            )
            .await;

        Ok(record)
    }

    /// Banned -> Active.
    ///
    /// Accounts require a reason and keep it in the ledger as a fresh
    /// record; articles and comments leave nothing behind.
    pub async fn apply_unban(
        &self,
        actor: &User,
        target: BanTarget,
        reason: Option<&str>,
    ) -> ApiResult<Option<BanRecord>> {
        let account_reason = match target {
            BanTarget::Account(_) => {
                let reason = reason.unwrap_or_default();
                validate_text("reason", reason)?;
                Some(reason)
            }
            _ => {
                if let Some(reason) = reason.filter(|r| !r.is_empty()) {
                    validate_text("reason", reason)?;
                }
                None
            }
        };

        let mut tx = db::begin_write(&self.db).await?;

        Self::check_ban_authority(&mut tx, actor, target, "unban").await?;

        let not_banned = || ApiError::AlreadyInState(format!("{} is not banned.", target.label()));

        if target.ban_state(&mut tx).await?.is_none() {
            return Err(not_banned());
        }

        if !target.set_ban_state(&mut tx, None).await? {
            return Err(not_banned());
        }

        BanLedger::delete_latest(&mut tx, target).await?;

        let record = match account_reason {
            Some(reason) => Some(
                BanLedger::insert(
                    &mut tx,
                    actor.id,
                    target,
                    &format!("{}{}", ACCOUNT_UNBAN_PREFIX, reason),
                )
                .await?,
            ),
            None => None,
        };

        tx.commit().await?;

        metrics::record_moderation_action("unban", target.kind());
        info!(actor = actor.id, target = target.id(), kind = target.kind(), "{} unbanned", target.label());

        let properties = match reason {
            Some(reason) if !reason.is_empty() => json!({ "reason": reason }),
            _ => json!({}),
        };

        self.activity
            .record(
                NewActivity::new(target.log_name(), format!("{} unbanned", target.label()))
                    .subject(target.subject_type(), target.id())
                    .causer(actor.id)
                    .properties(properties)
                    .event("unbanned"),
            )
            .await;

        Ok(record)
    }

    // ------------------------------------------------------------------
    // Role change
    // ------------------------------------------------------------------

    /// Pure role-change check
    pub fn authorize_role_change(actor: &User, target_current: Role, requested: Role) -> ApiResult<()> {
        if !actor.role.can_act_on(target_current) {
            return Err(ApiError::Forbidden(
                "You are not allowed to change this user's role.".to_string(),
            ));
        }

        if !actor.role.can_assign_role(target_current, requested) {
            return Err(ApiError::Forbidden(
                "Admins can only assign roles up to moderator.".to_string(),
            ));
        }

        Ok(())
    }

    /// Set a target account's role
    pub async fn apply_role_change(&self, actor: &User, target_id: i64, requested: &str) -> ApiResult<User> {
        let requested = Role::parse_requested(requested)?;

        let mut tx = db::begin_write(&self.db).await?;

        let mut subject = AccountManager::find_user(&mut tx, target_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;

        let previous = subject.role;
        Self::authorize_role_change(actor, previous, requested)?;

        let now = Utc::now();
        sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ?")
            .bind(requested.as_str())
            .bind(now)
            .bind(target_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        subject.role = requested;
        subject.updated_at = now;

        metrics::record_moderation_action("role_change", "account");
        info!(actor = actor.id, target = target_id, "Role changed {} -> {}", previous, requested);

        self.activity
            .record(
                NewActivity::new("users", "User role changed")
                    .subject("user", target_id)
                    .causer(actor.id)
                    .properties(json!({ "from": previous, "to": requested }))
                    .event("updated"),
            )
            .await;

        Ok(subject)
    }

    // ------------------------------------------------------------------
    // Reports
    // ------------------------------------------------------------------

    /// File a report. Duplicates are allowed.
    pub async fn submit_report(&self, actor: &User, target: ReportTarget, content: &str) -> ApiResult<Report> {
        validate_text("content", content)?;

        let mut tx = db::begin_write(&self.db).await?;

        if !target.exists(&mut tx).await? {
            return Err(ApiError::NotFound(format!("{} not found.", target.label())));
        }

        let report = ReportLedger::insert(&mut tx, actor.id, &target, content).await?;

        tx.commit().await?;

        metrics::record_report_created(target.kind());
        info!(actor = actor.id, "{} reported", target);

        self.activity
            .record(
                NewActivity::new(target.log_name(), format!("{} reported", target.label()))
                    .subject(target.kind(), target.target_id())
                    .causer(actor.id)
                    .properties(json!({ "report_id": report.id }))
                    .event("reported"),
            )
            .await;

        Ok(report)
    }

    /// Delete every report on a target. Zero deletions is a success.
    pub async fn dismiss_reports(&self, actor: &User, target: ReportTarget) -> ApiResult<u64> {
        if !actor.role.is_staff() {
            return Err(ApiError::Forbidden("Forbidden".to_string()));
        }

        let mut tx = db::begin_write(&self.db).await?;
        let deleted = ReportLedger::delete_all(&mut tx, &target).await?;
        tx.commit().await?;

        metrics::record_reports_dismissed(target.kind(), deleted);
        info!(actor = actor.id, deleted, "Dismissed reports on {}", target);

        self.activity
            .record(
                NewActivity::new(
                    target.log_name(),
                    format!("Deleted {} report(s) on {}", deleted, target),
                )
                .subject(target.kind(), target.target_id())
                .causer(actor.id)
                .properties(json!({ "deleted": deleted }))
                .event("dismissed"),
            )
            .await;

        Ok(deleted)
    }

    // ------------------------------------------------------------------
    // Deletion
    // ------------------------------------------------------------------

    /// Check that `actor` may permanently delete `target`
    pub async fn authorize_delete(&self, actor: &User, target: BanTarget) -> ApiResult<()> {
        let mut conn = self.db.acquire().await?;
        Self::check_delete_authority(&mut conn, actor, target).await
    }

    async fn check_delete_authority(
        conn: &mut SqliteConnection,
        actor: &User,
        target: BanTarget,
    ) -> ApiResult<()> {
        match target {
            BanTarget::Account(id) => {
                let subject = AccountManager::find_user(conn, id)
                    .await?
                    .ok_or_else(|| target.not_found())?;

                if subject.role == Role::SuperAdmin {
                    return Err(ApiError::Forbidden(
                        "You are not allowed to delete a superadmin account.".to_string(),
                    ));
                }

                let is_owner = subject.id == actor.id;
                let is_senior_staff = actor.role.is_staff() && actor.role.can_act_on(subject.role);

                if !is_owner && !is_senior_staff {
                    return Err(ApiError::Forbidden("Unauthorized".to_string()));
                }
            }
            BanTarget::Article(id) => {
                let author: Option<(i64,)> = sqlx::query_as(
                    r#"
                    SELECT p.user_id
                    FROM articles a
                    JOIN profiles p ON p.nickname = a.author
                    WHERE a.id = ?
                    "#,
                )
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;

                let (author_id,) = author.ok_or_else(|| target.not_found())?;

                if author_id != actor.id && !actor.role.is_staff() {
                    return Err(ApiError::Forbidden("Forbidden.".to_string()));
                }
            }
            BanTarget::Comment(id) => {
                let causer: Option<i64> = sqlx::query_scalar("SELECT causer FROM comments WHERE id = ?")
                    .bind(id)
                    .fetch_optional(&mut *conn)
                    .await?;

                let causer = causer.ok_or_else(|| target.not_found())?;

                if causer != actor.id && !actor.role.is_staff() {
                    return Err(ApiError::Forbidden("Forbidden.".to_string()));
                }
            }
        }

        Ok(())
    }

    /// Permanently remove an account, article or comment
    pub async fn apply_delete(&self, actor: &User, target: BanTarget) -> ApiResult<()> {
        let mut tx = db::begin_write(&self.db).await?;

        Self::check_delete_authority(&mut tx, actor, target).await?;
        target.delete(&mut tx).await?;

        tx.commit().await?;

        metrics::record_moderation_action("delete", target.kind());
        info!(actor = actor.id, target = target.id(), kind = target.kind(), "{} deleted", target.label());

        self.activity
            .record(
                NewActivity::new(target.log_name(), format!("{} deleted", target.label()))
                    .subject(target.subject_type(), target.id())
                    .causer(actor.id)
                    .event("deleted"),
            )
            .await;

        Ok(())
    }
}
