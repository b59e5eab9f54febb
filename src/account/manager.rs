/// Account manager implementation using runtime queries
use crate::{
    account::{AuthResponse, LoginRequest, RegisterRequest, ValidatedToken},
    activity::{ActivityLogger, NewActivity},
    config::ServerConfig,
    db::{self, models::{User, UserRow}},
    error::{ApiError, ApiResult},
    mailer::Mailer,
    metrics,
    moderation::Role,
};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::{SqliteConnection, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

const USER_COLUMNS: &str =
    "id, email, password_hash, role, email_verified_at, banned_at, created_at, updated_at";

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// User id
    sub: i64,
    /// Token row id
    jti: String,
    iat: i64,
    exp: i64,
}

/// Hash a password with Argon2id
pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>())
        .map_err(|e| ApiError::Internal(format!("Salt generation failed: {}", e)))?;

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))?;

    Ok(hash.to_string())
}

/// Check a password against a stored Argon2 hash
pub fn verify_password(password: &str, hash: &str) -> ApiResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ApiError::Internal(format!("Stored password hash is invalid: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn digest_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Account manager service
#[derive(Clone)]
pub struct AccountManager {
    db: SqlitePool,
    config: Arc<ServerConfig>,
    mailer: Mailer,
    activity: ActivityLogger,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(db: SqlitePool, config: Arc<ServerConfig>, mailer: Mailer, activity: ActivityLogger) -> Self {
        Self {
            db,
            config,
            mailer,
            activity,
        }
    }

    /// Load a user on an existing connection or transaction
    pub async fn find_user(conn: &mut SqliteConnection, id: i64) -> ApiResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = ?",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    /// Get user by id
    pub async fn get_user(&self, id: i64) -> ApiResult<User> {
        let mut conn = self.db.acquire().await?;
        Self::find_user(&mut conn, id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))
    }

    async fn find_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE email = ?",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    /// Create an account and issue its first token
    pub async fn register(&self, request: RegisterRequest) -> ApiResult<AuthResponse> {
        let email = request.email.trim().to_lowercase();

        if self.find_by_email(&email).await?.is_some() {
            return Err(ApiError::Conflict("The email has already been taken.".to_string()));
        }

        let password_hash = hash_password(&request.password)?;
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO users (email, password_hash, role, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&email)
        .bind(&password_hash)
        .bind(Role::User.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                ApiError::Conflict("The email has already been taken.".to_string())
            }
            other => ApiError::Database(other),
        })?;

        let user = User {
            id: result.last_insert_rowid(),
            email,
            password_hash,
            role: Role::User,
            email_verified_at: None,
            banned_at: None,
            created_at: now,
            updated_at: now,
        };

        metrics::ACCOUNT_CREATIONS_TOTAL.inc();
        tracing::info!(user = user.id, "Account registered");

        self.activity
            .record(
                NewActivity::new("users", "User registered")
                    .subject("user", user.id)
                    .causer(user.id)
                    .event("created"),
            )
            .await;

        let token = self.issue_token(user.id).await?;

        Ok(AuthResponse { user, token })
    }

    /// Authenticate by email and password
    pub async fn login(&self, request: LoginRequest) -> ApiResult<AuthResponse> {
        let email = request.email.trim().to_lowercase();
        let invalid = || ApiError::Authentication("Invalid credentials.".to_string());

        let user = self.find_by_email(&email).await?.ok_or_else(invalid)?;

        if !verify_password(&request.password, &user.password_hash)? {
            tracing::debug!(user = user.id, "Login rejected: bad password");
            return Err(invalid());
        }

        let token = self.issue_token(user.id).await?;

        Ok(AuthResponse { user, token })
    }

    /// Create a token row and sign a JWT that points at it
    pub async fn issue_token(&self, user_id: i64) -> ApiResult<String> {
        let token_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let expires_at = now + Duration::hours(self.config.authentication.access_token_ttl_hours);

        sqlx::query(
            "INSERT INTO access_tokens (id, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&token_id)
        .bind(user_id)
        .bind(now)
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        let claims = Claims {
            sub: user_id,
            jti: token_id,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.authentication.jwt_secret.as_bytes()),
        )
        .map_err(|e| ApiError::Jwt(format!("Failed to generate token: {}", e)))
    }

    /// Verify signature and expiry, then check the token has not been revoked
    pub async fn validate_access_token(&self, token: &str) -> ApiResult<ValidatedToken> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.authentication.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| ApiError::Authentication(format!("Invalid token: {}", e)))?;

        let live: Option<String> = sqlx::query_scalar(
            "SELECT id FROM access_tokens WHERE id = ? AND user_id = ? AND expires_at > ?",
        )
        .bind(&data.claims.jti)
        .bind(data.claims.sub)
        .bind(Utc::now())
        .fetch_optional(&self.db)
        .await?;

        if live.is_none() {
            return Err(ApiError::Authentication("Token has been revoked.".to_string()));
        }

        Ok(ValidatedToken {
            user_id: data.claims.sub,
        })
    }

    /// Revoke every token of a user
    pub async fn logout(&self, user_id: i64) -> ApiResult<u64> {
        let result = sqlx::query("DELETE FROM access_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        tracing::info!(user = user_id, revoked = result.rows_affected(), "Logged out");
        Ok(result.rows_affected())
    }

    /// Remove tokens past their expiry
    pub async fn cleanup_expired_tokens(&self) -> ApiResult<u64> {
        let result = sqlx::query("DELETE FROM access_tokens WHERE expires_at < ?")
            .bind(Utc::now())
            .execute(&self.db)
            .await?;

        if result.rows_affected() > 0 {
            tracing::info!(deleted = result.rows_affected(), "Cleaned up expired tokens");
        }

        Ok(result.rows_affected())
    }

    /// Generate and store an email verification token. Only the digest is kept.
    pub async fn generate_email_verification_token(&self, user_id: i64) -> ApiResult<String> {
        let token = hex::encode(rand::random::<[u8; 32]>());
        let now = Utc::now();
        let expires_at = now + Duration::hours(self.config.authentication.email_verification_ttl_hours);

        sqlx::query(
            r#"
            INSERT INTO email_verification_tokens (token_hash, user_id, created_at, expires_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(digest_token(&token))
        .bind(user_id)
        .bind(now)
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(token)
    }

    /// Send a fresh verification link. Returns false if already verified.
    pub async fn send_verification_notification(&self, user: &User) -> ApiResult<bool> {
        if user.email_verified_at.is_some() {
            return Ok(false);
        }

        let token = self.generate_email_verification_token(user.id).await?;
        let url = format!(
            "{}/api/email/verify/{}",
            self.config.service.public_url.trim_end_matches('/'),
            token
        );

        self.mailer.send_verification_email(&user.email, &url).await?;
        Ok(true)
    }

    /// Consume a verification token and mark the email verified
    pub async fn verify_email(&self, token: &str) -> ApiResult<User> {
        let now = Utc::now();
        let mut tx = db::begin_write(&self.db).await?;

        let row: Option<(i64, chrono::DateTime<Utc>)> = sqlx::query_as(
            "SELECT user_id, expires_at FROM email_verification_tokens WHERE token_hash = ?",
        )
        .bind(digest_token(token))
        .fetch_optional(&mut *tx)
        .await?;

        let (user_id, expires_at) =
            row.ok_or_else(|| ApiError::NotFound("Invalid verification link.".to_string()))?;

        if now > expires_at {
            return Err(ApiError::Validation("Verification link has expired.".to_string()));
        }

        sqlx::query(
            "UPDATE users SET email_verified_at = COALESCE(email_verified_at, ?), updated_at = ? WHERE id = ?",
        )
        .bind(now)
        .bind(now)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM email_verification_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let user = Self::find_user(&mut tx, user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;

        tx.commit().await?;

        tracing::info!(user = user_id, "Email verified");

        self.activity
            .record(
                NewActivity::new("users", "User verified email")
                    .subject("user", user_id)
                    .causer(user_id)
                    .event("verified"),
            )
            .await;

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn create_test_manager() -> AccountManager {
        let pool = db::memory_pool().await.unwrap();
        db::run_migrations(&pool).await.unwrap();

        AccountManager::new(
            pool.clone(),
            Arc::new(ServerConfig::for_tests()),
            Mailer::new(None).unwrap(),
            ActivityLogger::new(pool),
        )
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "correct horse battery".to_string(),
            password_confirmation: "correct horse battery".to_string(),
        }
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let manager = create_test_manager().await;

        let registered = manager.register(register_request("Kit@Example.com")).await.unwrap();
        assert_eq!(registered.user.email, "kit@example.com");
        assert_eq!(registered.user.role, Role::User);
        assert!(registered.user.email_verified_at.is_none());

        let logged_in = manager
            .login(LoginRequest {
                email: "kit@example.com".to_string(),
                password: "correct horse battery".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(logged_in.user.id, registered.user.id);

        let validated = manager.validate_access_token(&logged_in.token).await.unwrap();
        assert_eq!(validated.user_id, registered.user.id);
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let manager = create_test_manager().await;
        manager.register(register_request("dup@example.com")).await.unwrap();

        let err = manager.register(register_request("dup@example.com")).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let manager = create_test_manager().await;
        manager.register(register_request("kit@example.com")).await.unwrap();

        let err = manager
            .login(LoginRequest {
                email: "kit@example.com".to_string(),
                password: "nope".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_logout_revokes_tokens() {
        let manager = create_test_manager().await;
        let registered = manager.register(register_request("kit@example.com")).await.unwrap();

        assert_eq!(manager.logout(registered.user.id).await.unwrap(), 1);

        let err = manager.validate_access_token(&registered.token).await.unwrap_err();
        assert!(matches!(err, ApiError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_garbage_token_rejected() {
        let manager = create_test_manager().await;
        let err = manager.validate_access_token("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, ApiError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_email_verification() {
        let manager = create_test_manager().await;
        let registered = manager.register(register_request("kit@example.com")).await.unwrap();

        let token = manager
            .generate_email_verification_token(registered.user.id)
            .await
            .unwrap();

        let verified = manager.verify_email(&token).await.unwrap();
        assert!(verified.email_verified_at.is_some());

        // Tokens are single use
        let err = manager.verify_email(&token).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let activities = manager.activity.for_causer(registered.user.id).await.unwrap();
        assert_eq!(activities[0].description, "User verified email");
    }

    #[tokio::test]
    async fn test_verification_notification_skipped_when_verified() {
        let manager = create_test_manager().await;
        let registered = manager.register(register_request("kit@example.com")).await.unwrap();

        assert!(manager.send_verification_notification(&registered.user).await.unwrap());

        let token = manager
            .generate_email_verification_token(registered.user.id)
            .await
            .unwrap();
        let verified = manager.verify_email(&token).await.unwrap();

        assert!(!manager.send_verification_notification(&verified).await.unwrap());
    }
}
