/// Configuration management for Quillboard
use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub email: Option<EmailConfig>,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Externally reachable base URL, used in verification links
    pub public_url: String,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_ttl_hours: i64,
    pub email_verification_ttl_hours: i64,
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub unauthenticated_rps: u32,
    pub authenticated_rps: u32,
    pub burst_size: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ApiResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("QB_HOSTNAME").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("QB_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ApiError::Validation("Invalid port number".to_string()))?;
        let public_url = env::var("QB_PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", port));
        let version =
            env::var("QB_VERSION").unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

        let data_directory: PathBuf = env::var("QB_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("QB_DATABASE_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("quillboard.sqlite"));

        let jwt_secret = env::var("QB_JWT_SECRET")
            .map_err(|_| ApiError::Validation("JWT secret required".to_string()))?;

        let email = if let Ok(smtp_url) = env::var("QB_EMAIL_SMTP_URL") {
            Some(EmailConfig {
                smtp_url,
                from_address: env::var("QB_EMAIL_FROM_ADDRESS")
                    .unwrap_or_else(|_| "noreply@quillboard.local".to_string()),
            })
        } else {
            None
        };

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let log_json = env::var("QB_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                public_url,
                version,
            },
            storage: StorageConfig {
                data_directory,
                database,
            },
            authentication: AuthConfig {
                jwt_secret,
                access_token_ttl_hours: env_or("QB_ACCESS_TOKEN_TTL_HOURS", 720),
                email_verification_ttl_hours: env_or("QB_EMAIL_VERIFICATION_TTL_HOURS", 24),
            },
            email,
            rate_limit: RateLimitConfig {
                enabled: env_or("QB_RATE_LIMITS_ENABLED", true),
                unauthenticated_rps: env_or("QB_RATE_LIMIT_UNAUTHENTICATED_RPS", 10),
                authenticated_rps: env_or("QB_RATE_LIMIT_AUTHENTICATED_RPS", 100),
                burst_size: env_or("QB_RATE_LIMIT_BURST", 50),
            },
            logging: LoggingConfig {
                level: log_level,
                json: log_json,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> ApiResult<()> {
        if self.service.hostname.is_empty() {
            return Err(ApiError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(ApiError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.authentication.access_token_ttl_hours <= 0 {
            return Err(ApiError::Validation(
                "Access token TTL must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Configuration suitable for tests: in-memory friendly, no SMTP, no rate limits
    pub fn for_tests() -> Self {
        ServerConfig {
            service: ServiceConfig {
                hostname: "127.0.0.1".to_string(),
                port: 0,
                public_url: "http://localhost".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            storage: StorageConfig {
                data_directory: PathBuf::from("./data"),
                database: PathBuf::from(":memory:"),
            },
            authentication: AuthConfig {
                jwt_secret: "test-secret-that-is-at-least-32-characters".to_string(),
                access_token_ttl_hours: 1,
                email_verification_ttl_hours: 24,
            },
            email: None,
            rate_limit: RateLimitConfig {
                enabled: false,
                unauthenticated_rps: 10,
                authenticated_rps: 100,
                burst_size: 50,
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
                json: false,
            },
        }
    }
}
