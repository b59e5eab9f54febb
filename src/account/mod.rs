/// Account management system
///
/// Handles registration, login, bearer tokens and email verification.

mod manager;

pub use manager::AccountManager;

use crate::db::models::User;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Registration request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "The email field must be a valid email address."))]
    #[validate(length(max = 255, message = "The email field must not be greater than 255 characters."))]
    pub email: String,

    #[validate(length(min = 8, message = "The password field must be at least 8 characters."))]
    #[validate(must_match(other = "password_confirmation", message = "The password field confirmation does not match."))]
    pub password: String,

    pub password_confirmation: String,
}

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "The email field must be a valid email address."))]
    pub email: String,

    #[validate(length(min = 1, message = "The password field is required."))]
    pub password: String,
}

/// Issued bearer token with the account it belongs to
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

/// Validated bearer token
#[derive(Debug, Clone)]
pub struct ValidatedToken {
    pub user_id: i64,
}
