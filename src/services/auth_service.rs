//! Domain service for accounts and token-based authentication.
//!
//! Handles registration, credential checks, token issuance and refresh, and
//! resolving a bearer token back to the user it was issued for.

use serde::Serialize;
use thiserror::Error;

use crate::db::User;
use crate::services::tokens::{TokenError, TokenPair};
use crate::services::validation::{FieldErrors, Registration};

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("No active account found with the given credentials")]
    InvalidCredentials,

    #[error("Token is invalid or expired")]
    InvalidToken,

    #[error("User not found")]
    UserNotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid | TokenError::WrongType => Self::InvalidToken,
            TokenError::Encode(e) => Self::Internal(format!("Failed to sign token: {e}")),
        }
    }
}

/// Public view of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

/// The caller a verified access token belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i32,
    pub username: String,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Validates and creates a new account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] listing every field problem, including
    /// a duplicate username.
    async fn register(&self, input: Registration) -> Result<UserProfile, AuthError>;

    /// Checks credentials and issues an access/refresh token pair.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if login fails.
    async fn obtain_tokens(&self, username: &str, password: &str) -> Result<TokenPair, AuthError>;

    /// Exchanges a refresh token for a new access token.
    async fn refresh_access(&self, refresh_token: &str) -> Result<String, AuthError>;

    /// Resolves an access token to its user. Tokens for deleted users are rejected.
    async fn authenticate(&self, access_token: &str) -> Result<AuthUser, AuthError>;

    /// Gets the profile of a specific user.
    async fn get_profile(&self, user_id: i32) -> Result<UserProfile, AuthError>;
}
