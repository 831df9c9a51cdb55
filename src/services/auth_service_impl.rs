//! `SeaORM` implementation of the `AuthService` trait.

use crate::config::SecurityConfig;
use crate::db::{NewUser, Store};
use crate::services::auth_service::{AuthError, AuthService, AuthUser, UserProfile};
use crate::services::tokens::{TokenIssuer, TokenPair, TokenType};
use crate::services::validation::{FieldErrors, Registration, validate_registration};
use async_trait::async_trait;
use tracing::info;

const DUPLICATE_USERNAME: &str = "A user with that username already exists.";

pub struct SeaOrmAuthService {
    store: Store,
    tokens: TokenIssuer,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, tokens: TokenIssuer, security: SecurityConfig) -> Self {
        Self {
            store,
            tokens,
            security,
        }
    }
}

fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sea_orm::DbErr>()
        .and_then(sea_orm::DbErr::sql_err)
        .is_some_and(|e| matches!(e, sea_orm::SqlErr::UniqueConstraintViolation(_)))
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, input: Registration) -> Result<UserProfile, AuthError> {
        let mut errors = match validate_registration(&input) {
            Ok(()) => FieldErrors::new(),
            Err(errors) => errors,
        };

        if errors.get("username").is_none() && self.store.username_exists(&input.username).await? {
            errors.add("username", DUPLICATE_USERNAME);
        }

        errors.into_result().map_err(AuthError::Validation)?;

        let new_user = NewUser {
            username: input.username,
            email: input.email.trim().to_string(),
            first_name: input.first_name,
            last_name: input.last_name,
            password: input.password,
        };

        // The existence check above can race with a concurrent registration
        let user = match self.store.create_user(new_user, &self.security).await {
            Ok(user) => user,
            Err(e) if is_unique_violation(&e) => {
                return Err(AuthError::Validation(FieldErrors::single(
                    "username",
                    DUPLICATE_USERNAME,
                )));
            }
            Err(e) => return Err(e.into()),
        };

        info!(user_id = user.id, username = %user.username, "User registered");

        Ok(UserProfile::from(user))
    }

    async fn obtain_tokens(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let user = self
            .store
            .verify_user_password(username, password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        Ok(self.tokens.issue_pair(user.id)?)
    }

    async fn refresh_access(&self, refresh_token: &str) -> Result<String, AuthError> {
        let claims = self.tokens.verify(refresh_token, TokenType::Refresh)?;
        let user_id = claims.user_id()?;

        // A refresh token must not outlive its account
        if self.store.get_user_by_id(user_id).await?.is_none() {
            return Err(AuthError::InvalidToken);
        }

        Ok(self.tokens.issue(user_id, TokenType::Access)?)
    }

    async fn authenticate(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        let claims = self.tokens.verify(access_token, TokenType::Access)?;

        let user = self
            .store
            .get_user_by_id(claims.user_id()?)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        Ok(AuthUser {
            id: user.id,
            username: user.username,
        })
    }

    async fn get_profile(&self, user_id: i32) -> Result<UserProfile, AuthError> {
        let user = self
            .store
            .get_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        Ok(UserProfile::from(user))
    }
}
