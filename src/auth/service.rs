use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::auth::password::PasswordHasher;
use crate::auth::tokens::TokenService;
use crate::config::AuthConfig;
use crate::db::models::{RefreshSession, User, UserFields, UserId};
use crate::db::store::{SessionStore, UserStore};
use crate::error::{AppError, AuthError, DatabaseError};
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    tokens: Arc<TokenService>,
    hasher: PasswordHasher,
    refresh_ttl_days: i64,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        tokens: Arc<TokenService>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            users,
            sessions,
            tokens,
            hasher: PasswordHasher::new(config.password_hash_iterations),
            refresh_ttl_days: config.refresh_token_ttl_days,
        }
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    /// Returns the user only if the email exists and the password matches.
    #[instrument(skip(self, password))]
    pub async fn verify_credentials(&self, email: &str, password: &str) -> Result<Option<User>> {
        let Some(user) = self.users.get_user_by_email(email).await? else {
            return Ok(None);
        };

        if self.hasher.verify(password, &user.password_hash) {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    #[instrument(skip(self, password))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<User> {
        if self.users.get_user_by_email(email).await?.is_some() {
            return Err(AppError::Conflict(format!("Email {} is already registered", email)));
        }

        let fields = UserFields {
            email: email.to_string(),
            password_hash: self.hasher.hash(password)?,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        };

        // A concurrent sign-up can still win the unique index
        let user = self.users.create_user(&fields).await.map_err(|e| match e {
            AppError::DatabaseError(DatabaseError::Duplicate) => {
                AppError::Conflict(format!("Email {} is already registered", email))
            }
            other => other,
        })?;

        info!(user_id = user.id, "User registered");
        Ok(user)
    }

    /// Issues a token pair and overwrites the user's refresh slot.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<TokenPair> {
        let user = self
            .verify_credentials(email, password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let access_token = self.tokens.issue_access_token(user.id)?;
        let refresh_token = self.tokens.issue_refresh_token();
        let session = RefreshSession::new(refresh_token.clone(), self.refresh_ttl_days);
        self.sessions.put_session(user.id, &session).await?;

        info!(user_id = user.id, "Session opened");
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Exchanges a (possibly expired) access token plus the current refresh
    /// token for a new pair. All failures look the same to the caller.
    #[instrument(skip_all)]
    pub async fn refresh(&self, access_token: &str, refresh_token: &str) -> Result<TokenPair> {
        if access_token.is_empty() || refresh_token.is_empty() {
            return Err(AuthError::InvalidClientRequest.into());
        }

        let user_id = self.tokens.subject_from_expired_token(access_token).map_err(|_| {
            warn!("Refresh rejected: access token failed signature check");
            AuthError::InvalidClientRequest
        })?;

        if self.users.get_user_by_id(user_id).await?.is_none() {
            warn!(user_id, "Refresh rejected: unknown subject");
            return Err(AuthError::InvalidClientRequest.into());
        }

        let new_refresh_token = self.tokens.issue_refresh_token();
        let rotated = self
            .sessions
            .rotate_session(user_id, refresh_token, &new_refresh_token, Utc::now())
            .await?;
        if !rotated {
            warn!(user_id, "Refresh rejected: missing, mismatched or expired session");
            return Err(AuthError::InvalidClientRequest.into());
        }

        let access_token = self.tokens.issue_access_token(user_id)?;
        info!(user_id, "Session rotated");
        Ok(TokenPair {
            access_token,
            refresh_token: new_refresh_token,
        })
    }

    #[instrument(skip(self))]
    pub async fn logout(&self, user_id: UserId) -> Result<()> {
        if self.users.get_user_by_id(user_id).await?.is_none() {
            return Err(AppError::InvalidRequest(format!("User {} does not exist", user_id)));
        }

        self.sessions.clear_session(user_id).await?;
        info!(user_id, "Session closed");
        Ok(())
    }
}
