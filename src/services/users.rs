use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::auth::{PasswordCodec, TokenPair, TokenService};
use crate::error::{account_gone, AppError};
use crate::models::{LoginRequest, RegisterRequest, UpdateUserRequest, User, UserProfile};
use crate::services::TaskService;
use crate::store::UserStore;

const DELETE_ATTEMPTS: u32 = 3;
const DELETE_BACKOFF: Duration = Duration::from_millis(50);

/// Account lifecycle and session issuance.
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
    tasks: TaskService,
    tokens: TokenService,
    passwords: PasswordCodec,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserStore>,
        tasks: TaskService,
        tokens: TokenService,
        passwords: PasswordCodec,
    ) -> Self {
        Self {
            users,
            tasks,
            tokens,
            passwords,
        }
    }

    /// Creates the account and opens its first session.
    ///
    /// The existence checks only short-circuit the common case; a racing
    /// registration is still rejected by the store's insert.
    pub async fn register(&self, request: RegisterRequest) -> Result<TokenPair, AppError> {
        if self.users.exists_by_email(&request.email).await? {
            return Err(AppError::Conflict("Email already exists".into()));
        }
        if self.users.exists_by_username(&request.username).await? {
            return Err(AppError::Conflict("Username already exists".into()));
        }

        let password_hash = self.passwords.hash_blocking(request.password).await?;
        let user = self
            .users
            .insert(User::new(request.username, request.email, password_hash))
            .await?;

        let pair = self.rotate(&user).await?;
        log::info!("user {} registered", user.id);
        Ok(pair)
    }

    /// Unknown email and wrong password fail identically.
    pub async fn login(&self, request: LoginRequest) -> Result<TokenPair, AppError> {
        let user = self
            .users
            .find_by_email(&request.email)
            .await?
            .ok_or_else(login_invalid)?;

        let matches = self
            .passwords
            .verify_blocking(request.password, user.password_hash.clone())
            .await?;
        if !matches {
            return Err(login_invalid());
        }

        let pair = self.rotate(&user).await?;
        log::info!("user {} logged in", user.id);
        Ok(pair)
    }

    /// Trades the current refresh token for a new pair. Any token other than
    /// the one in the slot (a superseded one, an access token, anything after
    /// revoke) is rejected.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let claims = self.tokens.decode_at(refresh_token, Utc::now())?;
        let user_id = Uuid::parse_str(&claims.user_id)
            .map_err(|_| AppError::Unauthorized("Invalid token: malformed user_id".into()))?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Unknown user".into()))?;

        if user.refresh_token.is_empty() || user.refresh_token != refresh_token {
            return Err(refresh_rejected());
        }

        // The slot is swapped only if it still holds the presented token, so
        // of two concurrent refreshes with the same token one loses.
        let pair = self.tokens.issue_pair(&user)?;
        if !self
            .users
            .swap_refresh_token(user.id, refresh_token, &pair.refresh_token)
            .await?
        {
            return Err(refresh_rejected());
        }
        Ok(pair)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<User, AppError> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(user_not_found)
    }

    /// Rejects callers whose account was deleted while their access token
    /// is still valid.
    pub async fn ensure_exists(&self, id: Uuid) -> Result<(), AppError> {
        match self.users.find_by_id(id).await? {
            Some(_) => Ok(()),
            None => Err(account_gone()),
        }
    }

    pub async fn profile(&self, id: Uuid) -> Result<UserProfile, AppError> {
        self.get_by_id(id).await.map(|user| UserProfile::from(&user))
    }

    /// Replaces username and password.
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateUserRequest,
    ) -> Result<UserProfile, AppError> {
        let current = self.get_by_id(id).await?;
        if current.username != request.username
            && self.users.exists_by_username(&request.username).await?
        {
            return Err(AppError::Conflict("Username already exists".into()));
        }

        let password_hash = self.passwords.hash_blocking(request.password).await?;
        let user = self
            .users
            .update_credentials(id, &request.username, &password_hash)
            .await?
            .ok_or_else(user_not_found)?;
        Ok(UserProfile::from(&user))
    }

    /// Empties the refresh slot. Access tokens already issued stay valid
    /// until they expire.
    pub async fn revoke(&self, id: Uuid) -> Result<(), AppError> {
        self.users
            .set_refresh_token(id, "")
            .await?
            .ok_or_else(user_not_found)?;
        log::info!("user {} revoked their refresh token", id);
        Ok(())
    }

    /// Deletes the account and every task it owns.
    ///
    /// Tasks go first so a failure never leaves tasks without an owner. The
    /// user delete is retried with a task sweep before each attempt, and a
    /// final sweep catches tasks created meanwhile with a live access token.
    /// Every step is idempotent, so a failed call can simply be repeated.
    pub async fn delete_account(&self, id: Uuid) -> Result<(), AppError> {
        let swept = self.tasks.delete_all_by_owner(id).await?;
        log::debug!("removed {} tasks of user {}", swept, id);

        let mut attempt = 1;
        loop {
            match self.users.delete(id).await {
                Ok(0) if attempt == 1 => return Err(user_not_found()),
                // An earlier attempt may have landed before failing to report.
                Ok(_) => break,
                Err(err) if attempt < DELETE_ATTEMPTS => {
                    log::warn!(
                        "deleting user {} failed on attempt {}: {}",
                        id,
                        attempt,
                        err
                    );
                    tokio::time::sleep(DELETE_BACKOFF * attempt).await;
                    attempt += 1;
                    self.tasks.delete_all_by_owner(id).await?;
                }
                Err(err) => {
                    log::error!(
                        "giving up deleting user {} after {} attempts: {}",
                        id,
                        attempt,
                        err
                    );
                    return Err(AppError::ServiceUnavailable(format!(
                        "user {} could not be deleted",
                        id
                    )));
                }
            }
        }

        if let Err(err) = self.tasks.delete_all_by_owner(id).await {
            log::error!("final task sweep for deleted user {} failed: {}", id, err);
        }
        log::info!("user {} deleted", id);
        Ok(())
    }

    /// Issues a fresh pair and stores its refresh token in the slot,
    /// superseding whatever was there.
    async fn rotate(&self, user: &User) -> Result<TokenPair, AppError> {
        let pair = self.tokens.issue_pair(user)?;
        self.users
            .set_refresh_token(user.id, &pair.refresh_token)
            .await?
            .ok_or_else(user_not_found)?;
        Ok(pair)
    }
}

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".into())
}

fn refresh_rejected() -> AppError {
    AppError::Unauthorized("Refresh token revoked or superseded".into())
}

fn login_invalid() -> AppError {
    AppError::Unauthorized("Login invalid".into())
}
