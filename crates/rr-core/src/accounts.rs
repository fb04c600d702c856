//! # Accounts
//!
//! Signup, confirmation-code delivery, token exchange, bearer authentication
//! and profile edits.
//!
//! Signup state lives entirely in the user row: an account is pending until
//! its holder exchanges a code for a token. Codes are derived from user state
//! by the [`AuthProvider`], so nothing here stores or revokes them.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::drafts::{validate_account, UserPayload};
use crate::error::{AppError, FieldErrors, Result};
use crate::models::{NewUser, OutboundMail, SignupRequest, SignupResponse, TokenRequest, TokenResponse, User};
use crate::permissions::Capability;
use crate::traits::{AuthProvider, Mailer, UserRepo};
use crate::validation::Validator;

pub const CONFIRMATION_SUBJECT: &str = "Rusty-Reviews confirmation code";

const BAD_CREDENTIALS: &str = "invalid username or confirmation code";

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepo>,
    auth: Arc<dyn AuthProvider>,
    mailer: Arc<dyn Mailer>,
    from_address: String,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepo>,
        auth: Arc<dyn AuthProvider>,
        mailer: Arc<dyn Mailer>,
        from_address: impl Into<String>,
    ) -> Self {
        Self { users, auth, mailer, from_address: from_address.into() }
    }

    /// Registers a pending account, or re-sends a code when the exact
    /// (username, email) pair already exists.
    pub async fn signup(&self, request: SignupRequest) -> Result<SignupResponse> {
        let mut v = Validator::new();
        let username = v.required("username", request.username).unwrap_or_default();
        let email = v.required("email", request.email).unwrap_or_default();
        v.finish()?;

        let existing = self.users.get_user_by_username(&username).await?;
        let user = match existing {
            Some(user) if user.email == email => {
                info!(username = %user.username, "re-sending confirmation code");
                user
            }
            existing => {
                self.check_signup_conflicts(existing.as_ref(), &username, &email).await?;
                let user = self.users.create_user(NewUser::signup(&username, &email)).await?;
                info!(user_id = user.id, username = %user.username, "account created");
                user
            }
        };

        self.send_code(&user).await?;
        Ok(SignupResponse { username: user.username, email: user.email })
    }

    /// Validation for a brand-new account. `by_username` is the account, if
    /// any, already holding the requested username with another email.
    async fn check_signup_conflicts(&self, by_username: Option<&User>, username: &str, email: &str) -> Result<()> {
        validate_account(username, email, "", "")?;
        let mut errors = FieldErrors::new();
        if by_username.is_some() {
            errors
                .entry("username".into())
                .or_default()
                .push("A user with that username already exists.".into());
        }
        if self.users.get_user_by_email(email).await?.is_some() {
            errors
                .entry("email".into())
                .or_default()
                .push("A user with that email already exists.".into());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }

    async fn send_code(&self, user: &User) -> Result<()> {
        let code = self.auth.issue_confirmation_code(user);
        let mail = OutboundMail {
            from: self.from_address.clone(),
            to: user.email.clone(),
            subject: CONFIRMATION_SUBJECT.to_string(),
            body: format!("Your confirmation code: {}", code),
        };
        self.mailer.send(mail).await.map_err(|e| {
            error!(username = %user.username, error = %e, "confirmation code delivery failed");
            AppError::Delivery(format!("could not send confirmation code to {}: {}", user.email, e))
        })
    }

    /// Exchanges a confirmation code for an access token.
    pub async fn obtain_token(&self, request: TokenRequest) -> Result<TokenResponse> {
        let mut v = Validator::new();
        let username = v.required("username", request.username).unwrap_or_default();
        let code = v.required("confirmation_code", request.confirmation_code).unwrap_or_default();
        v.finish()?;

        let Some(user) = self.users.get_user_by_username(&username).await? else {
            warn!(%username, "token requested for unknown username");
            return Err(AppError::Unauthorized(BAD_CREDENTIALS.into()));
        };
        if !self.auth.verify_confirmation_code(&user, &code) {
            warn!(%username, "confirmation code mismatch");
            return Err(AppError::Unauthorized(BAD_CREDENTIALS.into()));
        }

        let token = self.auth.issue_access_token(&user)?;
        self.users.record_login(user.id, Utc::now()).await?;
        info!(user_id = user.id, "access token issued");
        Ok(TokenResponse { token })
    }

    /// Resolves a bearer token to its (still existing) account.
    pub async fn authenticate(&self, token: &str) -> Result<User> {
        let claims = self.auth.verify_access_token(token)?;
        self.users
            .get_user(claims.user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("user for this token no longer exists".into()))
    }

    /// Self-service edit. A role change is dropped unless the actor already
    /// administers accounts; the rest of the payload still applies.
    pub async fn update_own_profile(&self, actor: &User, mut payload: UserPayload) -> Result<User> {
        if payload.role.is_some_and(|role| role != actor.role) && !actor.has_capability(Capability::Administer) {
            info!(user_id = actor.id, "discarding self-service role change");
            payload.role = None;
        }
        let updated = payload.apply(actor)?;
        self.users.update_user(&updated).await
    }

    /// Admin edit of any account, role included.
    pub async fn update_account(&self, target: &User, payload: UserPayload) -> Result<User> {
        let updated = payload.apply(target)?;
        self.users.update_user(&updated).await
    }

    /// Admin full update: `username` and `email` must be present.
    pub async fn replace_account(&self, target: &User, payload: UserPayload) -> Result<User> {
        let mut v = Validator::new();
        v.required("username", payload.username.as_deref());
        v.required("email", payload.email.as_deref());
        v.finish()?;
        self.update_account(target, payload).await
    }

    /// Admin creation of a fully specified account.
    pub async fn create_account(&self, payload: UserPayload) -> Result<User> {
        let mut v = Validator::new();
        let username = v.required("username", payload.username).unwrap_or_default();
        let email = v.required("email", payload.email).unwrap_or_default();
        v.finish()?;
        let first_name = payload.first_name.unwrap_or_default();
        let last_name = payload.last_name.unwrap_or_default();
        validate_account(&username, &email, &first_name, &last_name)?;
        let user = self
            .users
            .create_user(NewUser {
                username,
                email,
                first_name,
                last_name,
                bio: payload.bio.filter(|b| !b.trim().is_empty()),
                role: payload.role.unwrap_or_default(),
                is_superuser: false,
            })
            .await?;
        info!(user_id = user.id, role = %user.role, "account created by administrator");
        Ok(user)
    }

    pub fn users(&self) -> &Arc<dyn UserRepo> {
        &self.users
    }
}
