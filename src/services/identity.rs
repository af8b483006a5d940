//! Registration, email verification and login.
//!
//! A user moves `registered (unverified) -> verified` exactly once. Verification
//! codes live only in the [`VerificationCache`], keyed by code and holding the
//! normalized email they were sent to, so codes can be requested before or after
//! registration.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::auth::{generate_code, hash_password, verify_password, TokenKeys};
use crate::cache::VerificationCache;
use crate::config::Config;
use crate::error::AppError;
use crate::mailer::{EmailData, Mailer};
use crate::models::{NewUser, User};
use crate::repository::UserRepository;

const MIN_PASSWORD_LENGTH: usize = 8;
const VERIFICATION_SUBJECT: &str = "Email Verification";
/// Draws before giving up on finding a code that is not already pending.
const CODE_ATTEMPTS: usize = 5;

/// Tunables of the identity flows.
#[derive(Debug, Clone)]
pub struct IdentitySettings {
    pub otp_ttl: Duration,
    pub otp_digits: u32,
    pub bcrypt_cost: u32,
}

impl IdentitySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            otp_ttl: Duration::from_secs(
                config
                    .otp_expiry_hours
                    .checked_mul(60 * 60)
                    .unwrap_or(u64::MAX),
            ),
            otp_digits: config.otp_digits,
            bcrypt_cost: config.bcrypt_cost,
        }
    }
}

pub struct IdentityService {
    users: Arc<dyn UserRepository>,
    cache: Arc<dyn VerificationCache>,
    mailer: Arc<dyn Mailer>,
    tokens: TokenKeys,
    settings: IdentitySettings,
}

impl IdentityService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        cache: Arc<dyn VerificationCache>,
        mailer: Arc<dyn Mailer>,
        tokens: TokenKeys,
        settings: IdentitySettings,
    ) -> Self {
        Self {
            users,
            cache,
            mailer,
            tokens,
            settings,
        }
    }

    /// Creates an unverified account.
    ///
    /// Checks, in order: email grammar, password length, username shape, email
    /// uniqueness. The first failing check is reported.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AppError> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AppError::validation(
                "password",
                format!("must be at least {} characters", MIN_PASSWORD_LENGTH),
            ));
        }
        if username.chars().count() <= 3 || username.starts_with(' ') {
            return Err(AppError::validation(
                "username",
                "must be longer than 3 characters and not start with a space",
            ));
        }
        if self.users.email_exists(&email).await? {
            return Err(AppError::Conflict("Email already registered".into()));
        }

        let password_hash = hash_password(password, self.settings.bcrypt_cost)?;
        let user = self
            .users
            .create_user(&NewUser {
                email,
                username: username.to_string(),
                password_hash,
            })
            .await?;

        log::info!("registered user {}", user.id);
        Ok(user)
    }

    /// Emails a fresh one-time code for `email` and returns when it expires.
    ///
    /// The user does not need to exist yet. Cache and mail failures are returned
    /// as-is.
    pub async fn start_verification(&self, email: &str) -> Result<DateTime<Utc>, AppError> {
        let email = normalize_email(email)?;
        let expires_at = chrono::Duration::from_std(self.settings.otp_ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| AppError::Cache("verification code lifetime out of range".into()))?;
        let code = self.reserve_code(&email).await?;

        let message = EmailData {
            code,
            subject: VERIFICATION_SUBJECT.to_string(),
            expires_at,
        };
        if let Err(err) = self.mailer.send(&email, &message).await {
            log::warn!("failed to send verification email: {}", err);
            return Err(err);
        }

        log::info!("verification code issued, expires at {}", expires_at);
        Ok(expires_at)
    }

    async fn reserve_code(&self, email: &str) -> Result<String, AppError> {
        for _ in 0..CODE_ATTEMPTS {
            let code = generate_code(self.settings.otp_digits)?;
            if self
                .cache
                .set_if_absent(&code, email, self.settings.otp_ttl)
                .await?
            {
                return Ok(code);
            }
        }
        Err(AppError::Cache(format!(
            "no free verification code after {} attempts",
            CODE_ATTEMPTS
        )))
    }

    /// Consumes `code` and marks the user it was issued for as verified.
    ///
    /// The code is removed from the cache before the user is touched, so a code
    /// can succeed at most once; a replay yields `CodeInvalid`.
    pub async fn verify_user(&self, code: &str) -> Result<User, AppError> {
        let code = code.trim();
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::CodeInvalid);
        }

        let email = self
            .cache
            .get_and_delete(code)
            .await?
            .ok_or(AppError::CodeInvalid)?;

        let mut user = self.users.get_user_by_email(&email).await?;
        if user.is_verified {
            return Err(AppError::AlreadyVerified);
        }

        user.is_verified = true;
        self.users.update_user(&user).await?;

        log::info!("verified user {}", user.id);
        Ok(user)
    }

    /// Checks credentials and issues a session token.
    ///
    /// An unknown email and a wrong password both yield `InvalidCredentials`.
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, String), AppError> {
        let email = email.trim().to_lowercase();
        let user = match self.users.get_user_by_email(&email).await {
            Ok(user) => user,
            Err(AppError::UserNotFound) => return Err(AppError::InvalidCredentials),
            Err(err) => return Err(err),
        };

        if !verify_password(password, &user.password_hash)? {
            log::info!("rejected login for user {}", user.id);
            return Err(AppError::InvalidCredentials);
        }

        let token = self.tokens.issue(user.id)?;
        log::info!("user {} logged in", user.id);
        Ok((user, token))
    }

    pub async fn get_user(&self, user_id: i64) -> Result<User, AppError> {
        self.users.get_user_by_id(user_id).await
    }

    /// Deletes the account and all of its tasks.
    pub async fn delete_user(&self, user_id: i64) -> Result<(), AppError> {
        self.users.delete_user(user_id).await?;
        log::info!("deleted user {}", user_id);
        Ok(())
    }
}

/// Trims and lowercases `email` after checking its grammar.
fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    if !validator::validate_email(&email) {
        return Err(AppError::validation("email", "not a valid email address"));
    }
    Ok(email)
}
