use lazy_static::lazy_static;
use rand::{rngs::OsRng, CryptoRng, Rng};
use regex::Regex;
use tracing::{debug, error, info, warn};

use crate::{
    auth::{
        password::{hash_password, verify_password},
        repo::{RepoError, UserStore},
        repo_types::{NewUser, User},
    },
    error::AppError,
    mailer::Mailer,
};

/// Seconds an activation code stays valid after registration.
pub const CODE_TTL_SECS: f64 = 60.0;
pub const MIN_PASSWORD_CHARS: usize = 8;
pub const MAX_PASSWORD_CHARS: usize = 72;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn validate_registration(email: &str, password: &str) -> Result<(), AppError> {
    if !is_valid_email(email) {
        return Err(AppError::Validation("Invalid email".into()));
    }
    let chars = password.chars().count();
    if chars < MIN_PASSWORD_CHARS {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_CHARS} characters"
        )));
    }
    if chars > MAX_PASSWORD_CHARS {
        return Err(AppError::Validation(format!(
            "Password must be at most {MAX_PASSWORD_CHARS} characters"
        )));
    }
    Ok(())
}

/// Uniform draw from 0..=9999, rendered as exactly four digits.
pub fn generate_activation_code<R: Rng + CryptoRng>(rng: &mut R) -> String {
    format_code(rng.gen_range(0..=9999))
}

fn format_code(n: u16) -> String {
    format!("{n:04}")
}

/// Create a pending account and send its activation code.
///
/// The code is delivered best-effort: a send failure is logged and the
/// account stays registered.
pub async fn register_user(
    users: &dyn UserStore,
    mailer: &dyn Mailer,
    email: &str,
    password: &str,
    now: f64,
) -> Result<User, AppError> {
    if users.find_by_email(email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(AppError::Conflict);
    }

    let code = generate_activation_code(&mut OsRng);
    let password_hash = hash_password(password)?;

    let user = match users
        .create(NewUser {
            email,
            password_hash: &password_hash,
            activation_code: &code,
            code_expires_at: now + CODE_TTL_SECS,
        })
        .await
    {
        Ok(u) => u,
        Err(RepoError::Duplicate) => {
            warn!(%email, "concurrent registration lost the insert race");
            return Err(AppError::Conflict);
        }
        Err(e) => return Err(e.into()),
    };

    match mailer.send_activation_code(email, &code).await {
        Ok(()) => info!(%email, "activation email sent"),
        Err(e) => error!(error = %e, %email, "failed to send activation email"),
    }

    Ok(user)
}

/// Resolve Basic credentials to a stored user. Unknown email and wrong
/// password are indistinguishable to the caller.
pub async fn authenticate(
    users: &dyn UserStore,
    email: &str,
    password: &str,
) -> Result<User, AppError> {
    let Some(user) = users.find_by_email(email).await? else {
        warn!(%email, "authentication for unknown email");
        return Err(AppError::Unauthorized);
    };
    if !verify_password(password, &user.password_hash)? {
        warn!(%email, "authentication with wrong password");
        return Err(AppError::Unauthorized);
    }
    debug!(%email, "credentials verified");
    Ok(user)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    AlreadyActive,
    Activated,
}

impl ActivationOutcome {
    pub fn message(self) -> &'static str {
        match self {
            ActivationOutcome::AlreadyActive => "Already active",
            ActivationOutcome::Activated => "Account activated successfully",
        }
    }
}

/// Decide the transition for `user` given a submitted code. Checks run in a
/// fixed order: active state, then expiry, then the code itself.
pub fn evaluate_activation(user: &User, code: &str, now: f64) -> Result<ActivationOutcome, AppError> {
    if user.is_active {
        return Ok(ActivationOutcome::AlreadyActive);
    }
    if now > user.code_expires_at {
        return Err(AppError::Expired);
    }
    if code != user.activation_code {
        return Err(AppError::InvalidCode);
    }
    Ok(ActivationOutcome::Activated)
}

pub async fn activate_user(
    users: &dyn UserStore,
    user: &User,
    code: &str,
    now: f64,
) -> Result<ActivationOutcome, AppError> {
    let outcome = match evaluate_activation(user, code, now) {
        Ok(o) => o,
        Err(e) => {
            warn!(email = %user.email, reason = %e, "activation rejected");
            return Err(e);
        }
    };
    match outcome {
        ActivationOutcome::AlreadyActive => {
            info!(email = %user.email, "activation skipped: already active");
        }
        ActivationOutcome::Activated => {
            users.mark_active(&user.email).await?;
            info!(email = %user.email, "account activated");
        }
    }
    Ok(outcome)
}
