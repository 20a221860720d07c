//! Signup and token exchange
//!
//! A confirmation code is generated per user at signup, delivered by mail
//! and stored only as a digest on the user row. Exchanging it for a token
//! consumes it.

use super::{generate_confirmation_code, hash_confirmation_code, JwtManager};
use crate::db::models::User;
use crate::db::{NewUser, Repository};
use crate::errors::{AppError, FieldErrors, Result};
use crate::mail::{Mailer, Message};
use crate::metrics;
use crate::users::check_username;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

const CONFIRMATION_SUBJECT: &str = "YaMDb confirmation code";

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignupPayload {
    pub username: String,

    #[validate(email(message = "enter a valid email address"), length(max = 254))]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupResponse {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TokenPayload {
    #[validate(length(min = 1, message = "this field is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "this field is required"))]
    pub confirmation_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Replace the user's confirmation code with a fresh one, returning the
/// plaintext code for delivery
pub async fn issue_confirmation_code(repo: &Repository, user: User) -> Result<(User, String)> {
    let code = generate_confirmation_code();
    let user = repo
        .set_confirmation_code_hash(user, Some(hash_confirmation_code(&code)))
        .await?;
    Ok((user, code))
}

/// Register a (username, email) pair and mail a confirmation code.
///
/// Repeating a signup with the exact same pair issues a new code; a pair
/// that clashes with a different user is a conflict.
pub async fn register(
    repo: &Repository,
    mailer: &dyn Mailer,
    from_address: &str,
    payload: SignupPayload,
) -> Result<SignupResponse> {
    let mut errors = match payload.validate() {
        Ok(()) => FieldErrors::new(),
        Err(e) => FieldErrors::from(e),
    };
    if let Err(message) = check_username(&payload.username) {
        errors.add("username", message);
    }
    errors.into_result()?;

    let by_name = repo.find_user_by_username(&payload.username).await?;
    let by_email = repo.find_user_by_email(&payload.email).await?;

    let (user, is_new) = match (by_name, by_email) {
        (Some(user), Some(other)) if user.id == other.id => (user, false),
        (Some(_), _) => {
            return Err(AppError::conflict(
                "username",
                format!("username `{}` is registered with another email", payload.username),
            ))
        }
        (None, Some(_)) => {
            return Err(AppError::conflict(
                "email",
                format!("email `{}` is registered to another user", payload.email),
            ))
        }
        (None, None) => {
            let user = repo
                .create_user(NewUser::new(payload.username.clone(), payload.email.clone()))
                .await?;
            (user, true)
        }
    };

    let (user, code) = issue_confirmation_code(repo, user).await?;

    mailer
        .send(Message {
            from: from_address.to_string(),
            to: user.email.clone(),
            subject: CONFIRMATION_SUBJECT.to_string(),
            body: format!(
                "Hello, {}!\n\nYour confirmation code: {}\n",
                user.username, code
            ),
        })
        .await?;

    metrics::record_signup(is_new);
    info!(user_id = user.id, username = %user.username, new_user = is_new, mailer = mailer.name(), "Confirmation code issued");

    Ok(SignupResponse {
        username: user.username,
        email: user.email,
    })
}

/// Exchange a confirmation code for a bearer token
pub async fn obtain_token(
    repo: &Repository,
    jwt: &JwtManager,
    payload: TokenPayload,
) -> Result<TokenResponse> {
    payload.validate()?;

    let user = repo
        .find_user_by_username(&payload.username)
        .await?
        .ok_or(AppError::InvalidConfirmationCode)?;

    let hash = hash_confirmation_code(&payload.confirmation_code);
    if !repo.consume_confirmation_code(user.id, &hash).await? {
        warn!(username = %user.username, "Confirmation code rejected");
        return Err(AppError::InvalidConfirmationCode);
    }

    let token = jwt.generate_token(&user)?;

    metrics::record_token_issued();
    info!(user_id = user.id, username = %user.username, "Token issued");

    Ok(TokenResponse { token })
}
