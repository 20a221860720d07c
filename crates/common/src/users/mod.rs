//! User payloads, validation and representation

use crate::db::models::{Role, User};
use crate::db::{NewUser, UserChanges};
use crate::errors::{FieldErrors, Result};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use validator::Validate;

/// Reserved for the self-profile route
pub const RESERVED_USERNAME: &str = "me";

pub const MAX_USERNAME_LEN: usize = 25;

fn username_pattern() -> &'static Regex {
    static USERNAME: OnceLock<Regex> = OnceLock::new();
    USERNAME.get_or_init(|| Regex::new(r"^[\w.@+-]+$").expect("valid username pattern"))
}

/// Usernames are 1 to 25 characters of letters, digits and `.@+-_`, never `me`
pub fn check_username(username: &str) -> std::result::Result<(), String> {
    if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
        return Err(format!(
            "username must be 1 to {} characters",
            MAX_USERNAME_LEN
        ));
    }
    if username.eq_ignore_ascii_case(RESERVED_USERNAME) {
        return Err(format!("`{}` cannot be used as a username", username));
    }
    if !username_pattern().is_match(username) {
        return Err(format!(
            "`{}` may only contain letters, digits and @/./+/-/_",
            username
        ));
    }
    Ok(())
}

/// User as served by the users resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub role: Role,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: user.bio,
            role: user.role,
        }
    }
}

/// Admin create payload
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewUserPayload {
    pub username: String,

    #[validate(email(message = "enter a valid email address"), length(max = 254))]
    pub email: String,

    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,

    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,

    #[serde(default)]
    #[validate(length(max = 500, message = "bio must be at most 500 characters"))]
    pub bio: String,

    #[serde(default)]
    pub role: Role,
}

impl NewUserPayload {
    pub fn into_new_user(self) -> Result<NewUser> {
        let mut errors = validation_errors(&self);
        if let Err(message) = check_username(&self.username) {
            errors.add("username", message);
        }
        errors.into_result()?;

        Ok(NewUser {
            username: self.username,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            bio: self.bio,
            role: self.role,
            is_superuser: false,
        })
    }
}

/// Partial update payload, shared by the admin and self-profile routes
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UserPatch {
    pub username: Option<String>,

    #[validate(email(message = "enter a valid email address"), length(max = 254))]
    pub email: Option<String>,

    #[validate(length(max = 150))]
    pub first_name: Option<String>,

    #[validate(length(max = 150))]
    pub last_name: Option<String>,

    #[validate(length(max = 500, message = "bio must be at most 500 characters"))]
    pub bio: Option<String>,

    pub role: Option<Role>,
}

impl UserPatch {
    /// Changes an admin may apply to any user
    pub fn into_changes(self) -> Result<UserChanges> {
        let mut errors = validation_errors(&self);
        if let Some(username) = self.username.as_deref() {
            if let Err(message) = check_username(username) {
                errors.add("username", message);
            }
        }
        errors.into_result()?;

        Ok(UserChanges {
            username: self.username,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            bio: self.bio,
            role: self.role,
        })
    }

    /// Changes a user may apply to their own record; role is ignored
    pub fn into_self_changes(self) -> Result<UserChanges> {
        let mut changes = self.into_changes()?;
        changes.role = None;
        Ok(changes)
    }
}

fn validation_errors(payload: &impl Validate) -> FieldErrors {
    match payload.validate() {
        Ok(()) => FieldErrors::new(),
        Err(e) => e.into(),
    }
}
