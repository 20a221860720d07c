//! Administrator bootstrap

use tracing::info;
use yamdb_common::{
    auth::issue_confirmation_code,
    db::{models::Role, Repository},
    errors::Result,
    users::NewUserPayload,
};

/// Create a superuser and return a confirmation code for the token endpoint
pub async fn create_superuser(repo: &Repository, username: String, email: String) -> Result<String> {
    let payload = NewUserPayload {
        username,
        email,
        first_name: String::new(),
        last_name: String::new(),
        bio: String::new(),
        role: Role::Admin,
    };
    let new_user = payload.into_new_user()?;

    let user = repo
        .create_user(yamdb_common::db::NewUser {
            is_superuser: true,
            ..new_user
        })
        .await?;
    let (user, code) = issue_confirmation_code(repo, user).await?;

    info!(user_id = user.id, username = %user.username, "Superuser created");
    Ok(code)
}
