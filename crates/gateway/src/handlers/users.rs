//! User management handlers
//!
//! Admins manage every account by username; any authenticated user
//! may read and edit their own profile through `/users/me/`.

use axum::{
    extract::{OriginalUri, State},
    http::StatusCode,
    Json,
};

use super::SearchParams;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::AppState;
use yamdb_common::{
    auth::Actor,
    errors::Result,
    pagination::{Page, PageParams},
    permissions::{Access, Policy},
    users::{NewUserPayload, UserPatch, UserView},
};

pub async fn list_users(
    State(state): State<AppState>,
    actor: Actor,
    OriginalUri(uri): OriginalUri,
    ApiQuery(search): ApiQuery<SearchParams>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Page<UserView>>> {
    Policy::AdminOnly.check(&actor, Access::Read)?;

    let request = state.page(params)?;
    let listing = state
        .repo()
        .list_users(search.search.as_deref(), request)
        .await?;

    Ok(Json(Page::new(listing.map(UserView::from), request, &uri)?))
}

pub async fn create_user(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(payload): ApiJson<NewUserPayload>,
) -> Result<(StatusCode, Json<UserView>)> {
    Policy::AdminOnly.check(&actor, Access::Write)?;

    let user = state.repo().create_user(payload.into_new_user()?).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn get_user(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(username): ApiPath<String>,
) -> Result<Json<UserView>> {
    Policy::AdminOnly.check(&actor, Access::Read)?;

    let user = state.repo().get_user(&username).await?;
    Ok(Json(user.into()))
}

/// Partial update; admins may change the role
pub async fn update_user(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(username): ApiPath<String>,
    ApiJson(payload): ApiJson<UserPatch>,
) -> Result<Json<UserView>> {
    Policy::AdminOnly.check(&actor, Access::Write)?;

    let repo = state.repo();
    let user = repo.get_user(&username).await?;
    let updated = repo.update_user(user, payload.into_changes()?).await?;
    Ok(Json(updated.into()))
}

pub async fn delete_user(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(username): ApiPath<String>,
) -> Result<StatusCode> {
    Policy::AdminOnly.check(&actor, Access::Write)?;

    state.repo().delete_user(&username).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(actor: Actor) -> Result<Json<UserView>> {
    Policy::Authenticated.check(&actor, Access::Read)?;

    let user = actor.require_user()?.clone();
    Ok(Json(user.into()))
}

/// Edit the caller's own profile; a role in the payload is ignored
pub async fn update_me(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(payload): ApiJson<UserPatch>,
) -> Result<Json<UserView>> {
    Policy::Authenticated.check(&actor, Access::Write)?;

    let user = actor.require_user()?.clone();
    let updated = state
        .repo()
        .update_user(user, payload.into_self_changes()?)
        .await?;
    Ok(Json(updated.into()))
}
