//! Title handlers
//!
//! Titles are written with category and genre slugs and read back with
//! both nested, plus the rounded average review score.

use axum::{
    extract::{OriginalUri, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::AppState;
use yamdb_common::{
    auth::Actor,
    catalog::{validate_new_title, validate_title_changes, TitlePayload, TitleView},
    db::TitleFilter,
    errors::Result,
    pagination::{Page, PageParams},
    permissions::{Access, Policy},
};

/// List titles, filtered by `category`, `genre`, `name` and `year`
pub async fn list_titles(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    ApiQuery(filter): ApiQuery<TitleFilter>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Page<TitleView>>> {
    let request = state.page(params)?;
    let listing = state.repo().list_titles(&filter, request).await?;

    Ok(Json(Page::new(listing, request, &uri)?))
}

pub async fn get_title(
    State(state): State<AppState>,
    ApiPath(title_id): ApiPath<i32>,
) -> Result<Json<TitleView>> {
    Ok(Json(state.repo().title_view(title_id).await?))
}

pub async fn create_title(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(payload): ApiJson<TitlePayload>,
) -> Result<(StatusCode, Json<TitleView>)> {
    Policy::AdminOrReadOnly.check(&actor, Access::Write)?;

    let repo = state.repo();
    let new = validate_new_title(&repo, payload).await?;
    let view = repo.create_title(new).await?;

    info!(title_id = view.id, name = %view.name, "Title created via API");
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn update_title(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(title_id): ApiPath<i32>,
    ApiJson(payload): ApiJson<TitlePayload>,
) -> Result<Json<TitleView>> {
    Policy::AdminOrReadOnly.check(&actor, Access::Write)?;

    let repo = state.repo();
    // 404 before validation errors
    repo.get_title(title_id).await?;
    let changes = validate_title_changes(&repo, payload).await?;

    Ok(Json(repo.update_title(title_id, changes).await?))
}

pub async fn delete_title(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(title_id): ApiPath<i32>,
) -> Result<StatusCode> {
    Policy::AdminOrReadOnly.check(&actor, Access::Write)?;

    state.repo().delete_title(title_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
