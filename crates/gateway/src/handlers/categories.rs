//! Category handlers

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
    catalog::{CategoryView, SlugPayload},
    errors::Result,
    pagination::{Page, PageParams},
    permissions::{Access, Policy},
};

pub async fn list_categories(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    ApiQuery(search): ApiQuery<SearchParams>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Page<CategoryView>>> {
    let request = state.page(params)?;
    let listing = state
        .repo()
        .list_categories(search.search.as_deref(), request)
        .await?;

    Ok(Json(Page::new(listing.map(CategoryView::from), request, &uri)?))
}

pub async fn create_category(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(payload): ApiJson<SlugPayload>,
) -> Result<(StatusCode, Json<CategoryView>)> {
    Policy::AdminOrReadOnly.check(&actor, Access::Write)?;

    let category = state.repo().create_category(payload.into_entry()?).await?;
    Ok((StatusCode::CREATED, Json(category.into())))
}

/// Titles of a deleted category keep existing without one
pub async fn delete_category(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(slug): ApiPath<String>,
) -> Result<StatusCode> {
    Policy::AdminOrReadOnly.check(&actor, Access::Write)?;

    state.repo().delete_category(&slug).await?;
    Ok(StatusCode::NO_CONTENT)
}
