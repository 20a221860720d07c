//! Genre handlers

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
    catalog::{GenreView, SlugPayload},
    errors::Result,
    pagination::{Page, PageParams},
    permissions::{Access, Policy},
};

pub async fn list_genres(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    ApiQuery(search): ApiQuery<SearchParams>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Page<GenreView>>> {
    let request = state.page(params)?;
    let listing = state
        .repo()
        .list_genres(search.search.as_deref(), request)
        .await?;

    Ok(Json(Page::new(listing.map(GenreView::from), request, &uri)?))
}

pub async fn create_genre(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(payload): ApiJson<SlugPayload>,
) -> Result<(StatusCode, Json<GenreView>)> {
    Policy::AdminOrReadOnly.check(&actor, Access::Write)?;

    let genre = state.repo().create_genre(payload.into_entry()?).await?;
    Ok((StatusCode::CREATED, Json(genre.into())))
}

pub async fn delete_genre(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(slug): ApiPath<String>,
) -> Result<StatusCode> {
    Policy::AdminOrReadOnly.check(&actor, Access::Write)?;

    state.repo().delete_genre(&slug).await?;
    Ok(StatusCode::NO_CONTENT)
}
