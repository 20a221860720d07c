//! Review handlers

use axum::{
    extract::{OriginalUri, State},
    http::StatusCode,
    Json,
};

use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::AppState;
use yamdb_common::{
    auth::Actor,
    errors::Result,
    metrics,
    pagination::{Page, PageParams},
    permissions::{Access, Policy},
    reviews::{ReviewPayload, ReviewView},
};

const POLICY: Policy = Policy::AuthorOrReadOnly;

pub async fn list_reviews(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    ApiPath(title_id): ApiPath<i32>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Page<ReviewView>>> {
    let request = state.page(params)?;
    let listing = state.repo().list_reviews(title_id, request).await?;

    Ok(Json(Page::new(listing, request, &uri)?))
}

/// Post the caller's review; one per user and title
pub async fn create_review(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(title_id): ApiPath<i32>,
    ApiJson(payload): ApiJson<ReviewPayload>,
) -> Result<(StatusCode, Json<ReviewView>)> {
    POLICY.check(&actor, Access::Write)?;
    let author = actor.require_user()?;

    let view = state
        .repo()
        .create_review(title_id, author, payload.into_new()?)
        .await?;
    metrics::record_review_created(view.score);

    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_review(
    State(state): State<AppState>,
    ApiPath((title_id, review_id)): ApiPath<(i32, i32)>,
) -> Result<Json<ReviewView>> {
    let repo = state.repo();
    let review = repo.get_review(title_id, review_id).await?;
    Ok(Json(repo.review_view(review).await?))
}

pub async fn update_review(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath((title_id, review_id)): ApiPath<(i32, i32)>,
    ApiJson(payload): ApiJson<ReviewPayload>,
) -> Result<Json<ReviewView>> {
    POLICY.check(&actor, Access::Write)?;

    let repo = state.repo();
    let review = repo.get_review(title_id, review_id).await?;
    POLICY.check_object(&actor, Access::Write, review.author_id)?;

    Ok(Json(repo.update_review(review, payload.into_patch()?).await?))
}

pub async fn delete_review(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath((title_id, review_id)): ApiPath<(i32, i32)>,
) -> Result<StatusCode> {
    POLICY.check(&actor, Access::Write)?;

    let repo = state.repo();
    let review = repo.get_review(title_id, review_id).await?;
    POLICY.check_object(&actor, Access::Write, review.author_id)?;

    repo.delete_review(review).await?;
    Ok(StatusCode::NO_CONTENT)
}
