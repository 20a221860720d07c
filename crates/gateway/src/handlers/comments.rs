//! Comment handlers
//!
//! Every route resolves the review through its title first, so a review
//! id paired with the wrong title is a 404.

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
    reviews::{CommentPayload, CommentView},
};

const POLICY: Policy = Policy::AuthorOrReadOnly;

pub async fn list_comments(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    ApiPath((title_id, review_id)): ApiPath<(i32, i32)>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Page<CommentView>>> {
    let request = state.page(params)?;
    let repo = state.repo();
    let review = repo.get_review(title_id, review_id).await?;
    let listing = repo.list_comments(review.id, request).await?;

    Ok(Json(Page::new(listing, request, &uri)?))
}

pub async fn create_comment(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath((title_id, review_id)): ApiPath<(i32, i32)>,
    ApiJson(payload): ApiJson<CommentPayload>,
) -> Result<(StatusCode, Json<CommentView>)> {
    POLICY.check(&actor, Access::Write)?;
    let author = actor.require_user()?;

    let repo = state.repo();
    let review = repo.get_review(title_id, review_id).await?;
    let view = repo
        .create_comment(&review, author, payload.into_text()?)
        .await?;
    metrics::record_comment_created();

    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_comment(
    State(state): State<AppState>,
    ApiPath((title_id, review_id, comment_id)): ApiPath<(i32, i32, i32)>,
) -> Result<Json<CommentView>> {
    let repo = state.repo();
    let review = repo.get_review(title_id, review_id).await?;
    let comment = repo.get_comment(review.id, comment_id).await?;
    Ok(Json(repo.comment_view(comment).await?))
}

pub async fn update_comment(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath((title_id, review_id, comment_id)): ApiPath<(i32, i32, i32)>,
    ApiJson(payload): ApiJson<CommentPayload>,
) -> Result<Json<CommentView>> {
    POLICY.check(&actor, Access::Write)?;

    let repo = state.repo();
    let review = repo.get_review(title_id, review_id).await?;
    let comment = repo.get_comment(review.id, comment_id).await?;
    POLICY.check_object(&actor, Access::Write, comment.author_id)?;

    Ok(Json(repo.update_comment(comment, payload.into_patch()?).await?))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath((title_id, review_id, comment_id)): ApiPath<(i32, i32, i32)>,
) -> Result<StatusCode> {
    POLICY.check(&actor, Access::Write)?;

    let repo = state.repo();
    let review = repo.get_review(title_id, review_id).await?;
    let comment = repo.get_comment(review.id, comment_id).await?;
    POLICY.check_object(&actor, Access::Write, comment.author_id)?;

    repo.delete_comment(comment).await?;
    Ok(StatusCode::NO_CONTENT)
}
