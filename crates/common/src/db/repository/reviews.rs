use super::{on_unique, Repository};
use crate::db::models::*;
use crate::errors::{AppError, Result};
use crate::pagination::{Listing, PageRequest};
use crate::reviews::{CommentView, NewReview, ReviewPatch, ReviewView};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::info;

fn already_reviewed(author: &User, title_id: i32) -> String {
    format!("user `{}` has already reviewed title {}", author.username, title_id)
}

/// Insert a review; a concurrent duplicate that passed the lookup fails on
/// the (author, title) unique index
async fn insert_review<C: ConnectionTrait>(
    conn: &C,
    title_id: i32,
    author: &User,
    new: NewReview,
) -> Result<Review> {
    ReviewActiveModel {
        text: Set(new.text),
        author_id: Set(author.id),
        score: Set(new.score),
        title_id: Set(title_id),
        pub_date: Set(chrono::Utc::now().into()),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(on_unique("non_field_errors", already_reviewed(author, title_id)))
}

impl Repository {
    // ========================================================================
    // Review Operations
    // ========================================================================

    /// Reviews of a title, oldest first
    pub async fn list_reviews(&self, title_id: i32, page: PageRequest) -> Result<Listing<ReviewView>> {
        self.get_title(title_id).await?;

        let paginator = ReviewEntity::find()
            .filter(ReviewColumn::TitleId.eq(title_id))
            .order_by_asc(ReviewColumn::PubDate)
            .order_by_asc(ReviewColumn::Id)
            .find_also_related(UserEntity)
            .paginate(self.read_conn(), page.size);

        let total = paginator.num_items().await?;
        let items = paginator
            .fetch_page(page.index())
            .await?
            .into_iter()
            .map(|(review, author)| ReviewView::new(review, author))
            .collect();

        Ok(Listing { items, total })
    }

    /// A review addressed through its title; a review of another title is not found
    pub async fn get_review(&self, title_id: i32, review_id: i32) -> Result<Review> {
        ReviewEntity::find_by_id(review_id)
            .filter(ReviewColumn::TitleId.eq(title_id))
            .one(self.read_conn())
            .await?
            .ok_or_else(|| AppError::not_found("review", review_id))
    }

    pub async fn review_view(&self, review: Review) -> Result<ReviewView> {
        let author = UserEntity::find_by_id(review.author_id)
            .one(self.read_conn())
            .await?;
        Ok(ReviewView::new(review, author))
    }

    /// Create the author's single review of a title
    pub async fn create_review(
        &self,
        title_id: i32,
        author: &User,
        new: NewReview,
    ) -> Result<ReviewView> {
        self.get_title(title_id).await?;

        let existing = ReviewEntity::find()
            .filter(ReviewColumn::AuthorId.eq(author.id))
            .filter(ReviewColumn::TitleId.eq(title_id))
            .one(self.read_conn())
            .await?;
        if existing.is_some() {
            return Err(AppError::conflict("non_field_errors", already_reviewed(author, title_id)));
        }

        let review = insert_review(self.write_conn(), title_id, author, new).await?;

        info!(review_id = review.id, title_id, author = %author.username, score = review.score, "Review created");
        Ok(ReviewView::new(review, Some(author.clone())))
    }

    pub async fn update_review(&self, review: Review, patch: ReviewPatch) -> Result<ReviewView> {
        let mut active: ReviewActiveModel = review.clone().into();
        if let Some(text) = patch.text {
            active.text = Set(text);
        }
        if let Some(score) = patch.score {
            active.score = Set(score);
        }

        let review = if active.is_changed() {
            let updated = active.update(self.write_conn()).await?;
            info!(review_id = updated.id, "Review updated");
            updated
        } else {
            review
        };

        self.review_view(review).await
    }

    /// Delete a review and its comments
    pub async fn delete_review(&self, review: Review) -> Result<()> {
        ReviewEntity::delete_by_id(review.id)
            .exec(self.write_conn())
            .await?;

        info!(review_id = review.id, title_id = review.title_id, "Review deleted");
        Ok(())
    }

    // ========================================================================
    // Comment Operations
    // ========================================================================

    /// Comments on a review, oldest first
    pub async fn list_comments(&self, review_id: i32, page: PageRequest) -> Result<Listing<CommentView>> {
        let paginator = CommentEntity::find()
            .filter(CommentColumn::ReviewId.eq(review_id))
            .order_by_asc(CommentColumn::PubDate)
            .order_by_asc(CommentColumn::Id)
            .find_also_related(UserEntity)
            .paginate(self.read_conn(), page.size);

        let total = paginator.num_items().await?;
        let items = paginator
            .fetch_page(page.index())
            .await?
            .into_iter()
            .map(|(comment, author)| CommentView::new(comment, author))
            .collect();

        Ok(Listing { items, total })
    }

    /// A comment addressed through its review
    pub async fn get_comment(&self, review_id: i32, comment_id: i32) -> Result<Comment> {
        CommentEntity::find_by_id(comment_id)
            .filter(CommentColumn::ReviewId.eq(review_id))
            .one(self.read_conn())
            .await?
            .ok_or_else(|| AppError::not_found("comment", comment_id))
    }

    pub async fn comment_view(&self, comment: Comment) -> Result<CommentView> {
        let author = UserEntity::find_by_id(comment.author_id)
            .one(self.read_conn())
            .await?;
        Ok(CommentView::new(comment, author))
    }

    pub async fn create_comment(
        &self,
        review: &Review,
        author: &User,
        text: String,
    ) -> Result<CommentView> {
        let comment = CommentActiveModel {
            text: Set(text),
            author_id: Set(author.id),
            review_id: Set(review.id),
            pub_date: Set(chrono::Utc::now().into()),
            ..Default::default()
        }
        .insert(self.write_conn())
        .await?;

        info!(comment_id = comment.id, review_id = review.id, author = %author.username, "Comment created");
        Ok(CommentView::new(comment, Some(author.clone())))
    }

    pub async fn update_comment(&self, comment: Comment, text: Option<String>) -> Result<CommentView> {
        let comment = match text {
            Some(text) => {
                let mut active: CommentActiveModel = comment.into();
                active.text = Set(text);
                let updated = active.update(self.write_conn()).await?;
                info!(comment_id = updated.id, "Comment updated");
                updated
            }
            None => comment,
        };

        self.comment_view(comment).await
    }

    pub async fn delete_comment(&self, comment: Comment) -> Result<()> {
        CommentEntity::delete_by_id(comment.id)
            .exec(self.write_conn())
            .await?;

        info!(comment_id = comment.id, review_id = comment.review_id, "Comment deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures;
    use crate::pagination::PageParams;

    fn first_page() -> PageRequest {
        PageRequest::new(PageParams::default(), 10).unwrap()
    }

    fn review(text: &str, score: i32) -> NewReview {
        NewReview {
            text: text.to_string(),
            score,
        }
    }

    #[tokio::test]
    async fn test_one_review_per_author_and_title() {
        let repo = fixtures::repo().await;
        let bob = fixtures::user(&repo, "bob", Role::User).await;
        let title = fixtures::title(&repo, "Heat", 1995).await;

        repo.create_review(title.id, &bob, review("Great", 9)).await.unwrap();
        let err = repo
            .create_review(title.id, &bob, review("Again", 3))
            .await
            .unwrap_err();

        match err {
            AppError::Conflict { message, .. } => {
                assert!(message.contains("bob"));
                assert!(message.contains(&title.id.to_string()));
            }
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_duplicate_past_the_lookup_hits_unique_index() {
        let repo = fixtures::repo().await;
        let bob = fixtures::user(&repo, "bob", Role::User).await;
        let title = fixtures::title(&repo, "Heat", 1995).await;
        repo.create_review(title.id, &bob, review("Great", 9)).await.unwrap();

        // A racing request that already passed the existence check
        let err = insert_review(repo.write_conn(), title.id, &bob, review("Again", 3))
            .await
            .unwrap_err();

        assert_eq!(err.status_code().as_u16(), 409);
        assert!(matches!(
            err,
            AppError::Conflict { ref field, ref message }
                if field == "non_field_errors" && message.contains("bob")
        ));
        let reviews = repo.list_reviews(title.id, first_page()).await.unwrap();
        assert_eq!(reviews.total, 1);
    }

    #[tokio::test]
    async fn test_rating_is_truncated_mean() {
        let repo = fixtures::repo().await;
        let title = fixtures::title(&repo, "Heat", 1995).await;
        let alice = fixtures::user(&repo, "alice", Role::User).await;
        let bob = fixtures::user(&repo, "bob", Role::User).await;

        repo.create_review(title.id, &alice, review("Fine", 7)).await.unwrap();
        repo.create_review(title.id, &bob, review("Good", 8)).await.unwrap();

        assert_eq!(repo.title_view(title.id).await.unwrap().rating, Some(7));
    }

    #[tokio::test]
    async fn test_rating_follows_edits_and_deletes() {
        let repo = fixtures::repo().await;
        let title = fixtures::title(&repo, "Heat", 1995).await;
        let alice = fixtures::user(&repo, "alice", Role::User).await;

        let created = repo.create_review(title.id, &alice, review("Meh", 1)).await.unwrap();
        let stored = repo.get_review(title.id, created.id).await.unwrap();
        repo.update_review(stored, ReviewPatch { text: None, score: Some(10) })
            .await
            .unwrap();
        assert_eq!(repo.title_view(title.id).await.unwrap().rating, Some(10));

        let stored = repo.get_review(title.id, created.id).await.unwrap();
        repo.delete_review(stored).await.unwrap();
        assert_eq!(repo.title_view(title.id).await.unwrap().rating, None);
    }

    #[tokio::test]
    async fn test_review_under_wrong_title_is_not_found() {
        let repo = fixtures::repo().await;
        let alice = fixtures::user(&repo, "alice", Role::User).await;
        let heat = fixtures::title(&repo, "Heat", 1995).await;
        let casino = fixtures::title(&repo, "Casino", 1995).await;

        let created = repo.create_review(heat.id, &alice, review("Tense", 8)).await.unwrap();
        assert!(matches!(
            repo.get_review(casino.id, created.id).await,
            Err(AppError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_reviews_and_comments_list_oldest_first() {
        let repo = fixtures::repo().await;
        let title = fixtures::title(&repo, "Heat", 1995).await;
        let alice = fixtures::user(&repo, "alice", Role::User).await;
        let bob = fixtures::user(&repo, "bob", Role::User).await;

        let first = repo.create_review(title.id, &alice, review("First", 6)).await.unwrap();
        repo.create_review(title.id, &bob, review("Second", 4)).await.unwrap();

        let reviews = repo.list_reviews(title.id, first_page()).await.unwrap();
        let authors: Vec<_> = reviews.items.iter().map(|r| r.author.as_str()).collect();
        assert_eq!(authors, vec!["alice", "bob"]);

        let parent = repo.get_review(title.id, first.id).await.unwrap();
        repo.create_comment(&parent, &bob, "Agreed".into()).await.unwrap();
        repo.create_comment(&parent, &alice, "Thanks".into()).await.unwrap();

        let comments = repo.list_comments(parent.id, first_page()).await.unwrap();
        let texts: Vec<_> = comments.items.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["Agreed", "Thanks"]);
    }

    #[tokio::test]
    async fn test_deleting_title_cascades_to_reviews_and_comments() {
        let repo = fixtures::repo().await;
        let title = fixtures::title(&repo, "Heat", 1995).await;
        let alice = fixtures::user(&repo, "alice", Role::User).await;

        let created = repo.create_review(title.id, &alice, review("Gone", 5)).await.unwrap();
        let parent = repo.get_review(title.id, created.id).await.unwrap();
        let comment = repo.create_comment(&parent, &alice, "Soon".into()).await.unwrap();

        repo.delete_title(title.id).await.unwrap();

        assert!(matches!(
            repo.get_comment(parent.id, comment.id).await,
            Err(AppError::NotFound { .. })
        ));
        assert!(matches!(
            repo.list_reviews(title.id, first_page()).await,
            Err(AppError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_deleting_author_cascades() {
        let repo = fixtures::repo().await;
        let title = fixtures::title(&repo, "Heat", 1995).await;
        let alice = fixtures::user(&repo, "alice", Role::User).await;

        repo.create_review(title.id, &alice, review("Bye", 2)).await.unwrap();
        repo.delete_user("alice").await.unwrap();

        let reviews = repo.list_reviews(title.id, first_page()).await.unwrap();
        assert_eq!(reviews.total, 0);
    }
}
