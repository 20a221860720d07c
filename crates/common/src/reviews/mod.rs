//! Reviews and comments: payloads and read representations

use crate::db::models::{Comment, Review, User};
use crate::errors::{FieldErrors, Result};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Review create / partial update payload
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ReviewPayload {
    #[validate(length(min = 1, message = "text must not be empty"))]
    pub text: Option<String>,

    #[validate(range(min = 1, max = 10, message = "score must be between 1 and 10"))]
    pub score: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    pub text: String,
    pub score: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewPatch {
    pub text: Option<String>,
    pub score: Option<i32>,
}

impl ReviewPayload {
    /// Both fields are required on create
    pub fn into_new(self) -> Result<NewReview> {
        let mut errors = self.field_errors();
        if self.text.is_none() {
            errors.add("text", "this field is required");
        }
        if self.score.is_none() {
            errors.add("score", "this field is required");
        }
        errors.into_result()?;

        Ok(NewReview {
            text: self.text.unwrap_or_default(),
            score: self.score.unwrap_or_default(),
        })
    }

    pub fn into_patch(self) -> Result<ReviewPatch> {
        self.field_errors().into_result()?;
        Ok(ReviewPatch {
            text: self.text,
            score: self.score,
        })
    }

    fn field_errors(&self) -> FieldErrors {
        match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => e.into(),
        }
    }
}

/// Comment create / partial update payload
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CommentPayload {
    #[validate(length(min = 1, message = "text must not be empty"))]
    pub text: Option<String>,
}

impl CommentPayload {
    /// Text of a new comment, which is required
    pub fn into_text(self) -> Result<String> {
        let mut errors = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => FieldErrors::from(e),
        };
        if self.text.is_none() {
            errors.add("text", "this field is required");
        }
        errors.into_result()?;
        Ok(self.text.unwrap_or_default())
    }

    /// Replacement text, if any was supplied
    pub fn into_patch(self) -> Result<Option<String>> {
        if let Err(e) = self.validate() {
            return Err(e.into());
        }
        Ok(self.text)
    }
}

/// Review as served to readers; the author is shown by username
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewView {
    pub id: i32,
    pub text: String,
    pub author: String,
    pub score: i32,
    pub pub_date: DateTimeWithTimeZone,
}

impl ReviewView {
    pub fn new(review: Review, author: Option<User>) -> Self {
        Self {
            id: review.id,
            text: review.text,
            author: author.map(|u| u.username).unwrap_or_default(),
            score: review.score,
            pub_date: review.pub_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentView {
    pub id: i32,
    pub text: String,
    pub author: String,
    pub pub_date: DateTimeWithTimeZone,
}

impl CommentView {
    pub fn new(comment: Comment, author: Option<User>) -> Self {
        Self {
            id: comment.id,
            text: comment.text,
            author: author.map(|u| u.username).unwrap_or_default(),
            pub_date: comment.pub_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;

    fn fields(err: AppError) -> FieldErrors {
        match err {
            AppError::Fields(fields) => fields,
            other => panic!("expected field errors, got {:?}", other),
        }
    }

    #[test]
    fn test_score_bounds() {
        for score in [0, 11, -3] {
            let payload = ReviewPayload {
                text: Some("ok".into()),
                score: Some(score),
            };
            let errors = fields(payload.into_new().unwrap_err());
            assert!(errors.get("score").is_some(), "score {} accepted", score);
        }

        for score in [1, 10] {
            let payload = ReviewPayload {
                text: Some("ok".into()),
                score: Some(score),
            };
            assert_eq!(payload.into_new().unwrap().score, score);
        }
    }

    #[test]
    fn test_new_review_requires_both_fields() {
        let errors = fields(ReviewPayload::default().into_new().unwrap_err());
        assert!(errors.get("text").is_some());
        assert!(errors.get("score").is_some());
    }

    #[test]
    fn test_patch_accepts_partial_payload() {
        let patch = ReviewPayload {
            text: None,
            score: Some(4),
        }
        .into_patch()
        .unwrap();
        assert_eq!(patch, ReviewPatch { text: None, score: Some(4) });
    }

    #[test]
    fn test_empty_comment_rejected() {
        let payload = CommentPayload {
            text: Some(String::new()),
        };
        assert!(payload.into_text().is_err());
        assert!(CommentPayload::default().into_text().is_err());
        assert_eq!(CommentPayload::default().into_patch().unwrap(), None);
    }
}
