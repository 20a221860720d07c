//! Write-time rules for catalog records
//!
//! Title payloads reference their category and genres by slug. Every
//! problem found is collected per field before anything is written, so a
//! client sees all unknown genre slugs at once.

use crate::db::{Repository, SlugEntry};
use crate::errors::{FieldErrors, Result};
use chrono::{Datelike, Utc};
use regex_lite::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use validator::Validate;

fn slug_pattern() -> &'static Regex {
    static SLUG: OnceLock<Regex> = OnceLock::new();
    SLUG.get_or_init(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("valid slug pattern"))
}

/// Calendar year used for the upper bound on title years
pub fn current_year() -> i32 {
    Utc::now().year()
}

/// A title year must be positive and not in the future
pub fn check_year(year: i32, current_year: i32) -> std::result::Result<(), String> {
    if year < 1 {
        return Err(format!("year must be a positive number, got {}", year));
    }
    if year > current_year {
        return Err(format!(
            "year {} is later than the current year {}",
            year, current_year
        ));
    }
    Ok(())
}

/// Slugs are URL-safe: letters, digits, hyphen and underscore
pub fn check_slug(slug: &str) -> std::result::Result<(), String> {
    if slug_pattern().is_match(slug) {
        Ok(())
    } else {
        Err(format!(
            "`{}` is not a valid slug; use letters, numbers, underscores or hyphens",
            slug
        ))
    }
}

/// Category or genre creation payload
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SlugPayload {
    #[validate(length(min = 1, max = 256, message = "name must be 1 to 256 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 50, message = "slug must be 1 to 50 characters"))]
    pub slug: String,
}

impl SlugPayload {
    pub fn into_entry(self) -> Result<SlugEntry> {
        let mut errors = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => FieldErrors::from(e),
        };
        if let Err(message) = check_slug(&self.slug) {
            errors.add("slug", message);
        }
        errors.into_result()?;

        Ok(SlugEntry {
            name: self.name,
            slug: self.slug,
        })
    }
}

/// Title create / partial update payload
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct TitlePayload {
    #[validate(length(min = 1, max = 256, message = "name must be 1 to 256 characters"))]
    pub name: Option<String>,

    pub year: Option<i32>,

    pub description: Option<String>,

    /// Category slug
    pub category: Option<String>,

    /// Genre slugs
    pub genre: Option<Vec<String>>,
}

/// A fully validated title ready to insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTitle {
    pub name: String,
    pub year: i32,
    pub description: String,
    pub category_id: Option<i32>,
    pub genre_ids: Vec<i32>,
}

/// Validated partial update; `None` leaves the stored value untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleChanges {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    /// Replaces the whole genre set when present
    pub genre_ids: Option<Vec<i32>>,
}

/// Validate a title for creation; name and year are required
pub async fn validate_new_title(repo: &Repository, payload: TitlePayload) -> Result<NewTitle> {
    let mut errors = FieldErrors::new();
    if payload.name.is_none() {
        errors.add("name", "this field is required");
    }
    if payload.year.is_none() {
        errors.add("year", "this field is required");
    }

    let resolved = resolve(repo, &payload, errors).await?;

    Ok(NewTitle {
        name: payload.name.unwrap_or_default(),
        year: payload.year.unwrap_or_default(),
        description: payload.description.unwrap_or_default(),
        category_id: resolved.category_id,
        genre_ids: resolved.genre_ids.unwrap_or_default(),
    })
}

/// Validate a partial title update
pub async fn validate_title_changes(
    repo: &Repository,
    payload: TitlePayload,
) -> Result<TitleChanges> {
    let resolved = resolve(repo, &payload, FieldErrors::new()).await?;

    Ok(TitleChanges {
        name: payload.name,
        year: payload.year,
        description: payload.description,
        category_id: resolved.category_id,
        genre_ids: resolved.genre_ids,
    })
}

struct Resolved {
    category_id: Option<i32>,
    genre_ids: Option<Vec<i32>>,
}

async fn resolve(
    repo: &Repository,
    payload: &TitlePayload,
    mut errors: FieldErrors,
) -> Result<Resolved> {
    if let Err(e) = payload.validate() {
        errors.extend(e.into());
    }

    if let Some(year) = payload.year {
        if let Err(message) = check_year(year, current_year()) {
            errors.add("year", message);
        }
    }

    let category_id = match payload.category.as_deref() {
        Some(slug) => match repo.find_category_by_slug(slug).await? {
            Some(category) => Some(category.id),
            None => {
                errors.add("category", format!("category with slug `{}` does not exist", slug));
                None
            }
        },
        None => None,
    };

    let genre_ids = match payload.genre.as_deref() {
        Some(slugs) => Some(resolve_genres(repo, slugs, &mut errors).await?),
        None => None,
    };

    errors.into_result()?;
    Ok(Resolved {
        category_id,
        genre_ids,
    })
}

/// Map genre slugs to ids in payload order, dropping repeats and
/// recording every slug that does not exist
async fn resolve_genres(
    repo: &Repository,
    slugs: &[String],
    errors: &mut FieldErrors,
) -> Result<Vec<i32>> {
    let mut unique: Vec<&str> = Vec::with_capacity(slugs.len());
    for slug in slugs {
        if !unique.contains(&slug.as_str()) {
            unique.push(slug);
        }
    }

    let found = repo.find_genres_by_slugs(&unique).await?;
    let mut ids = Vec::with_capacity(unique.len());
    for slug in unique {
        match found.iter().find(|g| g.slug == slug) {
            Some(genre) => ids.push(genre.id),
            None => errors.add("genre", format!("genre with slug `{}` does not exist", slug)),
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use crate::db::test_pool;

    fn field_errors(err: AppError) -> FieldErrors {
        match err {
            AppError::Fields(fields) => fields,
            other => panic!("expected field errors, got {:?}", other),
        }
    }

    async fn seeded_repo() -> Repository {
        let repo = Repository::new(test_pool().await);
        repo.create_category(SlugEntry { name: "Film".into(), slug: "film".into() })
            .await
            .unwrap();
        for (name, slug) in [("Drama", "drama"), ("Comedy", "comedy")] {
            repo.create_genre(SlugEntry { name: name.into(), slug: slug.into() })
                .await
                .unwrap();
        }
        repo
    }

    #[test]
    fn test_year_bounds() {
        assert!(check_year(1999, 2026).is_ok());
        assert!(check_year(2026, 2026).is_ok());
        let err = check_year(2027, 2026).unwrap_err();
        assert!(err.contains("2027") && err.contains("2026"));
        assert!(check_year(0, 2026).is_err());
    }

    #[test]
    fn test_slug_pattern() {
        assert!(check_slug("sci-fi_2").is_ok());
        assert!(check_slug("sci fi").is_err());
        assert!(check_slug("драма").is_err());
    }

    #[test]
    fn test_slug_payload_collects_errors() {
        let payload = SlugPayload {
            name: String::new(),
            slug: "bad slug".into(),
        };
        match payload.into_entry() {
            Err(AppError::Fields(fields)) => {
                assert!(fields.get("name").is_some());
                assert!(fields.get("slug").is_some());
            }
            other => panic!("expected field errors, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_new_title_requires_name_and_year() {
        let repo = seeded_repo().await;
        let err = validate_new_title(&repo, TitlePayload::default()).await.unwrap_err();
        match err {
            AppError::Fields(fields) => {
                assert!(fields.get("name").is_some());
                assert!(fields.get("year").is_some());
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_future_year_rejected() {
        let repo = seeded_repo().await;
        let payload = TitlePayload {
            name: Some("Tomorrow".into()),
            year: Some(current_year() + 1),
            ..Default::default()
        };
        let err = validate_new_title(&repo, payload).await.unwrap_err();
        let fields = field_errors(err);
        let message = &fields.get("year").unwrap()[0];
        assert!(message.contains(&current_year().to_string()));
    }

    #[tokio::test]
    async fn test_all_unknown_genres_reported() {
        let repo = seeded_repo().await;
        let payload = TitlePayload {
            name: Some("Heat".into()),
            year: Some(1995),
            category: Some("opera".into()),
            genre: Some(vec!["drama".into(), "western".into(), "noir".into()]),
            ..Default::default()
        };
        let fields = field_errors(validate_new_title(&repo, payload).await.unwrap_err());

        let genre_errors = fields.get("genre").unwrap();
        assert_eq!(genre_errors.len(), 2);
        assert!(genre_errors[0].contains("western"));
        assert!(genre_errors[1].contains("noir"));
        assert!(fields.get("category").unwrap()[0].contains("opera"));
    }

    #[tokio::test]
    async fn test_resolves_slugs_and_collapses_repeats() {
        let repo = seeded_repo().await;
        let payload = TitlePayload {
            name: Some("Heat".into()),
            year: Some(1995),
            category: Some("film".into()),
            genre: Some(vec!["drama".into(), "comedy".into(), "drama".into()]),
            ..Default::default()
        };
        let title = validate_new_title(&repo, payload).await.unwrap();
        assert_eq!(title.genre_ids.len(), 2);
        assert!(title.category_id.is_some());
        assert_eq!(title.description, "");
    }

    #[tokio::test]
    async fn test_changes_leave_absent_fields_alone() {
        let repo = seeded_repo().await;
        let payload = TitlePayload {
            description: Some("Updated".into()),
            ..Default::default()
        };
        let changes = validate_title_changes(&repo, payload).await.unwrap();
        assert_eq!(changes.description.as_deref(), Some("Updated"));
        assert!(changes.name.is_none());
        assert!(changes.genre_ids.is_none());
        assert!(changes.category_id.is_none());
    }
}
