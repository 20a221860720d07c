//! Catalog: categories, genres and titles
//!
//! Read representations, write payloads and the rules a title must
//! satisfy before it is persisted.

pub mod rating;
mod validation;

pub use validation::{
    check_slug, check_year, current_year, validate_new_title, validate_title_changes, NewTitle,
    SlugPayload, TitleChanges, TitlePayload,
};

use crate::db::models::{Category, Genre, Title};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryView {
    pub name: String,
    pub slug: String,
}

impl From<Category> for CategoryView {
    fn from(category: Category) -> Self {
        Self {
            name: category.name,
            slug: category.slug,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenreView {
    pub name: String,
    pub slug: String,
}

impl From<Genre> for GenreView {
    fn from(genre: Genre) -> Self {
        Self {
            name: genre.name,
            slug: genre.slug,
        }
    }
}

/// Title as served to readers: nested category and genres, derived rating
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TitleView {
    pub id: i32,
    pub name: String,
    pub year: i32,
    pub rating: Option<i32>,
    pub description: String,
    pub genre: Vec<GenreView>,
    pub category: Option<CategoryView>,
}

impl TitleView {
    pub fn new(
        title: Title,
        category: Option<Category>,
        genres: Vec<Genre>,
        rating: Option<i32>,
    ) -> Self {
        Self {
            id: title.id,
            name: title.name,
            year: title.year,
            rating,
            description: title.description,
            genre: genres.into_iter().map(GenreView::from).collect(),
            category: category.map(CategoryView::from),
        }
    }

    /// Genre slugs in display order
    pub fn genre_slugs(&self) -> Vec<&str> {
        self.genre.iter().map(|g| g.slug.as_str()).collect()
    }
}
