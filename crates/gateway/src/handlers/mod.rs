//! API handlers module

pub mod auth;
pub mod categories;
pub mod comments;
pub mod genres;
pub mod health;
pub mod reviews;
pub mod titles;
pub mod users;

use serde::Deserialize;

/// `?search=` filter on list endpoints
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub search: Option<String>,
}
