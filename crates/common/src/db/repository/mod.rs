//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling and transaction support.

mod catalog;
mod reviews;
mod users;

pub use catalog::{SlugEntry, TitleFilter};
pub use users::{NewUser, UserChanges};

use crate::db::DbPool;
use crate::errors::{AppError, Result};
use sea_orm::sea_query::LikeExpr;
use sea_orm::{DatabaseConnection, DbErr, SqlErr};

/// Repository for data access operations
#[derive(Clone, Debug)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }
}

/// Map a unique-constraint violation to a conflict on `field`, anything
/// else to the usual database error
fn on_unique(field: &'static str, message: String) -> impl FnOnce(DbErr) -> AppError {
    move |err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::conflict(field, message),
        _ => err.into(),
    }
}

/// `LIKE` pattern matching `term` anywhere, with its wildcards taken literally
fn contains_pattern(term: &str) -> LikeExpr {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    LikeExpr::new(escaped).escape('\\')
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::catalog::{NewTitle, TitleView};
    use crate::db::models::{Role, User};
    use crate::db::test_pool;

    pub async fn repo() -> Repository {
        Repository::new(test_pool().await)
    }

    pub async fn user(repo: &Repository, username: &str, role: Role) -> User {
        let mut new = NewUser::new(username, format!("{}@yamdb.test", username));
        new.role = role;
        repo.create_user(new).await.unwrap()
    }

    pub async fn title(repo: &Repository, name: &str, year: i32) -> TitleView {
        repo.create_title(NewTitle {
            name: name.to_string(),
            year,
            description: String::new(),
            category_id: None,
            genre_ids: vec![],
        })
        .await
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::sea_query::{Alias, Expr, Query, SqliteQueryBuilder};

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        let sql = Query::select()
            .column(Alias::new("name"))
            .from(Alias::new("genres"))
            .and_where(Expr::col(Alias::new("name")).like(contains_pattern(r"50%_off\")))
            .to_string(SqliteQueryBuilder);

        assert!(sql.contains(r"LIKE '%50\%\_off\\%'"), "{}", sql);
        assert!(sql.contains(r"ESCAPE '\'"), "{}", sql);
    }
}
