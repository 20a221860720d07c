use super::{contains_pattern, on_unique, Repository};
use crate::catalog::rating::{rating_of, ScoreTotals};
use crate::catalog::{NewTitle, TitleChanges, TitleView};
use crate::db::models::*;
use crate::errors::{AppError, Result};
use crate::pagination::{Listing, PageRequest};
use sea_orm::sea_query::{Expr, Func, IntoColumnRef, Query, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info};

/// Name and slug of a category or genre
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugEntry {
    pub name: String,
    pub slug: String,
}

/// Title list filters, all optional and combined with AND
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitleFilter {
    /// Category slug
    pub category: Option<String>,
    /// Genre slug
    pub genre: Option<String>,
    /// Case-insensitive substring of the name
    pub name: Option<String>,
    pub year: Option<i32>,
}

/// Case-insensitive substring match on a name column
fn name_like(column: impl IntoColumnRef, term: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column))).like(contains_pattern(&term.to_lowercase()))
}

fn slug_taken(kind: &str, slug: &str) -> String {
    format!("{} with slug `{}` already exists", kind, slug)
}

/// Slug uniqueness is enforced by the index; the caller's lookup only
/// gives the common case a clearer path
async fn insert_category<C: ConnectionTrait>(conn: &C, entry: SlugEntry) -> Result<Category> {
    let conflict = slug_taken("category", &entry.slug);
    CategoryActiveModel {
        name: Set(entry.name),
        slug: Set(entry.slug),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(on_unique("slug", conflict))
}

async fn insert_genre<C: ConnectionTrait>(conn: &C, entry: SlugEntry) -> Result<Genre> {
    let conflict = slug_taken("genre", &entry.slug);
    GenreActiveModel {
        name: Set(entry.name),
        slug: Set(entry.slug),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(on_unique("slug", conflict))
}

impl Repository {
    // ========================================================================
    // Category Operations
    // ========================================================================

    /// List categories ordered by slug, optionally filtered by name
    pub async fn list_categories(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<Listing<Category>> {
        let mut query = CategoryEntity::find();
        if let Some(term) = search.filter(|s| !s.is_empty()) {
            query = query.filter(name_like(CategoryColumn::Name, term));
        }

        let paginator = query
            .order_by_asc(CategoryColumn::Slug)
            .paginate(self.read_conn(), page.size);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.index()).await?;
        Ok(Listing { items, total })
    }

    pub async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        CategoryEntity::find()
            .filter(CategoryColumn::Slug.eq(slug))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn create_category(&self, entry: SlugEntry) -> Result<Category> {
        if self.find_category_by_slug(&entry.slug).await?.is_some() {
            return Err(AppError::conflict("slug", slug_taken("category", &entry.slug)));
        }

        let category = insert_category(self.write_conn(), entry).await?;

        info!(category = %category.slug, "Category created");
        Ok(category)
    }

    /// Delete a category; its titles stay and lose their category
    pub async fn delete_category(&self, slug: &str) -> Result<()> {
        let txn = self.write_conn().begin().await?;

        let category = CategoryEntity::find()
            .filter(CategoryColumn::Slug.eq(slug))
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::not_found("category", slug))?;

        let detached = TitleEntity::update_many()
            .col_expr(TitleColumn::CategoryId, Expr::value(Option::<i32>::None))
            .filter(TitleColumn::CategoryId.eq(category.id))
            .exec(&txn)
            .await?;

        CategoryEntity::delete_by_id(category.id).exec(&txn).await?;
        txn.commit().await?;

        info!(
            category = %category.slug,
            titles_detached = detached.rows_affected,
            "Category deleted"
        );
        Ok(())
    }

    // ========================================================================
    // Genre Operations
    // ========================================================================

    /// List genres ordered by slug, optionally filtered by name
    pub async fn list_genres(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<Listing<Genre>> {
        let mut query = GenreEntity::find();
        if let Some(term) = search.filter(|s| !s.is_empty()) {
            query = query.filter(name_like(GenreColumn::Name, term));
        }

        let paginator = query
            .order_by_asc(GenreColumn::Slug)
            .paginate(self.read_conn(), page.size);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.index()).await?;
        Ok(Listing { items, total })
    }

    pub async fn find_genre_by_slug(&self, slug: &str) -> Result<Option<Genre>> {
        GenreEntity::find()
            .filter(GenreColumn::Slug.eq(slug))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Genres whose slug is in `slugs`; unknown slugs are simply absent
    pub async fn find_genres_by_slugs(&self, slugs: &[&str]) -> Result<Vec<Genre>> {
        if slugs.is_empty() {
            return Ok(Vec::new());
        }
        GenreEntity::find()
            .filter(GenreColumn::Slug.is_in(slugs.iter().copied()))
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn create_genre(&self, entry: SlugEntry) -> Result<Genre> {
        if self.find_genre_by_slug(&entry.slug).await?.is_some() {
            return Err(AppError::conflict("slug", slug_taken("genre", &entry.slug)));
        }

        let genre = insert_genre(self.write_conn(), entry).await?;

        info!(genre = %genre.slug, "Genre created");
        Ok(genre)
    }

    /// Delete a genre; its title links go with it
    pub async fn delete_genre(&self, slug: &str) -> Result<()> {
        let genre = self
            .find_genre_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::not_found("genre", slug))?;

        GenreEntity::delete_by_id(genre.id)
            .exec(self.write_conn())
            .await?;

        info!(genre = %genre.slug, "Genre deleted");
        Ok(())
    }

    // ========================================================================
    // Title Operations
    // ========================================================================

    /// List titles newest year first, with nested category, genres and rating
    pub async fn list_titles(
        &self,
        filter: &TitleFilter,
        page: PageRequest,
    ) -> Result<Listing<TitleView>> {
        let mut query = TitleEntity::find();

        if let Some(slug) = filter.category.as_deref() {
            query = query.filter(
                TitleColumn::CategoryId.in_subquery(
                    Query::select()
                        .column(CategoryColumn::Id)
                        .from(CategoryEntity)
                        .and_where(CategoryColumn::Slug.eq(slug))
                        .to_owned(),
                ),
            );
        }
        if let Some(slug) = filter.genre.as_deref() {
            query = query.filter(
                TitleColumn::Id.in_subquery(
                    Query::select()
                        .column((GenreTitleEntity, GenreTitleColumn::TitleId))
                        .from(GenreTitleEntity)
                        .inner_join(
                            GenreEntity,
                            Expr::col((GenreEntity, GenreColumn::Id))
                                .equals((GenreTitleEntity, GenreTitleColumn::GenreId)),
                        )
                        .and_where(Expr::col((GenreEntity, GenreColumn::Slug)).eq(slug))
                        .to_owned(),
                ),
            );
        }
        if let Some(name) = filter.name.as_deref().filter(|s| !s.is_empty()) {
            query = query.filter(name_like(TitleColumn::Name, name));
        }
        if let Some(year) = filter.year {
            query = query.filter(TitleColumn::Year.eq(year));
        }

        let paginator = query
            .order_by_desc(TitleColumn::Year)
            .order_by_asc(TitleColumn::Id)
            .paginate(self.read_conn(), page.size);

        let total = paginator.num_items().await?;
        let titles = paginator.fetch_page(page.index()).await?;
        let items = title_views(self.read_conn(), titles).await?;

        debug!(total, returned = items.len(), "Titles listed");
        Ok(Listing { items, total })
    }

    pub async fn find_title(&self, id: i32) -> Result<Option<Title>> {
        TitleEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find title by ID or fail with not found
    pub async fn get_title(&self, id: i32) -> Result<Title> {
        self.find_title(id)
            .await?
            .ok_or_else(|| AppError::not_found("title", id))
    }

    /// Read representation of one title
    pub async fn title_view(&self, id: i32) -> Result<TitleView> {
        let title = self.get_title(id).await?;
        single_view(self.read_conn(), title).await
    }

    /// Insert a title and its genre links atomically
    pub async fn create_title(&self, new: NewTitle) -> Result<TitleView> {
        let txn = self.write_conn().begin().await?;

        let title = TitleActiveModel {
            name: Set(new.name),
            year: Set(new.year),
            description: Set(new.description),
            category_id: Set(new.category_id),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        insert_genre_links(&txn, title.id, &new.genre_ids).await?;
        txn.commit().await?;

        let view = single_view(self.write_conn(), title).await?;
        info!(title_id = view.id, name = %view.name, genres = ?view.genre_slugs(), "Title created");
        Ok(view)
    }

    /// Apply a partial update; a supplied genre list replaces every link
    pub async fn update_title(&self, id: i32, changes: TitleChanges) -> Result<TitleView> {
        let txn = self.write_conn().begin().await?;

        let title = TitleEntity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::not_found("title", id))?;

        let mut active: TitleActiveModel = title.clone().into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(year) = changes.year {
            active.year = Set(year);
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        if let Some(category_id) = changes.category_id {
            active.category_id = Set(Some(category_id));
        }

        let title = if active.is_changed() {
            active.update(&txn).await?
        } else {
            title
        };

        if let Some(genre_ids) = &changes.genre_ids {
            GenreTitleEntity::delete_many()
                .filter(GenreTitleColumn::TitleId.eq(id))
                .exec(&txn)
                .await?;
            insert_genre_links(&txn, id, genre_ids).await?;
        }

        txn.commit().await?;

        let view = single_view(self.write_conn(), title).await?;
        if changes.genre_ids.is_some() {
            info!(title_id = id, genres = ?view.genre_slugs(), "Title updated with new genres");
        } else {
            info!(title_id = id, "Title updated");
        }
        Ok(view)
    }

    /// Delete a title with its genre links, reviews and their comments
    pub async fn delete_title(&self, id: i32) -> Result<()> {
        let result = TitleEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::not_found("title", id));
        }

        info!(title_id = id, "Title deleted");
        Ok(())
    }

    /// Review score totals per title, for titles that have any reviews
    pub async fn score_totals(&self, title_ids: &[i32]) -> Result<HashMap<i32, ScoreTotals>> {
        score_totals(self.read_conn(), title_ids).await
    }
}

async fn insert_genre_links<C: ConnectionTrait>(
    conn: &C,
    title_id: i32,
    genre_ids: &[i32],
) -> Result<()> {
    if genre_ids.is_empty() {
        return Ok(());
    }

    let links = genre_ids.iter().map(|genre_id| GenreTitleActiveModel {
        genre_id: Set(*genre_id),
        title_id: Set(title_id),
        ..Default::default()
    });
    GenreTitleEntity::insert_many(links).exec(conn).await?;
    Ok(())
}

async fn score_totals<C: ConnectionTrait>(
    conn: &C,
    title_ids: &[i32],
) -> Result<HashMap<i32, ScoreTotals>> {
    if title_ids.is_empty() {
        return Ok(HashMap::new());
    }

    // Aggregated on every read; ratings are never stored
    let rows: Vec<(i32, i64, i64)> = ReviewEntity::find()
        .select_only()
        .column(ReviewColumn::TitleId)
        .column_as(Expr::col(ReviewColumn::Score).sum(), "score_sum")
        .column_as(Expr::col(ReviewColumn::Id).count(), "review_count")
        .filter(ReviewColumn::TitleId.is_in(title_ids.iter().copied()))
        .group_by(ReviewColumn::TitleId)
        .into_tuple()
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(title_id, sum, count)| (title_id, ScoreTotals { sum, count }))
        .collect())
}

async fn single_view<C: ConnectionTrait>(conn: &C, title: Title) -> Result<TitleView> {
    let id = title.id;
    title_views(conn, vec![title])
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("title", id))
}

/// Attach categories, genres and ratings to a batch of titles, keeping order
async fn title_views<C: ConnectionTrait>(conn: &C, titles: Vec<Title>) -> Result<Vec<TitleView>> {
    if titles.is_empty() {
        return Ok(Vec::new());
    }

    let title_ids: Vec<i32> = titles.iter().map(|t| t.id).collect();
    let category_ids: Vec<i32> = titles.iter().filter_map(|t| t.category_id).collect();

    let categories: HashMap<i32, Category> = if category_ids.is_empty() {
        HashMap::new()
    } else {
        CategoryEntity::find()
            .filter(CategoryColumn::Id.is_in(category_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect()
    };

    let links = GenreTitleEntity::find()
        .filter(GenreTitleColumn::TitleId.is_in(title_ids.iter().copied()))
        .order_by_asc(GenreTitleColumn::Id)
        .find_also_related(GenreEntity)
        .all(conn)
        .await?;

    let mut genres: HashMap<i32, Vec<Genre>> = HashMap::new();
    for (link, genre) in links {
        if let Some(genre) = genre {
            genres.entry(link.title_id).or_default().push(genre);
        }
    }

    let totals = score_totals(conn, &title_ids).await?;

    Ok(titles
        .into_iter()
        .map(|title| {
            let category = title.category_id.and_then(|id| categories.get(&id).cloned());
            let title_genres = genres.remove(&title.id).unwrap_or_default();
            let rating = rating_of(totals.get(&title.id));
            TitleView::new(title, category, title_genres, rating)
        })
        .collect())
}
