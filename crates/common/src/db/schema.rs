//! Schema bootstrap
//!
//! Tables are derived from the entity definitions, so column types,
//! unique columns and foreign-key delete rules live in one place.

use crate::db::models::*;
use crate::errors::Result;
use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectionTrait, EntityTrait, Schema};
use tracing::{debug, info};

/// Create every table and index that does not exist yet
pub async fn create_schema<C: ConnectionTrait>(conn: &C) -> Result<()> {
    let backend = conn.get_database_backend();
    let schema = Schema::new(backend);

    // Parents before children so foreign keys resolve
    create_table(conn, &schema, UserEntity).await?;
    create_table(conn, &schema, CategoryEntity).await?;
    create_table(conn, &schema, GenreEntity).await?;
    create_table(conn, &schema, TitleEntity).await?;
    create_table(conn, &schema, GenreTitleEntity).await?;
    create_table(conn, &schema, ReviewEntity).await?;
    create_table(conn, &schema, CommentEntity).await?;

    for index in indexes() {
        conn.execute(backend.build(&index)).await?;
    }

    info!("Database schema ready");
    Ok(())
}

async fn create_table<C, E>(conn: &C, schema: &Schema, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let backend = conn.get_database_backend();
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    conn.execute(backend.build(&stmt)).await?;
    debug!(table = entity.table_name(), "Table ensured");
    Ok(())
}

fn indexes() -> Vec<IndexCreateStatement> {
    vec![
        // One review per (author, title); concurrent duplicates lose on this index
        Index::create()
            .name("uq_reviews_author_title")
            .table(ReviewEntity)
            .col(ReviewColumn::AuthorId)
            .col(ReviewColumn::TitleId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("uq_genre_titles_genre_title")
            .table(GenreTitleEntity)
            .col(GenreTitleColumn::GenreId)
            .col(GenreTitleColumn::TitleId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_reviews_title")
            .table(ReviewEntity)
            .col(ReviewColumn::TitleId)
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_comments_review")
            .table(CommentEntity)
            .col(CommentColumn::ReviewId)
            .if_not_exists()
            .to_owned(),
    ]
}

#[cfg(test)]
mod tests {
    use crate::db::test_pool;
    use crate::db::schema::create_schema;

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let pool = test_pool().await;
        // Second run must not fail on existing tables or indexes
        tokio_test::assert_ok!(create_schema(pool.write()).await);
    }
}
