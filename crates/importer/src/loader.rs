//! CSV data set loader
//!
//! Each file maps onto one table and keeps its ids, so foreign keys in
//! later files resolve against rows from earlier ones. The whole data set
//! is loaded in one transaction; any bad row leaves the database as it was.

use crate::errors::ImportError;
use chrono::Utc;
use sea_orm::{
    prelude::DateTimeWithTimeZone, ActiveModelTrait, ConnectionTrait, DatabaseBackend,
    DatabaseConnection, DatabaseTransaction, EntityName, EntityTrait, IntoActiveModel, Set, TransactionTrait,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, warn};
use yamdb_common::{
    catalog::{check_slug, check_year, current_year},
    db::models::*,
    users::check_username,
};

pub type Result<T> = std::result::Result<T, ImportError>;

const BATCH_SIZE: usize = 100;

pub const CATEGORY_FILE: &str = "category.csv";
pub const GENRE_FILE: &str = "genre.csv";
pub const USERS_FILE: &str = "users.csv";
pub const TITLES_FILE: &str = "titles.csv";
pub const GENRE_TITLE_FILE: &str = "genre_title.csv";
pub const REVIEW_FILE: &str = "review.csv";
pub const COMMENTS_FILE: &str = "comments.csv";

#[derive(Debug, Deserialize)]
struct SlugRow {
    id: i32,
    name: String,
    slug: String,
}

#[derive(Debug, Deserialize)]
struct UserRow {
    id: i32,
    username: String,
    email: String,
    role: Option<Role>,
    #[serde(default)]
    bio: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
}

#[derive(Debug, Deserialize)]
struct TitleRow {
    id: i32,
    name: String,
    year: i32,
    category: Option<i32>,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct GenreTitleRow {
    id: i32,
    title_id: i32,
    genre_id: i32,
}

#[derive(Debug, Deserialize)]
struct ReviewRow {
    id: i32,
    title_id: i32,
    text: String,
    author: i32,
    score: i32,
    pub_date: DateTimeWithTimeZone,
}

#[derive(Debug, Deserialize)]
struct CommentRow {
    id: i32,
    review_id: i32,
    text: String,
    author: i32,
    pub_date: DateTimeWithTimeZone,
}

/// Rows loaded per file; `None` marks a file that was not present
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub files: Vec<(&'static str, Option<usize>)>,
}

impl ImportReport {
    pub fn rows(&self, file: &str) -> Option<usize> {
        self.files
            .iter()
            .find(|(name, _)| *name == file)
            .and_then(|(_, rows)| *rows)
    }

    pub fn total(&self) -> usize {
        self.files.iter().filter_map(|(_, rows)| *rows).sum()
    }

    fn push(&mut self, file: &'static str, rows: Option<usize>) {
        self.files.push((file, rows));
    }
}

fn invalid(file: &'static str, record: u64, message: impl Into<String>) -> ImportError {
    ImportError::InvalidRow {
        file,
        record,
        message: message.into(),
    }
}

/// Load every known file found in `dir`, parents before children
pub async fn load_dir(db: &DatabaseConnection, dir: &Path) -> Result<ImportReport> {
    tokio::fs::metadata(dir)
        .await
        .map_err(|source| ImportError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

    let txn = db.begin().await?;
    match load_all(&txn, dir).await {
        Ok(report) => {
            txn.commit().await?;
            info!(dir = %dir.display(), rows = report.total(), "Data set imported");
            Ok(report)
        }
        Err(e) => {
            txn.rollback().await?;
            Err(e)
        }
    }
}

async fn load_all(txn: &DatabaseTransaction, dir: &Path) -> Result<ImportReport> {
    let mut report = ImportReport::default();
    let now: DateTimeWithTimeZone = Utc::now().into();
    let this_year = current_year();

    let rows = load_file(txn, dir, CATEGORY_FILE, |row: SlugRow, record| {
        check_slug(&row.slug).map_err(|m| invalid(CATEGORY_FILE, record, m))?;
        Ok(CategoryActiveModel {
            id: Set(row.id),
            name: Set(row.name),
            slug: Set(row.slug),
        })
    })
    .await?;
    report.push(CATEGORY_FILE, rows);

    let rows = load_file(txn, dir, GENRE_FILE, |row: SlugRow, record| {
        check_slug(&row.slug).map_err(|m| invalid(GENRE_FILE, record, m))?;
        Ok(GenreActiveModel {
            id: Set(row.id),
            name: Set(row.name),
            slug: Set(row.slug),
        })
    })
    .await?;
    report.push(GENRE_FILE, rows);

    let rows = load_file(txn, dir, USERS_FILE, |row: UserRow, record| {
        check_username(&row.username).map_err(|m| invalid(USERS_FILE, record, m))?;
        Ok(UserActiveModel {
            id: Set(row.id),
            username: Set(row.username),
            email: Set(row.email),
            first_name: Set(row.first_name),
            last_name: Set(row.last_name),
            bio: Set(row.bio),
            role: Set(row.role.unwrap_or_default()),
            is_superuser: Set(false),
            confirmation_code_hash: Set(None),
            date_joined: Set(now),
        })
    })
    .await?;
    report.push(USERS_FILE, rows);

    let rows = load_file(txn, dir, TITLES_FILE, |row: TitleRow, record| {
        check_year(row.year, this_year).map_err(|m| invalid(TITLES_FILE, record, m))?;
        Ok(TitleActiveModel {
            id: Set(row.id),
            name: Set(row.name),
            year: Set(row.year),
            description: Set(row.description),
            category_id: Set(row.category),
        })
    })
    .await?;
    report.push(TITLES_FILE, rows);

    let rows = load_file(txn, dir, GENRE_TITLE_FILE, |row: GenreTitleRow, _| {
        Ok(GenreTitleActiveModel {
            id: Set(row.id),
            genre_id: Set(row.genre_id),
            title_id: Set(row.title_id),
        })
    })
    .await?;
    report.push(GENRE_TITLE_FILE, rows);

    let rows = load_file(txn, dir, REVIEW_FILE, |row: ReviewRow, record| {
        if !(MIN_SCORE..=MAX_SCORE).contains(&row.score) {
            return Err(invalid(
                REVIEW_FILE,
                record,
                format!("score {} is outside {}..={}", row.score, MIN_SCORE, MAX_SCORE),
            ));
        }
        Ok(ReviewActiveModel {
            id: Set(row.id),
            text: Set(row.text),
            author_id: Set(row.author),
            score: Set(row.score),
            title_id: Set(row.title_id),
            pub_date: Set(row.pub_date),
        })
    })
    .await?;
    report.push(REVIEW_FILE, rows);

    let rows = load_file(txn, dir, COMMENTS_FILE, |row: CommentRow, _| {
        Ok(CommentActiveModel {
            id: Set(row.id),
            text: Set(row.text),
            author_id: Set(row.author),
            review_id: Set(row.review_id),
            pub_date: Set(row.pub_date),
        })
    })
    .await?;
    report.push(COMMENTS_FILE, rows);

    if txn.get_database_backend() == DatabaseBackend::Postgres {
        advance_sequences(txn).await?;
    }

    Ok(report)
}

/// Parse one file and insert its rows in batches; a missing file is skipped
async fn load_file<C, R, A, F>(
    conn: &C,
    dir: &Path,
    file: &'static str,
    mut convert: F,
) -> Result<Option<usize>>
where
    C: ConnectionTrait,
    R: DeserializeOwned,
    A: ActiveModelTrait,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
    F: FnMut(R, u64) -> Result<A>,
{
    let path = dir.join(file);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(file, "File not found, skipping");
            return Ok(None);
        }
        Err(source) => return Err(ImportError::Io { path, source }),
    };

    let mut reader = csv::Reader::from_reader(bytes.as_slice());
    let mut batch = Vec::with_capacity(BATCH_SIZE);
    let mut total = 0;

    for (index, row) in reader.deserialize::<R>().enumerate() {
        let row = row.map_err(|source| ImportError::Csv { file, source })?;
        batch.push(convert(row, index as u64 + 1)?);

        if batch.len() == BATCH_SIZE {
            total += insert_batch(conn, std::mem::take(&mut batch)).await?;
        }
    }
    if !batch.is_empty() {
        total += insert_batch(conn, batch).await?;
    }

    info!(file, rows = total, "File loaded");
    Ok(Some(total))
}

async fn insert_batch<C, A>(conn: &C, batch: Vec<A>) -> Result<usize>
where
    C: ConnectionTrait,
    A: ActiveModelTrait,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
{
    let rows = batch.len();
    <A::Entity as EntityTrait>::insert_many(batch)
        .exec_without_returning(conn)
        .await?;
    Ok(rows)
}

/// Explicit ids bypass Postgres sequences; move each one past the highest id
async fn advance_sequences<C: ConnectionTrait>(conn: &C) -> Result<()> {
    let tables = [
        UserEntity.table_name().to_owned(),
        CategoryEntity.table_name().to_owned(),
        GenreEntity.table_name().to_owned(),
        TitleEntity.table_name().to_owned(),
        GenreTitleEntity.table_name().to_owned(),
        ReviewEntity.table_name().to_owned(),
        CommentEntity.table_name().to_owned(),
    ];

    for table in tables {
        let sql = format!(
            "SELECT setval(pg_get_serial_sequence('{table}', 'id'), \
             COALESCE((SELECT MAX(id) FROM \"{table}\"), 0) + 1, false)"
        );
        conn.execute_unprepared(&sql).await?;
        debug!(table = %table, "Sequence advanced");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use yamdb_common::{
        config::DatabaseConfig,
        db::{DbPool, Repository, TitleFilter},
        pagination::PageRequest,
    };

    const FIRST_PAGE: PageRequest = PageRequest { page: 1, size: 50 };

    fn write(dir: &TempDir, file: &str, contents: &str) {
        std::fs::write(dir.path().join(file), contents).unwrap();
    }

    fn data_set() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, CATEGORY_FILE, "id,name,slug\n1,Movie,movie\n2,Book,book\n");
        write(&dir, GENRE_FILE, "id,name,slug\n1,Drama,drama\n2,Comedy,comedy\n");
        write(
            &dir,
            USERS_FILE,
            "id,username,email,role,bio,first_name,last_name\n\
             100,bingobongo,bingo@yamdb.fake,user,,,\n\
             101,capt_obvious,capt@yamdb.fake,admin,\"Tells it, plainly\",Obi,\n\
             102,faust,faust@yamdb.fake,moderator,,,\n",
        );
        write(
            &dir,
            TITLES_FILE,
            "id,name,year,category\n1,Shawshank,1994,1\n2,Faust,1808,2\n3,Untitled,2001,\n",
        );
        write(&dir, GENRE_TITLE_FILE, "id,title_id,genre_id\n1,1,1\n2,2,1\n3,2,2\n");
        write(
            &dir,
            REVIEW_FILE,
            "id,title_id,text,author,score,pub_date\n\
             1,1,Great,100,10,2019-09-24T21:08:21.567Z\n\
             2,1,Fine,101,6,2019-09-25T10:00:00Z\n",
        );
        write(
            &dir,
            COMMENTS_FILE,
            "id,review_id,text,author,pub_date\n1,1,Agreed,102,2019-09-26T10:00:00Z\n",
        );
        dir
    }

    async fn pool() -> DbPool {
        DbPool::bootstrap(&DatabaseConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_full_data_set_loads_with_ids() {
        let pool = pool().await;
        let dir = data_set();

        let report = load_dir(pool.write(), dir.path()).await.unwrap();
        assert_eq!(report.rows(USERS_FILE), Some(3));
        assert_eq!(report.rows(TITLES_FILE), Some(3));
        assert_eq!(report.total(), 17);

        let repo = Repository::new(pool);
        let title = repo.title_view(1).await.unwrap();
        assert_eq!(title.category.as_ref().unwrap().slug, "movie");
        assert_eq!(title.genre_slugs(), vec!["drama"]);
        assert_eq!(title.rating, Some(8));

        let faust = repo.title_view(2).await.unwrap();
        assert_eq!(faust.genre_slugs(), vec!["drama", "comedy"]);
        assert!(repo.title_view(3).await.unwrap().category.is_none());

        let admin = repo.get_user("capt_obvious").await.unwrap();
        assert_eq!(admin.id, 101);
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(admin.bio, "Tells it, plainly");

        let comments = repo.list_comments(1, FIRST_PAGE).await.unwrap();
        assert_eq!(comments.items[0].author, "faust");
    }

    #[tokio::test]
    async fn test_missing_files_are_skipped() {
        let pool = pool().await;
        let dir = tempfile::tempdir().unwrap();
        write(&dir, GENRE_FILE, "id,name,slug\n7,Horror,horror\n");

        let report = load_dir(pool.write(), dir.path()).await.unwrap();
        assert_eq!(report.rows(GENRE_FILE), Some(1));
        assert_eq!(report.rows(TITLES_FILE), None);
        assert_eq!(report.files.len(), 7);

        let repo = Repository::new(pool);
        assert_eq!(repo.find_genre_by_slug("horror").await.unwrap().unwrap().id, 7);
    }

    #[tokio::test]
    async fn test_bad_row_rolls_back_everything() {
        let pool = pool().await;
        let dir = data_set();
        write(
            &dir,
            REVIEW_FILE,
            "id,title_id,text,author,score,pub_date\n1,1,Too much,100,11,2019-09-24T21:08:21Z\n",
        );

        let err = load_dir(pool.write(), dir.path()).await.unwrap_err();
        assert!(matches!(
            err,
            ImportError::InvalidRow { file: REVIEW_FILE, record: 1, .. }
        ));

        let repo = Repository::new(pool);
        let titles = repo.list_titles(&TitleFilter::default(), FIRST_PAGE).await.unwrap();
        assert_eq!(titles.total, 0);
        assert!(repo.find_category_by_slug("movie").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unparseable_row_names_the_file() {
        let pool = pool().await;
        let dir = tempfile::tempdir().unwrap();
        write(&dir, TITLES_FILE, "id,name,year,category\nx,Broken,1999,\n");

        let err = load_dir(pool.write(), dir.path()).await.unwrap_err();
        assert!(matches!(err, ImportError::Csv { file: TITLES_FILE, .. }));
    }

    #[tokio::test]
    async fn test_missing_directory_is_an_io_error() {
        let pool = pool().await;
        let err = load_dir(pool.write(), Path::new("/nonexistent/yamdb-data"))
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::Io { .. }));
    }

    #[tokio::test]
    async fn test_new_rows_continue_after_imported_ids() {
        let pool = pool().await;
        let dir = data_set();
        load_dir(pool.write(), dir.path()).await.unwrap();

        let repo = Repository::new(pool);
        let user = repo
            .create_user(yamdb_common::db::NewUser::new("newcomer", "new@yamdb.fake"))
            .await
            .unwrap();
        assert!(user.id > 102);
    }
}
