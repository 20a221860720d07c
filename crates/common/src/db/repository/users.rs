use super::{contains_pattern, Repository};
use crate::db::models::*;
use crate::errors::{AppError, Result};
use crate::pagination::{Listing, PageRequest};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use tracing::info;

/// Fields of a user about to be created
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub role: Role,
    pub is_superuser: bool,
}

impl NewUser {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            ..Default::default()
        }
    }
}

/// Partial user update; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: Option<Role>,
}

impl Repository {
    // ========================================================================
    // User Operations
    // ========================================================================

    /// Find user by ID
    pub async fn find_user_by_id(&self, id: i32) -> Result<Option<User>> {
        UserEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        UserEntity::find()
            .filter(UserColumn::Username.eq(username))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        UserEntity::find()
            .filter(UserColumn::Email.eq(email))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find user by username or fail with not found
    pub async fn get_user(&self, username: &str) -> Result<User> {
        self.find_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found("user", username))
    }

    /// List users ordered by username, optionally filtered by a username substring
    pub async fn list_users(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<Listing<User>> {
        let mut query = UserEntity::find();
        if let Some(term) = search.filter(|s| !s.is_empty()) {
            query = query.filter(Expr::col(UserColumn::Username).like(contains_pattern(term)));
        }

        let paginator = query
            .order_by_asc(UserColumn::Username)
            .paginate(self.read_conn(), page.size);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.index()).await?;

        Ok(Listing { items, total })
    }

    /// Create a user, rejecting a taken username or email
    pub async fn create_user(&self, new: NewUser) -> Result<User> {
        self.ensure_username_free(&new.username, None).await?;
        self.ensure_email_free(&new.email, None).await?;

        let user = UserActiveModel {
            username: Set(new.username),
            email: Set(new.email),
            first_name: Set(new.first_name),
            last_name: Set(new.last_name),
            bio: Set(new.bio),
            role: Set(new.role),
            is_superuser: Set(new.is_superuser),
            confirmation_code_hash: Set(None),
            date_joined: Set(chrono::Utc::now().into()),
            ..Default::default()
        }
        .insert(self.write_conn())
        .await?;

        info!(user_id = user.id, username = %user.username, role = user.role.as_str(), "User created");
        Ok(user)
    }

    /// Apply a partial update
    pub async fn update_user(&self, user: User, changes: UserChanges) -> Result<User> {
        let id = user.id;
        let mut active: UserActiveModel = user.into();

        if let Some(username) = changes.username {
            self.ensure_username_free(&username, Some(id)).await?;
            active.username = Set(username);
        }
        if let Some(email) = changes.email {
            self.ensure_email_free(&email, Some(id)).await?;
            active.email = Set(email);
        }
        if let Some(first_name) = changes.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = changes.last_name {
            active.last_name = Set(last_name);
        }
        if let Some(bio) = changes.bio {
            active.bio = Set(bio);
        }
        if let Some(role) = changes.role {
            active.role = Set(role);
        }

        if !active.is_changed() {
            return self
                .find_user_by_id(id)
                .await?
                .ok_or_else(|| AppError::not_found("user", id));
        }

        let user = active.update(self.write_conn()).await?;
        info!(user_id = user.id, "User updated");
        Ok(user)
    }

    /// Store the digest of a newly issued confirmation code, or clear it
    pub async fn set_confirmation_code_hash(&self, user: User, hash: Option<String>) -> Result<User> {
        let mut active: UserActiveModel = user.into();
        active.confirmation_code_hash = Set(hash);
        active.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Clear the user's confirmation code if its digest is still `hash`.
    ///
    /// Check and clear happen in one conditional update, so of two
    /// concurrent exchanges of the same code only one sees `true`.
    pub async fn consume_confirmation_code(&self, user_id: i32, hash: &str) -> Result<bool> {
        let result = UserEntity::update_many()
            .col_expr(UserColumn::ConfirmationCodeHash, Expr::value(Option::<String>::None))
            .filter(UserColumn::Id.eq(user_id))
            .filter(UserColumn::ConfirmationCodeHash.eq(hash))
            .exec(self.write_conn())
            .await?;
        Ok(result.rows_affected == 1)
    }

    /// Delete a user together with their reviews and comments
    pub async fn delete_user(&self, username: &str) -> Result<()> {
        let user = self.get_user(username).await?;
        UserEntity::delete_by_id(user.id)
            .exec(self.write_conn())
            .await?;

        info!(user_id = user.id, username = %user.username, "User deleted");
        Ok(())
    }

    async fn ensure_username_free(&self, username: &str, except: Option<i32>) -> Result<()> {
        match self.find_user_by_username(username).await? {
            Some(existing) if Some(existing.id) != except => Err(AppError::conflict(
                "username",
                format!("a user with username `{}` already exists", username),
            )),
            _ => Ok(()),
        }
    }

    async fn ensure_email_free(&self, email: &str, except: Option<i32>) -> Result<()> {
        match self.find_user_by_email(email).await? {
            Some(existing) if Some(existing.id) != except => Err(AppError::conflict(
                "email",
                format!("a user with email `{}` already exists", email),
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures;
    use crate::pagination::PageParams;

    #[tokio::test]
    async fn test_duplicate_username_and_email_conflict() {
        let repo = fixtures::repo().await;
        fixtures::user(&repo, "bob", Role::User).await;

        let err = repo.create_user(NewUser::new("bob", "other@x.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { ref field, .. } if field == "username"));

        let err = repo.create_user(NewUser::new("robert", "bob@yamdb.test")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { ref field, .. } if field == "email"));
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let repo = fixtures::repo().await;
        let user = fixtures::user(&repo, "alice", Role::User).await;

        let changes = UserChanges {
            bio: Some("Film buff".into()),
            role: Some(Role::Moderator),
            ..Default::default()
        };
        let updated = repo.update_user(user, changes).await.unwrap();

        assert_eq!(updated.bio, "Film buff");
        assert_eq!(updated.role, Role::Moderator);
        assert_eq!(updated.email, "alice@yamdb.test");
    }

    #[tokio::test]
    async fn test_rename_to_taken_username_conflicts() {
        let repo = fixtures::repo().await;
        fixtures::user(&repo, "alice", Role::User).await;
        let bob = fixtures::user(&repo, "bob", Role::User).await;

        let changes = UserChanges {
            username: Some("alice".into()),
            ..Default::default()
        };
        assert!(matches!(
            repo.update_user(bob, changes).await,
            Err(AppError::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_users_search_and_order() {
        let repo = fixtures::repo().await;
        for name in ["carol", "alice", "bob", "alicia"] {
            fixtures::user(&repo, name, Role::User).await;
        }

        let page = PageRequest::new(PageParams::default(), 10).unwrap();
        let all = repo.list_users(None, page).await.unwrap();
        let names: Vec<_> = all.items.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["alice", "alicia", "bob", "carol"]);

        let found = repo.list_users(Some("ali"), page).await.unwrap();
        assert_eq!(found.total, 2);
    }

    #[tokio::test]
    async fn test_list_users_search_treats_wildcards_literally() {
        let repo = fixtures::repo().await;
        for name in ["a_b", "axb", "100%real"] {
            fixtures::user(&repo, name, Role::User).await;
        }

        let page = PageRequest::new(PageParams::default(), 10).unwrap();
        let found = repo.list_users(Some("_"), page).await.unwrap();
        let names: Vec<_> = found.items.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["a_b"]);

        let found = repo.list_users(Some("%"), page).await.unwrap();
        assert_eq!(found.total, 1);
        assert_eq!(found.items[0].username, "100%real");
    }

    #[tokio::test]
    async fn test_confirmation_code_is_consumed_once() {
        let repo = fixtures::repo().await;
        let user = fixtures::user(&repo, "bob", Role::User).await;
        let user = repo
            .set_confirmation_code_hash(user, Some("digest".into()))
            .await
            .unwrap();

        assert!(!repo.consume_confirmation_code(user.id, "other").await.unwrap());
        assert!(repo.consume_confirmation_code(user.id, "digest").await.unwrap());
        assert!(!repo.consume_confirmation_code(user.id, "digest").await.unwrap());

        let reread = repo.find_user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(reread.confirmation_code_hash, None);
    }

    #[tokio::test]
    async fn test_delete_missing_user_is_not_found() {
        let repo = fixtures::repo().await;
        assert!(matches!(
            repo.delete_user("ghost").await,
            Err(AppError::NotFound { .. })
        ));
    }
}
