//! Authorization rules
//!
//! A decision depends on who is asking (anonymous or a user with a role),
//! whether the request reads or writes, and for owned content whether
//! the caller wrote it. Unauthenticated writes are 401, authenticated
//! callers lacking the capability get 403.

use crate::auth::Actor;
use crate::errors::{AppError, Result};

/// Whether a request only reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// Per-resource permission policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Anyone reads; admins write (categories, genres, titles)
    AdminOrReadOnly,
    /// Anyone reads; authenticated users create; only the author edits (reviews, comments)
    AuthorOrReadOnly,
    /// Admins only, reads included (user management)
    AdminOnly,
    /// Any authenticated identity (own profile)
    Authenticated,
}

impl Policy {
    /// Class-level check, before any object is loaded
    pub fn check(&self, actor: &Actor, access: Access) -> Result<()> {
        match (self, access) {
            (Policy::AdminOrReadOnly | Policy::AuthorOrReadOnly, Access::Read) => Ok(()),
            (Policy::AdminOrReadOnly, Access::Write) | (Policy::AdminOnly, _) => {
                let user = actor.require_user()?;
                if user.is_admin() {
                    Ok(())
                } else {
                    Err(AppError::Forbidden {
                        message: "administrator rights required".to_string(),
                    })
                }
            }
            (Policy::AuthorOrReadOnly, Access::Write) | (Policy::Authenticated, _) => {
                actor.require_user().map(|_| ())
            }
        }
    }

    /// Object-level check against the owner of an existing record
    pub fn check_object(&self, actor: &Actor, access: Access, author_id: i32) -> Result<()> {
        self.check(actor, access)?;

        match (self, access) {
            (Policy::AuthorOrReadOnly, Access::Write) => {
                let user = actor.require_user()?;
                if user.id == author_id {
                    Ok(())
                } else {
                    Err(AppError::Forbidden {
                        message: "only the author may change this".to_string(),
                    })
                }
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{Role, User};

    fn actor(id: i32, role: Role, is_superuser: bool) -> Actor {
        Actor::User(User {
            id,
            username: format!("user{}", id),
            email: format!("user{}@x.com", id),
            first_name: String::new(),
            last_name: String::new(),
            bio: String::new(),
            role,
            is_superuser,
            confirmation_code_hash: None,
            date_joined: chrono::Utc::now().into(),
        })
    }

    fn status(result: Result<()>) -> u16 {
        match result {
            Ok(()) => 200,
            Err(e) => e.status_code().as_u16(),
        }
    }

    #[test]
    fn test_catalog_is_public_read_admin_write() {
        let policy = Policy::AdminOrReadOnly;
        assert_eq!(status(policy.check(&Actor::Anonymous, Access::Read)), 200);
        assert_eq!(status(policy.check(&Actor::Anonymous, Access::Write)), 401);
        assert_eq!(status(policy.check(&actor(1, Role::User, false), Access::Write)), 403);
        assert_eq!(status(policy.check(&actor(1, Role::Moderator, false), Access::Write)), 403);
        assert_eq!(status(policy.check(&actor(1, Role::Admin, false), Access::Write)), 200);
        assert_eq!(status(policy.check(&actor(1, Role::User, true), Access::Write)), 200);
    }

    #[test]
    fn test_content_edits_need_strict_authorship() {
        let policy = Policy::AuthorOrReadOnly;
        let author = actor(7, Role::User, false);
        let moderator = actor(8, Role::Moderator, false);
        let admin = actor(9, Role::Admin, false);

        assert_eq!(status(policy.check(&author, Access::Write)), 200);
        assert_eq!(status(policy.check_object(&author, Access::Write, 7)), 200);
        assert_eq!(status(policy.check_object(&moderator, Access::Write, 7)), 403);
        assert_eq!(status(policy.check_object(&admin, Access::Write, 7)), 403);
        assert_eq!(status(policy.check_object(&Actor::Anonymous, Access::Write, 7)), 401);
        assert_eq!(status(policy.check_object(&Actor::Anonymous, Access::Read, 7)), 200);
    }

    #[test]
    fn test_user_management_is_admin_only() {
        let policy = Policy::AdminOnly;
        assert_eq!(status(policy.check(&Actor::Anonymous, Access::Read)), 401);
        assert_eq!(status(policy.check(&actor(1, Role::Moderator, false), Access::Read)), 403);
        assert_eq!(status(policy.check(&actor(1, Role::Admin, false), Access::Read)), 200);
    }

    #[test]
    fn test_own_profile_any_role() {
        let policy = Policy::Authenticated;
        assert_eq!(status(policy.check(&actor(1, Role::User, false), Access::Write)), 200);
        assert_eq!(status(policy.check(&Actor::Anonymous, Access::Read)), 401);
    }
}
