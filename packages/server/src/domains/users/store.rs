// UserStore - the users table behind a trait, so session resolution and the
// auth flows can run against Postgres in production and an in-memory double
// in tests.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use super::models::{ExternalIdentity, NewUser, User};
use crate::common::Role;

#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error("A user with email {0} already exists")]
    DuplicateEmail(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Role of the user with this email. Issues a single read.
    async fn find_role_by_email(&self, email: &str) -> Result<Option<Role>> {
        Ok(self.find_by_email(email).await?.map(|user| user.role))
    }

    async fn create(&self, new_user: NewUser) -> Result<User, UserStoreError>;

    async fn sync_external(&self, identity: ExternalIdentity) -> Result<User>;

    async fn list(&self) -> Result<Vec<User>>;

    async fn set_role(&self, id: Uuid, role: Role) -> Result<Option<User>>;

    async fn mark_email_verified(&self, id: Uuid) -> Result<Option<User>>;

    /// Cheap connectivity check for health reporting
    async fn ping(&self) -> Result<()>;
}

/// Postgres-backed store
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        User::find_by_email(email, &self.pool).await
    }

    async fn find_role_by_email(&self, email: &str) -> Result<Option<Role>> {
        User::find_role_by_email(email, &self.pool).await
    }

    async fn create(&self, new_user: NewUser) -> Result<User, UserStoreError> {
        let email = new_user.email.clone();
        User::create(new_user, &self.pool).await.map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                UserStoreError::DuplicateEmail(email)
            }
            other => UserStoreError::Other(other.into()),
        })
    }

    async fn sync_external(&self, identity: ExternalIdentity) -> Result<User> {
        User::upsert_external(identity, &self.pool).await
    }

    async fn list(&self) -> Result<Vec<User>> {
        User::list(&self.pool).await
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<Option<User>> {
        User::set_role(id, role, &self.pool).await
    }

    async fn mark_email_verified(&self, id: Uuid) -> Result<Option<User>> {
        User::mark_email_verified(id, &self.pool).await
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
