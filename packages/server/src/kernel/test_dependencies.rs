// TestDependencies - in-memory implementations for testing
//
// Provides a UserStore double and ready-wired ServerDeps for both auth modes,
// so resolver, gate and route tests run without Postgres.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AccountSettings, ServerDeps};
use crate::common::Role;
use crate::domains::auth::{RoleLookupFailurePolicy, SessionCookies, TokenDecoder};
use crate::domains::users::{
    normalize_email, ExternalIdentity, NewUser, User, UserStore, UserStoreError,
};

// =============================================================================
// In-memory user store
// =============================================================================

/// Users keyed by normalized email
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, User>>,
    unavailable: AtomicBool,
    reads: AtomicUsize,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
            reads: AtomicUsize::new(0),
        }
    }

    /// Make every call fail, as if the database were down
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of read calls served so far
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Seed a verified, password-less user with a role
    pub async fn insert_with_role(&self, email: &str, role: Role) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: normalize_email(email),
            name: None,
            role,
            email_verified: Some(now),
            password: None,
            external_id: None,
            created_at: now,
            updated_at: now,
        };
        self.users
            .write()
            .await
            .insert(user.email.clone(), user.clone());
        user
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            anyhow::bail!("user store unavailable");
        }
        Ok(())
    }

    async fn update_by_id<F>(&self, id: Uuid, apply: F) -> Result<Option<User>>
    where
        F: FnOnce(&mut User),
    {
        self.check_available()?;
        let mut users = self.users.write().await;
        let Some(user) = users.values_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        apply(user);
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.check_available()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.users.read().await.get(&normalize_email(email)).cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<User, UserStoreError> {
        self.check_available()?;
        let email = normalize_email(&new_user.email);
        let mut users = self.users.write().await;
        if users.contains_key(&email) {
            return Err(UserStoreError::DuplicateEmail(email));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.clone(),
            name: new_user.name,
            role: new_user.role,
            email_verified: new_user.email_verified,
            password: new_user.password_hash,
            external_id: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(email, user.clone());
        Ok(user)
    }

    async fn sync_external(&self, identity: ExternalIdentity) -> Result<User> {
        self.check_available()?;
        let email = normalize_email(&identity.email);
        let now = Utc::now();
        let mut users = self.users.write().await;

        // Same matching as the Postgres store: subject first, then email
        let previous = users
            .values()
            .find(|u| u.external_id.as_deref() == Some(identity.external_id.as_str()) && u.email != email)
            .map(|u| u.email.clone());
        if let Some(previous) = previous {
            if users.contains_key(&email) {
                if let Some(old) = users.get_mut(&previous) {
                    old.external_id = None;
                    old.updated_at = now;
                }
            } else if let Some(mut moved) = users.remove(&previous) {
                moved.email = email.clone();
                users.insert(email.clone(), moved);
            }
        }

        let user = users.entry(email.clone()).or_insert_with(|| User {
            id: Uuid::new_v4(),
            email,
            name: None,
            role: identity.initial_role,
            email_verified: Some(now),
            password: None,
            external_id: None,
            created_at: now,
            updated_at: now,
        });
        user.external_id = Some(identity.external_id);
        if identity.name.is_some() {
            user.name = identity.name;
        }
        user.email_verified.get_or_insert(now);
        user.updated_at = now;
        Ok(user.clone())
    }

    async fn list(&self) -> Result<Vec<User>> {
        self.check_available()?;
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<Option<User>> {
        self.update_by_id(id, |user| user.role = role).await
    }

    async fn mark_email_verified(&self, id: Uuid) -> Result<Option<User>> {
        self.update_by_id(id, |user| {
            user.email_verified.get_or_insert_with(Utc::now);
        })
        .await
    }

    async fn ping(&self) -> Result<()> {
        self.check_available()
    }
}

// =============================================================================
// Ready-wired ServerDeps
// =============================================================================

/// Secret used by [`local_deps`] for session cookies
pub const TEST_SESSION_SECRET: &str = "test_session_secret";

/// Local-session deps over `users`
pub fn local_deps(users: Arc<InMemoryUserStore>, accounts: AccountSettings) -> ServerDeps {
    let cookies = SessionCookies::new(TEST_SESSION_SECRET, chrono::Duration::hours(1), false);
    ServerDeps::local(users, Arc::new(cookies), accounts)
}

/// Hosted-identity deps over `users`, verifying HS256 tokens signed with `secret`
pub fn hosted_deps(
    users: Arc<InMemoryUserStore>,
    secret: &str,
    on_lookup_failure: RoleLookupFailurePolicy,
    accounts: AccountSettings,
) -> ServerDeps {
    ServerDeps::hosted(
        users,
        Arc::new(TokenDecoder::with_shared_secret(secret)),
        on_lookup_failure,
        accounts,
    )
}
