//! Sync action - record a hosted-identity user in the local users table

use tracing::info;

use crate::common::Role;
use crate::domains::auth::errors::AuthError;
use crate::domains::auth::token::Claims;
use crate::domains::users::{normalize_email, ExternalIdentity, User};
use crate::kernel::ServerDeps;

/// Create or refresh the `users` row for verified hosted-identity claims.
///
/// The first sync creates the row (SUPER_ADMIN for `admin_emails`, USER
/// otherwise). Later syncs refresh the provider id and name but never the role.
pub async fn sync_external_user(claims: &Claims, deps: &ServerDeps) -> Result<User, AuthError> {
    if !deps.provider().is_external_identity_mode() {
        return Err(AuthError::WrongProvider("local"));
    }

    let email = claims
        .email
        .as_deref()
        .map(normalize_email)
        .filter(|e| !e.is_empty())
        .ok_or(AuthError::MissingEmailClaim)?;

    let initial_role = if deps.accounts.is_admin_email(&email) {
        Role::SuperAdmin
    } else {
        Role::User
    };

    let user = deps
        .users
        .sync_external(ExternalIdentity {
            external_id: claims.sub.clone(),
            email,
            name: claims.name.clone(),
            initial_role,
        })
        .await?;

    info!(user_id = %user.id, external_id = %claims.sub, "Synced hosted identity user");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::auth::RoleLookupFailurePolicy;
    use crate::kernel::test_dependencies::{hosted_deps, local_deps, InMemoryUserStore};
    use crate::kernel::AccountSettings;
    use crate::domains::users::UserStore;
    use std::sync::Arc;

    fn claims(email: Option<&str>, name: Option<&str>) -> Claims {
        Claims {
            sub: "idp|42".into(),
            email: email.map(str::to_string),
            name: name.map(str::to_string),
            exp: 1999999999,
        }
    }

    fn deps(users: Arc<InMemoryUserStore>) -> ServerDeps {
        hosted_deps(
            users,
            "secret",
            RoleLookupFailurePolicy::Deny,
            AccountSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_first_sync_creates_verified_user() {
        let users = Arc::new(InMemoryUserStore::new());
        let user = sync_external_user(&claims(Some("Budi@B.com"), None), &deps(users))
            .await
            .unwrap();

        assert_eq!(user.email, "budi@b.com");
        assert_eq!(user.role, Role::User);
        assert_eq!(user.external_id.as_deref(), Some("idp|42"));
        assert!(user.email_verified.is_some());
        assert!(user.password.is_none());
    }

    #[tokio::test]
    async fn test_resync_keeps_role() {
        let users = Arc::new(InMemoryUserStore::new());
        users.insert_with_role("budi@b.com", Role::Admin).await;

        let user = sync_external_user(&claims(Some("budi@b.com"), Some("Budi")), &deps(users.clone()))
            .await
            .unwrap();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.name.as_deref(), Some("Budi"));
        assert_eq!(users.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_changed_email_keeps_row_and_role() {
        let users = Arc::new(InMemoryUserStore::new());
        let deps = deps(users.clone());
        let first = sync_external_user(&claims(Some("lama@b.com"), None), &deps)
            .await
            .unwrap();
        users.set_role(first.id, Role::Admin).await.unwrap();

        let moved = sync_external_user(&claims(Some("baru@b.com"), None), &deps)
            .await
            .unwrap();

        assert_eq!(moved.id, first.id);
        assert_eq!(moved.email, "baru@b.com");
        assert_eq!(moved.role, Role::Admin);
        assert!(users.find_by_email("lama@b.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_changed_email_onto_existing_row_moves_subject() {
        let users = Arc::new(InMemoryUserStore::new());
        let deps = deps(users.clone());
        let first = sync_external_user(&claims(Some("lama@b.com"), None), &deps)
            .await
            .unwrap();
        users.insert_with_role("baru@b.com", Role::User).await;

        let moved = sync_external_user(&claims(Some("baru@b.com"), None), &deps)
            .await
            .unwrap();

        assert_ne!(moved.id, first.id);
        assert_eq!(moved.external_id.as_deref(), Some("idp|42"));
        let old = users.find_by_email("lama@b.com").await.unwrap().unwrap();
        assert!(old.external_id.is_none());
    }

    #[tokio::test]
    async fn test_sync_requires_email() {
        let users = Arc::new(InMemoryUserStore::new());
        assert!(matches!(
            sync_external_user(&claims(None, None), &deps(users)).await,
            Err(AuthError::MissingEmailClaim)
        ));
    }

    #[tokio::test]
    async fn test_sync_unavailable_in_local_mode() {
        let deps = local_deps(Arc::new(InMemoryUserStore::new()), AccountSettings::default());
        assert!(matches!(
            sync_external_user(&claims(Some("a@b.com"), None), &deps).await,
            Err(AuthError::WrongProvider(_))
        ));
    }
}
