use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::common::Role;

/// User - an account that can sign in to LembarKerja
///
/// Emails are stored lower-cased; lookups lower-case their input too.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    /// NULL until the address is verified; unverified users cannot log in with a password
    pub email_verified: Option<DateTime<Utc>>,
    /// Argon2 PHC hash. NULL when the identity is managed by the hosted provider.
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Subject id at the hosted identity provider
    pub external_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for a credentials registration
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub role: Role,
    pub email_verified: Option<DateTime<Utc>>,
}

/// Identity attributes asserted by the hosted provider
#[derive(Debug, Clone)]
pub struct ExternalIdentity {
    pub external_id: String,
    pub email: String,
    pub name: Option<String>,
    /// Role given to a newly created row; an existing row keeps its role
    pub initial_role: Role,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl User {
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.email.split('@').next().unwrap_or(&self.email).to_string())
    }

    pub async fn find_by_email(email: &str, pool: &PgPool) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(normalize_email(email))
            .fetch_optional(pool)
            .await?;
        Ok(user)
    }

    /// Role column only, for session resolution
    pub async fn find_role_by_email(email: &str, pool: &PgPool) -> Result<Option<Role>> {
        let role = sqlx::query_scalar::<_, String>("SELECT role FROM users WHERE email = $1")
            .bind(normalize_email(email))
            .fetch_optional(pool)
            .await?;

        role.map(|r| r.parse::<Role>().map_err(Into::into))
            .transpose()
    }

    /// Insert a new user. Fails with a database unique violation on a duplicate email.
    pub async fn create(new_user: NewUser, pool: &PgPool) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, name, role, email_verified, password)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(normalize_email(&new_user.email))
        .bind(new_user.name)
        .bind(new_user.role.as_str())
        .bind(new_user.email_verified)
        .bind(new_user.password_hash)
        .fetch_one(pool)
        .await
    }

    /// Insert or refresh a user seen through the hosted provider.
    ///
    /// The row is matched by provider subject first, so a subject whose email
    /// changed keeps its row, id and role. If the new email already belongs to
    /// another row, the subject moves to that row instead. Otherwise the row
    /// is matched by email. An existing row keeps its role and password; the
    /// provider has already verified the address so `email_verified` is filled
    /// in if it was NULL.
    pub async fn upsert_external(identity: ExternalIdentity, pool: &PgPool) -> Result<Self> {
        let email = normalize_email(&identity.email);
        let mut tx = pool.begin().await?;

        // Release the subject from its old row when the new email is taken
        sqlx::query(
            r#"
            UPDATE users SET external_id = NULL, updated_at = NOW()
            WHERE external_id = $1
              AND email <> $2
              AND EXISTS (SELECT 1 FROM users WHERE email = $2)
            "#,
        )
        .bind(&identity.external_id)
        .bind(&email)
        .execute(&mut *tx)
        .await?;

        let followed = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                email = $2,
                name = COALESCE($3, name),
                email_verified = COALESCE(email_verified, NOW()),
                updated_at = NOW()
            WHERE external_id = $1
            RETURNING *
            "#,
        )
        .bind(&identity.external_id)
        .bind(&email)
        .bind(&identity.name)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(user) = followed {
            tx.commit().await?;
            return Ok(user);
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, name, role, email_verified, external_id)
            VALUES ($1, $2, $3, $4, NOW(), $5)
            ON CONFLICT (email) DO UPDATE SET
                external_id = EXCLUDED.external_id,
                name = COALESCE(EXCLUDED.name, users.name),
                email_verified = COALESCE(users.email_verified, EXCLUDED.email_verified),
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&email)
        .bind(identity.name)
        .bind(identity.initial_role.as_str())
        .bind(identity.external_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(user)
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Self>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at ASC")
            .fetch_all(pool)
            .await?;
        Ok(users)
    }

    pub async fn set_role(id: Uuid, role: Role, pool: &PgPool) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(pool)
        .await?;
        Ok(user)
    }

    pub async fn mark_email_verified(id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email_verified = COALESCE(email_verified, NOW()), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Dewi@LembarKerja.ID "), "dewi@lembarkerja.id");
    }

    #[test]
    fn test_password_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@b.com".into(),
            name: None,
            role: Role::User,
            email_verified: None,
            password: Some("$argon2id$secret".into()),
            external_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["role"], "USER");
        assert_eq!(user.display_name(), "a");
    }
}
