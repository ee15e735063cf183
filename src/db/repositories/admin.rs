use anyhow::{Context, Result};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use tokio::task;

use crate::entities::{admin_users, prelude::*};

pub struct AdminRepository {
    conn: DatabaseConnection,
}

impl AdminRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<admin_users::Model>> {
        AdminUsers::find()
            .filter(admin_users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query admin user by username")
    }

    pub async fn count(&self) -> Result<u64> {
        AdminUsers::find()
            .count(&self.conn)
            .await
            .context("Failed to count admin users")
    }

    /// Verify a password against the stored hash.
    /// Argon2 verification is CPU-intensive, so it runs on a blocking thread.
    pub async fn verify_password(&self, username: &str, password: &str) -> Result<bool> {
        let Some(user) = self.get_by_username(username).await? else {
            return Ok(false);
        };

        let password_hash = user.password_hash;
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(&password_hash)
                .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

            let argon2 = Argon2::default();
            Ok::<bool, anyhow::Error>(
                argon2
                    .verify_password(password.as_bytes(), &parsed_hash)
                    .is_ok(),
            )
        })
        .await
        .context("Password verification task panicked")??;

        Ok(is_valid)
    }

    /// Stamps `last_login` after a successful credential check.
    pub async fn touch_last_login(&self, username: &str) -> Result<()> {
        let user = self
            .get_by_username(username)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Admin user not found: {username}"))?;

        let now = chrono::Utc::now().to_rfc3339();

        let mut active: admin_users::ActiveModel = user.into();
        active.last_login = Set(Some(now.clone()));
        active.updated_at = Set(now);
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Creates an admin account; used to bootstrap the first one at startup.
    pub async fn create(&self, username: &str, password: &str) -> Result<admin_users::Model> {
        let password = password.to_string();
        let password_hash = task::spawn_blocking(move || hash_password(&password))
            .await
            .context("Password hashing task panicked")??;

        let now = chrono::Utc::now().to_rfc3339();

        let active = admin_users::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set(password_hash),
            role: Set("admin".to_string()),
            last_login: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to create admin user")
    }
}

/// Hash a password with Argon2id.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}
