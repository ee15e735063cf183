use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::entities::{admin_users, phone_numbers};
use crate::models::PhoneMode;

pub mod migrator;
pub mod repositories;

pub use repositories::phone::{InsertOutcome, NewNumber, NumberFilter, NumberPatch};

/// Store handle with explicit lifecycle: connected (and migrated) once at
/// startup, injected into every consumer, pool dropped on shutdown.
#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn phone_repo(&self) -> repositories::phone::PhoneRepository {
        repositories::phone::PhoneRepository::new(self.conn.clone())
    }

    fn admin_repo(&self) -> repositories::admin::AdminRepository {
        repositories::admin::AdminRepository::new(self.conn.clone())
    }

    pub async fn list_numbers(&self, filter: &NumberFilter) -> Result<Vec<phone_numbers::Model>> {
        self.phone_repo().list(filter).await
    }

    pub async fn get_number(&self, id: i32) -> Result<Option<phone_numbers::Model>> {
        self.phone_repo().get(id).await
    }

    pub async fn get_number_by_value(&self, number: &str) -> Result<Option<phone_numbers::Model>> {
        self.phone_repo().get_by_number(number).await
    }

    pub async fn insert_number(&self, new: NewNumber) -> Result<InsertOutcome> {
        self.phone_repo().insert(new).await
    }

    pub async fn update_number(
        &self,
        id: i32,
        patch: NumberPatch,
    ) -> Result<Option<phone_numbers::Model>> {
        self.phone_repo().update(id, patch).await
    }

    pub async fn delete_number(&self, id: i32) -> Result<bool> {
        self.phone_repo().delete(id).await
    }

    pub async fn count_numbers(&self, mode: Option<PhoneMode>) -> Result<u64> {
        self.phone_repo().count(mode).await
    }

    pub async fn record_number_usage(&self, id: i32) -> Result<()> {
        self.phone_repo().record_usage(id).await
    }

    pub async fn tag_frequencies(&self, limit: Option<usize>) -> Result<Vec<(String, u64)>> {
        self.phone_repo().tag_frequencies(limit).await
    }

    pub async fn state_frequencies(&self, limit: Option<u64>) -> Result<Vec<(String, i64)>> {
        self.phone_repo().state_frequencies(limit).await
    }

    pub async fn get_admin_by_username(
        &self,
        username: &str,
    ) -> Result<Option<admin_users::Model>> {
        self.admin_repo().get_by_username(username).await
    }

    pub async fn admin_count(&self) -> Result<u64> {
        self.admin_repo().count().await
    }

    pub async fn verify_admin_password(&self, username: &str, password: &str) -> Result<bool> {
        self.admin_repo().verify_password(username, password).await
    }

    pub async fn touch_admin_last_login(&self, username: &str) -> Result<()> {
        self.admin_repo().touch_last_login(username).await
    }

    pub async fn create_admin(&self, username: &str, password: &str) -> Result<admin_users::Model> {
        self.admin_repo().create(username, password).await
    }
}
