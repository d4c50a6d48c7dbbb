//! Shared infrastructure: MySQL container management and fixtures.

use hipeac_adapter_mysql::MySqlDirectoryStore;
use hipeac_core::{SslMode, UpstreamConfig};
use hipeac_directory::Directory;
use sqlx::MySqlPool;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

pub const CONTAINER_NAME: &str = "hipeac_test_mysql";
pub const MYSQL_PORT: u16 = 3307;
pub const MYSQL_ROOT_PASSWORD: &str = "hipeac_test_password";
pub const DATABASE_NAME: &str = "hipeac_test";

pub fn database_url() -> String {
    format!(
        "mysql://root:{}@127.0.0.1:{}/{}",
        MYSQL_ROOT_PASSWORD, MYSQL_PORT, DATABASE_NAME
    )
}

pub fn upstream_config() -> UpstreamConfig {
    UpstreamConfig {
        database_url_env: None,
        database_url: Some(database_url()),
        ssl_mode: SslMode::Disabled,
        ..Default::default()
    }
}

pub fn start_mysql_container() -> Result<(), String> {
    let _ = Command::new("docker")
        .args(["rm", "-f", CONTAINER_NAME])
        .output();

    let status = Command::new("docker")
        .args([
            "run",
            "-d",
            "--name",
            CONTAINER_NAME,
            "-e",
            &format!("MYSQL_ROOT_PASSWORD={}", MYSQL_ROOT_PASSWORD),
            "-e",
            &format!("MYSQL_DATABASE={}", DATABASE_NAME),
            "-p",
            &format!("{}:3306", MYSQL_PORT),
            "mysql:8.0",
        ])
        .status()
        .map_err(|e| format!("Failed to start container: {}", e))?;

    if !status.success() {
        return Err("Failed to start MySQL container".to_string());
    }
    Ok(())
}

pub fn stop_mysql_container() {
    let _ = Command::new("docker")
        .args(["rm", "-f", CONTAINER_NAME])
        .output();
}

/// MySQL runs a temporary server during initialization, so keep polling
/// until the real one answers.
pub async fn wait_for_mysql() -> Result<MySqlPool, String> {
    for attempt in 1..=90 {
        if let Ok(pool) = MySqlPool::connect(&database_url()).await
            && sqlx::query("SELECT 1").fetch_one(&pool).await.is_ok()
        {
            println!("✅ MySQL ready after {} attempts", attempt);
            return Ok(pool);
        }
        if attempt % 10 == 0 {
            println!("⏳ Waiting for MySQL... (attempt {})", attempt);
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    Err("MySQL did not become ready in time".to_string())
}

const SCHEMA_SQL: &str = include_str!("../fixtures/schema.sql");
const SEED_SQL: &str = include_str!("../fixtures/seed.sql");

pub async fn initialize_database(pool: &MySqlPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
    sqlx::raw_sql(SEED_SQL).execute(pool).await?;
    println!("✅ Database initialized with schema and seed data");
    Ok(())
}

pub struct TestContext {
    /// Read-write admin pool used for setup only.
    pub admin: MySqlPool,
    pub store: Arc<MySqlDirectoryStore>,
}

impl TestContext {
    pub async fn setup() -> Result<Self, String> {
        start_mysql_container()?;
        let admin = wait_for_mysql().await?;
        initialize_database(&admin)
            .await
            .map_err(|e| format!("Failed to initialize database: {}", e))?;
        let store = MySqlDirectoryStore::connect(&upstream_config())
            .await
            .map_err(|e| format!("Failed to connect store: {:#}", e))?;
        Ok(Self {
            admin,
            store: Arc::new(store),
        })
    }

    pub fn directory(&self) -> Directory {
        Directory::new(self.store.clone(), Default::default())
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        stop_mysql_container();
        println!("🧹 Cleaned up MySQL container");
    }
}
